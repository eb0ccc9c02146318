pub mod album;
pub mod album_model;
pub mod model;
