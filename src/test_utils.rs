use std::io::Cursor;
use std::sync::Arc;

use image::{DynamicImage, ImageFormat, RgbImage};
use sea_orm::{ConnectOptions, Database as SeaDatabase};

use crate::database::Database;

pub async fn test_db() -> Arc<Database> {
    // A single connection keeps every query on the same in-memory database
    let mut opt = ConnectOptions::new("sqlite::memory:");
    opt.max_connections(1).min_connections(1).sqlx_logging(false);

    let conn = SeaDatabase::connect(opt).await.unwrap();

    Arc::new(Database::from_connection(conn).await.unwrap())
}

/// Encodes a blank image of the given size, for tests that need real headers.
pub fn encode_test_image(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
    let mut bytes = Vec::new();
    DynamicImage::ImageRgb8(RgbImage::new(width, height))
        .write_to(&mut Cursor::new(&mut bytes), format)
        .unwrap();
    bytes
}
