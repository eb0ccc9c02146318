use std::io::Cursor;

use image::ImageReader;

/// Reads width and height from the image header without decoding pixel data.
///
/// Dimensions are best effort: anything unreadable yields `None`.
pub fn read_dimensions(bytes: &[u8]) -> Option<(u32, u32)> {
    let reader = match ImageReader::new(Cursor::new(bytes)).with_guessed_format() {
        Ok(reader) => reader,
        Err(e) => {
            log::debug!("Could not sniff image format: {e}");
            return None;
        }
    };

    match reader.into_dimensions() {
        Ok(dimensions) => Some(dimensions),
        Err(e) => {
            log::debug!("Could not read image dimensions: {e}");
            None
        }
    }
}
