//! Frame decoding

use crate::error::VisionError;
use image::io::{Limits, Reader as ImageReader};
use image::RgbImage;
use std::io::Cursor;

/// Decode uploaded image bytes into an RGB frame.
///
/// Rejects empty payloads, unknown formats, corrupt data and frames with a
/// side longer than `max_side` pixels.
pub fn decode_frame(bytes: &[u8], max_side: u32) -> Result<RgbImage, VisionError> {
    if bytes.is_empty() {
        return Err(VisionError::InvalidInput("Image payload is empty".to_string()));
    }

    let format = image::guess_format(bytes)
        .map_err(|_| VisionError::InvalidInput("Unrecognized image format".to_string()))?;

    let mut limits = Limits::default();
    limits.max_image_width = Some(max_side);
    limits.max_image_height = Some(max_side);

    let mut reader = ImageReader::with_format(Cursor::new(bytes), format);
    reader.limits(limits);

    let image = reader
        .decode()
        .map_err(|e| VisionError::InvalidInput(format!("Failed to decode image: {}", e)))?;

    if image.width() == 0 || image.height() == 0 {
        return Err(VisionError::InvalidInput("Image has no pixels".to_string()));
    }

    Ok(image.to_rgb8())
}
