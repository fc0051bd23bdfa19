//! Image preprocessing module
//!
//! Turns an uploaded photo into the compact form the vision model sees:
//! - Decode from any supported container (JPEG, PNG, GIF, WebP, BMP)
//! - Stretch to a fixed square resolution (no crop, no padding)
//! - Re-encode as JPEG
//! - Wrap as a base64 data URI

use crate::error::{PipelineError, Result};
use crate::types::{ImageDataUri, NORMALIZED_MEDIA_TYPE, NORMALIZED_SIZE};
use base64::{engine::general_purpose, Engine as _};
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat};
use std::io::Cursor;

/// Decode, resize to 256x256 and encode an image as a JPEG data URI
pub fn normalize(raw: &[u8]) -> Result<ImageDataUri> {
    let jpeg = normalize_to_jpeg(raw)?;
    let payload = general_purpose::STANDARD.encode(&jpeg);

    tracing::debug!(
        input_bytes = raw.len(),
        output_bytes = jpeg.len(),
        "Normalized image"
    );

    Ok(ImageDataUri::new(NORMALIZED_MEDIA_TYPE, &payload))
}

/// Decode and resize, returning the re-encoded JPEG bytes
pub fn normalize_to_jpeg(raw: &[u8]) -> Result<Vec<u8>> {
    let decoded = image::load_from_memory(raw).map_err(PipelineError::Decode)?;
    let resized = resize_square(&decoded, NORMALIZED_SIZE);

    let mut jpeg = Vec::new();
    resized
        .write_to(&mut Cursor::new(&mut jpeg), ImageFormat::Jpeg)
        .map_err(PipelineError::Encode)?;

    Ok(jpeg)
}

/// Stretch to `size`x`size`, dropping any alpha channel
///
/// JPEG has no alpha, so the result is always RGB8.
fn resize_square(input: &DynamicImage, size: u32) -> DynamicImage {
    let resized = input.resize_exact(size, size, FilterType::Triangle);
    DynamicImage::ImageRgb8(resized.to_rgb8())
}
