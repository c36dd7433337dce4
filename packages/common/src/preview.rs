//! Avatar preview generation.
//!
//! Decodes an uploaded image, scales it to a fixed width while keeping the
//! aspect ratio, and re-encodes the result as JPEG.

use std::io::Cursor;

use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageFormat, ImageReader, Limits};
use thiserror::Error;

/// Preview width used when none is configured.
pub const DEFAULT_PREVIEW_WIDTH: u32 = 100;

/// Maximum image dimension (width or height) to prevent decompression bombs.
const MAX_IMAGE_DIMENSION: u32 = 16384;

/// Largest preview side in pixels. Checked before any resize buffer is allocated.
pub const MAX_PREVIEW_DIMENSION: u32 = 4096;

#[derive(Error, Debug)]
pub enum PreviewError {
    #[error("Unable to read image: {0}")]
    Unreadable(String),
    #[error("Invalid image dimensions: {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },
    #[error("Preview encoding failed: {0}")]
    Encoding(String),
}

/// An encoded preview image.
#[derive(Debug, Clone)]
pub struct Preview {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Compute preview dimensions for an image of `width`x`height`.
///
/// The preview is width-anchored: its width is `target_width` and its height is
/// `round(height / width * target_width)`, never less than one pixel.
/// Either side exceeding [`MAX_PREVIEW_DIMENSION`] is rejected.
pub fn preview_dimensions(
    width: u32,
    height: u32,
    target_width: u32,
) -> Result<(u32, u32), PreviewError> {
    if width == 0 || target_width == 0 || target_width > MAX_PREVIEW_DIMENSION {
        return Err(PreviewError::InvalidDimensions { width, height });
    }

    let scaled = (f64::from(height) / f64::from(width) * f64::from(target_width)).round();
    if scaled > f64::from(MAX_PREVIEW_DIMENSION) {
        return Err(PreviewError::InvalidDimensions { width, height });
    }
    let target_height = (scaled as u32).max(1);

    Ok((target_width, target_height))
}

/// Decode `data`, resize it to `target_width` with bilinear filtering and
/// encode the result as JPEG.
///
/// This function is CPU-bound and should be called inside `spawn_blocking`.
pub fn generate_preview(data: &[u8], target_width: u32) -> Result<Preview, PreviewError> {
    if data.is_empty() {
        return Err(PreviewError::Unreadable("image data is empty".into()));
    }

    let mut reader = ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| PreviewError::Unreadable(e.to_string()))?;
    let mut limits = Limits::default();
    limits.max_image_width = Some(MAX_IMAGE_DIMENSION);
    limits.max_image_height = Some(MAX_IMAGE_DIMENSION);
    reader.limits(limits);

    let img = reader
        .decode()
        .map_err(|e| PreviewError::Unreadable(e.to_string()))?;

    let (width, height) = img.dimensions();
    let (target_width, target_height) = preview_dimensions(width, height, target_width)?;
    tracing::trace!(
        width,
        height,
        target_width,
        target_height,
        "Scaling avatar preview"
    );

    // Triangle is the bilinear filter. JPEG has no alpha channel.
    let resized = img.resize_exact(target_width, target_height, FilterType::Triangle);
    let rgb = DynamicImage::ImageRgb8(resized.to_rgb8());

    let mut buf = Cursor::new(Vec::new());
    rgb.write_to(&mut buf, ImageFormat::Jpeg)
        .map_err(|e| PreviewError::Encoding(e.to_string()))?;

    Ok(Preview {
        data: buf.into_inner(),
        width: target_width,
        height: target_height,
    })
}
