//! Reading and writing pictures as pixel buffers

use anyhow::{Context, Result};
use image::{DynamicImage, ImageFormat, RgbaImage};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::buffer::{Color, PixelBuffer};

/// Convert an RGBA picture to a pixel buffer
pub fn from_rgba_image(image: &RgbaImage) -> Result<PixelBuffer> {
    let (width, height) = image.dimensions();
    let pixels = image.pixels().map(|p| Color::from_rgba(p.0)).collect();
    Ok(PixelBuffer::from_pixels(
        width as usize,
        height as usize,
        pixels,
    )?)
}

/// Convert a pixel buffer to an RGBA picture
pub fn to_rgba_image(buffer: &PixelBuffer) -> Result<RgbaImage> {
    let width = u32::try_from(buffer.width()).context("Picture too wide")?;
    let height = u32::try_from(buffer.height()).context("Picture too tall")?;
    let raw: Vec<u8> = buffer.pixels().iter().flat_map(|c| c.to_rgba()).collect();
    RgbaImage::from_raw(width, height, raw).context("Pixel data does not match picture size")
}

/// Decode a picture file
pub fn load_buffer(path: &Path) -> Result<PixelBuffer> {
    let image = image::open(path)
        .with_context(|| format!("Failed to open image {:?}", path))?
        .to_rgba8();
    debug!(
        "Loaded {:?} ({}x{})",
        path,
        image.width(),
        image.height()
    );
    from_rgba_image(&image)
}

/// Encode a pixel buffer, the format follows the file extension
pub fn save_buffer(buffer: &PixelBuffer, path: &Path) -> Result<()> {
    let image = to_rgba_image(buffer)?;
    let format = ImageFormat::from_path(path)
        .with_context(|| format!("Unknown image format for {:?}", path))?;

    let result = match format {
        // No alpha channel in JPEG
        ImageFormat::Jpeg => DynamicImage::ImageRgba8(image)
            .to_rgb8()
            .save_with_format(path, format),
        _ => image.save_with_format(path, format),
    };
    result.with_context(|| format!("Failed to write image {:?}", path))?;

    debug!("Wrote {:?}", path);
    Ok(())
}

/// Insert `suffix` before the extension of `input`, or at its end
pub fn default_output_path(input: &Path, suffix: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match input.extension() {
        Some(ext) => format!("{}{}.{}", stem, suffix, ext.to_string_lossy()),
        None => format!("{}{}", stem, suffix),
    };
    input.with_file_name(name)
}
