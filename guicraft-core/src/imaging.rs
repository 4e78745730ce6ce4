//! Image import and export.
//!
//! File inputs hold decoded RGBA pixels. This module turns PNG and JPEG files
//! into [`ImageData`] / [`DiskFile`] values and writes rendered surfaces back
//! out as PNG.

use crate::{Error, Result};
use guicraft_plugin_api::{DiskFile, ImageData};
use image::{ImageFormat, RgbaImage};
use std::path::Path;
use tracing::debug;

/// Extensions accepted for file inputs.
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "apng", "jpg", "jpeg", "jfif", "pjpeg", "pjp"];

fn format_for(path: &Path) -> Option<ImageFormat> {
    let extension = path.extension()?.to_str()?.to_ascii_lowercase();
    match extension.as_str() {
        "png" | "apng" => Some(ImageFormat::Png),
        "jpg" | "jpeg" | "jfif" | "pjpeg" | "pjp" => Some(ImageFormat::Jpeg),
        _ => None,
    }
}

/// Whether `path` has one of the [`IMAGE_EXTENSIONS`].
pub fn is_image_path(path: &Path) -> bool {
    format_for(path).is_some()
}

/// Decode an image file into RGBA pixels.
///
/// # Errors
///
/// Fails for unsupported extensions, unreadable files and decode errors.
pub fn read_image(path: &Path) -> Result<ImageData> {
    let format = format_for(path).ok_or_else(|| {
        Error::validation(
            "path".to_string(),
            format!("{} is not a supported image file", path.display()),
        )
    })?;
    let bytes = std::fs::read(path)?;
    let decoded = image::load_from_memory_with_format(&bytes, format)?.into_rgba8();
    let (width, height) = decoded.dimensions();
    debug!("Decoded {} ({}x{})", path.display(), width, height);
    Ok(ImageData::new(width, height, decoded.into_raw())?)
}

/// Encode pixels as a PNG file.
///
/// # Errors
///
/// Fails if the file cannot be written.
pub fn write_png(image: &ImageData, path: &Path) -> Result<()> {
    let buffer = RgbaImage::from_raw(image.width(), image.height(), image.pixels().to_vec())
        .ok_or_else(|| Error::render("pixel buffer does not match its dimensions"))?;
    buffer.save_with_format(path, ImageFormat::Png)?;
    Ok(())
}

/// Opening image files as configuration values.
pub trait DiskFileExt: Sized {
    /// Load `path` as a file value. The stored path is the file name.
    fn open<P: AsRef<Path>>(path: P) -> Result<Self>;
}

impl DiskFileExt for DiskFile {
    fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let image = read_image(path)?;
        let name = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or_default()
            .to_string();
        Ok(DiskFile::new(name, image))
    }
}
