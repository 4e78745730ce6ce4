//! Tiny text-drawn sprites.
//!
//! Each character of the picture is one pixel. Characters missing from the
//! palette (conventionally `.`) are transparent; line breaks are ignored.

use anyhow::bail;
use guicraft_plugin_api::{Color, ImageData, Result};

/// Black, white, light gray and dark gray: the inventory frame colors.
pub const FRAME_PALETTE: &[(char, Color)] = &[
    ('b', Color::rgb(0, 0, 0)),
    ('w', Color::rgb(0xff, 0xff, 0xff)),
    ('g', Color::rgb(0xc6, 0xc6, 0xc6)),
    ('d', Color::rgb(0x55, 0x55, 0x55)),
];

/// Turn a text picture into pixels.
///
/// # Errors
///
/// Fails if the picture does not have exactly `width * height` pixels.
///
/// # Example
///
/// ```rust
/// use guicraft_inventory::pixel_art::{sprite, FRAME_PALETTE};
///
/// let image = sprite("bw\n.d\n", 2, 2, FRAME_PALETTE).unwrap();
/// assert_eq!(image.pixel(0, 0), Some([0, 0, 0, 255]));
/// assert_eq!(image.pixel(0, 1), Some([0, 0, 0, 0]));
/// ```
pub fn sprite(picture: &str, width: u32, height: u32, palette: &[(char, Color)]) -> Result<ImageData> {
    let pixels: Vec<char> = picture.chars().filter(|c| *c != '\n' && *c != '\r').collect();
    let expected = width as usize * height as usize;
    if pixels.len() != expected {
        bail!(
            "sprite has {} pixels but {}x{} needs {}",
            pixels.len(),
            width,
            height,
            expected
        );
    }

    let mut data = Vec::with_capacity(expected * 4);
    for pixel in pixels {
        let color = palette
            .iter()
            .find(|(key, _)| *key == pixel)
            .map(|(_, color)| *color)
            .unwrap_or(Color::TRANSPARENT);
        data.extend_from_slice(&color.to_array());
    }
    ImageData::new(width, height, data)
}
