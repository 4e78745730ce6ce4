//! Drawing surfaces and pixel data.
//!
//! Element definitions draw through the [`Surface`] trait. The host provides
//! [`PixelBuffer`], an offscreen RGBA raster used for previews and for
//! rendering whole layouts.

use crate::Rect;
use anyhow::{anyhow, bail};
use serde::{Deserialize, Serialize};

/// An RGBA color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(0xff, 0xff, 0xff);
    pub const TRANSPARENT: Color = Color::rgba(0, 0, 0, 0);

    /// Opaque color from its channels.
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 0xff }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Parse a `#rrggbb` or `#rrggbbaa` hex string.
    ///
    /// # Errors
    ///
    /// Returns an error for any other shape of input.
    ///
    /// # Example
    ///
    /// ```rust
    /// use guicraft_plugin_api::Color;
    ///
    /// assert_eq!(Color::parse("#8b8b8b").unwrap(), Color::rgb(0x8b, 0x8b, 0x8b));
    /// assert_eq!(Color::parse("#00000080").unwrap().a, 0x80);
    /// assert!(Color::parse("red").is_err());
    /// ```
    pub fn parse(text: &str) -> crate::Result<Self> {
        let hex = text
            .strip_prefix('#')
            .ok_or_else(|| anyhow!("color `{text}` must start with `#`"))?;
        if !hex.is_ascii() || (hex.len() != 6 && hex.len() != 8) {
            bail!("color `{text}` must be #rrggbb or #rrggbbaa");
        }
        let channel = |index: usize| {
            u8::from_str_radix(&hex[index * 2..index * 2 + 2], 16)
                .map_err(|_| anyhow!("color `{text}` contains a non-hex digit"))
        };
        let alpha = if hex.len() == 8 { channel(3)? } else { 0xff };
        Ok(Self::rgba(channel(0)?, channel(1)?, channel(2)?, alpha))
    }

    pub fn to_array(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

/// Raw RGBA pixel data, row-major, four bytes per pixel.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImageData {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl ImageData {
    /// Wrap an existing pixel buffer.
    ///
    /// # Errors
    ///
    /// Returns an error if `pixels.len() != width * height * 4`.
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> crate::Result<Self> {
        let expected = Self::byte_len(width, height)
            .ok_or_else(|| anyhow!("image size {width}x{height} overflows"))?;
        if pixels.len() != expected {
            bail!(
                "image {width}x{height} needs {expected} bytes, got {}",
                pixels.len()
            );
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// A fully transparent image.
    pub fn blank(width: u32, height: u32) -> Self {
        let len = Self::byte_len(width, height).unwrap_or(0);
        Self {
            width,
            height,
            pixels: vec![0; len],
        }
    }

    /// Number of bytes an image of this size occupies, if it fits in `usize`.
    pub fn byte_len(width: u32, height: u32) -> Option<usize> {
        (width as usize)
            .checked_mul(height as usize)?
            .checked_mul(4)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn into_pixels(self) -> Vec<u8> {
        self.pixels
    }

    /// The RGBA value at `(x, y)`, or `None` outside the image.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = (y as usize * self.width as usize + x as usize) * 4;
        let px = &self.pixels[offset..offset + 4];
        Some([px[0], px[1], px[2], px[3]])
    }
}

/// Something an element can draw onto.
pub trait Surface {
    fn width(&self) -> u32;

    fn height(&self) -> u32;

    /// Fill a rectangle with a solid color. Parts outside the surface are
    /// clipped; empty or negative sizes draw nothing.
    fn fill_rect(&mut self, rect: Rect, color: Color);

    /// Alpha-blend an image with its top-left corner at `(x, y)`.
    ///
    /// With `grayscale` set, the source colors are averaged to gray first.
    fn blend_image(&mut self, image: &ImageData, x: i64, y: i64, grayscale: bool);
}

/// An offscreen RGBA raster.
///
/// # Example
///
/// ```rust
/// use guicraft_plugin_api::{Color, PixelBuffer, Rect, Surface};
///
/// let mut buffer = PixelBuffer::new(4, 4);
/// buffer.fill_rect(Rect::new(1, 1, 2, 2), Color::WHITE);
/// assert_eq!(buffer.pixel(1, 1), Some([255, 255, 255, 255]));
/// assert_eq!(buffer.pixel(0, 0), Some([0, 0, 0, 0]));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    image: ImageData,
}

impl PixelBuffer {
    /// A transparent buffer of the given size.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            image: ImageData::blank(width, height),
        }
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        self.image.pixel(x, y)
    }

    /// Capture the current contents.
    pub fn snapshot(&self) -> ImageData {
        self.image.clone()
    }

    pub fn into_image(self) -> ImageData {
        self.image
    }

    fn offset(&self, x: i64, y: i64) -> Option<usize> {
        if x < 0 || y < 0 || x >= self.image.width as i64 || y >= self.image.height as i64 {
            return None;
        }
        Some((y as usize * self.image.width as usize + x as usize) * 4)
    }
}

impl Surface for PixelBuffer {
    fn width(&self) -> u32 {
        self.image.width
    }

    fn height(&self) -> u32 {
        self.image.height
    }

    fn fill_rect(&mut self, rect: Rect, color: Color) {
        let x0 = rect.x.max(0);
        let y0 = rect.y.max(0);
        let x1 = rect.right().min(self.image.width as i64);
        let y1 = rect.bottom().min(self.image.height as i64);
        let rgba = color.to_array();
        for y in y0..y1 {
            for x in x0..x1 {
                if let Some(offset) = self.offset(x, y) {
                    self.image.pixels[offset..offset + 4].copy_from_slice(&rgba);
                }
            }
        }
    }

    fn blend_image(&mut self, image: &ImageData, x: i64, y: i64, grayscale: bool) {
        for iy in 0..image.height {
            for ix in 0..image.width {
                let Some([mut r2, mut g2, mut b2, a2]) = image.pixel(ix, iy) else {
                    continue;
                };
                // transparent source pixels leave the destination alone
                if a2 == 0 {
                    continue;
                }
                let Some(offset) = self.offset(x + ix as i64, y + iy as i64) else {
                    continue;
                };
                if grayscale {
                    let gray = ((r2 as u32 + g2 as u32 + b2 as u32 + 1) / 3) as u8;
                    r2 = gray;
                    g2 = gray;
                    b2 = gray;
                }
                let dst = &mut self.image.pixels[offset..offset + 4];
                if dst[3] == 0 {
                    dst.copy_from_slice(&[r2, g2, b2, a2]);
                    continue;
                }
                let mix = |d: u8, s: u8| -> u8 {
                    let v = (d as u32 * (255 - a2 as u32) + s as u32 * a2 as u32) / 255;
                    v.min(255) as u8
                };
                dst[0] = mix(dst[0], r2);
                dst[1] = mix(dst[1], g2);
                dst[2] = mix(dst[2], b2);
                dst[3] = dst[3].max(a2);
            }
        }
    }
}
