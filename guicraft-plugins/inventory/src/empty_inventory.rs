//! The bare inventory panel: a light gray background with a raised bevel and
//! rounded pixel-art corners.

use crate::pixel_art::{sprite, FRAME_PALETTE};
use guicraft_plugin_api::{
    Color, ConfigValues, DeclarativeElement, ElementDefinitionBuilder, ImageData, Rect, Result,
    Surface,
};
use std::sync::Arc;

const FRAME_BLACK: Color = Color::rgb(0, 0, 0);
const FRAME_WHITE: Color = Color::rgb(0xff, 0xff, 0xff);
const FRAME_GRAY: Color = Color::rgb(0xc6, 0xc6, 0xc6);
const FRAME_DARK_GRAY: Color = Color::rgb(0x55, 0x55, 0x55);

const CORNER: i64 = 4;

const TOP_LEFT: &str = "
..bb
.bww
bwww
bwww
";

const TOP_RIGHT: &str = "
b...
wb..
wgb.
gddb
";

const BOTTOM_LEFT: &str = "
bwwg
.bgd
..bd
...b
";

const BOTTOM_RIGHT: &str = "
dddb
dddb
ddb.
bb..
";

/// The four 4x4 corner sprites.
#[derive(Debug, Clone)]
struct Corners {
    top_left: ImageData,
    top_right: ImageData,
    bottom_left: ImageData,
    bottom_right: ImageData,
}

impl Corners {
    fn new() -> Result<Self> {
        let corner = |picture| sprite(picture, 4, 4, FRAME_PALETTE);
        Ok(Self {
            top_left: corner(TOP_LEFT)?,
            top_right: corner(TOP_RIGHT)?,
            bottom_left: corner(BOTTOM_LEFT)?,
            bottom_right: corner(BOTTOM_RIGHT)?,
        })
    }
}

/// A 176x166 panel, at least 8x8, with no configuration.
pub fn empty_inventory_element() -> Result<DeclarativeElement> {
    let corners = Arc::new(Corners::new()?);
    ElementDefinitionBuilder::new(move |surface, rect, values| {
        render_panel(&corners, surface, rect, values)
    })
    .default_size(176, 166)
    .minimum_size(8, 8)
    .build()
}

fn render_panel(
    corners: &Corners,
    surface: &mut dyn Surface,
    rect: Rect,
    _values: &ConfigValues,
) -> Result<()> {
    let Rect {
        x,
        y,
        width,
        height,
    } = rect;

    surface.blend_image(&corners.top_left, x, y, false);
    surface.blend_image(&corners.top_right, x + width - CORNER, y, false);
    surface.blend_image(&corners.bottom_left, x, y + height - CORNER, false);
    surface.blend_image(
        &corners.bottom_right,
        x + width - CORNER,
        y + height - CORNER,
        false,
    );

    let bar_width = width - 2 * CORNER;
    let bar_height = height - 2 * CORNER;

    // outline
    surface.fill_rect(Rect::new(x + 4, y, bar_width, 1), FRAME_BLACK);
    surface.fill_rect(Rect::new(x + 4, y + height - 1, bar_width, 1), FRAME_BLACK);
    surface.fill_rect(Rect::new(x, y + 4, 1, bar_height), FRAME_BLACK);
    surface.fill_rect(Rect::new(x + width - 1, y + 4, 1, bar_height), FRAME_BLACK);

    // highlight on the top and left
    surface.fill_rect(Rect::new(x + 4, y + 1, bar_width, 2), FRAME_WHITE);
    surface.fill_rect(Rect::new(x + 1, y + 4, 2, bar_height), FRAME_WHITE);

    // shadow on the bottom and right
    surface.fill_rect(Rect::new(x + 4, y + height - 3, bar_width, 2), FRAME_DARK_GRAY);
    surface.fill_rect(Rect::new(x + width - 3, y + 4, 2, bar_height), FRAME_DARK_GRAY);

    surface.fill_rect(Rect::new(x + 4, y + 3, bar_width, 1), FRAME_GRAY);
    surface.fill_rect(Rect::new(x + 4, y + height - 4, bar_width, 1), FRAME_GRAY);
    surface.fill_rect(Rect::new(x + 3, y + 4, 1, bar_height), FRAME_GRAY);
    surface.fill_rect(Rect::new(x + width - 4, y + 4, 1, bar_height), FRAME_GRAY);
    surface.fill_rect(Rect::new(x + 4, y + 4, bar_width, bar_height), FRAME_GRAY);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use guicraft_plugin_api::{ElementDefinition, PixelBuffer};

    fn render(width: i64, height: i64) -> PixelBuffer {
        let panel = empty_inventory_element().unwrap();
        let mut buffer = PixelBuffer::new(width as u32, height as u32);
        panel
            .render(&mut buffer, Rect::sized(width, height), &ConfigValues::new())
            .unwrap();
        buffer
    }

    #[test]
    fn test_corners_are_rounded() {
        let buffer = render(16, 16);
        assert_eq!(buffer.pixel(0, 0), Some([0, 0, 0, 0]));
        assert_eq!(buffer.pixel(2, 0), Some(FRAME_BLACK.to_array()));
        assert_eq!(buffer.pixel(3, 3), Some(FRAME_WHITE.to_array()));
        assert_eq!(buffer.pixel(15, 15), Some([0, 0, 0, 0]));
        assert_eq!(buffer.pixel(15, 0), Some([0, 0, 0, 0]));
        assert_eq!(buffer.pixel(12, 0), Some(FRAME_BLACK.to_array()));
    }

    #[test]
    fn test_bevel_bands() {
        let buffer = render(16, 16);
        assert_eq!(buffer.pixel(8, 0), Some(FRAME_BLACK.to_array()));
        assert_eq!(buffer.pixel(8, 1), Some(FRAME_WHITE.to_array()));
        assert_eq!(buffer.pixel(8, 3), Some(FRAME_GRAY.to_array()));
        assert_eq!(buffer.pixel(8, 8), Some(FRAME_GRAY.to_array()));
        assert_eq!(buffer.pixel(8, 13), Some(FRAME_DARK_GRAY.to_array()));
        assert_eq!(buffer.pixel(14, 8), Some(FRAME_DARK_GRAY.to_array()));
        assert_eq!(buffer.pixel(15, 8), Some(FRAME_BLACK.to_array()));
    }

    #[test]
    fn test_minimum_size() {
        let panel = empty_inventory_element().unwrap();
        assert_eq!(
            panel.validate_dimensions(Rect::new(3, 3, 2, 20)).unwrap(),
            Rect::new(3, 3, 8, 20)
        );
        let default = panel.default_value().unwrap();
        assert_eq!((default.width, default.height), (176, 166));
        assert!(panel.config_schema().is_empty());
    }
}
