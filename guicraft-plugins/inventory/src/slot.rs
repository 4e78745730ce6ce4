//! The item slot element.

use guicraft_plugin_api::{
    Color, ConfigFieldSpec, ConfigSchema, ConfigValues, DeclarativeElement,
    ElementDefinitionBuilder, Rect, Result, Surface,
};

const SLOT_GRAY: Color = Color::rgb(0x8b, 0x8b, 0x8b);
const SLOT_DARK_GRAY: Color = Color::rgb(0x37, 0x37, 0x37);
const SLOT_WHITE: Color = Color::rgb(0xff, 0xff, 0xff);

/// Config key of the optional background image.
pub const BACKGROUND_FILE: &str = "background_file";

/// A recessed 18x18 slot, at least 2x2.
///
/// The optional background image is drawn in grayscale, centred, and only if
/// it fits inside the 1px border.
pub fn slot_element() -> Result<DeclarativeElement> {
    ElementDefinitionBuilder::new(render_slot)
        .default_size(18, 18)
        .minimum_size(2, 2)
        .config(
            ConfigSchema::new().with_field(
                BACKGROUND_FILE,
                ConfigFieldSpec::file().with_label("Background Image"),
            ),
        )
        .build()
}

fn render_slot(surface: &mut dyn Surface, rect: Rect, values: &ConfigValues) -> Result<()> {
    let Rect {
        x,
        y,
        width,
        height,
    } = rect;

    // top and left edges stop one short; those corner pixels are gray
    surface.fill_rect(Rect::new(x, y, 1, height - 1), SLOT_DARK_GRAY);
    surface.fill_rect(Rect::new(x, y, width - 1, 1), SLOT_DARK_GRAY);

    surface.fill_rect(Rect::new(x + width - 1, y, 1, 1), SLOT_GRAY);
    surface.fill_rect(Rect::new(x, y + height - 1, 1, 1), SLOT_GRAY);
    surface.fill_rect(Rect::new(x + 1, y + 1, width - 2, height - 2), SLOT_GRAY);

    surface.fill_rect(Rect::new(x + 1, y + height - 1, width - 1, 1), SLOT_WHITE);
    surface.fill_rect(Rect::new(x + width - 1, y + 1, 1, height - 1), SLOT_WHITE);

    if let Some(file) = values.get_file(BACKGROUND_FILE) {
        let image_width = i64::from(file.image.width());
        let image_height = i64::from(file.image.height());
        if width - 2 < image_width || height - 2 < image_height {
            return Ok(());
        }
        let left = (width - image_width).div_euclid(2);
        let top = (height - image_height).div_euclid(2);
        surface.blend_image(&file.image, x + left, y + top, true);
    }
    Ok(())
}
