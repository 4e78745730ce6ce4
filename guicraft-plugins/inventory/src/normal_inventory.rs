//! The player inventory: an empty panel with the 9x4 slot grid along its
//! bottom edge.

use guicraft_plugin_api::{
    ConfigValues, DeclarativeElement, ElementDefinitionBuilder, Rect, Result, SharedDefinition,
};

/// Slots per row.
pub const COLUMNS: i64 = 9;

/// Rows, counting the hotbar.
pub const ROWS: i64 = 4;

const SLOT_SIZE: i64 = 18;
const LEFT_MARGIN: i64 = 7;
const BOTTOM_MARGIN: i64 = 25;
const HOTBAR_GAP: i64 = 4;

/// Top-left corner of slot `(column, row)` inside a panel of `height`.
///
/// Row 0 is the hotbar; the rows above it sit a further 4px higher.
///
/// # Example
///
/// ```rust
/// use guicraft_inventory::normal_inventory::slot_origin;
///
/// assert_eq!(slot_origin(0, 0, 166), (7, 141));
/// assert_eq!(slot_origin(8, 1, 166), (151, 119));
/// ```
pub fn slot_origin(column: i64, row: i64, height: i64) -> (i64, i64) {
    let gap = if row > 0 { HOTBAR_GAP } else { 0 };
    (
        LEFT_MARGIN + column * SLOT_SIZE,
        height - (BOTTOM_MARGIN + row * SLOT_SIZE + gap),
    )
}

/// A 176x166 panel, at least 8x8, drawn with `panel` and `slot`.
pub fn normal_inventory_element(
    panel: SharedDefinition,
    slot: SharedDefinition,
) -> Result<DeclarativeElement> {
    ElementDefinitionBuilder::new(move |surface, rect, _values| {
        panel.render(surface, rect, &ConfigValues::new())?;
        let empty = ConfigValues::new();
        for column in 0..COLUMNS {
            for row in 0..ROWS {
                let (x, y) = slot_origin(column, row, rect.height);
                slot.render(
                    surface,
                    Rect::new(rect.x + x, rect.y + y, SLOT_SIZE, SLOT_SIZE),
                    &empty,
                )?;
            }
        }
        Ok(())
    })
    .default_size(176, 166)
    .minimum_size(8, 8)
    .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{empty_inventory_element, slot_element};
    use guicraft_plugin_api::{Color, ElementDefinition, PixelBuffer, Surface};
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_draws_panel_then_slots() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let log = calls.clone();
        let panel = ElementDefinitionBuilder::new(move |_, rect, _| {
            log.lock().unwrap().push(rect);
            Ok(())
        })
        .default_size(1, 1)
        .build()
        .unwrap();
        let log = calls.clone();
        let slot = ElementDefinitionBuilder::new(move |_, rect, _| {
            log.lock().unwrap().push(rect);
            Ok(())
        })
        .default_size(1, 1)
        .build()
        .unwrap();

        let inventory = normal_inventory_element(Arc::new(panel), Arc::new(slot)).unwrap();
        let mut buffer = PixelBuffer::new(1, 1);
        inventory
            .render(&mut buffer, Rect::new(10, 20, 176, 166), &ConfigValues::new())
            .unwrap();

        let calls = calls.lock().unwrap();
        assert_eq!(calls.len(), 1 + 36);
        assert_eq!(calls[0], Rect::new(10, 20, 176, 166));
        assert_eq!(calls[1], Rect::new(17, 161, 18, 18));
        assert_eq!(calls[2], Rect::new(17, 139, 18, 18));
    }

    #[test]
    fn test_renders_real_slots() {
        let panel: SharedDefinition = Arc::new(empty_inventory_element().unwrap());
        let slot: SharedDefinition = Arc::new(slot_element().unwrap());
        let inventory = normal_inventory_element(panel, slot).unwrap();

        let mut buffer = PixelBuffer::new(176, 166);
        inventory
            .render(&mut buffer, Rect::sized(176, 166), &ConfigValues::new())
            .unwrap();

        // hotbar slot border, then its gray inside
        assert_eq!(buffer.pixel(7, 141), Some(Color::rgb(0x37, 0x37, 0x37).to_array()));
        assert_eq!(buffer.pixel(10, 150), Some(Color::rgb(0x8b, 0x8b, 0x8b).to_array()));
        // the panel around the grid
        assert_eq!(buffer.pixel(88, 20), Some(Color::rgb(0xc6, 0xc6, 0xc6).to_array()));
        assert_eq!(buffer.width(), 176);
    }

    #[test]
    fn test_failing_part_fails_render() {
        let panel: SharedDefinition = Arc::new(empty_inventory_element().unwrap());
        let slot: SharedDefinition = Arc::new(
            ElementDefinitionBuilder::new(|_, _, _| Err(anyhow::anyhow!("broken slot")))
                .default_size(18, 18)
                .build()
                .unwrap(),
        );
        let inventory = normal_inventory_element(panel, slot).unwrap();
        let mut buffer = PixelBuffer::new(176, 166);
        let err = inventory
            .render(&mut buffer, Rect::sized(176, 166), &ConfigValues::new())
            .unwrap_err();
        assert_eq!(err.to_string(), "broken slot");
    }
}
