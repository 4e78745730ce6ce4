use guicraft_core::sandbox::{PluginSandbox, PluginScript, SandboxLimits};
use guicraft_core::{EditorSession, ElementRegistry, PreviewCache};
use guicraft_inventory::{builtins, InventoryPlugin, NORMAL_INVENTORY_ID, SLOT_ID};
use guicraft_plugin_api::Rect;
use std::sync::Arc;

// A script plugin that wraps the built-in slot in a larger "output slot" and
// places it on a player inventory.

const OUTPUT_SLOT: &str = r##"
let slot = builtin("slotElement");
let output = create_element_definition(#{
    render: |canvas, area, values| {
        canvas.fill_rect(area, "#8b8b8b");
        slot.render(canvas, rect(area.x + 4, area.y + 4, area.width - 8, area.height - 8), values);
    },
    default_size: [26, 26],
    validate_dimensions: [10, 10],
    config: #{ background_file: #{ type: "file_input", label: "Background Image" } },
    default_value: || slot.default_value().config_values,
});
register_element("outputSlot", output);
"##;

#[tokio::test]
async fn script_builds_on_builtin_slot() {
    let registry = Arc::new(ElementRegistry::new());
    registry.register_plugin(&InventoryPlugin::new().unwrap()).unwrap();
    let previews = Arc::new(PreviewCache::new(registry.clone(), 1 << 20));
    let sandbox = PluginSandbox::new(registry.clone(), previews.clone(), SandboxLimits::default())
        .with_builtins(builtins().unwrap());

    let report = sandbox
        .load_batch(vec![PluginScript::new(OUTPUT_SLOT, "output_slot.rhai")])
        .await;
    assert!(report.errored.is_empty(), "{:?}", report.errored);

    let preview = previews.get_preview("outputSlot").unwrap();
    assert_eq!((preview.width(), preview.height()), (26, 26));
    // inner slot's dark top-left border
    assert_eq!(preview.pixel(4, 4), Some([0x37, 0x37, 0x37, 0xff]));

    let mut session = EditorSession::new(registry, NORMAL_INVENTORY_ID).unwrap();
    let index = session.add_element("outputSlot", "Result", 120, 30).unwrap();
    session.add_element(SLOT_ID, "", 0, 0).unwrap();
    assert_eq!(session.layout().elements[index].rect, Rect::new(120, 30, 26, 26));

    let canvas = session.render_canvas().unwrap();
    assert_eq!(canvas.pixel(1 + 124, 1 + 34), Some([0x37, 0x37, 0x37, 0xff]));
}
