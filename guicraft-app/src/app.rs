//! Application state for the Guicraft command line.
//!
//! [`Guicraft`] wires the shared element registry, the preview cache and the
//! plugin sandbox together and executes one [`CliCommand`] against them.

use crate::CliCommand;
use anyhow::{anyhow, Context, Result};
use guicraft_core::bridge::LayoutFile;
use guicraft_core::imaging::write_png;
use guicraft_core::layout::Selection;
use guicraft_core::sandbox::{DirectoryPluginSource, SandboxLimits};
use guicraft_core::{
    Config, EditorSession, ElementRegistry, PluginLoadStatus, PluginSandbox, PreviewCache, Session,
};
use guicraft_inventory::InventoryPlugin;
use guicraft_plugin_api::Plugin;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// Maximum number of remembered layout files.
const MAX_RECENT_LAYOUTS: usize = 10;

/// Load the configuration from `path`, or from the default location.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let config = match path {
        Some(path) => Config::load_from_file(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => Config::load_or_default()?,
    };
    config.validate()?;
    Ok(config)
}

/// The loaded editor.
pub struct Guicraft {
    config: Config,
    registry: Arc<ElementRegistry>,
    previews: Arc<PreviewCache>,
    sandbox: PluginSandbox,
    plugin_status: Option<PluginLoadStatus>,
    /// Where user state is persisted; `None` keeps it in memory only
    session_path: Option<PathBuf>,
    session: Session,
}

impl Guicraft {
    /// Create the registry with the built-in elements already registered.
    pub fn new(config: Config) -> Result<Self> {
        let session_path = Session::session_file_path().ok();
        let session = Session::load();
        Self::with_session(config, session_path, session)
    }

    fn with_session(config: Config, session_path: Option<PathBuf>, session: Session) -> Result<Self> {
        let inventory = InventoryPlugin::new()?;
        let registry = Arc::new(ElementRegistry::new());
        registry.register_plugin(&inventory)?;
        info!(
            "Registered built-in elements from {} v{}",
            inventory.info().name,
            inventory.info().version
        );

        let previews = Arc::new(PreviewCache::new(
            registry.clone(),
            config.limits.max_preview_pixels,
        ));
        let sandbox = PluginSandbox::new(
            registry.clone(),
            previews.clone(),
            SandboxLimits::from(&config.plugins),
        )
        .with_builtins(inventory.elements().to_vec());

        Ok(Self {
            config,
            registry,
            previews,
            sandbox,
            plugin_status: None,
            session_path,
            session,
        })
    }

    /// Load script plugins from `directory`, or from the configured one when
    /// plugins are enabled.
    pub async fn load_plugins(&mut self, directory: Option<PathBuf>) {
        let directory = match directory {
            Some(directory) => directory,
            None if self.config.plugins.enabled => self.config.plugins.directory.clone(),
            None => {
                info!("Script plugins are disabled");
                return;
            }
        };
        info!("Loading plugins from {}", directory.display());
        let status = self
            .sandbox
            .load_from(&DirectoryPluginSource::new(directory))
            .await;
        self.plugin_status = Some(status);
    }

    pub fn run(&mut self, command: CliCommand) -> Result<()> {
        match command {
            CliCommand::Plugins => {
                print!("{}", self.plugin_summary());
                Ok(())
            }
            CliCommand::Elements => {
                print!("{}", self.element_listing());
                Ok(())
            }
            CliCommand::New {
                output,
                base,
                name,
                width,
                height,
            } => self.new_layout(&output, base, name, width, height),
            CliCommand::Check { file } => {
                print!("{}", self.check(&file)?);
                Ok(())
            }
            CliCommand::Render { file, output } => self.render(&file, &output),
            CliCommand::Preview { id, output } => self.preview(&id, &output),
        }
    }

    fn plugin_summary(&self) -> String {
        match &self.plugin_status {
            None => "Script plugins are disabled\n".to_string(),
            Some(PluginLoadStatus::Loading) => "Plugins are still loading\n".to_string(),
            Some(PluginLoadStatus::Errored { exception }) => {
                format!("Loading plugins failed: {}\n", exception)
            }
            Some(PluginLoadStatus::Loaded(report)) => {
                let mut out = format!(
                    "{} loaded, {} failed\n",
                    report.successful.len(),
                    report.errored.len()
                );
                for name in &report.successful {
                    out.push_str(&format!("  ok     {}\n", name));
                }
                for failure in &report.errored {
                    out.push_str(&format!("  failed {}\n", failure.name));
                    for line in failure.exception.lines() {
                        out.push_str(&format!("         {}\n", line));
                    }
                }
                out
            }
        }
    }

    fn element_listing(&self) -> String {
        let mut out = String::new();
        for element in self.registry.list_all() {
            let size = match element.definition.default_value() {
                Ok(default) => format!("{}x{}", default.width, default.height),
                Err(_) => "?".to_string(),
            };
            let keys: Vec<String> = element
                .definition
                .config_schema()
                .iter()
                .map(|(key, spec)| format!("{}:{}", key, spec.kind.type_name()))
                .collect();
            out.push_str(&format!(
                "{:<28} {:>9}  {:<16} {}\n",
                element.id,
                size,
                element.registerer,
                keys.join(" ")
            ));
        }
        out
    }

    fn new_layout(
        &mut self,
        output: &Path,
        base: Option<String>,
        name: Option<String>,
        width: Option<i64>,
        height: Option<i64>,
    ) -> Result<()> {
        let base = base.unwrap_or_else(|| self.config.editor.default_base_element.clone());
        let name = name.unwrap_or_else(|| self.config.editor.default_layout_name.clone());

        let mut editor = EditorSession::new(self.registry.clone(), &base)?;
        let current = editor.layout().base.rect;
        editor.new_layout(
            &base,
            &name,
            width.unwrap_or(current.width),
            height.unwrap_or(current.height),
        )?;

        LayoutFile::write(output, &editor.to_wire())?;
        self.remember(output);
        let rect = editor.layout().base.rect;
        println!(
            "Wrote {} ({} {}x{})",
            output.display(),
            base,
            rect.width,
            rect.height
        );
        Ok(())
    }

    fn open(&self, file: &Path) -> Result<EditorSession> {
        let wire = LayoutFile::read(file)?;
        let editor = EditorSession::open(
            self.registry.clone(),
            wire,
            self.config.limits.max_image_bytes,
        )?;
        Ok(editor)
    }

    fn check(&mut self, file: &Path) -> Result<String> {
        let wire = LayoutFile::read(file)?;
        let editor = EditorSession::open(
            self.registry.clone(),
            wire.clone(),
            self.config.limits.max_image_bytes,
        )?;
        self.remember(file);

        let layout = editor.layout();
        let mut out = format!(
            "{}: {} ({}x{}) with {} elements\n",
            file.display(),
            layout.base.id,
            layout.base.rect.width,
            layout.base.rect.height,
            layout.elements.len()
        );

        let stored = std::iter::once(&wire.base_element).chain(wire.elements.iter());
        let targets = std::iter::once(Selection::Base)
            .chain((0..layout.elements.len()).map(Selection::Element));
        for (stored, target) in stored.zip(targets) {
            let Some(element) = layout.get(target) else {
                continue;
            };
            if element.rect != stored.dimensions {
                let label = match target {
                    Selection::Base => "base".to_string(),
                    Selection::Element(index) => format!("element #{}", index),
                };
                out.push_str(&format!(
                    "  {} ({}) adjusted from {:?} to {:?}\n",
                    label, element.id, stored.dimensions, element.rect
                ));
            }
        }
        Ok(out)
    }

    fn render(&mut self, file: &Path, output: &Path) -> Result<()> {
        let editor = self.open(file)?;
        self.remember(file);
        let buffer = editor
            .with_render_limit(self.config.limits.max_render_pixels)
            .render_image()?;
        write_png(&buffer.into_image(), output)?;
        println!("Rendered {} to {}", file.display(), output.display());
        Ok(())
    }

    fn preview(&self, id: &str, output: &Path) -> Result<()> {
        let preview = self
            .previews
            .get_preview(id)
            .ok_or_else(|| anyhow!("No preview available for element {}", id))?;
        write_png(&preview, output)?;
        println!("Rendered preview of {} to {}", id, output.display());
        Ok(())
    }

    fn remember(&mut self, path: &Path) {
        let path = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        self.session.set_last_loaded_location(path, MAX_RECENT_LAYOUTS);
        if let Some(session_path) = &self.session_path {
            if let Err(e) = self.session.save_to_file(session_path) {
                warn!("Failed to save session: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn guicraft(dir: &Path) -> Guicraft {
        let mut config = Config::default();
        config.plugins.directory = dir.join("plugins");
        Guicraft::with_session(config, Some(dir.join("session.json")), Session::default()).unwrap()
    }

    #[test]
    fn test_builtins_listed() {
        let dir = tempdir().unwrap();
        let listing = guicraft(dir.path()).element_listing();
        assert!(listing.contains("slotElement"));
        assert!(listing.contains("background_file:file_input"));
        assert!(listing.contains("176x166"));
    }

    #[test]
    fn test_new_then_check_and_render() {
        let dir = tempdir().unwrap();
        let mut app = guicraft(dir.path());
        let layout = dir.path().join("furnace.mcgf");

        app.run(CliCommand::New {
            output: layout.clone(),
            base: Some("emptyInventoryElement".to_string()),
            name: Some("Furnace".to_string()),
            width: Some(4),
            height: None,
        })
        .unwrap();

        let report = app.check(&layout).unwrap();
        assert!(report.contains("emptyInventoryElement (8x166) with 0 elements"));

        let png = dir.path().join("furnace.png");
        app.run(CliCommand::Render {
            file: layout.clone(),
            output: png.clone(),
        })
        .unwrap();
        let image = guicraft_core::imaging::read_image(&png).unwrap();
        assert_eq!((image.width(), image.height()), (8, 166));

        let saved = Session::load_from_file(&dir.path().join("session.json")).unwrap();
        assert_eq!(saved.recent_layouts.len(), 1);
        assert!(saved.last_loaded_location.is_some());
    }

    #[test]
    fn test_check_reports_adjustments_and_missing() {
        let dir = tempdir().unwrap();
        let mut app = guicraft(dir.path());
        let file = dir.path().join("odd.mcgf");
        std::fs::write(
            &file,
            r#"{"baseElement":{"dimensions":{"x":5,"y":5,"width":40,"height":40},"id":"emptyInventoryElement","data":{},"name":""},
               "elements":[{"dimensions":{"x":30,"y":0,"width":1,"height":1},"id":"slotElement","data":{},"name":""}]}"#,
        )
        .unwrap();
        let report = app.check(&file).unwrap();
        assert!(report.contains("base (emptyInventoryElement) adjusted"));
        assert!(report.contains("element #0 (slotElement) adjusted"));

        let missing = dir.path().join("missing.mcgf");
        std::fs::write(
            &missing,
            r#"{"baseElement":{"dimensions":{"x":0,"y":0,"width":40,"height":40},"id":"furnace","data":{},"name":""},"elements":[]}"#,
        )
        .unwrap();
        let err = app.check(&missing).unwrap_err();
        assert!(err.to_string().contains("Unknown Element for the Base Element: furnace"));
    }

    #[test]
    fn test_render_refuses_huge_layouts() {
        let dir = tempdir().unwrap();
        let mut app = guicraft(dir.path());
        let file = dir.path().join("huge.mcgf");
        std::fs::write(
            &file,
            r#"{"baseElement":{"dimensions":{"x":0,"y":0,"width":100000,"height":100000},"id":"emptyInventoryElement","data":{},"name":""},"elements":[]}"#,
        )
        .unwrap();
        let output = dir.path().join("huge.png");
        let err = app.render(&file, &output).unwrap_err();
        assert!(err.to_string().contains("render limit"), "{}", err);
        assert!(!output.exists());
    }

    #[test]
    fn test_preview_of_unknown_element_fails() {
        let dir = tempdir().unwrap();
        let app = guicraft(dir.path());
        assert!(app.preview("nothing", &dir.path().join("x.png")).is_err());
        app.preview("slotElement", &dir.path().join("slot.png")).unwrap();
        assert!(dir.path().join("slot.png").exists());
    }

    #[tokio::test]
    async fn test_demo_plugins_load() {
        let dir = tempdir().unwrap();
        let mut app = guicraft(dir.path());
        let demos = Path::new(env!("CARGO_MANIFEST_DIR")).join("../demos/plugins");
        app.load_plugins(Some(demos)).await;

        let summary = app.plugin_summary();
        assert!(summary.starts_with("2 loaded, 0 failed"), "{}", summary);
        assert!(app.registry.contains("progressArrow"));
        assert!(app.registry.contains("titleBar"));
        app.preview("titleBar", &dir.path().join("bar.png")).unwrap();
    }

    #[tokio::test]
    async fn test_missing_plugin_directory_loads_nothing() {
        let dir = tempdir().unwrap();
        let mut app = guicraft(dir.path());
        app.load_plugins(None).await;
        assert_eq!(app.plugin_summary(), "0 loaded, 0 failed\n");
    }
}
