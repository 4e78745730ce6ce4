//! # Guicraft
//!
//! Command line front end of the guicraft layout editor. It loads the
//! built-in elements and the script plugins, then creates, checks and renders
//! layout files.
//!
//! ## Usage
//!
//! ```bash
//! # Show which plugins load and which fail
//! guicraft plugins
//!
//! # Start a new layout from the player inventory
//! guicraft new furnace.mcgf --base normalInventoryElement --name Furnace
//!
//! # Render a layout to a PNG
//! guicraft render furnace.mcgf furnace.png
//!
//! # Use another plugin directory with debug logging
//! guicraft --plugins ./demos/plugins --debug elements
//! ```

use clap::{Arg, ArgMatches, Command};
use std::path::PathBuf;

mod app;

/// What to do once everything is loaded.
#[derive(Debug, Clone, PartialEq)]
pub enum CliCommand {
    /// Print the plugin load report
    Plugins,
    /// List the registered elements
    Elements,
    /// Write a fresh layout
    New {
        output: PathBuf,
        base: Option<String>,
        name: Option<String>,
        width: Option<i64>,
        height: Option<i64>,
    },
    /// Load and validate a layout
    Check { file: PathBuf },
    /// Render a layout to PNG
    Render { file: PathBuf, output: PathBuf },
    /// Render an element preview to PNG
    Preview { id: String, output: PathBuf },
}

/// Command line arguments for Guicraft
#[derive(Debug, Clone)]
pub struct AppArgs {
    /// Configuration file to use instead of the default one
    pub config_path: Option<PathBuf>,
    /// Plugin directory overriding the configured one
    pub plugins_dir: Option<PathBuf>,
    /// Enable debug logging
    pub debug: bool,
    pub command: CliCommand,
}

fn build_cli() -> Command {
    let path = |name: &'static str, help: &'static str| {
        Arg::new(name)
            .value_name("FILE")
            .help(help)
            .required(true)
            .value_parser(clap::value_parser!(PathBuf))
    };

    Command::new("guicraft")
        .version(env!("CARGO_PKG_VERSION"))
        .author("Guicraft Team")
        .about("Plugin-driven editor for pixel-art game GUI layouts")
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file to use")
                .global(true)
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("plugins")
                .short('p')
                .long("plugins")
                .value_name("DIR")
                .help("Directory to load script plugins from")
                .global(true)
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("debug")
                .short('d')
                .long("debug")
                .help("Enable debug logging")
                .global(true)
                .action(clap::ArgAction::SetTrue),
        )
        .subcommand(Command::new("plugins").about("Load plugins and print the outcome"))
        .subcommand(Command::new("elements").about("List every registered element"))
        .subcommand(
            Command::new("new")
                .about("Write a new, empty layout")
                .arg(path("output", "Layout file to create"))
                .arg(
                    Arg::new("base")
                        .short('b')
                        .long("base")
                        .value_name("ID")
                        .help("Element to use as the base"),
                )
                .arg(
                    Arg::new("name")
                        .short('n')
                        .long("name")
                        .value_name("NAME")
                        .help("Name of the base element"),
                )
                .arg(
                    Arg::new("width")
                        .long("width")
                        .value_name("PIXELS")
                        .help("Width of the base element")
                        .value_parser(clap::value_parser!(i64)),
                )
                .arg(
                    Arg::new("height")
                        .long("height")
                        .value_name("PIXELS")
                        .help("Height of the base element")
                        .value_parser(clap::value_parser!(i64)),
                ),
        )
        .subcommand(
            Command::new("check")
                .about("Load a layout and report problems")
                .arg(path("file", "Layout file to check")),
        )
        .subcommand(
            Command::new("render")
                .about("Render a layout to a PNG file")
                .arg(path("file", "Layout file to render"))
                .arg(path("output", "PNG file to write")),
        )
        .subcommand(
            Command::new("preview")
                .about("Render an element at its default size to a PNG file")
                .arg(Arg::new("id").value_name("ID").help("Element id").required(true))
                .arg(path("output", "PNG file to write")),
        )
}

fn path_arg(matches: &ArgMatches, name: &str) -> PathBuf {
    matches.get_one::<PathBuf>(name).cloned().unwrap_or_default()
}

fn command_from(matches: &ArgMatches) -> CliCommand {
    match matches.subcommand() {
        Some(("new", sub)) => CliCommand::New {
            output: path_arg(sub, "output"),
            base: sub.get_one::<String>("base").cloned(),
            name: sub.get_one::<String>("name").cloned(),
            width: sub.get_one::<i64>("width").copied(),
            height: sub.get_one::<i64>("height").copied(),
        },
        Some(("check", sub)) => CliCommand::Check {
            file: path_arg(sub, "file"),
        },
        Some(("render", sub)) => CliCommand::Render {
            file: path_arg(sub, "file"),
            output: path_arg(sub, "output"),
        },
        Some(("preview", sub)) => CliCommand::Preview {
            id: sub.get_one::<String>("id").cloned().unwrap_or_default(),
            output: path_arg(sub, "output"),
        },
        Some(("elements", _)) => CliCommand::Elements,
        _ => CliCommand::Plugins,
    }
}

/// Parse command line arguments
fn parse_args() -> AppArgs {
    args_from(build_cli().get_matches())
}

fn args_from(matches: ArgMatches) -> AppArgs {
    AppArgs {
        config_path: matches.get_one::<PathBuf>("config").cloned(),
        plugins_dir: matches.get_one::<PathBuf>("plugins").cloned(),
        debug: matches.get_flag("debug"),
        command: command_from(&matches),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = parse_args();
    let config = app::load_config(args.config_path.as_deref())?;

    let level = if args.debug { "debug" } else { config.logging.level.as_str() };
    guicraft_core::init_tracing_with_level(level);
    tracing::info!("Starting Guicraft v{}", env!("CARGO_PKG_VERSION"));

    let mut guicraft = app::Guicraft::new(config)?;
    guicraft.load_plugins(args.plugins_dir).await;
    guicraft.run(args.command)
}
