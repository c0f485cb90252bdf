//! CLI argument parsing using clap.

use clap::{
    Parser, Subcommand,
    builder::styling::{AnsiColor, Effects, Styles},
};
use std::path::PathBuf;

fn clap_cargo_style() -> Styles {
    Styles::styled()
        .header(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .usage(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .literal(AnsiColor::Green.on_default())
        .placeholder(AnsiColor::Green.on_default())
}

/// Hot reload service for loaded units
#[derive(Parser)]
#[command(
    name = "reloader",
    version = env!("CARGO_PKG_VERSION"),
    about = "Reload units whose artifacts change on disk",
    next_line_help = true,
    styles = clap_cargo_style()
)]
pub struct Cli {
    /// Path to custom settings.toml file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Initialize project
    #[command(about = "Set up .reloader directory with default configuration")]
    Init {
        /// Force overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Load a directory of artifacts and reload them as they change
    #[command(
        about = "Watch a directory of unit artifacts",
        after_help = "Examples:\n  reloader watch ./units\n  reloader watch ./units --interval-ms 500\n  RUST_LOG=info reloader watch ./units"
    )]
    Watch {
        /// Directory containing unit artifacts
        dir: PathBuf,

        /// Milliseconds between checks (overrides config)
        #[arg(short, long)]
        interval_ms: Option<u64>,

        /// Artifact file extension (overrides config)
        #[arg(short, long)]
        extension: Option<String>,
    },

    /// Show artifacts and their on-disk versions
    #[command(about = "List unit artifacts with modification time and version")]
    Status {
        /// Directory containing unit artifacts
        dir: PathBuf,

        /// Artifact file extension (overrides config)
        #[arg(short, long)]
        extension: Option<String>,
    },

    /// Show current configuration settings
    #[command(about = "Display active settings from .reloader/settings.toml")]
    Config,
}
