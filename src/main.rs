use clap::Parser;

use reloader::Settings;
use reloader::cli::commands;
use reloader::cli::{Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let mut config = match &cli.config {
        Some(path) => Settings::load_from(path),
        None => Settings::load(),
    }
    .unwrap_or_else(|e| {
        eprintln!("Configuration error: {e}");
        eprintln!("Using default configuration for now.");
        Settings::default()
    });

    reloader::logging::init_with_config(&config.logging);

    match cli.command {
        Commands::Init { force } => commands::init::run_init(force),
        Commands::Config => commands::init::run_config(&config),
        Commands::Watch {
            dir,
            interval_ms,
            extension,
        } => {
            // Override config with CLI args
            if let Some(ms) = interval_ms {
                config.check_interval_ms = ms;
            }
            if let Some(ext) = extension {
                config.artifacts.extension = ext;
            }
            commands::watch::run(&dir, &config).await
        }
        Commands::Status { dir, extension } => {
            if let Some(ext) = extension {
                config.artifacts.extension = ext;
            }
            commands::status::run(&dir, &config)
        }
    }
}
