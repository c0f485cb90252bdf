//! Watch command - run the reloader over a directory of artifacts.

use std::path::Path;
use std::sync::Arc;

use crate::backend::{ArtifactRegistry, UnitLoader};
use crate::config::Settings;
use crate::reload::Reloader;

/// Load every artifact in `dir` and reload on change until Ctrl-C.
pub async fn run(dir: &Path, settings: &Settings) -> anyhow::Result<()> {
    let registry = Arc::new(ArtifactRegistry::new());
    let units = registry.load_dir(dir, &settings.artifacts.extension)?;

    let handle = Reloader::builder(registry.clone())
        .with_settings(settings)
        .start()?;

    eprintln!(
        "Watching {} units in {} (every {}ms). Press Ctrl-C to stop.",
        units.len(),
        dir.display(),
        settings.check_interval_ms
    );

    tokio::signal::ctrl_c().await?;
    handle.stop().await?;

    let loaded = registry.list_loaded().map(|u| u.len()).unwrap_or_default();
    eprintln!("Stopped. {loaded} units loaded.");
    Ok(())
}
