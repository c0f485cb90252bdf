//! Status command - list artifacts with their modification time and version.

use std::path::Path;
use std::sync::Arc;

use crate::backend::{ArtifactRegistry, FileSystem, LocalFileSystem, UnitLoader};
use crate::config::Settings;
use crate::reload::VersionOracle;

pub fn run(dir: &Path, settings: &Settings) -> anyhow::Result<()> {
    let registry = Arc::new(ArtifactRegistry::new());
    registry.load_dir(dir, &settings.artifacts.extension)?;
    let oracle = VersionOracle::new(registry.clone(), settings.version_attribute.clone());

    let units = registry.list_loaded()?;
    if units.is_empty() {
        println!("No loadable artifacts in {}", dir.display());
        return Ok(());
    }

    println!("{:<24} {:<20} VERSION", "UNIT", "MODIFIED");
    for unit in units {
        let modified = unit
            .path
            .as_deref()
            .map(|path| match LocalFileSystem.stat(path) {
                Ok(mtime) => mtime.format("%Y-%m-%d %H:%M:%S").to_string(),
                Err(e) => e.kind().to_string(),
            })
            .unwrap_or_else(|| "-".to_string());
        let version = match oracle.fingerprint_on_disk(&unit.id) {
            Ok(fp) => fp.to_string(),
            Err(e) => format!("({e})"),
        };
        println!("{:<24} {modified:<20} {version}", unit.id.as_str());
    }
    Ok(())
}
