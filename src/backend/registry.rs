//! File-backed unit loader.
//!
//! Units are JSON artifact files. Loading a unit parses its artifact and
//! keeps the declared attributes in memory; the loaded copy stays as it
//! was until the unit is reloaded, so the in-memory and on-disk versions
//! can diverge the same way they do for compiled code.
//!
//! A unit holds at most two copies: the current one and the one it
//! replaced. Eviction discards the replaced copy and a load refuses to run
//! while one is still resident. A load that fails leaves the current copy
//! in place.
//!
//! ```json
//! { "attributes": { "vsn": ["3"] }, "self_test": "pass" }
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use super::UnitLoader;
use crate::reload::{ReloadError, ReloadResult};
use crate::types::{Attributes, LoadedUnit, UnitId};

/// Outcome an artifact declares for its self test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelfTestSpec {
    Pass,
    Fail,
}

/// On-disk artifact format.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    #[serde(default)]
    pub attributes: Attributes,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub self_test: Option<SelfTestSpec>,
}

impl Artifact {
    /// Read and parse an artifact without loading it.
    pub fn read(path: &Path) -> ReloadResult<Self> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ReloadError::from_io(path, &e))?;
        serde_json::from_str(&content).map_err(|e| ReloadError::Artifact {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Serialize the artifact to `path`.
    pub fn write(&self, path: &Path) -> ReloadResult<()> {
        let json = serde_json::to_string_pretty(self).map_err(|e| ReloadError::Artifact {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        std::fs::write(path, json).map_err(|e| ReloadError::from_io(path, &e))
    }
}

#[derive(Debug)]
struct Entry {
    path: Option<PathBuf>,
    loaded: Option<Artifact>,
    previous: Option<Artifact>,
    /// Number of successful loads.
    generation: u64,
}

/// In-process [`UnitLoader`] over a set of artifact files.
#[derive(Debug, Default)]
pub struct ArtifactRegistry {
    units: RwLock<BTreeMap<UnitId, Entry>>,
}

impl ArtifactRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make a unit known without loading it.
    pub fn register(&self, unit: impl Into<UnitId>, path: impl Into<PathBuf>) {
        let mut units = self.units.write();
        units.insert(
            unit.into(),
            Entry {
                path: Some(path.into()),
                loaded: None,
                previous: None,
                generation: 0,
            },
        );
    }

    /// Add a loaded unit that has no artifact on disk.
    ///
    /// Such units are listed as loaded but never checked for changes.
    pub fn register_builtin(&self, unit: impl Into<UnitId>, attributes: Attributes) {
        let mut units = self.units.write();
        units.insert(
            unit.into(),
            Entry {
                path: None,
                loaded: Some(Artifact {
                    attributes,
                    self_test: None,
                }),
                previous: None,
                generation: 1,
            },
        );
    }

    /// Register and load every artifact in `dir` with the given extension.
    ///
    /// The unit id is the file stem. Artifacts that fail to load stay
    /// registered but unloaded; they are skipped with a warning.
    pub fn load_dir(&self, dir: &Path, extension: &str) -> ReloadResult<Vec<UnitId>> {
        let entries = std::fs::read_dir(dir).map_err(|e| ReloadError::from_io(dir, &e))?;

        let mut paths: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_file())
            .filter(|path| path.extension().is_some_and(|ext| ext == extension))
            .collect();
        paths.sort();

        let mut loaded = Vec::new();
        for path in paths {
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let unit = UnitId::new(stem);
            self.register(unit.clone(), path.clone());
            match self.load(&unit) {
                Ok(()) => loaded.push(unit),
                Err(e) => crate::warn_event!("registry", "skipping", "{}: {e}", path.display()),
            }
        }

        crate::log_event!(
            "registry",
            "loaded",
            "{} units from {}",
            loaded.len(),
            dir.display()
        );
        Ok(loaded)
    }

    pub fn is_loaded(&self, unit: &UnitId) -> bool {
        self.units
            .read()
            .get(unit)
            .is_some_and(|entry| entry.loaded.is_some())
    }

    /// How many times the unit has been loaded successfully.
    pub fn generation(&self, unit: &UnitId) -> Option<u64> {
        self.units.read().get(unit).map(|entry| entry.generation)
    }
}

impl UnitLoader for ArtifactRegistry {
    fn list_loaded(&self) -> ReloadResult<Vec<LoadedUnit>> {
        Ok(self
            .units
            .read()
            .iter()
            .filter(|(_, entry)| entry.loaded.is_some())
            .map(|(id, entry)| LoadedUnit::new(id.clone(), entry.path.clone()))
            .collect())
    }

    fn evict(&self, unit: &UnitId) {
        if let Some(entry) = self.units.write().get_mut(unit) {
            entry.previous = None;
        }
    }

    fn load(&self, unit: &UnitId) -> ReloadResult<()> {
        let path = {
            let units = self.units.read();
            let entry = units.get(unit).ok_or_else(|| ReloadError::LoadFailure {
                unit: unit.clone(),
                reason: "unknown unit".to_string(),
            })?;
            if entry.previous.is_some() {
                return Err(ReloadError::LoadFailure {
                    unit: unit.clone(),
                    reason: "previous copy still resident".to_string(),
                });
            }
            match &entry.path {
                Some(path) => path.clone(),
                // Built-in units are always loaded.
                None if entry.loaded.is_some() => return Ok(()),
                None => {
                    return Err(ReloadError::LoadFailure {
                        unit: unit.clone(),
                        reason: "no artifact path".to_string(),
                    });
                }
            }
        };

        let artifact = Artifact::read(&path).map_err(|e| ReloadError::LoadFailure {
            unit: unit.clone(),
            reason: e.to_string(),
        })?;

        if let Some(entry) = self.units.write().get_mut(unit) {
            entry.previous = entry.loaded.replace(artifact);
            entry.generation += 1;
        }
        Ok(())
    }

    fn read_metadata(&self, unit: &UnitId) -> ReloadResult<Attributes> {
        self.units
            .read()
            .get(unit)
            .and_then(|entry| entry.loaded.as_ref())
            .map(|artifact| artifact.attributes.clone())
            .ok_or_else(|| ReloadError::LoadFailure {
                unit: unit.clone(),
                reason: "unit is not loaded".to_string(),
            })
    }

    fn read_on_disk_metadata(&self, path: &Path) -> ReloadResult<Attributes> {
        Artifact::read(path).map(|artifact| artifact.attributes)
    }

    fn self_test(&self, unit: &UnitId) -> Option<Result<(), String>> {
        let units = self.units.read();
        let spec = units.get(unit)?.loaded.as_ref()?.self_test?;
        Some(match spec {
            SelfTestSpec::Pass => Ok(()),
            SelfTestSpec::Fail => Err(format!("self test of '{unit}' reported failure")),
        })
    }
}
