//! Version fingerprints of loaded units and their artifacts.

use std::sync::Arc;

use crate::backend::UnitLoader;
use crate::types::{Attributes, Fingerprint, UnitId};

use super::{ReloadError, ReloadResult};

/// Attribute that carries a unit's version tag unless configured otherwise.
pub const DEFAULT_VERSION_ATTRIBUTE: &str = "vsn";

/// Compares the version tag of a loaded unit with the one on disk.
pub struct VersionOracle {
    loader: Arc<dyn UnitLoader>,
    attribute: String,
}

impl VersionOracle {
    pub fn new(loader: Arc<dyn UnitLoader>, attribute: impl Into<String>) -> Self {
        Self {
            loader,
            attribute: attribute.into(),
        }
    }

    /// Fingerprint of the in-memory unit.
    pub fn fingerprint_loaded(&self, unit: &UnitId) -> ReloadResult<Fingerprint> {
        let attributes = self.loader.read_metadata(unit)?;
        self.extract(unit, &attributes)
    }

    /// Fingerprint of the unit's artifact on disk, read without loading it.
    pub fn fingerprint_on_disk(&self, unit: &UnitId) -> ReloadResult<Fingerprint> {
        let path = self
            .loader
            .list_loaded()?
            .into_iter()
            .find(|loaded| &loaded.id == unit)
            .and_then(|loaded| loaded.path)
            .ok_or_else(|| ReloadError::NoVersionTag { unit: unit.clone() })?;

        let attributes = self.loader.read_on_disk_metadata(&path)?;
        self.extract(unit, &attributes)
    }

    /// True only when both fingerprints are readable and differ.
    ///
    /// A missing or unreadable fingerprint means "no information" and
    /// never counts as a change.
    pub fn is_changed(&self, unit: &UnitId) -> bool {
        let loaded = match self.fingerprint_loaded(unit) {
            Ok(fp) => fp,
            Err(e) => {
                crate::debug_event!("oracle", "no loaded fingerprint", "{unit}: {e}");
                return false;
            }
        };
        let on_disk = match self.fingerprint_on_disk(unit) {
            Ok(fp) => fp,
            Err(e) => {
                crate::debug_event!("oracle", "no on-disk fingerprint", "{unit}: {e}");
                return false;
            }
        };
        loaded != on_disk
    }

    /// Every loaded unit with an artifact whose fingerprint differs.
    pub fn changed_units(&self) -> Vec<UnitId> {
        let units = match self.loader.list_loaded() {
            Ok(units) => units,
            Err(e) => {
                crate::warn_event!("oracle", "cannot enumerate loaded units", "{e}");
                return Vec::new();
            }
        };

        units
            .into_iter()
            .filter(|unit| unit.path.is_some())
            .map(|unit| unit.id)
            .filter(|id| self.is_changed(id))
            .collect()
    }

    fn extract(&self, unit: &UnitId, attributes: &Attributes) -> ReloadResult<Fingerprint> {
        match attributes.get(&self.attribute) {
            Some(values) if !values.is_empty() => Ok(Fingerprint::new(values.join(","))),
            _ => Err(ReloadError::NoVersionTag { unit: unit.clone() }),
        }
    }
}
