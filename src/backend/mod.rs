//! Collaborator interfaces consumed by the reloader.
//!
//! The host process owns the set of loaded units and the mechanics of
//! purging and loading them; the reloader only reads that state and asks
//! for reloads through these traits.
//!
//! # Architecture
//!
//! ```text
//! PeriodicSupervisor
//!   - Clock        (wall-clock ticks)
//!   - FileSystem   (artifact mtimes)
//!   - UnitLoader   (enumerate, evict, load, metadata)
//! ```

mod clock;
mod fs;
pub mod registry;

use std::path::Path;

pub use clock::{Clock, ManualClock, SystemClock};
pub use fs::{FileSystem, LocalFileSystem};
pub use registry::ArtifactRegistry;

use crate::reload::ReloadResult;
use crate::types::{Attributes, LoadedUnit, UnitId};

/// The host's unit-loading mechanism.
///
/// Implementations must be cheap to call repeatedly: the unit list is
/// enumerated fresh on every tick and never cached by the reloader.
pub trait UnitLoader: Send + Sync {
    /// All currently loaded units, with their artifact path when known.
    fn list_loaded(&self) -> ReloadResult<Vec<LoadedUnit>>;

    /// Discard whatever a new load would supersede. Evicting an unloaded
    /// unit is a no-op.
    fn evict(&self, unit: &UnitId);

    /// Load a unit fresh from its artifact. Called right after `evict`.
    /// A unit whose load fails should stay listed if its old version is
    /// still running, so a later tick can retry it.
    fn load(&self, unit: &UnitId) -> ReloadResult<()>;

    /// Metadata of the currently loaded, in-memory unit.
    fn read_metadata(&self, unit: &UnitId) -> ReloadResult<Attributes>;

    /// Metadata of an artifact on disk, without loading it.
    fn read_on_disk_metadata(&self, path: &Path) -> ReloadResult<Attributes>;

    /// Run the unit's self test, if it declares one.
    fn self_test(&self, _unit: &UnitId) -> Option<Result<(), String>> {
        None
    }
}
