//! Periodic change detection and hot reload of loaded code units.
//!
//! A running host keeps a set of loaded units, each built from an artifact
//! on disk. The reloader checks those artifacts on a fixed interval and
//! reloads every unit whose artifact was modified since the previous
//! check, through the host's own loader.
//!
//! ```ignore
//! let loader = Arc::new(ArtifactRegistry::new());
//! loader.load_dir(Path::new("units"), "json")?;
//!
//! let handle = Reloader::start(loader, 2000)?;
//! // ...
//! handle.stop().await?;
//! ```

pub mod backend;
pub mod cli;
pub mod config;
pub mod logging;
pub mod reload;
pub mod types;

pub use backend::{ArtifactRegistry, Clock, FileSystem, LocalFileSystem, SystemClock, UnitLoader};
pub use config::Settings;
pub use reload::{
    ReloadError, ReloadResult, Reloader, ReloaderBuilder, ReloaderHandle, ServiceStatus,
};
pub use types::{
    Attributes, CheckResult, Fingerprint, LoadedUnit, Outcome, SelfTest, TickReport, TimeWindow,
    Timestamp, UnitId,
};
