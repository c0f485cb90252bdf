//! Change detection and hot reload of loaded units.
//!
//! # Architecture
//!
//! ```text
//! ReloaderHandle ──requests──> PeriodicSupervisor (one task)
//!                                 │ every tick: [watermark, now)
//!                                 v
//!                              Reloader
//!                    ┌────────────┼──────────────┐
//!             ChangeDetector ReloadCoordinator VersionOracle
//!              (mtime scan)   (evict + load)   (version tags)
//! ```

mod coordinator;
mod detector;
mod error;
mod handle;
mod oracle;
mod service;
mod supervisor;

#[cfg(test)]
pub(crate) mod testing;

pub use coordinator::ReloadCoordinator;
pub use detector::ChangeDetector;
pub use error::{ReloadError, ReloadResult};
pub use handle::ReloaderHandle;
pub use oracle::{DEFAULT_VERSION_ATTRIBUTE, VersionOracle};
pub use service::{DEFAULT_CHECK_INTERVAL_MS, Reloader, ReloaderBuilder};
pub use supervisor::ServiceStatus;
