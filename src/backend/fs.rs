//! File metadata access.

use std::io;
use std::path::Path;

use chrono::{DateTime, Local};

use crate::types::{Timestamp, truncate_to_second};

/// Reads artifact modification times.
pub trait FileSystem: Send + Sync {
    /// Modification time of `path` in local time, truncated to seconds.
    fn stat(&self, path: &Path) -> io::Result<Timestamp>;
}

/// [`FileSystem`] backed by `std::fs`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalFileSystem;

impl FileSystem for LocalFileSystem {
    fn stat(&self, path: &Path) -> io::Result<Timestamp> {
        let modified = std::fs::metadata(path)?.modified()?;
        let local: DateTime<Local> = modified.into();
        Ok(truncate_to_second(local.naive_local()))
    }
}
