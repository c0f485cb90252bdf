//! Wall-clock source for tick windows.

use std::sync::Arc;

use chrono::{Duration, Local};
use parking_lot::Mutex;

use crate::types::{Timestamp, truncate_to_second};

/// Source of the current local wall-clock time.
pub trait Clock: Send + Sync {
    /// Current time, truncated to whole seconds.
    fn now(&self) -> Timestamp;
}

/// Reads the system's local time.
///
/// Local rather than UTC time is used so windows line up with the local
/// modification times reported by [`LocalFileSystem`](super::LocalFileSystem).
/// A daylight-saving transition can skip or repeat one window.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        truncate_to_second(Local::now().naive_local())
    }
}

/// Clock that only moves when told to. Used to drive ticks deterministically.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<Timestamp>>,
}

impl ManualClock {
    pub fn new(start: Timestamp) -> Self {
        Self {
            now: Arc::new(Mutex::new(truncate_to_second(start))),
        }
    }

    pub fn set(&self, ts: Timestamp) {
        *self.now.lock() = truncate_to_second(ts);
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock();
        *now = truncate_to_second(*now + by);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        *self.now.lock()
    }
}
