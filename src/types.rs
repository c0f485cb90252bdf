//! Core value types shared by the detector, coordinator and supervisor.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use chrono::{NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

/// Local wall-clock time at one-second resolution.
///
/// File modification times on most systems are second-resolution, so the
/// clock and the file system backend both truncate to whole seconds before
/// any window comparison.
pub type Timestamp = NaiveDateTime;

/// Drop the sub-second part of a timestamp.
pub fn truncate_to_second(ts: NaiveDateTime) -> Timestamp {
    ts.with_nanosecond(0).unwrap_or(ts)
}

/// Unique name of a loadable unit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnitId(String);

impl UnitId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UnitId {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl From<String> for UnitId {
    fn from(name: String) -> Self {
        Self(name)
    }
}

/// Version value read from a unit's build metadata.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Unit metadata: attribute name to its ordered values.
pub type Attributes = BTreeMap<String, Vec<String>>;

/// A unit currently loaded in the host, as enumerated on each tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedUnit {
    pub id: UnitId,
    /// Units without a known artifact path are never checked.
    pub path: Option<PathBuf>,
}

impl LoadedUnit {
    pub fn new(id: impl Into<UnitId>, path: Option<PathBuf>) -> Self {
        Self {
            id: id.into(),
            path,
        }
    }
}

/// Half-open interval `[from, to)` checked by one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub from: Timestamp,
    pub to: Timestamp,
}

impl TimeWindow {
    pub fn new(from: Timestamp, to: Timestamp) -> Self {
        Self { from, to }
    }

    /// Inclusive lower bound, exclusive upper bound.
    pub fn contains(&self, ts: Timestamp) -> bool {
        self.from <= ts && ts < self.to
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}, {})",
            self.from.format("%Y-%m-%d %H:%M:%S"),
            self.to.format("%Y-%m-%d %H:%M:%S")
        )
    }
}

/// Classification of one unit during a scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckResult {
    /// Modified inside the window; handed to the coordinator.
    Reload,
    /// Reload was attempted during this tick.
    Reloaded(Outcome),
    Unmodified,
    /// Artifact no longer exists on disk.
    Gone,
    ReadError(String),
}

impl CheckResult {
    pub fn is_reload_candidate(&self) -> bool {
        matches!(self, CheckResult::Reload)
    }
}

/// Result of running a unit's self test after a reload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelfTest {
    Passed,
    Failed(String),
}

/// Result of one reload attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Reloaded {
        unit: UnitId,
        self_test: Option<SelfTest>,
    },
    ReloadFailed {
        unit: UnitId,
        reason: String,
    },
}

impl Outcome {
    pub fn unit(&self) -> &UnitId {
        match self {
            Outcome::Reloaded { unit, .. } | Outcome::ReloadFailed { unit, .. } => unit,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Reloaded { .. })
    }
}

/// Everything one tick saw and did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickReport {
    pub window: TimeWindow,
    pub results: Vec<(UnitId, CheckResult)>,
}

impl TickReport {
    /// Outcomes of the reloads attempted in this tick, in scan order.
    pub fn outcomes(&self) -> Vec<&Outcome> {
        self.results
            .iter()
            .filter_map(|(_, result)| match result {
                CheckResult::Reloaded(outcome) => Some(outcome),
                _ => None,
            })
            .collect()
    }

    pub fn reloaded_count(&self) -> usize {
        self.outcomes().iter().filter(|o| o.is_success()).count()
    }

    pub fn failed_count(&self) -> usize {
        self.outcomes().iter().filter(|o| !o.is_success()).count()
    }
}
