//! In-memory collaborators for unit tests.

use std::collections::{HashMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use parking_lot::Mutex;

use crate::backend::{FileSystem, UnitLoader};
use crate::reload::{ReloadError, ReloadResult};
use crate::types::{Attributes, LoadedUnit, Timestamp, UnitId};

pub fn at(h: u32, m: u32, s: u32) -> Timestamp {
    NaiveDate::from_ymd_opt(2024, 5, 1)
        .unwrap()
        .and_hms_opt(h, m, s)
        .unwrap()
}

pub fn vsn(value: &str) -> Attributes {
    let mut attributes = Attributes::new();
    attributes.insert("vsn".to_string(), vec![value.to_string()]);
    attributes
}

#[derive(Default)]
pub struct FakeLoader {
    units: Mutex<Vec<LoadedUnit>>,
    loaded: Mutex<HashMap<UnitId, Attributes>>,
    on_disk: Mutex<HashMap<PathBuf, Attributes>>,
    failing: Mutex<HashSet<UnitId>>,
    self_tests: Mutex<HashMap<UnitId, Result<(), String>>>,
    list_error: Mutex<Option<String>>,
    panic_on_list: Mutex<bool>,
    calls: Mutex<Vec<String>>,
}

impl FakeLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, unit: &str, path: Option<&str>, loaded: Attributes) {
        self.units
            .lock()
            .push(LoadedUnit::new(unit, path.map(PathBuf::from)));
        self.loaded.lock().insert(unit.into(), loaded);
    }

    pub fn set_on_disk(&self, path: &str, attributes: Attributes) {
        self.on_disk.lock().insert(PathBuf::from(path), attributes);
    }

    pub fn fail_load(&self, unit: &str) {
        self.failing.lock().insert(unit.into());
    }

    pub fn set_self_test(&self, unit: &str, result: Result<(), String>) {
        self.self_tests.lock().insert(unit.into(), result);
    }

    pub fn fail_listing(&self, reason: &str) {
        *self.list_error.lock() = Some(reason.to_string());
    }

    pub fn panic_on_listing(&self, enabled: bool) {
        *self.panic_on_list.lock() = enabled;
    }

    pub fn clear_listing_failure(&self) {
        *self.list_error.lock() = None;
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    /// Units passed to `load`, in call order.
    pub fn loads(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| c.strip_prefix("load:").map(str::to_string))
            .collect()
    }
}

impl UnitLoader for FakeLoader {
    fn list_loaded(&self) -> ReloadResult<Vec<LoadedUnit>> {
        if *self.panic_on_list.lock() {
            panic!("loader exploded");
        }
        if let Some(reason) = self.list_error.lock().clone() {
            return Err(ReloadError::Io {
                path: PathBuf::from("<loader>"),
                reason,
            });
        }
        Ok(self.units.lock().clone())
    }

    fn evict(&self, unit: &UnitId) {
        self.calls.lock().push(format!("evict:{unit}"));
    }

    fn load(&self, unit: &UnitId) -> ReloadResult<()> {
        self.calls.lock().push(format!("load:{unit}"));
        if self.failing.lock().contains(unit) {
            return Err(ReloadError::LoadFailure {
                unit: unit.clone(),
                reason: "badfile".to_string(),
            });
        }
        Ok(())
    }

    fn read_metadata(&self, unit: &UnitId) -> ReloadResult<Attributes> {
        self.loaded
            .lock()
            .get(unit)
            .cloned()
            .ok_or_else(|| ReloadError::NoVersionTag { unit: unit.clone() })
    }

    fn read_on_disk_metadata(&self, path: &Path) -> ReloadResult<Attributes> {
        self.on_disk
            .lock()
            .get(path)
            .cloned()
            .ok_or_else(|| ReloadError::FileNotFound {
                path: path.to_path_buf(),
            })
    }

    fn self_test(&self, unit: &UnitId) -> Option<Result<(), String>> {
        self.self_tests.lock().get(unit).cloned()
    }
}

#[derive(Default)]
pub struct FakeFs {
    entries: Mutex<HashMap<PathBuf, Result<Timestamp, io::ErrorKind>>>,
}

impl FakeFs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_mtime(&self, path: &str, mtime: Timestamp) {
        self.entries.lock().insert(PathBuf::from(path), Ok(mtime));
    }

    pub fn set_error(&self, path: &str, kind: io::ErrorKind) {
        self.entries.lock().insert(PathBuf::from(path), Err(kind));
    }
}

impl FileSystem for FakeFs {
    fn stat(&self, path: &Path) -> io::Result<Timestamp> {
        match self.entries.lock().get(path) {
            Some(Ok(mtime)) => Ok(*mtime),
            Some(Err(kind)) => Err(io::Error::new(*kind, format!("{kind:?}"))),
            None => Err(io::Error::new(io::ErrorKind::NotFound, "no such file")),
        }
    }
}
