//! Classifies loaded units by their artifact's modification time.

use std::io;
use std::sync::Arc;

use crate::backend::{FileSystem, UnitLoader};
use crate::types::{CheckResult, TimeWindow, UnitId};

use super::ReloadResult;

/// Scans loaded units against a time window.
pub struct ChangeDetector {
    loader: Arc<dyn UnitLoader>,
    fs: Arc<dyn FileSystem>,
}

impl ChangeDetector {
    pub fn new(loader: Arc<dyn UnitLoader>, fs: Arc<dyn FileSystem>) -> Self {
        Self { loader, fs }
    }

    /// Classify every loaded unit that has an artifact path.
    ///
    /// Per-unit failures are recorded in the unit's own slot and never stop
    /// the scan. Only failing to enumerate the loaded units is an error.
    pub fn scan(&self, window: &TimeWindow) -> ReloadResult<Vec<(UnitId, CheckResult)>> {
        let units = self.loader.list_loaded()?;
        let mut results = Vec::with_capacity(units.len());

        for unit in units {
            let Some(path) = unit.path else {
                continue;
            };

            let result = match self.fs.stat(&path) {
                Ok(mtime) if window.contains(mtime) => CheckResult::Reload,
                Ok(_) => CheckResult::Unmodified,
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    // Typically a build in progress removed the old artifact.
                    crate::log_event!("detector", "gone", "{} ({})", unit.id, path.display());
                    CheckResult::Gone
                }
                Err(e) => {
                    crate::error_event!(
                        "detector",
                        "cannot read file info",
                        "{} ({}): {e}",
                        unit.id,
                        path.display()
                    );
                    CheckResult::ReadError(e.to_string())
                }
            };

            results.push((unit.id, result));
        }

        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reload::testing::{FakeFs, FakeLoader, at, vsn};

    fn detector(loader: &Arc<FakeLoader>, fs: &Arc<FakeFs>) -> ChangeDetector {
        ChangeDetector::new(loader.clone(), fs.clone())
    }

    #[test]
    fn test_classifies_against_window() {
        let loader = Arc::new(FakeLoader::new());
        let fs = Arc::new(FakeFs::new());
        loader.add("old", Some("/u/old.json"), vsn("1"));
        loader.add("fresh", Some("/u/fresh.json"), vsn("1"));
        fs.set_mtime("/u/old.json", at(9, 0, 0));
        fs.set_mtime("/u/fresh.json", at(10, 0, 1));

        let window = TimeWindow::new(at(10, 0, 0), at(10, 0, 2));
        let results = detector(&loader, &fs).scan(&window).unwrap();

        assert_eq!(
            results,
            vec![
                (UnitId::new("old"), CheckResult::Unmodified),
                (UnitId::new("fresh"), CheckResult::Reload),
            ]
        );
    }

    #[test]
    fn test_boundary_belongs_to_next_window() {
        let loader = Arc::new(FakeLoader::new());
        let fs = Arc::new(FakeFs::new());
        loader.add("edge", Some("/u/edge.json"), vsn("1"));
        fs.set_mtime("/u/edge.json", at(10, 0, 2));
        let detector = detector(&loader, &fs);

        let first = detector
            .scan(&TimeWindow::new(at(10, 0, 0), at(10, 0, 2)))
            .unwrap();
        assert_eq!(first[0].1, CheckResult::Unmodified);

        let second = detector
            .scan(&TimeWindow::new(at(10, 0, 2), at(10, 0, 4)))
            .unwrap();
        assert_eq!(second[0].1, CheckResult::Reload);
    }

    #[test]
    fn test_gone_and_read_error_do_not_abort_scan() {
        let loader = Arc::new(FakeLoader::new());
        let fs = Arc::new(FakeFs::new());
        loader.add("missing", Some("/u/missing.json"), vsn("1"));
        loader.add("locked", Some("/u/locked.json"), vsn("1"));
        loader.add("fresh", Some("/u/fresh.json"), vsn("1"));
        fs.set_error("/u/locked.json", io::ErrorKind::PermissionDenied);
        fs.set_mtime("/u/fresh.json", at(10, 0, 1));

        let window = TimeWindow::new(at(10, 0, 0), at(10, 0, 2));
        let results = detector(&loader, &fs).scan(&window).unwrap();

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].1, CheckResult::Gone);
        assert!(matches!(results[1].1, CheckResult::ReadError(_)));
        assert_eq!(results[2].1, CheckResult::Reload);
    }

    #[test]
    fn test_units_without_path_are_skipped() {
        let loader = Arc::new(FakeLoader::new());
        let fs = Arc::new(FakeFs::new());
        loader.add("builtin", None, vsn("1"));
        loader.add("fresh", Some("/u/fresh.json"), vsn("1"));
        fs.set_mtime("/u/fresh.json", at(10, 0, 1));

        let window = TimeWindow::new(at(10, 0, 0), at(10, 0, 2));
        let results = detector(&loader, &fs).scan(&window).unwrap();

        assert_eq!(results, vec![(UnitId::new("fresh"), CheckResult::Reload)]);
    }

    #[test]
    fn test_enumeration_failure_is_an_error() {
        let loader = Arc::new(FakeLoader::new());
        let fs = Arc::new(FakeFs::new());
        loader.fail_listing("loader unavailable");

        let window = TimeWindow::new(at(10, 0, 0), at(10, 0, 2));
        assert!(detector(&loader, &fs).scan(&window).is_err());
    }
}
