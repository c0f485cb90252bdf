//! Reloader core and its builder.

use std::sync::Arc;
use std::time::Duration;

use crate::backend::{Clock, FileSystem, LocalFileSystem, SystemClock, UnitLoader};
use crate::config::Settings;
use crate::types::{CheckResult, Outcome, TickReport, TimeWindow, UnitId};

use super::coordinator::ReloadCoordinator;
use super::detector::ChangeDetector;
use super::handle::ReloaderHandle;
use super::oracle::{DEFAULT_VERSION_ATTRIBUTE, VersionOracle};
use super::supervisor::PeriodicSupervisor;
use super::{ReloadError, ReloadResult};

/// Interval used by [`Reloader::start_default`].
pub const DEFAULT_CHECK_INTERVAL_MS: u64 = 2000;

/// Change detection and reloading over one set of collaborators.
///
/// Usable on its own for one-off checks and forced reloads; the periodic
/// service is started with [`Reloader::builder`] or [`Reloader::start`].
pub struct Reloader {
    oracle: VersionOracle,
    detector: ChangeDetector,
    coordinator: ReloadCoordinator,
}

impl Reloader {
    pub fn new(
        loader: Arc<dyn UnitLoader>,
        fs: Arc<dyn FileSystem>,
        version_attribute: impl Into<String>,
        run_self_tests: bool,
    ) -> Self {
        Self {
            oracle: VersionOracle::new(loader.clone(), version_attribute),
            detector: ChangeDetector::new(loader.clone(), fs),
            coordinator: ReloadCoordinator::new(loader, run_self_tests),
        }
    }

    /// Create a builder for the periodic service.
    pub fn builder(loader: Arc<dyn UnitLoader>) -> ReloaderBuilder {
        ReloaderBuilder::new(loader)
    }

    /// Start the periodic service with the local file system and clock.
    pub fn start(
        loader: Arc<dyn UnitLoader>,
        check_interval_ms: u64,
    ) -> ReloadResult<ReloaderHandle> {
        Self::builder(loader)
            .check_interval_ms(check_interval_ms)
            .start()
    }

    /// Start the periodic service checking every 2000ms.
    pub fn start_default(loader: Arc<dyn UnitLoader>) -> ReloadResult<ReloaderHandle> {
        Self::start(loader, DEFAULT_CHECK_INTERVAL_MS)
    }

    /// Loaded units whose in-memory and on-disk versions differ.
    pub fn list_changed_units(&self) -> Vec<UnitId> {
        self.oracle.changed_units()
    }

    pub fn is_unit_changed(&self, unit: &UnitId) -> bool {
        self.oracle.is_changed(unit)
    }

    /// Forced reload, independent of any time window.
    pub fn reload_units(&self, units: &[UnitId]) -> Vec<Outcome> {
        self.coordinator.reload_all(units)
    }

    pub fn reload_all_changed(&self) -> Vec<Outcome> {
        let changed = self.list_changed_units();
        self.reload_units(&changed)
    }

    /// Scan `window` and reload every unit modified inside it.
    pub fn tick(&self, window: &TimeWindow) -> ReloadResult<TickReport> {
        let mut results = self.detector.scan(window)?;

        let candidates: Vec<UnitId> = results
            .iter()
            .filter(|(_, result)| result.is_reload_candidate())
            .map(|(id, _)| id.clone())
            .collect();

        if !candidates.is_empty() {
            let mut outcomes = self.coordinator.reload_all(&candidates).into_iter();
            for (_, result) in results.iter_mut() {
                if result.is_reload_candidate() {
                    if let Some(outcome) = outcomes.next() {
                        *result = CheckResult::Reloaded(outcome);
                    }
                }
            }
        }

        Ok(TickReport {
            window: *window,
            results,
        })
    }
}

/// Configures and starts the periodic service.
pub struct ReloaderBuilder {
    loader: Arc<dyn UnitLoader>,
    fs: Arc<dyn FileSystem>,
    clock: Arc<dyn Clock>,
    check_interval_ms: u64,
    version_attribute: String,
    run_self_tests: bool,
}

impl ReloaderBuilder {
    pub fn new(loader: Arc<dyn UnitLoader>) -> Self {
        Self {
            loader,
            fs: Arc::new(LocalFileSystem),
            clock: Arc::new(SystemClock),
            check_interval_ms: DEFAULT_CHECK_INTERVAL_MS,
            version_attribute: DEFAULT_VERSION_ATTRIBUTE.to_string(),
            run_self_tests: true,
        }
    }

    /// Take interval, version attribute and self-test flag from settings.
    pub fn with_settings(mut self, settings: &Settings) -> Self {
        self.check_interval_ms = settings.check_interval_ms;
        self.version_attribute = settings.version_attribute.clone();
        self.run_self_tests = settings.run_self_tests;
        self
    }

    pub fn file_system(mut self, fs: Arc<dyn FileSystem>) -> Self {
        self.fs = fs;
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn check_interval_ms(mut self, ms: u64) -> Self {
        self.check_interval_ms = ms;
        self
    }

    pub fn version_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.version_attribute = attribute.into();
        self
    }

    pub fn run_self_tests(mut self, enabled: bool) -> Self {
        self.run_self_tests = enabled;
        self
    }

    /// Build the core without starting the periodic service.
    pub fn build(self) -> Reloader {
        Reloader::new(
            self.loader,
            self.fs,
            self.version_attribute,
            self.run_self_tests,
        )
    }

    /// Spawn the supervisor on the current tokio runtime.
    ///
    /// The watermark starts at the clock's current time and the first tick
    /// is armed one interval from now. Fails with
    /// [`ReloadError::NoRuntime`] outside a runtime.
    pub fn start(self) -> ReloadResult<ReloaderHandle> {
        if self.check_interval_ms == 0 {
            return Err(ReloadError::InvalidInterval);
        }
        let runtime =
            tokio::runtime::Handle::try_current().map_err(|_| ReloadError::NoRuntime)?;
        let interval = Duration::from_millis(self.check_interval_ms);
        let clock = self.clock.clone();
        let reloader = Arc::new(self.build());

        let (supervisor, commands) = PeriodicSupervisor::new(reloader.clone(), clock, interval);
        let task = runtime.spawn(supervisor.run());

        Ok(ReloaderHandle::new(commands, reloader, task))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reload::testing::{FakeFs, FakeLoader, at, vsn};

    fn reloader(loader: &Arc<FakeLoader>, fs: &Arc<FakeFs>) -> Reloader {
        Reloader::builder(loader.clone())
            .file_system(fs.clone())
            .build()
    }

    #[test]
    fn test_tick_reloads_candidates_in_scan_order() {
        let loader = Arc::new(FakeLoader::new());
        let fs = Arc::new(FakeFs::new());
        loader.add("a", Some("/u/a.json"), vsn("1"));
        loader.add("b", Some("/u/b.json"), vsn("1"));
        loader.add("c", Some("/u/c.json"), vsn("1"));
        fs.set_mtime("/u/a.json", at(10, 0, 1));
        fs.set_mtime("/u/b.json", at(9, 0, 0));
        fs.set_mtime("/u/c.json", at(10, 0, 0));
        loader.fail_load("c");

        let report = reloader(&loader, &fs)
            .tick(&TimeWindow::new(at(10, 0, 0), at(10, 0, 2)))
            .unwrap();

        assert_eq!(loader.loads(), vec!["a", "c"]);
        assert_eq!(report.results[1].1, CheckResult::Unmodified);
        assert_eq!(report.reloaded_count(), 1);
        assert_eq!(report.failed_count(), 1);
        assert!(matches!(
            &report.results[2].1,
            CheckResult::Reloaded(Outcome::ReloadFailed { .. })
        ));
    }

    #[test]
    fn test_unmodified_units_are_never_reloaded() {
        let loader = Arc::new(FakeLoader::new());
        let fs = Arc::new(FakeFs::new());
        loader.add("stable", Some("/u/stable.json"), vsn("1"));
        fs.set_mtime("/u/stable.json", at(8, 0, 0));
        let reloader = reloader(&loader, &fs);

        for second in 0..30 {
            let from = at(10, 0, second);
            let to = at(10, 0, second + 1);
            reloader.tick(&TimeWindow::new(from, to)).unwrap();
        }

        assert!(loader.loads().is_empty());
    }

    #[test]
    fn test_reload_all_changed_uses_fingerprints() {
        let loader = Arc::new(FakeLoader::new());
        let fs = Arc::new(FakeFs::new());
        loader.add("a", Some("/u/a.json"), vsn("1"));
        loader.add("b", Some("/u/b.json"), vsn("1"));
        loader.set_on_disk("/u/a.json", vsn("1"));
        loader.set_on_disk("/u/b.json", vsn("2"));

        let outcomes = reloader(&loader, &fs).reload_all_changed();

        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].unit().as_str(), "b");
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_default_checks_every_two_seconds() {
        let loader = Arc::new(FakeLoader::new());
        let handle = Reloader::start_default(loader).unwrap();

        let status = handle.status().await.unwrap();
        assert_eq!(status.check_interval, Duration::from_millis(2000));
        assert_eq!(status.ticks, 0);

        handle.stop().await.unwrap();
    }

    #[test]
    fn test_start_outside_runtime_is_an_error() {
        let loader = Arc::new(FakeLoader::new());
        let result = Reloader::start(loader, 2000);
        assert!(matches!(result, Err(ReloadError::NoRuntime)));
    }

    #[tokio::test]
    async fn test_zero_interval_is_rejected() {
        let loader = Arc::new(FakeLoader::new());
        let result = Reloader::start(loader, 0);
        assert!(matches!(result, Err(ReloadError::InvalidInterval)));
    }
}
