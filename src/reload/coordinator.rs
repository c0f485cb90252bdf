//! Ordered batch reloads.

use std::sync::Arc;

use crate::backend::UnitLoader;
use crate::types::{Outcome, SelfTest, UnitId};

/// Evicts and reloads units through the host loader.
pub struct ReloadCoordinator {
    loader: Arc<dyn UnitLoader>,
    run_self_tests: bool,
}

impl ReloadCoordinator {
    pub fn new(loader: Arc<dyn UnitLoader>, run_self_tests: bool) -> Self {
        Self {
            loader,
            run_self_tests,
        }
    }

    /// Reload each unit in the given order.
    ///
    /// A failing unit is recorded and the batch moves on; the returned
    /// outcomes line up with `units`.
    pub fn reload_all(&self, units: &[UnitId]) -> Vec<Outcome> {
        units.iter().map(|unit| self.reload(unit)).collect()
    }

    /// Evict then load a single unit.
    pub fn reload(&self, unit: &UnitId) -> Outcome {
        self.loader.evict(unit);

        match self.loader.load(unit) {
            Ok(()) => {
                crate::log_event!("reload", "reloaded", "{unit}");
                let self_test = self.run_self_test(unit);
                Outcome::Reloaded {
                    unit: unit.clone(),
                    self_test,
                }
            }
            Err(e) => {
                crate::error_event!("reload", "failed", "{unit}: {e}");
                Outcome::ReloadFailed {
                    unit: unit.clone(),
                    reason: e.to_string(),
                }
            }
        }
    }

    fn run_self_test(&self, unit: &UnitId) -> Option<SelfTest> {
        if !self.run_self_tests {
            return None;
        }

        match self.loader.self_test(unit)? {
            Ok(()) => {
                crate::log_event!("reload", "self test passed", "{unit}");
                Some(SelfTest::Passed)
            }
            Err(reason) => {
                crate::error_event!("reload", "self test failed", "{unit}: {reason}");
                Some(SelfTest::Failed(reason))
            }
        }
    }
}
