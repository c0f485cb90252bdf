//! Handle to a running reloader service.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::types::{Outcome, TickReport, UnitId};

use super::service::Reloader;
use super::supervisor::{Command, ServiceStatus};
use super::{ReloadError, ReloadResult};

/// Controls the periodic service and runs on-demand checks.
///
/// Dropping every handle stops the service as well.
pub struct ReloaderHandle {
    commands: mpsc::Sender<Command>,
    reloader: Arc<Reloader>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl ReloaderHandle {
    pub(crate) fn new(
        commands: mpsc::Sender<Command>,
        reloader: Arc<Reloader>,
        task: JoinHandle<()>,
    ) -> Self {
        Self {
            commands,
            reloader,
            task: Mutex::new(Some(task)),
        }
    }

    /// Stop the service and wait until it has shut down.
    ///
    /// A tick already running completes first. Stopping a stopped service
    /// is a no-op.
    pub async fn stop(&self) -> ReloadResult<()> {
        let (ack, acked) = oneshot::channel();
        if self.commands.send(Command::Stop(ack)).await.is_ok() {
            let _ = acked.await;
        }

        let task = self.task.lock().take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                crate::error_event!("supervisor", "task ended abnormally", "{e}");
            }
        }
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        !self.commands.is_closed()
    }

    /// Change the interval used for future re-arms.
    ///
    /// The deadline already armed is kept; the new interval applies from
    /// the tick after it.
    pub async fn set_check_interval(&self, ms: u64) -> ReloadResult<()> {
        if ms == 0 {
            return Err(ReloadError::InvalidInterval);
        }
        self.send(Command::SetInterval(Duration::from_millis(ms)))
            .await
    }

    /// Interval used for the next re-arm.
    pub async fn check_interval(&self) -> ReloadResult<Duration> {
        let (reply, response) = oneshot::channel();
        self.send(Command::CheckInterval(reply)).await?;
        response.await.map_err(|_| ReloadError::ServiceStopped)
    }

    pub async fn status(&self) -> ReloadResult<ServiceStatus> {
        let (reply, response) = oneshot::channel();
        self.send(Command::Status(reply)).await?;
        response.await.map_err(|_| ReloadError::ServiceStopped)
    }

    /// Run a tick now, outside the timer.
    ///
    /// Uses and advances the same watermark as timer ticks; the armed
    /// deadline is unchanged.
    pub async fn tick_now(&self) -> ReloadResult<TickReport> {
        let (reply, response) = oneshot::channel();
        self.send(Command::TickNow(reply)).await?;
        response.await.map_err(|_| ReloadError::ServiceStopped)?
    }

    /// Loaded units whose in-memory and on-disk versions differ.
    pub fn list_changed_units(&self) -> Vec<UnitId> {
        self.reloader.list_changed_units()
    }

    pub fn is_unit_changed(&self, unit: &UnitId) -> bool {
        self.reloader.is_unit_changed(unit)
    }

    /// Forced reload of `units` in order, ignoring tick windows.
    ///
    /// Runs inside the service loop while it is running so it cannot
    /// interleave with a tick; after a stop it runs directly.
    pub async fn reload_units(&self, units: Vec<UnitId>) -> Vec<Outcome> {
        let (reply, response) = oneshot::channel();
        let command = Command::Reload {
            units: units.clone(),
            reply,
        };

        if self.commands.send(command).await.is_ok() {
            if let Ok(outcomes) = response.await {
                return outcomes;
            }
        }
        self.reloader.reload_units(&units)
    }

    pub async fn reload_all_changed(&self) -> Vec<Outcome> {
        let changed = self.list_changed_units();
        if changed.is_empty() {
            return Vec::new();
        }
        self.reload_units(changed).await
    }

    async fn send(&self, command: Command) -> ReloadResult<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| ReloadError::ServiceStopped)
    }
}
