//! Periodic check loop.
//!
//! A single task owns the interval, the watermark and the one outstanding
//! deadline. Timer ticks and handle requests are processed one at a time by
//! the same loop, so a tick never overlaps another tick or a request.
//!
//! ```text
//!            timer fires                 stop
//!   Idle ----------------> Ticking     Idle/Ticking ------> Stopped
//!    ^                        |
//!    +------- re-arm ---------+
//! ```

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::time::{Instant, sleep_until};

use crate::backend::Clock;
use crate::types::{Outcome, TickReport, TimeWindow, Timestamp, UnitId};

use super::service::Reloader;
use super::{ReloadError, ReloadResult};

/// Capacity of the request channel.
const COMMAND_BUFFER: usize = 32;

/// Requests accepted by the supervisor loop.
#[derive(Debug)]
pub(crate) enum Command {
    SetInterval(Duration),
    CheckInterval(oneshot::Sender<Duration>),
    Status(oneshot::Sender<ServiceStatus>),
    Reload {
        units: Vec<UnitId>,
        reply: oneshot::Sender<Vec<Outcome>>,
    },
    TickNow(oneshot::Sender<ReloadResult<TickReport>>),
    Stop(oneshot::Sender<()>),
}

/// Snapshot of the supervisor's state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceStatus {
    pub check_interval: Duration,
    /// Everything before this instant has been checked.
    pub watermark: Timestamp,
    /// Window of the most recent tick.
    pub last_window: Option<TimeWindow>,
    pub ticks: u64,
    pub failed_ticks: u64,
}

struct ServiceState {
    check_interval: Duration,
    watermark: Timestamp,
    deadline: Instant,
    last_window: Option<TimeWindow>,
    ticks: u64,
    failed_ticks: u64,
}

pub(crate) struct PeriodicSupervisor {
    reloader: Arc<Reloader>,
    clock: Arc<dyn Clock>,
    state: ServiceState,
    commands: mpsc::Receiver<Command>,
}

impl PeriodicSupervisor {
    /// Create the supervisor and the sender for its requests.
    ///
    /// The watermark is taken now and the first deadline is one interval
    /// from now.
    pub(crate) fn new(
        reloader: Arc<Reloader>,
        clock: Arc<dyn Clock>,
        check_interval: Duration,
    ) -> (Self, mpsc::Sender<Command>) {
        let (tx, rx) = mpsc::channel(COMMAND_BUFFER);
        let state = ServiceState {
            check_interval,
            watermark: clock.now(),
            deadline: Instant::now() + check_interval,
            last_window: None,
            ticks: 0,
            failed_ticks: 0,
        };

        let supervisor = Self {
            reloader,
            clock,
            state,
            commands: rx,
        };
        (supervisor, tx)
    }

    /// Run until stopped or until every handle is dropped.
    pub(crate) async fn run(mut self) {
        crate::log_event!(
            "supervisor",
            "started",
            "checking every {}ms",
            self.state.check_interval.as_millis()
        );

        loop {
            tokio::select! {
                _ = sleep_until(self.state.deadline) => {
                    // Failures are already logged inside the tick.
                    let _ = self.tick();
                    self.state.deadline = Instant::now() + self.state.check_interval;
                }

                command = self.commands.recv() => {
                    let Some(command) = command else {
                        crate::debug_event!("supervisor", "all handles dropped");
                        break;
                    };
                    if !self.handle(command) {
                        break;
                    }
                }
            }
        }

        crate::log_event!("supervisor", "stopped");
    }

    /// Process one request. Returns false once the loop should stop.
    fn handle(&mut self, command: Command) -> bool {
        match command {
            Command::SetInterval(interval) => {
                crate::debug_event!(
                    "supervisor",
                    "interval",
                    "{}ms from the next re-arm",
                    interval.as_millis()
                );
                self.state.check_interval = interval;
            }
            Command::CheckInterval(reply) => {
                let _ = reply.send(self.state.check_interval);
            }
            Command::Status(reply) => {
                let _ = reply.send(self.status());
            }
            Command::Reload { units, reply } => {
                let outcomes = self.reloader.reload_units(&units);
                let _ = reply.send(outcomes);
            }
            Command::TickNow(reply) => {
                let report = self.tick();
                let _ = reply.send(report);
            }
            Command::Stop(ack) => {
                let _ = ack.send(());
                return false;
            }
        }
        true
    }

    /// Check `[watermark, now)` and advance the watermark.
    ///
    /// The watermark advances even when the tick fails, so a bad tick
    /// cannot wedge the service; changes inside a failed window are missed.
    fn tick(&mut self) -> ReloadResult<TickReport> {
        let now = self.clock.now();
        let window = TimeWindow::new(self.state.watermark, now);
        crate::debug_event!("supervisor", "tick", "{window}");

        let reloader = &self.reloader;
        let result = match catch_unwind(AssertUnwindSafe(|| reloader.tick(&window))) {
            Ok(Ok(report)) => Ok(report),
            Ok(Err(e)) => Err(ReloadError::TickFailure {
                reason: e.to_string(),
            }),
            Err(panic) => Err(ReloadError::TickFailure {
                reason: panic_message(panic.as_ref()),
            }),
        };

        self.state.watermark = now;
        self.state.last_window = Some(window);
        self.state.ticks += 1;

        match &result {
            Ok(report) => {
                let (reloaded, failed) = (report.reloaded_count(), report.failed_count());
                if reloaded + failed > 0 {
                    crate::log_event!(
                        "supervisor",
                        "tick",
                        "{reloaded} reloaded, {failed} failed in {window}"
                    );
                }
            }
            Err(e) => {
                self.state.failed_ticks += 1;
                crate::error_event!("supervisor", "tick failed", "{e}");
            }
        }

        result
    }

    fn status(&self) -> ServiceStatus {
        ServiceStatus {
            check_interval: self.state.check_interval,
            watermark: self.state.watermark,
            last_window: self.state.last_window,
            ticks: self.state.ticks,
            failed_ticks: self.state.failed_ticks,
        }
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic with non-string payload".to_string()
    }
}
