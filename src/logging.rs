//! Logging setup for the reloader.
//!
//! Components log through the event macros below, which prefix every
//! message with the component and the event name:
//!
//! ```text
//! 10:00:02  INFO [detector] gone: alpha (units/alpha.json)
//! 10:00:02 ERROR [reload] failed: beta: Failed to load unit 'beta': ...
//! ```
//!
//! Levels come from the `[logging]` settings:
//!
//! ```toml
//! [logging]
//! default = "warn"
//!
//! [logging.modules]
//! "reloader::reload" = "info"   # every reload and self test
//! ```
//!
//! A valid `RUST_LOG` replaces the settings entirely:
//! ```bash
//! RUST_LOG=reloader::reload::supervisor=debug reloader watch ./units
//! ```

use std::str::FromStr;

use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::FormatTime;

use crate::config::LoggingConfig;

/// Level used when the configured default does not parse.
const FALLBACK_LEVEL: &str = "warn";

/// Local wall-clock time at whole seconds, the resolution ticks work at.
struct WallClock;

impl FormatTime for WallClock {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        write!(w, "{}", chrono::Local::now().format("%H:%M:%S"))
    }
}

/// Filter built from the logging settings.
#[derive(Debug, Default, PartialEq, Eq)]
struct Directives {
    filter: String,
    /// `target=level` entries left out because the level does not parse.
    rejected: Vec<String>,
}

fn directives(config: &LoggingConfig) -> Directives {
    let mut rejected = Vec::new();
    let mut parts = Vec::with_capacity(config.modules.len() + 1);

    if LevelFilter::from_str(&config.default).is_ok() {
        parts.push(config.default.clone());
    } else {
        rejected.push(format!("default={}", config.default));
        parts.push(FALLBACK_LEVEL.to_string());
    }

    for (module, level) in &config.modules {
        let directive = format!("{module}={level}");
        if LevelFilter::from_str(level).is_ok() {
            parts.push(directive);
        } else {
            rejected.push(directive);
        }
    }

    Directives {
        filter: parts.join(","),
        rejected,
    }
}

/// Install the global subscriber.
///
/// Returns false when a subscriber is already installed, in which case
/// nothing changes. Entries with an unknown level are skipped and reported
/// once the subscriber is up.
pub fn init_with_config(config: &LoggingConfig) -> bool {
    let directives = directives(config);
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&directives.filter));

    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(WallClock)
        .with_target(false)
        .try_init()
        .is_ok();

    if installed {
        for entry in &directives.rejected {
            crate::warn_event!("logging", "ignored unknown level", "{entry}");
        }
    }
    installed
}

#[doc(hidden)]
#[macro_export]
macro_rules! __component_event {
    ($level:ident, $component:expr, $event:expr) => {
        tracing::$level!("[{}] {}", $component, $event)
    };
    ($level:ident, $component:expr, $event:expr, $($arg:tt)+) => {
        tracing::$level!("[{}] {}: {}", $component, $event, format!($($arg)+))
    };
}

/// Info-level event, e.g. `log_event!("reload", "reloaded", "{unit}")`.
#[macro_export]
macro_rules! log_event {
    ($($arg:tt)+) => { $crate::__component_event!(info, $($arg)+) };
}

/// Debug-level event, e.g. `debug_event!("supervisor", "tick", "{window}")`.
#[macro_export]
macro_rules! debug_event {
    ($($arg:tt)+) => { $crate::__component_event!(debug, $($arg)+) };
}

/// Warning for a skipped item that does not stop the caller.
#[macro_export]
macro_rules! warn_event {
    ($($arg:tt)+) => { $crate::__component_event!(warn, $($arg)+) };
}

/// Error-level event for a failed unit or tick.
#[macro_export]
macro_rules! error_event {
    ($($arg:tt)+) => { $crate::__component_event!(error, $($arg)+) };
}
