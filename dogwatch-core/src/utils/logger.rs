//! Subscriber setup for the dogwatch binaries
//!
//! The library itself only emits `tracing` events (reporter spans, tick
//! failures, trips). `dogwatch-events`, `dogwatch-reporter` and
//! `dogwatch-listen` call [`init_logger`] once at startup; embedding hosts
//! install their own subscriber instead.

use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Install the global subscriber: plain output with thread names, so the
/// `dogwatch-reporter` thread is visible, or JSON lines with `json_logs`
///
/// `RUST_LOG` wins over `log_level` when set. Returns an error if a global
/// subscriber is already installed.
pub fn init_logger(log_level: &str, json_logs: bool) -> Result<(), TryInitError> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    if json_logs {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().json())
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_target(true).with_thread_names(true))
            .try_init()
    }
}
