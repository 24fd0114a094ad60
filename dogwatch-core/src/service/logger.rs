//! Logging hooks for the reporting loop
//!
//! The loop has no caller to return errors to, so failures go to a
//! [`ReportLogger`] instead. The default writes through `tracing`; tests can
//! inject their own to assert on what was logged.

use parking_lot::Mutex;
use tracing::{error, warn};

use crate::error::Error;

/// Receives the loop's failure diagnostics
pub trait ReportLogger: Send + Sync {
    /// A tick had at least one failed send; `error` is the last one
    fn tick_failed(&self, error: &Error, consecutive: u32, limit: u32);

    /// The breaker tripped; the service is now permanently disabled
    fn tripped(&self, error: &Error, limit: u32);
}

/// Logs through `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl ReportLogger for TracingLogger {
    fn tick_failed(&self, error: &Error, consecutive: u32, limit: u32) {
        warn!(
            consecutive,
            limit, "Error sending runtime stats: {}", error
        );
    }

    fn tripped(&self, error: &Error, limit: u32) {
        error!(
            limit,
            "Quit sending stats after {} consecutive failed ticks. Last error: {}", limit, error
        );
    }
}

/// One captured log call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogRecord {
    TickFailed {
        message: String,
        consecutive: u32,
        limit: u32,
    },
    Tripped {
        message: String,
        limit: u32,
    },
}

/// Keeps every call in memory
///
/// Useful for hosts that surface reporter health themselves.
#[derive(Debug, Default)]
pub struct MemoryLogger {
    records: Mutex<Vec<LogRecord>>,
}

impl MemoryLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<LogRecord> {
        self.records.lock().clone()
    }

    pub fn has_tripped(&self) -> bool {
        self.records
            .lock()
            .iter()
            .any(|r| matches!(r, LogRecord::Tripped { .. }))
    }
}

impl ReportLogger for MemoryLogger {
    fn tick_failed(&self, error: &Error, consecutive: u32, limit: u32) {
        self.records.lock().push(LogRecord::TickFailed {
            message: error.to_string(),
            consecutive,
            limit,
        });
    }

    fn tripped(&self, error: &Error, limit: u32) {
        self.records.lock().push(LogRecord::Tripped {
            message: error.to_string(),
            limit,
        });
    }
}

impl<L: ReportLogger + ?Sized> ReportLogger for std::sync::Arc<L> {
    fn tick_failed(&self, error: &Error, consecutive: u32, limit: u32) {
        (**self).tick_failed(error, consecutive, limit)
    }

    fn tripped(&self, error: &Error, limit: u32) {
        (**self).tripped(error, limit)
    }
}
