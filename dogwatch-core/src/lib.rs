//! Dogwatch Core - DogStatsD client with a self-disabling runtime reporter
//!
//! A thin wrapper around a DogStatsD agent (gauges, histograms, events over
//! UDP) plus a background loop that reports process runtime stats and turns
//! itself off after repeated transport failures.
//!
//! ## Behaviour
//! - **Disabled services** never open a socket and every send is `Ok(())`
//! - **Single-shot sends** return their errors to the caller
//! - **The reporting loop** counts failing ticks; at the limit it disables the
//!   service for good, so the host keeps running with metrics off
//!
//! ## Core Modules
//! - `service`: `ReportingService`, the reporting loop and its handle
//! - `transport`: `Transport` seam and the DogStatsD encoder
//! - `runtime`: runtime snapshots and the allocation tracker
//! - `metric` / `tags`: metric names and tag lists
//! - `config`: serde config, defaults and validation
//! - `utils`: logging setup for binaries

pub mod config;
pub mod error;
pub mod metric;
pub mod runtime;
pub mod service;
pub mod tags;
pub mod transport;
pub mod utils;

pub use config::ServiceConfig;
pub use error::{Error, Payload, Result, TransportError};
pub use metric::MetricName;
pub use runtime::{ProcessStats, RuntimeSnapshot, RuntimeStats, TrackingAllocator};
pub use service::{
    LogRecord, MemoryLogger, ReportLogger, ReporterHandle, ReportingService, RunExit, TickOutcome,
    TracingLogger,
};
pub use tags::{Tag, TagSet, NO_TAGS};
pub use transport::{AlertType, Event, Priority, StatsdTransport, Transport};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::config::constants::*;
    pub use crate::service::{ReportingService, RunExit};
    pub use crate::tags::{Tag, TagSet, NO_TAGS};
    pub use crate::transport::{AlertType, Priority};
    pub use crate::{Error, Result};
}
