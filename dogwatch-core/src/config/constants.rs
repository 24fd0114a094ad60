//! Defaults shared by the service, config and binaries

use std::time::Duration;

// ===== AGENT =====

/// Default DogStatsD agent address
pub const DEFAULT_ADDRESS: &str = "localhost:8125";

/// Namespace used when none is given (and always for disabled services)
pub const DEFAULT_NAMESPACE: &str = "article_metrics";

// ===== REPORTING LOOP =====

/// Seconds between runtime reports
pub const DEFAULT_INTERVAL_SECS: u64 = 1;

/// Interval between runtime reports
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(DEFAULT_INTERVAL_SECS);

/// Consecutive failing ticks before the loop disables the service
pub const DEFAULT_FAILURE_LIMIT: u32 = 10;

/// Every sample is sent; no client-side sampling
pub const SAMPLE_RATE: f64 = 1.0;

/// Component name used by the reporter binary
pub const DEFAULT_COMPONENT: &str = "runtime";
