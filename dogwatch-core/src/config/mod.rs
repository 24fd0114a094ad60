//! Service configuration
//!
//! [`ServiceConfig`] is plain data: build it in code, or deserialize it from
//! JSON. Missing fields fall back to [`constants`].

pub mod constants;

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::tags::TagSet;
use constants::*;

/// Everything needed to construct a [`ReportingService`](crate::ReportingService)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Build a no-op service; nothing is sent and no socket is opened
    #[serde(default)]
    pub disabled: bool,

    /// Agent address (`host:port`)
    #[serde(default = "default_address")]
    pub address: String,

    /// First segment of every metric name
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Tags attached to everything this service sends
    #[serde(default)]
    pub tags: TagSet,

    /// Seconds between runtime reports
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// Consecutive failing ticks before the loop gives up
    #[serde(default = "default_failure_limit")]
    pub failure_limit: u32,
}

fn default_address() -> String {
    DEFAULT_ADDRESS.to_string()
}

fn default_namespace() -> String {
    DEFAULT_NAMESPACE.to_string()
}

fn default_interval_secs() -> u64 {
    DEFAULT_INTERVAL_SECS
}

fn default_failure_limit() -> u32 {
    DEFAULT_FAILURE_LIMIT
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            disabled: false,
            address: default_address(),
            namespace: default_namespace(),
            tags: TagSet::new(),
            interval_secs: DEFAULT_INTERVAL_SECS,
            failure_limit: DEFAULT_FAILURE_LIMIT,
        }
    }
}

impl ServiceConfig {
    /// Configuration for a disabled service
    pub fn disabled() -> Self {
        Self {
            disabled: true,
            ..Self::default()
        }
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    /// Check value ranges
    ///
    /// A disabled config is always valid; its values are never used.
    pub fn validate(&self) -> Result<()> {
        if self.disabled {
            return Ok(());
        }
        if self.address.is_empty() {
            return Err(Error::InvalidConfig("address must not be empty".into()));
        }
        if self.namespace.is_empty() {
            return Err(Error::InvalidConfig("namespace must not be empty".into()));
        }
        if self.interval_secs == 0 {
            return Err(Error::InvalidConfig(
                "interval_secs must be at least 1".into(),
            ));
        }
        if self.failure_limit == 0 {
            return Err(Error::InvalidConfig(
                "failure_limit must be at least 1".into(),
            ));
        }
        Ok(())
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| Error::InvalidConfig(format!("malformed config: {}", e)))
    }

    /// Load and validate a JSON config file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::InvalidConfig(format!("cannot read {}: {}", path.display(), e))
        })?;
        let cfg = Self::from_json(&raw)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| Error::InvalidConfig(format!("cannot serialize config: {}", e)))
    }
}
