//! Common utilities for all binaries
//!
//! Shared CLI arguments, logging setup and service construction.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;
use dogwatch_core::config::constants::{DEFAULT_ADDRESS, DEFAULT_NAMESPACE};
use dogwatch_core::{ReportingService, ServiceConfig, Tag};

/// Common CLI arguments for all binaries
#[derive(Args, Debug, Clone)]
pub struct CommonArgs {
    /// DogStatsD agent address (host:port)
    #[arg(short, long, env = "DOGWATCH_ADDRESS", default_value = DEFAULT_ADDRESS)]
    pub address: String,

    /// Namespace prefixed to every metric
    #[arg(short, long, env = "DOGWATCH_NAMESPACE", default_value = DEFAULT_NAMESPACE)]
    pub namespace: String,

    /// Run with metrics off (no socket is opened)
    #[arg(long, env = "DOGWATCH_DISABLED")]
    pub disabled: bool,

    /// Constant tag as key:value (repeatable)
    #[arg(short, long = "tag", value_parser = parse_tag)]
    pub tags: Vec<Tag>,

    /// JSON config file; replaces address, namespace and tags above
    #[arg(long, env = "DOGWATCH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log level
    #[arg(short, long, env = "DOGWATCH_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Emit logs as JSON
    #[arg(long)]
    pub json_logs: bool,
}

impl CommonArgs {
    /// Resolve the service configuration from `--config` or the flags
    ///
    /// `--disabled` always wins, even over a config file that enables the service.
    pub fn service_config(&self) -> Result<ServiceConfig> {
        let mut config = match &self.config {
            Some(path) => ServiceConfig::load(path)
                .with_context(|| format!("loading config from {}", path.display()))?,
            None => ServiceConfig {
                address: self.address.clone(),
                namespace: self.namespace.clone(),
                tags: self.tags.clone().into(),
                ..ServiceConfig::default()
            },
        };

        if self.disabled {
            config.disabled = true;
        }

        Ok(config)
    }

    /// Build the reporting service described by these arguments
    pub fn build_service(&self) -> Result<ReportingService> {
        let config = self.service_config()?;
        let service = ReportingService::new(&config).context("creating reporting service")?;

        if service.is_enabled() {
            tracing::info!(
                "Reporting to {} under namespace {}",
                config.address,
                config.namespace
            );
        } else {
            tracing::warn!("Metrics disabled, nothing will be sent");
        }

        Ok(service)
    }
}

/// Initialize tracing/logging
pub fn init_logging(level: &str, json_logs: bool) -> Result<()> {
    dogwatch_core::utils::init_logger(level, json_logs).context("installing tracing subscriber")
}

/// Parse a `key:value` tag; the value may itself contain colons
pub fn parse_tag(s: &str) -> Result<Tag> {
    let Some((key, value)) = s.split_once(':') else {
        bail!("tag {:?} must look like key:value", s);
    };
    if key.is_empty() {
        bail!("tag {:?} has an empty key", s);
    }
    Ok(Tag::new(key, value))
}
