//! Transport seam between the service and the metrics agent
//!
//! The service only knows about [`Transport`]. [`StatsdTransport`] is the
//! DogStatsD implementation used in production; tests plug in their own.

pub mod statsd;

pub use statsd::StatsdTransport;

use crate::error::TransportError;
use std::time::SystemTime;

/// Event severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AlertType {
    Info,
    Error,
    Warning,
    Success,
}

impl AlertType {
    pub fn as_str(self) -> &'static str {
        match self {
            AlertType::Info => "info",
            AlertType::Error => "error",
            AlertType::Warning => "warning",
            AlertType::Success => "success",
        }
    }
}

/// Event priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Priority {
    Normal,
    Low,
}

impl Priority {
    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Normal => "normal",
            Priority::Low => "low",
        }
    }
}

/// A titled, timestamped occurrence sent to the agent
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub title: String,
    pub text: String,
    pub timestamp: SystemTime,
    pub alert_type: AlertType,
    pub priority: Priority,
    pub tags: Vec<String>,
}

/// Sends samples and events to a metrics agent
///
/// Sends are synchronous: an error means this sample is lost. Implementations
/// never retry.
pub trait Transport: Send + Sync {
    /// Point-in-time value
    fn gauge(&self, name: &str, value: f64, tags: &[String], rate: f64)
        -> Result<(), TransportError>;

    /// Value aggregated into a distribution by the agent
    fn histogram(
        &self,
        name: &str,
        value: f64,
        tags: &[String],
        rate: f64,
    ) -> Result<(), TransportError>;

    fn event(&self, event: &Event) -> Result<(), TransportError>;
}
