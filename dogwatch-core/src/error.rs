//! Error types for construction and emission
//!
//! Construction and single-shot emission failures are returned to the caller.
//! The reporting loop never returns these; it counts them toward its breaker.

use std::fmt;
use std::io;
use thiserror::Error;

/// Failures raised by a [`Transport`](crate::transport::Transport)
#[derive(Debug, Error)]
pub enum TransportError {
    /// Could not bind the local UDP socket
    #[error("failed to bind local socket: {0}")]
    Bind(#[source] io::Error),

    /// Could not resolve or connect to the agent address
    #[error("failed to reach agent: {0}")]
    Connect(#[source] cadence::MetricError),

    /// The metric could not be formatted or written
    #[error("failed to write datagram: {0}")]
    Send(#[source] cadence::MetricError),
}

/// What an emission call tried to send, kept for error reporting
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Numeric sample (gauge or histogram)
    Value(f64),
    /// Event description
    Event(String),
}

impl fmt::Display for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Payload::Value(v) => write!(f, "{}", v),
            Payload::Event(text) => write!(f, "event {:?}", text),
        }
    }
}

/// Errors returned by the reporting service
#[derive(Debug, Error)]
pub enum Error {
    /// The transport to the agent could not be constructed
    #[error("transport unavailable for agent at {address}: {source}")]
    TransportUnavailable {
        /// Agent address we tried to reach
        address: String,
        #[source]
        source: TransportError,
    },

    /// A single metric or event could not be sent
    #[error("failed to emit {metric} with value {value}: {source}")]
    EmitFailed {
        /// Canonical metric name
        metric: String,
        /// Value or event text that was attempted
        value: Payload,
        #[source]
        source: TransportError,
    },

    /// Configuration values are out of range
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, Error>;
