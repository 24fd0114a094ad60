//! Reporting service
//!
//! Wraps a [`Transport`] with:
//! - namespaced metric names (`namespace.component.name`)
//! - a one-way enabled flag; once disabled every send is a silent no-op
//! - a self-reporting loop that trips the flag after too many failing ticks
//!
//! Single-shot sends ([`send_gauge`](ReportingService::send_gauge) and friends)
//! return their errors and never touch the breaker. Only the loop counts
//! failures, because it has no caller to report to.
//!
//! ## Usage
//!
//! ```no_run
//! use dogwatch_core::{ReportingService, NO_TAGS};
//!
//! let svc = ReportingService::create(false, "localhost:8125", "pipeline", &NO_TAGS)?;
//! svc.send_gauge("s3_downloader", "count", 1.0, &NO_TAGS)?;
//!
//! // Report runtime stats every second on a background thread
//! let reporter = svc.spawn("s3_downloader", "run-42")?;
//! // ...
//! reporter.stop().ok();
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod logger;
pub mod reporter;

pub use logger::{LogRecord, MemoryLogger, ReportLogger, TracingLogger};
pub use reporter::{ReporterHandle, RunExit, TickOutcome};

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use tracing::{info, warn};

use crate::config::constants::{
    DEFAULT_FAILURE_LIMIT, DEFAULT_INTERVAL, DEFAULT_NAMESPACE, SAMPLE_RATE,
};
use crate::config::ServiceConfig;
use crate::error::{Error, Payload, Result};
use crate::metric::MetricName;
use crate::runtime::{ProcessStats, RuntimeSnapshot, RuntimeStats};
use crate::tags::TagSet;
use crate::transport::{AlertType, Event, Priority, StatsdTransport, Transport};

/// Metrics client with a self-disabling runtime reporter
///
/// Clones share the transport, the enabled flag and the failure counter, so a
/// clone handed to the reporter thread trips the breaker for every holder.
#[derive(Clone)]
pub struct ReportingService {
    transport: Option<Arc<dyn Transport>>,
    enabled: Arc<AtomicBool>,
    consecutive_failures: Arc<AtomicU32>,
    namespace: String,
    interval: Duration,
    failure_limit: u32,
    stats: Arc<dyn RuntimeStats>,
    logger: Arc<dyn ReportLogger>,
}

impl ReportingService {
    /// Create a service talking DogStatsD to `address`
    ///
    /// When `disabled` is true this returns [`ReportingService::disabled`]
    /// without looking at the other arguments. Otherwise a UDP transport is
    /// bound; failure to do so is [`Error::TransportUnavailable`].
    pub fn create(disabled: bool, address: &str, namespace: &str, tags: &TagSet) -> Result<Self> {
        if disabled {
            return Ok(Self::disabled());
        }

        let transport = StatsdTransport::connect(address, tags.format()).map_err(|source| {
            Error::TransportUnavailable {
                address: address.to_string(),
                source,
            }
        })?;

        info!("Reporting service enabled: agent={}, namespace={}", address, namespace);
        Ok(Self::with_transport(transport, namespace))
    }

    /// Create a service from a validated [`ServiceConfig`]
    pub fn new(config: &ServiceConfig) -> Result<Self> {
        config.validate()?;

        let svc = Self::create(
            config.disabled,
            &config.address,
            &config.namespace,
            &config.tags,
        )?;
        if config.disabled {
            return Ok(svc);
        }

        Ok(svc
            .with_interval(config.interval())
            .with_failure_limit(config.failure_limit))
    }

    /// A service that never sends anything and never opens a socket
    pub fn disabled() -> Self {
        Self {
            transport: None,
            enabled: Arc::new(AtomicBool::new(false)),
            consecutive_failures: Arc::new(AtomicU32::new(0)),
            namespace: DEFAULT_NAMESPACE.to_string(),
            interval: DEFAULT_INTERVAL,
            failure_limit: DEFAULT_FAILURE_LIMIT,
            stats: Arc::new(ProcessStats::new()),
            logger: Arc::new(TracingLogger),
        }
    }

    /// An enabled service over any transport
    pub fn with_transport(transport: impl Transport + 'static, namespace: &str) -> Self {
        Self {
            transport: Some(Arc::new(transport)),
            enabled: Arc::new(AtomicBool::new(true)),
            namespace: namespace.to_string(),
            ..Self::disabled()
        }
    }

    /// Time between runtime reports; zero falls back to the default
    #[must_use]
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = if interval.is_zero() {
            DEFAULT_INTERVAL
        } else {
            interval
        };
        self
    }

    /// Consecutive failing ticks before the loop disables the service (min 1)
    #[must_use]
    pub fn with_failure_limit(mut self, limit: u32) -> Self {
        self.failure_limit = limit.max(1);
        self
    }

    #[must_use]
    pub fn with_runtime_stats(mut self, stats: impl RuntimeStats + 'static) -> Self {
        self.stats = Arc::new(stats);
        self
    }

    #[must_use]
    pub fn with_logger(mut self, logger: impl ReportLogger + 'static) -> Self {
        self.logger = Arc::new(logger);
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    pub fn has_transport(&self) -> bool {
        self.transport.is_some()
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn failure_limit(&self) -> u32 {
        self.failure_limit
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures.load(Ordering::Acquire)
    }

    /// Permanently disable the service; a running reporter exits at its next tick
    pub fn disable(&self) {
        if self.enabled.swap(false, Ordering::AcqRel) {
            warn!("Reporting service disabled manually");
        }
    }

    /// Transport to use for a send, or `None` when sends are no-ops
    fn active_transport(&self) -> Option<&dyn Transport> {
        if !self.is_enabled() {
            return None;
        }
        self.transport.as_deref()
    }

    /// Send a gauge named `namespace.component.name`
    pub fn send_gauge(
        &self,
        component: &str,
        name: &str,
        value: f64,
        extra_tags: &TagSet,
    ) -> Result<()> {
        let Some(transport) = self.active_transport() else {
            return Ok(());
        };

        let metric = MetricName::new(self.namespace.as_str(), component, name).to_string();
        transport
            .gauge(&metric, value, &extra_tags.format(), SAMPLE_RATE)
            .map_err(|source| Error::EmitFailed {
                metric,
                value: Payload::Value(value),
                source,
            })
    }

    /// Send a histogram sample named `namespace.component.name`
    pub fn send_histogram(
        &self,
        component: &str,
        name: &str,
        value: f64,
        extra_tags: &TagSet,
    ) -> Result<()> {
        let Some(transport) = self.active_transport() else {
            return Ok(());
        };

        let metric = MetricName::new(self.namespace.as_str(), component, name).to_string();
        transport
            .histogram(&metric, value, &extra_tags.format(), SAMPLE_RATE)
            .map_err(|source| Error::EmitFailed {
                metric,
                value: Payload::Value(value),
                source,
            })
    }

    /// Send an event titled `namespace.component.event_name`, stamped now
    pub fn send_event(
        &self,
        component: &str,
        event_name: &str,
        description: &str,
        extra_tags: &TagSet,
        alert_type: AlertType,
        priority: Priority,
    ) -> Result<()> {
        let Some(transport) = self.active_transport() else {
            return Ok(());
        };

        let title = MetricName::new(self.namespace.as_str(), component, event_name).to_string();
        let event = Event {
            title,
            text: description.to_string(),
            timestamp: SystemTime::now(),
            alert_type,
            priority,
            tags: extra_tags.format(),
        };

        transport.event(&event).map_err(|source| Error::EmitFailed {
            metric: event.title.clone(),
            value: Payload::Event(event.text.clone()),
            source,
        })
    }

    /// Read runtime stats once and send all seven gauges
    ///
    /// Every gauge is attempted; the last failure is returned.
    pub fn send_runtime_stats(&self, component: &str, extra_tags: &TagSet) -> Result<()> {
        if !self.is_enabled() {
            return Ok(());
        }

        let snapshot = self.stats.read();
        match self.emit_snapshot(component, &snapshot, extra_tags) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Send each gauge of `snapshot`, returning the last error if any failed
    fn emit_snapshot(
        &self,
        component: &str,
        snapshot: &RuntimeSnapshot,
        extra_tags: &TagSet,
    ) -> Option<Error> {
        let mut last_error = None;
        for (name, value) in snapshot.gauges() {
            if let Err(err) = self.send_gauge(component, name, value, extra_tags) {
                last_error = Some(err);
            }
        }
        last_error
    }
}

impl fmt::Debug for ReportingService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReportingService")
            .field("enabled", &self.is_enabled())
            .field("has_transport", &self.has_transport())
            .field("namespace", &self.namespace)
            .field("interval", &self.interval)
            .field("failure_limit", &self.failure_limit)
            .field("consecutive_failures", &self.consecutive_failures())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;
    use crate::tags::NO_TAGS;
    use parking_lot::Mutex;
    use std::io;

    /// Records every call; fails every call when `fail` is set
    #[derive(Clone, Default)]
    struct RecordingTransport {
        calls: Arc<Mutex<Vec<String>>>,
        fail: bool,
    }

    impl RecordingTransport {
        fn failing() -> Self {
            Self {
                fail: true,
                ..Default::default()
            }
        }

        fn record(&self, call: String) -> std::result::Result<(), TransportError> {
            self.calls.lock().push(call);
            if self.fail {
                Err(TransportError::Send(io::Error::new(
                    io::ErrorKind::ConnectionRefused,
                    "agent down",
                ).into()))
            } else {
                Ok(())
            }
        }
    }

    impl Transport for RecordingTransport {
        fn gauge(
            &self,
            name: &str,
            value: f64,
            tags: &[String],
            rate: f64,
        ) -> std::result::Result<(), TransportError> {
            self.record(format!("gauge {} {} {:?} {}", name, value, tags, rate))
        }

        fn histogram(
            &self,
            name: &str,
            value: f64,
            tags: &[String],
            rate: f64,
        ) -> std::result::Result<(), TransportError> {
            self.record(format!("histogram {} {} {:?} {}", name, value, tags, rate))
        }

        fn event(&self, event: &Event) -> std::result::Result<(), TransportError> {
            self.record(format!(
                "event {} {} {:?} {:?}",
                event.title, event.text, event.alert_type, event.priority
            ))
        }
    }

    #[test]
    fn test_disabled_construction() {
        let svc = ReportingService::create(true, "not even an address", "ns", &NO_TAGS).unwrap();
        assert!(!svc.is_enabled());
        assert!(!svc.has_transport());
        assert_eq!(svc.namespace(), DEFAULT_NAMESPACE);
        assert_eq!(svc.interval(), Duration::from_secs(1));
        assert_eq!(svc.failure_limit(), 10);
    }

    #[test]
    fn test_bad_address_is_transport_unavailable() {
        let err = ReportingService::create(false, "cantfindme", "ns", &NO_TAGS).unwrap_err();
        match err {
            Error::TransportUnavailable { address, .. } => assert_eq!(address, "cantfindme"),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_disabled_sends_are_noops() {
        let svc = ReportingService::disabled();
        assert!(svc.send_gauge("s3_downloader", "count", 1.0, &NO_TAGS).is_ok());
        assert!(svc.send_histogram("", "", f64::NAN, &NO_TAGS).is_ok());
        assert!(svc
            .send_event(
                "pipeline",
                "exit",
                "Exiting the pipeline",
                &NO_TAGS,
                AlertType::Warning,
                Priority::Low
            )
            .is_ok());
        assert!(svc.send_runtime_stats("pipeline", &NO_TAGS).is_ok());
    }

    #[test]
    fn test_manually_disabled_sends_skip_transport() {
        let transport = RecordingTransport::failing();
        let svc = ReportingService::with_transport(transport.clone(), "ns");
        svc.disable();

        assert!(svc.send_gauge("c", "n", 1.0, &NO_TAGS).is_ok());
        assert!(transport.calls.lock().is_empty());
    }

    #[test]
    fn test_gauge_uses_canonical_name_and_full_rate() {
        let transport = RecordingTransport::default();
        let svc = ReportingService::with_transport(transport.clone(), "ns");

        svc.send_gauge("comp", "count", 2.5, &TagSet::new().with("env", "dev"))
            .unwrap();
        svc.send_histogram("comp", "latency", 0.5, &NO_TAGS).unwrap();

        let calls = transport.calls.lock();
        assert_eq!(calls[0], r#"gauge ns.comp.count 2.5 ["env:dev"] 1"#);
        assert_eq!(calls[1], "histogram ns.comp.latency 0.5 [] 1");
    }

    #[test]
    fn test_event_title_is_canonical_name() {
        let transport = RecordingTransport::default();
        let svc = ReportingService::with_transport(transport.clone(), "ns");

        svc.send_event(
            "pipeline",
            "exit",
            "bye",
            &NO_TAGS,
            AlertType::Info,
            Priority::Normal,
        )
        .unwrap();

        assert_eq!(
            transport.calls.lock()[0],
            "event ns.pipeline.exit bye Info Normal"
        );
    }

    #[test]
    fn test_emit_failure_does_not_touch_breaker() {
        let svc = ReportingService::with_transport(RecordingTransport::failing(), "ns")
            .with_failure_limit(1);

        for _ in 0..5 {
            let err = svc.send_gauge("comp", "count", 3.0, &NO_TAGS).unwrap_err();
            match err {
                Error::EmitFailed { metric, value, .. } => {
                    assert_eq!(metric, "ns.comp.count");
                    assert_eq!(value, Payload::Value(3.0));
                }
                other => panic!("unexpected error: {}", other),
            }
        }

        assert!(svc.is_enabled());
        assert_eq!(svc.consecutive_failures(), 0);
    }

    #[test]
    fn test_disabled_service_uses_article_metrics_namespace() {
        assert_eq!(ReportingService::disabled().namespace(), "article_metrics");
    }

    #[test]
    fn test_histogram_failure_is_emit_failed() {
        let transport = RecordingTransport::failing();
        let svc = ReportingService::with_transport(transport.clone(), "ns").with_failure_limit(1);

        let err = svc
            .send_histogram("parser", "latency", 12.5, &NO_TAGS)
            .unwrap_err();
        match err {
            Error::EmitFailed { metric, value, source } => {
                assert_eq!(metric, "ns.parser.latency");
                assert_eq!(value, Payload::Value(12.5));
                assert!(matches!(source, TransportError::Send(_)));
            }
            other => panic!("unexpected error: {}", other),
        }

        assert_eq!(transport.calls.lock().len(), 1);
        assert!(svc.is_enabled());
        assert_eq!(svc.consecutive_failures(), 0);
    }

    #[test]
    fn test_event_failure_carries_description() {
        let svc = ReportingService::with_transport(RecordingTransport::failing(), "ns");
        let err = svc
            .send_event("c", "e", "desc", &NO_TAGS, AlertType::Error, Priority::Low)
            .unwrap_err();
        assert!(matches!(
            err,
            Error::EmitFailed { value: Payload::Event(ref text), .. } if text == "desc"
        ));
    }

    #[test]
    fn test_send_runtime_stats_attempts_every_gauge() {
        let transport = RecordingTransport::failing();
        let svc = ReportingService::with_transport(transport.clone(), "ns")
            .with_runtime_stats(RuntimeSnapshot::default);

        assert!(svc.send_runtime_stats("rt", &NO_TAGS).is_err());
        assert_eq!(transport.calls.lock().len(), 7);
    }

    #[test]
    fn test_builders_clamp() {
        let svc = ReportingService::disabled()
            .with_failure_limit(0)
            .with_interval(Duration::ZERO);
        assert_eq!(svc.failure_limit(), 1);
        assert_eq!(svc.interval(), DEFAULT_INTERVAL);
    }

    #[test]
    fn test_new_applies_config() {
        let cfg = ServiceConfig {
            address: "127.0.0.1:8125".to_string(),
            interval_secs: 5,
            failure_limit: 3,
            ..Default::default()
        };
        let svc = ReportingService::new(&cfg).unwrap();
        assert!(svc.is_enabled());
        assert_eq!(svc.interval(), Duration::from_secs(5));
        assert_eq!(svc.failure_limit(), 3);
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let cfg = ServiceConfig {
            failure_limit: 0,
            ..Default::default()
        };
        assert!(matches!(
            ReportingService::new(&cfg),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_clone_shares_state() {
        let svc = ReportingService::with_transport(RecordingTransport::default(), "ns");
        let clone = svc.clone();
        clone.disable();
        assert!(!svc.is_enabled());
    }
}
