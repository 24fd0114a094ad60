//! DogStatsD transport
//!
//! Gauges and histograms go through a [`cadence::StatsdClient`]; events are
//! encoded here, since cadence has no event type, and written through the
//! same client:
//!
//! ```text
//! article_metrics.pipeline.mem_alloc:1024|g|#env:prod
//! article_metrics.pipeline.latency:0.25|h|@0.5
//! _e{29,23}:article_metrics.pipeline.exit|Done downloading events|d:1700000000|p:normal|t:warning
//! ```
//!
//! Constant tags given at construction are emitted before per-call tags.

use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, ToSocketAddrs, UdpSocket};
use std::panic::RefUnwindSafe;
use std::time::UNIX_EPOCH;

use cadence::ext::MetricBackend;
use cadence::prelude::*;
use cadence::{ErrorKind, Metric, MetricBuilder, MetricError, MetricSink, StatsdClient, UdpMetricSink};
use tracing::{debug, info};

use super::{Event, Transport};
use crate::error::TransportError;

/// DogStatsD client over any cadence sink (UDP by default)
pub struct StatsdTransport {
    client: StatsdClient,
    constant_tags: Vec<String>,
}

impl StatsdTransport {
    /// Resolve `address`, bind an ephemeral local UDP socket of the same
    /// family and target the agent
    ///
    /// Fails if `address` does not resolve or the socket cannot be bound.
    /// No datagram is sent.
    pub fn connect(address: &str, constant_tags: Vec<String>) -> Result<Self, TransportError> {
        let target = resolve(address)?;
        let local = if target.is_ipv6() {
            SocketAddr::from((Ipv6Addr::UNSPECIFIED, 0))
        } else {
            SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0))
        };

        let socket = UdpSocket::bind(local).map_err(TransportError::Bind)?;
        socket.set_nonblocking(true).map_err(TransportError::Bind)?;

        let sink = UdpMetricSink::from(target, socket).map_err(TransportError::Connect)?;

        info!(
            "DogStatsD transport targeting {} ({}, {} constant tags)",
            address,
            target,
            constant_tags.len()
        );

        Ok(Self::from_sink(sink, constant_tags))
    }

    /// Wrap an existing cadence sink
    pub fn from_sink<S>(sink: S, constant_tags: Vec<String>) -> Self
    where
        S: MetricSink + Send + Sync + RefUnwindSafe + 'static,
    {
        let client = constant_tags
            .iter()
            .fold(StatsdClient::builder("", sink), |builder, tag| {
                builder.with_tag_value(tag)
            })
            .build();

        Self {
            client,
            constant_tags,
        }
    }

    pub fn constant_tags(&self) -> &[String] {
        &self.constant_tags
    }
}

/// First address `address` resolves to
fn resolve(address: &str) -> Result<SocketAddr, TransportError> {
    let mut addrs = address
        .to_socket_addrs()
        .map_err(|e| TransportError::Connect(MetricError::from(e)))?;
    addrs.next().ok_or_else(bad_address)
}

fn bad_address() -> TransportError {
    TransportError::Connect(MetricError::from((
        ErrorKind::InvalidInput,
        "agent address did not resolve",
    )))
}

/// Attach per-call tags and the sample rate, then send
fn send_sample<'a, T>(
    builder: MetricBuilder<'a, 'a, T>,
    tags: &'a [String],
    rate: f64,
) -> Result<(), TransportError>
where
    T: Metric + From<String>,
{
    let mut builder = tags
        .iter()
        .fold(builder, |builder, tag| builder.with_tag_value(tag));
    if rate < 1.0 {
        builder = builder.with_sampling_rate(rate);
    }

    let metric = builder.try_send().map_err(TransportError::Send)?;
    debug!(datagram = metric.as_metric_str(), "emitted");
    Ok(())
}

impl Transport for StatsdTransport {
    fn gauge(
        &self,
        name: &str,
        value: f64,
        tags: &[String],
        rate: f64,
    ) -> Result<(), TransportError> {
        send_sample(self.client.gauge_with_tags(name, value), tags, rate)
    }

    fn histogram(
        &self,
        name: &str,
        value: f64,
        tags: &[String],
        rate: f64,
    ) -> Result<(), TransportError> {
        send_sample(self.client.histogram_with_tags(name, value), tags, rate)
    }

    fn event(&self, event: &Event) -> Result<(), TransportError> {
        let line = EventLine(encode_event(event, &self.constant_tags));
        debug!(datagram = line.as_metric_str(), "emitting");
        self.client.send_metric(&line).map_err(TransportError::Send)
    }
}

/// A fully encoded event datagram
struct EventLine(String);

impl Metric for EventLine {
    fn as_metric_str(&self) -> &str {
        &self.0
    }
}

/// `_e{title_len,text_len}:title|text|d:ts|p:priority|t:alert[|#tags]`
fn encode_event(event: &Event, constant_tags: &[String]) -> String {
    let title = escape_event_string(&event.title);
    let text = escape_event_string(&event.text);

    let mut line = format!("_e{{{},{}}}:{}|{}", title.len(), text.len(), title, text);

    let secs = event
        .timestamp
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    if secs > 0 {
        line.push_str(&format!("|d:{}", secs));
    }

    line.push_str("|p:");
    line.push_str(event.priority.as_str());
    line.push_str("|t:");
    line.push_str(event.alert_type.as_str());

    let mut all = constant_tags.iter().chain(event.tags.iter());
    if let Some(first) = all.next() {
        line.push_str("|#");
        line.push_str(first);
        for tag in all {
            line.push(',');
            line.push_str(tag);
        }
    }
    line
}

fn escape_event_string(s: &str) -> String {
    s.replace('\n', "\\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{AlertType, Priority};
    use cadence::SpyMetricSink;
    use std::io;
    use std::time::{Duration, SystemTime};

    struct BrokenSink;

    impl MetricSink for BrokenSink {
        fn emit(&self, _metric: &str) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::ConnectionRefused, "agent down"))
        }
    }

    fn tags(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn spy(constant_tags: &[&str]) -> (impl Fn() -> String, StatsdTransport) {
        let (rx, sink) = SpyMetricSink::new();
        let transport = StatsdTransport::from_sink(sink, tags(constant_tags));
        let next = move || String::from_utf8(rx.try_recv().unwrap()).unwrap();
        (next, transport)
    }

    fn recv(listener: &UdpSocket) -> String {
        let mut buf = [0u8; 1024];
        let n = listener.recv(&mut buf).unwrap();
        String::from_utf8_lossy(&buf[..n]).into_owned()
    }

    #[test]
    fn test_gauge_without_tags() {
        let (next, transport) = spy(&[]);

        transport.gauge("ns.comp.mem_alloc", 1024.0, &[], 1.0).unwrap();

        assert_eq!(next(), "ns.comp.mem_alloc:1024|g");
    }

    #[test]
    fn test_histogram_with_rate_and_tags() {
        let (next, transport) = spy(&["env:prod"]);

        transport
            .histogram("ns.comp.latency", 0.25, &tags(&["host:a"]), 0.5)
            .unwrap();

        assert_eq!(next(), "ns.comp.latency:0.25|h|@0.5|#env:prod,host:a");
    }

    #[test]
    fn test_full_rate_is_not_annotated() {
        let (next, transport) = spy(&[]);
        transport.gauge("a.b.c", 3.0, &[], 1.0).unwrap();
        assert_eq!(next(), "a.b.c:3|g");
    }

    #[test]
    fn test_event_encoding() {
        let event = Event {
            title: "ns.pipeline.exit".to_string(),
            text: "Done\ndownloading".to_string(),
            timestamp: UNIX_EPOCH + Duration::from_secs(1_700_000_000),
            alert_type: AlertType::Warning,
            priority: Priority::Normal,
            tags: tags(&["run:7"]),
        };

        let line = encode_event(&event, &tags(&["env:prod"]));
        assert_eq!(
            line,
            "_e{16,17}:ns.pipeline.exit|Done\\ndownloading|d:1700000000|p:normal|t:warning|#env:prod,run:7"
        );
    }

    #[test]
    fn test_event_goes_through_client_sink() {
        let (next, transport) = spy(&["env:prod"]);
        transport
            .event(&Event {
                title: "t".to_string(),
                text: "x".to_string(),
                timestamp: UNIX_EPOCH,
                alert_type: AlertType::Info,
                priority: Priority::Low,
                tags: Vec::new(),
            })
            .unwrap();
        assert_eq!(next(), "_e{1,1}:t|x|p:low|t:info|#env:prod");
    }

    #[test]
    fn test_event_before_epoch_omits_timestamp() {
        let event = Event {
            title: "t".to_string(),
            text: "x".to_string(),
            timestamp: UNIX_EPOCH,
            alert_type: AlertType::Info,
            priority: Priority::Low,
            tags: Vec::new(),
        };
        assert_eq!(encode_event(&event, &[]), "_e{1,1}:t|x|p:low|t:info");
    }

    #[test]
    fn test_sink_error_is_send_error() {
        let transport = StatsdTransport::from_sink(BrokenSink, Vec::new());
        let err = transport.gauge("a.b.c", 1.0, &[], 1.0).unwrap_err();
        assert!(matches!(err, TransportError::Send(_)));
        assert!(err.to_string().contains("agent down"));
    }

    #[test]
    fn test_connect_rejects_address_without_port() {
        let err = StatsdTransport::connect("localhost", Vec::new())
            .err()
            .expect("address without port must fail");
        assert!(matches!(err, TransportError::Connect(_)));
    }

    #[test]
    fn test_udp_round_trip() {
        let listener = UdpSocket::bind("127.0.0.1:0").unwrap();
        listener
            .set_read_timeout(Some(Duration::from_secs(2)))
            .unwrap();
        let addr = listener.local_addr().unwrap().to_string();

        let transport = StatsdTransport::connect(&addr, tags(&["service:test"])).unwrap();
        transport
            .event(&Event {
                title: "ns.c.start".to_string(),
                text: "hello".to_string(),
                timestamp: SystemTime::now(),
                alert_type: AlertType::Info,
                priority: Priority::Low,
                tags: Vec::new(),
            })
            .unwrap();

        let datagram = recv(&listener);
        assert!(datagram.starts_with("_e{10,5}:ns.c.start|hello|d:"));
        assert!(datagram.ends_with("|p:low|t:info|#service:test"));
    }

    #[test]
    fn test_ipv6_agent_gets_ipv6_socket() {
        // Hosts without IPv6 loopback have nothing to check
        let Ok(listener) = UdpSocket::bind("[::1]:0") else {
            return;
        };
        listener
            .set_read_timeout(Some(Duration::from_secs(2)))
            .unwrap();
        let addr = listener.local_addr().unwrap().to_string();

        let transport = StatsdTransport::connect(&addr, Vec::new()).unwrap();
        transport.gauge("ns.c.mem_alloc", 7.0, &[], 1.0).unwrap();

        assert_eq!(recv(&listener), "ns.c.mem_alloc:7|g");
    }
}
