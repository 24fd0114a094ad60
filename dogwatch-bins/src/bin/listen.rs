//! Minimal DogStatsD agent stand-in: print every datagram received
//!
//! Useful next to `dogwatch-events` or `dogwatch-reporter` to see exactly
//! what goes on the wire.

use std::net::UdpSocket;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use dogwatch_bins::common::init_logging;
use tracing::{error, info, warn};

const MAX_DATAGRAM: usize = 65_535;

#[derive(Parser, Debug)]
#[command(author, version, about = "Print DogStatsD datagrams sent to a UDP port")]
struct Cli {
    /// Address to listen on
    #[arg(short, long, env = "DOGWATCH_LISTEN", default_value = "0.0.0.0:8125")]
    bind: String,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level, cli.json_logs)?;

    let socket =
        UdpSocket::bind(&cli.bind).with_context(|| format!("binding UDP socket on {}", cli.bind))?;
    // Wake up periodically to check the stop flag
    socket.set_read_timeout(Some(Duration::from_millis(250)))?;
    info!("Listening on {}", socket.local_addr()?);

    let running = Arc::new(AtomicBool::new(true));
    let running_ctrlc = Arc::clone(&running);
    ctrlc::set_handler(move || {
        warn!("Received Ctrl+C, shutting down...");
        running_ctrlc.store(false, Ordering::Release);
    })?;

    let mut buf = vec![0u8; MAX_DATAGRAM];
    let mut received = 0u64;

    while running.load(Ordering::Acquire) {
        match socket.recv_from(&mut buf) {
            Ok((n, from)) => {
                received += 1;
                info!(%from, "Received: {}", String::from_utf8_lossy(&buf[..n]));
            }
            Err(e)
                if matches!(
                    e.kind(),
                    std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
                ) => {}
            Err(e) => error!("Error: {}", e),
        }
    }

    info!("Received {} datagrams", received);
    Ok(())
}
