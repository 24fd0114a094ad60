//! Report this process's runtime stats until Ctrl+C or the breaker trips
//!
//! Installs the allocation tracker so the memory gauges carry real numbers.
//! Build with `--features jemalloc` to count through jemalloc instead of the
//! system allocator.

use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use dogwatch_bins::common::{init_logging, CommonArgs};
use dogwatch_core::config::constants::DEFAULT_COMPONENT;
use dogwatch_core::{RunExit, TrackingAllocator};
use tracing::{error, info, warn};

#[cfg(not(feature = "jemalloc"))]
#[global_allocator]
static ALLOC: TrackingAllocator = TrackingAllocator::system();

#[cfg(feature = "jemalloc")]
#[global_allocator]
static ALLOC: TrackingAllocator<tikv_jemallocator::Jemalloc> =
    TrackingAllocator::new(tikv_jemallocator::Jemalloc);

#[derive(Parser, Debug)]
#[command(author, version, about = "Report runtime stats to a DogStatsD agent")]
struct Cli {
    #[command(flatten)]
    common: CommonArgs,

    /// Component segment of the runtime gauges
    #[arg(long, default_value = DEFAULT_COMPONENT)]
    component: String,

    /// Free-form label attached to the reporter's log span
    #[arg(long, default_value = "dogwatch-reporter")]
    label: String,

    /// Seconds between reports (overrides the config file)
    #[arg(long)]
    interval_secs: Option<u64>,

    /// Failing ticks before reporting stops (overrides the config file)
    #[arg(long)]
    failure_limit: Option<u32>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.common.log_level, cli.common.json_logs)?;

    info!("=== Dogwatch: runtime reporter ===");

    let mut service = cli.common.build_service()?;
    if let Some(secs) = cli.interval_secs {
        service = service.with_interval(Duration::from_secs(secs));
    }
    if let Some(limit) = cli.failure_limit {
        service = service.with_failure_limit(limit);
    }

    if !service.is_enabled() {
        warn!("Service disabled, nothing to report");
        return Ok(());
    }

    let (stop_tx, stop_rx) = crossbeam::channel::bounded(1);
    ctrlc::set_handler(move || {
        warn!("Received Ctrl+C, shutting down...");
        // Full means a stop is already queued
        let _ = stop_tx.try_send(());
    })?;

    let exit = service.run_until(&cli.component, &cli.label, &stop_rx);

    match exit {
        RunExit::Tripped => {
            error!(
                "Stopped after {} consecutive failed reports",
                service.failure_limit()
            );
        }
        RunExit::Disabled | RunExit::Cancelled => info!("Reporter stopped"),
    }

    Ok(())
}
