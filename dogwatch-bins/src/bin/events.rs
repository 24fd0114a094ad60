//! Send a start and an exit event to the agent
//!
//! Handy for checking that an agent (or `dogwatch-listen`) is reachable and
//! that events show up under the expected namespace.

use anyhow::{Context, Result};
use clap::Parser;
use dogwatch_bins::common::{init_logging, CommonArgs};
use dogwatch_core::{AlertType, Priority, NO_TAGS};
use tracing::info;

#[derive(Parser, Debug)]
#[command(author, version, about = "Send a start and an exit event")]
struct Cli {
    #[command(flatten)]
    common: CommonArgs,

    /// Component segment of the event titles
    #[arg(long, default_value = "s3_downloader")]
    component: String,

    /// Text of the start event
    #[arg(long, default_value = "Starting to download events from S3")]
    start_text: String,

    /// Text of the exit event
    #[arg(long, default_value = "Done downloading events from S3")]
    exit_text: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.common.log_level, cli.common.json_logs)?;

    let service = cli.common.build_service()?;

    service
        .send_event(
            &cli.component,
            "start",
            &cli.start_text,
            &NO_TAGS,
            AlertType::Info,
            Priority::Low,
        )
        .context("sending start event")?;
    info!("Sent start event");

    service
        .send_event(
            &cli.component,
            "exit",
            &cli.exit_text,
            &NO_TAGS,
            AlertType::Warning,
            Priority::Normal,
        )
        .context("sending exit event")?;
    info!("Sent exit event");

    Ok(())
}
