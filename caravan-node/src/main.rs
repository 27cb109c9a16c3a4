use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use caravan_bus::Metric;
use caravan_devices::{NodeSettings, TiltSettings, Wt901cConfig};
use caravan_hal::{DummyTransport, SystemClock};
use clap::Parser;
use tracing::{info, Level};

#[derive(Parser, Debug)]
#[command(name = "caravan-node")]
#[command(about = "Poll CaravanOS sensor devices and log their metrics")]
struct Args {
    /// Path to the node settings file (TOML, JSON or YAML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Seconds to run before shutting down (0 runs until Ctrl-C)
    #[arg(short, long, default_value = "5")]
    duration: u64,

    /// Print each metric as a JSON line on stdout
    #[arg(long)]
    json: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_max_level(if args.verbose { Level::DEBUG } else { Level::INFO })
        .with_writer(std::io::stderr)
        .init();

    let mut settings = match &args.config {
        Some(path) => NodeSettings::load(path)
            .with_context(|| format!("failed to load settings from {}", path.display()))?,
        None => NodeSettings::default(),
    };

    if settings.tilt.is_empty() {
        // Nothing configured: run a single simulated inclinometer
        settings.tilt.push(TiltSettings {
            instance_id: 0x1201,
            device: Wt901cConfig::default(),
        });
    }

    let bus = settings.build_bus();
    let received = Arc::new(AtomicU64::new(0));

    let counter = received.clone();
    let json = args.json;
    let _log = bus.subscribe(move |metric: &Metric| {
        counter.fetch_add(1, Ordering::Relaxed);
        if json {
            match serde_json::to_string(metric) {
                Ok(line) => println!("{line}"),
                Err(err) => tracing::warn!(error = %err, "failed to encode metric"),
            }
        } else {
            info!(
                instance = metric.instance_id(),
                kind = %metric.kind(),
                value = ?metric.value(),
                ts = metric.timestamp_ms(),
                seq = metric.sequence(),
                "metric"
            );
        }
    });

    let clock = Arc::new(SystemClock::new());
    let poller = settings.build_poller(&bus, clock, |_| DummyTransport::new());
    info!(devices = poller.len(), interval = ?poller.interval(), "node started");
    let handle = poller.start();

    if args.duration == 0 {
        tokio::signal::ctrl_c().await.context("failed to wait for Ctrl-C")?;
    } else {
        tokio::select! {
            _ = tokio::time::sleep(Duration::from_secs(args.duration)) => {}
            _ = tokio::signal::ctrl_c() => {}
        }
    }

    handle.shutdown().await;
    info!(metrics = received.load(Ordering::Relaxed), "node stopped");
    Ok(())
}
