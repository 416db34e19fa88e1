//! Diagnostic probe for a weather-station gateway.
//!
//! Fetches live data one or more times and logs a summary of what came back.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use clap::Parser;
use ecowitt_gateway::{Gateway, LiveDataSnapshot, TcpConfig, TcpTransport};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "gateway-probe", about = "Query a weather-station gateway")]
struct Args {
    /// Gateway address.
    #[arg(long)]
    ip: Option<String>,

    /// Gateway command port.
    #[arg(long, default_value_t = ecowitt_gateway::transport::tcp::DEFAULT_PORT)]
    port: u16,

    /// Number of live data requests.
    #[arg(long, default_value_t = 1)]
    repeat: u32,

    /// Pause between requests, in milliseconds.
    #[arg(long, default_value_t = 5000)]
    interval: u64,

    /// Per-command timeout, in milliseconds.
    #[arg(long)]
    timeout: Option<u64>,

    /// Listen for discovery replies for this many milliseconds first.
    #[arg(long)]
    discover: Option<u64>,

    /// Print the sensor table.
    #[arg(long)]
    sensors: bool,

    /// Keep low-battery flags for sensors that are not paired.
    #[arg(long)]
    no_filter: bool,

    /// List field names.
    #[arg(long)]
    keys: bool,

    /// Log full readings.
    #[arg(long)]
    verbose: bool,

    /// Pretty-print full readings (with --verbose).
    #[arg(long)]
    pretty: bool,
}

fn summarize(data: &LiveDataSnapshot, show_keys: bool) {
    tracing::info!("key count: {}", data.len());
    if show_keys {
        let keys: Vec<_> = data.iter().map(|(k, _)| k).collect();
        tracing::info!("keys: {}", keys.join(", "));
    }

    let mut kinds: BTreeMap<&str, usize> = BTreeMap::new();
    for (_, value) in data.iter() {
        *kinds.entry(value.kind()).or_default() += 1;
    }
    tracing::info!("type summary: {:?}", kinds);

    let non_finite: Vec<_> = data
        .iter()
        .filter(|(_, v)| v.as_number().is_some_and(|n| !n.is_finite()))
        .map(|(k, _)| k)
        .collect();
    if !non_finite.is_empty() {
        tracing::info!("non-finite numbers: {}", non_finite.join(", "));
    }

    let blank: Vec<_> = data
        .iter()
        .filter(|(_, v)| v.as_text().is_some_and(|s| s.trim().is_empty()))
        .map(|(k, _)| k)
        .collect();
    if !blank.is_empty() {
        tracing::info!("empty string fields: {}", blank.join(", "));
    }
}

async fn run_once(gw: &Gateway<TcpTransport>, iteration: u32, args: &Args) {
    tracing::info!("request #{iteration} start");
    let start = Instant::now();
    match gw.get_live_data(!args.no_filter).await {
        Ok(data) => {
            tracing::info!(
                "request #{iteration} success in {}ms",
                start.elapsed().as_millis()
            );
            summarize(&data, args.keys);
            if args.verbose {
                if args.pretty {
                    tracing::info!("readings: {:#?}", data);
                } else {
                    tracing::info!("readings: {:?}", data);
                }
            }
        }
        Err(e) => {
            tracing::error!(
                "request #{iteration} failed after {}ms: {}",
                start.elapsed().as_millis(),
                e
            );
        }
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    tracing::info!("ecowitt-gateway version: {}", env!("CARGO_PKG_VERSION"));

    if let Some(window) = args.discover {
        match Gateway::discover(Duration::from_millis(window)).await {
            Ok(found) => tracing::info!("discovered: {:?}", found),
            Err(e) => tracing::error!("discovery failed: {}", e),
        }
    }

    let Some(ip) = args.ip.clone() else {
        if args.discover.is_none() {
            tracing::error!("no gateway address given; pass --ip or --discover");
        }
        return;
    };

    let mut config = TcpConfig::new(ip).port(args.port);
    if let Some(ms) = args.timeout {
        config = config.timeout(Duration::from_millis(ms));
    }
    tracing::info!("probing {}:{}", config.host, config.port);
    let gw = Gateway::with_tcp_config(config);

    if args.sensors {
        match gw.get_sensors(None).await {
            Ok(sensors) => {
                for s in &sensors {
                    tracing::info!(
                        "{:<10} {:<12} id={:<8} signal={:?} battery={:?}",
                        s.sensor_type,
                        s.status,
                        s.id().unwrap_or("-"),
                        s.signal(),
                        s.battery()
                    );
                }
            }
            Err(e) => tracing::error!("sensor table failed: {}", e),
        }
    }

    let repeat = args.repeat.max(1);
    for i in 1..=repeat {
        run_once(&gw, i, &args).await;
        if i < repeat {
            tokio::time::sleep(Duration::from_millis(args.interval)).await;
        }
    }
    tracing::info!("probe done");
}
