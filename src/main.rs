//! backend-pool: lease pooled TCP connections across a set of backends.
//!
//! Each iteration leases a connection, probes it for writability and reports
//! the outcome to the address's circuit breaker. Pool stats are printed as
//! JSON periodically and on exit.

use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

use backend_pool::config::loader::{load_config, ConfigError};
use backend_pool::config::validation::validate_config;
use backend_pool::lifecycle::Shutdown;
use backend_pool::net::{connect, TcpResource};
use backend_pool::observability::{logging, metrics};
use backend_pool::{ClientConfig, Context, Group};

#[derive(Debug, Parser)]
#[command(name = "backend-pool", version, about = "Pooled TCP client with per-address circuit breakers")]
struct Cli {
    /// Path to a TOML config file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Backend addresses; override the config file's list when given.
    addresses: Vec<String>,

    /// Lease this many connections and exit. Runs until Ctrl-C otherwise.
    #[arg(short = 'n', long)]
    iterations: Option<u64>,

    /// Delay between leases when running until Ctrl-C.
    #[arg(long, default_value_t = 500)]
    interval_ms: u64,

    /// Seconds between stats dumps when running until Ctrl-C.
    #[arg(long, default_value_t = 5)]
    stats_every_secs: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ClientConfig::default(),
    };
    if !cli.addresses.is_empty() {
        config.addresses = cli.addresses.clone();
    }
    validate_config(&config).map_err(ConfigError::Validation)?;

    logging::init_logging(&config.observability)?;
    tracing::info!(
        addresses = ?config.addresses,
        max_cap = config.pool.max_cap,
        init_num = config.pool.init_num,
        "backend-pool v{} starting",
        env!("CARGO_PKG_VERSION")
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr)?,
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let timeout = config.connect.timeout();
    let group = Arc::new(
        Group::new(
            config.addresses.clone(),
            move |address: String| connect(address, timeout),
            config.pool.clone(),
        )
        .await?,
    );

    match cli.iterations {
        Some(n) => {
            for _ in 0..n {
                probe(&group).await;
            }
        }
        None => run_until_shutdown(&group, &cli).await,
    }

    print_stats(&group);
    group.close(&Context::new());
    tracing::info!("Shutdown complete");
    Ok(())
}

async fn run_until_shutdown(group: &Arc<Group<TcpResource>>, cli: &Cli) {
    let shutdown = Arc::new(Shutdown::new());
    let mut stop = shutdown.subscribe();

    let signal = Arc::clone(&shutdown);
    tokio::spawn(async move {
        if let Err(e) = signal.trigger_on_ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
        }
    });

    let mut lease_tick = tokio::time::interval(Duration::from_millis(cli.interval_ms.max(1)));
    let mut stats_tick = tokio::time::interval(Duration::from_secs(cli.stats_every_secs.max(1)));

    loop {
        tokio::select! {
            _ = stop.recv() => break,
            _ = lease_tick.tick() => probe(group).await,
            _ = stats_tick.tick() => print_stats(group),
        }
    }
}

fn print_stats(group: &Group<TcpResource>) {
    match group.stats_json() {
        Ok(stats) => println!("{}", stats),
        Err(e) => tracing::error!(error = %e, "Failed to serialize pool stats"),
    }
}

/// Lease one connection and report whether it is still writable.
async fn probe(group: &Arc<Group<TcpResource>>) {
    let ctx = Context::new();
    let mut lease = match group.lease(&ctx).await {
        Ok(lease) => lease,
        Err(e) => {
            tracing::warn!(trace_id = ?ctx.trace_id(), error = %e, "Lease failed");
            return;
        }
    };

    let outcome = match lease.stream_mut() {
        Ok(stream) => tokio::time::timeout(Duration::from_secs(1), stream.writable())
            .await
            .map_err(std::io::Error::from)
            .and_then(|ready| ready),
        Err(e) => Err(e),
    };

    if lease.report_outcome(&outcome) {
        tracing::debug!(trace_id = ?ctx.trace_id(), address = %lease.address(), "Probe ok");
        lease.close();
    } else {
        tracing::warn!(
            trace_id = ?ctx.trace_id(),
            address = %lease.address(),
            connection_id = %lease.id(),
            "Probe failed, discarding connection"
        );
        lease.discard();
    }
}
