//! Inventory resilience service.
//!
//! Loads configuration, starts the breaker registry and query cache with
//! their background tasks, verifies the database is reachable through its
//! circuit breaker, then runs until SIGINT/SIGTERM.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use inventory_resilience::config::{load_config, AppConfig};
use inventory_resilience::lifecycle::{probe_database, signals, Services, Shutdown};
use inventory_resilience::observability::{logging, metrics};
use inventory_resilience::resilience::RetryPolicy;

#[derive(Parser)]
#[command(name = "inventory-resilience")]
#[command(about = "Circuit breaker and query cache core for the inventory backend", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file. Defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the configured log level.
    #[arg(long)]
    log_level: Option<String>,

    /// Start without probing the database.
    #[arg(long)]
    skip_db_probe: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => AppConfig::default(),
    };

    let level = cli
        .log_level
        .as_deref()
        .unwrap_or(&config.observability.log_level);
    logging::init_logging(level);

    tracing::info!(
        config = ?cli.config,
        database = %config.database.address,
        "inventory-resilience v0.1.0 starting"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let shutdown = Shutdown::new();
    let services = Services::start(&config, &shutdown);

    if !cli.skip_db_probe {
        let policy = RetryPolicy::from_config(&config.retries);
        let breaker = services.database_breaker();
        if let Err(e) = probe_database(&config.database, &breaker, &policy).await {
            tracing::error!(error = %e, "Startup failed");
            shutdown.complete(Duration::from_secs(5)).await;
            return Err(e.into());
        }
    }

    tracing::info!("Ready");
    signals::wait_for_shutdown_signal().await;

    for m in services.breakers.snapshot() {
        tracing::info!(
            breaker = %m.name,
            state = %m.state,
            requests = m.total_requests,
            success_rate = m.success_rate,
            trips = m.trips,
            "Breaker summary"
        );
    }
    let stats = services.query_cache.stats();
    tracing::info!(
        hits = stats.hits,
        misses = stats.misses,
        hit_rate = stats.hit_rate,
        size = stats.size,
        "Cache summary"
    );

    let stopped = shutdown.complete(Duration::from_secs(5)).await;
    tracing::info!(tasks = stopped, "Shutdown complete");
    Ok(())
}
