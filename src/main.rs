//! eclat-api — marketplace backend for beauty professionals.
//!
//! # Architecture Overview
//!
//! ```text
//!                    ┌────────────────────────────────────────────────┐
//!                    │                   ECLAT API                     │
//!                    │                                                 │
//!   Directory /      │  ┌─────────┐   ┌───────────┐   ┌────────────┐  │
//!   Dashboard  ──────┼─▶│  http   │──▶│ handlers  │──▶│   store    │──┼──▶ PostgreSQL
//!   clients          │  │ server  │   │ + premium │   │  (PgStore) │  │
//!                    │  └─────────┘   └───────────┘   └────────────┘  │
//!                    │                                                 │
//!   Payment          │  ┌─────────┐   ┌───────────┐   ┌────────────┐  │
//!   provider   ──────┼─▶│webhooks │──▶│reconciler │──▶│  payments  │──┼──▶ Stripe API
//!   (webhooks)       │  └─────────┘   └───────────┘   │   client   │  │
//!                    │                                └────────────┘  │
//!                    │  ┌───────────────────────────────────────────┐ │
//!                    │  │          Cross-Cutting Concerns            │ │
//!                    │  │  config │ observability │ lifecycle │      │ │
//!                    │  │         │ (logs+metrics)│ (signals) │ sweep│ │
//!                    │  └───────────────────────────────────────────┘ │
//!                    └────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use eclat_api::config::{load_config, AppConfig};
use eclat_api::http::{AppState, HttpServer};
use eclat_api::lifecycle::{shutdown::Shutdown, signals};
use eclat_api::maintenance;
use eclat_api::observability::{logging, metrics};
use eclat_api::store::postgres::PgStore;

#[derive(Parser)]
#[command(name = "eclat-api", version, about = "Marketplace API server")]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let config = match load_config(&args.config) {
        Ok(config) => config,
        Err(error) => {
            eprintln!("configuration error: {error}");
            return ExitCode::FAILURE;
        }
    };

    logging::init(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "eclat-api starting");

    if let Err(error) = metrics::init(&config.observability) {
        // Metrics are not worth refusing to serve over.
        tracing::error!(%error, "metrics exporter failed to start");
    }

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            tracing::error!(%error, "fatal error");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let store = PgStore::connect(&config.database.url, config.database.max_connections).await?;
    if config.database.run_migrations {
        store.run_migrations().await?;
        tracing::info!("migrations applied");
    }

    let config = Arc::new(config);
    let state = AppState::new(Arc::new(store), config.clone());

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();

    if config.maintenance.sweep_enabled {
        tokio::spawn(maintenance::run_sweeper(
            state.store.clone(),
            config.maintenance.sweep_interval_secs,
            shutdown.subscribe(),
        ));
    }

    tokio::spawn(signals::listen(shutdown));

    let listener = TcpListener::bind(&config.server.bind_address).await?;
    HttpServer::new(state).run(listener, server_shutdown).await?;

    tracing::info!("shutdown complete");
    Ok(())
}
