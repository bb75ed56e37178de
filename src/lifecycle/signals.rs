//! OS signal handling.
//!
//! # Responsibilities
//! - Register signal handlers (SIGTERM, SIGINT)
//! - Translate signals to internal shutdown events
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - Both signals trigger the same graceful shutdown path

use tokio::signal;
use tracing::info;

use super::shutdown::Shutdown;

/// Wait for SIGINT or SIGTERM, then trigger the coordinator.
///
/// Consumes the coordinator so the caller keeps only receivers; once this
/// task fires, every subscriber drains and the process exits.
pub async fn listen(shutdown: Shutdown) {
    wait_for_signal().await;
    info!(
        subscribers = shutdown.receiver_count(),
        "shutdown signal received"
    );
    shutdown.trigger();
}

async fn wait_for_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
