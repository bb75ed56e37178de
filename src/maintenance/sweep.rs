//! Boost expiry sweep.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use metrics::counter;
use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::store::{Store, StoreError};
use crate::store::types::ExpiredBoost;

/// Clear every boost window that has reached its end.
///
/// The store clears rows in a single statement, so concurrent invocations
/// (background loop plus the admin endpoint) cannot both claim a profile.
pub async fn run_sweep(
    store: &dyn Store,
    now: DateTime<Utc>,
) -> Result<Vec<ExpiredBoost>, StoreError> {
    let cleared = store.expire_boosts(now).await?;

    if !cleared.is_empty() {
        for profile in &cleared {
            info!(profile_id = %profile.id, name = %profile.full_name, "boost expired");
        }
        info!(count = cleared.len(), "expiry sweep cleared boosts");
    }
    counter!("boosts_expired_total").increment(cleared.len() as u64);

    Ok(cleared)
}

/// Background sweeper loop.
///
/// Call this in a `tokio::spawn` during startup when the sweep is enabled.
/// The first tick fires immediately, so stale windows left over from
/// downtime are cleared as soon as the service comes up.
pub async fn run_sweeper(
    store: Arc<dyn Store>,
    interval_secs: u64,
    mut shutdown: broadcast::Receiver<()>,
) {
    info!(interval_secs, "boost expiry sweeper started");
    let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs));

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Err(error) = run_sweep(store.as_ref(), Utc::now()).await {
                    warn!(error = %error, "expiry sweep failed");
                }
            }
            _ = shutdown.recv() => {
                info!("boost expiry sweeper stopping");
                break;
            }
        }
    }
}
