use std::str::FromStr;

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::http::response::{ApiError, ApiResult};
use crate::http::server::AppState;
use crate::maintenance;
use crate::store::types::{PlatformCounts, Profile, ProfileStatus};

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
}

pub async fn get_status() -> Json<SystemStatus> {
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
    })
}

pub async fn get_analytics(State(state): State<AppState>) -> ApiResult<Json<PlatformCounts>> {
    let counts = state.store.platform_counts(Utc::now()).await?;
    Ok(Json(counts))
}

#[derive(Deserialize)]
pub struct StatusUpdate {
    pub status: String,
}

/// `PATCH /admin/profiles/{id}/status` — moderation: active, pending or
/// banned.
pub async fn set_profile_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(update): Json<StatusUpdate>,
) -> ApiResult<Json<Profile>> {
    let status = ProfileStatus::from_str(&update.status)
        .map_err(|_| ApiError::Invalid(format!("unknown status: {}", update.status)))?;

    let profile = state.store.set_status(id, status).await?;
    info!(profile = %profile.id, status = %status, "profile status changed");
    Ok(Json(profile))
}

#[derive(Serialize)]
pub struct SweptProfile {
    pub id: Uuid,
    pub name: String,
}

#[derive(Serialize)]
pub struct SweepSummary {
    pub message: String,
    pub processed: usize,
    pub profiles: Vec<SweptProfile>,
}

/// `POST /admin/tasks/expire-boosts` — the external cron entry point for
/// the expiry sweep.
pub async fn run_expire_boosts(State(state): State<AppState>) -> ApiResult<Json<SweepSummary>> {
    let cleared = maintenance::run_sweep(state.store.as_ref(), Utc::now()).await?;

    let profiles: Vec<SweptProfile> = cleared
        .into_iter()
        .map(|expired| SweptProfile {
            id: expired.id,
            name: expired.full_name,
        })
        .collect();

    Ok(Json(SweepSummary {
        message: format!("{} expired boost(s) processed", profiles.len()),
        processed: profiles.len(),
        profiles,
    }))
}
