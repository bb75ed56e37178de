//! Public engagement tracking.
//!
//! Fire-and-forget writes from the directory frontend. Unknown profiles
//! are dropped silently so crawlers poking stale links cannot generate
//! errors, and the view dedup happens in the store.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use tracing::debug;
use uuid::Uuid;

use crate::http::response::{ApiError, ApiResult};
use crate::http::server::AppState;

#[derive(Debug, Deserialize)]
pub struct TrackView {
    pub profile_id: Uuid,
    pub fingerprint: String,
}

/// `POST /track/view` — at most one counted view per fingerprint per 24h.
pub async fn track_view(
    State(state): State<AppState>,
    Json(payload): Json<TrackView>,
) -> ApiResult<StatusCode> {
    if payload.fingerprint.trim().is_empty() {
        return Err(ApiError::Invalid("fingerprint must not be empty".to_string()));
    }

    if state.store.find_by_id(payload.profile_id).await?.is_none() {
        debug!(profile = %payload.profile_id, "view for unknown profile dropped");
        return Ok(StatusCode::NO_CONTENT);
    }

    let counted = state
        .store
        .record_view(payload.profile_id, &payload.fingerprint, Utc::now())
        .await?;
    if !counted {
        debug!(profile = %payload.profile_id, "repeat view within 24h not counted");
    }
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct TrackClick {
    pub profile_id: Uuid,
}

/// `POST /track/whatsapp-click`.
pub async fn track_whatsapp_click(
    State(state): State<AppState>,
    Json(payload): Json<TrackClick>,
) -> ApiResult<StatusCode> {
    if state.store.find_by_id(payload.profile_id).await?.is_none() {
        debug!(profile = %payload.profile_id, "click for unknown profile dropped");
        return Ok(StatusCode::NO_CONTENT);
    }

    state.store.record_whatsapp_click(payload.profile_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
