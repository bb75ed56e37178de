//! Provider authentication.
//!
//! The upstream identity layer authenticates providers and forwards the
//! acting profile id in a header. This middleware resolves it to a full
//! profile row and attaches it to the request, so handlers never re-fetch.

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use tracing::warn;
use uuid::Uuid;

use crate::http::response::ApiError;
use crate::http::server::AppState;
use crate::store::types::ProfileStatus;

pub const PROFILE_HEADER: &str = "x-profile-id";

/// Reject requests without a resolvable profile. Banned profiles keep
/// their data but lose dashboard access.
pub async fn require_profile(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let raw = request
        .headers()
        .get(PROFILE_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or(ApiError::Unauthorized)?;

    let id = Uuid::parse_str(raw).map_err(|_| ApiError::Unauthorized)?;
    let profile = state
        .store
        .find_by_id(id)
        .await?
        .ok_or(ApiError::Unauthorized)?;

    if profile.status == ProfileStatus::Banned.as_str() {
        warn!(profile = %profile.id, "banned profile rejected");
        return Err(ApiError::Forbidden);
    }

    request.extensions_mut().insert(profile);
    Ok(next.run(request).await)
}
