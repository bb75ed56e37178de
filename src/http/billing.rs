//! Billing endpoints.

use std::str::FromStr;

use axum::extract::State;
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};

use crate::http::response::{ApiError, ApiResult};
use crate::http::server::AppState;
use crate::payments::checkout::start_checkout;
use crate::store::types::{PlanType, Profile};

#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    /// "monthly", "annual" or "boost". Kept as the camelCase key the
    /// dashboard has always sent.
    #[serde(rename = "planType")]
    pub plan_type: String,
}

#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    #[serde(rename = "sessionId")]
    pub session_id: String,
    pub url: String,
}

/// `POST /billing/checkout-session` — create a hosted payment page for the
/// acting profile.
pub async fn create_checkout_session(
    State(state): State<AppState>,
    Extension(profile): Extension<Profile>,
    Json(request): Json<CheckoutRequest>,
) -> ApiResult<Json<CheckoutResponse>> {
    let plan = PlanType::from_str(&request.plan_type)
        .map_err(|_| ApiError::Invalid(format!("unknown plan type: {}", request.plan_type)))?;

    let session = start_checkout(
        state.store.as_ref(),
        &state.stripe,
        &state.config.stripe,
        &profile,
        plan,
    )
    .await?;

    Ok(Json(CheckoutResponse {
        session_id: session.id,
        url: session.url,
    }))
}
