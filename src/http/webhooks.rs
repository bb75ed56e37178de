//! Payment provider webhook endpoint.
//!
//! The raw body is verified against the signature header before anything
//! is parsed. Verification failures are the caller's problem (400); store
//! failures are ours (500), which makes the provider redeliver.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use serde_json::json;
use tracing::{debug, error, warn};

use crate::http::server::AppState;
use crate::payments::events::WebhookEvent;
use crate::payments::webhook::{verify_signature, SIGNATURE_HEADER};

/// `POST /webhooks/stripe`.
pub async fn stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let Some(signature) = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok())
    else {
        return bad_request("missing signature header");
    };

    let now = Utc::now();
    if let Err(reason) = verify_signature(
        &body,
        signature,
        &state.config.stripe.webhook_secret,
        now.timestamp(),
    ) {
        warn!(%reason, "webhook signature rejected");
        return bad_request("invalid signature");
    }

    let event: WebhookEvent = match serde_json::from_slice(&body) {
        Ok(event) => event,
        Err(error) => {
            warn!(%error, "webhook body unparseable");
            return bad_request("malformed event payload");
        }
    };

    match state.reconciler.process(&event, now).await {
        Ok(outcome) => {
            debug!(event = %event.id, event_type = %event.event_type, outcome = outcome.as_str(), "webhook settled");
            Json(json!({ "received": true })).into_response()
        }
        Err(error) => {
            error!(event = %event.id, event_type = %event.event_type, %error, "webhook processing failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Webhook processing failed" })),
            )
                .into_response()
        }
    }
}

fn bad_request(message: &str) -> Response {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
}
