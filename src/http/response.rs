//! API error mapping.
//!
//! # Responsibilities
//! - One error type for every handler
//! - Map domain errors to appropriate HTTP status codes
//! - Keep the wire shape uniform: `{"error": "..."}` JSON
//!
//! # Design Decisions
//! - Internal detail (sqlx, transport failures) is logged, never sent
//! - Provider API messages pass through; they are already user-safe

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use crate::payments::checkout::CheckoutError;
use crate::payments::StripeError;
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("authentication required")]
    Unauthorized,

    #[error("access denied")]
    Forbidden,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Invalid(String),

    #[error("{0}")]
    Upstream(String),

    #[error("internal error")]
    Internal,
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Error response body.
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Invalid(_) => StatusCode::BAD_REQUEST,
            ApiError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = ErrorResponse {
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::NotFound(what) => ApiError::NotFound(what),
            StoreError::Database(e) => {
                tracing::error!(error = %e, "store failure");
                ApiError::Internal
            }
        }
    }
}

impl From<StripeError> for ApiError {
    fn from(error: StripeError) -> Self {
        match error {
            StripeError::Api { status, message } => {
                tracing::error!(status, message = %message, "provider rejected request");
                ApiError::Upstream(message)
            }
            StripeError::Transport(e) => {
                tracing::error!(error = %e, "provider unreachable");
                ApiError::Upstream("payment provider unreachable".to_string())
            }
        }
    }
}

impl From<CheckoutError> for ApiError {
    fn from(error: CheckoutError) -> Self {
        match error {
            CheckoutError::AlreadyPremium => {
                ApiError::Invalid("Vous avez déjà un abonnement premium actif".to_string())
            }
            CheckoutError::PriceNotConfigured(plan) => {
                tracing::error!(%plan, "checkout requested for a plan with no configured price");
                ApiError::Internal
            }
            CheckoutError::Store(e) => e.into(),
            CheckoutError::Stripe(e) => e.into(),
        }
    }
}
