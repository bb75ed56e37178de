//! Provider dashboard.
//!
//! Every route here sits behind [`crate::http::auth::require_profile`], so
//! handlers receive the acting profile from request extensions and only
//! ever touch rows scoped to it.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;

use crate::http::response::{ApiError, ApiResult};
use crate::http::server::AppState;
use crate::premium::{premium_facts, PremiumFacts};
use crate::store::types::{
    BoostPurchase, HourEntry, NewService, OpeningHour, PaymentRecord, PortfolioImage, Profile,
    ProfileChanges, Service, SubscriptionRecord, ViewStats,
};

const DEFAULT_PAYMENT_LIMIT: i64 = 20;
const MAX_PAYMENT_LIMIT: i64 = 100;

pub async fn get_my_profile(Extension(profile): Extension<Profile>) -> Json<Profile> {
    Json(profile)
}

/// `PATCH /me/profile` — field-wise update; absent fields stay untouched.
pub async fn update_my_profile(
    State(state): State<AppState>,
    Extension(profile): Extension<Profile>,
    Json(changes): Json<ProfileChanges>,
) -> ApiResult<Json<Profile>> {
    if changes.is_empty() {
        return Err(ApiError::Invalid("no fields to update".to_string()));
    }
    let updated = state.store.update_profile(profile.id, &changes).await?;
    Ok(Json(updated))
}

pub async fn get_my_hours(
    State(state): State<AppState>,
    Extension(profile): Extension<Profile>,
) -> ApiResult<Json<Vec<OpeningHour>>> {
    Ok(Json(state.store.hours_for(profile.id).await?))
}

/// `PUT /me/hours` — bulk upsert of the weekly grid.
pub async fn put_my_hours(
    State(state): State<AppState>,
    Extension(profile): Extension<Profile>,
    Json(entries): Json<Vec<HourEntry>>,
) -> ApiResult<Json<Vec<OpeningHour>>> {
    validate_hours(&entries)?;
    state.store.set_hours(profile.id, &entries).await?;
    Ok(Json(state.store.hours_for(profile.id).await?))
}

fn validate_hours(entries: &[HourEntry]) -> Result<(), ApiError> {
    let mut seen = [false; 7];
    for entry in entries {
        let day = entry.day_of_week;
        if !(0..=6).contains(&day) {
            return Err(ApiError::Invalid(format!("day_of_week out of range: {day}")));
        }
        if seen[day as usize] {
            return Err(ApiError::Invalid(format!("duplicate day_of_week: {day}")));
        }
        seen[day as usize] = true;

        if entry.is_closed {
            continue;
        }
        match (entry.open_time, entry.close_time) {
            (Some(open), Some(close)) if open < close => {}
            (Some(_), Some(_)) => {
                return Err(ApiError::Invalid(format!(
                    "open_time must be before close_time on day {day}"
                )));
            }
            _ => {
                return Err(ApiError::Invalid(format!(
                    "open day {day} needs both open_time and close_time"
                )));
            }
        }
    }
    Ok(())
}

pub async fn list_my_services(
    State(state): State<AppState>,
    Extension(profile): Extension<Profile>,
) -> ApiResult<Json<Vec<Service>>> {
    Ok(Json(state.store.services_for(profile.id).await?))
}

pub async fn add_my_service(
    State(state): State<AppState>,
    Extension(profile): Extension<Profile>,
    Json(service): Json<NewService>,
) -> ApiResult<(StatusCode, Json<Service>)> {
    if service.title.trim().is_empty() {
        return Err(ApiError::Invalid("title must not be empty".to_string()));
    }
    if service.price_cfa <= 0 {
        return Err(ApiError::Invalid("price_cfa must be positive".to_string()));
    }
    let created = state.store.add_service(profile.id, &service).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn delete_my_service(
    State(state): State<AppState>,
    Extension(profile): Extension<Profile>,
    Path(service_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    if !state.store.delete_service(profile.id, service_id).await? {
        return Err(ApiError::NotFound("service"));
    }
    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_my_portfolio(
    State(state): State<AppState>,
    Extension(profile): Extension<Profile>,
) -> ApiResult<Json<Vec<PortfolioImage>>> {
    Ok(Json(state.store.portfolio_for(profile.id).await?))
}

#[derive(Debug, Deserialize)]
pub struct NewPortfolioImage {
    pub image_url: String,
}

pub async fn add_to_portfolio(
    State(state): State<AppState>,
    Extension(profile): Extension<Profile>,
    Json(image): Json<NewPortfolioImage>,
) -> ApiResult<(StatusCode, Json<PortfolioImage>)> {
    if Url::parse(&image.image_url).is_err() {
        return Err(ApiError::Invalid("image_url must be a valid URL".to_string()));
    }
    let created = state
        .store
        .add_portfolio_image(profile.id, &image.image_url)
        .await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn delete_from_portfolio(
    State(state): State<AppState>,
    Extension(profile): Extension<Profile>,
    Path(image_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    if !state.store.delete_portfolio_image(profile.id, image_id).await? {
        return Err(ApiError::NotFound("image"));
    }
    Ok(StatusCode::NO_CONTENT)
}

/// Resolved entitlement plus the raw billing rows behind it.
#[derive(Debug, Serialize)]
pub struct PremiumSummary {
    #[serde(flatten)]
    pub facts: PremiumFacts,
    pub subscription: Option<SubscriptionRecord>,
    pub latest_boost: Option<BoostPurchase>,
}

pub async fn get_my_premium(
    State(state): State<AppState>,
    Extension(profile): Extension<Profile>,
) -> ApiResult<Json<PremiumSummary>> {
    let subscription = state.store.latest_subscription(profile.id).await?;
    let latest_boost = state.store.latest_boost(profile.id).await?;
    Ok(Json(PremiumSummary {
        facts: premium_facts(&profile, Utc::now()),
        subscription,
        latest_boost,
    }))
}

#[derive(Debug, Deserialize)]
pub struct PaymentsQuery {
    pub limit: Option<i64>,
}

pub async fn get_my_payments(
    State(state): State<AppState>,
    Extension(profile): Extension<Profile>,
    Query(query): Query<PaymentsQuery>,
) -> ApiResult<Json<Vec<PaymentRecord>>> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_PAYMENT_LIMIT)
        .clamp(1, MAX_PAYMENT_LIMIT);
    Ok(Json(state.store.payments_for_profile(profile.id, limit).await?))
}

pub async fn get_my_stats(
    State(state): State<AppState>,
    Extension(profile): Extension<Profile>,
) -> ApiResult<Json<ViewStats>> {
    Ok(Json(state.store.view_stats(profile.id, Utc::now()).await?))
}
