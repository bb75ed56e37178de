//! Public directory reads.
//!
//! Everything here is anonymous traffic. Profiles are stripped down to a
//! public shape (no email, no billing ids) and enriched with the resolved
//! premium facts, so clients never re-derive entitlement rules.

use std::str::FromStr;

use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::http::response::{ApiError, ApiResult};
use crate::http::server::AppState;
use crate::premium::{premium_facts, PremiumFacts};
use crate::store::types::{
    Category, DirectoryFilter, OpeningHour, PortfolioImage, Profile, ProfileStatus, Service,
};

/// A profile as the public sees it.
#[derive(Debug, Serialize)]
pub struct PublicProfile {
    pub id: Uuid,
    pub full_name: String,
    pub slug: String,
    pub category: String,
    pub bio: Option<String>,
    pub city: String,
    pub neighborhood: Option<String>,
    pub address_details: Option<String>,
    pub whatsapp: String,
    pub instagram_handle: Option<String>,
    pub tiktok_handle: Option<String>,
    pub avatar_url: Option<String>,
    pub rating: f64,
    pub review_count: i32,
    pub recommendations_count: i32,
    pub created_at: DateTime<Utc>,
    pub premium: PremiumFacts,
}

impl PublicProfile {
    pub fn from_profile(profile: Profile, now: DateTime<Utc>) -> Self {
        let premium = premium_facts(&profile, now);
        Self {
            id: profile.id,
            full_name: profile.full_name,
            slug: profile.slug,
            category: profile.category,
            bio: profile.bio,
            city: profile.city,
            neighborhood: profile.neighborhood,
            address_details: profile.address_details,
            whatsapp: profile.whatsapp,
            instagram_handle: profile.instagram_handle,
            tiktok_handle: profile.tiktok_handle,
            avatar_url: profile.avatar_url,
            rating: profile.rating,
            review_count: profile.review_count,
            recommendations_count: profile.recommendations_count,
            created_at: profile.created_at,
            premium,
        }
    }
}

/// Full public page for one provider.
#[derive(Debug, Serialize)]
pub struct ProfileDetail {
    #[serde(flatten)]
    pub profile: PublicProfile,
    pub services: Vec<Service>,
    pub opening_hours: Vec<OpeningHour>,
    pub portfolio: Vec<PortfolioImage>,
}

/// `GET /profiles` — active profiles, premium entitlements first.
pub async fn list_profiles(
    State(state): State<AppState>,
    Query(filter): Query<DirectoryFilter>,
) -> ApiResult<Json<Vec<PublicProfile>>> {
    if let Some(category) = filter.category.as_deref() {
        Category::from_str(category)
            .map_err(|_| ApiError::Invalid(format!("unknown category: {category}")))?;
    }

    let now = Utc::now();
    let profiles = state.store.directory(&filter, now).await?;
    let listed = profiles
        .into_iter()
        .map(|profile| PublicProfile::from_profile(profile, now))
        .collect();
    Ok(Json(listed))
}

/// `GET /profiles/{slug}` — one provider with services, hours and portfolio.
/// Pending and banned profiles do not exist as far as the public is
/// concerned.
pub async fn get_profile(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> ApiResult<Json<ProfileDetail>> {
    let profile = state
        .store
        .find_by_slug(&slug)
        .await?
        .ok_or(ApiError::NotFound("profile"))?;
    if profile.status != ProfileStatus::Active.as_str() {
        return Err(ApiError::NotFound("profile"));
    }

    let services = state.store.services_for(profile.id).await?;
    let opening_hours = state.store.hours_for(profile.id).await?;
    let portfolio = state.store.portfolio_for(profile.id).await?;

    Ok(Json(ProfileDetail {
        profile: PublicProfile::from_profile(profile, Utc::now()),
        services,
        opening_hours,
        portfolio,
    }))
}
