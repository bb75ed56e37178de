//! Typed rows and domain enums for every table.
//!
//! Columns with a closed set of values are stored as TEXT and surfaced as
//! `String` on the row structs; the enums below parse/format at the edges
//! so no dynamic casts leak past the store boundary.

use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Provider craft categories, as listed in the public directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Coiffure,
    Makeup,
    Onglerie,
    Regard,
    Soins,
    Spa,
    Henne,
    Barber,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Coiffure => "coiffure",
            Category::Makeup => "makeup",
            Category::Onglerie => "onglerie",
            Category::Regard => "regard",
            Category::Soins => "soins",
            Category::Spa => "spa",
            Category::Henne => "henne",
            Category::Barber => "barber",
        }
    }
}

impl FromStr for Category {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "coiffure" => Ok(Category::Coiffure),
            "makeup" => Ok(Category::Makeup),
            "onglerie" => Ok(Category::Onglerie),
            "regard" => Ok(Category::Regard),
            "soins" => Ok(Category::Soins),
            "spa" => Ok(Category::Spa),
            "henne" => Ok(Category::Henne),
            "barber" => Ok(Category::Barber),
            _ => Err(()),
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Moderation state of a profile. Only `active` profiles are listed publicly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProfileStatus {
    Active,
    Pending,
    Banned,
}

impl ProfileStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProfileStatus::Active => "active",
            ProfileStatus::Pending => "pending",
            ProfileStatus::Banned => "banned",
        }
    }
}

impl FromStr for ProfileStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(ProfileStatus::Active),
            "pending" => Ok(ProfileStatus::Pending),
            "banned" => Ok(ProfileStatus::Banned),
            _ => Err(()),
        }
    }
}

impl fmt::Display for ProfileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Purchasable plans. `monthly`/`annual` are recurring subscriptions,
/// `boost` is a one-time 7-day visibility window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanType {
    Monthly,
    Annual,
    Boost,
}

impl PlanType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanType::Monthly => "monthly",
            PlanType::Annual => "annual",
            PlanType::Boost => "boost",
        }
    }
}

impl FromStr for PlanType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "monthly" => Ok(PlanType::Monthly),
            "annual" => Ok(PlanType::Annual),
            "boost" => Ok(PlanType::Boost),
            _ => Err(()),
        }
    }
}

impl fmt::Display for PlanType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A provider profile row.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct Profile {
    pub id: Uuid,
    pub email: String,
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
    pub stripe_customer_id: Option<String>,
    pub is_premium: bool,
    pub premium_boost_end_at: Option<DateTime<Utc>>,
    pub premium_boost_activated_at: Option<DateTime<Utc>>,
    pub rating: f64,
    pub review_count: i32,
    pub recommendations_count: i32,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Field-wise profile update from the dashboard. `None` leaves the column
/// untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileChanges {
    pub full_name: Option<String>,
    pub bio: Option<String>,
    pub city: Option<String>,
    pub neighborhood: Option<String>,
    pub address_details: Option<String>,
    pub whatsapp: Option<String>,
    pub instagram_handle: Option<String>,
    pub tiktok_handle: Option<String>,
    pub avatar_url: Option<String>,
}

impl ProfileChanges {
    pub fn is_empty(&self) -> bool {
        self.full_name.is_none()
            && self.bio.is_none()
            && self.city.is_none()
            && self.neighborhood.is_none()
            && self.address_details.is_none()
            && self.whatsapp.is_none()
            && self.instagram_handle.is_none()
            && self.tiktok_handle.is_none()
            && self.avatar_url.is_none()
    }
}

/// Optional filters for the public directory listing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DirectoryFilter {
    pub category: Option<String>,
    pub city: Option<String>,
}

/// A priced service offered by a provider.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct Service {
    pub id: Uuid,
    pub profile_id: Uuid,
    pub title: String,
    pub price_cfa: i64,
    pub currency: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewService {
    pub title: String,
    pub price_cfa: i64,
    #[serde(default = "default_currency")]
    pub currency: String,
}

fn default_currency() -> String {
    "XOF".to_string()
}

/// One weekday of the opening-hours grid.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct OpeningHour {
    pub id: Uuid,
    pub profile_id: Uuid,
    pub day_of_week: i16,
    pub open_time: Option<NaiveTime>,
    pub close_time: Option<NaiveTime>,
    pub is_closed: bool,
}

/// Upsert payload for one weekday, as sent by the dashboard hours editor.
#[derive(Debug, Clone, Deserialize)]
pub struct HourEntry {
    pub day_of_week: i16,
    pub open_time: Option<NaiveTime>,
    pub close_time: Option<NaiveTime>,
    #[serde(default)]
    pub is_closed: bool,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct PortfolioImage {
    pub id: Uuid,
    pub profile_id: Uuid,
    pub image_url: String,
    pub created_at: DateTime<Utc>,
}

/// A subscription row mirrored from the provider, one per
/// `stripe_subscription_id`.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct SubscriptionRecord {
    pub id: Uuid,
    pub profile_id: Uuid,
    pub stripe_customer_id: String,
    pub stripe_subscription_id: String,
    pub stripe_price_id: String,
    pub status: String,
    pub plan_type: String,
    pub amount_cents: i64,
    pub currency: String,
    pub current_period_start: DateTime<Utc>,
    pub current_period_end: DateTime<Utc>,
    pub cancel_at_period_end: bool,
    pub canceled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Upsert payload for `customer.subscription.created/updated` events.
#[derive(Debug, Clone)]
pub struct NewSubscription {
    pub profile_id: Uuid,
    pub stripe_customer_id: String,
    pub stripe_subscription_id: String,
    pub stripe_price_id: String,
    pub status: String,
    pub plan_type: String,
    pub amount_cents: i64,
    pub currency: String,
    pub current_period_start: DateTime<Utc>,
    pub current_period_end: DateTime<Utc>,
    pub cancel_at_period_end: bool,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct BoostPurchase {
    pub id: Uuid,
    pub profile_id: Uuid,
    pub provider: String,
    pub amount_cents: i64,
    pub currency: String,
    pub status: String,
    pub stripe_payment_intent_id: Option<String>,
    pub activated_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewBoostPurchase {
    pub profile_id: Uuid,
    pub amount_cents: i64,
    pub currency: String,
    pub status: String,
    pub stripe_payment_intent_id: Option<String>,
    pub activated_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// One line of the append-only payment ledger.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct PaymentRecord {
    pub id: Uuid,
    pub profile_id: Uuid,
    pub provider: String,
    pub stripe_payment_intent_id: Option<String>,
    pub stripe_invoice_id: Option<String>,
    pub amount_cents: i64,
    pub currency: String,
    pub plan_type: String,
    pub status: String,
    pub description: String,
    pub receipt_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewPayment {
    pub profile_id: Uuid,
    pub stripe_payment_intent_id: Option<String>,
    pub stripe_invoice_id: Option<String>,
    pub amount_cents: i64,
    pub currency: String,
    pub plan_type: String,
    pub status: String,
    pub description: String,
    pub receipt_url: Option<String>,
}

/// Identity of a profile whose boost the sweep just cleared.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct ExpiredBoost {
    pub id: Uuid,
    pub full_name: String,
}

/// Dashboard view/contact aggregates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ViewStats {
    pub last_7_days: i64,
    pub last_30_days: i64,
    pub total: i64,
    pub whatsapp_clicks_7_days: i64,
    pub whatsapp_clicks_30_days: i64,
}

/// Platform-wide totals for the admin analytics view.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PlatformCounts {
    pub total_profiles: i64,
    pub active_profiles: i64,
    pub pending_profiles: i64,
    pub banned_profiles: i64,
    pub premium_profiles: i64,
    pub views_last_30_days: i64,
    pub whatsapp_clicks_last_30_days: i64,
}
