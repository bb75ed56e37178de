//! Persistence boundary.
//!
//! Handlers and the payment reconciler talk to these traits, never to sqlx
//! directly. [`postgres::PgStore`] is the production implementation; tests
//! substitute an in-memory one behind the same `Arc<dyn Store>`.

pub mod postgres;
pub mod types;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use types::{
    BoostPurchase, DirectoryFilter, ExpiredBoost, HourEntry, NewBoostPurchase, NewPayment,
    NewService, NewSubscription, OpeningHour, PaymentRecord, PlatformCounts, PortfolioImage,
    Profile, ProfileChanges, ProfileStatus, Service, SubscriptionRecord, ViewStats,
};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("{0} not found")]
    NotFound(&'static str),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Profile reads and the writes the billing/moderation paths need.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Active profiles, premium entitlements first. `now` decides which
    /// boosts still count.
    async fn directory(
        &self,
        filter: &DirectoryFilter,
        now: DateTime<Utc>,
    ) -> StoreResult<Vec<Profile>>;

    async fn find_by_slug(&self, slug: &str) -> StoreResult<Option<Profile>>;

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Profile>>;

    async fn find_by_customer(&self, customer_id: &str) -> StoreResult<Option<Profile>>;

    async fn update_profile(&self, id: Uuid, changes: &ProfileChanges) -> StoreResult<Profile>;

    async fn set_customer_id(&self, id: Uuid, customer_id: &str) -> StoreResult<()>;

    /// Flip the subscription entitlement flag.
    async fn set_subscription_premium(&self, id: Uuid, active: bool) -> StoreResult<()>;

    /// Overwrite the boost window after a successful boost purchase.
    async fn set_boost_window(
        &self,
        id: Uuid,
        activated_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<()>;

    async fn set_status(&self, id: Uuid, status: ProfileStatus) -> StoreResult<Profile>;

    /// Clear every boost window that ended strictly before `now` and report
    /// which profiles were touched. One statement, so two concurrent sweeps
    /// cannot both claim a profile.
    async fn expire_boosts(&self, now: DateTime<Utc>) -> StoreResult<Vec<ExpiredBoost>>;
}

/// Subscriptions, boost purchases, the payment ledger and the webhook
/// replay guard.
#[async_trait]
pub trait BillingStore: Send + Sync {
    /// Insert or refresh a mirrored subscription, keyed on
    /// `stripe_subscription_id`.
    async fn upsert_subscription(&self, sub: &NewSubscription) -> StoreResult<()>;

    /// Mark a mirrored subscription canceled. Returns false when no row
    /// matched the id.
    async fn cancel_subscription(
        &self,
        stripe_subscription_id: &str,
        canceled_at: DateTime<Utc>,
    ) -> StoreResult<bool>;

    /// Most recently created subscription row for a profile, if any.
    async fn latest_subscription(&self, profile_id: Uuid)
        -> StoreResult<Option<SubscriptionRecord>>;

    /// Mirrored subscription by its provider id, as carried on invoices.
    async fn subscription_by_provider_id(
        &self,
        stripe_subscription_id: &str,
    ) -> StoreResult<Option<SubscriptionRecord>>;

    async fn insert_boost(&self, boost: &NewBoostPurchase) -> StoreResult<()>;

    async fn latest_boost(&self, profile_id: Uuid) -> StoreResult<Option<BoostPurchase>>;

    async fn insert_payment(&self, payment: &NewPayment) -> StoreResult<()>;

    async fn payments_for_profile(
        &self,
        profile_id: Uuid,
        limit: i64,
    ) -> StoreResult<Vec<PaymentRecord>>;

    /// True when this provider event id was already handled.
    async fn already_processed(&self, event_id: &str) -> StoreResult<bool>;

    /// Remember a handled provider event id. Inserting the same id twice is
    /// a no-op.
    async fn record_event(&self, event_id: &str, event_type: &str) -> StoreResult<()>;
}

/// Services, opening hours and portfolio images owned by a profile.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn services_for(&self, profile_id: Uuid) -> StoreResult<Vec<Service>>;

    async fn add_service(&self, profile_id: Uuid, service: &NewService) -> StoreResult<Service>;

    /// Delete a service, but only when it belongs to `profile_id`. Returns
    /// false when nothing matched.
    async fn delete_service(&self, profile_id: Uuid, service_id: Uuid) -> StoreResult<bool>;

    async fn hours_for(&self, profile_id: Uuid) -> StoreResult<Vec<OpeningHour>>;

    /// Upsert one row per weekday. Days absent from `entries` are left as
    /// they were.
    async fn set_hours(&self, profile_id: Uuid, entries: &[HourEntry]) -> StoreResult<()>;

    async fn portfolio_for(&self, profile_id: Uuid) -> StoreResult<Vec<PortfolioImage>>;

    async fn add_portfolio_image(
        &self,
        profile_id: Uuid,
        image_url: &str,
    ) -> StoreResult<PortfolioImage>;

    async fn delete_portfolio_image(&self, profile_id: Uuid, image_id: Uuid) -> StoreResult<bool>;
}

/// View/contact tracking and the aggregates built on top of it.
#[async_trait]
pub trait AnalyticsStore: Send + Sync {
    /// Count a profile view unless the same fingerprint viewed it within
    /// the last 24 hours. Returns whether the view was counted.
    async fn record_view(
        &self,
        profile_id: Uuid,
        fingerprint: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<bool>;

    async fn record_whatsapp_click(&self, profile_id: Uuid) -> StoreResult<()>;

    async fn view_stats(&self, profile_id: Uuid, now: DateTime<Utc>) -> StoreResult<ViewStats>;

    async fn platform_counts(&self, now: DateTime<Utc>) -> StoreResult<PlatformCounts>;
}

/// The full persistence surface the application state carries around.
pub trait Store: ProfileStore + BillingStore + CatalogStore + AnalyticsStore {}

impl<T> Store for T where T: ProfileStore + BillingStore + CatalogStore + AnalyticsStore {}
