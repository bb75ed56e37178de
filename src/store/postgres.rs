//! Postgres-backed [`Store`](super::Store) implementation.
//!
//! All statements go through the runtime query API with explicit binds, and
//! every row maps by column name, so the schema in `migrations/` is the only
//! source of truth.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use uuid::Uuid;

use super::types::{
    BoostPurchase, DirectoryFilter, ExpiredBoost, HourEntry, NewBoostPurchase, NewPayment,
    NewService, NewSubscription, OpeningHour, PaymentRecord, PlatformCounts, PortfolioImage,
    Profile, ProfileChanges, ProfileStatus, Service, SubscriptionRecord, ViewStats,
};
use super::{AnalyticsStore, BillingStore, CatalogStore, ProfileStore, StoreError, StoreResult};

const PROFILE_COLUMNS: &str = "id, email, full_name, slug, category, bio, city, neighborhood, \
     address_details, whatsapp, instagram_handle, tiktok_handle, avatar_url, stripe_customer_id, \
     is_premium, premium_boost_end_at, premium_boost_activated_at, rating, review_count, \
     recommendations_count, status, created_at, updated_at";

const SUBSCRIPTION_COLUMNS: &str = "id, profile_id, stripe_customer_id, stripe_subscription_id, \
     stripe_price_id, status, plan_type, amount_cents, currency, current_period_start, \
     current_period_end, cancel_at_period_end, canceled_at, created_at";

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a bounded connection pool against `url`.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(5))
            .connect(url)
            .await?;
        Ok(Self { pool })
    }

    /// Apply anything pending under `migrations/`.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl ProfileStore for PgStore {
    async fn directory(
        &self,
        filter: &DirectoryFilter,
        now: DateTime<Utc>,
    ) -> StoreResult<Vec<Profile>> {
        let sql = format!(
            "SELECT {PROFILE_COLUMNS} FROM profiles \
             WHERE status = 'active' \
               AND ($1::text IS NULL OR category = $1) \
               AND ($2::text IS NULL OR city ILIKE $2) \
             ORDER BY (is_premium OR (premium_boost_end_at IS NOT NULL AND premium_boost_end_at > $3)) DESC, \
                      rating DESC, review_count DESC, created_at DESC"
        );
        let rows = sqlx::query_as::<_, Profile>(&sql)
            .bind(filter.category.as_deref())
            .bind(filter.city.as_deref())
            .bind(now)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn find_by_slug(&self, slug: &str) -> StoreResult<Option<Profile>> {
        let sql = format!("SELECT {PROFILE_COLUMNS} FROM profiles WHERE slug = $1");
        let row = sqlx::query_as::<_, Profile>(&sql)
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Profile>> {
        let sql = format!("SELECT {PROFILE_COLUMNS} FROM profiles WHERE id = $1");
        let row = sqlx::query_as::<_, Profile>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn find_by_customer(&self, customer_id: &str) -> StoreResult<Option<Profile>> {
        let sql = format!("SELECT {PROFILE_COLUMNS} FROM profiles WHERE stripe_customer_id = $1");
        let row = sqlx::query_as::<_, Profile>(&sql)
            .bind(customer_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn update_profile(&self, id: Uuid, changes: &ProfileChanges) -> StoreResult<Profile> {
        // NULL binds fall through COALESCE and keep the stored value.
        let sql = format!(
            "UPDATE profiles SET \
                full_name = COALESCE($2, full_name), \
                bio = COALESCE($3, bio), \
                city = COALESCE($4, city), \
                neighborhood = COALESCE($5, neighborhood), \
                address_details = COALESCE($6, address_details), \
                whatsapp = COALESCE($7, whatsapp), \
                instagram_handle = COALESCE($8, instagram_handle), \
                tiktok_handle = COALESCE($9, tiktok_handle), \
                avatar_url = COALESCE($10, avatar_url), \
                updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {PROFILE_COLUMNS}"
        );
        sqlx::query_as::<_, Profile>(&sql)
            .bind(id)
            .bind(changes.full_name.as_deref())
            .bind(changes.bio.as_deref())
            .bind(changes.city.as_deref())
            .bind(changes.neighborhood.as_deref())
            .bind(changes.address_details.as_deref())
            .bind(changes.whatsapp.as_deref())
            .bind(changes.instagram_handle.as_deref())
            .bind(changes.tiktok_handle.as_deref())
            .bind(changes.avatar_url.as_deref())
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound("profile"))
    }

    async fn set_customer_id(&self, id: Uuid, customer_id: &str) -> StoreResult<()> {
        let done =
            sqlx::query("UPDATE profiles SET stripe_customer_id = $2, updated_at = NOW() WHERE id = $1")
                .bind(id)
                .bind(customer_id)
                .execute(&self.pool)
                .await?;
        if done.rows_affected() == 0 {
            return Err(StoreError::NotFound("profile"));
        }
        Ok(())
    }

    async fn set_subscription_premium(&self, id: Uuid, active: bool) -> StoreResult<()> {
        let done = sqlx::query("UPDATE profiles SET is_premium = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(active)
            .execute(&self.pool)
            .await?;
        if done.rows_affected() == 0 {
            return Err(StoreError::NotFound("profile"));
        }
        Ok(())
    }

    async fn set_boost_window(
        &self,
        id: Uuid,
        activated_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<()> {
        let done = sqlx::query(
            "UPDATE profiles SET premium_boost_activated_at = $2, premium_boost_end_at = $3, \
             updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(activated_at)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;
        if done.rows_affected() == 0 {
            return Err(StoreError::NotFound("profile"));
        }
        Ok(())
    }

    async fn set_status(&self, id: Uuid, status: ProfileStatus) -> StoreResult<Profile> {
        let sql = format!(
            "UPDATE profiles SET status = $2, updated_at = NOW() WHERE id = $1 \
             RETURNING {PROFILE_COLUMNS}"
        );
        sqlx::query_as::<_, Profile>(&sql)
            .bind(id)
            .bind(status.as_str())
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound("profile"))
    }

    async fn expire_boosts(&self, now: DateTime<Utc>) -> StoreResult<Vec<ExpiredBoost>> {
        // Single statement so concurrent sweeps cannot both claim a row.
        let cleared = sqlx::query_as::<_, ExpiredBoost>(
            "UPDATE profiles \
             SET premium_boost_end_at = NULL, premium_boost_activated_at = NULL, updated_at = NOW() \
             WHERE premium_boost_end_at IS NOT NULL AND premium_boost_end_at < $1 \
             RETURNING id, full_name",
        )
        .bind(now)
        .fetch_all(&self.pool)
        .await?;
        Ok(cleared)
    }
}

#[async_trait]
impl BillingStore for PgStore {
    async fn upsert_subscription(&self, sub: &NewSubscription) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO subscriptions \
                (id, profile_id, stripe_customer_id, stripe_subscription_id, stripe_price_id, \
                 status, plan_type, amount_cents, currency, current_period_start, \
                 current_period_end, cancel_at_period_end) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12) \
             ON CONFLICT (stripe_subscription_id) DO UPDATE SET \
                status = EXCLUDED.status, \
                stripe_price_id = EXCLUDED.stripe_price_id, \
                amount_cents = EXCLUDED.amount_cents, \
                current_period_start = EXCLUDED.current_period_start, \
                current_period_end = EXCLUDED.current_period_end, \
                cancel_at_period_end = EXCLUDED.cancel_at_period_end",
        )
        .bind(Uuid::new_v4())
        .bind(sub.profile_id)
        .bind(&sub.stripe_customer_id)
        .bind(&sub.stripe_subscription_id)
        .bind(&sub.stripe_price_id)
        .bind(&sub.status)
        .bind(&sub.plan_type)
        .bind(sub.amount_cents)
        .bind(&sub.currency)
        .bind(sub.current_period_start)
        .bind(sub.current_period_end)
        .bind(sub.cancel_at_period_end)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn cancel_subscription(
        &self,
        stripe_subscription_id: &str,
        canceled_at: DateTime<Utc>,
    ) -> StoreResult<bool> {
        let done = sqlx::query(
            "UPDATE subscriptions SET status = 'canceled', canceled_at = $2 \
             WHERE stripe_subscription_id = $1",
        )
        .bind(stripe_subscription_id)
        .bind(canceled_at)
        .execute(&self.pool)
        .await?;
        Ok(done.rows_affected() > 0)
    }

    async fn latest_subscription(
        &self,
        profile_id: Uuid,
    ) -> StoreResult<Option<SubscriptionRecord>> {
        let sql = format!(
            "SELECT {SUBSCRIPTION_COLUMNS} FROM subscriptions \
             WHERE profile_id = $1 ORDER BY created_at DESC LIMIT 1"
        );
        let row = sqlx::query_as::<_, SubscriptionRecord>(&sql)
            .bind(profile_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn subscription_by_provider_id(
        &self,
        stripe_subscription_id: &str,
    ) -> StoreResult<Option<SubscriptionRecord>> {
        let sql = format!(
            "SELECT {SUBSCRIPTION_COLUMNS} FROM subscriptions WHERE stripe_subscription_id = $1"
        );
        let row = sqlx::query_as::<_, SubscriptionRecord>(&sql)
            .bind(stripe_subscription_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn insert_boost(&self, boost: &NewBoostPurchase) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO boost_purchases \
                (id, profile_id, amount_cents, currency, status, stripe_payment_intent_id, \
                 activated_at, expires_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(Uuid::new_v4())
        .bind(boost.profile_id)
        .bind(boost.amount_cents)
        .bind(&boost.currency)
        .bind(&boost.status)
        .bind(boost.stripe_payment_intent_id.as_deref())
        .bind(boost.activated_at)
        .bind(boost.expires_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn latest_boost(&self, profile_id: Uuid) -> StoreResult<Option<BoostPurchase>> {
        let row = sqlx::query_as::<_, BoostPurchase>(
            "SELECT id, profile_id, provider, amount_cents, currency, status, \
                    stripe_payment_intent_id, activated_at, expires_at, created_at \
             FROM boost_purchases WHERE profile_id = $1 ORDER BY created_at DESC LIMIT 1",
        )
        .bind(profile_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn insert_payment(&self, payment: &NewPayment) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO payment_history \
                (id, profile_id, stripe_payment_intent_id, stripe_invoice_id, amount_cents, \
                 currency, plan_type, status, description, receipt_url) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(Uuid::new_v4())
        .bind(payment.profile_id)
        .bind(payment.stripe_payment_intent_id.as_deref())
        .bind(payment.stripe_invoice_id.as_deref())
        .bind(payment.amount_cents)
        .bind(&payment.currency)
        .bind(&payment.plan_type)
        .bind(&payment.status)
        .bind(&payment.description)
        .bind(payment.receipt_url.as_deref())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn payments_for_profile(
        &self,
        profile_id: Uuid,
        limit: i64,
    ) -> StoreResult<Vec<PaymentRecord>> {
        let rows = sqlx::query_as::<_, PaymentRecord>(
            "SELECT id, profile_id, provider, stripe_payment_intent_id, stripe_invoice_id, \
                    amount_cents, currency, plan_type, status, description, receipt_url, created_at \
             FROM payment_history WHERE profile_id = $1 \
             ORDER BY created_at DESC LIMIT $2",
        )
        .bind(profile_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn already_processed(&self, event_id: &str) -> StoreResult<bool> {
        let seen: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM webhook_events WHERE stripe_event_id = $1)",
        )
        .bind(event_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(seen)
    }

    async fn record_event(&self, event_id: &str, event_type: &str) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO webhook_events (stripe_event_id, event_type) VALUES ($1, $2) \
             ON CONFLICT (stripe_event_id) DO NOTHING",
        )
        .bind(event_id)
        .bind(event_type)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl CatalogStore for PgStore {
    async fn services_for(&self, profile_id: Uuid) -> StoreResult<Vec<Service>> {
        let rows = sqlx::query_as::<_, Service>(
            "SELECT id, profile_id, title, price_cfa, currency, created_at \
             FROM services WHERE profile_id = $1 ORDER BY created_at",
        )
        .bind(profile_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn add_service(&self, profile_id: Uuid, service: &NewService) -> StoreResult<Service> {
        let row = sqlx::query_as::<_, Service>(
            "INSERT INTO services (id, profile_id, title, price_cfa, currency) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING id, profile_id, title, price_cfa, currency, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(profile_id)
        .bind(&service.title)
        .bind(service.price_cfa)
        .bind(&service.currency)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn delete_service(&self, profile_id: Uuid, service_id: Uuid) -> StoreResult<bool> {
        let done = sqlx::query("DELETE FROM services WHERE id = $2 AND profile_id = $1")
            .bind(profile_id)
            .bind(service_id)
            .execute(&self.pool)
            .await?;
        Ok(done.rows_affected() > 0)
    }

    async fn hours_for(&self, profile_id: Uuid) -> StoreResult<Vec<OpeningHour>> {
        let rows = sqlx::query_as::<_, OpeningHour>(
            "SELECT id, profile_id, day_of_week, open_time, close_time, is_closed \
             FROM opening_hours WHERE profile_id = $1 ORDER BY day_of_week",
        )
        .bind(profile_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn set_hours(&self, profile_id: Uuid, entries: &[HourEntry]) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;
        for entry in entries {
            sqlx::query(
                "INSERT INTO opening_hours (id, profile_id, day_of_week, open_time, close_time, is_closed) \
                 VALUES ($1, $2, $3, $4, $5, $6) \
                 ON CONFLICT (profile_id, day_of_week) DO UPDATE SET \
                    open_time = EXCLUDED.open_time, \
                    close_time = EXCLUDED.close_time, \
                    is_closed = EXCLUDED.is_closed",
            )
            .bind(Uuid::new_v4())
            .bind(profile_id)
            .bind(entry.day_of_week)
            .bind(entry.open_time)
            .bind(entry.close_time)
            .bind(entry.is_closed)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn portfolio_for(&self, profile_id: Uuid) -> StoreResult<Vec<PortfolioImage>> {
        let rows = sqlx::query_as::<_, PortfolioImage>(
            "SELECT id, profile_id, image_url, created_at \
             FROM portfolio_images WHERE profile_id = $1 ORDER BY created_at DESC",
        )
        .bind(profile_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn add_portfolio_image(
        &self,
        profile_id: Uuid,
        image_url: &str,
    ) -> StoreResult<PortfolioImage> {
        let row = sqlx::query_as::<_, PortfolioImage>(
            "INSERT INTO portfolio_images (id, profile_id, image_url) VALUES ($1, $2, $3) \
             RETURNING id, profile_id, image_url, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(profile_id)
        .bind(image_url)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn delete_portfolio_image(&self, profile_id: Uuid, image_id: Uuid) -> StoreResult<bool> {
        let done = sqlx::query("DELETE FROM portfolio_images WHERE id = $2 AND profile_id = $1")
            .bind(profile_id)
            .bind(image_id)
            .execute(&self.pool)
            .await?;
        Ok(done.rows_affected() > 0)
    }
}

#[async_trait]
impl AnalyticsStore for PgStore {
    async fn record_view(
        &self,
        profile_id: Uuid,
        fingerprint: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<bool> {
        let done = sqlx::query(
            "INSERT INTO profile_views (id, profile_id, viewer_fingerprint, created_at) \
             SELECT $1, $2, $3, $4 \
             WHERE NOT EXISTS ( \
                SELECT 1 FROM profile_views \
                WHERE profile_id = $2 AND viewer_fingerprint = $3 \
                  AND created_at > $4 - INTERVAL '24 hours')",
        )
        .bind(Uuid::new_v4())
        .bind(profile_id)
        .bind(fingerprint)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(done.rows_affected() > 0)
    }

    async fn record_whatsapp_click(&self, profile_id: Uuid) -> StoreResult<()> {
        sqlx::query("INSERT INTO whatsapp_clicks (id, profile_id) VALUES ($1, $2)")
            .bind(Uuid::new_v4())
            .bind(profile_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn view_stats(&self, profile_id: Uuid, now: DateTime<Utc>) -> StoreResult<ViewStats> {
        let (last_7_days, last_30_days, total): (i64, i64, i64) = sqlx::query_as(
            "SELECT COUNT(*) FILTER (WHERE created_at > $2 - INTERVAL '7 days'), \
                    COUNT(*) FILTER (WHERE created_at > $2 - INTERVAL '30 days'), \
                    COUNT(*) \
             FROM profile_views WHERE profile_id = $1",
        )
        .bind(profile_id)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        let (whatsapp_clicks_7_days, whatsapp_clicks_30_days): (i64, i64) = sqlx::query_as(
            "SELECT COUNT(*) FILTER (WHERE clicked_at > $2 - INTERVAL '7 days'), \
                    COUNT(*) FILTER (WHERE clicked_at > $2 - INTERVAL '30 days') \
             FROM whatsapp_clicks WHERE profile_id = $1",
        )
        .bind(profile_id)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(ViewStats {
            last_7_days,
            last_30_days,
            total,
            whatsapp_clicks_7_days,
            whatsapp_clicks_30_days,
        })
    }

    async fn platform_counts(&self, now: DateTime<Utc>) -> StoreResult<PlatformCounts> {
        let (total, active, pending, banned, premium): (i64, i64, i64, i64, i64) = sqlx::query_as(
            "SELECT COUNT(*), \
                    COUNT(*) FILTER (WHERE status = 'active'), \
                    COUNT(*) FILTER (WHERE status = 'pending'), \
                    COUNT(*) FILTER (WHERE status = 'banned'), \
                    COUNT(*) FILTER (WHERE is_premium \
                        OR (premium_boost_end_at IS NOT NULL AND premium_boost_end_at > $1)) \
             FROM profiles",
        )
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        let views_last_30_days: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM profile_views WHERE created_at > $1 - INTERVAL '30 days'",
        )
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        let whatsapp_clicks_last_30_days: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM whatsapp_clicks WHERE clicked_at > $1 - INTERVAL '30 days'",
        )
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(PlatformCounts {
            total_profiles: total,
            active_profiles: active,
            pending_profiles: pending,
            banned_profiles: banned,
            premium_profiles: premium,
            views_last_30_days,
            whatsapp_clicks_last_30_days,
        })
    }
}
