//! Shared harness for the integration tests.
//!
//! [`MemoryStore`] stands in for Postgres behind the same `Arc<dyn Store>`
//! the real server uses, mirroring the SQL semantics the handlers rely on
//! (upsert keys, ordering, the 24h view dedup). [`spawn_app`] boots the
//! full router on an ephemeral port so tests go through real HTTP,
//! middleware included.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::net::TcpListener;
use uuid::Uuid;

use eclat_api::http::{AppState, HttpServer};
use eclat_api::payments::webhook::{sign_payload, SIGNATURE_HEADER};
use eclat_api::premium::is_premium_active;
use eclat_api::store::types::{
    BoostPurchase, DirectoryFilter, ExpiredBoost, HourEntry, NewBoostPurchase, NewPayment,
    NewService, NewSubscription, OpeningHour, PaymentRecord, PlatformCounts, PortfolioImage,
    Profile, ProfileChanges, ProfileStatus, Service, SubscriptionRecord, ViewStats,
};
use eclat_api::store::{
    AnalyticsStore, BillingStore, CatalogStore, ProfileStore, StoreError, StoreResult,
};
use eclat_api::{AppConfig, Shutdown};

struct ViewRow {
    profile_id: Uuid,
    fingerprint: String,
    created_at: DateTime<Utc>,
}

struct ClickRow {
    profile_id: Uuid,
    clicked_at: DateTime<Utc>,
}

#[derive(Default)]
struct Inner {
    profiles: Vec<Profile>,
    services: Vec<Service>,
    hours: Vec<OpeningHour>,
    portfolio: Vec<PortfolioImage>,
    subscriptions: Vec<SubscriptionRecord>,
    boosts: Vec<BoostPurchase>,
    payments: Vec<PaymentRecord>,
    events: Vec<(String, String)>,
    views: Vec<ViewRow>,
    clicks: Vec<ClickRow>,
}

/// In-memory store. `fail_writes` makes every mutating call return a
/// database error, for exercising the 500 paths.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_profile(&self, profile: Profile) {
        self.inner.lock().unwrap().profiles.push(profile);
    }

    /// Current state of a profile. Panics when the id is unknown.
    pub fn profile(&self, id: Uuid) -> Profile {
        self.inner
            .lock()
            .unwrap()
            .profiles
            .iter()
            .find(|p| p.id == id)
            .cloned()
            .expect("profile not seeded")
    }

    pub fn subscriptions(&self) -> Vec<SubscriptionRecord> {
        self.inner.lock().unwrap().subscriptions.clone()
    }

    pub fn boosts(&self) -> Vec<BoostPurchase> {
        self.inner.lock().unwrap().boosts.clone()
    }

    pub fn payments(&self) -> Vec<PaymentRecord> {
        self.inner.lock().unwrap().payments.clone()
    }

    pub fn recorded_events(&self) -> Vec<String> {
        let inner = self.inner.lock().unwrap();
        inner.events.iter().map(|(id, _)| id.clone()).collect()
    }

    pub fn view_count(&self, profile_id: Uuid) -> usize {
        let inner = self.inner.lock().unwrap();
        inner.views.iter().filter(|v| v.profile_id == profile_id).count()
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn write_guard(&self) -> StoreResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }
}

#[async_trait]
impl ProfileStore for MemoryStore {
    async fn directory(
        &self,
        filter: &DirectoryFilter,
        now: DateTime<Utc>,
    ) -> StoreResult<Vec<Profile>> {
        let inner = self.inner.lock().unwrap();
        let mut rows: Vec<Profile> = inner
            .profiles
            .iter()
            .filter(|p| p.status == ProfileStatus::Active.as_str())
            .filter(|p| filter.category.as_deref().map_or(true, |c| p.category == c))
            .filter(|p| filter.city.as_deref().map_or(true, |c| p.city.eq_ignore_ascii_case(c)))
            .cloned()
            .collect();
        rows.sort_by(|a, b| {
            is_premium_active(b, now)
                .cmp(&is_premium_active(a, now))
                .then(b.rating.total_cmp(&a.rating))
                .then(b.review_count.cmp(&a.review_count))
                .then(b.created_at.cmp(&a.created_at))
        });
        Ok(rows)
    }

    async fn find_by_slug(&self, slug: &str) -> StoreResult<Option<Profile>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.profiles.iter().find(|p| p.slug == slug).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Profile>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.profiles.iter().find(|p| p.id == id).cloned())
    }

    async fn find_by_customer(&self, customer_id: &str) -> StoreResult<Option<Profile>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .profiles
            .iter()
            .find(|p| p.stripe_customer_id.as_deref() == Some(customer_id))
            .cloned())
    }

    async fn update_profile(&self, id: Uuid, changes: &ProfileChanges) -> StoreResult<Profile> {
        self.write_guard()?;
        let mut inner = self.inner.lock().unwrap();
        let profile = inner
            .profiles
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(StoreError::NotFound("profile"))?;
        if let Some(v) = &changes.full_name {
            profile.full_name = v.clone();
        }
        if let Some(v) = &changes.bio {
            profile.bio = Some(v.clone());
        }
        if let Some(v) = &changes.city {
            profile.city = v.clone();
        }
        if let Some(v) = &changes.neighborhood {
            profile.neighborhood = Some(v.clone());
        }
        if let Some(v) = &changes.address_details {
            profile.address_details = Some(v.clone());
        }
        if let Some(v) = &changes.whatsapp {
            profile.whatsapp = v.clone();
        }
        if let Some(v) = &changes.instagram_handle {
            profile.instagram_handle = Some(v.clone());
        }
        if let Some(v) = &changes.tiktok_handle {
            profile.tiktok_handle = Some(v.clone());
        }
        if let Some(v) = &changes.avatar_url {
            profile.avatar_url = Some(v.clone());
        }
        profile.updated_at = Utc::now();
        Ok(profile.clone())
    }

    async fn set_customer_id(&self, id: Uuid, customer_id: &str) -> StoreResult<()> {
        self.write_guard()?;
        let mut inner = self.inner.lock().unwrap();
        let profile = inner
            .profiles
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(StoreError::NotFound("profile"))?;
        profile.stripe_customer_id = Some(customer_id.to_string());
        Ok(())
    }

    async fn set_subscription_premium(&self, id: Uuid, active: bool) -> StoreResult<()> {
        self.write_guard()?;
        let mut inner = self.inner.lock().unwrap();
        let profile = inner
            .profiles
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(StoreError::NotFound("profile"))?;
        profile.is_premium = active;
        profile.updated_at = Utc::now();
        Ok(())
    }

    async fn set_boost_window(
        &self,
        id: Uuid,
        activated_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<()> {
        self.write_guard()?;
        let mut inner = self.inner.lock().unwrap();
        let profile = inner
            .profiles
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(StoreError::NotFound("profile"))?;
        profile.premium_boost_activated_at = Some(activated_at);
        profile.premium_boost_end_at = Some(expires_at);
        profile.updated_at = Utc::now();
        Ok(())
    }

    async fn set_status(&self, id: Uuid, status: ProfileStatus) -> StoreResult<Profile> {
        self.write_guard()?;
        let mut inner = self.inner.lock().unwrap();
        let profile = inner
            .profiles
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(StoreError::NotFound("profile"))?;
        profile.status = status.as_str().to_string();
        profile.updated_at = Utc::now();
        Ok(profile.clone())
    }

    async fn expire_boosts(&self, now: DateTime<Utc>) -> StoreResult<Vec<ExpiredBoost>> {
        self.write_guard()?;
        let mut inner = self.inner.lock().unwrap();
        let mut cleared = Vec::new();
        for profile in inner.profiles.iter_mut() {
            if matches!(profile.premium_boost_end_at, Some(end) if end < now) {
                profile.premium_boost_end_at = None;
                profile.premium_boost_activated_at = None;
                profile.updated_at = now;
                cleared.push(ExpiredBoost {
                    id: profile.id,
                    full_name: profile.full_name.clone(),
                });
            }
        }
        Ok(cleared)
    }
}

#[async_trait]
impl BillingStore for MemoryStore {
    async fn upsert_subscription(&self, sub: &NewSubscription) -> StoreResult<()> {
        self.write_guard()?;
        let mut inner = self.inner.lock().unwrap();
        if let Some(existing) = inner
            .subscriptions
            .iter_mut()
            .find(|s| s.stripe_subscription_id == sub.stripe_subscription_id)
        {
            existing.status = sub.status.clone();
            existing.stripe_price_id = sub.stripe_price_id.clone();
            existing.amount_cents = sub.amount_cents;
            existing.current_period_start = sub.current_period_start;
            existing.current_period_end = sub.current_period_end;
            existing.cancel_at_period_end = sub.cancel_at_period_end;
            return Ok(());
        }
        inner.subscriptions.push(SubscriptionRecord {
            id: Uuid::new_v4(),
            profile_id: sub.profile_id,
            stripe_customer_id: sub.stripe_customer_id.clone(),
            stripe_subscription_id: sub.stripe_subscription_id.clone(),
            stripe_price_id: sub.stripe_price_id.clone(),
            status: sub.status.clone(),
            plan_type: sub.plan_type.clone(),
            amount_cents: sub.amount_cents,
            currency: sub.currency.clone(),
            current_period_start: sub.current_period_start,
            current_period_end: sub.current_period_end,
            cancel_at_period_end: sub.cancel_at_period_end,
            canceled_at: None,
            created_at: Utc::now(),
        });
        Ok(())
    }

    async fn cancel_subscription(
        &self,
        stripe_subscription_id: &str,
        canceled_at: DateTime<Utc>,
    ) -> StoreResult<bool> {
        self.write_guard()?;
        let mut inner = self.inner.lock().unwrap();
        match inner
            .subscriptions
            .iter_mut()
            .find(|s| s.stripe_subscription_id == stripe_subscription_id)
        {
            Some(sub) => {
                sub.status = "canceled".to_string();
                sub.canceled_at = Some(canceled_at);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn latest_subscription(
        &self,
        profile_id: Uuid,
    ) -> StoreResult<Option<SubscriptionRecord>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .subscriptions
            .iter()
            .filter(|s| s.profile_id == profile_id)
            .max_by_key(|s| s.created_at)
            .cloned())
    }

    async fn subscription_by_provider_id(
        &self,
        stripe_subscription_id: &str,
    ) -> StoreResult<Option<SubscriptionRecord>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .subscriptions
            .iter()
            .find(|s| s.stripe_subscription_id == stripe_subscription_id)
            .cloned())
    }

    async fn insert_boost(&self, boost: &NewBoostPurchase) -> StoreResult<()> {
        self.write_guard()?;
        let mut inner = self.inner.lock().unwrap();
        inner.boosts.push(BoostPurchase {
            id: Uuid::new_v4(),
            profile_id: boost.profile_id,
            provider: "stripe".to_string(),
            amount_cents: boost.amount_cents,
            currency: boost.currency.clone(),
            status: boost.status.clone(),
            stripe_payment_intent_id: boost.stripe_payment_intent_id.clone(),
            activated_at: Some(boost.activated_at),
            expires_at: Some(boost.expires_at),
            created_at: Utc::now(),
        });
        Ok(())
    }

    async fn latest_boost(&self, profile_id: Uuid) -> StoreResult<Option<BoostPurchase>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .boosts
            .iter()
            .filter(|b| b.profile_id == profile_id)
            .max_by_key(|b| b.created_at)
            .cloned())
    }

    async fn insert_payment(&self, payment: &NewPayment) -> StoreResult<()> {
        self.write_guard()?;
        let mut inner = self.inner.lock().unwrap();
        inner.payments.push(PaymentRecord {
            id: Uuid::new_v4(),
            profile_id: payment.profile_id,
            provider: "stripe".to_string(),
            stripe_payment_intent_id: payment.stripe_payment_intent_id.clone(),
            stripe_invoice_id: payment.stripe_invoice_id.clone(),
            amount_cents: payment.amount_cents,
            currency: payment.currency.clone(),
            plan_type: payment.plan_type.clone(),
            status: payment.status.clone(),
            description: payment.description.clone(),
            receipt_url: payment.receipt_url.clone(),
            created_at: Utc::now(),
        });
        Ok(())
    }

    async fn payments_for_profile(
        &self,
        profile_id: Uuid,
        limit: i64,
    ) -> StoreResult<Vec<PaymentRecord>> {
        let inner = self.inner.lock().unwrap();
        // Appended in order, so newest-first is just the reverse.
        Ok(inner
            .payments
            .iter()
            .rev()
            .filter(|p| p.profile_id == profile_id)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn already_processed(&self, event_id: &str) -> StoreResult<bool> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.events.iter().any(|(id, _)| id == event_id))
    }

    async fn record_event(&self, event_id: &str, event_type: &str) -> StoreResult<()> {
        self.write_guard()?;
        let mut inner = self.inner.lock().unwrap();
        if !inner.events.iter().any(|(id, _)| id == event_id) {
            inner.events.push((event_id.to_string(), event_type.to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn services_for(&self, profile_id: Uuid) -> StoreResult<Vec<Service>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .services
            .iter()
            .filter(|s| s.profile_id == profile_id)
            .cloned()
            .collect())
    }

    async fn add_service(&self, profile_id: Uuid, service: &NewService) -> StoreResult<Service> {
        self.write_guard()?;
        let mut inner = self.inner.lock().unwrap();
        let created = Service {
            id: Uuid::new_v4(),
            profile_id,
            title: service.title.clone(),
            price_cfa: service.price_cfa,
            currency: service.currency.clone(),
            created_at: Utc::now(),
        };
        inner.services.push(created.clone());
        Ok(created)
    }

    async fn delete_service(&self, profile_id: Uuid, service_id: Uuid) -> StoreResult<bool> {
        self.write_guard()?;
        let mut inner = self.inner.lock().unwrap();
        let before = inner.services.len();
        inner
            .services
            .retain(|s| !(s.id == service_id && s.profile_id == profile_id));
        Ok(inner.services.len() < before)
    }

    async fn hours_for(&self, profile_id: Uuid) -> StoreResult<Vec<OpeningHour>> {
        let inner = self.inner.lock().unwrap();
        let mut rows: Vec<OpeningHour> = inner
            .hours
            .iter()
            .filter(|h| h.profile_id == profile_id)
            .cloned()
            .collect();
        rows.sort_by_key(|h| h.day_of_week);
        Ok(rows)
    }

    async fn set_hours(&self, profile_id: Uuid, entries: &[HourEntry]) -> StoreResult<()> {
        self.write_guard()?;
        let mut inner = self.inner.lock().unwrap();
        for entry in entries {
            if let Some(existing) = inner
                .hours
                .iter_mut()
                .find(|h| h.profile_id == profile_id && h.day_of_week == entry.day_of_week)
            {
                existing.open_time = entry.open_time;
                existing.close_time = entry.close_time;
                existing.is_closed = entry.is_closed;
            } else {
                inner.hours.push(OpeningHour {
                    id: Uuid::new_v4(),
                    profile_id,
                    day_of_week: entry.day_of_week,
                    open_time: entry.open_time,
                    close_time: entry.close_time,
                    is_closed: entry.is_closed,
                });
            }
        }
        Ok(())
    }

    async fn portfolio_for(&self, profile_id: Uuid) -> StoreResult<Vec<PortfolioImage>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .portfolio
            .iter()
            .filter(|i| i.profile_id == profile_id)
            .cloned()
            .collect())
    }

    async fn add_portfolio_image(
        &self,
        profile_id: Uuid,
        image_url: &str,
    ) -> StoreResult<PortfolioImage> {
        self.write_guard()?;
        let mut inner = self.inner.lock().unwrap();
        let created = PortfolioImage {
            id: Uuid::new_v4(),
            profile_id,
            image_url: image_url.to_string(),
            created_at: Utc::now(),
        };
        inner.portfolio.push(created.clone());
        Ok(created)
    }

    async fn delete_portfolio_image(&self, profile_id: Uuid, image_id: Uuid) -> StoreResult<bool> {
        self.write_guard()?;
        let mut inner = self.inner.lock().unwrap();
        let before = inner.portfolio.len();
        inner
            .portfolio
            .retain(|i| !(i.id == image_id && i.profile_id == profile_id));
        Ok(inner.portfolio.len() < before)
    }
}

#[async_trait]
impl AnalyticsStore for MemoryStore {
    async fn record_view(
        &self,
        profile_id: Uuid,
        fingerprint: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<bool> {
        self.write_guard()?;
        let mut inner = self.inner.lock().unwrap();
        let seen_recently = inner.views.iter().any(|v| {
            v.profile_id == profile_id
                && v.fingerprint == fingerprint
                && v.created_at > now - Duration::hours(24)
        });
        if seen_recently {
            return Ok(false);
        }
        inner.views.push(ViewRow {
            profile_id,
            fingerprint: fingerprint.to_string(),
            created_at: now,
        });
        Ok(true)
    }

    async fn record_whatsapp_click(&self, profile_id: Uuid) -> StoreResult<()> {
        self.write_guard()?;
        let mut inner = self.inner.lock().unwrap();
        inner.clicks.push(ClickRow {
            profile_id,
            clicked_at: Utc::now(),
        });
        Ok(())
    }

    async fn view_stats(&self, profile_id: Uuid, now: DateTime<Utc>) -> StoreResult<ViewStats> {
        let inner = self.inner.lock().unwrap();
        let views = |since: Option<DateTime<Utc>>| -> i64 {
            inner
                .views
                .iter()
                .filter(|v| v.profile_id == profile_id)
                .filter(|v| since.map_or(true, |cutoff| v.created_at > cutoff))
                .count() as i64
        };
        let clicks = |cutoff: DateTime<Utc>| -> i64 {
            inner
                .clicks
                .iter()
                .filter(|c| c.profile_id == profile_id && c.clicked_at > cutoff)
                .count() as i64
        };
        Ok(ViewStats {
            last_7_days: views(Some(now - Duration::days(7))),
            last_30_days: views(Some(now - Duration::days(30))),
            total: views(None),
            whatsapp_clicks_7_days: clicks(now - Duration::days(7)),
            whatsapp_clicks_30_days: clicks(now - Duration::days(30)),
        })
    }

    async fn platform_counts(&self, now: DateTime<Utc>) -> StoreResult<PlatformCounts> {
        let inner = self.inner.lock().unwrap();
        let by_status = |status: &str| -> i64 {
            inner.profiles.iter().filter(|p| p.status == status).count() as i64
        };
        Ok(PlatformCounts {
            total_profiles: inner.profiles.len() as i64,
            active_profiles: by_status("active"),
            pending_profiles: by_status("pending"),
            banned_profiles: by_status("banned"),
            premium_profiles: inner
                .profiles
                .iter()
                .filter(|p| is_premium_active(p, now))
                .count() as i64,
            views_last_30_days: inner
                .views
                .iter()
                .filter(|v| v.created_at > now - Duration::days(30))
                .count() as i64,
            whatsapp_clicks_last_30_days: inner
                .clicks
                .iter()
                .filter(|c| c.clicked_at > now - Duration::days(30))
                .count() as i64,
        })
    }
}

/// An active profile with no entitlements. Tests flip the fields they need
/// before seeding it.
pub fn profile_fixture(slug: &str) -> Profile {
    let now = Utc::now();
    Profile {
        id: Uuid::new_v4(),
        email: format!("{slug}@example.com"),
        full_name: format!("Provider {slug}"),
        slug: slug.to_string(),
        category: "coiffure".to_string(),
        bio: None,
        city: "Abidjan".to_string(),
        neighborhood: Some("Cocody".to_string()),
        address_details: None,
        whatsapp: "+2250700000001".to_string(),
        instagram_handle: None,
        tiktok_handle: None,
        avatar_url: None,
        stripe_customer_id: None,
        is_premium: false,
        premium_boost_end_at: None,
        premium_boost_activated_at: None,
        rating: 0.0,
        review_count: 0,
        recommendations_count: 0,
        status: "active".to_string(),
        created_at: now,
        updated_at: now,
    }
}

/// Config for a spawned test server: credentials filled in, admin routes
/// on, metrics off.
pub fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.stripe.secret_key = "sk_test_key".to_string();
    config.stripe.webhook_secret = "whsec_test_secret".to_string();
    config.stripe.monthly_price_id = "price_monthly".to_string();
    config.stripe.annual_price_id = "price_annual".to_string();
    config.stripe.boost_price_id = "price_boost".to_string();
    config.stripe.app_url = "https://eclat.test".to_string();
    config.admin.enabled = true;
    config.admin.api_key = "test-admin-key".to_string();
    config.observability.metrics_enabled = false;
    config
}

/// A running server plus handles into its state.
pub struct TestApp {
    pub address: SocketAddr,
    pub client: reqwest::Client,
    pub store: Arc<MemoryStore>,
    pub config: AppConfig,
    pub shutdown: Shutdown,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.address, path)
    }

    /// Deliver a webhook event signed the way the provider would sign it.
    pub async fn deliver_event(&self, event: &serde_json::Value) -> reqwest::Response {
        let body = event.to_string();
        let header = sign_payload(
            body.as_bytes(),
            &self.config.stripe.webhook_secret,
            Utc::now().timestamp(),
        );
        self.deliver_raw(body, Some(header)).await
    }

    /// Deliver a raw webhook body with full control over the signature.
    pub async fn deliver_raw(
        &self,
        body: String,
        signature: Option<String>,
    ) -> reqwest::Response {
        let mut request = self
            .client
            .post(self.url("/webhooks/stripe"))
            .header("content-type", "application/json")
            .body(body);
        if let Some(header) = signature {
            request = request.header(SIGNATURE_HEADER, header);
        }
        request.send().await.expect("webhook request failed")
    }
}

/// Boot the full application on an ephemeral port.
pub async fn spawn_app() -> TestApp {
    spawn_app_with(|_| {}).await
}

/// Boot with a customized config (mock provider URL, admin off, ...).
pub async fn spawn_app_with(customize: impl FnOnce(&mut AppConfig)) -> TestApp {
    let mut config = test_config();
    customize(&mut config);

    let store = Arc::new(MemoryStore::new());
    let state = AppState::new(store.clone(), Arc::new(config.clone()));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let receiver = shutdown.subscribe();
    let server = HttpServer::new(state);
    tokio::spawn(async move {
        let _ = server.run(listener, receiver).await;
    });

    TestApp {
        address,
        client: reqwest::Client::new(),
        store,
        config,
        shutdown,
    }
}
