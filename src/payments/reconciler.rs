//! Webhook event reconciliation.
//!
//! Takes verified provider events and folds them into local state:
//! entitlement flags, mirrored subscriptions, boost windows and the payment
//! ledger. Every event id is remembered once handled, so provider retries
//! and replays of captured deliveries become no-ops.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::StripeConfig;
use crate::payments::checkout::plan_pricing;
use crate::payments::events::{
    datetime_from_ts, CheckoutSession, InvoiceObject, Price, SubscriptionObject, WebhookEvent,
};
use crate::payments::stripe::{StripeClient, StripeError};
use crate::premium::boost_window;
use crate::store::types::{NewBoostPurchase, NewPayment, NewSubscription, PlanType, Profile};
use crate::store::{Store, StoreError};

const FAILED_PAYMENT_LABEL: &str = "Échec de paiement";

/// How an event was settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Handled and recorded.
    Processed,
    /// Event id seen before; nothing touched.
    Duplicate,
    /// Event type we deliberately do not handle.
    Ignored,
    /// Referenced no profile we know. Not recorded, so a later redelivery
    /// can still land once the data exists.
    Orphaned,
}

impl ReconcileOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReconcileOutcome::Processed => "processed",
            ReconcileOutcome::Duplicate => "duplicate",
            ReconcileOutcome::Ignored => "ignored",
            ReconcileOutcome::Orphaned => "orphaned",
        }
    }
}

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("malformed event payload: {0}")]
    Payload(#[from] serde_json::Error),
    #[error("provider lookup failed: {0}")]
    Provider(#[from] StripeError),
}

pub struct Reconciler {
    store: Arc<dyn Store>,
    client: Arc<StripeClient>,
    config: StripeConfig,
}

impl Reconciler {
    pub fn new(store: Arc<dyn Store>, client: Arc<StripeClient>, config: StripeConfig) -> Self {
        Self {
            store,
            client,
            config,
        }
    }

    /// Apply one verified event. Idempotent per event id.
    pub async fn process(
        &self,
        event: &WebhookEvent,
        now: DateTime<Utc>,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        if self.store.already_processed(&event.id).await? {
            debug!(event = %event.id, event_type = %event.event_type, "replayed event dropped");
            return Ok(ReconcileOutcome::Duplicate);
        }

        let outcome = match event.event_type.as_str() {
            "checkout.session.completed" => {
                self.on_checkout_completed(event.object_as()?, now).await?
            }
            "customer.subscription.created" | "customer.subscription.updated" => {
                self.on_subscription_upserted(event.object_as()?, now).await?
            }
            "customer.subscription.deleted" => {
                self.on_subscription_deleted(event.object_as()?, now).await?
            }
            "invoice.payment_succeeded" => self.on_invoice_paid(event.object_as()?).await?,
            "invoice.payment_failed" => self.on_invoice_failed(event.object_as()?).await?,
            other => {
                debug!(event = %event.id, event_type = other, "event type not handled");
                ReconcileOutcome::Ignored
            }
        };

        if outcome != ReconcileOutcome::Orphaned {
            self.store.record_event(&event.id, &event.event_type).await?;
        }

        metrics::counter!(
            "webhook_events_total",
            "type" => event.event_type.clone(),
            "outcome" => outcome.as_str(),
        )
        .increment(1);

        Ok(outcome)
    }

    /// A completed boost checkout credits the visibility window and writes
    /// the ledger. A completed subscription checkout only carries the
    /// subscription's id, so the full object is fetched from the provider
    /// and mirrored the same way a lifecycle event would be.
    async fn on_checkout_completed(
        &self,
        session: CheckoutSession,
        now: DateTime<Utc>,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        if !session.is_boost_purchase() {
            let Some(subscription_id) = session.subscription.as_ref().map(|s| s.id().to_string())
            else {
                warn!(session = %session.id, "subscription checkout without a subscription id");
                return Ok(ReconcileOutcome::Processed);
            };
            debug!(session = %session.id, subscription = %subscription_id, "subscription checkout completed");
            let subscription = self.client.get_subscription(&subscription_id).await?;
            return self.on_subscription_upserted(subscription, now).await;
        }

        let customer = session.customer.as_ref().map(|c| c.id());
        let Some(profile) = self.resolve_profile(&session.metadata, customer).await? else {
            warn!(session = %session.id, "boost checkout with no resolvable profile");
            return Ok(ReconcileOutcome::Orphaned);
        };

        let window = boost_window(now, profile.premium_boost_end_at);
        self.store
            .set_boost_window(profile.id, window.activated_at, window.expires_at)
            .await?;

        let pricing = plan_pricing(PlanType::Boost);
        let amount = session.amount_total.unwrap_or(pricing.amount);
        let currency = session
            .currency
            .clone()
            .unwrap_or_else(|| pricing.currency.to_string());
        let intent = session.payment_intent.as_ref().map(|p| p.id().to_string());

        self.store
            .insert_boost(&NewBoostPurchase {
                profile_id: profile.id,
                amount_cents: amount,
                currency: currency.clone(),
                status: "succeeded".to_string(),
                stripe_payment_intent_id: intent.clone(),
                activated_at: window.activated_at,
                expires_at: window.expires_at,
            })
            .await?;
        self.store
            .insert_payment(&NewPayment {
                profile_id: profile.id,
                stripe_payment_intent_id: intent,
                stripe_invoice_id: None,
                amount_cents: amount,
                currency,
                plan_type: PlanType::Boost.to_string(),
                status: "succeeded".to_string(),
                description: pricing.label.to_string(),
                receipt_url: None,
            })
            .await?;

        info!(
            profile = %profile.id,
            session = %session.id,
            expires_at = %window.expires_at,
            "boost credited"
        );
        Ok(ReconcileOutcome::Processed)
    }

    async fn on_subscription_upserted(
        &self,
        sub: SubscriptionObject,
        now: DateTime<Utc>,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        let Some(profile) = self
            .resolve_profile(&sub.metadata, Some(sub.customer.id()))
            .await?
        else {
            warn!(subscription = %sub.id, customer = %sub.customer.id(), "subscription with no resolvable profile");
            return Ok(ReconcileOutcome::Orphaned);
        };

        let price = sub.items.data.first().map(|item| &item.price);
        // Checkout mirrors plan_type onto the subscription metadata; that
        // hint wins, the price catalog decides for externally created ones.
        let plan = sub
            .metadata
            .get("plan_type")
            .and_then(|raw| PlanType::from_str(raw).ok())
            .filter(|plan| *plan != PlanType::Boost)
            .unwrap_or_else(|| plan_for_price(&self.config, price));
        let pricing = plan_pricing(plan);
        let active = matches!(sub.status.as_str(), "active" | "trialing");

        self.store
            .upsert_subscription(&NewSubscription {
                profile_id: profile.id,
                stripe_customer_id: sub.customer.id().to_string(),
                stripe_subscription_id: sub.id.clone(),
                stripe_price_id: price.map(|p| p.id.clone()).unwrap_or_default(),
                status: sub.status.clone(),
                plan_type: plan.to_string(),
                amount_cents: price.and_then(|p| p.unit_amount).unwrap_or(pricing.amount),
                currency: price
                    .and_then(|p| p.currency.clone())
                    .unwrap_or_else(|| pricing.currency.to_string()),
                current_period_start: datetime_from_ts(sub.current_period_start).unwrap_or(now),
                current_period_end: datetime_from_ts(sub.current_period_end).unwrap_or(now),
                cancel_at_period_end: sub.cancel_at_period_end,
            })
            .await?;
        // An active subscription forces the flag on. Other statuses (past_due
        // while the provider retries the card) leave it alone; only the
        // deleted event revokes.
        if active {
            self.store.set_subscription_premium(profile.id, true).await?;
        }

        info!(
            profile = %profile.id,
            subscription = %sub.id,
            status = %sub.status,
            premium = active,
            "subscription mirrored"
        );
        Ok(ReconcileOutcome::Processed)
    }

    async fn on_subscription_deleted(
        &self,
        sub: SubscriptionObject,
        now: DateTime<Utc>,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        let canceled_at = sub.canceled_at.and_then(datetime_from_ts).unwrap_or(now);
        let known = self.store.cancel_subscription(&sub.id, canceled_at).await?;
        if !known {
            debug!(subscription = %sub.id, "deletion for a subscription never mirrored");
        }

        let Some(profile) = self
            .resolve_profile(&sub.metadata, Some(sub.customer.id()))
            .await?
        else {
            warn!(subscription = %sub.id, "deleted subscription with no resolvable profile");
            return Ok(ReconcileOutcome::Orphaned);
        };
        self.store.set_subscription_premium(profile.id, false).await?;

        info!(profile = %profile.id, subscription = %sub.id, "subscription ended, premium revoked");
        Ok(ReconcileOutcome::Processed)
    }

    async fn on_invoice_paid(
        &self,
        invoice: InvoiceObject,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        let Some(profile) = self.profile_from_invoice(&invoice).await? else {
            return Ok(ReconcileOutcome::Orphaned);
        };

        // Recover the plan from the subscription this invoice bills for.
        let plan = match invoice.subscription.as_ref() {
            Some(subscription) => self
                .store
                .subscription_by_provider_id(subscription.id())
                .await?
                .and_then(|record| PlanType::from_str(&record.plan_type).ok())
                .unwrap_or(PlanType::Monthly),
            None => PlanType::Monthly,
        };
        let pricing = plan_pricing(plan);

        self.store
            .insert_payment(&NewPayment {
                profile_id: profile.id,
                stripe_payment_intent_id: invoice.payment_intent.as_ref().map(|p| p.id().to_string()),
                stripe_invoice_id: Some(invoice.id.clone()),
                amount_cents: invoice.amount_paid.unwrap_or(pricing.amount),
                currency: invoice
                    .currency
                    .clone()
                    .unwrap_or_else(|| pricing.currency.to_string()),
                plan_type: plan.to_string(),
                status: "succeeded".to_string(),
                description: pricing.label.to_string(),
                receipt_url: invoice.hosted_invoice_url.clone(),
            })
            .await?;

        info!(profile = %profile.id, invoice = %invoice.id, "invoice payment recorded");
        Ok(ReconcileOutcome::Processed)
    }

    async fn on_invoice_failed(
        &self,
        invoice: InvoiceObject,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        let Some(profile) = self.profile_from_invoice(&invoice).await? else {
            return Ok(ReconcileOutcome::Orphaned);
        };

        self.store
            .insert_payment(&NewPayment {
                profile_id: profile.id,
                stripe_payment_intent_id: invoice.payment_intent.as_ref().map(|p| p.id().to_string()),
                stripe_invoice_id: Some(invoice.id.clone()),
                amount_cents: invoice.amount_due.unwrap_or(0),
                currency: invoice.currency.clone().unwrap_or_else(|| "xof".to_string()),
                plan_type: PlanType::Monthly.to_string(),
                status: "failed".to_string(),
                description: FAILED_PAYMENT_LABEL.to_string(),
                receipt_url: invoice.hosted_invoice_url.clone(),
            })
            .await?;

        warn!(profile = %profile.id, invoice = %invoice.id, "invoice payment failed");
        Ok(ReconcileOutcome::Processed)
    }

    /// Metadata `profile_id` wins; customer lookup is the fallback for
    /// events that never carried metadata.
    async fn resolve_profile(
        &self,
        metadata: &HashMap<String, String>,
        customer: Option<&str>,
    ) -> Result<Option<Profile>, StoreError> {
        if let Some(raw) = metadata.get("profile_id") {
            if let Ok(id) = Uuid::parse_str(raw) {
                if let Some(profile) = self.store.find_by_id(id).await? {
                    return Ok(Some(profile));
                }
            }
        }
        match customer {
            Some(customer_id) => self.store.find_by_customer(customer_id).await,
            None => Ok(None),
        }
    }

    async fn profile_from_invoice(
        &self,
        invoice: &InvoiceObject,
    ) -> Result<Option<Profile>, StoreError> {
        let Some(customer) = invoice.customer.as_ref() else {
            warn!(invoice = %invoice.id, "invoice without a customer");
            return Ok(None);
        };
        let found = self.store.find_by_customer(customer.id()).await?;
        if found.is_none() {
            warn!(invoice = %invoice.id, customer = %customer.id(), "invoice for unknown customer");
        }
        Ok(found)
    }
}

/// Map a price to a plan: configured ids first, billing interval as the
/// fallback for prices created outside this deployment.
fn plan_for_price(config: &StripeConfig, price: Option<&Price>) -> PlanType {
    let Some(price) = price else {
        return PlanType::Monthly;
    };
    if price.id == config.annual_price_id {
        return PlanType::Annual;
    }
    if price.id == config.monthly_price_id {
        return PlanType::Monthly;
    }
    match price.recurring.as_ref().map(|r| r.interval.as_str()) {
        Some("year") => PlanType::Annual,
        _ => PlanType::Monthly,
    }
}
