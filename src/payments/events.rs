//! Provider webhook event payloads.
//!
//! Only the fields the reconciler actually reads are modeled; everything
//! else in the provider's JSON is ignored by serde. Nested resources arrive
//! either as a bare id string or as an expanded object, so those fields go
//! through [`Expandable`].

use chrono::{DateTime, TimeZone, Utc};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashMap;

/// The outer event envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub created: i64,
    pub data: EventData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventData {
    pub object: serde_json::Value,
}

impl WebhookEvent {
    /// Deserialize `data.object` into the payload type the event type implies.
    pub fn object_as<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.data.object.clone())
    }
}

/// A reference that may arrive as `"cus_123"` or `{"id": "cus_123", ...}`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Expandable {
    Id(String),
    Object { id: String },
}

impl Expandable {
    pub fn id(&self) -> &str {
        match self {
            Expandable::Id(id) => id,
            Expandable::Object { id } => id,
        }
    }
}

/// `checkout.session.completed` payload.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    pub customer: Option<Expandable>,
    pub subscription: Option<Expandable>,
    pub payment_intent: Option<Expandable>,
    pub amount_total: Option<i64>,
    pub currency: Option<String>,
    pub mode: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl CheckoutSession {
    /// Whether this checkout bought the one-time boost rather than a
    /// subscription. Either metadata marker counts; older sessions only
    /// carried `plan_type`.
    pub fn is_boost_purchase(&self) -> bool {
        self.metadata.get("product_type").map(String::as_str) == Some("boost_7_days")
            || self.metadata.get("plan_type").map(String::as_str) == Some("boost")
    }
}

/// `customer.subscription.*` payload.
#[derive(Debug, Clone, Deserialize)]
pub struct SubscriptionObject {
    pub id: String,
    pub customer: Expandable,
    pub status: String,
    #[serde(default)]
    pub cancel_at_period_end: bool,
    pub canceled_at: Option<i64>,
    pub current_period_start: i64,
    pub current_period_end: i64,
    #[serde(default)]
    pub items: SubscriptionItems,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubscriptionItems {
    #[serde(default)]
    pub data: Vec<SubscriptionItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubscriptionItem {
    pub price: Price,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Price {
    pub id: String,
    pub unit_amount: Option<i64>,
    pub currency: Option<String>,
    pub recurring: Option<Recurring>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Recurring {
    pub interval: String,
}

/// `invoice.payment_succeeded` / `invoice.payment_failed` payload.
#[derive(Debug, Clone, Deserialize)]
pub struct InvoiceObject {
    pub id: String,
    pub customer: Option<Expandable>,
    pub subscription: Option<Expandable>,
    pub payment_intent: Option<Expandable>,
    pub amount_paid: Option<i64>,
    pub amount_due: Option<i64>,
    pub currency: Option<String>,
    pub hosted_invoice_url: Option<String>,
}

/// Convert a provider unix timestamp, rejecting out-of-range values.
pub fn datetime_from_ts(ts: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_opt(ts, 0).single()
}
