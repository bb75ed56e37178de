//! Checkout session creation and the plan price catalog.

use thiserror::Error;

use crate::config::StripeConfig;
use crate::payments::stripe::{CheckoutParams, CheckoutSessionLink, StripeClient, StripeError};
use crate::store::types::{PlanType, Profile};
use crate::store::{Store, StoreError};

/// Catalog entry for one purchasable plan.
///
/// Amounts are in the provider's minor units. XOF is a zero-decimal
/// currency, so these are whole francs.
#[derive(Debug, Clone, Copy)]
pub struct PlanPricing {
    pub amount: i64,
    pub currency: &'static str,
    pub label: &'static str,
}

pub fn plan_pricing(plan: PlanType) -> PlanPricing {
    match plan {
        PlanType::Monthly => PlanPricing {
            amount: 10_000,
            currency: "xof",
            label: "Abonnement Gold mensuel",
        },
        PlanType::Annual => PlanPricing {
            amount: 100_000,
            currency: "xof",
            label: "Abonnement Gold annuel",
        },
        PlanType::Boost => PlanPricing {
            amount: 5_000,
            currency: "xof",
            label: "Boost 7 jours",
        },
    }
}

#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("profile already has an active subscription")]
    AlreadyPremium,
    #[error("no price configured for the {0} plan")]
    PriceNotConfigured(PlanType),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Stripe(#[from] StripeError),
}

/// Create a hosted checkout session for `profile`.
///
/// Subscribers are refused outright: the `is_premium` flag only tracks the
/// subscription entitlement, so boost holders can still stack further
/// boosts while subscribers cannot buy anything twice.
pub async fn start_checkout(
    store: &dyn Store,
    client: &StripeClient,
    config: &StripeConfig,
    profile: &Profile,
    plan: PlanType,
) -> Result<CheckoutSessionLink, CheckoutError> {
    if profile.is_premium {
        return Err(CheckoutError::AlreadyPremium);
    }

    let (price_id, mode, product_type) = match plan {
        PlanType::Monthly => (config.monthly_price_id.clone(), "subscription", "subscription"),
        PlanType::Annual => (config.annual_price_id.clone(), "subscription", "subscription"),
        PlanType::Boost => (config.boost_price_id.clone(), "payment", "boost_7_days"),
    };
    if price_id.is_empty() {
        return Err(CheckoutError::PriceNotConfigured(plan));
    }

    let customer_id = match &profile.stripe_customer_id {
        Some(id) => id.clone(),
        None => {
            let customer = client
                .create_customer(&profile.email, &profile.full_name, profile.id)
                .await?;
            store.set_customer_id(profile.id, &customer.id).await?;
            tracing::info!(profile = %profile.id, customer = %customer.id, "provider customer created");
            customer.id
        }
    };

    let params = CheckoutParams {
        customer_id,
        price_id,
        mode,
        success_url: format!(
            "{}/dashboard?payment=success&session_id={{CHECKOUT_SESSION_ID}}",
            config.app_url.trim_end_matches('/')
        ),
        cancel_url: format!(
            "{}/dashboard/premium?payment=cancelled",
            config.app_url.trim_end_matches('/')
        ),
        metadata: vec![
            ("profile_id".to_string(), profile.id.to_string()),
            ("plan_type".to_string(), plan.to_string()),
            ("product_type".to_string(), product_type.to_string()),
        ],
    };

    let session = client.create_checkout_session(&params).await?;
    metrics::counter!("checkout_sessions_total", "plan" => plan.to_string()).increment(1);
    tracing::info!(profile = %profile.id, session = %session.id, plan = %plan, "checkout session created");
    Ok(session)
}
