//! Payment provider integration: outbound checkout and inbound webhooks.

pub mod checkout;
pub mod events;
pub mod reconciler;
pub mod stripe;
pub mod webhook;

pub use reconciler::{ReconcileOutcome, Reconciler};
pub use stripe::{StripeClient, StripeError};
