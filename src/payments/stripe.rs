//! Outbound payment provider client.
//!
//! The provider's API is form-encoded over HTTPS with the secret key as
//! basic-auth username. Only the calls the checkout flow and the
//! reconciler need are implemented. The base URL comes from config so
//! tests can point the client at a local mock server.

use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

use crate::config::StripeConfig;
use crate::payments::events::SubscriptionObject;

#[derive(Debug, Error)]
pub enum StripeError {
    #[error("provider request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("provider returned {status}: {message}")]
    Api { status: u16, message: String },
}

/// Customer object, reduced to what we store.
#[derive(Debug, Clone, Deserialize)]
pub struct Customer {
    pub id: String,
}

/// A created checkout session: the id we will see again in webhooks and the
/// hosted page the caller redirects to.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSessionLink {
    pub id: String,
    pub url: String,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Deserialize)]
struct ApiErrorDetail {
    #[serde(default)]
    message: String,
}

/// Parameters for a hosted checkout session.
#[derive(Debug, Clone)]
pub struct CheckoutParams {
    pub customer_id: String,
    pub price_id: String,
    /// "subscription" for recurring plans, "payment" for the one-time boost.
    pub mode: &'static str,
    pub success_url: String,
    pub cancel_url: String,
    pub metadata: Vec<(String, String)>,
}

#[derive(Clone)]
pub struct StripeClient {
    http: Client,
    base_url: String,
    secret_key: String,
}

impl StripeClient {
    pub fn new(config: &StripeConfig) -> Self {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .expect("failed to build HTTP client");

        Self {
            http,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            secret_key: config.secret_key.clone(),
        }
    }

    pub async fn create_customer(
        &self,
        email: &str,
        name: &str,
        profile_id: Uuid,
    ) -> Result<Customer, StripeError> {
        let form = vec![
            ("email".to_string(), email.to_string()),
            ("name".to_string(), name.to_string()),
            ("metadata[profile_id]".to_string(), profile_id.to_string()),
        ];
        self.post_form("/v1/customers", &form).await
    }

    pub async fn create_checkout_session(
        &self,
        params: &CheckoutParams,
    ) -> Result<CheckoutSessionLink, StripeError> {
        let mut form = vec![
            ("customer".to_string(), params.customer_id.clone()),
            ("mode".to_string(), params.mode.to_string()),
            ("line_items[0][price]".to_string(), params.price_id.clone()),
            ("line_items[0][quantity]".to_string(), "1".to_string()),
            ("allow_promotion_codes".to_string(), "true".to_string()),
            ("success_url".to_string(), params.success_url.clone()),
            ("cancel_url".to_string(), params.cancel_url.clone()),
        ];
        for (key, value) in &params.metadata {
            form.push((format!("metadata[{key}]"), value.clone()));
            // Recurring plans mirror the metadata onto the subscription, so
            // its lifecycle events can be traced back to the profile.
            if params.mode == "subscription" {
                form.push((format!("subscription_data[metadata][{key}]"), value.clone()));
            }
        }
        self.post_form("/v1/checkout/sessions", &form).await
    }

    /// Fetch a subscription after a completed checkout; the session event
    /// only carries its id.
    pub async fn get_subscription(&self, id: &str) -> Result<SubscriptionObject, StripeError> {
        let url = format!("{}/v1/subscriptions/{id}", self.base_url);
        let response = self
            .http
            .get(&url)
            .basic_auth(&self.secret_key, None::<&str>)
            .send()
            .await?;
        Self::decode(response).await
    }

    async fn post_form<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        form: &[(String, String)],
    ) -> Result<T, StripeError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .http
            .post(&url)
            .basic_auth(&self.secret_key, None::<&str>)
            .form(form)
            .send()
            .await?;
        Self::decode(response).await
    }

    async fn decode<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, StripeError> {
        let status = response.status();
        if !status.is_success() {
            let message = match response.json::<ApiErrorBody>().await {
                Ok(body) => body.error.message,
                Err(_) => String::from("unreadable error body"),
            };
            return Err(StripeError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(response.json::<T>().await?)
    }
}
