//! Configuration validation.
//!
//! Serde handles the syntactic side; this module checks semantics and
//! returns every violation at once, so a broken deployment config is fixed
//! in one round trip.

use std::fmt;
use std::net::SocketAddr;
use url::Url;

use crate::config::schema::AppConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// One semantic violation, keyed by the config path it was found at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a parsed configuration. Returns all errors, not just the first.
pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.server.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "server.bind_address",
            "not a valid socket address",
        ));
    }
    if config.server.request_timeout_secs == 0 {
        errors.push(ValidationError::new(
            "server.request_timeout_secs",
            "must be greater than zero",
        ));
    }
    if config.server.max_body_bytes == 0 {
        errors.push(ValidationError::new(
            "server.max_body_bytes",
            "must be greater than zero",
        ));
    }

    if !config.database.url.starts_with("postgres://")
        && !config.database.url.starts_with("postgresql://")
    {
        errors.push(ValidationError::new(
            "database.url",
            "must be a postgres:// URL",
        ));
    }
    if config.database.max_connections == 0 {
        errors.push(ValidationError::new(
            "database.max_connections",
            "must be greater than zero",
        ));
    }

    if config.stripe.secret_key.is_empty() {
        errors.push(ValidationError::new(
            "stripe.secret_key",
            "missing (set it in the file or via STRIPE_SECRET_KEY)",
        ));
    }
    if config.stripe.webhook_secret.is_empty() {
        errors.push(ValidationError::new(
            "stripe.webhook_secret",
            "missing (set it in the file or via STRIPE_WEBHOOK_SECRET)",
        ));
    }
    if Url::parse(&config.stripe.api_base_url).is_err() {
        errors.push(ValidationError::new(
            "stripe.api_base_url",
            "not a valid URL",
        ));
    }
    if Url::parse(&config.stripe.app_url).is_err() {
        errors.push(ValidationError::new("stripe.app_url", "not a valid URL"));
    }
    if config.stripe.timeout_secs == 0 {
        errors.push(ValidationError::new(
            "stripe.timeout_secs",
            "must be greater than zero",
        ));
    }
    for (field, value) in [
        ("stripe.monthly_price_id", &config.stripe.monthly_price_id),
        ("stripe.annual_price_id", &config.stripe.annual_price_id),
        ("stripe.boost_price_id", &config.stripe.boost_price_id),
    ] {
        if value.is_empty() {
            errors.push(ValidationError::new(field, "missing price id"));
        }
    }

    if config.admin.enabled
        && (config.admin.api_key.is_empty() || config.admin.api_key == "CHANGE_ME_IN_PRODUCTION")
    {
        errors.push(ValidationError::new(
            "admin.api_key",
            "admin API enabled without a real key",
        ));
    }

    if config.maintenance.sweep_enabled && config.maintenance.sweep_interval_secs == 0 {
        errors.push(ValidationError::new(
            "maintenance.sweep_interval_secs",
            "must be greater than zero when the sweep timer is enabled",
        ));
    }

    if !LOG_LEVELS.contains(&config.observability.log_level.as_str()) {
        errors.push(ValidationError::new(
            "observability.log_level",
            "expected one of trace, debug, info, warn, error",
        ));
    }
    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            "not a valid socket address",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
