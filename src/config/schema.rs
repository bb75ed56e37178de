//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the service.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the API service.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// HTTP listener settings.
    pub server: ServerConfig,

    /// Postgres connection settings.
    pub database: DatabaseConfig,

    /// Payment provider credentials and price catalog.
    pub stripe: StripeConfig,

    /// Admin API settings.
    pub admin: AdminConfig,

    /// Background maintenance settings.
    pub maintenance: MaintenanceConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// HTTP listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Request timeout in seconds.
    pub request_timeout_secs: u64,

    /// Maximum request body size in bytes.
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            request_timeout_secs: 30,
            max_body_bytes: 1024 * 1024, // 1MB
        }
    }
}

/// Postgres configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Connection URL. The DATABASE_URL environment variable overrides this.
    pub url: String,

    /// Maximum pool size.
    pub max_connections: u32,

    /// Apply pending migrations on startup.
    pub run_migrations: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "postgres://localhost:5432/eclat".to_string(),
            max_connections: 10,
            run_migrations: true,
        }
    }
}

/// Payment provider configuration.
///
/// The secret fields are normally left empty in the file and injected via
/// STRIPE_SECRET_KEY / STRIPE_WEBHOOK_SECRET.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StripeConfig {
    /// API secret key (sk_...).
    pub secret_key: String,

    /// Webhook signing secret (whsec_...).
    pub webhook_secret: String,

    /// API base URL. Only changed in tests.
    pub api_base_url: String,

    /// Outbound API request timeout in seconds.
    pub timeout_secs: u64,

    /// Price id for the monthly subscription.
    pub monthly_price_id: String,

    /// Price id for the annual subscription.
    pub annual_price_id: String,

    /// Price id for the one-time 7-day boost.
    pub boost_price_id: String,

    /// Public frontend URL, used to build checkout redirect URLs.
    pub app_url: String,
}

impl Default for StripeConfig {
    fn default() -> Self {
        Self {
            secret_key: String::new(),
            webhook_secret: String::new(),
            api_base_url: "https://api.stripe.com".to_string(),
            timeout_secs: 15,
            monthly_price_id: String::new(),
            annual_price_id: String::new(),
            boost_price_id: String::new(),
            app_url: "http://localhost:3000".to_string(),
        }
    }
}

/// Admin API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Enable the /admin routes.
    pub enabled: bool,

    /// API key for authentication (Bearer token). The ADMIN_API_KEY
    /// environment variable overrides this.
    pub api_key: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            // WARNING: This is a placeholder! Change this in production.
            api_key: "CHANGE_ME_IN_PRODUCTION".to_string(),
        }
    }
}

/// Background maintenance configuration.
///
/// The boost-expiry sweep is normally driven externally through
/// POST /admin/tasks/expire-boosts. The internal timer exists for
/// deployments without a scheduler.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MaintenanceConfig {
    /// Run the expiry sweep on an internal timer.
    pub sweep_enabled: bool,

    /// Sweep interval in seconds.
    pub sweep_interval_secs: u64,
}

impl Default for MaintenanceConfig {
    fn default() -> Self {
        Self {
            sweep_enabled: false,
            sweep_interval_secs: 3600,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit JSON logs instead of the human-readable format.
    pub log_json: bool,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_json: false,
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
