//! Directory and billing backend for beauty professionals in Abidjan.

pub mod admin;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod maintenance;
pub mod observability;
pub mod payments;
pub mod premium;
pub mod store;

pub use config::schema::AppConfig;
pub use http::HttpServer;
pub use lifecycle::shutdown::Shutdown;
