//! HTTP API subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request
//!     → server.rs (Axum setup, middleware: request ID, trace, timeout, limit)
//!     → auth.rs (/me and /billing routes: x-profile-id → Profile extension)
//!     → handlers (directory | dashboard | billing | tracking | webhooks)
//!     → response.rs (domain errors → {"error"} JSON with a status code)
//! ```

pub mod auth;
pub mod billing;
pub mod dashboard;
pub mod directory;
pub mod response;
pub mod server;
pub mod tracking;
pub mod webhooks;

pub use response::{ApiError, ApiResult};
pub use server::{build_router, AppState, HttpServer};
