//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (tracing, limits, request ID, route timing)
//! - Bind server to listener
//! - Drain cleanly on the shutdown signal

use std::sync::Arc;
use std::time::Duration;

use axum::middleware;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::admin;
use crate::config::AppConfig;
use crate::http::{auth, billing, dashboard, directory, tracking, webhooks};
use crate::observability::metrics::track_http;
use crate::payments::{Reconciler, StripeClient};
use crate::store::Store;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub stripe: Arc<StripeClient>,
    pub reconciler: Arc<Reconciler>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, config: Arc<AppConfig>) -> Self {
        let stripe = Arc::new(StripeClient::new(&config.stripe));
        let reconciler = Arc::new(Reconciler::new(
            store.clone(),
            stripe.clone(),
            config.stripe.clone(),
        ));
        Self {
            store,
            stripe,
            reconciler,
            config,
        }
    }
}

/// HTTP server for the marketplace API.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    pub fn new(state: AppState) -> Self {
        Self {
            router: build_router(state),
        }
    }

    /// Run the server, accepting connections on the given listener until
    /// the shutdown signal arrives.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Build the Axum router with all middleware layers.
pub fn build_router(state: AppState) -> Router {
    let timeout = Duration::from_secs(state.config.server.request_timeout_secs);
    let body_limit = state.config.server.max_body_bytes;
    let admin_enabled = state.config.admin.enabled;

    let public = Router::new()
        .route("/health", get(health))
        .route("/profiles", get(directory::list_profiles))
        .route("/profiles/{slug}", get(directory::get_profile))
        .route("/track/view", post(tracking::track_view))
        .route("/track/whatsapp-click", post(tracking::track_whatsapp_click))
        .route("/webhooks/stripe", post(webhooks::stripe_webhook));

    let provider = Router::new()
        .route(
            "/me/profile",
            get(dashboard::get_my_profile).patch(dashboard::update_my_profile),
        )
        .route(
            "/me/hours",
            get(dashboard::get_my_hours).put(dashboard::put_my_hours),
        )
        .route(
            "/me/services",
            get(dashboard::list_my_services).post(dashboard::add_my_service),
        )
        .route("/me/services/{id}", delete(dashboard::delete_my_service))
        .route(
            "/me/portfolio",
            get(dashboard::get_my_portfolio).post(dashboard::add_to_portfolio),
        )
        .route("/me/portfolio/{id}", delete(dashboard::delete_from_portfolio))
        .route("/me/premium", get(dashboard::get_my_premium))
        .route("/me/payments", get(dashboard::get_my_payments))
        .route("/me/stats", get(dashboard::get_my_stats))
        .route(
            "/billing/checkout-session",
            post(billing::create_checkout_session),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_profile,
        ));

    let mut router = public.merge(provider);
    if admin_enabled {
        router = router.merge(admin::admin_router(state.clone()));
    }

    // Layers are attached innermost-first (each `.layer` wraps the stack so
    // far): the request id exists before the trace span opens, and the
    // timeout wraps everything the handler does.
    router
        .route_layer(middleware::from_fn(track_http))
        .with_state(state)
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(TimeoutLayer::new(timeout))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}
