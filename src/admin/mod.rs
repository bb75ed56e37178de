pub mod auth;
pub mod handlers;

use axum::{
    middleware,
    routing::{get, patch, post},
    Router,
};

use self::auth::admin_auth_middleware;
use self::handlers::*;
use crate::http::server::AppState;

pub fn admin_router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/analytics", get(get_analytics))
        .route("/admin/profiles/{id}/status", patch(set_profile_status))
        .route("/admin/tasks/expire-boosts", post(run_expire_boosts))
        .layer(middleware::from_fn_with_state(state, admin_auth_middleware))
}
