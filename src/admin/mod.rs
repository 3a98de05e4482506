//! Administrative API over stored purchases.
//!
//! Browse, search, edit and delete records. Bearer-token protected; mounted
//! only when `admin.enabled` is set.

pub mod auth;
pub mod handlers;

use std::time::Duration;

use axum::{middleware, routing::get, Router};
use tower_http::timeout::TimeoutLayer;

use self::auth::admin_auth_middleware;
use self::handlers::*;
use crate::http::server::AppState;

#[allow(deprecated)]
pub fn admin_router(state: AppState, timeout_secs: u64) -> Router<AppState> {
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/purchases", get(list_purchases))
        .route(
            "/admin/purchases/{id}",
            get(get_purchase).put(update_purchase).delete(delete_purchase),
        )
        .route_layer(middleware::from_fn_with_state(state, admin_auth_middleware))
        .layer(TimeoutLayer::new(Duration::from_secs(timeout_secs)))
}
