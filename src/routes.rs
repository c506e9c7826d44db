//! HTTP route definitions.

use axum::{routing::get, Router};

use crate::{
    handlers::{
        counter::{get_counter, increment_counter},
        health_check,
        metrics::metrics,
        readiness_check, root,
        users::{create_user, list_users},
    },
    middleware::apply_middleware,
    state::AppState,
};

/// Create the Axum router with all endpoints and middleware
pub fn create_router(state: AppState) -> Router {
    let router = Router::new()
        .route("/", get(root))
        // Health checks
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        // Counter backed by Redis
        .route("/counter", get(get_counter).post(increment_counter))
        // Users backed by PostgreSQL
        .route("/users", get(list_users).post(create_user))
        .route("/metrics", get(metrics))
        .with_state(state);

    apply_middleware(router)
}
