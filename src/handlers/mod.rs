// Handlers module
// HTTP handlers for the REST API

pub mod counter;
pub mod metrics;
pub mod users;

use axum::{extract::State, Json};

use crate::{
    error::ApiResult,
    models::{HealthResponse, ReadinessReport, ServiceInfo},
    state::AppState,
};

/// Static service information
/// GET /
pub async fn root() -> Json<ServiceInfo> {
    Json(ServiceInfo::default())
}

/// Liveness check
/// GET /health
/// Never touches the stores, so it stays 200 while they are down.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse::healthy(&state.environment))
}

/// Readiness check
/// GET /ready
/// Acquires both stores through the connection manager; 503 with a per-store
/// report when either is unavailable.
pub async fn readiness_check(State(state): State<AppState>) -> ApiResult<Json<ReadinessReport>> {
    let (cache, database) = tokio::join!(
        state.connections.acquire_cache(),
        state.connections.acquire_database(),
    );

    let report = ReadinessReport::new(cache.is_ok(), database.is_ok());
    if report.is_ready() {
        Ok(Json(report))
    } else {
        Err(crate::error::ApiError::NotReady(report))
    }
}
