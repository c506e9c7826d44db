// Counter handlers
// Read and increment the shared counter held in Redis

use axum::{extract::State, Json};
use tracing::info;

use crate::{error::ApiResult, models::CounterResponse, state::AppState};

/// Get the current counter value
/// GET /counter
pub async fn get_counter(State(state): State<AppState>) -> ApiResult<Json<CounterResponse>> {
    let counter = state.connections.cache.counter().await?;

    Ok(Json(CounterResponse::new(counter)))
}

/// Atomically increment the counter
/// POST /counter
pub async fn increment_counter(State(state): State<AppState>) -> ApiResult<Json<CounterResponse>> {
    let counter = state.connections.cache.increment_counter().await?;

    info!("Counter incremented to {}", counter);
    Ok(Json(CounterResponse::new(counter)))
}
