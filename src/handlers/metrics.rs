// Metrics handler
// Prometheus text exposition of the counter and a constant health gauge

use axum::{
    extract::State,
    http::header,
    response::IntoResponse,
};
use tracing::debug;

use crate::state::AppState;

pub const CONTENT_TYPE: &str = "text/plain; version=0.0.4";

/// Metrics for scraping
/// GET /metrics
/// Always 200: a failed counter read is reported as 0.
pub async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    let counter = match state.connections.cache.counter().await {
        Ok(counter) => counter,
        Err(e) => {
            debug!("Metrics counter read failed, reporting 0: {}", e);
            0
        }
    };

    ([(header::CONTENT_TYPE, CONTENT_TYPE)], render_metrics(counter))
}

/// Scrapers depend on this exact text.
pub fn render_metrics(counter: i64) -> String {
    format!(
        "# HELP api_counter_total Total API counter value\n\
         # TYPE api_counter_total counter\n\
         api_counter_total {counter}\n\
         \n\
         # HELP api_health Application health status\n\
         # TYPE api_health gauge\n\
         api_health 1\n"
    )
}
