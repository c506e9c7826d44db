use std::time::Duration;

use anyhow::Context;
use axum::Router;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::{DefaultMakeSpan, DefaultOnFailure, DefaultOnResponse, TraceLayer},
};
use tracing::Level;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Outer bound for a whole request. Store calls are capped separately by the
/// store timeout, so this only trips on something unexpected.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Wraps the router in request tracing, open CORS and the request timeout.
pub fn apply_middleware(router: Router) -> Router {
    router.layer(
        ServiceBuilder::new()
            .layer(
                TraceLayer::new_for_http()
                    .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                    .on_response(DefaultOnResponse::new().level(Level::INFO))
                    .on_failure(DefaultOnFailure::new().level(Level::WARN)),
            )
            .layer(cors_layer())
            .layer(TimeoutLayer::new(REQUEST_TIMEOUT)),
    )
}

/// Any origin, method and header. Credentials stay off, which `Any` requires.
pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// JSON log lines filtered by `RUST_LOG`, `info` when unset.
pub fn init_tracing() -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .flatten_event(true)
                .with_current_span(true)
                .with_span_list(false)
                .with_target(true),
        )
        .try_init()
        .context("Failed to install tracing subscriber")?;

    tracing::info!("Structured logging initialized with JSON format");
    Ok(())
}
