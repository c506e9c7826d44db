use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use thiserror::Error;
use tokio_postgres::error::SqlState;

use crate::connections::Unavailable;
use crate::models::ReadinessReport;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Unavailable(#[from] Unavailable),

    #[error("Service not ready")]
    NotReady(ReadinessReport),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unavailable(_) | ApiError::NotReady(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        let detail = match self {
            // Already logged where the acquire failed
            ApiError::Unavailable(ref err) => Value::from(err.detail()),
            ApiError::NotReady(report) => {
                tracing::warn!(
                    redis = ?report.redis,
                    postgres = ?report.postgres,
                    "Readiness check failed"
                );
                json!(report)
            }
            ApiError::Validation(message) => {
                tracing::debug!("Validation error: {}", message);
                Value::from(message)
            }
            ApiError::Internal(err) => {
                // Details stay in the server log
                tracing::error!("Internal error: {:#}", err);
                Value::from("Internal server error")
            }
        };

        (status, Json(json!({ "detail": detail }))).into_response()
    }
}

// PostgreSQL error mapping
impl From<tokio_postgres::Error> for ApiError {
    fn from(err: tokio_postgres::Error) -> Self {
        match err.code() {
            Some(&SqlState::UNIQUE_VIOLATION) => {
                let on_email = err
                    .as_db_error()
                    .and_then(|db| db.constraint())
                    .map_or(true, |constraint| constraint.contains("email"));
                let message = if on_email {
                    "Email already exists"
                } else {
                    "Resource already exists"
                };
                tracing::info!("PostgreSQL unique violation: {}", err);
                ApiError::validation(message)
            }
            // Remaining integrity constraint violations (class 23)
            Some(code) if code.code().starts_with("23") => {
                tracing::info!("PostgreSQL integrity violation: {}", err);
                ApiError::validation("Data integrity constraint violated")
            }
            // Logged once, when the response is built
            _ => ApiError::Internal(anyhow::Error::new(err).context("PostgreSQL operation failed")),
        }
    }
}

// Request body rejections keep the `{"detail": ...}` shape
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

// Result type alias for convenience
pub type ApiResult<T> = Result<T, ApiError>;
