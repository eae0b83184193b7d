use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Payout not configured: {0}")]
    PayoutNotConfigured(String),

    #[error("Payment provider error: {0}")]
    PaymentProvider(String),

    #[error("Invalid Swish request: {0}")]
    InvalidSwishRequest(String),

    // The contribution is already durable when this fires; only the gift's
    // running total is stale. Callers must not report the payment as lost.
    #[error("Aggregation conflict: {0}")]
    AggregationConflict(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    /// Stable machine-readable kind, exposed in error bodies so API
    /// consumers can branch without parsing messages.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Database(_) => "storage_unavailable",
            AppError::NotFound(_) => "not_found",
            AppError::BadRequest(_) => "bad_request",
            AppError::Validation(_) => "invalid_input",
            AppError::PayoutNotConfigured(_) => "payout_not_configured",
            AppError::PaymentProvider(_) => "payment_provider_error",
            AppError::InvalidSwishRequest(_) => "invalid_swish_request",
            AppError::AggregationConflict(_) => "aggregation_conflict",
            AppError::Internal(_) => "internal",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let kind = self.kind();
        let (status, error_message) = match self {
            AppError::Database(ref msg) => {
                tracing::error!("Database error: {}", msg);
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "Storage is unavailable, please retry".to_string(),
                )
            }
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Validation(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg),
            AppError::PayoutNotConfigured(msg) => (StatusCode::CONFLICT, msg),
            AppError::PaymentProvider(ref msg) => {
                tracing::error!("Payment provider error: {}", msg);
                (StatusCode::BAD_GATEWAY, "Payment provider error".to_string())
            }
            AppError::InvalidSwishRequest(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg),
            AppError::AggregationConflict(ref msg) => {
                // Only the maintenance endpoints let this reach the HTTP
                // layer; the contribution flow absorbs it into a
                // partial-success response instead.
                tracing::error!("Aggregation conflict: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Contribution saved but the gift total is stale".to_string(),
                )
            }
            AppError::Internal(ref msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
        };

        let body = Json(json!({
            "kind": kind,
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Database(err.to_string())
    }
}
