//! HTTP error responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use tally_core::ledger::LedgerError;
use tally_shared::AppError;
use tracing::error;

/// An [`AppError`] rendered as `{ "error": code, "message": text }`.
#[derive(Debug)]
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        Self(err)
    }
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        Self(err.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let message = match &self.0 {
            AppError::Storage(detail) | AppError::Internal(detail) => {
                error!(error = %detail, code = self.0.error_code(), "request failed");
                "An error occurred".to_string()
            }
            other => other.to_string(),
        };
        (
            status,
            Json(json!({
                "error": self.0.error_code().to_ascii_lowercase(),
                "message": message,
                "retryable": self.0.is_retryable(),
            })),
        )
            .into_response()
    }
}
