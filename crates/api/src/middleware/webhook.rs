//! Shared-secret check for the chat transport routes.

use axum::{
    Json,
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::warn;

use crate::AppState;

/// Header the chat transport puts the shared secret in.
pub const WEBHOOK_SECRET_HEADER: &str = "x-tally-webhook-secret";

/// Rejects chat webhook calls without the configured secret.
///
/// A deployment without a secret lets every call through.
pub async fn webhook_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let Some(expected) = state.webhook_secret.as_deref() else {
        return next.run(request).await;
    };

    let provided = request
        .headers()
        .get(WEBHOOK_SECRET_HEADER)
        .and_then(|h| h.to_str().ok());
    if provided == Some(expected) {
        return next.run(request).await;
    }

    warn!(path = %request.uri().path(), "chat webhook call with bad secret");
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({
            "error": "invalid_webhook_secret",
            "message": "Missing or wrong webhook secret"
        })),
    )
        .into_response()
}
