//! Chat transport routes.
//!
//! The transport posts every inbound message here, sends back whatever
//! reply it gets, and then reports the delivered confirmation's message id
//! so the record can later be rolled back by reply.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
};
use serde::{Deserialize, Serialize};
use tally_core::dispatch::InboundMessage;
use tally_core::ledger::{LedgerError, Transaction};
use tally_shared::AppError;
use tally_shared::types::{GroupId, MessageId, TransactionId, UserId};

use crate::{AppState, ApiError};

/// Creates the chat transport routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/chat/messages", post(handle_message))
        .route("/chat/confirmations", post(confirm))
        .route("/chat/dashboard-tokens", post(issue_dashboard_token))
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body reporting a delivered confirmation.
#[derive(Debug, Deserialize)]
pub struct ConfirmationRequest {
    /// Record the confirmation belongs to.
    pub transaction_id: TransactionId,
    /// Chat message id of the delivered confirmation.
    pub message_id: MessageId,
}

/// Request body for a dashboard link.
#[derive(Debug, Deserialize)]
pub struct DashboardTokenRequest {
    /// Group the dashboard will show.
    pub group_id: GroupId,
    /// User asking for the link.
    pub user_id: UserId,
}

/// A freshly issued dashboard token.
#[derive(Debug, Serialize)]
pub struct DashboardTokenResponse {
    /// Bearer token for the dashboard routes.
    pub token: String,
}

// ============================================================================
// Handlers
// ============================================================================

/// POST `/chat/messages` - Run the command in one inbound message.
///
/// Returns the reply, or 204 when the message carries no command.
async fn handle_message(
    State(state): State<AppState>,
    Json(message): Json<InboundMessage>,
) -> Response {
    match state.dispatcher.handle(&message).await {
        Some(reply) => (StatusCode::OK, Json(reply)).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    }
}

/// POST `/chat/confirmations` - Attach a delivered confirmation's message id.
async fn confirm(
    State(state): State<AppState>,
    Json(payload): Json<ConfirmationRequest>,
) -> Result<Json<Transaction>, ApiError> {
    let tx = state
        .engine()
        .attach_correlation(payload.transaction_id, payload.message_id)
        .await?;
    Ok(Json(tx))
}

/// POST `/chat/dashboard-tokens` - Issue a dashboard token to an admin.
async fn issue_dashboard_token(
    State(state): State<AppState>,
    Json(payload): Json<DashboardTokenRequest>,
) -> Result<Json<DashboardTokenResponse>, ApiError> {
    if !state
        .engine()
        .admins()
        .is_authorized(payload.user_id)
        .await?
    {
        return Err(LedgerError::Permission(payload.user_id).into());
    }
    let token = state
        .jwt_service
        .generate_dashboard_token(payload.user_id, payload.group_id)
        .map_err(|e| AppError::Internal(e.to_string()))?;
    Ok(Json(DashboardTokenResponse { token }))
}
