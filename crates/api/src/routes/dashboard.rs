//! Dashboard routes.
//!
//! Every route is scoped to the group named in the caller's dashboard token.

use axum::{
    Json, Router,
    extract::{Query, State},
    routing::{get, post},
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tally_core::ledger::{Operator, Transaction};
use tally_core::query::QueryResult;
use tally_core::rates::GroupRateConfig;
use tally_shared::AppError;
use tally_shared::types::{GroupId, MessageId};
use tracing::info;

use crate::{AppState, ApiError, middleware::AuthUser};

/// Creates the dashboard routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/dashboard/transactions", get(list_transactions))
        .route("/dashboard/rollback", post(rollback))
        .route("/dashboard/config", get(get_config))
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Query parameters for listing transactions.
#[derive(Debug, Deserialize)]
pub struct ListTransactionsQuery {
    /// First local date (YYYY-MM-DD); defaults to today.
    pub start_date: Option<NaiveDate>,
    /// Last local date, inclusive; defaults to `start_date`.
    pub end_date: Option<NaiveDate>,
    /// Restrict to one country label.
    pub country: Option<String>,
}

/// Transactions of a date range with their statistics.
#[derive(Debug, Serialize)]
pub struct TransactionsResponse {
    /// Group the token is scoped to.
    pub group_id: GroupId,
    /// First local date.
    pub start_date: NaiveDate,
    /// Last local date, inclusive.
    pub end_date: NaiveDate,
    /// Country filter, if any.
    pub country: Option<String>,
    /// Records and statistics.
    #[serde(flatten)]
    pub result: QueryResult,
}

/// Request body for a rollback.
#[derive(Debug, Deserialize)]
pub struct RollbackRequest {
    /// Confirmation message id of the record to remove.
    pub correlation_id: MessageId,
}

/// Response for a rollback.
#[derive(Debug, Serialize)]
pub struct RollbackResponse {
    /// The removed record.
    pub rolled_back: Transaction,
}

// ============================================================================
// Handlers
// ============================================================================

/// GET `/dashboard/transactions` - Records and statistics for local dates.
async fn list_transactions(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<ListTransactionsQuery>,
) -> Result<Json<TransactionsResponse>, ApiError> {
    let engine = state.engine();
    let start_date = query.start_date.unwrap_or_else(|| engine.today());
    let end_date = query.end_date.unwrap_or(start_date);
    if end_date < start_date {
        return Err(AppError::Validation("end_date is before start_date".to_string()).into());
    }

    let (from, to) = engine.day_range(start_date, end_date);
    let result = engine
        .query(auth.group_id(), from, to, query.country.as_deref())
        .await?;

    Ok(Json(TransactionsResponse {
        group_id: auth.group_id(),
        start_date,
        end_date,
        country: query.country,
        result,
    }))
}

/// POST `/dashboard/rollback` - Remove one record by its confirmation id.
async fn rollback(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<RollbackRequest>,
) -> Result<Json<RollbackResponse>, ApiError> {
    let operator = Operator::new(auth.user_id(), "dashboard");
    let tx = state
        .engine()
        .rollback(auth.group_id(), payload.correlation_id, &operator)
        .await?;

    info!(
        group_id = %auth.group_id(),
        correlation_id = %payload.correlation_id,
        user_id = %auth.user_id(),
        "dashboard rollback"
    );
    Ok(Json(RollbackResponse { rolled_back: tx }))
}

/// GET `/dashboard/config` - Group default rates and country overrides.
async fn get_config(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<GroupRateConfig>, ApiError> {
    Ok(Json(state.engine().rates().config(auth.group_id()).await?))
}

#[cfg(test)]
mod integration_tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode, header::AUTHORIZATION},
    };
    use rust_decimal_macros::dec;
    use serde_json::json;
    use tally_core::ledger::{Direction, TransactionKind};
    use tally_core::rates::RatePatch;
    use tower::ServiceExt;

    use crate::create_router;
    use crate::test_support::{OWNER, json_body, test_state};

    const GROUP: GroupId = GroupId(-100_400);

    /// State with a configured group holding one confirmed deposit.
    async fn seeded_state() -> AppState {
        let state = test_state(None);
        let engine = state.engine();
        engine.rates().ensure_group(GROUP, "结算群").await.unwrap();
        engine
            .rates()
            .set_rate(GROUP, Direction::In, RatePatch::fx(dec!(7)))
            .await
            .unwrap();
        let tx = engine
            .record(
                GROUP,
                TransactionKind::Deposit,
                dec!(700),
                None,
                &Operator::new(OWNER, "owner"),
            )
            .await
            .unwrap();
        engine.attach_correlation(tx.id, MessageId(901)).await.unwrap();
        state
    }

    fn get(uri: &str, token: &str) -> Request<Body> {
        Request::builder()
            .method("GET")
            .uri(uri)
            .header(AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap()
    }

    fn token(state: &AppState) -> String {
        state
            .jwt_service
            .generate_dashboard_token(OWNER, GROUP)
            .unwrap()
    }

    #[tokio::test]
    async fn test_transactions_without_token() {
        let app = create_router(test_state(None));

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/dashboard/transactions")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_transactions_today() {
        let state = seeded_state().await;
        let token = token(&state);
        let app = create_router(state);

        let response = app
            .oneshot(get("/api/v1/dashboard/transactions", &token))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["group_id"], GROUP.0);
        assert_eq!(body["records"].as_array().unwrap().len(), 1);
        assert_eq!(body["records"][0]["correlation_id"], 901);
    }

    #[tokio::test]
    async fn test_transactions_rejects_reversed_range() {
        let state = test_state(None);
        let token = token(&state);
        let app = create_router(state);

        let response = app
            .oneshot(get(
                "/api/v1/dashboard/transactions?start_date=2026-05-02&end_date=2026-05-01",
                &token,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_rollback_by_correlation() {
        let state = seeded_state().await;
        let token = token(&state);
        let app = create_router(state.clone());

        let rollback = |id: i64| {
            Request::builder()
                .method("POST")
                .uri("/api/v1/dashboard/rollback")
                .header(AUTHORIZATION, format!("Bearer {token}"))
                .header("Content-Type", "application/json")
                .body(Body::from(json!({ "correlation_id": id }).to_string()))
                .unwrap()
        };

        let response = app.clone().oneshot(rollback(901)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["rolled_back"]["correlation_id"], 901);

        let remaining = state.engine().query_today(GROUP).await.unwrap();
        assert!(remaining.records.is_empty());

        let response = app.oneshot(rollback(901)).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_config() {
        let state = seeded_state().await;
        let token = token(&state);
        let app = create_router(state);

        let response = app
            .oneshot(get("/api/v1/dashboard/config", &token))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["group"]["in_fx"], "7");
        assert!(body["countries"].as_array().unwrap().is_empty());
    }
}
