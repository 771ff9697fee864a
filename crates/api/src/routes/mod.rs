//! API route definitions.

use axum::{Router, middleware};

use crate::AppState;
use crate::middleware::{auth_middleware, webhook_middleware};

pub mod chat;
pub mod dashboard;
pub mod health;

/// Creates the API router with protected routes that need state for middleware.
#[allow(clippy::needless_pass_by_value)]
pub fn api_routes_with_state(state: AppState) -> Router<AppState> {
    // Dashboard routes require a dashboard token
    let dashboard_routes = dashboard::routes().layer(middleware::from_fn_with_state(
        state.clone(),
        auth_middleware,
    ));

    // Chat transport routes require the webhook secret, when configured
    let chat_routes = chat::routes().layer(middleware::from_fn_with_state(
        state.clone(),
        webhook_middleware,
    ));

    Router::new()
        .merge(health::routes())
        .merge(dashboard_routes)
        .merge(chat_routes)
}
