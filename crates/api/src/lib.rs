//! HTTP API layer with Axum routes and middleware.
//!
//! This crate provides:
//! - Dashboard routes (token-scoped to one chat group)
//! - Chat transport webhook routes
//! - Authentication middleware
//! - Error responses

pub mod error;
pub mod middleware;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use tally_core::dispatch::CommandDispatcher;
use tally_core::ledger::LedgerEngine;
use tally_shared::JwtService;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use error::ApiError;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Chat command dispatcher; owns the ledger engine.
    pub dispatcher: Arc<CommandDispatcher>,
    /// JWT service for dashboard tokens.
    pub jwt_service: Arc<JwtService>,
    /// Shared secret expected on chat webhook calls.
    pub webhook_secret: Option<Arc<str>>,
}

impl AppState {
    /// The ledger engine behind the dispatcher.
    #[must_use]
    pub fn engine(&self) -> &LedgerEngine {
        self.dispatcher.engine()
    }
}

/// Creates the main application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", routes::api_routes_with_state(state.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
