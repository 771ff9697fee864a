//! Request middleware.

pub mod auth;
pub mod webhook;

pub use auth::{AuthUser, auth_middleware};
pub use webhook::webhook_middleware;
