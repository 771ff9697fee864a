//! Shared types, errors, and configuration for Tally.
//!
//! This crate provides common types used across all other crates:
//! - Typed IDs for chat groups, users, transactions and messages
//! - Settlement amount formatting
//! - Application-wide error types
//! - Configuration management
//! - Dashboard token claims and the JWT service

pub mod auth;
pub mod config;
pub mod error;
pub mod jwt;
pub mod types;

pub use auth::Claims;
pub use config::{AppConfig, BotConfig, ZeroRatePolicy};
pub use error::{AppError, AppResult};
pub use jwt::{JwtConfig, JwtError, JwtService};
