//! Database layer with `SeaORM` entities and repositories.
//!
//! This crate provides:
//! - `SeaORM` entity definitions
//! - The PostgreSQL implementation of the ledger repository
//! - Database migrations

pub mod entities;
pub mod migration;
pub mod repositories;

pub use repositories::PgLedgerRepository;

use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};
use tally_shared::config::DatabaseConfig;

/// Establishes a connection pool for the configured database.
///
/// # Errors
///
/// Returns an error if no URL is configured or the connection cannot be
/// established.
pub async fn connect(config: &DatabaseConfig) -> Result<DatabaseConnection, DbErr> {
    let url = config
        .url
        .as_deref()
        .ok_or_else(|| DbErr::Custom("database.url is not set".to_string()))?;

    let mut options = ConnectOptions::new(url);
    options
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .sqlx_logging(false);
    Database::connect(options).await
}
