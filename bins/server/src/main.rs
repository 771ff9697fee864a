//! Tally API Server
//!
//! Main entry point for the group-chat ledger service.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use chrono::Utc;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tally_api::{AppState, create_router};
use tally_core::dispatch::CommandDispatcher;
use tally_core::ledger::{LedgerEngine, LedgerRepository, LedgerSettings, MemoryRepository};
use tally_db::{PgLedgerRepository, connect};
use tally_shared::types::UserId;
use tally_shared::{AppConfig, JwtConfig, JwtService};

/// How often expired transactions are purged.
const RETENTION_SWEEP_INTERVAL: Duration = Duration::from_secs(3600);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Load configuration
    let config = AppConfig::load().context("failed to load configuration")?;

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "tally=debug,audit=info,tower_http=debug".into());
    if config.log.json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    // Pick the ledger store
    let repo: Arc<dyn LedgerRepository> = if config.database.url.is_some() {
        let db = connect(&config.database).await?;
        info!("Connected to database");
        Arc::new(PgLedgerRepository::new(db))
    } else {
        warn!("database.url is not set; keeping the ledger in memory");
        Arc::new(MemoryRepository::new())
    };

    if config.bot.owner_id.is_none() {
        warn!("bot.owner_id is not set; only admins can operate ledgers");
    }

    let engine = LedgerEngine::new(
        repo,
        LedgerSettings {
            owner_id: config.bot.owner_id.map(UserId),
            zero_rate_policy: config.bot.zero_rate_policy,
            timezone: config.bot.timezone,
        },
    );
    spawn_retention_sweep(engine.clone(), config.bot.retention_days);

    // Create JWT service
    let jwt_config = JwtConfig {
        secret: config.jwt.secret.clone(),
        dashboard_token_expires_secs: i64::try_from(config.jwt.dashboard_token_expiry_secs)
            .context("jwt.dashboard_token_expiry_secs is out of range")?,
    };

    // Create application state
    let state = AppState {
        dispatcher: Arc::new(CommandDispatcher::new(engine, config.bot.name.clone())?),
        jwt_service: Arc::new(JwtService::new(jwt_config)),
        webhook_secret: config.bot.webhook_secret.as_deref().map(Arc::from),
    };
    if state.webhook_secret.is_none() {
        warn!("bot.webhook_secret is not set; chat routes accept any caller");
    }

    // Create router
    let app = create_router(state);

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!(bot = %config.bot.name, timezone = %config.bot.timezone, "Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
        })
        .await?;

    Ok(())
}

/// Deletes transactions older than `retention_days`, once per interval.
fn spawn_retention_sweep(engine: LedgerEngine, retention_days: u32) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(RETENTION_SWEEP_INTERVAL);
        loop {
            ticker.tick().await;
            let cutoff = Utc::now() - chrono::Duration::days(i64::from(retention_days));
            match engine.purge_before(cutoff).await {
                Ok(summary) if summary.count > 0 => {
                    info!(count = summary.count, %cutoff, "purged expired transactions");
                }
                Ok(_) => {}
                Err(e) => error!(error = %e, "retention sweep failed"),
            }
        }
    });
}
