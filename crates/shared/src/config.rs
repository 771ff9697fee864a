//! Application configuration management.

use chrono_tz::Tz;
use serde::Deserialize;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// JWT configuration for dashboard links.
    pub jwt: JwtSettings,
    /// Chat bot behaviour.
    #[serde(default)]
    pub bot: BotConfig,
    /// Logging configuration.
    #[serde(default)]
    pub log: LogConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    10000
}

/// Database configuration.
///
/// When `url` is absent the server keeps the ledger in memory.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL.
    pub url: Option<String>,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

/// JWT settings as read from configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct JwtSettings {
    /// Secret key for signing tokens.
    pub secret: String,
    /// Dashboard token expiration in seconds.
    #[serde(default = "default_dashboard_token_expiry")]
    pub dashboard_token_expiry_secs: u64,
}

fn default_dashboard_token_expiry() -> u64 {
    86_400 // 24 hours
}

/// What to do when a transaction resolves to an all-zero rate pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZeroRatePolicy {
    /// Refuse the transaction with an "unconfigured rate" error.
    #[default]
    Reject,
    /// Log a warning and let the pair through.
    Warn,
}

/// Chat bot behaviour.
#[derive(Debug, Clone, Deserialize)]
pub struct BotConfig {
    /// The process-wide owner. Read once at start-up, never reassigned.
    pub owner_id: Option<i64>,
    /// Name shown in summary headers.
    #[serde(default = "default_bot_name")]
    pub name: String,
    /// Business timezone used for "today" and human-readable timestamps.
    #[serde(default = "default_timezone")]
    pub timezone: Tz,
    /// Zero-rate handling for new transactions.
    #[serde(default)]
    pub zero_rate_policy: ZeroRatePolicy,
    /// Transactions older than this many days are purged.
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
    /// Shared secret the chat transport sends in `X-Tally-Webhook-Secret`.
    /// Unset means the chat routes accept any caller.
    #[serde(default)]
    pub webhook_secret: Option<String>,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            owner_id: None,
            name: default_bot_name(),
            timezone: default_timezone(),
            zero_rate_policy: ZeroRatePolicy::default(),
            retention_days: default_retention_days(),
            webhook_secret: None,
        }
    }
}

fn default_bot_name() -> String {
    "全球国际支付".to_string()
}

fn default_timezone() -> Tz {
    chrono_tz::Asia::Shanghai
}

fn default_retention_days() -> u32 {
    30
}

/// Logging configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LogConfig {
    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::Environment::with_prefix("TALLY").separator("__"))
            .build()?;

        config.try_deserialize()
    }
}
