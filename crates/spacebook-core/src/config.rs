//! Application configuration
//!
//! Configuration is layered with the `config` crate: built-in defaults, then
//! `config/default`, then `config/{RUN_MODE}`, then `SPACEBOOK__*` variables,
//! then the flat variables older deployments already set (`DATABASE_URL`,
//! `JWT_SECRET`, `FX_FAKE`, `PORT`).

use config::{Config, ConfigError, Environment, File};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::env;

/// Main application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub exchange_rate: ExchangeRateConfig,
    #[serde(default)]
    pub booking: BookingConfig,
}

/// HTTP server configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Number of worker threads
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Allowed CORS origins; empty allows any origin
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_workers() -> usize {
    num_cpus::get()
}

/// Database configuration
#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in the pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Minimum number of connections in the pool
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    /// Connection acquire timeout in seconds
    #[serde(default = "default_acquire_timeout")]
    pub acquire_timeout_secs: u64,

    /// How long an admission waits for a slot lock before giving up
    #[serde(default = "default_lock_timeout")]
    pub lock_timeout_ms: u64,

    /// Apply embedded migrations on startup
    #[serde(default = "default_run_migrations")]
    pub run_migrations: bool,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    2
}

fn default_acquire_timeout() -> u64 {
    30
}

fn default_lock_timeout() -> u64 {
    5000
}

fn default_run_migrations() -> bool {
    true
}

/// Authentication configuration
#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    /// JWT signing secret
    pub jwt_secret: String,

    /// JWT lifetime in seconds
    #[serde(default = "default_jwt_expiration")]
    pub jwt_expiration_secs: i64,
}

fn default_jwt_expiration() -> i64 {
    7200 // 2 hours
}

/// Which rate provider backs the exchange-rate cache
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RateProviderKind {
    Fixed,
    Http,
}

/// What the cache does when the provider fails on a miss
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RateFallback {
    /// Surface `ExchangeRateUnavailable`
    Fail,
    /// Use `fixed_rate` and log a warning
    Fixed,
}

/// Exchange rate configuration (VES per USD)
#[derive(Debug, Deserialize, Clone)]
pub struct ExchangeRateConfig {
    #[serde(default = "default_provider")]
    pub provider: RateProviderKind,

    #[serde(default = "default_fixed_rate")]
    pub fixed_rate: Decimal,

    /// Cache time-to-live in seconds
    #[serde(default = "default_rate_ttl")]
    pub ttl_secs: u64,

    /// Endpoints tried in order by the HTTP provider
    #[serde(default = "default_http_urls")]
    pub http_urls: Vec<String>,

    #[serde(default = "default_http_timeout")]
    pub http_timeout_secs: u64,

    #[serde(default = "default_fallback")]
    pub fallback: RateFallback,
}

fn default_provider() -> RateProviderKind {
    RateProviderKind::Fixed
}

fn default_fixed_rate() -> Decimal {
    Decimal::new(1505, 1)
}

fn default_rate_ttl() -> u64 {
    3600
}

fn default_http_urls() -> Vec<String> {
    vec![
        "https://api.exchangerate.host/convert?from=USD&to=VES".to_string(),
        "https://api.exchangerate.host/latest?base=USD&symbols=VES".to_string(),
    ]
}

fn default_http_timeout() -> u64 {
    5
}

fn default_fallback() -> RateFallback {
    RateFallback::Fixed
}

impl Default for ExchangeRateConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            fixed_rate: default_fixed_rate(),
            ttl_secs: default_rate_ttl(),
            http_urls: default_http_urls(),
            http_timeout_secs: default_http_timeout(),
            fallback: default_fallback(),
        }
    }
}

/// Booking rules
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct BookingConfig {
    /// First bookable hour of the day
    #[serde(default = "default_open_hour")]
    pub open_hour: u32,

    /// Every booking must end at or before this hour
    #[serde(default = "default_close_hour")]
    pub close_hour: u32,

    /// Price multiplier on Saturdays and Sundays
    #[serde(default = "default_weekend_factor")]
    pub weekend_factor: Decimal,

    /// Upper bound on the installment count a client may request
    #[serde(default = "default_max_installments")]
    pub max_installments: u32,
}

fn default_open_hour() -> u32 {
    8
}

fn default_close_hour() -> u32 {
    22
}

fn default_weekend_factor() -> Decimal {
    Decimal::new(12, 1)
}

fn default_max_installments() -> u32 {
    24
}

impl Default for BookingConfig {
    fn default() -> Self {
        Self {
            open_hour: default_open_hour(),
            close_hour: default_close_hour(),
            weekend_factor: default_weekend_factor(),
            max_installments: default_max_installments(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment and optional config files
    pub fn load() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            // Start with default values
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 3000)?
            .set_default("server.workers", num_cpus::get() as i64)?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 2)?
            .set_default("database.acquire_timeout_secs", 30)?
            .set_default("database.lock_timeout_ms", 5000)?
            .set_default("database.run_migrations", true)?
            .set_default("auth.jwt_expiration_secs", 7200)?
            .set_default("exchange_rate.provider", "fixed")?
            .set_default("exchange_rate.fixed_rate", "150.5")?
            .set_default("exchange_rate.ttl_secs", 3600)?
            .set_default("exchange_rate.http_timeout_secs", 5)?
            .set_default("exchange_rate.fallback", "fixed")?
            .set_default("booking.open_hour", 8)?
            .set_default("booking.close_hour", 22)?
            .set_default("booking.weekend_factor", "1.2")?
            .set_default("booking.max_installments", 24)?
            // Load config file if exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // Load from environment variables with SPACEBOOK__ prefix
            .add_source(
                Environment::with_prefix("SPACEBOOK")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            // Support legacy environment variables
            .set_override_option("database.url", env::var("DATABASE_URL").ok())?
            .set_override_option("auth.jwt_secret", env::var("JWT_SECRET").ok())?
            .set_override_option("exchange_rate.fixed_rate", env::var("FX_FAKE").ok())?
            .set_override_option("server.port", env::var("PORT").ok())?
            .build()?;

        config.try_deserialize()
    }

    /// Load configuration from a specific file
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name(path))
            .add_source(
                Environment::with_prefix("SPACEBOOK")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Get the server bind address
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
