//! Application configuration management.

use serde::Deserialize;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// JWT configuration.
    pub jwt: JwtConfig,
    /// Exchange-rate provider configuration.
    #[serde(default)]
    pub exchange: ExchangeConfig,
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
    8080
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL.
    pub url: String,
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

/// JWT configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    /// Secret key for signing tokens.
    pub secret: String,
    /// Access token expiration in seconds.
    #[serde(default = "default_access_token_expiry")]
    pub access_token_expiry_secs: u64,
}

fn default_access_token_expiry() -> u64 {
    3600 // 1 hour
}

/// Exchange-rate provider configuration.
///
/// Submission never waits on the provider for longer than `timeout_ms`;
/// past that the entered amount is stored unconverted.
#[derive(Debug, Clone, Deserialize)]
pub struct ExchangeConfig {
    /// Base URL; the source currency code is appended as the last path segment.
    #[serde(default = "default_exchange_base_url")]
    pub base_url: String,
    /// Upper bound for one conversion, in milliseconds.
    #[serde(default = "default_exchange_timeout_ms")]
    pub timeout_ms: u64,
    /// How long a fetched rate stays cached, in seconds.
    #[serde(default = "default_exchange_cache_ttl")]
    pub cache_ttl_secs: u64,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            base_url: default_exchange_base_url(),
            timeout_ms: default_exchange_timeout_ms(),
            cache_ttl_secs: default_exchange_cache_ttl(),
        }
    }
}

fn default_exchange_base_url() -> String {
    "https://api.exchangerate-api.com/v4/latest".to_string()
}

fn default_exchange_timeout_ms() -> u64 {
    3000
}

fn default_exchange_cache_ttl() -> u64 {
    3600
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
            .add_source(config::Environment::with_prefix("CLAIMFLOW").separator("__"))
            .build()?;

        config.try_deserialize()
    }
}
