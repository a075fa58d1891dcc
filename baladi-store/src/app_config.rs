use serde::Deserialize;
use std::env;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub auth: AuthConfig,
    pub search: SearchConfig,
    pub redemption: RedemptionConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    5
}

#[derive(Debug, Deserialize, Clone)]
pub struct RedisConfig {
    pub url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub jwt_expiration_seconds: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SearchConfig {
    #[serde(default = "default_radius_km")]
    pub default_radius_km: f64,
    #[serde(default = "default_max_radius_km")]
    pub max_radius_km: f64,
    #[serde(default = "default_max_page_size")]
    pub max_page_size: u32,
}

fn default_radius_km() -> f64 {
    10.0
}

fn default_max_radius_km() -> f64 {
    50.0
}

fn default_max_page_size() -> u32 {
    50
}

impl From<SearchConfig> for baladi_venue::SearchLimits {
    fn from(c: SearchConfig) -> Self {
        Self {
            default_radius_km: c.default_radius_km,
            max_radius_km: c.max_radius_km,
            max_page_size: c.max_page_size,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct RedemptionConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_retry_backoff_ms() -> u64 {
    25
}

impl From<RedemptionConfig> for baladi_offer::EligibilityConfig {
    fn from(c: RedemptionConfig) -> Self {
        Self {
            max_attempts: c.max_attempts,
            retry_backoff: Duration::from_millis(c.retry_backoff_ms),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            // Start off by merging in the "default" configuration file
            .add_source(config::File::with_name("config/default"))
            // Add in the current environment file
            // Default to 'development' env
            // Note that this file is _optional_
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Add in a local configuration file
            // This file shouldn't be checked in to git
            .add_source(config::File::with_name("config/local").required(false))
            // Add in settings from the environment (with a prefix of BALADI)
            // Eg.. `BALADI__SERVER__PORT=8080` would set the server port
            .add_source(config::Environment::with_prefix("BALADI").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
