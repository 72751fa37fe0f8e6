//! API configuration

use serde::Deserialize;
use std::time::Duration;

use infra_db::DatabaseConfig;

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines
    Pretty,
    /// One JSON object per event
    Json,
}

/// API configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// Shared secret used to validate bearer tokens (HS256)
    pub jwt_secret: String,
    /// Database URL
    pub database_url: String,
    /// Maximum pooled database connections
    pub db_max_connections: u32,
    /// Seconds a request waits for a pooled connection
    pub db_acquire_timeout_secs: u64,
    /// Log level or `EnvFilter` directive
    pub log_level: String,
    /// Log output format
    pub log_format: LogFormat,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            jwt_secret: "change-me-in-production".to_string(),
            database_url: "postgres://localhost/school_finance".to_string(),
            db_max_connections: 10,
            db_acquire_timeout_secs: 5,
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
        }
    }
}

impl ApiConfig {
    /// Loads configuration from `API_*` environment variables over the defaults
    ///
    /// `API_JWT_SECRET` maps to `jwt_secret`, `API_LOG_FORMAT=json` selects
    /// JSON logs, and so on.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        let defaults = Self::default();
        config::Config::builder()
            .set_default("host", defaults.host)?
            .set_default("port", i64::from(defaults.port))?
            .set_default("jwt_secret", defaults.jwt_secret)?
            .set_default("database_url", defaults.database_url)?
            .set_default("db_max_connections", i64::from(defaults.db_max_connections))?
            .set_default("db_acquire_timeout_secs", defaults.db_acquire_timeout_secs as i64)?
            .set_default("log_level", defaults.log_level)?
            .set_default("log_format", "pretty")?
            .add_source(config::Environment::with_prefix("API").try_parsing(true))
            .build()?
            .try_deserialize()
    }

    /// Returns the server address
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Pool settings derived from this configuration
    pub fn database_config(&self) -> DatabaseConfig {
        DatabaseConfig::new(self.database_url.clone())
            .max_connections(self.db_max_connections)
            .acquire_timeout(Duration::from_secs(self.db_acquire_timeout_secs))
    }
}
