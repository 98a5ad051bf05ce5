use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{error, info};

/// Application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// CORS allowed origins, comma separated
    pub cors_origins: Option<String>,

    /// JWT secret used to verify REST API tokens
    pub auth_jwt_secret: Option<String>,

    /// Database URL. Without it the in-memory store is used.
    pub db_url: Option<String>,

    /// Seconds after which an idle remote cursor is dropped
    #[serde(default = "default_cursor_ttl_secs")]
    pub cursor_ttl_secs: u64,

    /// Delay before the online-user list is pushed after a disconnect
    #[serde(default = "default_presence_settle_ms")]
    pub presence_settle_ms: u64,

    /// In-memory window during which repeated group joins are not logged
    #[serde(default = "default_join_debounce_secs")]
    pub join_debounce_secs: u64,

    /// Lookback in the stored activity log for an earlier join of the same participant
    #[serde(default = "default_join_lookback_mins")]
    pub join_lookback_mins: i64,

    /// Length of the rolling activity log kept per group
    #[serde(default = "default_recent_activity_limit")]
    pub recent_activity_limit: usize,
}

impl Config {
    /// Load configuration from environment variables or app.env file
    pub fn load() -> Result<Self, ConfigError> {
        // Try to load from app.env file first
        if std::path::Path::new("app.env").exists() {
            dotenvy::from_filename("app.env").ok();
        } else {
            // Fallback to .env file
            dotenvy::dotenv().ok();
        }

        match envy::from_env::<Config>() {
            Ok(config) => {
                config.validate()?;
                info!("Configuration loaded successfully");
                Ok(config)
            }
            Err(e) => {
                error!("Failed to load configuration: {}", e);
                Err(ConfigError::EnvError(e))
            }
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.recent_activity_limit == 0 {
            return Err(ConfigError::Invalid(
                "RECENT_ACTIVITY_LIMIT must be at least 1".to_string(),
            ));
        }
        if self.cursor_ttl_secs == 0 {
            return Err(ConfigError::Invalid(
                "CURSOR_TTL_SECS must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Get the full server address
    pub fn server_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Allowed CORS origins as a list
    pub fn cors_origin_list(&self) -> Vec<String> {
        self.cors_origins
            .as_deref()
            .map(|origins| {
                origins
                    .split(',')
                    .map(str::trim)
                    .filter(|o| !o.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn cursor_ttl(&self) -> Duration {
        Duration::from_secs(self.cursor_ttl_secs)
    }

    pub fn presence_settle(&self) -> Duration {
        Duration::from_millis(self.presence_settle_ms)
    }

    pub fn join_debounce(&self) -> Duration {
        Duration::from_secs(self.join_debounce_secs)
    }

    pub fn join_lookback(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.join_lookback_mins)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: None,
            auth_jwt_secret: None,
            db_url: None,
            cursor_ttl_secs: default_cursor_ttl_secs(),
            presence_settle_ms: default_presence_settle_ms(),
            join_debounce_secs: default_join_debounce_secs(),
            join_lookback_mins: default_join_lookback_mins(),
            recent_activity_limit: default_recent_activity_limit(),
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    EnvError(envy::Error),
    Invalid(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::EnvError(e) => write!(f, "Environment variable error: {}", e),
            ConfigError::Invalid(msg) => write!(f, "Invalid configuration: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

// Default value functions
fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_cursor_ttl_secs() -> u64 {
    10
}

fn default_presence_settle_ms() -> u64 {
    100
}

fn default_join_debounce_secs() -> u64 {
    60
}

fn default_join_lookback_mins() -> i64 {
    60
}

fn default_recent_activity_limit() -> usize {
    10
}
