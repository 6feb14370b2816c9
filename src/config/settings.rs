//! Application settings and configuration

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Database configuration
    #[serde(default)]
    pub database: DatabaseSettings,
}

/// Database connection settings
///
/// When `user` is absent the credential-related keys are ignored entirely
/// and the connection is anonymous.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// Database host
    #[serde(default = "default_host")]
    pub host: String,
    /// Database port
    #[serde(default = "default_port")]
    pub port: u16,
    /// Database name
    #[serde(default = "default_database")]
    pub database: String,
    /// Username; omit for anonymous connections
    #[serde(default)]
    pub user: Option<String>,
    /// Password, used only together with `user`
    #[serde(default)]
    pub password: Option<String>,
    /// Authentication source database, used only together with `user`
    #[serde(default)]
    pub authentication_source: Option<String>,
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    27017
}

fn default_database() -> String {
    "market_data".to_string()
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            database: default_database(),
            user: None,
            password: None,
            authentication_source: None,
        }
    }
}

impl Settings {
    /// Load settings from configuration files and environment
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with_prefix("MARKET_STORE")
    }

    /// Load settings with a custom environment variable prefix
    pub fn load_with_prefix(env_prefix: &str) -> Result<Self, ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let config_dir = Self::config_dir();

        let s = Config::builder()
            // Start with default configuration
            .add_source(File::with_name(&format!("{}/default", config_dir)).required(false))
            // Add environment-specific configuration
            .add_source(File::with_name(&format!("{}/{}", config_dir, run_mode)).required(false))
            // Add local overrides (not checked into git)
            .add_source(File::with_name(&format!("{}/local", config_dir)).required(false))
            // Add environment variables (e.g., MARKET_STORE__DATABASE__HOST)
            .add_source(
                Environment::with_prefix(env_prefix)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        s.try_deserialize()
    }

    /// Get the configuration directory path
    fn config_dir() -> String {
        std::env::var("MARKET_STORE_CONFIG_DIR").unwrap_or_else(|_| "config".into())
    }

    /// Create default settings (useful for testing)
    pub fn default_settings() -> Self {
        Settings {
            database: DatabaseSettings::default(),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::default_settings()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default_settings();
        assert_eq!(settings.database.host, "localhost");
        assert_eq!(settings.database.port, 27017);
        assert_eq!(settings.database.database, "market_data");
        assert!(settings.database.user.is_none());
    }
}
