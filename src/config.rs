//! Configuration management for the borrow service

use config::{Config, ConfigError, Environment, File};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::env;

use crate::models::fine::FinePolicy;

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Remote REST backend that owns every record
#[derive(Debug, Deserialize, Clone)]
pub struct UpstreamConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
    /// `pretty` or `json`
    pub format: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BorrowingConfig {
    /// Used when the upstream omits both the due date and the period
    pub default_period_days: i64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct FinesConfig {
    pub daily_rate: Decimal,
    #[serde(default)]
    pub maximum_fine: Option<Decimal>,
}

impl FinesConfig {
    pub fn policy(&self) -> FinePolicy {
        FinePolicy::new(self.daily_rate, self.maximum_fine)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct SearchConfig {
    pub debounce_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub upstream: UpstreamConfig,
    pub auth: AuthConfig,
    pub logging: LoggingConfig,
    #[serde(default)]
    pub borrowing: BorrowingConfig,
    #[serde(default)]
    pub fines: FinesConfig,
    #[serde(default)]
    pub search: SearchConfig,
}

impl AppConfig {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let config = Config::builder()
            // Start with default configuration
            .add_source(File::with_name("config/default"))
            // Layer on the environment-specific file
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // Add environment variables (with prefix BOOKSTORE_)
            .add_source(
                Environment::with_prefix("BOOKSTORE")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_override_option("upstream.base_url", env::var("UPSTREAM_URL").ok())?
            .set_override_option("auth.jwt_secret", env::var("JWT_SECRET").ok())?
            .build()?;

        let config: Self = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the services cannot work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.borrowing.default_period_days <= 0 {
            return Err(ConfigError::Message(format!(
                "borrowing.default_period_days must be positive, got {}",
                self.borrowing.default_period_days
            )));
        }
        Ok(())
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000/api".to_string(),
            timeout_secs: 15,
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "change-this-secret-in-production".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl Default for BorrowingConfig {
    fn default() -> Self {
        Self {
            default_period_days: 14,
        }
    }
}

impl Default for FinesConfig {
    fn default() -> Self {
        Self {
            daily_rate: Decimal::ONE,
            maximum_fine: None,
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self { debounce_ms: 500 }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            upstream: UpstreamConfig::default(),
            auth: AuthConfig::default(),
            logging: LoggingConfig::default(),
            borrowing: BorrowingConfig::default(),
            fines: FinesConfig::default(),
            search: SearchConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::FileFormat;

    #[test]
    fn test_default_file_parses() {
        let config: AppConfig = Config::builder()
            .add_source(File::from_str(
                include_str!("../config/default.toml"),
                FileFormat::Toml,
            ))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();
        assert_eq!(config.search.debounce_ms, 500);
        assert_eq!(config.borrowing.default_period_days, 14);
        assert_eq!(config.fines.policy().daily_rate, Decimal::new(50, 2));
        assert_eq!(config.fines.maximum_fine, Some(Decimal::from(20)));
    }

    #[test]
    fn test_non_positive_period_is_rejected() {
        let mut config = AppConfig::default();
        assert!(config.validate().is_ok());

        config.borrowing.default_period_days = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Message(_))));
    }
}
