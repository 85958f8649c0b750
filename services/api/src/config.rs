//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use chrono::Duration;
use evaluation_core::domain::{
    SessionPolicy, DEFAULT_MAX_TAB_SWITCHES, DEFAULT_TIME_LIMIT_MINUTES,
};
use std::net::SocketAddr;
use std::str::FromStr;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    /// When absent, sessions are kept in process memory.
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub log_level: Level,
    pub cors_origin: String,
    pub session_time_limit_minutes: i64,
    pub max_tab_switches: i32,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // --- Server and Database Settings ---
        let bind_address: SocketAddr = parse_or(&lookup, "BIND_ADDRESS", "0.0.0.0:3000")?;
        let database_url = lookup("DATABASE_URL").filter(|url| !url.trim().is_empty());
        let db_max_connections: u32 = parse_or(&lookup, "DB_MAX_CONNECTIONS", "5")?;

        let log_level_str = lookup("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let cors_origin =
            lookup("CORS_ORIGIN").unwrap_or_else(|| "http://localhost:3000".to_string());

        // --- Anti-cheating Policy ---
        let session_time_limit_minutes: i64 = parse_or(
            &lookup,
            "SESSION_TIME_LIMIT_MINUTES",
            &DEFAULT_TIME_LIMIT_MINUTES.to_string(),
        )?;
        if session_time_limit_minutes <= 0 {
            return Err(ConfigError::InvalidValue(
                "SESSION_TIME_LIMIT_MINUTES".to_string(),
                "must be a positive number of minutes".to_string(),
            ));
        }

        let max_tab_switches: i32 = parse_or(
            &lookup,
            "MAX_TAB_SWITCHES",
            &DEFAULT_MAX_TAB_SWITCHES.to_string(),
        )?;
        if max_tab_switches < 1 {
            return Err(ConfigError::InvalidValue(
                "MAX_TAB_SWITCHES".to_string(),
                "must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            bind_address,
            database_url,
            db_max_connections,
            log_level,
            cors_origin,
            session_time_limit_minutes,
            max_tab_switches,
        })
    }

    pub fn session_policy(&self) -> SessionPolicy {
        SessionPolicy {
            time_limit: Duration::minutes(self.session_time_limit_minutes),
            max_tab_switches: self.max_tab_switches,
        }
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: &str) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = lookup(key).unwrap_or_else(|| default.to_string());
    raw.parse::<T>()
        .map_err(|e| ConfigError::InvalidValue(key.to_string(), e.to_string()))
}
