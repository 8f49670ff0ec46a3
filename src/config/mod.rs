//! # Service Configuration
//!
//! Configuration loaded from environment variables (optionally seeded from a
//! `.env` file at startup).
//!
//! Required variables are read through an [`EnvReport`], so a misconfigured
//! deployment fails once at startup with every missing or invalid key listed.

mod env;
mod server;

pub use env::{AppEnv, Env, EnvError, EnvReport};
pub use server::ServerConfig;

use crate::constants::{
    DEFAULT_APP_ENV, ENV_APP_ENV, ENV_DB_NAME, ENV_DB_PASSWORD, ENV_DB_URI, ENV_DB_USERNAME,
    ENV_LOG_LEVEL, LOCAL_DB_NAME, LOCAL_DB_URI,
};
use crate::observability::LogLevel;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid environment: {}", describe(.problems))]
    Env { problems: Vec<EnvError> },
}

fn describe(problems: &[EnvError]) -> String {
    problems
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Document store connection settings
#[derive(Clone, PartialEq, Eq)]
pub enum DatabaseConfig {
    /// Unauthenticated local instance, used by the `test` profile
    Local { uri: String, name: String },
    /// Authenticated instance; credentials are checked against `name`
    Remote {
        uri: String,
        username: String,
        password: String,
        name: String,
    },
}

impl DatabaseConfig {
    pub fn local() -> Self {
        DatabaseConfig::Local {
            uri: LOCAL_DB_URI.to_string(),
            name: LOCAL_DB_NAME.to_string(),
        }
    }

    pub fn uri(&self) -> &str {
        match self {
            DatabaseConfig::Local { uri, .. } | DatabaseConfig::Remote { uri, .. } => uri,
        }
    }

    /// Database name
    pub fn name(&self) -> &str {
        match self {
            DatabaseConfig::Local { name, .. } | DatabaseConfig::Remote { name, .. } => name,
        }
    }
}

impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatabaseConfig::Local { uri, name } => f
                .debug_struct("Local")
                .field("uri", uri)
                .field("name", name)
                .finish(),
            DatabaseConfig::Remote {
                uri,
                username,
                name,
                ..
            } => f
                .debug_struct("Remote")
                .field("uri", uri)
                .field("username", username)
                .field("password", &"<redacted>")
                .field("name", name)
                .finish(),
        }
    }
}

/// Everything the service reads from its environment
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub app_env: AppEnv,
    /// Raw `LOG_LEVEL`; validated when logging is initialised
    pub log_level: String,
    pub database: DatabaseConfig,
    pub server: ServerConfig,
}

impl AppConfig {
    /// Read the whole configuration
    ///
    /// # Errors
    ///
    /// [`ConfigError::Env`] listing every required variable that is missing or invalid.
    pub fn from_env(env: &Env) -> Result<Self, ConfigError> {
        let mut report = EnvReport::new();

        let app_env = env.app_env(ENV_APP_ENV, DEFAULT_APP_ENV);
        let log_level = env.string_or(ENV_LOG_LEVEL, "");
        report.validate(ENV_LOG_LEVEL, &log_level, LogLevel::parse);

        let database = if app_env.is_test() {
            DatabaseConfig::local()
        } else {
            DatabaseConfig::Remote {
                uri: report.string(env, ENV_DB_URI),
                username: report.string(env, ENV_DB_USERNAME),
                password: report.string(env, ENV_DB_PASSWORD),
                name: report.string(env, ENV_DB_NAME),
            }
        };

        if !report.is_empty() {
            return Err(ConfigError::Env {
                problems: report.into_problems(),
            });
        }

        Ok(Self {
            app_env,
            log_level,
            database,
            server: ServerConfig::from_env(env),
        })
    }
}
