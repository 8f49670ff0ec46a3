//! # Server Configuration
//!
//! HTTP server settings loaded from environment variables.

use super::env::Env;
use crate::constants::{
    DEFAULT_BIND_ADDRESS, DEFAULT_PORT, DEFAULT_SHUTDOWN_GRACE_SECS, ENV_BIND_ADDRESS, ENV_PORT,
    ENV_SHUTDOWN_GRACE_SECS,
};
use std::time::Duration;

/// HTTP server configuration
///
/// All settings have defaults and can be overridden via environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Address the listener binds to
    pub bind_address: String,
    /// Listener port
    pub port: u16,
    /// How long in-flight requests may run after a termination signal (seconds)
    pub shutdown_grace_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: DEFAULT_BIND_ADDRESS.to_string(),
            port: DEFAULT_PORT,
            shutdown_grace_secs: DEFAULT_SHUTDOWN_GRACE_SECS,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults
    pub fn from_env(env: &Env) -> Self {
        Self {
            bind_address: env.string_or(ENV_BIND_ADDRESS, DEFAULT_BIND_ADDRESS),
            port: env.parse_or(ENV_PORT, DEFAULT_PORT),
            shutdown_grace_secs: env.parse_or(ENV_SHUTDOWN_GRACE_SECS, DEFAULT_SHUTDOWN_GRACE_SECS),
        }
    }

    /// `host:port` to bind
    pub fn listen_address(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_unset() {
        let config = ServerConfig::from_env(&Env::from_pairs(Vec::<(String, String)>::new()));
        assert_eq!(config, ServerConfig::default());
        assert_eq!(config.listen_address(), "0.0.0.0:8080");
        assert_eq!(config.shutdown_grace(), Duration::from_secs(3));
    }

    #[test]
    fn test_overrides() {
        let env = Env::from_pairs([
            ("BIND_ADDRESS", "127.0.0.1"),
            ("PORT", "9000"),
            ("SHUTDOWN_GRACE_SECS", "10"),
        ]);
        let config = ServerConfig::from_env(&env);
        assert_eq!(config.listen_address(), "127.0.0.1:9000");
        assert_eq!(config.shutdown_grace_secs, 10);
    }
}
