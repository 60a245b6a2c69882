//! Application-wide configuration.
//!
//! This module centralizes all configuration values loaded from files and
//! environment variables. The resulting `Config` struct is passed down to
//! the dispatch and server constructors explicitly; nothing reads ambient
//! global state after startup.

use figment::{
    providers::{Env, Format, Toml, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use crate::error::{GatewayError, Result};

/// Serde helper for Duration serialization/deserialization as milliseconds
mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let ms = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(ms))
    }
}

// Default value functions for serde defaults
fn default_server_host() -> String {
    "0.0.0.0".to_string()
}
fn default_server_port() -> u16 {
    8000
}
fn default_backend_instances() -> Vec<String> {
    vec!["http://localhost:8081".to_string()]
}
fn default_retry_max_attempts() -> usize {
    3
}
fn default_retry_timeout() -> Duration {
    Duration::from_millis(500)
}
fn default_connect_timeout() -> Duration {
    Duration::from_millis(250)
}
fn default_auth_provider() -> String {
    "static".to_string()
}

/// Gateway configuration loaded from multiple sources
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// HTTP server host
    #[serde(default = "default_server_host")]
    pub server_host: String,

    /// HTTP server port
    #[serde(default = "default_server_port")]
    pub server_port: u16,

    /// Addresses of the profile-service backend instances
    #[serde(default = "default_backend_instances")]
    pub backend_instances: Vec<String>,

    /// Per-request retries against different instances
    #[serde(default = "default_retry_max_attempts")]
    pub retry_max_attempts: usize,

    /// Per-request timeout, including retries
    #[serde(with = "duration_ms", default = "default_retry_timeout")]
    pub retry_timeout: Duration,

    /// Timeout for establishing one backend channel
    #[serde(with = "duration_ms", default = "default_connect_timeout")]
    pub connect_timeout: Duration,

    /// Credential verification mechanism, `"static"` selects the built-in
    /// token-table verifier
    #[serde(default = "default_auth_provider")]
    pub auth_provider: String,

    /// Bearer token -> subject table for the static verifier
    #[serde(default)]
    pub auth_tokens: HashMap<String, String>,
}

impl Config {
    /// Load configuration from multiple sources with precedence:
    /// 1. Environment variables (highest priority)
    /// 2. config.yaml (if exists)
    /// 3. config.toml (if exists)
    /// 4. Built-in defaults (lowest priority)
    pub fn load() -> Result<Self> {
        let config: Config = Figment::new()
            .merge(Self::default_figment())
            .merge(Toml::file("config.toml"))
            .merge(Yaml::file("config.yaml"))
            .merge(Env::prefixed("GATEWAY_"))
            .extract()
            .map_err(|e| GatewayError::Config(format!("Failed to load configuration: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Generate default configuration values
    fn default_figment() -> Figment {
        use figment::providers::Serialized;

        Figment::from(Serialized::defaults(Config {
            server_host: default_server_host(),
            server_port: default_server_port(),
            backend_instances: default_backend_instances(),
            retry_max_attempts: default_retry_max_attempts(),
            retry_timeout: default_retry_timeout(),
            connect_timeout: default_connect_timeout(),
            auth_provider: default_auth_provider(),
            auth_tokens: HashMap::new(),
        }))
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.server_host.is_empty() {
            return Err(GatewayError::Config(
                "server_host cannot be empty".to_string(),
            ));
        }

        if self.server_port == 0 {
            return Err(GatewayError::Config(
                "server_port must be nonzero".to_string(),
            ));
        }

        if self.backend_instances.iter().any(|i| i.is_empty()) {
            return Err(GatewayError::Config(
                "backend_instances entries cannot be empty".to_string(),
            ));
        }

        if self.retry_max_attempts == 0 {
            return Err(GatewayError::Config(
                "retry_max_attempts must be at least 1".to_string(),
            ));
        }

        if self.retry_timeout.is_zero() || self.retry_timeout > Duration::from_secs(300) {
            return Err(GatewayError::Config(
                "retry_timeout must be between 1ms and 300s".to_string(),
            ));
        }

        if self.connect_timeout.is_zero() {
            return Err(GatewayError::Config(
                "connect_timeout must be nonzero".to_string(),
            ));
        }

        Ok(())
    }

    /// Export configuration to TOML format
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| GatewayError::Config(format!("Failed to serialize to TOML: {}", e)))
    }

    /// Export configuration to YAML format
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self)
            .map_err(|e| GatewayError::Config(format!("Failed to serialize to YAML: {}", e)))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_host: default_server_host(),
            server_port: default_server_port(),
            backend_instances: default_backend_instances(),
            retry_max_attempts: default_retry_max_attempts(),
            retry_timeout: default_retry_timeout(),
            connect_timeout: default_connect_timeout(),
            auth_provider: default_auth_provider(),
            auth_tokens: HashMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.retry_max_attempts, 3);
        assert_eq!(config.retry_timeout, Duration::from_millis(500));
    }

    #[test]
    fn rejects_zero_attempts() {
        let config = Config {
            retry_max_attempts: 0,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_empty_instance_entry() {
        let config = Config {
            backend_instances: vec!["http://a:1".into(), String::new()],
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn duration_round_trips_as_millis() {
        let config = Config {
            retry_timeout: Duration::from_millis(750),
            ..Config::default()
        };
        let toml = config.to_toml().unwrap();
        assert!(toml.contains("retry_timeout = 750"));
    }
}
