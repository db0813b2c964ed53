//! Configuration management for rategate.

use serde::{Deserialize, Serialize};
use std::env;

use crate::error::{RategateError, Result};

/// Main configuration for the gateway.
///
/// Precedence, lowest to highest: built-in defaults, environment variables,
/// configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Counter store (Redis) configuration
    #[serde(default)]
    pub redis: RedisConfig,

    /// Rules document configuration
    #[serde(default)]
    pub rules: RulesConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to
    #[serde(default = "default_server_host")]
    pub host: String,

    /// Port to bind to
    #[serde(default = "default_server_port")]
    pub port: u16,
}

impl ServerConfig {
    /// The bind address as `host:port`.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_server_host(),
            port: default_server_port(),
        }
    }
}

fn default_server_host() -> String {
    "127.0.0.1".to_string()
}

fn default_server_port() -> u16 {
    8080
}

/// Counter store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    /// Redis host
    #[serde(default = "default_redis_host")]
    pub host: String,

    /// Redis port
    #[serde(default = "default_redis_port")]
    pub port: u16,

    /// Redis password, empty for none
    #[serde(default)]
    pub password: String,

    /// Redis logical database
    #[serde(default)]
    pub db: i64,
}

impl RedisConfig {
    /// The connection URL for the `redis` client.
    pub fn url(&self) -> String {
        if self.password.is_empty() {
            format!("redis://{}:{}/{}", self.host, self.port, self.db)
        } else {
            format!(
                "redis://:{}@{}:{}/{}",
                self.password, self.host, self.port, self.db
            )
        }
    }
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            host: default_redis_host(),
            port: default_redis_port(),
            password: String::new(),
            db: 0,
        }
    }
}

fn default_redis_host() -> String {
    "localhost".to_string()
}

fn default_redis_port() -> u16 {
    6379
}

/// Rules document configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RulesConfig {
    /// Path to the rules document
    #[serde(default = "default_rules_path")]
    pub path: String,

    /// Reload cadence in seconds
    #[serde(default = "default_reload_interval")]
    pub reload_interval_secs: u64,
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            path: default_rules_path(),
            reload_interval_secs: default_reload_interval(),
        }
    }
}

fn default_rules_path() -> String {
    "limiter_rules.yaml".to_string()
}

fn default_reload_interval() -> u64 {
    10
}

impl GatewayConfig {
    /// Load configuration from a YAML file.
    pub fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        serde_yaml::from_str(&contents)
            .map_err(|e| RategateError::Validation(format!("failed to parse config: {}", e)))
    }

    /// Overlay environment variables onto this configuration.
    pub fn apply_env(&mut self) {
        load_env_str("SERVER_HOST", &mut self.server.host);
        load_env_parse("SERVER_PORT", &mut self.server.port);
        load_env_str("REDIS_DB_HOST", &mut self.redis.host);
        load_env_parse("REDIS_DB_PORT", &mut self.redis.port);
        load_env_str("REDIS_DB_PASSWORD", &mut self.redis.password);
        load_env_parse("REDIS_DB", &mut self.redis.db);
    }
}

fn load_env_str(key: &str, result: &mut String) {
    if let Ok(value) = env::var(key) {
        *result = value;
    }
}

fn load_env_parse<T: std::str::FromStr>(key: &str, result: &mut T) {
    if let Ok(value) = env::var(key) {
        if let Ok(parsed) = value.parse() {
            *result = parsed;
        }
    }
}
