//! Configuration types for the HTTP service (spec.md §6 "Configuration").

use crate::errors::ConfigError;
use outpost_core::{AlertConfig, IdGenConfig, IdGenKind, LogWriterConfig, RetryConfig};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub server: ServerConfig,
    pub retry: RetryConfig,
    pub alert: AlertConfig,
    pub log: LogWriterConfig,
    pub id_gen: IdGenConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            retry: RetryConfig::default(),
            alert: AlertConfig::default(),
            log: LogWriterConfig::default(),
            id_gen: IdGenConfig::default(),
        }
    }
}

impl ServiceConfig {
    /// Load from environment, falling back to defaults for anything unset
    /// (spec.md §6's env var table). Mirrors the teacher's explicit,
    /// validated config struct rather than reflection-driven loading
    /// (spec.md §9).
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(value) = std::env::var("ALERT_AUTO_DISABLE_DESTINATION") {
            config.alert.auto_disable_destination = parse_bool(&value)?;
        }
        if let Ok(value) = std::env::var("ALERT_CALLBACK_URL") {
            config.alert.callback_url = Some(value);
        }
        if let Ok(value) = std::env::var("ALERT_CONSECUTIVE_FAILURE_COUNT") {
            config.alert.consecutive_failure_count = parse_u32("ALERT_CONSECUTIVE_FAILURE_COUNT", &value)?;
        }
        if let Ok(value) = std::env::var("RETRY_INTERVAL_SECONDS") {
            config.retry.retry_interval_seconds = parse_u64("RETRY_INTERVAL_SECONDS", &value)?;
        }
        if let Ok(value) = std::env::var("RETRY_POLL_BACKOFF_MS") {
            config.retry.retry_poll_backoff_ms = parse_u64("RETRY_POLL_BACKOFF_MS", &value)?;
        }
        if let Ok(value) = std::env::var("RETRY_MAX_LIMIT") {
            config.retry.retry_max_limit = parse_u32("RETRY_MAX_LIMIT", &value)?;
        }
        if let Ok(value) = std::env::var("RETRY_VISIBILITY_TIMEOUT_SECONDS") {
            config.retry.retry_visibility_timeout_seconds =
                parse_u64("RETRY_VISIBILITY_TIMEOUT_SECONDS", &value)?;
        }
        if let Ok(value) = std::env::var("LOG_BATCH_SIZE") {
            config.log.batch_size = parse_u32("LOG_BATCH_SIZE", &value)? as usize;
        }
        if let Ok(value) = std::env::var("LOG_BATCH_THRESHOLD_SECONDS") {
            let seconds = parse_u64("LOG_BATCH_THRESHOLD_SECONDS", &value)?;
            config.log.batch_threshold = chrono::Duration::seconds(seconds as i64);
        }
        if let Ok(value) = std::env::var("ID_GEN_TYPE") {
            config.id_gen.kind = match value.as_str() {
                "uuidv4" => IdGenKind::Uuidv4,
                "uuidv7" => IdGenKind::Uuidv7,
                "nanoid" => IdGenKind::Nanoid,
                other => {
                    return Err(ConfigError::Invalid {
                        message: format!("ID_GEN_TYPE must be uuidv4, uuidv7, or nanoid, got '{other}'"),
                    })
                }
            };
        }
        if let Ok(value) = std::env::var("ID_GEN_EVENT_PREFIX") {
            config.id_gen.event_prefix = Some(value);
        }
        if let Ok(value) = std::env::var("ID_GEN_DESTINATION_PREFIX") {
            config.id_gen.destination_prefix = Some(value);
        }
        if let Ok(value) = std::env::var("PORT") {
            config.server.port = parse_u32("PORT", &value)? as u16;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.alert.auto_disable_destination && self.alert.consecutive_failure_count == 0 {
            return Err(ConfigError::Invalid {
                message: "alert.consecutive_failure_count must be > 0 when auto_disable_destination is set"
                    .to_string(),
            });
        }
        if self.retry.retry_max_limit == 0 {
            return Err(ConfigError::Invalid {
                message: "retry.retry_max_limit must be > 0".to_string(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub shutdown_timeout_seconds: u64,
    pub transport_timeout_seconds: u64,
    pub worker_pool_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            shutdown_timeout_seconds: 30,
            transport_timeout_seconds: 10,
            worker_pool_size: 4,
        }
    }
}

fn parse_bool(value: &str) -> Result<bool, ConfigError> {
    value.parse().map_err(|_| ConfigError::Invalid {
        message: format!("expected a boolean, got '{value}'"),
    })
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse().map_err(|_| ConfigError::Invalid {
        message: format!("{key} must be a non-negative integer, got '{value}'"),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse().map_err(|_| ConfigError::Invalid {
        message: format!("{key} must be a non-negative integer, got '{value}'"),
    })
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
