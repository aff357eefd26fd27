//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (pool size, timeouts, delays > 0)
//! - Check addresses and URLs are usable
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServiceConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::{BackendKind, ServiceConfig};

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("redis.url '{0}' must start with redis://, rediss:// or unix://")]
    RedisUrl(String),

    #[error("{field} must be greater than zero")]
    NotPositive { field: &'static str },

    #[error("pubsub.channel '{0}' must not contain whitespace")]
    InvalidChannel(String),

    #[error("{field} '{value}' is not a valid socket address")]
    Address { field: &'static str, value: String },

    #[error("definition key must not be empty")]
    EmptyKey,
}

/// Validate a parsed configuration.
pub fn validate_config(config: &ServiceConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.backend == BackendKind::Redis {
        let url = &config.redis.url;
        if !["redis://", "rediss://", "unix://"].iter().any(|s| url.starts_with(s)) {
            errors.push(ValidationError::RedisUrl(url.clone()));
        }
        if config.redis.pool_size == 0 {
            errors.push(ValidationError::NotPositive { field: "redis.pool_size" });
        }
        if config.redis.timeout_ms == 0 {
            errors.push(ValidationError::NotPositive { field: "redis.timeout_ms" });
        }
    }

    if config.cache.retry_interval_ms == 0 {
        errors.push(ValidationError::NotPositive { field: "cache.retry_interval_ms" });
    }

    if let Some(channel) = config.pubsub.channel_name() {
        if channel.chars().any(char::is_whitespace) {
            errors.push(ValidationError::InvalidChannel(channel.to_string()));
        }
    }
    if config.pubsub.reconnect_delay_ms == 0 {
        errors.push(ValidationError::NotPositive { field: "pubsub.reconnect_delay_ms" });
    }
    if config.pubsub.error_delay_ms == 0 {
        errors.push(ValidationError::NotPositive { field: "pubsub.error_delay_ms" });
    }

    if config.admin.enabled {
        check_address(&mut errors, "admin.bind_address", &config.admin.bind_address);
        if config.admin.request_timeout_secs == 0 {
            errors.push(ValidationError::NotPositive { field: "admin.request_timeout_secs" });
        }
    }

    if config.observability.metrics_enabled {
        check_address(
            &mut errors,
            "observability.metrics_address",
            &config.observability.metrics_address,
        );
    }

    if config.definitions.keys().any(|k| k.trim().is_empty()) {
        errors.push(ValidationError::EmptyKey);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_address(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::Address {
            field,
            value: value.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&ServiceConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = ServiceConfig::default();
        config.redis.url = "http://localhost".into();
        config.redis.pool_size = 0;
        config.pubsub.channel = Some("  ".into());
        config.admin.bind_address = "not-an-address".into();

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 4);
        assert!(errors.contains(&ValidationError::InvalidChannel("  ".into())));
        assert!(errors.contains(&ValidationError::NotPositive { field: "redis.pool_size" }));
    }

    #[test]
    fn test_memory_backend_skips_redis_checks() {
        let mut config = ServiceConfig::default();
        config.backend = BackendKind::Memory;
        config.redis.url = String::new();
        config.redis.pool_size = 0;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_unset_channel_is_valid() {
        let mut config = ServiceConfig::default();
        config.pubsub.channel = None;
        assert!(validate_config(&config).is_ok());
    }
}
