//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (delays > 0, status codes in range, ports valid)
//! - Check the storage URL is usable as an allowlist entry
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: EdgeConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;
use url::Url;

use crate::config::schema::EdgeConfig;

/// A single semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {reason}")]
pub struct ValidationError {
    pub field: &'static str,
    pub reason: String,
}

impl ValidationError {
    fn new(field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }
}

/// Validate a parsed configuration.
pub fn validate_config(config: &EdgeConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be greater than 0"));
    }
    if config.timeouts.upstream_secs == 0 {
        errors.push(ValidationError::new("timeouts.upstream_secs", "must be greater than 0"));
    }

    if config.retries.retry_delay_ms == 0 {
        errors.push(ValidationError::new("retries.retry_delay_ms", "must be greater than 0"));
    }
    // 2^max_retries must stay representable in the backoff arithmetic.
    if config.retries.max_retries > 16 {
        errors.push(ValidationError::new("retries.max_retries", "must be at most 16"));
    }
    for code in &config.retries.retryable_status_codes {
        if !(100..=599).contains(code) {
            errors.push(ValidationError::new(
                "retries.retryable_status_codes",
                format!("{} is not an HTTP status code", code),
            ));
        }
    }

    if let Some(storage_url) = &config.image_proxy.storage_url {
        match Url::parse(storage_url) {
            Ok(url) if url.scheme() != "https" => errors.push(ValidationError::new(
                "image_proxy.storage_url",
                "must use https",
            )),
            Ok(url) if url.host_str().is_none() => errors.push(ValidationError::new(
                "image_proxy.storage_url",
                "must include a host",
            )),
            Ok(_) => {}
            Err(e) => errors.push(ValidationError::new(
                "image_proxy.storage_url",
                format!("invalid URL: {}", e),
            )),
        }
    }
    if config.image_proxy.max_body_bytes == 0 {
        errors.push(ValidationError::new("image_proxy.max_body_bytes", "must be greater than 0"));
    }
    if config.image_proxy.user_agent.trim().is_empty() {
        errors.push(ValidationError::new("image_proxy.user_agent", "must not be empty"));
    }

    if config.rate_limit.enabled {
        if config.rate_limit.requests_per_second == 0 {
            errors.push(ValidationError::new(
                "rate_limit.requests_per_second",
                "must be greater than 0 when rate limiting is enabled",
            ));
        }
        if config.rate_limit.burst_size == 0 {
            errors.push(ValidationError::new(
                "rate_limit.burst_size",
                "must be greater than 0 when rate limiting is enabled",
            ));
        }
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("'{}' is not a socket address", config.observability.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
