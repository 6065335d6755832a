//! Configuration validation.
//!
//! Clamping brings numeric knobs into their documented ranges; validation
//! reports every semantic problem at once rather than stopping at the first.

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::{EngineConfig, RateLimitBackend};

pub const CONFIDENCE_RANGE: (f32, f32) = (0.0, 1.0);
pub const MAX_PATHS_RANGE: (usize, usize) = (1, 200);
pub const MIN_KEY_LEN_RANGE: (usize, usize) = (8, 256);
pub const RPM_RANGE: (u32, u32) = (0, 10_000);

/// A single semantic configuration problem.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid bind address: {0}")]
    BindAddress(String),
    #[error("invalid metrics address: {0}")]
    MetricsAddress(String),
    #[error("no allowed roots configured")]
    NoAllowedRoots,
    #[error("redis rate limit backend requires a redis url")]
    MissingRedisUrl,
}

/// Force numeric settings into their accepted ranges.
pub fn clamp_config(mut config: EngineConfig) -> EngineConfig {
    let confidence = if config.model.confidence.is_nan() {
        0.25
    } else {
        config.model.confidence
    };
    config.model.confidence = confidence.clamp(CONFIDENCE_RANGE.0, CONFIDENCE_RANGE.1);
    config.analyze.max_paths = config
        .analyze
        .max_paths
        .clamp(MAX_PATHS_RANGE.0, MAX_PATHS_RANGE.1);
    config.auth.min_key_len = config
        .auth
        .min_key_len
        .clamp(MIN_KEY_LEN_RANGE.0, MIN_KEY_LEN_RANGE.1);
    config.rate_limit.requests_per_minute = config
        .rate_limit
        .requests_per_minute
        .clamp(RPM_RANGE.0, RPM_RANGE.1);
    config
}

/// Check the semantic constraints serde cannot express.
pub fn validate_config(config: &EngineConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(
            config.listener.bind_address.clone(),
        ));
    }

    if config.observability.metrics_enabled
        && config
            .observability
            .metrics_address
            .parse::<SocketAddr>()
            .is_err()
    {
        errors.push(ValidationError::MetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if config.analyze.allowed_roots.is_empty() {
        errors.push(ValidationError::NoAllowedRoots);
    }

    if config.rate_limit.backend == RateLimitBackend::Redis
        && config.rate_limit.redis_url.trim().is_empty()
    {
        errors.push(ValidationError::MissingRedisUrl);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
