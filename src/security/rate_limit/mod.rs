//! Per-identity admission control.
//!
//! # Backends
//! - `local`: sliding window held in process memory
//! - `redis`: fixed window counter shared by every engine replica, falling
//!   back to the local window whenever the store cannot be reached
//!
//! A limit of zero requests per minute disables admission control.

pub mod local;
pub mod shared;

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{RateLimitBackend, RateLimitConfig};

pub use local::LocalWindowLimiter;
pub use shared::SharedWindowLimiter;

/// Admission window.
pub const WINDOW: Duration = Duration::from_secs(60);

/// Minimum spacing of full sweeps over the local bucket map.
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(120);

/// Header a trusted gateway uses to name the caller being limited.
pub const RATE_LIMIT_KEY_HEADER: &str = "x-ratelimit-key";

/// Longest identity key taken from the header.
pub const MAX_IDENTITY_CHARS: usize = 128;

/// Admission control with a statically chosen backend.
pub enum RateLimiter {
    Disabled,
    Local(Arc<LocalWindowLimiter>),
    Shared(SharedWindowLimiter),
}

impl RateLimiter {
    pub fn from_config(config: &RateLimitConfig) -> Self {
        let rpm = config.requests_per_minute;
        if rpm == 0 {
            return RateLimiter::Disabled;
        }
        let local = Arc::new(LocalWindowLimiter::new(rpm));
        match config.backend {
            RateLimitBackend::Local => RateLimiter::Local(local),
            RateLimitBackend::Redis => RateLimiter::Shared(SharedWindowLimiter::new(
                rpm,
                config.redis_url.clone(),
                config.redis_prefix.clone(),
                local,
            )),
        }
    }

    /// Allow and record a request for `identity`, or reject it unrecorded.
    pub async fn admit(&self, identity: &str) -> bool {
        match self {
            RateLimiter::Disabled => true,
            RateLimiter::Local(limiter) => limiter.admit(identity),
            RateLimiter::Shared(limiter) => limiter.admit(identity).await,
        }
    }
}

/// Derive the bucket key for a caller: the gateway-supplied header when
/// present, then the peer address, then a fixed sentinel.
pub fn identity_key(header: Option<&str>, peer: Option<IpAddr>) -> String {
    if let Some(value) = header.map(str::trim).filter(|v| !v.is_empty()) {
        return value.chars().take(MAX_IDENTITY_CHARS).collect();
    }
    match peer {
        Some(ip) => ip.to_string(),
        None => "unknown".to_string(),
    }
}
