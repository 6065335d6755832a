//! Shared-secret authentication.
//!
//! A configured secret is only enforceable when it is strong; a weak or
//! missing secret turns every analyze call into a configuration error rather
//! than a plain `401`.

use crate::config::AuthConfig;
use crate::http::response::ApiError;

/// Header carrying the caller's credential.
pub const ENGINE_KEY_HEADER: &str = "x-engine-key";

/// Secrets that are never accepted regardless of length.
const WEAK_SECRETS: &[&str] = &["", "change-me", "changeme", "default", "password", "123456"];

/// Judges whether a secret is strong enough to serve as authentication.
#[derive(Debug, Clone, Copy)]
pub struct KeyStrengthValidator {
    min_len: usize,
}

impl KeyStrengthValidator {
    pub fn new(min_len: usize) -> Self {
        Self { min_len }
    }

    pub fn is_strong(&self, key: &str) -> bool {
        if key.chars().count() < self.min_len {
            return false;
        }
        let lowered = key.to_lowercase();
        !WEAK_SECRETS.contains(&lowered.as_str())
    }
}

/// Authentication state derived once at startup.
#[derive(Debug, Clone)]
pub struct AuthPolicy {
    secret: String,
    strong: bool,
}

impl AuthPolicy {
    pub fn from_config(config: &AuthConfig) -> Self {
        let secret = config.api_key.trim().to_string();
        let strong = KeyStrengthValidator::new(config.min_key_len).is_strong(&secret);
        Self { secret, strong }
    }

    /// True when a non-empty secret is configured.
    pub fn is_configured(&self) -> bool {
        !self.secret.is_empty()
    }

    pub fn is_strong(&self) -> bool {
        self.is_configured() && self.strong
    }

    /// Check a presented credential against the configured secret.
    pub fn authorize(&self, credential: Option<&str>) -> Result<(), ApiError> {
        if !self.is_configured() {
            return Err(ApiError::AuthNotConfigured);
        }
        if !self.strong {
            return Err(ApiError::AuthWeak);
        }
        match credential {
            Some(presented) if constant_time_eq(presented.as_bytes(), self.secret.as_bytes()) => {
                Ok(())
            }
            _ => Err(ApiError::Unauthorized),
        }
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
