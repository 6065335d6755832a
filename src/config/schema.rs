//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the engine.
//! All types derive Serde traits for deserialization from config files.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Name of the shared volume the upstream gateway writes uploads into.
pub const SHARED_VOLUME_DIR: &str = "/shared-tmp";

/// Subdirectory of the process temp dir accepted as an upload location.
pub const TEMP_SUBDIR: &str = "buildcheck";

/// Root configuration for the analysis engine.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct EngineConfig {
    /// Listener configuration (bind address, request limits).
    pub listener: ListenerConfig,

    /// Detection model settings.
    pub model: ModelConfig,

    /// Batch analysis limits and path scope.
    pub analyze: AnalyzeConfig,

    /// Shared-secret authentication.
    pub auth: AuthConfig,

    /// Rate limiting configuration.
    pub rate_limit: RateLimitConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8000").
    pub bind_address: String,

    /// Request timeout in seconds.
    pub request_timeout_secs: u64,

    /// Maximum accepted request body in bytes.
    pub max_body_bytes: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8000".to_string(),
            request_timeout_secs: 120,
            max_body_bytes: 256 * 1024,
        }
    }
}

/// Detection model configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Path to the model manifest.
    pub path: PathBuf,

    /// Minimum detection confidence, within [0, 1].
    pub confidence: f32,

    /// Serve heuristic labels when no model could be loaded.
    pub allow_heuristic_fallback: bool,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("models/mbdd2025/model.json"),
            confidence: 0.25,
            allow_heuristic_fallback: true,
        }
    }
}

/// Batch analysis configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AnalyzeConfig {
    /// Maximum number of paths accepted in one request.
    pub max_paths: usize,

    /// Directories whose (canonical) descendants may be analyzed.
    pub allowed_roots: Vec<PathBuf>,
}

impl Default for AnalyzeConfig {
    fn default() -> Self {
        Self {
            max_paths: 20,
            allowed_roots: default_allowed_roots(),
        }
    }
}

/// The shared volume plus a process-local temp subdirectory.
pub fn default_allowed_roots() -> Vec<PathBuf> {
    vec![
        PathBuf::from(SHARED_VOLUME_DIR),
        std::env::temp_dir().join(TEMP_SUBDIR),
    ]
}

/// Shared-secret authentication configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Secret expected in the `X-Engine-Key` header. Empty means unconfigured.
    pub api_key: String,

    /// Minimum accepted secret length.
    pub min_key_len: usize,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            min_key_len: 24,
        }
    }
}

/// Which store keeps rate-limit counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RateLimitBackend {
    /// In-process sliding window.
    #[default]
    Local,
    /// Fixed window in a shared Redis instance.
    #[serde(alias = "shared")]
    Redis,
}

impl RateLimitBackend {
    pub fn as_str(self) -> &'static str {
        match self {
            RateLimitBackend::Local => "local",
            RateLimitBackend::Redis => "redis",
        }
    }
}

impl std::str::FromStr for RateLimitBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" | "memory" => Ok(RateLimitBackend::Local),
            "redis" | "shared" => Ok(RateLimitBackend::Redis),
            other => Err(format!("unknown rate limit backend: {other}")),
        }
    }
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Requests per minute per identity key. 0 disables limiting.
    pub requests_per_minute: u32,

    /// Counter store.
    pub backend: RateLimitBackend,

    /// Connection string for the Redis backend.
    pub redis_url: String,

    /// Namespace prepended to every Redis counter key.
    pub redis_prefix: String,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_minute: 60,
            backend: RateLimitBackend::Local,
            redis_url: "redis://127.0.0.1:6379/0".to_string(),
            redis_prefix: "engine:rl".to_string(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
