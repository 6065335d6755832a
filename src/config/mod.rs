//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! defaults
//!     → optional TOML file (ENGINE_CONFIG)
//!     → loader.rs (environment overrides, hardened parsing)
//!     → validation.rs (clamping + semantic checks)
//!     → EngineConfig (validated, immutable)
//!     → shared via Arc to all subsystems
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a restart
//! - All fields have defaults to allow minimal configs
//! - Out-of-range numbers are clamped, not rejected

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, load_from_env, ConfigError};
pub use schema::{
    AnalyzeConfig, AuthConfig, EngineConfig, ListenerConfig, ModelConfig, ObservabilityConfig,
    RateLimitBackend, RateLimitConfig,
};
