//! Configuration loading from disk and the process environment.

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use thiserror::Error;

use crate::config::schema::{EngineConfig, RateLimitBackend};
use crate::config::validation::{
    clamp_config, validate_config, ValidationError, MAX_PATHS_RANGE, MIN_KEY_LEN_RANGE, RPM_RANGE,
};

/// Environment variable naming an optional TOML config file.
pub const CONFIG_PATH_ENV: &str = "ENGINE_CONFIG";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<EngineConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let config: EngineConfig = toml::from_str(&content)?;
    finalize(config)
}

/// Build the runtime configuration: defaults, then the optional file named by
/// `ENGINE_CONFIG`, then environment overrides.
pub fn load_from_env() -> Result<EngineConfig, ConfigError> {
    let base = match std::env::var(CONFIG_PATH_ENV) {
        Ok(path) if !path.trim().is_empty() => {
            let content = fs::read_to_string(path.trim())?;
            toml::from_str(&content)?
        }
        _ => EngineConfig::default(),
    };
    let config = apply_env_overrides(base, |name| std::env::var(name).ok());
    finalize(config)
}

fn finalize(config: EngineConfig) -> Result<EngineConfig, ConfigError> {
    let config = clamp_config(config);
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Overlay environment-style settings onto `config`.
///
/// Unparsable values are logged and ignored so a typo never takes the
/// service down. Integers outside their range, negative ones included, are
/// clamped.
pub fn apply_env_overrides<F>(mut config: EngineConfig, lookup: F) -> EngineConfig
where
    F: Fn(&str) -> Option<String>,
{
    let get = |name: &str| {
        lookup(name)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    if let Some(v) = get("ENGINE_BIND_ADDRESS") {
        config.listener.bind_address = v;
    }
    if let Some(v) = get("MODEL_PATH") {
        config.model.path = PathBuf::from(v);
    }
    if let Some(v) = parse_env::<f32>("YOLO_CONF", get("YOLO_CONF")) {
        config.model.confidence = v;
    }
    if let Some(v) = get("ENGINE_ALLOW_HEURISTIC_FALLBACK") {
        match parse_bool(&v) {
            Some(b) => config.model.allow_heuristic_fallback = b,
            None => tracing::warn!(
                variable = "ENGINE_ALLOW_HEURISTIC_FALLBACK",
                value = %v,
                "Ignoring invalid boolean"
            ),
        }
    }
    if let Some(v) = parse_env::<i64>("ENGINE_MAX_PATHS", get("ENGINE_MAX_PATHS")) {
        config.analyze.max_paths =
            v.clamp(MAX_PATHS_RANGE.0 as i64, MAX_PATHS_RANGE.1 as i64) as usize;
    }
    if let Some(v) = get("ENGINE_ALLOWED_ROOTS") {
        let roots: Vec<PathBuf> = std::env::split_paths(&v)
            .filter(|p| !p.as_os_str().is_empty())
            .collect();
        if !roots.is_empty() {
            config.analyze.allowed_roots = roots;
        }
    }
    // An explicitly empty key must stay empty, so read it without the filter.
    if let Some(v) = lookup("ENGINE_API_KEY") {
        config.auth.api_key = v.trim().to_string();
    }
    if let Some(v) = parse_env::<i64>("ENGINE_MIN_KEY_LEN", get("ENGINE_MIN_KEY_LEN")) {
        config.auth.min_key_len =
            v.clamp(MIN_KEY_LEN_RANGE.0 as i64, MIN_KEY_LEN_RANGE.1 as i64) as usize;
    }
    if let Some(v) = parse_env::<i64>("ENGINE_RATE_LIMIT_RPM", get("ENGINE_RATE_LIMIT_RPM")) {
        config.rate_limit.requests_per_minute =
            v.clamp(i64::from(RPM_RANGE.0), i64::from(RPM_RANGE.1)) as u32;
    }
    if let Some(v) = parse_env::<RateLimitBackend>(
        "ENGINE_RATE_LIMIT_BACKEND",
        get("ENGINE_RATE_LIMIT_BACKEND"),
    ) {
        config.rate_limit.backend = v;
    }
    if let Some(v) = get("ENGINE_REDIS_URL") {
        config.rate_limit.redis_url = v;
    }
    if let Some(v) = get("ENGINE_RATE_LIMIT_REDIS_PREFIX") {
        config.rate_limit.redis_prefix = v;
    }
    if let Some(v) = get("ENGINE_METRICS_ADDRESS") {
        config.observability.metrics_enabled = true;
        config.observability.metrics_address = v;
    }

    config
}

fn parse_env<T: FromStr>(name: &str, raw: Option<String>) -> Option<T> {
    let raw = raw?;
    match raw.parse::<T>() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!(variable = name, value = %raw, "Ignoring unparsable value");
            None
        }
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
