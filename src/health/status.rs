//! Derived service health.

use std::path::Path;

use serde::Serialize;

use crate::config::RateLimitBackend;
use crate::inference::{InferenceBackend, InferenceMode};

pub const SERVICE_NAME: &str = "engine";

/// Health check payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthStatus {
    pub ok: bool,
    pub service: &'static str,
    pub model_loaded: bool,
    pub model_path: String,
    pub inference_mode: &'static str,
    pub auth_enabled: bool,
    pub auth_strong: bool,
    pub rate_limit_rpm: u32,
    pub rate_limit_backend: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl HealthStatus {
    pub fn derive(
        backend: &InferenceBackend,
        model_path: &Path,
        auth_enabled: bool,
        auth_strong: bool,
        rate_limit_rpm: u32,
        rate_limit_backend: RateLimitBackend,
    ) -> Self {
        let mode = backend.mode();

        let error = if mode.is_none() {
            Some(backend.model_error().unwrap_or("model unavailable").to_string())
        } else if !auth_enabled {
            Some("engine auth is not configured".to_string())
        } else if !auth_strong {
            Some("engine auth key is too weak".to_string())
        } else {
            None
        };

        let warning = match (mode, backend.model_error()) {
            (Some(InferenceMode::HeuristicFallback), Some(reason)) => Some(format!(
                "running heuristic fallback, model unavailable: {reason}"
            )),
            _ => None,
        };

        Self {
            ok: error.is_none(),
            service: SERVICE_NAME,
            model_loaded: backend.model_loaded(),
            model_path: model_path.display().to_string(),
            inference_mode: mode.map(InferenceMode::as_str).unwrap_or("unavailable"),
            auth_enabled,
            auth_strong,
            rate_limit_rpm,
            rate_limit_backend: rate_limit_backend.as_str(),
            warning,
            error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn derive(backend: &InferenceBackend, enabled: bool, strong: bool) -> HealthStatus {
        HealthStatus::derive(
            backend,
            Path::new("/models/model.json"),
            enabled,
            strong,
            60,
            RateLimitBackend::Local,
        )
    }

    #[test]
    fn fallback_mode_is_healthy_with_warning() {
        let backend = InferenceBackend::without_model("Model file not found: /m".into(), true);
        let status = derive(&backend, true, true);

        assert!(status.ok);
        assert!(!status.model_loaded);
        assert_eq!(status.inference_mode, "heuristic_fallback");
        assert!(status.warning.unwrap().contains("Model file not found"));
        assert!(status.error.is_none());
    }

    #[test]
    fn unavailable_mode_reports_model_error() {
        let backend = InferenceBackend::without_model("Failed to load model: bad".into(), false);
        let status = derive(&backend, true, true);

        assert!(!status.ok);
        assert_eq!(status.inference_mode, "unavailable");
        assert_eq!(status.error.as_deref(), Some("Failed to load model: bad"));
    }

    #[test]
    fn weak_auth_is_reported() {
        let backend = InferenceBackend::without_model("x".into(), true);
        let status = derive(&backend, true, false);

        assert!(!status.ok);
        assert!(!status.auth_strong);
        assert_eq!(status.error.as_deref(), Some("engine auth key is too weak"));
    }

    #[test]
    fn serializes_expected_fields() {
        let backend = InferenceBackend::without_model("x".into(), true);
        let value = serde_json::to_value(derive(&backend, false, false)).unwrap();
        for field in [
            "ok",
            "service",
            "model_loaded",
            "inference_mode",
            "auth_enabled",
            "auth_strong",
            "rate_limit_rpm",
            "rate_limit_backend",
        ] {
            assert!(value.get(field).is_some(), "missing {field}");
        }
        assert_eq!(value["service"], "engine");
        assert_eq!(value["rate_limit_backend"], "local");
    }
}
