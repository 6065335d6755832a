//! End-to-end handling of one batch request.

use std::path::{Path, PathBuf};

use crate::config::{EngineConfig, RateLimitBackend};
use crate::dispatch::types::{AnalyzeItemResult, AnalyzeRequest, AnalyzeResponse, ItemError};
use crate::health::HealthStatus;
use crate::http::response::ApiError;
use crate::inference::{InferenceBackend, InferenceMode, PredictError};
use crate::observability::metrics;
use crate::security::{AllowedRootSet, AuthPolicy, RateLimiter};

/// Owns every piece of admission and inference state for the service.
///
/// Built once at startup and shared behind an `Arc`; the only interior
/// mutability lives inside the rate limiter.
pub struct RequestDispatcher {
    auth: AuthPolicy,
    limiter: RateLimiter,
    roots: AllowedRootSet,
    backend: InferenceBackend,
    confidence: f32,
    max_paths: usize,
    rate_limit_rpm: u32,
    rate_limit_backend: RateLimitBackend,
    model_path: PathBuf,
}

impl RequestDispatcher {
    /// Load the model named by `config` and assemble the dispatcher.
    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config, InferenceBackend::from_config(&config.model))
    }

    /// Assemble with an already chosen inference backend.
    pub fn new(config: &EngineConfig, backend: InferenceBackend) -> Self {
        let roots = AllowedRootSet::new(&config.analyze.allowed_roots);
        tracing::info!(
            roots = ?roots.roots(),
            max_paths = config.analyze.max_paths,
            mode = backend.mode().map(InferenceMode::as_str).unwrap_or("unavailable"),
            "Dispatcher ready"
        );
        Self {
            auth: AuthPolicy::from_config(&config.auth),
            limiter: RateLimiter::from_config(&config.rate_limit),
            roots,
            backend,
            confidence: config.model.confidence,
            max_paths: config.analyze.max_paths,
            rate_limit_rpm: config.rate_limit.requests_per_minute,
            rate_limit_backend: config.rate_limit.backend,
            model_path: config.model.path.clone(),
        }
    }

    /// Authenticate and rate limit a caller. Runs before the body is read.
    pub async fn admit(&self, credential: Option<&str>, identity: &str) -> Result<(), ApiError> {
        self.auth.authorize(credential)?;

        if !self.limiter.admit(identity).await {
            tracing::warn!(identity = %identity, "Rate limit exceeded");
            metrics::record_rate_limited(self.rate_limit_backend.as_str());
            return Err(ApiError::RateLimited);
        }
        Ok(())
    }

    /// Parse and analyze the raw body of an admitted request.
    pub async fn analyze_body(&self, body: &[u8]) -> Result<AnalyzeResponse, ApiError> {
        let request: AnalyzeRequest = serde_json::from_slice(body)
            .map_err(|_| ApiError::Validation("invalid json body".to_string()))?;
        self.analyze(request).await
    }

    /// Validate the batch and analyze each path in order.
    pub async fn analyze(&self, request: AnalyzeRequest) -> Result<AnalyzeResponse, ApiError> {
        if request.paths.is_empty() {
            return Err(ApiError::Validation("missing paths array".to_string()));
        }
        if request.paths.len() > self.max_paths {
            return Err(ApiError::Validation(format!(
                "too many paths (max {})",
                self.max_paths
            )));
        }

        let Some(mode) = self.backend.mode() else {
            let reason = self.backend.model_error().unwrap_or("model unavailable");
            return Err(ApiError::ModelUnavailable(reason.to_string()));
        };

        tracing::debug!(
            request_id = %request.request_id,
            paths = request.paths.len(),
            mode = mode.as_str(),
            "Analyzing batch"
        );

        let mut results = Vec::with_capacity(request.paths.len());
        for raw in request.paths {
            let processed = self.process_item(&raw).await;
            let (result, outcome) = match processed {
                Ok(labels) if labels.is_empty() => (
                    AnalyzeItemResult::failure(raw, ItemError::NoDamageDetected, mode),
                    ItemError::NoDamageDetected.as_str(),
                ),
                Ok(labels) => (AnalyzeItemResult::from_labels(raw, labels, mode), "ok"),
                Err(reason) => (AnalyzeItemResult::failure(raw, reason, mode), reason.as_str()),
            };
            metrics::record_item(outcome, mode.as_str());
            results.push(result);
        }

        let response = AnalyzeResponse::new(results);
        tracing::info!(
            request_id = %request.request_id,
            ok = response.ok,
            items = response.results.len(),
            "Batch analyzed"
        );
        Ok(response)
    }

    async fn process_item(&self, raw: &str) -> Result<Vec<String>, ItemError> {
        // Only the resolved path is used past this point; the raw string is
        // kept for the response alone.
        let Some(resolved) = self.roots.authorize(Path::new(raw)) else {
            tracing::warn!(path = %raw, "Path outside allowed roots");
            return Err(ItemError::PathNotAllowed);
        };
        match tokio::fs::metadata(&resolved).await {
            Ok(meta) if meta.is_file() => {}
            _ => return Err(ItemError::FileNotFound),
        }

        // Each item runs in its own task so a panic inside inference is
        // contained to that item.
        let owned = resolved;
        let joined = match &self.backend {
            InferenceBackend::Model(adapter) => {
                let adapter = adapter.clone();
                let confidence = self.confidence;
                tokio::spawn(async move { adapter.detect(&owned, confidence).await }).await
            }
            InferenceBackend::Heuristic { detector, .. } => {
                let detector = *detector;
                tokio::task::spawn_blocking(move || Ok::<_, PredictError>(detector.detect(&owned)))
                    .await
            }
            InferenceBackend::Unavailable { .. } => return Err(ItemError::InferenceFailed),
        };

        match joined {
            Ok(Ok(labels)) => Ok(labels),
            Ok(Err(e)) => {
                tracing::warn!(path = %raw, error = %e, "Inference failed");
                Err(ItemError::InferenceFailed)
            }
            Err(e) => {
                tracing::error!(path = %raw, error = %e, "Inference task aborted");
                Err(ItemError::InferenceFailed)
            }
        }
    }

    /// Current health, derived from configuration and model state.
    pub fn health(&self) -> HealthStatus {
        HealthStatus::derive(
            &self.backend,
            &self.model_path,
            self.auth.is_configured(),
            self.auth.is_strong(),
            self.rate_limit_rpm,
            self.rate_limit_backend,
        )
    }
}
