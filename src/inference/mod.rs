//! Inference subsystem.
//!
//! # Data Flow
//! ```text
//! startup:
//!     model manifest → model.rs (load, normalize label table)
//!         ok   → InferenceBackend::Model
//!         err  → InferenceBackend::Heuristic   (fallback allowed)
//!              → InferenceBackend::Unavailable (fallback disabled)
//!
//! per image:
//!     adapter.rs   (runtime detections → ordered unique labels)
//!  or heuristic.rs (image statistics → threshold labels)
//! ```

pub mod adapter;
pub mod heuristic;
pub mod labels;
pub mod model;

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::ModelConfig;

pub use adapter::{extract_labels, ModelInferenceAdapter};
pub use heuristic::HeuristicFallbackDetector;
pub use labels::LabelMap;
pub use model::{load_model, Detection, DetectionModel, ModelLoadError, PredictError, RuntimeModel};

/// Which strategy produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InferenceMode {
    Model,
    HeuristicFallback,
}

impl InferenceMode {
    pub fn as_str(self) -> &'static str {
        match self {
            InferenceMode::Model => "model",
            InferenceMode::HeuristicFallback => "heuristic_fallback",
        }
    }
}

/// Inference strategy fixed at startup.
#[derive(Clone)]
pub enum InferenceBackend {
    Model(ModelInferenceAdapter),
    Heuristic {
        detector: HeuristicFallbackDetector,
        model_error: String,
    },
    Unavailable {
        model_error: String,
    },
}

impl InferenceBackend {
    /// Load the configured model, degrading per the fallback policy.
    pub fn from_config(config: &ModelConfig) -> Self {
        match load_model(&config.path) {
            Ok(model) => Self::from_model(Arc::new(model)),
            Err(e) => Self::without_model(e.to_string(), config.allow_heuristic_fallback),
        }
    }

    pub fn from_model(model: Arc<dyn DetectionModel>) -> Self {
        InferenceBackend::Model(ModelInferenceAdapter::new(model))
    }

    pub fn without_model(model_error: String, allow_fallback: bool) -> Self {
        if allow_fallback {
            tracing::warn!(error = %model_error, "Model unavailable, serving heuristic fallback");
            InferenceBackend::Heuristic {
                detector: HeuristicFallbackDetector::new(),
                model_error,
            }
        } else {
            tracing::error!(error = %model_error, "Model unavailable and heuristic fallback disabled");
            InferenceBackend::Unavailable { model_error }
        }
    }

    pub fn mode(&self) -> Option<InferenceMode> {
        match self {
            InferenceBackend::Model(_) => Some(InferenceMode::Model),
            InferenceBackend::Heuristic { .. } => Some(InferenceMode::HeuristicFallback),
            InferenceBackend::Unavailable { .. } => None,
        }
    }

    pub fn model_loaded(&self) -> bool {
        matches!(self, InferenceBackend::Model(_))
    }

    pub fn model_error(&self) -> Option<&str> {
        match self {
            InferenceBackend::Model(_) => None,
            InferenceBackend::Heuristic { model_error, .. }
            | InferenceBackend::Unavailable { model_error } => Some(model_error),
        }
    }
}
