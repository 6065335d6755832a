//! Wire types for batch analysis.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::inference::InferenceMode;

/// Batch request as sent by the gateway.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AnalyzeRequest {
    pub request_id: String,
    pub paths: Vec<String>,
}

/// Why a single item produced no labels. The display strings are part of
/// the contract with the gateway, which shows them to end users verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ItemError {
    #[error("path not allowed")]
    PathNotAllowed,
    #[error("file not found")]
    FileNotFound,
    #[error("inference failed")]
    InferenceFailed,
    #[error("no damage detected")]
    NoDamageDetected,
}

impl ItemError {
    /// Metric label for the outcome.
    pub fn as_str(self) -> &'static str {
        match self {
            ItemError::PathNotAllowed => "path_not_allowed",
            ItemError::FileNotFound => "file_not_found",
            ItemError::InferenceFailed => "inference_failed",
            ItemError::NoDamageDetected => "no_damage",
        }
    }
}

/// Outcome for one requested path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzeItemResult {
    pub ok: bool,
    pub path: String,
    pub damage_types: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub inference_mode: InferenceMode,
}

impl AnalyzeItemResult {
    /// Build from labels; an empty list is reported as no damage.
    pub fn from_labels(path: String, labels: Vec<String>, mode: InferenceMode) -> Self {
        if labels.is_empty() {
            return Self::failure(path, ItemError::NoDamageDetected, mode);
        }
        Self {
            ok: true,
            path,
            damage_types: labels,
            error: None,
            inference_mode: mode,
        }
    }

    pub fn failure(path: String, reason: ItemError, mode: InferenceMode) -> Self {
        Self {
            ok: false,
            path,
            damage_types: Vec::new(),
            error: Some(reason.to_string()),
            inference_mode: mode,
        }
    }
}

/// Aggregated batch response; `ok` when any item succeeded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzeResponse {
    pub ok: bool,
    pub results: Vec<AnalyzeItemResult>,
}

impl AnalyzeResponse {
    pub fn new(results: Vec<AnalyzeItemResult>) -> Self {
        Self {
            ok: results.iter().any(|r| r.ok),
            results,
        }
    }
}
