//! Detection model handle.
//!
//! The trained detector itself runs out of process. A model manifest names
//! its label table and the runtime endpoint that scores images:
//!
//! ```json
//! {
//!   "names": {"0": "crack", "1": "leakage"},
//!   "runtime_url": "http://127.0.0.1:9100/predict",
//!   "timeout_secs": 60
//! }
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use super::labels::{LabelMap, RawLabelTable};

/// One detected object.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Detection {
    pub class_id: i64,
    pub confidence: Option<f32>,
}

impl Detection {
    pub fn new(class_id: i64) -> Self {
        Self {
            class_id,
            confidence: None,
        }
    }
}

/// Failure while scoring a single image.
#[derive(Debug, Error)]
pub enum PredictError {
    #[error("runtime request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("runtime returned status {0}")]
    Status(u16),
}

/// An object detector scoring one image at a time.
#[async_trait]
pub trait DetectionModel: Send + Sync {
    /// Human-readable label for a class id.
    fn class_label(&self, class_id: i64) -> String;

    /// Detections at or above `confidence`, in the detector's order.
    async fn predict(&self, path: &Path, confidence: f32) -> Result<Vec<Detection>, PredictError>;
}

/// Why a model could not be loaded. The display form is what health checks
/// and `500` responses report.
#[derive(Debug, Error)]
pub enum ModelLoadError {
    #[error("Model file not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("Failed to load model: {0}")]
    Invalid(String),
}

#[derive(Debug, Deserialize)]
struct ModelManifest {
    #[serde(default)]
    names: RawLabelTable,
    runtime_url: String,
    #[serde(default = "default_timeout_secs")]
    timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    60
}

#[derive(Debug, Serialize)]
struct PredictRequest<'a> {
    source: &'a str,
    conf: f32,
}

#[derive(Debug, Default, Deserialize)]
struct PredictResponse {
    #[serde(default)]
    boxes: Option<Boxes>,
}

#[derive(Debug, Default, Deserialize)]
struct Boxes {
    #[serde(default)]
    cls: Option<Vec<f64>>,
    #[serde(default)]
    conf: Option<Vec<f32>>,
}

impl PredictResponse {
    fn into_detections(self) -> Vec<Detection> {
        let Some(boxes) = self.boxes else {
            return Vec::new();
        };
        let Some(classes) = boxes.cls else {
            return Vec::new();
        };
        let confidences = boxes.conf.unwrap_or_default();
        classes
            .into_iter()
            .enumerate()
            .map(|(i, class)| Detection {
                class_id: class as i64,
                confidence: confidences.get(i).copied(),
            })
            .collect()
    }
}

/// Detector served by an HTTP inference runtime.
pub struct RuntimeModel {
    labels: LabelMap,
    endpoint: Url,
    client: reqwest::Client,
}

impl RuntimeModel {
    pub fn new(labels: LabelMap, endpoint: Url, timeout: Duration) -> Result<Self, ModelLoadError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ModelLoadError::Invalid(e.to_string()))?;
        Ok(Self {
            labels,
            endpoint,
            client,
        })
    }

    pub fn labels(&self) -> &LabelMap {
        &self.labels
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl DetectionModel for RuntimeModel {
    fn class_label(&self, class_id: i64) -> String {
        self.labels.label(class_id)
    }

    async fn predict(&self, path: &Path, confidence: f32) -> Result<Vec<Detection>, PredictError> {
        let source = path.to_string_lossy();
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&PredictRequest {
                source: &source,
                conf: confidence,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(PredictError::Status(status.as_u16()));
        }
        let body: PredictResponse = response.json().await?;
        Ok(body.into_detections())
    }
}

/// Load a model manifest from disk.
pub fn load_model(path: &Path) -> Result<RuntimeModel, ModelLoadError> {
    if !path.exists() {
        return Err(ModelLoadError::NotFound(path.to_path_buf()));
    }
    let content =
        std::fs::read_to_string(path).map_err(|e| ModelLoadError::Invalid(e.to_string()))?;
    let manifest: ModelManifest =
        serde_json::from_str(&content).map_err(|e| ModelLoadError::Invalid(e.to_string()))?;
    let endpoint = Url::parse(&manifest.runtime_url)
        .map_err(|e| ModelLoadError::Invalid(format!("invalid runtime_url: {e}")))?;
    if !matches!(endpoint.scheme(), "http" | "https") {
        return Err(ModelLoadError::Invalid(format!(
            "unsupported runtime scheme: {}",
            endpoint.scheme()
        )));
    }

    let labels = LabelMap::from(manifest.names);
    tracing::info!(
        path = %path.display(),
        classes = labels.len(),
        runtime = %endpoint,
        "Model manifest loaded"
    );
    RuntimeModel::new(labels, endpoint, Duration::from_secs(manifest.timeout_secs.max(1)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn manifest(body: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(body.as_bytes()).unwrap();
        file
    }

    #[test]
    fn missing_manifest_reports_path() {
        let err = load_model(Path::new("/nonexistent/model.json")).err().unwrap();
        assert_eq!(err.to_string(), "Model file not found: /nonexistent/model.json");
    }

    #[test]
    fn malformed_manifest_is_a_load_failure() {
        let file = manifest("{ not json");
        let err = load_model(file.path()).err().unwrap();
        assert!(err.to_string().starts_with("Failed to load model:"));
    }

    #[test]
    fn rejects_non_http_runtime() {
        let file = manifest(r#"{"names": [], "runtime_url": "ftp://host/predict"}"#);
        assert!(matches!(load_model(file.path()), Err(ModelLoadError::Invalid(_))));
    }

    #[test]
    fn loads_mapping_labels() {
        let file = manifest(
            r#"{"names": {"0": "crack", "2": "leakage"}, "runtime_url": "http://127.0.0.1:9100/predict"}"#,
        );
        let model = load_model(file.path()).unwrap();
        assert_eq!(model.class_label(2), "leakage");
        assert_eq!(model.class_label(9), "9");
        assert_eq!(model.endpoint().path(), "/predict");
    }

    #[test]
    fn response_without_boxes_has_no_detections() {
        let empty: PredictResponse = serde_json::from_str("{}").unwrap();
        assert!(empty.into_detections().is_empty());
        let null: PredictResponse = serde_json::from_str(r#"{"boxes": null}"#).unwrap();
        assert!(null.into_detections().is_empty());
        let no_cls: PredictResponse = serde_json::from_str(r#"{"boxes": {}}"#).unwrap();
        assert!(no_cls.into_detections().is_empty());
    }

    #[test]
    fn response_class_ids_are_truncated_to_integers() {
        let body: PredictResponse =
            serde_json::from_str(r#"{"boxes": {"cls": [2.0, 5.0], "conf": [0.9]}}"#).unwrap();
        let detections = body.into_detections();
        assert_eq!(detections[0].class_id, 2);
        assert_eq!(detections[0].confidence, Some(0.9));
        assert_eq!(detections[1].class_id, 5);
        assert_eq!(detections[1].confidence, None);
    }
}
