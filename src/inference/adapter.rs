//! Turns raw detections into an ordered, duplicate-free label list.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use super::model::{Detection, DetectionModel, PredictError};

/// Wraps the loaded detector with the label-extraction policy.
#[derive(Clone)]
pub struct ModelInferenceAdapter {
    model: Arc<dyn DetectionModel>,
}

impl ModelInferenceAdapter {
    pub fn new(model: Arc<dyn DetectionModel>) -> Self {
        Self { model }
    }

    /// Labels for `path` in first-detection order. No detections is an
    /// empty list, not an error.
    pub async fn detect(&self, path: &Path, confidence: f32) -> Result<Vec<String>, PredictError> {
        let detections = self.model.predict(path, confidence).await?;
        Ok(extract_labels(&detections, |id| self.model.class_label(id)))
    }
}

/// Deduplicate by class id keeping first occurrences, then resolve labels.
/// Distinct ids that share a label collapse as well.
pub fn extract_labels<F>(detections: &[Detection], label_for: F) -> Vec<String>
where
    F: Fn(i64) -> String,
{
    let mut seen_ids = HashSet::new();
    let mut seen_labels = HashSet::new();
    let mut labels = Vec::new();
    for detection in detections {
        if !seen_ids.insert(detection.class_id) {
            continue;
        }
        let label = label_for(detection.class_id);
        if seen_labels.insert(label.clone()) {
            labels.push(label);
        }
    }
    labels
}
