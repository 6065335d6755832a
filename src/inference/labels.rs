//! Class label tables.

use std::collections::{BTreeMap, HashMap};

use serde::Deserialize;

/// Label table as shipped with a model: either an id-keyed mapping or a
/// positional list.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawLabelTable {
    Sequence(Vec<String>),
    Mapping(HashMap<String, String>),
}

impl Default for RawLabelTable {
    fn default() -> Self {
        RawLabelTable::Sequence(Vec::new())
    }
}

/// Canonical `class id → label` table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelMap {
    labels: BTreeMap<i64, String>,
}

impl LabelMap {
    pub fn new(labels: BTreeMap<i64, String>) -> Self {
        Self { labels }
    }

    /// Resolve an id, falling back to its decimal form.
    pub fn label(&self, class_id: i64) -> String {
        self.labels
            .get(&class_id)
            .cloned()
            .unwrap_or_else(|| class_id.to_string())
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

impl From<RawLabelTable> for LabelMap {
    fn from(raw: RawLabelTable) -> Self {
        let labels = match raw {
            RawLabelTable::Sequence(names) => names
                .into_iter()
                .enumerate()
                .map(|(i, name)| (i as i64, name))
                .collect(),
            RawLabelTable::Mapping(names) => names
                .into_iter()
                .filter_map(|(key, name)| match key.trim().parse::<i64>() {
                    Ok(id) => Some((id, name)),
                    Err(_) => {
                        tracing::warn!(key = %key, "Skipping non-numeric class id in label table");
                        None
                    }
                })
                .collect(),
        };
        Self { labels }
    }
}

impl<const N: usize> From<[(i64, &str); N]> for LabelMap {
    fn from(pairs: [(i64, &str); N]) -> Self {
        Self {
            labels: pairs
                .into_iter()
                .map(|(id, name)| (id, name.to_string()))
                .collect(),
        }
    }
}
