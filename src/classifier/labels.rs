use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;

pub const UNKNOWN_LABEL: &str = "unknown";

/// Immutable class index to label mapping, cheap to share between calls
#[derive(Debug, Clone, PartialEq)]
pub struct LabelSet {
    labels: Arc<[String]>,
}

impl LabelSet {
    pub fn new(labels: Vec<String>) -> Self {
        Self {
            labels: labels.into(),
        }
    }

    /// `"0"`, `"1"`, ... up to `count - 1`
    pub fn digits(count: usize) -> Self {
        Self::new((0..count).map(|i| i.to_string()).collect())
    }

    /// One label per line; blank lines are skipped
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read labels {}", path.display()))?;
        let labels: Vec<String> = raw
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect();
        if labels.is_empty() {
            anyhow::bail!("Label file {} is empty", path.display());
        }
        Ok(Self::new(labels))
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn get(&self, index: usize) -> &str {
        self.labels.get(index).map(String::as_str).unwrap_or(UNKNOWN_LABEL)
    }
}
