//! Classification result and the enriched alert it produces.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::alert::Alert;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    Warning,
    Info,
    Noise,
}

/// Where a classification came from; stored at `metadata["source"]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassificationSource {
    Llm,
    Fallback,
    Cache,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub severity: Severity,
    /// Always in [0, 1]; fallback paths cap this at 0.75.
    pub confidence: f64,
    pub reasoning: String,
    #[serde(default)]
    pub recommendations: Vec<String>,
    /// Actual wall time spent producing this result, in seconds.
    pub processing_time: f64,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl ClassificationResult {
    pub fn source(&self) -> Option<ClassificationSource> {
        match self.metadata.get("source").map(String::as_str) {
            Some("llm") => Some(ClassificationSource::Llm),
            Some("fallback") => Some(ClassificationSource::Fallback),
            Some("cache") => Some(ClassificationSource::Cache),
            _ => None,
        }
    }

    pub fn with_source(mut self, source: ClassificationSource) -> Self {
        let tag = match source {
            ClassificationSource::Llm => "llm",
            ClassificationSource::Fallback => "fallback",
            ClassificationSource::Cache => "cache",
        };
        self.metadata.insert("source".to_string(), tag.to_string());
        self
    }
}

/// An `Alert` paired with its `ClassificationResult`. Never mutated after
/// construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichedAlert {
    pub alert: Alert,
    pub classification: ClassificationResult,
}

impl EnrichedAlert {
    pub fn new(alert: Alert, classification: ClassificationResult) -> Self {
        Self {
            alert,
            classification,
        }
    }
}
