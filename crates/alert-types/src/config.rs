//! Versioned configuration documents, diffs and audit trail entries.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigSource {
    Api,
    Gitops,
    Manual,
    Sighup,
    Rollback,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigVersion {
    pub version: u64,
    pub config: Value,
    /// Hex-encoded SHA-256 over the canonical serialization of `config`.
    pub hash: String,
    pub created_at: DateTime<Utc>,
    pub created_by: Option<String>,
    pub source: ConfigSource,
    pub description: Option<String>,
    pub ticket: Option<String>,
    pub previous_version: Option<u64>,
    pub diff: Option<ConfigDiff>,
}

/// A single modified leaf: old and new value plus its JSON type tag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModifiedField {
    pub old: Value,
    pub new: Value,
    #[serde(rename = "type")]
    pub value_type: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigDiff {
    pub added: BTreeMap<String, Value>,
    pub modified: BTreeMap<String, ModifiedField>,
    pub deleted: Vec<String>,
    pub affected: Vec<String>,
    pub is_critical: bool,
    pub summary: String,
}

impl ConfigDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.modified.is_empty() && self.deleted.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditAction {
    Create,
    Update,
    Rollback,
    Validate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditLogEntry {
    pub id: uuid::Uuid,
    pub version: u64,
    pub action: AuditAction,
    pub user_id: Option<String>,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    pub diff: Option<ConfigDiff>,
    pub sections: Vec<String>,
    pub dry_run: bool,
    pub success: bool,
    pub error_message: Option<String>,
    pub duration_ms: u64,
    pub created_at: DateTime<Utc>,
}

/// Field-path substrings that mark a value as secret-bearing. Applied in
/// addition to the explicit secret-path registry a caller may supply.
pub const SECRET_KEYWORDS: &[&str] = &["password", "secret", "api_key", "apikey", "token", "jwt"];

/// Field paths that, when touched, make a diff `is_critical` and flag a
/// safety warning on `validate_diff`.
pub const CRITICAL_FIELD_PATHS: &[&str] = &[
    "database.host",
    "database.port",
    "redis.addr",
    "server.port",
    "webhook.authentication.enabled",
    "webhook.signature.enabled",
];

pub const SECRET_SENTINEL: &str = "***REDACTED***";

/// True if `path` is in the explicit critical-field set.
pub fn is_critical_path(path: &str) -> bool {
    CRITICAL_FIELD_PATHS.contains(&path)
}

/// True if `path` names or contains a secret keyword.
pub fn is_secret_path(path: &str) -> bool {
    let lower = path.to_ascii_lowercase();
    SECRET_KEYWORDS.iter().any(|kw| lower.contains(kw))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_diff_detected() {
        assert!(ConfigDiff::default().is_empty());
    }

    #[test]
    fn secret_keyword_detection_is_case_insensitive() {
        assert!(is_secret_path("webhook.API_KEY"));
        assert!(is_secret_path("llm.secret"));
        assert!(!is_secret_path("server.port"));
    }

    #[test]
    fn critical_path_membership() {
        assert!(is_critical_path("server.port"));
        assert!(!is_critical_path("llm.temperature"));
    }
}
