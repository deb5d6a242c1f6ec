//! Deep structural config diff with secret redaction.
//!
//! Walks both documents down to their leaves into a `BTreeMap<String, Value>`
//! keyed by dotted field path, then set-compares the two maps. Paths are
//! dot-joined (`server.port`) rather than JSON-pointer-joined, matching the
//! field-path vocabulary the validator uses for its own errors, and every
//! added/modified value is redacted before being stored.

use std::collections::BTreeMap;

use serde_json::Value;

use alert_types::config::{is_secret_path, SECRET_SENTINEL};
use alert_types::{ConfigDiff, ModifiedField};

fn redact(path: &str, value: &Value) -> Value {
    if is_secret_path(path) {
        Value::String(SECRET_SENTINEL.to_string())
    } else {
        value.clone()
    }
}

fn collect_leaf_paths(prefix: &str, value: &Value, out: &mut BTreeMap<String, Value>) {
    if let Some(obj) = value.as_object() {
        for (key, v) in obj {
            let next = if prefix.is_empty() { key.clone() } else { format!("{prefix}.{key}") };
            collect_leaf_paths(&next, v, out);
        }
        return;
    }
    if let Some(arr) = value.as_array() {
        for (idx, v) in arr.iter().enumerate() {
            let next = if prefix.is_empty() { idx.to_string() } else { format!("{prefix}.{idx}") };
            collect_leaf_paths(&next, v, out);
        }
        return;
    }
    out.insert(prefix.to_string(), value.clone());
}

fn value_type_tag(value: &Value) -> String {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
    .to_string()
}

/// Maps a changed top-level config section to the reload component name
/// that owns it.
fn component_for_section(section: &str) -> &str {
    match section {
        "database" => "database",
        "redis" => "cache",
        "cache" => "cache",
        "webhook" => "webhook",
        "llm" => "classifier",
        "server" => "server",
        "logging" => "logging",
        "storage" => "storage",
        "targets" => "publishing",
        other => other,
    }
}

fn top_level_section(path: &str) -> &str {
    path.split('.').next().unwrap_or(path)
}

/// Deep recursive comparison of two configuration documents, optionally
/// scoped to a subset of top-level sections.
pub fn compare(old: &Value, new: &Value, sections: Option<&[String]>) -> ConfigDiff {
    let mut left = BTreeMap::new();
    let mut right = BTreeMap::new();
    collect_leaf_paths("", old, &mut left);
    collect_leaf_paths("", new, &mut right);

    let in_scope = |path: &str| sections.map(|s| s.iter().any(|sec| sec == top_level_section(path))).unwrap_or(true);

    let mut added = BTreeMap::new();
    let mut modified = BTreeMap::new();
    let mut deleted = Vec::new();
    let mut affected_sections = std::collections::BTreeSet::new();

    for (path, new_val) in &right {
        if !in_scope(path) {
            continue;
        }
        match left.get(path) {
            None => {
                added.insert(path.clone(), redact(path, new_val));
                affected_sections.insert(top_level_section(path).to_string());
            }
            Some(old_val) if old_val != new_val => {
                modified.insert(
                    path.clone(),
                    ModifiedField {
                        old: redact(path, old_val),
                        new: redact(path, new_val),
                        value_type: value_type_tag(new_val),
                    },
                );
                affected_sections.insert(top_level_section(path).to_string());
            }
            _ => {}
        }
    }

    for path in left.keys() {
        if !in_scope(path) {
            continue;
        }
        if !right.contains_key(path) {
            deleted.push(path.clone());
            affected_sections.insert(top_level_section(path).to_string());
        }
    }

    let affected: Vec<String> = affected_sections.iter().map(|s| component_for_section(s).to_string()).collect();
    let is_critical = added.keys().chain(modified.keys()).chain(deleted.iter()).any(|p| alert_types::config::is_critical_path(p));

    let summary = if added.is_empty() && modified.is_empty() && deleted.is_empty() {
        "no changes".to_string()
    } else {
        format!(
            "{} added, {} modified, {} deleted across {} component(s)",
            added.len(),
            modified.len(),
            deleted.len(),
            affected.len()
        )
    };

    ConfigDiff {
        added,
        modified,
        deleted,
        affected,
        is_critical,
        summary,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn identical_configs_produce_empty_diff() {
        let cfg = json!({"server": {"port": 8080}});
        let diff = compare(&cfg, &cfg, None);
        assert!(diff.is_empty());
        assert!(!diff.is_critical);
    }

    #[test]
    fn modified_field_is_reported_with_type_tag() {
        let old = json!({"server": {"port": 8080}});
        let new = json!({"server": {"port": 9090}});
        let diff = compare(&old, &new, None);
        assert_eq!(diff.modified.get("server.port").unwrap().old, json!(8080));
        assert_eq!(diff.modified.get("server.port").unwrap().new, json!(9090));
        assert_eq!(diff.modified.get("server.port").unwrap().value_type, "number");
    }

    #[test]
    fn critical_field_marks_diff_critical_and_affects_server() {
        let old = json!({"server": {"port": 8080}});
        let new = json!({"server": {"port": 9090}});
        let diff = compare(&old, &new, None);
        assert!(diff.is_critical);
        assert!(diff.affected.contains(&"server".to_string()));
    }

    #[test]
    fn secret_values_are_redacted() {
        let old = json!({"database": {"password": "old-pw"}});
        let new = json!({"database": {"password": "new-pw"}});
        let diff = compare(&old, &new, None);
        let modified = diff.modified.get("database.password").unwrap();
        assert_eq!(modified.old, json!(alert_types::config::SECRET_SENTINEL));
        assert_eq!(modified.new, json!(alert_types::config::SECRET_SENTINEL));
    }

    #[test]
    fn added_and_deleted_fields_tracked_separately() {
        let old = json!({"a": 1, "b": 2});
        let new = json!({"a": 1, "c": 3});
        let diff = compare(&old, &new, None);
        assert!(diff.added.contains_key("c"));
        assert!(diff.deleted.contains(&"b".to_string()));
    }

    #[test]
    fn mirror_comparison_swaps_added_and_deleted() {
        let a = json!({"a": 1, "b": 2});
        let b = json!({"a": 1, "c": 3});
        let forward = compare(&a, &b, None);
        let backward = compare(&b, &a, None);
        assert_eq!(forward.added.keys().collect::<Vec<_>>(), backward.deleted.iter().collect::<Vec<_>>());
        assert_eq!(forward.deleted.iter().collect::<Vec<_>>(), backward.added.keys().collect::<Vec<_>>());
    }

    #[test]
    fn scoped_compare_ignores_sections_outside_selection() {
        let old = json!({"server": {"port": 8080}, "database": {"host": "a"}});
        let new = json!({"server": {"port": 9090}, "database": {"host": "b"}});
        let diff = compare(&old, &new, Some(&["server".to_string()]));
        assert!(diff.modified.contains_key("server.port"));
        assert!(!diff.modified.contains_key("database.host"));
    }
}
