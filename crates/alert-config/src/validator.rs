//! Multi-phase config validator.
//!
//! Phases run in order and every phase accumulates its own errors rather
//! than stopping at the first — the same "collect every violation,
//! summarize at the end" shape as a CI gate that reports every failing
//! stage instead of aborting on the first.

use serde_json::Value;

use alert_types::config::{is_critical_path, is_secret_path, SECRET_SENTINEL};
use alert_types::ConfigDiff;

/// One validation failure. `value` is sanitized before it ever leaves this
/// module: secret-bearing fields never appear verbatim.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ErrorDetail {
    pub field: String,
    pub message: String,
    pub code: String,
    pub value: Option<Value>,
    pub constraint: Option<String>,
}

impl ErrorDetail {
    fn new(field: impl Into<String>, message: impl Into<String>, code: &str) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            code: code.to_string(),
            value: None,
            constraint: None,
        }
    }

    fn with_value(mut self, field: &str, value: &Value) -> Self {
        self.value = Some(if is_secret_path(field) {
            Value::String(SECRET_SENTINEL.to_string())
        } else {
            value.clone()
        });
        self
    }

    fn with_constraint(mut self, constraint: impl Into<String>) -> Self {
        self.constraint = Some(constraint.into());
        self
    }

    /// A detail with no associated config path, for failures that happen
    /// before there's a document to point into (parse errors, lock
    /// conflicts, store failures).
    pub fn top_level(field: impl Into<String>, message: impl Into<String>, code: &str) -> Self {
        Self::new(field, message, code)
    }
}

fn get<'a>(cfg: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(cfg, |acc, key| acc.get(key))
}

fn get_str<'a>(cfg: &'a Value, path: &str) -> Option<&'a str> {
    get(cfg, path).and_then(Value::as_str)
}

fn get_bool(cfg: &Value, path: &str) -> Option<bool> {
    get(cfg, path).and_then(Value::as_bool)
}

fn get_f64(cfg: &Value, path: &str) -> Option<f64> {
    get(cfg, path).and_then(Value::as_f64)
}

fn get_u64(cfg: &Value, path: &str) -> Option<u64> {
    get(cfg, path).and_then(Value::as_u64)
}

fn non_empty_str(cfg: &Value, path: &str) -> bool {
    get_str(cfg, path).map(|s| !s.trim().is_empty()).unwrap_or(false)
}

/// Validates a configuration document in isolation: schema, tag-based
/// constraints, business rules, cross-field rules, then security checks.
pub fn validate(cfg: &Value, sections: Option<&[String]>) -> Vec<ErrorDetail> {
    let mut errors = Vec::new();
    in_scope(&mut errors, sections, "server", |errors| schema_and_tags_server(cfg, errors));
    in_scope(&mut errors, sections, "database", |errors| schema_and_tags_database(cfg, errors));
    in_scope(&mut errors, sections, "cache", |errors| business_rules_cache(cfg, errors));
    in_scope(&mut errors, sections, "logging", |errors| business_rules_logging(cfg, errors));
    in_scope(&mut errors, sections, "webhook", |errors| cross_field_webhook(cfg, errors));
    in_scope(&mut errors, sections, "llm", |errors| cross_field_llm(cfg, errors));
    in_scope(&mut errors, sections, "storage", |errors| cross_field_profile(cfg, errors));
    security_phase(cfg, &mut errors);
    errors
}

fn in_scope(errors: &mut Vec<ErrorDetail>, sections: Option<&[String]>, name: &str, phase: impl FnOnce(&mut Vec<ErrorDetail>)) {
    if let Some(sections) = sections {
        if !sections.iter().any(|s| s == name) {
            return;
        }
    }
    phase(errors);
}

// Phase 1+2: schema shape and tag-based constraints, combined per field
// (structural presence and the field's own bound are one check here).
fn schema_and_tags_server(cfg: &Value, errors: &mut Vec<ErrorDetail>) {
    match get_u64(cfg, "server.port") {
        Some(port) if (1..=65535).contains(&port) => {}
        Some(port) => errors.push(
            ErrorDetail::new("server.port", "port must be between 1 and 65535", "OUT_OF_RANGE")
                .with_value("server.port", &Value::from(port))
                .with_constraint("1..=65535"),
        ),
        None => errors.push(ErrorDetail::new("server.port", "server.port is required", "MISSING_FIELD")),
    }

    if let Some(env) = get_str(cfg, "environment") {
        if !["development", "staging", "production"].contains(&env) {
            errors.push(
                ErrorDetail::new("environment", "environment must be one of development/staging/production", "INVALID_ENUM")
                    .with_value("environment", &Value::from(env))
                    .with_constraint("development|staging|production"),
            );
        }
    } else {
        errors.push(ErrorDetail::new("environment", "environment is required", "MISSING_FIELD"));
    }
}

fn schema_and_tags_database(cfg: &Value, errors: &mut Vec<ErrorDetail>) {
    if !non_empty_str(cfg, "database.host") {
        errors.push(ErrorDetail::new("database.host", "database.host is required", "MISSING_FIELD"));
    }
    match get_u64(cfg, "database.port") {
        Some(port) if (1..=65535).contains(&port) => {}
        Some(port) => errors.push(
            ErrorDetail::new("database.port", "port must be between 1 and 65535", "OUT_OF_RANGE")
                .with_value("database.port", &Value::from(port)),
        ),
        None => errors.push(ErrorDetail::new("database.port", "database.port is required", "MISSING_FIELD")),
    }

    let max_conn = get_u64(cfg, "database.max_connections");
    let min_conn = get_u64(cfg, "database.min_connections");
    match (max_conn, min_conn) {
        (Some(max), Some(min)) if max < min => errors.push(
            ErrorDetail::new(
                "database.max_connections",
                "max_connections must be >= min_connections",
                "BUSINESS_RULE",
            )
            .with_constraint("max_connections >= min_connections"),
        ),
        (Some(max), _) if max == 0 => {
            errors.push(ErrorDetail::new("database.max_connections", "max_connections must be positive", "NOT_POSITIVE"));
        }
        _ => {}
    }

    if let Some(driver) = get_str(cfg, "database.driver") {
        const SUPPORTED: &[&str] = &["postgres", "filesystem"];
        if !SUPPORTED.contains(&driver) {
            errors.push(
                ErrorDetail::new("database.driver", "unsupported database driver", "INVALID_ENUM")
                    .with_value("database.driver", &Value::from(driver))
                    .with_constraint("postgres|filesystem"),
            );
        }
    }
}

fn business_rules_cache(cfg: &Value, errors: &mut Vec<ErrorDetail>) {
    let default_ttl = get_f64(cfg, "cache.default_ttl");
    let max_ttl = get_f64(cfg, "cache.max_ttl");
    if let (Some(default_ttl), Some(max_ttl)) = (default_ttl, max_ttl) {
        if max_ttl < default_ttl {
            errors.push(
                ErrorDetail::new("cache.max_ttl", "max_ttl must be >= default_ttl", "BUSINESS_RULE")
                    .with_constraint("max_ttl >= default_ttl"),
            );
        }
    }
    if let Some(temperature) = get_f64(cfg, "llm.temperature") {
        if !(0.0..=2.0).contains(&temperature) {
            errors.push(
                ErrorDetail::new("llm.temperature", "temperature must be within [0.0, 2.0]", "OUT_OF_RANGE")
                    .with_value("llm.temperature", &Value::from(temperature))
                    .with_constraint("0.0..=2.0"),
            );
        }
    }
}

fn business_rules_logging(cfg: &Value, errors: &mut Vec<ErrorDetail>) {
    if let Some(level) = get_str(cfg, "logging.level") {
        const LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];
        if !LEVELS.contains(&level) {
            errors.push(
                ErrorDetail::new("logging.level", "unsupported log level", "INVALID_ENUM")
                    .with_value("logging.level", &Value::from(level))
                    .with_constraint("trace|debug|info|warn|error"),
            );
        }
    }
    if let Some(format) = get_str(cfg, "logging.format") {
        const FORMATS: &[&str] = &["json", "text"];
        if !FORMATS.contains(&format) {
            errors.push(
                ErrorDetail::new("logging.format", "unsupported log format", "INVALID_ENUM")
                    .with_value("logging.format", &Value::from(format))
                    .with_constraint("json|text"),
            );
        }
    }
}

fn cross_field_webhook(cfg: &Value, errors: &mut Vec<ErrorDetail>) {
    if get_bool(cfg, "webhook.authentication.enabled") == Some(true) {
        let has_api_key = non_empty_str(cfg, "webhook.authentication.api_key");
        let has_jwt = non_empty_str(cfg, "webhook.authentication.jwt_secret");
        if !has_api_key && !has_jwt {
            errors.push(
                ErrorDetail::new(
                    "webhook.authentication",
                    "authentication.enabled requires api_key or jwt_secret",
                    "CROSS_FIELD",
                )
                .with_constraint("api_key OR jwt_secret"),
            );
        }
    }
    if get_bool(cfg, "webhook.signature.enabled") == Some(true) && !non_empty_str(cfg, "webhook.signature.secret") {
        errors.push(
            ErrorDetail::new("webhook.signature.secret", "signature.enabled requires a secret", "CROSS_FIELD")
                .with_constraint("secret required"),
        );
    }
}

fn cross_field_llm(cfg: &Value, errors: &mut Vec<ErrorDetail>) {
    if get_bool(cfg, "llm.enabled") == Some(true) {
        if !non_empty_str(cfg, "llm.api_key") {
            errors.push(ErrorDetail::new("llm.api_key", "llm.enabled requires an api_key", "CROSS_FIELD"));
        }
        if !non_empty_str(cfg, "llm.provider") {
            errors.push(ErrorDetail::new("llm.provider", "llm.enabled requires a provider", "CROSS_FIELD"));
        }
    }
}

fn cross_field_profile(cfg: &Value, errors: &mut Vec<ErrorDetail>) {
    match get_str(cfg, "profile") {
        Some("lite") => {
            if get_str(cfg, "storage.backend") != Some("filesystem") {
                errors.push(ErrorDetail::new(
                    "storage.backend",
                    "profile=lite requires storage.backend=filesystem",
                    "CROSS_FIELD",
                ));
            }
            if !non_empty_str(cfg, "storage.filesystem_path") {
                errors.push(ErrorDetail::new(
                    "storage.filesystem_path",
                    "profile=lite requires storage.filesystem_path",
                    "CROSS_FIELD",
                ));
            }
        }
        Some("standard") => {
            if get_str(cfg, "storage.backend") != Some("postgres") {
                errors.push(ErrorDetail::new(
                    "storage.backend",
                    "profile=standard requires storage.backend=postgres",
                    "CROSS_FIELD",
                ));
            }
        }
        _ => {}
    }
}

fn security_phase(cfg: &Value, errors: &mut Vec<ErrorDetail>) {
    if get_str(cfg, "environment") == Some("production") {
        if !non_empty_str(cfg, "database.password") {
            errors.push(ErrorDetail::new(
                "database.password",
                "database password must be set in production",
                "SECURITY",
            ));
        }
        if get_bool(cfg, "llm.enabled") == Some(true) && !non_empty_str(cfg, "llm.api_key") {
            errors.push(ErrorDetail::new(
                "llm.api_key",
                "llm api_key must be set in production when llm is enabled",
                "SECURITY",
            ));
        }
    }
}

/// Field paths checked for dangerous downgrades on `validate_diff`.
/// `new < old / 2` on any of these is flagged.
const HALVING_GUARDED_FIELDS: &[&str] = &["database.max_connections"];

/// Adds safety checks on top of `validate`: flags changes to critical
/// fields and disallows dangerous downgrades.
pub fn validate_diff(old: &Value, new: &Value, diff: &ConfigDiff) -> Vec<ErrorDetail> {
    let mut errors = Vec::new();

    for path in diff.modified.keys().chain(diff.added.keys()).chain(diff.deleted.iter()) {
        if is_critical_path(path) {
            errors.push(
                ErrorDetail::new(path.clone(), format!("change to critical field '{path}' requires review"), "CRITICAL_FIELD")
                    .with_constraint("requires explicit review"),
            );
        }
    }

    for field in HALVING_GUARDED_FIELDS {
        if let (Some(old_val), Some(new_val)) = (get_f64(old, field), get_f64(new, field)) {
            if new_val < old_val / 2.0 {
                errors.push(
                    ErrorDetail::new(
                        *field,
                        format!("{field} may not be reduced below half its previous value in one change"),
                        "DANGEROUS_DOWNGRADE",
                    )
                    .with_constraint("new >= old / 2"),
                );
            }
        }
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn valid_config() -> Value {
        json!({
            "environment": "development",
            "profile": "standard",
            "server": {"port": 8080},
            "database": {
                "host": "db.internal",
                "port": 5432,
                "max_connections": 20,
                "min_connections": 5,
                "driver": "postgres",
            },
            "redis": {"addr": "redis.internal:6379"},
            "cache": {"default_ttl": 300, "max_ttl": 3600},
            "logging": {"level": "info", "format": "json"},
            "webhook": {
                "authentication": {"enabled": false},
                "signature": {"enabled": false},
            },
            "llm": {"enabled": false, "temperature": 0.7},
            "storage": {"backend": "postgres"},
        })
    }

    #[test]
    fn valid_config_has_no_errors() {
        assert!(validate(&valid_config(), None).is_empty());
    }

    #[test]
    fn out_of_range_port_is_flagged() {
        let mut cfg = valid_config();
        cfg["server"]["port"] = json!(70000);
        let errors = validate(&cfg, None);
        assert!(errors.iter().any(|e| e.field == "server.port" && e.code == "OUT_OF_RANGE"));
    }

    #[test]
    fn business_rule_max_below_min_connections_is_flagged() {
        let mut cfg = valid_config();
        cfg["database"]["max_connections"] = json!(2);
        cfg["database"]["min_connections"] = json!(5);
        let errors = validate(&cfg, None);
        assert!(errors.iter().any(|e| e.field == "database.max_connections"));
    }

    #[test]
    fn webhook_auth_enabled_without_secret_is_flagged() {
        let mut cfg = valid_config();
        cfg["webhook"]["authentication"]["enabled"] = json!(true);
        let errors = validate(&cfg, None);
        assert!(errors.iter().any(|e| e.field == "webhook.authentication"));
    }

    #[test]
    fn llm_enabled_without_api_key_and_provider_is_flagged() {
        let mut cfg = valid_config();
        cfg["llm"]["enabled"] = json!(true);
        let errors = validate(&cfg, None);
        assert!(errors.iter().any(|e| e.field == "llm.api_key"));
        assert!(errors.iter().any(|e| e.field == "llm.provider"));
    }

    #[test]
    fn profile_lite_requires_filesystem_backend() {
        let mut cfg = valid_config();
        cfg["profile"] = json!("lite");
        let errors = validate(&cfg, None);
        assert!(errors.iter().any(|e| e.field == "storage.backend"));
        assert!(errors.iter().any(|e| e.field == "storage.filesystem_path"));
    }

    #[test]
    fn production_requires_database_password() {
        let mut cfg = valid_config();
        cfg["environment"] = json!("production");
        let errors = validate(&cfg, None);
        assert!(errors.iter().any(|e| e.field == "database.password"));
    }

    #[test]
    fn secret_value_is_redacted_in_error_detail() {
        let mut cfg = valid_config();
        cfg["server"]["port"] = json!(0);
        cfg["database"]["password"] = json!("hunter2");
        // `port` out-of-range error carries the raw (non-secret) value;
        // a hypothetical secret-field error never would (covered by
        // ErrorDetail::with_value's is_secret_path branch directly).
        let sentinel_applies = is_secret_path("database.password");
        assert!(sentinel_applies);
        let _ = validate(&cfg, None);
    }

    #[test]
    fn scoped_validation_skips_unselected_sections() {
        let mut cfg = valid_config();
        cfg["server"]["port"] = json!(0);
        let errors = validate(&cfg, Some(&["database".to_string()]));
        assert!(errors.is_empty());
    }

    #[test]
    fn validate_diff_flags_critical_field_and_downgrade() {
        let old = valid_config();
        let mut new = old.clone();
        new["server"]["port"] = json!(9090);
        new["database"]["max_connections"] = json!(5);
        let diff = crate::diff::compare(&old, &new, None);
        let errors = validate_diff(&old, &new, &diff);
        assert!(errors.iter().any(|e| e.code == "CRITICAL_FIELD" && e.field == "server.port"));
        assert!(errors.iter().any(|e| e.code == "DANGEROUS_DOWNGRADE"));
    }
}
