//! Deterministic rule-based fallback classification.
//!
//! Heuristic, never fails, confidence capped at 0.75. Picks a rule, records
//! which one fired in `reasoning`, and stamps a deliberately conservative
//! confidence.

use std::time::Instant;

use alert_types::{Alert, AlertStatus, ClassificationResult, ClassificationSource, Severity};

const MAX_FALLBACK_CONFIDENCE: f64 = 0.75;

fn severity_from_label(alert: &Alert) -> Option<(Severity, &'static str)> {
    let raw = alert.labels.get("severity")?.to_ascii_lowercase();
    match raw.as_str() {
        "critical" | "crit" | "p1" => Some((Severity::Critical, "label severity=critical")),
        "warning" | "warn" | "p2" => Some((Severity::Warning, "label severity=warning")),
        "info" | "p3" => Some((Severity::Info, "label severity=info")),
        "noise" | "p4" => Some((Severity::Noise, "label severity=noise")),
        _ => None,
    }
}

fn severity_from_name(alert: &Alert) -> (Severity, &'static str) {
    let name = alert.alert_name.to_ascii_lowercase();
    const CRITICAL_KEYWORDS: &[&str] = &["down", "outage", "critical", "fatal", "unreachable"];
    const WARNING_KEYWORDS: &[&str] = &["degraded", "warn", "slow", "latency", "elevated"];

    if CRITICAL_KEYWORDS.iter().any(|kw| name.contains(kw)) {
        (Severity::Critical, "alert_name matched a critical keyword")
    } else if WARNING_KEYWORDS.iter().any(|kw| name.contains(kw)) {
        (Severity::Warning, "alert_name matched a warning keyword")
    } else {
        (Severity::Info, "no label or keyword signal; defaulted to info")
    }
}

/// Classify without ever consulting the primary provider. Always succeeds.
pub fn classify_fallback(alert: &Alert) -> ClassificationResult {
    let start = Instant::now();

    let (severity, reason) = severity_from_label(alert).unwrap_or_else(|| severity_from_name(alert));

    let confidence = if alert.status == AlertStatus::Resolved {
        0.4
    } else if severity_from_label(alert).is_some() {
        MAX_FALLBACK_CONFIDENCE
    } else {
        0.5
    };

    let mut metadata = std::collections::HashMap::new();
    metadata.insert("source".to_string(), "fallback".to_string());

    ClassificationResult {
        severity,
        confidence,
        reasoning: reason.to_string(),
        recommendations: Vec::new(),
        processing_time: start.elapsed().as_secs_f64(),
        metadata,
    }
    .with_source(ClassificationSource::Fallback)
}
