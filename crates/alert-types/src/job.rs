//! A unit of dispatch work: publish one enriched alert to one target.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::classification::{EnrichedAlert, Severity};
use crate::target::PublishingTarget;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Med,
    High,
}

impl Priority {
    /// Priority derivation from severity: critical→high, warning→med,
    /// info/noise→low.
    pub fn from_severity(severity: Severity) -> Self {
        match severity {
            Severity::Critical => Priority::High,
            Severity::Warning => Priority::Med,
            Severity::Info | Severity::Noise => Priority::Low,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Queued,
    InFlight,
    Completed,
    Failed,
    Dead,
}

/// Classification of a job failure, distinct from the crate-wide error tag
/// taxonomy: this is the vocabulary the retry policy reasons about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobErrorType {
    Timeout,
    Unavailable,
    Validation,
    Transient,
    Permanent,
}

impl JobErrorType {
    /// Transient failures are retried while retries remain; permanent and
    /// validation failures are not.
    pub fn is_retriable(&self) -> bool {
        matches!(self, JobErrorType::Timeout | JobErrorType::Unavailable | JobErrorType::Transient)
    }

    /// Map an HTTP status from a target publish attempt to a job error
    /// type. 408/429 are treated as transient even though they are 4xx.
    pub fn from_http_status(status: u16) -> Self {
        match status {
            408 | 429 => JobErrorType::Transient,
            400..=499 => JobErrorType::Permanent,
            500..=599 => JobErrorType::Unavailable,
            _ => JobErrorType::Transient,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    pub alert: EnrichedAlert,
    pub target: PublishingTarget,
    pub priority: Priority,
    pub state: JobState,
    pub retry_count: u32,
    pub max_retries: u32,
    pub last_error: Option<String>,
    pub error_type: Option<JobErrorType>,
    pub submitted_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Job {
    pub fn new(alert: EnrichedAlert, target: PublishingTarget, max_retries: u32) -> Self {
        let id = format!("{}:{}", alert.alert.fingerprint, target.name);
        let priority = Priority::from_severity(alert.classification.severity);
        Self {
            id,
            alert,
            target,
            priority,
            state: JobState::Queued,
            retry_count: 0,
            max_retries,
            last_error: None,
            error_type: None,
            submitted_at: Utc::now(),
            completed_at: None,
        }
    }

    pub fn retries_exhausted(&self) -> bool {
        self.retry_count >= self.max_retries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn enriched(severity: Severity) -> EnrichedAlert {
        use crate::alert::{Alert, AlertStatus};
        use crate::classification::ClassificationResult;
        use crate::fingerprint::Fingerprint;

        let alert = Alert::new(
            Fingerprint::new("fp-1").unwrap(),
            "X",
            AlertStatus::Firing,
            Utc::now(),
            None,
            HashMap::new(),
            HashMap::new(),
            None,
        )
        .unwrap();
        let result = ClassificationResult {
            severity,
            confidence: 0.9,
            reasoning: "test".into(),
            recommendations: vec![],
            processing_time: 0.01,
            metadata: HashMap::new(),
        };
        EnrichedAlert::new(alert, result)
    }

    fn target() -> PublishingTarget {
        PublishingTarget::new("team-a", "slack", "https://example.com", true, "json", HashMap::new()).unwrap()
    }

    #[test]
    fn id_is_fingerprint_colon_target() {
        let job = Job::new(enriched(Severity::Critical), target(), 3);
        assert_eq!(job.id, "fp-1:team-a");
    }

    #[test]
    fn priority_derivation_matches_severity() {
        assert_eq!(Job::new(enriched(Severity::Critical), target(), 3).priority, Priority::High);
        assert_eq!(Job::new(enriched(Severity::Warning), target(), 3).priority, Priority::Med);
        assert_eq!(Job::new(enriched(Severity::Info), target(), 3).priority, Priority::Low);
        assert_eq!(Job::new(enriched(Severity::Noise), target(), 3).priority, Priority::Low);
    }

    #[test]
    fn retryable_status_maps_correctly() {
        assert_eq!(JobErrorType::from_http_status(404), JobErrorType::Permanent);
        assert_eq!(JobErrorType::from_http_status(408), JobErrorType::Transient);
        assert_eq!(JobErrorType::from_http_status(429), JobErrorType::Transient);
        assert_eq!(JobErrorType::from_http_status(503), JobErrorType::Unavailable);
        assert!(JobErrorType::Timeout.is_retriable());
        assert!(!JobErrorType::Permanent.is_retriable());
    }
}
