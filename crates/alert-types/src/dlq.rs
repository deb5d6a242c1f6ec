//! Dead-letter queue entry: a durable record of a terminally failed job.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::job::{JobErrorType, Priority};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DlqEntry {
    pub id: Uuid,
    pub job_id: String,
    pub fingerprint: String,
    pub target_name: String,
    pub target_type: String,
    pub error_message: String,
    pub error_type: JobErrorType,
    pub retry_count: u32,
    pub priority: Priority,
    pub failed_at: DateTime<Utc>,
    pub replayed: bool,
    pub replayed_at: Option<DateTime<Utc>>,
}

impl DlqEntry {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        job_id: impl Into<String>,
        fingerprint: impl Into<String>,
        target_name: impl Into<String>,
        target_type: impl Into<String>,
        error_message: impl Into<String>,
        error_type: JobErrorType,
        retry_count: u32,
        priority: Priority,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            job_id: job_id.into(),
            fingerprint: fingerprint.into(),
            target_name: target_name.into(),
            target_type: target_type.into(),
            error_message: error_message.into(),
            error_type,
            retry_count,
            priority,
            failed_at: Utc::now(),
            replayed: false,
            replayed_at: None,
        }
    }

    pub fn mark_replayed(&mut self) {
        self.replayed = true;
        self.replayed_at = Some(Utc::now());
    }
}

/// Conjunctive filter set for `DlqStore::list`.
#[derive(Debug, Clone, Default)]
pub struct DlqFilter {
    pub target_name: Option<String>,
    pub error_type: Option<JobErrorType>,
    pub priority: Option<Priority>,
    pub replayed: Option<bool>,
}

impl DlqFilter {
    pub fn matches(&self, entry: &DlqEntry) -> bool {
        if let Some(ref name) = self.target_name {
            if &entry.target_name != name {
                return false;
            }
        }
        if let Some(error_type) = self.error_type {
            if entry.error_type != error_type {
                return false;
            }
        }
        if let Some(priority) = self.priority {
            if entry.priority != priority {
                return false;
            }
        }
        if let Some(replayed) = self.replayed {
            if entry.replayed != replayed {
                return false;
            }
        }
        true
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DlqStats {
    pub total: u64,
    pub by_error_type: std::collections::HashMap<String, u64>,
    pub by_target: std::collections::HashMap<String, u64>,
    pub by_priority: std::collections::HashMap<String, u64>,
    pub replayed_count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mark_replayed_sets_timestamp() {
        let mut entry = DlqEntry::new(
            "fp-1:team-a",
            "fp-1",
            "team-a",
            "slack",
            "404 not found",
            JobErrorType::Permanent,
            0,
            Priority::High,
        );
        assert!(!entry.replayed);
        entry.mark_replayed();
        assert!(entry.replayed);
        assert!(entry.replayed_at.is_some());
    }

    #[test]
    fn filter_matches_conjunction() {
        let entry = DlqEntry::new(
            "fp-1:team-a",
            "fp-1",
            "team-a",
            "slack",
            "boom",
            JobErrorType::Permanent,
            0,
            Priority::High,
        );
        let filter = DlqFilter {
            target_name: Some("team-a".into()),
            error_type: Some(JobErrorType::Permanent),
            ..Default::default()
        };
        assert!(filter.matches(&entry));

        let mismatched = DlqFilter {
            target_name: Some("team-b".into()),
            ..Default::default()
        };
        assert!(!mismatched.matches(&entry));
    }
}
