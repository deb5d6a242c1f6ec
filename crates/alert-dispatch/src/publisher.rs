//! The primary (HTTP) publish path.
//!
//! The concrete downstream (Rootly, PagerDuty, Slack, a bare webhook) is an
//! external collaborator; this crate only specifies `TargetPublisher` plus a
//! deadline-bound caller. `HttpTargetPublisher` is a vendor-agnostic
//! concrete implementation good enough to run the daemon standalone against
//! any target that accepts a JSON POST — the same "ship a working default
//! alongside the contract" shape as `alert-classifier`'s
//! `HttpClassificationProvider`. Tests substitute a stub implementation
//! instead.

use std::time::Duration;

use async_trait::async_trait;

use alert_types::{Ctx, Job};

use crate::queue::{PublishOutcome, TargetPublisher};

/// Posts the job's enriched alert to `job.target.url` as JSON, carrying
/// through any headers configured on the target. A target's own `format`
/// field is reserved for payload-shaping (Slack blocks, PagerDuty events
/// API, ...) that a richer publisher would apply before sending; this
/// reference implementation always sends the enriched alert verbatim.
pub struct HttpTargetPublisher {
    client: reqwest::Client,
}

impl HttpTargetPublisher {
    pub fn new() -> Self {
        Self { client: reqwest::Client::new() }
    }
}

impl Default for HttpTargetPublisher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TargetPublisher for HttpTargetPublisher {
    async fn publish(&self, ctx: &Ctx, job: &Job) -> PublishOutcome {
        let timeout = ctx.timeout().unwrap_or(Duration::from_secs(10));
        let mut request = self.client.post(&job.target.url).json(&job.alert).timeout(timeout);
        for (name, value) in &job.target.headers {
            request = request.header(name, value);
        }

        match request.send().await {
            Ok(response) => {
                let status = response.status();
                PublishOutcome {
                    success: status.is_success(),
                    status_code: Some(status.as_u16()),
                    error: if status.is_success() { None } else { Some(format!("target returned {status}")) },
                }
            }
            Err(err) => PublishOutcome {
                success: false,
                status_code: None,
                error: Some(if err.is_timeout() {
                    format!("publish request timed out: {err}")
                } else {
                    format!("publish request failed: {err}")
                }),
            },
        }
    }
}

/// A publisher that always succeeds without making a request, used for
/// `/targets/{name}/test` against targets that should never actually fire
/// and for exercising the happy path in tests.
pub struct NoopPublisher;

#[async_trait]
impl TargetPublisher for NoopPublisher {
    async fn publish(&self, _ctx: &Ctx, _job: &Job) -> PublishOutcome {
        PublishOutcome { success: true, status_code: Some(200), error: None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alert_types::{Alert, AlertStatus, ClassificationResult, EnrichedAlert, PublishingTarget, Severity};
    use std::collections::HashMap;

    fn sample_job() -> Job {
        let alert = Alert::new(
            alert_types::Fingerprint::new("fp-1").unwrap(),
            "db-down",
            AlertStatus::Firing,
            chrono::Utc::now(),
            None,
            HashMap::new(),
            HashMap::new(),
            None,
        )
        .unwrap();
        let classification = ClassificationResult {
            severity: Severity::Critical,
            confidence: 0.9,
            reasoning: "test".into(),
            recommendations: vec![],
            processing_time: 0.01,
            metadata: HashMap::new(),
        };
        let target = PublishingTarget::new("t1", "webhook", "http://127.0.0.1:0/hook", true, "json", HashMap::new()).unwrap();
        Job::new(EnrichedAlert::new(alert, classification), target, 3)
    }

    #[tokio::test]
    async fn noop_publisher_always_succeeds() {
        let publisher = NoopPublisher;
        let outcome = publisher.publish(&Ctx::background(), &sample_job()).await;
        assert!(outcome.success);
    }

    #[tokio::test]
    async fn http_publisher_reports_connection_failure_as_unsuccessful() {
        let publisher = HttpTargetPublisher::new();
        let outcome = publisher.publish(&Ctx::background(), &sample_job()).await;
        assert!(!outcome.success);
        assert!(outcome.error.is_some());
    }
}
