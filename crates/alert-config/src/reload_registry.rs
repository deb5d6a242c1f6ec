//! Reload registry: the set of components that must pick up a new config
//! document, and the parallel-with-timeout orchestration that drives them
//!.
//!
//! Runs every component's reload regardless of earlier failures and
//! records a duration and an outcome per component, rather than aborting
//! the whole batch on the first error.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde_json::Value;

use alert_types::ctx::Ctx;
use alert_types::error::AlertError;

/// Default per-component budget inside `reload_all`.
pub const DEFAULT_COMPONENT_TIMEOUT: Duration = Duration::from_secs(10);

/// A subsystem that owns a slice of the live config and can pick up a new
/// document without restarting the process.
#[async_trait]
pub trait ReloadComponent: Send + Sync {
    /// Stable name, used to report which component reload failed and to
    /// scope a reload to `affected` sections.
    fn name(&self) -> &str;

    /// Critical components abort and roll back the whole reload on
    /// failure; non-critical components only log and report.
    fn is_critical(&self) -> bool;

    async fn reload(&self, ctx: &Ctx, new_cfg: &Value) -> Result<(), AlertError>;
}

/// One component's reload outcome.
#[derive(Debug, Clone)]
pub struct ComponentReloadError {
    pub component: String,
    pub critical: bool,
    pub message: String,
    pub duration_ms: u64,
}

pub struct ReloadRegistry {
    components: Vec<Arc<dyn ReloadComponent>>,
}

impl ReloadRegistry {
    pub fn new(components: Vec<Arc<dyn ReloadComponent>>) -> Self {
        Self { components }
    }

    pub fn components(&self) -> &[Arc<dyn ReloadComponent>] {
        &self.components
    }

    /// Reload every registered component whose name appears in `affected`
    /// (or every component, when `affected` is `None`), each under its own
    /// timeout, all running concurrently. Never aborts early: every
    /// selected component gets a chance to reload even after an earlier one
    /// fails, so a single bad component doesn't starve the others of the
    /// new document.
    pub async fn reload_all(
        &self,
        ctx: &Ctx,
        new_cfg: &Value,
        affected: Option<&[String]>,
        per_component_timeout: Duration,
    ) -> Vec<ComponentReloadError> {
        let selected: Vec<_> = self
            .components
            .iter()
            .filter(|c| affected.map(|a| a.iter().any(|n| n.as_str() == c.name())).unwrap_or(true))
            .cloned()
            .collect();

        let tasks = selected.into_iter().map(|component| {
            let ctx = ctx.clone();
            let new_cfg = new_cfg.clone();
            async move {
                let started = Instant::now();
                let outcome = tokio::time::timeout(per_component_timeout, component.reload(&ctx, &new_cfg)).await;
                let duration_ms = started.elapsed().as_millis() as u64;
                match outcome {
                    Ok(Ok(())) => None,
                    Ok(Err(err)) => Some(ComponentReloadError {
                        component: component.name().to_string(),
                        critical: component.is_critical(),
                        message: err.to_string(),
                        duration_ms,
                    }),
                    Err(_) => Some(ComponentReloadError {
                        component: component.name().to_string(),
                        critical: component.is_critical(),
                        message: format!("reload timed out after {per_component_timeout:?}"),
                        duration_ms,
                    }),
                }
            }
        });

        futures::future::join_all(tasks).await.into_iter().flatten().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::time::sleep;

    struct Counting {
        name: &'static str,
        critical: bool,
        calls: Arc<AtomicUsize>,
        fail: bool,
        hang: bool,
    }

    #[async_trait]
    impl ReloadComponent for Counting {
        fn name(&self) -> &str {
            self.name
        }

        fn is_critical(&self) -> bool {
            self.critical
        }

        async fn reload(&self, _ctx: &Ctx, _new_cfg: &Value) -> Result<(), AlertError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.hang {
                sleep(Duration::from_secs(60)).await;
            }
            if self.fail {
                return Err(AlertError::Internal("boom".into()));
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn all_components_reload_on_success() {
        let calls = Arc::new(AtomicUsize::new(0));
        let registry = ReloadRegistry::new(vec![
            Arc::new(Counting { name: "a", critical: false, calls: calls.clone(), fail: false, hang: false }),
            Arc::new(Counting { name: "b", critical: false, calls: calls.clone(), fail: false, hang: false }),
        ]);
        let errors = registry
            .reload_all(&Ctx::background(), &serde_json::json!({}), None, DEFAULT_COMPONENT_TIMEOUT)
            .await;
        assert!(errors.is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn one_failure_does_not_block_other_components() {
        let calls = Arc::new(AtomicUsize::new(0));
        let registry = ReloadRegistry::new(vec![
            Arc::new(Counting { name: "broken", critical: true, calls: calls.clone(), fail: true, hang: false }),
            Arc::new(Counting { name: "fine", critical: false, calls: calls.clone(), fail: false, hang: false }),
        ]);
        let errors = registry
            .reload_all(&Ctx::background(), &serde_json::json!({}), None, DEFAULT_COMPONENT_TIMEOUT)
            .await;
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].component, "broken");
        assert!(errors[0].critical);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn hanging_component_is_reported_as_timeout() {
        let calls = Arc::new(AtomicUsize::new(0));
        let registry = ReloadRegistry::new(vec![Arc::new(Counting {
            name: "slow",
            critical: false,
            calls,
            fail: false,
            hang: true,
        })]);
        let handle = tokio::spawn(async move {
            registry
                .reload_all(&Ctx::background(), &serde_json::json!({}), None, Duration::from_millis(50))
                .await
        });
        tokio::time::advance(Duration::from_millis(100)).await;
        let errors = handle.await.unwrap();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("timed out"));
    }

    #[tokio::test]
    async fn affected_filter_skips_unselected_components() {
        let calls = Arc::new(AtomicUsize::new(0));
        let registry = ReloadRegistry::new(vec![
            Arc::new(Counting { name: "database", critical: true, calls: calls.clone(), fail: false, hang: false }),
            Arc::new(Counting { name: "cache", critical: false, calls: calls.clone(), fail: false, hang: false }),
        ]);
        let affected = vec!["cache".to_string()];
        let errors = registry
            .reload_all(&Ctx::background(), &serde_json::json!({}), Some(&affected), DEFAULT_COMPONENT_TIMEOUT)
            .await;
        assert!(errors.is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
