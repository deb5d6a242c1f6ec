//! Reload components and health probe wired into the daemon's
//! `ReloadCoordinator`. Only sections owned by a concrete subsystem
//! in this workspace get a component; `database`, `redis`/`cache`,
//! `webhook` and `storage` name external collaborators this workspace only
//! specifies a storage contract for, so a config reload touching them is
//! accepted and diffed but has nothing further to drive.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use alert_classifier::ClassifierService;
use alert_config::reload_registry::ReloadComponent;
use alert_dispatch::TargetRegistry;
use alert_types::{AlertError, Ctx};

use crate::telemetry::{apply_directive, FilterHandle};

/// Re-discovers targets from the registry's configured `TargetSource` when
/// `targets` changes. The source itself (service discovery, a config file
/// watcher, ...) is the external collaborator; this component only drives
/// the refresh the registry already knows how to do.
pub struct PublishingReloadComponent {
    registry: Arc<TargetRegistry>,
}

impl PublishingReloadComponent {
    pub fn new(registry: Arc<TargetRegistry>) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl ReloadComponent for PublishingReloadComponent {
    fn name(&self) -> &str {
        "publishing"
    }

    fn is_critical(&self) -> bool {
        false
    }

    async fn reload(&self, ctx: &Ctx, _new_cfg: &Value) -> Result<(), AlertError> {
        self.registry.refresh_now(ctx).await.map_err(Into::into)
    }
}

/// Applies `llm.timeout_seconds` to the live classifier without restarting
/// it.
pub struct ClassifierReloadComponent {
    classifier: Arc<ClassifierService>,
}

impl ClassifierReloadComponent {
    pub fn new(classifier: Arc<ClassifierService>) -> Self {
        Self { classifier }
    }
}

#[async_trait]
impl ReloadComponent for ClassifierReloadComponent {
    fn name(&self) -> &str {
        "classifier"
    }

    fn is_critical(&self) -> bool {
        false
    }

    async fn reload(&self, _ctx: &Ctx, new_cfg: &Value) -> Result<(), AlertError> {
        if let Some(secs) = new_cfg.get("llm").and_then(|llm| llm.get("timeout_seconds")).and_then(Value::as_f64) {
            if secs <= 0.0 {
                return Err(AlertError::Validation("llm.timeout_seconds must be positive".into()));
            }
            self.classifier.set_classify_timeout(Duration::from_secs_f64(secs));
        }
        Ok(())
    }
}

/// Swaps the process-wide tracing filter when `logging.level`/`logging.filter`
/// changes. `logging.filter` (an `EnvFilter` directive string) takes
/// precedence over `logging.level` (a single level name) when both are set.
pub struct LoggingReloadComponent {
    handle: FilterHandle,
}

impl LoggingReloadComponent {
    pub fn new(handle: FilterHandle) -> Self {
        Self { handle }
    }
}

#[async_trait]
impl ReloadComponent for LoggingReloadComponent {
    fn name(&self) -> &str {
        "logging"
    }

    fn is_critical(&self) -> bool {
        false
    }

    async fn reload(&self, _ctx: &Ctx, new_cfg: &Value) -> Result<(), AlertError> {
        let directive = new_cfg
            .get("logging")
            .and_then(|logging| logging.get("filter").or_else(|| logging.get("level")))
            .and_then(Value::as_str);
        let Some(directive) = directive else {
            return Ok(());
        };
        apply_directive(&self.handle, directive).map_err(AlertError::Validation)
    }
}
