//! Six-phase reload coordinator: load & parse, validate, diff,
//! atomic apply under a distributed lock, parallel component reload, then
//! a health check — with rollback to the previous document if the last two
//! phases find the new config doesn't actually work.
//!
//! Uses a validate-then-commit ordering: nothing is applied until it has
//! validated clean, and nothing is left applied if it fails to come up
//! healthy.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use alert_store::{ConfigStore, LockManager};
use alert_types::config::AuditAction;
use alert_types::ctx::Ctx;
use alert_types::error::AlertError;
use alert_types::{ConfigDiff, ConfigSource};

use crate::diff::compare;
use crate::live::LiveConfig;
use crate::reload_registry::{ComponentReloadError, ReloadRegistry, DEFAULT_COMPONENT_TIMEOUT};
use crate::validator::{validate, validate_diff, ErrorDetail};

/// Budget for holding the reload lock.
pub const DEFAULT_LOCK_TTL: Duration = Duration::from_secs(30);
const LOCK_KEY: &str = "config-reload";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadStatus {
    Success,
    LoadFailed,
    ValidationFailed,
    ApplyFailed,
    RollbackFailed,
}

#[derive(Debug, Clone, Copy)]
pub enum ConfigFormat {
    Json,
    Yaml,
}

impl ConfigFormat {
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_ascii_lowercase().as_str() {
            "yaml" | "yml" => ConfigFormat::Yaml,
            _ => ConfigFormat::Json,
        }
    }

    fn parse(self, raw: &str) -> Result<Value, AlertError> {
        match self {
            ConfigFormat::Json => serde_json::from_str(raw).map_err(|e| AlertError::Validation(format!("invalid json: {e}"))),
            ConfigFormat::Yaml => serde_yaml::from_str(raw).map_err(|e| AlertError::Validation(format!("invalid yaml: {e}"))),
        }
    }
}

/// Caller-supplied context for a single reload attempt.
#[derive(Debug, Clone, Default)]
pub struct ApplyMeta {
    pub user_id: Option<String>,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    pub description: Option<String>,
    pub ticket: Option<String>,
    pub sections: Option<Vec<String>>,
    /// Validate and diff only; never touches the store or live config.
    pub dry_run: bool,
    /// Accept `validate_diff`'s critical-field / dangerous-downgrade
    /// warnings instead of rejecting the reload outright.
    pub force: bool,
}

#[derive(Debug, Clone)]
pub struct ReloadResult {
    pub status: ReloadStatus,
    pub version: u64,
    pub dry_run: bool,
    pub rolled_back: bool,
    pub validation_errors: Vec<ErrorDetail>,
    pub reload_errors: Vec<ComponentReloadError>,
    pub rollback_errors: Vec<ComponentReloadError>,
    pub diff: Option<ConfigDiff>,
    pub duration_ms: u64,
    pub phase_durations_ms: BTreeMap<String, u64>,
}

impl ReloadResult {
    fn load_failed(message: String, started: Instant) -> Self {
        Self {
            status: ReloadStatus::LoadFailed,
            version: 0,
            dry_run: false,
            rolled_back: false,
            validation_errors: vec![ErrorDetail::top_level("parse", message, "load_failed")],
            reload_errors: Vec::new(),
            rollback_errors: Vec::new(),
            diff: None,
            duration_ms: started.elapsed().as_millis() as u64,
            phase_durations_ms: BTreeMap::new(),
        }
    }
}

/// A health probe run as the last reload phase. `AlwaysHealthy` is the
/// default when no liveness signal is wired up.
#[async_trait]
pub trait HealthProbe: Send + Sync {
    async fn check(&self, ctx: &Ctx) -> Result<(), AlertError>;
}

pub struct AlwaysHealthy;

#[async_trait]
impl HealthProbe for AlwaysHealthy {
    async fn check(&self, _ctx: &Ctx) -> Result<(), AlertError> {
        Ok(())
    }
}

pub struct ReloadCoordinator {
    config_store: Arc<dyn ConfigStore>,
    lock_manager: Arc<dyn LockManager>,
    live: Arc<LiveConfig>,
    registry: Arc<ReloadRegistry>,
    health_probe: Arc<dyn HealthProbe>,
    component_timeout: Duration,
    lock_ttl: Duration,
}

impl ReloadCoordinator {
    pub fn new(
        config_store: Arc<dyn ConfigStore>,
        lock_manager: Arc<dyn LockManager>,
        live: Arc<LiveConfig>,
        registry: Arc<ReloadRegistry>,
        health_probe: Arc<dyn HealthProbe>,
    ) -> Self {
        Self {
            config_store,
            lock_manager,
            live,
            registry,
            health_probe,
            component_timeout: DEFAULT_COMPONENT_TIMEOUT,
            lock_ttl: DEFAULT_LOCK_TTL,
        }
    }

    pub fn with_component_timeout(mut self, timeout: Duration) -> Self {
        self.component_timeout = timeout;
        self
    }

    /// Read a document off disk, parse it by its extension, and apply it.
    pub async fn reload_from_file(&self, ctx: &Ctx, path: &str, source: ConfigSource, meta: ApplyMeta) -> ReloadResult {
        let started = Instant::now();
        let raw = match tokio::fs::read_to_string(path).await {
            Ok(raw) => raw,
            Err(err) => return ReloadResult::load_failed(format!("reading {path}: {err}"), started),
        };
        let format = ConfigFormat::from_extension(path.rsplit('.').next().unwrap_or(""));
        self.apply_document(ctx, &raw, format, source, meta).await
    }

    /// Parse raw text and apply it.
    pub async fn apply_document(&self, ctx: &Ctx, raw: &str, format: ConfigFormat, source: ConfigSource, meta: ApplyMeta) -> ReloadResult {
        let started = Instant::now();
        let new_cfg = match format.parse(raw) {
            Ok(v) => v,
            Err(err) => return ReloadResult::load_failed(err.to_string(), started),
        };
        self.apply(ctx, new_cfg, source, meta).await
    }

    /// Validate, diff, apply, reload, and health-check an already-parsed document.
    pub async fn apply(&self, ctx: &Ctx, new_cfg: Value, source: ConfigSource, meta: ApplyMeta) -> ReloadResult {
        let started = Instant::now();
        let mut phase_durations_ms = BTreeMap::new();

        // Phase 2: validate.
        let phase_started = Instant::now();
        let sections = meta.sections.as_deref();
        let mut validation_errors = validate(&new_cfg, sections);
        phase_durations_ms.insert("validate".to_string(), phase_started.elapsed().as_millis() as u64);
        if !validation_errors.is_empty() {
            return ReloadResult {
                status: ReloadStatus::ValidationFailed,
                version: self.live.version(),
                dry_run: meta.dry_run,
                rolled_back: false,
                validation_errors,
                reload_errors: Vec::new(),
                rollback_errors: Vec::new(),
                diff: None,
                duration_ms: started.elapsed().as_millis() as u64,
                phase_durations_ms,
            };
        }

        // Phase 3: diff.
        let phase_started = Instant::now();
        let old_cfg = self.live.current();
        let diff = compare(&old_cfg, &new_cfg, sections);
        let diff_errors = validate_diff(&old_cfg, &new_cfg, &diff);
        phase_durations_ms.insert("diff".to_string(), phase_started.elapsed().as_millis() as u64);

        if !diff_errors.is_empty() && !meta.force {
            validation_errors.extend(diff_errors);
            return ReloadResult {
                status: ReloadStatus::ValidationFailed,
                version: self.live.version(),
                dry_run: meta.dry_run,
                rolled_back: false,
                validation_errors,
                reload_errors: Vec::new(),
                rollback_errors: Vec::new(),
                diff: Some(diff),
                duration_ms: started.elapsed().as_millis() as u64,
                phase_durations_ms,
            };
        }

        if diff.is_empty() || meta.dry_run {
            return ReloadResult {
                status: ReloadStatus::Success,
                version: self.live.version(),
                dry_run: meta.dry_run,
                rolled_back: false,
                validation_errors: Vec::new(),
                reload_errors: Vec::new(),
                rollback_errors: Vec::new(),
                diff: Some(diff),
                duration_ms: started.elapsed().as_millis() as u64,
                phase_durations_ms,
            };
        }

        // Phase 4: atomic apply under a distributed lock.
        let phase_started = Instant::now();
        let lock = match self.lock_manager.acquire(ctx, LOCK_KEY, self.lock_ttl).await {
            Ok(lock) => lock,
            Err(err) => {
                let err: AlertError = err.into();
                return ReloadResult {
                    status: ReloadStatus::ApplyFailed,
                    version: self.live.version(),
                    dry_run: false,
                    rolled_back: false,
                    validation_errors: vec![ErrorDetail::top_level("lock", err.to_string(), "lock_conflict")],
                    reload_errors: Vec::new(),
                    rollback_errors: Vec::new(),
                    diff: Some(diff),
                    duration_ms: started.elapsed().as_millis() as u64,
                    phase_durations_ms,
                };
            }
        };

        let _ = self.config_store.backup(&old_cfg).await;
        let old_version = self.live.version();
        let save_result = self
            .config_store
            .save(new_cfg.clone(), meta.user_id.clone(), source, meta.description.clone(), meta.ticket.clone())
            .await;
        let new_version = match save_result {
            Ok(version) => version.version,
            Err(err) => {
                let _ = lock.release(ctx).await;
                let err: AlertError = err.into();
                return ReloadResult {
                    status: ReloadStatus::ApplyFailed,
                    version: old_version,
                    dry_run: false,
                    rolled_back: false,
                    validation_errors: vec![ErrorDetail::top_level("store", err.to_string(), "save_failed")],
                    reload_errors: Vec::new(),
                    rollback_errors: Vec::new(),
                    diff: Some(diff),
                    duration_ms: started.elapsed().as_millis() as u64,
                    phase_durations_ms,
                };
            }
        };
        self.live.publish(new_cfg.clone(), new_version);

        let audit_action = if source == ConfigSource::Rollback { AuditAction::Rollback } else { AuditAction::Update };
        let _ = self
            .config_store
            .save_audit(alert_types::AuditLogEntry {
                id: Uuid::new_v4(),
                version: new_version,
                action: audit_action,
                user_id: meta.user_id.clone(),
                ip: meta.ip.clone(),
                user_agent: meta.user_agent.clone(),
                diff: Some(diff.clone()),
                sections: meta.sections.clone().unwrap_or_default(),
                dry_run: false,
                success: true,
                error_message: None,
                duration_ms: started.elapsed().as_millis() as u64,
                created_at: chrono::Utc::now(),
            })
            .await;
        let _ = lock.release(ctx).await;
        phase_durations_ms.insert("apply".to_string(), phase_started.elapsed().as_millis() as u64);

        // Phase 5: parallel component reload.
        let phase_started = Instant::now();
        let reload_errors = self
            .registry
            .reload_all(ctx, &new_cfg, Some(diff.affected.as_slice()), self.component_timeout)
            .await;
        phase_durations_ms.insert("component_reload".to_string(), phase_started.elapsed().as_millis() as u64);
        let critical_failure = reload_errors.iter().any(|e| e.critical);

        // Phase 6: health check.
        let phase_started = Instant::now();
        let health_result = if critical_failure { Err(AlertError::Internal("skipped: critical component reload failure".into())) } else { self.health_probe.check(ctx).await };
        phase_durations_ms.insert("health_check".to_string(), phase_started.elapsed().as_millis() as u64);

        if !critical_failure && health_result.is_ok() {
            return ReloadResult {
                status: ReloadStatus::Success,
                version: new_version,
                dry_run: false,
                rolled_back: false,
                validation_errors: Vec::new(),
                reload_errors,
                rollback_errors: Vec::new(),
                diff: Some(diff),
                duration_ms: started.elapsed().as_millis() as u64,
                phase_durations_ms,
            };
        }

        // Roll back: restore the previous document and ask every component
        // to reload it too, then record the failed attempt.
        self.live.publish((*old_cfg).clone(), old_version);
        let rollback_errors = self.registry.reload_all(ctx, &old_cfg, None, self.component_timeout).await;
        let rollback_clean = rollback_errors.iter().all(|e| !e.critical);

        let error_message = health_result.err().map(|e| e.to_string()).unwrap_or_else(|| "critical component reload failure".to_string());
        let _ = self
            .config_store
            .save_audit(alert_types::AuditLogEntry {
                id: Uuid::new_v4(),
                version: old_version,
                action: AuditAction::Rollback,
                user_id: meta.user_id,
                ip: meta.ip,
                user_agent: meta.user_agent,
                diff: Some(diff.clone()),
                sections: meta.sections.unwrap_or_default(),
                dry_run: false,
                success: false,
                error_message: Some(error_message),
                duration_ms: started.elapsed().as_millis() as u64,
                created_at: chrono::Utc::now(),
            })
            .await;

        ReloadResult {
            status: if rollback_clean { ReloadStatus::ApplyFailed } else { ReloadStatus::RollbackFailed },
            version: old_version,
            dry_run: false,
            rolled_back: true,
            validation_errors: Vec::new(),
            reload_errors,
            rollback_errors,
            diff: Some(diff),
            duration_ms: started.elapsed().as_millis() as u64,
            phase_durations_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alert_store::{MemoryConfigStore, MemoryLockManager};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct AlwaysFailingHealth;
    #[async_trait]
    impl HealthProbe for AlwaysFailingHealth {
        async fn check(&self, _ctx: &Ctx) -> Result<(), AlertError> {
            Err(AlertError::Unavailable("probe down".into()))
        }
    }

    struct Recording {
        name: &'static str,
        critical: bool,
        reloaded: Arc<AtomicBool>,
    }

    #[async_trait]
    impl crate::reload_registry::ReloadComponent for Recording {
        fn name(&self) -> &str {
            self.name
        }
        fn is_critical(&self) -> bool {
            self.critical
        }
        async fn reload(&self, _ctx: &Ctx, _new_cfg: &Value) -> Result<(), AlertError> {
            self.reloaded.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    fn coordinator(health: Arc<dyn HealthProbe>, components: Vec<Arc<dyn crate::reload_registry::ReloadComponent>>) -> ReloadCoordinator {
        let live = Arc::new(LiveConfig::new(json!({"server": {"port": 8080}}), 1));
        ReloadCoordinator::new(
            Arc::new(MemoryConfigStore::new()),
            Arc::new(MemoryLockManager::new()),
            live,
            Arc::new(ReloadRegistry::new(components)),
            health,
        )
    }

    #[tokio::test]
    async fn successful_reload_publishes_new_config_and_bumps_version() {
        let coordinator = coordinator(Arc::new(AlwaysHealthy), vec![]);
        let result = coordinator
            .apply(&Ctx::background(), json!({"server": {"port": 9090}}), ConfigSource::Api, ApplyMeta::default())
            .await;
        assert_eq!(result.status, ReloadStatus::Success);
        assert!(!result.rolled_back);
        assert_eq!(result.version, 2);
        assert_eq!(coordinator.live.current()["server"]["port"], 9090);
    }

    #[tokio::test]
    async fn no_op_reload_is_a_success_without_touching_the_store() {
        let coordinator = coordinator(Arc::new(AlwaysHealthy), vec![]);
        let result = coordinator
            .apply(&Ctx::background(), json!({"server": {"port": 8080}}), ConfigSource::Api, ApplyMeta::default())
            .await;
        assert_eq!(result.status, ReloadStatus::Success);
        assert_eq!(result.version, 1);
    }

    #[tokio::test]
    async fn dry_run_validates_and_diffs_without_applying() {
        let coordinator = coordinator(Arc::new(AlwaysHealthy), vec![]);
        let meta = ApplyMeta { dry_run: true, ..Default::default() };
        let result = coordinator.apply(&Ctx::background(), json!({"server": {"port": 9090}}), ConfigSource::Api, meta).await;
        assert_eq!(result.status, ReloadStatus::Success);
        assert!(result.dry_run);
        assert_eq!(coordinator.live.current()["server"]["port"], 8080);
    }

    #[tokio::test]
    async fn failing_health_check_rolls_back_to_the_previous_document() {
        let coordinator = coordinator(Arc::new(AlwaysFailingHealth), vec![]);
        let result = coordinator
            .apply(&Ctx::background(), json!({"server": {"port": 9090}}), ConfigSource::Api, ApplyMeta::default())
            .await;
        assert_eq!(result.status, ReloadStatus::ApplyFailed);
        assert!(result.rolled_back);
        assert_eq!(coordinator.live.current()["server"]["port"], 8080);
        assert_eq!(coordinator.live.version(), 1);
    }

    #[tokio::test]
    async fn critical_component_reloads_on_a_valid_change_to_a_critical_field() {
        let reloaded = Arc::new(AtomicBool::new(false));
        let components: Vec<Arc<dyn crate::reload_registry::ReloadComponent>> = vec![Arc::new(Recording {
            name: "server",
            critical: true,
            reloaded: reloaded.clone(),
        })];
        let coordinator = coordinator(Arc::new(AlwaysHealthy), components);
        let new_cfg = json!({
            "environment": "development",
            "profile": "standard",
            "server": {"port": 9090},
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
        });
        // `server.port` is a critical field, so the change is only accepted
        // with `force` — but it's a clean reload: no component fails, so
        // this stays committed rather than rolling back.
        let result = coordinator
            .apply(&Ctx::background(), new_cfg, ConfigSource::Api, ApplyMeta { force: true, ..Default::default() })
            .await;
        assert_eq!(result.status, ReloadStatus::Success);
        assert!(!result.rolled_back);
        assert!(reloaded.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn critical_component_failure_triggers_rollback_and_reloads_components_with_old_config() {
        struct FailsOnNewConfig;
        #[async_trait]
        impl crate::reload_registry::ReloadComponent for FailsOnNewConfig {
            fn name(&self) -> &str {
                "database"
            }
            fn is_critical(&self) -> bool {
                true
            }
            async fn reload(&self, _ctx: &Ctx, new_cfg: &Value) -> Result<(), AlertError> {
                if new_cfg["server"]["port"] == json!(9090) {
                    Err(AlertError::Internal("database pool rejected the new config".into()))
                } else {
                    Ok(())
                }
            }
        }
        let components: Vec<Arc<dyn crate::reload_registry::ReloadComponent>> = vec![Arc::new(FailsOnNewConfig)];
        let coordinator = coordinator(Arc::new(AlwaysHealthy), components);
        let new_cfg = json!({
            "environment": "development",
            "profile": "standard",
            "server": {"port": 9090},
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
        });
        let result = coordinator
            .apply(&Ctx::background(), new_cfg, ConfigSource::Api, ApplyMeta { force: true, ..Default::default() })
            .await;
        assert_eq!(result.status, ReloadStatus::ApplyFailed);
        assert!(result.rolled_back);
        assert_eq!(coordinator.live.current()["server"]["port"], 8080);
        assert_eq!(coordinator.live.version(), 1);
        assert!(!result.reload_errors.is_empty());
    }
}
