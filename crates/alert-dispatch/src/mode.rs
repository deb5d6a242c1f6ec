//! Mode manager: tracks whether any publishing target is enabled and
//! flips the coordinator between `normal` and `metrics-only` operation.
//!
//! Modeled as one-way notification: the registry exposes an observable
//! enabled-target count, the mode manager reads it and publishes its own
//! snapshot, and the coordinator reads the mode manager's snapshot. No
//! back-pointer from registry to mode manager.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

/// Evaluation tick interval.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Normal,
    MetricsOnly,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModeSnapshot {
    pub mode: Mode,
    pub targets_available: bool,
    pub enabled_targets: usize,
    pub metrics_only_active: bool,
    pub transition_count: u64,
    pub current_mode_duration_seconds: i64,
    pub last_transition_time: Option<DateTime<Utc>>,
    pub last_transition_reason: Option<String>,
}

impl ModeSnapshot {
    fn etag(&self) -> String {
        format!("\"{:?}-{}-{}\"", self.mode, self.enabled_targets, self.transition_count).to_lowercase()
    }
}

struct Inner {
    mode: Mode,
    enabled_targets: usize,
    transition_count: u64,
    mode_since: DateTime<Utc>,
    last_transition_time: Option<DateTime<Utc>>,
    last_transition_reason: Option<String>,
    /// The mode the hysteresis window has most recently observed as the
    /// target; only commits to `mode` once it has held for one full tick.
    pending: Option<Mode>,
}

impl Inner {
    fn snapshot(&self) -> ModeSnapshot {
        ModeSnapshot {
            mode: self.mode,
            targets_available: self.enabled_targets > 0,
            enabled_targets: self.enabled_targets,
            metrics_only_active: matches!(self.mode, Mode::MetricsOnly),
            transition_count: self.transition_count,
            current_mode_duration_seconds: (Utc::now() - self.mode_since).num_seconds().max(0),
            last_transition_time: self.last_transition_time,
            last_transition_reason: self.last_transition_reason.clone(),
        }
    }
}

/// Deterministic target-mode rule: zero enabled targets means
/// metrics-only, any enabled target means normal.
fn target_mode(enabled_targets: usize) -> (Mode, &'static str) {
    if enabled_targets == 0 {
        (Mode::MetricsOnly, "no_enabled_targets")
    } else {
        (Mode::Normal, "targets_available")
    }
}

/// Observes "enabled target count" and publishes a `normal`/`metrics-only`
/// snapshot, read without locking via a `watch` channel — the natural
/// extension of this codebase's "publish new value, readers capture once"
/// pattern to a value with no owning writer thread.
pub struct ModeManager {
    tx: watch::Sender<ModeSnapshot>,
    rx: watch::Receiver<ModeSnapshot>,
    inner: std::sync::Mutex<Inner>,
    ticks_observed: AtomicU64,
}

impl ModeManager {
    pub fn new() -> Self {
        let initial = ModeSnapshot {
            mode: Mode::Normal,
            targets_available: true,
            enabled_targets: 0,
            metrics_only_active: false,
            transition_count: 0,
            current_mode_duration_seconds: 0,
            last_transition_time: None,
            last_transition_reason: None,
        };
        let (tx, rx) = watch::channel(initial);
        Self {
            tx,
            rx,
            inner: std::sync::Mutex::new(Inner {
                mode: Mode::Normal,
                enabled_targets: 0,
                transition_count: 0,
                mode_since: Utc::now(),
                last_transition_time: None,
                last_transition_reason: None,
                pending: None,
            }),
            ticks_observed: AtomicU64::new(0),
        }
    }

    /// Current published snapshot; readers never block.
    pub fn snapshot(&self) -> ModeSnapshot {
        self.rx.borrow().clone()
    }

    pub fn etag(&self) -> String {
        self.snapshot().etag()
    }

    pub fn is_metrics_only(&self) -> bool {
        matches!(self.snapshot().mode, Mode::MetricsOnly)
    }

    /// Evaluate one tick against the registry's current enabled-target
    /// count. A transition only commits once the target mode has held for
    /// at least one prior tick (hysteresis window), to avoid flapping.
    pub fn evaluate(&self, enabled_targets: usize) {
        let mut inner = self.inner.lock().unwrap();
        inner.enabled_targets = enabled_targets;
        let (target, reason) = target_mode(enabled_targets);

        if target == inner.mode {
            inner.pending = None;
        } else if inner.pending == Some(target) {
            inner.mode = target;
            inner.transition_count += 1;
            inner.mode_since = Utc::now();
            inner.last_transition_time = Some(Utc::now());
            inner.last_transition_reason = Some(reason.to_string());
            inner.pending = None;
        } else {
            inner.pending = Some(target);
        }

        let snapshot = inner.snapshot();
        drop(inner);
        let _ = self.tx.send(snapshot);
    }

    /// Spawns the periodic tick coroutine. `registry_enabled_count` is
    /// polled once per tick; it is passed as a closure rather than a
    /// `TargetRegistry` reference so this module stays decoupled from the
    /// registry's concrete type.
    pub fn spawn_ticker<F>(self: std::sync::Arc<Self>, interval: Duration, registry_enabled_count: F) -> tokio::task::JoinHandle<()>
    where
        F: Fn() -> usize + Send + Sync + 'static,
    {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                self.ticks_observed.fetch_add(1, Ordering::Relaxed);
                self.evaluate(registry_enabled_count());
            }
        })
    }
}

impl Default for ModeManager {
    fn default() -> Self {
        Self::new()
    }
}
