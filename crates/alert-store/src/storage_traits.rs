//! Storage trait definitions.
//!
//! - `ConfigStore`: versioned configuration storage, backup and audit log
//!.
//! - `DlqStore`: durable dead-letter queue.
//! - `LockManager`: distributed lock contract.
//!
//! All traits are async and backend-agnostic; no concrete database is
//! chosen here. In-memory reference implementations live in `fakes`.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use alert_types::ctx::Ctx;
use alert_types::{AuditLogEntry, ConfigSource, ConfigVersion, DlqEntry, DlqFilter, DlqStats};

use crate::error::StorageError;

pub type StorageResult<T> = std::result::Result<T, StorageError>;

// ---------------------------------------------------------------------------
// ConfigStore
// ---------------------------------------------------------------------------

/// Versioned configuration storage.
///
/// Guarantees: `save` is atomic and `version` strictly increases;
/// `backup`/`save_audit` are best-effort (failures are logged by the
/// caller, never surfaced as fatal).
#[async_trait]
pub trait ConfigStore: Send + Sync {
    /// Persist a new config version, returning its assigned version number.
    async fn save(
        &self,
        config: Value,
        created_by: Option<String>,
        source: ConfigSource,
        description: Option<String>,
        ticket: Option<String>,
    ) -> StorageResult<ConfigVersion>;

    /// Load a specific config version.
    async fn load(&self, version: u64) -> StorageResult<ConfigVersion>;

    /// Highest stored version, or 0 when none exists.
    async fn latest_version(&self) -> StorageResult<u64>;

    /// Best-effort snapshot backup of a config document.
    async fn backup(&self, config: &Value) -> StorageResult<()>;

    /// Most recent `limit` versions, sorted newest first.
    async fn history(&self, limit: usize) -> StorageResult<Vec<ConfigVersion>>;

    /// Best-effort append to the audit trail.
    async fn save_audit(&self, entry: AuditLogEntry) -> StorageResult<()>;
}

// ---------------------------------------------------------------------------
// DlqStore
// ---------------------------------------------------------------------------

/// Durable record of permanently-failed jobs.
#[async_trait]
pub trait DlqStore: Send + Sync {
    async fn insert(&self, entry: DlqEntry) -> StorageResult<()>;

    /// Filtered, paginated listing. Returns the page plus the total
    /// matching count.
    async fn list(&self, filter: &DlqFilter, limit: usize) -> StorageResult<(Vec<DlqEntry>, usize)>;

    /// Mark an entry replayed, returning the entry as it stood before
    /// replay so the caller can rebuild and resubmit a `Job` from it.
    /// Errors with `AlreadyReplayed` if called twice.
    async fn mark_replayed(&self, id: Uuid) -> StorageResult<DlqEntry>;

    /// Delete entries that failed at least `older_than_hours` ago. Returns
    /// the number of entries deleted. `older_than_hours = 0` deletes
    /// nothing.
    async fn purge(&self, older_than_hours: i64) -> StorageResult<u64>;

    async fn stats(&self) -> StorageResult<DlqStats>;
}

// ---------------------------------------------------------------------------
// LockManager
// ---------------------------------------------------------------------------

/// A held lock. Holder identity is opaque to callers; the lock expires on
/// its own at `ttl` so a crashed holder cannot wedge it forever.
#[async_trait]
pub trait Lock: Send + Sync {
    async fn release(&self, ctx: &Ctx) -> StorageResult<()>;

    async fn renew(&self, ctx: &Ctx, ttl: Duration) -> StorageResult<()>;

    fn is_held(&self) -> bool;

    fn key(&self) -> &str;
}

/// Distributed lock provider. The concrete backend (Redis, Postgres
/// advisory locks, ...) is outside this workspace's scope; this trait plus
/// the in-memory fake let the reload coordinator run standalone.
#[async_trait]
pub trait LockManager: Send + Sync {
    /// Acquire `key` for `ttl`. Returns `StorageError::LockConflict` if
    /// another holder currently holds it; never silently succeeds while a
    /// live holder exists.
    async fn acquire(&self, ctx: &Ctx, key: &str, ttl: Duration) -> StorageResult<Box<dyn Lock>>;
}
