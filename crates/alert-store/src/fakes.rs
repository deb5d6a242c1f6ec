//! In-memory reference implementations of the storage traits.
//!
//! Good enough to run the daemon standalone and to exercise every contract
//! in `tests/trait_contracts.rs`; not meant to survive a process restart.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use alert_types::ctx::Ctx;
use alert_types::{AuditLogEntry, ConfigSource, ConfigVersion, DlqEntry, DlqFilter, DlqStats};

use crate::error::StorageError;
use crate::storage_traits::{ConfigStore, DlqStore, Lock, LockManager, StorageResult};

fn canonical_hash(config: &Value) -> String {
    let canonical = serde_json::to_vec(config).unwrap_or_default();
    let mut hasher = Sha256::new();
    hasher.update(&canonical);
    hex::encode(hasher.finalize())
}

// ---------------------------------------------------------------------------
// MemoryConfigStore
// ---------------------------------------------------------------------------

#[derive(Default)]
struct ConfigStoreInner {
    versions: Vec<ConfigVersion>,
    backups: Vec<Value>,
    audit_log: Vec<AuditLogEntry>,
}

/// In-memory `ConfigStore` backed by an append-only `Vec<ConfigVersion>`,
/// the same append-then-read-latest idiom a versioned release registry
/// uses.
#[derive(Default)]
pub struct MemoryConfigStore {
    inner: Mutex<ConfigStoreInner>,
}

impl MemoryConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn backup_count(&self) -> usize {
        self.inner.lock().unwrap().backups.len()
    }

    pub fn audit_count(&self) -> usize {
        self.inner.lock().unwrap().audit_log.len()
    }
}

#[async_trait]
impl ConfigStore for MemoryConfigStore {
    async fn save(
        &self,
        config: Value,
        created_by: Option<String>,
        source: ConfigSource,
        description: Option<String>,
        ticket: Option<String>,
    ) -> StorageResult<ConfigVersion> {
        let mut inner = self.inner.lock().unwrap();
        let previous_version = inner.versions.last().map(|v| v.version);
        let version = previous_version.unwrap_or(0) + 1;
        let record = ConfigVersion {
            version,
            hash: canonical_hash(&config),
            config,
            created_at: Utc::now(),
            created_by,
            source,
            description,
            ticket,
            previous_version,
            diff: None,
        };
        inner.versions.push(record.clone());
        Ok(record)
    }

    async fn load(&self, version: u64) -> StorageResult<ConfigVersion> {
        let inner = self.inner.lock().unwrap();
        inner
            .versions
            .iter()
            .find(|v| v.version == version)
            .cloned()
            .ok_or(StorageError::VersionNotFound { version })
    }

    async fn latest_version(&self) -> StorageResult<u64> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.versions.last().map(|v| v.version).unwrap_or(0))
    }

    async fn backup(&self, config: &Value) -> StorageResult<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.backups.push(config.clone());
        Ok(())
    }

    async fn history(&self, limit: usize) -> StorageResult<Vec<ConfigVersion>> {
        let inner = self.inner.lock().unwrap();
        let mut versions = inner.versions.clone();
        versions.sort_by(|a, b| b.version.cmp(&a.version));
        versions.truncate(limit);
        Ok(versions)
    }

    async fn save_audit(&self, entry: AuditLogEntry) -> StorageResult<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.audit_log.push(entry);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// MemoryDlqStore
// ---------------------------------------------------------------------------

/// In-memory `DlqStore` backed by a `HashMap<Uuid, DlqEntry>`.
#[derive(Default)]
pub struct MemoryDlqStore {
    entries: Mutex<HashMap<Uuid, DlqEntry>>,
}

impl MemoryDlqStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DlqStore for MemoryDlqStore {
    async fn insert(&self, entry: DlqEntry) -> StorageResult<()> {
        let mut entries = self.entries.lock().unwrap();
        entries.insert(entry.id, entry);
        Ok(())
    }

    async fn list(&self, filter: &DlqFilter, limit: usize) -> StorageResult<(Vec<DlqEntry>, usize)> {
        let entries = self.entries.lock().unwrap();
        let mut matching: Vec<DlqEntry> = entries
            .values()
            .filter(|e| filter.matches(e))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.failed_at.cmp(&a.failed_at));
        let total = matching.len();
        matching.truncate(limit);
        Ok((matching, total))
    }

    async fn mark_replayed(&self, id: Uuid) -> StorageResult<DlqEntry> {
        let mut entries = self.entries.lock().unwrap();
        let entry = entries
            .get_mut(&id)
            .ok_or_else(|| StorageError::DlqEntryNotFound { id: id.to_string() })?;
        if entry.replayed {
            return Err(StorageError::AlreadyReplayed { id: id.to_string() });
        }
        let before = entry.clone();
        entry.mark_replayed();
        Ok(before)
    }

    async fn purge(&self, older_than_hours: i64) -> StorageResult<u64> {
        if older_than_hours <= 0 {
            return Ok(0);
        }
        let cutoff = Utc::now() - chrono::Duration::hours(older_than_hours);
        let mut entries = self.entries.lock().unwrap();
        let before = entries.len();
        entries.retain(|_, e| e.failed_at > cutoff);
        Ok((before - entries.len()) as u64)
    }

    async fn stats(&self) -> StorageResult<DlqStats> {
        let entries = self.entries.lock().unwrap();
        let mut stats = DlqStats {
            total: entries.len() as u64,
            ..Default::default()
        };
        for entry in entries.values() {
            *stats
                .by_error_type
                .entry(format!("{:?}", entry.error_type).to_lowercase())
                .or_default() += 1;
            *stats.by_target.entry(entry.target_name.clone()).or_default() += 1;
            *stats
                .by_priority
                .entry(format!("{:?}", entry.priority).to_lowercase())
                .or_default() += 1;
            if entry.replayed {
                stats.replayed_count += 1;
            }
        }
        Ok(stats)
    }
}

// ---------------------------------------------------------------------------
// MemoryLockManager
// ---------------------------------------------------------------------------

struct LockState {
    holder_id: Uuid,
    expires_at: DateTime<Utc>,
}

type LockTable = Arc<Mutex<HashMap<String, LockState>>>;

/// In-memory `LockManager` backed by a `Mutex<HashMap<String, LockState>>`,
/// the same shared-map-guarded-by-a-single-mutex idiom as the other fakes
/// in this crate.
#[derive(Default)]
pub struct MemoryLockManager {
    locks: LockTable,
}

impl MemoryLockManager {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LockManager for MemoryLockManager {
    async fn acquire(&self, _ctx: &Ctx, key: &str, ttl: Duration) -> StorageResult<Box<dyn Lock>> {
        let mut locks = self.locks.lock().unwrap();
        if let Some(existing) = locks.get(key) {
            if existing.expires_at > Utc::now() {
                return Err(StorageError::LockConflict { key: key.to_string() });
            }
        }
        let holder_id = Uuid::new_v4();
        let expires_at = Utc::now()
            + chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::seconds(30));
        locks.insert(
            key.to_string(),
            LockState {
                holder_id,
                expires_at,
            },
        );
        Ok(Box::new(MemoryLock {
            table: self.locks.clone(),
            key: key.to_string(),
            holder_id,
        }))
    }
}

struct MemoryLock {
    table: LockTable,
    key: String,
    holder_id: Uuid,
}

impl MemoryLock {
    fn currently_held_by_self(&self) -> bool {
        let locks = self.table.lock().unwrap();
        matches!(locks.get(&self.key), Some(state) if state.holder_id == self.holder_id && state.expires_at > Utc::now())
    }
}

#[async_trait]
impl Lock for MemoryLock {
    async fn release(&self, _ctx: &Ctx) -> StorageResult<()> {
        let mut locks = self.table.lock().unwrap();
        if let Some(state) = locks.get(&self.key) {
            if state.holder_id == self.holder_id {
                locks.remove(&self.key);
                return Ok(());
            }
        }
        Err(StorageError::LockNotHeld { key: self.key.clone() })
    }

    async fn renew(&self, _ctx: &Ctx, ttl: Duration) -> StorageResult<()> {
        let mut locks = self.table.lock().unwrap();
        match locks.get_mut(&self.key) {
            Some(state) if state.holder_id == self.holder_id => {
                state.expires_at = Utc::now()
                    + chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::seconds(30));
                Ok(())
            }
            _ => Err(StorageError::LockNotHeld { key: self.key.clone() }),
        }
    }

    fn is_held(&self) -> bool {
        self.currently_held_by_self()
    }

    fn key(&self) -> &str {
        &self.key
    }
}
