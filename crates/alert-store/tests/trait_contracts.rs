//! Trait contract tests for `ConfigStore`, `DlqStore`, and `LockManager`.
//!
//! These exercise the behavioral contracts against the in-memory fakes; any
//! conforming backend implementation must pass the same assertions.

use std::time::Duration;

use alert_store::{ConfigStore, DlqStore, LockManager, MemoryConfigStore, MemoryDlqStore, MemoryLockManager, StorageError};
use alert_types::ctx::Ctx;
use alert_types::job::{JobErrorType, Priority};
use alert_types::{AuditAction, AuditLogEntry, ConfigSource, DlqEntry, DlqFilter};
use chrono::Utc;
use serde_json::json;

// ===========================================================================
// ConfigStore contract tests
// ===========================================================================

#[tokio::test]
async fn config_versions_strictly_increase() {
    let store = MemoryConfigStore::new();
    let v1 = store
        .save(json!({"server": {"port": 8080}}), None, ConfigSource::Api, None, None)
        .await
        .unwrap();
    let v2 = store
        .save(json!({"server": {"port": 9090}}), None, ConfigSource::Api, None, None)
        .await
        .unwrap();

    assert_eq!(v1.version, 1);
    assert_eq!(v2.version, 2);
    assert_eq!(v2.previous_version, Some(1));
}

#[tokio::test]
async fn config_hash_determined_by_content() {
    let store = MemoryConfigStore::new();
    let cfg = json!({"server": {"port": 8080}});
    let v1 = store.save(cfg.clone(), None, ConfigSource::Api, None, None).await.unwrap();
    let v2 = store.save(cfg, None, ConfigSource::Api, None, None).await.unwrap();

    assert_eq!(v1.hash, v2.hash);
}

#[tokio::test]
async fn config_load_missing_version_not_found() {
    let store = MemoryConfigStore::new();
    let err = store.load(42).await.unwrap_err();
    assert!(matches!(err, StorageError::VersionNotFound { version: 42 }));
}

#[tokio::test]
async fn config_latest_version_zero_when_empty() {
    let store = MemoryConfigStore::new();
    assert_eq!(store.latest_version().await.unwrap(), 0);
}

#[tokio::test]
async fn config_history_sorted_newest_first_and_limited() {
    let store = MemoryConfigStore::new();
    for port in [8080, 8081, 8082] {
        store
            .save(json!({"server": {"port": port}}), None, ConfigSource::Api, None, None)
            .await
            .unwrap();
    }
    let history = store.history(2).await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].version, 3);
    assert_eq!(history[1].version, 2);
}

#[tokio::test]
async fn config_backup_and_audit_are_best_effort_and_recorded() {
    let store = MemoryConfigStore::new();
    store.backup(&json!({"server": {"port": 8080}})).await.unwrap();
    assert_eq!(store.backup_count(), 1);

    store
        .save_audit(AuditLogEntry {
            id: uuid::Uuid::new_v4(),
            version: 1,
            action: AuditAction::Create,
            user_id: None,
            ip: None,
            user_agent: None,
            diff: None,
            sections: vec![],
            dry_run: false,
            success: true,
            error_message: None,
            duration_ms: 3,
            created_at: Utc::now(),
        })
        .await
        .unwrap();
    assert_eq!(store.audit_count(), 1);
}

// ===========================================================================
// DlqStore contract tests
// ===========================================================================

fn sample_entry(target: &str, error_type: JobErrorType, priority: Priority) -> DlqEntry {
    DlqEntry::new(
        format!("fp-1:{target}"),
        "fp-1",
        target,
        "slack",
        "boom",
        error_type,
        0,
        priority,
    )
}

#[tokio::test]
async fn dlq_list_filters_conjunctively() {
    let store = MemoryDlqStore::new();
    store.insert(sample_entry("team-a", JobErrorType::Permanent, Priority::High)).await.unwrap();
    store.insert(sample_entry("team-b", JobErrorType::Timeout, Priority::Low)).await.unwrap();

    let filter = DlqFilter {
        target_name: Some("team-a".into()),
        ..Default::default()
    };
    let (entries, total) = store.list(&filter, 100).await.unwrap();
    assert_eq!(total, 1);
    assert_eq!(entries[0].target_name, "team-a");
}

#[tokio::test]
async fn dlq_replay_sets_flag_once() {
    let store = MemoryDlqStore::new();
    let entry = sample_entry("team-a", JobErrorType::Permanent, Priority::High);
    let id = entry.id;
    store.insert(entry).await.unwrap();

    let before = store.mark_replayed(id).await.unwrap();
    assert!(!before.replayed);

    let err = store.mark_replayed(id).await.unwrap_err();
    assert!(matches!(err, StorageError::AlreadyReplayed { .. }));
}

#[tokio::test]
async fn dlq_purge_zero_deletes_nothing() {
    let store = MemoryDlqStore::new();
    store.insert(sample_entry("team-a", JobErrorType::Permanent, Priority::High)).await.unwrap();
    let deleted = store.purge(0).await.unwrap();
    assert_eq!(deleted, 0);
    let (_, total) = store.list(&DlqFilter::default(), 100).await.unwrap();
    assert_eq!(total, 1);
}

#[tokio::test]
async fn dlq_stats_count_by_dimension() {
    let store = MemoryDlqStore::new();
    store.insert(sample_entry("team-a", JobErrorType::Permanent, Priority::High)).await.unwrap();
    store.insert(sample_entry("team-a", JobErrorType::Timeout, Priority::Low)).await.unwrap();

    let stats = store.stats().await.unwrap();
    assert_eq!(stats.total, 2);
    assert_eq!(*stats.by_target.get("team-a").unwrap(), 2);
}

// ===========================================================================
// LockManager contract tests
// ===========================================================================

#[tokio::test]
async fn lock_conflicting_acquire_fails_without_blocking() {
    let manager = MemoryLockManager::new();
    let ctx = Ctx::background();
    let lock = manager.acquire(&ctx, "config:reload", Duration::from_secs(30)).await.unwrap();
    assert!(lock.is_held());

    let err = manager.acquire(&ctx, "config:reload", Duration::from_secs(30)).await.unwrap_err();
    assert!(matches!(err, StorageError::LockConflict { .. }));
}

#[tokio::test]
async fn lock_release_allows_reacquire() {
    let manager = MemoryLockManager::new();
    let ctx = Ctx::background();
    let lock = manager.acquire(&ctx, "config:reload", Duration::from_secs(30)).await.unwrap();
    lock.release(&ctx).await.unwrap();
    assert!(!lock.is_held());

    let reacquired = manager.acquire(&ctx, "config:reload", Duration::from_secs(30)).await;
    assert!(reacquired.is_ok());
}

#[tokio::test]
async fn lock_expires_after_ttl() {
    let manager = MemoryLockManager::new();
    let ctx = Ctx::background();
    let _lock = manager.acquire(&ctx, "config:reload", Duration::from_millis(1)).await.unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;

    let reacquired = manager.acquire(&ctx, "config:reload", Duration::from_secs(30)).await;
    assert!(reacquired.is_ok());
}

#[tokio::test]
async fn lock_renew_extends_and_foreign_release_fails() {
    let manager = MemoryLockManager::new();
    let ctx = Ctx::background();
    let lock = manager.acquire(&ctx, "config:reload", Duration::from_millis(20)).await.unwrap();
    lock.renew(&ctx, Duration::from_secs(30)).await.unwrap();
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert!(lock.is_held());
}
