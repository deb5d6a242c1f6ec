//! Fingerprint-keyed classification cache with single-flight dedup.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};

use alert_types::{AlertError, CacheEntry, ClassificationResult, Fingerprint};

/// Default TTL for cached classification results. The TTL for stats
/// snapshots (5s) lives in `stats.rs`, separately.
pub const DEFAULT_RESULT_TTL: chrono::Duration = chrono::Duration::minutes(15);

#[derive(Default)]
pub struct ClassificationCache {
    settled: Mutex<HashMap<Fingerprint, CacheEntry<ClassificationResult>>>,
    /// One mutex per fingerprint currently being classified: the
    /// "serializing mailbox per key" approach to single-flight dedup.
    /// The first caller to lock a key's mutex produces the result
    /// and populates `settled`; every later caller blocks on the same
    /// mutex and finds the result already settled once it acquires it.
    in_flight: Mutex<HashMap<Fingerprint, Arc<tokio::sync::Mutex<()>>>>,
    ttl: chrono::Duration,
}

impl ClassificationCache {
    pub fn new(ttl: chrono::Duration) -> Self {
        Self {
            settled: Mutex::new(HashMap::new()),
            in_flight: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    /// Fails open: any internal inconsistency reads as a miss rather than
    /// surfacing an error.
    pub fn get(&self, fp: &Fingerprint) -> Option<ClassificationResult> {
        let mut settled = self.settled.lock().unwrap();
        match settled.get(fp) {
            Some(entry) if !entry.is_expired() => Some(entry.value.clone()),
            Some(_) => {
                settled.remove(fp);
                None
            }
            None => None,
        }
    }

    pub fn put(&self, fp: Fingerprint, result: ClassificationResult) {
        let mut settled = self.settled.lock().unwrap();
        settled.insert(fp, CacheEntry::new(result, self.ttl));
    }

    pub fn invalidate(&self, fp: &Fingerprint) {
        self.settled.lock().unwrap().remove(fp);
    }

    /// Run `produce` with single-flight dedup: concurrent misses for the
    /// same fingerprint result in at most one execution of `produce`.
    /// Losers receive the winner's result without starting a second call.
    /// Only a successful `produce` is cached; a failed primary-path
    /// attempt is not stored, so the next call tries again rather than
    /// replaying a stale error.
    pub async fn single_flight<F, Fut>(&self, fp: &Fingerprint, produce: F) -> Result<ClassificationResult, AlertError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<ClassificationResult, AlertError>>,
    {
        let key_lock = {
            let mut in_flight = self.in_flight.lock().unwrap();
            in_flight
                .entry(fp.clone())
                .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
                .clone()
        };
        let result = {
            let _guard = key_lock.lock().await;

            // A concurrent winner may have settled the cache while we were
            // waiting for the key lock.
            match self.get(fp) {
                Some(cached) => Ok(cached),
                None => {
                    let result = produce().await;
                    if let Ok(value) = &result {
                        self.put(fp.clone(), value.clone());
                    }
                    result
                }
            }
        };

        // Drop this fingerprint's mutex once nobody else is waiting on it,
        // so `in_flight` doesn't grow without bound across the fingerprint
        // space over the life of the process.
        let mut in_flight = self.in_flight.lock().unwrap();
        if let Some(entry) = in_flight.get(fp) {
            if Arc::strong_count(entry) <= 2 {
                in_flight.remove(fp);
            }
        }
        drop(key_lock);
        result
    }
}
