//! Base counters and the derived stats aggregator.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use alert_types::CacheEntry;

/// Lightweight atomic counters, incremented at call sites in `classifier.rs`
/// with no allocation and no locking — the same shape as the base-counter
/// singletons used elsewhere in this codebase, generalized from a `static`
/// singleton to an instance field so multiple classifiers (e.g. in tests)
/// don't share state.
#[derive(Default)]
pub struct ClassifierCounters {
    total_requests: AtomicU64,
    cache_hits: AtomicU64,
    llm_successes: AtomicU64,
    llm_failures: AtomicU64,
    fallback_used: AtomicU64,
    total_processing_micros: AtomicU64,
    last_error: Mutex<Option<String>>,
}

impl ClassifierCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_request(&self) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_llm_success(&self, processing_time_secs: f64) {
        self.llm_successes.fetch_add(1, Ordering::Relaxed);
        self.total_processing_micros
            .fetch_add((processing_time_secs * 1_000_000.0) as u64, Ordering::Relaxed);
    }

    pub fn record_llm_failure(&self, error: String) {
        self.llm_failures.fetch_add(1, Ordering::Relaxed);
        *self.last_error.lock().unwrap() = Some(error);
    }

    pub fn record_fallback(&self, processing_time_secs: f64) {
        self.fallback_used.fetch_add(1, Ordering::Relaxed);
        self.total_processing_micros
            .fetch_add((processing_time_secs * 1_000_000.0) as u64, Ordering::Relaxed);
    }

    pub fn flush(&self) {
        tracing::info!(
            metric = "classifier_flush",
            total_requests = self.total_requests.load(Ordering::Relaxed),
            cache_hits = self.cache_hits.load(Ordering::Relaxed),
            llm_successes = self.llm_successes.load(Ordering::Relaxed),
            llm_failures = self.llm_failures.load(Ordering::Relaxed),
            fallback_used = self.fallback_used.load(Ordering::Relaxed),
        );
    }

    fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            total_requests: self.total_requests.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            llm_successes: self.llm_successes.load(Ordering::Relaxed),
            llm_failures: self.llm_failures.load(Ordering::Relaxed),
            fallback_used: self.fallback_used.load(Ordering::Relaxed),
            total_processing_micros: self.total_processing_micros.load(Ordering::Relaxed),
            last_error: self.last_error.lock().unwrap().clone(),
        }
    }
}

#[derive(Debug, Clone, Default)]
struct CounterSnapshot {
    total_requests: u64,
    cache_hits: u64,
    llm_successes: u64,
    llm_failures: u64,
    fallback_used: u64,
    total_processing_micros: u64,
    last_error: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SeverityStats {
    pub count: u64,
    pub avg_confidence: f64,
    pub percentage: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheStats {
    pub hit_rate: f64,
    pub l1_hits: u64,
    pub l2_hits: u64,
    pub misses: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LlmStats {
    pub requests: u64,
    pub success_rate: f64,
    pub failures: u64,
    pub usage_rate: f64,
    pub avg_latency_ms: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FallbackStats {
    pub used: u64,
    pub rate: f64,
    pub avg_latency_ms: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorStats {
    pub errors: u64,
    pub rate: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatsResponse {
    pub total_requests: u64,
    pub cache_hit_rate: f64,
    pub llm_success_rate: f64,
    pub fallback_rate: f64,
    pub avg_response_time: f64,
    pub last_error: Option<String>,
    pub by_severity: std::collections::HashMap<String, SeverityStats>,
    pub cache_stats: CacheStats,
    pub llm_stats: LlmStats,
    pub fallback_stats: FallbackStats,
    pub error_stats: ErrorStats,
}

/// Per-severity counts supplied by an optional external metrics source.
/// When unavailable, all severities are reported with zero counts.
pub type SeverityCounts = std::collections::HashMap<String, (u64, f64)>;

/// Derives a `StatsResponse` from the classifier's base counters, serving
/// snapshots from a short-TTL cache (default 5s).
pub struct StatsAggregator {
    counters: std::sync::Arc<ClassifierCounters>,
    snapshot_cache: Mutex<Option<CacheEntry<StatsResponse>>>,
    ttl: chrono::Duration,
}

const SEVERITIES: &[&str] = &["critical", "warning", "info", "noise"];

impl StatsAggregator {
    pub fn new(counters: std::sync::Arc<ClassifierCounters>, ttl: chrono::Duration) -> Self {
        Self {
            counters,
            snapshot_cache: Mutex::new(None),
            ttl,
        }
    }

    pub fn snapshot(&self, severity_counts: Option<&SeverityCounts>) -> StatsResponse {
        {
            let cached = self.snapshot_cache.lock().unwrap();
            if let Some(entry) = cached.as_ref() {
                if !entry.is_expired() {
                    return entry.value.clone();
                }
            }
        }

        let response = self.compute(severity_counts);
        let mut cached = self.snapshot_cache.lock().unwrap();
        *cached = Some(CacheEntry::new(response.clone(), self.ttl));
        response
    }

    fn compute(&self, severity_counts: Option<&SeverityCounts>) -> StatsResponse {
        let snap = self.counters.snapshot();
        let total = snap.total_requests as f64;

        let cache_hit_rate = if total > 0.0 {
            snap.cache_hits as f64 / total
        } else {
            0.0
        };

        let llm_attempts = snap.llm_successes + snap.llm_failures;
        let llm_success_rate = if llm_attempts > 0 {
            snap.llm_successes as f64 / llm_attempts as f64
        } else {
            0.0
        };

        let fallback_rate = if total > 0.0 {
            snap.fallback_used as f64 / total
        } else {
            0.0
        };

        let avg_response_time = if snap.llm_successes + snap.fallback_used > 0 {
            (snap.total_processing_micros as f64 / 1_000_000.0)
                / (snap.llm_successes + snap.fallback_used) as f64
        } else {
            0.0
        };

        let requests = (total * (1.0 - cache_hit_rate)).round().max(0.0);
        // Open question resolution: when llm_success_rate == 0, failures =
        // requests regardless of fallback_rate (see DESIGN.md).
        let failures = if llm_success_rate == 0.0 {
            requests
        } else {
            (requests * (1.0 - llm_success_rate)).round().max(0.0)
        };

        let misses = (total * (1.0 - cache_hit_rate)).round().max(0.0);
        let used = (total * fallback_rate).round().max(0.0);
        let errors = failures;
        let error_rate = if total > 0.0 { errors / total } else { 0.0 };

        let mut by_severity = std::collections::HashMap::new();
        for s in SEVERITIES {
            let (count, avg_confidence) = severity_counts
                .and_then(|m| m.get(*s).copied())
                .unwrap_or((0, 0.0));
            let percentage = if total > 0.0 { count as f64 / total * 100.0 } else { 0.0 };
            by_severity.insert(
                s.to_string(),
                SeverityStats {
                    count,
                    avg_confidence,
                    percentage,
                },
            );
        }

        StatsResponse {
            total_requests: snap.total_requests,
            cache_hit_rate,
            llm_success_rate,
            fallback_rate,
            avg_response_time,
            last_error: snap.last_error.clone(),
            by_severity,
            cache_stats: CacheStats {
                hit_rate: cache_hit_rate,
                l1_hits: snap.cache_hits,
                l2_hits: 0,
                misses: misses as u64,
            },
            llm_stats: LlmStats {
                requests: requests as u64,
                success_rate: llm_success_rate,
                failures: failures as u64,
                usage_rate: if total > 0.0 { requests / total } else { 0.0 },
                avg_latency_ms: avg_response_time * 1000.0,
            },
            fallback_stats: FallbackStats {
                used: used as u64,
                rate: fallback_rate,
                avg_latency_ms: avg_response_time * 1000.0,
            },
            error_stats: ErrorStats {
                errors: errors as u64,
                rate: error_rate,
            },
        }
    }
}

/// A zeroed snapshot, served at HTTP 200 whenever no classifier/cache is
/// configured — never an error.
pub fn zeroed_stats_response() -> StatsResponse {
    let mut by_severity = std::collections::HashMap::new();
    for s in SEVERITIES {
        by_severity.insert(s.to_string(), SeverityStats::default());
    }
    StatsResponse {
        by_severity,
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zeroed_snapshot_has_all_severities() {
        let snap = zeroed_stats_response();
        assert_eq!(snap.by_severity.len(), 4);
        assert_eq!(snap.total_requests, 0);
    }

    #[test]
    fn all_failed_with_no_fallback_reports_failures_eq_requests() {
        let counters = std::sync::Arc::new(ClassifierCounters::new());
        for _ in 0..5 {
            counters.record_request();
            counters.record_llm_failure("boom".into());
        }
        let aggregator = StatsAggregator::new(counters, chrono::Duration::seconds(5));
        let snap = aggregator.snapshot(None);
        assert_eq!(snap.llm_stats.success_rate, 0.0);
        assert_eq!(snap.fallback_rate, 0.0);
        assert_eq!(snap.llm_stats.failures, snap.llm_stats.requests);
    }

    #[test]
    fn cache_hits_reduce_misses() {
        let counters = std::sync::Arc::new(ClassifierCounters::new());
        counters.record_request();
        counters.record_cache_hit();
        counters.record_request();
        counters.record_llm_success(0.01);
        let aggregator = StatsAggregator::new(counters, chrono::Duration::seconds(5));
        let snap = aggregator.snapshot(None);
        assert_eq!(snap.cache_stats.misses, 1);
    }

    #[test]
    fn snapshot_is_served_from_cache_within_ttl() {
        let counters = std::sync::Arc::new(ClassifierCounters::new());
        let aggregator = StatsAggregator::new(counters.clone(), chrono::Duration::seconds(60));
        let first = aggregator.snapshot(None);
        counters.record_request();
        let second = aggregator.snapshot(None);
        assert_eq!(first.total_requests, second.total_requests);
    }
}
