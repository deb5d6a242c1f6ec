//! The classifier itself: cache lookup → single-flight primary call with
//! deadline → rule-based fallback.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use alert_types::{Alert, AlertError, ClassificationResult, ClassificationSource, Ctx};

use crate::cache::ClassificationCache;
use crate::provider::ClassificationProvider;
use crate::rules::classify_fallback;
use crate::stats::ClassifierCounters;

/// Default classify deadline.
pub const DEFAULT_CLASSIFY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy)]
pub struct ClassifyOptions {
    pub force: bool,
    /// When `false`, a primary-path failure surfaces as an error instead
    /// of falling through to the rule-based fallback.
    pub fallback_enabled: bool,
}

impl Default for ClassifyOptions {
    fn default() -> Self {
        Self {
            force: false,
            fallback_enabled: true,
        }
    }
}

pub struct ClassifierService {
    cache: Option<Arc<ClassificationCache>>,
    provider: Arc<dyn ClassificationProvider>,
    classify_timeout_millis: AtomicU64,
    counters: Arc<ClassifierCounters>,
}

impl ClassifierService {
    pub fn new(
        cache: Option<Arc<ClassificationCache>>,
        provider: Arc<dyn ClassificationProvider>,
        classify_timeout: Duration,
    ) -> Self {
        Self {
            cache,
            provider,
            classify_timeout_millis: AtomicU64::new(classify_timeout.as_millis() as u64),
            counters: Arc::new(ClassifierCounters::new()),
        }
    }

    pub fn counters(&self) -> Arc<ClassifierCounters> {
        self.counters.clone()
    }

    pub fn classify_timeout(&self) -> Duration {
        Duration::from_millis(self.classify_timeout_millis.load(Ordering::Relaxed))
    }

    /// Applied by the `classifier` reload component when `llm.timeout_seconds`
    /// changes in a config reload; takes effect on the next call.
    pub fn set_classify_timeout(&self, timeout: Duration) {
        self.classify_timeout_millis.store(timeout.as_millis() as u64, Ordering::Relaxed);
    }

    pub async fn classify(
        &self,
        ctx: &Ctx,
        alert: &Alert,
        options: ClassifyOptions,
    ) -> Result<ClassificationResult, AlertError> {
        self.counters.record_request();

        if options.force {
            if let Some(cache) = &self.cache {
                cache.invalidate(&alert.fingerprint);
            }
        } else if let Some(cache) = &self.cache {
            if let Some(cached) = cache.get(&alert.fingerprint) {
                self.counters.record_cache_hit();
                tracing::info!(fingerprint = %alert.fingerprint, "classification cache hit");
                return Ok(cached.with_source(ClassificationSource::Cache));
            }
        }

        let classify_timeout = self.classify_timeout();
        let deadline = ctx.timeout().unwrap_or(classify_timeout).min(classify_timeout);

        let attempt = self.attempt_primary(alert, deadline);
        let result = match &self.cache {
            Some(cache) => cache.single_flight(&alert.fingerprint, || attempt).await,
            None => attempt.await,
        };

        match result {
            Ok(classified) => {
                self.counters.record_llm_success(classified.processing_time);
                if let Some(cache) = &self.cache {
                    cache.put(alert.fingerprint.clone(), classified.clone());
                }
                tracing::info!(fingerprint = %alert.fingerprint, severity = ?classified.severity, "alert classified via primary path");
                Ok(classified.with_source(ClassificationSource::Llm))
            }
            Err(primary_err) => {
                self.counters.record_llm_failure(primary_err.to_string());
                if !options.fallback_enabled {
                    return Err(primary_err);
                }
                let fallback = classify_fallback(alert);
                self.counters.record_fallback(fallback.processing_time);
                tracing::info!(fingerprint = %alert.fingerprint, reason = %primary_err, "falling back to rule-based classification");
                Ok(fallback)
            }
        }
    }

    async fn attempt_primary(&self, alert: &Alert, deadline: Duration) -> Result<ClassificationResult, AlertError> {
        let start = Instant::now();
        let ctx = Ctx::with_timeout(deadline);
        let outcome = tokio::time::timeout(deadline, self.provider.classify(&ctx, alert)).await;
        match outcome {
            Ok(Ok(mut result)) => {
                result.processing_time = start.elapsed().as_secs_f64();
                Ok(result)
            }
            Ok(Err(err)) => Err(err),
            Err(_elapsed) => Err(AlertError::Timeout(format!(
                "classification deadline of {:?} exceeded",
                deadline
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Utc;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicU32, Ordering};

    use crate::provider::{HangingProvider, UnavailableProvider};

    fn alert() -> Alert {
        Alert::new(
            alert_types::Fingerprint::new("test-123").unwrap(),
            "X",
            alert_types::AlertStatus::Firing,
            Utc::now(),
            None,
            HashMap::new(),
            HashMap::new(),
            None,
        )
        .unwrap()
    }

    struct StubProvider {
        calls: AtomicU32,
    }

    #[async_trait]
    impl ClassificationProvider for StubProvider {
        async fn classify(&self, _ctx: &Ctx, _alert: &Alert) -> Result<ClassificationResult, AlertError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(ClassificationResult {
                severity: alert_types::Severity::Warning,
                confidence: 0.85,
                reasoning: "stub".into(),
                recommendations: vec![],
                processing_time: 0.0,
                metadata: HashMap::new(),
            })
        }
    }

    #[tokio::test]
    async fn cache_hit_path_returns_cached_source() {
        let cache = Arc::new(ClassificationCache::new(chrono::Duration::seconds(60)));
        let fp = alert_types::Fingerprint::new("test-123").unwrap();
        cache.put(
            fp,
            ClassificationResult {
                severity: alert_types::Severity::Warning,
                confidence: 0.85,
                reasoning: "pre-seeded".into(),
                recommendations: vec![],
                processing_time: 0.0,
                metadata: HashMap::new(),
            },
        );
        let service = ClassifierService::new(
            Some(cache),
            Arc::new(StubProvider { calls: AtomicU32::new(0) }),
            DEFAULT_CLASSIFY_TIMEOUT,
        );
        let result = service.classify(&Ctx::background(), &alert(), ClassifyOptions::default()).await.unwrap();
        assert_eq!(result.source(), Some(ClassificationSource::Cache));
        assert_eq!(result.confidence, 0.85);
    }

    #[tokio::test]
    async fn force_invalidates_and_calls_primary() {
        let cache = Arc::new(ClassificationCache::new(chrono::Duration::seconds(60)));
        let fp = alert_types::Fingerprint::new("test-123").unwrap();
        cache.put(
            fp,
            ClassificationResult {
                severity: alert_types::Severity::Critical,
                confidence: 0.99,
                reasoning: "stale".into(),
                recommendations: vec![],
                processing_time: 0.0,
                metadata: HashMap::new(),
            },
        );
        let provider = Arc::new(StubProvider { calls: AtomicU32::new(0) });
        let service = ClassifierService::new(Some(cache), provider.clone(), DEFAULT_CLASSIFY_TIMEOUT);
        let options = ClassifyOptions { force: true, ..Default::default() };
        let result = service.classify(&Ctx::background(), &alert(), options).await.unwrap();
        assert_eq!(result.source(), Some(ClassificationSource::Llm));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn primary_failure_falls_back_by_default() {
        let service = ClassifierService::new(None, Arc::new(UnavailableProvider), DEFAULT_CLASSIFY_TIMEOUT);
        let result = service.classify(&Ctx::background(), &alert(), ClassifyOptions::default()).await.unwrap();
        assert_eq!(result.source(), Some(ClassificationSource::Fallback));
        assert!(result.confidence <= 0.75);
    }

    #[tokio::test]
    async fn timeout_surfaces_as_error_when_fallback_disabled() {
        let service = ClassifierService::new(
            None,
            Arc::new(HangingProvider),
            Duration::from_millis(10),
        );
        let options = ClassifyOptions { force: false, fallback_enabled: false };
        let err = service.classify(&Ctx::background(), &alert(), options).await.unwrap_err();
        assert_eq!(err.tag(), alert_types::ErrorTag::Timeout);
    }

    #[test]
    fn classify_timeout_is_hot_swappable() {
        let service = ClassifierService::new(None, Arc::new(UnavailableProvider), DEFAULT_CLASSIFY_TIMEOUT);
        assert_eq!(service.classify_timeout(), DEFAULT_CLASSIFY_TIMEOUT);
        service.set_classify_timeout(Duration::from_secs(2));
        assert_eq!(service.classify_timeout(), Duration::from_secs(2));
    }
}
