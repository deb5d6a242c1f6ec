//! Priority queue & worker pool: three bounded bands, strict
//! priority, retry-with-backoff, and dead-letter hand-off on exhaustion.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use tokio::sync::{mpsc, Mutex as AsyncMutex};

use alert_types::{
    AlertError, Ctx, DlqEntry, EnrichedAlert, Job, JobErrorType, JobState, Priority,
    PublishingTarget,
};

use alert_store::DlqStore;

/// Minimum backoff parameters per the documented formula
/// `delay_k = min(cap, base * 2^k) * (1 + uniform(-0.2, 0.2))`.
pub const MIN_BACKOFF_BASE: Duration = Duration::from_millis(100);
pub const MIN_BACKOFF_CAP: Duration = Duration::from_secs(30);
pub const BACKOFF_JITTER: f64 = 0.2;

/// The outcome of one publish attempt against a target.
#[derive(Debug, Clone)]
pub struct PublishOutcome {
    pub success: bool,
    pub status_code: Option<u16>,
    pub error: Option<String>,
}

/// Publishes one job to its target. The HTTP client, auth, payload
/// formatting per `target.format` are all behind this trait; the queue only
/// knows how to classify the result.
#[async_trait]
pub trait TargetPublisher: Send + Sync {
    async fn publish(&self, ctx: &Ctx, job: &Job) -> PublishOutcome;
}

/// Computes `delay_k` for the given retry attempt (0-indexed).
pub fn backoff_delay(retry_count: u32, base: Duration, cap: Duration) -> Duration {
    let exp = base.as_secs_f64() * 2f64.powi(retry_count as i32);
    let capped = exp.min(cap.as_secs_f64());
    let jitter = rand::thread_rng().gen_range(-BACKOFF_JITTER..=BACKOFF_JITTER);
    let jittered = (capped * (1.0 + jitter)).max(0.0);
    Duration::from_secs_f64(jittered)
}

/// Classifies a publish failure into the job-error vocabulary the retry
/// policy reasons about.
fn classify_failure(outcome: &PublishOutcome) -> JobErrorType {
    if let Some(status) = outcome.status_code {
        return JobErrorType::from_http_status(status);
    }
    JobErrorType::Unavailable
}

/// Running totals kept in lockstep with the invariant
/// `total_submitted = total_completed + total_failed + queued + in_flight + dead`
///. Jobs dropped during a shutdown drain are folded into
/// `total_failed` under the convention documented on `PriorityQueue::shutdown`.
#[derive(Debug, Default)]
pub struct QueueCounters {
    pub total_submitted: AtomicU64,
    pub total_completed: AtomicU64,
    pub total_failed: AtomicU64,
    pub currently_queued: AtomicU64,
    pub currently_in_flight: AtomicU64,
    pub dead: AtomicU64,
}

impl QueueCounters {
    pub fn snapshot(&self) -> QueueCountersSnapshot {
        QueueCountersSnapshot {
            total_submitted: self.total_submitted.load(Ordering::Relaxed),
            total_completed: self.total_completed.load(Ordering::Relaxed),
            total_failed: self.total_failed.load(Ordering::Relaxed),
            currently_queued: self.currently_queued.load(Ordering::Relaxed),
            currently_in_flight: self.currently_in_flight.load(Ordering::Relaxed),
            dead: self.dead.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueCountersSnapshot {
    pub total_submitted: u64,
    pub total_completed: u64,
    pub total_failed: u64,
    pub currently_queued: u64,
    pub currently_in_flight: u64,
    pub dead: u64,
}

struct Bands {
    high: (mpsc::Sender<Job>, AsyncMutex<mpsc::Receiver<Job>>),
    med: (mpsc::Sender<Job>, AsyncMutex<mpsc::Receiver<Job>>),
    low: (mpsc::Sender<Job>, AsyncMutex<mpsc::Receiver<Job>>),
}

/// Three bounded bands plus the retry re-submission path. Workers are
/// spawned separately via `spawn_workers`; `PriorityQueue` itself only owns
/// the channels and the shared counters/publisher/DLQ handle.
pub struct PriorityQueue {
    bands: Bands,
    capacity: usize,
    counters: Arc<QueueCounters>,
    publisher: Arc<dyn TargetPublisher>,
    dlq: Arc<dyn DlqStore>,
    max_retries: u32,
    backoff_base: Duration,
    backoff_cap: Duration,
    shutting_down: std::sync::atomic::AtomicBool,
}

impl PriorityQueue {
    pub fn new(
        capacity: usize,
        publisher: Arc<dyn TargetPublisher>,
        dlq: Arc<dyn DlqStore>,
        max_retries: u32,
    ) -> Arc<Self> {
        let high = mpsc::channel(capacity);
        let med = mpsc::channel(capacity);
        let low = mpsc::channel(capacity);
        Arc::new(Self {
            bands: Bands {
                high: (high.0, AsyncMutex::new(high.1)),
                med: (med.0, AsyncMutex::new(med.1)),
                low: (low.0, AsyncMutex::new(low.1)),
            },
            capacity,
            counters: Arc::new(QueueCounters::default()),
            publisher,
            dlq,
            max_retries,
            backoff_base: MIN_BACKOFF_BASE,
            backoff_cap: MIN_BACKOFF_CAP,
            shutting_down: std::sync::atomic::AtomicBool::new(false),
        })
    }

    pub fn counters(&self) -> Arc<QueueCounters> {
        self.counters.clone()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn sender(&self, priority: Priority) -> &mpsc::Sender<Job> {
        match priority {
            Priority::High => &self.bands.high.0,
            Priority::Med => &self.bands.med.0,
            Priority::Low => &self.bands.low.0,
        }
    }

    /// Constructs a Job from the enriched alert/target and attempts a
    /// non-blocking enqueue on the band matching its derived priority.
    pub fn submit(
        &self,
        alert: EnrichedAlert,
        target: PublishingTarget,
    ) -> Result<(), AlertError> {
        if self.shutting_down.load(Ordering::Acquire) {
            return Err(AlertError::Unavailable("queue is shutting down".into()));
        }
        let job = Job::new(alert, target, self.max_retries);
        self.enqueue(job)
    }

    /// Submits an already-constructed job (used by DLQ replay, which
    /// rebuilds a job preserving its original priority rather than
    /// re-deriving one via `Job::new`).
    pub fn resubmit(&self, job: Job) -> Result<(), AlertError> {
        if self.shutting_down.load(Ordering::Acquire) {
            return Err(AlertError::Unavailable("queue is shutting down".into()));
        }
        self.enqueue(job)
    }

    #[cfg(test)]
    pub async fn dequeue_one_for_test(&self) -> Option<Job> {
        self.dequeue_one().await
    }

    fn enqueue(&self, job: Job) -> Result<(), AlertError> {
        let priority = job.priority;
        match self.sender(priority).try_send(job) {
            Ok(()) => {
                self.counters.currently_queued.fetch_add(1, Ordering::Relaxed);
                self.counters.total_submitted.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
            Err(mpsc::error::TrySendError::Full(_)) => Err(AlertError::QueueFull(format!(
                "{:?} band is full (capacity {})",
                priority, self.capacity
            ))),
            Err(mpsc::error::TrySendError::Closed(_)) => {
                Err(AlertError::Unavailable("queue is shutting down".into()))
            }
        }
    }

    /// Re-enqueues a job after a backoff delay (called by workers on
    /// retriable failure). Does not increment `total_submitted` — this is a
    /// continuation of the same submission, not a new one.
    async fn requeue_after_backoff(&self, mut job: Job, delay: Duration) {
        tokio::time::sleep(delay).await;
        job.state = JobState::Queued;
        let priority = job.priority;
        if self.sender(priority).send(job).await.is_ok() {
            self.counters.currently_queued.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Strict-priority dequeue: try `high`, then `med`, then `low`
    /// non-blockingly; if all are empty, block on whichever resolves first.
    async fn dequeue_one(&self) -> Option<Job> {
        {
            let mut high = self.bands.high.1.lock().await;
            if let Ok(job) = high.try_recv() {
                return Some(job);
            }
        }
        {
            let mut med = self.bands.med.1.lock().await;
            if let Ok(job) = med.try_recv() {
                return Some(job);
            }
        }
        {
            let mut low = self.bands.low.1.lock().await;
            if let Ok(job) = low.try_recv() {
                return Some(job);
            }
        }
        let mut high = self.bands.high.1.lock().await;
        let mut med = self.bands.med.1.lock().await;
        let mut low = self.bands.low.1.lock().await;
        tokio::select! {
            biased;
            job = high.recv() => job,
            job = med.recv() => job,
            job = low.recv() => job,
        }
    }

    /// Stops accepting new submissions. Queued jobs still sitting in the
    /// bands when workers drain are folded into `total_failed` (the
    /// documented drop policy when no queue-persistence backend is
    /// configured).
    pub fn begin_shutdown(&self) {
        self.shutting_down.store(true, Ordering::Release);
    }

    async fn handle_job(&self, mut job: Job) {
        self.counters.currently_queued.fetch_sub(1, Ordering::Relaxed);
        self.counters.currently_in_flight.fetch_add(1, Ordering::Relaxed);
        job.state = JobState::InFlight;

        let ctx = Ctx::background();
        let outcome = self.publisher.publish(&ctx, &job).await;
        self.counters.currently_in_flight.fetch_sub(1, Ordering::Relaxed);

        if outcome.success {
            job.state = JobState::Completed;
            job.completed_at = Some(chrono::Utc::now());
            self.counters.total_completed.fetch_add(1, Ordering::Relaxed);
            return;
        }

        let error_type = classify_failure(&outcome);
        job.error_type = Some(error_type);
        job.last_error = outcome.error.clone();

        if error_type.is_retriable() && job.retry_count < job.max_retries {
            job.retry_count += 1;
            let delay = backoff_delay(job.retry_count - 1, self.backoff_base, self.backoff_cap);
            tracing::warn!(job_id = %job.id, retry_count = job.retry_count, delay_ms = delay.as_millis() as u64, "retrying job after transient failure");
            self.requeue_after_backoff(job, delay).await;
            return;
        }

        job.state = JobState::Dead;
        self.counters.total_failed.fetch_add(1, Ordering::Relaxed);
        self.counters.dead.fetch_add(1, Ordering::Relaxed);
        tracing::error!(job_id = %job.id, error = ?job.last_error, "job moved to dead letter queue");

        let entry = DlqEntry::new(
            job.id.clone(),
            job.alert.alert.fingerprint.to_string(),
            job.target.name.clone(),
            job.target.target_type.clone(),
            job.last_error.clone().unwrap_or_else(|| "unknown error".into()),
            error_type,
            job.retry_count,
            job.priority,
        );
        if let Err(err) = self.dlq.insert(entry).await {
            tracing::error!(job_id = %job.id, error = %err, "failed to write dlq entry");
        }
    }
}

/// Spawns `worker_count` tasks, each looping `dequeue_one` → `handle_job`
/// until the queue is dropped (all senders closed) or `shutdown` fires.
pub fn spawn_workers(
    queue: Arc<PriorityQueue>,
    worker_count: usize,
    mut shutdown: tokio::sync::watch::Receiver<bool>,
) -> Vec<tokio::task::JoinHandle<()>> {
    (0..worker_count)
        .map(|_| {
            let queue = queue.clone();
            let mut shutdown = shutdown.clone();
            tokio::spawn(async move {
                loop {
                    tokio::select! {
                        biased;
                        _ = shutdown.changed() => {
                            if *shutdown.borrow() {
                                break;
                            }
                        }
                        job = queue.dequeue_one() => {
                            match job {
                                Some(job) => queue.handle_job(job).await,
                                None => break,
                            }
                        }
                    }
                }
            })
        })
        .collect()
}
