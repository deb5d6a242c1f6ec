//! Cooperative cancellation carrier.
//!
//! Every public operation in this workspace accepts a `Ctx` and must
//! observe both its deadline and its cancellation flag at any point that
//! may block.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Deadline + cancellation, threaded through every public operation.
#[derive(Clone)]
pub struct Ctx {
    deadline: Option<Instant>,
    cancelled: Arc<AtomicBool>,
}

impl Ctx {
    /// A context with no deadline and no cancellation.
    pub fn background() -> Self {
        Self {
            deadline: None,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Derive a context with a deadline `timeout` from now.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            deadline: Some(Instant::now() + timeout),
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Remaining time until the deadline, if any.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline.map(|d| d.saturating_duration_since(Instant::now()))
    }

    /// The original deadline-relative duration, suitable for passing to
    /// `tokio::time::timeout`. Returns `None` when there is no deadline.
    pub fn timeout(&self) -> Option<Duration> {
        self.remaining()
    }

    /// True once the deadline has passed.
    pub fn is_expired(&self) -> bool {
        self.deadline.map(|d| Instant::now() >= d).unwrap_or(false)
    }

    /// True once `cancel()` has been called on this context or a clone of it.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    /// Mark this context (and every clone sharing its cancellation flag) as
    /// cancelled.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }
}

impl Default for Ctx {
    fn default() -> Self {
        Self::background()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn background_has_no_deadline() {
        let ctx = Ctx::background();
        assert!(!ctx.is_expired());
        assert!(ctx.timeout().is_none());
    }

    #[test]
    fn expired_after_zero_timeout() {
        let ctx = Ctx::with_timeout(Duration::from_millis(0));
        std::thread::sleep(Duration::from_millis(5));
        assert!(ctx.is_expired());
    }

    #[test]
    fn cancel_propagates_to_clones() {
        let ctx = Ctx::background();
        let clone = ctx.clone();
        clone.cancel();
        assert!(ctx.is_cancelled());
    }
}
