//! The live configuration: an atomically replaceable shared value. Readers
//! capture the current `Arc` once per operation and hold it for that
//! operation's lifetime; they
//! never see a partially-updated document and never block on a writer.
//!
//! Built on `tokio::sync::watch`, the same "publish new value, readers
//! capture once" idiom this workspace already uses for the mode manager's
//! snapshot.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::watch;

pub struct LiveConfig {
    tx: watch::Sender<Arc<Value>>,
    rx: watch::Receiver<Arc<Value>>,
    version: AtomicU64,
}

impl LiveConfig {
    pub fn new(initial: Value, version: u64) -> Self {
        let (tx, rx) = watch::channel(Arc::new(initial));
        Self {
            tx,
            rx,
            version: AtomicU64::new(version),
        }
    }

    /// Capture the current config document. Call once per operation and
    /// hold the result — a later `publish` will not retroactively change
    /// what this `Arc` points to.
    pub fn current(&self) -> Arc<Value> {
        self.rx.borrow().clone()
    }

    pub fn version(&self) -> u64 {
        self.version.load(Ordering::Acquire)
    }

    /// Publish a new document as one atomic pointer swap.
    pub fn publish(&self, new_cfg: Value, new_version: u64) {
        self.version.store(new_version, Ordering::Release);
        let _ = self.tx.send(Arc::new(new_cfg));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn capture_is_stable_across_a_later_publish() {
        let live = LiveConfig::new(json!({"v": 1}), 1);
        let captured = live.current();
        live.publish(json!({"v": 2}), 2);
        assert_eq!(captured["v"], 1);
        assert_eq!(live.current()["v"], 2);
        assert_eq!(live.version(), 2);
    }
}
