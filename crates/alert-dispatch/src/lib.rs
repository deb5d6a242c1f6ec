//! Target registry & discovery, priority queue & worker pool, dead-letter
//! queue wiring, publishing coordinator, and mode manager for the alert
//! publishing dispatch engine.

pub mod coordinator;
pub mod dlq;
pub mod mode;
pub mod publisher;
pub mod queue;
pub mod registry;

pub use coordinator::{PerTargetResult, PublishingCoordinator};
pub use dlq::DlqService;
pub use mode::{Mode, ModeManager, ModeSnapshot, DEFAULT_TICK_INTERVAL};
pub use publisher::{HttpTargetPublisher, NoopPublisher};
pub use queue::{
    backoff_delay, spawn_workers, PriorityQueue, PublishOutcome, QueueCounters,
    QueueCountersSnapshot, TargetPublisher, BACKOFF_JITTER, MIN_BACKOFF_BASE, MIN_BACKOFF_CAP,
};
pub use registry::{StaticTargetSource, TargetRegistry, TargetSource};
