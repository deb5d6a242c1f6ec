//! Shared application state handed to every axum handler.

use std::sync::Arc;
use std::time::Duration;

use alert_classifier::{ClassificationCache, ClassifierService, StatsAggregator};
use alert_config::{LiveConfig, ReloadCoordinator};
use alert_dispatch::{DlqService, ModeManager, PriorityQueue, PublishingCoordinator, TargetRegistry};
use alert_store::ConfigStore;

#[derive(Clone)]
pub struct AppState {
    pub classifier: Arc<ClassifierService>,
    pub cache: Option<Arc<ClassificationCache>>,
    pub stats: Arc<StatsAggregator>,
    pub registry: Arc<TargetRegistry>,
    pub queue: Arc<PriorityQueue>,
    pub dlq: Arc<DlqService>,
    pub mode: Arc<ModeManager>,
    pub coordinator: Arc<PublishingCoordinator>,
    pub live_config: Arc<LiveConfig>,
    pub reload: Arc<ReloadCoordinator>,
    pub config_store: Arc<dyn ConfigStore>,
    pub publish_timeout: Duration,
}
