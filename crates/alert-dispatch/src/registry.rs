//! Target registry & discovery.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::RwLock;

use async_trait::async_trait;

use alert_types::{AlertError, Ctx, PublishingTarget};

/// Discovers the current set of publishing targets from wherever they are
/// configured (file, API, service catalog — an external collaborator per
/// the scope notes). The registry only knows how to call this trait.
#[async_trait]
pub trait TargetSource: Send + Sync {
    async fn discover(&self, ctx: &Ctx) -> Result<Vec<PublishingTarget>, AlertError>;
}

/// A source that never changes; useful for tests and for daemons that load
/// targets once at startup.
pub struct StaticTargetSource(pub Vec<PublishingTarget>);

#[async_trait]
impl TargetSource for StaticTargetSource {
    async fn discover(&self, _ctx: &Ctx) -> Result<Vec<PublishingTarget>, AlertError> {
        Ok(self.0.clone())
    }
}

/// `name -> PublishingTarget`, refreshed periodically and on demand.
/// `refresh_now` is idempotent: if two refreshes race, the result is as if
/// they had run serially in some order (the last writer under the lock
/// wins; reads never see a torn map).
pub struct TargetRegistry {
    targets: RwLock<HashMap<String, PublishingTarget>>,
    source: Arc<dyn TargetSource>,
}

impl TargetRegistry {
    pub fn new(source: Arc<dyn TargetSource>, initial: Vec<PublishingTarget>) -> Self {
        let targets = initial.into_iter().map(|t| (t.name.clone(), t)).collect();
        Self {
            targets: RwLock::new(targets),
            source,
        }
    }

    pub fn list(&self) -> Vec<PublishingTarget> {
        self.targets.read().unwrap().values().cloned().collect()
    }

    pub fn get(&self, name: &str) -> Option<PublishingTarget> {
        self.targets.read().unwrap().get(name).cloned()
    }

    pub fn count(&self) -> usize {
        self.targets.read().unwrap().len()
    }

    pub fn enabled_count(&self) -> usize {
        self.targets.read().unwrap().values().filter(|t| t.enabled).count()
    }

    pub fn by_type(&self, tag: &str) -> Vec<PublishingTarget> {
        self.targets
            .read()
            .unwrap()
            .values()
            .filter(|t| t.target_type == tag)
            .cloned()
            .collect()
    }

    /// Re-discover targets and publish the new map atomically; readers
    /// never observe a partially-updated map.
    pub async fn refresh_now(&self, ctx: &Ctx) -> Result<(), AlertError> {
        let discovered = self.source.discover(ctx).await?;
        let map = discovered.into_iter().map(|t| (t.name.clone(), t)).collect();
        *self.targets.write().unwrap() = map;
        Ok(())
    }

    /// Per-target liveness. The concrete health probe (an HTTP ping, a TCP
    /// check) belongs to the target client, an external collaborator; this
    /// reports the configured `enabled` flag as the registry's own view of
    /// health, which is all the registry can assert without calling out.
    pub fn health(&self) -> HashMap<String, bool> {
        self.targets
            .read()
            .unwrap()
            .values()
            .map(|t| (t.name.clone(), t.enabled))
            .collect()
    }
}
