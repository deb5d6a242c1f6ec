//! Config validation, diffing, hot-swappable live config, and the
//! six-phase reload coordinator for the alert classification & publishing
//! service.

pub mod diff;
pub mod live;
pub mod reload_coordinator;
pub mod reload_registry;
pub mod validator;

pub use diff::compare;
pub use live::LiveConfig;
pub use reload_coordinator::{
    ApplyMeta, AlwaysHealthy, ConfigFormat, HealthProbe, ReloadCoordinator, ReloadResult,
    ReloadStatus, DEFAULT_LOCK_TTL,
};
pub use reload_registry::{
    ComponentReloadError, ReloadComponent, ReloadRegistry, DEFAULT_COMPONENT_TIMEOUT,
};
pub use validator::{validate, validate_diff, ErrorDetail};
