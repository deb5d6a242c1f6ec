//! Tracing initialisation for `alertd`, with a reload handle: the daemon's
//! `logging` reload component swaps the `EnvFilter` in place rather than
//! reinitialising the subscriber, which tracing only allows once per
//! process.

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::reload;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

pub type FilterHandle = reload::Handle<EnvFilter, tracing_subscriber::Registry>;

/// Initialise the global tracing subscriber and return a handle that can
/// later swap the active `EnvFilter`. Safe to call once; subsequent calls
/// are silently ignored (the global subscriber can only be set once).
pub fn init_tracing(json: bool, level: Level) -> FilterHandle {
    let initial = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));
    let (filter, handle) = reload::Layer::new(initial);

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(false).json())
            .try_init()
            .ok();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(false))
            .try_init()
            .ok();
    }

    handle
}

/// Swaps the active filter to `directive` (a `RUST_LOG`-style string, e.g.
/// `"info"` or `"alertd=debug,tower_http=info"`). Invalid directives are
/// rejected without disturbing the current filter.
pub fn apply_directive(handle: &FilterHandle, directive: &str) -> Result<(), String> {
    let new_filter = EnvFilter::try_new(directive).map_err(|err| err.to_string())?;
    handle.reload(new_filter).map_err(|err| err.to_string())
}
