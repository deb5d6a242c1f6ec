//! Process bootstrap: parse CLI/env settings, wire every component
//! together into `AppState`, serve the HTTP surface, and handle SIGHUP
//! (config reload) / SIGTERM+SIGINT (graceful shutdown).

mod error;
mod reload;
mod routes;
mod state;
mod telemetry;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use serde_json::json;
use tracing::Level;

use alert_classifier::{ClassificationCache, ClassifierService, HttpClassificationProvider, StatsAggregator, UnavailableProvider};
use alert_config::reload_registry::ReloadRegistry;
use alert_config::{AlwaysHealthy, ApplyMeta, LiveConfig, ReloadCoordinator};
use alert_dispatch::{DlqService, HttpTargetPublisher, ModeManager, PriorityQueue, PublishingCoordinator, StaticTargetSource, TargetRegistry};
use alert_store::{MemoryConfigStore, MemoryDlqStore, MemoryLockManager};
use alert_types::{ConfigSource, Ctx};

use reload::{ClassifierReloadComponent, LoggingReloadComponent, PublishingReloadComponent};
use state::AppState;

/// Bootstrap configuration. Every field is overridable by its `env` var so
/// the daemon can run unchanged across a container image and a bare
/// `cargo run` on a laptop.
#[derive(Parser, Debug)]
#[command(name = "alertd", version, about = "Alert classification & publishing dispatch daemon")]
struct Settings {
    /// Address the HTTP surface binds to.
    #[arg(long, env = "ALERTD_BIND_ADDR", default_value = "0.0.0.0:8080")]
    bind_addr: SocketAddr,

    /// Path to an initial configuration document (json or yaml). When
    /// unset, a minimal built-in default is used. Also the file SIGHUP
    /// reloads from.
    #[arg(long, env = "ALERTD_CONFIG_PATH")]
    config_path: Option<String>,

    /// Endpoint for the primary (AI-backed) classification provider. When
    /// unset, the daemon runs with the provider circuit permanently open
    /// and always falls back to rule-based classification.
    #[arg(long, env = "ALERTD_LLM_ENDPOINT")]
    llm_endpoint: Option<String>,

    #[arg(long, env = "ALERTD_LLM_API_KEY")]
    llm_api_key: Option<String>,

    #[arg(long, env = "ALERTD_CLASSIFY_TIMEOUT_SECS", default_value_t = 5)]
    classify_timeout_secs: u64,

    #[arg(long, env = "ALERTD_PUBLISH_TIMEOUT_SECS", default_value_t = 30)]
    publish_timeout_secs: u64,

    #[arg(long, env = "ALERTD_CACHE_TTL_MINUTES", default_value_t = 15)]
    cache_ttl_minutes: i64,

    #[arg(long, env = "ALERTD_QUEUE_CAPACITY", default_value_t = 1000)]
    queue_capacity: usize,

    #[arg(long, env = "ALERTD_WORKER_COUNT", default_value_t = 4)]
    worker_count: usize,

    #[arg(long, env = "ALERTD_MAX_RETRIES", default_value_t = 3)]
    max_retries: u32,

    #[arg(long, env = "ALERTD_LOG_JSON", default_value_t = false)]
    log_json: bool,

    #[arg(long, env = "ALERTD_LOG_LEVEL", default_value = "info")]
    log_level: String,
}

/// A default document that passes `alert_config::validate` unmodified —
/// good enough to boot the daemon with no operator-supplied config.
fn default_config() -> serde_json::Value {
    json!({
        "environment": "development",
        "profile": "standard",
        "server": {"port": 8080},
        "database": {
            "host": "localhost",
            "port": 5432,
            "max_connections": 20,
            "min_connections": 5,
            "driver": "postgres",
        },
        "redis": {"addr": "localhost:6379"},
        "cache": {"default_ttl": 300, "max_ttl": 3600},
        "logging": {"level": "info", "format": "json"},
        "webhook": {
            "authentication": {"enabled": false},
            "signature": {"enabled": false},
        },
        "llm": {"enabled": false, "temperature": 0.7},
        "storage": {"backend": "postgres"},
    })
}

async fn load_initial_config(path: &str) -> Result<serde_json::Value> {
    let raw = tokio::fs::read_to_string(path).await.with_context(|| format!("reading initial config at {path}"))?;
    let ext = path.rsplit('.').next().unwrap_or("");
    let value = if matches!(ext, "yaml" | "yml") {
        serde_yaml::from_str(&raw).with_context(|| format!("parsing yaml config at {path}"))?
    } else {
        serde_json::from_str(&raw).with_context(|| format!("parsing json config at {path}"))?
    };
    Ok(value)
}

#[tokio::main]
async fn main() -> Result<()> {
    let settings = Settings::parse();

    let level = settings.log_level.parse::<Level>().unwrap_or(Level::INFO);
    let filter_handle = telemetry::init_tracing(settings.log_json, level);
    tracing::info!(bind_addr = %settings.bind_addr, "alertd starting");

    let initial_config = match &settings.config_path {
        Some(path) => load_initial_config(path).await?,
        None => default_config(),
    };

    let cache = Arc::new(ClassificationCache::new(chrono::Duration::minutes(settings.cache_ttl_minutes)));
    let provider: Arc<dyn alert_classifier::ClassificationProvider> = match &settings.llm_endpoint {
        Some(endpoint) => Arc::new(HttpClassificationProvider::new(endpoint.clone(), settings.llm_api_key.clone())),
        None => Arc::new(UnavailableProvider),
    };
    let classify_timeout = Duration::from_secs(settings.classify_timeout_secs);
    let classifier = Arc::new(ClassifierService::new(Some(cache.clone()), provider, classify_timeout));

    let stats = Arc::new(StatsAggregator::new(classifier.counters(), chrono::Duration::seconds(5)));

    let registry = Arc::new(TargetRegistry::new(Arc::new(StaticTargetSource(Vec::new())), Vec::new()));

    let dlq_store = Arc::new(MemoryDlqStore::new());
    let publisher = Arc::new(HttpTargetPublisher::new());
    let queue = PriorityQueue::new(settings.queue_capacity, publisher, dlq_store.clone(), settings.max_retries);

    let dlq = Arc::new(DlqService::new(dlq_store, queue.clone(), registry.clone()));

    let mode = Arc::new(ModeManager::new());
    let coordinator = Arc::new(PublishingCoordinator::new(registry.clone(), queue.clone(), mode.clone()));

    let live_config = Arc::new(LiveConfig::new(initial_config, 1));

    let config_store: Arc<dyn alert_store::ConfigStore> = Arc::new(MemoryConfigStore::new());
    let lock_manager = Arc::new(MemoryLockManager::new());

    let reload_components: Vec<Arc<dyn alert_config::reload_registry::ReloadComponent>> = vec![
        Arc::new(PublishingReloadComponent::new(registry.clone())),
        Arc::new(ClassifierReloadComponent::new(classifier.clone())),
        Arc::new(LoggingReloadComponent::new(filter_handle)),
    ];
    let reload_registry = Arc::new(ReloadRegistry::new(reload_components));
    let reload = Arc::new(ReloadCoordinator::new(
        config_store.clone(),
        lock_manager,
        live_config.clone(),
        reload_registry,
        Arc::new(AlwaysHealthy),
    ));

    let app_state = AppState {
        classifier,
        cache: Some(cache),
        stats,
        registry: registry.clone(),
        queue: queue.clone(),
        dlq,
        mode: mode.clone(),
        coordinator,
        live_config,
        reload,
        config_store,
        publish_timeout: Duration::from_secs(settings.publish_timeout_secs),
    };

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let workers = alert_dispatch::spawn_workers(queue.clone(), settings.worker_count, shutdown_rx);
    let mode_ticker = mode.clone().spawn_ticker(alert_dispatch::DEFAULT_TICK_INTERVAL, {
        let registry = registry.clone();
        move || registry.enabled_count()
    });

    let router = routes::build_router(app_state.clone());
    let listener = tokio::net::TcpListener::bind(settings.bind_addr).await.with_context(|| format!("binding {}", settings.bind_addr))?;
    tracing::info!(bind_addr = %settings.bind_addr, "listening");

    let sighup_state = app_state.clone();
    let sighup_config_path = settings.config_path.clone();
    tokio::spawn(async move {
        let Ok(mut sighup) = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::hangup()) else {
            tracing::warn!("SIGHUP handler unavailable on this platform");
            return;
        };
        loop {
            sighup.recv().await;
            tracing::info!("SIGHUP received, reloading configuration");
            let Some(path) = &sighup_config_path else {
                tracing::warn!("SIGHUP received but no --config-path was set; nothing to reload from");
                continue;
            };
            let result = sighup_state
                .reload
                .reload_from_file(&Ctx::background(), path, ConfigSource::Sighup, ApplyMeta::default())
                .await;
            tracing::info!(status = ?result.status, version = result.version, "config reload complete");
        }
    });

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving HTTP")?;

    queue.begin_shutdown();
    let _ = shutdown_tx.send(true);
    for worker in workers {
        let _ = worker.await;
    }
    mode_ticker.abort();

    tracing::info!("alertd stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };
    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    tracing::info!("shutdown signal received");
}
