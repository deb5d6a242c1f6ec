//! HTTP surface. Router composition follows the pack-wide axum idiom
//! of small per-area routers merged under the top-level app: each area owns
//! its own `Router::new().route(...)` builder, composed here via `.merge`
//! and `.nest`.

mod alerts;
mod config;
mod dlq;
mod mode;
mod queue;
mod targets;

use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let alerts = Router::new()
        .route("/alerts", post(alerts::submit_alert))
        .route("/classify", post(alerts::classify))
        .route("/classify/stats", get(alerts::stats));

    let targets = Router::new()
        .route("/targets", get(targets::list_targets))
        .route("/targets/refresh", post(targets::refresh_targets))
        .route("/targets/:name", get(targets::get_target))
        .route("/targets/:name/test", post(targets::test_target));

    let queue = Router::new()
        .route("/queue/status", get(queue::status))
        .route("/queue/stats", get(queue::stats))
        .route("/queue/submit", post(queue::submit));

    let dlq = Router::new()
        .route("/dlq", get(dlq::list))
        .route("/dlq/purge", delete(dlq::purge))
        .route("/dlq/:id/replay", post(dlq::replay));

    let mode = Router::new().route("/publishing/mode", get(mode::get_mode).fallback(mode::method_not_allowed));

    let config = Router::new()
        .route("/config", post(config::update))
        .route("/config/rollback", post(config::rollback))
        .route("/config/history", get(config::history));

    Router::new()
        .merge(alerts)
        .merge(targets)
        .merge(queue)
        .merge(dlq)
        .merge(mode)
        .merge(config)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
