//! Queue status/stats and direct submission.
//!
//! `/queue/submit` bypasses the classifier entirely — the caller supplies
//! an already-classified `EnrichedAlert` and an explicit target list. It
//! exists for operators and tests that need to push a specific job onto a
//! specific band without going through `/alerts`.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};

use alert_dispatch::QueueCountersSnapshot;
use alert_types::{Alert, ClassificationResult, Ctx, EnrichedAlert};

use crate::state::AppState;

#[derive(Serialize)]
pub struct QueueStatusResponse {
    counters: QueueCountersSnapshot,
    capacity: usize,
}

pub async fn status(State(state): State<AppState>) -> Json<QueueStatusResponse> {
    Json(QueueStatusResponse { counters: state.queue.counters().snapshot(), capacity: state.queue.capacity() })
}

#[derive(Serialize)]
pub struct QueueStatsResponse {
    counters: QueueCountersSnapshot,
    capacity: usize,
    registered_targets: usize,
    enabled_targets: usize,
    mode: alert_dispatch::ModeSnapshot,
}

pub async fn stats(State(state): State<AppState>) -> Json<QueueStatsResponse> {
    Json(QueueStatsResponse {
        counters: state.queue.counters().snapshot(),
        capacity: state.queue.capacity(),
        registered_targets: state.registry.count(),
        enabled_targets: state.registry.enabled_count(),
        mode: state.mode.snapshot(),
    })
}

#[derive(Deserialize)]
pub struct SubmitJobRequest {
    alert: Alert,
    classification: ClassificationResult,
    target_names: Vec<String>,
}

#[derive(Serialize)]
pub struct SubmitJobResponse {
    job_ids: Vec<String>,
}

pub async fn submit(State(state): State<AppState>, Json(body): Json<SubmitJobRequest>) -> impl IntoResponse {
    let enriched = EnrichedAlert::new(body.alert, body.classification);
    let fingerprint = enriched.alert.fingerprint.clone();
    let results = state
        .coordinator
        .publish_to_targets(&Ctx::background(), enriched, &body.target_names, state.publish_timeout)
        .await;
    let job_ids = results.iter().filter(|r| r.success).map(|r| format!("{fingerprint}:{}", r.target)).collect();
    (StatusCode::ACCEPTED, Json(SubmitJobResponse { job_ids }))
}
