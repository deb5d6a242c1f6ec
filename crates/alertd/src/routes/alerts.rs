//! Alert submission, classification, and classifier stats.

use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use alert_classifier::ClassifyOptions;
use alert_dispatch::PerTargetResult;
use alert_types::{Alert, ClassificationResult, Ctx, EnrichedAlert};

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct SubmitAlertRequest {
    alert: Alert,
}

#[derive(Serialize)]
pub struct SubmitAlertResponse {
    result: ClassificationResult,
    dispatch: Vec<PerTargetResult>,
}

/// `POST /alerts`: classify then fan the enriched alert out to every
/// enabled publishing target.
pub async fn submit_alert(
    State(state): State<AppState>,
    Json(body): Json<SubmitAlertRequest>,
) -> Result<Json<SubmitAlertResponse>, ApiError> {
    let ctx = Ctx::background();
    let result = state.classifier.classify(&ctx, &body.alert, ClassifyOptions::default()).await?;
    let enriched = EnrichedAlert::new(body.alert, result.clone());
    let dispatch = state.coordinator.publish_to_all_enabled(&ctx, enriched, state.publish_timeout).await;
    Ok(Json(SubmitAlertResponse { result, dispatch }))
}

#[derive(Deserialize)]
pub struct ClassifyRequest {
    alert: Alert,
    #[serde(default)]
    force: bool,
}

#[derive(Serialize)]
pub struct ClassifyResponse {
    result: ClassificationResult,
    cached: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<String>,
    timestamp: DateTime<Utc>,
    processing_time: f64,
}

/// `POST /classify`: classify only, no downstream dispatch.
pub async fn classify(
    State(state): State<AppState>,
    Json(body): Json<ClassifyRequest>,
) -> Result<Json<ClassifyResponse>, ApiError> {
    let ctx = Ctx::background();
    let options = ClassifyOptions { force: body.force, ..ClassifyOptions::default() };
    let result = state.classifier.classify(&ctx, &body.alert, options).await?;
    let cached = result.source() == Some(alert_types::ClassificationSource::Cache);
    let model = result.metadata.get("model").cloned();
    Ok(Json(ClassifyResponse {
        processing_time: result.processing_time,
        cached,
        model,
        timestamp: Utc::now(),
        result,
    }))
}

/// `GET /classify/stats`: short-TTL cached `StatsResponse`. No per-severity
/// history is kept in this service, so `by_severity` is always empty; every
/// other field reflects live counters.
pub async fn stats(State(state): State<AppState>) -> impl IntoResponse {
    let snapshot = state.stats.snapshot(None);
    let etag = state.mode.etag();
    (
        [(header::CACHE_CONTROL, "max-age=5, public".to_string()), (header::ETAG, etag)],
        Json(snapshot),
    )
}
