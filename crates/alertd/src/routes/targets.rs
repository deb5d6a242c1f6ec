//! Publishing target listing, lookup, refresh, and ad-hoc test.

use std::time::{Duration, Instant};

use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use alert_dispatch::{HttpTargetPublisher, TargetPublisher};
use alert_types::{
    Alert, AlertStatus, ClassificationResult, Ctx, EnrichedAlert, Fingerprint, Job, PublishingTarget, Severity,
};

use crate::error::ApiError;
use crate::state::AppState;

fn default_limit() -> usize {
    100
}

#[derive(Deserialize)]
pub struct ListTargetsQuery {
    #[serde(default = "default_limit")]
    limit: usize,
    #[serde(default)]
    offset: usize,
    sort_by: Option<String>,
    sort_order: Option<String>,
    #[serde(rename = "type")]
    target_type: Option<String>,
    enabled: Option<bool>,
}

#[derive(Serialize)]
pub struct ListTargetsResponse {
    targets: Vec<PublishingTarget>,
    total: usize,
    limit: usize,
    offset: usize,
}

pub async fn list_targets(
    State(state): State<AppState>,
    Query(query): Query<ListTargetsQuery>,
) -> Result<Json<ListTargetsResponse>, ApiError> {
    if !(1..=1000).contains(&query.limit) {
        return Err(ApiError::bad_request("limit must be between 1 and 1000"));
    }
    let sort_by = query.sort_by.as_deref().unwrap_or("name");
    if !["name", "type", "enabled"].contains(&sort_by) {
        return Err(ApiError::bad_request("sort_by must be one of name, type, enabled"));
    }
    let descending = match query.sort_order.as_deref().unwrap_or("asc") {
        "asc" => false,
        "desc" => true,
        _ => return Err(ApiError::bad_request("sort_order must be asc or desc")),
    };

    let mut targets = state.registry.list();
    if let Some(target_type) = &query.target_type {
        targets.retain(|t| &t.target_type == target_type);
    }
    if let Some(enabled) = query.enabled {
        targets.retain(|t| t.enabled == enabled);
    }

    targets.sort_by(|a, b| {
        let ordering = match sort_by {
            "type" => a.target_type.cmp(&b.target_type),
            "enabled" => a.enabled.cmp(&b.enabled),
            _ => a.name.cmp(&b.name),
        };
        if descending {
            ordering.reverse()
        } else {
            ordering
        }
    });

    let total = targets.len();
    let page = targets.into_iter().skip(query.offset).take(query.limit).collect();

    Ok(Json(ListTargetsResponse { targets: page, total, limit: query.limit, offset: query.offset }))
}

pub async fn get_target(State(state): State<AppState>, Path(name): Path<String>) -> Result<Json<PublishingTarget>, ApiError> {
    state.registry.get(&name).map(Json).ok_or_else(|| ApiError::not_found(format!("unknown target: {name}")))
}

pub async fn refresh_targets(State(state): State<AppState>) -> Result<(), ApiError> {
    state.registry.refresh_now(&Ctx::background()).await?;
    Ok(())
}

#[derive(Deserialize, Default)]
pub struct TestTargetRequest {
    alert_name: Option<String>,
    test_alert: Option<Alert>,
    timeout_seconds: Option<u64>,
}

#[derive(Serialize)]
pub struct TestTargetResponse {
    success: bool,
    target_name: String,
    response_time_ms: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    status_code: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    test_timestamp: DateTime<Utc>,
}

fn synthetic_test_alert(alert_name: Option<String>) -> Alert {
    Alert::new(
        Fingerprint::new(format!("test-{}", uuid::Uuid::new_v4())).unwrap(),
        alert_name.unwrap_or_else(|| "synthetic-test-alert".to_string()),
        AlertStatus::Firing,
        Utc::now(),
        None,
        Default::default(),
        Default::default(),
        None,
    )
    .unwrap()
}

fn synthetic_test_classification() -> ClassificationResult {
    ClassificationResult {
        severity: Severity::Info,
        confidence: 1.0,
        reasoning: "synthetic test alert, not a real classification".to_string(),
        recommendations: Vec::new(),
        processing_time: 0.0,
        metadata: Default::default(),
    }
}

/// `POST /targets/{name}/test`: always responds 200, even on failure — the
/// failure itself is the payload.
pub async fn test_target(
    State(state): State<AppState>,
    Path(name): Path<String>,
    body: Option<Json<TestTargetRequest>>,
) -> Result<Json<TestTargetResponse>, ApiError> {
    let body = body.map(|Json(b)| b).unwrap_or_default();
    if let Some(secs) = body.timeout_seconds {
        if !(1..=300).contains(&secs) {
            return Err(ApiError::bad_request("timeout_seconds must be between 1 and 300"));
        }
    }
    let target = state.registry.get(&name).ok_or_else(|| ApiError::not_found(format!("unknown target: {name}")))?;

    let alert = body.test_alert.unwrap_or_else(|| synthetic_test_alert(body.alert_name));
    let enriched = EnrichedAlert::new(alert, synthetic_test_classification());
    let job = Job::new(enriched, target.clone(), 0);
    let timeout = Duration::from_secs(body.timeout_seconds.unwrap_or(30));
    let ctx = Ctx::with_timeout(timeout);

    let publisher = HttpTargetPublisher::new();
    let started = Instant::now();
    let outcome = publisher.publish(&ctx, &job).await;

    Ok(Json(TestTargetResponse {
        success: outcome.success,
        target_name: name,
        response_time_ms: started.elapsed().as_secs_f64() * 1000.0,
        status_code: outcome.status_code,
        error: outcome.error,
        test_timestamp: Utc::now(),
    }))
}
