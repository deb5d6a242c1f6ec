//! Dead-letter queue listing, replay, and purge.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use alert_types::{DlqEntry, DlqFilter, DlqStats, JobErrorType, Priority};

use crate::error::ApiError;
use crate::state::AppState;

fn default_limit() -> usize {
    100
}

fn default_purge_hours() -> i64 {
    168
}

#[derive(Deserialize)]
pub struct ListDlqQuery {
    #[serde(default = "default_limit")]
    limit: usize,
    target_name: Option<String>,
    error_type: Option<JobErrorType>,
    priority: Option<Priority>,
    replayed: Option<bool>,
}

#[derive(Serialize)]
pub struct ListDlqResponse {
    entries: Vec<DlqEntry>,
    total: usize,
    stats: DlqStats,
}

pub async fn list(State(state): State<AppState>, Query(query): Query<ListDlqQuery>) -> Result<Json<ListDlqResponse>, ApiError> {
    if !(1..=1000).contains(&query.limit) {
        return Err(ApiError::bad_request("limit must be between 1 and 1000"));
    }
    let filter = DlqFilter {
        target_name: query.target_name,
        error_type: query.error_type,
        priority: query.priority,
        replayed: query.replayed,
    };
    let (entries, total) = state.dlq.list(&filter, query.limit).await?;
    let stats = state.dlq.stats().await?;
    Ok(Json(ListDlqResponse { entries, total, stats }))
}

pub async fn replay(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<StatusCode, ApiError> {
    state.dlq.replay(id).await?;
    Ok(StatusCode::ACCEPTED)
}

#[derive(Deserialize, Default)]
pub struct PurgeRequest {
    #[serde(default = "default_purge_hours")]
    older_than_hours: i64,
}

#[derive(Serialize)]
pub struct PurgeResponse {
    purged: u64,
}

pub async fn purge(State(state): State<AppState>, body: Option<Json<PurgeRequest>>) -> Result<Json<PurgeResponse>, ApiError> {
    let body = body.map(|Json(b)| b).unwrap_or_default();
    if body.older_than_hours < 1 {
        return Err(ApiError::bad_request("older_than_hours must be at least 1"));
    }
    let purged = state.dlq.purge(body.older_than_hours).await?;
    Ok(Json(PurgeResponse { purged }))
}
