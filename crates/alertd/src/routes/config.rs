//! Config update, rollback, and history.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use alert_config::{ApplyMeta, ReloadStatus};
use alert_types::{ConfigDiff, ConfigSource, ConfigVersion, Ctx};

use crate::error::ApiError;
use crate::state::AppState;

/// Request bodies always carry the config document pre-parsed into JSON
/// (callers that have a yaml file parse it client-side before POSTing, the
/// way `alertctl config update` does); `format` is kept on the wire
/// contract as a record of the document's origin, not as something this
/// handler re-parses.
#[derive(Deserialize)]
pub struct UpdateConfigRequest {
    config: Value,
    #[serde(default = "default_format")]
    format: String,
    #[serde(default)]
    dry_run: bool,
    sections: Option<Vec<String>>,
    source: ConfigSource,
    user_id: Option<String>,
    description: Option<String>,
    ticket: Option<String>,
    #[serde(default)]
    force: bool,
}

fn default_format() -> String {
    "json".to_string()
}

#[derive(Serialize)]
pub struct UpdateConfigResponse {
    version: u64,
    diff: Option<ConfigDiff>,
    applied: bool,
    rolled_back: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    reload_errors: Vec<String>,
    duration_ms: u64,
}

#[derive(Serialize)]
struct ValidationFailureBody {
    phase: &'static str,
    errors: Vec<alert_config::ErrorDetail>,
}

/// `POST /config`: validate, diff, and — unless `dry_run` — apply and
/// roll out the new document under the six-phase reload coordinator.
pub async fn update(State(state): State<AppState>, Json(body): Json<UpdateConfigRequest>) -> Result<impl IntoResponse, ApiError> {
    if !["json", "yaml"].contains(&body.format.as_str()) {
        return Err(ApiError::bad_request("format must be json or yaml"));
    }
    let meta = ApplyMeta {
        user_id: body.user_id,
        ip: None,
        user_agent: None,
        description: body.description,
        ticket: body.ticket,
        sections: body.sections,
        dry_run: body.dry_run,
        force: body.force,
    };

    let result = state.reload.apply(&Ctx::background(), body.config, body.source, meta).await;

    match result.status {
        ReloadStatus::ValidationFailed => Err(ApiError::new(StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR", "config failed validation")
            .with_details(serde_json::to_value(ValidationFailureBody { phase: "validate", errors: result.validation_errors }).unwrap())),
        ReloadStatus::LoadFailed => Err(ApiError::new(StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR", "config failed to parse")
            .with_details(serde_json::to_value(ValidationFailureBody { phase: "load", errors: result.validation_errors }).unwrap())),
        ReloadStatus::ApplyFailed | ReloadStatus::RollbackFailed if result.validation_errors.iter().any(|e| e.code == "lock_conflict") => {
            Err(ApiError::new(StatusCode::CONFLICT, "CONFLICT", "config reload lock is held by another caller"))
        }
        _ => Ok((
            StatusCode::OK,
            Json(UpdateConfigResponse {
                version: result.version,
                diff: result.diff,
                applied: !result.dry_run && matches!(result.status, ReloadStatus::Success),
                rolled_back: result.rolled_back,
                reload_errors: result.reload_errors.into_iter().map(|e| format!("{}: {}", e.component, e.message)).collect(),
                duration_ms: result.duration_ms,
            }),
        )),
    }
}

#[derive(Deserialize)]
pub struct RollbackRequest {
    version: u64,
    user_id: Option<String>,
    description: Option<String>,
}

/// `POST /config/rollback`: re-apply a previously stored version, sourced
/// as `rollback` rather than `api`.
pub async fn rollback(State(state): State<AppState>, Json(body): Json<RollbackRequest>) -> Result<impl IntoResponse, ApiError> {
    let target = state
        .config_store
        .load(body.version)
        .await
        .map_err(alert_types::AlertError::from)?;

    let meta = ApplyMeta {
        user_id: body.user_id,
        ip: None,
        user_agent: None,
        description: body.description.or(Some(format!("rollback to version {}", body.version))),
        ticket: None,
        sections: None,
        dry_run: false,
        force: true,
    };

    let result = state.reload.apply(&Ctx::background(), target.config, ConfigSource::Rollback, meta).await;

    Ok((
        StatusCode::OK,
        Json(UpdateConfigResponse {
            version: result.version,
            diff: result.diff,
            applied: matches!(result.status, ReloadStatus::Success),
            rolled_back: result.rolled_back,
            reload_errors: result.reload_errors.into_iter().map(|e| format!("{}: {}", e.component, e.message)).collect(),
            duration_ms: result.duration_ms,
        }),
    ))
}

#[derive(Deserialize)]
pub struct HistoryQuery {
    #[serde(default = "default_history_limit")]
    limit: usize,
}

fn default_history_limit() -> usize {
    20
}

#[derive(Serialize)]
pub struct HistoryResponse {
    versions: Vec<ConfigVersion>,
}

pub async fn history(State(state): State<AppState>, Query(query): Query<HistoryQuery>) -> Result<Json<HistoryResponse>, ApiError> {
    if !(1..=1000).contains(&query.limit) {
        return Err(ApiError::bad_request("limit must be between 1 and 1000"));
    }
    let versions = state.config_store.history(query.limit).await.map_err(alert_types::AlertError::from)?;
    Ok(Json(HistoryResponse { versions }))
}
