//! HTTP error envelope: converts any crate error into
//! `{ error: { code, message, details?, request_id, timestamp,
//! documentation_url? } }` via a single `IntoResponse` impl keyed off the
//! error's tag, never by matching on enum variants at the boundary.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use alert_types::{AlertError, ErrorTag};

#[derive(Serialize)]
struct ErrorBody {
    code: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<Value>,
    request_id: String,
    timestamp: chrono::DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    documentation_url: Option<&'static str>,
}

#[derive(Serialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
    details: Option<Value>,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self { status, code, message: message.into(), details: None }
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "NOT_FOUND", message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "VALIDATION_ERROR", message)
    }

    pub fn method_not_allowed(message: impl Into<String>) -> Self {
        Self::new(StatusCode::METHOD_NOT_ALLOWED, "METHOD_NOT_ALLOWED", message)
    }
}

fn map_tag(tag: ErrorTag) -> (StatusCode, &'static str) {
    match tag {
        ErrorTag::Validation => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
        ErrorTag::NotFound => (StatusCode::NOT_FOUND, "NOT_FOUND"),
        ErrorTag::Conflict => (StatusCode::CONFLICT, "CONFLICT"),
        ErrorTag::Timeout => (StatusCode::GATEWAY_TIMEOUT, "CLASSIFICATION_TIMEOUT"),
        ErrorTag::Unavailable => (StatusCode::SERVICE_UNAVAILABLE, "SERVICE_UNAVAILABLE"),
        ErrorTag::QueueFull => (StatusCode::SERVICE_UNAVAILABLE, "PUBLISHING_QUEUE_FULL"),
        ErrorTag::Permanent => (StatusCode::BAD_GATEWAY, "LLM_ERROR"),
        ErrorTag::Internal => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
    }
}

impl From<AlertError> for ApiError {
    fn from(err: AlertError) -> Self {
        let (status, code) = map_tag(err.tag());
        Self { status, code, message: err.to_string(), details: None }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorEnvelope {
            error: ErrorBody {
                code: self.code,
                message: self.message,
                details: self.details,
                request_id: Uuid::new_v4().to_string(),
                timestamp: Utc::now(),
                documentation_url: None,
            },
        };
        (self.status, Json(body)).into_response()
    }
}
