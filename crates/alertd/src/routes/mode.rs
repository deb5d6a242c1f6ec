//! Publishing mode readout. GET-only: every other method gets
//! 405 via the router's `.fallback`. Carries OWASP response headers and
//! conditional-GET (ETag / If-None-Match) support since this is a
//! frequently-polled, publicly embeddable status endpoint.

use axum::extract::State;
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::IntoResponse;
use axum::Json;

use crate::error::ApiError;
use crate::state::AppState;

fn security_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(header::X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
    headers.insert(header::X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    headers.insert(
        header::CONTENT_SECURITY_POLICY,
        HeaderValue::from_static("default-src 'none'; frame-ancestors 'none'"),
    );
    headers.insert(header::REFERRER_POLICY, HeaderValue::from_static("strict-origin-when-cross-origin"));
    headers.insert(
        header::HeaderName::from_static("permissions-policy"),
        HeaderValue::from_static("geolocation=(), microphone=(), camera=()"),
    );
    headers
}

/// `GET /publishing/mode`: short-TTL cacheable, conditional-GET aware.
pub async fn get_mode(State(state): State<AppState>, headers: HeaderMap) -> impl IntoResponse {
    let snapshot = state.mode.snapshot();
    let etag = state.mode.etag();

    if let Some(if_none_match) = headers.get(header::IF_NONE_MATCH) {
        if if_none_match.to_str().ok() == Some(etag.as_str()) {
            let mut response_headers = security_headers();
            response_headers.insert(header::ETAG, HeaderValue::from_str(&etag).unwrap());
            response_headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("max-age=5, public"));
            return (StatusCode::NOT_MODIFIED, response_headers).into_response();
        }
    }

    let mut response_headers = security_headers();
    response_headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("max-age=5, public"));
    response_headers.insert(header::ETAG, HeaderValue::from_str(&etag).unwrap());
    (StatusCode::OK, response_headers, Json(snapshot)).into_response()
}

pub async fn method_not_allowed() -> ApiError {
    ApiError::method_not_allowed("only GET is supported on /publishing/mode")
}
