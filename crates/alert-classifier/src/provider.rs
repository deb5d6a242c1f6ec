//! The primary (AI-backed) classification path.
//!
//! The concrete provider (which model, which vendor API) is an external
//! collaborator; this crate only specifies the trait and a deadline-bound
//! caller. `HttpClassificationProvider` is a minimal, vendor-agnostic
//! concrete implementation good enough to run the daemon standalone
//! against any endpoint that accepts `{alert, labels, annotations}` and
//! returns a `ClassificationResult` as JSON — the same "ship a working
//! default alongside the contract" shape as `alert-store`'s in-memory
//! fakes. Tests substitute a stub implementation instead.

use std::time::Duration;

use async_trait::async_trait;

use alert_types::{Alert, AlertError, ClassificationResult, Ctx};

/// A primary classification backend. Implementations may call out to an
/// LLM provider over HTTP; any failure (timeout, connection error,
/// provider-signalled circuit-open) is surfaced as an `AlertError` so the
/// classifier can decide whether to fall back.
#[async_trait]
pub trait ClassificationProvider: Send + Sync {
    async fn classify(&self, ctx: &Ctx, alert: &Alert) -> Result<ClassificationResult, AlertError>;
}

/// Posts the alert to a configured endpoint and expects a
/// `ClassificationResult` back as JSON. `api_key`, when set, is sent as a
/// bearer token.
pub struct HttpClassificationProvider {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl HttpClassificationProvider {
    pub fn new(endpoint: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            api_key,
        }
    }
}

#[async_trait]
impl ClassificationProvider for HttpClassificationProvider {
    async fn classify(&self, ctx: &Ctx, alert: &Alert) -> Result<ClassificationResult, AlertError> {
        let timeout = ctx.timeout().unwrap_or(Duration::from_secs(5));
        let mut request = self.client.post(&self.endpoint).json(alert).timeout(timeout);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|err| {
            if err.is_timeout() {
                AlertError::Timeout(format!("provider request timed out: {err}"))
            } else {
                AlertError::Unavailable(format!("provider request failed: {err}"))
            }
        })?;

        if response.status().is_server_error() || response.status().as_u16() == 429 {
            return Err(AlertError::Unavailable(format!("provider returned {}", response.status())));
        }
        if response.status().is_client_error() {
            return Err(AlertError::Permanent(format!("provider rejected request: {}", response.status())));
        }

        response
            .json::<ClassificationResult>()
            .await
            .map_err(|err| AlertError::Unavailable(format!("malformed provider response: {err}")))
    }
}

/// A provider that always fails with `unavailable`, used to exercise the
/// circuit-open path in tests without a real backend.
pub struct UnavailableProvider;

#[async_trait]
impl ClassificationProvider for UnavailableProvider {
    async fn classify(&self, _ctx: &Ctx, _alert: &Alert) -> Result<ClassificationResult, AlertError> {
        Err(AlertError::Unavailable("provider circuit open".into()))
    }
}

/// A provider that never returns before its caller's deadline, used to
/// exercise the timeout path in tests.
pub struct HangingProvider;

#[async_trait]
impl ClassificationProvider for HangingProvider {
    async fn classify(&self, _ctx: &Ctx, _alert: &Alert) -> Result<ClassificationResult, AlertError> {
        std::future::pending().await
    }
}
