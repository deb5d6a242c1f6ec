//! Alert: an ingested firing/resolved event.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AlertError;
use crate::fingerprint::Fingerprint;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertStatus {
    Firing,
    Resolved,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub fingerprint: Fingerprint,
    pub alert_name: String,
    pub status: AlertStatus,
    pub starts_at: DateTime<Utc>,
    pub ends_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub labels: HashMap<String, String>,
    #[serde(default)]
    pub annotations: HashMap<String, String>,
    pub generator_url: Option<String>,
}

impl Alert {
    /// Construct an `Alert`, enforcing every invariant from the data model
    /// up front so nothing downstream has to re-check them.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        fingerprint: Fingerprint,
        alert_name: impl Into<String>,
        status: AlertStatus,
        starts_at: DateTime<Utc>,
        ends_at: Option<DateTime<Utc>>,
        labels: HashMap<String, String>,
        annotations: HashMap<String, String>,
        generator_url: Option<String>,
    ) -> Result<Self, AlertError> {
        let alert_name = alert_name.into();
        if alert_name.trim().is_empty() {
            return Err(AlertError::Validation("alert_name must not be empty".into()));
        }
        if let Some(ends_at) = ends_at {
            if ends_at < starts_at {
                return Err(AlertError::Validation(
                    "ends_at must not precede starts_at".into(),
                ));
            }
        }
        if let Some(ref url) = generator_url {
            if url::Url::parse(url).is_err() {
                return Err(AlertError::Validation(format!(
                    "generator_url is not a valid URL: {url}"
                )));
            }
        }
        Ok(Self {
            fingerprint,
            alert_name,
            status,
            starts_at,
            ends_at,
            labels,
            annotations,
            generator_url,
        })
    }
}
