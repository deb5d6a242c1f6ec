//! Publishing target: a downstream incident-management destination.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::AlertError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishingTarget {
    pub name: String,
    #[serde(rename = "type")]
    pub target_type: String,
    pub url: String,
    pub enabled: bool,
    pub format: String,
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

/// Target type tags recognized by the registry. Unknown tags fail
/// validation rather than being silently accepted.
pub const RECOGNIZED_TARGET_TYPES: &[&str] = &["rootly", "pagerduty", "slack", "webhook"];

impl PublishingTarget {
    pub fn new(
        name: impl Into<String>,
        target_type: impl Into<String>,
        url: impl Into<String>,
        enabled: bool,
        format: impl Into<String>,
        headers: HashMap<String, String>,
    ) -> Result<Self, AlertError> {
        let name = name.into();
        let target_type = target_type.into();
        if name.trim().is_empty() {
            return Err(AlertError::Validation("target name must not be empty".into()));
        }
        if !RECOGNIZED_TARGET_TYPES.contains(&target_type.as_str()) {
            return Err(AlertError::Validation(format!(
                "unrecognized target type: {target_type}"
            )));
        }
        Ok(Self {
            name,
            target_type,
            url: url.into(),
            enabled,
            format: format.into(),
            headers,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_unrecognized_type() {
        let err = PublishingTarget::new(
            "team-a",
            "carrier-pigeon",
            "https://example.com",
            true,
            "json",
            HashMap::new(),
        )
        .unwrap_err();
        assert_eq!(err.tag(), crate::error::ErrorTag::Validation);
    }

    #[test]
    fn accepts_recognized_type() {
        assert!(PublishingTarget::new(
            "team-a",
            "slack",
            "https://hooks.slack.com/x",
            true,
            "json",
            HashMap::new(),
        )
        .is_ok());
    }
}
