//! Opaque alert identity.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::AlertError;

/// Stable, opaque identifier for an alert. Used as the classification cache
/// key and as half of a `Job` id. Tests must not assume a particular hashing
/// scheme behind this type — it is whatever the caller supplied.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn new(value: impl Into<String>) -> std::result::Result<Self, AlertError> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(AlertError::Validation("fingerprint must not be empty".into()));
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Fingerprint {
    type Error = AlertError;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        Self::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty() {
        assert!(Fingerprint::new("").is_err());
        assert!(Fingerprint::new("   ").is_err());
    }

    #[test]
    fn accepts_opaque_string() {
        let fp = Fingerprint::new("test-123").unwrap();
        assert_eq!(fp.as_str(), "test-123");
    }
}
