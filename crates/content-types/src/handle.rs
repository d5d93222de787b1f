//! Opaque correlation handles for asynchronous publish and index operations.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::error::ContentError;

/// Correlation token for one in-flight or completed operation.
///
/// Handles travel across the request boundary as plain `owner|ULID`
/// strings; anything else is rejected when parsed or deserialized.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Handle(String);

impl Handle {
    /// Generate a fresh handle for an operation owned by `owner`.
    pub fn generate(owner: &str) -> Self {
        Self(format!("{owner}|{}", Ulid::new()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The operation owner, e.g. `publish` or an index name.
    pub fn owner(&self) -> &str {
        self.0.rsplit_once('|').map(|(owner, _)| owner).unwrap_or(&self.0)
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Handle {
    type Err = ContentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(ContentError::InvalidHandle(
                "handle string is empty".to_string(),
            ));
        }
        match trimmed.rsplit_once('|') {
            Some((owner, id)) if !owner.is_empty() && Ulid::from_string(id).is_ok() => {
                Ok(Self(trimmed.to_string()))
            }
            _ => Err(ContentError::InvalidHandle(trimmed.to_string())),
        }
    }
}

impl TryFrom<String> for Handle {
    type Error = ContentError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Handle> for String {
    fn from(handle: Handle) -> Self {
        handle.0
    }
}
