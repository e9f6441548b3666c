//! Owner identity model

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque identifier issued by the identity provider for an authenticated user.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerId(String);

impl OwnerId {
    /// Wrap a provider identifier. Blank input means "not signed in".
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Option<Self> {
        let raw = raw.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The signed-in user as seen by the favorites core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnerIdentity {
    /// Primary key of the user's favorites document
    pub id: OwnerId,
    /// Contact address copied onto the favorites document (informational)
    pub contact: Option<String>,
}

impl OwnerIdentity {
    #[must_use]
    pub const fn new(id: OwnerId, contact: Option<String>) -> Self {
        Self { id, contact }
    }
}
