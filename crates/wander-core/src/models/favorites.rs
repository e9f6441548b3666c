//! Favorites document model

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{CountryCode, OwnerId};
use crate::error::{Error, Result};

/// The remote per-user record holding the saved country codes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FavoritesDocument {
    /// Identity-provider id; primary key, never changes
    pub owner_id: OwnerId,
    /// Saved codes (unique, order irrelevant)
    pub country_codes: BTreeSet<CountryCode>,
    /// Time of the last successful write
    pub last_updated: Option<DateTime<Utc>>,
    /// Denormalized contact address of the owner
    pub owner_contact: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StoredFavorites {
    #[serde(default)]
    country_codes: Option<Vec<String>>,
    #[serde(default)]
    last_updated: Option<DateTime<Utc>>,
    #[serde(default)]
    owner_contact: Option<String>,
}

impl FavoritesDocument {
    /// A fresh document with no saved codes.
    #[must_use]
    pub const fn empty(owner_id: OwnerId) -> Self {
        Self {
            owner_id,
            country_codes: BTreeSet::new(),
            last_updated: None,
            owner_contact: None,
        }
    }

    /// Decode a stored JSON object.
    ///
    /// Unknown fields are ignored. Duplicate codes collapse into the set and
    /// malformed codes are dropped with a warning instead of failing the read.
    pub fn from_stored(owner_id: OwnerId, value: Value) -> Result<Self> {
        let stored: StoredFavorites = serde_json::from_value(value)?;
        let mut country_codes = BTreeSet::new();
        for raw in stored.country_codes.unwrap_or_default() {
            match CountryCode::parse(&raw) {
                Ok(code) => {
                    country_codes.insert(code);
                }
                Err(_) => {
                    tracing::warn!("Dropping malformed country code {:?} for {}", raw, owner_id);
                }
            }
        }

        Ok(Self {
            owner_id,
            country_codes,
            last_updated: stored.last_updated,
            owner_contact: stored.owner_contact,
        })
    }

    #[must_use]
    pub fn contains(&self, code: &CountryCode) -> bool {
        self.country_codes.contains(code)
    }
}

/// The fields a favorites write is allowed to touch.
///
/// Writes always merge into the stored document: keys absent here (including
/// `owner_contact` when `None`) keep their stored values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FavoritesPatch {
    pub country_codes: BTreeSet<CountryCode>,
    pub last_updated: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_contact: Option<String>,
}

impl FavoritesPatch {
    /// Build a patch stamped with the current time.
    #[must_use]
    pub fn new(country_codes: BTreeSet<CountryCode>, owner_contact: Option<String>) -> Self {
        Self {
            country_codes,
            last_updated: Utc::now(),
            owner_contact,
        }
    }

    /// Render the patch as a JSON object of the fields to merge.
    pub fn to_fields(&self) -> Result<Map<String, Value>> {
        match serde_json::to_value(self)? {
            Value::Object(fields) => Ok(fields),
            other => Err(Error::InvalidInput(format!(
                "favorites patch rendered as non-object: {other}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn owner() -> OwnerId {
        OwnerId::new("user-1").unwrap()
    }

    fn codes(raw: &[&str]) -> BTreeSet<CountryCode> {
        raw.iter().map(|code| CountryCode::parse(code).unwrap()).collect()
    }

    #[test]
    fn test_from_stored_collapses_duplicates_and_drops_malformed() {
        let document = FavoritesDocument::from_stored(
            owner(),
            json!({
                "country_codes": ["FRA", "deu", "FRA", "not-a-code"],
                "owner_contact": "ana@example.com",
                "nickname": "ignored"
            }),
        )
        .unwrap();

        assert_eq!(document.country_codes, codes(&["DEU", "FRA"]));
        assert_eq!(document.owner_contact.as_deref(), Some("ana@example.com"));
        assert_eq!(document.last_updated, None);
    }

    #[test]
    fn test_from_stored_accepts_null_codes() {
        let document =
            FavoritesDocument::from_stored(owner(), json!({ "country_codes": null })).unwrap();
        assert!(document.country_codes.is_empty());
    }

    #[test]
    fn test_patch_omits_absent_contact() {
        let patch = FavoritesPatch::new(codes(&["FRA"]), None);
        let fields = patch.to_fields().unwrap();
        assert!(fields.contains_key("country_codes"));
        assert!(fields.contains_key("last_updated"));
        assert!(!fields.contains_key("owner_contact"));
        assert_eq!(fields["country_codes"], json!(["FRA"]));
    }
}
