//! In-memory favorites store.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use serde_json::{Map, Value};

use super::FavoritesStore;
use crate::error::{Error, Result};
use crate::models::{FavoritesDocument, FavoritesPatch, OwnerId};

/// Favorites store kept in process memory.
///
/// Documents are stored as raw JSON objects so merge semantics are observable:
/// a write only replaces the keys present in the patch. Reads and writes can
/// be made to fail on demand.
#[derive(Debug, Default)]
pub struct MemoryFavoritesStore {
    documents: Mutex<BTreeMap<OwnerId, Map<String, Value>>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    writes: AtomicUsize,
}

impl MemoryFavoritesStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a raw document. Non-object values are stored as an empty object.
    pub fn insert_raw(&self, owner: &OwnerId, document: Value) {
        let fields = match document {
            Value::Object(fields) => fields,
            _ => Map::new(),
        };
        self.documents().insert(owner.clone(), fields);
    }

    /// The raw stored document, including fields the core does not own.
    pub fn raw_document(&self, owner: &OwnerId) -> Option<Value> {
        self.documents().get(owner).cloned().map(Value::Object)
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of successful writes so far.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn documents(&self) -> MutexGuard<'_, BTreeMap<OwnerId, Map<String, Value>>> {
        self.documents
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl FavoritesStore for MemoryFavoritesStore {
    async fn fetch_document(&self, owner: &OwnerId) -> Result<Option<FavoritesDocument>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(Error::Store("read rejected by memory store".to_string()));
        }

        let raw = self.documents().get(owner).cloned();
        raw.map(|fields| FavoritesDocument::from_stored(owner.clone(), Value::Object(fields)))
            .transpose()
    }

    async fn write_document(&self, owner: &OwnerId, patch: &FavoritesPatch) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Error::Store("write rejected by memory store".to_string()));
        }

        let fields = patch.to_fields()?;
        let mut documents = self.documents();
        let document = documents.entry(owner.clone()).or_default();
        for (key, value) in fields {
            document.insert(key, value);
        }
        drop(documents);

        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::models::CountryCode;

    fn owner() -> OwnerId {
        OwnerId::new("user-1").unwrap()
    }

    #[tokio::test(flavor = "current_thread")]
    async fn fetch_missing_document_returns_none() {
        let store = MemoryFavoritesStore::new();
        assert_eq!(store.fetch_document(&owner()).await.unwrap(), None);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn write_merges_into_existing_fields() {
        let store = MemoryFavoritesStore::new();
        store.insert_raw(
            &owner(),
            json!({
                "country_codes": ["FRA"],
                "owner_contact": "ana@example.com",
                "display_name": "Ana"
            }),
        );

        let codes = BTreeSet::from([CountryCode::parse("DEU").unwrap()]);
        store
            .write_document(&owner(), &FavoritesPatch::new(codes, None))
            .await
            .unwrap();

        let raw = store.raw_document(&owner()).unwrap();
        assert_eq!(raw["country_codes"], json!(["DEU"]));
        assert_eq!(raw["owner_contact"], json!("ana@example.com"));
        assert_eq!(raw["display_name"], json!("Ana"));
        assert_eq!(store.write_count(), 1);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn injected_failures_surface_as_store_errors() {
        let store = MemoryFavoritesStore::new();
        store.set_fail_reads(true);
        store.set_fail_writes(true);

        assert!(matches!(
            store.fetch_document(&owner()).await,
            Err(Error::Store(_))
        ));
        let patch = FavoritesPatch::new(BTreeSet::new(), None);
        assert!(matches!(
            store.write_document(&owner(), &patch).await,
            Err(Error::Store(_))
        ));
        assert_eq!(store.write_count(), 0);
    }
}
