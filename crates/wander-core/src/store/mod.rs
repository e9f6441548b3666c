//! Remote favorites store: one document per owner, merge-only writes.

mod memory;
mod supabase;

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{FavoritesDocument, FavoritesPatch, OwnerId, OwnerIdentity};

pub use memory::MemoryFavoritesStore;
pub use supabase::{SupabaseFavoritesStore, DEFAULT_FAVORITES_TABLE};

/// Durable per-user favorites storage.
///
/// There is no whole-document overwrite: `write_document` merges
/// the patch into whatever is stored, so fields this core does not own survive.
#[async_trait]
pub trait FavoritesStore: Send + Sync {
    /// Fetch the document for `owner`, or `None` when it was never created.
    async fn fetch_document(&self, owner: &OwnerId) -> Result<Option<FavoritesDocument>>;

    /// Merge `patch` into the document for `owner`, creating it if missing.
    async fn write_document(&self, owner: &OwnerId, patch: &FavoritesPatch) -> Result<()>;
}

#[async_trait]
impl<T: FavoritesStore + ?Sized> FavoritesStore for Arc<T> {
    async fn fetch_document(&self, owner: &OwnerId) -> Result<Option<FavoritesDocument>> {
        (**self).fetch_document(owner).await
    }

    async fn write_document(&self, owner: &OwnerId, patch: &FavoritesPatch) -> Result<()> {
        (**self).write_document(owner, patch).await
    }
}

/// Create the empty favorites document for a newly registered account.
///
/// Existing documents keep their codes; only the contact field is refreshed.
pub async fn initialize_document<S: FavoritesStore + ?Sized>(
    store: &S,
    identity: &OwnerIdentity,
) -> Result<FavoritesDocument> {
    if let Some(existing) = store.fetch_document(&identity.id).await? {
        tracing::debug!("Favorites document for {} already exists", identity.id);
        return Ok(existing);
    }

    let patch = FavoritesPatch::new(BTreeSet::new(), identity.contact.clone());
    store.write_document(&identity.id, &patch).await?;
    tracing::info!("Created favorites document for {}", identity.id);
    let mut document = FavoritesDocument::empty(identity.id.clone());
    document.last_updated = Some(patch.last_updated);
    document.owner_contact = identity.contact.clone();
    Ok(document)
}
