//! Favorites synchronization between local UI state and the remote store.
//!
//! A [`FavoritesSynchronizer`] is mounted against a [`SessionContext`] and
//! follows whoever is signed in. It holds the last known favorites set, a
//! pending flag that serializes mutations, and the resolved listing shown on
//! a favorites page. Remote writes are merge-writes and local state only
//! changes after the store accepts them.

mod confirm;
mod notify;
mod toggle;

use std::collections::BTreeSet;
use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use thiserror::Error;

pub use confirm::{Confirmation, ConfirmationPrompt, Confirmer};
pub use notify::{Notification, NotificationLevel, Notifier, RecordingNotifier, TracingNotifier};
pub use toggle::{PendingMutation, RemovalConfirmation, ToggleAction, ToggleStep};

use crate::config::ClientConfig;
use crate::countries::{resolve_countries, CountrySource};
use crate::models::{Country, CountryCode, FavoritesPatch, OwnerId, OwnerIdentity};
use crate::session::{SessionContext, SessionSubscription};
use crate::store::FavoritesStore;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SyncError {
    #[error("Not signed in")]
    NotAuthenticated,

    #[error("Failed to read favorites: {0}")]
    RemoteRead(String),

    #[error("Failed to write favorites: {0}")]
    RemoteWrite(String),

    #[error("Another favorites update is still in progress")]
    Busy,

    #[error("Invalid country code: {0:?}")]
    InvalidCountryCode(String),
}

pub type SyncResult<T> = std::result::Result<T, SyncError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncOptions {
    /// Upper bound on each remote read or write.
    pub write_timeout: Duration,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            write_timeout: Duration::from_secs(10),
        }
    }
}

impl SyncOptions {
    pub fn from_config(config: &ClientConfig) -> Self {
        Self {
            write_timeout: config.write_timeout(),
        }
    }
}

/// Client-side view of the signed-in user's favorites.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocalFavoritesState {
    pub known_codes: BTreeSet<CountryCode>,
    pub pending: bool,
    pub listing: Vec<Country>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    Loaded { count: usize },
    /// No document exists yet; treated as an empty set.
    Missing,
    /// The read failed; local state was left empty.
    Failed(SyncError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    Added,
    Removed,
    Declined,
}

struct SyncInner {
    state: LocalFavoritesState,
    owner: Option<OwnerId>,
    session: SessionSubscription,
}

fn lock_inner(inner: &Mutex<SyncInner>) -> MutexGuard<'_, SyncInner> {
    inner.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Clears the pending flag when dropped.
struct PendingGuard<'a> {
    inner: &'a Mutex<SyncInner>,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        lock_inner(self.inner).state.pending = false;
    }
}

pub struct FavoritesSynchronizer<S, N> {
    store: S,
    notifier: N,
    options: SyncOptions,
    inner: Mutex<SyncInner>,
}

impl<S, N> std::fmt::Debug for FavoritesSynchronizer<S, N> {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = lock_inner(&self.inner);
        formatter
            .debug_struct("FavoritesSynchronizer")
            .field("owner", &inner.owner)
            .field("state", &inner.state)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl<S: FavoritesStore, N: Notifier> FavoritesSynchronizer<S, N> {
    /// Attach to `session`. Dropping (or [`unmount`](Self::unmount)ing) the
    /// synchronizer releases the session subscription.
    pub fn mount(store: S, notifier: N, session: &SessionContext, options: SyncOptions) -> Self {
        let mut subscription = session.subscribe();
        let owner = subscription.current().map(|identity| identity.id);
        tracing::debug!("Favorites synchronizer mounted (owner: {:?})", owner);
        Self {
            store,
            notifier,
            options,
            inner: Mutex::new(SyncInner {
                state: LocalFavoritesState::default(),
                owner,
                session: subscription,
            }),
        }
    }

    pub fn unmount(self) {
        tracing::debug!("Favorites synchronizer unmounted");
    }

    pub const fn store(&self) -> &S {
        &self.store
    }

    pub const fn notifier(&self) -> &N {
        &self.notifier
    }

    pub fn snapshot(&self) -> LocalFavoritesState {
        lock_inner(&self.inner).state.clone()
    }

    pub fn known_codes(&self) -> BTreeSet<CountryCode> {
        lock_inner(&self.inner).state.known_codes.clone()
    }

    pub fn is_favorite(&self, code: &CountryCode) -> bool {
        lock_inner(&self.inner).state.known_codes.contains(code)
    }

    pub fn is_pending(&self) -> bool {
        lock_inner(&self.inner).state.pending
    }

    pub fn listing(&self) -> Vec<Country> {
        lock_inner(&self.inner).state.listing.clone()
    }

    /// Fetch the owner's document and replace the known set with it.
    ///
    /// A read failure is reported through the notifier and
    /// [`LoadOutcome::Failed`]; only a missing session is an `Err`.
    pub async fn load(&self) -> SyncResult<LoadOutcome> {
        let identity = self.current_owner()?;
        let fetched = self.bounded(self.store.fetch_document(&identity.id)).await;

        let outcome = match fetched {
            Ok(Some(document)) => {
                let count = document.country_codes.len();
                self.apply_if_current(&identity.id, |state| {
                    state.known_codes = document.country_codes;
                });
                LoadOutcome::Loaded { count }
            }
            Ok(None) => {
                self.apply_if_current(&identity.id, |state| state.known_codes.clear());
                LoadOutcome::Missing
            }
            Err(message) => {
                tracing::warn!("Loading favorites for {} failed: {}", identity.id, message);
                self.apply_if_current(&identity.id, |state| state.known_codes.clear());
                self.notifier
                    .notify(Notification::warning("Failed to load favorites"));
                LoadOutcome::Failed(SyncError::RemoteRead(message))
            }
        };
        Ok(outcome)
    }

    /// Start toggling `code`. Adding goes straight to
    /// [`ToggleStep::Ready`]; removing asks for confirmation first.
    pub fn begin_toggle(&self, code: &str, display_name: &str) -> SyncResult<ToggleStep<'_, S, N>> {
        let identity = match self.current_owner() {
            Ok(identity) => identity,
            Err(error) => {
                self.notifier
                    .notify(Notification::error("Please login to save favorites"));
                return Err(error);
            }
        };
        let code = parse_code(code)?;
        let guard = self.acquire_pending()?;

        let is_favorite = self.is_favorite(&code);
        let display_name = match display_name.trim() {
            "" => code.to_string(),
            name => name.to_string(),
        };
        let mutation = PendingMutation {
            sync: self,
            identity,
            code,
            display_name,
            action: if is_favorite {
                ToggleAction::Remove
            } else {
                ToggleAction::Add
            },
            _guard: guard,
        };

        Ok(if is_favorite {
            ToggleStep::AwaitingConfirmation(RemovalConfirmation::new(mutation))
        } else {
            ToggleStep::Ready(mutation)
        })
    }

    /// Toggle `code`, asking `confirmer` before a removal.
    pub async fn toggle<C: Confirmer + ?Sized>(
        &self,
        code: &str,
        display_name: &str,
        confirmer: &C,
    ) -> SyncResult<ToggleOutcome> {
        let mutation = match self.begin_toggle(code, display_name)? {
            ToggleStep::Ready(mutation) => mutation,
            ToggleStep::AwaitingConfirmation(confirmation) => {
                let answer = confirmer.confirm(confirmation.prompt()).await;
                match confirmation.resolve(answer) {
                    Some(mutation) => mutation,
                    None => return Ok(ToggleOutcome::Declined),
                }
            }
        };
        mutation.commit().await
    }

    /// Remove `code` from the stored document without confirmation.
    ///
    /// Reads the current remote set instead of trusting local state, then
    /// merge-writes the filtered set. Removing an absent code still writes.
    pub async fn remove(&self, code: &str) -> SyncResult<()> {
        let identity = self.current_owner()?;
        let code = parse_code(code)?;
        let _guard = self.acquire_pending()?;

        let stored = match self.bounded(self.store.fetch_document(&identity.id)).await {
            Ok(document) => document.map(|document| document.country_codes),
            Err(message) => {
                tracing::warn!("Reading favorites before removing {} failed: {}", code, message);
                self.notifier
                    .notify(Notification::error("Failed to remove favorite"));
                return Err(SyncError::RemoteRead(message));
            }
        };

        let mut remaining = stored.unwrap_or_default();
        remaining.remove(&code);
        let patch = FavoritesPatch::new(remaining, identity.contact.clone());
        if let Err(message) = self
            .bounded(self.store.write_document(&identity.id, &patch))
            .await
        {
            tracing::warn!("Removing {} from favorites failed: {}", code, message);
            self.notifier
                .notify(Notification::error("Failed to remove favorite"));
            return Err(SyncError::RemoteWrite(message));
        }

        let mut label = code.to_string();
        self.apply_if_current(&identity.id, |state| {
            if let Some(country) = state
                .listing
                .iter()
                .find(|country| country.cca3.eq_ignore_ascii_case(code.as_str()))
            {
                label = country.display_name().to_string();
            }
            state
                .listing
                .retain(|country| !country.cca3.eq_ignore_ascii_case(code.as_str()));
            state.known_codes.remove(&code);
        });

        tracing::info!("{} removed from favorites", code);
        self.notifier
            .notify(Notification::success(format!("{label} removed from favorites")));
        Ok(())
    }

    /// Resolve every known code against `source` and keep the result as the
    /// listing. Codes that fail to resolve are skipped.
    pub async fn refresh_listing<C: CountrySource + ?Sized>(
        &self,
        source: &C,
    ) -> SyncResult<Vec<Country>> {
        let identity = self.current_owner()?;
        let codes = self.known_codes().into_iter().collect::<Vec<_>>();
        let countries = resolve_countries(source, &codes).await;
        self.apply_if_current(&identity.id, |state| state.listing.clone_from(&countries));
        Ok(countries)
    }

    /// Current identity, resetting local state if the owner changed since the
    /// last call.
    fn current_owner(&self) -> SyncResult<OwnerIdentity> {
        let mut inner = lock_inner(&self.inner);
        let identity = inner.session.current();
        let owner = identity.as_ref().map(|identity| identity.id.clone());
        if owner != inner.owner {
            tracing::debug!("Session owner changed; clearing local favorites");
            let pending = inner.state.pending;
            inner.state = LocalFavoritesState {
                pending,
                ..LocalFavoritesState::default()
            };
            inner.owner = owner;
        }
        identity.ok_or(SyncError::NotAuthenticated)
    }

    fn acquire_pending(&self) -> SyncResult<PendingGuard<'_>> {
        let mut inner = lock_inner(&self.inner);
        if inner.state.pending {
            return Err(SyncError::Busy);
        }
        inner.state.pending = true;
        Ok(PendingGuard { inner: &self.inner })
    }

    /// Apply `update` unless the session moved to another owner meanwhile.
    fn apply_if_current<F>(&self, owner: &OwnerId, update: F) -> bool
    where
        F: FnOnce(&mut LocalFavoritesState),
    {
        let mut inner = lock_inner(&self.inner);
        let live_owner = inner.session.current().map(|identity| identity.id);
        if live_owner.as_ref() == Some(owner) && inner.owner.as_ref() == Some(owner) {
            update(&mut inner.state);
            true
        } else {
            tracing::debug!("Dropping favorites update for {}; owner changed", owner);
            false
        }
    }

    async fn bounded<T>(
        &self,
        operation: impl Future<Output = crate::Result<T>>,
    ) -> std::result::Result<T, String> {
        match tokio::time::timeout(self.options.write_timeout, operation).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(error)) => Err(error.to_string()),
            Err(_) => Err(format!("timed out after {:?}", self.options.write_timeout)),
        }
    }
}

fn parse_code(raw: &str) -> SyncResult<CountryCode> {
    CountryCode::parse(raw).map_err(|_| SyncError::InvalidCountryCode(raw.to_string()))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use tokio::sync::{Notify, Semaphore};

    use super::*;
    use crate::countries::test_support::{country, MapCountrySource};
    use crate::error::Error;
    use crate::models::FavoritesDocument;
    use crate::store::MemoryFavoritesStore;

    type TestSync = FavoritesSynchronizer<Arc<MemoryFavoritesStore>, Arc<RecordingNotifier>>;

    fn owner(id: &str) -> OwnerId {
        OwnerId::new(id).unwrap()
    }

    fn identity(id: &str) -> OwnerIdentity {
        OwnerIdentity::new(owner(id), Some(format!("{id}@example.com")))
    }

    fn codes(raw: &[&str]) -> BTreeSet<CountryCode> {
        raw.iter().map(|code| CountryCode::parse(code).unwrap()).collect()
    }

    fn mount(session: &SessionContext) -> (TestSync, Arc<MemoryFavoritesStore>, Arc<RecordingNotifier>) {
        let store = Arc::new(MemoryFavoritesStore::new());
        let notifier = Arc::new(RecordingNotifier::new());
        let sync = FavoritesSynchronizer::mount(
            Arc::clone(&store),
            Arc::clone(&notifier),
            session,
            SyncOptions::default(),
        );
        (sync, store, notifier)
    }

    fn stored_codes(store: &MemoryFavoritesStore, id: &str) -> serde_json::Value {
        store.raw_document(&owner(id)).unwrap()["country_codes"].clone()
    }

    /// Confirmer that records every prompt and answers with a fixed value.
    struct ScriptedConfirmer {
        answer: Confirmation,
        prompts: Mutex<Vec<ConfirmationPrompt>>,
    }

    impl ScriptedConfirmer {
        fn new(answer: Confirmation) -> Self {
            Self {
                answer,
                prompts: Mutex::new(Vec::new()),
            }
        }

        fn prompts(&self) -> Vec<ConfirmationPrompt> {
            self.prompts.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Confirmer for ScriptedConfirmer {
        async fn confirm(&self, prompt: &ConfirmationPrompt) -> Confirmation {
            self.prompts.lock().unwrap().push(prompt.clone());
            self.answer
        }
    }

    /// Store whose writes block until a permit is released.
    struct GatedStore {
        inner: MemoryFavoritesStore,
        gate: Semaphore,
        entered: Notify,
    }

    impl GatedStore {
        fn new() -> Self {
            Self {
                inner: MemoryFavoritesStore::new(),
                gate: Semaphore::new(0),
                entered: Notify::new(),
            }
        }
    }

    #[async_trait]
    impl FavoritesStore for GatedStore {
        async fn fetch_document(&self, owner: &OwnerId) -> crate::Result<Option<FavoritesDocument>> {
            self.inner.fetch_document(owner).await
        }

        async fn write_document(&self, owner: &OwnerId, patch: &FavoritesPatch) -> crate::Result<()> {
            self.entered.notify_one();
            let _permit = self
                .gate
                .acquire()
                .await
                .map_err(|error| Error::Store(error.to_string()))?;
            self.inner.write_document(owner, patch).await
        }
    }

    async fn seeded(session: &SessionContext, stored: &[&str]) -> (TestSync, Arc<MemoryFavoritesStore>, Arc<RecordingNotifier>) {
        let (sync, store, notifier) = mount(session);
        store.insert_raw(
            &owner("ana"),
            json!({
                "country_codes": stored,
                "owner_contact": "ana@example.com",
                "display_name": "Ana",
            }),
        );
        sync.load().await.unwrap();
        (sync, store, notifier)
    }

    #[tokio::test(flavor = "current_thread")]
    async fn load_replaces_known_codes() {
        let session = SessionContext::signed_in(identity("ana"));
        let (sync, store, _) = mount(&session);
        store.insert_raw(&owner("ana"), json!({"country_codes": ["FRA", "DEU"]}));

        assert_eq!(sync.load().await.unwrap(), LoadOutcome::Loaded { count: 2 });
        assert_eq!(sync.known_codes(), codes(&["DEU", "FRA"]));
        assert!(!sync.is_pending());
    }

    #[tokio::test(flavor = "current_thread")]
    async fn load_treats_missing_document_as_empty() {
        let session = SessionContext::signed_in(identity("ana"));
        let (sync, _, notifier) = mount(&session);

        assert_eq!(sync.load().await.unwrap(), LoadOutcome::Missing);
        assert!(sync.known_codes().is_empty());
        assert!(notifier.notifications().is_empty());
    }

    #[tokio::test(flavor = "current_thread")]
    async fn load_failure_leaves_state_empty_and_warns() {
        let session = SessionContext::signed_in(identity("ana"));
        let (sync, store, notifier) = seeded(&session, &["FRA"]).await;
        store.set_fail_reads(true);

        let outcome = sync.load().await.unwrap();
        assert!(matches!(outcome, LoadOutcome::Failed(SyncError::RemoteRead(_))));
        assert!(sync.known_codes().is_empty());
        assert_eq!(
            notifier.last(),
            Some(Notification::warning("Failed to load favorites"))
        );
    }

    #[tokio::test(flavor = "current_thread")]
    async fn load_without_session_is_rejected() {
        let session = SessionContext::new();
        let (sync, _, _) = mount(&session);
        assert_eq!(sync.load().await, Err(SyncError::NotAuthenticated));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn toggle_adds_without_confirmation_and_keeps_other_fields() {
        let session = SessionContext::signed_in(identity("ana"));
        let (sync, store, notifier) = seeded(&session, &["FRA"]).await;
        let confirmer = ScriptedConfirmer::new(Confirmation::Declined);

        let outcome = sync.toggle("DEU", "Germany", &confirmer).await.unwrap();

        assert_eq!(outcome, ToggleOutcome::Added);
        assert!(confirmer.prompts().is_empty());
        assert_eq!(sync.known_codes(), codes(&["DEU", "FRA"]));
        assert_eq!(stored_codes(&store, "ana"), json!(["FRA", "DEU"]));
        let raw = store.raw_document(&owner("ana")).unwrap();
        assert_eq!(raw["display_name"], json!("Ana"));
        assert_eq!(raw["owner_contact"], json!("ana@example.com"));
        assert!(raw["last_updated"].is_string());
        assert_eq!(
            notifier.last(),
            Some(Notification::success("Germany added to favorites"))
        );
        assert!(!sync.is_pending());
    }

    #[tokio::test(flavor = "current_thread")]
    async fn toggle_removes_after_confirmation() {
        let session = SessionContext::signed_in(identity("ana"));
        let (sync, store, notifier) = seeded(&session, &["FRA", "DEU"]).await;
        let confirmer = ScriptedConfirmer::new(Confirmation::Confirmed);

        let outcome = sync.toggle("fra", "France", &confirmer).await.unwrap();

        assert_eq!(outcome, ToggleOutcome::Removed);
        assert_eq!(confirmer.prompts()[0].title, "Remove France?");
        assert_eq!(sync.known_codes(), codes(&["DEU"]));
        assert_eq!(stored_codes(&store, "ana"), json!(["DEU"]));
        assert_eq!(
            notifier.last(),
            Some(Notification::success("France removed from favorites"))
        );
    }

    #[tokio::test(flavor = "current_thread")]
    async fn declined_removal_writes_nothing() {
        let session = SessionContext::signed_in(identity("ana"));
        let (sync, store, notifier) = seeded(&session, &["FRA", "DEU"]).await;
        let before = store.raw_document(&owner("ana"));

        let outcome = sync
            .toggle("FRA", "France", &Confirmation::Declined)
            .await
            .unwrap();

        assert_eq!(outcome, ToggleOutcome::Declined);
        assert_eq!(store.write_count(), 0);
        assert_eq!(store.raw_document(&owner("ana")), before);
        assert_eq!(sync.known_codes(), codes(&["DEU", "FRA"]));
        assert!(notifier.notifications().is_empty());
        assert!(!sync.is_pending());
    }

    #[tokio::test(flavor = "current_thread")]
    async fn failed_write_keeps_local_state() {
        let session = SessionContext::signed_in(identity("ana"));
        let (sync, store, notifier) = seeded(&session, &["FRA"]).await;
        store.set_fail_writes(true);

        let result = sync
            .toggle("DEU", "Germany", &Confirmation::Confirmed)
            .await;

        assert!(matches!(result, Err(SyncError::RemoteWrite(_))));
        assert_eq!(sync.known_codes(), codes(&["FRA"]));
        assert_eq!(stored_codes(&store, "ana"), json!(["FRA"]));
        assert_eq!(
            notifier.last(),
            Some(Notification::error("Failed to update favorites"))
        );
        assert!(!sync.is_pending());
    }

    #[tokio::test(flavor = "current_thread")]
    async fn toggle_without_session_asks_to_log_in() {
        let session = SessionContext::new();
        let (sync, store, notifier) = mount(&session);

        let result = sync
            .toggle("DEU", "Germany", &Confirmation::Confirmed)
            .await;

        assert_eq!(result, Err(SyncError::NotAuthenticated));
        assert_eq!(store.write_count(), 0);
        assert_eq!(
            notifier.last(),
            Some(Notification::error("Please login to save favorites"))
        );
    }

    #[tokio::test(flavor = "current_thread")]
    async fn toggle_rejects_malformed_codes() {
        let session = SessionContext::signed_in(identity("ana"));
        let (sync, store, _) = mount(&session);

        for raw in ["", "DE", "D3U", "GERMANY"] {
            let result = sync.toggle(raw, "x", &Confirmation::Confirmed).await;
            assert_eq!(result, Err(SyncError::InvalidCountryCode(raw.to_string())));
        }
        assert_eq!(store.write_count(), 0);
        assert!(!sync.is_pending());
    }

    #[tokio::test(flavor = "current_thread")]
    async fn sequential_toggles_compose() {
        let session = SessionContext::signed_in(identity("ana"));
        let (sync, store, _) = seeded(&session, &["FRA"]).await;

        for (code, name) in [("DEU", "Germany"), ("FRA", "France"), ("JPN", "Japan"), ("DEU", "Germany")] {
            sync.toggle(code, name, &Confirmation::Confirmed).await.unwrap();
        }

        assert_eq!(sync.known_codes(), codes(&["JPN"]));
        assert_eq!(stored_codes(&store, "ana"), json!(["JPN"]));
        assert_eq!(store.write_count(), 4);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn concurrent_toggle_is_rejected_while_pending() {
        let session = SessionContext::signed_in(identity("ana"));
        let store = Arc::new(GatedStore::new());
        let notifier = Arc::new(RecordingNotifier::new());
        let sync = FavoritesSynchronizer::mount(
            Arc::clone(&store),
            Arc::clone(&notifier),
            &session,
            SyncOptions::default(),
        );

        let first = sync.toggle("FRA", "France", &Confirmation::Confirmed);
        let second = async {
            store.entered.notified().await;
            assert!(sync.is_pending());
            let busy = sync.toggle("DEU", "Germany", &Confirmation::Confirmed).await;
            store.gate.add_permits(1);
            busy
        };
        let (first, second) = tokio::join!(first, second);

        assert_eq!(first, Ok(ToggleOutcome::Added));
        assert_eq!(second, Err(SyncError::Busy));
        assert!(!sync.is_pending());

        store.gate.add_permits(1);
        sync.toggle("DEU", "Germany", &Confirmation::Confirmed)
            .await
            .unwrap();
        assert_eq!(sync.known_codes(), codes(&["DEU", "FRA"]));
        assert_eq!(
            store.inner.raw_document(&owner("ana")).unwrap()["country_codes"],
            json!(["DEU", "FRA"])
        );
    }

    #[tokio::test(flavor = "current_thread")]
    async fn stalled_write_times_out() {
        let session = SessionContext::signed_in(identity("ana"));
        let store = Arc::new(GatedStore::new());
        let notifier = Arc::new(RecordingNotifier::new());
        let sync = FavoritesSynchronizer::mount(
            Arc::clone(&store),
            Arc::clone(&notifier),
            &session,
            SyncOptions {
                write_timeout: Duration::from_millis(20),
            },
        );

        let result = sync
            .toggle("FRA", "France", &Confirmation::Confirmed)
            .await;

        match result {
            Err(SyncError::RemoteWrite(message)) => assert!(message.contains("timed out")),
            other => panic!("expected a timeout, got {other:?}"),
        }
        assert!(sync.known_codes().is_empty());
        assert!(!sync.is_pending());
        assert_eq!(
            notifier.last(),
            Some(Notification::error("Failed to update favorites"))
        );
    }

    #[tokio::test(flavor = "current_thread")]
    async fn dropping_an_unanswered_confirmation_releases_pending() {
        let session = SessionContext::signed_in(identity("ana"));
        let (sync, store, _) = seeded(&session, &["FRA"]).await;

        let step = sync.begin_toggle("FRA", "France").unwrap();
        let ToggleStep::AwaitingConfirmation(confirmation) = step else {
            panic!("removal should ask for confirmation");
        };
        assert_eq!(confirmation.code().as_str(), "FRA");
        assert!(sync.is_pending());
        assert!(matches!(sync.begin_toggle("DEU", "Germany"), Err(SyncError::Busy)));

        drop(confirmation);
        assert!(!sync.is_pending());
        assert_eq!(store.write_count(), 0);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn remove_filters_listing_and_remote_set() {
        let session = SessionContext::signed_in(identity("ana"));
        let (sync, store, notifier) = seeded(&session, &["FRA", "DEU", "KEN"]).await;
        let source = MapCountrySource::with(vec![
            country("FRA", "France", "Europe"),
            country("DEU", "Germany", "Europe"),
            country("KEN", "Kenya", "Africa"),
        ]);
        assert_eq!(sync.refresh_listing(&source).await.unwrap().len(), 3);

        sync.remove("DEU").await.unwrap();

        assert_eq!(sync.known_codes(), codes(&["FRA", "KEN"]));
        let names = sync
            .listing()
            .iter()
            .map(|country| country.display_name().to_string())
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["France", "Kenya"]);
        assert_eq!(stored_codes(&store, "ana"), json!(["FRA", "KEN"]));
        assert_eq!(
            notifier.last(),
            Some(Notification::success("Germany removed from favorites"))
        );
    }

    #[tokio::test(flavor = "current_thread")]
    async fn remove_uses_remote_set_and_is_idempotent() {
        let session = SessionContext::signed_in(identity("ana"));
        let (sync, store, _) = seeded(&session, &["FRA"]).await;
        // Another device added JPN after our load.
        store.insert_raw(&owner("ana"), json!({"country_codes": ["FRA", "JPN"]}));

        sync.remove("BRA").await.unwrap();
        assert_eq!(sync.known_codes(), codes(&["FRA"]));
        assert_eq!(store.write_count(), 1);
        assert_eq!(stored_codes(&store, "ana"), json!(["FRA", "JPN"]));

        sync.remove("FRA").await.unwrap();
        assert_eq!(stored_codes(&store, "ana"), json!(["JPN"]));
        assert!(sync.known_codes().is_empty());
    }

    #[tokio::test(flavor = "current_thread")]
    async fn remove_write_failure_leaves_state() {
        let session = SessionContext::signed_in(identity("ana"));
        let (sync, store, notifier) = seeded(&session, &["FRA", "DEU"]).await;
        let source = MapCountrySource::with(vec![
            country("FRA", "France", "Europe"),
            country("DEU", "Germany", "Europe"),
        ]);
        sync.refresh_listing(&source).await.unwrap();
        let before = sync.snapshot();
        store.set_fail_writes(true);

        let result = sync.remove("FRA").await;

        assert!(matches!(result, Err(SyncError::RemoteWrite(_))));
        assert_eq!(sync.snapshot(), before);
        assert_eq!(sync.listing().len(), 2);
        assert_eq!(sync.known_codes(), codes(&["DEU", "FRA"]));
        assert!(!sync.is_pending());
        assert_eq!(stored_codes(&store, "ana"), json!(["FRA", "DEU"]));
        assert_eq!(
            notifier.last(),
            Some(Notification::error("Failed to remove favorite"))
        );
    }

    #[tokio::test(flavor = "current_thread")]
    async fn remove_read_failure_leaves_listing() {
        let session = SessionContext::signed_in(identity("ana"));
        let (sync, store, notifier) = seeded(&session, &["FRA"]).await;
        let source = MapCountrySource::with(vec![country("FRA", "France", "Europe")]);
        sync.refresh_listing(&source).await.unwrap();
        store.set_fail_reads(true);

        let result = sync.remove("FRA").await;

        assert!(matches!(result, Err(SyncError::RemoteRead(_))));
        assert_eq!(sync.listing().len(), 1);
        assert_eq!(store.write_count(), 0);
        assert_eq!(
            notifier.last(),
            Some(Notification::error("Failed to remove favorite"))
        );
    }

    #[tokio::test(flavor = "current_thread")]
    async fn owner_change_resets_local_state() {
        let session = SessionContext::signed_in(identity("ana"));
        let (sync, store, _) = seeded(&session, &["FRA"]).await;
        assert_eq!(sync.known_codes(), codes(&["FRA"]));

        session.sign_in(identity("ben"));
        sync.toggle("DEU", "Germany", &Confirmation::Confirmed)
            .await
            .unwrap();

        assert_eq!(sync.known_codes(), codes(&["DEU"]));
        assert_eq!(stored_codes(&store, "ben"), json!(["DEU"]));
        assert_eq!(stored_codes(&store, "ana"), json!(["FRA"]));

        session.sign_out();
        assert_eq!(sync.load().await, Err(SyncError::NotAuthenticated));
        assert!(sync.known_codes().is_empty());
    }

    #[test]
    fn options_follow_client_config() {
        let config = ClientConfig {
            write_timeout_secs: Some(3),
            ..ClientConfig::default()
        };
        assert_eq!(
            SyncOptions::from_config(&config).write_timeout,
            Duration::from_secs(3)
        );
        assert_eq!(SyncOptions::default().write_timeout, Duration::from_secs(10));
    }
}
