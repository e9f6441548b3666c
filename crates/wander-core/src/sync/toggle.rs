//! Two-phase toggle: an optional confirmation step followed by a guarded write.

use super::{
    Confirmation, ConfirmationPrompt, FavoritesSynchronizer, Notification, Notifier,
    PendingGuard, SyncError, SyncResult, ToggleOutcome,
};
use crate::models::{CountryCode, FavoritesPatch, OwnerIdentity};
use crate::store::FavoritesStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleAction {
    Add,
    Remove,
}

/// Where a toggle stands after [`FavoritesSynchronizer::begin_toggle`].
///
/// The pending flag stays raised until the step (or the mutation it yields)
/// is committed or dropped.
pub enum ToggleStep<'a, S, N> {
    Ready(PendingMutation<'a, S, N>),
    AwaitingConfirmation(RemovalConfirmation<'a, S, N>),
}

/// A removal waiting on the user's answer.
pub struct RemovalConfirmation<'a, S, N> {
    mutation: PendingMutation<'a, S, N>,
    prompt: ConfirmationPrompt,
}

impl<'a, S, N> RemovalConfirmation<'a, S, N> {
    pub(super) fn new(mutation: PendingMutation<'a, S, N>) -> Self {
        let prompt = ConfirmationPrompt::removal(&mutation.display_name);
        Self { mutation, prompt }
    }

    pub const fn prompt(&self) -> &ConfirmationPrompt {
        &self.prompt
    }

    pub const fn code(&self) -> &CountryCode {
        &self.mutation.code
    }

    /// `None` when declined; nothing was written and the pending flag drops.
    pub fn resolve(self, answer: Confirmation) -> Option<PendingMutation<'a, S, N>> {
        match answer {
            Confirmation::Confirmed => Some(self.mutation),
            Confirmation::Declined => {
                tracing::debug!("Removal of {} declined", self.mutation.code);
                None
            }
        }
    }
}

/// A validated add or remove that has not been written yet.
pub struct PendingMutation<'a, S, N> {
    pub(super) sync: &'a FavoritesSynchronizer<S, N>,
    pub(super) identity: OwnerIdentity,
    pub(super) code: CountryCode,
    pub(super) display_name: String,
    pub(super) action: ToggleAction,
    pub(super) _guard: PendingGuard<'a>,
}

impl<S, N> PendingMutation<'_, S, N> {
    pub const fn action(&self) -> ToggleAction {
        self.action
    }

    pub const fn code(&self) -> &CountryCode {
        &self.code
    }
}

impl<S: FavoritesStore, N: Notifier> PendingMutation<'_, S, N> {
    /// Merge-write the new favorites set, then update local state.
    ///
    /// Local state only changes after the store confirms the write.
    pub async fn commit(self) -> SyncResult<ToggleOutcome> {
        let sync = self.sync;
        let mut next = sync.known_codes();
        match self.action {
            ToggleAction::Add => {
                next.insert(self.code.clone());
            }
            ToggleAction::Remove => {
                next.remove(&self.code);
            }
        }

        let patch = FavoritesPatch::new(next.clone(), self.identity.contact.clone());
        let written = sync
            .bounded(sync.store.write_document(&self.identity.id, &patch))
            .await;

        if let Err(message) = written {
            tracing::warn!("Favorites write for {} failed: {}", self.code, message);
            sync.notifier
                .notify(Notification::error("Failed to update favorites"));
            return Err(SyncError::RemoteWrite(message));
        }

        let code = &self.code;
        let action = self.action;
        sync.apply_if_current(&self.identity.id, |state| {
            state.known_codes = next;
            if action == ToggleAction::Remove {
                state
                    .listing
                    .retain(|country| !country.cca3.eq_ignore_ascii_case(code.as_str()));
            }
        });

        let (outcome, verb) = match self.action {
            ToggleAction::Add => (ToggleOutcome::Added, "added to"),
            ToggleAction::Remove => (ToggleOutcome::Removed, "removed from"),
        };
        tracing::info!("{} {} favorites", self.code, verb);
        sync.notifier.notify(Notification::success(format!(
            "{} {verb} favorites",
            self.display_name
        )));
        Ok(outcome)
    }
}
