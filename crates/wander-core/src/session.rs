//! Explicit session context shared between the identity provider and the
//! favorites synchronizer.
//!
//! A `SessionContext` is created by whoever owns the UI/CLI lifecycle and
//! handed to the components that need the current identity. Components that
//! care about sign-in/sign-out subscribe for change notifications and drop
//! the subscription when they go away.

use std::sync::Arc;

use tokio::sync::watch;

use crate::models::OwnerIdentity;
use crate::sync::{SyncError, SyncResult};

#[derive(Debug, Clone)]
pub struct SessionContext {
    sender: Arc<watch::Sender<Option<OwnerIdentity>>>,
}

impl Default for SessionContext {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionContext {
    /// A context with nobody signed in.
    #[must_use]
    pub fn new() -> Self {
        let (sender, _receiver) = watch::channel(None);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// A context that starts with `identity` signed in.
    #[must_use]
    pub fn signed_in(identity: OwnerIdentity) -> Self {
        let context = Self::new();
        context.sign_in(identity);
        context
    }

    pub fn sign_in(&self, identity: OwnerIdentity) {
        tracing::debug!("Session signed in as {}", identity.id);
        self.sender.send_replace(Some(identity));
    }

    pub fn sign_out(&self) {
        tracing::debug!("Session signed out");
        self.sender.send_replace(None);
    }

    #[must_use]
    pub fn current_identity(&self) -> Option<OwnerIdentity> {
        self.sender.borrow().clone()
    }

    /// The current identity, or `NotAuthenticated` when nobody is signed in.
    pub fn require_identity(&self) -> SyncResult<OwnerIdentity> {
        self.current_identity().ok_or(SyncError::NotAuthenticated)
    }

    #[must_use]
    pub fn is_signed_in(&self) -> bool {
        self.sender.borrow().is_some()
    }

    /// Subscribe to session changes. Dropping the subscription unsubscribes.
    #[must_use]
    pub fn subscribe(&self) -> SessionSubscription {
        SessionSubscription {
            receiver: self.sender.subscribe(),
        }
    }
}

/// Receiving end of a [`SessionContext`].
#[derive(Debug)]
pub struct SessionSubscription {
    receiver: watch::Receiver<Option<OwnerIdentity>>,
}

impl SessionSubscription {
    /// The identity as of now, marking any pending change as seen.
    pub fn current(&mut self) -> Option<OwnerIdentity> {
        self.receiver.borrow_and_update().clone()
    }

    /// Whether the session changed since the last [`current`](Self::current) call.
    #[must_use]
    pub fn has_changed(&self) -> bool {
        self.receiver.has_changed().unwrap_or(false)
    }

    /// Wait for the next change. Returns `None` once every context handle is gone.
    pub async fn changed(&mut self) -> Option<Option<OwnerIdentity>> {
        self.receiver.changed().await.ok()?;
        Some(self.receiver.borrow_and_update().clone())
    }
}
