//! Confirmation step for destructive favorites changes.

use async_trait::async_trait;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    Confirmed,
    Declined,
}

impl Confirmation {
    #[must_use]
    pub const fn from_bool(confirmed: bool) -> Self {
        if confirmed {
            Self::Confirmed
        } else {
            Self::Declined
        }
    }
}

/// Text of the dialog shown before a favorite is removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmationPrompt {
    pub title: String,
    pub body: String,
    pub confirm_label: String,
    pub cancel_label: String,
}

impl ConfirmationPrompt {
    pub fn removal(display_name: &str) -> Self {
        Self {
            title: format!("Remove {display_name}?"),
            body: "Do you want to remove this from favorites?".to_string(),
            confirm_label: "Yes, remove it!".to_string(),
            cancel_label: "Cancel".to_string(),
        }
    }
}

/// Asks the user to confirm. Implementations may block on a modal dialog.
#[async_trait]
pub trait Confirmer: Send + Sync {
    async fn confirm(&self, prompt: &ConfirmationPrompt) -> Confirmation;
}

/// A fixed answer, e.g. for `--yes` flags.
#[async_trait]
impl Confirmer for Confirmation {
    async fn confirm(&self, _prompt: &ConfirmationPrompt) -> Confirmation {
        *self
    }
}
