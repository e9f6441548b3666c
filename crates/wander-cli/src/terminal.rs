//! Terminal front-end for synchronizer prompts and notifications.

use std::io::{self, BufRead, IsTerminal, Write};

use async_trait::async_trait;
use wander_core::sync::{
    Confirmation, ConfirmationPrompt, Confirmer, Notification, NotificationLevel, Notifier,
};

/// Asks on stdin. Without a terminal the answer is always "no".
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalConfirmer;

#[async_trait]
impl Confirmer for TerminalConfirmer {
    async fn confirm(&self, prompt: &ConfirmationPrompt) -> Confirmation {
        let prompt = prompt.clone();
        tokio::task::spawn_blocking(move || ask(&prompt))
            .await
            .unwrap_or(Confirmation::Declined)
    }
}

fn ask(prompt: &ConfirmationPrompt) -> Confirmation {
    if !io::stdin().is_terminal() {
        eprintln!("{} (pass --yes to confirm without a terminal)", prompt.title);
        return Confirmation::Declined;
    }

    let mut stderr = io::stderr();
    let _ = write!(
        stderr,
        "{}\n{} [{} = y / {} = N] ",
        prompt.title, prompt.body, prompt.confirm_label, prompt.cancel_label
    );
    let _ = stderr.flush();

    let mut answer = String::new();
    match io::stdin().lock().read_line(&mut answer) {
        Ok(_) => parse_answer(&answer),
        Err(error) => {
            tracing::warn!("Failed to read confirmation: {}", error);
            Confirmation::Declined
        }
    }
}

pub fn parse_answer(raw: &str) -> Confirmation {
    Confirmation::from_bool(matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "y" | "yes"
    ))
}

/// Success lines go to stdout, warnings and errors to stderr.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalNotifier;

impl Notifier for TerminalNotifier {
    fn notify(&self, notification: Notification) {
        match notification.level {
            NotificationLevel::Success => println!("{}", notification.message),
            NotificationLevel::Warning => eprintln!("Warning: {}", notification.message),
            NotificationLevel::Error => eprintln!("Error: {}", notification.message),
        }
    }
}
