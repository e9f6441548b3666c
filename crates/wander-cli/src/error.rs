use std::io;

use thiserror::Error;
use wander_core::SyncError;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] wander_core::Error),
    #[error(transparent)]
    Sync(#[from] SyncError),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Authentication error: {0}")]
    Auth(String),
    #[error("Country not found: {0}")]
    CountryNotFound(String),
    #[error(
        "Supabase is not configured. Run `wander config init` or set SUPABASE_URL and SUPABASE_ANON_KEY."
    )]
    SupabaseNotConfigured,
    #[error(
        "Profile '{0}' is not signed in. Run `wander auth login --email <email> --password <password>`."
    )]
    NotSignedIn(String),
}
