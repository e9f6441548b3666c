//! Error types for wander-core

use thiserror::Error;

/// Result type alias using wander-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in wander-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid or incomplete configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// HTTP transport error
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Country code that is not three ASCII letters
    #[error("Invalid country code: {0:?}")]
    InvalidCountryCode(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Remote favorites store error (network, permission, bad payload)
    #[error("Favorites store error: {0}")]
    Store(String),

    /// Country data source error
    #[error("Country data error: {0}")]
    Countries(String),
}
