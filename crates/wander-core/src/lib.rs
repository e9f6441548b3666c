//! wander-core - Core library for Wander
//!
//! This crate contains the shared models, identity/session handling, remote
//! favorites stores, the country data client, and the favorites synchronizer
//! used by every Wander interface.

pub mod auth;
pub mod config;
pub mod countries;
pub mod error;
pub mod models;
pub mod session;
pub mod store;
pub mod sync;
pub mod util;

pub use error::{Error, Result};
pub use models::{Country, CountryCode, FavoritesDocument, FavoritesPatch, OwnerId, OwnerIdentity};
pub use session::SessionContext;
pub use sync::{
    Confirmation, FavoritesSynchronizer, LoadOutcome, SyncError, SyncOptions, SyncResult,
    ToggleOutcome,
};
