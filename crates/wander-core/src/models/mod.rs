//! Data models for Wander

mod country;
mod country_code;
mod favorites;
mod owner;

pub use country::{Country, CountryName, Currency, Flags, Region};
pub use country_code::CountryCode;
pub use favorites::{FavoritesDocument, FavoritesPatch};
pub use owner::{OwnerId, OwnerIdentity};
