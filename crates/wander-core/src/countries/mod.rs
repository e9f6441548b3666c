//! Country data source: read-only lookups used to render favorites.

mod rest;

use std::sync::Arc;

use async_trait::async_trait;
use futures_util::future::join_all;

use crate::error::Result;
use crate::models::{Country, CountryCode, Region};

pub use rest::{RestCountriesClient, DEFAULT_COUNTRIES_API_URL};

#[async_trait]
pub trait CountrySource: Send + Sync {
    /// The whole catalogue.
    async fn fetch_all(&self) -> Result<Vec<Country>>;

    /// One country by code; `None` when the source does not know it.
    async fn fetch_by_code(&self, code: &CountryCode) -> Result<Option<Country>>;
}

#[async_trait]
impl<T: CountrySource + ?Sized> CountrySource for Arc<T> {
    async fn fetch_all(&self) -> Result<Vec<Country>> {
        (**self).fetch_all().await
    }

    async fn fetch_by_code(&self, code: &CountryCode) -> Result<Option<Country>> {
        (**self).fetch_by_code(code).await
    }
}

/// Apply the region filter, then a case-insensitive name search.
///
/// A blank search term matches everything.
pub fn filter_countries(countries: &[Country], search: &str, region: Option<Region>) -> Vec<Country> {
    let needle = search.trim().to_lowercase();
    countries
        .iter()
        .filter(|country| region.is_none_or(|region| region.matches(&country.region)))
        .filter(|country| {
            needle.is_empty() || country.name.common.to_lowercase().contains(&needle)
        })
        .cloned()
        .collect()
}

/// Resolve codes to display records with independent lookups.
///
/// A failed or unknown lookup is logged and skipped; it never aborts the
/// remaining codes. Input order is preserved.
pub async fn resolve_countries<C: CountrySource + ?Sized>(
    source: &C,
    codes: &[CountryCode],
) -> Vec<Country> {
    let lookups = codes.iter().map(|code| async move {
        match source.fetch_by_code(code).await {
            Ok(Some(country)) => Some(country),
            Ok(None) => {
                tracing::warn!("Favorite {} no longer resolves to a country", code);
                None
            }
            Err(error) => {
                tracing::warn!("Failed to resolve favorite {}: {}", code, error);
                None
            }
        }
    });

    join_all(lookups).await.into_iter().flatten().collect()
}
