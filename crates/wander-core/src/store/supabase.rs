//! Favorites store backed by a Supabase (PostgREST) table.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde_json::Value;

use super::FavoritesStore;
use crate::error::{Error, Result};
use crate::models::{FavoritesDocument, FavoritesPatch, OwnerId};
use crate::util::{normalize_base_url, parse_api_error};

pub const DEFAULT_FAVORITES_TABLE: &str = "user_favorites";

const SELECT_COLUMNS: &str = "country_codes,last_updated,owner_contact";

/// Favorites documents stored one row per owner in a PostgREST table.
///
/// Expected columns: `owner_id` (primary key), `country_codes text[]`,
/// `last_updated timestamptz`, `owner_contact text`. Row-level security is
/// expected to restrict each user to their own row; requests carry the
/// signed-in user's access token.
#[derive(Clone)]
pub struct SupabaseFavoritesStore {
    table_url: String,
    anon_key: String,
    access_token: String,
    client: Client,
}

impl std::fmt::Debug for SupabaseFavoritesStore {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("SupabaseFavoritesStore")
            .field("table_url", &self.table_url)
            .field("access_token", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

impl SupabaseFavoritesStore {
    pub fn new(
        supabase_url: &str,
        anon_key: impl Into<String>,
        access_token: impl Into<String>,
        table: &str,
    ) -> Result<Self> {
        let table_url = table_url(supabase_url, table)?;
        let anon_key = anon_key.into().trim().to_string();
        if anon_key.is_empty() {
            return Err(Error::Config("Supabase anon key must not be empty".to_string()));
        }
        let access_token = access_token.into().trim().to_string();
        if access_token.is_empty() {
            return Err(Error::Config("access token must not be empty".to_string()));
        }

        Ok(Self {
            table_url,
            anon_key,
            access_token,
            client: Client::builder().build()?,
        })
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.anon_key)
            .bearer_auth(&self.access_token)
    }
}

#[async_trait]
impl FavoritesStore for SupabaseFavoritesStore {
    async fn fetch_document(&self, owner: &OwnerId) -> Result<Option<FavoritesDocument>> {
        let request = self.authorized(
            self.client
                .get(&self.table_url)
                .query(&[
                    ("owner_id", format!("eq.{owner}")),
                    ("select", SELECT_COLUMNS.to_string()),
                ])
                .header("Accept", "application/json"),
        );

        let response = request.send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Store(parse_api_error(status, &body)));
        }

        let rows = response.json::<Vec<Value>>().await?;
        tracing::debug!("Fetched {} favorites row(s) for {}", rows.len(), owner);
        rows.into_iter()
            .next()
            .map(|row| FavoritesDocument::from_stored(owner.clone(), row))
            .transpose()
    }

    async fn write_document(&self, owner: &OwnerId, patch: &FavoritesPatch) -> Result<()> {
        let mut row = patch.to_fields()?;
        row.insert("owner_id".to_string(), Value::String(owner.to_string()));

        // Upsert with merge-duplicates only assigns the columns present in the body.
        let request = self.authorized(
            self.client
                .post(&self.table_url)
                .query(&[("on_conflict", "owner_id")])
                .header("Prefer", "resolution=merge-duplicates,return=minimal")
                .json(&Value::Object(row)),
        );

        let response = request.send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Store(parse_api_error(status, &body)));
        }

        tracing::debug!("Merged favorites patch for {}", owner);
        Ok(())
    }
}

fn table_url(supabase_url: &str, table: &str) -> Result<String> {
    let base = normalize_base_url(supabase_url, "Supabase URL").map_err(Error::Config)?;
    let base = base.strip_suffix("/rest/v1").unwrap_or(&base);
    let table = table.trim();
    if table.is_empty()
        || !table
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
    {
        return Err(Error::Config(format!("invalid favorites table name: {table:?}")));
    }
    Ok(format!("{base}/rest/v1/{table}"))
}
