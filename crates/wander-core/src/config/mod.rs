//! Client configuration shared by every Wander front-end.
//!
//! Values come from a persisted profile and/or the environment. Everything
//! here is public endpoint data; secrets (sessions) never live in this struct.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::countries::DEFAULT_COUNTRIES_API_URL;
use crate::error::{Error, Result};
use crate::store::DEFAULT_FAVORITES_TABLE;
use crate::util::{is_http_url, normalize_text_option};

const DEFAULT_WRITE_TIMEOUT_SECS: u64 = 10;
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 8;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ClientConfig {
    #[serde(default)]
    pub supabase_url: Option<String>,
    #[serde(default)]
    pub supabase_anon_key: Option<String>,
    #[serde(default)]
    pub countries_api_url: Option<String>,
    #[serde(default)]
    pub favorites_table: Option<String>,
    #[serde(default)]
    pub write_timeout_secs: Option<u64>,
}

impl ClientConfig {
    /// Read overrides from `SUPABASE_URL`, `SUPABASE_ANON_KEY`,
    /// `WANDER_COUNTRIES_API_URL`, `WANDER_FAVORITES_TABLE` and
    /// `WANDER_WRITE_TIMEOUT_SECS`.
    pub fn from_env() -> Result<Self> {
        let write_timeout_secs = normalize_text_option(std::env::var("WANDER_WRITE_TIMEOUT_SECS").ok())
            .map(|raw| {
                raw.parse::<u64>().map_err(|error| {
                    Error::Config(format!("WANDER_WRITE_TIMEOUT_SECS must be an integer: {error}"))
                })
            })
            .transpose()?;

        Ok(Self {
            supabase_url: normalize_text_option(std::env::var("SUPABASE_URL").ok()),
            supabase_anon_key: normalize_text_option(std::env::var("SUPABASE_ANON_KEY").ok()),
            countries_api_url: normalize_text_option(std::env::var("WANDER_COUNTRIES_API_URL").ok()),
            favorites_table: normalize_text_option(std::env::var("WANDER_FAVORITES_TABLE").ok()),
            write_timeout_secs,
        })
    }

    /// Fill every unset field from `fallback`.
    #[must_use]
    pub fn or(self, fallback: Self) -> Self {
        Self {
            supabase_url: self.supabase_url.or(fallback.supabase_url),
            supabase_anon_key: self.supabase_anon_key.or(fallback.supabase_anon_key),
            countries_api_url: self.countries_api_url.or(fallback.countries_api_url),
            favorites_table: self.favorites_table.or(fallback.favorites_table),
            write_timeout_secs: self.write_timeout_secs.or(fallback.write_timeout_secs),
        }
    }

    pub fn supabase_url(&self) -> Option<String> {
        normalize_text_option(self.supabase_url.clone())
    }

    pub fn supabase_anon_key(&self) -> Option<String> {
        normalize_text_option(self.supabase_anon_key.clone())
    }

    pub fn countries_api_url(&self) -> String {
        normalize_text_option(self.countries_api_url.clone())
            .unwrap_or_else(|| DEFAULT_COUNTRIES_API_URL.to_string())
    }

    pub fn favorites_table(&self) -> String {
        normalize_text_option(self.favorites_table.clone())
            .unwrap_or_else(|| DEFAULT_FAVORITES_TABLE.to_string())
    }

    /// Upper bound on a single favorites write before it is abandoned.
    pub fn write_timeout(&self) -> Duration {
        Duration::from_secs(
            self.write_timeout_secs
                .filter(|secs| *secs > 0)
                .unwrap_or(DEFAULT_WRITE_TIMEOUT_SECS),
        )
    }

    pub const fn http_timeout(&self) -> Duration {
        Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS)
    }

    /// Trim every text field and drop empties.
    pub fn normalize(&mut self) {
        self.supabase_url = normalize_text_option(self.supabase_url.take());
        self.supabase_anon_key = normalize_text_option(self.supabase_anon_key.take());
        self.countries_api_url = normalize_text_option(self.countries_api_url.take());
        self.favorites_table = normalize_text_option(self.favorites_table.take());
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(url) = self.supabase_url() {
            if !is_http_url(&url) {
                return Err(Error::Config(
                    "supabase_url must include http:// or https://".to_string(),
                ));
            }
        }
        if !is_http_url(&self.countries_api_url()) {
            return Err(Error::Config(
                "countries_api_url must include http:// or https://".to_string(),
            ));
        }
        if self.supabase_url().is_some() != self.supabase_anon_key().is_some() {
            return Err(Error::Config(
                "supabase_url and supabase_anon_key must be set together".to_string(),
            ));
        }
        Ok(())
    }
}
