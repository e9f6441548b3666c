//! HTTP client for the public REST Countries v3.1 API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;

use super::CountrySource;
use crate::error::{Error, Result};
use crate::models::{Country, CountryCode};
use crate::util::{compact_text, normalize_base_url};

pub const DEFAULT_COUNTRIES_API_URL: &str = "https://restcountries.com/v3.1";

// `/all` refuses requests without a field list and caps it at ten fields.
const CATALOGUE_FIELDS: &str =
    "name,cca3,capital,region,subregion,population,area,languages,currencies,flags";

#[derive(Debug, Clone)]
pub struct RestCountriesClient {
    base_url: String,
    client: reqwest::Client,
}

impl RestCountriesClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url = normalize_base_url(base_url, "countries API URL").map_err(Error::Config)?;
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { base_url, client })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl CountrySource for RestCountriesClient {
    async fn fetch_all(&self) -> Result<Vec<Country>> {
        let response = self
            .client
            .get(format!("{}/all", self.base_url))
            .query(&[("fields", CATALOGUE_FIELDS)])
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Countries(format!(
                "catalogue request failed with HTTP {status}: {}",
                compact_text(&body)
            )));
        }

        let countries = response.json::<Vec<Country>>().await?;
        tracing::debug!("Fetched {} countries", countries.len());
        Ok(countries)
    }

    async fn fetch_by_code(&self, code: &CountryCode) -> Result<Option<Country>> {
        let response = self
            .client
            .get(format!("{}/alpha/{}", self.base_url, code))
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Countries(format!(
                "lookup for {code} failed with HTTP {status}: {}",
                compact_text(&body)
            )));
        }

        // The alpha endpoint answers with a one-element array.
        let mut countries = response.json::<Vec<Country>>().await?;
        if countries.is_empty() {
            return Ok(None);
        }
        Ok(Some(countries.swap_remove(0)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_normalizes_base_url() {
        let client =
            RestCountriesClient::new("https://restcountries.com/v3.1/", Duration::from_secs(5))
                .unwrap();
        assert_eq!(client.base_url(), "https://restcountries.com/v3.1");
    }

    #[test]
    fn new_rejects_missing_scheme() {
        assert!(RestCountriesClient::new("restcountries.com", Duration::from_secs(5)).is_err());
    }

    #[test]
    fn catalogue_field_list_stays_within_limit() {
        assert!(CATALOGUE_FIELDS.split(',').count() <= 10);
    }
}
