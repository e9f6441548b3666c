//! Country display record as served by the REST Countries v3.1 API

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::CountryCode;
use crate::error::Error;
use crate::util::format_thousands;

/// Common and official names of a country
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountryName {
    pub common: String,
    #[serde(default)]
    pub official: String,
}

/// A currency entry keyed by ISO 4217 code in [`Country::currencies`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Currency {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub symbol: Option<String>,
}

/// Flag image URLs
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flags {
    #[serde(default)]
    pub png: Option<String>,
    #[serde(default)]
    pub svg: Option<String>,
    #[serde(default)]
    pub alt: Option<String>,
}

/// Display record for one country.
///
/// Everything except the name and `cca3` is optional in the upstream data,
/// so missing fields fall back to empty values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Country {
    pub name: CountryName,
    pub cca3: String,
    #[serde(default)]
    pub capital: Vec<String>,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub subregion: Option<String>,
    #[serde(default)]
    pub population: u64,
    #[serde(default)]
    pub area: Option<f64>,
    #[serde(default)]
    pub languages: BTreeMap<String, String>,
    #[serde(default)]
    pub currencies: BTreeMap<String, Currency>,
    #[serde(default)]
    pub timezones: Vec<String>,
    #[serde(default)]
    pub borders: Vec<String>,
    #[serde(default)]
    pub flags: Flags,
}

impl Country {
    /// The parsed `cca3` code, if the upstream value is well formed.
    #[must_use]
    pub fn code(&self) -> Option<CountryCode> {
        CountryCode::parse(&self.cca3).ok()
    }

    #[must_use]
    pub fn display_name(&self) -> &str {
        &self.name.common
    }

    #[must_use]
    pub fn capital_label(&self) -> String {
        self.capital
            .first()
            .cloned()
            .unwrap_or_else(|| "N/A".to_string())
    }

    #[must_use]
    pub fn region_label(&self) -> String {
        match self.subregion.as_deref() {
            Some(subregion) if !subregion.is_empty() => format!("{} ({subregion})", self.region),
            _ => self.region.clone(),
        }
    }

    #[must_use]
    pub fn population_label(&self) -> String {
        format_thousands(self.population)
    }

    #[must_use]
    pub fn area_label(&self) -> String {
        self.area.map_or_else(
            || "N/A".to_string(),
            |area| format!("{} km²", format_thousands(whole_km2(area))),
        )
    }

    #[must_use]
    pub fn languages_label(&self) -> String {
        join_or(self.languages.values().map(String::as_str), "N/A")
    }

    #[must_use]
    pub fn currencies_label(&self) -> String {
        join_or(
            self.currencies.values().map(|currency| currency.name.as_str()),
            "N/A",
        )
    }

    #[must_use]
    pub fn timezones_label(&self) -> String {
        join_or(self.timezones.iter().map(String::as_str), "N/A")
    }

    #[must_use]
    pub fn borders_label(&self) -> String {
        join_or(self.borders.iter().map(String::as_str), "None")
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn whole_km2(area: f64) -> u64 {
    area.max(0.0).round() as u64
}

fn join_or<'a>(values: impl Iterator<Item = &'a str>, fallback: &str) -> String {
    let joined = values
        .filter(|value| !value.is_empty())
        .collect::<Vec<_>>()
        .join(", ");
    if joined.is_empty() {
        fallback.to_string()
    } else {
        joined
    }
}

/// World regions used to filter the country catalogue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Region {
    Africa,
    Americas,
    Asia,
    Europe,
    Oceania,
}

impl Region {
    pub const ALL: [Self; 5] = [
        Self::Africa,
        Self::Americas,
        Self::Asia,
        Self::Europe,
        Self::Oceania,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Africa => "Africa",
            Self::Americas => "Americas",
            Self::Asia => "Asia",
            Self::Europe => "Europe",
            Self::Oceania => "Oceania",
        }
    }

    /// Case-insensitive match against a country's `region` field.
    #[must_use]
    pub fn matches(self, region: &str) -> bool {
        self.as_str().eq_ignore_ascii_case(region.trim())
    }

    /// Parse a filter value where `All` (or blank) means no filter.
    pub fn parse_filter(raw: &str) -> Result<Option<Self>, Error> {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("all") {
            return Ok(None);
        }
        trimmed.parse().map(Some)
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Region {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|region| region.matches(s))
            .ok_or_else(|| Error::InvalidInput(format!("unknown region: {s}")))
    }
}
