use chrono::{DateTime, Local};
use serde::Serialize;
use wander_core::auth::AuthSession;
use wander_core::config::ClientConfig;
use wander_core::countries::RestCountriesClient;
use wander_core::store::SupabaseFavoritesStore;
use wander_core::{Country, OwnerIdentity};

use crate::auth::SupabaseAuthService;
use crate::config_profiles::CliProfilesConfig;
use crate::error::CliError;

/// A resolved profile: its name and the configuration in effect.
#[derive(Debug, Clone)]
pub struct ProfileContext {
    pub name: String,
    pub config: ClientConfig,
}

pub fn load_profile(explicit: Option<&str>) -> Result<ProfileContext, CliError> {
    let profiles = CliProfilesConfig::load().map_err(CliError::Config)?;
    let name = profiles.resolve_profile_name(explicit);
    let config = profiles
        .resolve_client_config(&name)
        .map_err(CliError::Config)?;
    Ok(ProfileContext { name, config })
}

pub fn auth_service(profile: &ProfileContext) -> Result<SupabaseAuthService, CliError> {
    SupabaseAuthService::new_for_profile(&profile.name, &profile.config)
        .map_err(|error| CliError::Auth(error.to_string()))?
        .ok_or(CliError::SupabaseNotConfigured)
}

/// The stored session for `profile`, refreshed if needed.
pub async fn require_session(profile: &ProfileContext) -> Result<AuthSession, CliError> {
    auth_service(profile)?
        .restore_session()
        .await
        .map_err(|error| CliError::Auth(error.to_string()))?
        .ok_or_else(|| CliError::NotSignedIn(profile.name.clone()))
}

pub fn session_identity(session: &AuthSession) -> Result<OwnerIdentity, CliError> {
    session
        .identity()
        .ok_or_else(|| CliError::Auth("Stored session has no user id".to_string()))
}

pub fn open_favorites_store(
    config: &ClientConfig,
    session: &AuthSession,
) -> Result<SupabaseFavoritesStore, CliError> {
    let url = config
        .supabase_url()
        .ok_or(CliError::SupabaseNotConfigured)?;
    let anon_key = config
        .supabase_anon_key()
        .ok_or(CliError::SupabaseNotConfigured)?;
    Ok(SupabaseFavoritesStore::new(
        &url,
        anon_key,
        session.access_token.clone(),
        &config.favorites_table(),
    )?)
}

pub fn country_source(config: &ClientConfig) -> Result<RestCountriesClient, CliError> {
    Ok(RestCountriesClient::new(
        &config.countries_api_url(),
        config.http_timeout(),
    )?)
}

#[derive(Debug, Serialize)]
pub struct CountryListItem {
    pub code: String,
    pub name: String,
    pub official_name: String,
    pub capital: String,
    pub region: String,
    pub subregion: Option<String>,
    pub population: u64,
    pub area_km2: Option<f64>,
    pub flag_url: Option<String>,
}

pub fn country_to_list_item(country: &Country) -> CountryListItem {
    CountryListItem {
        code: country.cca3.clone(),
        name: country.display_name().to_string(),
        official_name: country.name.official.clone(),
        capital: country.capital_label(),
        region: country.region.clone(),
        subregion: country.subregion.clone(),
        population: country.population,
        area_km2: country.area,
        flag_url: country.flags.png.clone(),
    }
}

pub fn format_country_lines(countries: &[Country]) -> Vec<String> {
    let name_width = countries
        .iter()
        .map(|country| country.display_name().chars().count())
        .max()
        .unwrap_or(0);
    let capital_width = countries
        .iter()
        .map(|country| country.capital_label().chars().count())
        .max()
        .unwrap_or(0);

    countries
        .iter()
        .map(|country| {
            format!(
                "{:<3}  {:<name_width$}  {:<capital_width$}  {:<8}  {:>13}",
                country.cca3,
                country.display_name(),
                country.capital_label(),
                country.region,
                country.population_label(),
            )
            .trim_end()
            .to_string()
        })
        .collect()
}

pub fn format_country_details(country: &Country, is_favorite: Option<bool>) -> Vec<String> {
    let mut lines = vec![
        format!("{} ({})", country.display_name(), country.cca3),
        format!("  Official name: {}", country.name.official),
        format!("  Capital:       {}", country.capital_label()),
        format!("  Region:        {}", country.region_label()),
        format!("  Population:    {}", country.population_label()),
        format!("  Area:          {}", country.area_label()),
        format!("  Languages:     {}", country.languages_label()),
        format!("  Currencies:    {}", country.currencies_label()),
        format!("  Timezones:     {}", country.timezones_label()),
        format!("  Borders:       {}", country.borders_label()),
    ];
    if let Some(flag) = country.flags.png.as_deref() {
        lines.push(format!("  Flag:          {flag}"));
    }
    if let Some(is_favorite) = is_favorite {
        lines.push(format!(
            "  Favorite:      {}",
            if is_favorite { "yes" } else { "no" }
        ));
    }
    lines
}

pub fn format_expiry(expires_at: i64) -> String {
    DateTime::from_timestamp(expires_at, 0).map_or_else(
        || expires_at.to_string(),
        |moment| {
            moment
                .with_timezone(&Local)
                .format("%Y-%m-%d %H:%M")
                .to_string()
        },
    )
}
