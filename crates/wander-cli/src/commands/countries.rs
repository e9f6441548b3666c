use wander_core::countries::{filter_countries, CountrySource};
use wander_core::models::Region;
use wander_core::store::FavoritesStore;
use wander_core::CountryCode;

use crate::cli::CountriesCommands;
use crate::commands::common::{
    country_source, country_to_list_item, format_country_details, format_country_lines,
    load_profile, open_favorites_store, require_session, session_identity, CountryListItem,
    ProfileContext,
};
use crate::error::CliError;

pub async fn run_countries(
    command: CountriesCommands,
    global_profile: Option<&str>,
) -> Result<(), CliError> {
    let profile = load_profile(global_profile)?;
    let source = country_source(&profile.config)?;

    match command {
        CountriesCommands::List {
            search,
            region,
            json,
        } => {
            let region = Region::parse_filter(&region)?;
            let catalogue = source.fetch_all().await?;
            let mut countries = filter_countries(&catalogue, &search, region);
            countries.sort_by(|left, right| left.display_name().cmp(right.display_name()));

            if json {
                let items = countries
                    .iter()
                    .map(country_to_list_item)
                    .collect::<Vec<CountryListItem>>();
                println!("{}", serde_json::to_string_pretty(&items)?);
            } else if countries.is_empty() {
                println!("No countries match.");
            } else {
                for line in format_country_lines(&countries) {
                    println!("{line}");
                }
            }
            Ok(())
        }
        CountriesCommands::Show { code, json } => {
            let code = CountryCode::parse(&code)?;
            let country = source
                .fetch_by_code(&code)
                .await?
                .ok_or_else(|| CliError::CountryNotFound(code.to_string()))?;

            if json {
                println!("{}", serde_json::to_string_pretty(&country)?);
            } else {
                let is_favorite = favorite_status(&profile, &code).await;
                for line in format_country_details(&country, is_favorite) {
                    println!("{line}");
                }
            }
            Ok(())
        }
    }
}

/// Whether `code` is a favorite of the signed-in user; `None` when that
/// cannot be determined (signed out, store unreachable).
async fn favorite_status(profile: &ProfileContext, code: &CountryCode) -> Option<bool> {
    let lookup = async {
        let session = require_session(profile).await?;
        let identity = session_identity(&session)?;
        let store = open_favorites_store(&profile.config, &session)?;
        let document = store.fetch_document(&identity.id).await?;
        Ok::<_, CliError>(document.is_some_and(|document| document.contains(code)))
    };
    match lookup.await {
        Ok(is_favorite) => Some(is_favorite),
        Err(error) => {
            tracing::debug!("Skipping favorite status for {}: {}", code, error);
            None
        }
    }
}
