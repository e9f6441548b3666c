use wander_core::countries::{CountrySource, RestCountriesClient};
use wander_core::store::SupabaseFavoritesStore;
use wander_core::sync::{
    Confirmation, ConfirmationPrompt, Confirmer, LoadOutcome, SyncOptions, ToggleOutcome,
};
use wander_core::{CountryCode, FavoritesSynchronizer, SessionContext};

use crate::cli::FavoritesCommands;
use crate::commands::common::{
    country_source, country_to_list_item, format_country_lines, load_profile,
    open_favorites_store, require_session, session_identity, CountryListItem, ProfileContext,
};
use crate::error::CliError;
use crate::terminal::{TerminalConfirmer, TerminalNotifier};

type CliSynchronizer = FavoritesSynchronizer<SupabaseFavoritesStore, TerminalNotifier>;

pub async fn run_favorites(
    command: FavoritesCommands,
    global_profile: Option<&str>,
) -> Result<(), CliError> {
    let profile = load_profile(global_profile)?;
    let source = country_source(&profile.config)?;
    let (sync, _session) = mount_synchronizer(&profile).await?;

    let result = match command {
        FavoritesCommands::List { json } => run_list(&sync, &source, json).await,
        FavoritesCommands::Toggle { code, yes } => run_toggle(&sync, &source, &code, yes).await,
        FavoritesCommands::Remove { code, yes } => run_remove(&sync, &code, yes).await,
    };
    sync.unmount();
    result
}

async fn mount_synchronizer(
    profile: &ProfileContext,
) -> Result<(CliSynchronizer, SessionContext), CliError> {
    let auth_session = require_session(profile).await?;
    let identity = session_identity(&auth_session)?;
    let store = open_favorites_store(&profile.config, &auth_session)?;

    let session = SessionContext::signed_in(identity);
    let sync = FavoritesSynchronizer::mount(
        store,
        TerminalNotifier,
        &session,
        SyncOptions::from_config(&profile.config),
    );
    let owner = session.require_identity()?;
    tracing::debug!(profile = %profile.name, owner = %owner.id, "Mounted favorites synchronizer");
    Ok((sync, session))
}

async fn run_list(
    sync: &CliSynchronizer,
    source: &RestCountriesClient,
    as_json: bool,
) -> Result<(), CliError> {
    if let LoadOutcome::Failed(error) = sync.load().await? {
        return Err(error.into());
    }
    let countries = sync.refresh_listing(source).await?;
    let unresolved = sync.known_codes().len().saturating_sub(countries.len());

    if as_json {
        let items = countries
            .iter()
            .map(country_to_list_item)
            .collect::<Vec<CountryListItem>>();
        println!("{}", serde_json::to_string_pretty(&items)?);
        return Ok(());
    }

    if countries.is_empty() && unresolved == 0 {
        println!("No favorites yet. Add one with `wander favorites toggle <CODE>`.");
        return Ok(());
    }
    for line in format_country_lines(&countries) {
        println!("{line}");
    }
    if unresolved > 0 {
        eprintln!("{unresolved} favorite(s) could not be resolved and were skipped.");
    }
    Ok(())
}

async fn run_toggle(
    sync: &CliSynchronizer,
    source: &RestCountriesClient,
    raw_code: &str,
    assume_yes: bool,
) -> Result<(), CliError> {
    if let LoadOutcome::Failed(error) = sync.load().await? {
        return Err(error.into());
    }

    let display_name = match CountryCode::parse(raw_code) {
        Ok(code) => display_name_for(source, &code).await,
        Err(_) => raw_code.trim().to_string(),
    };

    let outcome = if assume_yes {
        sync.toggle(raw_code, &display_name, &Confirmation::Confirmed)
            .await?
    } else {
        sync.toggle(raw_code, &display_name, &TerminalConfirmer)
            .await?
    };
    if outcome == ToggleOutcome::Declined {
        println!("Kept {display_name} in favorites.");
    }
    Ok(())
}

async fn run_remove(
    sync: &CliSynchronizer,
    raw_code: &str,
    assume_yes: bool,
) -> Result<(), CliError> {
    let label = raw_code.trim().to_ascii_uppercase();
    if !assume_yes {
        let prompt = ConfirmationPrompt::removal(&label);
        if TerminalConfirmer.confirm(&prompt).await == Confirmation::Declined {
            println!("Kept {label} in favorites.");
            return Ok(());
        }
    }
    sync.remove(raw_code).await?;
    Ok(())
}

/// Common name for `code`, or the code itself when the lookup fails.
async fn display_name_for(source: &RestCountriesClient, code: &CountryCode) -> String {
    match source.fetch_by_code(code).await {
        Ok(Some(country)) => country.display_name().to_string(),
        Ok(None) => code.to_string(),
        Err(error) => {
            tracing::debug!("Country lookup for {} failed: {}", code, error);
            code.to_string()
        }
    }
}
