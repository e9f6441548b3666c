use serde::Serialize;
use wander_core::config::ClientConfig;
use wander_core::util::normalize_text_option;

use crate::auth::SupabaseAuthService;
use crate::cli::ConfigCommands;
use crate::config_profiles::CliProfilesConfig;
use crate::error::CliError;

pub async fn run_config(command: ConfigCommands, global_profile: Option<&str>) -> Result<(), CliError> {
    match command {
        ConfigCommands::Init {
            profile,
            supabase_url,
            supabase_anon_key,
            countries_api_url,
            favorites_table,
            write_timeout_secs,
            no_activate,
            no_verify,
        } => {
            let explicit = ClientConfig {
                supabase_url: normalize_text_option(supabase_url),
                supabase_anon_key: normalize_text_option(supabase_anon_key),
                countries_api_url: normalize_text_option(countries_api_url),
                favorites_table: normalize_text_option(favorites_table),
                write_timeout_secs,
            };
            run_config_init(
                profile.as_deref().or(global_profile),
                explicit,
                no_activate,
                no_verify,
            )
            .await
        }
        ConfigCommands::Show { profile, json } => {
            run_config_show(profile.as_deref().or(global_profile), json)
        }
    }
}

/// Merge explicit flags, then environment values, then the stored profile.
pub async fn run_config_init(
    profile_name: Option<&str>,
    explicit: ClientConfig,
    no_activate: bool,
    no_verify: bool,
) -> Result<(), CliError> {
    let mut config = CliProfilesConfig::load().map_err(CliError::Config)?;
    let profile_name = config.resolve_profile_name(profile_name);
    let existing = config.profile(&profile_name).cloned().unwrap_or_default();
    let from_env = ClientConfig::from_env()?;

    let merged = merge_profile(explicit, from_env, existing);
    merged.validate()?;
    *config.profile_mut_or_default(&profile_name) = merged;

    if !no_activate {
        config.active_profile = Some(profile_name.clone());
    }

    let path = config.save().map_err(CliError::Config)?;
    println!(
        "Profile '{}' initialized at {}",
        profile_name,
        path.display()
    );

    let profile = config
        .profile(&profile_name)
        .ok_or_else(|| CliError::Config("Failed to persist profile".to_string()))?;
    let missing_fields = missing_fields(profile);
    if missing_fields.is_empty() {
        if !no_verify {
            verify_supabase(&profile_name, profile).await;
        }
        println!(
            "Profile '{profile_name}' is ready. Run `wander auth login --email <email> --password <password>`."
        );
    } else {
        println!(
            "Profile '{}' is missing: {}",
            profile_name,
            missing_fields.join(", ")
        );
    }

    Ok(())
}

/// Report what the auth settings endpoint says about the saved profile.
/// The profile stays saved whatever the outcome.
async fn verify_supabase(profile_name: &str, profile: &ClientConfig) {
    let service = match SupabaseAuthService::new_for_profile(profile_name, profile) {
        Ok(Some(service)) => service,
        Ok(None) => return,
        Err(error) => {
            eprintln!("Warning: could not build the Supabase client: {error}");
            return;
        }
    };

    match service.verify_configuration().await {
        Ok(status) if status.accepts_signups() => {
            println!("Supabase auth reachable; email sign-up is enabled.");
        }
        Ok(status) => {
            println!(
                "Supabase auth reachable, but email sign-up is disabled (email provider: {}, signups: {}).",
                on_off(status.email_enabled),
                on_off(status.signup_enabled)
            );
        }
        Err(error) => {
            tracing::warn!(profile = profile_name, "Supabase verification failed: {error}");
            eprintln!("Warning: could not verify Supabase configuration: {error}");
        }
    }
}

const fn on_off(enabled: bool) -> &'static str {
    if enabled { "on" } else { "off" }
}

pub fn merge_profile(
    explicit: ClientConfig,
    from_env: ClientConfig,
    existing: ClientConfig,
) -> ClientConfig {
    let mut merged = explicit.or(from_env).or(existing);
    merged.normalize();
    merged
}

pub fn missing_fields(profile: &ClientConfig) -> Vec<&'static str> {
    let mut missing = Vec::new();
    if profile.supabase_url().is_none() {
        missing.push("supabase_url");
    }
    if profile.supabase_anon_key().is_none() {
        missing.push("supabase_anon_key");
    }
    missing
}

#[derive(Debug, Serialize)]
pub struct ResolvedConfigView {
    pub profile: String,
    pub supabase_url: Option<String>,
    pub supabase_anon_key: Option<String>,
    pub countries_api_url: String,
    pub favorites_table: String,
    pub write_timeout_secs: u64,
}

impl ResolvedConfigView {
    pub fn new(profile: &str, config: &ClientConfig) -> Self {
        Self {
            profile: profile.to_string(),
            supabase_url: config.supabase_url(),
            supabase_anon_key: config.supabase_anon_key().map(|key| redact_key(&key)),
            countries_api_url: config.countries_api_url(),
            favorites_table: config.favorites_table(),
            write_timeout_secs: config.write_timeout().as_secs(),
        }
    }
}

fn run_config_show(profile_name: Option<&str>, as_json: bool) -> Result<(), CliError> {
    let config = CliProfilesConfig::load().map_err(CliError::Config)?;
    let profile_name = config.resolve_profile_name(profile_name);
    let resolved = config
        .resolve_client_config(&profile_name)
        .map_err(CliError::Config)?;
    let view = ResolvedConfigView::new(&profile_name, &resolved);

    if as_json {
        println!("{}", serde_json::to_string_pretty(&view)?);
        return Ok(());
    }

    let unset = "(unset)";
    println!("Profile:            {}", view.profile);
    println!(
        "Supabase URL:       {}",
        view.supabase_url.as_deref().unwrap_or(unset)
    );
    println!(
        "Supabase anon key:  {}",
        view.supabase_anon_key.as_deref().unwrap_or(unset)
    );
    println!("Countries API:      {}", view.countries_api_url);
    println!("Favorites table:    {}", view.favorites_table);
    println!("Write timeout:      {}s", view.write_timeout_secs);
    Ok(())
}

/// Keep the first and last four characters of a key.
pub fn redact_key(key: &str) -> String {
    let chars = key.chars().collect::<Vec<_>>();
    if chars.len() <= 8 {
        return "[REDACTED]".to_string();
    }
    let head = chars[..4].iter().collect::<String>();
    let tail = chars[chars.len() - 4..].iter().collect::<String>();
    format!("{head}…{tail}")
}
