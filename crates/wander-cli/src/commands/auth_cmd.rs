use wander_core::auth::{AuthSession, SignUpOutcome};
use wander_core::store::initialize_document;

use crate::auth::{clear_stored_session, load_stored_session, SupabaseAuthService};
use crate::cli::AuthCommands;
use crate::commands::common::{
    auth_service, format_expiry, load_profile, open_favorites_store, session_identity,
    ProfileContext,
};
use crate::error::CliError;

pub async fn run_auth(command: AuthCommands, global_profile: Option<&str>) -> Result<(), CliError> {
    match command {
        AuthCommands::Signup {
            profile,
            email,
            password,
        } => {
            let profile = load_profile(profile.as_deref().or(global_profile))?;
            let service = auth_service(&profile)?;
            let outcome = service
                .sign_up(&email, &password)
                .await
                .map_err(|error| CliError::Auth(error.to_string()))?;
            match outcome {
                SignUpOutcome::SignedIn(session) => {
                    ensure_favorites_document(&profile, &session).await?;
                    println!(
                        "Registered and signed in profile '{}' as {}",
                        profile.name,
                        email_label(&session)
                    );
                }
                SignUpOutcome::ConfirmationRequired => {
                    println!(
                        "Registration received. Confirm your email, then run `wander auth login`."
                    );
                }
            }
            Ok(())
        }
        AuthCommands::Login {
            profile,
            email,
            password,
        } => {
            let profile = load_profile(profile.as_deref().or(global_profile))?;
            let service = auth_service(&profile)?;
            let session = service
                .sign_in(&email, &password)
                .await
                .map_err(|error| CliError::Auth(error.to_string()))?;
            ensure_favorites_document(&profile, &session).await?;
            println!(
                "Signed in profile '{}' as {}",
                profile.name,
                email_label(&session)
            );
            Ok(())
        }
        AuthCommands::Status { profile } => {
            let profile = load_profile(profile.as_deref().or(global_profile))?;
            let maybe_service = SupabaseAuthService::new_for_profile(&profile.name, &profile.config)
                .map_err(|error| CliError::Auth(error.to_string()))?;
            let session = if let Some(service) = maybe_service {
                service
                    .restore_session()
                    .await
                    .map_err(|error| CliError::Auth(error.to_string()))?
            } else {
                load_stored_session(&profile.name)
                    .map_err(|error| CliError::Auth(error.to_string()))?
            };

            if let Some(session) = session {
                println!(
                    "Profile '{}' is signed in as {} (expires {})",
                    profile.name,
                    email_label(&session),
                    format_expiry(session.expires_at)
                );
            } else {
                println!("Profile '{}' is not signed in.", profile.name);
            }
            Ok(())
        }
        AuthCommands::Logout { profile } => {
            let profile = load_profile(profile.as_deref().or(global_profile))?;
            let stored_session = load_stored_session(&profile.name)
                .map_err(|error| CliError::Auth(error.to_string()))?;
            let maybe_service = SupabaseAuthService::new_for_profile(&profile.name, &profile.config)
                .map_err(|error| CliError::Auth(error.to_string()))?;

            if let (Some(service), Some(session)) = (maybe_service, stored_session) {
                service
                    .sign_out(&session.access_token)
                    .await
                    .map_err(|error| CliError::Auth(error.to_string()))?;
            } else {
                clear_stored_session(&profile.name)
                    .map_err(|error| CliError::Auth(error.to_string()))?;
            }

            println!("Signed out profile '{}'", profile.name);
            Ok(())
        }
    }
}

/// Make sure the account has a favorites document to merge into.
async fn ensure_favorites_document(
    profile: &ProfileContext,
    session: &AuthSession,
) -> Result<(), CliError> {
    let identity = session_identity(session)?;
    let store = open_favorites_store(&profile.config, session)?;
    let document = initialize_document(&store, &identity).await?;
    tracing::debug!(
        "Favorites document for {} holds {} code(s)",
        identity.id,
        document.country_codes.len()
    );
    Ok(())
}

fn email_label(session: &AuthSession) -> &str {
    session.user.email.as_deref().unwrap_or("(no email)")
}
