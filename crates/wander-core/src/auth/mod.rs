//! Identity provider client (Supabase GoTrue).
//!
//! The favorites core only needs an opaque owner id and contact address; this
//! module obtains them by signing in against Supabase and keeps the session
//! alive through a pluggable [`SessionPersistence`] backend.

use std::fmt;

use reqwest::{Client, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{OwnerId, OwnerIdentity};
use crate::util::{normalize_text_option, parse_api_error, unix_timestamp_now};

const EXPIRY_SKEW_SECONDS: i64 = 60;
const MIN_PASSWORD_CHARS: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
    pub email: Option<String>,
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSession {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: i64,
    pub user: AuthUser,
}

impl AuthSession {
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.expires_at <= unix_timestamp_now() + EXPIRY_SKEW_SECONDS
    }

    /// The owner identity carried by this session, if the user id is usable.
    #[must_use]
    pub fn identity(&self) -> Option<OwnerIdentity> {
        let id = OwnerId::new(self.user.id.clone())?;
        Some(OwnerIdentity::new(
            id,
            normalize_text_option(self.user.email.clone()),
        ))
    }
}

impl fmt::Debug for AuthSession {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("AuthSession")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .field("user", &self.user)
            .finish()
    }
}

/// What the identity provider reports about its own email/password setup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthConfigStatus {
    pub email_enabled: bool,
    pub signup_enabled: bool,
    pub mailer_autoconfirm: bool,
}

impl AuthConfigStatus {
    /// Whether `wander auth signup` can succeed against this project.
    #[must_use]
    pub const fn accepts_signups(&self) -> bool {
        self.email_enabled && self.signup_enabled
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignUpOutcome {
    SignedIn(AuthSession),
    ConfirmationRequired,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Supabase auth is not configured for this profile.")]
    NotConfigured,
    #[error("Invalid auth configuration: {0}")]
    InvalidConfiguration(&'static str),
    #[error("{0}")]
    InvalidCredentials(String),
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Failed to parse JSON payload: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Auth API error: {0}")]
    Api(String),
    #[error("Secure storage error: {0}")]
    SecureStorage(String),
}

pub type AuthResult<T> = Result<T, AuthError>;

/// Where an authenticated session is kept between runs.
pub trait SessionPersistence: Clone + Send + Sync + 'static {
    fn load_session(&self) -> AuthResult<Option<AuthSession>>;
    fn save_session(&self, session: &AuthSession) -> AuthResult<()>;
    fn clear_session(&self) -> AuthResult<()>;
}

#[derive(Clone)]
pub struct SupabaseAuthClient<S: SessionPersistence> {
    auth_url: String,
    anon_key: String,
    client: Client,
    store: S,
}

impl<S: SessionPersistence> SupabaseAuthClient<S> {
    pub fn new(url: impl AsRef<str>, anon_key: impl Into<String>, store: S) -> AuthResult<Self> {
        let auth_url = normalize_auth_url(url.as_ref())?;
        let anon_key = anon_key.into().trim().to_string();
        if anon_key.is_empty() {
            return Err(AuthError::InvalidConfiguration(
                "Supabase anon key must not be empty",
            ));
        }

        Ok(Self {
            auth_url,
            anon_key,
            client: Client::builder().build()?,
            store,
        })
    }

    pub fn anon_key(&self) -> &str {
        &self.anon_key
    }

    /// Load the persisted session, refreshing it when it is about to expire.
    ///
    /// A session that cannot be refreshed is cleared and reported as signed out.
    pub async fn restore_session(&self) -> AuthResult<Option<AuthSession>> {
        let Some(stored) = self.store.load_session()? else {
            return Ok(None);
        };
        if !stored.is_expired() {
            return Ok(Some(stored));
        }

        match self.refresh_session(&stored.refresh_token).await {
            Ok(refreshed) => Ok(Some(refreshed)),
            Err(error) => {
                tracing::warn!("Failed to refresh persisted session: {}", error);
                self.store.clear_session()?;
                Ok(None)
            }
        }
    }

    pub async fn sign_up(&self, email: &str, password: &str) -> AuthResult<SignUpOutcome> {
        validate_sign_up(email, password)?;

        let request = self.public_request(
            self.client
                .post(format!("{}/signup", self.auth_url))
                .json(&credentials_payload(email, password)),
        );
        let response = self.send_auth_request(request).await?;
        match response.into_session()? {
            Some(session) => {
                self.store.save_session(&session)?;
                Ok(SignUpOutcome::SignedIn(session))
            }
            None => Ok(SignUpOutcome::ConfirmationRequired),
        }
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> AuthResult<AuthSession> {
        validate_credentials(email, password)?;

        let request = self.public_request(
            self.client
                .post(format!("{}/token", self.auth_url))
                .query(&[("grant_type", "password")])
                .json(&credentials_payload(email, password)),
        );
        self.exchange_for_session(request, "Sign-in").await
    }

    pub async fn refresh_session(&self, refresh_token: &str) -> AuthResult<AuthSession> {
        if refresh_token.trim().is_empty() {
            return Err(AuthError::InvalidConfiguration(
                "Refresh token must not be empty",
            ));
        }

        let request = self.public_request(
            self.client
                .post(format!("{}/token", self.auth_url))
                .query(&[("grant_type", "refresh_token")])
                .json(&serde_json::json!({ "refresh_token": refresh_token })),
        );
        self.exchange_for_session(request, "Refresh").await
    }

    /// Revoke the session upstream and forget it locally.
    ///
    /// An already-invalid token (401) still counts as signed out.
    pub async fn sign_out(&self, access_token: &str) -> AuthResult<()> {
        let response = self
            .client
            .post(format!("{}/logout", self.auth_url))
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token)
            .send()
            .await?;
        let status = response.status();
        if !(status.is_success() || status == StatusCode::UNAUTHORIZED) {
            let body = response.text().await.unwrap_or_default();
            return Err(AuthError::Api(parse_api_error(status, &body)));
        }

        self.store.clear_session()
    }

    /// Check the URL and anon key against the public settings endpoint.
    pub async fn verify_configuration(&self) -> AuthResult<AuthConfigStatus> {
        let request = self.public_request(
            self.client
                .get(format!("{}/settings", self.auth_url))
                .header("Accept", "application/json"),
        );
        let response = request.send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AuthError::Api(parse_api_error(status, &body)));
        }
        let settings = response.json::<GoTrueSettings>().await?;
        tracing::debug!("Fetched auth settings from {}", self.auth_url);
        Ok(settings.into())
    }

    async fn exchange_for_session(
        &self,
        request: RequestBuilder,
        label: &str,
    ) -> AuthResult<AuthSession> {
        let response = self.send_auth_request(request).await?;
        let session = response.into_session()?.ok_or_else(|| {
            AuthError::Api(format!("{label} response did not include an active session"))
        })?;
        self.store.save_session(&session)?;
        Ok(session)
    }

    fn public_request(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.anon_key)
            .bearer_auth(&self.anon_key)
    }

    async fn send_auth_request(&self, request: RequestBuilder) -> AuthResult<GoTrueResponse> {
        let response = request.send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AuthError::Api(parse_api_error(status, &body)));
        }
        Ok(response.json::<GoTrueResponse>().await?)
    }
}

pub fn normalize_auth_url(url: &str) -> AuthResult<String> {
    let trimmed = url.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(AuthError::InvalidConfiguration(
            "Supabase URL must not be empty",
        ));
    }
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        return Err(AuthError::InvalidConfiguration(
            "Supabase URL must include http:// or https://",
        ));
    }
    if trimmed.ends_with("/auth/v1") {
        Ok(trimmed.to_string())
    } else {
        Ok(format!("{trimmed}/auth/v1"))
    }
}

/// Both values or neither; a half-configured pair is an error.
pub fn resolve_optional_supabase_config(
    url: Option<String>,
    anon_key: Option<String>,
) -> AuthResult<Option<(String, String)>> {
    match (normalize_text_option(url), normalize_text_option(anon_key)) {
        (None, None) => Ok(None),
        (Some(url), Some(anon_key)) => Ok(Some((url, anon_key))),
        _ => Err(AuthError::NotConfigured),
    }
}

fn credentials_payload(email: &str, password: &str) -> serde_json::Value {
    serde_json::json!({
        "email": email.trim().to_lowercase(),
        "password": password,
    })
}

fn validate_credentials(email: &str, password: &str) -> AuthResult<()> {
    if email.trim().is_empty() || password.is_empty() {
        return Err(AuthError::InvalidCredentials(
            "Please fill in all fields".to_string(),
        ));
    }
    Ok(())
}

fn validate_sign_up(email: &str, password: &str) -> AuthResult<()> {
    validate_credentials(email, password)?;
    if password.chars().count() < MIN_PASSWORD_CHARS {
        return Err(AuthError::InvalidCredentials(format!(
            "Password must be at least {MIN_PASSWORD_CHARS} characters"
        )));
    }
    Ok(())
}

/// GoTrue answers either with top-level session fields or with a nested
/// `session` object (sign-up), and omits both when email confirmation is pending.
#[derive(Debug, Default, Deserialize)]
struct GoTrueResponse {
    access_token: Option<String>,
    refresh_token: Option<String>,
    expires_at: Option<i64>,
    expires_in: Option<i64>,
    user: Option<GoTrueUser>,
    session: Option<Box<GoTrueResponse>>,
}

impl GoTrueResponse {
    fn flatten(mut self) -> Self {
        if let Some(nested) = self.session.take() {
            let nested = nested.flatten();
            self.access_token = self.access_token.or(nested.access_token);
            self.refresh_token = self.refresh_token.or(nested.refresh_token);
            self.expires_at = self.expires_at.or(nested.expires_at);
            self.expires_in = self.expires_in.or(nested.expires_in);
            self.user = self.user.or(nested.user);
        }
        self
    }

    fn into_session(self) -> AuthResult<Option<AuthSession>> {
        let response = self.flatten();
        let expires_at = response.expires_at.or_else(|| {
            response
                .expires_in
                .map(|expires_in| unix_timestamp_now().saturating_add(expires_in))
        });
        let user = response.user.map(AuthUser::from);

        match (response.access_token, response.refresh_token, expires_at, user) {
            (Some(access_token), Some(refresh_token), Some(expires_at), Some(user)) => {
                Ok(Some(AuthSession {
                    access_token,
                    refresh_token,
                    expires_at,
                    user,
                }))
            }
            (None, None, _, Some(_)) => Ok(None),
            _ => Err(AuthError::Api(
                "Auth response did not include enough session fields".to_string(),
            )),
        }
    }
}

#[derive(Debug, Deserialize)]
struct GoTrueUser {
    id: String,
    email: Option<String>,
}

impl From<GoTrueUser> for AuthUser {
    fn from(value: GoTrueUser) -> Self {
        Self {
            id: value.id,
            email: value.email,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct GoTrueSettings {
    #[serde(default)]
    external: GoTrueExternalSettings,
    #[serde(default)]
    disable_signup: bool,
    #[serde(default)]
    mailer_autoconfirm: bool,
}

#[derive(Debug, Default, Deserialize)]
struct GoTrueExternalSettings {
    #[serde(default)]
    email: bool,
}

impl From<GoTrueSettings> for AuthConfigStatus {
    fn from(value: GoTrueSettings) -> Self {
        Self {
            email_enabled: value.external.email,
            signup_enabled: !value.disable_signup,
            mailer_autoconfirm: value.mailer_autoconfirm,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_map_to_config_status() {
        let settings: GoTrueSettings = serde_json::from_value(serde_json::json!({
            "external": { "email": true, "github": false },
            "disable_signup": false,
            "mailer_autoconfirm": true,
            "sms_provider": ""
        }))
        .unwrap();
        let status = AuthConfigStatus::from(settings);
        assert!(status.email_enabled);
        assert!(status.signup_enabled);
        assert!(status.mailer_autoconfirm);
        assert!(status.accepts_signups());

        let closed: GoTrueSettings =
            serde_json::from_value(serde_json::json!({ "disable_signup": true })).unwrap();
        let status = AuthConfigStatus::from(closed);
        assert!(!status.signup_enabled);
        assert!(!status.accepts_signups());
    }

    fn user(id: &str) -> GoTrueUser {
        GoTrueUser {
            id: id.to_string(),
            email: Some("ana@example.com".to_string()),
        }
    }

    fn session_for(id: &str) -> AuthSession {
        AuthSession {
            access_token: "secret-access-token".to_string(),
            refresh_token: "secret-refresh-token".to_string(),
            expires_at: 1_700_000_000,
            user: AuthUser {
                id: id.to_string(),
                email: Some(" ana@example.com ".to_string()),
            },
        }
    }

    #[test]
    fn normalize_auth_url_appends_auth_path() {
        let normalized = normalize_auth_url("https://demo.supabase.co/").unwrap();
        assert_eq!(normalized, "https://demo.supabase.co/auth/v1");
        let normalized = normalize_auth_url("https://demo.supabase.co/auth/v1").unwrap();
        assert_eq!(normalized, "https://demo.supabase.co/auth/v1");
        assert!(normalize_auth_url("demo.supabase.co").is_err());
    }

    #[test]
    fn response_without_tokens_means_confirmation_required() {
        let response = GoTrueResponse {
            user: Some(user("user-1")),
            ..GoTrueResponse::default()
        };
        assert!(response.into_session().unwrap().is_none());
    }

    #[test]
    fn nested_session_fields_are_used() {
        let response = GoTrueResponse {
            session: Some(Box::new(GoTrueResponse {
                access_token: Some("access".to_string()),
                refresh_token: Some("refresh".to_string()),
                expires_in: Some(3600),
                user: Some(user("user-1")),
                ..GoTrueResponse::default()
            })),
            ..GoTrueResponse::default()
        };
        let session = response.into_session().unwrap().unwrap();
        assert_eq!(session.user.id, "user-1");
        assert!(!session.is_expired());
    }

    #[test]
    fn partial_session_is_an_error() {
        let response = GoTrueResponse {
            access_token: Some("access".to_string()),
            user: Some(user("user-1")),
            ..GoTrueResponse::default()
        };
        assert!(response.into_session().is_err());
    }

    #[test]
    fn session_identity_requires_user_id() {
        let identity = session_for("user-1").identity().unwrap();
        assert_eq!(identity.id.as_str(), "user-1");
        assert_eq!(identity.contact.as_deref(), Some("ana@example.com"));
        assert!(session_for(" ").identity().is_none());
    }

    #[test]
    fn session_debug_redacts_tokens() {
        let rendered = format!("{:?}", session_for("user-1"));
        assert!(!rendered.contains("secret-access-token"));
        assert!(!rendered.contains("secret-refresh-token"));
        assert!(rendered.contains("[REDACTED]"));
    }

    #[test]
    fn sign_up_validation_enforces_password_length() {
        assert!(validate_sign_up("ana@example.com", "short").is_err());
        assert!(validate_sign_up("", "long-enough").is_err());
        assert!(validate_sign_up("ana@example.com", "long-enough").is_ok());
    }

    #[test]
    fn resolve_optional_config_requires_both_values() {
        assert!(resolve_optional_supabase_config(None, None).unwrap().is_none());
        assert!(resolve_optional_supabase_config(Some("https://x".to_string()), None).is_err());
        assert!(
            resolve_optional_supabase_config(Some("https://x".to_string()), Some("k".to_string()))
                .unwrap()
                .is_some()
        );
    }
}
