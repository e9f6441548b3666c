//! CLI Supabase auth/session helpers with secure keychain persistence.

#[cfg(test)]
use std::collections::HashMap;
#[cfg(test)]
use std::sync::{Mutex, OnceLock};

#[cfg(not(test))]
use keyring::Entry;

use wander_core::auth::{
    resolve_optional_supabase_config, AuthConfigStatus, AuthResult, SessionPersistence,
    SignUpOutcome, SupabaseAuthClient,
};
pub use wander_core::auth::{AuthError, AuthSession};
use wander_core::config::ClientConfig;

#[cfg(not(test))]
const KEYRING_SERVICE_NAME: &str = "wander-cli";

#[derive(Clone)]
struct SessionStore {
    username: String,
}

impl SessionStore {
    fn new(profile_name: &str) -> Self {
        Self {
            username: format!("supabase_session:{profile_name}"),
        }
    }

    #[cfg(test)]
    fn test_store() -> &'static Mutex<HashMap<String, String>> {
        static STORE: OnceLock<Mutex<HashMap<String, String>>> = OnceLock::new();
        STORE.get_or_init(|| Mutex::new(HashMap::new()))
    }

    #[cfg(not(test))]
    fn entry(&self) -> AuthResult<Entry> {
        Entry::new(KEYRING_SERVICE_NAME, &self.username)
            .map_err(|error| AuthError::SecureStorage(error.to_string()))
    }
}

impl SessionPersistence for SessionStore {
    #[cfg(not(test))]
    fn load_session(&self) -> AuthResult<Option<AuthSession>> {
        let entry = self.entry()?;
        match entry.get_password() {
            Ok(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(error) => Err(AuthError::SecureStorage(error.to_string())),
        }
    }

    #[cfg(test)]
    fn load_session(&self) -> AuthResult<Option<AuthSession>> {
        let guard = Self::test_store()
            .lock()
            .map_err(|error| AuthError::SecureStorage(error.to_string()))?;
        guard
            .get(&self.username)
            .map(|raw| serde_json::from_str(raw))
            .transpose()
            .map_err(AuthError::from)
    }

    #[cfg(not(test))]
    fn save_session(&self, session: &AuthSession) -> AuthResult<()> {
        let raw = serde_json::to_string(session)?;
        self.entry()?
            .set_password(&raw)
            .map_err(|error| AuthError::SecureStorage(error.to_string()))
    }

    #[cfg(test)]
    fn save_session(&self, session: &AuthSession) -> AuthResult<()> {
        let raw = serde_json::to_string(session)?;
        let mut guard = Self::test_store()
            .lock()
            .map_err(|error| AuthError::SecureStorage(error.to_string()))?;
        guard.insert(self.username.clone(), raw);
        Ok(())
    }

    #[cfg(not(test))]
    fn clear_session(&self) -> AuthResult<()> {
        let entry = self.entry()?;
        match entry.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(error) => Err(AuthError::SecureStorage(error.to_string())),
        }
    }

    #[cfg(test)]
    fn clear_session(&self) -> AuthResult<()> {
        let mut guard = Self::test_store()
            .lock()
            .map_err(|error| AuthError::SecureStorage(error.to_string()))?;
        guard.remove(&self.username);
        Ok(())
    }
}

#[derive(Clone)]
pub struct SupabaseAuthService {
    inner: SupabaseAuthClient<SessionStore>,
}

impl SupabaseAuthService {
    pub fn new_for_profile(profile_name: &str, config: &ClientConfig) -> AuthResult<Option<Self>> {
        let Some((url, anon_key)) =
            resolve_optional_supabase_config(config.supabase_url(), config.supabase_anon_key())?
        else {
            return Ok(None);
        };

        Ok(Some(Self {
            inner: SupabaseAuthClient::new(url, anon_key, SessionStore::new(profile_name))?,
        }))
    }

    pub async fn sign_up(&self, email: &str, password: &str) -> AuthResult<SignUpOutcome> {
        self.inner.sign_up(email, password).await
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> AuthResult<AuthSession> {
        self.inner.sign_in(email, password).await
    }

    pub async fn restore_session(&self) -> AuthResult<Option<AuthSession>> {
        self.inner.restore_session().await
    }

    pub async fn sign_out(&self, access_token: &str) -> AuthResult<()> {
        self.inner.sign_out(access_token).await
    }

    pub async fn verify_configuration(&self) -> AuthResult<AuthConfigStatus> {
        self.inner.verify_configuration().await
    }
}

pub fn load_stored_session(profile_name: &str) -> AuthResult<Option<AuthSession>> {
    SessionStore::new(profile_name).load_session()
}

pub fn clear_stored_session(profile_name: &str) -> AuthResult<()> {
    SessionStore::new(profile_name).clear_session()
}

#[cfg(test)]
mod tests {
    use wander_core::auth::AuthUser;

    use super::*;

    fn session(access_token: &str) -> AuthSession {
        AuthSession {
            access_token: access_token.to_string(),
            refresh_token: "refresh".to_string(),
            expires_at: 4_000_000_000,
            user: AuthUser {
                id: "user-1".to_string(),
                email: Some("ana@example.com".to_string()),
            },
        }
    }

    #[test]
    fn stored_session_is_scoped_per_profile() {
        let store = SessionStore::new("auth-test-scoped");
        store.save_session(&session("token-a")).unwrap();

        let loaded = load_stored_session("auth-test-scoped").unwrap().unwrap();
        assert_eq!(loaded.access_token, "token-a");
        assert!(load_stored_session("auth-test-other").unwrap().is_none());

        clear_stored_session("auth-test-scoped").unwrap();
        assert!(load_stored_session("auth-test-scoped").unwrap().is_none());
    }

    #[test]
    fn service_requires_both_supabase_values() {
        let empty = ClientConfig::default();
        assert!(SupabaseAuthService::new_for_profile("p", &empty)
            .unwrap()
            .is_none());

        let half = ClientConfig {
            supabase_url: Some("https://demo.supabase.co".to_string()),
            ..ClientConfig::default()
        };
        assert!(SupabaseAuthService::new_for_profile("p", &half).is_err());
    }

    #[tokio::test(flavor = "current_thread")]
    async fn restore_returns_unexpired_stored_session() {
        let config = ClientConfig {
            supabase_url: Some("https://demo.supabase.co".to_string()),
            supabase_anon_key: Some("anon".to_string()),
            ..ClientConfig::default()
        };
        SessionStore::new("auth-test-restore")
            .save_session(&session("token-r"))
            .unwrap();

        let service = SupabaseAuthService::new_for_profile("auth-test-restore", &config)
            .unwrap()
            .unwrap();
        let restored = service.restore_session().await.unwrap().unwrap();
        assert_eq!(restored.access_token, "token-r");
        assert_eq!(restored.identity().unwrap().id.as_str(), "user-1");
    }
}
