//! Credential lifecycle manager.
//!
//! Handles registration, login, verification of the stored access token and
//! its renewal through the refresh token.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::api::{ApiClient, ApiRequest, AuthMode};
use crate::auth::jwks::{self, Claims, SigningKey};
use crate::auth::store::{self, CredentialStore};
use crate::auth::traits::TokenProvider;
use crate::config::Config;
use crate::error::{ApiError, Error, Result};

/// Token endpoint of the identity provider.
pub const TOKEN_PATH: &str = "/auth/token";

/// Account registration endpoint.
pub const USERS_PATH: &str = "/users";

/// Body returned by the token endpoint for both grant types.
#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
}

/// Login state as reported by `poetri status`.
#[derive(Debug, Clone, Serialize)]
pub struct AuthStatus {
    pub logged_in: bool,
    pub identity: Option<String>,
    pub backend: String,
    pub obtained_at: Option<i64>,
    /// Seconds since the stored pair was obtained.
    pub age_secs: Option<i64>,
}

/// Manages the credential lifecycle for the current user.
///
/// The store is injected so tests can substitute an in-memory one. Renewals
/// are serialized through an async mutex: two concurrent refreshes would
/// otherwise spend the same refresh token twice.
pub struct AuthManager {
    client: Arc<ApiClient>,
    store: Arc<dyn CredentialStore>,
    refresh_lock: Mutex<()>,
}

impl AuthManager {
    pub fn new(client: Arc<ApiClient>, store: Arc<dyn CredentialStore>) -> Self {
        Self {
            client,
            store,
            refresh_lock: Mutex::new(()),
        }
    }

    /// Build the API client and the configured credential store.
    pub fn from_config(config: &Config) -> Result<Self> {
        let client = Arc::new(ApiClient::from_config(config)?);
        let store = store::from_config(&config.credentials);
        Ok(Self::new(client, store))
    }

    pub fn client(&self) -> Arc<ApiClient> {
        self.client.clone()
    }

    pub fn store(&self) -> Arc<dyn CredentialStore> {
        self.store.clone()
    }

    pub fn is_logged_in(&self) -> bool {
        self.store.is_logged_in()
    }

    // =========================================================================
    // Account
    // =========================================================================

    /// Create an account. Authenticated with the client credentials, not the
    /// user's, and independent of the current login state.
    pub async fn register(&self, user: Value) -> Result<Value> {
        let req = ApiRequest::post(USERS_PATH)
            .with_body(user)
            .with_auth(AuthMode::ClientBasic);
        let created = self.client.request(&req).await.map_err(Error::into_auth)?;
        info!("Account registered");
        Ok(created)
    }

    /// Exchange a username and password for a credential pair and store it.
    pub async fn login(&self, username: &str, password: &str) -> Result<()> {
        let tokens = self
            .exchange(&[
                ("grant_type", "password"),
                ("client_id", self.client.client_id()),
                ("client_secret", self.client.client_secret()),
                ("username", username),
                ("password", password),
            ])
            .await?;

        self.store
            .set(username, &tokens.access_token, &tokens.refresh_token)?;
        info!(identity = username, backend = self.store.name(), "Logged in");
        Ok(())
    }

    /// Forget the stored credential pair.
    pub fn logout(&self) -> Result<()> {
        self.store.clear()?;
        info!(backend = self.store.name(), "Logged out");
        Ok(())
    }

    pub fn status(&self) -> Result<AuthStatus> {
        let stored = self.store.load()?;
        Ok(AuthStatus {
            logged_in: stored.is_some(),
            identity: stored.as_ref().map(|c| c.identity.clone()),
            backend: self.store.name().to_string(),
            obtained_at: stored.as_ref().map(|c| c.obtained_at),
            age_secs: stored.as_ref().map(|c| c.age_secs()),
        })
    }

    // =========================================================================
    // Verification and renewal
    // =========================================================================

    /// Verify the stored access token against a freshly fetched signing key.
    ///
    /// A token that fails verification for any reason triggers exactly one
    /// renewal, after which verification runs once more against the same key
    /// and its outcome is returned as-is.
    pub async fn verify_token(&self) -> Result<Claims> {
        // Nothing to verify or renew without a stored pair.
        self.store.credentials()?;

        let key = jwks::fetch_signing_key(&self.client).await?;

        let (rejected, reason) = match self.check(&key)? {
            (_, Ok(claims)) => return Ok(claims),
            (token, Err(reason)) => (token, reason),
        };

        warn!(error = %reason, "Access token rejected, renewing credentials");
        self.renew(Some(&rejected)).await?;

        let (_, outcome) = self.check(&key)?;
        let claims = outcome?;
        debug!(sub = ?claims.sub, "Access token verified after renewal");
        Ok(claims)
    }

    /// Alias of [`verify_token`](Self::verify_token) for callers that only
    /// need proof the session is still valid.
    pub async fn me(&self) -> Result<Claims> {
        self.verify_token().await
    }

    /// Exchange the stored refresh token for a new pair.
    ///
    /// The identity is taken from the stored pair, so the renewed pair is
    /// always saved under the user it was issued to.
    pub async fn refresh(&self) -> Result<()> {
        self.renew(None).await
    }

    fn check(
        &self,
        key: &SigningKey,
    ) -> Result<(String, std::result::Result<Claims, jsonwebtoken::errors::Error>)> {
        let token = self.store.get()?;
        let outcome = key.verify(&token);
        Ok((token, outcome))
    }

    /// Renew the stored pair. With `stale` set, skip the exchange when the
    /// stored access token is no longer the one that was rejected.
    async fn renew(&self, stale: Option<&str>) -> Result<()> {
        let _guard = self.refresh_lock.lock().await;

        let current = self.store.credentials()?;
        if stale.is_some_and(|token| token != current.access_token) {
            debug!(identity = %current.identity, "Credentials already renewed");
            return Ok(());
        }

        let tokens = self
            .exchange(&[
                ("grant_type", "refresh_token"),
                ("client_id", self.client.client_id()),
                ("client_secret", self.client.client_secret()),
                ("refresh_token", current.refresh_token.as_str()),
            ])
            .await?;

        self.store
            .set(&current.identity, &tokens.access_token, &tokens.refresh_token)?;
        info!(identity = %current.identity, "Credentials renewed");
        Ok(())
    }

    async fn exchange(&self, form: &[(&str, &str)]) -> Result<TokenResponse> {
        let req = ApiRequest::post(TOKEN_PATH).with_form(form.iter().copied());
        let envelope = self.client.send(&req).await.map_err(Error::into_auth)?;
        serde_json::from_value(envelope).map_err(|e| {
            Error::Auth(ApiError::new(
                format!("Malformed token response: {e}"),
                Some("EPARSE".to_string()),
                None,
            ))
        })
    }
}

#[async_trait::async_trait]
impl TokenProvider for AuthManager {
    async fn get_token(&self) -> Result<String> {
        self.verify_token().await?;
        self.store.get()
    }
}

impl std::fmt::Debug for AuthManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthManager")
            .field("endpoint", &self.client.endpoint().as_str())
            .field("store", &self.store.name())
            .finish()
    }
}
