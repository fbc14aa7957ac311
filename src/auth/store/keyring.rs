//! Keyring-based credential storage.

use super::CredentialStore;
use crate::auth::credentials::Credentials;
use crate::error::{Error, Result};
use tracing::instrument;

/// Keyring-based credential storage.
///
/// Keeps the serialized pair in the system's native credential store under
/// a single entry.
///
/// Feature-gated behind `system-keyring`.
#[cfg(feature = "system-keyring")]
#[derive(Debug, Clone)]
pub struct KeyringCredentialStore {
    service: String,
    account: String,
}

#[cfg(feature = "system-keyring")]
impl Default for KeyringCredentialStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "system-keyring")]
impl KeyringCredentialStore {
    const SERVICE_NAME: &str = "poetri-cli";
    const ACCOUNT_NAME: &str = "credentials";

    /// Create a store using the default service name.
    pub fn new() -> Self {
        Self::with_service(Self::SERVICE_NAME)
    }

    /// Create a store under a custom service name.
    pub fn with_service(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            account: Self::ACCOUNT_NAME.to_string(),
        }
    }

    fn entry(&self) -> Result<keyring::Entry> {
        keyring::Entry::new(&self.service, &self.account)
            .map_err(|e| Error::Storage(format!("Failed to create keyring entry: {}", e)))
    }
}

#[cfg(feature = "system-keyring")]
impl CredentialStore for KeyringCredentialStore {
    #[instrument(skip(self))]
    fn load(&self) -> Result<Option<Credentials>> {
        match self.entry()?.get_password() {
            Ok(secret) => {
                let credentials = serde_json::from_str(&secret).map_err(|e| {
                    Error::Storage(format!("Failed to parse credentials from keyring: {}", e))
                })?;
                Ok(Some(credentials))
            }
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(Error::Storage(format!("Keyring error: {}", e))),
        }
    }

    #[instrument(skip(self, credentials), fields(identity = %credentials.identity))]
    fn save(&self, credentials: &Credentials) -> Result<()> {
        let json = serde_json::to_string(credentials)
            .map_err(|e| Error::Storage(format!("Failed to serialize credentials: {}", e)))?;
        self.entry()?
            .set_password(&json)
            .map_err(|e| Error::Storage(format!("Keyring error: {}", e)))
    }

    #[instrument(skip(self))]
    fn clear(&self) -> Result<()> {
        match self.entry()?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(Error::Storage(format!("Keyring error: {}", e))),
        }
    }

    fn name(&self) -> &str {
        "keyring"
    }
}
