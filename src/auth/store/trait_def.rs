//! Credential store trait.

use crate::auth::credentials::Credentials;
use crate::error::{Error, Result};
use std::sync::Arc;

/// Trait for credential storage backends.
///
/// A store holds at most one [`Credentials`] pair: the identity currently
/// logged in on this machine. All implementations must be thread-safe
/// (`Send + Sync`).
pub trait CredentialStore: Send + Sync {
    /// Load the stored pair, if any.
    fn load(&self) -> Result<Option<Credentials>>;

    /// Persist a pair, replacing whatever was stored before.
    fn save(&self, credentials: &Credentials) -> Result<()>;

    /// Remove the stored pair. Removing nothing is not an error.
    fn clear(&self) -> Result<()>;

    /// Get the name of this storage backend.
    fn name(&self) -> &str;

    /// Store a freshly acquired pair for `identity`.
    fn set(&self, identity: &str, access_token: &str, refresh_token: &str) -> Result<()> {
        self.save(&Credentials::new(identity, access_token, refresh_token))
    }

    /// The stored pair, or [`Error::NotAuthenticated`].
    fn credentials(&self) -> Result<Credentials> {
        self.load()?.ok_or(Error::NotAuthenticated)
    }

    /// The current access token.
    fn get(&self) -> Result<String> {
        self.credentials().map(|c| c.access_token)
    }

    /// The current refresh token.
    fn get_refresh(&self) -> Result<String> {
        self.credentials().map(|c| c.refresh_token)
    }

    /// Whether a pair is stored. Never fails; unreadable storage counts as
    /// logged out.
    fn is_logged_in(&self) -> bool {
        match self.load() {
            Ok(found) => found.is_some(),
            Err(e) => {
                tracing::warn!(backend = self.name(), error = %e, "Failed to read credentials");
                false
            }
        }
    }
}

// Blanket implementation for Arc<T>
impl<T: CredentialStore + ?Sized> CredentialStore for Arc<T> {
    fn load(&self) -> Result<Option<Credentials>> {
        (**self).load()
    }
    fn save(&self, credentials: &Credentials) -> Result<()> {
        (**self).save(credentials)
    }
    fn clear(&self) -> Result<()> {
        (**self).clear()
    }
    fn name(&self) -> &str {
        (**self).name()
    }
}

// Blanket implementation for Box<T>
impl<T: CredentialStore + ?Sized> CredentialStore for Box<T> {
    fn load(&self) -> Result<Option<Credentials>> {
        (**self).load()
    }
    fn save(&self, credentials: &Credentials) -> Result<()> {
        (**self).save(credentials)
    }
    fn clear(&self) -> Result<()> {
        (**self).clear()
    }
    fn name(&self) -> &str {
        (**self).name()
    }
}
