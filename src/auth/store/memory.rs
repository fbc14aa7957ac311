//! In-memory credential storage.

use super::CredentialStore;
use crate::auth::credentials::Credentials;
use crate::error::{Error, Result};
use std::sync::{Arc, RwLock};
use tracing::instrument;

/// In-memory credential storage.
///
/// Nothing survives the process. Used by tests and by the `memory` backend
/// for one-shot sessions. Clones share the same slot.
#[derive(Debug, Clone, Default)]
pub struct MemoryCredentialStore {
    inner: Arc<RwLock<Option<Credentials>>>,
}

impl MemoryCredentialStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store already holding a pair.
    pub fn with_credentials(credentials: Credentials) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Some(credentials))),
        }
    }
}

fn poisoned<T>(_: T) -> Error {
    Error::Storage("credential lock poisoned".to_string())
}

impl CredentialStore for MemoryCredentialStore {
    #[instrument(skip(self))]
    fn load(&self) -> Result<Option<Credentials>> {
        let guard = self.inner.read().map_err(poisoned)?;
        Ok(guard.clone())
    }

    #[instrument(skip(self, credentials))]
    fn save(&self, credentials: &Credentials) -> Result<()> {
        let mut guard = self.inner.write().map_err(poisoned)?;
        *guard = Some(credentials.clone());
        Ok(())
    }

    #[instrument(skip(self))]
    fn clear(&self) -> Result<()> {
        let mut guard = self.inner.write().map_err(poisoned)?;
        *guard = None;
        Ok(())
    }

    fn name(&self) -> &str {
        "memory"
    }
}
