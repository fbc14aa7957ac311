//! Credential storage implementations.

pub mod file;
#[cfg(feature = "system-keyring")]
pub mod keyring;
pub mod memory;
pub mod trait_def;

use std::sync::Arc;

use crate::config::{CredentialsConfig, StorageBackend};

// Re-exports
pub use file::FileCredentialStore;
pub use memory::MemoryCredentialStore;
pub use trait_def::CredentialStore;

#[cfg(feature = "system-keyring")]
pub use keyring::KeyringCredentialStore;

/// Build the store selected by the `[credentials]` configuration section.
pub fn from_config(config: &CredentialsConfig) -> Arc<dyn CredentialStore> {
    match config.backend {
        StorageBackend::File => Arc::new(FileCredentialStore::new(&config.dir)),
        #[cfg(feature = "system-keyring")]
        StorageBackend::Keyring => Arc::new(KeyringCredentialStore::new()),
        #[cfg(not(feature = "system-keyring"))]
        StorageBackend::Keyring => {
            tracing::warn!(
                "Keyring storage requested but system-keyring feature not enabled, falling back to file storage"
            );
            Arc::new(FileCredentialStore::new(&config.dir))
        }
        StorageBackend::Memory => Arc::new(MemoryCredentialStore::new()),
    }
}
