//! Credential lifecycle: storage, verification and renewal.

pub mod credentials;
pub mod jwks;
pub mod manager;
pub mod store;
pub mod traits;

pub use credentials::Credentials;
pub use jwks::{Claims, SigningKey};
pub use manager::{AuthManager, AuthStatus};
pub use store::{CredentialStore, FileCredentialStore, MemoryCredentialStore};
pub use traits::TokenProvider;
