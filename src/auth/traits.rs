//! Shared authentication traits.

use crate::error::Result;

/// Trait for providing access tokens.
///
/// This abstracts the source of tokens (e.g. [`AuthManager`], a fixed token
/// in tests) from the resource facades that attach them.
///
/// [`AuthManager`]: crate::auth::AuthManager
#[async_trait::async_trait]
pub trait TokenProvider: Send + Sync {
    /// Get a verified access token.
    ///
    /// The implementation should handle renewal if necessary.
    async fn get_token(&self) -> Result<String>;
}
