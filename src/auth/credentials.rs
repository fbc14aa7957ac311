//! The persisted credential pair.

use serde::{Deserialize, Serialize};

/// Access and refresh token issued together for one identity.
///
/// A pair is only ever replaced as a whole: the access token is never used
/// with a refresh token from a different acquisition.
#[derive(Clone, Serialize, Deserialize, PartialEq)]
pub struct Credentials {
    /// Username the pair was issued to.
    pub identity: String,

    /// Signed access token sent as a bearer credential.
    pub access_token: String,

    /// Token exchanged for a new pair once the access token stops verifying.
    pub refresh_token: String,

    /// Unix timestamp of the login or renewal that produced this pair.
    #[serde(default)]
    pub obtained_at: i64,
}

impl Credentials {
    /// Create a pair stamped with the current time.
    pub fn new(
        identity: impl Into<String>,
        access_token: impl Into<String>,
        refresh_token: impl Into<String>,
    ) -> Self {
        Self {
            identity: identity.into(),
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
            obtained_at: chrono::Utc::now().timestamp(),
        }
    }

    /// Seconds elapsed since the pair was obtained.
    pub fn age_secs(&self) -> i64 {
        (chrono::Utc::now().timestamp() - self.obtained_at).max(0)
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("identity", &self.identity)
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .field("obtained_at", &self.obtained_at)
            .finish()
    }
}
