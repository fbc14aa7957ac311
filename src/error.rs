use std::fmt;

use serde::Serialize;

/// Normalized failure of a call against the remote API.
///
/// This is the only error shape the request pipeline hands upward, whether
/// the call failed at the transport level or with a non-2xx response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiError {
    pub message: String,
    pub code: Option<String>,
    /// Status of the response, `None` when no response was received.
    pub http_status: Option<u16>,
}

impl ApiError {
    pub fn new(message: impl Into<String>, code: Option<String>, http_status: Option<u16>) -> Self {
        Self {
            message: message.into(),
            code,
            http_status,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.code, self.http_status) {
            (Some(code), Some(status)) if code != &self.message => {
                write!(f, "{} ({code}, HTTP {status})", self.message)
            }
            (_, Some(status)) => write!(f, "{} (HTTP {status})", self.message),
            (Some(code), None) if code != &self.message => write!(f, "{} ({code})", self.message),
            _ => f.write_str(&self.message),
        }
    }
}

/// Errors produced by the poetri client library.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The API could not be reached.
    #[error("Transport error: {0}")]
    Transport(ApiError),

    /// The API answered with a failure.
    #[error("API error: {0}")]
    Api(ApiError),

    /// Token exchange, key retrieval or registration failed.
    #[error("Authentication failed: {0}")]
    Auth(ApiError),

    /// The stored access token did not verify, even after renewal.
    #[error("Invalid access token: {0}")]
    InvalidToken(#[from] jsonwebtoken::errors::Error),

    /// The identity provider published an empty key set.
    #[error("Identity provider returned no signing keys")]
    NoSigningKeys,

    /// No credential pair is stored.
    #[error("Not logged in. Run 'poetri login' first.")]
    NotAuthenticated,

    /// Credential storage error.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Caller-supplied value rejected before any request was made.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// The normalized API error carried by transport, API and auth failures.
    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            Self::Transport(e) | Self::Api(e) | Self::Auth(e) => Some(e),
            _ => None,
        }
    }

    /// Re-tag an API failure as an authentication failure.
    ///
    /// Both carry the same [`ApiError`]; only the calling context differs.
    pub fn into_auth(self) -> Self {
        match self {
            Self::Api(e) => Self::Auth(e),
            other => other,
        }
    }
}
