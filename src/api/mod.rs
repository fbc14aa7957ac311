//! Request pipeline for the poetri platform API.

pub mod client;
pub mod request;

use serde::de::DeserializeOwned;
use serde_json::Value;

pub use client::{ApiClient, normalize_error, transport_error};
pub use request::{ApiRequest, AuthMode, Method, RequestExtras};

use crate::error::{ApiError, Error, Result};

/// Decode the `data` member of a response into a typed value.
pub fn decode_data<T: DeserializeOwned>(data: Value) -> Result<T> {
    serde_json::from_value(data).map_err(|e| {
        Error::Api(ApiError::new(
            format!("Unexpected response shape: {e}"),
            Some("EPARSE".to_string()),
            None,
        ))
    })
}
