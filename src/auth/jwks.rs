//! Signing key retrieval and access token verification.
//!
//! Keys are fetched from the identity provider on every verification and
//! never cached, so a key rotation can never make a valid token look bad.

use std::str::FromStr;

use jsonwebtoken::jwk::{Jwk, JwkSet};
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::api::{ApiClient, ApiRequest};
use crate::error::{ApiError, Error, Result};

/// Path of the identity provider's key set.
pub const JWKS_PATH: &str = "/jwk";

/// Claims decoded from a verified access token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject the token was issued to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,

    /// Any other claims, kept as-is.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Verification key built from a published JWK.
pub struct SigningKey {
    key: DecodingKey,
    algorithm: Option<Algorithm>,
    kid: Option<String>,
}

impl SigningKey {
    /// Convert a JWK into a verification key.
    pub fn from_jwk(jwk: &Jwk) -> Result<Self> {
        let key = DecodingKey::from_jwk(jwk).map_err(|e| {
            Error::Auth(ApiError::new(
                format!("Unusable signing key: {e}"),
                Some("EJWK".to_string()),
                None,
            ))
        })?;
        let algorithm = jwk
            .common
            .key_algorithm
            .as_ref()
            .and_then(|alg| Algorithm::from_str(&alg.to_string()).ok());

        Ok(Self {
            key,
            algorithm,
            kid: jwk.common.key_id.clone(),
        })
    }

    /// Key id advertised by the provider, if any.
    pub fn kid(&self) -> Option<&str> {
        self.kid.as_deref()
    }

    /// Verify signature and expiry of `token` and decode its claims.
    ///
    /// The algorithm declared by the key takes precedence over the token
    /// header; the key family must match either way. Expiry is checked
    /// without clock tolerance, and only when the token carries `exp`.
    pub fn verify(&self, token: &str) -> std::result::Result<Claims, jsonwebtoken::errors::Error> {
        let header = jsonwebtoken::decode_header(token)?;
        let algorithm = self.algorithm.unwrap_or(header.alg);

        let mut validation = Validation::new(algorithm);
        validation.leeway = 0;
        validation.required_spec_claims.clear();
        validation.validate_exp = true;
        validation.validate_aud = false;

        jsonwebtoken::decode::<Claims>(token, &self.key, &validation).map(|data| data.claims)
    }
}

impl std::fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningKey")
            .field("algorithm", &self.algorithm)
            .field("kid", &self.kid)
            .finish()
    }
}

/// Fetch the provider's current key set and build a key from its first entry.
pub async fn fetch_signing_key(client: &ApiClient) -> Result<SigningKey> {
    let envelope = client
        .send(&ApiRequest::get(JWKS_PATH))
        .await
        .map_err(Error::into_auth)?;

    let set: JwkSet = serde_json::from_value(envelope).map_err(|e| {
        Error::Auth(ApiError::new(
            format!("Malformed key set: {e}"),
            Some("EPARSE".to_string()),
            None,
        ))
    })?;

    let jwk = set.keys.first().ok_or(Error::NoSigningKeys)?;
    let key = SigningKey::from_jwk(jwk)?;
    debug!(kid = ?key.kid(), keys = set.keys.len(), "Fetched signing key");
    Ok(key)
}
