use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde_json::{Value, json};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use poetri::api::ApiClient;
use poetri::auth::{AuthManager, MemoryCredentialStore};
use poetri::config::AuthApiConfig;
use poetri::net::HttpClient;

pub const OLD_KEY: &[u8] = b"old-signing-secret-old-signing-s";
pub const NEW_KEY: &[u8] = b"new-signing-secret-new-signing-s";

pub const CLIENT_ID: &str = "cli";
pub const CLIENT_SECRET: &str = "s3cret";

pub fn client(server: &MockServer) -> Arc<ApiClient> {
    let api = AuthApiConfig {
        endpoint: server.uri(),
        client_id: CLIENT_ID.to_string(),
        client_secret: CLIENT_SECRET.to_string(),
    };
    Arc::new(ApiClient::new(&api, HttpClient::new()).unwrap())
}

/// A manager backed by a memory store; the returned store shares its slot.
pub fn manager(server: &MockServer, store: MemoryCredentialStore) -> (AuthManager, MemoryCredentialStore) {
    let manager = AuthManager::new(client(server), Arc::new(store.clone()));
    (manager, store)
}

pub fn jwk_set(secret: &[u8]) -> Value {
    json!({
        "keys": [{
            "kty": "oct",
            "kid": "signing",
            "alg": "HS256",
            "k": URL_SAFE_NO_PAD.encode(secret),
        }]
    })
}

/// Sign an HS256 token for `sub` expiring `exp_offset` seconds from now.
pub fn token(secret: &[u8], sub: &str, exp_offset: i64) -> String {
    let now = chrono::Utc::now().timestamp();
    let claims = json!({ "sub": sub, "iat": now, "exp": now + exp_offset });
    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret),
    )
    .unwrap()
}

pub async fn mount_jwks(server: &MockServer, secret: &[u8]) {
    Mock::given(method("GET"))
        .and(path("/jwk"))
        .respond_with(ResponseTemplate::new(200).set_body_json(jwk_set(secret)))
        .mount(server)
        .await;
}

pub fn token_response(access: &str, refresh: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "access_token": access,
        "refresh_token": refresh,
        "token_type": "bearer",
    }))
}

/// Sign an HS256 token for `sub` that carries no `exp` claim.
pub fn token_without_exp(secret: &[u8], sub: &str) -> String {
    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &json!({ "sub": sub, "iat": chrono::Utc::now().timestamp() }),
        &EncodingKey::from_secret(secret),
    )
    .unwrap()
}
