use serde_json::json;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use poetri::Error;
use poetri::auth::{CredentialStore, Credentials, MemoryCredentialStore, TokenProvider};

use crate::common::{self, NEW_KEY, OLD_KEY};

#[tokio::test]
async fn test_login_then_verify_returns_subject() {
    let server = MockServer::start().await;
    common::mount_jwks(&server, OLD_KEY).await;

    let access = common::token(OLD_KEY, "alice", 3600);
    Mock::given(method("POST"))
        .and(path("/auth/token"))
        .and(body_string_contains("grant_type=password"))
        .and(body_string_contains("client_id=cli"))
        .and(body_string_contains("client_secret=s3cret"))
        .and(body_string_contains("username=alice"))
        .and(body_string_contains("password=wonderland"))
        .respond_with(common::token_response(&access, "R1"))
        .expect(1)
        .mount(&server)
        .await;

    let (manager, store) = common::manager(&server, MemoryCredentialStore::new());
    assert!(!manager.is_logged_in());

    manager.login("alice", "wonderland").await.unwrap();
    assert!(manager.is_logged_in());

    let stored = store.credentials().unwrap();
    assert_eq!(stored.identity, "alice");
    assert_eq!(stored.access_token, access);
    assert_eq!(stored.refresh_token, "R1");

    let claims = manager.verify_token().await.unwrap();
    assert_eq!(claims.sub.as_deref(), Some("alice"));
}

#[tokio::test]
async fn test_login_failure_is_auth_error_and_stores_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/token"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": { "message": "Invalid credentials", "code": "invalid_grant" }
        })))
        .mount(&server)
        .await;

    let (manager, store) = common::manager(&server, MemoryCredentialStore::new());
    let err = manager.login("alice", "wrong").await.unwrap_err();

    let api = match err {
        Error::Auth(api) => api,
        other => panic!("expected auth error, got {other:?}"),
    };
    assert_eq!(api.message, "Invalid credentials");
    assert_eq!(api.code.as_deref(), Some("invalid_grant"));
    assert_eq!(api.http_status, Some(401));
    assert!(!store.is_logged_in());
}

#[tokio::test]
async fn test_expired_token_refreshes_exactly_once() {
    let server = MockServer::start().await;
    common::mount_jwks(&server, OLD_KEY).await;

    let renewed = common::token(OLD_KEY, "alice", 3600);
    Mock::given(method("POST"))
        .and(path("/auth/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("refresh_token=R1"))
        .respond_with(common::token_response(&renewed, "R2"))
        .expect(1)
        .mount(&server)
        .await;

    let expired = common::token(OLD_KEY, "alice", -3600);
    let (manager, store) = common::manager(
        &server,
        MemoryCredentialStore::with_credentials(Credentials::new("alice", &expired, "R1")),
    );

    let claims = manager.verify_token().await.unwrap();
    assert_eq!(claims.sub.as_deref(), Some("alice"));

    let stored = store.credentials().unwrap();
    assert_eq!(stored.identity, "alice");
    assert_eq!(stored.access_token, renewed);
    assert_eq!(stored.refresh_token, "R2");
}

#[tokio::test]
async fn test_token_expired_seconds_ago_refreshes_once() {
    let server = MockServer::start().await;
    common::mount_jwks(&server, OLD_KEY).await;

    let renewed = common::token(OLD_KEY, "alice", 3600);
    Mock::given(method("POST"))
        .and(path("/auth/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .respond_with(common::token_response(&renewed, "R2"))
        .expect(1)
        .mount(&server)
        .await;

    let just_expired = common::token(OLD_KEY, "alice", -30);
    let (manager, store) = common::manager(
        &server,
        MemoryCredentialStore::with_credentials(Credentials::new("alice", &just_expired, "R1")),
    );

    assert_eq!(manager.get_token().await.unwrap(), renewed);
    assert_eq!(store.credentials().unwrap().refresh_token, "R2");
}

#[tokio::test]
async fn test_token_without_exp_verifies_without_refresh() {
    let server = MockServer::start().await;
    common::mount_jwks(&server, OLD_KEY).await;
    Mock::given(method("POST"))
        .and(path("/auth/token"))
        .respond_with(common::token_response("unused", "unused"))
        .expect(0)
        .mount(&server)
        .await;

    let unbounded = common::token_without_exp(OLD_KEY, "alice");
    let (manager, store) = common::manager(
        &server,
        MemoryCredentialStore::with_credentials(Credentials::new("alice", &unbounded, "R1")),
    );

    let claims = manager.verify_token().await.unwrap();
    assert_eq!(claims.sub.as_deref(), Some("alice"));
    assert!(claims.exp.is_none());
    assert_eq!(store.credentials().unwrap().access_token, unbounded);
}

#[tokio::test]
async fn test_malformed_token_triggers_refresh() {
    let server = MockServer::start().await;
    common::mount_jwks(&server, OLD_KEY).await;

    let renewed = common::token(OLD_KEY, "alice", 3600);
    Mock::given(method("POST"))
        .and(path("/auth/token"))
        .respond_with(common::token_response(&renewed, "R2"))
        .expect(1)
        .mount(&server)
        .await;

    let (manager, _store) = common::manager(
        &server,
        MemoryCredentialStore::with_credentials(Credentials::new("alice", "garbage", "R1")),
    );
    assert!(manager.me().await.is_ok());
}

#[tokio::test]
async fn test_refresh_failure_propagates() {
    let server = MockServer::start().await;
    common::mount_jwks(&server, OLD_KEY).await;

    Mock::given(method("POST"))
        .and(path("/auth/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": { "message": "Refresh token revoked", "code": "invalid_grant" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let expired = common::token(OLD_KEY, "alice", -3600);
    let (manager, store) = common::manager(
        &server,
        MemoryCredentialStore::with_credentials(Credentials::new("alice", &expired, "R1")),
    );

    let err = manager.verify_token().await.unwrap_err();
    let api = err.api_error().expect("normalized error");
    assert!(matches!(err, Error::Auth(_)));
    assert_eq!(api.code.as_deref(), Some("invalid_grant"));
    assert_eq!(api.http_status, Some(400));

    // The rejected pair is left in place.
    assert_eq!(store.credentials().unwrap().refresh_token, "R1");
}

#[tokio::test]
async fn test_still_invalid_after_refresh_is_not_retried() {
    let server = MockServer::start().await;
    common::mount_jwks(&server, OLD_KEY).await;

    let still_expired = common::token(OLD_KEY, "alice", -3600);
    Mock::given(method("POST"))
        .and(path("/auth/token"))
        .respond_with(common::token_response(&still_expired, "R2"))
        .expect(1)
        .mount(&server)
        .await;

    let expired = common::token(OLD_KEY, "alice", -3600);
    let (manager, _store) = common::manager(
        &server,
        MemoryCredentialStore::with_credentials(Credentials::new("alice", &expired, "R1")),
    );

    let err = manager.verify_token().await.unwrap_err();
    assert!(matches!(err, Error::InvalidToken(_)), "got {err:?}");
}

#[tokio::test]
async fn test_key_rotation_leaves_renewed_pair() {
    let server = MockServer::start().await;
    // The provider now publishes only the new key.
    common::mount_jwks(&server, NEW_KEY).await;

    let t2 = common::token(NEW_KEY, "alice", 3600);
    Mock::given(method("POST"))
        .and(path("/auth/token"))
        .and(body_string_contains("refresh_token=R1"))
        .respond_with(common::token_response(&t2, "R2"))
        .expect(1)
        .mount(&server)
        .await;

    let t1 = common::token(OLD_KEY, "alice", 3600);
    let (manager, store) = common::manager(
        &server,
        MemoryCredentialStore::with_credentials(Credentials::new("alice", &t1, "R1")),
    );

    let claims = manager.verify_token().await.unwrap();
    assert_eq!(claims.sub.as_deref(), Some("alice"));

    let stored = store.credentials().unwrap();
    assert_eq!(stored.access_token, t2);
    assert_eq!(stored.refresh_token, "R2");
}

#[tokio::test]
async fn test_empty_key_set() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/jwk"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "keys": [] })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/token"))
        .respond_with(common::token_response("unused", "unused"))
        .expect(0)
        .mount(&server)
        .await;

    let valid = common::token(OLD_KEY, "alice", 3600);
    let (manager, _store) = common::manager(
        &server,
        MemoryCredentialStore::with_credentials(Credentials::new("alice", &valid, "R1")),
    );
    assert!(matches!(manager.verify_token().await, Err(Error::NoSigningKeys)));
}

#[tokio::test]
async fn test_verify_without_login_sends_nothing() {
    let server = MockServer::start().await;
    let (manager, _store) = common::manager(&server, MemoryCredentialStore::new());

    assert!(matches!(manager.verify_token().await, Err(Error::NotAuthenticated)));
    assert!(matches!(manager.get_token().await, Err(Error::NotAuthenticated)));
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_successive_logins_replace_pair() {
    let server = MockServer::start().await;
    common::mount_jwks(&server, OLD_KEY).await;

    let alice = common::token(OLD_KEY, "alice", 3600);
    let bob = common::token(OLD_KEY, "bob", 3600);
    Mock::given(method("POST"))
        .and(path("/auth/token"))
        .and(body_string_contains("username=alice"))
        .respond_with(common::token_response(&alice, "RA"))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/token"))
        .and(body_string_contains("username=bob"))
        .respond_with(common::token_response(&bob, "RB"))
        .mount(&server)
        .await;

    let (manager, store) = common::manager(&server, MemoryCredentialStore::new());
    manager.login("alice", "pw").await.unwrap();
    manager.login("bob", "pw").await.unwrap();

    let stored = store.credentials().unwrap();
    assert_eq!(stored.identity, "bob");
    assert_eq!(stored.access_token, bob);
    assert_eq!(stored.refresh_token, "RB");

    let claims = manager.verify_token().await.unwrap();
    assert_eq!(claims.sub.as_deref(), Some("bob"));
}

#[tokio::test]
async fn test_refresh_keeps_identity() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("refresh_token=R1"))
        .respond_with(common::token_response("T2", "R2"))
        .expect(1)
        .mount(&server)
        .await;

    let (manager, store) = common::manager(
        &server,
        MemoryCredentialStore::with_credentials(Credentials::new("carol", "T1", "R1")),
    );
    manager.refresh().await.unwrap();

    let stored = store.credentials().unwrap();
    assert_eq!(stored.identity, "carol");
    assert_eq!(stored.access_token, "T2");
    assert_eq!(stored.refresh_token, "R2");
}

#[tokio::test]
async fn test_concurrent_verifications_share_one_renewal() {
    let server = MockServer::start().await;
    common::mount_jwks(&server, OLD_KEY).await;

    let renewed = common::token(OLD_KEY, "alice", 3600);
    Mock::given(method("POST"))
        .and(path("/auth/token"))
        .respond_with(common::token_response(&renewed, "R2"))
        .expect(1)
        .mount(&server)
        .await;

    let expired = common::token(OLD_KEY, "alice", -3600);
    let (manager, _store) = common::manager(
        &server,
        MemoryCredentialStore::with_credentials(Credentials::new("alice", &expired, "R1")),
    );

    let (first, second) = tokio::join!(manager.verify_token(), manager.verify_token());
    assert!(first.is_ok());
    assert!(second.is_ok());
}

#[tokio::test]
async fn test_register_uses_client_credentials() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/users"))
        .and(header("authorization", "Basic Y2xpOnMzY3JldA=="))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "data": { "id": 1, "username": "alice" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (manager, store) = common::manager(&server, MemoryCredentialStore::new());
    let created = manager
        .register(json!({ "username": "alice", "password": "pw" }))
        .await
        .unwrap();

    assert_eq!(created, json!({ "id": 1, "username": "alice" }));
    // Registration does not log in.
    assert!(!store.is_logged_in());
}

#[tokio::test]
async fn test_register_conflict() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/users"))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "error": { "message": "User already exists", "code": "EEXIST" }
        })))
        .mount(&server)
        .await;

    let (manager, _store) = common::manager(&server, MemoryCredentialStore::new());
    let err = manager.register(json!({ "username": "alice" })).await.unwrap_err();

    assert!(matches!(err, Error::Auth(_)));
    let api = err.api_error().unwrap();
    assert_eq!(api.message, "User already exists");
    assert_eq!(api.code.as_deref(), Some("EEXIST"));
    assert_eq!(api.http_status, Some(409));
}

#[tokio::test]
async fn test_logout_then_status() {
    let server = MockServer::start().await;
    let (manager, _store) = common::manager(
        &server,
        MemoryCredentialStore::with_credentials(Credentials::new("alice", "T1", "R1")),
    );

    assert_eq!(manager.status().unwrap().identity.as_deref(), Some("alice"));
    manager.logout().unwrap();

    let status = manager.status().unwrap();
    assert!(!status.logged_in);
    assert!(matches!(manager.refresh().await, Err(Error::NotAuthenticated)));
}
