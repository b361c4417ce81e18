//! Key-set cache behavior: lazy fetch, single-flight, rotation retry.

use std::sync::Arc;
use std::time::Duration;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use mcp_identity::{AuthError, KeyStore};

fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(5))
        .build()
        .unwrap()
}

/// A syntactically valid JWKS document. The modulus is not a real key; key
/// construction succeeds, which is all these tests need.
fn jwks_body(kid: &str) -> String {
    let n = URL_SAFE_NO_PAD.encode([7u8; 256]);
    serde_json::json!({
        "keys": [{
            "kid": kid,
            "kty": "RSA",
            "alg": "RS256",
            "use": "sig",
            "n": n,
            "e": "AQAB"
        }]
    })
    .to_string()
}

#[tokio::test]
async fn cold_cache_concurrent_lookups_fetch_once() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/jwks.json")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(jwks_body("key-1"))
        .expect(1)
        .create_async()
        .await;

    let store = Arc::new(KeyStore::new(http_client(), Duration::from_secs(3600)));
    let uri = format!("{}/jwks.json", server.url());

    let mut handles = Vec::new();
    for _ in 0..8 {
        let store = Arc::clone(&store);
        let uri = uri.clone();
        handles.push(tokio::spawn(
            async move { store.decoding_key(&uri, "key-1").await },
        ));
    }
    for handle in handles {
        assert!(handle.await.unwrap().is_ok());
    }

    mock.assert_async().await;
    assert_eq!(store.cached_uris().await, 1);
}

#[tokio::test]
async fn warm_cache_serves_without_refetch() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/jwks.json")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(jwks_body("key-1"))
        .expect(1)
        .create_async()
        .await;

    let store = KeyStore::new(http_client(), Duration::from_secs(3600));
    let uri = format!("{}/jwks.json", server.url());

    store.decoding_key(&uri, "key-1").await.unwrap();
    store.decoding_key(&uri, "key-1").await.unwrap();

    mock.assert_async().await;
}

#[tokio::test]
async fn unknown_kid_after_rotation_refetches_once_then_fails() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/jwks.json")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(jwks_body("key-1"))
        .expect(2)
        .create_async()
        .await;

    let store = KeyStore::new(http_client(), Duration::from_secs(3600));
    let uri = format!("{}/jwks.json", server.url());

    // Populate the cache, then ask for a key id the issuer never published.
    assert!(store.decoding_key(&uri, "key-1").await.is_ok());
    let err = store
        .decoding_key(&uri, "key-2")
        .await
        .map(|_| ())
        .unwrap_err();

    assert!(matches!(err, AuthError::Unauthorized(_)), "{err:?}");
    mock.assert_async().await;
}

#[tokio::test]
async fn unknown_kid_on_cold_cache_fetches_once() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/jwks.json")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(jwks_body("key-1"))
        .expect(1)
        .create_async()
        .await;

    let store = KeyStore::new(http_client(), Duration::from_secs(3600));
    let uri = format!("{}/jwks.json", server.url());

    let err = store
        .decoding_key(&uri, "missing")
        .await
        .map(|_| ())
        .unwrap_err();
    assert!(matches!(err, AuthError::Unauthorized(_)), "{err:?}");
    mock.assert_async().await;
}

#[tokio::test]
async fn failing_endpoint_is_transient() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/jwks.json")
        .with_status(503)
        .create_async()
        .await;

    let store = KeyStore::new(http_client(), Duration::from_secs(3600));
    let uri = format!("{}/jwks.json", server.url());

    let err = store
        .decoding_key(&uri, "key-1")
        .await
        .map(|_| ())
        .unwrap_err();
    assert!(err.is_transient(), "{err:?}");
}

#[tokio::test]
async fn empty_key_set_is_transient() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/jwks.json")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"keys":[]}"#)
        .create_async()
        .await;

    let store = KeyStore::new(http_client(), Duration::from_secs(3600));
    let uri = format!("{}/jwks.json", server.url());

    let err = store
        .decoding_key(&uri, "key-1")
        .await
        .map(|_| ())
        .unwrap_err();
    assert!(err.is_transient(), "{err:?}");
}
