//! Dispatch behavior shared by every route: methods, fallback, limits, ids.

use crate::helpers::*;
use reqwest::StatusCode;

#[tokio::test]
async fn test_unregistered_path() {
    let server = TestServer::start().await;

    for path in ["/", "/nowhere", "/links/extra"] {
        let resp = server.get(path).await;
        assert_status(&resp, StatusCode::NOT_FOUND);
        assert_envelope(&resp);
        assert_body(resp, r#"{"httpError":"Page not found"}"#).await;
    }
}

#[tokio::test]
async fn test_method_not_allowed() {
    let server = TestServer::start().await;

    let resp = server.client.delete(server.url("/links")).send().await.unwrap();
    assert_status(&resp, StatusCode::METHOD_NOT_ALLOWED);
    assert_body(resp, r#"{"httpError":"Method not allowed."}"#).await;

    let resp = server.post_authed("/go?key=a", "").await;
    assert_status(&resp, StatusCode::METHOD_NOT_ALLOWED);
}

/// Method is checked before credentials
#[tokio::test]
async fn test_method_checked_before_auth() {
    let server = TestServer::start().await;
    let resp = server.client.put(server.url("/links")).send().await.unwrap();
    assert_status(&resp, StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_request_id() {
    let server = TestServer::start().await;

    let resp = server
        .client
        .get(server.url("/links"))
        .header("x-request-id", "trace-123")
        .send()
        .await
        .unwrap();
    assert_header(&resp, "x-request-id", "trace-123");

    let resp = server.get("/links").await;
    let id = resp.headers().get("x-request-id").expect("generated id");
    assert!(!id.is_empty());
}

#[tokio::test]
async fn test_body_too_large() {
    let server = TestServer::start().await;
    let big = format!(r#"{{"Key":"a","Url":"http://{}"}}"#, "x".repeat(4096));

    let resp = server.post_authed("/links", &big).await;
    assert_status(&resp, StatusCode::PAYLOAD_TOO_LARGE);
    assert_envelope(&resp);
    assert!(resp.headers().get("x-request-id").is_some());
    assert!(server.store.list(None, 0).await.unwrap().is_empty());
}

/// Shutdown drains and cancels the application context
#[tokio::test]
async fn test_graceful_shutdown() {
    let server = TestServer::start().await;
    let resp = server.get("/links").await;
    assert_status(&resp, StatusCode::OK);

    let context = server.context.clone();
    let url = server.url("/links");
    server.stop().await;

    assert!(context.is_cancelled());
    assert!(reqwest::get(url).await.is_err());
}
