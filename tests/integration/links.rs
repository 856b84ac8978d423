//! Link API: create, list, redirect.

use crate::helpers::*;
use golinks::store::Link;
use reqwest::StatusCode;

/// Created link redirects permanently to its URL
#[tokio::test]
async fn test_create_then_redirect() {
    let server = TestServer::start().await;

    let resp = server
        .post_authed("/links", r#"{"Key":"a","Url":"http://x"}"#)
        .await;
    assert_status(&resp, StatusCode::OK);
    assert_envelope(&resp);
    assert_body(resp, "{}").await;

    let resp = server.get("/go?key=a").await;
    assert_status(&resp, StatusCode::MOVED_PERMANENTLY);
    assert_header(&resp, "location", "http://x");
    assert_envelope(&resp);
}

/// Lowercase field names are accepted on create
#[tokio::test]
async fn test_create_with_lowercase_fields() {
    let server = TestServer::start().await;

    let resp = server
        .post_authed("/links", r#"{"key":"lc","url":"http://lower"}"#)
        .await;
    assert_status(&resp, StatusCode::OK);
    assert_body(resp, "{}").await;

    let resp = server.get("/go?key=lc").await;
    assert_status(&resp, StatusCode::MOVED_PERMANENTLY);
    assert_header(&resp, "location", "http://lower");
}

/// Redirects are stable across repeated lookups
#[tokio::test]
async fn test_repeated_redirect() {
    let server = TestServer::start().await;
    server.create_link("docs", "https://example.com/docs").await;

    for _ in 0..3 {
        let resp = server.get("/go?key=docs").await;
        assert_status(&resp, StatusCode::MOVED_PERMANENTLY);
        assert_header(&resp, "location", "https://example.com/docs");
    }
}

#[tokio::test]
async fn test_go_missing_and_empty_key() {
    let server = TestServer::start().await;

    let resp = server.get("/go?key=nope").await;
    assert_status(&resp, StatusCode::NOT_FOUND);
    assert_body(resp, r#"{"httpError":"Not found"}"#).await;

    let resp = server.get("/go?key=").await;
    assert_status(&resp, StatusCode::NOT_FOUND);
    assert_body(resp, r#"{"httpError":"requires key"}"#).await;
}

#[tokio::test]
async fn test_list_links() {
    let server = TestServer::start().await;

    let resp = server.get("/links").await;
    assert_status(&resp, StatusCode::OK);
    assert_body(resp, "[]").await;

    server.create_link("a", "http://a").await;
    server.create_link("b", "http://b").await;

    let links: Vec<Link> = server.get("/links").await.json().await.unwrap();
    assert_eq!(
        links,
        vec![Link::new("a", "http://a"), Link::new("b", "http://b")]
    );
}

/// Wrong credentials are rejected and nothing is stored
#[tokio::test]
async fn test_wrong_credentials() {
    let server = TestServer::start().await;

    let resp = server
        .post_as("/links", USERNAME, "guess", r#"{"Key":"a","Url":"http://x"}"#)
        .await;
    assert_status(&resp, StatusCode::FORBIDDEN);
    assert_body(resp, r#"{"httpError":"Wrong credentials"}"#).await;

    let resp = server.get("/go?key=a").await;
    assert_status(&resp, StatusCode::NOT_FOUND);
    assert!(server.store.list(None, 0).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_missing_credentials() {
    let server = TestServer::start().await;

    let resp = server
        .client
        .post(server.url("/links"))
        .body(r#"{"Key":"a","Url":"http://x"}"#)
        .send()
        .await
        .unwrap();
    assert_status(&resp, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_malformed_json() {
    let server = TestServer::start().await;
    let resp = server.post_authed("/links", "{not json").await;
    assert_status(&resp, StatusCode::BAD_REQUEST);
    assert_body(resp, r#"{"httpError":"Invalid parameters"}"#).await;
}

/// With debug on, the raw request body is echoed on 400
#[tokio::test]
async fn test_malformed_json_echoed_in_debug() {
    let server = TestServer::start_debug().await;
    let resp = server.post_authed("/links", "{not json").await;
    assert_status(&resp, StatusCode::BAD_REQUEST);
    assert_envelope(&resp);
    assert_body(resp, "{not json").await;
}

#[tokio::test]
async fn test_duplicate_key_is_invalid() {
    let server = TestServer::start().await;
    server.create_link("a", "http://x").await;

    let resp = server
        .post_authed("/links", r#"{"Key":"a","Url":"http://y"}"#)
        .await;
    assert_status(&resp, StatusCode::BAD_REQUEST);

    let resp = server.get("/go?key=a").await;
    assert_header(&resp, "location", "http://x");
}
