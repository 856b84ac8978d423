//! Full stack over a migrated SQLite file.

use std::sync::Arc;

use crate::helpers::*;
use golinks::migration::Migrator;
use golinks::store::SqliteStore;
use reqwest::StatusCode;

fn migrations_dir() -> std::path::PathBuf {
    std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("migrations")
}

fn open(path: &std::path::Path) -> rusqlite::Connection {
    rusqlite::Connection::open(path).unwrap()
}

#[tokio::test]
async fn test_links_survive_restart() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("golinks.db");

    let mut migrator = Migrator::new(migrations_dir(), open(&db)).unwrap();
    assert_eq!(migrator.up().unwrap(), 1);

    let server = TestServer::start_with(Arc::new(SqliteStore::new(open(&db))), false).await;
    server.create_link("wiki", "https://wiki.example.com").await;
    server.stop().await;

    let server = TestServer::start_with(Arc::new(SqliteStore::new(open(&db))), false).await;
    let resp = server.get("/go?key=wiki").await;
    assert_status(&resp, StatusCode::MOVED_PERMANENTLY);
    assert_header(&resp, "location", "https://wiki.example.com");
}

/// Store failures surface as 500 without leaking the cause
#[tokio::test]
async fn test_unmigrated_database() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("empty.db");

    let server = TestServer::start_with(Arc::new(SqliteStore::new(open(&db))), false).await;

    let resp = server.get("/go?key=a").await;
    assert_status(&resp, StatusCode::INTERNAL_SERVER_ERROR);
    assert_body(resp, r#"{"httpError":"Failed to open database."}"#).await;

    let resp = server.get("/links").await;
    assert_status(&resp, StatusCode::INTERNAL_SERVER_ERROR);
}
