//! Link storage.
//!
//! Route logic talks to storage through [`LinkStore`]; the server wires in a
//! [`SqliteStore`], tests usually use [`MemoryStore`].

mod memory;
mod sqlite;

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// A short key and the URL it redirects to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    #[serde(rename = "Key")]
    pub key: String,
    #[serde(rename = "Url")]
    pub url: String,
}

impl Link {
    pub fn new(key: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            url: url.into(),
        }
    }
}

/// Storage failure.
#[derive(Debug)]
pub enum StoreError {
    /// A link with this key already exists.
    Duplicate(String),
    /// The database rejected the operation.
    Database(rusqlite::Error),
    /// The blocking worker running the query failed.
    Task(tokio::task::JoinError),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Duplicate(key) => write!(f, "link '{}' already exists", key),
            StoreError::Database(e) => write!(f, "database error: {}", e),
            StoreError::Task(e) => write!(f, "database task failed: {}", e),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::Duplicate(_) => None,
            StoreError::Database(e) => Some(e),
            StoreError::Task(e) => Some(e),
        }
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::Database(e)
    }
}

impl From<tokio::task::JoinError> for StoreError {
    fn from(e: tokio::task::JoinError) -> Self {
        StoreError::Task(e)
    }
}

/// Link persistence used by route logic.
#[async_trait]
pub trait LinkStore: Send + Sync {
    /// Look up a link by key.
    async fn find(&self, key: &str) -> Result<Option<Link>, StoreError>;

    /// List links in insertion order. `None` means no limit.
    async fn list(&self, limit: Option<usize>, offset: usize) -> Result<Vec<Link>, StoreError>;

    /// Store a new link. Fails with [`StoreError::Duplicate`] if the key exists.
    async fn insert(&self, link: Link) -> Result<(), StoreError>;
}
