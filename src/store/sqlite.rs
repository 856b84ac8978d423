//! SQLite-backed link store.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension};

use super::{Link, LinkStore, StoreError};

/// Link store over a single SQLite connection.
///
/// Queries run on the blocking pool; the connection is serialized behind a
/// mutex.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Wrap an open connection. The `links` table must already exist.
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    async fn with_conn<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, StoreError> + Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            // Poisoned only if another query panicked.
            let guard = conn.lock().unwrap_or_else(|e| e.into_inner());
            f(&guard)
        })
        .await?
    }
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore").finish_non_exhaustive()
    }
}

#[async_trait]
impl LinkStore for SqliteStore {
    async fn find(&self, key: &str) -> Result<Option<Link>, StoreError> {
        let key = key.to_string();
        self.with_conn(move |conn| {
            let link = conn
                .query_row(
                    "SELECT key, url FROM links WHERE key = ?1",
                    params![key],
                    |row| {
                        Ok(Link {
                            key: row.get(0)?,
                            url: row.get(1)?,
                        })
                    },
                )
                .optional()?;
            Ok(link)
        })
        .await
    }

    async fn list(&self, limit: Option<usize>, offset: usize) -> Result<Vec<Link>, StoreError> {
        // SQLite treats a negative LIMIT as "no limit".
        let limit = limit.map(|n| n as i64).unwrap_or(-1);
        let offset = offset as i64;
        self.with_conn(move |conn| {
            let mut stmt =
                conn.prepare("SELECT key, url FROM links ORDER BY rowid LIMIT ?1 OFFSET ?2")?;
            let rows = stmt.query_map(params![limit, offset], |row| {
                Ok(Link {
                    key: row.get(0)?,
                    url: row.get(1)?,
                })
            })?;
            let links = rows.collect::<Result<Vec<_>, _>>()?;
            Ok(links)
        })
        .await
    }

    async fn insert(&self, link: Link) -> Result<(), StoreError> {
        self.with_conn(move |conn| {
            match conn.execute(
                "INSERT INTO links (key, url) VALUES (?1, ?2)",
                params![link.key, link.url],
            ) {
                Ok(_) => Ok(()),
                Err(rusqlite::Error::SqliteFailure(e, _))
                    if e.code == ErrorCode::ConstraintViolation =>
                {
                    Err(StoreError::Duplicate(link.key))
                }
                Err(e) => Err(e.into()),
            }
        })
        .await
    }
}
