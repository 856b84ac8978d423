//! Opening the configured database.

use std::fmt;
use std::time::Duration;

use rusqlite::Connection;
use tracing::debug;

use crate::config::{DatabaseConfig, SQLITE3};

/// Failure to open the database.
#[derive(Debug)]
pub enum DatabaseError {
    /// The configured driver is not available in this build.
    UnsupportedDriver(String),
    /// The driver failed to open the data source.
    Open {
        data_source: String,
        error: rusqlite::Error,
    },
}

impl fmt::Display for DatabaseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatabaseError::UnsupportedDriver(driver) => {
                write!(f, "unsupported database driver '{}'", driver)
            }
            DatabaseError::Open { data_source, error } => {
                write!(f, "failed to open '{}': {}", data_source, error)
            }
        }
    }
}

impl std::error::Error for DatabaseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DatabaseError::UnsupportedDriver(_) => None,
            DatabaseError::Open { error, .. } => Some(error),
        }
    }
}

/// Open a connection using the configured driver and data source.
///
/// SQLite has no pool, so `maxOpenConnections` / `maxIdleConnections` are
/// not applied; `connectionLifeTime` becomes the busy timeout.
pub fn open(config: &DatabaseConfig) -> Result<Connection, DatabaseError> {
    if config.driver != SQLITE3 {
        return Err(DatabaseError::UnsupportedDriver(config.driver.clone()));
    }

    let data_source = config.data_source();
    let open_err = |error| DatabaseError::Open {
        data_source: data_source.clone(),
        error,
    };

    let conn = Connection::open(&data_source).map_err(open_err)?;
    if config.connection_lifetime > 0 {
        conn.busy_timeout(Duration::from_secs(config.connection_lifetime))
            .map_err(open_err)?;
    }

    debug!(driver = %config.driver, data_source = %data_source, "database opened");
    Ok(conn)
}
