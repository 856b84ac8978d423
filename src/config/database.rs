//! Database section and data-source assembly.

use std::collections::BTreeMap;

use serde::Deserialize;

/// Driver name for SQLite.
pub const SQLITE3: &str = "sqlite3";

/// Database connection settings.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseConfig {
    pub driver: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    /// Server host, or the database file path for sqlite3.
    #[serde(default)]
    pub hostname: String,
    #[serde(default)]
    pub port: String,
    #[serde(default)]
    pub database_name: String,
    #[serde(default)]
    pub max_open_connections: u32,
    #[serde(default)]
    pub max_idle_connections: u32,
    /// Connection lifetime in seconds (0 = unlimited).
    #[serde(default, rename = "connectionLifeTime")]
    pub connection_lifetime: u64,
    #[serde(default)]
    pub engine_options: BTreeMap<String, String>,
}

impl DatabaseConfig {
    /// Data source string handed to the driver.
    ///
    /// Server drivers get `user:pass@host:port/name?k=v&...`; sqlite3 only
    /// uses the host part, which is the file path.
    pub fn data_source(&self) -> String {
        let mut url = String::new();
        if !self.username.is_empty() || !self.password.is_empty() {
            url.push_str(&self.username);
            url.push(':');
            url.push_str(&self.password);
            url.push('@');
        }
        url.push_str(&self.hostname);
        if !self.port.is_empty() {
            url.push(':');
            url.push_str(&self.port);
        }
        if self.driver != SQLITE3 {
            url.push('/');
            url.push_str(&self.database_name);
            if !self.engine_options.is_empty() {
                let pairs: Vec<String> = self
                    .engine_options
                    .iter()
                    .map(|(k, v)| format!("{}={}", k, v))
                    .collect();
                url.push('?');
                url.push_str(&pairs.join("&"));
            }
        }
        url
    }

    #[inline]
    pub fn is_sqlite(&self) -> bool {
        self.driver == SQLITE3
    }
}
