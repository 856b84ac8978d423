//! Server section.

use std::time::Duration;

use serde::Deserialize;

/// Default listen address when neither the CLI nor the config names one.
pub const DEFAULT_LISTEN_ADDR: &str = "localhost:8080";

/// HTTP listener settings.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerConfig {
    /// Listen address (`host:port`, resolved at bind time).
    pub listen_addr: String,
    /// Graceful shutdown drain timeout in seconds.
    pub drain_timeout_secs: u64,
    /// Maximum accepted request body size.
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: DEFAULT_LISTEN_ADDR.to_string(),
            drain_timeout_secs: 30,
            max_body_bytes: 1024 * 1024,
        }
    }
}

impl ServerConfig {
    #[inline]
    pub fn drain_timeout(&self) -> Duration {
        Duration::from_secs(self.drain_timeout_secs)
    }
}
