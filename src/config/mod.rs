//! Configuration module for golinks.
//!
//! Configuration is read from a YAML file (one file per environment, the
//! file stem becomes [`Config::env`]) and then adjusted by a small set of
//! environment overrides.
//!
//! # Example
//!
//! ```rust,ignore
//! use golinks::config::Config;
//!
//! let config = Config::load("settings/development.yml")?;
//! println!("Listen address: {}", config.server.listen_addr);
//! println!("Database: {}", config.database.data_source());
//! ```

mod application;
mod database;
mod error;
mod logging;
mod parse;
mod server;

use std::path::Path;

use serde::Deserialize;

pub use application::ApplicationConfig;
pub use database::{DatabaseConfig, SQLITE3};
pub use error::ConfigError;
pub use logging::{LogFormat, LoggingConfig};
pub use server::{ServerConfig, DEFAULT_LISTEN_ADDR};

use parse::{env_opt, parse_bool, parse_opt};

/// Complete application configuration.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Environment name (stem of the loaded file).
    #[serde(skip)]
    pub env: String,
    /// Application configuration.
    pub application: ApplicationConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load, override from the environment, and validate.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let display = path.display().to_string();

        let content = std::fs::read_to_string(path).map_err(|error| ConfigError::Io {
            path: display.clone(),
            error,
        })?;

        let mut config = Self::from_yaml(&content).map_err(|error| ConfigError::Yaml {
            path: display,
            error,
        })?;
        config.env = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a YAML document without touching the environment.
    pub fn from_yaml(content: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(content)
    }

    /// Apply environment overrides.
    fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(env_opt)
    }

    /// Apply overrides read through `get`.
    ///
    /// | Variable             | Field                       |
    /// |----------------------|-----------------------------|
    /// | `LISTEN_ADDR`        | `server.listenAddr`         |
    /// | `MAX_BODY_BYTES`     | `server.maxBodyBytes`       |
    /// | `DRAIN_TIMEOUT_SECS` | `server.drainTimeoutSecs`   |
    /// | `DEBUG`              | `application.debug`         |
    /// | `LOG_DIR`            | `logging.dir`               |
    fn apply_overrides<F>(&mut self, get: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(addr) = get("LISTEN_ADDR") {
            self.server.listen_addr = addr;
        }
        if let Some(bytes) = parse_opt("MAX_BODY_BYTES", get("MAX_BODY_BYTES"))? {
            self.server.max_body_bytes = bytes;
        }
        if let Some(secs) = parse_opt("DRAIN_TIMEOUT_SECS", get("DRAIN_TIMEOUT_SECS"))? {
            self.server.drain_timeout_secs = secs;
        }
        if let Some(debug) = get("DEBUG") {
            self.application.debug = parse_bool(&debug);
        }
        if let Some(dir) = get("LOG_DIR") {
            self.logging.dir = Some(dir.into());
        }
        Ok(())
    }

    /// Reject configurations the server cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database.driver.is_empty() {
            return Err(ConfigError::invalid("database.driver", "must not be empty"));
        }
        if !self.database.is_sqlite() {
            return Err(ConfigError::invalid(
                "database.driver",
                format!("unsupported driver '{}'", self.database.driver),
            ));
        }
        if self.application.username.is_empty() || self.application.password.is_empty() {
            return Err(ConfigError::invalid(
                "application.username/password",
                "credentials must not be empty",
            ));
        }
        if self.server.max_body_bytes == 0 {
            return Err(ConfigError::invalid("server.maxBodyBytes", "must be positive"));
        }
        Ok(())
    }

    /// Print configuration summary to log.
    pub fn log_summary(&self) {
        use tracing::info;

        info!("Configuration loaded:");
        info!("  Env: {}", self.env);
        info!("  Listen: {}", self.server.listen_addr);
        info!("  Database: {} ({})", self.database.driver, self.database.data_source());
        info!("  Migrations: {}", self.application.migration_dir.display());
        info!("  Max body: {} bytes", self.server.max_body_bytes);
        info!("  Drain timeout: {}s", self.server.drain_timeout_secs);

        if self.application.debug {
            info!("  Debug: enabled (error bodies echoed)");
        }
    }
}
