//! Logging section.

use std::path::PathBuf;

use serde::Deserialize;

use super::parse::env_opt;

const DEFAULT_FILTER: &str = "golinks=info,access=info";

/// Output format of the log subscriber.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable `tracing-subscriber` fmt output.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

/// Logging configuration.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingConfig {
    /// Log level or full filter directive from the config file.
    pub level: Option<String>,
    pub format: LogFormat,
    /// Service name for structured logging.
    pub service_name: String,
    /// Directory for `golinks.<env>.log`. Logs go to stdout when unset.
    pub dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: None,
            format: LogFormat::Text,
            service_name: "golinks".to_string(),
            dir: None,
        }
    }
}

impl LoggingConfig {
    /// Resolve the effective filter from the environment and this section.
    ///
    /// Priority: LOG_LEVEL > RUST_LOG > config `level` > default (info)
    ///
    /// Simple levels apply to both the crate and the `access` target.
    pub fn filter(&self) -> String {
        resolve_filter(
            env_opt("LOG_LEVEL").as_deref(),
            env_opt("RUST_LOG").as_deref(),
            self.level.as_deref(),
        )
    }

    /// Log file for environment `env`, if a directory is configured.
    pub fn file_path(&self, env: &str) -> Option<PathBuf> {
        let env = if env.is_empty() { "default" } else { env };
        self.dir
            .as_ref()
            .map(|dir| dir.join(format!("{}.{}.log", self.service_name, env)))
    }
}

/// LOG_LEVEL and the config `level` accept simple levels or full filter
/// syntax; RUST_LOG is taken as-is.
fn resolve_filter(log_level: Option<&str>, rust_log: Option<&str>, configured: Option<&str>) -> String {
    if let Some(level) = log_level {
        match simple_level(level) {
            Some(filter) => return filter,
            None => eprintln!(
                "Warning: Invalid LOG_LEVEL '{}', expected: trace, debug, info, warn, error",
                level
            ),
        }
    }

    if let Some(filter) = rust_log {
        return filter.to_string();
    }

    if let Some(level) = configured {
        return simple_level(level).unwrap_or_else(|| level.to_string());
    }

    DEFAULT_FILTER.to_string()
}

fn simple_level(level: &str) -> Option<String> {
    let level = level.to_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Some(format!("golinks={0},access={0}", level)),
        _ => None,
    }
}
