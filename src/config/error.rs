//! Configuration error types.

use std::fmt;

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    Io { path: String, error: std::io::Error },
    /// Configuration file is not valid YAML for the expected schema.
    Yaml {
        path: String,
        error: serde_yaml::Error,
    },
    /// Failed to parse an environment override.
    Parse {
        key: String,
        value: String,
        error: String,
    },
    /// Semantically invalid value.
    Invalid { key: String, message: String },
}

impl ConfigError {
    pub(crate) fn invalid(key: &str, message: impl Into<String>) -> Self {
        ConfigError::Invalid {
            key: key.to_string(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io { path, error } => {
                write!(f, "IO error for '{}': {}", path, error)
            }
            ConfigError::Yaml { path, error } => {
                write!(f, "invalid config file '{}': {}", path, error)
            }
            ConfigError::Parse { key, value, error } => {
                write!(f, "failed to parse {}='{}': {}", key, value, error)
            }
            ConfigError::Invalid { key, message } => {
                write!(f, "invalid value for {}: {}", key, message)
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io { error, .. } => Some(error),
            ConfigError::Yaml { error, .. } => Some(error),
            _ => None,
        }
    }
}
