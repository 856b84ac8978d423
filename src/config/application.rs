//! Application section: credentials, secret, and behaviour flags.

use std::path::PathBuf;

use serde::Deserialize;

/// Application settings shared by every request.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationConfig {
    /// Application secret.
    #[serde(default)]
    pub secret: String,
    /// Basic auth username for write endpoints.
    pub username: String,
    /// Basic auth password for write endpoints.
    pub password: String,
    /// Debug mode. Enables echoing raw error bodies back to clients.
    #[serde(default)]
    pub debug: bool,
    /// Directory holding `.up.sql` / `.down.sql` revisions.
    #[serde(default = "default_migration_dir")]
    pub migration_dir: PathBuf,
}

fn default_migration_dir() -> PathBuf {
    PathBuf::from("migrations")
}

impl ApplicationConfig {
    /// Check a pair of Basic credentials against the configured ones.
    pub fn credentials_match(&self, username: &str, password: &str) -> bool {
        self.username == username && self.password == password
    }

    /// Whether raw error bodies are written back verbatim.
    #[inline]
    pub fn echo_error_body(&self) -> bool {
        self.debug
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let app: ApplicationConfig =
            serde_yaml::from_str("username: admin\npassword: pw\n").unwrap();
        assert_eq!(app.secret, "");
        assert!(!app.debug);
        assert!(!app.echo_error_body());
        assert_eq!(app.migration_dir, PathBuf::from("migrations"));
    }

    #[test]
    fn test_credentials_match() {
        let app: ApplicationConfig =
            serde_yaml::from_str("username: admin\npassword: pw\ndebug: true\n").unwrap();
        assert!(app.credentials_match("admin", "pw"));
        assert!(!app.credentials_match("admin", "PW"));
        assert!(!app.credentials_match("", ""));
        assert!(app.echo_error_body());
    }
}
