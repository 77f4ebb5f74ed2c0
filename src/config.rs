//! Client configuration.
//!
//! An `AuthConfig` names the server base address, the credential kind the
//! deployment uses, and where (if anywhere) the session record and bearer
//! token are persisted. Nothing here talks to the network.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default request timeout (seconds).
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Which credential kind the deployment uses.
///
/// A given server issues exactly one of the two; the request client
/// supports both shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CredentialMode {
    /// Server sets a session cookie on verify; the HTTP client keeps a
    /// cookie jar and replays it automatically.
    Cookie,
    /// Server issues a bearer token; a fresh `Authorization` header is
    /// derived from [`crate::CredentialProvider`] on every call.
    Bearer,
}

/// Connection and storage configuration for the auth client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Server base address including any path prefix
    /// (e.g. `http://localhost:8080/api`).
    pub base_url: String,
    /// Credential kind the deployment uses.
    pub credential_mode: CredentialMode,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// File holding the serialized session record. `None` keeps the
    /// session in memory only.
    pub session_path: Option<PathBuf>,
    /// File holding the raw bearer token. `None` keeps it in memory only.
    pub token_path: Option<PathBuf>,
}

impl AuthConfig {
    /// Configuration for a cookie-session server at `base_url`, without
    /// durable storage.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            credential_mode: CredentialMode::Cookie,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            session_path: None,
            token_path: None,
        }
    }

    /// Switch the credential kind.
    pub fn credential_mode(mut self, mode: CredentialMode) -> Self {
        self.credential_mode = mode;
        self
    }

    /// Fill unset storage paths with the per-user data directory
    /// (`session.json` and `token` under the authflow data dir).
    pub fn with_default_paths(mut self) -> Self {
        if let Some(dir) = default_data_dir() {
            self.session_path
                .get_or_insert_with(|| dir.join("session.json"));
            self.token_path.get_or_insert_with(|| dir.join("token"));
        }
        self
    }

    /// Load from environment variables.
    ///
    /// `AUTHFLOW_BASE_URL` is required; `AUTHFLOW_CREDENTIAL_MODE`
    /// (`cookie` | `bearer`), `AUTHFLOW_SESSION_FILE` and
    /// `AUTHFLOW_TOKEN_FILE` are optional.
    pub fn from_env() -> Option<Self> {
        let base_url = std::env::var("AUTHFLOW_BASE_URL").ok()?;
        if base_url.is_empty() {
            return None;
        }

        let credential_mode = match std::env::var("AUTHFLOW_CREDENTIAL_MODE").ok().as_deref() {
            Some("bearer") => CredentialMode::Bearer,
            _ => CredentialMode::Cookie,
        };

        Some(Self {
            base_url,
            credential_mode,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            session_path: std::env::var("AUTHFLOW_SESSION_FILE").ok().map(PathBuf::from),
            token_path: std::env::var("AUTHFLOW_TOKEN_FILE").ok().map(PathBuf::from),
        })
    }
}

/// Per-user data directory for default storage paths.
fn default_data_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("com", "zeroclaw-labs", "authflow")
        .map(|dirs| dirs.data_dir().to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_defaults_to_cookie_mode_without_storage() {
        let config = AuthConfig::new("http://localhost:8080/api");
        assert_eq!(config.credential_mode, CredentialMode::Cookie);
        assert!(config.session_path.is_none());
        assert!(config.token_path.is_none());
        assert_eq!(config.timeout_secs, DEFAULT_TIMEOUT_SECS);
    }

    #[test]
    fn with_default_paths_keeps_explicit_paths() {
        let config = AuthConfig {
            session_path: Some(PathBuf::from("/tmp/custom-session.json")),
            ..AuthConfig::new("http://localhost:8080/api")
        }
        .with_default_paths();

        assert_eq!(
            config.session_path.as_deref(),
            Some(std::path::Path::new("/tmp/custom-session.json"))
        );
    }

    #[test]
    fn from_env_reads_base_url_and_mode() {
        std::env::set_var("AUTHFLOW_BASE_URL", "http://localhost:9999/api");
        std::env::set_var("AUTHFLOW_CREDENTIAL_MODE", "bearer");

        let config = AuthConfig::from_env().unwrap();
        assert_eq!(config.base_url, "http://localhost:9999/api");
        assert_eq!(config.credential_mode, CredentialMode::Bearer);

        std::env::remove_var("AUTHFLOW_BASE_URL");
        std::env::remove_var("AUTHFLOW_CREDENTIAL_MODE");
    }
}
