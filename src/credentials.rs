//! Bearer-token holder for token-based deployments.
//!
//! The request client reads this — never writes it — on every outgoing
//! call, so a token rotated between calls takes effect immediately.
//! Cookie-based deployments simply never write a token here.

use parking_lot::Mutex;
use std::path::{Path, PathBuf};

/// Holder for the current bearer token, optionally mirrored to a file.
pub struct CredentialProvider {
    token: Mutex<Option<String>>,
    path: Option<PathBuf>,
}

impl CredentialProvider {
    /// In-memory provider with no stored token.
    pub fn new() -> Self {
        Self {
            token: Mutex::new(None),
            path: None,
        }
    }

    /// File-backed provider; a readable non-empty file seeds the token.
    pub fn open(path: &Path) -> Self {
        let token = std::fs::read_to_string(path)
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        Self {
            token: Mutex::new(token),
            path: Some(path.to_path_buf()),
        }
    }

    /// The current token, reflecting the most recent write.
    pub fn read(&self) -> Option<String> {
        self.token.lock().clone()
    }

    /// Replace the token. The durable copy is best-effort.
    pub fn write(&self, token: impl Into<String>) {
        let token = token.into();
        *self.token.lock() = Some(token.clone());

        if let Some(path) = &self.path {
            if let Err(e) = write_token(path, &token) {
                tracing::warn!(path = %path.display(), error = %e, "token persistence failed; continuing in memory");
            }
        }
    }

    /// Drop the token and erase the durable copy.
    pub fn clear(&self) {
        *self.token.lock() = None;

        if let Some(path) = &self.path {
            if let Err(e) = std::fs::remove_file(path) {
                if e.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!(path = %path.display(), error = %e, "token erase failed");
                }
            }
        }
    }
}

impl Default for CredentialProvider {
    fn default() -> Self {
        Self::new()
    }
}

fn write_token(path: &Path, token: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, token)
}
