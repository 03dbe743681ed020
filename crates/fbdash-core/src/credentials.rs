//! Session token storage and retrieval.
//!
//! Persists the session token in `<base>/auth.json` with restricted
//! permissions (0600). The token is never logged or displayed in full.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::config::paths;

/// On-disk shape of the credential file.
///
/// At most one token is stored at a time; saving overwrites, never appends.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
struct AuthFile {
    #[serde(skip_serializing_if = "Option::is_none")]
    token: Option<String>,
}

/// Durable store for the single opaque session token.
///
/// Only the session manager writes through this store; views read identity
/// from the session manager, never the token itself.
#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    /// Creates a store at the default location (`${FBDASH_HOME}/auth.json`).
    pub fn new() -> Self {
        Self::at(paths::auth_path())
    }

    /// Creates a store at an explicit path.
    pub fn at(path: PathBuf) -> Self {
        Self { path }
    }

    /// Returns the path of the credential file.
    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    /// Loads the stored token, if any.
    ///
    /// Returns `None` if the file doesn't exist or holds no token.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(&self) -> Result<Option<String>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read credentials from {}", self.path.display()))?;

        let file: AuthFile = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse credentials from {}", self.path.display()))?;

        Ok(file.token.filter(|t| !t.is_empty()))
    }

    /// Persists a token, replacing any previous one.
    ///
    /// # Errors
    /// Returns an error if the file cannot be written.
    pub fn save(&self, token: &str) -> Result<()> {
        self.write_file(&AuthFile {
            token: Some(token.to_string()),
        })
    }

    /// Removes the stored token. Idempotent.
    ///
    /// Returns true if a token was present. A corrupt file still gets
    /// wiped; clearing must not fail on an unreadable token.
    ///
    /// # Errors
    /// Returns an error if the file cannot be rewritten.
    pub fn clear(&self) -> Result<bool> {
        let had_token = self.load().ok().flatten().is_some();
        if self.path.exists() {
            self.write_file(&AuthFile::default())?;
        }
        Ok(had_token)
    }

    /// Writes the credential file with restricted permissions (0600).
    fn write_file(&self, file: &AuthFile) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        let contents = serde_json::to_string_pretty(file).context("Failed to serialize credentials")?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            let mut out = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .mode(0o600)
                .open(&self.path)
                .with_context(|| format!("Failed to open {} for writing", self.path.display()))?;
            out.write_all(contents.as_bytes())
                .with_context(|| format!("Failed to write to {}", self.path.display()))?;
        }

        #[cfg(not(unix))]
        {
            fs::write(&self.path, contents)
                .with_context(|| format!("Failed to write to {}", self.path.display()))?;
        }

        Ok(())
    }
}

impl Default for TokenStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store() -> (tempfile::TempDir, TokenStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::at(dir.path().join("auth.json"));
        (dir, store)
    }

    /// Test: save then load round-trips the token.
    #[test]
    fn test_save_load_roundtrip() {
        let (_dir, store) = temp_store();

        assert!(store.load().unwrap().is_none());
        store.save("abc123").unwrap();
        assert_eq!(store.load().unwrap().as_deref(), Some("abc123"));
    }

    /// Test: saving overwrites the previous token.
    #[test]
    fn test_save_overwrites() {
        let (_dir, store) = temp_store();

        store.save("first").unwrap();
        store.save("second").unwrap();
        assert_eq!(store.load().unwrap().as_deref(), Some("second"));
    }

    /// Test: clear removes the token and reports presence.
    #[test]
    fn test_clear_reports_presence() {
        let (_dir, store) = temp_store();

        store.save("abc123").unwrap();
        assert!(store.clear().unwrap());
        assert!(store.load().unwrap().is_none());

        // Idempotent
        assert!(!store.clear().unwrap());
    }

    /// Test: the credential file has 0600 permissions on Unix.
    #[cfg(unix)]
    #[test]
    fn test_file_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let (_dir, store) = temp_store();
        store.save("abc123").unwrap();

        let mode = fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
