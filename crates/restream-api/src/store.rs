//! File-backed persistence for the access/refresh token pair.

use std::fs;
use std::io;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::TokenStoreError;

/// An access/refresh token pair.
///
/// Replaced wholesale on every successful refresh, never mutated in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    /// Bearer credential attached to API requests.
    pub access_token: String,

    /// Credential presented to the refresh endpoint.
    pub refresh_token: String,
}

/// Stores the token pair as a two-field JSON file.
#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    /// Create a store backed by the given file path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Load the persisted pair.
    pub fn load(&self) -> Result<TokenPair, TokenStoreError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(TokenStoreError::NotFound)
            }
            Err(e) => return Err(TokenStoreError::Io(e)),
        };

        let pair: TokenPair =
            serde_json::from_str(&raw).map_err(|e| TokenStoreError::Corrupt(e.to_string()))?;
        if pair.access_token.is_empty() || pair.refresh_token.is_empty() {
            return Err(TokenStoreError::Corrupt("empty token field".to_string()));
        }

        Ok(pair)
    }

    /// Overwrite the persisted pair.
    ///
    /// Writes to a sibling temp file and renames it into place, so a
    /// concurrent `load` never observes a half-written pair.
    pub fn save(&self, pair: &TokenPair) -> Result<(), TokenStoreError> {
        let raw = serde_json::to_string_pretty(pair)
            .map_err(|e| TokenStoreError::Corrupt(e.to_string()))?;

        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, raw)?;
        fs::rename(&tmp, &self.path)?;

        debug!(path = %self.path.display(), "token pair saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(access: &str, refresh: &str) -> TokenPair {
        TokenPair {
            access_token: access.to_string(),
            refresh_token: refresh.to_string(),
        }
    }

    #[test]
    fn test_save_then_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(dir.path().join("tokens.json"));

        store.save(&pair("a1", "r1")).unwrap();
        assert_eq!(store.load().unwrap(), pair("a1", "r1"));

        // Overwrite replaces the pair wholesale.
        store.save(&pair("a2", "r2")).unwrap();
        assert_eq!(store.load().unwrap(), pair("a2", "r2"));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(dir.path().join("missing.json"));

        assert!(matches!(store.load(), Err(TokenStoreError::NotFound)));
    }

    #[test]
    fn test_load_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tokens.json");
        fs::write(&path, "{not json").unwrap();

        let store = TokenStore::new(&path);
        assert!(matches!(store.load(), Err(TokenStoreError::Corrupt(_))));
    }

    #[test]
    fn test_load_rejects_empty_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tokens.json");
        fs::write(&path, r#"{"access_token":"","refresh_token":"r"}"#).unwrap();

        let store = TokenStore::new(&path);
        assert!(matches!(store.load(), Err(TokenStoreError::Corrupt(_))));
    }

    #[test]
    fn test_save_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tokens.json");
        let store = TokenStore::new(&path);

        store.save(&pair("a", "r")).unwrap();
        assert!(!path.with_extension("tmp").exists());
    }
}
