//! On-disk token cache in spotipy's JSON format.
//!
//! The bot shares its cache file with spotipy tooling (the authorization
//! flow that first produces the refresh token is run there), so the layout
//! must stay byte-compatible:
//!
//! ```json
//! {"access_token": "...", "token_type": "Bearer", "expires_in": 3600,
//!  "scope": "user-modify-playback-state ...", "expires_at": 1700000000,
//!  "refresh_token": "..."}
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::spotify::auth::{Credential, CredentialStore};
use crate::utils::now_unix_secs;

/// Errors reading or writing the token cache.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("token cache I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("token cache is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Serialize, Deserialize)]
struct CachedToken {
    access_token: String,
    #[serde(default = "default_token_type")]
    token_type: String,
    #[serde(default)]
    expires_in: i64,
    #[serde(default)]
    scope: Option<String>,
    #[serde(default)]
    expires_at: i64,
    #[serde(default)]
    refresh_token: Option<String>,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

impl From<CachedToken> for Credential {
    fn from(token: CachedToken) -> Self {
        Self {
            access_token: token.access_token,
            token_type: token.token_type,
            refresh_token: token.refresh_token,
            scope: token.scope,
            expires_at: token.expires_at,
        }
    }
}

impl CachedToken {
    fn from_credential(credential: &Credential, now: i64) -> Self {
        Self {
            access_token: credential.access_token.clone(),
            token_type: credential.token_type.clone(),
            expires_in: (credential.expires_at - now).max(0),
            scope: credential.scope.clone(),
            expires_at: credential.expires_at,
            refresh_token: credential.refresh_token.clone(),
        }
    }
}

/// spotipy-compatible token cache file.
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the cached credential.
    ///
    /// # Errors
    /// Returns `CacheError` if the file is missing or not a spotipy cache.
    pub fn load(&self) -> Result<Credential, CacheError> {
        let contents = std::fs::read_to_string(&self.path)?;
        let token: CachedToken = serde_json::from_str(&contents)?;
        log::debug!(
            "[Cache] Loaded token from {} (expires_at={})",
            self.path.display(),
            token.expires_at
        );
        Ok(token.into())
    }
}

impl CredentialStore for FileCredentialStore {
    /// Writes through a sibling temp file and renames it over the cache, so
    /// a crash mid-write never leaves a truncated cache behind.
    fn save(&self, credential: &Credential) -> Result<(), CacheError> {
        let token = CachedToken::from_credential(credential, now_unix_secs());
        let json = serde_json::to_string(&token)?;

        let tmp_path = self.path.with_extension("tmp");
        std::fs::write(&tmp_path, json)?;
        std::fs::rename(&tmp_path, &self.path)?;

        log::debug!("[Cache] Saved token to {}", self.path.display());
        Ok(())
    }
}
