//! Local Persisted State
//!
//! Caches the selected UI language and the auth token bundle in a small JSON
//! file. Nothing server-authoritative is stored here.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::models::AuthTokens;
use crate::validation::Language;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("failed to write local store {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to read local store {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to encode local store: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredState {
    #[serde(default)]
    language: Option<Language>,
    #[serde(default)]
    auth: Option<AuthTokens>,
}

/// File-backed store; `in_memory` keeps everything in process
#[derive(Debug)]
pub struct LocalStore {
    path: Option<PathBuf>,
    state: Mutex<StoredState>,
}

impl LocalStore {
    pub fn in_memory() -> Self {
        Self {
            path: None,
            state: Mutex::new(StoredState::default()),
        }
    }

    /// Open (or lazily create) the store at `path`. A corrupt file is
    /// logged and replaced on the next write.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        let state = match std::fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                warn!(path = %path.display(), "Discarding unreadable local store: {e}");
                StoredState::default()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => StoredState::default(),
            Err(source) => return Err(StorageError::Read { path, source }),
        };
        debug!(path = %path.display(), "local store opened");
        Ok(Self {
            path: Some(path),
            state: Mutex::new(state),
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn access_token(&self) -> Option<String> {
        self.lock().auth.as_ref().map(|auth| auth.access_token.clone())
    }

    pub fn auth_tokens(&self) -> Option<AuthTokens> {
        self.lock().auth.clone()
    }

    pub fn set_auth_tokens(&self, tokens: AuthTokens) -> Result<(), StorageError> {
        self.modify(|state| state.auth = Some(tokens))
    }

    pub fn clear_auth(&self) -> Result<(), StorageError> {
        self.modify(|state| state.auth = None)
    }

    /// Selected language, English when nothing was chosen yet
    pub fn language(&self) -> Language {
        self.lock().language.unwrap_or_default()
    }

    pub fn set_language(&self, language: Language) -> Result<(), StorageError> {
        self.modify(|state| state.language = Some(language))
    }

    fn lock(&self) -> MutexGuard<'_, StoredState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply `f` and persist. The in-memory state is only replaced once the
    /// file write succeeded.
    fn modify(&self, f: impl FnOnce(&mut StoredState)) -> Result<(), StorageError> {
        let mut guard = self.lock();
        let mut next = guard.clone();
        f(&mut next);
        if let Some(path) = &self.path {
            write_state(path, &next)?;
        }
        *guard = next;
        Ok(())
    }
}

fn write_state(path: &Path, state: &StoredState) -> Result<(), StorageError> {
    let json = serde_json::to_string_pretty(state)?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| StorageError::Write {
            path: path.to_path_buf(),
            source,
        })?;
    }
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, json)
        .and_then(|_| std::fs::rename(&tmp, path))
        .map_err(|source| StorageError::Write {
            path: path.to_path_buf(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(access: &str) -> AuthTokens {
        AuthTokens {
            access_token: access.to_string(),
            id_token: None,
            refresh_token: None,
            token_type: "Bearer".into(),
            expires_in: Some(3600),
        }
    }

    #[test]
    fn test_round_trip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("store.json");

        let store = LocalStore::open(&path).unwrap();
        assert_eq!(store.access_token(), None);
        assert_eq!(store.language(), Language::English);

        store.set_auth_tokens(tokens("abc")).unwrap();
        store.set_language(Language::Spanish).unwrap();

        let reopened = LocalStore::open(&path).unwrap();
        assert_eq!(reopened.access_token().as_deref(), Some("abc"));
        assert_eq!(reopened.language(), Language::Spanish);

        reopened.clear_auth().unwrap();
        assert!(LocalStore::open(&path).unwrap().auth_tokens().is_none());
    }

    #[test]
    fn test_corrupt_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        std::fs::write(&path, "{not json").unwrap();

        let store = LocalStore::open(&path).unwrap();
        assert!(store.auth_tokens().is_none());
        store.set_language(Language::French).unwrap();
        assert_eq!(LocalStore::open(&path).unwrap().language(), Language::French);
    }

    #[test]
    fn test_in_memory_store_keeps_state() {
        let store = LocalStore::in_memory();
        store.set_auth_tokens(tokens("xyz")).unwrap();
        assert_eq!(store.access_token().as_deref(), Some("xyz"));
        assert!(store.path().is_none());
    }
}
