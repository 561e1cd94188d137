//! File-based session store at ~/.roomhub/session.json.
//!
//! Holds the bearer token attached to room-service requests. The file is
//! re-read on every access so a login from another process is picked up.
//! A missing, blank or unreadable file means "no session".

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Serialize, Deserialize, Clone)]
struct SessionEntry {
    token: String,
    saved_at: i64,
}

/// Persisted bearer token.
#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    pub fn load_from(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_file(&self) -> Option<SessionEntry> {
        let data = fs::read_to_string(&self.path).ok()?;
        match serde_json::from_str::<SessionEntry>(&data) {
            Ok(entry) => Some(entry),
            Err(e) => {
                debug!(path = %self.path.display(), error = %e, "ignoring unreadable session file");
                None
            }
        }
    }

    /// The stored token, if any.
    pub fn token(&self) -> Option<String> {
        self.read_file()
            .map(|e| e.token)
            .filter(|t| !t.trim().is_empty())
    }

    pub fn saved_at(&self) -> Option<DateTime<Utc>> {
        let entry = self.read_file()?;
        Utc.timestamp_millis_opt(entry.saved_at).single()
    }

    pub fn save(&self, token: &str) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let entry = SessionEntry {
            token: token.trim().to_string(),
            saved_at: Utc::now().timestamp_millis(),
        };
        let json = serde_json::to_string_pretty(&entry).map_err(io::Error::other)?;
        fs::write(&self.path, json)
    }

    /// Forget the token. Clearing an absent session is not an error.
    pub fn clear(&self) -> io::Result<()> {
        match fs::remove_file(&self.path) {
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_store() -> (TokenStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("session.json");
        (TokenStore::load_from(path), dir)
    }

    #[test]
    fn test_empty_store() {
        let (store, _dir) = test_store();
        assert!(store.token().is_none());
        assert!(store.saved_at().is_none());
    }

    #[test]
    fn test_save_and_read() {
        let (store, _dir) = test_store();
        store.save("  abc.def  ").unwrap();
        assert_eq!(store.token(), Some("abc.def".to_string()));
        assert!(store.saved_at().is_some());
    }

    #[test]
    fn test_persistence_across_instances() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("session.json");
        TokenStore::load_from(path.clone()).save("tok").unwrap();
        assert_eq!(TokenStore::load_from(path).token(), Some("tok".to_string()));
    }

    #[test]
    fn test_clear() {
        let (store, _dir) = test_store();
        store.save("tok").unwrap();
        store.clear().unwrap();
        assert!(store.token().is_none());
        store.clear().unwrap();
    }

    #[test]
    fn test_corrupt_file_is_no_session() {
        let (store, _dir) = test_store();
        fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        fs::write(store.path(), "not json").unwrap();
        assert!(store.token().is_none());
    }

    #[test]
    fn test_blank_token_is_no_session() {
        let (store, _dir) = test_store();
        store.save("   ").unwrap();
        assert!(store.token().is_none());
    }
}
