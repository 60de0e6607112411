//! Persistent credential storage.
//!
//! The client reads the stored token on every request and clears the whole
//! record on authentication failure or logout. [`CredentialStore`] is the
//! seam; [`MemoryCredentialStore`] and [`FileCredentialStore`] are the
//! provided implementations.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use crate::auth::Session;
use crate::error::CredentialStoreError;

/// Storage for the current [`Session`].
///
/// Implementations must be safe to call from any task; the client calls
/// [`load`](Self::load) once per attempt.
pub trait CredentialStore: Send + Sync {
    /// Returns the stored session, if any.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialStoreError`] if the backing storage cannot be read.
    fn load(&self) -> Result<Option<Session>, CredentialStoreError>;

    /// Replaces the stored session.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialStoreError`] if the backing storage cannot be written.
    fn save(&self, session: &Session) -> Result<(), CredentialStoreError>;

    /// Removes token, role and name.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialStoreError`] if the backing storage cannot be written.
    fn clear(&self) -> Result<(), CredentialStoreError>;
}

/// In-process storage. Lost when the process exits.
///
/// # Example
///
/// ```rust
/// use bakery_api::auth::{CredentialStore, MemoryCredentialStore};
/// use bakery_api::Session;
///
/// let store = MemoryCredentialStore::new();
/// store.save(&Session::new("token", "branch", "Kemang")).unwrap();
/// assert!(store.load().unwrap().is_some());
///
/// store.clear().unwrap();
/// assert!(store.load().unwrap().is_none());
/// ```
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    session: Mutex<Option<Session>>,
}

impl MemoryCredentialStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store holding `session`.
    #[must_use]
    pub fn with_session(session: Session) -> Self {
        Self {
            session: Mutex::new(Some(session)),
        }
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn load(&self) -> Result<Option<Session>, CredentialStoreError> {
        Ok(self
            .session
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    fn save(&self, session: &Session) -> Result<(), CredentialStoreError> {
        *self.session.lock().unwrap_or_else(PoisonError::into_inner) = Some(session.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), CredentialStoreError> {
        *self.session.lock().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }
}

/// Storage in a JSON file, surviving restarts.
///
/// A missing file means no session. Clearing deletes the file.
#[derive(Debug)]
pub struct FileCredentialStore {
    path: PathBuf,
    io_lock: Mutex<()>,
}

impl FileCredentialStore {
    /// Creates a store backed by `path`. The file is not touched until used.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            io_lock: Mutex::new(()),
        }
    }

    /// The backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CredentialStore for FileCredentialStore {
    fn load(&self) -> Result<Option<Session>, CredentialStoreError> {
        let _guard = self.io_lock.lock().unwrap_or_else(PoisonError::into_inner);
        match std::fs::read_to_string(&self.path) {
            Ok(contents) => Ok(Some(serde_json::from_str(&contents)?)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, session: &Session) -> Result<(), CredentialStoreError> {
        let _guard = self.io_lock.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, serde_json::to_vec_pretty(session)?)?;
        Ok(())
    }

    fn clear(&self) -> Result<(), CredentialStoreError> {
        let _guard = self.io_lock.lock().unwrap_or_else(PoisonError::into_inner);
        match std::fs::remove_file(&self.path) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_starts_empty() {
        assert!(MemoryCredentialStore::new().load().unwrap().is_none());
    }

    #[test]
    fn test_memory_store_with_session() {
        let store = MemoryCredentialStore::with_session(Session::new("t", "admin", "Ayu"));
        assert_eq!(store.load().unwrap().unwrap().name, "Ayu");
    }

    #[test]
    fn test_file_store_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("session.json");

        let session = Session::new("token-abc", "branch", "Kemang");
        FileCredentialStore::new(&path).save(&session).unwrap();

        let reopened = FileCredentialStore::new(&path);
        assert_eq!(reopened.load().unwrap(), Some(session));
    }

    #[test]
    fn test_file_store_missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCredentialStore::new(dir.path().join("absent.json"));
        assert!(store.load().unwrap().is_none());
        // Clearing a missing file is fine
        store.clear().unwrap();
    }

    #[test]
    fn test_file_store_clear_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCredentialStore::new(dir.path().join("session.json"));
        store.save(&Session::new("t", "admin", "Ayu")).unwrap();
        assert!(store.path().exists());

        store.clear().unwrap();
        assert!(!store.path().exists());
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn test_file_store_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, "not json").unwrap();

        let result = FileCredentialStore::new(&path).load();
        assert!(matches!(result, Err(CredentialStoreError::Serialization(_))));
    }
}
