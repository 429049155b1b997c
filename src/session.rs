//! Session-scoped key/value storage and the "intro already seen" flag.
//!
//! The sequencer only depends on [`SessionStore`]. [`MemoryStore`] backs
//! tests; [`FileStore`] keeps one file per key under the login session's
//! runtime directory so the flag survives restarts within a session.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::rc::Rc;

use tracing::warn;

use crate::error::StorageError;

/// Value written when the flag is set
const FLAG_VALUE: &str = "true";

/// Key/value capability with session lifetime
pub trait SessionStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError>;
    fn clear(&mut self, key: &str) -> Result<(), StorageError>;
}

/// In-memory store; clones share the same map
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Rc<RefCell<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.borrow().contains_key(key)
    }
}

impl SessionStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.borrow().get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn clear(&mut self, key: &str) -> Result<(), StorageError> {
        self.entries.borrow_mut().remove(key);
        Ok(())
    }
}

/// One file per key inside a directory
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Store scoped to the current login session.
    ///
    /// Uses `$XDG_RUNTIME_DIR` (wiped at logout), falling back to the
    /// system temp dir.
    pub fn for_login_session() -> Self {
        let base = std::env::var_os("XDG_RUNTIME_DIR")
            .map(PathBuf::from)
            .filter(|dir| dir.is_dir())
            .unwrap_or_else(std::env::temp_dir);
        Self::new(base.join("manifestorium"))
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let file_name: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
            .collect();
        self.dir.join(file_name)
    }
}

impl SessionStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        fs::create_dir_all(&self.dir)?;
        fs::write(self.path_for(key), value)?;
        Ok(())
    }

    fn clear(&mut self, key: &str) -> Result<(), StorageError> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// The persisted "intro already shown" marker.
///
/// Storage failures never surface: an unreadable store reads as unset (the
/// intro plays again) and failed writes are logged.
pub struct SessionFlag<S> {
    store: S,
    key: String,
}

impl<S: SessionStore> SessionFlag<S> {
    pub fn new(store: S, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
        }
    }

    pub fn is_set(&self) -> bool {
        match self.store.get(&self.key) {
            Ok(value) => value.is_some(),
            Err(e) => {
                warn!(key = %self.key, "session storage unreadable, treating intro as unseen: {e}");
                false
            }
        }
    }

    pub fn set(&mut self) {
        if let Err(e) = self.store.set(&self.key, FLAG_VALUE) {
            warn!(key = %self.key, "failed to persist session flag: {e}");
        }
    }

    pub fn clear(&mut self) {
        if let Err(e) = self.store.clear(&self.key) {
            warn!(key = %self.key, "failed to clear session flag: {e}");
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    /// Store that fails every operation, like storage disabled by the platform
    #[derive(Debug, Clone, Copy, Default)]
    pub(crate) struct BrokenStore;

    impl SessionStore for BrokenStore {
        fn get(&self, _key: &str) -> Result<Option<String>, StorageError> {
            Err(StorageError::Unavailable("disabled".into()))
        }

        fn set(&mut self, _key: &str, _value: &str) -> Result<(), StorageError> {
            Err(StorageError::Unavailable("disabled".into()))
        }

        fn clear(&mut self, _key: &str) -> Result<(), StorageError> {
            Err(StorageError::Unavailable("disabled".into()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::BrokenStore;
    use super::*;

    #[test]
    fn test_memory_store_clones_share_entries() {
        let store = MemoryStore::new();
        let mut handle = store.clone();

        handle.set("k", "v").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("v"));

        handle.clear("k").unwrap();
        assert!(!store.contains("k"));
    }

    #[test]
    fn test_file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileStore::new(dir.path().join("session"));

        assert_eq!(store.get("hasSeenThreshold").unwrap(), None);

        store.set("hasSeenThreshold", "true").unwrap();
        assert_eq!(
            store.get("hasSeenThreshold").unwrap().as_deref(),
            Some("true")
        );
        assert!(dir.path().join("session/hasSeenThreshold").is_file());

        store.clear("hasSeenThreshold").unwrap();
        assert_eq!(store.get("hasSeenThreshold").unwrap(), None);

        // Clearing an absent key is fine
        store.clear("hasSeenThreshold").unwrap();
    }

    #[test]
    fn test_file_store_sanitizes_keys() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileStore::new(dir.path());

        store.set("../escape", "true").unwrap();
        assert!(dir.path().join("___escape").is_file());
    }

    #[test]
    fn test_flag_lifecycle() {
        let store = MemoryStore::new();
        let mut flag = SessionFlag::new(store.clone(), "seen");

        assert!(!flag.is_set());
        flag.set();
        assert!(flag.is_set());
        assert_eq!(store.get("seen").unwrap().as_deref(), Some("true"));

        flag.clear();
        assert!(!flag.is_set());
    }

    #[test]
    fn test_flag_degrades_when_storage_unavailable() {
        let mut flag = SessionFlag::new(BrokenStore, "seen");

        flag.set();
        assert!(!flag.is_set());
        flag.clear();
    }
}
