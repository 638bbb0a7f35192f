//! Durable key/value storage backing the session.
//!
//! `FileStorage` re-reads the file on every access so that a session removed
//! from disk by another process (or by hand) is seen as signed out right away.

use crate::error::Error;
use std::{
    collections::BTreeMap,
    fs,
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
};
use tracing::{debug, instrument};

pub trait Storage {
    /// Reads a value.
    /// # Errors
    /// Returns `Error::Storage` if the backing store cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, Error>;

    /// Writes a value, replacing any previous one.
    /// # Errors
    /// Returns `Error::Storage` if the backing store cannot be written.
    fn set(&mut self, key: &str, value: &str) -> Result<(), Error>;

    /// Removes a value; removing a missing key is not an error.
    /// # Errors
    /// Returns `Error::Storage` if the backing store cannot be written.
    fn remove(&mut self, key: &str) -> Result<(), Error>;
}

/// In-process storage, used by tests and for throwaway sessions.
#[derive(Debug, Default, Clone)]
pub struct MemoryStorage {
    entries: BTreeMap<String, String>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, Error> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), Error> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), Error> {
        self.entries.remove(key);
        Ok(())
    }
}

/// JSON object on disk, one string value per key.
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<BTreeMap<String, String>, Error> {
        match fs::read(&self.path) {
            Ok(bytes) if bytes.is_empty() => Ok(BTreeMap::new()),
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
                Error::Storage(format!("corrupt session file {}: {e}", self.path.display()))
            }),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    #[instrument(skip(self, entries), fields(path = %self.path.display()))]
    fn persist(&self, entries: &BTreeMap<String, String>) -> Result<(), Error> {
        if entries.is_empty() {
            return match fs::remove_file(&self.path) {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
                Err(e) => Err(e.into()),
            };
        }

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_vec_pretty(entries)
            .map_err(|e| Error::Storage(format!("failed to encode session: {e}")))?;

        // Write to a sibling file and rename so readers never see a torn file.
        let tmp = self.path.with_extension("json.tmp");
        let mut file = open_private(&tmp)?;
        file.write_all(&json)?;
        file.sync_all()?;
        fs::rename(&tmp, &self.path)?;

        debug!("session file written");

        Ok(())
    }
}

#[cfg(unix)]
fn open_private(path: &Path) -> std::io::Result<fs::File> {
    use std::os::unix::fs::OpenOptionsExt;

    fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)
}

#[cfg(not(unix))]
fn open_private(path: &Path) -> std::io::Result<fs::File> {
    fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
}

impl Storage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, Error> {
        Ok(self.load()?.remove(key))
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), Error> {
        let mut entries = self.load()?;
        entries.insert(key.to_string(), value.to_string());
        self.persist(&entries)
    }

    fn remove(&mut self, key: &str) -> Result<(), Error> {
        let mut entries = self.load()?;
        if entries.remove(key).is_some() {
            self.persist(&entries)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_storage_set_get_remove() {
        let mut storage = MemoryStorage::new();
        assert_eq!(storage.get("id_token").unwrap(), None);

        storage.set("id_token", "abc").unwrap();
        assert_eq!(storage.get("id_token").unwrap().as_deref(), Some("abc"));

        storage.remove("id_token").unwrap();
        assert_eq!(storage.get("id_token").unwrap(), None);
    }

    #[test]
    fn file_storage_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("session.json");

        let mut storage = FileStorage::new(&path);
        storage.set("expires_at", "42").unwrap();

        let reopened = FileStorage::new(&path);
        assert_eq!(reopened.get("expires_at").unwrap().as_deref(), Some("42"));
    }

    #[test]
    fn file_storage_removes_file_when_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");

        let mut storage = FileStorage::new(&path);
        storage.set("pkce_verifier", "v").unwrap();
        assert!(path.exists());

        storage.remove("pkce_verifier").unwrap();
        assert!(!path.exists());
        storage.remove("pkce_verifier").unwrap();
    }

    #[test]
    fn file_storage_sees_external_deletion() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");

        let mut storage = FileStorage::new(&path);
        storage.set("id_token", "abc").unwrap();
        fs::remove_file(&path).unwrap();

        assert_eq!(storage.get("id_token").unwrap(), None);
    }

    #[test]
    fn file_storage_reports_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        fs::write(&path, b"not json").unwrap();

        let storage = FileStorage::new(&path);
        assert!(matches!(storage.get("id_token"), Err(Error::Storage(_))));
    }

    #[cfg(unix)]
    #[test]
    fn file_storage_is_private() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");

        let mut storage = FileStorage::new(&path);
        storage.set("id_token", "abc").unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
