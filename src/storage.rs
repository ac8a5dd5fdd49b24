/*!
The durable key-value storage boundary.

Everything this crate persists (the user registry, the session slot,
the domain collections) goes through the [`Storage`] trait: strings in,
strings out, keyed by string. A process constructs one implementation
and hands it to whoever needs it, so tests can run against
[`MemStorage`] while a real deployment points [`FileStorage`] at a path
that survives restarts.
*/
use std::collections::HashMap;
use std::fmt::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;

#[derive(Debug, PartialEq)]
pub struct StorageError(String);

impl StorageError {
    /// Prepend some contextual `annotation` for the error.
    pub(crate) fn annotate(self, annotation: &str) -> Self {
        let s = format!("{}: {}", annotation, &self.0);
        Self(s)
    }
}

impl From<String> for StorageError {
    fn from(s: String) -> StorageError { StorageError(s) }
}

impl From<std::io::Error> for StorageError {
    fn from(e: std::io::Error) -> StorageError {
        let mut s = String::from("Storage I/O");
        write!(&mut s, ": {}", &e).unwrap();
        StorageError(s)
    }
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", &self.0)
    }
}

/// Get/set/remove a string by key.
///
/// All operations are local and expected to complete near-instantly;
/// nothing here retries.
#[async_trait]
pub trait Storage: Send + Sync {
    async fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;
    async fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;
    async fn remove_item(&self, key: &str) -> Result<(), StorageError>;
}

/// Process-local storage. State lasts exactly as long as the value
/// does, which makes it both the test double and a "fresh tab".
pub struct MemStorage {
    items: Mutex<HashMap<String, String>>,
}

impl MemStorage {
    pub fn new() -> Self {
        Self { items: Mutex::new(HashMap::new()) }
    }
}

impl Default for MemStorage {
    fn default() -> Self { Self::new() }
}

#[async_trait]
impl Storage for MemStorage {
    async fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        let items = self.items.lock().unwrap();
        Ok(items.get(key).cloned())
    }

    async fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut items = self.items.lock().unwrap();
        items.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    async fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        let mut items = self.items.lock().unwrap();
        items.remove(key);
        Ok(())
    }
}

/// Durable storage: one JSON object of string keys to string values,
/// read and rewritten whole on each operation. Two processes sharing a
/// path are not coordinated; that matches the storage this models.
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_owned();
        log::trace!("FileStorage::new( {:?} ) called.", &path);

        Self { path }
    }

    async fn read_map(&self) -> Result<HashMap<String, String>, StorageError> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(HashMap::new());
            },
            Err(e) => {
                return Err(StorageError::from(e)
                    .annotate("Unable to read storage file"));
            },
        };

        serde_json::from_str(&raw).map_err(|e| StorageError::from(format!(
            "Storage file {} is unreadable: {}",
            self.path.display(), &e
        )))
    }

    async fn write_map(&self, map: &HashMap<String, String>) -> Result<(), StorageError> {
        let raw = serde_json::to_string(map).map_err(|e| StorageError::from(format!(
            "Unable to serialize storage contents: {}", &e
        )))?;

        tokio::fs::write(&self.path, raw).await
            .map_err(|e| StorageError::from(e)
                .annotate("Unable to write storage file"))
    }
}

#[async_trait]
impl Storage for FileStorage {
    async fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        let map = self.read_map().await?;
        Ok(map.get(key).cloned())
    }

    async fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut map = self.read_map().await?;
        map.insert(key.to_owned(), value.to_owned());
        self.write_map(&map).await
    }

    async fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        let mut map = self.read_map().await?;
        if map.remove(key).is_none() {
            return Ok(());
        }
        self.write_map(&map).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::ensure_logging;

    #[tokio::test]
    async fn mem_storage_round_trip() {
        ensure_logging();
        let store = MemStorage::new();

        assert_eq!(store.get_item("k").await.unwrap(), None);
        store.set_item("k", "v").await.unwrap();
        assert_eq!(store.get_item("k").await.unwrap(), Some("v".to_owned()));

        store.set_item("k", "w").await.unwrap();
        assert_eq!(store.get_item("k").await.unwrap(), Some("w".to_owned()));

        store.remove_item("k").await.unwrap();
        assert_eq!(store.get_item("k").await.unwrap(), None);

        // Removing an absent key is fine.
        store.remove_item("k").await.unwrap();
    }

    #[tokio::test]
    async fn file_storage_survives_reopen() {
        ensure_logging();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("campus_data.json");

        let store = FileStorage::new(&path);
        assert_eq!(store.get_item("k").await.unwrap(), None);
        store.set_item("k", "v").await.unwrap();
        store.set_item("other", "w").await.unwrap();
        store.remove_item("other").await.unwrap();

        // A second handle over the same path sees the first one's writes.
        let reopened = FileStorage::new(&path);
        assert_eq!(reopened.get_item("k").await.unwrap(), Some("v".to_owned()));
        assert_eq!(reopened.get_item("other").await.unwrap(), None);
    }

    #[tokio::test]
    async fn file_storage_reports_garbage() {
        ensure_logging();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("campus_data.json");
        std::fs::write(&path, "this is not json").unwrap();

        let store = FileStorage::new(&path);
        assert!(store.get_item("k").await.is_err());
    }
}
