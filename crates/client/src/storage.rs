//! Key/value persistence for client state.
//!
//! The session token and the cart each live under one string key. Two
//! backends are provided: [`MemoryStorage`] for tests and short-lived
//! processes, and [`FileStorage`], which keeps every key in one JSON object
//! on disk so state survives restarts.

use std::collections::BTreeMap;
use std::collections::HashMap;
use std::future::Future;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use thiserror::Error;

/// Errors raised by a storage backend.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Reading or writing the backing file failed.
    #[error("storage i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// The backing file is not a JSON object of strings.
    #[error("storage file is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// Asynchronous string key/value store.
pub trait Storage: Send + Sync {
    /// Value stored under `key`, if any.
    fn get_item(
        &self,
        key: &str,
    ) -> impl Future<Output = Result<Option<String>, StorageError>> + Send;

    /// Store `value` under `key`, replacing any previous value.
    fn set_item(
        &self,
        key: &str,
        value: &str,
    ) -> impl Future<Output = Result<(), StorageError>> + Send;

    /// Delete `key`. Deleting a missing key is not an error.
    fn remove_item(&self, key: &str) -> impl Future<Output = Result<(), StorageError>> + Send;
}

/// Storage held in process memory.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    items: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStorage {
    async fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        let items = self.items.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(items.get(key).cloned())
    }

    async fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut items = self.items.lock().unwrap_or_else(PoisonError::into_inner);
        items.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    async fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        let mut items = self.items.lock().unwrap_or_else(PoisonError::into_inner);
        items.remove(key);
        Ok(())
    }
}

/// Storage persisted as a single JSON object in a file.
///
/// The file is read on every access and rewritten on every change. A missing
/// file reads as empty. Writes go to a sibling temporary file first and are
/// then renamed into place.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    write_lock: tokio::sync::Mutex<()>,
}

impl FileStorage {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: tokio::sync::Mutex::new(()),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_all(&self) -> Result<BTreeMap<String, String>, StorageError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) if bytes.is_empty() => Ok(BTreeMap::new()),
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn write_all(&self, items: &BTreeMap<String, String>) -> Result<(), StorageError> {
        let bytes = serde_json::to_vec_pretty(items)?;
        let tmp = self.path.with_extension("tmp");
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

impl Storage for FileStorage {
    async fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.read_all().await?.remove(key))
    }

    async fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock().await;
        let mut items = self.read_all().await?;
        items.insert(key.to_owned(), value.to_owned());
        self.write_all(&items).await
    }

    async fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock().await;
        let mut items = self.read_all().await?;
        if items.remove(key).is_some() {
            self.write_all(&items).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_storage() {
        let storage = MemoryStorage::new();
        assert_eq!(storage.get_item("k").await.unwrap(), None);

        storage.set_item("k", "v1").await.unwrap();
        storage.set_item("k", "v2").await.unwrap();
        assert_eq!(storage.get_item("k").await.unwrap().as_deref(), Some("v2"));

        storage.remove_item("k").await.unwrap();
        storage.remove_item("k").await.unwrap();
        assert_eq!(storage.get_item("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_file_storage_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");

        let storage = FileStorage::new(&path);
        assert_eq!(storage.get_item("authToken").await.unwrap(), None);
        storage.set_item("authToken", "a.b.c").await.unwrap();
        storage.set_item("cart", "[]").await.unwrap();

        let reopened = FileStorage::new(&path);
        assert_eq!(
            reopened.get_item("authToken").await.unwrap().as_deref(),
            Some("a.b.c")
        );

        reopened.remove_item("authToken").await.unwrap();
        assert_eq!(storage.get_item("authToken").await.unwrap(), None);
        assert_eq!(storage.get_item("cart").await.unwrap().as_deref(), Some("[]"));
    }

    #[tokio::test]
    async fn test_file_storage_reports_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, "not json").unwrap();

        let storage = FileStorage::new(&path);
        assert!(matches!(
            storage.get_item("cart").await,
            Err(StorageError::Corrupt(_))
        ));
    }
}
