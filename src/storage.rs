//! Persistence layer for the translation cache
//!
//! The store persists its state through a small async key-value trait so
//! callers can plug in whatever storage their platform offers. Two
//! implementations ship with the crate: [`MemoryStorage`] for tests and
//! ephemeral processes, and [`FileStorage`] for one-file-per-key
//! persistence on disk.
//!
//! # Example
//!
//! ```ignore
//! use i18n_keyless::{FileStorage, KeyValueStorage, STORAGE_KEY_CURRENT_LANGUAGE};
//!
//! let storage = FileStorage::new("/var/lib/myapp/i18n")?;
//! storage.write(STORAGE_KEY_CURRENT_LANGUAGE, "fr").await?;
//! assert_eq!(storage.read(STORAGE_KEY_CURRENT_LANGUAGE).await?, Some("fr".to_string()));
//! ```

use crate::error::{I18nError, I18nResult};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::RwLock;

/// Storage key for the serialized translation cache
pub const STORAGE_KEY_TRANSLATIONS: &str = "i18n-keyless-translations";
/// Storage key for the active language code
pub const STORAGE_KEY_CURRENT_LANGUAGE: &str = "i18n-keyless-current-language";
/// Storage key for the server-assigned correlation id
pub const STORAGE_KEY_UNIQUE_ID: &str = "i18n-keyless-user-id";
/// Storage key for the server refresh watermark
pub const STORAGE_KEY_LAST_REFRESH: &str = "i18n-keyless-last-refresh";

/// Async key-value storage the cache persists through
///
/// Implementations must tolerate reads of keys that were never written
/// (return `Ok(None)`) and removals of absent keys (return `Ok(())`).
#[async_trait]
pub trait KeyValueStorage: Send + Sync {
    /// Reads a value, or `None` if the key was never written
    async fn read(&self, key: &str) -> I18nResult<Option<String>>;

    /// Writes a value, replacing any previous one
    async fn write(&self, key: &str, value: &str) -> I18nResult<()>;

    /// Removes a key; absent keys are not an error
    async fn remove(&self, key: &str) -> I18nResult<()>;

    /// Removes every key this storage holds
    async fn clear(&self) -> I18nResult<()>;
}

/// In-memory storage backed by a `HashMap`
///
/// Nothing survives the process; useful for tests and for callers that
/// only want the in-memory cache behavior.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().expect("lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl KeyValueStorage for MemoryStorage {
    async fn read(&self, key: &str) -> I18nResult<Option<String>> {
        Ok(self.entries.read().expect("lock poisoned").get(key).cloned())
    }

    async fn write(&self, key: &str, value: &str) -> I18nResult<()> {
        self.entries
            .write()
            .expect("lock poisoned")
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> I18nResult<()> {
        self.entries.write().expect("lock poisoned").remove(key);
        Ok(())
    }

    async fn clear(&self) -> I18nResult<()> {
        self.entries.write().expect("lock poisoned").clear();
        Ok(())
    }
}

/// File-backed storage: one file per key inside a directory
///
/// Key names are sanitized to a filesystem-safe form, so distinct keys
/// must differ in more than punctuation.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    /// Creates the storage directory if needed and returns the backend
    pub fn new(dir: impl Into<PathBuf>) -> I18nResult<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|e| {
            I18nError::StorageError(format!(
                "failed to create storage directory {}: {}",
                dir.display(),
                e
            ))
        })?;
        Ok(Self { dir })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let name: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.dir.join(name)
    }
}

#[async_trait]
impl KeyValueStorage for FileStorage {
    async fn read(&self, key: &str) -> I18nResult<Option<String>> {
        match tokio::fs::read_to_string(self.path_for(key)).await {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(I18nError::StorageError(format!(
                "failed to read {}: {}",
                key, e
            ))),
        }
    }

    async fn write(&self, key: &str, value: &str) -> I18nResult<()> {
        tokio::fs::write(self.path_for(key), value)
            .await
            .map_err(|e| I18nError::StorageError(format!("failed to write {}: {}", key, e)))
    }

    async fn remove(&self, key: &str) -> I18nResult<()> {
        match tokio::fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(I18nError::StorageError(format!(
                "failed to remove {}: {}",
                key, e
            ))),
        }
    }

    async fn clear(&self) -> I18nResult<()> {
        let mut entries = tokio::fs::read_dir(&self.dir).await.map_err(|e| {
            I18nError::StorageError(format!("failed to list {}: {}", self.dir.display(), e))
        })?;
        while let Some(entry) = entries.next_entry().await.map_err(|e| {
            I18nError::StorageError(format!("failed to list {}: {}", self.dir.display(), e))
        })? {
            let is_file = entry
                .file_type()
                .await
                .map(|t| t.is_file())
                .unwrap_or(false);
            if is_file {
                tokio::fs::remove_file(entry.path()).await.map_err(|e| {
                    I18nError::StorageError(format!(
                        "failed to remove {}: {}",
                        entry.path().display(),
                        e
                    ))
                })?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ========== MemoryStorage Tests ==========

    #[tokio::test]
    async fn test_memory_round_trip() {
        let storage = MemoryStorage::new();
        assert_eq!(storage.read("missing").await.unwrap(), None);

        storage.write("lang", "fr").await.unwrap();
        assert_eq!(storage.read("lang").await.unwrap(), Some("fr".to_string()));

        storage.write("lang", "es").await.unwrap();
        assert_eq!(storage.read("lang").await.unwrap(), Some("es".to_string()));

        storage.remove("lang").await.unwrap();
        assert_eq!(storage.read("lang").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_memory_clear() {
        let storage = MemoryStorage::new();
        storage.write("a", "1").await.unwrap();
        storage.write("b", "2").await.unwrap();
        assert_eq!(storage.len(), 2);

        storage.clear().await.unwrap();
        assert!(storage.is_empty());
    }

    #[tokio::test]
    async fn test_memory_remove_absent_key_is_ok() {
        let storage = MemoryStorage::new();
        storage.remove("never-written").await.unwrap();
    }

    // ========== FileStorage Tests ==========

    #[tokio::test]
    async fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path()).unwrap();

        assert_eq!(storage.read(STORAGE_KEY_UNIQUE_ID).await.unwrap(), None);

        storage
            .write(STORAGE_KEY_UNIQUE_ID, "uid-42")
            .await
            .unwrap();
        assert_eq!(
            storage.read(STORAGE_KEY_UNIQUE_ID).await.unwrap(),
            Some("uid-42".to_string())
        );

        storage.remove(STORAGE_KEY_UNIQUE_ID).await.unwrap();
        assert_eq!(storage.read(STORAGE_KEY_UNIQUE_ID).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_file_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let storage = FileStorage::new(dir.path()).unwrap();
            storage
                .write(STORAGE_KEY_CURRENT_LANGUAGE, "fr")
                .await
                .unwrap();
        }
        let reopened = FileStorage::new(dir.path()).unwrap();
        assert_eq!(
            reopened.read(STORAGE_KEY_CURRENT_LANGUAGE).await.unwrap(),
            Some("fr".to_string())
        );
    }

    #[tokio::test]
    async fn test_file_clear_removes_entries() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path()).unwrap();
        storage.write("a", "1").await.unwrap();
        storage.write("b", "2").await.unwrap();

        storage.clear().await.unwrap();
        assert_eq!(storage.read("a").await.unwrap(), None);
        assert_eq!(storage.read("b").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_file_remove_absent_key_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path()).unwrap();
        storage.remove("never-written").await.unwrap();
    }
}
