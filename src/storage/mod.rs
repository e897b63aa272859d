//! Durable secure storage for tokens and credentials
//!
//! [`SecureStore`] is the seam between the auth layer and whatever keeps
//! secrets on the host: a keychain bridge on mobile, [`FileStore`] on desktop,
//! or [`MemoryStore`] for tests and throwaway sessions.

mod file;
pub mod keys;

use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::Mutex;

pub use file::FileStore;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    /// I/O error while reading or writing the backing file
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("Storage JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Error reported by a platform secure-storage backend
    #[error("Secure storage backend error: {0}")]
    Backend(String),
}

/// Key-value store for secrets.
///
/// All values are strings. Deleting a missing key is not an error.
#[async_trait]
pub trait SecureStore: Send + Sync {
    /// Read a value, `None` when the key is absent
    ///
    /// # Errors
    /// Returns an error if the backend cannot be read
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Write a value, replacing any previous one
    ///
    /// # Errors
    /// Returns an error if the backend cannot be written
    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove a value
    ///
    /// # Errors
    /// Returns an error if the backend cannot be written
    async fn delete(&self, key: &str) -> Result<(), StorageError>;
}

#[async_trait]
impl<T: SecureStore + ?Sized> SecureStore for std::sync::Arc<T> {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        (**self).get(key).await
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        (**self).set(key, value).await
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        (**self).delete(key).await
    }
}

/// Type alias for a shared store.
pub type SharedStore = std::sync::Arc<dyn SecureStore>;

/// In-memory store; contents are lost when dropped.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the stored keys, sorted
    pub async fn keys(&self) -> Vec<String> {
        let entries = self.entries.lock().await;
        let mut keys: Vec<String> = entries.keys().cloned().collect();
        keys.sort();
        keys
    }
}

#[async_trait]
impl SecureStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries
            .lock()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.entries.lock().await.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_store_round_trip() {
        let store = MemoryStore::new();
        assert_eq!(store.get("k").await.unwrap(), None);

        store.set("k", "v").await.unwrap();
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v"));

        store.delete("k").await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_memory_store_delete_missing_is_ok() {
        let store = MemoryStore::new();
        assert!(store.delete("missing").await.is_ok());
        assert!(store.keys().await.is_empty());
    }
}
