//! In-memory key-value store.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::Result;
use crate::ports::KeyValueStore;

/// Non-persistent store. Clones share the same map, which lets a test
/// hand the "same disk" to a second queue instance.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    storage: Arc<RwLock<HashMap<String, Vec<u8>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn contains(&self, key: &str) -> bool {
        self.storage.read().await.contains_key(key)
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn read(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let storage = self.storage.read().await;
        Ok(storage.get(key).cloned())
    }

    async fn write(&self, key: &str, value: &[u8]) -> Result<()> {
        let mut storage = self.storage.write().await;
        storage.insert(key.to_string(), value.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_key_reads_as_none() {
        let store = MemoryStore::new();
        assert_eq!(store.read("nope").await.unwrap(), None);
        assert!(!store.contains("nope").await);
    }

    #[tokio::test]
    async fn write_replaces_previous_value() {
        let store = MemoryStore::new();
        store.write("k", b"one").await.unwrap();
        store.write("k", b"two").await.unwrap();
        assert_eq!(store.read("k").await.unwrap(), Some(b"two".to_vec()));
    }

    #[tokio::test]
    async fn clones_share_storage() {
        let store = MemoryStore::new();
        let other = store.clone();
        store.write("k", b"v").await.unwrap();
        assert_eq!(other.read("k").await.unwrap(), Some(b"v".to_vec()));
    }
}
