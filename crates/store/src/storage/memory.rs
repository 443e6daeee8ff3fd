//! In-memory storage backend.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{KeyValueStore, StorageError};

/// Storage backed by a shared in-memory map.
///
/// Clones share the same map, so a test can hand one clone to a cart store
/// and inspect the slot through another.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    slots: Arc<RwLock<HashMap<String, String>>>,
    fail_writes: Arc<AtomicBool>,
}

impl MemoryStorage {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with the given slots.
    #[must_use]
    pub fn seeded<K, V>(slots: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let slots = slots
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();

        Self {
            slots: Arc::new(RwLock::new(slots)),
            fail_writes: Arc::default(),
        }
    }

    /// Make subsequent `set_item` and `remove_item` calls fail.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn check_writable(&self) -> Result<(), StorageError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable(
                "writes disabled on memory storage".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for MemoryStorage {
    async fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.slots.read().await.get(key).cloned())
    }

    async fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.check_writable()?;
        self.slots
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        self.check_writable()?;
        self.slots.write().await.remove(key);
        Ok(())
    }
}
