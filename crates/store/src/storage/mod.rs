//! Key-value storage for persisted carts.
//!
//! # Architecture
//!
//! - [`KeyValueStore`] is a string-to-string async store in the shape of a
//!   mobile async-storage API (`get_item` / `set_item` / `remove_item`)
//! - [`MemoryStorage`] keeps slots in a shared map (tests, ephemeral carts)
//! - [`FileStorage`] keeps one file per slot under a base directory
//!
//! Values are opaque strings here; the cart store owns the JSON encoding.

mod file;
mod memory;

use core::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

pub use file::FileStorage;
pub use memory::MemoryStorage;

/// Errors that can occur when talking to a storage backend.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Filesystem operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The backend refused the operation.
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

/// Asynchronous string key-value store.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`, or `None` if the slot is empty.
    async fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Store `value` under `key`, replacing any previous value.
    async fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Clear the slot under `key`. Clearing an empty slot succeeds.
    async fn remove_item(&self, key: &str) -> Result<(), StorageError>;
}

#[async_trait]
impl<S: KeyValueStore + ?Sized> KeyValueStore for Arc<S> {
    async fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        (**self).get_item(key).await
    }

    async fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        (**self).set_item(key, value).await
    }

    async fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        (**self).remove_item(key).await
    }
}

/// Fixed key of a persisted slot, namespaced per application.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StorageKey(String);

impl StorageKey {
    /// Key of the slot holding the cart's line items: `<namespace>:products`.
    #[must_use]
    pub fn products(namespace: &str) -> Self {
        Self(format!("{namespace}:products"))
    }

    /// Get the key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for StorageKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_products_key_is_namespaced() {
        assert_eq!(
            StorageKey::products("@GoMarketplace").as_str(),
            "@GoMarketplace:products"
        );
    }
}
