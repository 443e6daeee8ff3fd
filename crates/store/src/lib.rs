//! Pocket Cart Store library.
//!
//! Holds the in-memory cart, applies mutations, and mirrors every mutation to
//! a key-value slot so the cart survives restarts.
//!
//! # Modules
//!
//! - [`store`] - [`CartStore`], hydration, and the ordered write-behind queue
//! - [`provider`] - Task-scoped access to the current cart ([`use_cart`])
//! - [`storage`] - The [`KeyValueStore`] trait with memory and file backends
//! - [`config`] - Environment-driven configuration
//! - [`error`] - Error types
//!
//! # Example
//!
//! ```rust,ignore
//! use pocket_cart_store::{CartConfig, CartStore, MemoryStorage};
//!
//! let config = CartConfig::default();
//! let (store, _hydration) = CartStore::load(MemoryStorage::new(), &config).await?;
//!
//! store.add_to_cart(item).await?;
//! assert_eq!(store.products().len(), 1);
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod error;
pub mod provider;
pub mod storage;
pub mod store;

pub use config::{CartConfig, ConfigError};
pub use error::{CartError, Result};
pub use provider::{CartProvider, try_use_cart, use_cart};
pub use storage::{FileStorage, KeyValueStore, MemoryStorage, StorageError, StorageKey};
pub use store::{CartStore, DiscardReason, Hydration, HydrationHandle, PendingWrite};
