//! Task-scoped access to the current cart.
//!
//! A [`CartProvider`] installs a [`CartStore`] for the duration of a future;
//! code running inside it reaches the store through [`use_cart`] instead of
//! threading a handle through every call.
//!
//! The scope is task-local: tasks spawned from inside a provider do not
//! inherit it and must be wrapped in their own provider.
//!
//! # Example
//!
//! ```rust,ignore
//! use pocket_cart_store::{CartProvider, use_cart};
//!
//! CartProvider::new(store)
//!     .scope(async {
//!         let cart = use_cart();
//!         cart.increment(&id).await?;
//!         Ok::<_, CartError>(())
//!     })
//!     .await?;
//! ```

use std::future::Future;

use crate::error::{CartError, Result};
use crate::store::CartStore;

tokio::task_local! {
    static CURRENT_CART: CartStore;
}

/// Provides a [`CartStore`] to everything run inside its scope.
#[derive(Debug, Clone)]
pub struct CartProvider {
    store: CartStore,
}

impl CartProvider {
    /// Create a provider for `store`.
    #[must_use]
    pub const fn new(store: CartStore) -> Self {
        Self { store }
    }

    /// Run `future` with this provider's store as the current cart.
    pub async fn scope<F: Future>(self, future: F) -> F::Output {
        CURRENT_CART.scope(self.store, future).await
    }

    /// Run `f` synchronously with this provider's store as the current cart.
    pub fn sync_scope<R>(self, f: impl FnOnce() -> R) -> R {
        CURRENT_CART.sync_scope(self.store, f)
    }
}

/// The current cart, or `CartError::OutsideProvider` outside any provider.
///
/// # Errors
///
/// Returns `CartError::OutsideProvider` when no [`CartProvider`] scope is
/// active on the current task.
pub fn try_use_cart() -> Result<CartStore> {
    CURRENT_CART
        .try_with(CartStore::clone)
        .map_err(|_| CartError::OutsideProvider)
}

/// The current cart.
///
/// # Panics
///
/// Panics when called outside a [`CartProvider`] scope. This is a usage
/// error in the caller, not a runtime condition.
#[must_use]
#[track_caller]
pub fn use_cart() -> CartStore {
    match try_use_cart() {
        Ok(store) => store,
        Err(_) => panic!("use_cart must be used within a CartProvider"),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pocket_cart_core::{CatalogItem, Price, ProductId};

    use super::*;
    use crate::config::CartConfig;
    use crate::storage::MemoryStorage;

    async fn store() -> CartStore {
        let (store, _) = CartStore::load(MemoryStorage::new(), &CartConfig::default())
            .await
            .unwrap();
        store
    }

    #[test]
    fn test_try_use_cart_outside_provider() {
        assert!(matches!(try_use_cart(), Err(CartError::OutsideProvider)));
    }

    #[test]
    #[should_panic(expected = "use_cart must be used within a CartProvider")]
    fn test_use_cart_outside_provider_panics() {
        let _ = use_cart();
    }

    #[tokio::test]
    async fn test_use_cart_inside_scope_shares_store() {
        let store = store().await;

        CartProvider::new(store.clone())
            .scope(async {
                let cart = use_cart();
                cart.add_to_cart(CatalogItem {
                    id: ProductId::new("a"),
                    title: "A".to_string(),
                    image_url: String::new(),
                    price: Price::from_cents(100),
                })
                .await
                .unwrap();
            })
            .await;

        assert_eq!(store.products().len(), 1);
        // Scope has ended
        assert!(try_use_cart().is_err());
    }

    #[tokio::test]
    async fn test_sync_scope() {
        let store = store().await;
        let key = CartProvider::new(store).sync_scope(|| use_cart().key().clone());
        assert_eq!(key.as_str(), "pocket-cart:products");
    }
}
