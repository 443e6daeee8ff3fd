//! Integration tests for Pocket Cart.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p pocket-cart-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `cart_persistence` - Restart and rehydration against real files
//! - `cart_provider` - Provider-scoped access from application code
//!
//! Shared fixtures live in this crate so each test file stays focused on
//! behavior.

use pocket_cart_core::{CatalogItem, Price, ProductId};

/// A catalog item with predictable fields derived from `id`.
#[must_use]
pub fn catalog_item(id: &str, cents: i64) -> CatalogItem {
    CatalogItem {
        id: ProductId::new(id),
        title: format!("Product {id}"),
        image_url: format!("https://images.example/{id}.jpg"),
        price: Price::from_cents(cents),
    }
}
