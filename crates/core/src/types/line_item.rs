//! Catalog items and cart line items.

use serde::{Deserialize, Serialize};

use super::{Price, ProductId};

/// A product as offered by the catalog, before it lands in a cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogItem {
    pub id: ProductId,
    pub title: String,
    pub image_url: String,
    pub price: Price,
}

/// One product entry in the cart with its quantity.
///
/// The quantity is signed and not validated. Decrementing past zero yields a
/// negative quantity; the line is never removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub id: ProductId,
    pub title: String,
    pub image_url: String,
    pub price: Price,
    pub quantity: i64,
}

impl LineItem {
    /// Build a line item from a catalog item with the given quantity.
    #[must_use]
    pub fn new(item: CatalogItem, quantity: i64) -> Self {
        Self {
            id: item.id,
            title: item.title,
            image_url: item.image_url,
            price: item.price,
            quantity,
        }
    }
}

impl From<CatalogItem> for LineItem {
    fn from(item: CatalogItem) -> Self {
        Self::new(item, 1)
    }
}
