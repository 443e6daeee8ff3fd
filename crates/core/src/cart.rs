//! The cart: an ordered collection of line items, unique by product ID.
//!
//! All mutation logic lives here as plain methods so it can be tested without
//! any storage or async runtime. `pocket-cart-store` wraps a [`Cart`] and
//! persists it after every mutation.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{CatalogItem, LineItem, ProductId};

/// A persisted cart violated the one-line-per-product invariant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CartInvariantError {
    #[error("duplicate line item for product {0}")]
    DuplicateId(ProductId),
}

/// What [`Cart::add`] did with the candidate item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    /// The product was new and was appended with quantity 1.
    Appended,
    /// The product was already present and its quantity was incremented.
    Incremented,
}

/// Ordered sequence of line items, at most one per [`ProductId`].
///
/// Insertion order is preserved. Serializes as a bare JSON array of line
/// items; deserialization rejects arrays containing the same ID twice.
///
/// # Example
///
/// ```rust
/// use pocket_cart_core::{Cart, CatalogItem, Price, ProductId};
///
/// let mut cart = Cart::new();
/// let apple = CatalogItem {
///     id: ProductId::new("apple"),
///     title: "Apple".to_string(),
///     image_url: String::new(),
///     price: Price::from_cents(100),
/// };
///
/// cart.add(apple.clone());
/// cart.add(apple);
/// assert_eq!(cart.len(), 1);
/// assert_eq!(cart.total_quantity(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<LineItem>", into = "Vec<LineItem>")]
pub struct Cart {
    items: Vec<LineItem>,
}

impl Cart {
    /// Create an empty cart.
    #[must_use]
    pub const fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// The line items in insertion order.
    #[must_use]
    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    /// Number of distinct products in the cart.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the cart has no line items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Look up the line for a product.
    #[must_use]
    pub fn get(&self, id: &ProductId) -> Option<&LineItem> {
        self.items.iter().find(|line| &line.id == id)
    }

    /// Whether the cart has a line for the product.
    #[must_use]
    pub fn contains(&self, id: &ProductId) -> bool {
        self.get(id).is_some()
    }

    /// Sum of all line quantities. Negative quantities count as-is.
    #[must_use]
    pub fn total_quantity(&self) -> i64 {
        self.items.iter().map(|line| line.quantity).sum()
    }

    /// Iterate over the line items in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, LineItem> {
        self.items.iter()
    }

    /// Add one unit of a catalog item.
    ///
    /// Appends a new line with quantity 1 if the product is not in the cart,
    /// otherwise increments the existing line. The existing line keeps its
    /// original title, image and price.
    pub fn add(&mut self, item: CatalogItem) -> AddOutcome {
        if self.increment(&item.id) {
            AddOutcome::Incremented
        } else {
            self.items.push(LineItem::new(item, 1));
            AddOutcome::Appended
        }
    }

    /// Increase the quantity of a product's line by one.
    ///
    /// Returns `false` and leaves the cart unchanged if the product is absent.
    pub fn increment(&mut self, id: &ProductId) -> bool {
        self.adjust(id, 1)
    }

    /// Decrease the quantity of a product's line by one.
    ///
    /// There is no floor: the quantity may go below zero, and the line stays
    /// in the cart. Returns `false` if the product is absent.
    pub fn decrement(&mut self, id: &ProductId) -> bool {
        self.adjust(id, -1)
    }

    fn adjust(&mut self, id: &ProductId, delta: i64) -> bool {
        match self.items.iter_mut().find(|line| &line.id == id) {
            Some(line) => {
                line.quantity = line.quantity.saturating_add(delta);
                true
            }
            None => false,
        }
    }
}

impl TryFrom<Vec<LineItem>> for Cart {
    type Error = CartInvariantError;

    fn try_from(items: Vec<LineItem>) -> Result<Self, Self::Error> {
        let mut seen = std::collections::HashSet::with_capacity(items.len());
        for line in &items {
            if !seen.insert(&line.id) {
                return Err(CartInvariantError::DuplicateId(line.id.clone()));
            }
        }
        Ok(Self { items })
    }
}

impl From<Cart> for Vec<LineItem> {
    fn from(cart: Cart) -> Self {
        cart.items
    }
}

impl<'a> IntoIterator for &'a Cart {
    type Item = &'a LineItem;
    type IntoIter = std::slice::Iter<'a, LineItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::types::Price;

    fn item(id: &str, cents: i64) -> CatalogItem {
        CatalogItem {
            id: ProductId::new(id),
            title: format!("Product {id}"),
            image_url: format!("https://img.example/{id}.png"),
            price: Price::from_cents(cents),
        }
    }

    fn quantities(cart: &Cart) -> Vec<(&str, i64)> {
        cart.iter().map(|l| (l.id.as_str(), l.quantity)).collect()
    }

    // =========================================================================
    // add
    // =========================================================================

    #[test]
    fn test_add_new_product_appends_with_quantity_one() {
        let mut cart = Cart::new();
        assert_eq!(cart.add(item("a", 100)), AddOutcome::Appended);
        assert_eq!(cart.add(item("b", 200)), AddOutcome::Appended);

        assert_eq!(quantities(&cart), vec![("a", 1), ("b", 1)]);
        assert_eq!(cart.items()[1].price, Price::from_cents(200));
    }

    #[test]
    fn test_add_existing_product_increments_in_place() {
        let mut cart = Cart::new();
        cart.add(item("a", 100));
        cart.add(item("b", 200));

        assert_eq!(cart.add(item("a", 999)), AddOutcome::Incremented);
        assert_eq!(quantities(&cart), vec![("a", 2), ("b", 1)]);
        // Existing line keeps its original catalog fields
        assert_eq!(cart.items()[0].price, Price::from_cents(100));
    }

    #[test]
    fn test_add_after_negative_quantity_increments() {
        let mut cart = Cart::new();
        cart.add(item("a", 100));
        cart.decrement(&ProductId::new("a"));
        cart.decrement(&ProductId::new("a"));

        assert_eq!(cart.add(item("a", 100)), AddOutcome::Incremented);
        assert_eq!(quantities(&cart), vec![("a", 0)]);
    }

    // =========================================================================
    // increment / decrement
    // =========================================================================

    #[test]
    fn test_increment_absent_id_is_identity() {
        let mut cart = Cart::new();
        cart.add(item("a", 100));
        let before = cart.clone();

        assert!(!cart.increment(&ProductId::new("zzz")));
        assert_eq!(cart, before);
    }

    #[test]
    fn test_decrement_absent_id_is_identity() {
        let mut cart = Cart::new();
        cart.add(item("a", 100));
        let before = cart.clone();

        assert!(!cart.decrement(&ProductId::new("zzz")));
        assert_eq!(cart, before);
    }

    #[test]
    fn test_decrement_goes_negative_without_removal() {
        let mut cart = Cart::new();
        cart.add(item("a", 100));

        for _ in 0..3 {
            assert!(cart.decrement(&ProductId::new("a")));
        }

        assert_eq!(quantities(&cart), vec![("a", -2)]);
        assert_eq!(cart.total_quantity(), -2);
    }

    #[test]
    fn test_increment_only_touches_matching_line() {
        let mut cart = Cart::new();
        cart.add(item("a", 100));
        cart.add(item("b", 100));
        cart.add(item("c", 100));

        cart.increment(&ProductId::new("b"));
        assert_eq!(quantities(&cart), vec![("a", 1), ("b", 2), ("c", 1)]);
    }

    #[test]
    fn test_mutation_scenario() {
        let mut cart = Cart::new();

        cart.add(item("a", 1000));
        assert_eq!(quantities(&cart), vec![("a", 1)]);

        cart.add(item("a", 1000));
        assert_eq!(quantities(&cart), vec![("a", 2)]);

        cart.add(item("b", 500));
        assert_eq!(quantities(&cart), vec![("a", 2), ("b", 1)]);

        cart.decrement(&ProductId::new("a"));
        assert_eq!(quantities(&cart), vec![("a", 1), ("b", 1)]);
    }

    // =========================================================================
    // Serialization
    // =========================================================================

    #[test]
    fn test_cart_serializes_as_array() {
        let mut cart = Cart::new();
        cart.add(item("a", 1000));
        cart.add(item("b", 250));

        let json = serde_json::to_value(&cart).unwrap();
        let array = json.as_array().unwrap();
        assert_eq!(array.len(), 2);
        assert_eq!(array[0]["id"], "a");
        assert_eq!(array[1]["price"].as_f64(), Some(2.5));

        let restored: Cart = serde_json::from_value(json).unwrap();
        assert_eq!(restored, cart);
    }

    #[test]
    fn test_cart_rejects_duplicate_ids() {
        let json = r#"[
            {"id":"a","title":"t","image_url":"u","price":1,"quantity":1},
            {"id":"a","title":"t","image_url":"u","price":1,"quantity":2}
        ]"#;

        let err = serde_json::from_str::<Cart>(json).unwrap_err();
        assert!(err.to_string().contains("duplicate line item for product a"));
    }

    #[test]
    fn test_empty_array_is_empty_cart() {
        let cart: Cart = serde_json::from_str("[]").unwrap();
        assert!(cart.is_empty());
    }
}
