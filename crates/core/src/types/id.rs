//! Newtype product identifier.
//!
//! Product IDs are opaque strings assigned by the catalog. Wrapping them keeps
//! them from being confused with titles or image URLs, which are also strings.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of a product in the catalog, unique per product.
///
/// A cart holds at most one line item per `ProductId`.
///
/// # Example
///
/// ```rust
/// # use pocket_cart_core::ProductId;
/// let id = ProductId::new("sku-123");
/// assert_eq!(id.as_str(), "sku-123");
/// assert_eq!(id.to_string(), "sku-123");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(String);

impl ProductId {
    /// Create a new product ID.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for ProductId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for ProductId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

impl From<ProductId> for String {
    fn from(id: ProductId) -> Self {
        id.0
    }
}

impl AsRef<str> for ProductId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
