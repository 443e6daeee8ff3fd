//! Cart commands.
//!
//! # Usage
//!
//! ```bash
//! # Show the cart
//! pocket-cart show
//! pocket-cart show --json
//!
//! # Add one unit of a product
//! pocket-cart add --id sku-1 --title "Dried Pineapple" --price 8.50
//!
//! # Change a quantity
//! pocket-cart increment sku-1
//! pocket-cart decrement sku-1
//!
//! # Delete the persisted cart
//! pocket-cart clear
//! ```
//!
//! Mutating commands run inside a `CartProvider` scope and reach the store
//! through `use_cart()`.

use std::fmt::Write as _;

use pocket_cart_core::{Cart, CatalogItem, ProductId};
use pocket_cart_store::{
    CartConfig, CartError, CartStore, DiscardReason, FileStorage, Hydration, KeyValueStore,
    StorageError, use_cart,
};
use tracing::{debug, info, warn};

/// Open the file-backed cart described by `config`.
///
/// # Errors
///
/// Returns `CartError` if strict hydration is enabled and the persisted cart
/// cannot be read or parsed.
pub async fn open(config: &CartConfig) -> Result<CartStore, CartError> {
    let storage = FileStorage::new(&config.storage_dir);
    let (store, hydration) = CartStore::load(storage, config).await?;

    match hydration {
        Hydration::Restored(lines) => debug!(lines, key = %store.key(), "Loaded cart"),
        Hydration::Empty => debug!(key = %store.key(), "No saved cart"),
        Hydration::Discarded(DiscardReason::Corrupted(reason)) => {
            warn!(%reason, "Saved cart is unreadable and was ignored");
        }
        Hydration::Discarded(reason) => warn!(?reason, "Saved cart was ignored"),
    }

    Ok(store)
}

/// Add one unit of `item` and wait for it to be saved.
///
/// # Errors
///
/// Returns `CartError` if the cart could not be saved.
pub async fn add(item: CatalogItem) -> Result<Cart, CartError> {
    let cart = use_cart();
    let id = item.id.clone();
    cart.add_to_cart(item).await?;
    info!(product = %id, "Added to cart");
    Ok(cart.products())
}

/// Increment the quantity of `id` and wait for it to be saved.
///
/// # Errors
///
/// Returns `CartError` if the cart could not be saved.
pub async fn increment(id: &ProductId) -> Result<Cart, CartError> {
    let cart = use_cart();
    warn_if_absent(&cart, id);
    cart.increment(id).await?;
    Ok(cart.products())
}

/// Decrement the quantity of `id` and wait for it to be saved.
///
/// # Errors
///
/// Returns `CartError` if the cart could not be saved.
pub async fn decrement(id: &ProductId) -> Result<Cart, CartError> {
    let cart = use_cart();
    warn_if_absent(&cart, id);
    cart.decrement(id).await?;
    Ok(cart.products())
}

/// Delete the persisted cart slot.
///
/// # Errors
///
/// Returns `StorageError` if the slot exists but cannot be removed.
pub async fn clear(config: &CartConfig) -> Result<(), StorageError> {
    let key = config.storage_key();
    FileStorage::new(&config.storage_dir)
        .remove_item(key.as_str())
        .await?;
    info!(%key, "Cleared saved cart");
    Ok(())
}

fn warn_if_absent(cart: &CartStore, id: &ProductId) {
    if !cart.products().contains(id) {
        warn!(product = %id, "Product is not in the cart, nothing to change");
    }
}

/// Render the cart as pretty JSON or as a plain-text table.
///
/// # Errors
///
/// Returns `serde_json::Error` if JSON rendering fails.
pub fn render(cart: &Cart, json: bool) -> Result<String, serde_json::Error> {
    if json {
        return serde_json::to_string_pretty(cart);
    }

    if cart.is_empty() {
        return Ok("Cart is empty\n".to_string());
    }

    let rows: Vec<[String; 4]> = cart
        .iter()
        .map(|line| {
            [
                line.id.to_string(),
                line.title.clone(),
                line.price.to_string(),
                line.quantity.to_string(),
            ]
        })
        .collect();

    let header = ["ID", "TITLE", "PRICE", "QTY"];
    let mut widths = header.map(str::len);
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    write_row(&mut out, &header.map(String::from), &widths);
    for row in &rows {
        write_row(&mut out, row, &widths);
    }
    let _ = writeln!(
        out,
        "{} line(s), {} unit(s)",
        cart.len(),
        cart.total_quantity()
    );
    Ok(out)
}

fn write_row(out: &mut String, cells: &[String; 4], widths: &[usize; 4]) {
    let [id, title, price, qty] = cells;
    let [w_id, w_title, w_price, w_qty] = *widths;
    let _ = writeln!(
        out,
        "{id:<w_id$}  {title:<w_title$}  {price:>w_price$}  {qty:>w_qty$}"
    );
}
