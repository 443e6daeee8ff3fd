//! Pocket Cart Core - Cart domain types.
//!
//! This crate provides the types shared by every Pocket Cart component:
//! - `store` - Cart store with key-value persistence
//! - `cli` - Command-line front end for a file-backed cart
//!
//! # Architecture
//!
//! The core crate contains only types and pure mutation logic - no I/O, no
//! storage access, no async runtime. Persistence lives in `pocket-cart-store`.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for product IDs and prices, plus line items
//! - [`cart`] - The ordered, id-unique [`Cart`] and its mutations

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod types;

pub use cart::{AddOutcome, Cart, CartInvariantError};
pub use types::*;
