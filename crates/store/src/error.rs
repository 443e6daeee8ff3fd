//! Error types for the cart store.

use thiserror::Error;

use crate::storage::StorageError;

/// Cart store error type.
#[derive(Debug, Error)]
pub enum CartError {
    /// Reading or writing the persistence slot failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// The cart could not be serialized for persistence.
    #[error("Serialization error: {0}")]
    Serialization(#[source] serde_json::Error),

    /// The persisted snapshot exists but does not parse as a cart.
    #[error("Corrupt cart snapshot: {0}")]
    CorruptSnapshot(#[source] serde_json::Error),

    /// The cart was accessed outside of a `CartProvider` scope.
    #[error("Cart accessed outside of a CartProvider")]
    OutsideProvider,

    /// The background writer is gone, so the write was never applied.
    #[error("Cart writer has shut down")]
    WriterClosed,

    /// Strict hydration failed, so writes are refused to keep the slot intact.
    #[error("Cart persistence is disabled after a failed hydration")]
    PersistenceDisabled,

    /// The background hydration task panicked or was cancelled.
    #[error("Hydration task failed: {0}")]
    Hydration(#[from] tokio::task::JoinError),
}

/// Result type alias for `CartError`.
pub type Result<T> = std::result::Result<T, CartError>;

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_cart_error_display() {
        assert_eq!(
            CartError::OutsideProvider.to_string(),
            "Cart accessed outside of a CartProvider"
        );

        let err = CartError::from(StorageError::Unavailable("disk full".to_string()));
        assert_eq!(err.to_string(), "Storage error: Storage unavailable: disk full");
    }

    #[test]
    fn test_corrupt_snapshot_keeps_source() {
        let source = serde_json::from_str::<Vec<u8>>("{").unwrap_err();
        let err = CartError::CorruptSnapshot(source);
        assert!(std::error::Error::source(&err).is_some());
    }
}
