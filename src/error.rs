//! Error types of the inventory.

use thiserror::Error;

/// Errors returned by inventory operations.
///
/// These are the only two failure modes of the store: lock acquisition never
/// fails and there is no I/O involved.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InventoryError {
    /// The record supplied to an upsert is not acceptable
    #[error("Invalid record: {reason}")]
    InvalidRecord { reason: String },

    /// The requested identifier is not in the store
    #[error("Item '{0}' not found")]
    RecordNotFound(String),
}

/// Result type alias for inventory operations
pub type InventoryResult<T> = Result<T, InventoryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = InventoryError::RecordNotFound("apple".to_string());
        assert_eq!(err.to_string(), "Item 'apple' not found");

        let err = InventoryError::InvalidRecord {
            reason: "price must be non-negative, got -1".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid record: price must be non-negative, got -1"
        );
    }
}
