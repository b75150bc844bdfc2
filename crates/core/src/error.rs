//! Store error model.

use thiserror::Error;

use crate::id::{ItemId, StoreId};

/// Result type used across the store crates.
pub type StoreResult<T> = Result<T, StoreError>;

/// Store-level error.
///
/// Only programmer and configuration errors travel through this type. Expected
/// edge cases (a missing item inside a batch, a type mismatch on `set`, overflow
/// and underflow) are logged and reported as data instead.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Registry or policy set-up was inconsistent (duplicate operator, missing
    /// operator, overlapping flag bits).
    #[error("configuration error: {0}")]
    Configuration(String),

    /// An item id could not be resolved by the store.
    #[error("item {0} not found")]
    ItemNotFound(ItemId),

    /// A property was replaced with a value of a different type.
    #[error("type mismatch on '{key}': expected {expected}, found {found}")]
    TypeMismatch {
        key: String,
        expected: &'static str,
        found: &'static str,
    },

    /// A precondition on an argument was violated (e.g. a negative count).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// An inventory was used with a store other than the one it is bound to.
    #[error("inventory is bound to store {expected}, not {found}")]
    StoreMismatch { expected: StoreId, found: StoreId },

    /// A collection was mutated while a cursor over it was live.
    #[error("collection modified during iteration")]
    ConcurrentModification,
}

impl StoreError {
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub fn type_mismatch(key: impl Into<String>, expected: &'static str, found: &'static str) -> Self {
        Self::TypeMismatch {
            key: key.into(),
            expected,
            found,
        }
    }

    pub fn not_found(id: ItemId) -> Self {
        Self::ItemNotFound(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_mismatch_names_key_and_both_types() {
        let err = StoreError::type_mismatch("weight", "float", "string");
        assert!(matches!(err, StoreError::TypeMismatch { ref key, .. } if key == "weight"));
        assert_eq!(err.to_string(), "type mismatch on 'weight': expected float, found string");
    }
}
