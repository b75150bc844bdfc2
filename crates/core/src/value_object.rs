//! Value object trait: equality by value, not identity.
//!
//! Stacks, validations, filters and constraints are value objects. They have no
//! identity of their own, are freely copied, and serialize deterministically so
//! saved state replays the same way.

/// Marker trait for value objects.
///
/// Value objects are **immutable** and **compared by value**. To "modify" one,
/// build a new one.
///
/// ```ignore
/// #[derive(Debug, Clone, PartialEq)]
/// struct Budget {
///     limit: u64,
/// }
///
/// impl ValueObject for Budget {}
///
/// assert_eq!(Budget { limit: 5 }, Budget { limit: 5 });
/// ```
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
