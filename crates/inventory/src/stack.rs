use serde::{Deserialize, Serialize};

use stockpile_core::{ItemId, StoreError, StoreResult, ValueObject};

/// Largest count a stack may hold. Counts are mirrored into int properties.
pub const MAX_COUNT: u64 = i64::MAX as u64;

/// A counted, weak reference to an item.
///
/// The stack holds the item's id, never the item; resolving it goes through
/// the store. A zero count is a valid "empty" marker.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Stack {
    id: ItemId,
    count: u64,
}

impl ValueObject for Stack {}

impl Stack {
    pub const fn new(id: ItemId, count: u64) -> Self {
        Self { id, count }
    }

    pub const fn empty(id: ItemId) -> Self {
        Self { id, count: 0 }
    }

    /// Build from a signed count, as supplied by host code. Negative counts
    /// are rejected.
    pub fn try_from_signed(id: ItemId, count: i64) -> StoreResult<Self> {
        let count = u64::try_from(count).map_err(|_| {
            StoreError::invalid_argument(format!("stack count for item {id} cannot be negative ({count})"))
        })?;
        Ok(Self { id, count })
    }

    pub const fn id(&self) -> ItemId {
        self.id
    }

    pub const fn count(&self) -> u64 {
        self.count
    }

    pub const fn is_empty(&self) -> bool {
        self.count == 0
    }

    #[must_use]
    pub const fn with_count(self, count: u64) -> Self {
        Self { id: self.id, count }
    }

    /// This stack grown by `count`, or `InvalidArgument` past [`MAX_COUNT`].
    pub fn grown(self, count: u64) -> StoreResult<Self> {
        match self.count.checked_add(count) {
            Some(total) if total <= MAX_COUNT => Ok(self.with_count(total)),
            _ => Err(StoreError::invalid_argument(format!(
                "stack of item {} cannot grow from {} by {count}",
                self.id, self.count
            ))),
        }
    }
}

/// Total count across a slice of stacks.
pub fn total(stacks: &[Stack]) -> u64 {
    stacks.iter().map(Stack::count).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_counts_are_rejected() {
        let id = ItemId::from_raw(1);
        assert!(matches!(
            Stack::try_from_signed(id, -1),
            Err(StoreError::InvalidArgument(_))
        ));
        assert_eq!(Stack::try_from_signed(id, 3).unwrap(), Stack::new(id, 3));
    }

    #[test]
    fn growth_stops_at_max_count() {
        let stack = Stack::new(ItemId::from_raw(2), MAX_COUNT - 1);
        assert_eq!(stack.grown(1).unwrap().count(), MAX_COUNT);
        assert!(matches!(stack.grown(2), Err(StoreError::InvalidArgument(_))));
        assert!(matches!(
            Stack::empty(ItemId::from_raw(2)).grown(u64::MAX),
            Err(StoreError::InvalidArgument(_))
        ));
    }

    #[test]
    fn zero_count_is_an_empty_marker() {
        let stack = Stack::empty(ItemId::from_raw(4));
        assert!(stack.is_empty());
        assert!(!stack.with_count(2).is_empty());
        assert_eq!(stack.with_count(2).id(), ItemId::from_raw(4));
    }
}
