use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockpile_core::{InventoryId, ItemId};
use stockpile_events::Event;

/// Outcome flags of an inventory mutation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModificationResults(u8);

impl ModificationResults {
    pub const NONE: Self = Self(0);
    /// A stack was created or grew.
    pub const ADDED: Self = Self(1 << 0);
    /// A stack shrank and is still positive.
    pub const MODIFIED: Self = Self(1 << 1);
    /// A stack reached zero and was removed.
    pub const DESTROYED: Self = Self(1 << 2);
    /// Part of a request could not be removed.
    pub const UNDERFLOW: Self = Self(1 << 3);

    #[inline]
    #[must_use]
    pub const fn raw(self) -> u8 {
        self.0
    }

    #[inline]
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }

    #[inline]
    #[must_use]
    pub const fn with(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    #[inline]
    #[must_use]
    pub const fn is_none(self) -> bool {
        self.0 == 0
    }

    /// True when any stack was added, modified or destroyed.
    #[inline]
    #[must_use]
    pub const fn changed_stacks(self) -> bool {
        (self.0 & (Self::ADDED.0 | Self::MODIFIED.0 | Self::DESTROYED.0)) != 0
    }
}

impl core::ops::BitOr for ModificationResults {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.with(rhs)
    }
}

impl core::ops::BitOrAssign for ModificationResults {
    fn bitor_assign(&mut self, rhs: Self) {
        *self = self.with(rhs);
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InventoryChangeKind {
    Addition,
    Removal,
    Destroyed,
}

/// Count change of one item within an inventory.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackDelta {
    pub id: ItemId,
    pub old: u64,
    pub new: u64,
}

impl StackDelta {
    pub fn delta(&self) -> i64 {
        // Counts stay far below i64::MAX in practice; saturate rather than wrap.
        let old = i64::try_from(self.old).unwrap_or(i64::MAX);
        let new = i64::try_from(self.new).unwrap_or(i64::MAX);
        new - old
    }
}

/// Aggregated change event emitted once per inventory mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryChanged {
    pub inventory_id: InventoryId,
    pub occurred_at: DateTime<Utc>,
    pub kind: InventoryChangeKind,
    pub deltas: Vec<StackDelta>,
}

impl InventoryChanged {
    pub fn delta_for(&self, id: ItemId) -> Option<&StackDelta> {
        self.deltas.iter().find(|d| d.id == id)
    }
}

impl Event for InventoryChanged {
    fn event_type(&self) -> &'static str {
        match self.kind {
            InventoryChangeKind::Addition => "inventory.stack.added",
            InventoryChangeKind::Removal => "inventory.stack.removed",
            InventoryChangeKind::Destroyed => "inventory.destroyed",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }
}
