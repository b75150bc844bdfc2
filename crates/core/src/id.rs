//! Strongly-typed identifiers used across the store.

use core::str::FromStr;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::StoreError;

/// Identifier of an item. Unique for the lifetime of the owning store.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(u64);

/// Identifier of an inventory. Drawn from the same sequence as item ids.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InventoryId(u64);

/// Identity of an item store instance.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StoreId(Uuid);

macro_rules! impl_sequence_newtype {
    ($t:ty, $name:literal) => {
        impl $t {
            /// Wrap a raw sequence value.
            ///
            /// Ids are normally handed out by [`IdSequence`]; this exists for
            /// tests and for rebuilding references from saved state.
            pub const fn from_raw(raw: u64) -> Self {
                Self(raw)
            }

            pub const fn raw(self) -> u64 {
                self.0
            }
        }

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                core::fmt::Display::fmt(&self.0, f)
            }
        }

        impl From<$t> for u64 {
            fn from(value: $t) -> Self {
                value.0
            }
        }

        impl FromStr for $t {
            type Err = StoreError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let raw = u64::from_str(s)
                    .map_err(|e| StoreError::invalid_argument(format!("{}: {}", $name, e)))?;
                Ok(Self(raw))
            }
        }
    };
}

impl_sequence_newtype!(ItemId, "ItemId");
impl_sequence_newtype!(InventoryId, "InventoryId");

impl StoreId {
    /// Create a new store identity (UUIDv7, time-ordered).
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for StoreId {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Display for StoreId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Monotonic id counter shared by items and inventories.
///
/// Values start at 1 and are never reused; 0 is free to act as a "no id"
/// marker in property payloads.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdSequence {
    next: u64,
}

impl IdSequence {
    pub const fn new() -> Self {
        Self { next: 1 }
    }

    /// Resume a sequence from a saved `next` value.
    pub const fn resume(next: u64) -> Self {
        Self { next }
    }

    /// The value the next allocation will return.
    pub const fn peek(&self) -> u64 {
        self.next
    }

    pub fn next_item(&mut self) -> ItemId {
        ItemId(self.bump())
    }

    pub fn next_inventory(&mut self) -> InventoryId {
        InventoryId(self.bump())
    }

    fn bump(&mut self) -> u64 {
        let id = self.next;
        self.next += 1;
        id
    }
}

impl Default for IdSequence {
    fn default() -> Self {
        Self::new()
    }
}
