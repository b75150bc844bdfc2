//! Entity trait: identity + continuity across state changes.

use chrono::{DateTime, Utc};

/// Entity marker + minimal interface.
///
/// Items and inventories are entities: their identity never changes after
/// creation, whatever happens to their contents.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Copy + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> Self::Id;

    /// Time of the last mutation that changed the entity.
    fn last_updated(&self) -> DateTime<Utc>;
}
