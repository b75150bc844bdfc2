//! Bitmask describing what a change event contains.

use serde::{Deserialize, Serialize};

/// Kinds of update carried by a change event.
///
/// Item events combine a lifecycle bit (`NEW`, `UPDATED`, `DESTROYED`) with
/// `PROPERTY` when property values are part of the payload.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UpdateKinds(u8);

impl UpdateKinds {
    pub const NONE: Self = Self(0);
    pub const NEW: Self = Self(1 << 0);
    pub const UPDATED: Self = Self(1 << 1);
    pub const DESTROYED: Self = Self(1 << 2);
    pub const PROPERTY: Self = Self(1 << 3);

    #[inline]
    #[must_use]
    pub const fn from_raw(raw: u8) -> Self {
        Self(raw)
    }

    #[inline]
    #[must_use]
    pub const fn raw(self) -> u8 {
        self.0
    }

    /// True when every bit of `other` is set.
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
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl core::ops::BitOr for UpdateKinds {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.with(rhs)
    }
}

impl core::ops::BitOrAssign for UpdateKinds {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}
