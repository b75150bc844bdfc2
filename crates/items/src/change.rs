//! Item change events.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockpile_core::ItemId;
use stockpile_events::{Event, UpdateKinds};

use crate::property::Property;

/// Whether a property key was introduced or overwritten.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyUpdate {
    New,
    Updated,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyChange {
    pub property: Property,
    pub update: PropertyUpdate,
}

/// Event: one batched change to an item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemChanged {
    pub item_id: ItemId,
    pub occurred_at: DateTime<Utc>,
    pub kinds: UpdateKinds,
    pub changes: BTreeMap<String, PropertyChange>,
}

impl ItemChanged {
    pub fn is_new(&self) -> bool {
        self.kinds.contains(UpdateKinds::NEW)
    }

    pub fn is_destroyed(&self) -> bool {
        self.kinds.contains(UpdateKinds::DESTROYED)
    }

    /// The new value of `key`, if this event changed it.
    pub fn changed(&self, key: &str) -> Option<&Property> {
        self.changes.get(key).map(|c| &c.property)
    }
}

impl Event for ItemChanged {
    fn event_type(&self) -> &'static str {
        if self.is_destroyed() {
            "items.item.destroyed"
        } else if self.is_new() {
            "items.item.created"
        } else {
            "items.item.updated"
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }
}
