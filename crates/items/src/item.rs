use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockpile_core::{Entity, ItemId, StoreError};
use stockpile_events::UpdateKinds;

use crate::change::{ItemChanged, PropertyChange, PropertyUpdate};
use crate::property::{Property, PropertyValue};

/// Bool property callers set to soft-delete an item.
///
/// The store does not act on it; processors and queries skip items carrying it.
pub const DESTROYED_KEY: &str = "destroyed";

/// Entity: an id plus a map of named, typed properties.
///
/// Items are owned by an [`ItemStore`](crate::ItemStore) and only mutated
/// through it, so every change reaches the store's event stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    id: ItemId,
    last_updated: DateTime<Utc>,
    initialized: bool,
    properties: BTreeMap<String, Property>,
    #[serde(skip)]
    pending: BTreeMap<String, PropertyChange>,
}

impl Item {
    pub(crate) fn new(id: ItemId, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            last_updated: created_at,
            initialized: false,
            properties: BTreeMap::new(),
            pending: BTreeMap::new(),
        }
    }

    pub fn id(&self) -> ItemId {
        self.id
    }

    pub fn last_updated(&self) -> DateTime<Utc> {
        self.last_updated
    }

    /// False only while modifiers and the initializer are still running.
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn get(&self, key: &str) -> Option<&Property> {
        self.properties.get(key)
    }

    /// Typed read. `None` when the key is absent or holds another type.
    pub fn value<T: PropertyValue>(&self, key: &str) -> Option<T> {
        self.properties.get(key).and_then(T::from_property)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.properties.contains_key(key)
    }

    pub fn properties(&self) -> impl Iterator<Item = (&str, &Property)> {
        self.properties.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    pub fn is_destroyed(&self) -> bool {
        self.value::<bool>(DESTROYED_KEY).unwrap_or(false)
    }

    /// True when staged changes have not been emitted yet.
    pub fn has_pending_changes(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Write one property into the pending change set.
    ///
    /// Existing keys go through a typed replacement: a value of another type is
    /// logged and dropped, the stored value is kept. Returns true when the
    /// stored value actually changed.
    pub(crate) fn stage(&mut self, key: String, value: Property) -> bool {
        match self.properties.get(&key) {
            Some(current) => {
                let Some(replacement) = current.try_replace(value.clone()) else {
                    let err = StoreError::type_mismatch(
                        key.as_str(),
                        current.property_type().name(),
                        value.property_type().name(),
                    );
                    tracing::error!(item_id = %self.id, error = %err, "value not replaced");
                    return false;
                };
                if !replacement.changed {
                    return false;
                }
                let update = match self.pending.get(&key) {
                    Some(PropertyChange {
                        update: PropertyUpdate::New,
                        ..
                    }) => PropertyUpdate::New,
                    _ => PropertyUpdate::Updated,
                };
                self.properties.insert(key.clone(), replacement.property.clone());
                self.pending.insert(
                    key,
                    PropertyChange {
                        property: replacement.property,
                        update,
                    },
                );
                true
            }
            None => {
                self.properties.insert(key.clone(), value.clone());
                self.pending.insert(
                    key,
                    PropertyChange {
                        property: value,
                        update: PropertyUpdate::New,
                    },
                );
                true
            }
        }
    }

    /// Drain the pending change set into one event.
    ///
    /// Returns `None` when nothing is pending, unless `always` is set (used for
    /// the creation event, which fires even for an item without properties).
    pub(crate) fn take_changes(
        &mut self,
        at: DateTime<Utc>,
        kinds: UpdateKinds,
        always: bool,
    ) -> Option<ItemChanged> {
        if self.pending.is_empty() && !always {
            return None;
        }
        self.last_updated = at;
        let changes = std::mem::take(&mut self.pending);
        let kinds = if changes.is_empty() {
            kinds
        } else {
            kinds | UpdateKinds::PROPERTY
        };
        Some(ItemChanged {
            item_id: self.id,
            occurred_at: at,
            kinds,
            changes,
        })
    }

    pub(crate) fn mark_initialized(&mut self) {
        self.initialized = true;
    }
}

impl Entity for Item {
    type Id = ItemId;

    fn id(&self) -> ItemId {
        self.id
    }

    fn last_updated(&self) -> DateTime<Utc> {
        self.last_updated
    }
}

/// Write access to an item that is still being created.
///
/// Handed to initializers and modifiers; changes made here are part of the
/// creation event rather than separate updates.
#[derive(Debug)]
pub struct ItemDraft<'a> {
    item: &'a mut Item,
}

impl<'a> ItemDraft<'a> {
    pub(crate) fn new(item: &'a mut Item) -> Self {
        Self { item }
    }

    pub fn id(&self) -> ItemId {
        self.item.id
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Property>) -> &mut Self {
        self.item.stage(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Property> {
        self.item.get(key)
    }

    pub fn item(&self) -> &Item {
        self.item
    }
}
