//! The item registry.
//!
//! Items live in an arena indexed by their raw id. Ids come from a monotonic
//! sequence and are never reused, so a slot, once emptied, stays empty.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockpile_core::{
    Clock, IdSequence, InventoryId, ItemId, StoreError, StoreId, StoreResult, SystemClock,
};
use stockpile_events::{Observers, SubscriptionId, UpdateKinds};

use crate::change::ItemChanged;
use crate::item::{DESTROYED_KEY, Item, ItemDraft};
use crate::modifier::Modifier;
use crate::property::Property;

/// Exclusive owner and id allocator for all items.
pub struct ItemStore {
    id: StoreId,
    sequence: IdSequence,
    slots: Vec<Option<Item>>,
    len: usize,
    last_updated: DateTime<Utc>,
    modifiers: Vec<Box<dyn Modifier>>,
    observers: Observers<ItemChanged>,
    inventories: BTreeSet<InventoryId>,
    clock: Box<dyn Clock>,
}

/// Persisted store state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreSnapshot {
    pub next_id: u64,
    pub last_updated: DateTime<Utc>,
    pub items: Vec<Item>,
}

impl ItemStore {
    pub fn new() -> Self {
        Self::with_clock(Box::new(SystemClock))
    }

    pub fn with_clock(clock: Box<dyn Clock>) -> Self {
        let last_updated = clock.now();
        Self {
            id: StoreId::new(),
            sequence: IdSequence::new(),
            slots: Vec::new(),
            len: 0,
            last_updated,
            modifiers: Vec::new(),
            observers: Observers::new(),
            inventories: BTreeSet::new(),
            clock,
        }
    }

    /// Append a modifier to the creation pipeline.
    pub fn register_modifier(&mut self, modifier: impl Modifier + 'static) {
        tracing::debug!(modifier = modifier.name(), "modifier registered");
        self.modifiers.push(Box::new(modifier));
    }

    pub fn with_modifier(mut self, modifier: impl Modifier + 'static) -> Self {
        self.register_modifier(modifier);
        self
    }

    pub fn id(&self) -> StoreId {
        self.id
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn last_updated(&self) -> DateTime<Utc> {
        self.last_updated
    }

    /// The id the next allocation will return.
    pub fn next_id(&self) -> u64 {
        self.sequence.peek()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    // -- events ---------------------------------------------------------------

    /// Subscribe to the aggregated change stream of every item in the store.
    pub fn subscribe(&mut self, callback: impl FnMut(&ItemChanged) + 'static) -> SubscriptionId {
        self.observers.subscribe(callback)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.observers.unsubscribe(id)
    }

    fn publish(&mut self, event: ItemChanged) {
        self.last_updated = event.occurred_at;
        self.observers.notify(&event);
    }

    // -- creation -------------------------------------------------------------

    /// Create an item with no initial properties.
    pub fn create(&mut self) -> ItemId {
        self.create_with(|_| {})
    }

    /// Create an item.
    ///
    /// The initializer runs first, then every modifier whose predicate accepts
    /// the initialized draft. Values written by the initializer are re-applied
    /// last so they take priority over modifier defaults. The item is then
    /// published and a single `NEW` event carrying all properties is emitted.
    pub fn create_with(&mut self, initializer: impl FnOnce(&mut ItemDraft<'_>)) -> ItemId {
        let id = self.sequence.next_item();
        let now = self.clock.now();
        let mut item = Item::new(id, now);

        initializer(&mut ItemDraft::new(&mut item));
        let assigned: Vec<(String, Property)> = item
            .properties()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();

        for modifier in &self.modifiers {
            if modifier.is_valid(&item) {
                modifier.apply(&mut ItemDraft::new(&mut item));
            }
        }
        for (key, value) in assigned {
            item.stage(key, value);
        }

        item.mark_initialized();
        let event = item.take_changes(now, UpdateKinds::NEW, true);
        self.insert(item);

        tracing::debug!(item_id = %id, "item created");
        if let Some(event) = event {
            self.publish(event);
        }
        id
    }

    fn insert(&mut self, item: Item) {
        let slot = item.id().raw() as usize;
        if self.slots.len() <= slot {
            self.slots.resize_with(slot + 1, || None);
        }
        if self.slots[slot].replace(item).is_none() {
            self.len += 1;
        }
    }

    // -- lookup ---------------------------------------------------------------

    pub fn get(&self, id: ItemId) -> Option<&Item> {
        self.slots.get(id.raw() as usize).and_then(Option::as_ref)
    }

    fn get_mut(&mut self, id: ItemId) -> Option<&mut Item> {
        self.slots.get_mut(id.raw() as usize).and_then(Option::as_mut)
    }

    pub fn contains(&self, id: ItemId) -> bool {
        self.get(id).is_some()
    }

    /// Look up an item that must exist.
    pub fn first(&self, id: ItemId) -> StoreResult<&Item> {
        self.get(id).ok_or_else(|| {
            tracing::error!(item_id = %id, "item not found");
            StoreError::not_found(id)
        })
    }

    /// The lowest-id item accepted by `predicate`.
    pub fn first_where(&self, predicate: impl Fn(&Item) -> bool) -> Option<&Item> {
        self.iter().find(|item| predicate(item))
    }

    /// Items in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Item> {
        self.slots.iter().filter_map(Option::as_ref)
    }

    pub fn ids(&self) -> impl Iterator<Item = ItemId> + '_ {
        self.iter().map(Item::id)
    }

    pub fn matching<'a, P>(&'a self, predicate: P) -> impl Iterator<Item = &'a Item>
    where
        P: Fn(&Item) -> bool + 'a,
    {
        self.iter().filter(move |item| predicate(item))
    }

    pub fn to_vec(&self) -> Vec<Item> {
        self.iter().cloned().collect()
    }

    // -- mutation -------------------------------------------------------------

    /// Set one property and emit a change event if the value changed.
    pub fn set(
        &mut self,
        id: ItemId,
        key: impl Into<String>,
        value: impl Into<Property>,
    ) -> StoreResult<bool> {
        self.set_many(id, [(key.into(), value.into())])
    }

    /// Set several properties, emitting at most one batched event.
    pub fn set_many<K, V>(
        &mut self,
        id: ItemId,
        values: impl IntoIterator<Item = (K, V)>,
    ) -> StoreResult<bool>
    where
        K: Into<String>,
        V: Into<Property>,
    {
        self.stage_many(id, values)?;
        self.flush(id)
    }

    /// Write a property without emitting; see [`ItemStore::flush`].
    pub fn stage(
        &mut self,
        id: ItemId,
        key: impl Into<String>,
        value: impl Into<Property>,
    ) -> StoreResult<bool> {
        self.stage_many(id, [(key.into(), value.into())])
    }

    pub fn stage_many<K, V>(
        &mut self,
        id: ItemId,
        values: impl IntoIterator<Item = (K, V)>,
    ) -> StoreResult<bool>
    where
        K: Into<String>,
        V: Into<Property>,
    {
        let item = self.get_mut(id).ok_or(StoreError::not_found(id))?;
        let mut changed = false;
        for (key, value) in values {
            changed |= item.stage(key.into(), value.into());
        }
        Ok(changed)
    }

    /// Emit everything staged on `id` as one event. Returns false when nothing
    /// was pending.
    pub fn flush(&mut self, id: ItemId) -> StoreResult<bool> {
        let now = self.clock.now();
        let item = self.get_mut(id).ok_or(StoreError::not_found(id))?;
        match item.take_changes(now, UpdateKinds::UPDATED, false) {
            Some(event) => {
                self.publish(event);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Copy every property of `source` onto `target` except `ignored` keys, as
    /// one batched update.
    pub fn clone_properties(
        &mut self,
        target: ItemId,
        source: ItemId,
        ignored: &[&str],
    ) -> StoreResult<bool> {
        let values: Vec<(String, Property)> = self
            .first(source)?
            .properties()
            .filter(|(k, _)| !ignored.contains(k))
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();
        self.set_many(target, values)
    }

    /// Soft-delete: set the `destroyed` flag. The item stays in the registry.
    pub fn mark_destroyed(&mut self, id: ItemId) -> StoreResult<bool> {
        self.set(id, DESTROYED_KEY, true)
    }

    /// Remove an item from the registry and emit a `DESTROYED` event.
    pub fn remove(&mut self, id: ItemId) -> StoreResult<Item> {
        let slot = id.raw() as usize;
        let item = self
            .slots
            .get_mut(slot)
            .and_then(Option::take)
            .ok_or(StoreError::not_found(id))?;
        self.len -= 1;

        let event = ItemChanged {
            item_id: id,
            occurred_at: self.clock.now(),
            kinds: UpdateKinds::DESTROYED,
            changes: Default::default(),
        };
        tracing::debug!(item_id = %id, "item removed");
        self.publish(event);
        Ok(item)
    }

    // -- inventories ----------------------------------------------------------

    /// Allocate an inventory id from the shared sequence and register it.
    pub fn allocate_inventory(&mut self) -> InventoryId {
        let id = self.sequence.next_inventory();
        self.inventories.insert(id);
        id
    }

    /// Register an inventory restored from saved state.
    pub fn adopt_inventory(&mut self, id: InventoryId) -> StoreResult<()> {
        if id.raw() == 0 || id.raw() >= self.sequence.peek() {
            return Err(StoreError::invalid_argument(format!(
                "inventory {id} was not allocated by this store"
            )));
        }
        if self.contains(ItemId::from_raw(id.raw())) {
            return Err(StoreError::invalid_argument(format!(
                "inventory {id} collides with an item id"
            )));
        }
        if !self.inventories.insert(id) {
            return Err(StoreError::invalid_argument(format!(
                "inventory {id} is already registered"
            )));
        }
        Ok(())
    }

    pub fn release_inventory(&mut self, id: InventoryId) -> bool {
        self.inventories.remove(&id)
    }

    pub fn has_inventory(&self, id: InventoryId) -> bool {
        self.inventories.contains(&id)
    }

    // -- persistence ----------------------------------------------------------

    pub fn snapshot(&self) -> StoreSnapshot {
        StoreSnapshot {
            next_id: self.sequence.peek(),
            last_updated: self.last_updated,
            items: self.to_vec(),
        }
    }

    /// Rebuild a store from saved state. Modifiers and subscribers are not
    /// part of the saved state; register them again on the returned store.
    pub fn restore(snapshot: StoreSnapshot, clock: Box<dyn Clock>) -> StoreResult<Self> {
        let mut store = Self::with_clock(clock);
        store.sequence = IdSequence::resume(snapshot.next_id);
        store.last_updated = snapshot.last_updated;

        for item in snapshot.items {
            let id = item.id();
            if id.raw() == 0 || id.raw() >= snapshot.next_id {
                return Err(StoreError::invalid_argument(format!(
                    "item {id} is outside the saved id range"
                )));
            }
            if store.contains(id) {
                return Err(StoreError::invalid_argument(format!("duplicate item {id}")));
            }
            store.insert(item);
        }
        Ok(store)
    }
}

impl Default for ItemStore {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ItemStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ItemStore")
            .field("id", &self.id)
            .field("items", &self.len)
            .field("next_id", &self.sequence.peek())
            .field("modifiers", &self.modifiers.len())
            .field("observers", &self.observers)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::change::PropertyUpdate;
    use crate::modifier::modifier;
    use std::cell::RefCell;
    use std::rc::Rc;
    use stockpile_core::ManualClock;
    use stockpile_events::Event;

    fn recording(store: &mut ItemStore) -> Rc<RefCell<Vec<ItemChanged>>> {
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&log);
        store.subscribe(move |e| sink.borrow_mut().push(e.clone()));
        log
    }

    #[test]
    fn ids_are_monotonic_and_never_reused() {
        let mut store = ItemStore::new();
        let a = store.create();
        let b = store.create();
        store.remove(b).unwrap();
        let c = store.create();

        assert!(a < b && b < c);
        assert!(!store.contains(b));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn creation_fires_one_new_event_with_all_properties() {
        let mut store = ItemStore::new();
        let log = recording(&mut store);

        let id = store.create_with(|item| {
            item.set("name", "ore").set("count", 3);
        });

        let events = log.borrow();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].item_id, id);
        assert!(events[0].kinds.contains(UpdateKinds::NEW | UpdateKinds::PROPERTY));
        assert_eq!(events[0].changes.len(), 2);
        assert!(store.first(id).unwrap().is_initialized());
    }

    #[test]
    fn creation_event_fires_for_an_empty_item() {
        let mut store = ItemStore::new();
        let log = recording(&mut store);
        store.create();

        let events = log.borrow();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kinds, UpdateKinds::NEW);
    }

    #[test]
    fn modifiers_run_in_order_for_matching_items_only() {
        let mut store = ItemStore::new()
            .with_modifier(modifier("stamp count", |_| true, |item| {
                item.set("count", 0);
            }))
            .with_modifier(modifier(
                "tag ore",
                |item| item.value::<String>("name").as_deref() == Some("ore"),
                |item| {
                    item.set("tag", "mineral");
                },
            ))
            .with_modifier(modifier("bump count", |_| true, |item| {
                let current = item.item().value::<i64>("count").unwrap_or(0);
                item.set("count", current + 1);
            }));

        let ore = store.create_with(|item| {
            item.set("name", "ore");
        });
        let wood = store.create_with(|item| {
            item.set("name", "wood");
        });

        assert_eq!(store.first(ore).unwrap().value::<i64>("count"), Some(1));
        assert_eq!(
            store.first(ore).unwrap().value::<String>("tag").as_deref(),
            Some("mineral")
        );
        assert!(!store.first(wood).unwrap().contains_key("tag"));
    }

    #[test]
    fn initializer_values_win_over_modifier_defaults() {
        let mut store = ItemStore::new().with_modifier(modifier("default count", |_| true, |item| {
            item.set("count", 0);
        }));

        let id = store.create_with(|item| {
            item.set("count", 5);
        });

        assert_eq!(store.first(id).unwrap().value::<i64>("count"), Some(5));
    }

    #[test]
    fn set_many_batches_changes_into_one_event() {
        let mut store = ItemStore::new();
        let id = store.create_with(|item| {
            item.set("count", 1);
        });
        let log = recording(&mut store);

        let changed = store
            .set_many(id, [("count", Property::Int(2)), ("name", Property::from("ore"))])
            .unwrap();

        assert!(changed);
        let events = log.borrow();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].changes["count"].update, PropertyUpdate::Updated);
        assert_eq!(events[0].changes["name"].update, PropertyUpdate::New);
        assert!(events[0].kinds.contains(UpdateKinds::UPDATED | UpdateKinds::PROPERTY));
    }

    #[test]
    fn type_mismatch_or_unchanged_value_emits_nothing() {
        let mut store = ItemStore::new();
        let id = store.create_with(|item| {
            item.set("count", 1);
        });
        let log = recording(&mut store);

        assert!(!store.set(id, "count", "one").unwrap());
        assert!(!store.set(id, "count", 1).unwrap());

        assert!(log.borrow().is_empty());
        assert_eq!(store.first(id).unwrap().value::<i64>("count"), Some(1));
    }

    #[test]
    fn staged_changes_are_emitted_on_flush() {
        let mut store = ItemStore::new();
        let id = store.create();
        let log = recording(&mut store);

        store.stage(id, "a", 1).unwrap();
        store.stage(id, "b", true).unwrap();
        assert!(log.borrow().is_empty());
        assert!(store.first(id).unwrap().has_pending_changes());

        assert!(store.flush(id).unwrap());
        assert!(!store.flush(id).unwrap());
        assert_eq!(log.borrow().len(), 1);
        assert_eq!(log.borrow()[0].changes.len(), 2);
    }

    #[test]
    fn clone_properties_skips_ignored_keys() {
        let mut store = ItemStore::new();
        let source = store.create_with(|item| {
            item.set("name", "ore").set("count", 4).set("inventory", 9);
        });
        let target = store.create();

        store.clone_properties(target, source, &["inventory"]).unwrap();

        let target = store.first(target).unwrap();
        assert_eq!(target.value::<String>("name").as_deref(), Some("ore"));
        assert_eq!(target.value::<i64>("count"), Some(4));
        assert!(!target.contains_key("inventory"));
    }

    #[test]
    fn unknown_ids_fail_loudly_or_return_none() {
        let mut store = ItemStore::new();
        let missing = ItemId::from_raw(99);

        assert_eq!(store.first(missing).unwrap_err(), StoreError::ItemNotFound(missing));
        assert!(store.get(missing).is_none());
        assert!(store.set(missing, "a", 1).is_err());
    }

    #[test]
    fn remove_fires_destroyed_event() {
        let mut store = ItemStore::new();
        let id = store.create();
        let log = recording(&mut store);

        let removed = store.remove(id).unwrap();

        assert_eq!(removed.id(), id);
        assert!(log.borrow()[0].is_destroyed());
        assert_eq!(log.borrow()[0].event_type(), "items.item.destroyed");
        assert!(store.remove(id).is_err());
    }

    #[test]
    fn soft_destroy_keeps_item_registered() {
        let mut store = ItemStore::new();
        let id = store.create();
        store.mark_destroyed(id).unwrap();

        assert!(store.first(id).unwrap().is_destroyed());
        assert_eq!(store.matching(|i| !i.is_destroyed()).count(), 0);
    }

    #[test]
    fn events_stamp_store_clock_time() {
        let clock = Rc::new(ManualClock::default());
        let mut store = ItemStore::with_clock(Box::new(Rc::clone(&clock)));
        let id = store.create();

        clock.advance(chrono::Duration::seconds(30));
        store.set(id, "count", 2).unwrap();

        assert_eq!(store.last_updated(), clock.now());
        assert_eq!(store.first(id).unwrap().last_updated(), clock.now());
    }

    #[test]
    fn queries_enumerate_in_id_order() {
        let mut store = ItemStore::new();
        let a = store.create_with(|item| {
            item.set("count", 3);
        });
        let b = store.create_with(|item| {
            item.set("count", 7);
        });

        assert_eq!(store.ids().collect::<Vec<_>>(), vec![a, b]);
        assert_eq!(
            store.first_where(|i| i.value::<i64>("count") == Some(7)).map(Item::id),
            Some(b)
        );
        assert_eq!(store.to_vec().len(), 2);
    }

    #[test]
    fn snapshot_round_trips_through_json() {
        let mut store = ItemStore::new();
        let a = store.create_with(|item| {
            item.set("name", "ore").set("weight", 1.5).set("count", 2);
        });
        store.create();
        let inventory = store.allocate_inventory();

        let json = serde_json::to_string(&store.snapshot()).unwrap();
        let snapshot: StoreSnapshot = serde_json::from_str(&json).unwrap();
        let mut restored = ItemStore::restore(snapshot, Box::new(SystemClock)).unwrap();

        assert_eq!(restored.snapshot(), store.snapshot());
        assert_eq!(restored.first(a).unwrap(), store.first(a).unwrap());
        assert!(restored.first(a).unwrap().is_initialized());
        restored.adopt_inventory(inventory).unwrap();
        assert!(restored.create().raw() > inventory.raw());
    }

    #[test]
    fn restore_rejects_items_outside_the_id_range() {
        let mut store = ItemStore::new();
        store.create();
        let mut snapshot = store.snapshot();
        snapshot.next_id = 1;

        assert!(ItemStore::restore(snapshot, Box::new(SystemClock)).is_err());
    }

    #[test]
    fn inventory_ids_share_the_item_sequence() {
        let mut store = ItemStore::new();
        let item = store.create();
        let inventory = store.allocate_inventory();

        assert_eq!(inventory.raw(), item.raw() + 1);
        assert!(store.has_inventory(inventory));
        assert!(store.adopt_inventory(inventory).is_err());
        assert!(store.release_inventory(inventory));
        assert!(!store.has_inventory(inventory));
    }
}
