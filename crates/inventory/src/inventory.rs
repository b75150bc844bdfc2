//! Inventories: ordered stacks of item ids bound to one item store.
//!
//! An inventory never owns items. Every mutation takes the store it was
//! created against, keeps each held item's count and inventory-id properties
//! in step with its stack, and emits one aggregated [`InventoryChanged`].

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockpile_core::{Entity, InventoryId, ItemId, StoreError, StoreId, StoreResult};
use stockpile_events::{Observers, SubscriptionId};
use stockpile_items::{ItemStore, Property};
use stockpile_validation::ValidationStore;

use crate::change::{InventoryChangeKind, InventoryChanged, ModificationResults, StackDelta};
use crate::config::InventoryConfig;
use crate::constraint::Constraint;
use crate::stack::{MAX_COUNT, Stack};

pub struct Inventory {
    id: InventoryId,
    store_id: StoreId,
    stacks: Vec<Stack>,
    last_updated: DateTime<Utc>,
    generation: u64,
    config: InventoryConfig,
    observers: Observers<InventoryChanged>,
}

/// What a withdrawal did, per item id, in first-request order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Withdrawal {
    pub results: ModificationResults,
    /// Amount actually taken.
    pub removed: Vec<Stack>,
    /// Stacks that stayed positive, with their new count.
    pub modified: Vec<Stack>,
    /// Stacks that reached zero and were dropped, with the count they held.
    pub destroyed: Vec<Stack>,
    /// Amount requested beyond what the inventory held.
    pub underflow: Vec<Stack>,
}

/// Outcome of [`Inventory::transfer`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transfer {
    pub withdrawal: Withdrawal,
    /// `NONE` when the withdrawal moved nothing and the deposit was skipped.
    pub deposited: ModificationResults,
}

/// Outcome of [`Inventory::deposit_constrained`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConstrainedDeposit {
    pub results: ModificationResults,
    pub deposited: Vec<Stack>,
    /// Requested counts the constraint turned away.
    pub overflow: Vec<Stack>,
}

/// Persisted inventory state. The store binding is not saved; a restored
/// inventory binds to the store it is restored against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventorySnapshot {
    pub id: InventoryId,
    pub last_updated: DateTime<Utc>,
    pub stacks: Vec<Stack>,
}

impl Inventory {
    pub fn new(store: &mut ItemStore) -> Self {
        Self::with_config(store, InventoryConfig::default())
    }

    pub fn with_config(store: &mut ItemStore, config: InventoryConfig) -> Self {
        let id = store.allocate_inventory();
        tracing::debug!(inventory_id = %id, store_id = %store.id(), "inventory created");
        Self {
            id,
            store_id: store.id(),
            stacks: Vec::new(),
            last_updated: store.now(),
            generation: 0,
            config,
            observers: Observers::new(),
        }
    }

    pub fn id(&self) -> InventoryId {
        self.id
    }

    pub fn store_id(&self) -> StoreId {
        self.store_id
    }

    pub fn config(&self) -> &InventoryConfig {
        &self.config
    }

    pub fn last_updated(&self) -> DateTime<Utc> {
        self.last_updated
    }

    /// Bumped by every mutation that changes a stack.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn stacks(&self) -> &[Stack] {
        &self.stacks
    }

    pub fn len(&self) -> usize {
        self.stacks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stacks.is_empty()
    }

    pub fn contains(&self, id: ItemId) -> bool {
        self.position(id).is_some()
    }

    /// Count held for `id`; 0 when there is no stack for it.
    pub fn count_of(&self, id: ItemId) -> u64 {
        self.position(id).map_or(0, |i| self.stacks[i].count())
    }

    pub fn total_count(&self) -> u64 {
        self.stacks.iter().map(Stack::count).sum()
    }

    /// A detached, generation-checked cursor over the stacks.
    pub fn cursor(&self) -> StackCursor {
        StackCursor {
            generation: self.generation,
            index: 0,
        }
    }

    pub fn subscribe(&mut self, callback: impl FnMut(&InventoryChanged) + 'static) -> SubscriptionId {
        self.observers.subscribe(callback)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.observers.unsubscribe(id)
    }

    fn position(&self, id: ItemId) -> Option<usize> {
        self.stacks.iter().position(|s| s.id() == id)
    }

    fn check_store(&self, store: &ItemStore) -> StoreResult<()> {
        if store.id() == self.store_id {
            Ok(())
        } else {
            Err(StoreError::StoreMismatch {
                expected: self.store_id,
                found: store.id(),
            })
        }
    }

    // -- additions ------------------------------------------------------------

    /// Add `requests`, creating a stack for every item not yet held.
    ///
    /// Requests for items the store does not know are logged and skipped.
    pub fn deposit(&mut self, store: &mut ItemStore, requests: &[Stack]) -> StoreResult<ModificationResults> {
        self.check_store(store)?;

        let mut accepted = Vec::with_capacity(requests.len());
        for request in requests.iter().filter(|r| !r.is_empty()) {
            if !store.contains(request.id()) {
                tracing::warn!(
                    inventory_id = %self.id,
                    item_id = %request.id(),
                    count = request.count(),
                    "deposit of unknown item skipped"
                );
                continue;
            }
            accepted.push(*request);
        }

        self.add(store, &accepted, true)
    }

    /// Add `requests` to stacks already held. Requests with no matching stack,
    /// or whose item the store no longer knows, are logged and ignored.
    ///
    /// A stack growing past [`MAX_COUNT`] fails the whole call with
    /// `InvalidArgument` and leaves the inventory untouched.
    pub fn increment(&mut self, store: &mut ItemStore, requests: &[Stack]) -> StoreResult<ModificationResults> {
        self.check_store(store)?;
        self.add(store, requests, false)
    }

    fn add(&mut self, store: &mut ItemStore, requests: &[Stack], create: bool) -> StoreResult<ModificationResults> {
        let mut stacks = self.stacks.clone();
        let mut deltas: Vec<StackDelta> = Vec::new();
        for request in requests.iter().filter(|r| !r.is_empty()) {
            let index = match stacks.iter().position(|s| s.id() == request.id()) {
                Some(index) => index,
                None if create => {
                    stacks.push(Stack::empty(request.id()));
                    stacks.len() - 1
                }
                None => {
                    tracing::warn!(inventory_id = %self.id, item_id = %request.id(), "no stack to increment");
                    continue;
                }
            };
            if !store.contains(request.id()) {
                tracing::warn!(inventory_id = %self.id, item_id = %request.id(), "increment of unknown item ignored");
                continue;
            }

            let old = stacks[index].count();
            stacks[index] = stacks[index].grown(request.count())?;
            let new = stacks[index].count();
            match deltas.iter_mut().find(|d| d.id == request.id()) {
                Some(delta) => delta.new = new,
                None => deltas.push(StackDelta {
                    id: request.id(),
                    old,
                    new,
                }),
            }
        }

        // Empty stacks only survive while they are about to be filled.
        stacks.retain(|s| !s.is_empty());
        self.stacks = stacks;
        deltas.retain(|d| d.old != d.new);
        if deltas.is_empty() {
            return Ok(ModificationResults::NONE);
        }

        for delta in &deltas {
            store.set_many(
                delta.id,
                [
                    (self.config.count_key.as_str(), Property::from(delta.new)),
                    (self.config.inventory_key.as_str(), Property::from(self.id.raw())),
                ],
            )?;
        }

        self.publish(store, InventoryChangeKind::Addition, deltas);
        Ok(ModificationResults::ADDED)
    }

    /// Run `constraint` over the current contents followed by `requests`, then
    /// deposit what it accepts. Current contents are served first, so what is
    /// already held never overflows in favour of a new request.
    pub fn deposit_constrained(
        &mut self,
        store: &mut ItemStore,
        operators: &ValidationStore,
        constraint: &Constraint,
        requests: &[Stack],
    ) -> StoreResult<ConstrainedDeposit> {
        self.check_store(store)?;
        if constraint.is_ignored() {
            let results = self.deposit(store, requests)?;
            let deposited = consolidate(requests)
                .into_iter()
                .filter(|s| store.contains(s.id()))
                .collect();
            return Ok(ConstrainedDeposit {
                results,
                deposited,
                overflow: Vec::new(),
            });
        }

        let mut batch = self.stacks.clone();
        batch.extend_from_slice(requests);
        let allocation = constraint.apply(&batch, store, operators);

        let mut deposited = Vec::new();
        let mut overflow = Vec::new();
        for request in consolidate(requests) {
            if !store.contains(request.id()) {
                continue;
            }
            let rejected = allocation
                .overflow
                .iter()
                .find(|s| s.id() == request.id())
                .map_or(0, Stack::count)
                .min(request.count());
            if rejected > 0 {
                overflow.push(Stack::new(request.id(), rejected));
            }
            if request.count() > rejected {
                deposited.push(Stack::new(request.id(), request.count() - rejected));
            }
        }

        if !overflow.is_empty() {
            tracing::debug!(inventory_id = %self.id, overflow = overflow.len(), "constrained deposit overflowed");
        }
        let results = self.deposit(store, &deposited)?;
        Ok(ConstrainedDeposit {
            results,
            deposited,
            overflow,
        })
    }

    // -- removals -------------------------------------------------------------

    /// Take `requests` out, reporting what could not be taken as underflow.
    ///
    /// Whatever can be removed is removed; there is no all-or-nothing
    /// rollback.
    pub fn withdraw(&mut self, store: &mut ItemStore, requests: &[Stack]) -> StoreResult<Withdrawal> {
        self.check_store(store)?;
        self.take(store, requests, InventoryChangeKind::Removal)
    }

    /// [`Inventory::withdraw`] reduced to its flags and underflow.
    pub fn decrement(
        &mut self,
        store: &mut ItemStore,
        requests: &[Stack],
    ) -> StoreResult<(ModificationResults, Vec<Stack>)> {
        let withdrawal = self.withdraw(store, requests)?;
        Ok((withdrawal.results, withdrawal.underflow))
    }

    /// Withdraw and drop the underflow, logging it.
    pub fn remove(&mut self, store: &mut ItemStore, requests: &[Stack]) -> StoreResult<ModificationResults> {
        let withdrawal = self.withdraw(store, requests)?;
        if !withdrawal.underflow.is_empty() {
            tracing::warn!(
                inventory_id = %self.id,
                underflow = ?withdrawal.underflow,
                "withdrawal underflow ignored"
            );
        }
        Ok(withdrawal.results)
    }

    /// Empty every stack and unregister from the store.
    pub fn destroy(mut self, store: &mut ItemStore) -> StoreResult<Withdrawal> {
        self.check_store(store)?;
        let everything = self.stacks.clone();
        let withdrawal = self.take(store, &everything, InventoryChangeKind::Destroyed)?;
        store.release_inventory(self.id);
        tracing::debug!(inventory_id = %self.id, "inventory destroyed");
        Ok(withdrawal)
    }

    /// Move `requests` from `source` to `destination`. Only what was actually
    /// withdrawn is deposited; when nothing was withdrawn the destination is
    /// left untouched.
    pub fn transfer(
        source: &mut Inventory,
        destination: &mut Inventory,
        store: &mut ItemStore,
        requests: &[Stack],
    ) -> StoreResult<Transfer> {
        source.check_store(store)?;
        destination.check_store(store)?;
        for request in consolidate(requests) {
            let moved = request.count().min(source.count_of(request.id()));
            Stack::new(request.id(), destination.count_of(request.id())).grown(moved)?;
        }

        let withdrawal = source.take(store, requests, InventoryChangeKind::Removal)?;
        if !withdrawal.results.changed_stacks() {
            return Ok(Transfer {
                withdrawal,
                deposited: ModificationResults::NONE,
            });
        }

        let deposited = destination.deposit(store, &withdrawal.removed)?;
        Ok(Transfer { withdrawal, deposited })
    }

    fn take(
        &mut self,
        store: &mut ItemStore,
        requests: &[Stack],
        kind: InventoryChangeKind,
    ) -> StoreResult<Withdrawal> {
        let mut withdrawal = Withdrawal::default();
        let mut deltas = Vec::new();

        for request in consolidate(requests) {
            let held = self.count_of(request.id());
            let taken = request.count().min(held);
            let missing = request.count() - taken;

            if missing > 0 {
                withdrawal.underflow.push(Stack::new(request.id(), missing));
                withdrawal.results |= ModificationResults::UNDERFLOW;
            }
            if taken == 0 {
                continue;
            }

            let remaining = held - taken;
            withdrawal.removed.push(Stack::new(request.id(), taken));
            deltas.push(StackDelta {
                id: request.id(),
                old: held,
                new: remaining,
            });
            if remaining == 0 {
                self.stacks.retain(|s| s.id() != request.id());
                withdrawal.destroyed.push(Stack::new(request.id(), held));
                withdrawal.results |= ModificationResults::DESTROYED;
            } else if let Some(index) = self.position(request.id()) {
                self.stacks[index] = Stack::new(request.id(), remaining);
                withdrawal.modified.push(Stack::new(request.id(), remaining));
                withdrawal.results |= ModificationResults::MODIFIED;
            }
        }

        if deltas.is_empty() {
            return Ok(withdrawal);
        }

        for delta in &deltas {
            if !store.contains(delta.id) {
                tracing::warn!(inventory_id = %self.id, item_id = %delta.id, "withdrawn item no longer in store");
                continue;
            }
            if delta.new == 0 {
                store.set_many(
                    delta.id,
                    [
                        (self.config.count_key.as_str(), Property::from(0u64)),
                        (self.config.inventory_key.as_str(), Property::from(0u64)),
                    ],
                )?;
            } else {
                store.set(delta.id, self.config.count_key.as_str(), delta.new)?;
            }
        }

        self.publish(store, kind, deltas);
        Ok(withdrawal)
    }

    fn publish(&mut self, store: &ItemStore, kind: InventoryChangeKind, deltas: Vec<StackDelta>) {
        self.generation += 1;
        self.last_updated = store.now();
        let event = InventoryChanged {
            inventory_id: self.id,
            occurred_at: self.last_updated,
            kind,
            deltas,
        };
        self.observers.notify(&event);
    }

    // -- persistence ----------------------------------------------------------

    pub fn snapshot(&self) -> InventorySnapshot {
        InventorySnapshot {
            id: self.id,
            last_updated: self.last_updated,
            stacks: self.stacks.clone(),
        }
    }

    /// Rebuild an inventory against `store`.
    ///
    /// The id must have been allocated by the store and not be in use. Empty
    /// stacks and stacks for items the store no longer holds are dropped with
    /// a warning; a repeated item id is an error.
    pub fn restore(snapshot: InventorySnapshot, store: &mut ItemStore, config: InventoryConfig) -> StoreResult<Self> {
        let mut stacks: Vec<Stack> = Vec::with_capacity(snapshot.stacks.len());
        for stack in snapshot.stacks {
            if stacks.iter().any(|s| s.id() == stack.id()) {
                return Err(StoreError::invalid_argument(format!(
                    "inventory {} holds item {} twice",
                    snapshot.id,
                    stack.id()
                )));
            }
            if stack.count() > MAX_COUNT {
                return Err(StoreError::invalid_argument(format!(
                    "inventory {} holds {} of item {}, above the stack limit",
                    snapshot.id,
                    stack.count(),
                    stack.id()
                )));
            }
            if stack.is_empty() || !store.contains(stack.id()) {
                tracing::warn!(inventory_id = %snapshot.id, item_id = %stack.id(), "saved stack dropped");
                continue;
            }
            stacks.push(stack);
        }
        store.adopt_inventory(snapshot.id)?;

        Ok(Self {
            id: snapshot.id,
            store_id: store.id(),
            stacks,
            last_updated: snapshot.last_updated,
            generation: 0,
            config,
            observers: Observers::new(),
        })
    }
}

impl Entity for Inventory {
    type Id = InventoryId;

    fn id(&self) -> InventoryId {
        self.id
    }

    fn last_updated(&self) -> DateTime<Utc> {
        self.last_updated
    }
}

impl fmt::Debug for Inventory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Inventory")
            .field("id", &self.id)
            .field("store_id", &self.store_id)
            .field("stacks", &self.stacks)
            .field("last_updated", &self.last_updated)
            .field("generation", &self.generation)
            .field("observers", &self.observers.len())
            .finish()
    }
}

/// Iteration over an inventory that does not hold a borrow of it.
///
/// Fails with [`StoreError::ConcurrentModification`] once the inventory has
/// been mutated since the cursor was taken.
#[derive(Debug, Clone)]
pub struct StackCursor {
    generation: u64,
    index: usize,
}

impl StackCursor {
    pub fn next(&mut self, inventory: &Inventory) -> StoreResult<Option<Stack>> {
        if inventory.generation != self.generation {
            return Err(StoreError::ConcurrentModification);
        }
        let stack = inventory.stacks.get(self.index).copied();
        if stack.is_some() {
            self.index += 1;
        }
        Ok(stack)
    }
}

/// Sum requests per item id, keeping first-appearance order and dropping
/// zero totals.
fn consolidate(requests: &[Stack]) -> Vec<Stack> {
    let mut merged: Vec<Stack> = Vec::new();
    for request in requests.iter().filter(|r| !r.is_empty()) {
        match merged.iter_mut().find(|s| s.id() == request.id()) {
            Some(stack) => *stack = stack.with_count(stack.count().saturating_add(request.count())),
            None => merged.push(*request),
        }
    }
    merged
}
