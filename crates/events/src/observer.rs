//! Synchronous observer list.
//!
//! Every emitting component (item store, inventory) owns one of these. Events
//! are handed to subscribers inline, in registration order, during the call
//! that caused them. There is no queue and no deferred dispatch.

use std::fmt;

/// Handle returned by [`Observers::subscribe`], used to unsubscribe.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Callback<E> = Box<dyn FnMut(&E)>;

/// Ordered list of event callbacks.
pub struct Observers<E> {
    next_id: u64,
    subscribers: Vec<(SubscriptionId, Callback<E>)>,
}

impl<E> Observers<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback. It runs after every callback registered before it.
    pub fn subscribe(&mut self, callback: impl FnMut(&E) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.subscribers.push((id, Box::new(callback)));
        id
    }

    /// Remove a callback. Returns false when the id was unknown.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sid, _)| *sid != id);
        before != self.subscribers.len()
    }

    /// Deliver `event` to every subscriber.
    pub fn notify(&mut self, event: &E) {
        for (_, callback) in self.subscribers.iter_mut() {
            callback(event);
        }
    }

    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }
}

impl<E> Default for Observers<E> {
    fn default() -> Self {
        Self {
            next_id: 0,
            subscribers: Vec::new(),
        }
    }
}

impl<E> fmt::Debug for Observers<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observers")
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}
