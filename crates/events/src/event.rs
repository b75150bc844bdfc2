use chrono::{DateTime, Utc};

/// A change notification emitted by a store or an inventory.
///
/// Notifications are facts about a mutation that already happened. They are
/// handed to subscribers by reference, inline, before the mutating call
/// returns.
pub trait Event: Clone + core::fmt::Debug + 'static {
    /// Dotted name, e.g. `items.item.updated`.
    fn event_type(&self) -> &'static str;

    /// Payload schema version.
    fn version(&self) -> u32;

    /// Store clock time of the mutation.
    fn occurred_at(&self) -> DateTime<Utc>;
}
