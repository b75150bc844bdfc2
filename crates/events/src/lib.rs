//! Change notification primitives shared by items and inventories.

pub mod event;
pub mod kinds;
pub mod observer;

pub use event::Event;
pub use kinds::UpdateKinds;
pub use observer::{Observers, SubscriptionId};
