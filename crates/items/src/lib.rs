//! Items, their typed properties, and the store that owns them.
//!
//! All mutation goes through [`ItemStore`]; every change is delivered
//! synchronously to the store's subscribers as one [`ItemChanged`] per call.

pub mod change;
pub mod item;
pub mod modifier;
pub mod property;
pub mod store;

pub use change::{ItemChanged, PropertyChange, PropertyUpdate};
pub use item::{DESTROYED_KEY, Item, ItemDraft};
pub use modifier::{FnModifier, Modifier, modifier};
pub use property::{Property, PropertyType, PropertyValue, Replacement, approx_eq};
pub use store::{ItemStore, StoreSnapshot};
