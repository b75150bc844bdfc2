//! `stockpile-core`: foundation building blocks for the item store.
//!
//! This crate contains pure primitives shared by every other crate: ids, the
//! error model, the clock seam and the entity / value-object markers.

pub mod clock;
pub mod entity;
pub mod error;
pub mod id;
pub mod value_object;

pub use clock::{Clock, ManualClock, SystemClock};
pub use entity::Entity;
pub use error::{StoreError, StoreResult};
pub use id::{IdSequence, InventoryId, ItemId, StoreId};
pub use value_object::ValueObject;
