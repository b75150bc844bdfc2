//! Stacks, count constraints, and inventories over an item store.
//!
//! - [`Stack`]: a counted reference to an item id
//! - [`Constraint`]: global, default and filter-driven per-item caps, and the
//!   allocation pass that enforces them
//! - [`Inventory`]: deposit, withdraw and transfer with underflow reporting

pub mod change;
pub mod config;
pub mod constraint;
pub mod inventory;
pub mod stack;

pub use change::{InventoryChangeKind, InventoryChanged, ModificationResults, StackDelta};
pub use config::{CountModifier, InventoryConfig};
pub use constraint::{Allocation, Constraint, ConstraintBuilder, Restriction, UNBOUNDED};
pub use inventory::{ConstrainedDeposit, Inventory, InventorySnapshot, StackCursor, Transfer, Withdrawal};
pub use stack::{MAX_COUNT, Stack, total};
