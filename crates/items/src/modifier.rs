//! Modifier pipeline run on every newly created item.

use crate::item::{Item, ItemDraft};

/// A creation-time step: a validity predicate plus an action.
///
/// Every registered modifier whose predicate accepts the new item is applied,
/// in registration order, before the item becomes visible.
pub trait Modifier {
    fn is_valid(&self, item: &Item) -> bool;

    fn apply(&self, item: &mut ItemDraft<'_>);

    fn name(&self) -> &str {
        core::any::type_name::<Self>()
    }
}

/// Modifier built from a pair of closures.
pub struct FnModifier<P, A> {
    name: String,
    predicate: P,
    action: A,
}

impl<P, A> Modifier for FnModifier<P, A>
where
    P: Fn(&Item) -> bool,
    A: Fn(&mut ItemDraft<'_>),
{
    fn is_valid(&self, item: &Item) -> bool {
        (self.predicate)(item)
    }

    fn apply(&self, item: &mut ItemDraft<'_>) {
        (self.action)(item)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Build a named modifier from a predicate and an action.
pub fn modifier<P, A>(name: impl Into<String>, predicate: P, action: A) -> FnModifier<P, A>
where
    P: Fn(&Item) -> bool,
    A: Fn(&mut ItemDraft<'_>),
{
    FnModifier {
        name: name.into(),
        predicate,
        action,
    }
}
