//! Count-limiting policy and the allocation algorithm that enforces it.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use stockpile_core::{ItemId, StoreError, StoreResult, ValueObject};
use stockpile_items::{Item, ItemStore};
use stockpile_validation::{Filter, ValidationStore};

use crate::stack::Stack;

/// Limit value meaning "no cap".
pub const UNBOUNDED: u64 = u64::MAX;

/// A per-item cap that applies to items accepted by `filter`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Restriction {
    pub filter: Filter,
    pub count_limit: u64,
}

impl ValueObject for Restriction {}

/// Global cap, default per-item cap, and filter-driven per-item overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "ConstraintRecord", into = "ConstraintRecord")]
pub struct Constraint {
    limit: u64,
    limit_default: u64,
    restrictions: Vec<Restriction>,
    is_ignored: bool,
}

impl ValueObject for Constraint {}

/// Outcome of [`Constraint::apply`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Allocation {
    /// Accepted counts, one stack per item id, in first-seen order.
    pub result: Vec<Stack>,
    /// Rejected counts, one stack per item id. Empty unless `overflowed`.
    pub overflow: Vec<Stack>,
    pub overflowed: bool,
}

#[derive(Debug)]
struct Tally {
    id: ItemId,
    count: u64,
    overflow: u64,
    limit: u64,
}

impl Constraint {
    pub fn new(limit: u64, limit_default: u64, restrictions: Vec<Restriction>) -> Self {
        let is_ignored = limit == UNBOUNDED && limit_default == UNBOUNDED && restrictions.is_empty();
        Self {
            limit,
            limit_default,
            restrictions,
            is_ignored,
        }
    }

    /// No limits at all.
    pub fn unbounded() -> Self {
        Self::new(UNBOUNDED, UNBOUNDED, Vec::new())
    }

    pub fn builder() -> ConstraintBuilder {
        ConstraintBuilder::default()
    }

    /// Build from signed bounds supplied by host data. Negative bounds are a
    /// configuration error.
    pub fn try_from_signed(
        limit: i64,
        limit_default: i64,
        restrictions: Vec<(Filter, i64)>,
    ) -> StoreResult<Self> {
        let bound = |name: &str, value: i64| {
            u64::try_from(value).map_err(|_| {
                StoreError::configuration(format!("constraint {name} cannot be negative ({value})"))
            })
        };
        let limit = bound("limit", limit)?;
        let limit_default = bound("default limit", limit_default)?;
        let restrictions = restrictions
            .into_iter()
            .map(|(filter, count_limit)| {
                Ok(Restriction {
                    filter,
                    count_limit: bound("restriction limit", count_limit)?,
                })
            })
            .collect::<StoreResult<Vec<_>>>()?;
        Ok(Self::new(limit, limit_default, restrictions))
    }

    pub fn limit(&self) -> u64 {
        self.limit
    }

    pub fn limit_default(&self) -> u64 {
        self.limit_default
    }

    pub fn restrictions(&self) -> &[Restriction] {
        &self.restrictions
    }

    pub fn is_ignored(&self) -> bool {
        self.is_ignored
    }

    /// Per-item cap for `item`: the smallest cap among restrictions whose
    /// filter accepts it, or the default when none do.
    pub fn limit_for(&self, item: &Item, operators: &ValidationStore) -> u64 {
        if self.is_ignored {
            return UNBOUNDED;
        }
        self.restrictions
            .iter()
            .filter(|r| r.filter.validate(operators, item))
            .map(|r| r.count_limit)
            .min()
            .unwrap_or(self.limit_default)
    }

    /// Allocate `requests` against this constraint.
    ///
    /// Requests are served in order; an earlier request wins over a later one,
    /// including a later request for the same item. Requests whose item the
    /// store cannot resolve are logged and dropped entirely.
    ///
    /// Budget accounting: a first request for an item advances the running
    /// total by the amount accepted, a repeat request by the full amount
    /// requested (overflowed counts are rejected, not free).
    pub fn apply(&self, requests: &[Stack], items: &ItemStore, operators: &ValidationStore) -> Allocation {
        let mut tallies: Vec<Tally> = Vec::new();
        let mut seen: HashMap<ItemId, usize> = HashMap::new();
        let mut count_total: u64 = 0;
        let mut overflowed = false;

        for request in requests {
            let requested = request.count();
            if requested == 0 {
                continue;
            }
            let budget = self.limit.saturating_sub(count_total);
            let is_filled = budget == 0;

            if let Some(&index) = seen.get(&request.id()) {
                let tally = &mut tallies[index];
                if is_filled || tally.count >= tally.limit {
                    tally.overflow += requested;
                    overflowed = true;
                } else {
                    // Bounded by the global budget too, so repeats cannot push
                    // the accepted total past `limit`.
                    let stack_budget = (tally.limit - tally.count).min(budget);
                    if requested <= stack_budget {
                        tally.count += requested;
                    } else {
                        tally.count += stack_budget;
                        tally.overflow += requested - stack_budget;
                        overflowed = true;
                    }
                }
                count_total = count_total.saturating_add(requested);
                continue;
            }

            let Some(item) = items.get(request.id()) else {
                tracing::warn!(item_id = %request.id(), count = requested, "allocation request for unknown item dropped");
                continue;
            };

            let limit = self.limit_for(item, operators);
            seen.insert(request.id(), tallies.len());

            if is_filled {
                tallies.push(Tally {
                    id: request.id(),
                    count: 0,
                    overflow: requested,
                    limit,
                });
                overflowed = true;
                count_total = count_total.saturating_add(requested);
                continue;
            }

            let accepted = requested.min(limit.min(budget));
            if accepted < requested {
                overflowed = true;
            }
            tallies.push(Tally {
                id: request.id(),
                count: accepted,
                overflow: requested - accepted,
                limit,
            });
            count_total = count_total.saturating_add(accepted);
        }

        let result = tallies
            .iter()
            .filter(|t| t.count > 0)
            .map(|t| Stack::new(t.id, t.count))
            .collect();
        let overflow = if overflowed {
            tallies
                .iter()
                .filter(|t| t.overflow > 0)
                .map(|t| Stack::new(t.id, t.overflow))
                .collect()
        } else {
            Vec::new()
        };

        Allocation {
            result,
            overflow,
            overflowed,
        }
    }
}

impl Default for Constraint {
    fn default() -> Self {
        Self::unbounded()
    }
}

/// Fluent construction of a [`Constraint`].
#[derive(Debug, Clone)]
pub struct ConstraintBuilder {
    limit: u64,
    limit_default: u64,
    restrictions: Vec<Restriction>,
}

impl Default for ConstraintBuilder {
    fn default() -> Self {
        Self {
            limit: UNBOUNDED,
            limit_default: UNBOUNDED,
            restrictions: Vec::new(),
        }
    }
}

impl ConstraintBuilder {
    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = limit;
        self
    }

    pub fn limit_default(mut self, limit: u64) -> Self {
        self.limit_default = limit;
        self
    }

    pub fn restrict(mut self, filter: Filter, count_limit: u64) -> Self {
        self.restrictions.push(Restriction { filter, count_limit });
        self
    }

    pub fn build(self) -> Constraint {
        Constraint::new(self.limit, self.limit_default, self.restrictions)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ConstraintRecord {
    limit: u64,
    limit_default: u64,
    #[serde(default)]
    restrictions: Vec<Restriction>,
}

impl From<ConstraintRecord> for Constraint {
    fn from(r: ConstraintRecord) -> Self {
        Constraint::new(r.limit, r.limit_default, r.restrictions)
    }
}

impl From<Constraint> for ConstraintRecord {
    fn from(c: Constraint) -> Self {
        ConstraintRecord {
            limit: c.limit,
            limit_default: c.limit_default,
            restrictions: c.restrictions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stack::total;
    use proptest::prelude::*;
    use stockpile_validation::{Operator, Validation};

    fn store_with(names: &[&str]) -> (ItemStore, Vec<ItemId>) {
        let mut store = ItemStore::new();
        let ids = names
            .iter()
            .map(|name| {
                let name = name.to_string();
                store.create_with(|item| {
                    item.set("name", name);
                })
            })
            .collect();
        (store, ids)
    }

    fn ops() -> ValidationStore {
        ValidationStore::with_builtin_operators()
    }

    fn ore_filter() -> Filter {
        Filter::builder()
            .all(Validation::string("name", Operator::EndsWith, ["ore"]))
            .build()
    }

    #[test]
    fn unbounded_constraint_is_ignored() {
        assert!(Constraint::unbounded().is_ignored());
        assert!(Constraint::default().is_ignored());
        assert!(!Constraint::builder().limit(3).build().is_ignored());
        assert!(!Constraint::builder().restrict(Filter::always(), UNBOUNDED).build().is_ignored());
    }

    #[test]
    fn earlier_request_is_filled_first() {
        let (store, ids) = store_with(&["a", "b"]);
        let (a, b) = (ids[0], ids[1]);
        let constraint = Constraint::builder().limit(5).build();

        let allocation = constraint.apply(&[Stack::new(a, 4), Stack::new(b, 4)], &store, &ops());

        assert_eq!(allocation.result, vec![Stack::new(a, 4), Stack::new(b, 1)]);
        assert_eq!(allocation.overflow, vec![Stack::new(b, 3)]);
        assert!(allocation.overflowed);
    }

    #[test]
    fn zero_requests_are_skipped() {
        let (store, ids) = store_with(&["a"]);
        let allocation = Constraint::builder()
            .limit(1)
            .build()
            .apply(&[Stack::empty(ids[0])], &store, &ops());

        assert_eq!(allocation, Allocation::default());
    }

    #[test]
    fn unknown_items_contribute_nothing() {
        let (store, ids) = store_with(&["a"]);
        let ghost = ItemId::from_raw(500);
        let constraint = Constraint::builder().limit(3).build();

        let allocation = constraint.apply(&[Stack::new(ghost, 10), Stack::new(ids[0], 2)], &store, &ops());

        assert_eq!(allocation.result, vec![Stack::new(ids[0], 2)]);
        assert!(allocation.overflow.is_empty());
        assert!(!allocation.overflowed);
    }

    #[test]
    fn restriction_caps_matching_items_and_default_caps_the_rest() {
        let (store, ids) = store_with(&["iron ore", "wood"]);
        let constraint = Constraint::builder()
            .limit_default(6)
            .restrict(ore_filter(), 2)
            .build();

        let allocation = constraint.apply(&[Stack::new(ids[0], 5), Stack::new(ids[1], 8)], &store, &ops());

        assert_eq!(allocation.result, vec![Stack::new(ids[0], 2), Stack::new(ids[1], 6)]);
        assert_eq!(allocation.overflow, vec![Stack::new(ids[0], 3), Stack::new(ids[1], 2)]);
    }

    #[test]
    fn tightest_matching_restriction_wins() {
        let (store, ids) = store_with(&["iron ore"]);
        let constraint = Constraint::builder()
            .restrict(Filter::always(), 10)
            .restrict(ore_filter(), 3)
            .build();

        assert_eq!(constraint.limit_for(store.first(ids[0]).unwrap(), &ops()), 3);
        let allocation = constraint.apply(&[Stack::new(ids[0], 7)], &store, &ops());
        assert_eq!(allocation.result, vec![Stack::new(ids[0], 3)]);
    }

    #[test]
    fn repeat_request_fills_remaining_item_budget_then_overflows() {
        let (store, ids) = store_with(&["a"]);
        let a = ids[0];
        let constraint = Constraint::builder().limit_default(5).build();

        let allocation = constraint.apply(
            &[Stack::new(a, 3), Stack::new(a, 4), Stack::new(a, 2)],
            &store,
            &ops(),
        );

        assert_eq!(allocation.result, vec![Stack::new(a, 5)]);
        assert_eq!(allocation.overflow, vec![Stack::new(a, 4)]);
    }

    #[test]
    fn repeat_requests_consume_global_budget_at_full_size() {
        // a: 2 accepted (total 2); a again: 1 fits the per-item cap, 3 overflow,
        // but all 4 count toward the total (6); b then finds the budget gone.
        let (store, ids) = store_with(&["a", "b"]);
        let (a, b) = (ids[0], ids[1]);
        let constraint = Constraint::builder().limit(6).limit_default(3).build();

        let allocation = constraint.apply(
            &[Stack::new(a, 2), Stack::new(a, 4), Stack::new(b, 1)],
            &store,
            &ops(),
        );

        assert_eq!(allocation.result, vec![Stack::new(a, 3)]);
        assert_eq!(allocation.overflow, vec![Stack::new(a, 3), Stack::new(b, 1)]);
    }

    #[test]
    fn first_requests_consume_global_budget_at_accepted_size() {
        // a is capped at 1 and only advances the total by 1, leaving 4 for b.
        let (store, ids) = store_with(&["iron ore", "b"]);
        let (a, b) = (ids[0], ids[1]);
        let constraint = Constraint::builder().limit(5).restrict(ore_filter(), 1).build();

        let allocation = constraint.apply(&[Stack::new(a, 4), Stack::new(b, 9)], &store, &ops());

        assert_eq!(allocation.result, vec![Stack::new(a, 1), Stack::new(b, 4)]);
        assert_eq!(allocation.overflow, vec![Stack::new(a, 3), Stack::new(b, 5)]);
    }

    #[test]
    fn negative_bounds_are_configuration_errors() {
        assert!(Constraint::try_from_signed(-1, 0, vec![]).is_err());
        assert!(Constraint::try_from_signed(1, 1, vec![(Filter::always(), -5)]).is_err());
        let ok = Constraint::try_from_signed(4, 2, vec![(Filter::always(), 1)]).unwrap();
        assert_eq!(ok.limit(), 4);
        assert_eq!(ok.restrictions()[0].count_limit, 1);
    }

    #[test]
    fn serialized_form_is_deterministic_and_recomputes_ignored() {
        let constraint = Constraint::builder().limit(4).restrict(ore_filter(), 2).build();
        let json = serde_json::to_string(&constraint).unwrap();
        assert_eq!(json, serde_json::to_string(&constraint.clone()).unwrap());
        assert!(!json.contains("is_ignored"));

        let back: Constraint = serde_json::from_str(&json).unwrap();
        assert_eq!(back, constraint);
    }

    fn request_strategy() -> impl Strategy<Value = Vec<(usize, u64)>> {
        prop::collection::vec((0usize..5, 0u64..20), 0..16)
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: accepted + overflow equals what was requested for items
        /// the store knows about.
        #[test]
        fn allocation_conserves_counts(
            requests in request_strategy(),
            limit in 0u64..40,
            limit_default in 0u64..25,
            ore_cap in 0u64..10,
        ) {
            // Index 4 is never created, so it plays the unknown item.
            let (store, mut ids) = store_with(&["iron ore", "wood", "gold ore", "stone"]);
            ids.push(ItemId::from_raw(900));
            let stacks: Vec<Stack> = requests.iter().map(|(i, c)| Stack::new(ids[*i], *c)).collect();
            let constraint = Constraint::builder()
                .limit(limit)
                .limit_default(limit_default)
                .restrict(ore_filter(), ore_cap)
                .build();

            let allocation = constraint.apply(&stacks, &store, &ops());

            let known: u64 = stacks.iter().filter(|s| store.contains(s.id())).map(Stack::count).sum();
            prop_assert_eq!(total(&allocation.result) + total(&allocation.overflow), known);
            prop_assert!(total(&allocation.result) <= limit);
            prop_assert_eq!(allocation.overflowed, !allocation.overflow.is_empty());
        }

        /// Property: with a global cap below the requested total, the accepted
        /// total stays within the cap and something overflows.
        #[test]
        fn global_cap_holds(
            requests in prop::collection::vec((0usize..4, 1u64..20), 1..12),
            limit in 0u64..30,
        ) {
            let (store, ids) = store_with(&["a", "b", "c", "d"]);
            let stacks: Vec<Stack> = requests.iter().map(|(i, c)| Stack::new(ids[*i], *c)).collect();
            prop_assume!(total(&stacks) > limit);

            let allocation = Constraint::builder().limit(limit).build().apply(&stacks, &store, &ops());

            prop_assert!(total(&allocation.result) <= limit);
            prop_assert!(!allocation.overflow.is_empty());
        }
    }
}
