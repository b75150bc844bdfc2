//! Built-in operator implementations.
//!
//! Operators that compare against operands return `Ignored` when the
//! validation carries no operands. `EqualTo`, `Contains`, `StartsWith` and
//! `EndsWith` pass when any operand matches; `LessThan` and `GreaterThan`
//! must hold against every operand.

use stockpile_items::{Item, Property, approx_eq};

use crate::flags::{ValidationFlags, ValidationFlags as F, ValidationResult};
use crate::validation::Validation;

/// A pluggable operator, registered under its (value type, operator) bits.
pub trait ValidationOperator {
    /// Exactly one value-type bit.
    fn value_type(&self) -> ValidationFlags;

    /// Exactly one operator bit.
    fn operator(&self) -> ValidationFlags;

    /// Decide for a property already known to exist with the right type.
    /// Inversion is applied by the caller.
    fn evaluate(&self, validation: &Validation, item: &Item, value: &Property) -> ValidationResult;
}

type EvalFn = fn(&Validation, &Item, &Property) -> ValidationResult;

/// Operator backed by a plain function.
#[derive(Debug, Copy, Clone)]
pub struct FnOperator {
    value_type: ValidationFlags,
    operator: ValidationFlags,
    eval: EvalFn,
}

impl FnOperator {
    pub const fn new(value_type: ValidationFlags, operator: ValidationFlags, eval: EvalFn) -> Self {
        Self {
            value_type,
            operator,
            eval,
        }
    }
}

impl ValidationOperator for FnOperator {
    fn value_type(&self) -> ValidationFlags {
        self.value_type
    }

    fn operator(&self) -> ValidationFlags {
        self.operator
    }

    fn evaluate(&self, validation: &Validation, item: &Item, value: &Property) -> ValidationResult {
        (self.eval)(validation, item, value)
    }
}

/// The start-up registration table.
pub const BUILTIN_OPERATORS: &[FnOperator] = &[
    FnOperator::new(F::BOOL, F::EQUAL_TO, bool_equal_to),
    FnOperator::new(F::BOOL, F::DEFINED, defined),
    FnOperator::new(F::INT, F::EQUAL_TO, int_equal_to),
    FnOperator::new(F::INT, F::LESS_THAN, int_less_than),
    FnOperator::new(F::INT, F::GREATER_THAN, int_greater_than),
    FnOperator::new(F::INT, F::DEFINED, defined),
    FnOperator::new(F::FLOAT, F::EQUAL_TO, float_equal_to),
    FnOperator::new(F::FLOAT, F::LESS_THAN, float_less_than),
    FnOperator::new(F::FLOAT, F::GREATER_THAN, float_greater_than),
    FnOperator::new(F::FLOAT, F::DEFINED, defined),
    FnOperator::new(F::STRING, F::EQUAL_TO, string_equal_to),
    FnOperator::new(F::STRING, F::CONTAINS, string_contains),
    FnOperator::new(F::STRING, F::STARTS_WITH, string_starts_with),
    FnOperator::new(F::STRING, F::ENDS_WITH, string_ends_with),
    FnOperator::new(F::STRING, F::DEFINED, defined),
];

fn defined(_: &Validation, _: &Item, _: &Property) -> ValidationResult {
    ValidationResult::Valid
}

fn any_of<T>(operands: &[T], pred: impl Fn(&T) -> bool) -> ValidationResult {
    if operands.is_empty() {
        return ValidationResult::Ignored;
    }
    ValidationResult::from_bool(operands.iter().any(pred))
}

fn all_of<T>(operands: &[T], pred: impl Fn(&T) -> bool) -> ValidationResult {
    if operands.is_empty() {
        return ValidationResult::Ignored;
    }
    ValidationResult::from_bool(operands.iter().all(pred))
}

fn bool_equal_to(v: &Validation, _: &Item, value: &Property) -> ValidationResult {
    match value.as_bool() {
        Some(actual) => any_of(v.bools(), |b| *b == actual),
        None => ValidationResult::InValid,
    }
}

fn int_equal_to(v: &Validation, _: &Item, value: &Property) -> ValidationResult {
    match value.as_int() {
        Some(actual) => any_of(v.ints(), |n| *n == actual),
        None => ValidationResult::InValid,
    }
}

fn int_less_than(v: &Validation, _: &Item, value: &Property) -> ValidationResult {
    match value.as_int() {
        Some(actual) => all_of(v.ints(), |n| actual < *n),
        None => ValidationResult::InValid,
    }
}

fn int_greater_than(v: &Validation, _: &Item, value: &Property) -> ValidationResult {
    match value.as_int() {
        Some(actual) => all_of(v.ints(), |n| actual > *n),
        None => ValidationResult::InValid,
    }
}

fn float_equal_to(v: &Validation, _: &Item, value: &Property) -> ValidationResult {
    match value.as_float() {
        Some(actual) => any_of(v.floats(), |x| approx_eq(*x, actual)),
        None => ValidationResult::InValid,
    }
}

fn float_less_than(v: &Validation, _: &Item, value: &Property) -> ValidationResult {
    match value.as_float() {
        Some(actual) => all_of(v.floats(), |x| actual < *x),
        None => ValidationResult::InValid,
    }
}

fn float_greater_than(v: &Validation, _: &Item, value: &Property) -> ValidationResult {
    match value.as_float() {
        Some(actual) => all_of(v.floats(), |x| actual > *x),
        None => ValidationResult::InValid,
    }
}

// Null strings match nothing.

fn string_equal_to(v: &Validation, _: &Item, value: &Property) -> ValidationResult {
    let actual = value.as_str();
    any_of(v.strings(), |s| actual == Some(s.as_str()))
}

fn string_contains(v: &Validation, _: &Item, value: &Property) -> ValidationResult {
    let actual = value.as_str();
    any_of(v.strings(), |s| actual.is_some_and(|a| a.contains(s.as_str())))
}

fn string_starts_with(v: &Validation, _: &Item, value: &Property) -> ValidationResult {
    let actual = value.as_str();
    any_of(v.strings(), |s| actual.is_some_and(|a| a.starts_with(s.as_str())))
}

fn string_ends_with(v: &Validation, _: &Item, value: &Property) -> ValidationResult {
    let actual = value.as_str();
    any_of(v.strings(), |s| actual.is_some_and(|a| a.ends_with(s.as_str())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flags::Operator;
    use crate::registry::ValidationStore;
    use stockpile_core::ItemId;
    use stockpile_items::{ItemStore, PropertyType};

    fn fixture() -> (ItemStore, ItemId) {
        let mut store = ItemStore::new();
        let id = store.create_with(|item| {
            item.set("ready", true)
                .set("count", 4)
                .set("weight", 2.5)
                .set("name", "iron ore")
                .set("label", None::<String>);
        });
        (store, id)
    }

    fn check(v: Validation) -> ValidationResult {
        let operators = ValidationStore::with_builtin_operators();
        let (store, id) = fixture();
        v.validate(&operators, store.first(id).unwrap())
    }

    use ValidationResult::{Ignored, InValid, Valid};

    #[test]
    fn bool_operators() {
        assert_eq!(check(Validation::bool("ready", Operator::EqualTo, [true])), Valid);
        assert_eq!(check(Validation::bool("ready", Operator::EqualTo, [false])), InValid);
        assert_eq!(check(Validation::bool("ready", Operator::EqualTo, [false]).inverted()), Valid);
        assert_eq!(check(Validation::defined("ready", PropertyType::Bool)), Valid);
    }

    #[test]
    fn int_operators() {
        assert_eq!(check(Validation::int("count", Operator::EqualTo, [1, 4])), Valid);
        assert_eq!(check(Validation::int("count", Operator::LessThan, [5, 10])), Valid);
        assert_eq!(check(Validation::int("count", Operator::LessThan, [5, 3])), InValid);
        assert_eq!(check(Validation::int("count", Operator::GreaterThan, [3])), Valid);
        assert_eq!(check(Validation::int("count", Operator::GreaterThan, [4])), InValid);
    }

    #[test]
    fn float_operators() {
        assert_eq!(check(Validation::float("weight", Operator::EqualTo, [2.5])), Valid);
        assert_eq!(check(Validation::float("weight", Operator::LessThan, [3.0])), Valid);
        assert_eq!(check(Validation::float("weight", Operator::GreaterThan, [3.0])), InValid);
    }

    #[test]
    fn string_operators() {
        assert_eq!(check(Validation::string("name", Operator::EqualTo, ["iron ore"])), Valid);
        assert_eq!(check(Validation::string("name", Operator::Contains, ["copper", "on o"])), Valid);
        assert_eq!(check(Validation::string("name", Operator::StartsWith, ["iron"])), Valid);
        assert_eq!(check(Validation::string("name", Operator::EndsWith, ["iron"])), InValid);
        assert_eq!(check(Validation::string("name", Operator::EndsWith, ["iron"]).inverted()), Valid);
    }

    #[test]
    fn null_string_matches_nothing_but_is_defined() {
        assert_eq!(check(Validation::string("label", Operator::Contains, [""])), InValid);
        assert_eq!(check(Validation::defined("label", PropertyType::String)), Valid);
    }

    #[test]
    fn missing_operands_are_ignored_and_stay_ignored_when_inverted() {
        let none: [i64; 0] = [];
        assert_eq!(check(Validation::int("count", Operator::EqualTo, none)), Ignored);
        assert_eq!(check(Validation::int("count", Operator::EqualTo, none).inverted()), Ignored);
    }
}
