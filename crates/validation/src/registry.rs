//! Operator registry.
//!
//! Built once at start-up from an explicit registration table; there is no
//! discovery. Lookups are keyed by the value-type bit combined with the
//! operator bit.

use std::collections::HashMap;
use std::fmt;

use stockpile_core::{StoreError, StoreResult};
use stockpile_items::{Item, Property};

use crate::filter::Filter;
use crate::flags::{ValidationFlags, ValidationResult};
use crate::operators::{BUILTIN_OPERATORS, ValidationOperator};
use crate::validation::Validation;

#[derive(Default)]
pub struct ValidationStore {
    operators: HashMap<ValidationFlags, Box<dyn ValidationOperator>>,
}

impl ValidationStore {
    /// An empty registry. Every validation evaluates to `InValid` until
    /// operators are registered.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every built-in operator.
    pub fn with_builtin_operators() -> Self {
        let mut store = Self::new();
        for op in BUILTIN_OPERATORS {
            // A failure here is a bug in the static table; `register` has
            // already logged it.
            let registered = store.register(*op);
            debug_assert!(registered.is_ok(), "built-in operator table rejected: {registered:?}");
        }
        store
    }

    /// Register an operator.
    ///
    /// The value-type bits must be exactly one type, the operator bits exactly
    /// one operator that collides with neither the type bits nor `INVERT`. A
    /// second registration for the same key is rejected and the first stays.
    pub fn register(&mut self, operator: impl ValidationOperator + 'static) -> StoreResult<()> {
        let value_type = operator.value_type();
        let op = operator.operator();

        let result = Self::check_bits(value_type, op).and_then(|()| {
            let key = value_type | op;
            if self.operators.contains_key(&key) {
                return Err(StoreError::configuration(format!(
                    "duplicate operator registration for {key}"
                )));
            }
            self.operators.insert(key, Box::new(operator));
            Ok(())
        });

        if let Err(err) = &result {
            tracing::error!(error = %err, "operator registration rejected");
        }
        result
    }

    fn check_bits(value_type: ValidationFlags, op: ValidationFlags) -> StoreResult<()> {
        if !value_type.is_single() || value_type.value_type().is_none() {
            return Err(StoreError::configuration(format!(
                "operator value type {value_type} is not exactly one type bit"
            )));
        }
        if !op.is_single() {
            return Err(StoreError::configuration(format!(
                "operator flag {op} is not exactly one bit"
            )));
        }
        if op.has(ValidationFlags::TYPE_MASK) || op.has(ValidationFlags::INVERT) {
            return Err(StoreError::configuration(format!(
                "operator flag {op} collides with value type or invert bits"
            )));
        }
        if value_type.has(op) {
            return Err(StoreError::configuration(format!(
                "operator flag {op} overlaps value type {value_type}"
            )));
        }
        Ok(())
    }

    pub fn contains(&self, key: ValidationFlags) -> bool {
        self.operators.contains_key(&key.operator_key())
    }

    pub fn len(&self) -> usize {
        self.operators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operators.is_empty()
    }

    /// Check up front that an operator exists for `validation`.
    pub fn verify(&self, validation: &Validation) -> StoreResult<()> {
        if self.contains(validation.flags()) {
            Ok(())
        } else {
            Err(StoreError::configuration(format!(
                "no operator registered for '{}' ({})",
                validation.key(),
                validation.flags().operator_key()
            )))
        }
    }

    /// Check every validation in `filter`.
    pub fn verify_filter(&self, filter: &Filter) -> StoreResult<()> {
        filter.validations().try_for_each(|v| self.verify(v))
    }

    /// Run the registered operator and apply inversion.
    ///
    /// A missing operator is a configuration error: logged, and the validation
    /// fails.
    pub fn evaluate(&self, validation: &Validation, item: &Item, value: &Property) -> ValidationResult {
        let key = validation.flags().operator_key();
        let Some(operator) = self.operators.get(&key) else {
            tracing::error!(
                key = validation.key(),
                flags = %key,
                "no operator registered for validation"
            );
            return ValidationResult::InValid;
        };

        let result = operator.evaluate(validation, item, value);
        if validation.is_inverted() {
            result.invert()
        } else {
            result
        }
    }
}

impl fmt::Debug for ValidationStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<_> = self.operators.keys().copied().collect();
        keys.sort();
        f.debug_struct("ValidationStore").field("operators", &keys).finish()
    }
}
