use serde::{Deserialize, Serialize};

use stockpile_core::ValueObject;
use stockpile_items::Item;

use crate::flags::ValidationResult;
use crate::registry::ValidationStore;
use crate::validation::Validation;

/// Boolean combinator over validations.
///
/// An item passes when no `All` validation is `InValid`, no `None` validation
/// is `Valid`, and either `Any` is empty or at least one of its validations
/// is exactly `Valid`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "FilterRecord", into = "FilterRecord")]
pub struct Filter {
    all: Vec<Validation>,
    none: Vec<Validation>,
    any: Vec<Validation>,
    always_valid: bool,
}

impl ValueObject for Filter {}

impl Default for Filter {
    fn default() -> Self {
        Self::always()
    }
}

impl Filter {
    pub fn new(all: Vec<Validation>, none: Vec<Validation>, any: Vec<Validation>) -> Self {
        let always_valid = all.is_empty() && none.is_empty() && any.is_empty();
        Self {
            all,
            none,
            any,
            always_valid,
        }
    }

    /// A filter that accepts every item.
    pub fn always() -> Self {
        Self::new(Vec::new(), Vec::new(), Vec::new())
    }

    pub fn builder() -> FilterBuilder {
        FilterBuilder::default()
    }

    pub fn all(&self) -> &[Validation] {
        &self.all
    }

    pub fn none(&self) -> &[Validation] {
        &self.none
    }

    pub fn any(&self) -> &[Validation] {
        &self.any
    }

    pub fn is_always_valid(&self) -> bool {
        self.always_valid
    }

    /// Every validation in `All`, `None`, `Any` order.
    pub fn validations(&self) -> impl Iterator<Item = &Validation> {
        self.all.iter().chain(&self.none).chain(&self.any)
    }

    pub fn validate(&self, operators: &ValidationStore, item: &Item) -> bool {
        if self.always_valid {
            return true;
        }

        for v in &self.all {
            if v.validate(operators, item) == ValidationResult::InValid {
                return false;
            }
        }

        for v in &self.none {
            if v.validate(operators, item) == ValidationResult::Valid {
                return false;
            }
        }

        if self.any.is_empty() {
            return true;
        }
        self.any
            .iter()
            .any(|v| v.validate(operators, item) == ValidationResult::Valid)
    }
}

/// Fluent construction of a [`Filter`].
#[derive(Debug, Clone, Default)]
pub struct FilterBuilder {
    all: Vec<Validation>,
    none: Vec<Validation>,
    any: Vec<Validation>,
}

impl FilterBuilder {
    pub fn all(mut self, validation: Validation) -> Self {
        self.all.push(validation);
        self
    }

    pub fn none(mut self, validation: Validation) -> Self {
        self.none.push(validation);
        self
    }

    pub fn any(mut self, validation: Validation) -> Self {
        self.any.push(validation);
        self
    }

    pub fn build(self) -> Filter {
        Filter::new(self.all, self.none, self.any)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct FilterRecord {
    #[serde(default)]
    all: Vec<Validation>,
    #[serde(default)]
    none: Vec<Validation>,
    #[serde(default)]
    any: Vec<Validation>,
}

impl From<FilterRecord> for Filter {
    fn from(r: FilterRecord) -> Self {
        Filter::new(r.all, r.none, r.any)
    }
}

impl From<Filter> for FilterRecord {
    fn from(f: Filter) -> Self {
        FilterRecord {
            all: f.all,
            none: f.none,
            any: f.any,
        }
    }
}
