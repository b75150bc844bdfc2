use serde::{Deserialize, Serialize};

use stockpile_core::{StoreError, StoreResult, ValueObject};
use stockpile_items::{Item, PropertyType};

use crate::flags::{Operator, ValidationFlags, ValidationResult};
use crate::registry::ValidationStore;

/// One typed predicate against a single item property.
///
/// Operands are kept in four typed lists; only the list matching the value
/// type may be non-empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ValidationRecord", into = "ValidationRecord")]
pub struct Validation {
    key: String,
    flags: ValidationFlags,
    bools: Vec<bool>,
    ints: Vec<i64>,
    floats: Vec<f64>,
    strings: Vec<String>,
}

impl ValueObject for Validation {}

impl Validation {
    fn empty(key: impl Into<String>, value_type: PropertyType, operator: Operator) -> Self {
        Self {
            key: key.into(),
            flags: ValidationFlags::of_type(value_type) | operator.flag(),
            bools: Vec::new(),
            ints: Vec::new(),
            floats: Vec::new(),
            strings: Vec::new(),
        }
    }

    pub fn bool(key: impl Into<String>, operator: Operator, operands: impl IntoIterator<Item = bool>) -> Self {
        let mut v = Self::empty(key, PropertyType::Bool, operator);
        v.bools = operands.into_iter().collect();
        v
    }

    pub fn int(key: impl Into<String>, operator: Operator, operands: impl IntoIterator<Item = i64>) -> Self {
        let mut v = Self::empty(key, PropertyType::Int, operator);
        v.ints = operands.into_iter().collect();
        v
    }

    pub fn float(key: impl Into<String>, operator: Operator, operands: impl IntoIterator<Item = f64>) -> Self {
        let mut v = Self::empty(key, PropertyType::Float, operator);
        v.floats = operands.into_iter().collect();
        v
    }

    pub fn string<S: Into<String>>(
        key: impl Into<String>,
        operator: Operator,
        operands: impl IntoIterator<Item = S>,
    ) -> Self {
        let mut v = Self::empty(key, PropertyType::String, operator);
        v.strings = operands.into_iter().map(Into::into).collect();
        v
    }

    /// Passes whenever `key` holds a value of `value_type`.
    pub fn defined(key: impl Into<String>, value_type: PropertyType) -> Self {
        Self::empty(key, value_type, Operator::Defined)
    }

    /// Flip `Valid` and `InValid` (toggles; applying twice restores).
    #[must_use]
    pub fn inverted(mut self) -> Self {
        self.flags = if self.is_inverted() {
            self.flags.without(ValidationFlags::INVERT)
        } else {
            self.flags.with(ValidationFlags::INVERT)
        };
        self
    }

    /// Build from raw parts, checking every structural invariant.
    pub fn from_parts(
        key: impl Into<String>,
        flags: ValidationFlags,
        bools: Vec<bool>,
        ints: Vec<i64>,
        floats: Vec<f64>,
        strings: Vec<String>,
    ) -> StoreResult<Self> {
        let key = key.into();
        let known = ValidationFlags::TYPE_MASK | ValidationFlags::OPERATOR_MASK | ValidationFlags::INVERT;
        if flags.without(known) != ValidationFlags::NONE {
            return Err(StoreError::configuration(format!(
                "validation '{key}' has unknown flag bits {flags}"
            )));
        }
        let Some(value_type) = flags.value_type() else {
            return Err(StoreError::configuration(format!(
                "validation '{key}' must set exactly one value type bit"
            )));
        };
        if !flags.intersect(ValidationFlags::OPERATOR_MASK).is_single() {
            return Err(StoreError::configuration(format!(
                "validation '{key}' must set exactly one operator bit"
            )));
        }
        let stray = match value_type {
            PropertyType::Bool => !ints.is_empty() || !floats.is_empty() || !strings.is_empty(),
            PropertyType::Int => !bools.is_empty() || !floats.is_empty() || !strings.is_empty(),
            PropertyType::Float => !bools.is_empty() || !ints.is_empty() || !strings.is_empty(),
            PropertyType::String => !bools.is_empty() || !ints.is_empty() || !floats.is_empty(),
        };
        if stray {
            return Err(StoreError::configuration(format!(
                "validation '{key}' carries operands for a type other than {value_type}"
            )));
        }
        Ok(Self {
            key,
            flags,
            bools,
            ints,
            floats,
            strings,
        })
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn flags(&self) -> ValidationFlags {
        self.flags
    }

    pub fn value_type(&self) -> PropertyType {
        // Every constructor guarantees exactly one type bit.
        self.flags.value_type().unwrap_or(PropertyType::String)
    }

    pub fn operator(&self) -> Option<Operator> {
        Operator::from_flags(self.flags)
    }

    pub fn is_inverted(&self) -> bool {
        self.flags.has(ValidationFlags::INVERT)
    }

    pub fn bools(&self) -> &[bool] {
        &self.bools
    }

    pub fn ints(&self) -> &[i64] {
        &self.ints
    }

    pub fn floats(&self) -> &[f64] {
        &self.floats
    }

    pub fn strings(&self) -> &[String] {
        &self.strings
    }

    /// Evaluate against `item`.
    ///
    /// A missing property, or one of another type, is `InValid` whatever the
    /// operator. Otherwise the registered operator decides.
    pub fn validate(&self, operators: &ValidationStore, item: &Item) -> ValidationResult {
        match item.get(&self.key) {
            Some(value) if value.property_type() == self.value_type() => {
                operators.evaluate(self, item, value)
            }
            _ => ValidationResult::InValid,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ValidationRecord {
    key: String,
    flags: ValidationFlags,
    #[serde(default)]
    bools: Vec<bool>,
    #[serde(default)]
    ints: Vec<i64>,
    #[serde(default)]
    floats: Vec<f64>,
    #[serde(default)]
    strings: Vec<String>,
}

impl TryFrom<ValidationRecord> for Validation {
    type Error = StoreError;

    fn try_from(r: ValidationRecord) -> Result<Self, Self::Error> {
        Validation::from_parts(r.key, r.flags, r.bools, r.ints, r.floats, r.strings)
    }
}

impl From<Validation> for ValidationRecord {
    fn from(v: Validation) -> Self {
        ValidationRecord {
            key: v.key,
            flags: v.flags,
            bools: v.bools,
            ints: v.ints,
            floats: v.floats,
            strings: v.strings,
        }
    }
}
