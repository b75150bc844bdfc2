//! Validation flag bits and the typed views over them.

use serde::{Deserialize, Serialize};

use stockpile_items::PropertyType;

/// Bitmask combining one value-type bit, one operator bit and optionally
/// `INVERT`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValidationFlags(u32);

impl ValidationFlags {
    pub const NONE: Self = Self(0);

    pub const BOOL: Self = Self(1 << 0);
    pub const INT: Self = Self(1 << 1);
    pub const FLOAT: Self = Self(1 << 2);
    pub const STRING: Self = Self(1 << 3);

    pub const INVERT: Self = Self(1 << 4);

    pub const EQUAL_TO: Self = Self(1 << 5);
    pub const LESS_THAN: Self = Self(1 << 6);
    pub const GREATER_THAN: Self = Self(1 << 7);
    pub const CONTAINS: Self = Self(1 << 8);
    pub const STARTS_WITH: Self = Self(1 << 9);
    pub const ENDS_WITH: Self = Self(1 << 10);
    pub const DEFINED: Self = Self(1 << 11);

    pub const TYPE_MASK: Self = Self(0b1111);
    pub const OPERATOR_MASK: Self = Self(0b1111_1110_0000);

    #[inline]
    #[must_use]
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    #[inline]
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }

    #[inline]
    #[must_use]
    pub const fn has(self, flag: Self) -> bool {
        (self.0 & flag.0) != 0
    }

    #[inline]
    #[must_use]
    pub const fn with(self, flag: Self) -> Self {
        Self(self.0 | flag.0)
    }

    #[inline]
    #[must_use]
    pub const fn without(self, flag: Self) -> Self {
        Self(self.0 & !flag.0)
    }

    #[inline]
    #[must_use]
    pub const fn intersect(self, mask: Self) -> Self {
        Self(self.0 & mask.0)
    }

    /// Exactly one bit set.
    #[inline]
    #[must_use]
    pub const fn is_single(self) -> bool {
        self.0.count_ones() == 1
    }

    pub const fn of_type(value_type: PropertyType) -> Self {
        match value_type {
            PropertyType::Bool => Self::BOOL,
            PropertyType::Int => Self::INT,
            PropertyType::Float => Self::FLOAT,
            PropertyType::String => Self::STRING,
        }
    }

    /// The property type encoded in the type bits, if exactly one is set.
    pub fn value_type(self) -> Option<PropertyType> {
        match self.intersect(Self::TYPE_MASK) {
            Self::BOOL => Some(PropertyType::Bool),
            Self::INT => Some(PropertyType::Int),
            Self::FLOAT => Some(PropertyType::Float),
            Self::STRING => Some(PropertyType::String),
            _ => None,
        }
    }

    /// Registry key: type bits plus operator bits, without `INVERT`.
    pub const fn operator_key(self) -> Self {
        Self(self.0 & (Self::TYPE_MASK.0 | Self::OPERATOR_MASK.0))
    }
}

impl core::ops::BitOr for ValidationFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.with(rhs)
    }
}

impl core::fmt::Display for ValidationFlags {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{:#06x}", self.0)
    }
}

/// Comparison operators.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    EqualTo,
    LessThan,
    GreaterThan,
    Contains,
    StartsWith,
    EndsWith,
    Defined,
}

impl Operator {
    pub const fn flag(self) -> ValidationFlags {
        match self {
            Operator::EqualTo => ValidationFlags::EQUAL_TO,
            Operator::LessThan => ValidationFlags::LESS_THAN,
            Operator::GreaterThan => ValidationFlags::GREATER_THAN,
            Operator::Contains => ValidationFlags::CONTAINS,
            Operator::StartsWith => ValidationFlags::STARTS_WITH,
            Operator::EndsWith => ValidationFlags::ENDS_WITH,
            Operator::Defined => ValidationFlags::DEFINED,
        }
    }

    pub fn from_flags(flags: ValidationFlags) -> Option<Self> {
        match flags.intersect(ValidationFlags::OPERATOR_MASK) {
            ValidationFlags::EQUAL_TO => Some(Operator::EqualTo),
            ValidationFlags::LESS_THAN => Some(Operator::LessThan),
            ValidationFlags::GREATER_THAN => Some(Operator::GreaterThan),
            ValidationFlags::CONTAINS => Some(Operator::Contains),
            ValidationFlags::STARTS_WITH => Some(Operator::StartsWith),
            ValidationFlags::ENDS_WITH => Some(Operator::EndsWith),
            ValidationFlags::DEFINED => Some(Operator::Defined),
            _ => None,
        }
    }
}

/// Outcome of one validation.
///
/// `Ignored` passes an `All` check but does not satisfy `Any`, and inversion
/// never touches it.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValidationResult {
    Valid,
    InValid,
    Ignored,
}

impl ValidationResult {
    pub fn from_bool(valid: bool) -> Self {
        if valid {
            ValidationResult::Valid
        } else {
            ValidationResult::InValid
        }
    }

    #[must_use]
    pub fn invert(self) -> Self {
        match self {
            ValidationResult::Valid => ValidationResult::InValid,
            ValidationResult::InValid => ValidationResult::Valid,
            ValidationResult::Ignored => ValidationResult::Ignored,
        }
    }
}
