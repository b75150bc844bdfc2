//! Typed property values.
//!
//! A [`Property`] is a closed tagged union over the four value types an item
//! can carry. Replacement is type-checked: a property never changes its tag
//! after it has been stored on an item.

use std::any::Any;

use serde::{Deserialize, Serialize};

use stockpile_core::ValueObject;

/// The four property value types.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyType {
    Bool,
    Int,
    Float,
    String,
}

impl PropertyType {
    pub const fn name(self) -> &'static str {
        match self {
            PropertyType::Bool => "bool",
            PropertyType::Int => "int",
            PropertyType::Float => "float",
            PropertyType::String => "string",
        }
    }
}

impl core::fmt::Display for PropertyType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

/// A single typed value.
///
/// String payloads may be null (`String(None)`); that is also the default
/// property, the one handed back when a value cannot be represented.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(into = "PropertyRecord", from = "PropertyRecord")]
pub enum Property {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(Option<String>),
}

impl Default for Property {
    fn default() -> Self {
        Property::String(None)
    }
}

impl ValueObject for Property {}

/// Result of a successful typed replacement.
#[derive(Debug, Clone, PartialEq)]
pub struct Replacement {
    pub property: Property,
    /// False when the new value equals the current one.
    pub changed: bool,
}

impl Property {
    /// Build a property from any supported value type.
    pub fn new<T: PropertyValue>(value: T) -> Self {
        value.into_property()
    }

    /// Build a property from a value whose type is only known at runtime.
    ///
    /// Returns `None` (and logs) when the value is not one of the supported
    /// types; callers that need a placeholder use `Property::default()`.
    pub fn try_from_any(value: &dyn Any) -> Option<Self> {
        if let Some(v) = value.downcast_ref::<bool>() {
            return Some(Property::Bool(*v));
        }
        if let Some(v) = value.downcast_ref::<i64>() {
            return Some(Property::Int(*v));
        }
        if let Some(v) = value.downcast_ref::<i32>() {
            return Some(Property::Int(i64::from(*v)));
        }
        if let Some(v) = value.downcast_ref::<u64>() {
            return match i64::try_from(*v) {
                Ok(v) => Some(Property::Int(v)),
                Err(_) => {
                    tracing::error!(value = *v, "unsigned value does not fit an int property");
                    None
                }
            };
        }
        if let Some(v) = value.downcast_ref::<f64>() {
            return Some(Property::Float(*v));
        }
        if let Some(v) = value.downcast_ref::<f32>() {
            return Some(Property::Float(f64::from(*v)));
        }
        if let Some(v) = value.downcast_ref::<String>() {
            return Some(Property::String(Some(v.clone())));
        }
        if let Some(v) = value.downcast_ref::<&str>() {
            return Some(Property::String(Some((*v).to_string())));
        }
        if let Some(v) = value.downcast_ref::<Option<String>>() {
            return Some(Property::String(v.clone()));
        }

        tracing::error!("unsupported property value type; expected bool, int, float or string");
        None
    }

    pub fn property_type(&self) -> PropertyType {
        match self {
            Property::Bool(_) => PropertyType::Bool,
            Property::Int(_) => PropertyType::Int,
            Property::Float(_) => PropertyType::Float,
            Property::String(_) => PropertyType::String,
        }
    }

    /// Read the payload as `T`. `None` when the tag does not match.
    pub fn try_get<T: PropertyValue>(&self) -> Option<T> {
        T::from_property(self)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Property::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Property::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Property::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// The string payload. Null strings read as `None`, as do other tags.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Property::String(v) => v.as_deref(),
            _ => None,
        }
    }

    /// Type-check `value` against this property's tag.
    ///
    /// Returns `None` on a tag mismatch; the current value is left alone.
    pub fn try_replace(&self, value: Property) -> Option<Replacement> {
        if self.property_type() != value.property_type() {
            return None;
        }
        let changed = *self != value;
        Some(Replacement {
            property: value,
            changed,
        })
    }

    /// Shorthand for [`Property::try_replace`] with a typed value.
    pub fn try_new_value<T: PropertyValue>(&self, value: T) -> Option<Replacement> {
        self.try_replace(value.into_property())
    }
}

/// Float comparison tolerant to rounding noise.
pub fn approx_eq(a: f64, b: f64) -> bool {
    if a == b {
        return true;
    }
    let scale = a.abs().max(b.abs());
    (a - b).abs() < (1e-6 * scale).max(f64::EPSILON * 8.0)
}

impl PartialEq for Property {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Property::Bool(a), Property::Bool(b)) => a == b,
            (Property::Int(a), Property::Int(b)) => a == b,
            (Property::Float(a), Property::Float(b)) => approx_eq(*a, *b),
            (Property::String(a), Property::String(b)) => a == b,
            _ => false,
        }
    }
}

/// Rust types that map onto a [`Property`] tag.
pub trait PropertyValue: Sized {
    const TYPE: PropertyType;

    fn into_property(self) -> Property;

    fn from_property(property: &Property) -> Option<Self>;
}

impl PropertyValue for bool {
    const TYPE: PropertyType = PropertyType::Bool;

    fn into_property(self) -> Property {
        Property::Bool(self)
    }

    fn from_property(property: &Property) -> Option<Self> {
        property.as_bool()
    }
}

impl PropertyValue for i64 {
    const TYPE: PropertyType = PropertyType::Int;

    fn into_property(self) -> Property {
        Property::Int(self)
    }

    fn from_property(property: &Property) -> Option<Self> {
        property.as_int()
    }
}

impl PropertyValue for i32 {
    const TYPE: PropertyType = PropertyType::Int;

    fn into_property(self) -> Property {
        Property::Int(i64::from(self))
    }

    fn from_property(property: &Property) -> Option<Self> {
        property.as_int().and_then(|v| i32::try_from(v).ok())
    }
}

impl PropertyValue for u64 {
    const TYPE: PropertyType = PropertyType::Int;

    fn into_property(self) -> Property {
        Property::Int(i64::try_from(self).unwrap_or(i64::MAX))
    }

    fn from_property(property: &Property) -> Option<Self> {
        property.as_int().and_then(|v| u64::try_from(v).ok())
    }
}

impl PropertyValue for f64 {
    const TYPE: PropertyType = PropertyType::Float;

    fn into_property(self) -> Property {
        Property::Float(self)
    }

    fn from_property(property: &Property) -> Option<Self> {
        property.as_float()
    }
}

impl PropertyValue for f32 {
    const TYPE: PropertyType = PropertyType::Float;

    fn into_property(self) -> Property {
        Property::Float(f64::from(self))
    }

    fn from_property(property: &Property) -> Option<Self> {
        property.as_float().map(|v| v as f32)
    }
}

impl PropertyValue for String {
    const TYPE: PropertyType = PropertyType::String;

    fn into_property(self) -> Property {
        Property::String(Some(self))
    }

    fn from_property(property: &Property) -> Option<Self> {
        property.as_str().map(str::to_string)
    }
}

impl PropertyValue for Option<String> {
    const TYPE: PropertyType = PropertyType::String;

    fn into_property(self) -> Property {
        Property::String(self)
    }

    fn from_property(property: &Property) -> Option<Self> {
        match property {
            Property::String(v) => Some(v.clone()),
            _ => None,
        }
    }
}

macro_rules! impl_from_for_property {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Property {
                fn from(value: $t) -> Self {
                    value.into_property()
                }
            }
        )*
    };
}

impl_from_for_property!(bool, i64, i32, u64, f64, f32, String, Option<String>);

impl From<&str> for Property {
    fn from(value: &str) -> Self {
        Property::String(Some(value.to_string()))
    }
}

/// Persisted shape: the tag plus all four payload slots, only one of which is
/// meaningful.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct PropertyRecord {
    #[serde(rename = "type")]
    tag: PropertyType,
    #[serde(default)]
    bool_value: bool,
    #[serde(default)]
    int_value: i64,
    #[serde(default)]
    float_value: f64,
    #[serde(default)]
    string_value: Option<String>,
}

impl From<Property> for PropertyRecord {
    fn from(property: Property) -> Self {
        let mut record = PropertyRecord {
            tag: property.property_type(),
            bool_value: false,
            int_value: 0,
            float_value: 0.0,
            string_value: None,
        };
        match property {
            Property::Bool(v) => record.bool_value = v,
            Property::Int(v) => record.int_value = v,
            Property::Float(v) => record.float_value = v,
            Property::String(v) => record.string_value = v,
        }
        record
    }
}

impl From<PropertyRecord> for Property {
    fn from(record: PropertyRecord) -> Self {
        match record.tag {
            PropertyType::Bool => Property::Bool(record.bool_value),
            PropertyType::Int => Property::Int(record.int_value),
            PropertyType::Float => Property::Float(record.float_value),
            PropertyType::String => Property::String(record.string_value),
        }
    }
}
