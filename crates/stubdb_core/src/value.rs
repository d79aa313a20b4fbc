//! Typed property values.

use crate::key::Key;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// A single (non-repeated) property value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Value {
    /// Explicit null.
    Null,
    /// Boolean value.
    Boolean(bool),
    /// Signed 64-bit integer.
    Integer(i64),
    /// Double-precision float.
    Double(f64),
    /// UTF-8 string.
    String(String),
    /// Reference to another entity.
    Key(Key),
}

/// Comparison class of a value.
///
/// Two values are comparable iff they share a class. Integers and doubles
/// share [`ValueClass::Number`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ValueClass {
    Null,
    Boolean,
    Number,
    String,
    Key,
}

impl Value {
    /// Returns a short name for the value's type.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Boolean(_) => "boolean",
            Value::Integer(_) => "integer",
            Value::Double(_) => "double",
            Value::String(_) => "string",
            Value::Key(_) => "key",
        }
    }

    pub(crate) fn class(&self) -> ValueClass {
        match self {
            Value::Null => ValueClass::Null,
            Value::Boolean(_) => ValueClass::Boolean,
            Value::Integer(_) | Value::Double(_) => ValueClass::Number,
            Value::String(_) => ValueClass::String,
            Value::Key(_) => ValueClass::Key,
        }
    }

    /// Compares two values, returning `None` when they are incomparable.
    ///
    /// Integers and doubles compare numerically; every other pairing of
    /// distinct types is incomparable, as is NaN.
    #[must_use]
    pub fn compare(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Value::Null, Value::Null) => Some(Ordering::Equal),
            (Value::Boolean(a), Value::Boolean(b)) => Some(a.cmp(b)),
            (Value::Integer(a), Value::Integer(b)) => Some(a.cmp(b)),
            #[allow(clippy::cast_precision_loss)]
            (Value::Integer(a), Value::Double(b)) => (*a as f64).partial_cmp(b),
            #[allow(clippy::cast_precision_loss)]
            (Value::Double(a), Value::Integer(b)) => a.partial_cmp(&(*b as f64)),
            (Value::Double(a), Value::Double(b)) => a.partial_cmp(b),
            (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
            (Value::Key(a), Value::Key(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    /// Total order used for sorting values of the same class.
    ///
    /// `Null` sorts before everything; NaN sorts after every other number.
    pub(crate) fn sort_cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Value::Null, Value::Null) => Ordering::Equal,
            (Value::Null, _) => Ordering::Less,
            (_, Value::Null) => Ordering::Greater,
            #[allow(clippy::cast_precision_loss)]
            (Value::Integer(a), Value::Double(b)) => (*a as f64).total_cmp(b),
            #[allow(clippy::cast_precision_loss)]
            (Value::Double(a), Value::Integer(b)) => a.total_cmp(&(*b as f64)),
            (Value::Double(a), Value::Double(b)) => a.total_cmp(b),
            _ => self.compare(other).unwrap_or(Ordering::Equal),
        }
    }

    /// Check if this value is null.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Get this value as a boolean, if it is one.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Get this value as an integer, if it is one.
    #[must_use]
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(n) => Some(*n),
            _ => None,
        }
    }

    /// Get this value as a double, if it is one.
    #[must_use]
    pub fn as_double(&self) -> Option<f64> {
        match self {
            Value::Double(d) => Some(*d),
            _ => None,
        }
    }

    /// Get this value as a string slice, if it is a string.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get this value as a key reference, if it is one.
    #[must_use]
    pub fn as_key(&self) -> Option<&Key> {
        match self {
            Value::Key(k) => Some(k),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Integer(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Integer(i64::from(n))
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::Integer(i64::from(n))
    }
}

impl From<f64> for Value {
    fn from(d: f64) -> Self {
        Value::Double(d)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<Key> for Value {
    fn from(k: Key) -> Self {
        Value::Key(k)
    }
}

impl From<()> for Value {
    fn from((): ()) -> Self {
        Value::Null
    }
}

/// A property value: one value, or an ordered list of values.
///
/// Lists hold only non-repeated values, so nesting is unrepresentable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyValue {
    /// A single value.
    Single(Value),
    /// An ordered, possibly empty, list of values.
    Repeated(Vec<Value>),
}

impl PropertyValue {
    /// Builds a repeated value from anything convertible to [`Value`].
    pub fn repeated<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        PropertyValue::Repeated(values.into_iter().map(Into::into).collect())
    }

    /// Returns the contained values: one for a single value, all elements
    /// for a repeated one.
    #[must_use]
    pub fn values(&self) -> &[Value] {
        match self {
            PropertyValue::Single(v) => std::slice::from_ref(v),
            PropertyValue::Repeated(vs) => vs,
        }
    }

    /// Returns the single value, if this is not a repeated property.
    #[must_use]
    pub fn as_single(&self) -> Option<&Value> {
        match self {
            PropertyValue::Single(v) => Some(v),
            PropertyValue::Repeated(_) => None,
        }
    }

    /// Returns true if this is a repeated property.
    #[must_use]
    pub fn is_repeated(&self) -> bool {
        matches!(self, PropertyValue::Repeated(_))
    }

    /// Returns a short name for the property's type.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            PropertyValue::Single(v) => v.type_name(),
            PropertyValue::Repeated(_) => "repeated",
        }
    }
}

impl From<Value> for PropertyValue {
    fn from(v: Value) -> Self {
        PropertyValue::Single(v)
    }
}

impl From<Vec<Value>> for PropertyValue {
    fn from(vs: Vec<Value>) -> Self {
        PropertyValue::Repeated(vs)
    }
}

impl From<bool> for PropertyValue {
    fn from(b: bool) -> Self {
        PropertyValue::Single(b.into())
    }
}

impl From<i64> for PropertyValue {
    fn from(n: i64) -> Self {
        PropertyValue::Single(n.into())
    }
}

impl From<i32> for PropertyValue {
    fn from(n: i32) -> Self {
        PropertyValue::Single(n.into())
    }
}

impl From<f64> for PropertyValue {
    fn from(d: f64) -> Self {
        PropertyValue::Single(d.into())
    }
}

impl From<String> for PropertyValue {
    fn from(s: String) -> Self {
        PropertyValue::Single(s.into())
    }
}

impl From<&str> for PropertyValue {
    fn from(s: &str) -> Self {
        PropertyValue::Single(s.into())
    }
}

impl From<Key> for PropertyValue {
    fn from(k: Key) -> Self {
        PropertyValue::Single(k.into())
    }
}

impl From<()> for PropertyValue {
    fn from((): ()) -> Self {
        PropertyValue::Single(Value::Null)
    }
}
