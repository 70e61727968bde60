use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use chrono::NaiveDateTime;

use crate::data_type::DataType;

/// Represents a single field value stored in a record.
///
/// There is no null: a field that was not supplied holds its kind's default.
#[derive(Debug, Clone)]
pub enum Value {
    /// A UTF-8 string value, wrapped in an [Arc] for cheap cloning.
    Text(Arc<str>),
    /// A 64-bit signed integer value.
    Int(i64),
    /// A 64-bit floating-point value.
    Float(f64),
    /// A boolean value.
    Bool(bool),
    /// A local date-time.
    Time(NaiveDateTime),
    /// An ordered list of strings.
    TextList(Vec<Arc<str>>),
}

impl Value {
    /// Returns the inner integer value if this is a [Value::Int].
    /// Otherwise, returns `None`.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Returns the inner float value if this is a [Value::Float].
    /// Otherwise, returns `None`.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Returns a reference to the inner string slice if this is a [Value::Text].
    /// Otherwise, returns `None`.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the inner boolean value if this is a [Value::Bool].
    /// Otherwise, returns `None`.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the inner date-time if this is a [Value::Time].
    pub fn as_time(&self) -> Option<NaiveDateTime> {
        match self {
            Self::Time(t) => Some(*t),
            _ => None,
        }
    }

    /// Returns the list items if this is a [Value::TextList].
    pub fn as_list(&self) -> Option<&[Arc<str>]> {
        match self {
            Self::TextList(items) => Some(items),
            _ => None,
        }
    }

    /// Returns the [DataType] corresponding to this value.
    pub fn data_type(&self) -> DataType {
        match self {
            Self::Text(_) => DataType::Text,
            Self::Int(_) => DataType::Int,
            Self::Float(_) => DataType::Float,
            Self::Bool(_) => DataType::Bool,
            Self::Time(_) => DataType::Time,
            Self::TextList(_) => DataType::TextList,
        }
    }

    /// Orders two values of compatible kinds.
    ///
    /// Numeric kinds compare numerically (an `Int` against a `Float` is
    /// promoted), times chronologically, text and booleans by their natural
    /// order. Returns `None` for mismatched kinds and for lists, which only
    /// support membership tests.
    ///
    /// # Example
    /// ```
    /// # use schemadb::value::Value;
    /// # use std::cmp::Ordering;
    /// assert_eq!(Value::Int(2).compare(&Value::Float(2.5)), Some(Ordering::Less));
    /// assert_eq!(Value::Int(2).compare(&Value::Text("2".into())), None);
    /// ```
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Self::Int(l), Self::Int(r)) => Some(l.cmp(r)),
            (Self::Float(l), Self::Float(r)) => Some(fold_zero(*l).total_cmp(&fold_zero(*r))),
            (Self::Int(l), Self::Float(r)) => Some((*l as f64).total_cmp(&fold_zero(*r))),
            (Self::Float(l), Self::Int(r)) => Some(fold_zero(*l).total_cmp(&(*r as f64))),
            (Self::Text(l), Self::Text(r)) => Some(l.cmp(r)),
            (Self::Bool(l), Self::Bool(r)) => Some(l.cmp(r)),
            (Self::Time(l), Self::Time(r)) => Some(l.cmp(r)),
            _ => None,
        }
    }

    /// Returns true if this is a list holding exactly `needle`.
    pub fn contains(&self, needle: &str) -> bool {
        self.as_list()
            .is_some_and(|items| items.iter().any(|item| item.as_ref() == needle))
    }
}

/// Maps `-0.0` to `0.0`; every other float is returned unchanged.
fn fold_zero(f: f64) -> f64 {
    if f == 0.0 { 0.0 } else { f }
}

/// `-0.0` and `0.0` share a key so they hash and compare the same.
fn float_key(f: f64) -> u64 {
    fold_zero(f).to_bits()
}

// Equality is strict on the kind and bitwise on floats, which makes `Value`
// usable as a unique-index key.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Text(l), Self::Text(r)) => l == r,
            (Self::Int(l), Self::Int(r)) => l == r,
            (Self::Float(l), Self::Float(r)) => float_key(*l) == float_key(*r),
            (Self::Bool(l), Self::Bool(r)) => l == r,
            (Self::Time(l), Self::Time(r)) => l == r,
            (Self::TextList(l), Self::TextList(r)) => l == r,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Self::Text(s) => s.hash(state),
            Self::Int(i) => i.hash(state),
            Self::Float(f) => float_key(*f).hash(state),
            Self::Bool(b) => b.hash(state),
            Self::Time(t) => t.hash(state),
            Self::TextList(items) => items.hash(state),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => f.write_str(s),
            Self::Int(i) => write!(f, "{i}"),
            // Debug keeps the trailing `.0` on whole numbers
            Self::Float(x) => write!(f, "{x:?}"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Time(t) => write!(f, "{}", t.format("%Y-%m-%dT%H:%M:%S")),
            Self::TextList(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    f.write_str(item)?;
                }
                f.write_str("]")
            }
        }
    }
}
