use std::sync::Arc;

use chrono::NaiveDateTime;

use crate::error::{DbError, Result};
use crate::json::JsonValue;
use crate::value::Value;

/// Format accepted for [DataType::Time] literals, e.g. `2024-01-01T12:30:00`.
/// Fractional seconds are tolerated on input.
pub const TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// Represents the supported field kinds of a record type.
/// The set is closed: every consumer matches on it exhaustively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    /// A UTF-8 string.
    Text,
    /// A 64-bit signed integer.
    Int,
    /// A 64-bit floating-point number.
    Float,
    /// A boolean value (true or false).
    Bool,
    /// A local date-time without timezone.
    Time,
    /// A list of strings, only testable for membership.
    TextList,
}

impl DataType {
    /// Resolves a kind name as written in a `create` payload.
    ///
    /// Names are matched case-insensitively and surrounding whitespace is ignored.
    ///
    /// # Example
    /// ```
    /// # use schemadb::data_type::DataType;
    /// assert_eq!(DataType::from_spec("DBL").unwrap(), DataType::Float);
    /// assert_eq!(DataType::from_spec("list_string").unwrap(), DataType::TextList);
    /// assert!(DataType::from_spec("decimal").is_err());
    /// ```
    pub fn from_spec(spec: &str) -> Result<Self> {
        match spec.trim().to_lowercase().as_str() {
            "string" => Ok(Self::Text),
            "int" => Ok(Self::Int),
            "dbl" | "double" => Ok(Self::Float),
            "bool" | "boolean" => Ok(Self::Bool),
            "time" => Ok(Self::Time),
            "arr_string" | "list_string" | "string_list" => Ok(Self::TextList),
            _ => Err(DbError::InvalidDataType(spec.to_string())),
        }
    }

    /// Returns the value a record receives when the field was not supplied.
    pub fn default_value(&self) -> Value {
        match self {
            Self::Text => Value::Text("".into()),
            Self::Int => Value::Int(0),
            Self::Float => Value::Float(0.0),
            Self::Bool => Value::Bool(false),
            Self::Time => Value::Time(NaiveDateTime::UNIX_EPOCH),
            Self::TextList => Value::TextList(Vec::new()),
        }
    }

    /// Coerces a textual literal (as found in a filter) into a value of this kind.
    ///
    /// # Errors
    /// Returns a description of the expected shape when the text does not match.
    pub fn parse_literal(&self, raw: &str) -> std::result::Result<Value, String> {
        let t = raw.trim();
        match self {
            Self::Text => {
                if t.len() >= 2 && t.starts_with('"') && t.ends_with('"') {
                    return Ok(Value::Text(t[1..t.len() - 1].into()));
                }
                Err(format!("invalid string literal {raw:?}, expected a quoted string"))
            }
            Self::Int => parse_int(t).ok_or_else(|| format!("invalid int literal {raw:?}")),
            Self::Float => {
                if !is_numeric_literal(t) {
                    return Err(format!("invalid double literal {raw:?}"));
                }
                t.parse::<f64>()
                    .map(Value::Float)
                    .map_err(|_| format!("invalid double literal {raw:?}"))
            }
            Self::Bool => {
                if t.eq_ignore_ascii_case("true") {
                    Ok(Value::Bool(true))
                } else if t.eq_ignore_ascii_case("false") {
                    Ok(Value::Bool(false))
                } else {
                    Err(format!("invalid boolean literal {raw:?}"))
                }
            }
            Self::Time => parse_time(unquote(t)),
            Self::TextList => Err("string lists cannot be parsed from a single literal".into()),
        }
    }

    /// Converts a JSON payload value into a value of this kind.
    ///
    /// Numbers are kept as raw text by the JSON parser so integers are parsed
    /// here without going through a float first.
    pub fn from_json(&self, json: &JsonValue) -> std::result::Result<Value, String> {
        match (self, json) {
            (Self::Text, JsonValue::String(s)) => Ok(Value::Text(s.as_str().into())),
            (Self::Int, JsonValue::Number(raw)) => {
                parse_int(raw).ok_or_else(|| format!("invalid int value {raw}"))
            }
            (Self::Float, JsonValue::Number(raw)) => raw
                .parse::<f64>()
                .map(Value::Float)
                .map_err(|_| format!("invalid double value {raw}")),
            (Self::Bool, JsonValue::Bool(b)) => Ok(Value::Bool(*b)),
            (Self::Time, JsonValue::String(s)) => parse_time(s),
            (Self::TextList, JsonValue::Array(items)) => items
                .iter()
                .map(|item| match item {
                    JsonValue::String(s) => Ok(Arc::from(s.as_str())),
                    _ => Err("invalid string_list item, expected a string".to_string()),
                })
                .collect::<std::result::Result<Vec<_>, String>>()
                .map(Value::TextList),
            (kind, other) => Err(format!("expected {}, found {}", kind, other.kind_name())),
        }
    }
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Text => "string",
            Self::Int => "int",
            Self::Float => "double",
            Self::Bool => "bool",
            Self::Time => "time",
            Self::TextList => "string_list",
        };
        f.write_str(name)
    }
}

/// Checks `-?digits(.digits)?`.
pub(crate) fn is_numeric_literal(s: &str) -> bool {
    let digits = s.strip_prefix('-').unwrap_or(s);
    let (int_part, frac_part) = match digits.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (digits, None),
    };
    let all_digits = |p: &str| !p.is_empty() && p.bytes().all(|b| b.is_ascii_digit());
    all_digits(int_part) && frac_part.is_none_or(all_digits)
}

/// Checks `-?digits`.
pub(crate) fn is_integer_literal(s: &str) -> bool {
    is_numeric_literal(s) && !s.contains('.')
}

fn parse_int(s: &str) -> Option<Value> {
    if !is_integer_literal(s) {
        return None;
    }
    s.parse::<i64>().ok().map(Value::Int)
}

pub(crate) fn parse_time(s: &str) -> std::result::Result<Value, String> {
    NaiveDateTime::parse_from_str(s, TIME_FORMAT)
        .map(Value::Time)
        .map_err(|_| format!("invalid time literal {s:?}, use ISO local date-time like 2024-01-01T12:30:00"))
}

/// Strips one pair of surrounding double quotes, if present.
pub(crate) fn unquote(s: &str) -> &str {
    let t = s.trim();
    if t.len() >= 2 && t.starts_with('"') && t.ends_with('"') {
        &t[1..t.len() - 1]
    } else {
        t
    }
}
