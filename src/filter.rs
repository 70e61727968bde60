//! Evaluation of parsed filter expressions against a record.

use std::cmp::Ordering;

use crate::ast::{ComparisonOp, Expr, Operand};
use crate::data_type::{DataType, is_integer_literal, is_numeric_literal, parse_time, unquote};
use crate::error::{DbError, Result};
use crate::record::Record;
use crate::table::{FieldDef, Schema};
use crate::value::Value;

impl Expr {
    /// Evaluates the expression for one record of a type.
    ///
    /// `AND` and `OR` short-circuit left to right.
    ///
    /// # Errors
    /// Returns [DbError::InvalidFilter] when a comparison references a field
    /// the type does not declare, uses `include` outside a string-list field,
    /// compares a list directly, or compares values that have no order.
    pub fn evaluate(&self, schema: &Schema, record: &Record) -> Result<bool> {
        match self {
            Expr::Comparison { left, op, right } => {
                evaluate_comparison(schema, record, left, *op, right)
            }
            Expr::And { left, right } => {
                if !left.evaluate(schema, record)? {
                    return Ok(false);
                }
                right.evaluate(schema, record)
            }
            Expr::Or { left, right } => {
                if left.evaluate(schema, record)? {
                    return Ok(true);
                }
                right.evaluate(schema, record)
            }
        }
    }

    /// Checks every comparison against the schema without touching a record,
    /// so an undeclared field is reported even when the type holds no records
    /// or when evaluation would short-circuit past it.
    ///
    /// # Errors
    /// Returns [DbError::InvalidFilter] for an identifier that names no
    /// declared field and does not face one.
    pub fn validate(&self, schema: &Schema) -> Result<()> {
        match self {
            Expr::Comparison { left, right, .. } => match unknown_field(schema, left, right) {
                Some(name) => Err(unknown_field_error(name)),
                None => Ok(()),
            },
            Expr::And { left, right } | Expr::Or { left, right } => {
                left.validate(schema)?;
                right.validate(schema)
            }
        }
    }
}

/// An identifier is only an unknown field when neither side of its
/// comparison is a declared field; facing a field it is read as a literal.
fn unknown_field<'a>(schema: &Schema, left: &'a Operand, right: &'a Operand) -> Option<&'a str> {
    if as_field(schema, left).is_some() || as_field(schema, right).is_some() {
        return None;
    }
    [left, right].into_iter().find_map(|operand| match operand {
        Operand::Ident(name) => Some(name.as_str()),
        _ => None,
    })
}

fn unknown_field_error(name: &str) -> DbError {
    DbError::InvalidFilter(format!("unknown field in filter: {name}"))
}

/// Resolves an operand to a field only if it is an identifier the schema declares.
fn as_field<'a>(schema: &'a Schema, operand: &Operand) -> Option<&'a FieldDef> {
    match operand {
        Operand::Ident(name) => schema.field(name),
        _ => None,
    }
}

fn evaluate_comparison(
    schema: &Schema,
    record: &Record,
    left: &Operand,
    op: ComparisonOp,
    right: &Operand,
) -> Result<bool> {
    // "field op literal", or "literal op field" evaluated with sides swapped
    let resolved = match (as_field(schema, left), as_field(schema, right)) {
        (Some(field), _) => Some((field, right, op)),
        (None, Some(field)) => Some((field, left, op.invert())),
        (None, None) => None,
    };

    let Some((field, literal, op)) = resolved else {
        if let Some(name) = unknown_field(schema, left, right) {
            return Err(unknown_field_error(name));
        }
        if op == ComparisonOp::Include {
            return Err(DbError::InvalidFilter(
                "include expects a string list field".into(),
            ));
        }
        return apply(op, &best_effort_literal(left), &best_effort_literal(right));
    };

    let current = record
        .value(&field.key())
        .ok_or_else(|| unknown_field_error(&field.name))?;

    if op == ComparisonOp::Include {
        if field.data_type != DataType::TextList {
            return Err(DbError::InvalidFilter(format!(
                "include is only supported for string lists, {} is {}",
                field.name, field.data_type
            )));
        }
        return Ok(current.contains(&literal.text()));
    }

    if field.data_type == DataType::TextList {
        return Err(DbError::InvalidFilter(format!(
            "cannot compare list field {} directly, use include",
            field.name
        )));
    }

    let expected = field
        .data_type
        .parse_literal(&literal.raw())
        .map_err(|details| DbError::InvalidFilter(format!("{}: {details}", field.name)))?;

    apply(op, current, &expected)
}

fn apply(op: ComparisonOp, left: &Value, right: &Value) -> Result<bool> {
    let ordering = || {
        left.compare(right).ok_or_else(|| {
            DbError::InvalidFilter(format!("cannot compare {left} with {right} using {op}"))
        })
    };
    match op {
        ComparisonOp::Eq => Ok(equals(left, right)),
        ComparisonOp::Ne => Ok(!equals(left, right)),
        ComparisonOp::Lt => Ok(ordering()? == Ordering::Less),
        ComparisonOp::Le => Ok(ordering()? != Ordering::Greater),
        ComparisonOp::Gt => Ok(ordering()? == Ordering::Greater),
        ComparisonOp::Ge => Ok(ordering()? != Ordering::Less),
        ComparisonOp::Include => Err(DbError::InvalidFilter(
            "include expects a string list field".into(),
        )),
    }
}

/// Same-kind values use the equality of the unique indexes; only an `Int`
/// against a `Float` goes through numeric promotion.
fn equals(left: &Value, right: &Value) -> bool {
    if left.data_type() == right.data_type() {
        return left == right;
    }
    left.compare(right) == Some(Ordering::Equal)
}

/// Infers a value for an operand compared against another literal:
/// boolean, then integer, then float, then time, else text.
fn best_effort_literal(operand: &Operand) -> Value {
    let text = operand.text();
    let t = unquote(&text);
    if t.eq_ignore_ascii_case("true") || t.eq_ignore_ascii_case("false") {
        return Value::Bool(t.eq_ignore_ascii_case("true"));
    }
    if is_integer_literal(t) {
        if let Ok(i) = t.parse::<i64>() {
            return Value::Int(i);
        }
    }
    if is_numeric_literal(t) {
        if let Ok(f) = t.parse::<f64>() {
            return Value::Float(f);
        }
    }
    if let Ok(time) = parse_time(t) {
        return time;
    }
    Value::Text(t.into())
}
