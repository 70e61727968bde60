use std::fmt;

use crate::FieldDef;
use crate::json::JsonValue;

/// One parsed command line.
#[derive(Debug, PartialEq)]
pub enum Statement {
    CreateType(CreateType),
    Insert(Insert),
    Update(Update),
    Delete(Delete),
    Search(Search),
}

#[derive(Debug, PartialEq)]
pub struct CreateType {
    pub name: String,
    pub fields: Vec<FieldDef>,
}

/// Field values are kept as JSON until the target type's schema is known.
#[derive(Debug, PartialEq)]
pub struct Insert {
    pub table: String,
    pub values: Vec<(String, JsonValue)>,
}

#[derive(Debug, PartialEq)]
pub struct Update {
    pub table: String,
    pub filter: Option<Expr>,
    pub assignments: Vec<(String, JsonValue)>,
}

#[derive(Debug, PartialEq)]
pub struct Delete {
    pub table: String,
    pub filter: Option<Expr>,
}

#[derive(Debug, PartialEq)]
pub struct Search {
    pub table: String,
    pub filter: Option<Expr>,
}

/// A boolean filter expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Comparison {
        left: Operand,
        op: ComparisonOp,
        right: Operand,
    },
    And {
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Or {
        left: Box<Expr>,
        right: Box<Expr>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    /// List membership, only valid against a string-list field.
    Include,
}

impl ComparisonOp {
    /// Returns the operator to use once both sides are swapped, so that
    /// `5 < age` can be evaluated as `age > 5`.
    pub fn invert(self) -> Self {
        match self {
            Self::Lt => Self::Gt,
            Self::Gt => Self::Lt,
            Self::Le => Self::Ge,
            Self::Ge => Self::Le,
            other => other,
        }
    }
}

impl fmt::Display for ComparisonOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Eq => "=",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Include => "include",
        };
        f.write_str(s)
    }
}

/// One side of a comparison.
///
/// An [Operand::Ident] only designates a field when the type under test
/// declares it. Facing a field it is read as a literal; a comparison where
/// neither side names a declared field rejects it as unknown.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Ident(String),
    String(String),
    Number(String),
    Bool(bool),
    Bare(String),
}

impl Operand {
    /// The literal text of the operand, with string literals quoted again so
    /// they go through the same coercion rules as any other literal.
    pub fn raw(&self) -> String {
        match self {
            Self::String(s) => format!("\"{s}\""),
            Self::Ident(s) | Self::Number(s) | Self::Bare(s) => s.clone(),
            Self::Bool(b) => b.to_string(),
        }
    }

    /// The operand as plain text, without quotes.
    pub fn text(&self) -> String {
        match self {
            Self::String(s) => s.clone(),
            other => other.raw(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invert() {
        assert_eq!(ComparisonOp::Lt.invert(), ComparisonOp::Gt);
        assert_eq!(ComparisonOp::Ge.invert(), ComparisonOp::Le);
        assert_eq!(ComparisonOp::Eq.invert(), ComparisonOp::Eq);
        assert_eq!(ComparisonOp::Ne.invert(), ComparisonOp::Ne);
    }

    #[test]
    fn test_operand_raw() {
        assert_eq!(Operand::String("a b".into()).raw(), "\"a b\"");
        assert_eq!(Operand::String("a b".into()).text(), "a b");
        assert_eq!(Operand::Bool(true).raw(), "true");
        assert_eq!(Operand::Number("-1.5".into()).raw(), "-1.5");
    }
}
