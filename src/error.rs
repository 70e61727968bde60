//! Error types for the record store.
//!
//! Every failure aborts only the command being processed. Variants are grouped
//! into five [ErrorKind]s so callers can react to a category rather than to a
//! single message.

use thiserror::Error;

/// Broad category of a [DbError].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed command line, JSON payload or filter text.
    Syntax,
    /// Type or field definitions: already exists, not found, bad kind spec.
    Schema,
    /// A literal could not be coerced to the declared field kind.
    Value,
    /// Required or unique constraint violated.
    Constraint,
    /// Filter evaluation failed (unknown field, misuse of `include`, ...).
    Filter,
}

/// Errors produced while parsing or executing a command.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DbError {
    #[error("Invalid command format")]
    InvalidCommandFormat,

    #[error("Invalid command: {0}")]
    InvalidCommand(String),

    /// A command is missing a construct it needs, e.g. the type name or the
    /// opening `{` of its payload.
    #[error("Invalid {command} syntax: {details}")]
    InvalidSyntax {
        command: &'static str,
        details: String,
    },

    #[error("Invalid JSON format")]
    InvalidJson,

    #[error("Invalid filter syntax: {0}")]
    InvalidFilterSyntax(String),

    #[error("Data type already exists: {0}")]
    TypeAlreadyExists(String),

    #[error("Data type not found: {0}")]
    TypeNotFound(String),

    #[error("Fields section is empty")]
    EmptyFields,

    #[error("Duplicate field: {0}")]
    DuplicateField(String),

    #[error("Invalid data type: {0}")]
    InvalidDataType(String),

    #[error("Invalid field definition for: {0}")]
    InvalidFieldDefinition(String),

    #[error("Field not found: {0}")]
    FieldNotFound(String),

    #[error("Invalid value for field {field}: {details}")]
    InvalidValue { field: String, details: String },

    #[error("Missing required field: {0}")]
    MissingRequiredField(String),

    #[error("Duplicate value for unique field: {0}")]
    UniqueViolation(String),

    #[error("Invalid filter: {0}")]
    InvalidFilter(String),
}

impl DbError {
    /// Returns the category this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidCommandFormat
            | Self::InvalidCommand(_)
            | Self::InvalidSyntax { .. }
            | Self::InvalidJson
            | Self::InvalidFilterSyntax(_) => ErrorKind::Syntax,
            Self::TypeAlreadyExists(_)
            | Self::TypeNotFound(_)
            | Self::EmptyFields
            | Self::DuplicateField(_)
            | Self::InvalidDataType(_)
            | Self::InvalidFieldDefinition(_)
            | Self::FieldNotFound(_) => ErrorKind::Schema,
            Self::InvalidValue { .. } => ErrorKind::Value,
            Self::MissingRequiredField(_) | Self::UniqueViolation(_) => ErrorKind::Constraint,
            Self::InvalidFilter(_) => ErrorKind::Filter,
        }
    }

    pub(crate) fn invalid_value(field: &str, details: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.to_string(),
            details: details.into(),
        }
    }
}

/// Convenience alias for results with [DbError].
pub type Result<T> = std::result::Result<T, DbError>;
