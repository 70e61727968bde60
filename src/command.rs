//! Splits one line of the command language into a [Statement].
//!
//! ```text
//! create <Type> { "<field>": { "type": "<kind>", "required": <bool>, "unique": <bool> }, ... }
//! insert <Type> { "<field>": <json>, ... }
//! update <Type> [ ( <filter> ) ] { "<field>": <json>, ... }
//! delete <Type> [ ( <filter> ) ]
//! search <Type> [ ( <filter> ) ]
//! ```

use crate::ast::{CreateType, Delete, Expr, Insert, Search, Statement, Update};
use crate::data_type::DataType;
use crate::error::{DbError, Result};
use crate::json::{self, JsonValue};
use crate::parser::parse_filter;
use crate::table::FieldDef;

/// Parses one command line.
///
/// The action keyword is case-insensitive. Type and field names are kept as
/// written; they are canonicalized when resolved against the store.
///
/// # Example
/// ```
/// # use schemadb::command::parse;
/// # use schemadb::ast::Statement;
/// let stmt = parse("search User (age > 18 AND active = true)").unwrap();
/// assert!(matches!(stmt, Statement::Search(s) if s.table == "User" && s.filter.is_some()));
/// ```
pub fn parse(line: &str) -> Result<Statement> {
    let line = line.trim();
    if line.is_empty() {
        return Err(DbError::InvalidCommandFormat);
    }

    let (action, rest) = match line.split_once(char::is_whitespace) {
        Some((action, rest)) => (action, rest),
        None => (line, ""),
    };

    match action.to_lowercase().as_str() {
        "create" => parse_create(rest),
        "insert" => parse_insert(rest),
        "update" => parse_update(rest),
        "delete" => parse_delete(rest),
        "search" => parse_search(rest),
        _ => Err(DbError::InvalidCommand(action.to_string())),
    }
}

fn syntax(command: &'static str, details: impl Into<String>) -> DbError {
    DbError::InvalidSyntax {
        command,
        details: details.into(),
    }
}

/// Takes the type name off the front of `rest`. The name stops at whitespace,
/// `{` or `(`.
fn split_type_name<'a>(command: &'static str, rest: &'a str) -> Result<(&'a str, &'a str)> {
    let rest = rest.trim_start();
    let end = rest
        .find(|c: char| c.is_whitespace() || c == '{' || c == '(')
        .unwrap_or(rest.len());
    let (name, tail) = rest.split_at(end);
    if name.is_empty() {
        return Err(syntax(command, "missing type name"));
    }
    Ok((name, tail.trim()))
}

/// Parses the JSON object payload of `create`, `insert` and `update`.
fn parse_payload(command: &'static str, text: &str) -> Result<Vec<(String, JsonValue)>> {
    if !text.starts_with('{') {
        return Err(syntax(command, "expected JSON object"));
    }
    match json::parse(text)? {
        JsonValue::Object(entries) => Ok(entries),
        _ => Err(syntax(command, "expected JSON object")),
    }
}

/// Splits a leading `( ... )` run off `text`, honoring nesting and skipping
/// parentheses inside quoted strings. Returns the inner text and what follows
/// the closing parenthesis.
fn split_filter<'a>(command: &'static str, text: &'a str) -> Result<(&'a str, &'a str)> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in text.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Ok((&text[1..i], text[i + 1..].trim()));
                }
            }
            _ => {}
        }
    }
    Err(syntax(command, "unbalanced parentheses in filter"))
}

/// Parses an optional leading filter. `()` and a missing filter both select
/// every record.
fn parse_optional_filter<'a>(
    command: &'static str,
    text: &'a str,
) -> Result<(Option<Expr>, &'a str)> {
    if !text.starts_with('(') {
        return Ok((None, text));
    }
    let (inner, rest) = split_filter(command, text)?;
    if inner.trim().is_empty() {
        return Ok((None, rest));
    }
    Ok((Some(parse_filter(inner)?), rest))
}

fn parse_create(rest: &str) -> Result<Statement> {
    let (name, payload) = split_type_name("create", rest)?;
    let entries = parse_payload("create", payload)?;
    if entries.is_empty() {
        return Err(DbError::EmptyFields);
    }

    let fields = entries
        .into_iter()
        .map(|(field, props)| field_def(field, &props))
        .collect::<Result<Vec<_>>>()?;

    Ok(Statement::CreateType(CreateType {
        name: name.to_string(),
        fields,
    }))
}

/// Builds a field definition from its property object. Every property is
/// optional: the kind defaults to `string`, the flags to `false`.
fn field_def(name: String, props: &JsonValue) -> Result<FieldDef> {
    if !matches!(props, JsonValue::Object(_)) {
        return Err(DbError::InvalidFieldDefinition(name));
    }

    let kind = match props.get("type") {
        None | Some(JsonValue::Null) => DataType::Text,
        Some(JsonValue::String(s)) | Some(JsonValue::Number(s)) => DataType::from_spec(s)?,
        Some(JsonValue::Bool(b)) => DataType::from_spec(&b.to_string())?,
        Some(_) => return Err(DbError::InvalidFieldDefinition(name)),
    };

    let required = flag(&name, props.get("required"))?;
    let unique = flag(&name, props.get("unique"))?;

    Ok(FieldDef {
        name,
        data_type: kind,
        required,
        unique,
    })
}

fn flag(field: &str, value: Option<&JsonValue>) -> Result<bool> {
    match value {
        None | Some(JsonValue::Null) => Ok(false),
        Some(JsonValue::Bool(b)) => Ok(*b),
        Some(JsonValue::String(s)) if s.eq_ignore_ascii_case("true") => Ok(true),
        Some(JsonValue::String(s)) if s.eq_ignore_ascii_case("false") => Ok(false),
        Some(_) => Err(DbError::InvalidFieldDefinition(field.to_string())),
    }
}

fn parse_insert(rest: &str) -> Result<Statement> {
    let (name, payload) = split_type_name("insert", rest)?;
    let values = parse_payload("insert", payload)?;
    Ok(Statement::Insert(Insert {
        table: name.to_string(),
        values,
    }))
}

fn parse_update(rest: &str) -> Result<Statement> {
    let (name, tail) = split_type_name("update", rest)?;
    let (filter, payload) = parse_optional_filter("update", tail)?;
    let assignments = parse_payload("update", payload)?;
    Ok(Statement::Update(Update {
        table: name.to_string(),
        filter,
        assignments,
    }))
}

/// Shared tail of `delete` and `search`: an optional filter and nothing else.
fn parse_filter_only(command: &'static str, rest: &str) -> Result<(String, Option<Expr>)> {
    let (name, tail) = split_type_name(command, rest)?;
    let (filter, trailing) = parse_optional_filter(command, tail)?;
    if !trailing.is_empty() {
        return Err(syntax(command, format!("trailing characters: {trailing}")));
    }
    Ok((name.to_string(), filter))
}

fn parse_delete(rest: &str) -> Result<Statement> {
    let (table, filter) = parse_filter_only("delete", rest)?;
    Ok(Statement::Delete(Delete { table, filter }))
}

fn parse_search(rest: &str) -> Result<Statement> {
    let (table, filter) = parse_filter_only("search", rest)?;
    Ok(Statement::Search(Search { table, filter }))
}
