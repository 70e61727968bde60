//! A small JSON reader for command payloads.
//!
//! Only what the command language needs: objects (with quoted or bare keys),
//! arrays, strings, numbers kept as raw text, booleans and null.

use tracing::debug;

use crate::error::{DbError, Result};

/// A parsed JSON literal.
#[derive(Debug, Clone, PartialEq)]
pub enum JsonValue {
    /// Key/value pairs in source order. A repeated key replaces the earlier value.
    Object(Vec<(String, JsonValue)>),
    Array(Vec<JsonValue>),
    String(String),
    /// The numeral exactly as written, converted later against a field kind.
    Number(String),
    Bool(bool),
    Null,
}

impl JsonValue {
    /// Looks up a key in an object. Returns `None` for other variants.
    pub fn get(&self, key: &str) -> Option<&JsonValue> {
        match self {
            Self::Object(entries) => entries.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }

    /// Short human-readable name of the variant, used in error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Object(_) => "object",
            Self::Array(_) => "array",
            Self::String(_) => "string",
            Self::Number(_) => "number",
            Self::Bool(_) => "boolean",
            Self::Null => "null",
        }
    }
}

/// Parses a complete JSON literal.
///
/// # Errors
/// Returns [DbError::InvalidJson] on unexpected end of input, unbalanced
/// brackets, unterminated strings or trailing characters.
///
/// # Example
/// ```
/// # use schemadb::json::{parse, JsonValue};
/// let v = parse(r#"{ id: 1, "tags": ["a", "b"] }"#).unwrap();
/// assert_eq!(v.get("id"), Some(&JsonValue::Number("1".into())));
/// assert!(parse("{\"id\": 1").is_err());
/// ```
pub fn parse(input: &str) -> Result<JsonValue> {
    let mut parser = JsonParser::new(input);
    parser
        .parse_document()
        .inspect_err(|details| debug!(%details, "rejected JSON payload"))
        .map_err(|_| DbError::InvalidJson)
}

struct JsonParser {
    input: Vec<char>,
    position: usize,
}

impl JsonParser {
    fn new(input: &str) -> Self {
        Self {
            input: input.chars().collect(),
            position: 0,
        }
    }

    fn parse_document(&mut self) -> std::result::Result<JsonValue, String> {
        let value = self.parse_value()?;
        self.skip_whitespace();
        if !self.is_at_end() {
            return Err(format!("trailing characters at {}", self.position));
        }
        Ok(value)
    }

    fn parse_value(&mut self) -> std::result::Result<JsonValue, String> {
        self.skip_whitespace();
        let Some(c) = self.peek() else {
            return Err("unexpected end of input".into());
        };
        match c {
            '{' => self.parse_object(),
            '[' => self.parse_array(),
            '"' => self.parse_string().map(JsonValue::String),
            't' | 'f' => self.parse_bool(),
            'n' => {
                self.expect_word("null")?;
                Ok(JsonValue::Null)
            }
            c if c == '-' || c.is_ascii_digit() => self.parse_number(),
            c => Err(format!("unexpected character {c:?}")),
        }
    }

    fn parse_object(&mut self) -> std::result::Result<JsonValue, String> {
        self.expect('{')?;
        let mut entries: Vec<(String, JsonValue)> = Vec::new();
        if self.try_consume('}') {
            return Ok(JsonValue::Object(entries));
        }
        loop {
            let key = self.parse_key()?;
            self.expect(':')?;
            let value = self.parse_value()?;
            match entries.iter_mut().find(|(k, _)| *k == key) {
                Some(entry) => entry.1 = value,
                None => entries.push((key, value)),
            }
            if self.try_consume('}') {
                break;
            }
            self.expect(',')?;
        }
        Ok(JsonValue::Object(entries))
    }

    /// Keys are quoted strings or bare identifiers (`letters`, `digits`, `_`).
    fn parse_key(&mut self) -> std::result::Result<String, String> {
        self.skip_whitespace();
        if self.peek() == Some('"') {
            return self.parse_string();
        }
        let mut key = String::new();
        while let Some(c) = self.peek() {
            if !(c.is_alphanumeric() || c == '_') {
                break;
            }
            key.push(c);
            self.advance();
        }
        if key.is_empty() {
            return Err("invalid object key".into());
        }
        Ok(key)
    }

    fn parse_array(&mut self) -> std::result::Result<JsonValue, String> {
        self.expect('[')?;
        let mut items = Vec::new();
        if self.try_consume(']') {
            return Ok(JsonValue::Array(items));
        }
        loop {
            items.push(self.parse_value()?);
            if self.try_consume(']') {
                break;
            }
            self.expect(',')?;
        }
        Ok(JsonValue::Array(items))
    }

    fn parse_string(&mut self) -> std::result::Result<String, String> {
        self.expect('"')?;
        let mut out = String::new();
        while let Some(c) = self.next_char() {
            match c {
                '"' => return Ok(out),
                '\\' => {
                    let escaped = self
                        .next_char()
                        .ok_or_else(|| "unterminated escape".to_string())?;
                    out.push(decode_escape(escaped, &mut || self.next_char())?);
                }
                c => out.push(c),
            }
        }
        Err("unterminated string".into())
    }

    fn parse_bool(&mut self) -> std::result::Result<JsonValue, String> {
        if self.peek() == Some('t') {
            self.expect_word("true")?;
            Ok(JsonValue::Bool(true))
        } else {
            self.expect_word("false")?;
            Ok(JsonValue::Bool(false))
        }
    }

    /// Reads `-?digits(.digits)?([eE][+-]?digits)?` and keeps the raw text.
    fn parse_number(&mut self) -> std::result::Result<JsonValue, String> {
        let start = self.position;
        if self.peek() == Some('-') {
            self.advance();
        }
        let int_digits = self.skip_digits();
        if int_digits == 0 {
            return Err("invalid number".into());
        }
        if self.peek() == Some('.') {
            self.advance();
            if self.skip_digits() == 0 {
                return Err("invalid number fraction".into());
            }
        }
        if matches!(self.peek(), Some('e' | 'E')) {
            self.advance();
            if matches!(self.peek(), Some('+' | '-')) {
                self.advance();
            }
            if self.skip_digits() == 0 {
                return Err("invalid number exponent".into());
            }
        }
        Ok(JsonValue::Number(
            self.input[start..self.position].iter().collect(),
        ))
    }

    // --- Navigation Helpers ---

    fn peek(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    fn next_char(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.advance();
        Some(c)
    }

    fn advance(&mut self) {
        self.position += 1;
    }

    fn is_at_end(&self) -> bool {
        self.position >= self.input.len()
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.advance();
        }
    }

    fn skip_digits(&mut self) -> usize {
        let start = self.position;
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
        }
        self.position - start
    }

    fn expect(&mut self, expected: char) -> std::result::Result<(), String> {
        self.skip_whitespace();
        if self.peek() == Some(expected) {
            self.advance();
            Ok(())
        } else {
            Err(format!("expected {expected:?} at {}", self.position))
        }
    }

    fn try_consume(&mut self, expected: char) -> bool {
        self.skip_whitespace();
        if self.peek() == Some(expected) {
            self.advance();
            return true;
        }
        false
    }

    fn expect_word(&mut self, word: &str) -> std::result::Result<(), String> {
        for expected in word.chars() {
            if self.next_char() != Some(expected) {
                return Err(format!("invalid literal, expected {word}"));
            }
        }
        Ok(())
    }
}

/// Decodes the character after a backslash in a quoted string.
///
/// Handles `\b \f \n \r \t` and `\uXXXX` (with surrogate pairs, reading the
/// hex digits from `next`). `\"`, `\\`, `\/` and unknown escapes yield the
/// character itself. Shared by JSON payloads and filter string literals.
pub(crate) fn decode_escape<F>(escaped: char, next: &mut F) -> std::result::Result<char, String>
where
    F: FnMut() -> Option<char>,
{
    Ok(match escaped {
        'b' => '\u{8}',
        'f' => '\u{c}',
        'n' => '\n',
        'r' => '\r',
        't' => '\t',
        'u' => read_unicode_escape(next)?,
        other => other,
    })
}

fn read_unicode_escape<F>(next: &mut F) -> std::result::Result<char, String>
where
    F: FnMut() -> Option<char>,
{
    let high = read_hex4(next)?;
    if !(0xD800..0xDC00).contains(&high) {
        return char::from_u32(high).ok_or_else(|| "invalid unicode escape".to_string());
    }
    // surrogate pair: expect a trailing `\uDC00`-`\uDFFF`
    if next() != Some('\\') || next() != Some('u') {
        return Err("unpaired surrogate in unicode escape".into());
    }
    let low = read_hex4(next)?;
    if !(0xDC00..0xE000).contains(&low) {
        return Err("unpaired surrogate in unicode escape".into());
    }
    let code = 0x10000 + ((high - 0xD800) << 10) + (low - 0xDC00);
    char::from_u32(code).ok_or_else(|| "invalid unicode escape".to_string())
}

fn read_hex4<F>(next: &mut F) -> std::result::Result<u32, String>
where
    F: FnMut() -> Option<char>,
{
    let mut code = 0;
    for _ in 0..4 {
        let digit = next()
            .and_then(|c| c.to_digit(16))
            .ok_or_else(|| "invalid unicode escape".to_string())?;
        code = code * 16 + digit;
    }
    Ok(code)
}
