use crate::ast::ComparisonOp;
use crate::data_type::is_numeric_literal;
use crate::error::{DbError, Result};
use crate::json::decode_escape;

/// Represents the smallest meaningful units (atoms) of the filter language.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // --- Keywords (case-insensitive) ---
    And,
    Or,
    Include,

    // --- Identifiers & Literals ---
    /// A name that may refer to a field (e.g., `age`, `first_name`).
    Ident(String),
    /// A numeric literal kept as written (e.g., `-42`, `3.14`).
    Number(String),
    /// A string literal between double quotes, escapes already resolved.
    String(String),
    /// The boolean literal `true` or `false`.
    Bool(bool),
    /// Any other unquoted run, such as `2024-01-01T12:30:00`.
    Bare(String),

    // --- Symbols ---
    /// Left parenthesis `(`
    LeftParen,
    /// Right parenthesis `)`
    RightParen,
    /// One of `=`, `!=`, `<`, `<=`, `>`, `>=`.
    Op(ComparisonOp),

    // --- Special ---
    /// Represents the End Of Input.
    Eof,
}

impl Token {
    /// Text used to point at the token in error messages.
    pub fn describe(&self) -> String {
        match self {
            Token::And => "and".into(),
            Token::Or => "or".into(),
            Token::Include => "include".into(),
            Token::Ident(s) | Token::Number(s) | Token::Bare(s) => s.clone(),
            Token::String(s) => format!("{s:?}"),
            Token::Bool(b) => b.to_string(),
            Token::LeftParen => "(".into(),
            Token::RightParen => ")".into(),
            Token::Op(op) => op.to_string(),
            Token::Eof => "end of filter".into(),
        }
    }
}

fn is_operator_char(c: char) -> bool {
    matches!(c, '<' | '>' | '=' | '!')
}

fn is_identifier(word: &str) -> bool {
    let mut chars = word.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// A lexical scanner that converts a filter expression into a sequence of [Token]s.
pub struct Tokenizer {
    /// The input string stored as a vector of characters for easy iteration.
    input: Vec<char>,
    /// The current position in the character vector.
    position: usize,
}

impl Tokenizer {
    /// Creates a new Tokenizer for the given input string.
    pub fn new(input: &str) -> Self {
        Self {
            input: input.chars().collect(),
            position: 0,
        }
    }

    /// Processes the entire input and returns a vector of tokens ending with [Token::Eof].
    ///
    /// # Errors
    /// Returns an error on an unknown operator (such as `==` or a lone `!`) or
    /// an unterminated string literal.
    ///
    /// # Example
    /// ```
    /// # use schemadb::tokenizer::{Tokenizer, Token};
    /// # use schemadb::ast::ComparisonOp;
    /// let tokens = Tokenizer::new("age>=18").tokenize().unwrap();
    /// assert_eq!(tokens[0], Token::Ident("age".into()));
    /// assert_eq!(tokens[1], Token::Op(ComparisonOp::Ge));
    /// assert_eq!(tokens[2], Token::Number("18".into()));
    /// ```
    pub fn tokenize(&mut self) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();

        while !self.is_at_end() {
            self.skip_whitespace();

            if self.is_at_end() {
                break;
            }

            let token = self.next_token()?;
            tokens.push(token);
        }

        tokens.push(Token::Eof);
        Ok(tokens)
    }

    /// Identifies the next token based on the character at the current position.
    fn next_token(&mut self) -> Result<Token> {
        match self.current_char() {
            '(' => {
                self.advance();
                Ok(Token::LeftParen)
            }
            ')' => {
                self.advance();
                Ok(Token::RightParen)
            }
            '"' => self.read_string(),
            c if is_operator_char(c) => self.read_operator(),
            _ => Ok(self.read_word()),
        }
    }

    // --- Navigation Helpers ---

    /// Returns the character at the current position.
    fn current_char(&self) -> char {
        self.input[self.position]
    }

    /// Moves the cursor forward by one character.
    fn advance(&mut self) {
        self.position += 1;
    }

    /// Returns the current character and moves past it, or `None` at the end.
    fn next_char(&mut self) -> Option<char> {
        let c = self.input.get(self.position).copied()?;
        self.advance();
        Some(c)
    }

    /// Checks if the cursor has reached the end of the input.
    fn is_at_end(&self) -> bool {
        self.position >= self.input.len()
    }

    /// Consumes any whitespace characters (spaces, tabs, newlines).
    fn skip_whitespace(&mut self) {
        while !self.is_at_end() && self.current_char().is_whitespace() {
            self.advance();
        }
    }

    // --- Extraction Logic ---

    /// Reads an operator, combining `<`, `>`, `=` or `!` with a following `=`.
    fn read_operator(&mut self) -> Result<Token> {
        let mut op = String::from(self.current_char());
        self.advance();
        if !self.is_at_end() && self.current_char() == '=' {
            op.push('=');
            self.advance();
        }

        match op.as_str() {
            "=" => Ok(Token::Op(ComparisonOp::Eq)),
            "!=" => Ok(Token::Op(ComparisonOp::Ne)),
            "<" => Ok(Token::Op(ComparisonOp::Lt)),
            "<=" => Ok(Token::Op(ComparisonOp::Le)),
            ">" => Ok(Token::Op(ComparisonOp::Gt)),
            ">=" => Ok(Token::Op(ComparisonOp::Ge)),
            _ => Err(DbError::InvalidFilterSyntax(format!(
                "unknown operator {op:?}"
            ))),
        }
    }

    /// Reads a contiguous run up to whitespace, a parenthesis or an operator
    /// and classifies it. Keywords and booleans are matched case-insensitively.
    fn read_word(&mut self) -> Token {
        let mut word = String::new();
        while !self.is_at_end() {
            let c = self.current_char();
            if c.is_whitespace() || c == '(' || c == ')' || is_operator_char(c) {
                break;
            }
            word.push(c);
            self.advance();
        }

        match word.to_lowercase().as_str() {
            "and" => Token::And,
            "or" => Token::Or,
            "include" => Token::Include,
            "true" => Token::Bool(true),
            "false" => Token::Bool(false),
            _ if is_numeric_literal(&word) => Token::Number(word),
            _ if is_identifier(&word) => Token::Ident(word),
            _ => Token::Bare(word),
        }
    }

    /// Reads a string literal enclosed in double quotes.
    ///
    /// Escapes are decoded exactly as in JSON payloads, so a value stored
    /// through an insert can be matched with the same literal text.
    fn read_string(&mut self) -> Result<Token> {
        self.advance(); // Skip the opening quote

        let mut string = String::new();
        while let Some(c) = self.next_char() {
            match c {
                '"' => return Ok(Token::String(string)),
                '\\' => {
                    let Some(escaped) = self.next_char() else {
                        break;
                    };
                    let decoded = decode_escape(escaped, &mut || self.next_char())
                        .map_err(DbError::InvalidFilterSyntax)?;
                    string.push(decoded);
                }
                c => string.push(c),
            }
        }

        Err(DbError::InvalidFilterSyntax(format!(
            "unterminated string starting with {string:?}"
        )))
    }
}
