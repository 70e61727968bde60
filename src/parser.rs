use crate::ast::{ComparisonOp, Expr, Operand};
use crate::error::{DbError, Result};
use crate::tokenizer::{Token, Tokenizer};

/// Tokenizes and parses a filter expression (the text between the outer parentheses).
///
/// # Example
/// ```
/// # use schemadb::parser::parse_filter;
/// # use schemadb::ast::Expr;
/// let expr = parse_filter("a = true OR b = true AND c = true").unwrap();
/// assert!(matches!(expr, Expr::Or { .. }));
/// ```
pub fn parse_filter(text: &str) -> Result<Expr> {
    let tokens = Tokenizer::new(text).tokenize()?;
    Parser::new(tokens).parse()
}

/// Recursive-descent parser for the filter grammar, lowest precedence first:
///
/// ```text
/// or         := and (OR and)*
/// and        := atom (AND atom)*
/// atom       := '(' or ')' | comparison
/// comparison := operand operator operand
/// ```
pub struct Parser {
    tokens: Vec<Token>,
    position: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            position: 0,
        }
    }

    pub fn parse(&mut self) -> Result<Expr> {
        let expr = self.parse_or()?;

        // Check we consumed the whole filter
        if !self.is_at_end() {
            return Err(self.unexpected());
        }

        Ok(expr)
    }

    //helpers
    fn current_token(&self) -> &Token {
        &self.tokens[self.position]
    }

    fn advance(&mut self) {
        if self.position < self.tokens.len() - 1 {
            self.position += 1;
        }
    }

    fn is_at_end(&self) -> bool {
        matches!(self.current_token(), Token::Eof)
    }

    fn consume(&mut self, expected: Token) -> Result<()> {
        if *self.current_token() == expected {
            self.advance();
            Ok(())
        } else {
            Err(self.unexpected())
        }
    }

    fn unexpected(&self) -> DbError {
        DbError::InvalidFilterSyntax(format!("unexpected {}", self.current_token().describe()))
    }

    fn parse_or(&mut self) -> Result<Expr> {
        let mut left = self.parse_and()?;
        while matches!(self.current_token(), Token::Or) {
            self.advance();
            let right = self.parse_and()?;
            left = Expr::Or {
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr> {
        let mut left = self.parse_atom()?;
        while matches!(self.current_token(), Token::And) {
            self.advance();
            let right = self.parse_atom()?;
            left = Expr::And {
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_atom(&mut self) -> Result<Expr> {
        if matches!(self.current_token(), Token::LeftParen) {
            self.advance();
            let inside = self.parse_or()?;
            self.consume(Token::RightParen)?;
            return Ok(inside);
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Expr> {
        let left = self.parse_operand()?;
        let op = self.parse_operator()?;
        let right = self.parse_operand()?;
        Ok(Expr::Comparison { left, op, right })
    }

    fn parse_operand(&mut self) -> Result<Operand> {
        let operand = match self.current_token() {
            Token::Ident(s) => Operand::Ident(s.clone()),
            Token::String(s) => Operand::String(s.clone()),
            Token::Number(s) => Operand::Number(s.clone()),
            Token::Bool(b) => Operand::Bool(*b),
            Token::Bare(s) => Operand::Bare(s.clone()),
            _ => return Err(self.unexpected()),
        };
        self.advance();
        Ok(operand)
    }

    fn parse_operator(&mut self) -> Result<ComparisonOp> {
        let op = match self.current_token() {
            Token::Op(op) => *op,
            Token::Include => ComparisonOp::Include,
            _ => return Err(self.unexpected()),
        };
        self.advance();
        Ok(op)
    }
}
