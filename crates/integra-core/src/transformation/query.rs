//! Boolean row filter language used by `filter_set`
//!
//! Grammar (lowest to highest precedence):
//!
//! ```text
//! or         := and (("or" | "|") and)*
//! and        := not (("and" | "&") not)*
//! not        := ("not" | "~") not | comparison
//! comparison := operand (("==" | "!=" | "<" | "<=" | ">" | ">=") operand
//!                       | "in" operand | "not" "in" operand)?
//! operand    := "(" or ")" | literal | field
//! ```
//!
//! Literals are quoted strings, numbers, `True`, `False`, `None` and
//! `[...]` lists. Fields are bare identifiers or back-quoted names. Missing
//! fields read as null; ordering comparisons against null are false.
//!
//! Copyright (c) 2025 Integra Team
//! Licensed under the Apache-2.0 license

use crate::types::{compare_values, is_truthy, values_equal, Record};
use crate::{Error, Result};
use serde_json::{Number, Value};
use std::cmp::Ordering;
use std::fmt;

/// Comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    In,
    NotIn,
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            CompareOp::Eq => "==",
            CompareOp::Ne => "!=",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
            CompareOp::In => "in",
            CompareOp::NotIn => "not in",
        };
        f.write_str(symbol)
    }
}

/// Parsed filter expression
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Field(String),
    Literal(Value),
    List(Vec<Expr>),
    Not(Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Compare {
        left: Box<Expr>,
        op: CompareOp,
        right: Box<Expr>,
    },
}

impl Expr {
    /// Evaluate against one row
    pub fn eval(&self, row: &Record) -> Value {
        match self {
            Expr::Field(name) => row.get(name).cloned().unwrap_or(Value::Null),
            Expr::Literal(value) => value.clone(),
            Expr::List(items) => Value::Array(items.iter().map(|item| item.eval(row)).collect()),
            Expr::Not(inner) => Value::Bool(!is_truthy(&inner.eval(row))),
            Expr::And(left, right) => {
                Value::Bool(is_truthy(&left.eval(row)) && is_truthy(&right.eval(row)))
            }
            Expr::Or(left, right) => {
                Value::Bool(is_truthy(&left.eval(row)) || is_truthy(&right.eval(row)))
            }
            Expr::Compare { left, op, right } => {
                Value::Bool(compare(&left.eval(row), *op, &right.eval(row)))
            }
        }
    }
}

fn compare(left: &Value, op: CompareOp, right: &Value) -> bool {
    let ordered = |wanted: &[Ordering]| {
        compare_values(left, right).map_or(false, |ordering| wanted.contains(&ordering))
    };
    match op {
        CompareOp::Eq => values_equal(left, right),
        CompareOp::Ne => !values_equal(left, right),
        CompareOp::Lt => ordered(&[Ordering::Less]),
        CompareOp::Le => ordered(&[Ordering::Less, Ordering::Equal]),
        CompareOp::Gt => ordered(&[Ordering::Greater]),
        CompareOp::Ge => ordered(&[Ordering::Greater, Ordering::Equal]),
        CompareOp::In => contains(right, left),
        CompareOp::NotIn => !contains(right, left),
    }
}

fn contains(haystack: &Value, needle: &Value) -> bool {
    match haystack {
        Value::Array(items) => items.iter().any(|item| values_equal(item, needle)),
        Value::String(text) => needle.as_str().is_some_and(|n| text.contains(n)),
        _ => false,
    }
}

/// Compiled row filter
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    source: String,
    expr: Expr,
}

impl Query {
    /// Parse a filter expression
    pub fn parse(source: &str) -> Result<Self> {
        let tokens = Lexer::new(source).tokenize()?;
        let mut parser = Parser {
            source,
            tokens,
            position: 0,
        };
        let expr = parser.parse_or()?;
        if let Some(token) = parser.peek() {
            return Err(parser.error(&format!("unexpected {}", token)));
        }
        Ok(Self {
            source: source.to_string(),
            expr,
        })
    }

    /// Whether `row` passes the filter
    pub fn matches(&self, row: &Record) -> bool {
        is_truthy(&self.expr.eval(row))
    }

    pub fn expr(&self) -> &Expr {
        &self.expr
    }

    pub fn source(&self) -> &str {
        &self.source
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    And,
    Or,
    Not,
    In,
    Op(CompareOp),
    Literal(Value),
    Ident(String),
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::LParen => f.write_str("'('"),
            Token::RParen => f.write_str("')'"),
            Token::LBracket => f.write_str("'['"),
            Token::RBracket => f.write_str("']'"),
            Token::Comma => f.write_str("','"),
            Token::And => f.write_str("'and'"),
            Token::Or => f.write_str("'or'"),
            Token::Not => f.write_str("'not'"),
            Token::In => f.write_str("'in'"),
            Token::Op(op) => write!(f, "'{}'", op),
            Token::Literal(value) => write!(f, "literal {}", value),
            Token::Ident(name) => write!(f, "field '{}'", name),
        }
    }
}

struct Lexer<'a> {
    source: &'a str,
    chars: Vec<char>,
    position: usize,
}

impl<'a> Lexer<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.chars().collect(),
            position: 0,
        }
    }

    fn tokenize(mut self) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();
        while let Some(c) = self.current() {
            if c.is_whitespace() {
                self.position += 1;
                continue;
            }
            let token = match c {
                '(' => self.single(Token::LParen),
                ')' => self.single(Token::RParen),
                '[' => self.single(Token::LBracket),
                ']' => self.single(Token::RBracket),
                ',' => self.single(Token::Comma),
                '&' => self.single(Token::And),
                '|' => self.single(Token::Or),
                '~' => self.single(Token::Not),
                '=' | '!' | '<' | '>' => self.operator()?,
                '\'' | '"' => Token::Literal(Value::String(self.quoted(c)?)),
                '`' => Token::Ident(self.quoted('`')?),
                c if c.is_ascii_digit() || c == '.' => self.number()?,
                '-' if self.next_is_digit() => self.number()?,
                c if c.is_alphabetic() || c == '_' => self.word(),
                other => return Err(self.error(&format!("unexpected character '{}'", other))),
            };
            tokens.push(token);
        }
        Ok(tokens)
    }

    fn current(&self) -> Option<char> {
        self.chars.get(self.position).copied()
    }

    fn next_is_digit(&self) -> bool {
        self.chars
            .get(self.position + 1)
            .is_some_and(|c| c.is_ascii_digit() || *c == '.')
    }

    fn single(&mut self, token: Token) -> Token {
        self.position += 1;
        token
    }

    fn operator(&mut self) -> Result<Token> {
        let first = self.chars[self.position];
        let second = self.chars.get(self.position + 1).copied();
        let (op, width) = match (first, second) {
            ('=', Some('=')) => (CompareOp::Eq, 2),
            ('!', Some('=')) => (CompareOp::Ne, 2),
            ('<', Some('=')) => (CompareOp::Le, 2),
            ('>', Some('=')) => (CompareOp::Ge, 2),
            ('<', _) => (CompareOp::Lt, 1),
            ('>', _) => (CompareOp::Gt, 1),
            _ => return Err(self.error(&format!("unexpected character '{}'", first))),
        };
        self.position += width;
        Ok(Token::Op(op))
    }

    fn quoted(&mut self, quote: char) -> Result<String> {
        let start = self.position;
        self.position += 1;
        let mut text = String::new();
        while let Some(c) = self.current() {
            self.position += 1;
            match c {
                '\\' => {
                    if let Some(escaped) = self.current() {
                        text.push(escaped);
                        self.position += 1;
                    }
                }
                c if c == quote => return Ok(text),
                c => text.push(c),
            }
        }
        self.position = start;
        Err(self.error("unterminated quote"))
    }

    fn number(&mut self) -> Result<Token> {
        let start = self.position;
        self.position += 1;
        while let Some(c) = self.current() {
            if c.is_ascii_digit() || c == '.' {
                self.position += 1;
            } else if c == 'e' || c == 'E' {
                self.position += 1;
                if matches!(self.current(), Some('+' | '-')) {
                    self.position += 1;
                }
            } else {
                break;
            }
        }
        let text: String = self.chars[start..self.position].iter().collect();
        if let Ok(int) = text.parse::<i64>() {
            return Ok(Token::Literal(Value::from(int)));
        }
        text.parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(|n| Token::Literal(Value::Number(n)))
            .ok_or_else(|| {
                self.position = start;
                self.error(&format!("invalid number '{}'", text))
            })
    }

    fn word(&mut self) -> Token {
        let start = self.position;
        while let Some(c) = self.current() {
            if c.is_alphanumeric() || c == '_' {
                self.position += 1;
            } else {
                break;
            }
        }
        let word: String = self.chars[start..self.position].iter().collect();
        match word.as_str() {
            "and" => Token::And,
            "or" => Token::Or,
            "not" => Token::Not,
            "in" => Token::In,
            "True" => Token::Literal(Value::Bool(true)),
            "False" => Token::Literal(Value::Bool(false)),
            "None" => Token::Literal(Value::Null),
            _ => Token::Ident(word),
        }
    }

    fn error(&self, message: &str) -> Error {
        query_error(self.source, message, self.position)
    }
}

struct Parser<'a> {
    source: &'a str,
    tokens: Vec<Token>,
    position: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.position)
    }

    fn peek_at(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.position + offset)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.position).cloned();
        self.position += 1;
        token
    }

    fn expect(&mut self, expected: Token) -> Result<()> {
        match self.advance() {
            Some(token) if token == expected => Ok(()),
            Some(token) => Err(self.error(&format!("expected {}, found {}", expected, token))),
            None => Err(self.error(&format!("expected {}, found end of input", expected))),
        }
    }

    fn parse_or(&mut self) -> Result<Expr> {
        let mut left = self.parse_and()?;
        while self.peek() == Some(&Token::Or) {
            self.advance();
            let right = self.parse_and()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr> {
        let mut left = self.parse_not()?;
        while self.peek() == Some(&Token::And) {
            self.advance();
            let right = self.parse_not()?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> Result<Expr> {
        if self.peek() == Some(&Token::Not) {
            self.advance();
            let inner = self.parse_not()?;
            return Ok(Expr::Not(Box::new(inner)));
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Expr> {
        let left = self.parse_operand()?;
        let op = match (self.peek(), self.peek_at(1)) {
            (Some(Token::Op(op)), _) => {
                let op = *op;
                self.advance();
                op
            }
            (Some(Token::In), _) => {
                self.advance();
                CompareOp::In
            }
            (Some(Token::Not), Some(Token::In)) => {
                self.advance();
                self.advance();
                CompareOp::NotIn
            }
            _ => return Ok(left),
        };
        let right = self.parse_operand()?;
        Ok(Expr::Compare {
            left: Box::new(left),
            op,
            right: Box::new(right),
        })
    }

    fn parse_operand(&mut self) -> Result<Expr> {
        match self.advance() {
            Some(Token::LParen) => {
                let inner = self.parse_or()?;
                self.expect(Token::RParen)?;
                Ok(inner)
            }
            Some(Token::LBracket) => {
                let mut items = Vec::new();
                if self.peek() == Some(&Token::RBracket) {
                    self.advance();
                    return Ok(Expr::List(items));
                }
                loop {
                    items.push(self.parse_operand()?);
                    match self.advance() {
                        Some(Token::Comma) => continue,
                        Some(Token::RBracket) => break,
                        Some(token) => {
                            return Err(self.error(&format!("expected ',' or ']', found {}", token)))
                        }
                        None => return Err(self.error("unterminated list")),
                    }
                }
                Ok(Expr::List(items))
            }
            Some(Token::Literal(value)) => Ok(Expr::Literal(value)),
            Some(Token::Ident(name)) => Ok(Expr::Field(name)),
            Some(token) => Err(self.error(&format!("unexpected {}", token))),
            None => Err(self.error("unexpected end of input")),
        }
    }

    fn error(&self, message: &str) -> Error {
        query_error(self.source, message, self.position)
    }
}

fn query_error(source: &str, message: &str, position: usize) -> Error {
    Error::config(format!(
        "Invalid filter expression '{}': {} (at {})",
        source, message, position
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: Value) -> Record {
        value.as_object().cloned().unwrap()
    }

    fn check(expr: &str, value: Value) -> bool {
        Query::parse(expr).unwrap().matches(&row(value))
    }

    #[test]
    fn test_comparisons() {
        let r = json!({"status": "Done", "points": 5, "ratio": 0.5});
        assert!(check("status == 'Done'", r.clone()));
        assert!(check("points >= 5 and ratio < 1", r.clone()));
        assert!(check("points != 4", r.clone()));
        assert!(!check("points > 5", r.clone()));
        assert!(check("-1 < points", r));
    }

    #[test]
    fn test_exponent_literals() {
        let r = json!({"rate": 0.00002, "big": 1500});
        assert!(check("rate > 1e-5", r.clone()));
        assert!(check("rate < 2.5E-5", r.clone()));
        assert!(check("big > 1.4e+3", r.clone()));
        assert!(check("big < 2e3", r));
    }

    #[test]
    fn test_boolean_operators_and_precedence() {
        let r = json!({"a": 1, "b": 2});
        assert!(check("a == 1 or b == 3 and a == 2", r.clone()));
        assert!(!check("(a == 1 or b == 3) and a == 2", r.clone()));
        assert!(check("~(a == 2) & b == 2", r.clone()));
        assert!(check("not a == 2 | False", r));
    }

    #[test]
    fn test_membership() {
        let r = json!({"status": "Open", "labels": ["x", "y"]});
        assert!(check("status in ['Open', \"In Progress\"]", r.clone()));
        assert!(check("status not in ['Done']", r.clone()));
        assert!(check("'y' in labels", r));
    }

    #[test]
    fn test_missing_fields_are_null() {
        let r = json!({"a": 1});
        assert!(check("missing == None", r.clone()));
        assert!(!check("missing > 0", r.clone()));
        assert!(!check("missing < 0", r));
    }

    #[test]
    fn test_backquoted_fields() {
        let r = json!({"story points": 3});
        assert!(check("`story points` == 3", r));
    }

    #[test]
    fn test_parse_errors() {
        for bad in ["a ==", "(a == 1", "a = 1", "'open", "a == 1 b", "[1, 2"] {
            let err = Query::parse(bad).unwrap_err();
            assert!(matches!(err, Error::Configuration { .. }), "{}", bad);
        }
    }
}
