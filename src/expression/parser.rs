//! Recursive-descent parser for the ARM / ADF expression language.
//!
//! Both dialects share one small grammar:
//!
//! ```text
//! expression := primary postfix*
//! primary    := STRING | INTEGER | IDENT '(' [expression (',' expression)*] ')'
//! postfix    := '.' IDENT | '[' expression ']' | '?'
//! ```
//!
//! Strings are single-quoted with `''` as the escaped quote. A `?` before a
//! member or index access is the null-safe operator and is accepted but
//! otherwise ignored.

use std::fmt;
use thiserror::Error;

/// Maximum call/index nesting accepted by the parser.
const MAX_NESTING: usize = 64;

/// Parsed expression tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    /// `'text'`
    Str(String),
    /// `42`, `-1`
    Int(i64),
    /// `name(arg, ...)`
    Call { name: String, args: Vec<Expr> },
    /// `base.property`
    Member { base: Box<Expr>, property: String },
    /// `base[index]`
    Index { base: Box<Expr>, index: Box<Expr> },
}

/// Renders the expression back to source form, with canonical spacing.
impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(text) => write!(f, "'{}'", text.replace('\'', "''")),
            Self::Int(n) => write!(f, "{n}"),
            Self::Call {
                name,
                args,
            } => {
                write!(f, "{name}(")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                f.write_str(")")
            }
            Self::Member {
                base,
                property,
            } => write!(f, "{base}.{property}"),
            Self::Index {
                base,
                index,
            } => write!(f, "{base}[{index}]"),
        }
    }
}

/// Syntax error with the byte offset where parsing stopped.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message} at offset {offset}")]
pub struct ParseError {
    pub message: String,
    pub offset: usize,
}

/// Parse a complete expression body (without the surrounding `[ ]` or `@`).
///
/// # Errors
///
/// Returns [`ParseError`] on any syntax error or trailing input.
pub fn parse(source: &str) -> Result<Expr, ParseError> {
    let mut parser = Parser::new(source);
    let expr = parser.expression(0)?;
    parser.skip_whitespace();
    if parser.peek().is_some() {
        return Err(parser.error("unexpected trailing input"));
    }
    Ok(expr)
}

struct Parser<'a> {
    source: &'a str,
    chars: Vec<(usize, char)>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.char_indices().collect(),
            pos: 0,
        }
    }

    fn offset(&self) -> usize {
        self.chars.get(self.pos).map_or(self.source.len(), |(offset, _)| *offset)
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError {
            message: message.into(),
            offset: self.offset(),
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).map(|(_, c)| *c)
    }

    fn peek_at(&self, ahead: usize) -> Option<char> {
        self.chars.get(self.pos + ahead).map(|(_, c)| *c)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn expect(&mut self, expected: char) -> Result<(), ParseError> {
        self.skip_whitespace();
        match self.peek() {
            Some(c) if c == expected => {
                self.pos += 1;
                Ok(())
            }
            Some(c) => Err(self.error(format!("expected '{expected}', found '{c}'"))),
            None => Err(self.error(format!("expected '{expected}', found end of input"))),
        }
    }

    fn expression(&mut self, depth: usize) -> Result<Expr, ParseError> {
        if depth > MAX_NESTING {
            return Err(self.error("expression nested too deeply"));
        }

        self.skip_whitespace();
        let mut expr = self.primary(depth)?;

        loop {
            self.skip_whitespace();
            match self.peek() {
                Some('?') if matches!(self.peek_at(1), Some('.' | '[')) => {
                    self.pos += 1;
                }
                Some('.') => {
                    self.pos += 1;
                    self.skip_whitespace();
                    let property = self.identifier()?;
                    expr = Expr::Member {
                        base: Box::new(expr),
                        property,
                    };
                }
                Some('[') => {
                    self.pos += 1;
                    let index = self.expression(depth + 1)?;
                    self.expect(']')?;
                    expr = Expr::Index {
                        base: Box::new(expr),
                        index: Box::new(index),
                    };
                }
                _ => break,
            }
        }

        Ok(expr)
    }

    fn primary(&mut self, depth: usize) -> Result<Expr, ParseError> {
        match self.peek() {
            Some('\'') => self.string().map(Expr::Str),
            Some(c) if c.is_ascii_digit() || c == '-' => self.integer().map(Expr::Int),
            Some(c) if c.is_alphabetic() || c == '_' => {
                let name = self.identifier()?;
                self.expect('(')?;
                let args = self.arguments(depth)?;
                Ok(Expr::Call {
                    name,
                    args,
                })
            }
            Some(c) => Err(self.error(format!("unexpected character '{c}'"))),
            None => Err(self.error("unexpected end of input")),
        }
    }

    /// Arguments after the opening parenthesis, consuming the closing one.
    fn arguments(&mut self, depth: usize) -> Result<Vec<Expr>, ParseError> {
        let mut args = Vec::new();
        self.skip_whitespace();
        if self.peek() == Some(')') {
            self.pos += 1;
            return Ok(args);
        }

        loop {
            args.push(self.expression(depth + 1)?);
            self.skip_whitespace();
            match self.bump() {
                Some(',') => {}
                Some(')') => return Ok(args),
                Some(c) => {
                    self.pos -= 1;
                    return Err(self.error(format!("expected ',' or ')', found '{c}'")));
                }
                None => return Err(self.error("unclosed argument list")),
            }
        }
    }

    fn string(&mut self) -> Result<String, ParseError> {
        let start = self.offset();
        self.pos += 1; // opening quote
        let mut text = String::new();
        loop {
            match self.bump() {
                Some('\'') if self.peek() == Some('\'') => {
                    self.pos += 1;
                    text.push('\'');
                }
                Some('\'') => return Ok(text),
                Some(c) => text.push(c),
                None => {
                    return Err(ParseError {
                        message: "unterminated string literal".to_string(),
                        offset: start,
                    });
                }
            }
        }
    }

    fn integer(&mut self) -> Result<i64, ParseError> {
        let start = self.pos;
        if self.peek() == Some('-') {
            self.pos += 1;
        }
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.pos += 1;
        }
        let literal: String = self.chars[start..self.pos].iter().map(|(_, c)| c).collect();
        literal.parse::<i64>().map_err(|_| ParseError {
            message: format!("invalid integer literal '{literal}'"),
            offset: self.chars[start].0,
        })
    }

    fn identifier(&mut self) -> Result<String, ParseError> {
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_alphanumeric() || c == '_') {
            self.pos += 1;
        }
        if start == self.pos {
            return Err(self.error("expected identifier"));
        }
        Ok(self.chars[start..self.pos].iter().map(|(_, c)| c).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(name: &str, args: Vec<Expr>) -> Expr {
        Expr::Call {
            name: name.to_string(),
            args,
        }
    }

    fn string(text: &str) -> Expr {
        Expr::Str(text.to_string())
    }

    #[test]
    fn test_parse_nested_calls() {
        let expr = parse("concat(parameters('factoryName'), '/PL_A')").unwrap();
        assert_eq!(
            expr,
            call("concat", vec![call("parameters", vec![string("factoryName")]), string("/PL_A")])
        );
    }

    #[test]
    fn test_parse_member_chain() {
        let expr = parse("pipeline().parameters.TableName").unwrap();
        assert_eq!(
            expr,
            Expr::Member {
                base: Box::new(Expr::Member {
                    base: Box::new(call("pipeline", vec![])),
                    property: "parameters".to_string(),
                }),
                property: "TableName".to_string(),
            }
        );
    }

    #[test]
    fn test_parse_index_and_null_safe() {
        let expr = parse("activity('Lookup')?.output['firstRow']").unwrap();
        match expr {
            Expr::Index { base, index } => {
                assert_eq!(*index, string("firstRow"));
                assert!(matches!(*base, Expr::Member { ref property, .. } if property == "output"));
            }
            other => panic!("unexpected expression: {other:?}"),
        }
    }

    #[test]
    fn test_parse_escaped_quote() {
        assert_eq!(parse("'it''s'").unwrap(), string("it's"));
    }

    #[test]
    fn test_parse_integers() {
        assert_eq!(parse("-12").unwrap(), Expr::Int(-12));
        assert_eq!(parse("split('a/b', '/')[1]").unwrap(), Expr::Index {
            base: Box::new(call("split", vec![string("a/b"), string("/")])),
            index: Box::new(Expr::Int(1)),
        });
    }

    #[test]
    fn test_parse_whitespace_tolerant() {
        let expr = parse("  concat ( 'a' ,  'b' )  ").unwrap();
        assert_eq!(expr, call("concat", vec![string("a"), string("b")]));
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse("concat('a'").unwrap_err().message.contains("unclosed"));
        assert!(parse("'open").unwrap_err().message.contains("unterminated"));
        assert!(parse("concat('a') extra").unwrap_err().message.contains("trailing"));
        assert!(parse("").is_err());
        assert!(parse("parameters").is_err());
        assert!(parse("concat('a' 'b')").is_err());
    }

    #[test]
    fn test_parse_rejects_runaway_nesting() {
        let source = format!("{}'x'{}", "f(".repeat(200), ")".repeat(200));
        assert!(parse(&source).unwrap_err().message.contains("too deeply"));
    }
}
