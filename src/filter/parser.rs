//! Filter and cut-rule parser
//!
//! Grammar:
//!
//! ```text
//! filter  := clause (AND clause)*
//! clause  := ref op operand
//!          | ref IS [NOT] NULL
//! operand := literal | ref | NULL
//! cut     := cutterm (AND cutterm)*
//! cutterm := op literal | literal
//! AND     := and | AND | & | &&
//! op      := == | = | != | < | <= | > | >=
//! literal := number | 'text' | "text" | true | false
//! ```
//!
//! `ref == null` and `ref != null` are sugar for `IS NULL` / `IS NOT NULL`.
//! In cut rules a bare word is read as a text literal and a term without an
//! operator means equality.

use serde_json::Value;

use super::ast::{CompareOp, CutCondition, FilterExpr, Operand};
use super::errors::{FilterError, FilterResult};
use crate::table::value::number_value;
use crate::table::ColumnRef;

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Number(Value),
    Str(String),
    Bool(bool),
    Op(CompareOp),
    And,
    Is,
    Not,
    Null,
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Token::Ident(s) => format!("identifier '{}'", s),
            Token::Number(n) => format!("number {}", n),
            Token::Str(s) => format!("string '{}'", s),
            Token::Bool(b) => format!("{}", b),
            Token::Op(op) => format!("operator '{}'", op),
            Token::And => "AND".into(),
            Token::Is => "IS".into(),
            Token::Not => "NOT".into(),
            Token::Null => "NULL".into(),
        }
    }

    fn literal(&self) -> Option<Value> {
        match self {
            Token::Number(n) => Some(n.clone()),
            Token::Str(s) => Some(Value::String(s.clone())),
            Token::Bool(b) => Some(Value::Bool(*b)),
            _ => None,
        }
    }
}

fn tokenize(input: &str) -> FilterResult<Vec<Token>> {
    let chars: Vec<(usize, char)> = input.char_indices().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    let peek = |i: usize| chars.get(i).map(|(_, c)| *c);

    while i < chars.len() {
        let (pos, c) = chars[i];
        match c {
            c if c.is_whitespace() => i += 1,
            '&' => {
                i += if peek(i + 1) == Some('&') { 2 } else { 1 };
                tokens.push(Token::And);
            }
            '=' => {
                i += if peek(i + 1) == Some('=') { 2 } else { 1 };
                tokens.push(Token::Op(CompareOp::Eq));
            }
            '!' if peek(i + 1) == Some('=') => {
                i += 2;
                tokens.push(Token::Op(CompareOp::Ne));
            }
            '<' | '>' => {
                let with_eq = peek(i + 1) == Some('=');
                let op = match (c, with_eq) {
                    ('<', false) => CompareOp::Lt,
                    ('<', true) => CompareOp::Le,
                    (_, false) => CompareOp::Gt,
                    (_, true) => CompareOp::Ge,
                };
                i += if with_eq { 2 } else { 1 };
                tokens.push(Token::Op(op));
            }
            '\'' | '"' => {
                let quote = c;
                let mut text = String::new();
                i += 1;
                loop {
                    match peek(i) {
                        Some(ch) if ch == quote => {
                            i += 1;
                            break;
                        }
                        Some(ch) => {
                            text.push(ch);
                            i += 1;
                        }
                        None => return Err(FilterError::UnterminatedString(pos)),
                    }
                }
                tokens.push(Token::Str(text));
            }
            c if c.is_ascii_digit()
                || ((c == '-' || c == '.') && peek(i + 1).map_or(false, |n| n.is_ascii_digit())) =>
            {
                let start = i;
                i += 1;
                while let Some(ch) = peek(i) {
                    let exponent_sign = (ch == '-' || ch == '+')
                        && matches!(peek(i - 1), Some('e') | Some('E'));
                    if ch.is_ascii_digit() || ch == '.' || ch == 'e' || ch == 'E' || exponent_sign {
                        i += 1;
                    } else {
                        break;
                    }
                }
                let text: String = chars[start..i].iter().map(|(_, ch)| ch).collect();
                tokens.push(Token::Number(parse_number(&text, pos)?));
            }
            c if c.is_alphabetic() || c == '_' => {
                let start = i;
                while let Some(ch) = peek(i) {
                    if ch.is_alphanumeric() || ch == '_' || ch == '.' {
                        i += 1;
                    } else {
                        break;
                    }
                }
                let word: String = chars[start..i].iter().map(|(_, ch)| ch).collect();
                tokens.push(keyword(word));
            }
            other => {
                return Err(FilterError::Lex {
                    position: pos,
                    found: other,
                })
            }
        }
    }

    Ok(tokens)
}

fn keyword(word: String) -> Token {
    match word.to_ascii_lowercase().as_str() {
        "and" => Token::And,
        "is" => Token::Is,
        "not" => Token::Not,
        "null" | "none" => Token::Null,
        "true" => Token::Bool(true),
        "false" => Token::Bool(false),
        _ => Token::Ident(word),
    }
}

fn parse_number(text: &str, position: usize) -> FilterResult<Value> {
    if let Ok(i) = text.parse::<i64>() {
        return Ok(Value::from(i));
    }
    text.parse::<f64>()
        .ok()
        .filter(|f| f.is_finite())
        .map(number_value)
        .ok_or_else(|| FilterError::Syntax(format!("invalid number '{}' at position {}", text, position)))
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn unexpected(&self, expected: &str) -> FilterError {
        match self.peek() {
            Some(t) => FilterError::Syntax(format!("expected {}, found {}", expected, t.describe())),
            None => FilterError::Syntax(format!("expected {}, found end of input", expected)),
        }
    }

    /// Splits the stream on AND, parsing each part with `clause`
    fn conjunction<T>(&mut self, mut clause: impl FnMut(&mut Self) -> FilterResult<T>) -> FilterResult<Vec<T>> {
        if self.at_end() {
            return Err(FilterError::Syntax("empty expression".into()));
        }
        let mut parts = vec![clause(self)?];
        while let Some(Token::And) = self.peek() {
            self.pos += 1;
            parts.push(clause(self)?);
        }
        if !self.at_end() {
            return Err(self.unexpected("AND or end of input"));
        }
        Ok(parts)
    }

    fn filter_clause(&mut self) -> FilterResult<FilterExpr> {
        let column = match self.peek() {
            Some(Token::Ident(name)) => ColumnRef::parse(name),
            _ => return Err(self.unexpected("column reference")),
        };
        self.pos += 1;

        match self.peek() {
            Some(Token::Is) => {
                self.pos += 1;
                let negated = self.peek() == Some(&Token::Not);
                if negated {
                    self.pos += 1;
                }
                if self.peek() != Some(&Token::Null) {
                    return Err(self.unexpected("NULL"));
                }
                self.pos += 1;
                Ok(if negated {
                    FilterExpr::IsNotNull(column)
                } else {
                    FilterExpr::IsNull(column)
                })
            }
            Some(Token::Op(op)) => {
                let op = *op;
                self.pos += 1;
                let right = match self.peek() {
                    Some(Token::Null) => {
                        self.pos += 1;
                        return match op {
                            CompareOp::Eq => Ok(FilterExpr::IsNull(column)),
                            CompareOp::Ne => Ok(FilterExpr::IsNotNull(column)),
                            other => Err(FilterError::Syntax(format!(
                                "operator '{}' cannot compare against NULL",
                                other
                            ))),
                        };
                    }
                    Some(Token::Ident(name)) => Operand::Column(ColumnRef::parse(name)),
                    Some(token) => match token.literal() {
                        Some(value) => Operand::Literal(value),
                        None => return Err(self.unexpected("literal or column reference")),
                    },
                    None => return Err(self.unexpected("literal or column reference")),
                };
                self.pos += 1;
                Ok(FilterExpr::Comparison {
                    left: column,
                    op,
                    right,
                })
            }
            _ => Err(self.unexpected("comparison operator or IS")),
        }
    }

    fn cut_clause(&mut self) -> FilterResult<(CompareOp, Value)> {
        let op = match self.peek() {
            Some(Token::Op(op)) => {
                let op = *op;
                self.pos += 1;
                op
            }
            _ => CompareOp::Eq,
        };
        let value = match self.peek() {
            Some(Token::Ident(word)) => Value::String(word.clone()),
            Some(token) => match token.literal() {
                Some(value) => value,
                None => return Err(self.unexpected("literal")),
            },
            None => return Err(self.unexpected("literal")),
        };
        self.pos += 1;
        Ok((op, value))
    }
}

/// Parses a row filter expression
pub fn parse_filter(input: &str) -> FilterResult<FilterExpr> {
    let mut parser = Parser::new(tokenize(input)?);
    let mut clauses = parser.conjunction(Parser::filter_clause)?;
    if clauses.len() == 1 {
        Ok(clauses.remove(0))
    } else {
        Ok(FilterExpr::And(clauses))
    }
}

/// Parses a categorization condition such as `>=18 and <65`
pub fn parse_cut(input: &str) -> FilterResult<CutCondition> {
    let mut parser = Parser::new(tokenize(input)?);
    let clauses = parser.conjunction(Parser::cut_clause)?;
    Ok(CutCondition { clauses })
}
