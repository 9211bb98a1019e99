/*
 * expression.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Conditions of `{%if}` and `{%elseif}` tags.
//!
//! A condition is `left operator right`. The left side is a quoted literal or
//! a variable reference; the right side is always a literal. Before comparing,
//! both sides go through the same coercion:
//!
//! | input                                | coerced to         |
//! |--------------------------------------|--------------------|
//! | `"true"` / `"false"`                 | boolean            |
//! | `"null"`                             | null               |
//! | numeric string (`42`, `-1.5`, `1e3`) | number             |
//! | integer / float value                | number             |
//! | boolean / null value                 | itself             |
//! | any other string                     | string             |
//!
//! and are then compared loosely:
//!
//! | operands               | rule                                           |
//! |------------------------|------------------------------------------------|
//! | boolean with anything  | truthiness of both sides, `false < true`       |
//! | null with null         | equal                                          |
//! | null with string       | `""` compared with the string                  |
//! | null with number       | truthiness of both sides                       |
//! | number with number     | numeric                                        |
//! | number with string     | the number's decimal text compared with string |
//! | string with string     | byte-wise lexical                              |

use crate::context::TemplateValue;
use crate::error::EvalErrorKind;
use std::cmp::Ordering;

/// Comparison operators, in the spelling used by templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
}

impl Operator {
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "=" | "==" => Some(Operator::Eq),
            "!=" => Some(Operator::Ne),
            "<" => Some(Operator::Lt),
            ">" => Some(Operator::Gt),
            "<=" => Some(Operator::Le),
            ">=" => Some(Operator::Ge),
            _ => None,
        }
    }

    fn holds(self, ordering: Option<Ordering>) -> bool {
        match (self, ordering) {
            (Operator::Ne, None) => true,
            (_, None) => false,
            (Operator::Eq, Some(ord)) => ord == Ordering::Equal,
            (Operator::Ne, Some(ord)) => ord != Ordering::Equal,
            (Operator::Lt, Some(ord)) => ord == Ordering::Less,
            (Operator::Gt, Some(ord)) => ord == Ordering::Greater,
            (Operator::Le, Some(ord)) => ord != Ordering::Greater,
            (Operator::Ge, Some(ord)) => ord != Ordering::Less,
        }
    }
}

/// Left-hand side of a condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    /// `"quoted"` text, quotes removed.
    Literal(String),
    /// A variable reference, resolved at evaluation time.
    Reference(String),
}

/// A parsed condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expression {
    pub left: Operand,
    pub operator: Operator,
    pub right: String,
}

impl Expression {
    /// Split condition tokens at the comparison operator.
    ///
    /// Exactly one operator token is allowed and the left side must not be
    /// empty. The right side tokens are re-joined with single spaces and
    /// stripped of surrounding double quotes.
    pub fn parse(tokens: &[String]) -> Result<Self, EvalErrorKind> {
        let mut operators = tokens
            .iter()
            .enumerate()
            .filter_map(|(i, token)| Operator::from_token(token).map(|op| (i, op)));

        let Some((position, operator)) = operators.next() else {
            return Err(EvalErrorKind::MalformedExpression(tokens.join(" ")));
        };
        if operators.next().is_some() {
            return Err(EvalErrorKind::MultipleOperators(tokens.join(" ")));
        }
        if position == 0 {
            return Err(EvalErrorKind::MalformedExpression(tokens.join(" ")));
        }

        let left = tokens[..position].join(" ");
        let left = match strip_quotes(&left) {
            Some(literal) => Operand::Literal(literal.to_string()),
            None => Operand::Reference(left),
        };

        let right = tokens[position + 1..].join(" ");
        let right = strip_quotes(&right).unwrap_or(&right).to_string();

        Ok(Expression {
            left,
            operator,
            right,
        })
    }
}

fn strip_quotes(s: &str) -> Option<&str> {
    s.strip_prefix('"')?.strip_suffix('"')
}

/// A value after literal coercion.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Null,
    Bool(bool),
    Number(f64),
    Str(String),
}

impl Scalar {
    /// Coerce literal text.
    pub fn from_text(text: &str) -> Self {
        match text {
            "true" => Scalar::Bool(true),
            "false" => Scalar::Bool(false),
            "null" => Scalar::Null,
            _ => match parse_numeric(text) {
                Some(number) => Scalar::Number(number),
                None => Scalar::Str(text.to_string()),
            },
        }
    }

    /// Coerce a resolved value. Containers are rejected by the resolver before
    /// they get here and coerce to null.
    pub fn from_value(value: &TemplateValue) -> Self {
        match value {
            TemplateValue::Null => Scalar::Null,
            TemplateValue::Bool(b) => Scalar::Bool(*b),
            TemplateValue::Int(i) => Scalar::Number(*i as f64),
            TemplateValue::Float(f) => Scalar::Number(*f),
            TemplateValue::String(s) => Scalar::from_text(s),
            TemplateValue::List(_) | TemplateValue::Map(_) => Scalar::Null,
        }
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Scalar::Null => false,
            Scalar::Bool(b) => *b,
            Scalar::Number(n) => *n != 0.0,
            Scalar::Str(s) => !s.is_empty() && s != "0",
        }
    }
}

/// Compare two coerced values with `operator`.
pub fn compare(left: &Scalar, operator: Operator, right: &Scalar) -> bool {
    operator.holds(loose_cmp(left, right))
}

fn loose_cmp(left: &Scalar, right: &Scalar) -> Option<Ordering> {
    match (left, right) {
        (Scalar::Bool(_), _) | (_, Scalar::Bool(_)) => {
            Some(left.is_truthy().cmp(&right.is_truthy()))
        }
        (Scalar::Null, Scalar::Null) => Some(Ordering::Equal),
        (Scalar::Null, Scalar::Str(s)) => Some("".cmp(s.as_str())),
        (Scalar::Str(s), Scalar::Null) => Some(s.as_str().cmp("")),
        (Scalar::Null, Scalar::Number(_)) | (Scalar::Number(_), Scalar::Null) => {
            Some(left.is_truthy().cmp(&right.is_truthy()))
        }
        (Scalar::Number(a), Scalar::Number(b)) => a.partial_cmp(b),
        (Scalar::Number(a), Scalar::Str(s)) => Some(a.to_string().as_str().cmp(s.as_str())),
        (Scalar::Str(s), Scalar::Number(b)) => Some(s.as_str().cmp(b.to_string().as_str())),
        (Scalar::Str(a), Scalar::Str(b)) => Some(a.cmp(b)),
    }
}

/// Parse a decimal number, allowing surrounding whitespace, a sign, a
/// fraction and an exponent. Words like `inf` or `nan` are not numeric.
fn parse_numeric(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    if !trimmed.bytes().any(|b| b.is_ascii_digit()) {
        return None;
    }
    if !trimmed
        .bytes()
        .all(|b| b.is_ascii_digit() || matches!(b, b'+' | b'-' | b'.' | b'e' | b'E'))
    {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|n| n.is_finite())
}
