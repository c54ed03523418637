// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Point scaling formulas.
//!
//! A formula is a tiny arithmetic expression over the placeholder `x`,
//! such as `"x * 0.1"` or `"(x - 4000) / 100"`. It is evaluated by a
//! purpose-built recursive-descent parser with no ambient name
//! resolution: the only names that resolve are `x` and the functions
//! `abs`, `round`, `int` and `float`. The value is bound to the `x`
//! token directly, never spliced into the source text, so a formula can
//! not be corrupted by textual substitution.
//!
//! Evaluation never fails outward. A formula that does not parse, names
//! something outside the safelist, or divides by zero leaves the value
//! unchanged and logs a warning.

use thiserror::Error;
use tracing::warn;

use tether_core::Value;

// =============================================================================
// Public entry points
// =============================================================================

/// Applies a point's formula to a decoded value.
///
/// Empty, whitespace-only and literal-`null` formulas are treated as
/// absent. Non-numeric values pass through untouched. The result keeps
/// integer representation when every step of the arithmetic stays
/// integral; division and float literals promote to float.
pub fn apply_formula(value: &Value, formula: Option<&str>) -> Value {
    let Some(formula) = formula else {
        return value.clone();
    };
    let trimmed = formula.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("null") {
        return value.clone();
    }
    let Some(x) = Num::from_value(value) else {
        return value.clone();
    };
    if let Some(offending) = safelist_violation(trimmed) {
        warn!(
            formula = trimmed,
            offending = %offending,
            "formula names something outside the safelist, value left unchanged"
        );
        return value.clone();
    }
    match evaluate(trimmed, x) {
        Ok(result) => result.into_value(),
        Err(err) => {
            warn!(
                formula = trimmed,
                %err,
                value = %value,
                "formula evaluation failed, value left unchanged"
            );
            value.clone()
        }
    }
}

/// Inverts a formula for a holding-register write.
///
/// Only the two linear shapes are reversible: `"x * K"` becomes
/// `value / K` and `"x / K"` becomes `value * K`. Anything else (no
/// operator, several operators, a left side other than `x`, a
/// non-numeric `K`) leaves the value unchanged with a warning, and the
/// raw value goes to the wire as-is.
pub fn reverse_formula(value: &Value, formula: Option<&str>) -> Value {
    let Some(formula) = formula else {
        return value.clone();
    };
    let trimmed = formula.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("null") {
        return value.clone();
    }
    let Some(v) = value.as_f64() else {
        return value.clone();
    };
    match parse_reversible(trimmed) {
        Some(ReverseOp::Divide(k)) if k != 0.0 => Value::Float(v / k),
        Some(ReverseOp::Divide(_)) => {
            warn!(
                formula = trimmed,
                "cannot invert a multiply-by-zero formula, writing the value as-is"
            );
            value.clone()
        }
        Some(ReverseOp::Multiply(k)) => Value::Float(v * k),
        None => {
            warn!(
                formula = trimmed,
                "formula shape is not reversible, writing the value as-is"
            );
            value.clone()
        }
    }
}

enum ReverseOp {
    Divide(f64),
    Multiply(f64),
}

fn parse_reversible(formula: &str) -> Option<ReverseOp> {
    let (lhs, rhs, multiply_shape) = if let Some((lhs, rhs)) = formula.split_once('*') {
        if rhs.contains('*') || formula.contains('/') {
            return None;
        }
        (lhs, rhs, true)
    } else if let Some((lhs, rhs)) = formula.split_once('/') {
        if rhs.contains('/') {
            return None;
        }
        (lhs, rhs, false)
    } else {
        return None;
    };
    if lhs.trim() != "x" {
        return None;
    }
    let k: f64 = rhs.trim().parse().ok()?;
    Some(if multiply_shape {
        ReverseOp::Divide(k)
    } else {
        ReverseOp::Multiply(k)
    })
}

/// First alphabetic character that is neither `x` nor part of a
/// safelisted function name.
///
/// Names pieced together out of safelisted fragments (`"absint"`) slip
/// past this check; the tokenizer rejects them as unknown names.
fn safelist_violation(formula: &str) -> Option<char> {
    let mut stripped = formula.to_ascii_lowercase();
    for name in ["round", "float", "abs", "int"] {
        stripped = stripped.replace(name, "");
    }
    stripped.chars().find(|c| c.is_alphabetic() && *c != 'x')
}

// =============================================================================
// Numeric tower
// =============================================================================

/// Evaluation-time number that remembers whether it is still integral.
///
/// Integer arithmetic promotes to float on overflow rather than wrapping
/// or erroring.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Num {
    Int(i64),
    Float(f64),
}

impl Num {
    fn from_value(value: &Value) -> Option<Num> {
        match value {
            Value::Int(v) => Some(Num::Int(*v)),
            Value::UInt(v) => match i64::try_from(*v) {
                Ok(v) => Some(Num::Int(v)),
                Err(_) => Some(Num::Float(*v as f64)),
            },
            Value::Float(v) => Some(Num::Float(*v)),
            Value::Bool(_) | Value::Array(_) => None,
        }
    }

    fn into_value(self) -> Value {
        match self {
            Num::Int(v) => Value::Int(v),
            Num::Float(v) => Value::Float(v),
        }
    }

    fn as_f64(self) -> f64 {
        match self {
            Num::Int(v) => v as f64,
            Num::Float(v) => v,
        }
    }

    fn add(self, rhs: Num) -> Num {
        match (self, rhs) {
            (Num::Int(a), Num::Int(b)) => a
                .checked_add(b)
                .map(Num::Int)
                .unwrap_or_else(|| Num::Float(a as f64 + b as f64)),
            _ => Num::Float(self.as_f64() + rhs.as_f64()),
        }
    }

    fn sub(self, rhs: Num) -> Num {
        match (self, rhs) {
            (Num::Int(a), Num::Int(b)) => a
                .checked_sub(b)
                .map(Num::Int)
                .unwrap_or_else(|| Num::Float(a as f64 - b as f64)),
            _ => Num::Float(self.as_f64() - rhs.as_f64()),
        }
    }

    fn mul(self, rhs: Num) -> Num {
        match (self, rhs) {
            (Num::Int(a), Num::Int(b)) => a
                .checked_mul(b)
                .map(Num::Int)
                .unwrap_or_else(|| Num::Float(a as f64 * b as f64)),
            _ => Num::Float(self.as_f64() * rhs.as_f64()),
        }
    }

    /// Division is always float, matching the scaling convention where
    /// `"x / 10"` yields a decimal reading.
    fn div(self, rhs: Num) -> Result<Num, EvalError> {
        let divisor = rhs.as_f64();
        if divisor == 0.0 {
            return Err(EvalError::DivisionByZero);
        }
        Ok(Num::Float(self.as_f64() / divisor))
    }

    fn neg(self) -> Num {
        match self {
            Num::Int(v) => v
                .checked_neg()
                .map(Num::Int)
                .unwrap_or_else(|| Num::Float(-(v as f64))),
            Num::Float(v) => Num::Float(-v),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Func {
    Abs,
    Round,
    Int,
    Float,
}

impl Func {
    fn apply(self, arg: Num) -> Num {
        match self {
            Func::Abs => match arg {
                Num::Int(v) => v
                    .checked_abs()
                    .map(Num::Int)
                    .unwrap_or_else(|| Num::Float((v as f64).abs())),
                Num::Float(v) => Num::Float(v.abs()),
            },
            Func::Round => match arg {
                Num::Int(v) => Num::Int(v),
                Num::Float(v) => Num::Int(v.round() as i64),
            },
            Func::Int => match arg {
                Num::Int(v) => Num::Int(v),
                Num::Float(v) => Num::Int(v.trunc() as i64),
            },
            Func::Float => Num::Float(arg.as_f64()),
        }
    }
}

// =============================================================================
// Tokenizer and parser
// =============================================================================

#[derive(Debug, Clone, PartialEq, Error)]
enum EvalError {
    #[error("unexpected character {0:?}")]
    UnexpectedChar(char),
    #[error("unexpected end of formula")]
    UnexpectedEnd,
    #[error("unexpected token {0:?}")]
    UnexpectedToken(String),
    #[error("unknown name {0:?}")]
    UnknownName(String),
    #[error("malformed number {0:?}")]
    BadNumber(String),
    #[error("division by zero")]
    DivisionByZero,
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Num(Num),
    X,
    Func(Func),
    Plus,
    Minus,
    Star,
    Slash,
    LParen,
    RParen,
}

impl Token {
    fn lexeme(&self) -> String {
        match self {
            Token::Num(Num::Int(v)) => v.to_string(),
            Token::Num(Num::Float(v)) => v.to_string(),
            Token::X => "x".to_string(),
            Token::Func(Func::Abs) => "abs".to_string(),
            Token::Func(Func::Round) => "round".to_string(),
            Token::Func(Func::Int) => "int".to_string(),
            Token::Func(Func::Float) => "float".to_string(),
            Token::Plus => "+".to_string(),
            Token::Minus => "-".to_string(),
            Token::Star => "*".to_string(),
            Token::Slash => "/".to_string(),
            Token::LParen => "(".to_string(),
            Token::RParen => ")".to_string(),
        }
    }
}

fn tokenize(formula: &str) -> Result<Vec<Token>, EvalError> {
    let mut tokens = Vec::new();
    let mut chars = formula.char_indices().peekable();
    while let Some((start, c)) = chars.next() {
        match c {
            ' ' | '\t' => {}
            '+' => tokens.push(Token::Plus),
            '-' => tokens.push(Token::Minus),
            '*' => tokens.push(Token::Star),
            '/' => tokens.push(Token::Slash),
            '(' => tokens.push(Token::LParen),
            ')' => tokens.push(Token::RParen),
            c if c.is_ascii_digit() || c == '.' => {
                let mut end = start + c.len_utf8();
                while let Some(&(i, n)) = chars.peek() {
                    if n.is_ascii_digit() || n == '.' {
                        end = i + n.len_utf8();
                        chars.next();
                    } else {
                        break;
                    }
                }
                let text = &formula[start..end];
                tokens.push(Token::Num(parse_number(text)?));
            }
            c if c.is_alphabetic() => {
                let mut end = start + c.len_utf8();
                while let Some(&(i, n)) = chars.peek() {
                    if n.is_alphanumeric() || n == '_' {
                        end = i + n.len_utf8();
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(match &formula[start..end] {
                    "x" => Token::X,
                    "abs" => Token::Func(Func::Abs),
                    "round" => Token::Func(Func::Round),
                    "int" => Token::Func(Func::Int),
                    "float" => Token::Func(Func::Float),
                    other => return Err(EvalError::UnknownName(other.to_string())),
                });
            }
            other => return Err(EvalError::UnexpectedChar(other)),
        }
    }
    Ok(tokens)
}

fn parse_number(text: &str) -> Result<Num, EvalError> {
    if text.contains('.') {
        text.parse::<f64>()
            .map(Num::Float)
            .map_err(|_| EvalError::BadNumber(text.to_string()))
    } else {
        match text.parse::<i64>() {
            Ok(v) => Ok(Num::Int(v)),
            // Integer literals wider than i64 evaluate as floats.
            Err(_) => text
                .parse::<f64>()
                .map(Num::Float)
                .map_err(|_| EvalError::BadNumber(text.to_string())),
        }
    }
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    x: Num,
}

impl Parser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn expect_rparen(&mut self) -> Result<(), EvalError> {
        match self.advance() {
            Some(Token::RParen) => Ok(()),
            Some(other) => Err(EvalError::UnexpectedToken(other.lexeme())),
            None => Err(EvalError::UnexpectedEnd),
        }
    }

    fn expr(&mut self) -> Result<Num, EvalError> {
        let mut acc = self.term()?;
        loop {
            match self.peek() {
                Some(Token::Plus) => {
                    self.pos += 1;
                    acc = acc.add(self.term()?);
                }
                Some(Token::Minus) => {
                    self.pos += 1;
                    acc = acc.sub(self.term()?);
                }
                _ => break,
            }
        }
        Ok(acc)
    }

    fn term(&mut self) -> Result<Num, EvalError> {
        let mut acc = self.factor()?;
        loop {
            match self.peek() {
                Some(Token::Star) => {
                    self.pos += 1;
                    acc = acc.mul(self.factor()?);
                }
                Some(Token::Slash) => {
                    self.pos += 1;
                    acc = acc.div(self.factor()?)?;
                }
                _ => break,
            }
        }
        Ok(acc)
    }

    fn factor(&mut self) -> Result<Num, EvalError> {
        match self.peek() {
            Some(Token::Minus) => {
                self.pos += 1;
                Ok(self.factor()?.neg())
            }
            Some(Token::Plus) => {
                self.pos += 1;
                self.factor()
            }
            _ => self.primary(),
        }
    }

    fn primary(&mut self) -> Result<Num, EvalError> {
        match self.advance() {
            Some(Token::Num(n)) => Ok(n),
            Some(Token::X) => Ok(self.x),
            Some(Token::Func(f)) => {
                match self.advance() {
                    Some(Token::LParen) => {}
                    Some(other) => return Err(EvalError::UnexpectedToken(other.lexeme())),
                    None => return Err(EvalError::UnexpectedEnd),
                }
                let arg = self.expr()?;
                self.expect_rparen()?;
                Ok(f.apply(arg))
            }
            Some(Token::LParen) => {
                let inner = self.expr()?;
                self.expect_rparen()?;
                Ok(inner)
            }
            Some(other) => Err(EvalError::UnexpectedToken(other.lexeme())),
            None => Err(EvalError::UnexpectedEnd),
        }
    }
}

fn evaluate(formula: &str, x: Num) -> Result<Num, EvalError> {
    let tokens = tokenize(formula)?;
    let mut parser = Parser {
        tokens: &tokens,
        pos: 0,
        x,
    };
    let result = parser.expr()?;
    if let Some(trailing) = parser.peek() {
        return Err(EvalError::UnexpectedToken(trailing.lexeme()));
    }
    Ok(result)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(value: &Value, expected: f64) {
        match value {
            Value::Float(v) => assert!((v - expected).abs() < 1e-9, "got {v}, want {expected}"),
            other => panic!("expected float, got {other:?}"),
        }
    }

    #[test]
    fn test_absent_formula_is_identity() {
        let v = Value::Int(42);
        assert_eq!(apply_formula(&v, None), v);
        assert_eq!(apply_formula(&v, Some("")), v);
        assert_eq!(apply_formula(&v, Some("   ")), v);
        assert_eq!(apply_formula(&v, Some("null")), v);
        assert_eq!(apply_formula(&v, Some("NULL")), v);
    }

    #[test]
    fn test_scaling() {
        let scaled = apply_formula(&Value::Int(4000), Some("x * 0.1"));
        assert_close(&scaled, 400.0);

        assert_eq!(
            apply_formula(&Value::Int(100), Some("x * 0.25")),
            Value::Float(25.0)
        );
    }

    #[test]
    fn test_integer_arithmetic_stays_integer() {
        assert_eq!(apply_formula(&Value::Int(21), Some("x * 2")), Value::Int(42));
        assert_eq!(apply_formula(&Value::Int(5), Some("x + 10")), Value::Int(15));
        assert_eq!(apply_formula(&Value::Int(12), Some("x * x")), Value::Int(144));
    }

    #[test]
    fn test_division_always_floats() {
        assert_eq!(apply_formula(&Value::Int(10), Some("x / 2")), Value::Float(5.0));
    }

    #[test]
    fn test_precedence_and_parentheses() {
        assert_eq!(
            apply_formula(&Value::Int(4), Some("x + 2 * 3")),
            Value::Int(10)
        );
        assert_eq!(
            apply_formula(&Value::Int(4), Some("(x + 2) * 3")),
            Value::Int(18)
        );
        assert_eq!(
            apply_formula(&Value::Int(5), Some("-x + 1")),
            Value::Int(-4)
        );
    }

    #[test]
    fn test_functions() {
        assert_eq!(apply_formula(&Value::Int(-5), Some("abs(x)")), Value::Int(5));
        assert_eq!(
            apply_formula(&Value::Int(10), Some("round(x / 3)")),
            Value::Int(3)
        );
        assert_eq!(
            apply_formula(&Value::Int(5), Some("int(x * 1.5)")),
            Value::Int(7)
        );
        assert_eq!(
            apply_formula(&Value::Int(5), Some("float(x)")),
            Value::Float(5.0)
        );
    }

    #[test]
    fn test_integer_overflow_promotes_to_float() {
        match apply_formula(&Value::Int(i64::MAX), Some("x + 1")) {
            Value::Float(v) => assert!(v > 9.2e18),
            other => panic!("expected float, got {other:?}"),
        }
    }

    #[test]
    fn test_safelist_rejects_foreign_names() {
        let v = Value::Int(7);
        assert_eq!(apply_formula(&v, Some("x * factor")), v);
        assert_eq!(apply_formula(&v, Some("__import__('os')")), v);
        assert_eq!(apply_formula(&v, Some("print(x)")), v);
    }

    #[test]
    fn test_malformed_formulas_leave_value_unchanged() {
        let v = Value::Int(7);
        assert_eq!(apply_formula(&v, Some("x ** 2")), v);
        assert_eq!(apply_formula(&v, Some("(x + 1")), v);
        assert_eq!(apply_formula(&v, Some("x 2")), v);
        assert_eq!(apply_formula(&v, Some("1.2.3 * x")), v);
        // Pieced-together names clear the safelist but fail to parse.
        assert_eq!(apply_formula(&v, Some("absint(x)")), v);
    }

    #[test]
    fn test_division_by_zero_leaves_value_unchanged() {
        let v = Value::Int(7);
        assert_eq!(apply_formula(&v, Some("x / 0")), v);
        assert_eq!(apply_formula(&v, Some("x / (1 - 1)")), v);
    }

    #[test]
    fn test_non_numeric_untouched() {
        let v = Value::Bool(true);
        assert_eq!(apply_formula(&v, Some("x * 2")), v);
    }

    #[test]
    fn test_reverse_multiply() {
        assert_eq!(
            reverse_formula(&Value::Int(25), Some("x * 0.5")),
            Value::Float(50.0)
        );
    }

    #[test]
    fn test_reverse_divide() {
        assert_eq!(
            reverse_formula(&Value::Float(2.5), Some("x / 10")),
            Value::Float(25.0)
        );
    }

    #[test]
    fn test_reverse_rejects_other_shapes() {
        let v = Value::Int(9);
        assert_eq!(reverse_formula(&v, Some("x + 5")), v);
        assert_eq!(reverse_formula(&v, Some("x * 2 * 3")), v);
        assert_eq!(reverse_formula(&v, Some("x * 2 / 3")), v);
        assert_eq!(reverse_formula(&v, Some("(x + 1) * 2")), v);
        assert_eq!(reverse_formula(&v, Some("2 * x")), v);
        assert_eq!(reverse_formula(&v, Some("x * abc")), v);
        assert_eq!(reverse_formula(&v, Some("x * 0")), v);
    }

    #[test]
    fn test_reverse_absent_formula_is_identity() {
        let v = Value::Int(9);
        assert_eq!(reverse_formula(&v, None), v);
        assert_eq!(reverse_formula(&v, Some("  ")), v);
        assert_eq!(reverse_formula(&Value::Bool(true), Some("x * 2")), Value::Bool(true));
    }
}
