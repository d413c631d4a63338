//! Cell classification and numeric coercion.
//!
//! Rows are loosely typed: a cell may be a JSON string, number, boolean, null,
//! or simply absent. Every component that needs to know whether a cell is
//! missing, numeric, or text goes through [`Cell::classify`], so statistics,
//! analysis, sorting, cleaning and chart sanitization can never disagree.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Coarse kind of a cell, as reported by column statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CellKind {
    Null,
    Empty,
    Text,
    Numeric,
}

impl CellKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CellKind::Null => "null",
            CellKind::Empty => "empty",
            CellKind::Text => "text",
            CellKind::Numeric => "numeric",
        }
    }
}

/// A classified cell.
///
/// Produced only by [`Cell::classify`]. Numeric-looking strings are already
/// parsed into `Number`; blank strings collapse into `Empty`.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell<'a> {
    Null,
    Empty,
    Number(f64),
    Bool(bool),
    Text(Cow<'a, str>),
}

impl<'a> Cell<'a> {
    /// Classify a raw cell. `None` is an absent key.
    pub fn classify(value: Option<&'a Value>) -> Self {
        match value {
            None | Some(Value::Null) => Cell::Null,
            Some(Value::Bool(b)) => Cell::Bool(*b),
            Some(Value::Number(n)) => match n.as_f64() {
                Some(f) => Cell::Number(f),
                None => Cell::Text(Cow::Owned(n.to_string())),
            },
            Some(Value::String(s)) => {
                if s.trim().is_empty() {
                    Cell::Empty
                } else if let Some(f) = parse_number(s) {
                    Cell::Number(f)
                } else {
                    Cell::Text(Cow::Borrowed(s.as_str()))
                }
            }
            Some(other) => Cell::Text(Cow::Owned(other.to_string())),
        }
    }

    pub fn kind(&self) -> CellKind {
        match self {
            Cell::Null => CellKind::Null,
            Cell::Empty => CellKind::Empty,
            Cell::Number(_) | Cell::Bool(_) => CellKind::Numeric,
            Cell::Text(_) => CellKind::Text,
        }
    }

    /// Numeric value used for arithmetic and sorting. Booleans count as 1/0.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Cell::Number(n) => Some(*n),
            Cell::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            _ => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Cell::Null | Cell::Empty)
    }
}

/// Kind of a raw cell.
pub fn classify(value: Option<&Value>) -> CellKind {
    Cell::classify(value).kind()
}

/// Numeric coercion of a raw cell; `None` plays the role of NaN.
pub fn try_numeric(value: Option<&Value>) -> Option<f64> {
    Cell::classify(value).as_number()
}

/// Null, absent, or a blank-after-trim string.
pub fn is_missing(value: Option<&Value>) -> bool {
    Cell::classify(value).is_missing()
}

/// String form of a raw cell, or `None` for null/absent cells.
///
/// Strings are returned verbatim (not trimmed), numbers print the way a
/// browser would print them (`10`, not `10.0`).
pub fn label(value: Option<&Value>) -> Option<String> {
    match value {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        Some(Value::Number(n)) => Some(if n.is_i64() || n.is_u64() {
            n.to_string()
        } else {
            n.as_f64().map(format_number).unwrap_or_else(|| n.to_string())
        }),
        Some(other) => Some(other.to_string()),
    }
}

/// Render a float without a trailing `.0` for integral values.
pub fn format_number(n: f64) -> String {
    if n == 0.0 {
        return "0".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    format!("{}", n)
}

/// JSON value for a computed number. Integral values become JSON integers so
/// `12.0` and `12` serialize identically; non-finite values become null.
pub fn number_value(n: f64) -> Value {
    const MAX_SAFE: f64 = 9_007_199_254_740_991.0;
    if n.fract() == 0.0 && n.abs() <= MAX_SAFE {
        return Value::from(n as i64);
    }
    serde_json::Number::from_f64(n)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

/// Parse a string with browser `Number()` rules.
///
/// Accepts surrounding whitespace, signs, decimals, exponents, `Infinity`,
/// and `0x`/`0o`/`0b` integers. Rejects blanks, `NaN`, `inf`, digit
/// separators and trailing garbage.
pub fn parse_number(raw: &str) -> Option<f64> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    let radix = match s.get(..2) {
        Some("0x") | Some("0X") => Some(16),
        Some("0o") | Some("0O") => Some(8),
        Some("0b") | Some("0B") => Some(2),
        _ => None,
    };
    if let Some(radix) = radix {
        let digits = &s[2..];
        if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
            return None;
        }
        return u128::from_str_radix(digits, radix).ok().map(|v| v as f64);
    }

    match s {
        "Infinity" | "+Infinity" => return Some(f64::INFINITY),
        "-Infinity" => return Some(f64::NEG_INFINITY),
        _ => {}
    }

    // f64::from_str also accepts "inf" and "nan"; keep to plain decimal syntax
    if !s
        .bytes()
        .all(|b| b.is_ascii_digit() || matches!(b, b'+' | b'-' | b'.' | b'e' | b'E'))
    {
        return None;
    }
    s.parse::<f64>().ok().filter(|n| !n.is_nan())
}
