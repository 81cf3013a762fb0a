use std::fmt;

use anyhow::{Result, anyhow};
use chrono::{NaiveDate, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

/// Stringified form of a null cell inside a fingerprint payload.
pub const NULL_CANONICAL: &str = "\u{0}";

const NULL_TOKENS: &[&str] = &["na", "n/a", "nan", "-nan", "null", "none", "#n/a"];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Value {
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Text(String),
}

impl Value {
    /// Canonical text used when hashing rows. Every variant has exactly one
    /// spelling so that two implementations agree on the digest.
    pub fn canonical(&self) -> String {
        match self {
            Value::Integer(i) => i.to_string(),
            // Debug keeps a fraction or exponent on every finite float ("1.0", "1e21").
            Value::Float(f) => format!("{f:?}"),
            Value::Boolean(true) => "True".to_string(),
            Value::Boolean(false) => "False".to_string(),
            Value::Date(d) => d.format("%Y-%m-%d").to_string(),
            Value::DateTime(dt) => dt.format("%Y-%m-%d %H:%M:%S%.f").to_string(),
            Value::Text(s) => s.clone(),
        }
    }

    /// Identity used for joining and uniqueness checks. Integral floats
    /// collapse onto the integer spelling so `1` and `1.0` name the same row.
    pub fn join_key(&self) -> String {
        match self {
            Value::Integer(i) => format!("n:{i}"),
            Value::Float(f) => match integral_float(*f) {
                Some(i) => format!("n:{i}"),
                None => format!("n:{f:?}"),
            },
            Value::Boolean(b) => format!("b:{b}"),
            Value::Date(_) | Value::DateTime(_) => format!("t:{}", self.canonical()),
            Value::Text(s) => format!("s:{s}"),
        }
    }

}

/// The exact integer a float spells, if it is integral and within `i64`.
fn integral_float(value: f64) -> Option<i64> {
    const LIMIT: f64 = 9_223_372_036_854_775_808.0; // 2^63
    (value.fract() == 0.0 && (-LIMIT..LIMIT).contains(&value)).then(|| value as i64)
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Float(v) if v.fract() == 0.0 && v.abs() < 1e15 => write!(f, "{}", *v as i64),
            Value::Float(v) => write!(f, "{v}"),
            Value::Boolean(b) => write!(f, "{b}"),
            other => write!(f, "{}", other.canonical()),
        }
    }
}

/// Canonical encoding of a possibly-null cell.
pub fn canonical_cell(cell: Option<&Value>) -> String {
    cell.map(Value::canonical)
        .unwrap_or_else(|| NULL_CANONICAL.to_string())
}

/// Cell equality for column accuracy. An integer equals a float only when
/// the float spells that exact integer; a null on either side never matches.
pub fn values_equal(left: Option<&Value>, right: Option<&Value>) -> bool {
    match (left, right) {
        (Some(Value::Integer(a)), Some(Value::Integer(b))) => a == b,
        (Some(Value::Float(a)), Some(Value::Float(b))) => a == b,
        (Some(Value::Integer(i)), Some(Value::Float(f)))
        | (Some(Value::Float(f)), Some(Value::Integer(i))) => integral_float(*f) == Some(*i),
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

pub fn is_null_token(value: &str) -> bool {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return true;
    }
    let lowered = trimmed.to_ascii_lowercase();
    NULL_TOKENS.contains(&lowered.as_str())
}

pub fn parse_naive_date(value: &str) -> Result<NaiveDate> {
    const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d"];
    for fmt in DATE_FORMATS {
        if let Ok(parsed) = NaiveDate::parse_from_str(value, fmt) {
            return Ok(parsed);
        }
    }
    Err(anyhow!("Failed to parse '{value}' as date"))
}

pub fn parse_naive_datetime(value: &str) -> Result<NaiveDateTime> {
    const DATETIME_FORMATS: &[&str] = &[
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M",
    ];
    for fmt in DATETIME_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(value, fmt) {
            return Ok(parsed);
        }
    }
    Err(anyhow!("Failed to parse '{value}' as datetime"))
}

/// Collapse a timestamp at midnight onto a plain date.
pub fn temporal_value(dt: NaiveDateTime) -> Value {
    if dt.time().num_seconds_from_midnight() == 0 && dt.time().nanosecond() == 0 {
        Value::Date(dt.date())
    } else {
        Value::DateTime(dt)
    }
}

/// Interpret a raw text cell. Null markers yield `None`; the first of
/// integer, float, boolean, date, datetime that parses wins, else text.
pub fn parse_cell(raw: &str) -> Option<Value> {
    if is_null_token(raw) {
        return None;
    }
    let trimmed = raw.trim();
    if let Ok(parsed) = trimmed.parse::<i64>() {
        return Some(Value::Integer(parsed));
    }
    if let Ok(parsed) = trimmed.parse::<f64>()
        && parsed.is_finite()
    {
        return Some(Value::Float(parsed));
    }
    if trimmed.eq_ignore_ascii_case("true") {
        return Some(Value::Boolean(true));
    }
    if trimmed.eq_ignore_ascii_case("false") {
        return Some(Value::Boolean(false));
    }
    if let Ok(date) = parse_naive_date(trimmed) {
        return Some(Value::Date(date));
    }
    if let Ok(dt) = parse_naive_datetime(trimmed) {
        return Some(Value::DateTime(dt));
    }
    Some(Value::Text(raw.to_string()))
}
