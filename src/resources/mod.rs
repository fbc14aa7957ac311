//! Typed callers of the request pipeline for platform resources.

pub mod function;
pub mod project;

use serde::{Deserialize, Deserializer};
use serde_json::Value;

pub use function::{Function, FunctionApi, NewFunction};
pub use project::{NewProject, Project, ProjectApi};

use crate::error::{Error, Result};

/// Whether an insert `state` denotes success.
///
/// Follows numeric coercion: `true`, non-zero numbers and strings that parse
/// to a non-zero number succeed. Everything else, including `null`, empty
/// strings, arrays and objects, is a failure.
pub fn is_success(state: &Value) -> bool {
    match state {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|v| v != 0.0),
        Value::String(s) => parse_numeric(s).is_some_and(|v| v != 0.0 && !v.is_nan()),
        Value::Null | Value::Array(_) | Value::Object(_) => false,
    }
}

fn parse_numeric(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Some(0.0);
    }

    let (sign, digits) = match trimmed.as_bytes()[0] {
        b'+' => (1.0, &trimmed[1..]),
        b'-' => (-1.0, &trimmed[1..]),
        _ => (1.0, trimmed),
    };
    if digits == "Infinity" {
        return Some(sign * f64::INFINITY);
    }

    for (prefix, radix) in [("0x", 16), ("0X", 16), ("0o", 8), ("0O", 8), ("0b", 2), ("0B", 2)] {
        if let Some(rest) = trimmed.strip_prefix(prefix) {
            return u64::from_str_radix(rest, radix).ok().map(|v| v as f64);
        }
    }

    // Rust accepts spellings like "inf" and "nan" that are not numbers here.
    if !digits.bytes().all(|b| b.is_ascii_digit() || matches!(b, b'.' | b'e' | b'E' | b'+' | b'-')) {
        return None;
    }
    trimmed.parse::<f64>().ok()
}

/// Outcome of an insert call: the raw `state` and the created resource.
#[derive(Debug, Clone, PartialEq)]
pub struct InsertOutcome<T> {
    pub state: Value,
    pub item: Option<T>,
}

impl<T> InsertOutcome<T> {
    pub fn is_success(&self) -> bool {
        is_success(&self.state)
    }
}

/// Resource ids arrive as numbers or strings.
pub(crate) fn deserialize_id<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// Check a resource slug: non-empty, lowercase ASCII letters, digits and `-`.
pub fn validate_slug(slug: &str) -> Result<()> {
    let valid = !slug.is_empty()
        && !slug.starts_with('-')
        && !slug.ends_with('-')
        && slug
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-');
    if valid {
        Ok(())
    } else {
        Err(Error::InvalidInput(format!(
            "'{slug}' is not a valid slug (use lowercase letters, digits and '-')"
        )))
    }
}

pub(crate) fn require(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::InvalidInput(format!("{field} is required")));
    }
    Ok(())
}
