//! Scalar predicates shared by every field validator.

use serde_json::Value;

/// An integer, or a string holding one (multipart fields arrive as strings).
#[must_use]
pub fn as_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) if !s.is_empty() => s.trim().parse().ok(),
        _ => None,
    }
}

#[must_use]
pub fn is_int(value: &Value) -> bool {
    as_int(value).is_some()
}

#[must_use]
pub fn is_string(value: &Value) -> bool {
    value.is_string()
}

/// `true`/`false`, or their string spellings.
#[must_use]
pub fn as_boolean(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.as_str() {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

#[must_use]
pub fn is_boolean(value: &Value) -> bool {
    as_boolean(value).is_some()
}

/// Non-empty string whose length in characters lies within the bounds.
#[must_use]
pub fn is_not_empty_string(value: &Value, min: Option<usize>, max: Option<usize>) -> bool {
    let Some(s) = value.as_str() else {
        return false;
    };

    let len = s.chars().count();
    if len == 0 {
        return false;
    }

    if max.is_some_and(|max| len > max) {
        return false;
    }

    !min.is_some_and(|min| len < min)
}

/// Null, or a string with nothing in it.
#[must_use]
pub fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

#[must_use]
pub fn length_error(min: Option<usize>, max: usize) -> String {
    match min {
        Some(min) => format!("min {min} characters, max {max} characters"),
        None => format!("max {max} characters"),
    }
}

/// Lenient numeric coercion for query parameters: anything that is not a
/// non-negative integer falls back to `default`.
#[must_use]
pub fn to_non_negative_or_default(value: Option<&str>, default: u64) -> u64 {
    value
        .and_then(|v| v.trim().parse::<i64>().ok())
        .and_then(|n| u64::try_from(n).ok())
        .unwrap_or(default)
}
