//! Scalar coercions behind the typed accessors
//!
//! Every coercion is total: values that cannot be interpreted as the target
//! type yield the type's zero value instead of an error.

use serde_json::Value;

/// Strings treated as `false` by [`to_bool`], compared case-insensitively
const FALSE_STRINGS: [&str; 5] = ["", "0", "false", "f", "off"];

pub fn is_false_str(s: &str) -> bool {
    FALSE_STRINGS
        .iter()
        .any(|candidate| candidate.eq_ignore_ascii_case(s))
}

/// String form of a value.
///
/// `null` is empty, strings are returned verbatim, other scalars use their
/// display form and containers their JSON text.
pub fn to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

pub fn to_bytes(value: &Value) -> Vec<u8> {
    to_string(value).into_bytes()
}

pub fn to_bool(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        other => !is_false_str(&to_string(other)),
    }
}

pub fn to_float(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().unwrap_or_default(),
        Value::String(s) => s.trim().parse::<f64>().unwrap_or_default(),
        Value::Bool(true) => 1.0,
        _ => 0.0,
    }
}

/// Signed integer form. Floats are truncated toward zero and saturate at the
/// `i64` bounds.
pub fn to_int(value: &Value) -> i64 {
    match value {
        Value::Number(n) => match n.as_i64() {
            Some(i) => i,
            None => n.as_f64().unwrap_or_default() as i64,
        },
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .unwrap_or_else(|_| s.parse::<f64>().unwrap_or_default() as i64)
        }
        Value::Bool(true) => 1,
        _ => 0,
    }
}

/// Unsigned integer form. Negative values saturate to 0.
pub fn to_uint(value: &Value) -> u64 {
    match value {
        Value::Number(n) => match n.as_u64() {
            Some(u) => u,
            None => n.as_f64().unwrap_or_default() as u64,
        },
        Value::String(s) => {
            let s = s.trim();
            s.parse::<u64>()
                .unwrap_or_else(|_| s.parse::<f64>().unwrap_or_default() as u64)
        }
        Value::Bool(true) => 1,
        _ => 0,
    }
}
