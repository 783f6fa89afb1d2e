//! Scalar coercion rules used by every normalizer
//!
//! All helpers take `Option<&Value>` so callers can pass `obj.get(key)`
//! directly; a missing key and an unusable value behave the same way.

use serde_json::{Map, Value};

/// First present, non-null value among several alias keys
pub fn get_any<'a>(obj: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|k| obj.get(*k))
        .find(|v| !v.is_null())
}

/// Strings as-is, numbers and bools stringified, anything else empty
pub fn string(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    }
}

/// Array of coercible strings; a lone string becomes a one-element list
pub fn string_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter(|v| matches!(v, Value::String(_) | Value::Number(_) | Value::Bool(_)))
            .map(|v| string(Some(v)))
            .collect(),
        Some(Value::String(s)) if !s.is_empty() => vec![s.clone()],
        _ => Vec::new(),
    }
}

/// Bools, numbers (non-zero is true) and textual booleans
pub fn boolean(value: Option<&Value>, default: bool) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().map(|f| f != 0.0).unwrap_or(default),
        Some(Value::String(s)) => match s.trim().to_lowercase().as_str() {
            "true" | "1" | "yes" => true,
            "false" | "0" | "no" => false,
            _ => default,
        },
        _ => default,
    }
}

/// Integers, truncated floats, numeric strings and bools (as 0/1)
pub fn int(value: Option<&Value>) -> Option<i64> {
    match value {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)),
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            trimmed
                .parse::<i64>()
                .ok()
                .or_else(|| {
                    trimmed
                        .parse::<f64>()
                        .ok()
                        .filter(|f| f.is_finite())
                        .map(|f| f.trunc() as i64)
                })
        }
        Some(Value::Bool(b)) => Some(i64::from(*b)),
        _ => None,
    }
}

/// Integer with a default
pub fn int_or(value: Option<&Value>, default: i64) -> i64 {
    int(value).unwrap_or(default)
}

/// List of integers; non-numeric members are dropped
pub fn int_list(value: Option<&Value>) -> Vec<i64> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter(|v| !v.is_boolean())
            .filter_map(|v| int(Some(v)))
            .collect(),
        _ => Vec::new(),
    }
}

/// Object clone, or an empty map
pub fn object(value: Option<&Value>) -> Map<String, Value> {
    match value {
        Some(Value::Object(map)) => map.clone(),
        _ => Map::new(),
    }
}
