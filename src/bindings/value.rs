//! Conversions between markup text and state values.

use serde_json::{Number, Value};

/// Read `text` as the same kind of value as `like`.
///
/// Numbers parse the longest numeric prefix (`"12px"` reads as 12; no digits
/// at all reads as `Null`), booleans are `text == "true"`, everything else
/// stays text.
pub fn coerce(text: &str, like: &Value) -> Value {
    match like {
        Value::Number(_) => parse_number(text).map_or(Value::Null, number_value),
        Value::Bool(_) => Value::Bool(text == "true"),
        _ => Value::String(text.to_string()),
    }
}

/// Text written into the tree for a state value.
pub fn stringify(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(flag) => flag.to_string(),
        Value::String(text) => text.clone(),
        Value::Number(number) => match number.as_f64() {
            Some(float) if number.is_f64() && float.fract() == 0.0 && float.abs() < 1e15 => {
                format!("{}", float as i64)
            }
            _ => number.to_string(),
        },
        Value::Array(items) => items.iter().map(stringify).collect::<Vec<_>>().join(","),
        Value::Object(_) => value.to_string(),
    }
}

/// Truthiness used by conditional bindings.
pub fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|float| float != 0.0),
        Value::String(text) => !text.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn number_value(float: f64) -> Value {
    if float.fract() == 0.0 && float.abs() < 9.007_199_254_740_992e15 {
        return Value::from(float as i64);
    }
    Number::from_f64(float).map_or(Value::Null, Value::Number)
}

fn parse_number(text: &str) -> Option<f64> {
    let src = text.trim_start();
    let bytes = src.as_bytes();
    let mut i = 0usize;

    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        i += 1;
    }

    let mut digits = 0usize;
    while bytes.get(i).is_some_and(u8::is_ascii_digit) {
        digits += 1;
        i += 1;
    }
    if bytes.get(i) == Some(&b'.') {
        i += 1;
        while bytes.get(i).is_some_and(u8::is_ascii_digit) {
            digits += 1;
            i += 1;
        }
    }
    if digits == 0 {
        return None;
    }

    if matches!(bytes.get(i), Some(b'e') | Some(b'E')) {
        let exponent_start = i;
        i += 1;
        if matches!(bytes.get(i), Some(b'+') | Some(b'-')) {
            i += 1;
        }
        let mut exponent_digits = 0usize;
        while bytes.get(i).is_some_and(u8::is_ascii_digit) {
            exponent_digits += 1;
            i += 1;
        }
        if exponent_digits == 0 {
            i = exponent_start;
        }
    }

    src[..i].parse::<f64>().ok().filter(|float| float.is_finite())
}
