// src/services/json.rs

//! Tolerant accessors over semi-structured JSON.
//!
//! Optional lookups return `None` for absent or mistyped keys. Required
//! lookups fail the single record with [`AppError::MissingField`].

use serde_json::Value;

use crate::error::{AppError, Result};

/// Value at a JSON pointer, treating `null` as absent.
pub fn at<'a>(value: &'a Value, pointer: &str) -> Option<&'a Value> {
    value.pointer(pointer).filter(|v| !v.is_null())
}

/// String at a pointer. Numbers are rendered, empty strings are absent.
pub fn opt_str(value: &Value, pointer: &str) -> Option<String> {
    match at(value, pointer)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Integer at a pointer. Numeric strings are accepted.
pub fn opt_i64(value: &Value, pointer: &str) -> Option<i64> {
    as_i64(at(value, pointer)?)
}

pub fn opt_bool(value: &Value, pointer: &str) -> Option<bool> {
    match at(value, pointer)? {
        Value::Bool(b) => Some(*b),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

/// Array at a pointer, empty when absent.
pub fn array<'a>(value: &'a Value, pointer: &str) -> &'a [Value] {
    at(value, pointer)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
}

pub fn as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

pub fn req_str(value: &Value, pointer: &str, context: &str) -> Result<String> {
    opt_str(value, pointer).ok_or_else(|| AppError::missing(context, pointer))
}

pub fn req_i64(value: &Value, pointer: &str, context: &str) -> Result<i64> {
    opt_i64(value, pointer).ok_or_else(|| AppError::missing(context, pointer))
}
