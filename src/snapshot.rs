//! Plain key-value snapshot used to persist meter state.
//!
//! Decimals are written as exact decimal strings. When reading, JSON numbers
//! are accepted too, since a hand-edited or foreign snapshot may carry them.

use crate::error::{MeterError, Result};
use rust_decimal::Decimal;
use serde_json::{Map, Value};
use std::str::FromStr;

pub type Snapshot = Map<String, Value>;

pub fn put_decimal(snapshot: &mut Snapshot, field: &str, value: Decimal) {
    snapshot.insert(field.to_string(), Value::String(value.to_string()));
}

pub fn put_optional_decimal(snapshot: &mut Snapshot, field: &str, value: Option<Decimal>) {
    match value {
        Some(value) => put_decimal(snapshot, field, value),
        None => {
            snapshot.insert(field.to_string(), Value::Null);
        }
    }
}

pub fn put_bool(snapshot: &mut Snapshot, field: &str, value: bool) {
    snapshot.insert(field.to_string(), Value::Bool(value));
}

pub fn get_decimal(snapshot: &Snapshot, field: &str) -> Result<Decimal> {
    get_optional_decimal(snapshot, field)?
        .ok_or_else(|| MeterError::corrupt(field, "value is null"))
}

/// Reads a decimal that may legitimately be unknown (`null`).
/// The key itself must still be present.
pub fn get_optional_decimal(snapshot: &Snapshot, field: &str) -> Result<Option<Decimal>> {
    match require(snapshot, field)? {
        Value::Null => Ok(None),
        Value::String(text) => parse_decimal(field, text.trim()).map(Some),
        Value::Number(number) => parse_decimal(field, &number.to_string()).map(Some),
        other => Err(MeterError::corrupt(
            field,
            format!("expected a decimal, found {other}"),
        )),
    }
}

pub fn get_bool(snapshot: &Snapshot, field: &str) -> Result<bool> {
    match require(snapshot, field)? {
        Value::Bool(flag) => Ok(*flag),
        Value::Number(number) => match number.as_f64() {
            Some(n) => Ok(n != 0.0),
            None => Err(MeterError::corrupt(field, "unrepresentable number")),
        },
        Value::String(text) => match text.trim().to_ascii_lowercase().as_str() {
            "true" | "1" => Ok(true),
            "false" | "0" => Ok(false),
            _ => Err(MeterError::corrupt(
                field,
                format!("'{text}' is not a boolean"),
            )),
        },
        other => Err(MeterError::corrupt(
            field,
            format!("expected a boolean, found {other}"),
        )),
    }
}

fn require<'a>(snapshot: &'a Snapshot, field: &str) -> Result<&'a Value> {
    snapshot
        .get(field)
        .ok_or_else(|| MeterError::corrupt(field, "missing"))
}

fn parse_decimal(field: &str, text: &str) -> Result<Decimal> {
    Decimal::from_str(text)
        .or_else(|_| Decimal::from_scientific(text))
        .map_err(|e| MeterError::corrupt(field, format!("'{text}' is not a decimal: {e}")))
}
