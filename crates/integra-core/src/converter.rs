//! Type converter for canonical field types
//!
//! Casts loosely typed payload values into the canonical representation
//! declared by a field descriptor. Dates travel as ISO strings.
//!
//! Copyright (c) 2025 Integra Team
//! Licensed under the Apache-2.0 license

use crate::types::{is_truthy, FieldType};
use crate::{Error, Result};
use chrono::{NaiveDate, NaiveDateTime};
use serde_json::{Number, Value};
use tracing::error;

const DATE_FORMAT: &str = "%Y-%m-%d";
const DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";
const DISPLAY_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Convert a value to the requested canonical type
///
/// Falsy input yields `""` for strings and `Null` for every other type.
/// Failures are logged and returned as [`Error::Conversion`].
pub fn convert(value: &Value, target: FieldType) -> Result<Value> {
    if !is_truthy(value) {
        return Ok(match target {
            FieldType::String => Value::String(String::new()),
            _ => Value::Null,
        });
    }

    let result = match target {
        FieldType::String => Ok(value.clone()),
        FieldType::Int => to_int(value),
        FieldType::Float => to_float(value),
        FieldType::Date => to_date(value),
        FieldType::Datetime => to_datetime(value),
        FieldType::Array | FieldType::Object => Err(Error::unsupported(format!(
            "Not supported type - {}",
            target
        ))),
    };

    if let Err(e) = &result {
        error!(value = %value, target = %target, error = %e, "Conversion failed");
    }
    result
}

/// Render a canonical datetime string as `YYYY-MM-DD HH:MM`
pub fn datetime_to_string(value: &str) -> Result<String> {
    NaiveDateTime::parse_from_str(value, DATETIME_FORMAT)
        .map(|dt| dt.format(DISPLAY_FORMAT).to_string())
        .map_err(|e| conversion_error(&Value::String(value.to_string()), FieldType::Datetime, e))
}

fn to_int(value: &Value) -> Result<Value> {
    match value {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                return Ok(Value::from(i));
            }
            match n.as_f64() {
                Some(f) if f.is_finite() => Ok(Value::from(f.trunc() as i64)),
                _ => Err(conversion_error(value, FieldType::Int, "number out of range")),
            }
        }
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .map(Value::from)
            .map_err(|e| conversion_error(value, FieldType::Int, e)),
        Value::Bool(true) => Ok(Value::from(1)),
        _ => Err(conversion_error(value, FieldType::Int, "not a number")),
    }
}

fn to_float(value: &Value) -> Result<Value> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Bool(true) => Some(1.0),
        _ => None,
    };
    parsed
        .and_then(Number::from_f64)
        .map(Value::Number)
        .ok_or_else(|| conversion_error(value, FieldType::Float, "not a number"))
}

fn to_date(value: &Value) -> Result<Value> {
    let text = value
        .as_str()
        .ok_or_else(|| conversion_error(value, FieldType::Date, "expected a string"))?;
    let date = NaiveDate::parse_from_str(text, DATE_FORMAT)
        .map_err(|e| conversion_error(value, FieldType::Date, e))?;
    Ok(Value::String(date.format(DATE_FORMAT).to_string()))
}

// Only the date part is read; the time of day is always midnight.
fn to_datetime(value: &Value) -> Result<Value> {
    let text = value
        .as_str()
        .ok_or_else(|| conversion_error(value, FieldType::Datetime, "expected a string"))?;
    let head: String = text.chars().take(10).collect();
    let date = NaiveDate::parse_from_str(&head, DATE_FORMAT)
        .map_err(|e| conversion_error(value, FieldType::Datetime, e))?;
    let midnight = date
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| conversion_error(value, FieldType::Datetime, "invalid time"))?;
    Ok(Value::String(midnight.format(DATETIME_FORMAT).to_string()))
}

fn conversion_error(value: &Value, target: FieldType, message: impl ToString) -> Error {
    Error::Conversion {
        value: value.to_string(),
        target: target.to_string(),
        message: message.to_string(),
    }
}
