//! Comparators deciding whether a check is violated

use super::ViolationTemplate;
use crate::types::{value_type_name, values_equal, Violation};
use crate::{Error, Result};
use serde_json::Value;
use std::cmp::Ordering;

/// Signature shared by every comparator
pub type CompareFn = fn(&Value, &Value, &ViolationTemplate) -> Result<Option<Violation>>;

/// Resolve a comparator by name; a dotted prefix is ignored
pub fn lookup(name: &str) -> Result<CompareFn> {
    let compare: CompareFn = match crate::registry_name(name) {
        "limit_exceed" => limit_exceed,
        "no_intersection" => no_intersection,
        _ => return Err(Error::config(format!("Unknown comparator '{}'", name))),
    };
    Ok(compare)
}

/// Violated when `to_validate` is strictly greater than `constraint`
pub fn limit_exceed(
    to_validate: &Value,
    constraint: &Value,
    template: &ViolationTemplate,
) -> Result<Option<Violation>> {
    let ordering = match (to_validate, constraint) {
        (Value::Number(a), Value::Number(b)) => a.as_f64().zip(b.as_f64()).and_then(|(a, b)| a.partial_cmp(&b)),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => None,
    };
    match ordering {
        Some(Ordering::Greater) => template.render(constraint).map(Some),
        Some(_) => Ok(None),
        None => Err(Error::Conversion {
            value: to_validate.to_string(),
            target: value_type_name(constraint).to_string(),
            message: "limit_exceed needs two numbers or two strings".to_string(),
        }),
    }
}

/// Violated when `constraint` is non-empty and shares nothing with `to_validate`
///
/// Null counts as the empty set and a scalar as a one-element set.
pub fn no_intersection(
    to_validate: &Value,
    constraint: &Value,
    template: &ViolationTemplate,
) -> Result<Option<Violation>> {
    let required = as_set(constraint);
    if required.is_empty() {
        return Ok(None);
    }
    let available = as_set(to_validate);
    let shared = required
        .iter()
        .any(|wanted| available.iter().any(|have| values_equal(wanted, have)));
    if shared {
        Ok(None)
    } else {
        template.render(constraint).map(Some)
    }
}

fn as_set(value: &Value) -> Vec<&Value> {
    match value {
        Value::Null => Vec::new(),
        Value::Array(items) => items.iter().collect(),
        other => vec![other],
    }
}
