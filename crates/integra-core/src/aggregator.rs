//! Column aggregates over record lists
//!
//! Reduces one field of a list of records with `sum`, `mean`, `median`,
//! `min`, `max`, `count`, `nunique`, `first` or `last`, optionally grouped by
//! another field. Null and missing values are skipped. Empty input yields
//! `None`.

use crate::types::{compare_values, render_plain, value_type_name, values_equal, Record};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Supported aggregate functions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggFunc {
    Sum,
    Mean,
    Median,
    Min,
    Max,
    Count,
    Nunique,
    First,
    Last,
}

impl AggFunc {
    pub fn name(&self) -> &'static str {
        match self {
            AggFunc::Sum => "sum",
            AggFunc::Mean => "mean",
            AggFunc::Median => "median",
            AggFunc::Min => "min",
            AggFunc::Max => "max",
            AggFunc::Count => "count",
            AggFunc::Nunique => "nunique",
            AggFunc::First => "first",
            AggFunc::Last => "last",
        }
    }

    /// Apply to the non-null values of one column
    pub fn apply(&self, column: &[&Value]) -> Result<Value> {
        match self {
            AggFunc::Sum => sum(column),
            AggFunc::Mean => {
                let numbers = numeric(column, *self)?;
                if numbers.is_empty() {
                    return Ok(Value::Null);
                }
                Ok(float(numbers.iter().sum::<f64>() / numbers.len() as f64))
            }
            AggFunc::Median => {
                let mut numbers = numeric(column, *self)?;
                if numbers.is_empty() {
                    return Ok(Value::Null);
                }
                numbers.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
                let mid = numbers.len() / 2;
                let median = if numbers.len() % 2 == 0 {
                    (numbers[mid - 1] + numbers[mid]) / 2.0
                } else {
                    numbers[mid]
                };
                Ok(float(median))
            }
            AggFunc::Min => extreme(column, Ordering::Less),
            AggFunc::Max => extreme(column, Ordering::Greater),
            AggFunc::Count => Ok(Value::from(column.len())),
            AggFunc::Nunique => {
                let mut seen: Vec<&Value> = Vec::new();
                for &value in column {
                    if !seen.iter().any(|s| values_equal(s, value)) {
                        seen.push(value);
                    }
                }
                Ok(Value::from(seen.len()))
            }
            AggFunc::First => Ok(column.first().map(|v| (*v).clone()).unwrap_or(Value::Null)),
            AggFunc::Last => Ok(column.last().map(|v| (*v).clone()).unwrap_or(Value::Null)),
        }
    }
}

impl fmt::Display for AggFunc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for AggFunc {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        serde_json::from_value(Value::String(s.to_string()))
            .map_err(|_| Error::config(format!("Unknown aggregate function '{}'", s)))
    }
}

/// Aggregate `field` with one function
///
/// Without `group_by` the aggregate itself is returned; with it, an object
/// mapping each group key to its aggregate.
pub fn agg_single(
    values: &[Value],
    field: &str,
    func: AggFunc,
    group_by: Option<&str>,
) -> Result<Option<Value>> {
    if values.is_empty() {
        return Ok(None);
    }
    match group_by {
        None => Ok(Some(func.apply(&column(values.iter(), field))?)),
        Some(group_field) => {
            let mut result = Record::new();
            for (key, rows) in groups(values, group_field) {
                result.insert(key, func.apply(&column(rows.into_iter(), field))?);
            }
            Ok(Some(Value::Object(result)))
        }
    }
}

/// Aggregate `field` with several functions, keyed by function name
pub fn agg_multi(
    values: &[Value],
    field: &str,
    funcs: &[AggFunc],
    group_by: Option<&str>,
) -> Result<Option<Value>> {
    if values.is_empty() {
        return Ok(None);
    }
    let reduce = |col: &[&Value]| -> Result<Value> {
        let mut row = Record::new();
        for func in funcs {
            row.insert(func.name().to_string(), func.apply(col)?);
        }
        Ok(Value::Object(row))
    };
    match group_by {
        None => Ok(Some(reduce(&column(values.iter(), field))?)),
        Some(group_field) => {
            let mut result = Record::new();
            for (key, rows) in groups(values, group_field) {
                result.insert(key, reduce(&column(rows.into_iter(), field))?);
            }
            Ok(Some(Value::Object(result)))
        }
    }
}

fn column<'v>(rows: impl Iterator<Item = &'v Value>, field: &str) -> Vec<&'v Value> {
    rows.filter_map(|row| row.get(field))
        .filter(|value| !value.is_null())
        .collect()
}

// Groups in first-appearance order; rows without a group key are dropped
fn groups<'v>(values: &'v [Value], group_field: &str) -> Vec<(String, Vec<&'v Value>)> {
    let mut order: Vec<(String, Vec<&Value>)> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    for row in values {
        let Some(key) = row.get(group_field).filter(|k| !k.is_null()) else {
            continue;
        };
        let key = render_plain(key);
        match index.get(&key) {
            Some(&i) => order[i].1.push(row),
            None => {
                index.insert(key.clone(), order.len());
                order.push((key, vec![row]));
            }
        }
    }
    order
}

fn numeric(column: &[&Value], func: AggFunc) -> Result<Vec<f64>> {
    column
        .iter()
        .map(|value| {
            value.as_f64().ok_or_else(|| Error::Conversion {
                value: value.to_string(),
                target: "float".to_string(),
                message: format!("{} requires numeric values", func),
            })
        })
        .collect()
}

fn sum(column: &[&Value]) -> Result<Value> {
    if column.iter().all(|v| v.is_i64()) {
        let total = column
            .iter()
            .filter_map(|v| v.as_i64())
            .try_fold(0i64, i64::checked_add);
        if let Some(total) = total {
            return Ok(Value::from(total));
        }
    }
    Ok(float(numeric(column, AggFunc::Sum)?.iter().sum()))
}

fn extreme(column: &[&Value], wanted: Ordering) -> Result<Value> {
    let mut best: Option<&Value> = None;
    for &value in column {
        best = match best {
            None => Some(value),
            Some(current) => match compare_values(value, current) {
                Some(ordering) if ordering == wanted => Some(value),
                Some(_) => Some(current),
                None => {
                    return Err(Error::Conversion {
                        value: value.to_string(),
                        target: value_type_name(current).to_string(),
                        message: "values cannot be ordered".to_string(),
                    })
                }
            },
        };
    }
    Ok(best.cloned().unwrap_or(Value::Null))
}

fn float(value: f64) -> Value {
    Number::from_f64(value).map(Value::Number).unwrap_or(Value::Null)
}
