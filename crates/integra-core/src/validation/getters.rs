//! Value getters for validation checks
//!
//! A getter resolves one side of a check (`constraint` or `to_validate`)
//! from the record under validation, its parameter object and the
//! configured databases.

use crate::aggregator::{agg_single, AggFunc};
use crate::params::Params;
use crate::store::{Databases, Filter};
use crate::types::{values_equal, Cardinality, Record};
use crate::{Error, Result};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

/// Signature shared by every getter
pub type GetterFn = fn(&Record, &Params, &Databases) -> Result<Value>;

/// Resolve a getter by name; a dotted prefix is ignored
pub fn lookup(name: &str) -> Result<GetterFn> {
    let getter: GetterFn = match crate::registry_name(name) {
        "const" => constant,
        "return_input" => return_input,
        "extract" => extract,
        "aggregate" => aggregate,
        _ => return Err(Error::config(format!("Unknown getter '{}'", name))),
    };
    Ok(getter)
}

#[derive(Debug, Deserialize)]
struct ConstParams {
    #[serde(default)]
    value: Value,
}

/// The configured `value`
pub fn constant(_record: &Record, params: &Params, _databases: &Databases) -> Result<Value> {
    let p: ConstParams = parse_params("const", params)?;
    Ok(p.value)
}

#[derive(Debug, Deserialize)]
struct FieldParams {
    field: String,
}

/// A field of the record itself
pub fn return_input(record: &Record, params: &Params, _databases: &Databases) -> Result<Value> {
    let p: FieldParams = parse_params("return_input", params)?;
    record
        .get(&p.field)
        .cloned()
        .ok_or_else(|| Error::missing(p.field, Some("record under validation".to_string())))
}

#[derive(Debug, Deserialize)]
struct ExtractParams {
    db: String,
    #[serde(rename = "match", default)]
    match_fields: Vec<String>,
    collection: String,
}

impl ExtractParams {
    fn filter(&self, record: &Record) -> Result<Filter> {
        let mut filter = Filter::new();
        for name in &self.match_fields {
            let value = record
                .get(name)
                .ok_or_else(|| Error::missing(name.clone(), Some("record under validation".to_string())))?;
            filter.insert(name.clone(), value.clone());
        }
        Ok(filter)
    }
}

#[derive(Debug, Deserialize)]
struct ExtractFieldParams {
    #[serde(flatten)]
    source: ExtractParams,
    field: String,
}

/// `field` of the first document matching the record on `match`
///
/// Yields null when no document matches.
pub fn extract(record: &Record, params: &Params, databases: &Databases) -> Result<Value> {
    let p: ExtractFieldParams = parse_params("extract", params)?;
    let filter = p.source.filter(record)?;
    let accessor = databases.accessor(&p.source.db)?;
    let document = accessor.get(&p.source.collection, Some(&filter), Cardinality::Single)?;
    debug!(collection = %p.source.collection, found = !document.is_null(), "Extracted document");
    Ok(document.get(&p.field).cloned().unwrap_or(Value::Null))
}

#[derive(Debug, Deserialize)]
struct AggregateParams {
    extract: ExtractParams,
    #[serde(default)]
    substitute: Option<SubstituteParams>,
    aggregate: AggregateSpec,
}

#[derive(Debug, Deserialize)]
struct SubstituteParams {
    #[serde(rename = "match", default)]
    match_fields: Vec<String>,
    field: String,
}

#[derive(Debug, Deserialize)]
struct AggregateSpec {
    field: String,
    func: AggFunc,
}

/// Aggregate over the documents matching the record
///
/// With `substitute` the record replaces its own stored contribution, so the
/// aggregate reflects the state after the record is applied.
pub fn aggregate(record: &Record, params: &Params, databases: &Databases) -> Result<Value> {
    let p: AggregateParams = parse_params("aggregate", params)?;
    let filter = p.extract.filter(record)?;
    let accessor = databases.accessor(&p.extract.db)?;
    let mut dataset = accessor.get_all(&p.extract.collection, Some(&filter))?;

    if let Some(substitute) = &p.substitute {
        apply_substitute(record, &mut dataset, substitute);
    }

    let result = agg_single(&dataset, &p.aggregate.field, p.aggregate.func, None)?;
    Ok(result.unwrap_or(Value::Null))
}

fn apply_substitute(record: &Record, dataset: &mut Vec<Value>, substitute: &SubstituteParams) {
    let own = dataset.iter_mut().find(|row| {
        substitute.match_fields.iter().all(|name| {
            let stored = row.get(name).unwrap_or(&Value::Null);
            values_equal(stored, record.get(name).unwrap_or(&Value::Null))
        })
    });
    match own.and_then(Value::as_object_mut) {
        Some(row) => {
            let value = record.get(&substitute.field).cloned().unwrap_or(Value::Null);
            row.insert(substitute.field.clone(), value);
        }
        None => dataset.push(Value::Object(record.clone())),
    }
}

pub(crate) fn parse_params<T: DeserializeOwned>(name: &str, params: &Params) -> Result<T> {
    serde_json::from_value(Value::Object(params.clone())).map_err(|e| Error::Configuration {
        message: format!("Invalid parameters for '{}': {}", name, e),
        source: Some(e.into()),
    })
}
