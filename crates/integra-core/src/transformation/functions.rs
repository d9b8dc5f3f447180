//! Built-in transform functions
//!
//! Every function takes the loaded input (a record, a record list or a
//! `{name: record|list}` mapping) plus its parameter object and returns the
//! transformed value. Functions hold no state and perform no I/O. Parameter
//! objects are deserialised into small typed structs; a malformed parameter
//! object is a configuration error.

use super::formatting;
use super::query::Query;
use crate::converter::convert;
use crate::params::Params;
use crate::types::{compare_values, value_type_name, values_equal, FieldType, Record};
use crate::{Error, Result};
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::HashMap;

/// Signature shared by every transform function
pub type TransformFn = fn(Value, &Params) -> Result<Value>;

/// Names accepted by [`lookup`]
pub const NAMES: &[&str] = &[
    "group_singles2array",
    "ungroup_array2singles",
    "filter_set",
    "sort_set",
    "copy",
    "regexp",
    "format",
    "left_join",
    "union",
    "update_doc",
    "update_col",
    "replace",
    "rename_fields",
    "list_concat",
];

/// Resolve a transform function by name; a dotted prefix is ignored
pub fn lookup(name: &str) -> Result<TransformFn> {
    let func: TransformFn = match crate::registry_name(name) {
        "group_singles2array" => group_singles2array,
        "ungroup_array2singles" => ungroup_array2singles,
        "filter_set" => filter_set,
        "sort_set" => sort_set,
        "copy" => copy,
        "regexp" => regexp,
        "format" => format,
        "left_join" => left_join,
        "union" => union,
        "update_doc" => update_doc,
        "update_col" => update_col,
        "replace" => replace,
        "rename_fields" => rename_fields,
        "list_concat" => list_concat,
        _ => return Err(Error::config(format!("Unknown transform function '{}'", name))),
    };
    Ok(func)
}

#[derive(Debug, Deserialize)]
struct GroupParams {
    #[serde(rename = "field.key", default)]
    key: Option<String>,
    #[serde(rename = "field.array")]
    array: String,
    #[serde(rename = "field.single")]
    single: String,
}

/// Collect `field.single` of every record into an array per `field.key`
///
/// Without a key the whole input collapses into one record.
pub fn group_singles2array(input: Value, params: &Params) -> Result<Value> {
    let p: GroupParams = parse_params("group_singles2array", params)?;
    let rows = records("group_singles2array", input)?;

    let Some(key) = p.key else {
        let singles = rows
            .iter()
            .map(|row| field(row, &p.single).cloned())
            .collect::<Result<Vec<_>>>()?;
        let mut result = Record::new();
        result.insert(p.array, Value::Array(singles));
        return Ok(Value::Object(result));
    };

    let mut groups: Vec<(Value, Vec<Value>)> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    for row in &rows {
        let group = field(row, &key)?;
        let single = field(row, &p.single)?.clone();
        match index.get(&group.to_string()) {
            Some(&i) => groups[i].1.push(single),
            None => {
                index.insert(group.to_string(), groups.len());
                groups.push((group.clone(), vec![single]));
            }
        }
    }

    Ok(Value::Array(
        groups
            .into_iter()
            .map(|(group, singles)| {
                let mut row = Record::new();
                row.insert(key.clone(), group);
                row.insert(p.array.clone(), Value::Array(singles));
                Value::Object(row)
            })
            .collect(),
    ))
}

/// Expand `field.array` of every record into one record per element
pub fn ungroup_array2singles(input: Value, params: &Params) -> Result<Value> {
    let p: GroupParams = parse_params("ungroup_array2singles", params)?;
    let mut result = Vec::new();
    for row in records("ungroup_array2singles", input)? {
        let items = match field(&row, &p.array)? {
            Value::Array(items) => items,
            Value::Null => continue,
            other => return Err(not_a_list("ungroup_array2singles", &p.array, other)),
        };
        for item in items {
            let mut single = Record::new();
            if let Some(key) = &p.key {
                single.insert(key.clone(), field(&row, key)?.clone());
            }
            single.insert(p.single.clone(), item.clone());
            result.push(Value::Object(single));
        }
    }
    Ok(Value::Array(result))
}

#[derive(Debug, Deserialize)]
struct FilterParams {
    #[serde(rename = "where")]
    condition: String,
}

/// Keep the records matching the `where` query
pub fn filter_set(input: Value, params: &Params) -> Result<Value> {
    let p: FilterParams = parse_params("filter_set", params)?;
    let query = Query::parse(&p.condition)?;
    let rows = records("filter_set", input)?;
    Ok(Value::Array(
        rows.into_iter()
            .filter(|row| query.matches(row))
            .map(Value::Object)
            .collect(),
    ))
}

#[derive(Debug, Deserialize)]
struct SortParams {
    #[serde(rename = "sort.field")]
    field: String,
    #[serde(rename = "sort.order", default)]
    order: Option<Vec<Value>>,
}

/// Stable sort by `sort.field`
///
/// With `sort.order` values rank by their position in that list and values
/// outside it go last. Otherwise booleans, numbers, strings and containers
/// sort in that order, each by value, with nulls and missing fields last.
pub fn sort_set(input: Value, params: &Params) -> Result<Value> {
    let p: SortParams = parse_params("sort_set", params)?;
    let mut rows = records("sort_set", input)?;
    let key = |row: &Record| row.get(&p.field).cloned().unwrap_or(Value::Null);

    match &p.order {
        Some(order) => {
            let rank = |value: &Value| {
                order
                    .iter()
                    .position(|candidate| values_equal(candidate, value))
                    .unwrap_or(order.len())
            };
            rows.sort_by_key(|row| rank(&key(row)));
        }
        None => rows.sort_by(|a, b| total_order(&key(a), &key(b))),
    }
    Ok(Value::Array(rows.into_iter().map(Value::Object).collect()))
}

fn total_order(a: &Value, b: &Value) -> Ordering {
    fn rank(value: &Value) -> u8 {
        match value {
            Value::Bool(_) => 0,
            Value::Number(_) => 1,
            Value::String(_) => 2,
            Value::Array(_) | Value::Object(_) => 3,
            Value::Null => 4,
        }
    }
    rank(a)
        .cmp(&rank(b))
        .then_with(|| compare_values(a, b).unwrap_or(Ordering::Equal))
}

#[derive(Debug, Deserialize)]
struct CopyParams {
    #[serde(default)]
    fields: Option<Vec<String>>,
}

/// Return the input, projected onto `fields` when given
pub fn copy(input: Value, params: &Params) -> Result<Value> {
    let p: CopyParams = parse_params("copy", params)?;
    let Some(fields) = p.fields else {
        return Ok(input);
    };
    let project = |row: Record| -> Record {
        row.into_iter()
            .filter(|(name, _)| fields.contains(name))
            .collect()
    };
    match input {
        Value::Object(row) => Ok(Value::Object(project(row))),
        Value::Array(_) => Ok(Value::Array(
            records("copy", input)?
                .into_iter()
                .map(|row| Value::Object(project(row)))
                .collect(),
        )),
        other => Err(Error::unsupported(format!(
            "copy does not support {} input",
            value_type_name(&other)
        ))),
    }
}

#[derive(Debug, Deserialize)]
struct RegexpParams {
    #[serde(rename = "input.field")]
    input_field: String,
    pattern: String,
    output: Vec<RegexpOutput>,
}

#[derive(Debug, Deserialize)]
struct RegexpOutput {
    field: String,
    idx: usize,
    #[serde(rename = "type")]
    field_type: FieldType,
}

/// Extract typed capture groups of the first match into new records
///
/// `idx` counts capture groups from zero. A pattern without groups exposes
/// the whole match as index 0.
pub fn regexp(input: Value, params: &Params) -> Result<Value> {
    let p: RegexpParams = parse_params("regexp", params)?;
    let regex = Regex::new(&p.pattern).map_err(|e| Error::Configuration {
        message: format!("Invalid regexp pattern '{}': {}", p.pattern, e),
        source: Some(e.into()),
    })?;
    let offset = usize::from(regex.captures_len() > 1);

    let mut result = Vec::new();
    for row in records("regexp", input)? {
        let text = match field(&row, &p.input_field)? {
            Value::String(text) => text,
            other => {
                return Err(Error::transform(
                    "regexp",
                    format!("field '{}' holds {}, not a string", p.input_field, value_type_name(other)),
                ))
            }
        };
        let captures = regex.captures(text).ok_or_else(|| {
            Error::transform("regexp", format!("'{}' does not match '{}'", text, p.pattern))
        })?;

        let mut parsed = Record::new();
        for out in &p.output {
            let group = out.idx + offset;
            if group >= regex.captures_len() {
                return Err(Error::config(format!(
                    "regexp group {} does not exist in '{}'",
                    out.idx, p.pattern
                )));
            }
            let raw = captures
                .get(group)
                .map(|m| Value::String(m.as_str().to_string()))
                .unwrap_or(Value::Null);
            parsed.insert(out.field.clone(), convert(&raw, out.field_type)?);
        }
        result.push(Value::Object(parsed));
    }
    Ok(Value::Array(result))
}

#[derive(Debug, Deserialize)]
struct FormatParams {
    #[serde(rename = "format.string")]
    template: String,
    #[serde(rename = "format.input")]
    inputs: Vec<FormatInput>,
    #[serde(rename = "result.field")]
    result_field: String,
}

#[derive(Debug, Deserialize)]
struct FormatInput {
    field: String,
    #[serde(rename = "type")]
    field_type: FieldType,
}

/// Render `format.string` from typed fields of each record into `result.field`
pub fn format(input: Value, params: &Params) -> Result<Value> {
    let p: FormatParams = parse_params("format", params)?;
    let mut rows = records("format", input)?;
    for row in &mut rows {
        let args = p
            .inputs
            .iter()
            .map(|input| convert(field(row, &input.field)?, input.field_type))
            .collect::<Result<Vec<_>>>()?;
        let rendered = formatting::format(&p.template, &args)?;
        row.insert(p.result_field.clone(), Value::String(rendered));
    }
    Ok(Value::Array(rows.into_iter().map(Value::Object).collect()))
}

#[derive(Debug, Deserialize)]
struct JoinParams {
    #[serde(rename = "col.right")]
    right: String,
    #[serde(rename = "col.left")]
    left: String,
    #[serde(rename = "field.join")]
    on: String,
}

const JOIN_SUFFIX: &str = "_right";

/// Left join with `col.right` as the base
///
/// Every base row is kept; columns of `col.left` that also exist in the base
/// (the join column included) get the `_right` suffix. Base rows without a
/// partner get null for the joined columns, rows with several partners are
/// repeated. A null join key never matches.
pub fn left_join(input: Value, params: &Params) -> Result<Value> {
    let p: JoinParams = parse_params("left_join", params)?;
    let mut sources = named("left_join", input)?;
    let base = take_records("left_join", &mut sources, &p.right)?;
    let other = take_records("left_join", &mut sources, &p.left)?;

    let base_columns = columns(&base);
    let other_columns: Vec<(String, String)> = columns(&other)
        .into_iter()
        .map(|column| {
            let renamed = if base_columns.contains(&column) {
                format!("{}{}", column, JOIN_SUFFIX)
            } else {
                column.clone()
            };
            (column, renamed)
        })
        .collect();

    let mut result = Vec::new();
    for row in &base {
        let key = row.get(&p.on).filter(|key| !key.is_null());
        let partners: Vec<&Record> = match key {
            Some(key) => other
                .iter()
                .filter(|candidate| candidate.get(&p.on).is_some_and(|k| values_equal(k, key)))
                .collect(),
            None => Vec::new(),
        };

        let joined = |partner: Option<&Record>| {
            let mut out = Record::new();
            for column in &base_columns {
                out.insert(column.clone(), row.get(column).cloned().unwrap_or(Value::Null));
            }
            for (column, renamed) in &other_columns {
                let value = partner.and_then(|r| r.get(column)).cloned().unwrap_or(Value::Null);
                out.insert(renamed.clone(), value);
            }
            Value::Object(out)
        };

        if partners.is_empty() {
            result.push(joined(None));
        } else {
            result.extend(partners.into_iter().map(|partner| joined(Some(partner))));
        }
    }
    Ok(Value::Array(result))
}

// Union of field names in first-seen order
fn columns(rows: &[Record]) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    for row in rows {
        for name in row.keys() {
            if !seen.contains(name) {
                seen.push(name.clone());
            }
        }
    }
    seen
}

/// Concatenate every named list of the input in order
pub fn union(input: Value, _params: &Params) -> Result<Value> {
    let mut result = Vec::new();
    for (name, value) in named("union", input)? {
        match value {
            Value::Array(items) => result.extend(items),
            Value::Null => {}
            other => return Err(not_a_list("union", &name, &other)),
        }
    }
    Ok(Value::Array(result))
}

#[derive(Debug, Deserialize)]
struct UpdateDocParams {
    source: Vec<DocSource>,
    result: String,
}

#[derive(Debug, Deserialize)]
struct DocSource {
    #[serde(rename = "src.col")]
    collection: String,
    #[serde(rename = "src.field")]
    field: String,
}

/// Copy fields from other loaded documents into the `result` document
pub fn update_doc(input: Value, params: &Params) -> Result<Value> {
    let p: UpdateDocParams = parse_params("update_doc", params)?;
    let mut sources = named("update_doc", input)?;
    let mut result = match sources.remove(&p.result) {
        Some(Value::Object(doc)) => doc,
        Some(other) => return Err(not_a_record("update_doc", &p.result, &other)),
        None => return Err(Error::missing(p.result, Some("update_doc input".to_string()))),
    };

    for src in &p.source {
        let value = if src.collection == p.result {
            field(&result, &src.field)?.clone()
        } else {
            source_field(&sources, &src.collection, &src.field)?
        };
        result.insert(src.field.clone(), value);
    }
    Ok(Value::Object(result))
}

#[derive(Debug, Deserialize)]
struct UpdateColParams {
    #[serde(default)]
    target: Option<String>,
    update: Vec<ColUpdate>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum UpdateSource {
    Doc,
    Const,
}

#[derive(Debug, Deserialize)]
struct ColUpdate {
    #[serde(rename = "src.type")]
    source: UpdateSource,
    #[serde(rename = "src.col", default)]
    collection: Option<String>,
    #[serde(rename = "src.field", default)]
    field: Option<String>,
    #[serde(rename = "dest.field")]
    dest: String,
    #[serde(rename = "const.value", default)]
    value: Value,
}

/// Set fields on every record of the target collection
///
/// Values come from a field of another loaded document (`doc`) or from a
/// constant (`const`). Without `target` the input itself is the collection
/// and only constants are available.
pub fn update_col(input: Value, params: &Params) -> Result<Value> {
    let p: UpdateColParams = parse_params("update_col", params)?;
    let (mut rows, sources) = match &p.target {
        Some(target) => {
            let mut sources = named("update_col", input)?;
            let rows = take_records("update_col", &mut sources, target)?;
            (rows, sources)
        }
        None => (records("update_col", input)?, Record::new()),
    };

    let mut values = Vec::with_capacity(p.update.len());
    for update in &p.update {
        let value = match update.source {
            UpdateSource::Const => update.value.clone(),
            UpdateSource::Doc => {
                let (Some(collection), Some(name)) = (&update.collection, &update.field) else {
                    return Err(Error::config(format!(
                        "update_col doc source for '{}' needs 'src.col' and 'src.field'",
                        update.dest
                    )));
                };
                source_field(&sources, collection, name)?
            }
        };
        values.push((update.dest.clone(), value));
    }

    for row in &mut rows {
        for (dest, value) in &values {
            row.insert(dest.clone(), value.clone());
        }
    }
    Ok(Value::Array(rows.into_iter().map(Value::Object).collect()))
}

#[derive(Debug, Deserialize)]
struct ReplaceParams {
    replace: Vec<Replacement>,
}

#[derive(Debug, Deserialize)]
struct Replacement {
    field: String,
    #[serde(rename = "value.to_find")]
    find: Value,
    #[serde(rename = "value.replace_with")]
    replace_with: Value,
}

/// Swap matching field values across all records
pub fn replace(input: Value, params: &Params) -> Result<Value> {
    let p: ReplaceParams = parse_params("replace", params)?;
    let mut rows = records("replace", input)?;
    for row in &mut rows {
        for replacement in &p.replace {
            let current = field(row, &replacement.field)?;
            if values_equal(current, &replacement.find) {
                row.insert(replacement.field.clone(), replacement.replace_with.clone());
            }
        }
    }
    Ok(Value::Array(rows.into_iter().map(Value::Object).collect()))
}

#[derive(Debug, Deserialize)]
struct RenameParams {
    rename: Vec<Rename>,
}

#[derive(Debug, Deserialize)]
struct Rename {
    #[serde(rename = "src.field")]
    from: String,
    #[serde(rename = "dest.field")]
    to: String,
}

/// Move field values to new names; the old field is removed
pub fn rename_fields(input: Value, params: &Params) -> Result<Value> {
    let p: RenameParams = parse_params("rename_fields", params)?;
    let mut rows = records("rename_fields", input)?;
    for row in &mut rows {
        for rename in &p.rename {
            let value = row
                .shift_remove(&rename.from)
                .ok_or_else(|| Error::missing(rename.from.clone(), Some("rename_fields".to_string())))?;
            row.insert(rename.to.clone(), value);
        }
    }
    Ok(Value::Array(rows.into_iter().map(Value::Object).collect()))
}

#[derive(Debug, Deserialize)]
struct ConcatParams {
    #[serde(rename = "src.fields")]
    fields: Vec<String>,
    #[serde(rename = "dest.field")]
    dest: String,
}

/// Concatenate array fields of each record into `dest.field`
pub fn list_concat(input: Value, params: &Params) -> Result<Value> {
    let p: ConcatParams = parse_params("list_concat", params)?;
    let mut rows = records("list_concat", input)?;
    for row in &mut rows {
        let mut joined = Vec::new();
        for name in &p.fields {
            match field(row, name)? {
                Value::Array(items) => joined.extend(items.iter().cloned()),
                other => return Err(not_a_list("list_concat", name, other)),
            }
        }
        row.insert(p.dest.clone(), Value::Array(joined));
    }
    Ok(Value::Array(rows.into_iter().map(Value::Object).collect()))
}

fn parse_params<T: DeserializeOwned>(func: &str, params: &Params) -> Result<T> {
    serde_json::from_value(Value::Object(params.clone())).map_err(|e| Error::Configuration {
        message: format!("Invalid parameters for transform '{}': {}", func, e),
        source: Some(e.into()),
    })
}

fn records(func: &str, input: Value) -> Result<Vec<Record>> {
    match input {
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::Object(row) => Ok(row),
                other => Err(Error::unsupported(format!(
                    "{} expects records, got {}",
                    func,
                    value_type_name(&other)
                ))),
            })
            .collect(),
        Value::Null => Ok(Vec::new()),
        other => Err(Error::unsupported(format!(
            "{} expects a record list, got {}",
            func,
            value_type_name(&other)
        ))),
    }
}

fn named(func: &str, input: Value) -> Result<Record> {
    match input {
        Value::Object(sources) => Ok(sources),
        other => Err(Error::unsupported(format!(
            "{} expects named sources, got {}",
            func,
            value_type_name(&other)
        ))),
    }
}

fn take_records(func: &str, sources: &mut Record, name: &str) -> Result<Vec<Record>> {
    let value = sources
        .remove(name)
        .ok_or_else(|| Error::missing(name, Some(format!("{} input", func))))?;
    records(func, value)
}

fn field<'r>(row: &'r Record, name: &str) -> Result<&'r Value> {
    row.get(name).ok_or_else(|| Error::missing(name, None))
}

fn source_field(sources: &Record, collection: &str, name: &str) -> Result<Value> {
    match sources.get(collection) {
        Some(Value::Object(doc)) => Ok(field(doc, name)?.clone()),
        Some(other) => Err(not_a_record("update", collection, other)),
        None => Err(Error::missing(collection, Some("loaded sources".to_string()))),
    }
}

fn not_a_list(func: &str, name: &str, value: &Value) -> Error {
    Error::unsupported(format!(
        "{}: '{}' holds {}, not an array",
        func,
        name,
        value_type_name(value)
    ))
}

fn not_a_record(func: &str, name: &str, value: &Value) -> Error {
    Error::unsupported(format!(
        "{}: '{}' holds {}, not a document",
        func,
        name,
        value_type_name(value)
    ))
}
