//! Schema-driven field mapper
//!
//! Walks an arbitrarily nested payload following a tree of [`FieldDescriptor`]s
//! and writes the extracted values into a record or a list. Arrays may carry a
//! JSON Schema `match` filter; objects may be flattened into their parent or
//! materialised as explicit sub-records.
//!
//! Copyright (c) 2025 Integra Team
//! Licensed under the Apache-2.0 license

use crate::converter::convert;
use crate::types::{flag, ordered, FieldType, Record};
use crate::{Error, Result};
use serde::Deserialize;
use serde_json::Value;

static NULL: Value = Value::Null;

/// Declarative description of one field of an external payload
#[derive(Debug, Clone, Deserialize)]
pub struct FieldDescriptor {
    /// Key in the source object; absent means the source itself is used
    #[serde(default)]
    pub key: Option<String>,

    /// Output name, defaults to `key`
    #[serde(default, alias = "external_id")]
    pub ext_id: Option<String>,

    #[serde(rename = "type")]
    pub field_type: FieldType,

    /// Ordered subfields for arrays and objects
    #[serde(
        default,
        alias = "subfields",
        deserialize_with = "ordered::deserialize"
    )]
    pub fields: Vec<(String, FieldDescriptor)>,

    /// Objects only: materialise a new record instead of merging into the parent
    #[serde(default, deserialize_with = "flag::deserialize")]
    pub explicit: bool,

    #[serde(default, deserialize_with = "flag::deserialize")]
    pub optional: bool,

    /// Arrays only: JSON Schema an element must satisfy to be parsed
    #[serde(default, rename = "match", alias = "match_pattern")]
    pub match_pattern: Option<Value>,
}

impl FieldDescriptor {
    /// Name the value is stored under in a record target
    pub fn output_name(&self) -> Option<&str> {
        self.ext_id.as_deref().or(self.key.as_deref())
    }

    /// Parse a descriptor tree from a JSON value
    pub fn from_value(value: Value) -> Result<Self> {
        serde_json::from_value(value).map_err(|e| Error::Configuration {
            message: format!("Invalid field descriptor: {}", e),
            source: Some(e.into()),
        })
    }
}

/// Destination of a parse step
#[derive(Debug)]
pub enum Target<'a> {
    Record(&'a mut Record),
    List(&'a mut Vec<Value>),
}

impl Target<'_> {
    fn reborrow(&mut self) -> Target<'_> {
        match self {
            Target::Record(record) => Target::Record(&mut **record),
            Target::List(list) => Target::List(&mut **list),
        }
    }

    fn attach(&mut self, descriptor: &FieldDescriptor, value: Value) -> Result<()> {
        match self {
            Target::Record(record) => {
                let name = required_name(descriptor)?;
                record.insert(name.to_string(), value);
            }
            Target::List(list) => list.push(value),
        }
        Ok(())
    }
}

/// Extract a single record from `source`
pub fn extract_record(source: &Value, descriptor: &FieldDescriptor) -> Result<Record> {
    let mut record = Record::new();
    parse(source, descriptor, Target::Record(&mut record), false)?;
    Ok(record)
}

/// Extract a list of values from `source`
pub fn extract_list(source: &Value, descriptor: &FieldDescriptor) -> Result<Vec<Value>> {
    let mut list = Vec::new();
    parse(source, descriptor, Target::List(&mut list), false)?;
    Ok(list)
}

/// Recursively parse `source` according to `descriptor` into `target`
pub fn parse(
    source: &Value,
    descriptor: &FieldDescriptor,
    target: Target<'_>,
    parent_optional: bool,
) -> Result<()> {
    match descriptor.field_type {
        FieldType::Array => parse_array(source, descriptor, target, parent_optional),
        FieldType::Object => parse_object(source, descriptor, target, parent_optional),
        _ => parse_scalar(source, descriptor, target, parent_optional),
    }
}

fn parse_array(
    source: &Value,
    descriptor: &FieldDescriptor,
    target: Target<'_>,
    parent_optional: bool,
) -> Result<()> {
    if descriptor.fields.len() > 1 {
        return Err(Error::unsupported(format!(
            "Array '{}' must declare exactly one subfield, found {}",
            descriptor.output_name().unwrap_or("<noname>"),
            descriptor.fields.len()
        )));
    }
    let optional = descriptor.optional || parent_optional;

    match target {
        Target::Record(record) => {
            let name = required_name(descriptor)?.to_string();
            let raw = match &descriptor.key {
                Some(key) => match lookup(source, key) {
                    Some(value) => value,
                    None if optional => &NULL,
                    None => return Err(Error::missing(key.clone(), Some("array".to_string()))),
                },
                None => source,
            };
            let mut list = Vec::new();
            if !(raw.is_null() && optional) {
                fill_list(elements(raw, descriptor)?, descriptor, &mut list)?;
            }
            record.insert(name, Value::Array(list));
            Ok(())
        }
        Target::List(list) => {
            if descriptor.key.is_some() {
                return Err(Error::unsupported("Array of arrays is not supported"));
            }
            fill_list(elements(source, descriptor)?, descriptor, list)
        }
    }
}

fn elements<'v>(value: &'v Value, descriptor: &FieldDescriptor) -> Result<&'v [Value]> {
    value.as_array().map(Vec::as_slice).ok_or_else(|| {
        Error::unsupported(format!(
            "Expected a list for '{}', found {}",
            descriptor.output_name().unwrap_or("<noname>"),
            crate::types::value_type_name(value)
        ))
    })
}

fn fill_list(items: &[Value], descriptor: &FieldDescriptor, list: &mut Vec<Value>) -> Result<()> {
    let Some((_, subfield)) = descriptor.fields.first() else {
        list.extend(items.iter().cloned());
        return Ok(());
    };

    let validator = match &descriptor.match_pattern {
        Some(schema) => Some(jsonschema::validator_for(schema).map_err(|e| Error::Configuration {
            message: format!("Invalid match pattern: {}", e),
            source: None,
        })?),
        None => None,
    };

    for item in items {
        if validator.as_ref().map_or(true, |v| v.is_valid(item)) {
            parse(item, subfield, Target::List(&mut *list), false)?;
        }
    }
    Ok(())
}

fn parse_object(
    source: &Value,
    descriptor: &FieldDescriptor,
    mut target: Target<'_>,
    parent_optional: bool,
) -> Result<()> {
    let optional = descriptor.optional || parent_optional;
    let value = match &descriptor.key {
        Some(key) => match lookup(source, key) {
            Some(value) => value,
            None if optional => &NULL,
            None => return Err(Error::missing(key.clone(), Some("object".to_string()))),
        },
        None => source,
    };

    if descriptor.fields.is_empty() {
        return target.attach(descriptor, value.clone());
    }

    // Subfields fall back only when this object itself is absent
    let absent = optional && value.is_null();
    if descriptor.explicit {
        let mut record = Record::new();
        for (_, subfield) in &descriptor.fields {
            parse(value, subfield, Target::Record(&mut record), absent)?;
        }
        target.attach(descriptor, Value::Object(record))
    } else {
        for (_, subfield) in &descriptor.fields {
            parse(value, subfield, target.reborrow(), absent)?;
        }
        Ok(())
    }
}

fn parse_scalar(
    source: &Value,
    descriptor: &FieldDescriptor,
    mut target: Target<'_>,
    parent_optional: bool,
) -> Result<()> {
    let optional = descriptor.optional || parent_optional;
    let raw = match &descriptor.key {
        Some(key) => match lookup(source, key) {
            Some(value) => value,
            None if optional => &NULL,
            None => return Err(Error::missing(key.clone(), None)),
        },
        None => source,
    };
    let value = convert(raw, descriptor.field_type)?;
    target.attach(descriptor, value)
}

fn lookup<'v>(source: &'v Value, key: &str) -> Option<&'v Value> {
    source.as_object().and_then(|object| object.get(key))
}

fn required_name(descriptor: &FieldDescriptor) -> Result<&str> {
    descriptor.output_name().ok_or_else(|| {
        Error::config(format!(
            "A {} field written into a record needs a key or ext_id",
            descriptor.field_type
        ))
    })
}
