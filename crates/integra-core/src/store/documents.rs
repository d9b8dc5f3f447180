//! Collection operations shared by the storage backends

use super::{Filter, UpsertResult, ID_FIELD, OR_OPERATOR};
use crate::types::{values_equal, Cardinality, Record};
use crate::{Error, Result};
use serde_json::Value;

/// Whether `document` satisfies every condition of `filter`
pub fn matches(document: &Record, filter: &Filter) -> bool {
    filter.iter().all(|(field, expected)| {
        if field == OR_OPERATOR {
            return match expected {
                Value::Array(alternatives) => alternatives.iter().any(|alt| {
                    alt.as_object().map_or(false, |alt| matches(document, alt))
                }),
                _ => false,
            };
        }
        // A null condition also matches an absent field
        match document.get(field) {
            Some(actual) => values_equal(actual, expected),
            None => expected.is_null(),
        }
    })
}

/// Copy of a stored document without its hidden id
pub fn public(document: &Record) -> Value {
    let mut copy = document.clone();
    copy.remove(ID_FIELD);
    Value::Object(copy)
}

pub fn read(documents: &[Record], filter: &Filter, cardinality: Cardinality) -> Value {
    let mut found = documents.iter().filter(|doc| matches(doc, filter));
    match cardinality {
        Cardinality::Single => found.next().map(public).unwrap_or(Value::Null),
        Cardinality::Multi => Value::Array(found.map(public).collect()),
    }
}

pub fn delete(documents: &mut Vec<Record>, filter: &Filter, cardinality: Cardinality) -> usize {
    match cardinality {
        Cardinality::Single => match documents.iter().position(|doc| matches(doc, filter)) {
            Some(index) => {
                documents.remove(index);
                1
            }
            None => 0,
        },
        Cardinality::Multi => {
            let before = documents.len();
            documents.retain(|doc| !matches(doc, filter));
            before - documents.len()
        }
    }
}

pub fn upsert(
    documents: &mut Vec<Record>,
    filter: &Filter,
    object: &Value,
    cardinality: Cardinality,
) -> Result<UpsertResult> {
    match (cardinality, object) {
        (Cardinality::Single, Value::Object(fields)) => {
            if let Some(document) = documents.iter_mut().find(|doc| matches(doc, filter)) {
                set_fields(document, fields);
                return Ok(UpsertResult::Id(id_of(document)));
            }
            let mut document: Record = filter
                .iter()
                .filter(|(field, _)| !field.starts_with('$'))
                .map(|(field, value)| (field.clone(), value.clone()))
                .collect();
            set_fields(&mut document, fields);
            Ok(UpsertResult::Id(insert(documents, document)))
        }
        (Cardinality::Multi, Value::Array(items)) => {
            let mut fresh = Vec::with_capacity(items.len());
            for item in items {
                let document = item.as_object().ok_or_else(|| {
                    Error::unsupported("Only objects can be stored in a collection")
                })?;
                fresh.push(document.clone());
            }
            let count = fresh.len();
            for document in fresh {
                insert(documents, document);
            }
            Ok(UpsertResult::Count(count))
        }
        (Cardinality::Multi, Value::Object(fields)) => {
            let mut count = 0;
            for document in documents.iter_mut().filter(|doc| matches(doc, filter)) {
                set_fields(document, fields);
                count += 1;
            }
            Ok(UpsertResult::Count(count))
        }
        (_, other) => Err(Error::unsupported(format!(
            "Cannot upsert {} with {:?} cardinality",
            crate::types::value_type_name(other),
            cardinality
        ))),
    }
}

fn set_fields(document: &mut Record, fields: &Record) {
    for (field, value) in fields {
        if field != ID_FIELD {
            document.insert(field.clone(), value.clone());
        }
    }
}

fn insert(documents: &mut Vec<Record>, mut document: Record) -> String {
    let id = next_id(documents);
    document.remove(ID_FIELD);
    document.insert(ID_FIELD.to_string(), Value::String(id.clone()));
    documents.push(document);
    id
}

fn next_id(documents: &[Record]) -> String {
    let max = documents
        .iter()
        .filter_map(|doc| doc.get(ID_FIELD).and_then(Value::as_str))
        .filter_map(|id| id.parse::<u64>().ok())
        .max()
        .unwrap_or(0);
    (max + 1).to_string()
}

fn id_of(document: &Record) -> String {
    document
        .get(ID_FIELD)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn filter(value: Value) -> Filter {
        value.as_object().cloned().unwrap()
    }

    fn seeded() -> Vec<Record> {
        let mut docs = Vec::new();
        upsert(
            &mut docs,
            &Filter::new(),
            &json!([{"key": "A", "n": 1}, {"key": "B", "n": 2}, {"key": "C", "n": 2}]),
            Cardinality::Multi,
        )
        .unwrap();
        docs
    }

    #[test]
    fn test_read_hides_id() {
        let docs = seeded();
        assert_eq!(
            read(&docs, &filter(json!({"key": "A"})), Cardinality::Single),
            json!({"key": "A", "n": 1})
        );
        assert_eq!(read(&docs, &filter(json!({"key": "Z"})), Cardinality::Single), Value::Null);
    }

    #[test]
    fn test_or_filter() {
        let docs = seeded();
        let found = read(
            &docs,
            &filter(json!({"$or": [{"key": "A"}, {"key": "C"}]})),
            Cardinality::Multi,
        );
        assert_eq!(found, json!([{"key": "A", "n": 1}, {"key": "C", "n": 2}]));
    }

    #[test]
    fn test_upsert_single_updates_or_inserts() {
        let mut docs = seeded();
        upsert(&mut docs, &filter(json!({"key": "A"})), &json!({"n": 9}), Cardinality::Single).unwrap();
        assert_eq!(
            read(&docs, &filter(json!({"key": "A"})), Cardinality::Single),
            json!({"key": "A", "n": 9})
        );

        let id = upsert(&mut docs, &filter(json!({"key": "D"})), &json!({"n": 4}), Cardinality::Single).unwrap();
        assert_eq!(id, UpsertResult::Id("4".to_string()));
        assert_eq!(docs.len(), 4);
    }

    #[test]
    fn test_upsert_multi_object_never_inserts() {
        let mut docs = seeded();
        let res = upsert(&mut docs, &filter(json!({"n": 2})), &json!({"flag": true}), Cardinality::Multi).unwrap();
        assert_eq!(res, UpsertResult::Count(2));
        let res = upsert(&mut docs, &filter(json!({"n": 7})), &json!({"flag": true}), Cardinality::Multi).unwrap();
        assert_eq!(res, UpsertResult::Count(0));
        assert_eq!(docs.len(), 3);
    }

    #[test]
    fn test_delete() {
        let mut docs = seeded();
        assert_eq!(delete(&mut docs, &filter(json!({"n": 2})), Cardinality::Single), 1);
        assert_eq!(delete(&mut docs, &Filter::new(), Cardinality::Multi), 2);
        assert!(docs.is_empty());
    }

    #[test]
    fn test_scalar_cannot_be_stored() {
        let mut docs = Vec::new();
        assert!(upsert(&mut docs, &Filter::new(), &json!(5), Cardinality::Single).is_err());
        assert!(upsert(&mut docs, &Filter::new(), &json!([1]), Cardinality::Multi).is_err());
    }
}
