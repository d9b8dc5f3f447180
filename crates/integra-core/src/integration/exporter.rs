//! Bulk export driver
//!
//! Every record of the source collection renders the request template once.
//! Parameters come from three layers: `dynamic_mapping` reads fields of the
//! record, then the step `mapping` and the request `static_mapping` overlay
//! them (static values win).

use super::request::{export, ExportKind, RequestTemplate};
use crate::config::{parse_text, read_text};
use crate::http::{Credentials, Transport};
use crate::params::{substitute, Params};
use crate::store::Databases;
use crate::types::{flag, is_truthy, ordered, Cardinality};
use crate::{Error, Result};
use serde::Deserialize;
use serde_json::Value;
use std::path::PathBuf;
use tracing::{debug, info};

/// Export step configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ExportConfig {
    /// Database holding the source collections
    pub db: String,

    #[serde(default)]
    pub mapping: Params,

    #[serde(deserialize_with = "ordered::deserialize")]
    pub requests: Vec<(String, ExportStep)>,
}

/// One configured export request
#[derive(Debug, Clone, Deserialize)]
pub struct ExportStep {
    /// Request template file
    pub cfg: PathBuf,

    #[serde(rename = "type")]
    pub kind: ExportKind,

    #[serde(rename = "src.collection")]
    pub src_collection: String,

    #[serde(default)]
    pub static_mapping: Params,

    /// Template parameter -> record field
    #[serde(default, deserialize_with = "ordered::deserialize")]
    pub dynamic_mapping: Vec<(String, String)>,

    /// Write the returned object back onto the source record
    #[serde(default, rename = "callback.update_src", deserialize_with = "flag::deserialize")]
    pub update_src: bool,
}

/// Pushes collections through export request templates
pub struct Exporter<'a> {
    config: ExportConfig,
    databases: &'a Databases,
    transport: &'a dyn Transport,
    credentials: &'a Credentials,
}

impl<'a> Exporter<'a> {
    pub fn new(
        config: ExportConfig,
        databases: &'a Databases,
        transport: &'a dyn Transport,
        credentials: &'a Credentials,
    ) -> Self {
        Self {
            config,
            databases,
            transport,
            credentials,
        }
    }

    /// Process every request in order; the first failure aborts the export
    pub fn perform(&self) -> Result<()> {
        for (name, step) in &self.config.requests {
            info!(request = %name, kind = ?step.kind, src = %step.src_collection, "Processing export request");
            let sent = self.process(step)?;
            info!(request = %name, sent, "Export request finished");
        }
        Ok(())
    }

    fn process(&self, step: &ExportStep) -> Result<usize> {
        let accessor = self.databases.accessor(&self.config.db)?;
        let raw = read_text(&step.cfg)?;
        let dataset = accessor.get_all(&step.src_collection, None)?;

        let mut shared = self.config.mapping.clone();
        shared.extend(step.static_mapping.clone());

        for item in &dataset {
            let params = item_params(item, step, &shared)?;
            let template: RequestTemplate = parse_text(&substitute(&raw, &params), &step.cfg)?;
            let result = export(&template, step.kind, self.transport, self.credentials)?;

            if !step.update_src || !is_truthy(&result) {
                continue;
            }
            let Value::Object(fields) = &result else {
                continue;
            };
            // Fields the result adds must still be unset: each read record is updated once
            let mut filter = item.as_object().cloned().unwrap_or_default();
            for field in fields.keys() {
                filter.entry(field.clone()).or_insert(Value::Null);
            }
            let updated = accessor.upsert(&step.src_collection, &filter, &result, Cardinality::Single, false)?;
            debug!(?updated, "Source record updated from export result");
        }
        Ok(dataset.len())
    }
}

fn item_params(item: &Value, step: &ExportStep, shared: &Params) -> Result<Params> {
    let mut params = Params::new();
    for (param, field) in &step.dynamic_mapping {
        let value = item
            .get(field)
            .ok_or_else(|| Error::missing(field.clone(), Some(step.src_collection.clone())))?;
        params.insert(param.clone(), value.clone());
    }
    params.extend(shared.clone());
    Ok(params)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn step(value: Value) -> ExportStep {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_step_config() {
        let s = step(json!({
            "cfg": "set-field.json",
            "type": "set_field_value",
            "src.collection": "labels",
            "dynamic_mapping": {"key": "key", "value": "label"},
            "callback.update_src": "True"
        }));
        assert_eq!(s.kind, ExportKind::SetFieldValue);
        assert!(s.update_src);
        assert_eq!(s.dynamic_mapping[1], ("value".to_string(), "label".to_string()));
    }

    #[test]
    fn test_static_values_win() {
        let s = step(json!({
            "cfg": "x.json",
            "type": "create_entity",
            "src.collection": "items",
            "dynamic_mapping": {"field": "name", "key": "key"}
        }));
        let shared = json!({"field": "customfield_1"}).as_object().cloned().unwrap();
        let params = item_params(&json!({"key": "A-1", "name": "n"}), &s, &shared).unwrap();
        assert_eq!(params.get("field"), Some(&json!("customfield_1")));
        assert_eq!(params.get("key"), Some(&json!("A-1")));
    }

    #[test]
    fn test_missing_dynamic_field() {
        let s = step(json!({
            "cfg": "x.json",
            "type": "delete_entity",
            "src.collection": "items",
            "dynamic_mapping": {"key": "key"}
        }));
        assert!(matches!(
            item_params(&json!({"other": 1}), &s, &Params::new()),
            Err(Error::MissingRequiredField { .. })
        ));
    }
}
