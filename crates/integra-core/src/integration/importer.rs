//! Bulk import driver

use super::request::{import, ImportKind, RequestTemplate};
use crate::config::load_template;
use crate::http::{Credentials, Transport};
use crate::params::Params;
use crate::store::{Databases, Filter};
use crate::types::{ordered, Cardinality};
use crate::{Error, Result};
use serde::Deserialize;
use serde_json::Value;
use std::path::PathBuf;
use tracing::info;

/// Import step configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ImportConfig {
    /// Database receiving the imported collections
    pub db: String,

    /// Parameters substituted into every request template
    #[serde(default)]
    pub mapping: Params,

    /// Requests in execution order
    #[serde(deserialize_with = "ordered::deserialize")]
    pub requests: Vec<(String, ImportStep)>,
}

/// One configured import request
#[derive(Debug, Clone, Deserialize)]
pub struct ImportStep {
    /// Request template file
    pub cfg: PathBuf,

    #[serde(rename = "type")]
    pub kind: ImportKind,

    /// Destination collection, wiped before saving
    pub dest: String,
}

/// Runs every configured import request and stores the results
pub struct Importer<'a> {
    config: ImportConfig,
    databases: &'a Databases,
    transport: &'a dyn Transport,
    credentials: &'a Credentials,
}

impl<'a> Importer<'a> {
    pub fn new(
        config: ImportConfig,
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

    /// Process every request in order; the first failure aborts the import
    pub fn perform(&self) -> Result<()> {
        let accessor = self.databases.accessor(&self.config.db)?;
        for (name, step) in &self.config.requests {
            info!(request = %name, kind = ?step.kind, dest = %step.dest, "Processing import request");
            let template: RequestTemplate = load_template(&step.cfg, &self.config.mapping)?;

            accessor.delete(&step.dest, &Filter::new(), Cardinality::Multi, false)?;
            let result = import(&template, step.kind, self.transport, self.credentials)?;

            match &result {
                Value::Object(_) => {
                    accessor.upsert(&step.dest, &Filter::new(), &result, Cardinality::Single, false)?;
                    info!(collection = %step.dest, "Imported document saved");
                }
                Value::Array(items) => {
                    if !items.is_empty() {
                        accessor.upsert(&step.dest, &Filter::new(), &result, Cardinality::Multi, false)?;
                    }
                    info!(collection = %step.dest, items = items.len(), "Imported items saved");
                }
                other => {
                    return Err(Error::unsupported(format!(
                        "Import '{}' produced {}",
                        name,
                        crate::types::value_type_name(other)
                    )))
                }
            }
        }
        Ok(())
    }
}
