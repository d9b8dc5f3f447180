//! Step driver
//!
//! Runs an ordered list of import, export, transformation and validation
//! steps. Every step names its own configuration file, which is read and
//! substituted with the environment parameters before it is parsed. The first
//! failing step stops the run; whatever earlier steps wrote stays in place.

use crate::config::load_template;
use crate::http::{Credentials, Transport};
use crate::integration::{ExportConfig, Exporter, ImportConfig, Importer};
use crate::params::Params;
use crate::store::{Databases, Filter};
use crate::transformation::{Transformer, TransformerConfig};
use crate::types::{ordered, Cardinality};
use crate::validation::{Validator, ValidatorConfig};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{error, info};

/// Step file: `{"steps": {name: {type, cfg}}}`
#[derive(Debug, Clone, Deserialize)]
pub struct GeneratorConfig {
    #[serde(deserialize_with = "ordered::deserialize")]
    pub steps: Vec<(String, StepConfig)>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StepConfig {
    #[serde(rename = "type")]
    pub kind: StepKind,
    pub cfg: PathBuf,
}

/// Kind of work a step performs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepKind {
    #[serde(alias = "jira.import")]
    Import,
    #[serde(alias = "jira.export")]
    Export,
    #[serde(alias = "db.transformation", alias = "transformation")]
    Transform,
    Validate,
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepKind::Import => write!(f, "import"),
            StepKind::Export => write!(f, "export"),
            StepKind::Transform => write!(f, "transform"),
            StepKind::Validate => write!(f, "validate"),
        }
    }
}

/// Configuration of a validation step
///
/// Every document of `collection` is validated; with `dest` the results are
/// stored there as `{record, violations}` documents.
#[derive(Debug, Clone, Deserialize)]
pub struct ValidateStepConfig {
    pub db: String,
    pub collection: String,
    #[serde(flatten)]
    pub checks: ValidatorConfig,
    #[serde(default)]
    pub dest: Option<String>,
}

/// Outcome of one completed step
#[derive(Debug, Clone, Serialize)]
pub struct StepReport {
    pub name: String,
    pub kind: StepKind,
    pub elapsed_ms: u128,
    /// Requests, transformations or records processed
    pub processed: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub violations: Option<usize>,
}

/// Summary of a finished run
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    pub steps: Vec<StepReport>,
}

impl RunReport {
    pub fn total_violations(&self) -> usize {
        self.steps.iter().filter_map(|s| s.violations).sum()
    }
}

/// Everything a step needs beyond its own configuration
pub struct Context<'a> {
    pub databases: &'a Databases,
    pub transport: &'a dyn Transport,
    pub credentials: &'a Credentials,
    pub params: Params,
}

/// Sequential step runner
pub struct Generator<'a> {
    config: GeneratorConfig,
    context: Context<'a>,
}

impl<'a> Generator<'a> {
    pub fn new(config: GeneratorConfig, context: Context<'a>) -> Self {
        Self { config, context }
    }

    /// Run every step in order, stopping at the first failure
    pub fn perform(&self) -> Result<RunReport> {
        let mut report = RunReport::default();
        for (name, step) in &self.config.steps {
            info!(step = %name, kind = %step.kind, cfg = %step.cfg.display(), "Performing step");
            let started = Instant::now();
            let (processed, violations) = self.run_step(step).map_err(|e| {
                error!(step = %name, kind = %step.kind, error = %e, "Step failed");
                e
            })?;
            report.steps.push(StepReport {
                name: name.clone(),
                kind: step.kind,
                elapsed_ms: started.elapsed().as_millis(),
                processed,
                violations,
            });
        }
        Ok(report)
    }

    fn run_step(&self, step: &StepConfig) -> Result<(usize, Option<usize>)> {
        let ctx = &self.context;
        match step.kind {
            StepKind::Import => {
                let config: ImportConfig = load_template(&step.cfg, &ctx.params)?;
                let requests = config.requests.len();
                Importer::new(config, ctx.databases, ctx.transport, ctx.credentials).perform()?;
                Ok((requests, None))
            }
            StepKind::Export => {
                let config: ExportConfig = load_template(&step.cfg, &ctx.params)?;
                let requests = config.requests.len();
                Exporter::new(config, ctx.databases, ctx.transport, ctx.credentials).perform()?;
                Ok((requests, None))
            }
            StepKind::Transform => {
                let config: TransformerConfig = load_template(&step.cfg, &ctx.params)?;
                let performed = Transformer::new(config, ctx.databases).perform()?;
                Ok((performed, None))
            }
            StepKind::Validate => {
                let config: ValidateStepConfig = load_template(&step.cfg, &ctx.params)?;
                let (records, violations) = validate_collection(config, ctx.databases)?;
                Ok((records, Some(violations)))
            }
        }
    }
}

/// Validate every document of a collection; returns (records, violations)
pub fn validate_collection(config: ValidateStepConfig, databases: &Databases) -> Result<(usize, usize)> {
    let accessor = databases.accessor(&config.db)?;
    let records = accessor.get_all(&config.collection, None)?;
    let validator = Validator::new(config.checks, databases)?;

    let mut results = Vec::with_capacity(records.len());
    let mut total = 0;
    for record in &records {
        let fields = record.as_object().ok_or_else(|| {
            Error::unsupported(format!("'{}' holds a non-document entry", config.collection))
        })?;
        let violations = validator.validate(fields)?.unwrap_or_default();
        total += violations.len();
        results.push(json!({"record": record, "violations": violations}));
    }
    info!(collection = %config.collection, records = records.len(), violations = total, "Collection validated");

    if let Some(dest) = &config.dest {
        accessor.delete(dest, &Filter::new(), Cardinality::Multi, false)?;
        if !results.is_empty() {
            accessor.upsert(dest, &Filter::new(), &Value::Array(results), Cardinality::Multi, false)?;
        }
    }
    Ok((records.len(), total))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_kind_aliases() {
        let kinds: Vec<StepKind> =
            serde_json::from_str(r#"["jira.import", "export", "db.transformation", "validate"]"#).unwrap();
        assert_eq!(
            kinds,
            vec![StepKind::Import, StepKind::Export, StepKind::Transform, StepKind::Validate]
        );
        assert!(serde_json::from_str::<StepKind>(r#""sync""#).is_err());
    }

    #[test]
    fn test_steps_keep_order() {
        let config: GeneratorConfig = serde_json::from_str(
            r#"{"steps": {"b": {"type": "import", "cfg": "b.json"}, "a": {"type": "transform", "cfg": "a.json"}}}"#,
        )
        .unwrap();
        assert_eq!(config.steps[0].0, "b");
        assert_eq!(config.steps[1].1.kind, StepKind::Transform);
    }
}
