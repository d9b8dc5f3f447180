//! Validate command handler

use super::utils::{ensure_file, Workspace};
use crate::cli::{OutputFormat, ValidateArgs};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::logging::timing::Timer;
use crate::output::OutputWriter;
use integra_core::config::load_template;
use integra_core::{Record, Validator, ValidatorConfig, Violation};
use serde_json::{json, Value};
use std::fs;
use std::path::Path;
use tracing::{info, instrument};

/// Handle the validate command
#[instrument(skip_all, fields(checks = %args.checks.display(), record = %args.record.display()))]
pub fn handle_validate(
    args: ValidateArgs,
    config: &Config,
    env: Option<&str>,
    output: &mut OutputWriter,
) -> Result<()> {
    let _timer = Timer::with_details("validate", &args.checks.display().to_string());
    ensure_file(&args.checks)?;
    ensure_file(&args.record)?;

    let workspace = Workspace::open(config, env)?;
    let checks: ValidatorConfig = load_template(&args.checks, &workspace.params)?;
    let validator = Validator::new(checks, &workspace.databases)?;

    let (records, single) = read_records(&args.record)?;
    let mut results: Vec<(Record, Vec<Violation>)> = Vec::with_capacity(records.len());
    for record in records {
        let violations = validator.validate(&record)?.unwrap_or_default();
        results.push((record, violations));
    }

    let total: usize = results.iter().map(|(_, v)| v.len()).sum();
    info!(records = results.len(), violations = total, "Validation finished");

    if single {
        output.violations(&results[0].1)?;
    } else if output.format() == OutputFormat::Human {
        for (index, (_, violations)) in results.iter().enumerate() {
            output.section(&format!("Record {}", index + 1))?;
            output.violations(violations)?;
        }
    } else {
        let rendered: Vec<Value> = results
            .iter()
            .map(|(record, violations)| json!({"record": record, "violations": violations}))
            .collect();
        output.data(&rendered)?;
    }

    if total > 0 {
        return Err(Error::ViolationsFound { count: total });
    }
    Ok(())
}

/// One object, or an array of objects; the flag tells which
fn read_records(path: &Path) -> Result<(Vec<Record>, bool)> {
    let invalid = || Error::InvalidFormat {
        path: path.to_path_buf(),
        expected: "a JSON object or an array of objects".to_string(),
    };

    let value: Value = serde_json::from_str(&fs::read_to_string(path)?).map_err(|_| invalid())?;
    match value {
        Value::Object(record) => Ok((vec![record], true)),
        Value::Array(items) => {
            let records = items
                .into_iter()
                .map(|item| match item {
                    Value::Object(record) => Ok(record),
                    _ => Err(invalid()),
                })
                .collect::<Result<Vec<_>>>()?;
            Ok((records, false))
        }
        _ => Err(invalid()),
    }
}
