//! Run command handler

use super::utils::{credentials, ensure_file, transport, Workspace};
use crate::cli::RunArgs;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::logging::timing::Timer;
use crate::output::OutputWriter;
use integra_core::config::load_template;
use integra_core::{Context, Credentials, Generator, GeneratorConfig, StepKind};
use std::fs;
use tracing::{debug, info, instrument};

/// Handle the run command
#[instrument(skip_all, fields(steps = %args.steps.display()))]
pub fn handle_run(
    args: RunArgs,
    config: &Config,
    env: Option<&str>,
    output: &mut OutputWriter,
) -> Result<()> {
    let _timer = Timer::with_details("run", &args.steps.display().to_string());
    ensure_file(&args.steps)?;

    let workspace = Workspace::open(config, env)?;
    let steps: GeneratorConfig = load_template(&args.steps, &workspace.params)?;
    info!(steps = steps.steps.len(), "Step file loaded");

    let remote = steps
        .steps
        .iter()
        .any(|(_, step)| matches!(step.kind, StepKind::Import | StepKind::Export));
    let credentials = if remote {
        credentials(&args.credentials)?
    } else {
        debug!("No import or export steps, running without credentials");
        Credentials::default()
    };
    let transport = transport(config)?;

    let context = Context {
        databases: &workspace.databases,
        transport: &transport,
        credentials: &credentials,
        params: workspace.params.clone(),
    };

    let pb = output.spinner("Running steps...");
    let result = Generator::new(steps, context).perform();
    if let Some(pb) = pb {
        pb.finish_and_clear();
    }
    let report = result?;

    if let Some(path) = &args.save_report {
        debug!(path = %path.display(), "Writing run report");
        fs::write(path, serde_json::to_string_pretty(&report)?)?;
    }

    output.section("Run Report")?;
    output.run_report(&report)?;

    let violations = report.total_violations();
    if args.fail_on_violations && violations > 0 {
        return Err(Error::ViolationsFound { count: violations });
    }
    Ok(())
}
