//! Transform command handler

use super::utils::{ensure_file, Workspace};
use crate::cli::TransformArgs;
use crate::config::Config;
use crate::error::Result;
use crate::logging::timing::Timer;
use crate::output::OutputWriter;
use integra_core::config::load_template;
use integra_core::{Transformer, TransformerConfig};
use serde_json::json;
use tracing::{info, instrument};

/// Handle the transform command
#[instrument(skip_all, fields(cfg = %args.cfg.display()))]
pub fn handle_transform(
    args: TransformArgs,
    config: &Config,
    env: Option<&str>,
    output: &mut OutputWriter,
) -> Result<()> {
    let timer = Timer::with_details("transform", &args.cfg.display().to_string());
    ensure_file(&args.cfg)?;

    let workspace = Workspace::open(config, env)?;
    let pipeline: TransformerConfig = load_template(&args.cfg, &workspace.params)?;
    let sets = pipeline.sets.len();

    let performed = Transformer::new(pipeline, &workspace.databases).perform()?;
    let elapsed_ms = timer.elapsed().as_millis() as u64;
    info!(sets, performed, elapsed_ms, "Transformations finished");

    if output.format() == crate::cli::OutputFormat::Human {
        output.success(&format!(
            "✓ {} transformation(s) in {} set(s) performed ({}ms)",
            performed, sets, elapsed_ms
        ))
    } else {
        output.data(&json!({"sets": sets, "transformations": performed, "elapsed_ms": elapsed_ms}))
    }
}
