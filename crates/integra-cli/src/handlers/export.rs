//! Export command handler

use super::utils::{credentials, ensure_file, transport, Workspace};
use crate::cli::ExportArgs;
use crate::config::Config;
use crate::error::Result;
use crate::logging::timing::Timer;
use crate::output::OutputWriter;
use integra_core::config::load_template;
use integra_core::integration::{ExportConfig, Exporter};
use tracing::{info, instrument};

/// Handle the export command
#[instrument(skip_all, fields(cfg = %args.cfg.display()))]
pub fn handle_export(
    args: ExportArgs,
    config: &Config,
    env: Option<&str>,
    output: &mut OutputWriter,
) -> Result<()> {
    let _timer = Timer::with_details("export", &args.cfg.display().to_string());
    ensure_file(&args.cfg)?;

    let workspace = Workspace::open(config, env)?;
    let export: ExportConfig = load_template(&args.cfg, &workspace.params)?;
    let db = export.db.clone();
    let requests = export.requests.len();

    let credentials = credentials(&args.credentials)?;
    let transport = transport(config)?;

    let pb = output.spinner(&format!("Exporting from '{}'...", db));
    let result = Exporter::new(export, &workspace.databases, &transport, &credentials).perform();
    if let Some(pb) = pb {
        pb.finish_and_clear();
    }
    result?;

    info!(db = %db, requests, "Export finished");
    output.success(&format!("✓ Exported {} request(s) from '{}'", requests, db))
}
