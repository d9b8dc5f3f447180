//! Import command handler

use super::utils::{credentials, ensure_file, transport, Workspace};
use crate::cli::ImportArgs;
use crate::config::Config;
use crate::error::Result;
use crate::logging::timing::Timer;
use crate::output::OutputWriter;
use integra_core::config::load_template;
use integra_core::integration::{ImportConfig, Importer};
use tracing::{info, instrument};

/// Handle the import command
#[instrument(skip_all, fields(cfg = %args.cfg.display()))]
pub fn handle_import(
    args: ImportArgs,
    config: &Config,
    env: Option<&str>,
    output: &mut OutputWriter,
) -> Result<()> {
    let _timer = Timer::with_details("import", &args.cfg.display().to_string());
    ensure_file(&args.cfg)?;

    let workspace = Workspace::open(config, env)?;
    let import: ImportConfig = load_template(&args.cfg, &workspace.params)?;
    let db = import.db.clone();
    let requests = import.requests.len();

    let credentials = credentials(&args.credentials)?;
    let transport = transport(config)?;

    let pb = output.spinner(&format!("Importing into '{}'...", db));
    let result = Importer::new(import, &workspace.databases, &transport, &credentials).perform();
    if let Some(pb) = pb {
        pb.finish_and_clear();
    }
    result?;

    info!(db = %db, requests, "Import finished");
    output.success(&format!("✓ Imported {} request(s) into '{}'", requests, db))
}
