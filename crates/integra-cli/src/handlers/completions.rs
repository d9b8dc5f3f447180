//! Shell completions command handler

use crate::cli::{Cli, CompletionsArgs};
use crate::error::Result;
use clap::CommandFactory;
use clap_complete::generate;
use std::io;
use tracing::debug;

/// Print the completion script for the requested shell to stdout
pub fn handle_completions(args: CompletionsArgs) -> Result<()> {
    let shell = args.shell.to_clap_shell();
    debug!(%shell, "Generating completions");

    let mut cmd = Cli::command();
    generate(shell, &mut cmd, env!("CARGO_BIN_NAME"), &mut io::stdout());
    Ok(())
}
