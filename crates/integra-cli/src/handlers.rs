//! Command handlers for CLI subcommands
//!
//! This module contains the implementation logic for each CLI subcommand.

mod completions;
mod config;
mod export;
mod import;
mod run;
mod transform;
mod utils;
mod validate;

pub use completions::handle_completions;
pub use config::handle_config;
pub use export::handle_export;
pub use import::handle_import;
pub use run::handle_run;
pub use transform::handle_transform;
pub use validate::handle_validate;
