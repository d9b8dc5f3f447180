//! Configuration command handlers

use crate::cli::{ConfigAction, ConfigArgs, ConfigInitArgs, OutputFormat};
use crate::config::Config;
use crate::error::Result;
use crate::output::OutputWriter;
use std::path::PathBuf;

/// Handle the config command
pub fn handle_config(args: ConfigArgs, config: &Config, output: &mut OutputWriter) -> Result<()> {
    match args.action {
        ConfigAction::Show => handle_config_show(config, output),
        ConfigAction::Init(init_args) => handle_config_init(init_args, output),
        ConfigAction::Path => handle_config_path(output),
    }
}

fn handle_config_show(config: &Config, output: &mut OutputWriter) -> Result<()> {
    if output.format() == OutputFormat::Human {
        let content = serde_yaml::to_string(config)?;
        output.writeln(content.trim_end())
    } else {
        output.data(config)
    }
}

fn handle_config_init(args: ConfigInitArgs, output: &mut OutputWriter) -> Result<()> {
    let path = args.path.unwrap_or_else(|| PathBuf::from(".integra.yaml"));

    if path.exists() && !args.force {
        return output.warning(&format!(
            "Config already exists at {} (use --force to overwrite)",
            path.display()
        ));
    }

    Config::starter().save(&path)?;
    output.success(&format!("✓ Created config at {}", path.display()))?;
    output.info("Edit the databases and params sections for your environment.")
}

fn handle_config_path(output: &mut OutputWriter) -> Result<()> {
    for path in Config::default_config_paths() {
        let marker = if path.exists() { "*" } else { " " };
        output.writeln(&format!("{} {}", marker, path.display()))?;
    }
    Ok(())
}
