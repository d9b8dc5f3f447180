//! Integra CLI - Command-line interface for declarative data integration
//!
//! This is the main entry point for the Integra CLI application, providing
//! commands for running step files, single import, export and transformation
//! configurations, and validating records against declarative checks.

mod cli;
mod config;
mod error;
mod handlers;
mod logging;
mod output;

use cli::{Cli, Commands};
use colored::control;
use config::Config;
use error::Result;
use logging::{timing::Timer, LoggingConfig};
use output::OutputWriter;
use std::process;
use tracing::instrument;

fn main() {
    let cli = Cli::parse_args();

    control::set_override(cli.use_color());

    let code = match Config::load_with_file(cli.config.as_deref()) {
        Ok(config) => {
            if let Err(e) = init_logging(&cli, &config) {
                eprintln!("Failed to initialize logging: {}", e);
            }
            match run(cli, config) {
                Ok(()) => 0,
                Err(e) => report(&e),
            }
        }
        Err(e) => report(&e),
    };

    process::exit(code);
}

fn report(e: &error::Error) -> i32 {
    eprintln!("{}", error::format_error(e, control::SHOULD_COLORIZE.should_colorize()));

    if e.should_show_help() {
        eprintln!("\nFor more information, try '--help'");
    }

    e.exit_code()
}

/// Main application logic
#[instrument(skip_all, fields(command = ?cli.command))]
fn run(cli: Cli, config: Config) -> Result<()> {
    let _timer = Timer::new("cli_execution");

    let mut output = OutputWriter::new(cli.output, cli.use_color(), cli.quiet);
    let env = cli.env.as_deref();

    tracing::info!(
        command = ?cli.command,
        verbosity = cli.verbosity_level(),
        environment = env.or(config.environment.as_deref()).unwrap_or("none"),
        "Executing command"
    );

    match cli.command {
        Commands::Run(args) => handlers::handle_run(args, &config, env, &mut output),
        Commands::Import(args) => handlers::handle_import(args, &config, env, &mut output),
        Commands::Export(args) => handlers::handle_export(args, &config, env, &mut output),
        Commands::Transform(args) => handlers::handle_transform(args, &config, env, &mut output),
        Commands::Validate(args) => handlers::handle_validate(args, &config, env, &mut output),
        Commands::Config(args) => handlers::handle_config(args, &config, &mut output),
        Commands::Completions(args) => handlers::handle_completions(args),
    }
}

/// Initialize the logging system
fn init_logging(cli: &Cli, config: &Config) -> Result<()> {
    let verbosity = cli.verbosity_level();
    let mut logging_config = LoggingConfig::from_verbosity(verbosity);
    logging_config.merge_settings(&config.logging, verbosity);
    logging_config.merge_with_env();
    logging_config.ansi = cli.use_color();

    if cli.quiet {
        logging_config.level = "error".to_string();
    }

    logging::init_logging(logging_config)
}
