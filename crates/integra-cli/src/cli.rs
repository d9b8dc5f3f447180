//! Command-line interface argument parsing and definitions
//!
//! This module defines the CLI structure using clap's derive API.

use clap::{Args, Parser, Subcommand, ValueEnum};
use is_terminal::IsTerminal;
use std::path::PathBuf;

/// Integra CLI - declarative data integration
///
/// Imports records from JSON APIs, reshapes them through transformation
/// pipelines and validates them against declarative checks. Every step is
/// described by a JSON configuration file.
#[derive(Parser, Debug)]
#[command(
    name = "integra",
    version,
    author,
    about,
    long_about = None,
    propagate_version = true,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Enable verbose output (can be used multiple times for increased verbosity)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all non-essential output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Path to configuration file
    #[arg(short, long, global = true, env = "INTEGRA_CONFIG")]
    pub config: Option<PathBuf>,

    /// Parameter set substituted into step files (overrides `environment`)
    #[arg(short, long, global = true, env = "INTEGRA_ENV")]
    pub env: Option<String>,

    /// Output format for results
    #[arg(short, long, value_enum, global = true, default_value = "human")]
    pub output: OutputFormat,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// The subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run every step of a step file in order
    Run(RunArgs),

    /// Run an import configuration
    Import(ImportArgs),

    /// Run an export configuration
    Export(ExportArgs),

    /// Run a transformation configuration
    Transform(TransformArgs),

    /// Validate a single record against a set of checks
    Validate(ValidateArgs),

    /// Manage configuration files and settings
    Config(ConfigArgs),

    /// Generate shell completions for the specified shell
    Completions(CompletionsArgs),
}

/// Basic auth credentials for the remote API
#[derive(Args, Debug, Clone, Default)]
pub struct CredentialArgs {
    /// API login
    #[arg(long, env = "INTEGRA_LOGIN")]
    pub login: Option<String>,

    /// API password
    #[arg(long, env = "INTEGRA_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,
}

/// Arguments for the run command
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Step file listing the steps to perform
    #[arg(value_name = "STEPS")]
    pub steps: PathBuf,

    /// Exit with a failure code when validation steps report violations
    #[arg(long)]
    pub fail_on_violations: bool,

    /// Write the run report to a file
    #[arg(long, value_name = "FILE")]
    pub save_report: Option<PathBuf>,

    #[command(flatten)]
    pub credentials: CredentialArgs,
}

/// Arguments for the import command
#[derive(Parser, Debug)]
pub struct ImportArgs {
    /// Import configuration file
    #[arg(value_name = "CFG")]
    pub cfg: PathBuf,

    #[command(flatten)]
    pub credentials: CredentialArgs,
}

/// Arguments for the export command
#[derive(Parser, Debug)]
pub struct ExportArgs {
    /// Export configuration file
    #[arg(value_name = "CFG")]
    pub cfg: PathBuf,

    #[command(flatten)]
    pub credentials: CredentialArgs,
}

/// Arguments for the transform command
#[derive(Parser, Debug)]
pub struct TransformArgs {
    /// Transformation configuration file
    #[arg(value_name = "CFG")]
    pub cfg: PathBuf,
}

/// Arguments for the validate command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Checks file (`{"checks": {...}}`)
    #[arg(value_name = "CHECKS")]
    pub checks: PathBuf,

    /// Record file: one JSON object or an array of objects
    #[arg(value_name = "RECORD")]
    pub record: PathBuf,
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

/// Configuration subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show the effective configuration
    Show,

    /// Write a starter configuration file
    Init(ConfigInitArgs),

    /// Print the configuration file locations that are searched
    Path,
}

/// Arguments for config init
#[derive(Parser, Debug)]
pub struct ConfigInitArgs {
    /// Where to write the file (defaults to ./.integra.yaml)
    #[arg(value_name = "PATH")]
    pub path: Option<PathBuf>,

    /// Overwrite an existing file
    #[arg(short, long)]
    pub force: bool,
}

/// Arguments for the completions command
#[derive(Parser, Debug)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}

/// Output format options
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable formatted output
    Human,
    /// JSON output
    Json,
    /// YAML output
    Yaml,
    /// Pretty-printed JSON output
    JsonPretty,
}

/// Shell types for completion generation
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}

impl Cli {
    /// Parse command-line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Get the effective verbosity level (considering quiet flag)
    pub fn verbosity_level(&self) -> u8 {
        if self.quiet {
            0
        } else {
            self.verbose
        }
    }

    /// Check if colored output should be used
    pub fn use_color(&self) -> bool {
        !self.no_color && std::io::stdout().is_terminal()
    }
}

impl Shell {
    /// Convert to clap_complete shell type
    pub fn to_clap_shell(self) -> clap_complete::Shell {
        match self {
            Shell::Bash => clap_complete::Shell::Bash,
            Shell::Zsh => clap_complete::Shell::Zsh,
            Shell::Fish => clap_complete::Shell::Fish,
            Shell::PowerShell => clap_complete::Shell::PowerShell,
            Shell::Elvish => clap_complete::Shell::Elvish,
        }
    }
}
