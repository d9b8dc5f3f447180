//! Output formatting and writing utilities
//!
//! Results are written as JSON, YAML or a human-readable rendering with
//! tables for run reports and a list for validation violations.

use crate::cli::OutputFormat;
use crate::error::Result;
use crate::logging::redaction;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use integra_core::generator::RunReport;
use integra_core::{Severity, Violation};
use is_terminal::IsTerminal;
use serde::Serialize;
use std::io::{self, Write};
use std::time::Duration;
use tracing::trace;

/// Trait for formatting output with specialized support for common types
pub trait OutputFormatter {
    /// Format a serializable value
    fn format<T: Serialize>(&self, value: &T) -> Result<String>;

    /// Format the report of a finished run
    fn format_run_report(&self, report: &RunReport) -> Result<String>;

    /// Format the violations found for one record
    fn format_violations(&self, violations: &[Violation]) -> Result<String>;
}

impl OutputFormatter for OutputFormat {
    fn format<T: Serialize>(&self, value: &T) -> Result<String> {
        match self {
            OutputFormat::Json => Ok(serde_json::to_string(value)?),
            OutputFormat::JsonPretty | OutputFormat::Human => Ok(serde_json::to_string_pretty(value)?),
            OutputFormat::Yaml => Ok(serde_yaml::to_string(value)?),
        }
    }

    fn format_run_report(&self, report: &RunReport) -> Result<String> {
        match self {
            OutputFormat::Human => Ok(format_run_report_human(report)),
            _ => self.format(report),
        }
    }

    fn format_violations(&self, violations: &[Violation]) -> Result<String> {
        match self {
            OutputFormat::Human => Ok(format_violations_human(violations)),
            _ => self.format(&violations),
        }
    }
}

/// Output writer that handles different output formats and colors
pub struct OutputWriter {
    format: OutputFormat,
    use_color: bool,
    show_progress: bool,
    quiet: bool,
    writer: Box<dyn Write>,
}

impl OutputWriter {
    /// Create a new output writer
    pub fn new(format: OutputFormat, use_color: bool, quiet: bool) -> Self {
        Self {
            format,
            use_color,
            show_progress: !quiet && format == OutputFormat::Human && io::stderr().is_terminal(),
            quiet,
            writer: Box::new(io::stdout()),
        }
    }

    /// Create an output writer with a custom writer
    #[cfg(test)]
    pub fn with_writer(format: OutputFormat, quiet: bool, writer: Box<dyn Write>) -> Self {
        Self {
            format,
            use_color: false,
            show_progress: false,
            quiet,
            writer,
        }
    }

    /// Get the output format
    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Write a line of output
    pub fn writeln(&mut self, content: &str) -> Result<()> {
        writeln!(self.writer, "{}", content)?;
        self.writer.flush()?;
        Ok(())
    }

    /// Write an info message
    pub fn info(&mut self, message: &str) -> Result<()> {
        if self.quiet || self.format != OutputFormat::Human {
            return Ok(());
        }

        if self.use_color {
            self.writeln(&format!("{} {}", "ℹ".blue(), message))
        } else {
            self.writeln(&format!("INFO: {}", message))
        }
    }

    /// Write a success message
    pub fn success(&mut self, message: &str) -> Result<()> {
        if self.quiet || self.format != OutputFormat::Human {
            return Ok(());
        }

        if self.use_color {
            self.writeln(&message.green().to_string())
        } else {
            self.writeln(message)
        }
    }

    /// Write a warning message
    pub fn warning(&mut self, message: &str) -> Result<()> {
        if self.format != OutputFormat::Human {
            return Ok(());
        }

        if self.use_color {
            self.writeln(&message.yellow().to_string())
        } else {
            self.writeln(&format!("WARNING: {}", message))
        }
    }

    /// Write a section header
    pub fn section(&mut self, title: &str) -> Result<()> {
        if self.quiet || self.format != OutputFormat::Human {
            return Ok(());
        }

        self.writeln("")?;
        if self.use_color {
            self.writeln(&format!("═══ {} ═══", title).bright_blue().to_string())
        } else {
            self.writeln(&format!("=== {} ===", title))
        }
    }

    /// Write data in the configured format
    pub fn data<T: Serialize>(&mut self, value: &T) -> Result<()> {
        let mut logged = serde_json::to_value(value)?;
        redaction::redact_json_value(&mut logged);
        trace!(data = %logged, "Writing data");

        let formatted = self.format.format(value)?;
        self.writeln(formatted.trim_end())
    }

    /// Write a run report
    pub fn run_report(&mut self, report: &RunReport) -> Result<()> {
        if self.quiet && self.format == OutputFormat::Human {
            return Ok(());
        }
        let formatted = self.format.format_run_report(report)?;
        self.writeln(formatted.trim_end())
    }

    /// Write the violations of a validated record
    pub fn violations(&mut self, violations: &[Violation]) -> Result<()> {
        let formatted = if self.use_color && self.format == OutputFormat::Human {
            colorize_violations(violations)
        } else {
            self.format.format_violations(violations)?
        };
        self.writeln(formatted.trim_end())
    }

    /// Create a spinner for indeterminate progress
    pub fn spinner(&self, message: &str) -> Option<ProgressBar> {
        if !self.show_progress {
            return None;
        }

        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
            pb.set_style(style);
        }
        pb.set_message(message.to_string());
        pb.enable_steady_tick(Duration::from_millis(100));
        Some(pb)
    }
}

/// Render a table with padded columns
pub fn render_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate().take(widths.len()) {
            widths[i] = widths[i].max(cell.chars().count());
        }
    }

    let line = |cells: Vec<String>| {
        cells
            .iter()
            .zip(&widths)
            .map(|(cell, width)| format!("{:width$}", cell, width = *width))
            .collect::<Vec<_>>()
            .join(" │ ")
            .trim_end()
            .to_string()
    };

    let mut output = line(headers.iter().map(|h| h.to_string()).collect());
    output.push('\n');
    output.push_str(&widths.iter().map(|w| "─".repeat(*w)).collect::<Vec<_>>().join("─┼─"));
    for row in rows {
        output.push('\n');
        output.push_str(&line(row.clone()));
    }
    output
}

fn format_run_report_human(report: &RunReport) -> String {
    if report.steps.is_empty() {
        return "No steps performed".to_string();
    }

    let rows: Vec<Vec<String>> = report
        .steps
        .iter()
        .map(|step| {
            vec![
                step.name.clone(),
                step.kind.to_string(),
                step.processed.to_string(),
                step.violations.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string()),
                format!("{}ms", step.elapsed_ms),
            ]
        })
        .collect();

    let mut output = render_table(&["Step", "Type", "Processed", "Violations", "Time"], &rows);
    output.push_str(&format!(
        "\n\n{} step(s) completed, {} violation(s)",
        report.steps.len(),
        report.total_violations()
    ));
    output
}

fn format_violations_human(violations: &[Violation]) -> String {
    if violations.is_empty() {
        return "✓ No violations".to_string();
    }
    let mut output = format!("{} violation(s):", violations.len());
    for violation in violations {
        output.push_str(&format!("\n  [{}] {}", violation.severity, violation.message));
    }
    output
}

fn colorize_violations(violations: &[Violation]) -> String {
    if violations.is_empty() {
        return "✓ No violations".green().to_string();
    }
    let mut output = format!("{} violation(s):", violations.len()).bold().to_string();
    for violation in violations {
        let label = format!("[{}]", violation.severity);
        let label = match violation.severity {
            Severity::Info => label.blue(),
            Severity::Warning => label.yellow(),
            Severity::Error | Severity::Critical => label.red(),
            Severity::Other(_) => label.normal(),
        };
        output.push_str(&format!("\n  {} {}", label, violation.message));
    }
    output
}
