//! Error types for the Integra core library
//!
//! This module defines the error taxonomy shared by every engine component,
//! using thiserror for ergonomic error definitions and anyhow for opaque
//! sources coming from third-party crates.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Main error type for Integra operations
#[derive(Error, Debug)]
pub enum Error {
    /// A schema field is not present in the source and is not optional
    #[error("Missing required field '{field}'{}", context.as_ref().map(|c| format!(" ({})", c)).unwrap_or_default())]
    MissingRequiredField {
        field: String,
        context: Option<String>,
    },

    /// Shape the engine cannot process (array of arrays, bad type, ...)
    #[error("Unsupported structure: {message}")]
    UnsupportedStructure { message: String },

    /// Non-2xx response or network failure while talking to a remote API
    #[error("Transport failure{}: {message}", status_code.map(|s| format!(" ({})", s)).unwrap_or_default())]
    Transport {
        message: String,
        url: String,
        status_code: Option<u16>,
        #[source]
        source: Option<anyhow::Error>,
    },

    /// Value could not be cast to the requested type
    #[error("Conversion failed: cannot convert {value} to {target}: {message}")]
    Conversion {
        value: String,
        target: String,
        message: String,
    },

    /// Missing or malformed configuration, unknown registry names
    #[error("Configuration error: {message}")]
    Configuration {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    /// A transform function rejected its input
    #[error("Transform '{function}' failed: {message}")]
    Transform { function: String, message: String },

    /// JSON parsing and serialization errors
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: serde_json::Error,
    },

    /// IO errors
    #[error("IO error: {message}")]
    Io {
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// Generic internal error with context
    #[error("Internal error: {message}")]
    Internal {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

/// Convenience type alias for Results using our Error type
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a configuration error without a source
    pub fn config(message: impl Into<String>) -> Self {
        Error::Configuration {
            message: message.into(),
            source: None,
        }
    }

    /// Create an unsupported structure error
    pub fn unsupported(message: impl Into<String>) -> Self {
        Error::UnsupportedStructure {
            message: message.into(),
        }
    }

    /// Create a missing field error
    pub fn missing(field: impl Into<String>, context: Option<String>) -> Self {
        Error::MissingRequiredField {
            field: field.into(),
            context,
        }
    }

    /// Create a transform error
    pub fn transform(function: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Transform {
            function: function.into(),
            message: message.into(),
        }
    }

    /// Short machine-readable name of the error kind
    pub fn kind(&self) -> &'static str {
        match self {
            Error::MissingRequiredField { .. } => "missing_required_field",
            Error::UnsupportedStructure { .. } => "unsupported_structure",
            Error::Transport { .. } => "transport_failure",
            Error::Conversion { .. } => "conversion_failure",
            Error::Configuration { .. } => "configuration_error",
            Error::Transform { .. } => "transform_failure",
            Error::Json { .. } => "json",
            Error::Io { .. } => "io",
            Error::Internal { .. } => "internal",
        }
    }
}

/// Severity levels attached to validation violations
///
/// Labels outside the four known levels are kept verbatim as `Other` and
/// sort after `Critical`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Severity {
    /// Informational, no action required
    Info,
    /// Warning, should be reviewed
    Warning,
    /// Error, the record is not acceptable
    Error,
    /// Critical, the record must be rejected
    Critical,
    /// Any other label used by a check
    Other(String),
}

impl From<String> for Severity {
    fn from(label: String) -> Self {
        match label.as_str() {
            "info" => Severity::Info,
            "warning" => Severity::Warning,
            "error" => Severity::Error,
            "critical" => Severity::Critical,
            _ => Severity::Other(label),
        }
    }
}

impl From<Severity> for String {
    fn from(severity: Severity) -> Self {
        severity.to_string()
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
            Severity::Critical => write!(f, "critical"),
            Severity::Other(label) => f.write_str(label),
        }
    }
}

// Conversion implementations
impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Json {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::Internal {
            message: err.to_string(),
            source: err,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::missing("summary", Some("issue".to_string()));
        assert_eq!(err.to_string(), "Missing required field 'summary' (issue)");

        let err = Error::Transport {
            message: "Not Found".to_string(),
            url: "https://jira/rest".to_string(),
            status_code: Some(404),
            source: None,
        };
        assert_eq!(err.to_string(), "Transport failure (404): Not Found");
    }

    #[test]
    fn test_error_kind() {
        assert_eq!(Error::config("x").kind(), "configuration_error");
        assert_eq!(Error::unsupported("x").kind(), "unsupported_structure");
    }

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Info < Severity::Warning);
        assert!(Severity::Warning < Severity::Error);
        assert!(Severity::Error < Severity::Critical);
    }

    #[test]
    fn test_severity_serde() {
        let severity: Severity = serde_json::from_str("\"warning\"").unwrap();
        assert_eq!(severity, Severity::Warning);
        assert_eq!(severity.to_string(), "warning");

        let severity: Severity = serde_json::from_str("\"blocker\"").unwrap();
        assert_eq!(severity, Severity::Other("blocker".to_string()));
        assert_eq!(serde_json::to_string(&severity).unwrap(), "\"blocker\"");
        assert!(Severity::Critical < severity);
    }
}
