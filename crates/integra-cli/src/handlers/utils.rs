//! Shared utilities for command handlers

use crate::cli::CredentialArgs;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::logging::redaction;
use integra_core::{Credentials, Databases, HttpTransport, Params};
use std::path::Path;
use tracing::debug;

/// Databases and parameters every command works against
pub struct Workspace {
    pub databases: Databases,
    pub params: Params,
}

impl Workspace {
    /// Open the configured databases and select the active parameter set
    pub fn open(config: &Config, env: Option<&str>) -> Result<Self> {
        let environment = config.environment(env);
        let params = environment.params()?;
        let databases = config.databases()?;
        debug!(
            environment = environment.active.as_deref().unwrap_or("none"),
            params = params.len(),
            databases = ?databases.names(),
            "Workspace opened"
        );
        Ok(Self { databases, params })
    }
}

/// Fail early with a readable error when an input file is missing
pub fn ensure_file(path: &Path) -> Result<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(Error::FileNotFound {
            path: path.to_path_buf(),
        })
    }
}

/// Credentials from the command line, falling back to the environment
pub fn credentials(args: &CredentialArgs) -> Result<Credentials> {
    let credentials = Credentials::resolve(args.login.clone(), args.password.clone())?;
    debug!(
        credentials = %redaction::redact_sensitive(&format!("login={} password={}", credentials.login, credentials.password)),
        "Credentials resolved"
    );
    Ok(credentials)
}

/// HTTP transport built from the configured client settings
pub fn transport(config: &Config) -> Result<HttpTransport> {
    Ok(HttpTransport::new(config.http_client())?)
}
