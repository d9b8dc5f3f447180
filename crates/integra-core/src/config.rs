//! Configuration loading helpers
//!
//! Step and request configuration files are JSON text with `$name`
//! placeholders. They are read, substituted with the active parameter set and
//! deserialised into typed structs; any failure is a configuration error
//! naming the file.

use crate::params::{substitute, Params};
use crate::{Error, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Named parameter sets plus the one currently active
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Environment {
    /// Name of the active parameter set
    #[serde(default)]
    pub active: Option<String>,

    /// Parameter sets by name (`test`, `prod`, ...)
    #[serde(default)]
    pub sets: BTreeMap<String, Params>,
}

impl Environment {
    /// Environment with a single active parameter set
    pub fn single(name: impl Into<String>, params: Params) -> Self {
        let name = name.into();
        let mut sets = BTreeMap::new();
        sets.insert(name.clone(), params);
        Self {
            active: Some(name),
            sets,
        }
    }

    /// Parameters of the active set; empty when no set is active
    pub fn params(&self) -> Result<Params> {
        match &self.active {
            None => Ok(Params::new()),
            Some(name) => self.sets.get(name).cloned().ok_or_else(|| {
                Error::config(format!("Unknown environment '{}'", name))
            }),
        }
    }
}

/// Read a configuration file as text
pub fn read_text(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|e| Error::Configuration {
        message: format!("Failed to read configuration file {}: {}", path.display(), e),
        source: Some(e.into()),
    })
}

/// Deserialize already substituted configuration text
pub fn parse_text<T: DeserializeOwned>(text: &str, origin: &Path) -> Result<T> {
    serde_json::from_str(text).map_err(|e| Error::Configuration {
        message: format!("Invalid configuration in {}: {}", origin.display(), e),
        source: Some(e.into()),
    })
}

/// Read `path`, substitute `params` and deserialize the result
pub fn load_template<T: DeserializeOwned>(path: &Path, params: &Params) -> Result<T> {
    let text = read_text(path)?;
    debug!(path = %path.display(), params = params.len(), "Loading configuration");
    parse_text(&substitute(&text, params), path)
}
