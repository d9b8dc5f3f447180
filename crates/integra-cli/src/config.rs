//! Configuration management for the CLI
//!
//! Settings come from a YAML or JSON file given with `--config`, found in
//! `INTEGRA_CONFIG`, or picked up from the default locations. The file names
//! the parameter sets substituted into step files, the databases steps read
//! and write, trigger bindings and HTTP settings.

use crate::error::{Error, Result};
use integra_core::store::{TriggerBindings, TriggerConfig, TriggerRegistry};
use integra_core::{Databases, Environment, HttpClientConfig, JsonFileBackend, MemoryBackend, Params};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Name of the active parameter set
    pub environment: Option<String>,

    /// Parameter sets by name, substituted as `$name` into step files
    pub params: BTreeMap<String, Params>,

    /// Databases by name
    pub databases: BTreeMap<String, DatabaseConfig>,

    /// Trigger bindings: collection -> action -> trigger name
    pub triggers: TriggerConfig,

    /// HTTP client settings
    pub http: HttpConfig,

    /// Logging settings
    pub logging: LogSettings,
}

/// Storage behind one database name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum DatabaseConfig {
    /// In-process store, lost when the command exits
    Memory,
    /// One JSON file per collection under `path`
    Json { path: PathBuf },
}

/// HTTP client settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Request timeout in seconds
    pub timeout: u64,
    /// Validate TLS certificates
    pub validate_tls: bool,
}

impl Default for HttpConfig {
    fn default() -> Self {
        let defaults = HttpClientConfig::default();
        Self {
            timeout: defaults.timeout_secs,
            validate_tls: defaults.validate_tls,
        }
    }
}

/// Logging settings from the configuration file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    /// Filter directive used when neither `-v` nor `RUST_LOG` is given
    pub level: Option<String>,
    /// compact, full or json
    pub format: Option<String>,
}

impl Config {
    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        let content = std::fs::read_to_string(path)?;

        let config = if is_yaml(path) {
            serde_yaml::from_str(&content)?
        } else {
            serde_json::from_str(&content)?
        };
        debug!(path = %path.display(), "Configuration loaded");
        Ok(config)
    }

    /// Load configuration from default locations
    pub fn load() -> Result<Self> {
        for path in Self::default_config_paths() {
            if path.exists() {
                match Self::from_file(&path) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        warn!(path = %path.display(), error = %e, "Failed to load config");
                    }
                }
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific file or default locations
    pub fn load_with_file(file: Option<&Path>) -> Result<Self> {
        match file {
            Some(path) => Self::from_file(path),
            None => Self::load(),
        }
    }

    /// Configuration file paths checked in order
    pub fn default_config_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(".integra.yaml"), PathBuf::from(".integra.json")];

        if let Some(path) = Self::user_config_path() {
            let json = path.with_extension("json");
            paths.push(path);
            paths.push(json);
        }

        paths
    }

    /// User-level configuration file
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("integra").join("config.yaml"))
    }

    /// Active parameter sets; `active` overrides the configured name
    pub fn environment(&self, active: Option<&str>) -> Environment {
        Environment {
            active: active.map(str::to_string).or_else(|| self.environment.clone()),
            sets: self.params.clone(),
        }
    }

    /// Open every configured database with the configured triggers bound
    pub fn databases(&self) -> Result<Databases> {
        let bindings = TriggerBindings::resolve(&self.triggers, &TriggerRegistry::with_builtins())?;
        let mut databases = Databases::new().with_triggers(bindings);
        for (name, database) in &self.databases {
            match database {
                DatabaseConfig::Memory => databases.register(name.clone(), Arc::new(MemoryBackend::new())),
                DatabaseConfig::Json { path } => {
                    databases.register(name.clone(), Arc::new(JsonFileBackend::open(path)?))
                }
            }
        }
        Ok(databases)
    }

    pub fn http_client(&self) -> HttpClientConfig {
        HttpClientConfig {
            timeout_secs: self.http.timeout,
            validate_tls: self.http.validate_tls,
        }
    }

    /// Starter configuration written by `config init`
    pub fn starter() -> Self {
        let mut params = BTreeMap::new();
        if let Some(test) = json!({"base": "https://tracker.example.com", "project": "PRJ"}).as_object() {
            params.insert("test".to_string(), test.clone());
        }
        let mut databases = BTreeMap::new();
        databases.insert(
            "work".to_string(),
            DatabaseConfig::Json {
                path: PathBuf::from("data/work"),
            },
        );
        Self {
            environment: Some("test".to_string()),
            params,
            databases,
            ..Self::default()
        }
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = if is_yaml(path) {
            serde_yaml::to_string(self)?
        } else {
            serde_json::to_string_pretty(self)?
        };

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        std::fs::write(path, content)?;
        Ok(())
    }
}

pub fn is_yaml(path: &Path) -> bool {
    matches!(path.extension().and_then(|s| s.to_str()), Some("yaml") | Some("yml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use integra_core::store::TriggerAction;
    use tempfile::TempDir;

    #[test]
    fn test_yaml_config() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("integra.yaml");
        std::fs::write(
            &path,
            r#"
environment: prod
params:
  prod:
    base: https://tracker.example.com
databases:
  raw:
    type: memory
  work:
    type: json
    path: data/work
triggers:
  backlog:
    after-upsert: log
http:
  timeout: 5
"#,
        )
        .unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.databases["raw"], DatabaseConfig::Memory);
        assert_eq!(
            config.databases["work"],
            DatabaseConfig::Json {
                path: PathBuf::from("data/work")
            }
        );
        assert_eq!(config.triggers["backlog"][&TriggerAction::AfterUpsert], "log");
        assert_eq!(config.http.timeout, 5);
        assert!(config.http.validate_tls);

        let params = config.environment(None).params().unwrap();
        assert_eq!(params["base"], "https://tracker.example.com");
    }

    #[test]
    fn test_environment_override() {
        let config = Config::starter();
        let env = config.environment(Some("missing"));
        assert!(env.params().is_err());
        assert_eq!(config.environment(None).params().unwrap()["project"], "PRJ");
    }

    #[test]
    fn test_missing_file() {
        let err = Config::from_file(Path::new("/nonexistent/integra.yaml")).unwrap_err();
        assert!(matches!(err, Error::FileNotFound { .. }));
    }

    #[test]
    fn test_save_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.json");
        Config::starter().save(&path).unwrap();

        let loaded = Config::from_file(&path).unwrap();
        assert_eq!(loaded.environment.as_deref(), Some("test"));
        assert_eq!(loaded.databases.len(), 1);
    }

    #[test]
    fn test_unknown_trigger_is_rejected() {
        let mut config = Config::default();
        let mut actions = std::collections::HashMap::new();
        actions.insert(TriggerAction::BeforeDelete, "audit".to_string());
        config.triggers.insert("backlog".to_string(), actions);
        assert!(config.databases().is_err());
    }
}
