//! Store triggers
//!
//! A trigger is a hook executed before or after a delete or upsert on a
//! collection. Implementations are registered by name in a
//! [`TriggerRegistry`]; configuration binds names to `(collection, action)`
//! pairs.

use super::{Backend, Filter};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::info;

/// Point in a store operation where a trigger fires
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TriggerAction {
    BeforeDelete,
    AfterDelete,
    BeforeUpsert,
    AfterUpsert,
}

impl fmt::Display for TriggerAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TriggerAction::BeforeDelete => "before-delete",
            TriggerAction::AfterDelete => "after-delete",
            TriggerAction::BeforeUpsert => "before-upsert",
            TriggerAction::AfterUpsert => "after-upsert",
        };
        f.write_str(name)
    }
}

/// Hook run around store operations
///
/// Triggers receive the raw backend so that their own writes never fire
/// further triggers.
pub trait Trigger: Send + Sync {
    fn execute(
        &self,
        backend: &dyn Backend,
        collection: &str,
        object: Option<&Value>,
        filter: &Filter,
    ) -> Result<()>;
}

/// Trigger that records every invocation in the log
#[derive(Debug, Default, Clone, Copy)]
pub struct LogTrigger;

impl Trigger for LogTrigger {
    fn execute(
        &self,
        _backend: &dyn Backend,
        collection: &str,
        object: Option<&Value>,
        filter: &Filter,
    ) -> Result<()> {
        let filter = Value::Object(filter.clone());
        let object = object.cloned().unwrap_or(Value::Null);
        info!(collection, %filter, %object, "Trigger fired");
        Ok(())
    }
}

/// Configured bindings: collection -> action -> trigger name
pub type TriggerConfig = HashMap<String, HashMap<TriggerAction, String>>;

/// Named trigger implementations
#[derive(Clone, Default)]
pub struct TriggerRegistry {
    triggers: HashMap<String, Arc<dyn Trigger>>,
}

impl TriggerRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the built-in triggers (`log`)
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("log", Arc::new(LogTrigger));
        registry
    }

    pub fn register(&mut self, name: impl Into<String>, trigger: Arc<dyn Trigger>) {
        self.triggers.insert(name.into(), trigger);
    }

    /// Look up a trigger; a dotted prefix (`pkg.module.name`) is ignored
    pub fn get(&self, name: &str) -> Result<Arc<dyn Trigger>> {
        let short = crate::registry_name(name);
        self.triggers
            .get(short)
            .cloned()
            .ok_or_else(|| Error::config(format!("Unknown trigger '{}'", name)))
    }
}

impl fmt::Debug for TriggerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.triggers.keys().collect();
        names.sort();
        f.debug_struct("TriggerRegistry").field("triggers", &names).finish()
    }
}

/// Triggers resolved per `(collection, action)`
#[derive(Clone, Default)]
pub struct TriggerBindings {
    bindings: HashMap<(String, TriggerAction), Arc<dyn Trigger>>,
}

impl TriggerBindings {
    /// No triggers bound
    pub fn none() -> Self {
        Self::default()
    }

    /// Resolve configured names against the registry
    pub fn resolve(config: &TriggerConfig, registry: &TriggerRegistry) -> Result<Self> {
        let mut bindings = HashMap::new();
        for (collection, actions) in config {
            for (action, name) in actions {
                bindings.insert((collection.clone(), *action), registry.get(name)?);
            }
        }
        Ok(Self { bindings })
    }

    /// Bind a trigger directly
    pub fn bind(&mut self, collection: impl Into<String>, action: TriggerAction, trigger: Arc<dyn Trigger>) {
        self.bindings.insert((collection.into(), action), trigger);
    }

    pub fn get(&self, collection: &str, action: TriggerAction) -> Option<&Arc<dyn Trigger>> {
        self.bindings.get(&(collection.to_string(), action))
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

impl fmt::Debug for TriggerBindings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let keys: Vec<String> = self
            .bindings
            .keys()
            .map(|(collection, action)| format!("{}:{}", collection, action))
            .collect();
        f.debug_struct("TriggerBindings").field("bindings", &keys).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_names() {
        let action: TriggerAction = serde_json::from_str("\"before-upsert\"").unwrap();
        assert_eq!(action, TriggerAction::BeforeUpsert);
        assert_eq!(TriggerAction::AfterDelete.to_string(), "after-delete");
    }

    #[test]
    fn test_registry_lookup() {
        let registry = TriggerRegistry::with_builtins();
        assert!(registry.get("log").is_ok());
        assert!(registry.get("ext.triggers.log").is_ok());
        assert!(matches!(registry.get("audit"), Err(Error::Configuration { .. })));
    }

    #[test]
    fn test_resolve_unknown_trigger_fails() {
        let config: TriggerConfig =
            serde_json::from_str(r#"{"issues": {"after-upsert": "nope"}}"#).unwrap();
        assert!(TriggerBindings::resolve(&config, &TriggerRegistry::with_builtins()).is_err());

        let config: TriggerConfig =
            serde_json::from_str(r#"{"issues": {"after-upsert": "log"}}"#).unwrap();
        let bindings = TriggerBindings::resolve(&config, &TriggerRegistry::with_builtins()).unwrap();
        assert!(bindings.get("issues", TriggerAction::AfterUpsert).is_some());
        assert!(bindings.get("issues", TriggerAction::BeforeUpsert).is_none());
    }

    #[test]
    fn test_log_trigger_fires() {
        let backend = crate::store::MemoryBackend::new();
        let mut filter = Filter::new();
        filter.insert("key".to_string(), Value::from("A-1"));
        let object = serde_json::json!({"key": "A-1", "hours": 3});

        assert!(LogTrigger.execute(&backend, "issues", Some(&object), &filter).is_ok());
        assert!(LogTrigger.execute(&backend, "issues", None, &Filter::new()).is_ok());
    }
}
