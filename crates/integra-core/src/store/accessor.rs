//! Trigger-aware access to configured databases

use super::triggers::{TriggerAction, TriggerBindings};
use super::{Backend, Filter, UpsertResult};
use crate::types::Cardinality;
use crate::{Error, Result};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

/// Catalogue of named backends shared by every engine component
#[derive(Clone, Default)]
pub struct Databases {
    backends: BTreeMap<String, Arc<dyn Backend>>,
    triggers: Arc<TriggerBindings>,
}

impl Databases {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use the given trigger bindings for every accessor handed out
    pub fn with_triggers(mut self, triggers: TriggerBindings) -> Self {
        self.triggers = Arc::new(triggers);
        self
    }

    /// Register a backend under a database name
    pub fn register(&mut self, name: impl Into<String>, backend: Arc<dyn Backend>) {
        self.backends.insert(name.into(), backend);
    }

    /// Builder-style [`Databases::register`]
    pub fn with(mut self, name: impl Into<String>, backend: Arc<dyn Backend>) -> Self {
        self.register(name, backend);
        self
    }

    /// Accessor for a configured database
    pub fn accessor(&self, name: &str) -> Result<Accessor> {
        let backend = self
            .backends
            .get(name)
            .cloned()
            .ok_or_else(|| Error::config(format!("Unknown database '{}'", name)))?;
        Ok(Accessor {
            database: name.to_string(),
            backend,
            triggers: Arc::clone(&self.triggers),
        })
    }

    /// Configured database names, sorted
    pub fn names(&self) -> Vec<&str> {
        self.backends.keys().map(String::as_str).collect()
    }
}

impl fmt::Debug for Databases {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Databases")
            .field("backends", &self.names())
            .field("triggers", &self.triggers)
            .finish()
    }
}

/// Data access object for one database
#[derive(Clone)]
pub struct Accessor {
    database: String,
    backend: Arc<dyn Backend>,
    triggers: Arc<TriggerBindings>,
}

impl Accessor {
    /// Wrap a backend without any trigger
    pub fn new(database: impl Into<String>, backend: Arc<dyn Backend>) -> Self {
        Self {
            database: database.into(),
            backend,
            triggers: Arc::new(TriggerBindings::none()),
        }
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    /// Read one document (`Null` when none matches) or a list of documents
    pub fn get(&self, collection: &str, filter: Option<&Filter>, cardinality: Cardinality) -> Result<Value> {
        let empty = Filter::new();
        self.backend
            .read(collection, filter.unwrap_or(&empty), cardinality)
    }

    /// Read every matching document as a list
    pub fn get_all(&self, collection: &str, filter: Option<&Filter>) -> Result<Vec<Value>> {
        match self.get(collection, filter, Cardinality::Multi)? {
            Value::Array(items) => Ok(items),
            _ => Ok(Vec::new()),
        }
    }

    /// Delete document(s), firing delete triggers when `triggers_on`
    pub fn delete(
        &self,
        collection: &str,
        filter: &Filter,
        cardinality: Cardinality,
        triggers_on: bool,
    ) -> Result<usize> {
        if triggers_on {
            self.fire(TriggerAction::BeforeDelete, collection, None, filter)?;
        }
        let deleted = self.backend.delete(collection, filter, cardinality)?;
        debug!(database = %self.database, collection, deleted, "Documents deleted");
        if triggers_on {
            self.fire(TriggerAction::AfterDelete, collection, None, filter)?;
        }
        Ok(deleted)
    }

    /// Update or insert document(s), firing upsert triggers when `triggers_on`
    pub fn upsert(
        &self,
        collection: &str,
        filter: &Filter,
        object: &Value,
        cardinality: Cardinality,
        triggers_on: bool,
    ) -> Result<UpsertResult> {
        if triggers_on {
            self.fire(TriggerAction::BeforeUpsert, collection, Some(object), filter)?;
        }
        let result = self.backend.upsert(collection, filter, object, cardinality)?;
        debug!(database = %self.database, collection, ?result, "Documents upserted");
        if triggers_on {
            self.fire(TriggerAction::AfterUpsert, collection, Some(object), filter)?;
        }
        Ok(result)
    }

    fn fire(
        &self,
        action: TriggerAction,
        collection: &str,
        object: Option<&Value>,
        filter: &Filter,
    ) -> Result<()> {
        if let Some(trigger) = self.triggers.get(collection, action) {
            info!(%action, collection, "Executing trigger");
            trigger.execute(self.backend.as_ref(), collection, object, filter)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Accessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Accessor").field("database", &self.database).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryBackend, Trigger};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Counting(AtomicUsize);

    impl Trigger for Counting {
        fn execute(&self, _: &dyn Backend, _: &str, _: Option<&Value>, _: &Filter) -> Result<()> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn databases(counter: Arc<Counting>) -> Databases {
        let mut bindings = TriggerBindings::none();
        bindings.bind("issues", TriggerAction::BeforeUpsert, counter.clone());
        bindings.bind("issues", TriggerAction::AfterDelete, counter);
        Databases::new()
            .with("main", Arc::new(MemoryBackend::new()))
            .with_triggers(bindings)
    }

    #[test]
    fn test_unknown_database() {
        let dbs = Databases::new();
        assert!(matches!(dbs.accessor("nope"), Err(Error::Configuration { .. })));
    }

    #[test]
    fn test_triggers_respect_switch() {
        let counter = Arc::new(Counting::default());
        let accessor = databases(counter.clone()).accessor("main").unwrap();

        accessor
            .upsert("issues", &Filter::new(), &json!([{"key": "A"}]), Cardinality::Multi, true)
            .unwrap();
        accessor
            .delete("issues", &Filter::new(), Cardinality::Multi, true)
            .unwrap();
        assert_eq!(counter.0.load(Ordering::SeqCst), 2);

        accessor
            .upsert("issues", &Filter::new(), &json!([{"key": "B"}]), Cardinality::Multi, false)
            .unwrap();
        assert_eq!(counter.0.load(Ordering::SeqCst), 2);
        assert_eq!(accessor.get_all("issues", None).unwrap(), vec![json!({"key": "B"})]);
    }
}
