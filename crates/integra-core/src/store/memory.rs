//! In-memory storage backend

use super::{documents, Backend, Filter, UpsertResult};
use crate::types::{Cardinality, Record};
use crate::{Error, Result};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

/// Collections kept in process memory, used for tests and ephemeral runs
#[derive(Debug, Default)]
pub struct MemoryBackend {
    collections: Mutex<HashMap<String, Vec<Record>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Names of the collections holding at least one document
    pub fn collections(&self) -> Result<Vec<String>> {
        let guard = self.lock()?;
        let mut names: Vec<String> = guard
            .iter()
            .filter(|(_, docs)| !docs.is_empty())
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        Ok(names)
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, Vec<Record>>>> {
        self.collections.lock().map_err(|e| Error::Internal {
            message: "Memory store lock poisoned".to_string(),
            source: anyhow::anyhow!("{}", e),
        })
    }
}

impl Backend for MemoryBackend {
    fn read(&self, collection: &str, filter: &Filter, cardinality: Cardinality) -> Result<Value> {
        let guard = self.lock()?;
        let docs = guard.get(collection).map(Vec::as_slice).unwrap_or_default();
        Ok(documents::read(docs, filter, cardinality))
    }

    fn delete(&self, collection: &str, filter: &Filter, cardinality: Cardinality) -> Result<usize> {
        let mut guard = self.lock()?;
        Ok(guard
            .get_mut(collection)
            .map(|docs| documents::delete(docs, filter, cardinality))
            .unwrap_or(0))
    }

    fn upsert(
        &self,
        collection: &str,
        filter: &Filter,
        object: &Value,
        cardinality: Cardinality,
    ) -> Result<UpsertResult> {
        let mut guard = self.lock()?;
        let docs = guard.entry(collection.to_string()).or_default();
        documents::upsert(docs, filter, object, cardinality)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_round_trip() {
        let backend = MemoryBackend::new();
        backend
            .upsert("issues", &Filter::new(), &json!([{"key": "A"}]), Cardinality::Multi)
            .unwrap();
        assert_eq!(
            backend.read("issues", &Filter::new(), Cardinality::Multi).unwrap(),
            json!([{"key": "A"}])
        );
        assert_eq!(backend.collections().unwrap(), vec!["issues".to_string()]);
        assert_eq!(backend.delete("issues", &Filter::new(), Cardinality::Multi).unwrap(), 1);
        assert_eq!(
            backend.read("missing", &Filter::new(), Cardinality::Single).unwrap(),
            Value::Null
        );
    }
}
