//! JSON file storage backend
//!
//! Each collection is one pretty-printed JSON array stored as
//! `<dir>/<collection>.json`. Writes go through a temporary file and a rename.

use super::{documents, Backend, Filter, UpsertResult};
use crate::types::{Cardinality, Record};
use crate::{Error, Result};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

/// Collections persisted as JSON files under a directory
#[derive(Debug)]
pub struct JsonFileBackend {
    root: PathBuf,
    lock: Mutex<()>,
}

impl JsonFileBackend {
    /// Open a store rooted at `root`, creating the directory when needed
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|e| Error::Io {
            message: format!("Failed to create store directory {}: {}", root.display(), e),
            source: e,
        })?;
        Ok(Self {
            root,
            lock: Mutex::new(()),
        })
    }

    /// Directory holding the collection files
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn guard(&self) -> Result<MutexGuard<'_, ()>> {
        self.lock.lock().map_err(|e| Error::Internal {
            message: "File store lock poisoned".to_string(),
            source: anyhow::anyhow!("{}", e),
        })
    }

    fn path_for(&self, collection: &str) -> Result<PathBuf> {
        if collection.is_empty()
            || collection.contains(['/', '\\'])
            || collection.starts_with('.')
        {
            return Err(Error::config(format!("Invalid collection name '{}'", collection)));
        }
        Ok(self.root.join(format!("{}.json", collection)))
    }

    fn load(&self, collection: &str) -> Result<Vec<Record>> {
        let path = self.path_for(collection)?;
        if !path.exists() {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(&path).map_err(|e| Error::Io {
            message: format!("Failed to read {}: {}", path.display(), e),
            source: e,
        })?;
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_str(&content)?)
    }

    fn store(&self, collection: &str, docs: &[Record]) -> Result<()> {
        let path = self.path_for(collection)?;
        let tmp = self.root.join(format!(".{}.json.tmp", collection));
        let content = serde_json::to_string_pretty(docs)?;
        fs::write(&tmp, content).map_err(|e| Error::Io {
            message: format!("Failed to write {}: {}", tmp.display(), e),
            source: e,
        })?;
        fs::rename(&tmp, &path).map_err(|e| Error::Io {
            message: format!("Failed to replace {}: {}", path.display(), e),
            source: e,
        })?;
        debug!(collection, documents = docs.len(), "Collection saved");
        Ok(())
    }
}

impl Backend for JsonFileBackend {
    fn read(&self, collection: &str, filter: &Filter, cardinality: Cardinality) -> Result<Value> {
        let _guard = self.guard()?;
        let docs = self.load(collection)?;
        Ok(documents::read(&docs, filter, cardinality))
    }

    fn delete(&self, collection: &str, filter: &Filter, cardinality: Cardinality) -> Result<usize> {
        let _guard = self.guard()?;
        let mut docs = self.load(collection)?;
        let deleted = documents::delete(&mut docs, filter, cardinality);
        if deleted > 0 {
            self.store(collection, &docs)?;
        }
        Ok(deleted)
    }

    fn upsert(
        &self,
        collection: &str,
        filter: &Filter,
        object: &Value,
        cardinality: Cardinality,
    ) -> Result<UpsertResult> {
        let _guard = self.guard()?;
        let mut docs = self.load(collection)?;
        let result = documents::upsert(&mut docs, filter, object, cardinality)?;
        self.store(collection, &docs)?;
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_persists_across_instances() {
        let dir = TempDir::new().unwrap();
        {
            let backend = JsonFileBackend::open(dir.path()).unwrap();
            backend
                .upsert("sprint.backlog", &Filter::new(), &json!([{"key": "A-1"}]), Cardinality::Multi)
                .unwrap();
        }
        assert!(dir.path().join("sprint.backlog.json").exists());

        let backend = JsonFileBackend::open(dir.path()).unwrap();
        assert_eq!(
            backend.read("sprint.backlog", &Filter::new(), Cardinality::Multi).unwrap(),
            json!([{"key": "A-1"}])
        );
    }

    #[test]
    fn test_rejects_path_like_names() {
        let dir = TempDir::new().unwrap();
        let backend = JsonFileBackend::open(dir.path()).unwrap();
        assert!(backend.read("../etc", &Filter::new(), Cardinality::Multi).is_err());
        assert!(backend.read("a/b", &Filter::new(), Cardinality::Multi).is_err());
    }
}
