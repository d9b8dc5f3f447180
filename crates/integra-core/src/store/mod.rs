//! Document persistence
//!
//! Collections of JSON documents behind the narrow [`Backend`] interface
//! (`read`/`delete`/`upsert`), an [`Accessor`] that adds trigger hooks, and
//! the [`Databases`] catalogue that maps configured database names to
//! backends.

pub mod accessor;
pub mod documents;
pub mod file;
pub mod memory;
pub mod triggers;

pub use accessor::{Accessor, Databases};
pub use file::JsonFileBackend;
pub use memory::MemoryBackend;
pub use triggers::{Trigger, TriggerAction, TriggerBindings, TriggerConfig, TriggerRegistry};

use crate::types::{Cardinality, Record};
use crate::Result;
use serde::Serialize;
use serde_json::Value;

/// Equality filter; `$or` holds a list of alternative filters
pub type Filter = Record;

/// Filter operator combining alternatives
pub const OR_OPERATOR: &str = "$or";

/// Hidden document identifier, never returned by reads
pub const ID_FIELD: &str = "_id";

/// Outcome of an upsert
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum UpsertResult {
    /// Id of the updated or inserted document
    Id(String),
    /// Number of inserted or updated documents
    Count(usize),
}

/// Raw CRUD over named collections
pub trait Backend: Send + Sync {
    /// Single returns the first match or `Null`; multi returns an array
    fn read(&self, collection: &str, filter: &Filter, cardinality: Cardinality) -> Result<Value>;

    /// Returns the number of deleted documents
    fn delete(&self, collection: &str, filter: &Filter, cardinality: Cardinality) -> Result<usize>;

    /// Single: `$set` the first match or insert `filter + object`.
    /// Multi with a list: insert every element.
    /// Multi with an object: `$set` every match, never insert.
    fn upsert(
        &self,
        collection: &str,
        filter: &Filter,
        object: &Value,
        cardinality: Cardinality,
    ) -> Result<UpsertResult>;
}
