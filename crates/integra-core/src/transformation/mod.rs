//! Transformation pipelines
//!
//! A transformation set pairs a source and a destination database with an
//! ordered list of transformations. Each transformation runs four stages in
//! strict order: load from the source, apply one transform function, wipe the
//! destination collection and save the result. Re-running a transformation on
//! the same source data therefore leaves the destination unchanged.
//!
//! Copyright (c) 2025 Integra Team
//! Licensed under the Apache-2.0 license

pub mod formatting;
pub mod functions;
pub mod query;

pub use functions::{lookup, TransformFn};
pub use query::Query;

use crate::params::Params;
use crate::store::{Accessor, Databases, Filter};
use crate::types::{ordered, value_type_name, Cardinality, Record};
use crate::{Error, Result};
use serde::Deserialize;
use serde_json::Value;
use std::str::FromStr;
use tracing::{debug, info};

/// Top-level transformation configuration
#[derive(Debug, Clone, Deserialize)]
pub struct TransformerConfig {
    #[serde(rename = "transformation-sets", deserialize_with = "ordered::deserialize")]
    pub sets: Vec<(String, TransformationSetConfig)>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TransformationSetConfig {
    pub db: DbPair,

    #[serde(deserialize_with = "ordered::deserialize")]
    pub transformations: Vec<(String, TransformationConfig)>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DbPair {
    #[serde(rename = "src.db")]
    pub src: String,
    #[serde(rename = "dest.db")]
    pub dest: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TransformationConfig {
    /// Load strategy name
    pub class: String,
    pub cfg: StageConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StageConfig {
    #[serde(rename = "src.db.load")]
    pub load: LoadConfig,
    pub transform: TransformSpec,
    #[serde(rename = "dest.db.cleanup")]
    pub cleanup: CleanupSpec,
    #[serde(rename = "dest.db.save")]
    pub save: SaveSpec,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoadConfig {
    /// Collection name, or a list of names for the multi strategies
    #[serde(default)]
    pub src: Option<Value>,
    #[serde(rename = "src.cols", default)]
    pub cols: Vec<String>,
    #[serde(rename = "src.docs", default)]
    pub docs: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TransformSpec {
    pub func: String,
    #[serde(default)]
    pub params: Params,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CleanupSpec {
    pub target: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SaveSpec {
    pub dest: String,
}

/// How a transformation reads its input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStrategy {
    /// One document
    Doc,
    /// Every document of one collection
    Col,
    /// `{name: list}` for several collections
    MultiCol,
    /// `{name: document}` for several collections
    MultiDoc,
    /// `src.cols` as lists plus `src.docs` as documents
    MultiColDoc,
}

impl FromStr for LoadStrategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match crate::registry_name(s) {
            "Doc2XTransformation" | "doc" => Ok(LoadStrategy::Doc),
            "Col2XTransformation" | "col" => Ok(LoadStrategy::Col),
            "MultiCol2XTransformation" | "multi_col" => Ok(LoadStrategy::MultiCol),
            "MultiDoc2XTransformation" | "multi_doc" => Ok(LoadStrategy::MultiDoc),
            "MultiColDoc2XTransformation" | "multi_col_doc" => Ok(LoadStrategy::MultiColDoc),
            _ => Err(Error::config(format!("Unknown transformation class '{}'", s))),
        }
    }
}

impl LoadStrategy {
    /// Fetch the transformation input from the source database
    pub fn load(&self, source: &Accessor, cfg: &LoadConfig) -> Result<Value> {
        match self {
            LoadStrategy::Doc => source.get(single_source(cfg)?, None, Cardinality::Single),
            LoadStrategy::Col => source.get(single_source(cfg)?, None, Cardinality::Multi),
            LoadStrategy::MultiCol => {
                let mut loaded = Record::new();
                load_named(source, &source_list(cfg)?, Cardinality::Multi, &mut loaded)?;
                Ok(Value::Object(loaded))
            }
            LoadStrategy::MultiDoc => {
                let mut loaded = Record::new();
                load_named(source, &source_list(cfg)?, Cardinality::Single, &mut loaded)?;
                Ok(Value::Object(loaded))
            }
            LoadStrategy::MultiColDoc => {
                let mut loaded = Record::new();
                load_named(source, &cfg.cols, Cardinality::Multi, &mut loaded)?;
                load_named(source, &cfg.docs, Cardinality::Single, &mut loaded)?;
                Ok(Value::Object(loaded))
            }
        }
    }
}

fn single_source(cfg: &LoadConfig) -> Result<&str> {
    match &cfg.src {
        Some(Value::String(name)) => Ok(name),
        Some(other) => Err(Error::config(format!(
            "'src' must name one collection, got {}",
            value_type_name(other)
        ))),
        None => Err(Error::config("Missing 'src' in 'src.db.load'")),
    }
}

fn source_list(cfg: &LoadConfig) -> Result<Vec<String>> {
    match &cfg.src {
        Some(Value::Array(names)) => names
            .iter()
            .map(|name| {
                name.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| Error::config(format!("Collection name must be a string, got {}", name)))
            })
            .collect(),
        Some(Value::String(name)) => Ok(vec![name.clone()]),
        Some(other) => Err(Error::config(format!(
            "'src' must list collections, got {}",
            value_type_name(other)
        ))),
        None => Err(Error::config("Missing 'src' in 'src.db.load'")),
    }
}

fn load_named(
    source: &Accessor,
    names: &[String],
    cardinality: Cardinality,
    loaded: &mut Record,
) -> Result<()> {
    for name in names {
        loaded.insert(name.clone(), source.get(name, None, cardinality)?);
    }
    Ok(())
}

/// One configured transformation bound to its databases
pub struct Transformation<'a> {
    name: &'a str,
    strategy: LoadStrategy,
    func: TransformFn,
    config: &'a StageConfig,
    source: Accessor,
    dest: Accessor,
}

impl<'a> Transformation<'a> {
    /// Resolve the strategy and transform function up front
    pub fn new(
        name: &'a str,
        config: &'a TransformationConfig,
        source: Accessor,
        dest: Accessor,
    ) -> Result<Self> {
        Ok(Self {
            name,
            strategy: config.class.parse()?,
            func: lookup(&config.cfg.transform.func)?,
            config: &config.cfg,
            source,
            dest,
        })
    }

    /// Run load, transform, cleanup and save
    pub fn perform(&self) -> Result<Value> {
        let input = self.strategy.load(&self.source, &self.config.load)?;
        debug!(transformation = self.name, strategy = ?self.strategy, "Input loaded");

        let result = (self.func)(input, &self.config.transform.params)?;
        debug!(transformation = self.name, func = %self.config.transform.func, "Transform applied");

        let target = &self.config.cleanup.target;
        let removed = self.dest.delete(target, &Filter::new(), Cardinality::Multi, false)?;
        debug!(transformation = self.name, collection = %target, removed, "Destination cleaned");

        self.save(&result)?;
        Ok(result)
    }

    fn save(&self, result: &Value) -> Result<()> {
        let dest = &self.config.save.dest;
        let cardinality = match result {
            Value::Object(_) => Cardinality::Single,
            Value::Array(items) if items.is_empty() => return Ok(()),
            Value::Array(_) => Cardinality::Multi,
            Value::Null => return Ok(()),
            other => {
                return Err(Error::unsupported(format!(
                    "Transformation '{}' produced {}, expected a document or a list",
                    self.name,
                    value_type_name(other)
                )))
            }
        };
        self.dest.upsert(dest, &Filter::new(), result, cardinality, false)?;
        info!(transformation = self.name, collection = %dest, ?cardinality, "Result saved");
        Ok(())
    }
}

/// Runs every transformation set in configuration order
pub struct Transformer<'a> {
    config: TransformerConfig,
    databases: &'a Databases,
}

impl<'a> Transformer<'a> {
    pub fn new(config: TransformerConfig, databases: &'a Databases) -> Self {
        Self { config, databases }
    }

    /// The first failing transformation stops the run; earlier writes stay
    pub fn perform(&self) -> Result<usize> {
        let mut performed = 0;
        for (set_name, set) in &self.config.sets {
            info!(set = %set_name, src = %set.db.src, dest = %set.db.dest, "Processing transformation set");
            for (name, config) in &set.transformations {
                info!(set = %set_name, transformation = %name, class = %config.class, "Processing transformation");
                let transformation = Transformation::new(
                    name,
                    config,
                    self.databases.accessor(&set.db.src)?,
                    self.databases.accessor(&set.db.dest)?,
                )?;
                transformation.perform()?;
                performed += 1;
            }
        }
        Ok(performed)
    }
}
