//! Integra Core - declarative data integration engine
//!
//! This crate pulls records out of remote JSON APIs, reshapes them through
//! configurable transformation pipelines and checks them against declarative
//! validation rules. Everything is driven by JSON configuration files.
//!
//! # Main Components
//!
//! - **Type Converter**: cast loose payload values into canonical field types
//! - **Field Mapper**: interpret field descriptors to extract records from payloads
//! - **Request Orchestrator**: paginated imports and one-shot exports over HTTP
//! - **Transformation Pipeline**: load, transform, cleanup and save stages
//! - **Validation Engine**: getters, comparators and violation templates
//! - **Persistence**: document collections behind a narrow backend trait
//!
//! # Example
//!
//! ```no_run
//! use integra_core::store::{Databases, MemoryBackend};
//! use integra_core::transformation::{Transformer, TransformerConfig};
//! use std::sync::Arc;
//!
//! fn example(config: TransformerConfig) -> integra_core::Result<()> {
//!     let databases = Databases::new().with("work", Arc::new(MemoryBackend::new()));
//!     Transformer::new(config, &databases).perform()?;
//!     Ok(())
//! }
//! ```

pub mod aggregator;
pub mod config;
pub mod converter;
pub mod error;
pub mod generator;
pub mod http;
pub mod integration;
pub mod mapper;
pub mod params;
pub mod store;
pub mod transformation;
pub mod types;
pub mod validation;

// Re-export main types for convenience
pub use config::Environment;
pub use converter::convert;
pub use error::{Error, Result, Severity};
pub use generator::{Context, Generator, GeneratorConfig, RunReport, StepKind};
pub use http::{Credentials, HttpClientConfig, HttpTransport, Transport};
pub use mapper::FieldDescriptor;
pub use params::Params;
pub use store::{Accessor, Backend, Databases, JsonFileBackend, MemoryBackend};
pub use transformation::{Transformer, TransformerConfig};
pub use types::{Cardinality, FieldType, Record, Violation};
pub use validation::{Validator, ValidatorConfig};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Registry key of a configured name: `pkg.module.func` resolves as `func`
pub(crate) fn registry_name(name: &str) -> &str {
    name.rsplit_once('.').map_or(name, |(_, short)| short)
}
