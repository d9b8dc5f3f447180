//! Bulk import and export against remote APIs
//!
//! [`Importer`] pulls records through import requests into a database;
//! [`Exporter`] pushes every record of a collection through an export
//! request template.

pub mod exporter;
pub mod importer;
pub mod request;

pub use exporter::{ExportConfig, ExportStep, Exporter};
pub use importer::{ImportConfig, ImportStep, Importer};
pub use request::{
    export, import, ExportKind, ImportKind, PageCursor, RequestSpec, RequestState, RequestTemplate,
};
