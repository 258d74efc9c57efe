//! Core codec logic.
//!
//! This module contains:
//! - Importer: documents into stored categories
//! - Exporter: stored categories into documents
//! - Context: scope → storage context resolution
//! - Options: the immutable codec configuration

pub mod context;
pub mod error;
pub mod exporter;
pub mod importer;
pub mod options;

// Re-export commonly used types
pub use context::{resolve_context, ContextMap, ContextResolver};
pub use error::CodecError;
pub use exporter::{resolve_path, ExportSession};
pub use importer::{ImportOutcome, ImportReport, ImportedCategory, Importer, SkippedCategory};
pub use options::{CodecConfig, MissingParentPolicy};
