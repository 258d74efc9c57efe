//! qcat - Question-bank category tree codec
//!
//! Imports the category blocks of question-bank XML documents into a
//! category database and exports stored categories back into the same
//! document shape.
//!
//! # Architecture
//!
//! - Category blocks may appear in any order; parents are resolved by
//!   their full name-path and created before their children
//! - Existing categories with the same name, parent and context are reused
//! - An export session writes every ancestor at most once
//!
//! # Modules
//!
//! - `codec`: XML reading and writing of category blocks
//! - `core`: Importer, exporter, options and context resolution
//! - `domain`: Data structures (CategoryPath, CategoryNode, CategoryRecord)
//! - `store`: Category persistence (SQLite)
//! - `config`: Config file and environment resolution
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Import a question bank
//! qcat import bank.xml
//!
//! # Export a category with its ancestors
//! qcat export '$course$/Beta/Gamma' -o gamma.xml
//!
//! # Show the stored tree
//! qcat list
//! ```

pub mod cli;
pub mod codec;
pub mod config;
pub mod core;
pub mod domain;
pub mod store;

// Re-export main types at crate root for convenience
pub use core::{CodecConfig, CodecError, ContextMap, ExportSession, ImportReport, Importer, MissingParentPolicy};
pub use domain::{CategoryNode, CategoryPath, CategoryRecord, ContextScope, TextFormat};
pub use store::{CategoryStore, SqliteStore, StoreError};
