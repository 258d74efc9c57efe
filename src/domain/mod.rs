//! Domain types for the category codec.
//!
//! This module contains the core data structures:
//! - Category: document-side nodes and persisted records
//! - Path: scoped name-paths addressing a category
//! - Format: description text formats

pub mod category;
pub mod format;
pub mod path;

// Re-export commonly used types
pub use category::{CategoryId, CategoryNode, CategoryRecord, CategoryTree, NewCategory};
pub use format::TextFormat;
pub use path::{CategoryPath, ContextScope, PathError};
