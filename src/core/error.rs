//! Errors raised by the category codec.

use quick_xml::events::attributes::AttrError;
use thiserror::Error;

use crate::domain::{ContextScope, PathError};
use crate::store::StoreError;

/// Errors that can occur while importing or exporting categories
#[derive(Debug, Error)]
pub enum CodecError {
    /// A block (or the whole document, block 0) is missing required fields
    #[error("Malformed category block {block}: {reason}")]
    MalformedDocument { block: usize, reason: String },

    #[error("Category '{name}' refers to parent '{parent}' which was not found")]
    UnresolvedParent { name: String, parent: String },

    #[error("No storage context configured for scope {0}")]
    UnknownContext(ContextScope),

    #[error("Invalid category path: {0}")]
    InvalidPath(#[from] PathError),

    #[error("Category path not found: {0}")]
    PathNotFound(String),

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("XML attribute error: {0}")]
    XmlAttribute(#[from] AttrError),

    #[error(transparent)]
    Store(#[from] StoreError),
}
