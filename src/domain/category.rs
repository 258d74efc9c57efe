//! Category descriptors exchanged between documents and the store.

use serde::{Deserialize, Serialize};

use super::format::TextFormat;
use super::path::CategoryPath;

/// Storage identifier of a persisted category
pub type CategoryId = i64;

/// One category as read from (or written to) a document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryNode {
    /// Full name-path, root first
    pub path: CategoryPath,

    /// Description text (may be empty)
    pub description: String,

    /// Format of the description
    pub description_format: TextFormat,
}

impl CategoryNode {
    /// Create a node with an empty description in the legacy format
    pub fn new(path: CategoryPath) -> Self {
        Self {
            path,
            description: String::new(),
            description_format: TextFormat::LEGACY_DEFAULT,
        }
    }

    /// Set the description
    pub fn with_description(mut self, description: impl Into<String>, format: TextFormat) -> Self {
        self.description = description.into();
        self.description_format = format;
        self
    }

    /// Category name (last path segment)
    pub fn name(&self) -> &str {
        self.path.name()
    }

    /// Parent category name, None for a root category
    pub fn parent_name(&self) -> Option<&str> {
        self.path.parent_name()
    }
}

/// Nodes of one document, in document order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryTree {
    nodes: Vec<CategoryNode>,
}

impl CategoryTree {
    /// Append a node
    pub fn push(&mut self, node: CategoryNode) {
        self.nodes.push(node);
    }

    /// Nodes in document order
    pub fn nodes(&self) -> &[CategoryNode] {
        &self.nodes
    }

    /// Find the node with the given path (first occurrence)
    pub fn get(&self, path: &CategoryPath) -> Option<&CategoryNode> {
        self.nodes.iter().find(|n| &n.path == path)
    }

    /// Get the number of nodes
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if the tree is empty
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl FromIterator<CategoryNode> for CategoryTree {
    fn from_iter<I: IntoIterator<Item = CategoryNode>>(iter: I) -> Self {
        Self {
            nodes: iter.into_iter().collect(),
        }
    }
}

/// A persisted category record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRecord {
    pub id: CategoryId,
    pub name: String,
    pub info: String,
    pub info_format: TextFormat,
    /// None for a root category
    pub parent: Option<CategoryId>,
    pub context_id: i64,
    pub sort_order: i64,
    pub stamp: String,
}

/// Fields needed to insert a new category
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCategory {
    pub name: String,
    pub info: String,
    pub info_format: TextFormat,
    pub parent: Option<CategoryId>,
    pub context_id: i64,
    pub sort_order: i64,
    pub stamp: String,
}

impl NewCategory {
    /// Default sort order for newly created categories
    pub const DEFAULT_SORT_ORDER: i64 = 999;
}
