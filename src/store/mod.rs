//! Persistence for question categories.
//!
//! The codec only talks to storage through [`CategoryStore`], so any
//! backend that can look records up by id and by (context, parent, name)
//! will do. [`SqliteStore`] is the bundled implementation.

pub mod sqlite;
pub mod stamp;

use std::collections::HashSet;

use thiserror::Error;

use crate::domain::{CategoryId, CategoryRecord, NewCategory};

pub use sqlite::SqliteStore;
pub use stamp::{HostStamp, StampGenerator};

/// Errors raised by a category store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Category not found: {0}")]
    CategoryNotFound(CategoryId),

    #[error("Parent chain of category {0} contains a cycle")]
    CycleDetected(CategoryId),

    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Record store keyed by id and by name within a parent
pub trait CategoryStore {
    /// Fetch a category by id
    fn get(&self, id: CategoryId) -> Result<CategoryRecord, StoreError>;

    /// Find a category by name under a parent (None = root) in a context
    fn find_child(
        &self,
        context_id: i64,
        parent: Option<CategoryId>,
        name: &str,
    ) -> Result<Option<CategoryRecord>, StoreError>;

    /// All categories with the given name, in any context
    fn find_by_name(&self, name: &str) -> Result<Vec<CategoryRecord>, StoreError>;

    /// Direct children of a category, ordered by sort order then id
    fn children(&self, parent: CategoryId) -> Result<Vec<CategoryRecord>, StoreError>;

    /// Every category in a context, ordered by id
    fn list_context(&self, context_id: i64) -> Result<Vec<CategoryRecord>, StoreError>;

    /// Insert a new category and return the stored record
    fn insert(&mut self, category: NewCategory) -> Result<CategoryRecord, StoreError>;

    /// Start a unit of work. Stores without transactions may ignore this.
    fn begin(&mut self) -> Result<(), StoreError> {
        Ok(())
    }

    /// Make the current unit of work permanent
    fn commit(&mut self) -> Result<(), StoreError> {
        Ok(())
    }

    /// Discard the current unit of work
    fn rollback(&mut self) -> Result<(), StoreError> {
        Ok(())
    }

    /// Follow a root-first list of names from the root of a context
    fn find_path(
        &self,
        context_id: i64,
        names: &[String],
    ) -> Result<Option<CategoryRecord>, StoreError> {
        let mut parent: Option<CategoryRecord> = None;
        for name in names {
            match self.find_child(context_id, parent.as_ref().map(|p| p.id), name)? {
                Some(record) => parent = Some(record),
                None => return Ok(None),
            }
        }
        Ok(parent)
    }

    /// The category and all its ancestors, root first
    fn path_to_root(&self, id: CategoryId) -> Result<Vec<CategoryRecord>, StoreError> {
        let mut chain = Vec::new();
        let mut seen = HashSet::new();
        let mut next = Some(id);

        while let Some(current) = next {
            if !seen.insert(current) {
                return Err(StoreError::CycleDetected(id));
            }
            let record = self.get(current)?;
            next = record.parent;
            chain.push(record);
        }

        chain.reverse();
        Ok(chain)
    }
}
