//! Importing category blocks into a store.
//!
//! Blocks may appear in any order. All nodes are collected first and then
//! created parent-before-child by following each node's parent path, so a
//! child listed ahead of its parent still lands under it.

use std::collections::HashMap;

use serde::Serialize;
use tracing::{debug, info, warn};

use super::context::{resolve_context, ContextResolver};
use super::{CodecConfig, CodecError, MissingParentPolicy};
use crate::codec::parse_document;
use crate::domain::{CategoryId, CategoryNode, CategoryRecord, CategoryTree, NewCategory, TextFormat};
use crate::store::{CategoryStore, StampGenerator};

/// Whether a category was created or already existed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportOutcome {
    Created,
    Reused,
}

/// A category placed by an import
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportedCategory {
    pub id: CategoryId,
    pub name: String,
    pub parent: Option<CategoryId>,
    pub context_id: i64,
    pub outcome: ImportOutcome,
}

/// A category block that was left out
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedCategory {
    /// Position of the block, when the block itself was unreadable
    pub block: Option<usize>,
    /// Category path, when the block was readable
    pub path: Option<String>,
    pub reason: String,
}

/// Summary of one import
#[derive(Debug, Clone, Default, Serialize)]
pub struct ImportReport {
    /// Every category created or reused, in creation order
    pub categories: Vec<ImportedCategory>,

    /// Blocks that were not imported
    pub skipped: Vec<SkippedCategory>,

    /// Categories placed at the top level because their parent was missing
    pub top_level_fallbacks: usize,

    /// Non-category question blocks seen
    pub ignored_questions: usize,

    /// Category blocks ignored because `categories_from_file` is off
    pub ignored_categories: usize,
}

impl ImportReport {
    /// Number of categories created
    pub fn created(&self) -> usize {
        self.count(ImportOutcome::Created)
    }

    /// Number of existing categories reused
    pub fn reused(&self) -> usize {
        self.count(ImportOutcome::Reused)
    }

    /// True when no block was skipped
    pub fn is_clean(&self) -> bool {
        self.skipped.is_empty()
    }

    /// Find the placed category with the given name
    pub fn find(&self, name: &str) -> Option<&ImportedCategory> {
        self.categories.iter().find(|c| c.name == name)
    }

    fn count(&self, outcome: ImportOutcome) -> usize {
        self.categories.iter().filter(|c| c.outcome == outcome).count()
    }

    fn record(&mut self, record: &CategoryRecord, outcome: ImportOutcome) {
        self.categories.push(ImportedCategory {
            id: record.id,
            name: record.name.clone(),
            parent: record.parent,
            context_id: record.context_id,
            outcome,
        });
    }

    fn skip(&mut self, node: &CategoryNode, reason: String) {
        warn!(path = %node.path, "Skipping category: {}", reason);
        self.skipped.push(SkippedCategory {
            block: None,
            path: Some(node.path.to_string()),
            reason,
        });
    }
}

/// A node's identity within one import: its context plus name-path
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct BatchKey {
    context_id: i64,
    names: Vec<String>,
}

impl BatchKey {
    fn parent(&self) -> Option<BatchKey> {
        if self.names.len() < 2 {
            return None;
        }
        Some(BatchKey {
            context_id: self.context_id,
            names: self.names[..self.names.len() - 1].to_vec(),
        })
    }
}

/// Where a node's parent ended up
enum ParentSlot {
    Root,
    Under(CategoryId),
    Skip,
}

struct ImportState<'t> {
    batch: HashMap<BatchKey, &'t CategoryNode>,
    placed: HashMap<BatchKey, Option<CategoryId>>,
    report: ImportReport,
}

/// Imports category documents into a store
pub struct Importer<'a> {
    config: &'a CodecConfig,
    contexts: &'a dyn ContextResolver,
    stamps: &'a dyn StampGenerator,
}

impl<'a> Importer<'a> {
    pub fn new(
        config: &'a CodecConfig,
        contexts: &'a dyn ContextResolver,
        stamps: &'a dyn StampGenerator,
    ) -> Self {
        Self {
            config,
            contexts,
            stamps,
        }
    }

    /// Import every category block of a document.
    ///
    /// With `stop_on_error` the first malformed block or unresolved parent
    /// fails the import and nothing is stored. Otherwise such blocks are
    /// recorded in the report and the rest is imported.
    pub fn import(
        &self,
        store: &mut dyn CategoryStore,
        document: &str,
    ) -> Result<ImportReport, CodecError> {
        let parsed = parse_document(document)?;

        let mut report = ImportReport {
            ignored_questions: parsed.other_questions,
            ..Default::default()
        };

        if !self.config.categories_from_file {
            info!(
                blocks = parsed.tree.len(),
                "Ignoring category blocks, categories_from_file is off"
            );
            report.ignored_categories = parsed.tree.len() + parsed.issues.len();
            return Ok(report);
        }

        for issue in parsed.issues {
            if self.config.stop_on_error {
                return Err(issue.into_error());
            }
            report.skipped.push(SkippedCategory {
                block: Some(issue.block),
                path: None,
                reason: issue.reason,
            });
        }

        store.begin()?;
        match self.import_tree(store, &parsed.tree, report) {
            Ok(report) => {
                store.commit()?;
                info!(
                    created = report.created(),
                    reused = report.reused(),
                    skipped = report.skipped.len(),
                    "Imported categories"
                );
                Ok(report)
            }
            Err(e) => {
                if let Err(rollback_err) = store.rollback() {
                    warn!("Rollback after failed import also failed: {}", rollback_err);
                }
                Err(e)
            }
        }
    }

    /// Create (or reuse) every node of a tree
    fn import_tree(
        &self,
        store: &mut dyn CategoryStore,
        tree: &CategoryTree,
        report: ImportReport,
    ) -> Result<ImportReport, CodecError> {
        let mut keyed = Vec::with_capacity(tree.len());
        for node in tree.nodes() {
            let scope = if self.config.context_from_file {
                node.path.scope()
            } else {
                None
            };
            let key = BatchKey {
                context_id: resolve_context(self.contexts, self.config, scope)?,
                names: node.path.names().to_vec(),
            };
            keyed.push((key, node));
        }

        let mut state = ImportState {
            batch: HashMap::with_capacity(keyed.len()),
            placed: HashMap::new(),
            report,
        };
        for (key, node) in &keyed {
            if state.batch.contains_key(key) {
                debug!(path = %node.path, "Duplicate category block, first one wins");
            } else {
                state.batch.insert(key.clone(), *node);
            }
        }

        for (key, _) in &keyed {
            self.place(store, &mut state, key)?;
        }

        Ok(state.report)
    }

    /// Place one batch node, placing its batch ancestors first
    fn place(
        &self,
        store: &mut dyn CategoryStore,
        state: &mut ImportState<'_>,
        key: &BatchKey,
    ) -> Result<Option<CategoryId>, CodecError> {
        if let Some(done) = state.placed.get(key) {
            return Ok(*done);
        }
        let node = state.batch[key];

        let parent = match key.parent() {
            None => ParentSlot::Root,
            Some(parent_key) => self.resolve_parent(store, state, node, &parent_key)?,
        };

        let parent_id = match parent {
            ParentSlot::Root => None,
            ParentSlot::Under(id) => Some(id),
            ParentSlot::Skip => {
                state.placed.insert(key.clone(), None);
                return Ok(None);
            }
        };

        let record = self.find_or_create(
            store,
            &mut state.report,
            key.context_id,
            parent_id,
            node.name(),
            &node.description,
            node.description_format,
        )?;
        state.placed.insert(key.clone(), Some(record.id));
        Ok(Some(record.id))
    }

    fn resolve_parent(
        &self,
        store: &mut dyn CategoryStore,
        state: &mut ImportState<'_>,
        node: &CategoryNode,
        parent_key: &BatchKey,
    ) -> Result<ParentSlot, CodecError> {
        let parent_name = node.parent_name().unwrap_or_default();

        if state.batch.contains_key(parent_key) {
            return match self.place(store, state, parent_key)? {
                Some(id) => Ok(ParentSlot::Under(id)),
                None => {
                    state
                        .report
                        .skip(node, format!("parent '{}' was skipped", parent_name));
                    Ok(ParentSlot::Skip)
                }
            };
        }

        if let Some(existing) = store.find_path(parent_key.context_id, &parent_key.names)? {
            debug!(path = %node.path, parent = existing.id, "Parent found in storage");
            return Ok(ParentSlot::Under(existing.id));
        }

        if self.config.stop_on_error {
            return Err(CodecError::UnresolvedParent {
                name: node.name().to_string(),
                parent: parent_name.to_string(),
            });
        }

        match self.config.missing_parent {
            MissingParentPolicy::TopLevel => {
                warn!(
                    path = %node.path,
                    "Parent '{}' not found, placing category at top level",
                    parent_name
                );
                state.report.top_level_fallbacks += 1;
                Ok(ParentSlot::Root)
            }
            MissingParentPolicy::CreatePath => {
                let mut parent = None;
                for depth in 1..=parent_key.names.len() {
                    let prefix = BatchKey {
                        context_id: parent_key.context_id,
                        names: parent_key.names[..depth].to_vec(),
                    };
                    // Ancestors present in the document keep their description
                    if state.batch.contains_key(&prefix) {
                        match self.place(store, state, &prefix)? {
                            Some(id) => {
                                parent = Some(id);
                                continue;
                            }
                            None => {
                                state
                                    .report
                                    .skip(node, format!("ancestor '{}' was skipped", prefix.names[depth - 1]));
                                return Ok(ParentSlot::Skip);
                            }
                        }
                    }
                    let record = self.find_or_create(
                        store,
                        &mut state.report,
                        parent_key.context_id,
                        parent,
                        &prefix.names[depth - 1],
                        "",
                        TextFormat::LEGACY_DEFAULT,
                    )?;
                    parent = Some(record.id);
                }
                Ok(parent.map_or(ParentSlot::Root, ParentSlot::Under))
            }
            MissingParentPolicy::Skip => {
                state
                    .report
                    .skip(node, format!("parent '{}' not found", parent_name));
                Ok(ParentSlot::Skip)
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn find_or_create(
        &self,
        store: &mut dyn CategoryStore,
        report: &mut ImportReport,
        context_id: i64,
        parent: Option<CategoryId>,
        name: &str,
        info: &str,
        info_format: TextFormat,
    ) -> Result<CategoryRecord, CodecError> {
        if let Some(existing) = store.find_child(context_id, parent, name)? {
            debug!(id = existing.id, name, "Reusing existing category");
            report.record(&existing, ImportOutcome::Reused);
            return Ok(existing);
        }

        let record = store.insert(NewCategory {
            name: name.to_string(),
            info: info.to_string(),
            info_format,
            parent,
            context_id,
            sort_order: NewCategory::DEFAULT_SORT_ORDER,
            stamp: self.stamps.generate(),
        })?;
        debug!(id = record.id, name, "Created category");
        report.record(&record, ImportOutcome::Created);
        Ok(record)
    }
}
