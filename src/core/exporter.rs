//! Exporting stored categories as category blocks.

use std::collections::HashSet;

use tracing::{debug, info};

use super::context::ContextResolver;
use super::{CodecConfig, CodecError};
use crate::codec::writer::{begin_document, end_document, into_string, new_writer, write_category_block};
use crate::domain::{CategoryId, CategoryNode, CategoryPath, CategoryRecord};
use crate::store::CategoryStore;

/// One export run.
///
/// Remembers which categories were already written so that ancestors
/// shared by several exported categories appear only once.
pub struct ExportSession<'a> {
    config: &'a CodecConfig,
    contexts: &'a dyn ContextResolver,
    emitted: HashSet<CategoryId>,
}

impl<'a> ExportSession<'a> {
    pub fn new(config: &'a CodecConfig, contexts: &'a dyn ContextResolver) -> Self {
        Self {
            config,
            contexts,
            emitted: HashSet::new(),
        }
    }

    /// Ids written so far in this session
    pub fn emitted(&self) -> &HashSet<CategoryId> {
        &self.emitted
    }

    /// Blocks for a category and its ancestors not yet written, as a
    /// fragment without document root
    pub fn export_category(
        &mut self,
        store: &dyn CategoryStore,
        id: CategoryId,
    ) -> Result<String, CodecError> {
        let nodes = self.take_path(store, id)?;
        let mut writer = new_writer();
        for node in &nodes {
            write_category_block(&mut writer, node, self.config.context_to_file)?;
        }
        Ok(into_string(writer))
    }

    /// A complete document holding the categories and their ancestors
    pub fn export_document(
        &mut self,
        store: &dyn CategoryStore,
        ids: &[CategoryId],
    ) -> Result<String, CodecError> {
        let mut writer = new_writer();
        begin_document(&mut writer)?;

        let mut blocks = 0;
        for &id in ids {
            for node in self.take_path(store, id)? {
                write_category_block(&mut writer, &node, self.config.context_to_file)?;
                blocks += 1;
            }
        }

        end_document(&mut writer)?;
        info!(requested = ids.len(), blocks, "Exported categories");
        Ok(into_string(writer))
    }

    /// Nodes still to be written for a category, root first.
    ///
    /// Ids are only marked as written once the whole chain was read, so a
    /// failed lookup leaves the session unchanged.
    fn take_path(
        &mut self,
        store: &dyn CategoryStore,
        id: CategoryId,
    ) -> Result<Vec<CategoryNode>, CodecError> {
        if !self.config.categories_to_file {
            return Ok(Vec::new());
        }

        let chain = store.path_to_root(id)?;
        let scope = chain
            .first()
            .and_then(|root| self.contexts.scope_of(root.context_id));

        let mut nodes = Vec::new();
        let mut fresh = Vec::new();
        for (i, record) in chain.iter().enumerate() {
            if self.emitted.contains(&record.id) {
                debug!(id = record.id, "Category already exported");
                continue;
            }
            let names = chain[..=i].iter().map(|r| r.name.clone());
            let path = CategoryPath::new(scope, names)?;
            // Refuse before anything is marked as written
            path.encode(self.config.context_to_file)?;
            nodes.push(node_for(record, path));
            fresh.push(record.id);
        }

        self.emitted.extend(fresh);
        Ok(nodes)
    }
}

fn node_for(record: &CategoryRecord, path: CategoryPath) -> CategoryNode {
    CategoryNode::new(path).with_description(record.info.clone(), record.info_format)
}

/// Look up a stored category by path, using the scope's context
pub fn resolve_path(
    store: &dyn CategoryStore,
    contexts: &dyn ContextResolver,
    config: &CodecConfig,
    path: &CategoryPath,
) -> Result<CategoryRecord, CodecError> {
    let context_id = super::context::resolve_context(contexts, config, path.scope())?;
    store
        .find_path(context_id, path.names())?
        .ok_or_else(|| CodecError::PathNotFound(path.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ContextMap;
    use crate::domain::{NewCategory, PathError, TextFormat};
    use crate::store::{SqliteStore, StoreError};

    fn add(store: &mut SqliteStore, name: &str, parent: Option<CategoryId>, format: TextFormat) -> CategoryId {
        store
            .insert(NewCategory {
                name: name.to_string(),
                info: format!("This is {} category for test", name),
                info_format: format,
                parent,
                context_id: 2,
                sort_order: NewCategory::DEFAULT_SORT_ORDER,
                stamp: format!("test+{}", name),
            })
            .unwrap()
            .id
    }

    #[test]
    fn test_export_category_with_ancestors() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let delta = add(&mut store, "Delta", None, TextFormat::Wiki);
        let epsilon = add(&mut store, "Epsilon", Some(delta), TextFormat::Markdown);
        let zeta = add(&mut store, "Zeta", Some(epsilon), TextFormat::Moodle);

        let config = CodecConfig::default();
        let contexts = ContextMap::default();
        let mut session = ExportSession::new(&config, &contexts);
        let xml = session.export_category(&store, zeta).unwrap();

        let delta_at = xml.find("<text>$course$/Delta</text>").unwrap();
        let epsilon_at = xml.find("<text>$course$/Delta/Epsilon</text>").unwrap();
        let zeta_at = xml.find("<text>$course$/Delta/Epsilon/Zeta</text>").unwrap();
        assert!(delta_at < epsilon_at && epsilon_at < zeta_at);
        assert!(xml.contains(r#"<info format="wiki_like">"#));
        assert!(xml.contains(r#"<info format="markdown">"#));
        assert!(xml.contains(r#"<info format="moodle_auto_format">"#));
        assert!(!xml.contains("<quiz>"));
    }

    #[test]
    fn test_shared_ancestor_written_once() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let mu = add(&mut store, "Mu", None, TextFormat::Html);
        let nu = add(&mut store, "Nu", Some(mu), TextFormat::Plain);
        let xi = add(&mut store, "Xi", Some(mu), TextFormat::Wiki);

        let config = CodecConfig::default();
        let contexts = ContextMap::default();
        let mut session = ExportSession::new(&config, &contexts);
        let first = session.export_category(&store, nu).unwrap();
        let second = session.export_category(&store, xi).unwrap();

        assert!(first.contains("<text>$course$/Mu</text>"));
        assert!(!second.contains("<text>$course$/Mu</text>"));
        assert!(second.contains("<text>$course$/Mu/Xi</text>"));
        assert_eq!(session.emitted().len(), 3);

        let again = session.export_category(&store, xi).unwrap();
        assert!(again.trim().is_empty());
    }

    #[test]
    fn test_export_document_shape() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let alpha = add(&mut store, "Alpha", None, TextFormat::Moodle);

        let config = CodecConfig::default();
        let contexts = ContextMap::default();
        let xml = ExportSession::new(&config, &contexts)
            .export_document(&store, &[alpha])
            .unwrap();

        assert!(xml.starts_with(r#"<?xml version="1.0" encoding="UTF-8"?>"#));
        assert!(xml.contains("<!-- question: 0  -->"));
        assert!(xml.contains(r#"<question type="category">"#));
        assert!(xml.trim_end().ends_with("</quiz>"));
    }

    #[test]
    fn test_export_without_scope_prefix() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let beta = add(&mut store, "Beta", None, TextFormat::Html);

        let config = CodecConfig {
            context_to_file: false,
            ..CodecConfig::default()
        };
        let contexts = ContextMap::default();
        let xml = ExportSession::new(&config, &contexts)
            .export_category(&store, beta)
            .unwrap();

        assert!(xml.contains("<text>Beta</text>"));
        assert!(!xml.contains("$course$"));
    }

    #[test]
    fn test_categories_to_file_off() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let beta = add(&mut store, "Beta", None, TextFormat::Html);

        let config = CodecConfig {
            categories_to_file: false,
            ..CodecConfig::default()
        };
        let contexts = ContextMap::default();
        let mut session = ExportSession::new(&config, &contexts);
        let xml = session.export_document(&store, &[beta]).unwrap();

        assert!(!xml.contains("<question"));
        assert!(session.emitted().is_empty());
    }

    #[test]
    fn test_scope_shaped_root_refused_without_prefix() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let odd = add(&mut store, "$x$", None, TextFormat::Html);

        let config = CodecConfig {
            context_to_file: false,
            ..CodecConfig::default()
        };
        let contexts = ContextMap::default();
        let mut session = ExportSession::new(&config, &contexts);

        let err = session.export_category(&store, odd).unwrap_err();
        assert!(matches!(err, CodecError::InvalidPath(PathError::Unencodable(_))));
        assert!(session.emitted().is_empty());

        let scoped = CodecConfig::default();
        let xml = ExportSession::new(&scoped, &contexts)
            .export_category(&store, odd)
            .unwrap();
        assert!(xml.contains("<text>$course$/$x$</text>"));
    }

    #[test]
    fn test_unknown_id_leaves_session_unchanged() {
        let store = SqliteStore::open_in_memory().unwrap();
        let config = CodecConfig::default();
        let contexts = ContextMap::default();
        let mut session = ExportSession::new(&config, &contexts);

        let err = session.export_category(&store, 42).unwrap_err();

        assert!(matches!(err, CodecError::Store(StoreError::CategoryNotFound(42))));
        assert!(session.emitted().is_empty());
    }

    #[test]
    fn test_resolve_path() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let iota = add(&mut store, "Iota", None, TextFormat::Plain);
        let kappa = add(&mut store, "Kappa", Some(iota), TextFormat::Markdown);

        let config = CodecConfig::default();
        let contexts = ContextMap::default();
        let path = CategoryPath::parse("$course$/Iota/Kappa").unwrap();
        assert_eq!(resolve_path(&store, &contexts, &config, &path).unwrap().id, kappa);

        let missing = CategoryPath::parse("$course$/Iota/Lambda").unwrap();
        assert!(matches!(
            resolve_path(&store, &contexts, &config, &missing),
            Err(CodecError::PathNotFound(_))
        ));
    }
}
