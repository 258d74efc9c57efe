//! Mapping between path scopes and storage contexts.

use std::collections::HashMap;

use tracing::warn;

use super::{CodecConfig, CodecError};
use crate::domain::ContextScope;

/// Resolves the storage partition a scope refers to
pub trait ContextResolver {
    /// Storage context id for a scope, if one is available
    fn context_id(&self, scope: ContextScope) -> Option<i64>;

    /// Scope a storage context belongs to, if known
    fn scope_of(&self, context_id: i64) -> Option<ContextScope>;
}

/// Fixed scope → context id table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextMap {
    contexts: HashMap<ContextScope, i64>,
}

impl Default for ContextMap {
    /// System context 1 and the site course context 2
    fn default() -> Self {
        Self::new([(ContextScope::System, 1), (ContextScope::Course, 2)])
    }
}

impl ContextMap {
    pub fn new(entries: impl IntoIterator<Item = (ContextScope, i64)>) -> Self {
        Self {
            contexts: entries.into_iter().collect(),
        }
    }

    /// Add or replace a mapping
    pub fn with(mut self, scope: ContextScope, context_id: i64) -> Self {
        self.contexts.insert(scope, context_id);
        self
    }

    /// Mappings sorted by context id, then scope
    pub fn entries(&self) -> Vec<(ContextScope, i64)> {
        let mut entries: Vec<_> = self.contexts.iter().map(|(s, id)| (*s, *id)).collect();
        entries.sort_by_key(|(scope, id)| (*id, *scope));
        entries
    }
}

impl ContextResolver for ContextMap {
    fn context_id(&self, scope: ContextScope) -> Option<i64> {
        self.contexts.get(&scope).copied()
    }

    fn scope_of(&self, context_id: i64) -> Option<ContextScope> {
        // The widest scope wins if two scopes share an id
        self.entries()
            .into_iter()
            .find(|(_, id)| *id == context_id)
            .map(|(scope, _)| scope)
    }
}

/// Storage context for a path scope.
///
/// Unscoped paths use the configured default scope. A scope the resolver
/// cannot map falls back to the default context with a warning.
pub fn resolve_context(
    contexts: &dyn ContextResolver,
    config: &CodecConfig,
    scope: Option<ContextScope>,
) -> Result<i64, CodecError> {
    let default_id = contexts
        .context_id(config.default_scope)
        .ok_or(CodecError::UnknownContext(config.default_scope))?;

    match scope {
        None => Ok(default_id),
        Some(scope) => match contexts.context_id(scope) {
            Some(id) => Ok(id),
            None => {
                warn!(%scope, default_id, "No context for scope, using default context");
                Ok(default_id)
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_map() {
        let map = ContextMap::default();
        assert_eq!(map.context_id(ContextScope::Course), Some(2));
        assert_eq!(map.context_id(ContextScope::Module), None);
        assert_eq!(map.scope_of(1), Some(ContextScope::System));
        assert_eq!(map.scope_of(99), None);
    }

    #[test]
    fn test_resolve_context_fallbacks() {
        let map = ContextMap::default();
        let config = CodecConfig::default();

        assert_eq!(resolve_context(&map, &config, None).unwrap(), 2);
        assert_eq!(
            resolve_context(&map, &config, Some(ContextScope::System)).unwrap(),
            1
        );
        assert_eq!(
            resolve_context(&map, &config, Some(ContextScope::Module)).unwrap(),
            2
        );
    }

    #[test]
    fn test_resolve_context_without_default() {
        let map = ContextMap::new([(ContextScope::System, 1)]);
        let config = CodecConfig::default();

        assert!(matches!(
            resolve_context(&map, &config, None),
            Err(CodecError::UnknownContext(ContextScope::Course))
        ));
    }

    #[test]
    fn test_override() {
        let map = ContextMap::default().with(ContextScope::Module, 40);
        assert_eq!(map.context_id(ContextScope::Module), Some(40));
        assert_eq!(map.scope_of(40), Some(ContextScope::Module));
    }
}
