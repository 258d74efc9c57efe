//! Import/export options.
//!
//! All switches that influence the codec live in one immutable
//! [`CodecConfig`] handed to the importer and exporter.

use serde::{Deserialize, Serialize};

use crate::domain::ContextScope;

/// What to do with a category whose parent is neither in the document nor
/// in storage (only consulted when `stop_on_error` is off)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingParentPolicy {
    /// Create the category at the root of its context
    #[default]
    TopLevel,

    /// Create the missing ancestors with empty descriptions
    CreatePath,

    /// Leave the category (and its descendants) out
    Skip,
}

/// Options for category import and export
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodecConfig {
    /// Abort the whole import on the first bad block (default: false)
    #[serde(default)]
    pub stop_on_error: bool,

    /// Create categories from category blocks (default: true)
    #[serde(default = "default_true")]
    pub categories_from_file: bool,

    /// Honor the `$scope$` prefix of imported paths (default: true)
    #[serde(default = "default_true")]
    pub context_from_file: bool,

    /// Emit category blocks on export (default: true)
    #[serde(default = "default_true")]
    pub categories_to_file: bool,

    /// Write the `$scope$` prefix on exported paths (default: true)
    #[serde(default = "default_true")]
    pub context_to_file: bool,

    /// Handling of unresolvable parents (default: top_level)
    #[serde(default)]
    pub missing_parent: MissingParentPolicy,

    /// Scope used for unprefixed paths (default: course)
    #[serde(default = "default_scope")]
    pub default_scope: ContextScope,
}

fn default_true() -> bool {
    true
}

fn default_scope() -> ContextScope {
    ContextScope::Course
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            stop_on_error: false,
            categories_from_file: default_true(),
            context_from_file: default_true(),
            categories_to_file: default_true(),
            context_to_file: default_true(),
            missing_parent: MissingParentPolicy::default(),
            default_scope: default_scope(),
        }
    }
}

impl CodecConfig {
    /// Same options with `stop_on_error` set
    pub fn stopping_on_error(mut self) -> Self {
        self.stop_on_error = true;
        self
    }

    /// Same options with a different missing-parent policy
    pub fn with_missing_parent(mut self, policy: MissingParentPolicy) -> Self {
        self.missing_parent = policy;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let config: CodecConfig = serde_yaml::from_str("stop_on_error: true\n").unwrap();

        assert!(config.stop_on_error);
        assert!(config.context_from_file);
        assert!(config.categories_to_file);
        assert_eq!(config.missing_parent, MissingParentPolicy::TopLevel);
        assert_eq!(config.default_scope, ContextScope::Course);
    }

    #[test]
    fn test_policy_names() {
        let config: CodecConfig =
            serde_yaml::from_str("missing_parent: create_path\ndefault_scope: system\n").unwrap();

        assert_eq!(config.missing_parent, MissingParentPolicy::CreatePath);
        assert_eq!(config.default_scope, ContextScope::System);
    }
}
