//! Category paths and context scopes.
//!
//! A category is addressed in documents by its scope and the names of every
//! category from the root down to itself:
//!
//! ```text
//! $course$/Beta/Gamma
//! ```
//!
//! A literal `/` inside a name is doubled (`A//B` is the single name `A/B`).

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Storage partition a category path is rooted in, widest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextScope {
    System,
    CourseCategory,
    Course,
    Module,
}

impl ContextScope {
    /// Path prefix token, e.g. `$course$`
    pub fn token(self) -> &'static str {
        match self {
            ContextScope::System => "$system$",
            ContextScope::CourseCategory => "$coursecategory$",
            ContextScope::Course => "$course$",
            ContextScope::Module => "$module$",
        }
    }

    /// Parse a path prefix token. `$cat$` is the legacy spelling of
    /// `$coursecategory$`.
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "$system$" => Some(ContextScope::System),
            "$coursecategory$" | "$cat$" => Some(ContextScope::CourseCategory),
            "$course$" => Some(ContextScope::Course),
            "$module$" => Some(ContextScope::Module),
            _ => None,
        }
    }
}

impl std::fmt::Display for ContextScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.token())
    }
}

impl std::str::FromStr for ContextScope {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(scope) = Self::from_token(s) {
            return Ok(scope);
        }
        match s.to_lowercase().as_str() {
            "system" => Ok(ContextScope::System),
            "coursecategory" | "course_category" | "cat" => Ok(ContextScope::CourseCategory),
            "course" => Ok(ContextScope::Course),
            "module" => Ok(ContextScope::Module),
            _ => Err(PathError::UnknownScope(s.to_string())),
        }
    }
}

/// Errors produced while parsing a category path
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    #[error("Category path is empty")]
    Empty,

    #[error("Category path '{0}' contains an empty name")]
    EmptySegment(String),

    #[error("Unknown context scope: {0}")]
    UnknownScope(String),

    #[error("Category name '{0}' has no unambiguous path form")]
    Unencodable(String),
}

/// Scope plus root-to-leaf category names
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CategoryPath {
    scope: Option<ContextScope>,
    names: Vec<String>,
}

impl CategoryPath {
    /// Build a path from already-split names
    pub fn new(
        scope: Option<ContextScope>,
        names: impl IntoIterator<Item = impl Into<String>>,
    ) -> Result<Self, PathError> {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        if names.is_empty() {
            return Err(PathError::Empty);
        }
        if names.iter().any(|n| n.trim().is_empty()) {
            return Err(PathError::EmptySegment(names.join("/")));
        }
        check_slashes(&names)?;
        Ok(Self { scope, names })
    }

    /// Parse the text form used in documents
    pub fn parse(text: &str) -> Result<Self, PathError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(PathError::Empty);
        }

        let mut segments = split_escaped(text);
        let scope = match segments.first().map(String::as_str) {
            Some(first) if is_scope_shaped(first) => {
                let scope = ContextScope::from_token(first)
                    .ok_or_else(|| PathError::UnknownScope(first.to_string()))?;
                segments.remove(0);
                Some(scope)
            }
            _ => None,
        };

        // Tolerate a single trailing separator ("$course$/Alpha/")
        if segments.len() > 1 && segments.last().is_some_and(|s| s.is_empty()) {
            segments.pop();
        }

        if segments.is_empty() {
            return Err(PathError::Empty);
        }
        if segments.iter().any(|s| s.trim().is_empty()) {
            return Err(PathError::EmptySegment(text.to_string()));
        }

        let names: Vec<String> = segments.into_iter().map(|s| s.trim().to_string()).collect();
        check_slashes(&names)?;
        Ok(Self { scope, names })
    }

    /// Context scope, if the path carries one
    pub fn scope(&self) -> Option<ContextScope> {
        self.scope
    }

    /// Root-to-leaf names
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Name of the category this path points at
    pub fn name(&self) -> &str {
        // names is never empty
        &self.names[self.names.len() - 1]
    }

    /// Name of the parent category, or None for a root category
    pub fn parent_name(&self) -> Option<&str> {
        if self.names.len() < 2 {
            return None;
        }
        Some(&self.names[self.names.len() - 2])
    }

    /// Text form as written to documents, with or without the scope prefix.
    ///
    /// Without a prefix, a first name that looks like a scope token would
    /// be read back as a scope, so it is refused.
    pub fn encode(&self, include_scope: bool) -> Result<String, PathError> {
        match self.scope.filter(|_| include_scope) {
            Some(scope) => Ok(format!("{}/{}", scope, self.to_unscoped_string())),
            None => {
                let first = &self.names[0];
                if is_scope_shaped(first) {
                    return Err(PathError::Unencodable(first.clone()));
                }
                Ok(self.to_unscoped_string())
            }
        }
    }

    /// Text form without the scope prefix
    pub fn to_unscoped_string(&self) -> String {
        self.names
            .iter()
            .map(|n| n.replace('/', "//"))
            .collect::<Vec<_>>()
            .join("/")
    }
}

impl std::fmt::Display for CategoryPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.scope {
            Some(scope) => write!(f, "{}/{}", scope, self.to_unscoped_string()),
            None => write!(f, "{}", self.to_unscoped_string()),
        }
    }
}

fn is_scope_shaped(segment: &str) -> bool {
    segment.len() > 1 && segment.starts_with('$') && segment.ends_with('$')
}

/// A `/` at either end of a name merges with the neighbouring separator
/// (`A/` + `B` and `A` + `/B` both give `A///B`)
fn check_slashes(names: &[String]) -> Result<(), PathError> {
    match names.iter().find(|n| n.starts_with('/') || n.ends_with('/')) {
        Some(name) => Err(PathError::Unencodable(name.clone())),
        None => Ok(()),
    }
}

/// Split on single `/`, treating `//` as an escaped literal slash
fn split_escaped(text: &str) -> Vec<String> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '/' {
            if chars.peek() == Some(&'/') {
                chars.next();
                current.push('/');
            } else {
                segments.push(std::mem::take(&mut current));
            }
        } else {
            current.push(c);
        }
    }
    segments.push(current);

    segments
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_scoped_path() {
        let path = CategoryPath::parse("$course$/Beta/Gamma").unwrap();
        assert_eq!(path.scope(), Some(ContextScope::Course));
        assert_eq!(path.names(), &["Beta".to_string(), "Gamma".to_string()]);
        assert_eq!(path.name(), "Gamma");
        assert_eq!(path.parent_name(), Some("Beta"));
    }

    #[test]
    fn test_parse_unscoped_path() {
        let path = CategoryPath::parse("Alpha").unwrap();
        assert_eq!(path.scope(), None);
        assert_eq!(path.name(), "Alpha");
        assert!(path.parent_name().is_none());
    }

    #[test]
    fn test_escaped_slash() {
        let path = CategoryPath::parse("$system$/Unit 1//2/Part A").unwrap();
        assert_eq!(
            path.names(),
            &["Unit 1/2".to_string(), "Part A".to_string()]
        );
        assert_eq!(path.to_string(), "$system$/Unit 1//2/Part A");
    }

    #[test]
    fn test_legacy_cat_token() {
        let path = CategoryPath::parse("$cat$/Shared").unwrap();
        assert_eq!(path.scope(), Some(ContextScope::CourseCategory));
        assert_eq!(path.to_string(), "$coursecategory$/Shared");
    }

    #[test]
    fn test_malformed_paths() {
        assert_eq!(CategoryPath::parse("   "), Err(PathError::Empty));
        assert_eq!(CategoryPath::parse("$course$"), Err(PathError::Empty));
        assert!(matches!(
            CategoryPath::parse("$course$/A/ /B"),
            Err(PathError::EmptySegment(_))
        ));
        assert!(matches!(
            CategoryPath::parse("$nowhere$/A"),
            Err(PathError::UnknownScope(_))
        ));
    }

    #[test]
    fn test_edge_slashes_rejected() {
        assert_eq!(
            CategoryPath::new(Some(ContextScope::Course), ["A", "/B"]),
            Err(PathError::Unencodable("/B".to_string()))
        );
        assert_eq!(
            CategoryPath::new(None, ["A/"]),
            Err(PathError::Unencodable("A/".to_string()))
        );
        assert_eq!(
            CategoryPath::parse("$course$/A///B"),
            Err(PathError::Unencodable("A/".to_string()))
        );
    }

    #[test]
    fn test_encode_scope_shaped_root() {
        let path = CategoryPath::new(Some(ContextScope::Course), ["$x$", "Child"]).unwrap();
        assert_eq!(path.encode(true).unwrap(), "$course$/$x$/Child");
        assert_eq!(
            path.encode(false),
            Err(PathError::Unencodable("$x$".to_string()))
        );

        let plain = CategoryPath::parse("$system$/Unit 1//2").unwrap();
        assert_eq!(plain.encode(false).unwrap(), "Unit 1//2");
    }

    #[test]
    fn test_trailing_separator_tolerated() {
        let path = CategoryPath::parse("$course$/Alpha/").unwrap();
        assert_eq!(path.names(), &["Alpha".to_string()]);
    }

    #[test]
    fn test_new_rejects_blank_names() {
        let path = CategoryPath::new(Some(ContextScope::Course), ["Delta", "Epsilon"]).unwrap();
        assert_eq!(path.to_string(), "$course$/Delta/Epsilon");
        assert_eq!(
            CategoryPath::new(None, Vec::<String>::new()),
            Err(PathError::Empty)
        );
        assert!(matches!(
            CategoryPath::new(None, ["Delta", " "]),
            Err(PathError::EmptySegment(_))
        ));
    }

    #[test]
    fn test_scope_from_str() {
        assert_eq!("course".parse::<ContextScope>().unwrap(), ContextScope::Course);
        assert_eq!(
            "$module$".parse::<ContextScope>().unwrap(),
            ContextScope::Module
        );
        assert!("galaxy".parse::<ContextScope>().is_err());
    }
}
