//! Text formats for category descriptions.
//!
//! Each format has a numeric code (the value stored in `info_format`) and a
//! markup name (the `format` attribute on `<info>`).

use serde::{Deserialize, Serialize};

/// How a category description is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextFormat {
    /// Auto-formatted text (legacy default)
    Moodle,

    /// Rich HTML
    Html,

    /// Plain text
    Plain,

    /// Wiki-like markup
    Wiki,

    /// Markdown
    Markdown,
}

impl Default for TextFormat {
    fn default() -> Self {
        Self::LEGACY_DEFAULT
    }
}

impl TextFormat {
    /// Format applied when a document omits the `format` attribute
    pub const LEGACY_DEFAULT: TextFormat = TextFormat::Moodle;

    /// All formats, in code order
    pub const ALL: [TextFormat; 5] = [
        TextFormat::Moodle,
        TextFormat::Html,
        TextFormat::Plain,
        TextFormat::Wiki,
        TextFormat::Markdown,
    ];

    /// Numeric code as stored in the database
    pub fn code(self) -> i64 {
        match self {
            TextFormat::Moodle => 0,
            TextFormat::Html => 1,
            TextFormat::Plain => 2,
            TextFormat::Wiki => 3,
            TextFormat::Markdown => 4,
        }
    }

    /// Look up a format by its numeric code
    pub fn from_code(code: i64) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.code() == code)
    }

    /// Name used in the `format` attribute
    pub fn markup_name(self) -> &'static str {
        match self {
            TextFormat::Moodle => "moodle_auto_format",
            TextFormat::Html => "html",
            TextFormat::Plain => "plain_text",
            TextFormat::Wiki => "wiki_like",
            TextFormat::Markdown => "markdown",
        }
    }

    /// Look up a format by its markup name (case-insensitive, surrounding
    /// whitespace ignored)
    pub fn from_markup_name(name: &str) -> Option<Self> {
        let name = name.trim().to_lowercase();
        Self::ALL.into_iter().find(|f| f.markup_name() == name)
    }
}

impl std::fmt::Display for TextFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.markup_name())
    }
}
