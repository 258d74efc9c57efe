//! Question-bank XML: reading and writing category blocks.
//!
//! # Document shape
//!
//! ```text
//! <quiz>
//! <!-- question: 0  -->
//!   <question type="category">
//!     <category><text>$course$/Beta/Gamma</text></category>
//!     <info format="plain_text"><text>This is Gamma</text></info>
//!   </question>
//! </quiz>
//! ```
//!
//! `<info>` and its `format` attribute are optional in older documents.

pub mod reader;
pub mod writer;

pub use reader::{parse_document, BlockIssue, ParsedDocument};

pub(crate) const ELEM_QUIZ: &str = "quiz";
pub(crate) const ELEM_QUESTION: &str = "question";
pub(crate) const ELEM_CATEGORY: &str = "category";
pub(crate) const ELEM_INFO: &str = "info";
pub(crate) const ELEM_TEXT: &str = "text";
