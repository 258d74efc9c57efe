//! Reading category blocks out of a question-bank document.
//!
//! Only `<question type="category">` blocks are interpreted. Every other
//! question block is counted and skipped.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use tracing::{debug, warn};

use super::{ELEM_CATEGORY, ELEM_INFO, ELEM_QUESTION, ELEM_QUIZ, ELEM_TEXT};
use crate::core::CodecError;
use crate::domain::{CategoryNode, CategoryPath, CategoryTree, TextFormat};

/// A category block that could not be turned into a node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockIssue {
    /// 1-based position of the `<question>` element in the document
    pub block: usize,
    pub reason: String,
}

impl BlockIssue {
    /// Convert into the error reported when the import must stop
    pub fn into_error(self) -> CodecError {
        CodecError::MalformedDocument {
            block: self.block,
            reason: self.reason,
        }
    }
}

/// Result of reading a document
#[derive(Debug, Clone, Default)]
pub struct ParsedDocument {
    /// Well-formed category nodes, in document order
    pub tree: CategoryTree,

    /// Category blocks that were rejected
    pub issues: Vec<BlockIssue>,

    /// Number of non-category question blocks seen
    pub other_questions: usize,
}

/// Fields gathered while inside one category block
#[derive(Debug, Default)]
struct PendingBlock {
    block: usize,
    /// Stack depth of the enclosing <question> element
    depth: usize,
    path_text: Option<String>,
    info_seen: bool,
    info_format: Option<String>,
    info_text: String,
}

impl PendingBlock {
    fn finish(self) -> Result<CategoryNode, BlockIssue> {
        let block = self.block;
        let issue = |reason: String| BlockIssue { block, reason };

        let path_text = self
            .path_text
            .ok_or_else(|| issue("missing <category><text> element".to_string()))?;
        let path = CategoryPath::parse(&path_text).map_err(|e| issue(e.to_string()))?;

        let format = match self.info_format.as_deref() {
            None => TextFormat::LEGACY_DEFAULT,
            Some(name) => TextFormat::from_markup_name(name).unwrap_or_else(|| {
                warn!(
                    block,
                    format = name,
                    "Unknown description format, using {}",
                    TextFormat::LEGACY_DEFAULT
                );
                TextFormat::LEGACY_DEFAULT
            }),
        };

        if !self.info_seen {
            debug!(block, path = %path, "Category block has no <info>, using legacy defaults");
        }

        Ok(CategoryNode::new(path).with_description(self.info_text.trim(), format))
    }

    /// Record an <info> element if it is a direct child of the block
    fn see_info(&mut self, e: &BytesStart<'_>, stack_len: usize) -> Result<(), CodecError> {
        if stack_len == self.depth + 1 {
            self.info_seen = true;
            self.info_format = attribute(e, "format")?;
        }
        Ok(())
    }

    /// Where text at the current position belongs
    fn text_target(&self, stack: &[String]) -> TextTarget {
        let inner: Vec<&str> = stack
            .iter()
            .skip(self.depth + 1)
            .map(String::as_str)
            .collect();
        match inner.as_slice() {
            [ELEM_CATEGORY, ELEM_TEXT] => TextTarget::Path,
            [ELEM_INFO, ELEM_TEXT] => TextTarget::Info,
            _ => TextTarget::Ignored,
        }
    }

    fn append_text(&mut self, stack: &[String], text: &str) {
        match self.text_target(stack) {
            TextTarget::Path => self.path_text.get_or_insert_with(String::new).push_str(text),
            TextTarget::Info => self.info_text.push_str(text),
            TextTarget::Ignored => {}
        }
    }
}

/// Where text content currently goes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TextTarget {
    Path,
    Info,
    Ignored,
}

/// Parse a document into category nodes.
///
/// XML that is not well formed fails the whole document. Category blocks
/// with missing or invalid fields are reported in `issues` and left out of
/// the tree.
pub fn parse_document(document: &str) -> Result<ParsedDocument, CodecError> {
    let mut reader = Reader::from_str(document);
    reader.trim_text(true);

    let mut parsed = ParsedDocument::default();
    let mut stack: Vec<String> = Vec::new();
    let mut saw_root = false;
    let mut question_count = 0usize;
    let mut pending: Option<PendingBlock> = None;
    // Depth of a non-category <question> being skipped
    let mut skipping: Option<usize> = None;

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let name = element_name(&e);
                if stack.is_empty() {
                    check_root(&name, saw_root)?;
                    saw_root = true;
                } else if skipping.is_none() && pending.is_none() && name == ELEM_QUESTION {
                    question_count += 1;
                    if is_category_question(&e)? {
                        pending = Some(PendingBlock {
                            block: question_count,
                            depth: stack.len(),
                            ..Default::default()
                        });
                    } else {
                        parsed.other_questions += 1;
                        skipping = Some(stack.len());
                    }
                } else if let Some(block) = pending.as_mut() {
                    if name == ELEM_INFO {
                        block.see_info(&e, stack.len())?;
                    }
                }

                stack.push(name);
            }
            Event::Empty(e) => {
                let name = element_name(&e);
                if stack.is_empty() {
                    check_root(&name, saw_root)?;
                    saw_root = true;
                } else if skipping.is_none() && pending.is_none() && name == ELEM_QUESTION {
                    question_count += 1;
                    if is_category_question(&e)? {
                        parsed.issues.push(BlockIssue {
                            block: question_count,
                            reason: "empty category block".to_string(),
                        });
                    } else {
                        parsed.other_questions += 1;
                    }
                } else if let Some(block) = pending.as_mut() {
                    if name == ELEM_INFO {
                        block.see_info(&e, stack.len())?;
                    } else if name == ELEM_TEXT {
                        // <text/> is present but empty
                        stack.push(name);
                        block.append_text(&stack, "");
                        stack.pop();
                    }
                }
            }
            Event::Text(e) => {
                if let Some(block) = pending.as_mut() {
                    let text = e.unescape()?;
                    block.append_text(&stack, &text);
                }
            }
            Event::CData(e) => {
                if let Some(block) = pending.as_mut() {
                    let bytes = e.into_inner();
                    block.append_text(&stack, &String::from_utf8_lossy(&bytes));
                }
            }
            Event::End(_) => {
                stack.pop();

                if skipping == Some(stack.len()) {
                    skipping = None;
                } else if pending.as_ref().is_some_and(|b| b.depth == stack.len()) {
                    if let Some(block) = pending.take() {
                        match block.finish() {
                            Ok(node) => {
                                debug!(path = %node.path, "Read category block");
                                parsed.tree.push(node);
                            }
                            Err(issue) => {
                                warn!(block = issue.block, "Rejected category block: {}", issue.reason);
                                parsed.issues.push(issue);
                            }
                        }
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !saw_root {
        return Err(CodecError::MalformedDocument {
            block: 0,
            reason: format!("document has no <{}> element", ELEM_QUIZ),
        });
    }
    if !stack.is_empty() {
        return Err(CodecError::MalformedDocument {
            block: question_count,
            reason: format!("document ends inside <{}>", stack.join("><")),
        });
    }

    Ok(parsed)
}

fn check_root(name: &str, saw_root: bool) -> Result<(), CodecError> {
    if saw_root {
        return Err(CodecError::MalformedDocument {
            block: 0,
            reason: format!("unexpected second root element <{}>", name),
        });
    }
    if name != ELEM_QUIZ {
        return Err(CodecError::MalformedDocument {
            block: 0,
            reason: format!("root element is <{}>, expected <{}>", name, ELEM_QUIZ),
        });
    }
    Ok(())
}

fn element_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.name().as_ref()).into_owned()
}

fn attribute(e: &BytesStart<'_>, key: &str) -> Result<Option<String>, CodecError> {
    match e.try_get_attribute(key)? {
        Some(attr) => Ok(Some(attr.unescape_value()?.into_owned())),
        None => Ok(None),
    }
}

fn is_category_question(e: &BytesStart<'_>) -> Result<bool, CodecError> {
    Ok(attribute(e, "type")?.as_deref() == Some(ELEM_CATEGORY))
}
