//! Writing category blocks in the question-bank document shape.

use std::io::Write;

use quick_xml::escape::partial_escape;
use quick_xml::events::{BytesCData, BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use super::{ELEM_CATEGORY, ELEM_INFO, ELEM_QUESTION, ELEM_QUIZ, ELEM_TEXT};
use crate::core::CodecError;
use crate::domain::CategoryNode;

/// Marker written before every category block
const QUESTION_MARKER: &str = " question: 0  ";

/// Indented XML writer used for all output
pub fn new_writer() -> Writer<Vec<u8>> {
    Writer::new_with_indent(Vec::new(), b' ', 2)
}

/// Write the XML declaration and open the document root
pub fn begin_document<W: Write>(writer: &mut Writer<W>) -> Result<(), CodecError> {
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    writer.write_event(Event::Start(BytesStart::new(ELEM_QUIZ)))?;
    Ok(())
}

/// Close the document root
pub fn end_document<W: Write>(writer: &mut Writer<W>) -> Result<(), CodecError> {
    writer.write_event(Event::End(BytesEnd::new(ELEM_QUIZ)))?;
    Ok(())
}

/// Write one `<question type="category">` block.
///
/// `include_scope` controls whether the path carries its `$scope$` prefix.
pub fn write_category_block<W: Write>(
    writer: &mut Writer<W>,
    node: &CategoryNode,
    include_scope: bool,
) -> Result<(), CodecError> {
    let path = node.path.encode(include_scope)?;

    writer.write_event(Event::Comment(BytesText::from_escaped(QUESTION_MARKER)))?;

    let mut question = BytesStart::new(ELEM_QUESTION);
    question.push_attribute(("type", ELEM_CATEGORY));
    writer.write_event(Event::Start(question))?;

    writer.write_event(Event::Start(BytesStart::new(ELEM_CATEGORY)))?;
    write_text_element(writer, &path)?;
    writer.write_event(Event::End(BytesEnd::new(ELEM_CATEGORY)))?;

    let mut info = BytesStart::new(ELEM_INFO);
    info.push_attribute(("format", node.description_format.markup_name()));
    writer.write_event(Event::Start(info))?;
    write_text_element(writer, &node.description)?;
    writer.write_event(Event::End(BytesEnd::new(ELEM_INFO)))?;

    writer.write_event(Event::End(BytesEnd::new(ELEM_QUESTION)))?;
    Ok(())
}

/// Write `<text>…</text>`, using CDATA when the content contains markup
fn write_text_element<W: Write>(writer: &mut Writer<W>, text: &str) -> Result<(), CodecError> {
    writer.write_event(Event::Start(BytesStart::new(ELEM_TEXT)))?;
    if needs_cdata(text) {
        writer.write_event(Event::CData(BytesCData::new(text)))?;
    } else if !text.is_empty() {
        writer.write_event(Event::Text(BytesText::from_escaped(partial_escape(text))))?;
    }
    writer.write_event(Event::End(BytesEnd::new(ELEM_TEXT)))?;
    Ok(())
}

/// Markup characters go in CDATA unless the text would terminate it early
fn needs_cdata(text: &str) -> bool {
    text.contains(&['<', '>', '&'][..]) && !text.contains("]]>")
}

/// Take the finished bytes out of a writer
pub fn into_string(writer: Writer<Vec<u8>>) -> String {
    String::from_utf8_lossy(&writer.into_inner()).into_owned()
}
