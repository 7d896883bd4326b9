//! XML text surface for the structured document model.
//!
//! Rendering and parsing are generic over any node tree; which elements are
//! meaningful is the codec registry's concern. Attribute values are
//! entity-escaped on output and unescaped on input, so
//! `parse(render(doc)) == doc` holds for any document.

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};
use quick_xml::{Reader, Writer};

use crate::document::Node;
use crate::error::TableError;

fn text_error(error: impl std::fmt::Display) -> TableError {
    TableError::TextParseError(error.to_string())
}

/// Render a document tree as indented XML with a declaration.
pub fn render(doc: &Node) -> Result<String, TableError> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .map_err(text_error)?;
    write_node(&mut writer, doc)?;
    String::from_utf8(writer.into_inner()).map_err(text_error)
}

fn write_node(writer: &mut Writer<Vec<u8>>, node: &Node) -> Result<(), TableError> {
    let mut start = BytesStart::new(node.name());
    for (key, value) in node.attributes() {
        start.push_attribute((key, value));
    }
    if node.children().is_empty() {
        writer.write_event(Event::Empty(start)).map_err(text_error)?;
    } else {
        writer.write_event(Event::Start(start)).map_err(text_error)?;
        for child in node.children() {
            write_node(writer, child)?;
        }
        writer
            .write_event(Event::End(BytesEnd::new(node.name())))
            .map_err(text_error)?;
    }
    Ok(())
}

/// Parse XML text into a document tree.
///
/// The markup must contain exactly one root element; element content other
/// than child elements (and ignorable whitespace) is rejected.
pub fn parse(text: &str) -> Result<Node, TableError> {
    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<Node> = Vec::new();
    let mut root: Option<Node> = None;

    loop {
        match reader.read_event().map_err(text_error)? {
            Event::Start(start) => {
                if root.is_some() && stack.is_empty() {
                    return Err(TableError::TextParseError(
                        "content after the document root".to_string(),
                    ));
                }
                stack.push(node_from_start(&start)?);
            }
            Event::Empty(start) => {
                if root.is_some() && stack.is_empty() {
                    return Err(TableError::TextParseError(
                        "content after the document root".to_string(),
                    ));
                }
                let node = node_from_start(&start)?;
                match stack.last_mut() {
                    Some(parent) => parent.add_child(node),
                    None => root = Some(node),
                }
            }
            Event::End(_) => {
                // Tag balance is enforced by the reader.
                let node = stack.pop().ok_or_else(|| {
                    TableError::TextParseError("unbalanced end tag".to_string())
                })?;
                match stack.last_mut() {
                    Some(parent) => parent.add_child(node),
                    None => root = Some(node),
                }
            }
            Event::Text(text) => {
                let content = String::from_utf8_lossy(text.as_ref());
                if !content.trim().is_empty() {
                    return Err(TableError::TextParseError(format!(
                        "unexpected text content '{}'",
                        content.trim()
                    )));
                }
            }
            Event::Eof => break,
            // Declarations, comments, processing instructions and CDATA
            // carry no document content for this model.
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(TableError::TextParseError(
            "unterminated element".to_string(),
        ));
    }
    root.ok_or_else(|| TableError::TextParseError("no root element".to_string()))
}

fn node_from_start(start: &BytesStart<'_>) -> Result<Node, TableError> {
    let name = String::from_utf8(start.name().as_ref().to_vec()).map_err(text_error)?;
    let mut node = Node::new(name);
    for attribute in start.attributes() {
        let attribute = attribute.map_err(text_error)?;
        let key = String::from_utf8(attribute.key.as_ref().to_vec()).map_err(text_error)?;
        if node.attribute(&key).is_some() {
            return Err(TableError::TextParseError(format!(
                "duplicate attribute '{key}'"
            )));
        }
        let value = attribute.unescape_value().map_err(text_error)?;
        node.set_attribute(key, value.into_owned());
    }
    Ok(node)
}
