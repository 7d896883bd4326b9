//! Lossless document form for tables without a registered codec, and for
//! orphan sections of incomplete tables.
//!
//! Payloads are hex dumped, so any section survives a binary → text →
//! binary round trip even when the engine does not model its table type.

use std::fmt::Write as _;

use crate::document::Node;
use crate::error::TableError;
use crate::section::{LongHeader, Section};
use crate::table::Table;

/// Element name for a table with no registered codec.
pub const UNKNOWN_TABLE: &str = "unknown_table";
/// Element name for a stray section of an incomplete table.
pub const ORPHAN_SECTION: &str = "orphan_section";

pub(crate) fn to_hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        let _ = write!(out, "{byte:02X}");
    }
    out
}

pub(crate) fn from_hex(element: &str, text: &str) -> Result<Vec<u8>, TableError> {
    if text.len() % 2 != 0 {
        return Err(TableError::schema(element, "odd-length hex payload"));
    }
    (0..text.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&text[i..i + 2], 16)
                .map_err(|_| TableError::schema(element, format!("invalid hex payload at offset {i}")))
        })
        .collect()
}

/// Render a table without a codec as an `unknown_table` node.
pub fn decode_unknown(table: &Table) -> Node {
    let mut node = Node::new(UNKNOWN_TABLE);
    node.set_attribute("table_id", format!("0x{:02X}", table.table_id()));
    node.set_attribute_fmt("long_form", table.is_long_form());
    if table.is_long_form() {
        node.set_attribute("table_id_extension", format!("0x{:04X}", table.table_id_extension()));
        node.set_attribute_fmt("version", table.version_number());
        let current = table.sections().next().map_or(true, Section::current_next);
        node.set_attribute_fmt("current", current);
        node.set_attribute_fmt("last_section_number", table.last_section_number());
    }
    for section in table.sections() {
        let mut child = Node::new("section");
        if table.is_long_form() {
            child.set_attribute_fmt("section_number", section.section_number());
        }
        child.set_attribute_fmt("private", section.private_indicator());
        child.set_attribute("payload", to_hex(section.payload()));
        node.add_child(child);
    }
    node
}

/// Rebuild the sections of an `unknown_table` node.
pub fn encode_unknown(node: &Node) -> Result<Vec<Section>, TableError> {
    let table_id: u8 = node.int_attribute("table_id")?;
    let long_form = node.bool_attribute("long_form", true)?;

    let mut sections = Vec::with_capacity(node.children().len());
    for child in node.children() {
        if child.name() != "section" {
            return Err(TableError::schema(
                UNKNOWN_TABLE,
                format!("unexpected element <{}>", child.name()),
            ));
        }
        let private = child.bool_attribute("private", false)?;
        let payload = from_hex(UNKNOWN_TABLE, child.req_attribute("payload")?)?;
        let section = if long_form {
            Section::long(
                table_id,
                private,
                LongHeader {
                    table_id_extension: node.int_attribute("table_id_extension")?,
                    version_number: node.int_attribute("version")?,
                    current_next: node.bool_attribute("current", true)?,
                    section_number: child.int_attribute("section_number")?,
                    last_section_number: node.int_attribute("last_section_number")?,
                },
                payload,
            )?
        } else {
            Section::short(table_id, private, payload)?
        };
        sections.push(section);
    }
    Ok(sections)
}

/// Render one stray section as an `orphan_section` node.
pub fn decode_orphan(section: &Section) -> Node {
    let mut node = Node::new(ORPHAN_SECTION);
    node.set_attribute("table_id", format!("0x{:02X}", section.table_id()));
    node.set_attribute_fmt("long_form", section.is_long_form());
    node.set_attribute_fmt("private", section.private_indicator());
    if let Some(header) = section.long_header() {
        node.set_attribute("table_id_extension", format!("0x{:04X}", header.table_id_extension));
        node.set_attribute_fmt("version", header.version_number);
        node.set_attribute_fmt("current", header.current_next);
        node.set_attribute_fmt("section_number", header.section_number);
        node.set_attribute_fmt("last_section_number", header.last_section_number);
    }
    node.set_attribute("payload", to_hex(section.payload()));
    node
}

/// Rebuild the section behind an `orphan_section` node.
pub fn encode_orphan(node: &Node) -> Result<Section, TableError> {
    let table_id: u8 = node.int_attribute("table_id")?;
    let private = node.bool_attribute("private", false)?;
    let payload = from_hex(ORPHAN_SECTION, node.req_attribute("payload")?)?;
    if node.bool_attribute("long_form", true)? {
        Section::long(
            table_id,
            private,
            LongHeader {
                table_id_extension: node.int_attribute("table_id_extension")?,
                version_number: node.int_attribute("version")?,
                current_next: node.bool_attribute("current", true)?,
                section_number: node.int_attribute("section_number")?,
                last_section_number: node.int_attribute("last_section_number")?,
            },
            payload,
        )
    } else {
        Section::short(table_id, private, payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::NullReport;
    use crate::table::{reassemble, DuplicatePolicy};

    #[test]
    fn test_hex_round_trip() {
        let bytes = vec![0x00, 0x7F, 0xFF, 0x0A];
        assert_eq!(to_hex(&bytes), "007FFF0A");
        assert_eq!(from_hex("t", "007FFF0A").unwrap(), bytes);
    }

    #[test]
    fn test_from_hex_rejects_garbage() {
        assert!(from_hex("t", "ABC").is_err());
        assert!(from_hex("t", "GG").is_err());
    }

    #[test]
    fn test_unknown_long_table_round_trip() {
        let make = |n: u8| {
            Section::long(
                0x47,
                true,
                LongHeader {
                    table_id_extension: 0x0102,
                    version_number: 9,
                    current_next: false,
                    section_number: n,
                    last_section_number: 1,
                },
                vec![n, n, n],
            )
            .unwrap()
        };
        let sections = vec![make(0), make(1)];
        let tables = reassemble(&sections, DuplicatePolicy::LastWins, &NullReport);
        let node = decode_unknown(&tables[0]);
        assert_eq!(node.attribute("table_id"), Some("0x47"));
        assert_eq!(node.children().len(), 2);

        let rebuilt = encode_unknown(&node).unwrap();
        assert_eq!(rebuilt, sections);
    }

    #[test]
    fn test_orphan_round_trip() {
        let section = Section::long(
            0x42,
            true,
            LongHeader {
                table_id_extension: 7,
                version_number: 3,
                current_next: true,
                section_number: 2,
                last_section_number: 5,
            },
            vec![0xAB],
        )
        .unwrap();
        let node = decode_orphan(&section);
        assert_eq!(node.name(), ORPHAN_SECTION);
        assert_eq!(encode_orphan(&node).unwrap(), section);
    }
}
