//! PAT (Program Association Table) codec.
//!
//! The PAT payload is a sequence of fixed 4-byte entries, each associating
//! a service id with its PMT PID; the entry with program number 0 carries
//! the NIT PID. The table id extension is the transport stream id.

use bytes::BufMut;

use super::{incomplete_error, table_id, TableCodec};
use crate::context::TableContext;
use crate::document::Node;
use crate::error::TableError;
use crate::section::{max_payload_size, LongHeader, Section};
use crate::table::Table;

const ENTRY_SIZE: usize = 4;
const MAX_PID: u16 = 0x1FFF;

/// Codec for the `<PAT>` element.
pub struct PatCodec;

impl TableCodec for PatCodec {
    fn table_id(&self) -> u8 {
        table_id::PAT
    }

    fn element_name(&self) -> &'static str {
        "PAT"
    }

    fn decode(&self, table: &Table, _context: &TableContext) -> Result<Node, TableError> {
        if !table.is_complete() {
            return Err(incomplete_error(table));
        }

        let mut network_pid = None;
        let mut services = Vec::new();
        for section in table.sections() {
            let payload = section.payload();
            if payload.len() % ENTRY_SIZE != 0 {
                return Err(TableError::malformed(format!(
                    "PAT entry loop of {} bytes is not a multiple of {ENTRY_SIZE}",
                    payload.len()
                )));
            }
            for entry in payload.chunks(ENTRY_SIZE) {
                let program_number = u16::from_be_bytes([entry[0], entry[1]]);
                let pid = ((entry[2] as u16 & 0x1F) << 8) | entry[3] as u16;
                if program_number == 0 {
                    network_pid = Some(pid);
                } else {
                    services.push((program_number, pid));
                }
            }
        }

        let mut node = Node::new(self.element_name());
        node.set_attribute_fmt("transport_stream_id", table.table_id_extension());
        node.set_attribute_fmt("version", table.version_number());
        let current = table.sections().next().map_or(true, Section::current_next);
        node.set_attribute_fmt("current", current);
        if let Some(pid) = network_pid {
            node.set_attribute_fmt("network_PID", pid);
        }
        for (service_id, pmt_pid) in services {
            let mut service = Node::new("service");
            service.set_attribute_fmt("service_id", service_id);
            service.set_attribute_fmt("program_map_PID", pmt_pid);
            node.add_child(service);
        }
        Ok(node)
    }

    fn encode(&self, node: &Node, _context: &TableContext) -> Result<Vec<Section>, TableError> {
        let transport_stream_id: u16 = node.int_attribute("transport_stream_id")?;
        let version: u8 = node.opt_int_attribute("version")?.unwrap_or(0);
        let current = node.bool_attribute("current", true)?;

        // The NIT entry, when present, is emitted first.
        let mut entries: Vec<(u16, u16)> = Vec::with_capacity(node.children().len() + 1);
        if let Some(pid) = node.opt_int_attribute::<u16>("network_PID")? {
            entries.push((0, check_pid(node, "network_PID", pid)?));
        }
        for child in node.children() {
            if child.name() != "service" {
                return Err(TableError::schema(
                    node.name(),
                    format!("unexpected element <{}>", child.name()),
                ));
            }
            let service_id: u16 = child.int_attribute("service_id")?;
            let pid: u16 = child.int_attribute("program_map_PID")?;
            entries.push((service_id, check_pid(child, "program_map_PID", pid)?));
        }

        let per_section = max_payload_size(table_id::PAT, true) / ENTRY_SIZE;
        let section_count = entries.len().div_ceil(per_section).max(1);
        if section_count > u8::MAX as usize + 1 {
            return Err(TableError::malformed(format!(
                "PAT with {} entries does not fit in 256 sections",
                entries.len()
            )));
        }
        let last_section_number = (section_count - 1) as u8;

        let mut sections = Vec::with_capacity(section_count);
        for number in 0..section_count {
            let chunk = entries
                .iter()
                .skip(number * per_section)
                .take(per_section);
            let mut payload = Vec::with_capacity(per_section * ENTRY_SIZE);
            for (program_number, pid) in chunk {
                payload.put_u16(*program_number);
                payload.put_u8(0xE0 | (pid >> 8) as u8);
                payload.put_u8(*pid as u8);
            }
            sections.push(Section::long(
                table_id::PAT,
                false,
                LongHeader {
                    table_id_extension: transport_stream_id,
                    version_number: version,
                    current_next: current,
                    section_number: number as u8,
                    last_section_number,
                },
                payload,
            )?);
        }
        Ok(sections)
    }
}

fn check_pid(node: &Node, attribute: &str, pid: u16) -> Result<u16, TableError> {
    if pid > MAX_PID {
        return Err(TableError::schema(
            node.name(),
            format!("attribute '{attribute}' value {pid} exceeds the 13-bit PID range"),
        ));
    }
    Ok(pid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::NullReport;
    use crate::table::{reassemble, DuplicatePolicy};

    fn sample_node() -> Node {
        let mut node = Node::new("PAT");
        node.set_attribute("transport_stream_id", "10");
        let mut a = Node::new("service");
        a.set_attribute("service_id", "1");
        a.set_attribute("program_map_PID", "100");
        node.add_child(a);
        let mut b = Node::new("service");
        b.set_attribute("service_id", "2");
        b.set_attribute("program_map_PID", "200");
        node.add_child(b);
        node
    }

    fn decode_sections(sections: &[Section]) -> Node {
        let tables = reassemble(sections, DuplicatePolicy::LastWins, &NullReport);
        assert_eq!(tables.len(), 1);
        PatCodec.decode(&tables[0], &TableContext::default()).unwrap()
    }

    #[test]
    fn test_encode_two_services_single_section() {
        let sections = PatCodec.encode(&sample_node(), &TableContext::default()).unwrap();
        assert_eq!(sections.len(), 1);
        let section = &sections[0];
        assert_eq!(section.table_id(), 0x00);
        assert_eq!(section.table_id_extension(), 10);
        assert_eq!(section.payload().len(), 8);
        assert_eq!(section.payload()[..4], [0x00, 0x01, 0xE0, 0x64]);
        assert_eq!(section.payload()[4..], [0x00, 0x02, 0xE0, 0xC8]);
    }

    #[test]
    fn test_node_round_trip() {
        let context = TableContext::default();
        let sections = PatCodec.encode(&sample_node(), &context).unwrap();
        let node = decode_sections(&sections);
        assert_eq!(node.attribute("transport_stream_id"), Some("10"));
        assert_eq!(node.attribute("version"), Some("0"));
        assert_eq!(node.attribute("current"), Some("true"));
        assert_eq!(node.children().len(), 2);
        assert_eq!(node.children()[0].attribute("service_id"), Some("1"));
        assert_eq!(node.children()[0].attribute("program_map_PID"), Some("100"));
        assert_eq!(node.children()[1].attribute("service_id"), Some("2"));
        assert_eq!(node.children()[1].attribute("program_map_PID"), Some("200"));

        // Re-encoding the decoded node reproduces the same sections.
        assert_eq!(PatCodec.encode(&node, &context).unwrap(), sections);
    }

    #[test]
    fn test_network_pid_entry() {
        let mut node = sample_node();
        node.set_attribute("network_PID", "16");
        let sections = PatCodec.encode(&node, &TableContext::default()).unwrap();
        assert_eq!(sections[0].payload()[..4], [0x00, 0x00, 0xE0, 0x10]);

        let decoded = decode_sections(&sections);
        assert_eq!(decoded.attribute("network_PID"), Some("16"));
        assert_eq!(decoded.children().len(), 2);
    }

    #[test]
    fn test_split_large_table_and_reassemble() {
        let mut node = Node::new("PAT");
        node.set_attribute("transport_stream_id", "1");
        for i in 0..300u16 {
            let mut service = Node::new("service");
            service.set_attribute_fmt("service_id", i + 1);
            service.set_attribute_fmt("program_map_PID", 0x100 + i);
            node.add_child(service);
        }

        let sections = PatCodec.encode(&node, &TableContext::default()).unwrap();
        // 253 entries fit one section, so 300 need two.
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].section_number(), 0);
        assert_eq!(sections[1].section_number(), 1);
        assert!(sections.iter().all(|s| s.last_section_number() == 1));

        let decoded = decode_sections(&sections);
        assert_eq!(decoded.children().len(), 300);
        for (i, service) in decoded.children().iter().enumerate() {
            assert_eq!(
                service.attribute("service_id").unwrap(),
                (i as u16 + 1).to_string()
            );
        }
    }

    #[test]
    fn test_incomplete_table_rejected() {
        let mut node = Node::new("PAT");
        node.set_attribute("transport_stream_id", "1");
        for i in 0..300u16 {
            let mut service = Node::new("service");
            service.set_attribute_fmt("service_id", i + 1);
            service.set_attribute_fmt("program_map_PID", 0x100);
            node.add_child(service);
        }
        let sections = PatCodec.encode(&node, &TableContext::default()).unwrap();
        let tables = reassemble(&sections[..1], DuplicatePolicy::LastWins, &NullReport);
        let err = PatCodec.decode(&tables[0], &TableContext::default()).unwrap_err();
        assert!(matches!(err, TableError::IncompleteTable { missing: 1, .. }));
    }

    #[test]
    fn test_missing_attribute_rejected() {
        let node = Node::new("PAT");
        let err = PatCodec.encode(&node, &TableContext::default()).unwrap_err();
        assert!(matches!(err, TableError::AttributeSchemaMismatch { .. }));
    }

    #[test]
    fn test_pid_out_of_range_rejected() {
        let mut node = Node::new("PAT");
        node.set_attribute("transport_stream_id", "1");
        let mut service = Node::new("service");
        service.set_attribute("service_id", "1");
        service.set_attribute("program_map_PID", "8192");
        node.add_child(service);
        let err = PatCodec.encode(&node, &TableContext::default()).unwrap_err();
        assert!(matches!(err, TableError::AttributeSchemaMismatch { .. }));
    }

    #[test]
    fn test_empty_pat_encodes_one_empty_section() {
        let mut node = Node::new("PAT");
        node.set_attribute("transport_stream_id", "5");
        let sections = PatCodec.encode(&node, &TableContext::default()).unwrap();
        assert_eq!(sections.len(), 1);
        assert!(sections[0].payload().is_empty());
    }
}
