//! SDT (Service Description Table) codec.
//!
//! Each service entry carries EIT flags, running status, CA mode and a
//! descriptor loop. The service descriptor (tag 0x48) is decoded into
//! provider and service names through the context character set; other
//! descriptors are preserved as opaque hex children so unmodeled fields
//! survive the round trip.

use bytes::BufMut;

use super::generic::{from_hex, to_hex};
use super::{incomplete_error, table_id, TableCodec};
use crate::context::TableContext;
use crate::document::Node;
use crate::error::TableError;
use crate::section::{max_payload_size, LongHeader, Section};
use crate::table::Table;

const SERVICE_DESCRIPTOR_TAG: u8 = 0x48;
/// Fixed bytes at the start of every SDT section payload:
/// original_network_id plus one reserved byte.
const FIXED_PREFIX: usize = 3;

/// Codec for the `<SDT>` element.
pub struct SdtCodec;

impl TableCodec for SdtCodec {
    fn table_id(&self) -> u8 {
        table_id::SDT_ACTUAL
    }

    fn element_name(&self) -> &'static str {
        "SDT"
    }

    fn decode(&self, table: &Table, context: &TableContext) -> Result<Node, TableError> {
        if !table.is_complete() {
            return Err(incomplete_error(table));
        }

        let mut node = Node::new(self.element_name());
        node.set_attribute_fmt("transport_stream_id", table.table_id_extension());
        node.set_attribute_fmt("version", table.version_number());
        let current = table.sections().next().map_or(true, Section::current_next);
        node.set_attribute_fmt("current", current);

        let mut original_network_id = None;
        for section in table.sections() {
            let payload = section.payload();
            if payload.len() < FIXED_PREFIX {
                return Err(TableError::malformed(format!(
                    "SDT section payload of {} bytes too short",
                    payload.len()
                )));
            }
            let onid = u16::from_be_bytes([payload[0], payload[1]]);
            match original_network_id {
                None => {
                    original_network_id = Some(onid);
                    node.set_attribute_fmt("original_network_id", onid);
                }
                Some(first) if first != onid => {
                    context.report().warning(&format!(
                        "SDT 0x{:04X}: inconsistent original_network_id 0x{onid:04X} (keeping 0x{first:04X})",
                        table.table_id_extension()
                    ));
                }
                Some(_) => {}
            }

            let mut offset = FIXED_PREFIX;
            while offset + 5 <= payload.len() {
                let service_id = u16::from_be_bytes([payload[offset], payload[offset + 1]]);
                let eit_schedule = payload[offset + 2] & 0x02 != 0;
                let eit_present_following = payload[offset + 2] & 0x01 != 0;
                let running_status = (payload[offset + 3] >> 5) & 0x07;
                let free_ca_mode = payload[offset + 3] & 0x10 != 0;
                let descriptors_length =
                    ((payload[offset + 3] as usize & 0x0F) << 8) | payload[offset + 4] as usize;
                offset += 5;
                if offset + descriptors_length > payload.len() {
                    return Err(TableError::malformed(format!(
                        "SDT service 0x{service_id:04X}: descriptor loop of {descriptors_length} bytes overruns the section"
                    )));
                }

                let mut service = Node::new("service");
                service.set_attribute_fmt("service_id", service_id);
                service.set_attribute_fmt("EIT_schedule", eit_schedule);
                service.set_attribute_fmt("EIT_present_following", eit_present_following);
                service.set_attribute_fmt("running_status", running_status);
                service.set_attribute_fmt("CA_mode", free_ca_mode);
                decode_descriptors(
                    &payload[offset..offset + descriptors_length],
                    &mut service,
                    context,
                )?;
                node.add_child(service);
                offset += descriptors_length;
            }
            if offset != payload.len() {
                return Err(TableError::malformed(format!(
                    "SDT section has {} trailing bytes after the service loop",
                    payload.len() - offset
                )));
            }
        }
        Ok(node)
    }

    fn encode(&self, node: &Node, context: &TableContext) -> Result<Vec<Section>, TableError> {
        let transport_stream_id: u16 = node.int_attribute("transport_stream_id")?;
        let original_network_id: u16 = node.int_attribute("original_network_id")?;
        let version: u8 = node.opt_int_attribute("version")?.unwrap_or(0);
        let current = node.bool_attribute("current", true)?;

        let capacity = max_payload_size(table_id::SDT_ACTUAL, true) - FIXED_PREFIX;
        let mut groups: Vec<Vec<u8>> = vec![Vec::new()];
        for child in node.children() {
            if child.name() != "service" {
                return Err(TableError::schema(
                    node.name(),
                    format!("unexpected element <{}>", child.name()),
                ));
            }
            let entry = encode_service(child, context)?;
            if entry.len() > capacity {
                return Err(TableError::malformed(format!(
                    "SDT service entry of {} bytes exceeds the single-section capacity",
                    entry.len()
                )));
            }
            let group = groups.last_mut().unwrap();
            if group.len() + entry.len() > capacity {
                groups.push(entry);
            } else {
                group.extend_from_slice(&entry);
            }
        }

        if groups.len() > u8::MAX as usize + 1 {
            return Err(TableError::malformed(
                "SDT does not fit in 256 sections".to_string(),
            ));
        }
        let last_section_number = (groups.len() - 1) as u8;

        let mut sections = Vec::with_capacity(groups.len());
        for (number, entries) in groups.iter().enumerate() {
            let mut payload = Vec::with_capacity(FIXED_PREFIX + entries.len());
            payload.put_u16(original_network_id);
            payload.put_u8(0xFF);
            payload.put_slice(entries);
            sections.push(Section::long(
                table_id::SDT_ACTUAL,
                true,
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

/// Decode a descriptor loop into child nodes.
///
/// Service descriptors come first, other tags after, so repeated element
/// names stay contiguous in the child list.
fn decode_descriptors(data: &[u8], service: &mut Node, context: &TableContext) -> Result<(), TableError> {
    let mut known = Vec::new();
    let mut opaque = Vec::new();
    let mut offset = 0;
    while offset + 2 <= data.len() {
        let tag = data[offset];
        let length = data[offset + 1] as usize;
        offset += 2;
        if offset + length > data.len() {
            return Err(TableError::malformed(format!(
                "descriptor 0x{tag:02X} of {length} bytes overruns its loop"
            )));
        }
        let body = &data[offset..offset + length];
        offset += length;

        if tag == SERVICE_DESCRIPTOR_TAG {
            known.push(decode_service_descriptor(body, context)?);
        } else {
            let mut child = Node::new("descriptor");
            child.set_attribute("tag", format!("0x{tag:02X}"));
            child.set_attribute("payload", to_hex(body));
            opaque.push(child);
        }
    }
    if offset != data.len() {
        return Err(TableError::malformed(
            "trailing byte in descriptor loop".to_string(),
        ));
    }
    for child in known.into_iter().chain(opaque) {
        service.add_child(child);
    }
    Ok(())
}

fn decode_service_descriptor(data: &[u8], context: &TableContext) -> Result<Node, TableError> {
    if data.len() < 3 {
        return Err(TableError::malformed(
            "service descriptor too short".to_string(),
        ));
    }
    let service_type = data[0];
    let provider_length = data[1] as usize;
    let name_offset = 2 + provider_length;
    if data.len() < name_offset + 1 {
        return Err(TableError::malformed(
            "service descriptor provider name overruns the descriptor".to_string(),
        ));
    }
    let name_length = data[name_offset] as usize;
    if data.len() < name_offset + 1 + name_length {
        return Err(TableError::malformed(
            "service descriptor service name overruns the descriptor".to_string(),
        ));
    }

    let charset = context.charset();
    let mut node = Node::new("service_descriptor");
    node.set_attribute_fmt("service_type", service_type);
    node.set_attribute("provider_name", charset.decode(&data[2..name_offset]));
    node.set_attribute(
        "service_name",
        charset.decode(&data[name_offset + 1..name_offset + 1 + name_length]),
    );
    Ok(node)
}

fn encode_service(service: &Node, context: &TableContext) -> Result<Vec<u8>, TableError> {
    let service_id: u16 = service.int_attribute("service_id")?;
    let eit_schedule = service.bool_attribute("EIT_schedule", false)?;
    let eit_present_following = service.bool_attribute("EIT_present_following", false)?;
    let running_status: u8 = service.opt_int_attribute("running_status")?.unwrap_or(0);
    if running_status > 7 {
        return Err(TableError::schema(
            service.name(),
            format!("attribute 'running_status' value {running_status} exceeds the 3-bit range"),
        ));
    }
    let free_ca_mode = service.bool_attribute("CA_mode", false)?;

    let mut descriptors = Vec::new();
    for child in service.children() {
        match child.name() {
            "service_descriptor" => encode_service_descriptor(child, context, &mut descriptors)?,
            "descriptor" => {
                let tag: u8 = child.int_attribute("tag")?;
                let body = from_hex(child.name(), child.req_attribute("payload")?)?;
                if body.len() > u8::MAX as usize {
                    return Err(TableError::schema(
                        child.name(),
                        format!("payload of {} bytes exceeds one descriptor", body.len()),
                    ));
                }
                descriptors.put_u8(tag);
                descriptors.put_u8(body.len() as u8);
                descriptors.put_slice(&body);
            }
            other => {
                return Err(TableError::schema(
                    service.name(),
                    format!("unexpected element <{other}>"),
                ));
            }
        }
    }
    if descriptors.len() > 0x0FFF {
        return Err(TableError::schema(
            service.name(),
            format!("descriptor loop of {} bytes exceeds the 12-bit length", descriptors.len()),
        ));
    }

    let mut entry = Vec::with_capacity(5 + descriptors.len());
    entry.put_u16(service_id);
    entry.put_u8(0xFC | (u8::from(eit_schedule) << 1) | u8::from(eit_present_following));
    entry.put_u8((running_status << 5) | (u8::from(free_ca_mode) << 4) | (descriptors.len() >> 8) as u8);
    entry.put_u8(descriptors.len() as u8);
    entry.put_slice(&descriptors);
    Ok(entry)
}

fn encode_service_descriptor(
    node: &Node,
    context: &TableContext,
    out: &mut Vec<u8>,
) -> Result<(), TableError> {
    let service_type: u8 = node.int_attribute("service_type")?;
    let charset = context.charset();
    let provider = charset.encode(node.attribute("provider_name").unwrap_or_default());
    let name = charset.encode(node.attribute("service_name").unwrap_or_default());
    for (attribute, bytes) in [("provider_name", &provider), ("service_name", &name)] {
        if bytes.len() > u8::MAX as usize {
            return Err(TableError::schema(
                node.name(),
                format!("attribute '{attribute}' encodes to {} bytes, more than 255", bytes.len()),
            ));
        }
    }
    let length = 3 + provider.len() + name.len();
    if length > u8::MAX as usize {
        return Err(TableError::schema(
            node.name(),
            "encoded service descriptor exceeds 255 bytes".to_string(),
        ));
    }
    out.put_u8(SERVICE_DESCRIPTOR_TAG);
    out.put_u8(length as u8);
    out.put_u8(service_type);
    out.put_u8(provider.len() as u8);
    out.put_slice(&provider);
    out.put_u8(name.len() as u8);
    out.put_slice(&name);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Charset;
    use crate::report::NullReport;
    use crate::table::{reassemble, DuplicatePolicy};

    fn sample_node() -> Node {
        let mut node = Node::new("SDT");
        node.set_attribute("transport_stream_id", "32736");
        node.set_attribute("original_network_id", "32720");
        node.set_attribute("version", "3");

        let mut service = Node::new("service");
        service.set_attribute("service_id", "1024");
        service.set_attribute("EIT_present_following", "true");
        service.set_attribute("running_status", "4");
        let mut descriptor = Node::new("service_descriptor");
        descriptor.set_attribute("service_type", "1");
        descriptor.set_attribute("provider_name", "Provider");
        descriptor.set_attribute("service_name", "Test Channel");
        service.add_child(descriptor);
        node.add_child(service);
        node
    }

    fn round_trip(node: &Node, context: &TableContext) -> Node {
        let sections = SdtCodec.encode(node, context).unwrap();
        let tables = reassemble(&sections, DuplicatePolicy::LastWins, &NullReport);
        assert_eq!(tables.len(), 1);
        SdtCodec.decode(&tables[0], context).unwrap()
    }

    #[test]
    fn test_encode_marks_sections_private() {
        let sections = SdtCodec.encode(&sample_node(), &TableContext::default()).unwrap();
        assert_eq!(sections.len(), 1);
        assert!(sections[0].private_indicator());
        assert_eq!(sections[0].table_id(), 0x42);
        assert_eq!(sections[0].table_id_extension(), 32736);
    }

    #[test]
    fn test_node_round_trip() {
        let context = TableContext::default();
        let decoded = round_trip(&sample_node(), &context);
        assert_eq!(decoded.attribute("transport_stream_id"), Some("32736"));
        assert_eq!(decoded.attribute("original_network_id"), Some("32720"));
        assert_eq!(decoded.attribute("version"), Some("3"));
        let service = &decoded.children()[0];
        assert_eq!(service.attribute("service_id"), Some("1024"));
        assert_eq!(service.attribute("EIT_present_following"), Some("true"));
        assert_eq!(service.attribute("EIT_schedule"), Some("false"));
        assert_eq!(service.attribute("running_status"), Some("4"));
        let descriptor = &service.children()[0];
        assert_eq!(descriptor.attribute("provider_name"), Some("Provider"));
        assert_eq!(descriptor.attribute("service_name"), Some("Test Channel"));
    }

    #[test]
    fn test_latin1_service_name() {
        let context = TableContext::default();
        let mut node = sample_node();
        let mut service = Node::new("service");
        service.set_attribute("service_id", "2000");
        let mut descriptor = Node::new("service_descriptor");
        descriptor.set_attribute("service_type", "1");
        descriptor.set_attribute("provider_name", "Télé");
        descriptor.set_attribute("service_name", "Ciné+");
        service.add_child(descriptor);
        node.add_child(service);

        let sections = SdtCodec.encode(&node, &context).unwrap();
        // One byte per character under Latin-1.
        let decoded = round_trip(&node, &context);
        let descriptor = &decoded.children()[1].children()[0];
        assert_eq!(descriptor.attribute("provider_name"), Some("Télé"));
        assert_eq!(descriptor.attribute("service_name"), Some("Ciné+"));
        assert_eq!(sections.len(), 1);
    }

    #[test]
    fn test_utf8_charset_round_trip() {
        let context = TableContext::default().with_charset(Charset::Utf8);
        let mut node = sample_node();
        let service = {
            let mut service = Node::new("service");
            service.set_attribute("service_id", "3000");
            let mut descriptor = Node::new("service_descriptor");
            descriptor.set_attribute("service_type", "1");
            descriptor.set_attribute("provider_name", "NHK");
            descriptor.set_attribute("service_name", "NHK総合");
            service.add_child(descriptor);
            service
        };
        node.add_child(service);

        let decoded = round_trip(&node, &context);
        let descriptor = &decoded.children()[1].children()[0];
        assert_eq!(descriptor.attribute("service_name"), Some("NHK総合"));
    }

    #[test]
    fn test_opaque_descriptor_preserved() {
        let context = TableContext::default();
        let mut node = sample_node();
        let mut extra = Node::new("descriptor");
        extra.set_attribute("tag", "0x40");
        extra.set_attribute("payload", "0102FF");
        node.children_mut()[0].add_child(extra);

        let decoded = round_trip(&node, &context);
        let service = &decoded.children()[0];
        assert_eq!(service.children().len(), 2);
        assert_eq!(service.children()[0].name(), "service_descriptor");
        let opaque = &service.children()[1];
        assert_eq!(opaque.name(), "descriptor");
        assert_eq!(opaque.attribute("tag"), Some("0x40"));
        assert_eq!(opaque.attribute("payload"), Some("0102FF"));
    }

    #[test]
    fn test_large_sdt_splits_by_entry_size() {
        let mut node = Node::new("SDT");
        node.set_attribute("transport_stream_id", "1");
        node.set_attribute("original_network_id", "1");
        // 40 services of ~210 bytes each exceed one 4081-byte section.
        for i in 0..40u16 {
            let mut service = Node::new("service");
            service.set_attribute_fmt("service_id", i + 1);
            let mut descriptor = Node::new("service_descriptor");
            descriptor.set_attribute("service_type", "1");
            descriptor.set_attribute("provider_name", "P".repeat(100));
            descriptor.set_attribute("service_name", "S".repeat(100));
            service.add_child(descriptor);
            node.add_child(service);
        }

        let context = TableContext::default();
        let sections = SdtCodec.encode(&node, &context).unwrap();
        assert!(sections.len() > 1);
        let numbers: Vec<_> = sections.iter().map(Section::section_number).collect();
        assert_eq!(numbers, (0..sections.len() as u8).collect::<Vec<_>>());
        assert!(sections
            .iter()
            .all(|s| s.last_section_number() == (sections.len() - 1) as u8));

        let decoded = round_trip(&node, &context);
        assert_eq!(decoded.children().len(), 40);
        assert_eq!(decoded.children()[39].attribute("service_id"), Some("40"));
    }

    #[test]
    fn test_running_status_out_of_range() {
        let mut node = sample_node();
        node.children_mut()[0].set_attribute("running_status", "9");
        let err = SdtCodec.encode(&node, &TableContext::default()).unwrap_err();
        assert!(matches!(err, TableError::AttributeSchemaMismatch { .. }));
    }
}
