//! Top-level aggregate over sections, tables and the three representations.
//!
//! A `SectionFile` owns an ordered sequence of sections as the authoritative
//! binary form. Tables are derived on demand by the reassembler, and the
//! summary counters are computed from current state rather than cached, so
//! they cannot drift.
//!
//! Every load operation is additive: loading a second file appends to the
//! sections already held. A failed load keeps everything appended before
//! the failure, so diagnostics can report progress over partially usable
//! input.

use crate::codec::{generic, CodecRegistry};
use crate::context::TableContext;
use crate::document::Node;
use crate::error::TableError;
use crate::section::Section;
use crate::table::{reassemble, DuplicatePolicy, Table};
use crate::{json, xml};

/// Root element name of the document form.
pub const DOC_ROOT: &str = "sitool";

/// An ordered collection of sections with load/save across binary, XML and
/// JSON representations.
pub struct SectionFile {
    context: TableContext,
    registry: CodecRegistry,
    policy: DuplicatePolicy,
    sections: Vec<Section>,
}

impl SectionFile {
    /// Create an empty file bound to an interpretation context, with the
    /// built-in codecs.
    pub fn new(context: TableContext) -> Self {
        Self::with_registry(context, CodecRegistry::with_defaults())
    }

    /// Create an empty file with a caller-supplied codec registry.
    pub fn with_registry(context: TableContext, registry: CodecRegistry) -> Self {
        Self {
            context,
            registry,
            policy: DuplicatePolicy::default(),
            sections: Vec::new(),
        }
    }

    pub fn context(&self) -> &TableContext {
        &self.context
    }

    /// Policy applied when a section number repeats within one version.
    pub fn set_duplicate_policy(&mut self, policy: DuplicatePolicy) {
        self.policy = policy;
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    /// Append one section.
    pub fn add_section(&mut self, section: Section) {
        self.sections.push(section);
    }

    /// Decode a flat concatenation of encoded sections and append them.
    ///
    /// Returns the number of sections appended. On a malformed section the
    /// error is reported and returned, and every section decoded before it
    /// stays appended.
    pub fn load_binary(&mut self, data: &[u8]) -> Result<usize, TableError> {
        let mut appended = 0;
        let mut offset = 0;
        while offset < data.len() {
            match Section::decode(&data[offset..]) {
                Ok((section, consumed)) => {
                    self.sections.push(section);
                    offset += consumed;
                    appended += 1;
                }
                Err(error) => {
                    self.context.report().error(&format!(
                        "binary load failed at offset {offset} after {appended} sections: {error}"
                    ));
                    return Err(error);
                }
            }
        }
        Ok(appended)
    }

    /// Parse XML text and append the sections of every table it contains.
    pub fn load_xml(&mut self, text: &str) -> Result<usize, TableError> {
        let doc = match xml::parse(text) {
            Ok(doc) => doc,
            Err(error) => {
                self.context.report().error(&format!("XML load failed: {error}"));
                return Err(error);
            }
        };
        self.load_document(doc)
    }

    /// Parse JSON text and append the sections of every table it contains.
    pub fn load_json(&mut self, text: &str) -> Result<usize, TableError> {
        let doc = match json::parse(text) {
            Ok(doc) => doc,
            Err(error) => {
                self.context.report().error(&format!("JSON load failed: {error}"));
                return Err(error);
            }
        };
        self.load_document(doc)
    }

    /// Encode every table node of a parsed document and append the result.
    ///
    /// Tables encode in document order; on a failing node the error is
    /// reported and returned, and sections from preceding nodes stay
    /// appended.
    pub fn load_document(&mut self, doc: Node) -> Result<usize, TableError> {
        if doc.name() != DOC_ROOT {
            let error = TableError::TextParseError(format!(
                "document root is <{}>, expected <{DOC_ROOT}>",
                doc.name()
            ));
            self.context.report().error(&error.to_string());
            return Err(error);
        }

        let mut appended = 0;
        for node in doc.children() {
            match self.registry.encode_node(node, &self.context) {
                Ok(sections) => {
                    appended += sections.len();
                    self.sections.extend(sections);
                }
                Err(error) => {
                    self.context.report().error(&format!(
                        "table <{}> rejected after {appended} sections: {error}",
                        node.name()
                    ));
                    return Err(error);
                }
            }
        }
        Ok(appended)
    }

    /// Encode all sections as a flat binary concatenation.
    pub fn save_binary(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.binary_size());
        for section in &self.sections {
            out.extend(section.encode());
        }
        out
    }

    /// Total encoded size of all held sections in bytes.
    pub fn binary_size(&self) -> usize {
        self.sections.iter().map(Section::encoded_len).sum()
    }

    pub fn sections_count(&self) -> usize {
        self.sections.len()
    }

    /// Tables reassembled from the current sections, complete or not.
    pub fn tables(&self) -> Vec<Table> {
        reassemble(&self.sections, self.policy, self.context.report())
    }

    /// Number of complete tables reassembled from the current sections.
    pub fn tables_count(&self) -> usize {
        self.tables().iter().filter(|t| t.is_complete()).count()
    }

    /// Build the document form of the current content.
    ///
    /// Complete tables decode through the registry; tables that fail their
    /// codec fall back to the raw generic form, and sections of incomplete
    /// tables surface as orphan entries. Both cases are reported, so no
    /// data is dropped silently. The returned tree is an independent copy
    /// of the stored state.
    pub fn to_document(&self) -> Node {
        let mut doc = Node::new(DOC_ROOT);
        for table in self.tables() {
            if !table.is_complete() {
                self.context.report().warning(&format!(
                    "incomplete table 0x{:02X}/0x{:04X} v{}: sections {:?} missing, exporting {} orphan sections",
                    table.table_id(),
                    table.table_id_extension(),
                    table.version_number(),
                    table.missing_sections(),
                    table.section_count()
                ));
                for section in table.sections() {
                    doc.add_child(generic::decode_orphan(section));
                }
                continue;
            }
            match self.registry.decode_table(&table, &self.context) {
                Ok(node) => doc.add_child(node),
                Err(error) => {
                    self.context.report().warning(&format!(
                        "table 0x{:02X}/0x{:04X} v{} failed to decode ({error}), exporting raw sections",
                        table.table_id(),
                        table.table_id_extension(),
                        table.version_number()
                    ));
                    doc.add_child(generic::decode_unknown(&table));
                }
            }
        }
        doc
    }

    /// Render the current content as XML. Read-only; stored sections are
    /// never mutated.
    pub fn to_xml(&self) -> Result<String, TableError> {
        xml::render(&self.to_document())
    }

    /// Render the current content as JSON. Read-only.
    pub fn to_json(&self) -> Result<String, TableError> {
        json::render(&self.to_document())
    }
}
