//! Per-table-type codecs between binary tables and document nodes.
//!
//! Each codec is keyed two ways: by numeric table id for the binary
//! direction and by element name for the text direction. Table ids without
//! a registered codec decode to the lossless generic form
//! (see [`generic`]); element names without a codec fail with
//! [`TableError::UnknownTableType`].

use std::collections::HashMap;
use std::sync::Arc;

use crate::context::TableContext;
use crate::document::Node;
use crate::error::TableError;
use crate::section::Section;
use crate::table::Table;

pub mod generic;
mod pat;
mod sdt;

pub use pat::PatCodec;
pub use sdt::SdtCodec;

/// Well-known table ids.
pub mod table_id {
    /// Program Association Table.
    pub const PAT: u8 = 0x00;
    /// Service Description Table (actual transport stream).
    pub const SDT_ACTUAL: u8 = 0x42;
}

/// Bidirectional mapping between the logical fields of one table type and
/// its document representation.
pub trait TableCodec: Send + Sync {
    /// Numeric tag for the binary direction.
    fn table_id(&self) -> u8;

    /// Element tag for the text direction.
    fn element_name(&self) -> &'static str;

    /// Decode a complete table into one document node.
    fn decode(&self, table: &Table, context: &TableContext) -> Result<Node, TableError>;

    /// Encode a document node into one or more sections.
    fn encode(&self, node: &Node, context: &TableContext) -> Result<Vec<Section>, TableError>;
}

/// Registry of table codecs, extensible without touching the engine.
pub struct CodecRegistry {
    codecs: Vec<Arc<dyn TableCodec>>,
    by_id: HashMap<u8, usize>,
    by_name: HashMap<&'static str, usize>,
}

impl CodecRegistry {
    /// An empty registry. Every table decodes to the generic form and no
    /// element name encodes.
    pub fn new() -> Self {
        Self {
            codecs: Vec::new(),
            by_id: HashMap::new(),
            by_name: HashMap::new(),
        }
    }

    /// Registry with the built-in codecs installed.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(PatCodec));
        registry.register(Arc::new(SdtCodec));
        registry
    }

    /// Register a codec, replacing any previous binding of its table id or
    /// element name.
    pub fn register(&mut self, codec: Arc<dyn TableCodec>) {
        let index = self.codecs.len();
        self.by_id.insert(codec.table_id(), index);
        self.by_name.insert(codec.element_name(), index);
        self.codecs.push(codec);
    }

    pub fn codec_for_table_id(&self, table_id: u8) -> Option<&dyn TableCodec> {
        self.by_id.get(&table_id).map(|&i| self.codecs[i].as_ref())
    }

    pub fn codec_for_element(&self, name: &str) -> Option<&dyn TableCodec> {
        self.by_name.get(name).map(|&i| self.codecs[i].as_ref())
    }

    /// Decode a table through its codec, falling back to the lossless
    /// generic node for unregistered table ids.
    pub fn decode_table(&self, table: &Table, context: &TableContext) -> Result<Node, TableError> {
        match self.codec_for_table_id(table.table_id()) {
            Some(codec) => codec.decode(table, context),
            None => {
                context.report().verbose(&format!(
                    "no codec for table id 0x{:02X}, exporting raw sections",
                    table.table_id()
                ));
                Ok(generic::decode_unknown(table))
            }
        }
    }

    /// Encode a document node through the codec matching its element name.
    pub fn encode_node(&self, node: &Node, context: &TableContext) -> Result<Vec<Section>, TableError> {
        if node.name() == generic::UNKNOWN_TABLE {
            return generic::encode_unknown(node);
        }
        if node.name() == generic::ORPHAN_SECTION {
            return generic::encode_orphan(node).map(|section| vec![section]);
        }
        match self.codec_for_element(node.name()) {
            Some(codec) => codec.encode(node, context),
            None => Err(TableError::UnknownTableType(node.name().to_string())),
        }
    }
}

impl Default for CodecRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Error for a table that cannot be decoded because sections are missing.
pub(crate) fn incomplete_error(table: &Table) -> TableError {
    TableError::IncompleteTable {
        table_id: table.table_id(),
        table_id_extension: table.table_id_extension(),
        version: table.version_number(),
        missing: table.missing_sections().first().copied().unwrap_or(0),
    }
}
