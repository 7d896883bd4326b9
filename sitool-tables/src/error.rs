//! Error types for the section and table engine.

use thiserror::Error;

/// Errors that can occur while decoding, reassembling or converting tables.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TableError {
    /// Binary section structure violates the fixed layout.
    #[error("Malformed section: {0}")]
    MalformedSection(String),

    /// Section CRC32 does not match the computed value.
    #[error("Malformed section: CRC mismatch (stored 0x{stored:08X}, computed 0x{computed:08X})")]
    CrcMismatch { stored: u32, computed: u32 },

    /// A logical table is missing one or more sections.
    #[error("Incomplete table 0x{table_id:02X}/0x{table_id_extension:04X} v{version}: section {missing} missing")]
    IncompleteTable {
        table_id: u8,
        table_id_extension: u16,
        version: u8,
        missing: u8,
    },

    /// No codec is registered for the given element name.
    #[error("Unknown table type: <{0}>")]
    UnknownTableType(String),

    /// Malformed XML or JSON text input.
    #[error("Text parse error: {0}")]
    TextParseError(String),

    /// A table node is missing a required attribute or carries an unparsable value.
    #[error("Attribute schema mismatch in <{element}>: {detail}")]
    AttributeSchemaMismatch { element: String, detail: String },
}

impl TableError {
    /// Shorthand for a [`TableError::MalformedSection`] with a formatted reason.
    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        TableError::MalformedSection(reason.into())
    }

    /// Shorthand for a [`TableError::AttributeSchemaMismatch`].
    pub(crate) fn schema(element: impl Into<String>, detail: impl Into<String>) -> Self {
        TableError::AttributeSchemaMismatch {
            element: element.into(),
            detail: detail.into(),
        }
    }
}
