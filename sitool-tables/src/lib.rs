//! PSI/SI signaling-table engine for MPEG transport streams.
//!
//! This crate converts losslessly between three representations of
//! broadcast signaling tables: raw binary sections, XML and JSON.
//!
//! # Section Format
//!
//! ```text
//! +----------+-----------------+-------------------+-----------+---------+
//! | table_id | flags + length  | long-form header  |  payload  |  CRC32  |
//! | 1 byte   | 2 bytes         | 5 bytes, optional | variable  | 4 bytes |
//! +----------+-----------------+-------------------+-----------+---------+
//! ```
//!
//! A binary file is a flat concatenation of encoded sections with no outer
//! container. Long-form sections group into logical tables by
//! `(table_id, table_id_extension, version_number)`; per-table-type codecs
//! map complete tables to document nodes and back.
//!
//! # Example
//!
//! ```rust
//! use sitool_tables::{SectionFile, TableContext};
//!
//! let mut file = SectionFile::new(TableContext::default());
//! file.load_xml(r#"<sitool>
//!   <PAT transport_stream_id="10">
//!     <service service_id="1" program_map_PID="100"/>
//!     <service service_id="2" program_map_PID="200"/>
//!   </PAT>
//! </sitool>"#)?;
//! assert_eq!(file.sections_count(), 1);
//! assert_eq!(file.tables_count(), 1);
//! # Ok::<(), sitool_tables::TableError>(())
//! ```

pub mod codec;
pub mod context;
pub mod crc;
pub mod document;
pub mod error;
pub mod json;
pub mod report;
pub mod section;
pub mod section_file;
pub mod table;
pub mod xml;

pub use codec::{CodecRegistry, PatCodec, SdtCodec, TableCodec};
pub use context::{Charset, Dialect, TableContext};
pub use document::Node;
pub use error::TableError;
pub use report::{LogReport, NullReport, Report, Severity};
pub use section::{LongHeader, Section};
pub use section_file::{SectionFile, DOC_ROOT};
pub use table::{reassemble, DuplicatePolicy, Table};
