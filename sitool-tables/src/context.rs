//! Interpretation context shared by table codecs.
//!
//! The context carries the default parameters that the binary layout itself
//! does not encode: which character set string fields use, which standards
//! dialect governs defaults, and the report sink for diagnostics. It is
//! passed once at [`SectionFile`](crate::SectionFile) construction and read
//! only from then on.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::report::{NullReport, Report};

/// Character set used to decode and encode string fields in table payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Charset {
    /// Latin-1 (decoded through the windows-1252 superset).
    #[default]
    Latin1,
    /// UTF-8.
    Utf8,
    /// Shift_JIS.
    ShiftJis,
}

impl Charset {
    /// Decode `bytes` to a string, replacing unmappable sequences.
    pub fn decode(self, bytes: &[u8]) -> String {
        let encoding = self.encoding();
        let (text, _, _) = encoding.decode(bytes);
        text.into_owned()
    }

    /// Encode `text` to bytes, replacing unmappable characters.
    pub fn encode(self, text: &str) -> Vec<u8> {
        let encoding = self.encoding();
        let (bytes, _, _) = encoding.encode(text);
        bytes.into_owned()
    }

    fn encoding(self) -> &'static encoding_rs::Encoding {
        match self {
            Charset::Latin1 => encoding_rs::WINDOWS_1252,
            Charset::Utf8 => encoding_rs::UTF_8,
            Charset::ShiftJis => encoding_rs::SHIFT_JIS,
        }
    }
}

/// Broadcast standards dialect governing default interpretation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Dialect {
    /// DVB (ETSI EN 300 468).
    #[default]
    Dvb,
    /// ISDB (ARIB STD-B10).
    Isdb,
    /// ATSC (A/65).
    Atsc,
}

impl Dialect {
    /// Default character set for string fields under this dialect.
    pub fn default_charset(self) -> Charset {
        match self {
            Dialect::Dvb => Charset::Latin1,
            Dialect::Isdb => Charset::ShiftJis,
            Dialect::Atsc => Charset::Utf8,
        }
    }
}

/// Default interpretation parameters plus the diagnostic sink.
#[derive(Clone)]
pub struct TableContext {
    report: Arc<dyn Report + Send + Sync>,
    charset: Charset,
    dialect: Dialect,
    region: Option<String>,
}

impl TableContext {
    /// Create a context with the given report sink and DVB defaults.
    pub fn new(report: Arc<dyn Report + Send + Sync>) -> Self {
        Self {
            report,
            charset: Charset::default(),
            dialect: Dialect::default(),
            region: None,
        }
    }

    /// Create a context for a dialect, using its default character set.
    pub fn for_dialect(report: Arc<dyn Report + Send + Sync>, dialect: Dialect) -> Self {
        Self {
            report,
            charset: dialect.default_charset(),
            dialect,
            region: None,
        }
    }

    /// Override the default character set.
    pub fn with_charset(mut self, charset: Charset) -> Self {
        self.charset = charset;
        self
    }

    /// Override the default region.
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn report(&self) -> &(dyn Report + Send + Sync) {
        self.report.as_ref()
    }

    pub fn charset(&self) -> Charset {
        self.charset
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn region(&self) -> Option<&str> {
        self.region.as_deref()
    }
}

impl Default for TableContext {
    fn default() -> Self {
        Self::new(Arc::new(NullReport))
    }
}

impl std::fmt::Debug for TableContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TableContext")
            .field("charset", &self.charset)
            .field("dialect", &self.dialect)
            .field("region", &self.region)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_charset_latin1_round_trip() {
        let text = "Télévision";
        let bytes = Charset::Latin1.encode(text);
        assert_eq!(bytes.len(), text.chars().count());
        assert_eq!(Charset::Latin1.decode(&bytes), text);
    }

    #[test]
    fn test_charset_utf8_round_trip() {
        let text = "NHK総合";
        let bytes = Charset::Utf8.encode(text);
        assert_eq!(Charset::Utf8.decode(&bytes), text);
    }

    #[test]
    fn test_dialect_default_charsets() {
        assert_eq!(Dialect::Dvb.default_charset(), Charset::Latin1);
        assert_eq!(Dialect::Isdb.default_charset(), Charset::ShiftJis);
        assert_eq!(Dialect::Atsc.default_charset(), Charset::Utf8);
    }
}
