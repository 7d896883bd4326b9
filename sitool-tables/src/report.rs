//! Diagnostic report sink.
//!
//! The engine never prints; recoverable anomalies (duplicate section numbers,
//! unknown table ids, malformed input) are sent to a [`Report`] so the
//! embedder decides presentation.

/// Message severity, most severe first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warning,
    Info,
    Verbose,
}

impl Severity {
    /// Conventional message prefix for this severity.
    pub fn header(self) -> &'static str {
        match self {
            Severity::Error => "Error: ",
            Severity::Warning => "Warning: ",
            Severity::Info => "",
            Severity::Verbose => "",
        }
    }
}

/// Receiver for diagnostic messages emitted by the engine.
pub trait Report {
    /// Log one message at the given severity.
    fn log(&self, severity: Severity, message: &str);

    fn error(&self, message: &str) {
        self.log(Severity::Error, message);
    }

    fn warning(&self, message: &str) {
        self.log(Severity::Warning, message);
    }

    fn info(&self, message: &str) {
        self.log(Severity::Info, message);
    }

    fn verbose(&self, message: &str) {
        self.log(Severity::Verbose, message);
    }
}

/// Report sink that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullReport;

impl Report for NullReport {
    fn log(&self, _severity: Severity, _message: &str) {}
}

/// Report sink that forwards to the `log` crate at matching levels.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogReport;

impl Report for LogReport {
    fn log(&self, severity: Severity, message: &str) {
        match severity {
            Severity::Error => log::error!("{message}"),
            Severity::Warning => log::warn!("{message}"),
            Severity::Info => log::info!("{message}"),
            Severity::Verbose => log::debug!("{message}"),
        }
    }
}
