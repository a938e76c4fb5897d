//! Diagnostics with source locations.
//!
//! All user-visible failures in the compiler are [`Diagnostic`] values. A
//! diagnostic is fatal by policy: phases return [`Result`] and the driver
//! prints the first error and exits. Rendering needs the [`SourceMap`] to
//! turn a [`FileId`] into a file name, hence [`Diagnostic::render`] rather
//! than a plain `Display` for the located form.

use crate::source::{SourceLoc, SourceMap};
use std::fmt;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        f.write_str(s)
    }
}

/// A diagnostic message, optionally anchored to a source location.
#[derive(Clone, Debug)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub loc: Option<SourceLoc>,
}

impl Diagnostic {
    pub fn new(
        severity: Severity,
        message: impl Into<String>,
        loc: Option<SourceLoc>,
    ) -> Self {
        Self {
            severity,
            message: message.into(),
            loc,
        }
    }

    /// A fatal error at a location.
    pub fn error(message: impl Into<String>, loc: SourceLoc) -> Self {
        Self::new(Severity::Error, message, Some(loc))
    }

    /// A fatal error with no location (driver-level failures).
    pub fn bare(message: impl Into<String>) -> Self {
        Self::new(Severity::Error, message, None)
    }

    /// Renders as `<file>:<line>:<col>: <severity>: <message>`, or
    /// `meddle: <severity>: <message>` when there is no location.
    pub fn render(&self, sources: &SourceMap) -> String {
        match self.loc {
            Some(loc) => format!(
                "{}:{}:{}: {}: {}",
                sources.file(loc.file).name,
                loc.line,
                loc.col,
                self.severity,
                self.message
            ),
            None => format!("meddle: {}: {}", self.severity, self.message),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.loc {
            Some(loc) => write!(
                f,
                "{}:{}: {}: {}",
                loc.line, loc.col, self.severity, self.message
            ),
            None => write!(f, "meddle: {}: {}", self.severity, self.message),
        }
    }
}

impl std::error::Error for Diagnostic {}

/// Alias for `std::result::Result<T, Diagnostic>`.
pub type Result<T> = std::result::Result<T, Diagnostic>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::SourceMap;

    #[test]
    fn render_with_location() {
        let mut sources = SourceMap::new();
        let file = sources.add("main.mdl", "/tmp/main.mdl", "x");
        let loc = SourceLoc {
            file,
            line: 3,
            col: 7,
        };
        let diag = Diagnostic::error("expected ';' after variable", loc);
        assert_eq!(
            diag.render(&sources),
            "main.mdl:3:7: error: expected ';' after variable"
        );
    }

    #[test]
    fn render_without_location() {
        let sources = SourceMap::new();
        let diag = Diagnostic::bare("no input files");
        assert_eq!(diag.render(&sources), "meddle: error: no input files");
    }

    #[test]
    fn severity_spelling() {
        assert_eq!(Severity::Warning.to_string(), "warning");
    }
}
