//! # meddle-base
//!
//! Structural atoms for the meddle compiler.
//!
//! This crate provides the foundational types used by every phase of the
//! pipeline:
//!
//! - [`Interner`]/[`Symbol`] — string interning for O(1) name equality
//! - [`SourceMap`]/[`SourceLoc`] — file registry and source locations
//! - [`Diagnostic`]/[`Result`] — errors carrying a source location
//! - [`Options`] — the compile options shared by all phases
//!
//! It has no knowledge of tokens, types or MIR; higher crates build on it.

pub mod diag;
pub mod intern;
pub mod options;
pub mod source;

pub use diag::{Diagnostic, Result, Severity};
pub use intern::{Interner, Symbol};
pub use options::Options;
pub use source::{FileId, SourceFile, SourceLoc, SourceMap};

/// The shared per-invocation state threaded through every phase.
pub struct Session {
    pub sources: SourceMap,
    pub interner: Interner,
    pub opts: Options,
    /// Warnings collected during compilation, rendered by the driver.
    pub warnings: Vec<Diagnostic>,
}

impl Session {
    pub fn new(opts: Options) -> Self {
        Self {
            sources: SourceMap::new(),
            interner: Interner::new(),
            opts,
            warnings: Vec::new(),
        }
    }

    pub fn warn(&mut self, message: impl Into<String>, loc: SourceLoc) {
        self.warnings
            .push(Diagnostic::new(Severity::Warning, message, Some(loc)));
    }
}
