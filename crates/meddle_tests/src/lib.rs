//! Shared drivers for the end-to-end suites.
//!
//! Each helper runs the full pipeline (lex, parse, use resolution,
//! sanitation, name resolution, sema, lowering) and returns either the
//! printed MIR listing, verified first, or the rendered diagnostic.

use meddle_base::{Options, Session};
use meddle_mir::{lower, print, verify};
use meddle_sema::UnitManager;
use meddle_syntax::{lexer, parser};
use std::path::Path;

/// Compiles one in-memory unit with named MIR and returns its listing.
pub fn compile_named(source: &str) -> Result<String, String> {
    let listings =
        compile_files_at("/virtual", &[("test.mdl", source)], Options::named())?;
    Ok(listings.into_iter().next().expect("one unit in, one listing out"))
}

/// Compiles one in-memory unit and returns the rendered diagnostic it must
/// produce.
pub fn compile_err(source: &str) -> String {
    match compile_named(source) {
        Ok(listing) => {
            panic!("expected a diagnostic, compiled successfully:\n{listing}")
        }
        Err(rendered) => rendered,
    }
}

/// Compiles a set of in-memory units rooted at a virtual directory. Paths
/// resolve lexically, so `use` works without touching the disk.
pub fn compile_files(
    files: &[(&str, &str)],
) -> Result<Vec<String>, String> {
    compile_files_at("/virtual", files, Options::named())
}

/// Compiles a set of units rooted at an arbitrary directory (used by the
/// on-disk import tests).
pub fn compile_files_at(
    root: impl AsRef<Path>,
    files: &[(&str, &str)],
    opts: Options,
) -> Result<Vec<String>, String> {
    let root = root.as_ref();
    let mut sess = Session::new(opts);
    let mut units = UnitManager::new();
    let mut ids = Vec::with_capacity(files.len());

    for (name, source) in files {
        let path = root.join(name);
        let file = sess.sources.add(name.to_string(), path, *source);
        let unit = match units.create_unit(&sess, file) {
            Ok(unit) => unit,
            Err(diag) => return Err(diag.render(&sess.sources)),
        };
        let tokens = match lexer::lex(&mut sess, file) {
            Ok(tokens) => tokens,
            Err(diag) => return Err(diag.render(&sess.sources)),
        };
        if let Err(diag) =
            parser::parse_unit(&mut sess, units.unit_mut(unit), &tokens)
        {
            return Err(diag.render(&sess.sources));
        }
        ids.push(unit);
    }

    if let Err(diag) = units.drive(&mut sess) {
        return Err(diag.render(&sess.sources));
    }

    let mut listings = Vec::with_capacity(ids.len());
    for unit in ids {
        let segment = match lower::lower_unit(&units, &sess, unit) {
            Ok(segment) => segment,
            Err(diag) => return Err(diag.render(&sess.sources)),
        };
        verify::verify_segment(&segment)
            .map_err(|e| format!("verifier: {e}"))?;
        listings.push(print::print_segment(&segment));
    }
    Ok(listings)
}
