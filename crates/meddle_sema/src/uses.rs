//! Use resolution and the import graph.
//!
//! Depth-first traversal over the `use` edges of every unit. A dependency
//! that is already on the visiting stack is a cycle and fatal. Flat and
//! listed imports copy exported declarations into the importer's scope;
//! aliased imports stay reachable only through `Alias::Name`. Imported type
//! declarations are also registered in the importer's type context,
//! qualified for aliases.

use crate::unitman::UnitManager;
use meddle_base::{Diagnostic, Result, Session, Symbol};
use meddle_syntax::ast::{DeclId, UnitId};
use meddle_syntax::DeclKind;
use std::path::PathBuf;

pub fn resolve_uses(units: &mut UnitManager, sess: &mut Session) -> Result<()> {
    let mut visited = Vec::new();
    let mut stack = Vec::new();
    for id in units.ids() {
        if !visited.contains(&id) {
            visit(units, sess, id, &mut visited, &mut stack)?;
        }
    }
    Ok(())
}

fn visit(
    units: &mut UnitManager,
    sess: &mut Session,
    unit: UnitId,
    visited: &mut Vec<UnitId>,
    stack: &mut Vec<UnitId>,
) -> Result<()> {
    visited.push(unit);
    stack.push(unit);

    let uses = units.unit(unit).uses.clone();
    for use_decl in uses {
        let (path, loc) = {
            let data = units.decl(use_decl);
            let path = match &data.kind {
                DeclKind::Use { path, .. } => *path,
                _ => unreachable!("use list holds only use declarations"),
            };
            (path, data.loc)
        };

        let dep = match resolve_use_path(units, sess, unit, path) {
            Some(dep) => dep,
            None => {
                let spelled = sess.interner.resolve(path).to_string();
                return Err(Diagnostic::error(
                    format!("unresolved unit: {spelled}"),
                    loc,
                ));
            }
        };

        if let DeclKind::Use { target, .. } =
            &mut units.decl_mut(use_decl).kind
        {
            *target = Some(dep);
        }

        if stack.contains(&dep) {
            let importer = units.unit(unit).path.display().to_string();
            let dep_path = units.unit(dep).path.display().to_string();
            return Err(Diagnostic::error(
                format!(
                    "cyclical use in file '{importer}', using: '{dep_path}'"
                ),
                loc,
            ));
        }

        if !visited.contains(&dep) {
            visit(units, sess, dep, visited, stack)?;
        }

        resolve_imports(units, sess, use_decl, unit)?;
    }

    stack.pop();
    Ok(())
}

/// Resolves a `use` path relative to the importer's directory, appending
/// `.mdl` when absent, then canonicalising.
fn resolve_use_path(
    units: &UnitManager,
    sess: &Session,
    importer: UnitId,
    path: Symbol,
) -> Option<UnitId> {
    let mut spelled = sess.interner.resolve(path).to_string();
    if !spelled.ends_with(".mdl") {
        spelled.push_str(".mdl");
    }

    let importer_path = &units.unit(importer).path;
    let dir = importer_path.parent().unwrap_or(importer_path.as_path());
    let joined: PathBuf = dir.join(spelled);
    let key = UnitManager::canonical_key(&joined);
    units.by_path(&key)
}

fn resolve_imports(
    units: &mut UnitManager,
    sess: &mut Session,
    use_decl: DeclId,
    importer: UnitId,
) -> Result<()> {
    let (alias, symbols, target, loc) = {
        let data = units.decl(use_decl);
        match &data.kind {
            DeclKind::Use {
                alias,
                symbols,
                target,
                ..
            } => (
                *alias,
                symbols.clone(),
                target.expect("use target resolved before import"),
                data.loc,
            ),
            _ => unreachable!(),
        }
    };

    let imports: Vec<DeclId> = if symbols.is_empty() {
        units.unit(target).exports.clone()
    } else {
        let exports = units.unit(target).exports.clone();
        let mut picked = Vec::with_capacity(symbols.len());
        for name in &symbols {
            let found = exports
                .iter()
                .copied()
                .find(|d| units.decl(*d).name == *name);
            match found {
                Some(decl) => picked.push(decl),
                None => {
                    let spelled = sess.interner.resolve(*name).to_string();
                    // Distinguish a missing name from a private one.
                    let target_root = units.unit(target).root_scope;
                    let private = units
                        .unit(target)
                        .lookup_local(target_root, *name)
                        .is_some();
                    let target_path =
                        units.unit(target).path.display().to_string();
                    let msg = if private {
                        format!(
                            "name '{spelled}' exists, but is not marked public"
                        )
                    } else {
                        format!(
                            "name '{spelled}' does not exist in: '{target_path}'"
                        )
                    };
                    return Err(Diagnostic::error(msg, loc));
                }
            }
        }
        picked
    };

    for import in imports {
        let name = units.decl(import).name;
        units.unit_mut(importer).add_import(import);

        if alias.is_none() {
            let root = units.unit(importer).root_scope;
            if units
                .unit_mut(importer)
                .scope_mut(root)
                .insert(name, import)
                .is_err()
            {
                let spelled = sess.interner.resolve(name).to_string();
                return Err(Diagnostic::error(
                    format!("redeclaration of '{spelled}'"),
                    loc,
                ));
            }
        }

        // Imported type declarations land in the importer's type context,
        // under the qualified name for aliased imports.
        let defined_ty = match &units.decl(import).kind {
            DeclKind::Struct { ty, .. } | DeclKind::Enum { ty, .. } => {
                Some(*ty)
            }
            _ => None,
        };
        if let Some(ty) = defined_ty {
            let key = match alias {
                Some(alias) => {
                    let qualified = format!(
                        "{}::{}",
                        sess.interner.resolve(alias),
                        sess.interner.resolve(name)
                    );
                    sess.interner.intern(&qualified)
                }
                None => name,
            };
            if units
                .unit_mut(importer)
                .types
                .import_named(key, ty)
                .is_err()
            {
                let spelled = sess.interner.resolve(key).to_string();
                return Err(Diagnostic::error(
                    format!("type already exists: {spelled}"),
                    loc,
                ));
            }
        }
    }

    Ok(())
}
