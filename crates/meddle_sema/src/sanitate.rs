//! Type sanitation: binding deferred type names.
//!
//! Runs once, after every file is parsed and imports are wired. Each
//! deferred type resolves its base name against the unit's named types
//! (primitives, local structs and enums, imports) or, when it carries
//! template arguments, against a template-struct declaration visible from
//! the unit's root scope. An unresolved deferred type is fatal at the
//! location that spelled it. Function types are then re-walked so deferred
//! parameter and return entries point at their concretes.

use crate::unitman::UnitManager;
use meddle_base::{Diagnostic, Result, Session};
use meddle_syntax::ast::{TypeId, UnitId};
use meddle_syntax::{DeclKind, TypeKind};

pub fn sanitate(units: &mut UnitManager, sess: &mut Session) -> Result<()> {
    for unit in units.ids() {
        let deferred = units.unit(unit).types.deferred.clone();
        for ty in deferred {
            resolve_deferred(units, sess, unit, ty)?;
        }
        rewalk_function_types(units, unit);
    }
    Ok(())
}

fn resolve_deferred(
    units: &mut UnitManager,
    sess: &Session,
    unit: UnitId,
    ty: TypeId,
) -> Result<()> {
    let (name, args, loc) = match units.type_kind(ty) {
        TypeKind::Deferred {
            name,
            args,
            loc,
            resolved: None,
        } => (*name, args.clone(), *loc),
        // Already resolved (shared spelling sites do not exist, but be
        // tolerant of repeated sanitation).
        _ => return Ok(()),
    };

    // A template struct visible from the root scope takes priority over
    // the name table (which also holds the template's inner placeholder).
    let root = units.unit(unit).root_scope;
    let template = units.unit(unit).lookup(root, name).filter(|decl| {
        matches!(units.decl(*decl).kind, DeclKind::TemplateStruct { .. })
    });

    let target = if let Some(template) = template {
        if args.is_empty() {
            let spelled = sess.interner.resolve(name).to_string();
            return Err(Diagnostic::error(
                format!("missing template arguments for '{spelled}'"),
                loc,
            ));
        }
        let dependent = args.iter().any(|a| units.type_has_params(*a));
        let ctx = &mut units.unit_mut(unit).types;
        if dependent {
            ctx.intern_dependent(template, args)
        } else {
            ctx.intern_spec(template, args)
        }
    } else if let Some(named) = units.unit(unit).types.named(name) {
        if !args.is_empty() {
            let spelled = sess.interner.resolve(name).to_string();
            return Err(Diagnostic::error(
                format!("'{spelled}' is not a template"),
                loc,
            ));
        }
        named
    } else {
        let spelled = sess.interner.resolve(name).to_string();
        return Err(Diagnostic::error(
            format!("unresolved type: {spelled}"),
            loc,
        ));
    };

    let target = units.canon(target);
    if let TypeKind::Deferred { resolved, .. } =
        &mut units.unit_mut(unit).types.get_mut(ty).kind
    {
        *resolved = Some(target);
    }
    Ok(())
}

/// Replaces deferred parameter and return entries of function types with
/// their resolved concretes.
fn rewalk_function_types(units: &mut UnitManager, unit: UnitId) {
    let ids: Vec<TypeId> = units.unit(unit).types.all_ids().collect();
    for id in ids {
        let rewritten = match units.type_kind(id) {
            TypeKind::Function { params, ret } => {
                let params = params.clone();
                let ret = *ret;
                let new_params: Vec<TypeId> =
                    params.iter().map(|p| units.canon(*p)).collect();
                let new_ret = units.canon(ret);
                if new_params == params && new_ret == ret {
                    None
                } else {
                    Some((new_params, new_ret))
                }
            }
            _ => None,
        };
        if let Some((new_params, new_ret)) = rewritten {
            if let TypeKind::Function { params, ret } =
                &mut units.unit_mut(unit).types.get_mut(id).kind
            {
                *params = new_params;
                *ret = new_ret;
            }
        }
    }
}
