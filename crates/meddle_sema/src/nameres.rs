//! Two-phase name resolution.
//!
//! The shallow pass visits top-level declarations only and verifies their
//! declared types resolved during sanitation; because the parser already
//! bound every top-level name into its unit scope, this is what makes
//! forward references work. The recursive pass walks function bodies,
//! struct members and initialisers, binding every `Ref` and `Spec` node to
//! a concrete declaration. Field and method binding needs expression types
//! and is done by sema.

use crate::unitman::UnitManager;
use meddle_base::{Diagnostic, Result, Session, Symbol};
use meddle_syntax::ast::{DeclId, ExprId, ScopeId, StmtId, TypeId};
use meddle_syntax::{DeclKind, ExprKind, Runes, StmtKind, TypeKind};

pub fn run_shallow(units: &mut UnitManager, sess: &mut Session) -> Result<()> {
    for unit in units.ids() {
        let items = units.unit(unit).items.clone();
        for item in items {
            shallow_decl(units, sess, item)?;
        }
    }
    Ok(())
}

/// Verifies the declared types of a top-level declaration are concrete.
fn shallow_decl(
    units: &UnitManager,
    sess: &Session,
    decl: DeclId,
) -> Result<()> {
    let data = units.decl(decl);
    let loc = data.loc;
    let tys: Vec<TypeId> = match &data.kind {
        DeclKind::Function { ty, .. } => vec![*ty],
        DeclKind::Var { ty, .. } => ty.iter().copied().collect(),
        DeclKind::Struct { fields, .. } => fields
            .iter()
            .map(|f| match &units.decl(*f).kind {
                DeclKind::Field { ty, .. } => *ty,
                _ => unreachable!("struct field list holds field decls"),
            })
            .collect(),
        DeclKind::Enum { underlying, .. } => vec![*underlying],
        _ => Vec::new(),
    };
    for ty in tys {
        check_concrete(units, sess, ty, loc)?;
    }
    Ok(())
}

/// No unresolved deferred type may remain reachable after sanitation.
fn check_concrete(
    units: &UnitManager,
    sess: &Session,
    ty: TypeId,
    loc: meddle_base::SourceLoc,
) -> Result<()> {
    match units.type_kind(units.canon(ty)) {
        TypeKind::Deferred { name, .. } => {
            let spelled = sess.interner.resolve(*name).to_string();
            Err(Diagnostic::error(
                format!("unresolved type: {spelled}"),
                loc,
            ))
        }
        TypeKind::Array { elem, .. } => {
            check_concrete(units, sess, *elem, loc)
        }
        TypeKind::Pointer { pointee } => {
            check_concrete(units, sess, *pointee, loc)
        }
        TypeKind::Function { params, ret } => {
            for p in params {
                check_concrete(units, sess, *p, loc)?;
            }
            check_concrete(units, sess, *ret, loc)
        }
        _ => Ok(()),
    }
}

pub fn run_recurse(units: &mut UnitManager, sess: &mut Session) -> Result<()> {
    for unit in units.ids() {
        let items = units.unit(unit).items.clone();
        for item in items {
            resolve_decl(units, sess, item)?;
        }
    }
    Ok(())
}

pub fn resolve_decl(
    units: &mut UnitManager,
    sess: &mut Session,
    decl: DeclId,
) -> Result<()> {
    let kind = units.decl(decl).kind.clone();
    match kind {
        DeclKind::Function { scope, body, .. } => {
            if let Some(body) = body {
                resolve_stmt(units, sess, body, scope)?;
            }
        }
        DeclKind::Var { init, .. } => {
            let scope = units.decl(decl).scope;
            if let Some(init) = init {
                resolve_expr(units, sess, init, scope)?;
            }
        }
        DeclKind::Struct {
            scope,
            fields,
            methods,
            ..
        } => {
            for field in fields {
                if let DeclKind::Field {
                    init: Some(init), ..
                } = units.decl(field).kind
                {
                    resolve_expr(units, sess, init, scope)?;
                }
            }
            for method in methods {
                resolve_decl(units, sess, method)?;
            }
        }
        // Template bodies resolve against their defining scopes; the clone
        // step remaps pins onto the specialised declarations.
        DeclKind::TemplateFunction { inner, .. }
        | DeclKind::TemplateStruct { inner, .. } => {
            resolve_decl(units, sess, inner)?;
        }
        DeclKind::Enum { .. }
        | DeclKind::Use { .. }
        | DeclKind::EnumVariant { .. }
        | DeclKind::Param { .. }
        | DeclKind::Field { .. }
        | DeclKind::TemplateParam { .. } => {}
    }
    Ok(())
}

fn resolve_stmt(
    units: &mut UnitManager,
    sess: &mut Session,
    stmt: StmtId,
    scope: ScopeId,
) -> Result<()> {
    let kind = units.stmt(stmt).kind.clone();
    match kind {
        StmtKind::Compound { scope, stmts } => {
            for s in stmts {
                resolve_stmt(units, sess, s, scope)?;
            }
        }
        StmtKind::If {
            cond,
            then_body,
            else_body,
        } => {
            resolve_expr(units, sess, cond, scope)?;
            resolve_stmt(units, sess, then_body, scope)?;
            if let Some(else_body) = else_body {
                resolve_stmt(units, sess, else_body, scope)?;
            }
        }
        StmtKind::Until { cond, body } => {
            resolve_expr(units, sess, cond, scope)?;
            resolve_stmt(units, sess, body, scope)?;
        }
        StmtKind::Match {
            subject,
            cases,
            default,
        } => {
            resolve_expr(units, sess, subject, scope)?;
            for case in cases {
                resolve_expr(units, sess, case.pattern, scope)?;
                resolve_stmt(units, sess, case.body, scope)?;
            }
            if let Some(default) = default {
                resolve_stmt(units, sess, default, scope)?;
            }
        }
        StmtKind::Ret { expr } => {
            if let Some(expr) = expr {
                resolve_expr(units, sess, expr, scope)?;
            }
        }
        StmtKind::DeclStmt { decl } => {
            let (name, loc, init) = {
                let data = units.decl(decl);
                let init = match &data.kind {
                    DeclKind::Var { init, .. } => *init,
                    _ => None,
                };
                (data.name, data.loc, init)
            };
            check_shadowing(units, sess, decl, name, loc)?;
            if let Some(init) = init {
                resolve_expr(units, sess, init, scope)?;
            }
        }
        StmtKind::ExprStmt { expr } => {
            resolve_expr(units, sess, expr, scope)?;
        }
        StmtKind::Break | StmtKind::Continue => {}
    }
    Ok(())
}

/// Inner scopes may not redeclare a name visible in an outer scope.
fn check_shadowing(
    units: &UnitManager,
    sess: &Session,
    decl: DeclId,
    name: Symbol,
    loc: meddle_base::SourceLoc,
) -> Result<()> {
    let own_scope = units.decl(decl).scope;
    let parent = units.unit(own_scope.unit).scope(own_scope).parent;
    if let Some(parent) = parent {
        if units.lookup(parent, name).is_some() {
            let spelled = sess.interner.resolve(name).to_string();
            return Err(Diagnostic::error(
                format!("declaration of '{spelled}' shadows an outer declaration"),
                loc,
            ));
        }
    }
    Ok(())
}

fn resolve_expr(
    units: &mut UnitManager,
    sess: &mut Session,
    expr: ExprId,
    scope: ScopeId,
) -> Result<()> {
    let kind = units.expr(expr).kind.clone();
    let loc = units.expr(expr).loc;
    match kind {
        ExprKind::Ref { name, decl } => {
            if decl.is_none() {
                let found = units.lookup(scope, name);
                match found {
                    Some(found) => {
                        if let ExprKind::Ref { decl, .. } =
                            &mut units.expr_mut(expr).kind
                        {
                            *decl = Some(found);
                        }
                    }
                    None => {
                        let spelled =
                            sess.interner.resolve(name).to_string();
                        return Err(Diagnostic::error(
                            format!("unresolved reference: {spelled}"),
                            loc,
                        ));
                    }
                }
            }
        }
        ExprKind::Binary { lhs, rhs, .. } => {
            resolve_expr(units, sess, lhs, scope)?;
            resolve_expr(units, sess, rhs, scope)?;
        }
        ExprKind::Unary { expr: inner, .. }
        | ExprKind::Cast { expr: inner }
        | ExprKind::Paren { expr: inner } => {
            resolve_expr(units, sess, inner, scope)?;
        }
        ExprKind::Access { base, .. } => {
            resolve_expr(units, sess, base, scope)?;
        }
        ExprKind::Subscript { base, index } => {
            resolve_expr(units, sess, base, scope)?;
            resolve_expr(units, sess, index, scope)?;
        }
        ExprKind::Call { callee, args, .. } => {
            resolve_expr(units, sess, callee, scope)?;
            for arg in args {
                resolve_expr(units, sess, arg, scope)?;
            }
        }
        ExprKind::MethodCall { base, args, .. } => {
            resolve_expr(units, sess, base, scope)?;
            for arg in args {
                resolve_expr(units, sess, arg, scope)?;
            }
        }
        ExprKind::Spec {
            qualifier,
            qual_decl,
            member,
            decl,
        } => {
            if decl.is_none() {
                resolve_spec(
                    units, sess, expr, scope, qualifier, qual_decl, member,
                )?;
            }
        }
        ExprKind::StructInit {
            name,
            decl,
            fields,
            ..
        } => {
            if decl.is_none() {
                let found = units.lookup(scope, name);
                let ok = found.is_some_and(|d| {
                    matches!(
                        units.decl(d).kind,
                        DeclKind::Struct { .. }
                            | DeclKind::TemplateStruct { .. }
                    )
                });
                if !ok {
                    let spelled = sess.interner.resolve(name).to_string();
                    return Err(Diagnostic::error(
                        format!("unknown struct: {spelled}"),
                        loc,
                    ));
                }
                if let ExprKind::StructInit { decl, .. } =
                    &mut units.expr_mut(expr).kind
                {
                    *decl = found;
                }
            }
            for (_, value) in fields {
                resolve_expr(units, sess, value, scope)?;
            }
        }
        ExprKind::ArrayInit { elems } => {
            for elem in elems {
                resolve_expr(units, sess, elem, scope)?;
            }
        }
        ExprKind::Syscall { args, .. } => {
            for arg in args {
                resolve_expr(units, sess, arg, scope)?;
            }
        }
        ExprKind::Bool(_)
        | ExprKind::Int(_)
        | ExprKind::Float(_)
        | ExprKind::Char(_)
        | ExprKind::Str(_)
        | ExprKind::Nil
        | ExprKind::Sizeof { .. } => {}
    }
    Ok(())
}

fn resolve_spec(
    units: &mut UnitManager,
    sess: &mut Session,
    expr: ExprId,
    scope: ScopeId,
    qualifier: Symbol,
    qual_decl: Option<DeclId>,
    member: Symbol,
) -> Result<()> {
    let loc = units.expr(expr).loc;
    let qual = match qual_decl.or_else(|| units.lookup(scope, qualifier)) {
        Some(qual) => qual,
        None => {
            let spelled = sess.interner.resolve(qualifier).to_string();
            return Err(Diagnostic::error(
                format!("unresolved reference: {spelled}"),
                loc,
            ));
        }
    };

    let resolved: DeclId = match units.decl(qual).kind.clone() {
        DeclKind::Enum { variants, .. } => {
            match variants
                .iter()
                .copied()
                .find(|v| units.decl(*v).name == member)
            {
                Some(variant) => variant,
                None => {
                    let m = sess.interner.resolve(member).to_string();
                    let e = sess.interner.resolve(qualifier).to_string();
                    return Err(Diagnostic::error(
                        format!("unknown variant '{m}' of enum '{e}'"),
                        loc,
                    ));
                }
            }
        }
        DeclKind::Struct { methods, .. } => {
            let found = methods.iter().copied().find(|m| {
                units.decl(*m).name == member
                    && units.decl(*m).runes.contains(Runes::ASSOCIATED)
            });
            match found {
                Some(func) => func,
                None => {
                    let m = sess.interner.resolve(member).to_string();
                    let s = sess.interner.resolve(qualifier).to_string();
                    return Err(Diagnostic::error(
                        format!(
                            "no associated function '{m}' on struct '{s}'"
                        ),
                        loc,
                    ));
                }
            }
        }
        DeclKind::Use { target, .. } => {
            let target = target.expect("use resolved before name resolution");
            let exports = units.unit(target).exports.clone();
            let found = exports
                .iter()
                .copied()
                .find(|d| units.decl(*d).name == member);
            match found {
                Some(decl) => decl,
                None => {
                    let m = sess.interner.resolve(member).to_string();
                    let path = units.unit(target).path.display().to_string();
                    return Err(Diagnostic::error(
                        format!("name '{m}' does not exist in: '{path}'"),
                        loc,
                    ));
                }
            }
        }
        _ => {
            let spelled = sess.interner.resolve(qualifier).to_string();
            return Err(Diagnostic::error(
                format!(
                    "'{spelled}' cannot be used as a '::' qualifier"
                ),
                loc,
            ));
        }
    };

    if let ExprKind::Spec {
        decl, qual_decl, ..
    } = &mut units.expr_mut(expr).kind
    {
        *decl = Some(resolved);
        *qual_decl = Some(qual);
    }
    Ok(())
}
