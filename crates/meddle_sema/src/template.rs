//! Template instantiation: on-demand monomorphisation.
//!
//! `fetch_specialization` looks the argument list up in the template's spec
//! cache; on a miss it substitutes the concrete types through the templated
//! declaration (rewriting only at template-parameter leaves), deep-clones
//! the declaration (scope, parameters, fields, methods, body) into the
//! template's owning unit, and registers the specialisation both with the
//! template and in that unit's top-level list, preserving instantiation
//! order for deterministic emission.

use crate::unitman::UnitManager;
use meddle_base::{Diagnostic, Result, Session, SourceLoc};
use meddle_syntax::ast::{
    DeclId, ExprId, ScopeId, StmtId, TypeId, UnitId,
};
use meddle_syntax::scope::ScopeData;
use meddle_syntax::{
    DeclData, DeclKind, ExprData, ExprKind, MatchCase, SpecInfo, StmtData,
    StmtKind, TypeKind,
};
use std::collections::HashMap;

/// The result of a fetch: the specialisation and whether it was created by
/// this call (freshly created specs still need sema).
pub struct Fetched {
    pub decl: DeclId,
    pub created: bool,
}

pub fn fetch_specialization(
    units: &mut UnitManager,
    sess: &mut Session,
    template: DeclId,
    args: &[TypeId],
    loc: SourceLoc,
) -> Result<Fetched> {
    let args: Vec<TypeId> = args.iter().map(|a| units.canon(*a)).collect();

    let (params, inner, is_struct) = match &units.decl(template).kind {
        DeclKind::TemplateFunction { params, inner, .. } => {
            (params.clone(), *inner, false)
        }
        DeclKind::TemplateStruct { params, inner, .. } => {
            (params.clone(), *inner, true)
        }
        _ => {
            return Err(Diagnostic::error(
                "reference is not a template",
                loc,
            ))
        }
    };

    if params.len() != args.len() {
        let name = sess
            .interner
            .resolve(units.decl(template).name)
            .to_string();
        return Err(Diagnostic::error(
            format!(
                "wrong number of template arguments for '{}': expected {}, found {}",
                name,
                params.len(),
                args.len()
            ),
            loc,
        ));
    }

    if let Some(existing) = units.find_specialization(template, &args) {
        return Ok(Fetched {
            decl: existing,
            created: false,
        });
    }

    // Build the parameter-type → argument mapping.
    let mut mapping = HashMap::new();
    for (param, arg) in params.iter().zip(&args) {
        if let DeclKind::TemplateParam { ty, .. } = units.decl(*param).kind {
            mapping.insert(ty, *arg);
        }
    }

    let concrete = concrete_name(units, sess, template, &args);

    let spec = if is_struct {
        clone_struct_spec(units, sess, template, inner, &args, &mapping, concrete)?
    } else {
        clone_function_spec(
            units, sess, template, inner, &args, &mapping, concrete, None,
        )?
    };

    // Register with the template and the owning unit, in that order.
    match &mut units.decl_mut(template).kind {
        DeclKind::TemplateFunction { specs, .. }
        | DeclKind::TemplateStruct { specs, .. } => specs.push(spec),
        _ => unreachable!(),
    }
    units.unit_mut(template.unit).add_item(spec);

    Ok(Fetched {
        decl: spec,
        created: true,
    })
}

fn concrete_name(
    units: &UnitManager,
    sess: &mut Session,
    template: DeclId,
    args: &[TypeId],
) -> meddle_base::Symbol {
    let base = sess.interner.resolve(units.decl(template).name).to_string();
    let args = args
        .iter()
        .map(|a| units.type_name(*a, &sess.interner))
        .collect::<Vec<_>>()
        .join(", ");
    sess.interner.intern(&format!("{base}<{args}>"))
}

/// Substitutes concrete types through a type. Rewrites happen only at
/// template-parameter leaves; containers re-intern in the template's unit.
pub fn subst_type(
    units: &mut UnitManager,
    unit: UnitId,
    mapping: &HashMap<TypeId, TypeId>,
    ty: TypeId,
) -> TypeId {
    if let Some(&mapped) = mapping.get(&ty) {
        return mapped;
    }
    match units.type_kind(ty).clone() {
        TypeKind::Array { elem, size } => {
            let new_elem = subst_type(units, unit, mapping, elem);
            if new_elem == elem {
                ty
            } else {
                units.unit_mut(unit).types.intern_array(new_elem, size)
            }
        }
        TypeKind::Pointer { pointee } => {
            let new = subst_type(units, unit, mapping, pointee);
            if new == pointee {
                ty
            } else {
                units.unit_mut(unit).types.intern_pointer(new)
            }
        }
        TypeKind::Function { params, ret } => {
            let new_params: Vec<TypeId> = params
                .iter()
                .map(|p| subst_type(units, unit, mapping, *p))
                .collect();
            let new_ret = subst_type(units, unit, mapping, ret);
            if new_params == params && new_ret == ret {
                ty
            } else {
                units
                    .unit_mut(unit)
                    .types
                    .intern_function(new_params, new_ret)
            }
        }
        TypeKind::TemplateStruct { template, args }
        | TypeKind::Dependent { template, args } => {
            let new_args: Vec<TypeId> = args
                .iter()
                .map(|a| subst_type(units, unit, mapping, *a))
                .collect();
            let dependent =
                new_args.iter().any(|a| units.type_has_params(*a));
            let ctx = &mut units.unit_mut(unit).types;
            if dependent {
                ctx.intern_dependent(template, new_args)
            } else {
                ctx.intern_spec(template, new_args)
            }
        }
        TypeKind::Deferred {
            resolved: Some(target),
            ..
        } => subst_type(units, unit, mapping, target),
        _ => ty,
    }
}

struct Cloner<'a> {
    units: &'a mut UnitManager,
    unit: UnitId,
    mapping: &'a HashMap<TypeId, TypeId>,
    scope_map: HashMap<ScopeId, ScopeId>,
    decl_map: HashMap<DeclId, DeclId>,
}

impl<'a> Cloner<'a> {
    fn subst(&mut self, ty: TypeId) -> TypeId {
        subst_type(self.units, self.unit, self.mapping, ty)
    }

    fn map_scope(&self, old: ScopeId) -> ScopeId {
        self.scope_map.get(&old).copied().unwrap_or(old)
    }

    fn map_decl(&self, old: DeclId) -> DeclId {
        self.decl_map.get(&old).copied().unwrap_or(old)
    }

    /// Clones a parameter declaration into `scope`, substituting its type,
    /// and records the remapping.
    fn clone_param(&mut self, param: DeclId, scope: ScopeId) -> DeclId {
        let pdata = self.units.decl(param).clone();
        let (pty, index) = match pdata.kind {
            DeclKind::Param { ty, index, .. } => (ty, index),
            _ => unreachable!("parameter list holds param decls"),
        };
        let pty = self.subst(pty);
        let unit = self.unit;
        let new = self.units.unit_mut(unit).alloc_decl(DeclData {
            name: pdata.name,
            runes: pdata.runes,
            loc: pdata.loc,
            scope,
            kind: DeclKind::Param {
                ty: pty,
                index,
                parent: None,
            },
        });
        let _ = self
            .units
            .unit_mut(unit)
            .scope_mut(scope)
            .insert(pdata.name, new);
        self.decl_map.insert(param, new);
        new
    }

    fn clone_stmt(&mut self, stmt: StmtId) -> StmtId {
        let StmtData { loc, kind } =
            self.units.stmt(stmt).clone();
        let kind = match kind {
            StmtKind::Compound { scope, stmts } => {
                let old_parent =
                    self.units.unit(scope.unit).scope(scope).parent;
                let parent = old_parent.map(|p| self.map_scope(p));
                let new_scope = self.units.unit_mut(self.unit).alloc_scope(
                    ScopeData {
                        parent,
                        decls: Vec::new(),
                    },
                );
                self.scope_map.insert(scope, new_scope);
                let stmts = stmts
                    .into_iter()
                    .map(|s| self.clone_stmt(s))
                    .collect();
                StmtKind::Compound {
                    scope: new_scope,
                    stmts,
                }
            }
            StmtKind::If {
                cond,
                then_body,
                else_body,
            } => StmtKind::If {
                cond: self.clone_expr(cond),
                then_body: self.clone_stmt(then_body),
                else_body: else_body.map(|s| self.clone_stmt(s)),
            },
            StmtKind::Until { cond, body } => StmtKind::Until {
                cond: self.clone_expr(cond),
                body: self.clone_stmt(body),
            },
            StmtKind::Match {
                subject,
                cases,
                default,
            } => StmtKind::Match {
                subject: self.clone_expr(subject),
                cases: cases
                    .into_iter()
                    .map(|c| MatchCase {
                        pattern: self.clone_expr(c.pattern),
                        body: self.clone_stmt(c.body),
                        loc: c.loc,
                    })
                    .collect(),
                default: default.map(|s| self.clone_stmt(s)),
            },
            StmtKind::Ret { expr } => StmtKind::Ret {
                expr: expr.map(|e| self.clone_expr(e)),
            },
            StmtKind::Break => StmtKind::Break,
            StmtKind::Continue => StmtKind::Continue,
            StmtKind::DeclStmt { decl } => StmtKind::DeclStmt {
                decl: self.clone_local_var(decl),
            },
            StmtKind::ExprStmt { expr } => StmtKind::ExprStmt {
                expr: self.clone_expr(expr),
            },
        };
        self.units.unit_mut(self.unit).alloc_stmt(StmtData { loc, kind })
    }

    fn clone_local_var(&mut self, decl: DeclId) -> DeclId {
        let data = self.units.decl(decl).clone();
        let (ty, init, mutable, global) = match data.kind {
            DeclKind::Var {
                ty,
                init,
                mutable,
                global,
            } => (ty, init, mutable, global),
            _ => unreachable!("decl statements declare variables"),
        };
        let ty = ty.map(|t| self.subst(t));
        let init = init.map(|e| self.clone_expr(e));
        let scope = self.map_scope(data.scope);
        let new = self.units.unit_mut(self.unit).alloc_decl(DeclData {
            name: data.name,
            runes: data.runes,
            loc: data.loc,
            scope,
            kind: DeclKind::Var {
                ty,
                init,
                mutable,
                global,
            },
        });
        let _ = self
            .units
            .unit_mut(self.unit)
            .scope_mut(scope)
            .insert(data.name, new);
        self.decl_map.insert(decl, new);
        new
    }

    fn clone_expr(&mut self, expr: ExprId) -> ExprId {
        let ExprData {
            loc,
            ty,
            lvalue,
            kind,
        } = self.units.expr(expr).clone();
        let kind = match kind {
            ExprKind::Ref { name, decl } => ExprKind::Ref {
                name,
                decl: decl.map(|d| self.map_decl(d)),
            },
            ExprKind::Binary { op, lhs, rhs } => ExprKind::Binary {
                op,
                lhs: self.clone_expr(lhs),
                rhs: self.clone_expr(rhs),
            },
            ExprKind::Unary { op, expr, postfix } => ExprKind::Unary {
                op,
                expr: self.clone_expr(expr),
                postfix,
            },
            ExprKind::Cast { expr } => ExprKind::Cast {
                expr: self.clone_expr(expr),
            },
            ExprKind::Paren { expr } => ExprKind::Paren {
                expr: self.clone_expr(expr),
            },
            ExprKind::Access { base, name, field } => ExprKind::Access {
                base: self.clone_expr(base),
                name,
                field: field.map(|f| self.map_decl(f)),
            },
            ExprKind::Subscript { base, index } => ExprKind::Subscript {
                base: self.clone_expr(base),
                index: self.clone_expr(index),
            },
            ExprKind::Call {
                callee,
                targs,
                args,
            } => ExprKind::Call {
                callee: self.clone_expr(callee),
                targs: targs.into_iter().map(|t| self.subst(t)).collect(),
                args: args
                    .into_iter()
                    .map(|a| self.clone_expr(a))
                    .collect(),
            },
            ExprKind::MethodCall {
                base,
                name,
                decl,
                args,
            } => ExprKind::MethodCall {
                base: self.clone_expr(base),
                name,
                decl: decl.map(|d| self.map_decl(d)),
                args: args
                    .into_iter()
                    .map(|a| self.clone_expr(a))
                    .collect(),
            },
            ExprKind::Spec {
                qualifier,
                qual_decl,
                member,
                decl,
            } => ExprKind::Spec {
                qualifier,
                qual_decl: qual_decl.map(|d| self.map_decl(d)),
                member,
                decl: decl.map(|d| self.map_decl(d)),
            },
            ExprKind::StructInit {
                name,
                decl,
                targs,
                fields,
            } => ExprKind::StructInit {
                name,
                decl: decl.map(|d| self.map_decl(d)),
                targs: targs.into_iter().map(|t| self.subst(t)).collect(),
                fields: fields
                    .into_iter()
                    .map(|(n, e)| (n, self.clone_expr(e)))
                    .collect(),
            },
            ExprKind::ArrayInit { elems } => ExprKind::ArrayInit {
                elems: elems
                    .into_iter()
                    .map(|e| self.clone_expr(e))
                    .collect(),
            },
            ExprKind::Sizeof { target } => ExprKind::Sizeof {
                target: self.subst(target),
            },
            ExprKind::Syscall { num, args } => ExprKind::Syscall {
                num,
                args: args
                    .into_iter()
                    .map(|a| self.clone_expr(a))
                    .collect(),
            },
            literal => literal,
        };
        let ty = ty.map(|t| self.subst(t));
        self.units.unit_mut(self.unit).alloc_expr(ExprData {
            loc,
            ty,
            lvalue,
            kind,
        })
    }
}

/// Clones a templated function into a fresh scope with substituted
/// parameter and return types, marking the copy as a specialisation.
#[allow(clippy::too_many_arguments)]
fn clone_function_spec(
    units: &mut UnitManager,
    _sess: &mut Session,
    template: DeclId,
    inner: DeclId,
    args: &[TypeId],
    mapping: &HashMap<TypeId, TypeId>,
    name: meddle_base::Symbol,
    parent: Option<DeclId>,
) -> Result<DeclId> {
    let unit = template.unit;
    let data = units.decl(inner).clone();
    let (fn_ty, fn_scope, params, body) = match data.kind {
        DeclKind::Function {
            ty,
            scope,
            params,
            body,
            ..
        } => (ty, scope, params, body),
        _ => unreachable!("templated decl is a function"),
    };

    let old_parent = units.unit(unit).scope(fn_scope).parent;
    let new_scope = units.unit_mut(unit).alloc_scope(ScopeData {
        parent: old_parent,
        decls: Vec::new(),
    });

    let mut cloner = Cloner {
        units: &mut *units,
        unit,
        mapping,
        scope_map: HashMap::from([(fn_scope, new_scope)]),
        decl_map: HashMap::new(),
    };

    let mut new_params = Vec::with_capacity(params.len());
    for param in &params {
        let new = cloner.clone_param(*param, new_scope);
        new_params.push(new);
    }

    let new_ty = cloner.subst(fn_ty);
    let new_body = body.map(|b| cloner.clone_stmt(b));
    drop(cloner);

    let spec = units.unit_mut(unit).alloc_decl(DeclData {
        name,
        runes: data.runes,
        loc: data.loc,
        scope: data.scope,
        kind: DeclKind::Function {
            ty: new_ty,
            scope: new_scope,
            params: new_params.clone(),
            body: new_body,
            parent,
            special: Some(SpecInfo {
                template,
                args: args.to_vec(),
            }),
        },
    });
    for param in &new_params {
        if let DeclKind::Param { parent, .. } =
            &mut units.decl_mut(*param).kind
        {
            *parent = Some(spec);
        }
    }
    Ok(spec)
}


fn clone_struct_spec(
    units: &mut UnitManager,
    _sess: &mut Session,
    template: DeclId,
    inner: DeclId,
    args: &[TypeId],
    mapping: &HashMap<TypeId, TypeId>,
    name: meddle_base::Symbol,
) -> Result<DeclId> {
    let unit = template.unit;
    let data = units.decl(inner).clone();
    let (struct_scope, fields, methods) = match data.kind {
        DeclKind::Struct {
            scope,
            fields,
            methods,
            ..
        } => (scope, fields, methods),
        _ => unreachable!("templated decl is a struct"),
    };

    let old_parent = units.unit(unit).scope(struct_scope).parent;
    let new_scope = units.unit_mut(unit).alloc_scope(ScopeData {
        parent: old_parent,
        decls: Vec::new(),
    });

    let ty = match units
        .unit_mut(unit)
        .types
        .declare_named(name, TypeKind::Struct { name, decl: None })
    {
        Ok(ty) => ty,
        Err(existing) => existing,
    };

    let mut cloner = Cloner {
        units: &mut *units,
        unit,
        mapping,
        scope_map: HashMap::from([(struct_scope, new_scope)]),
        decl_map: HashMap::new(),
    };

    // Fields first, then method shells, so bodies can remap every pin.
    let mut new_fields = Vec::with_capacity(fields.len());
    for field in &fields {
        let fdata = cloner.units.decl(*field).clone();
        let (fty, init, index) = match fdata.kind {
            DeclKind::Field {
                ty, init, index, ..
            } => (ty, init, index),
            _ => unreachable!("field list holds field decls"),
        };
        let fty = cloner.subst(fty);
        let init = init.map(|e| cloner.clone_expr(e));
        let new = cloner.units.unit_mut(unit).alloc_decl(DeclData {
            name: fdata.name,
            runes: fdata.runes,
            loc: fdata.loc,
            scope: new_scope,
            kind: DeclKind::Field {
                ty: fty,
                init,
                index,
                parent: None,
            },
        });
        let _ = cloner
            .units
            .unit_mut(unit)
            .scope_mut(new_scope)
            .insert(fdata.name, new);
        cloner.decl_map.insert(*field, new);
        new_fields.push(new);
    }

    // Phase one: shells. Each method gets its cloned signature and scope
    // with an empty body, so sibling-method references resolve to the
    // specialised copies.
    let mut new_methods = Vec::with_capacity(methods.len());
    let mut method_bodies = Vec::with_capacity(methods.len());
    for method in &methods {
        let mdata = cloner.units.decl(*method).clone();
        let (fn_ty, fn_scope, params, body) = match mdata.kind {
            DeclKind::Function {
                ty,
                scope,
                params,
                body,
                ..
            } => (ty, scope, params, body),
            _ => unreachable!("method list holds function decls"),
        };

        let old_fn_parent = cloner.units.unit(unit).scope(fn_scope).parent;
        let mapped_parent = old_fn_parent.map(|p| cloner.map_scope(p));
        let new_fn_scope =
            cloner.units.unit_mut(unit).alloc_scope(ScopeData {
                parent: mapped_parent,
                decls: Vec::new(),
            });
        cloner.scope_map.insert(fn_scope, new_fn_scope);

        let mut new_params = Vec::with_capacity(params.len());
        for param in &params {
            new_params.push(cloner.clone_param(*param, new_fn_scope));
        }
        let new_ty = cloner.subst(fn_ty);

        let shell = cloner.units.unit_mut(unit).alloc_decl(DeclData {
            name: mdata.name,
            runes: mdata.runes,
            loc: mdata.loc,
            scope: mdata.scope,
            kind: DeclKind::Function {
                ty: new_ty,
                scope: new_fn_scope,
                params: new_params.clone(),
                body: None,
                parent: None,
                special: None,
            },
        });
        for param in &new_params {
            if let DeclKind::Param { parent, .. } =
                &mut cloner.units.decl_mut(*param).kind
            {
                *parent = Some(shell);
            }
        }
        cloner.decl_map.insert(*method, shell);
        new_methods.push(shell);
        method_bodies.push(body);
    }

    // Phase two: bodies, with the full remapping in view.
    for (shell, body) in new_methods.iter().zip(method_bodies) {
        if let Some(body) = body {
            let new_body = cloner.clone_stmt(body);
            if let DeclKind::Function { body, .. } =
                &mut cloner.units.decl_mut(*shell).kind
            {
                *body = Some(new_body);
            }
        }
    }
    drop(cloner);

    let spec = units.unit_mut(unit).alloc_decl(DeclData {
        name,
        runes: data.runes,
        loc: data.loc,
        scope: data.scope,
        kind: DeclKind::Struct {
            ty,
            scope: new_scope,
            fields: new_fields.clone(),
            methods: new_methods.clone(),
            special: Some(SpecInfo {
                template,
                args: args.to_vec(),
            }),
        },
    });
    if let TypeKind::Struct { decl, .. } =
        &mut units.unit_mut(unit).types.get_mut(ty).kind
    {
        *decl = Some(spec);
    }
    for field in &new_fields {
        if let DeclKind::Field { parent, .. } =
            &mut units.decl_mut(*field).kind
        {
            *parent = Some(spec);
        }
    }
    for method in &new_methods {
        if let DeclKind::Function { parent, .. } =
            &mut units.decl_mut(*method).kind
        {
            *parent = Some(spec);
        }
    }

    Ok(spec)
}
