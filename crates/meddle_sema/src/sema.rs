//! Sema: expression typing, statement well-formedness, implicit casts.
//!
//! Types propagate bottom-up from the leaves; where a target type is known
//! (variable initialisers, return statements, call arguments, struct field
//! initialisers, assignments) it flows top-down, letting literals adopt the
//! expected type and wrapping anything else the cast table allows in an
//! implicit cast node. Template references instantiate on demand; freshly
//! created specialisations join a worklist and are checked exactly once.

use crate::template::{self, Fetched};
use crate::unitman::{TypeClass, UnitManager};
use meddle_base::{Diagnostic, Result, Session, SourceLoc, Symbol};
use meddle_syntax::ast::{DeclId, ExprId, StmtId, TypeId};
use meddle_syntax::{
    BinOp, DeclKind, ExprData, ExprKind, StmtKind, TypeKind, UnOp,
};
use std::collections::HashSet;

#[derive(Clone, Copy, PartialEq, Eq)]
enum LoopKind {
    None,
    Until,
}

pub fn run(units: &mut UnitManager, sess: &mut Session) -> Result<()> {
    let mut sema = Sema {
        units,
        sess,
        fun: None,
        loop_kind: LoopKind::None,
        checked: HashSet::new(),
        pending: Vec::new(),
    };

    for unit in sema.units.ids() {
        let items = sema.units.unit(unit).items.clone();
        for item in items {
            sema.check_decl(item)?;
        }
    }
    // Specialisations created while checking are themselves checked, in
    // instantiation order.
    while let Some(decl) = sema.pending.pop() {
        sema.check_decl(decl)?;
    }
    Ok(())
}

struct Sema<'a> {
    units: &'a mut UnitManager,
    sess: &'a mut Session,
    fun: Option<DeclId>,
    loop_kind: LoopKind,
    checked: HashSet<DeclId>,
    pending: Vec<DeclId>,
}

impl<'a> Sema<'a> {
    fn name_of(&self, sym: Symbol) -> String {
        self.sess.interner.resolve(sym).to_string()
    }

    fn ty_name(&self, ty: TypeId) -> String {
        self.units.type_name(ty, &self.sess.interner)
    }

    fn err(&self, msg: impl Into<String>, loc: SourceLoc) -> Diagnostic {
        Diagnostic::error(msg, loc)
    }

    // ---- declarations ----------------------------------------------------

    fn check_decl(&mut self, decl: DeclId) -> Result<()> {
        if !self.checked.insert(decl) {
            return Ok(());
        }
        let kind = self.units.decl(decl).kind.clone();
        let loc = self.units.decl(decl).loc;
        match kind {
            DeclKind::Function { ty, body, .. } => {
                if let Some((params, ret)) = self.units.fn_signature(ty) {
                    for p in params {
                        self.ensure_instantiated(p, loc)?;
                    }
                    self.ensure_instantiated(ret, loc)?;
                }
                if let Some(body) = body {
                    let outer_fun = self.fun.replace(decl);
                    let outer_loop = self.loop_kind;
                    self.loop_kind = LoopKind::None;
                    self.check_stmt(body)?;
                    self.fun = outer_fun;
                    self.loop_kind = outer_loop;
                }
            }
            DeclKind::Var {
                ty: Some(ty),
                init,
                ..
            } => {
                self.ensure_instantiated(ty, loc)?;
                if let Some(init) = init {
                    let new_init = self.coerce(init, ty)?;
                    if let DeclKind::Var { init, .. } =
                        &mut self.units.decl_mut(decl).kind
                    {
                        *init = Some(new_init);
                    }
                }
            }
            DeclKind::Var { ty: None, .. } => {
                // Local declarations are typed through their statement.
            }
            DeclKind::Struct {
                fields, methods, ..
            } => {
                for field in fields {
                    let (fty, init, floc) = match &self.units.decl(field).kind
                    {
                        DeclKind::Field { ty, init, .. } => {
                            (*ty, *init, self.units.decl(field).loc)
                        }
                        _ => continue,
                    };
                    self.ensure_instantiated(fty, floc)?;
                    if let Some(init) = init {
                        let new_init = self.coerce(init, fty)?;
                        if let DeclKind::Field { init, .. } =
                            &mut self.units.decl_mut(field).kind
                        {
                            *init = Some(new_init);
                        }
                    }
                }
                for method in methods {
                    self.check_decl(method)?;
                }
            }
            DeclKind::TemplateFunction { .. }
            | DeclKind::TemplateStruct { .. } => {
                // Only specialisations are checked.
            }
            _ => {}
        }
        Ok(())
    }

    // ---- statements ------------------------------------------------------

    fn check_stmt(&mut self, stmt: StmtId) -> Result<()> {
        let kind = self.units.stmt(stmt).kind.clone();
        let loc = self.units.stmt(stmt).loc;
        match kind {
            StmtKind::Compound { stmts, .. } => {
                for s in stmts {
                    self.check_stmt(s)?;
                }
            }
            StmtKind::If {
                cond,
                then_body,
                else_body,
            } => {
                let cond_ty = self.check_expr(cond, None)?;
                if !self.units.is_scalar(cond_ty) {
                    return Err(self.err(
                        "'if' condition must be a scalar value",
                        self.units.expr(cond).loc,
                    ));
                }
                self.check_stmt(then_body)?;
                if let Some(else_body) = else_body {
                    self.check_stmt(else_body)?;
                }
            }
            StmtKind::Until { cond, body } => {
                let cond_ty = self.check_expr(cond, None)?;
                if !self.units.is_scalar(cond_ty) {
                    return Err(self.err(
                        "'until' condition must be a scalar value",
                        self.units.expr(cond).loc,
                    ));
                }
                let outer = self.loop_kind;
                self.loop_kind = LoopKind::Until;
                self.check_stmt(body)?;
                self.loop_kind = outer;
            }
            StmtKind::Match {
                subject,
                cases,
                default,
            } => {
                let subject_ty = self.check_expr(subject, None)?;
                if !self.units.is_scalar(subject_ty) {
                    return Err(self.err(
                        "unsupported 'match' subject type",
                        self.units.expr(subject).loc,
                    ));
                }
                for (i, case) in cases.iter().enumerate() {
                    let new_pattern =
                        self.coerce(case.pattern, subject_ty)?;
                    if !self.is_const_expr(new_pattern) {
                        return Err(self.err(
                            "'match' pattern must be constant",
                            case.loc,
                        ));
                    }
                    if let StmtKind::Match { cases, .. } =
                        &mut self.units.unit_mut(stmt.unit).stmt_mut(stmt).kind
                    {
                        cases[i].pattern = new_pattern;
                    }
                    self.check_stmt(case.body)?;
                }
                if let Some(default) = default {
                    self.check_stmt(default)?;
                }
            }
            StmtKind::Ret { expr } => {
                self.check_ret(stmt, expr, loc)?;
            }
            StmtKind::Break => {
                if self.loop_kind == LoopKind::None {
                    return Err(self.err("'break' outside of a loop", loc));
                }
            }
            StmtKind::Continue => {
                if self.loop_kind == LoopKind::None {
                    return Err(
                        self.err("'continue' outside of a loop", loc)
                    );
                }
            }
            StmtKind::DeclStmt { decl } => {
                self.check_local_var(decl)?;
            }
            StmtKind::ExprStmt { expr } => {
                self.check_expr(expr, None)?;
            }
        }
        Ok(())
    }

    fn check_ret(
        &mut self,
        stmt: StmtId,
        expr: Option<ExprId>,
        loc: SourceLoc,
    ) -> Result<()> {
        let fun = self.fun.expect("return statement outside of a function");
        let fn_ty = match &self.units.decl(fun).kind {
            DeclKind::Function { ty, .. } => *ty,
            _ => unreachable!("current function is a function decl"),
        };
        let (_, ret_ty) = self
            .units
            .fn_signature(fn_ty)
            .expect("function decl has a function type");

        if self.units.is_void(ret_ty) {
            if expr.is_some() {
                return Err(self.err(
                    "cannot return a value from a void function",
                    loc,
                ));
            }
            return Ok(());
        }
        let expr = match expr {
            Some(expr) => expr,
            None => {
                return Err(
                    self.err("non-void function must return a value", loc)
                )
            }
        };
        let new_expr = self.coerce(expr, ret_ty)?;
        if let StmtKind::Ret { expr } =
            &mut self.units.unit_mut(stmt.unit).stmt_mut(stmt).kind
        {
            *expr = Some(new_expr);
        }
        Ok(())
    }

    fn check_local_var(&mut self, decl: DeclId) -> Result<()> {
        let (ty, init) = match &self.units.decl(decl).kind {
            DeclKind::Var { ty, init, .. } => (*ty, *init),
            _ => return Ok(()),
        };
        let loc = self.units.decl(decl).loc;

        match ty {
            Some(ty) => {
                self.ensure_instantiated(ty, loc)?;
                if self.units.is_void(ty) {
                    return Err(
                        self.err("variable cannot have type 'void'", loc)
                    );
                }
                if let Some(init) = init {
                    let new_init = self.coerce(init, ty)?;
                    if let DeclKind::Var { init, .. } =
                        &mut self.units.decl_mut(decl).kind
                    {
                        *init = Some(new_init);
                    }
                }
            }
            None => {
                let init = init.expect("untyped variable has an initializer");
                let inferred = self.check_expr(init, None)?;
                if self.units.is_void(inferred) {
                    return Err(
                        self.err("variable cannot have type 'void'", loc)
                    );
                }
                if let DeclKind::Var { ty, .. } =
                    &mut self.units.decl_mut(decl).kind
                {
                    *ty = Some(inferred);
                }
            }
        }
        Ok(())
    }

    // ---- coercion --------------------------------------------------------

    /// Types `expr` against `target` and returns the id to use in its
    /// place: the original, or an implicit cast wrapped around it.
    fn coerce(&mut self, expr: ExprId, target: TypeId) -> Result<ExprId> {
        let found = self.check_expr(expr, Some(target))?;
        if self.units.types_equal(found, target) {
            return Ok(expr);
        }
        if self.implicit_ok(found, target) {
            return Ok(self.wrap_cast(expr, target));
        }
        let loc = self.units.expr(expr).loc;
        Err(self.err(
            format!(
                "type mismatch: expected '{}', found '{}'",
                self.ty_name(target),
                self.ty_name(found)
            ),
            loc,
        ))
    }

    /// Conversions inserted silently where a target type is known.
    fn implicit_ok(&self, src: TypeId, dst: TypeId) -> bool {
        let s = self.units.type_class(src);
        let d = self.units.type_class(dst);
        matches!(
            (s, d),
            (TypeClass::SInt | TypeClass::UInt, TypeClass::SInt | TypeClass::UInt)
                | (TypeClass::Float, TypeClass::Float)
                | (TypeClass::SInt | TypeClass::UInt, TypeClass::Float)
                | (TypeClass::Float, TypeClass::SInt | TypeClass::UInt)
                | (TypeClass::SInt | TypeClass::UInt, TypeClass::Pointer)
                | (TypeClass::Pointer, TypeClass::SInt | TypeClass::UInt)
                | (TypeClass::Pointer, TypeClass::Pointer)
        )
    }

    /// Explicit `cast<T>` additionally permits array-to-pointer decay.
    fn cast_ok(&self, src: TypeId, dst: TypeId) -> bool {
        if self.implicit_ok(src, dst) || self.units.types_equal(src, dst) {
            return true;
        }
        self.units.array_elem(src).is_some()
            && self.units.pointee(dst).is_some()
    }

    fn wrap_cast(&mut self, expr: ExprId, target: TypeId) -> ExprId {
        let loc = self.units.expr(expr).loc;
        let mut data = ExprData::new(loc, ExprKind::Cast { expr });
        data.ty = Some(target);
        self.units.unit_mut(expr.unit).alloc_expr(data)
    }

    // ---- template instantiation ------------------------------------------

    /// Instantiates every concrete template-struct type reachable from
    /// `ty`.
    fn ensure_instantiated(
        &mut self,
        ty: TypeId,
        loc: SourceLoc,
    ) -> Result<()> {
        match self.units.type_kind(self.units.canon(ty)).clone() {
            TypeKind::Array { elem, .. } => {
                self.ensure_instantiated(elem, loc)
            }
            TypeKind::Pointer { pointee } => {
                self.ensure_instantiated(pointee, loc)
            }
            TypeKind::Function { params, ret } => {
                for p in params {
                    self.ensure_instantiated(p, loc)?;
                }
                self.ensure_instantiated(ret, loc)
            }
            TypeKind::TemplateStruct { template, args } => {
                if args.iter().any(|a| self.units.type_has_params(*a)) {
                    return Ok(());
                }
                for a in &args {
                    self.ensure_instantiated(*a, loc)?;
                }
                let Fetched { decl, created } = template::fetch_specialization(
                    self.units, self.sess, template, &args, loc,
                )?;
                if created {
                    self.pending.push(decl);
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    // ---- expressions -----------------------------------------------------

    /// Types an expression, records the result on the node, and returns it.
    fn check_expr(
        &mut self,
        expr: ExprId,
        expected: Option<TypeId>,
    ) -> Result<TypeId> {
        let loc = self.units.expr(expr).loc;
        let kind = self.units.expr(expr).kind.clone();
        let ctx_unit = expr.unit;

        let (ty, lvalue) = match kind {
            ExprKind::Bool(_) => {
                (self.units.unit(ctx_unit).types.bool_ty(), false)
            }
            ExprKind::Int(_) => {
                let ty = match expected {
                    Some(exp)
                        if matches!(
                            self.units.type_class(exp),
                            TypeClass::SInt
                                | TypeClass::UInt
                                | TypeClass::Float
                        ) =>
                    {
                        self.units.canon(exp)
                    }
                    _ => self.units.unit(ctx_unit).types.i64_ty(),
                };
                (ty, false)
            }
            ExprKind::Float(_) => {
                let ty = match expected {
                    Some(exp)
                        if self.units.type_class(exp) == TypeClass::Float =>
                    {
                        self.units.canon(exp)
                    }
                    _ => self.units.unit(ctx_unit).types.f64_ty(),
                };
                (ty, false)
            }
            ExprKind::Char(_) => {
                (self.units.unit(ctx_unit).types.char_ty(), false)
            }
            ExprKind::Str(ref value) => {
                let char_ty = self.units.unit(ctx_unit).types.char_ty();
                let len = value.len() as u64 + 1;
                let ty = self
                    .units
                    .unit_mut(ctx_unit)
                    .types
                    .intern_array(char_ty, len);
                (ty, false)
            }
            ExprKind::Nil => {
                let ty = match expected {
                    Some(exp) if self.units.pointee(exp).is_some() => {
                        self.units.canon(exp)
                    }
                    _ => {
                        let void = self.units.unit(ctx_unit).types.void_ty();
                        self.units
                            .unit_mut(ctx_unit)
                            .types
                            .intern_pointer(void)
                    }
                };
                (ty, false)
            }
            ExprKind::Ref { name, decl } => {
                self.check_ref(name, decl, loc)?
            }
            ExprKind::Binary { op, lhs, rhs } => {
                self.check_binary(expr, op, lhs, rhs, expected, loc)?
            }
            ExprKind::Unary {
                op,
                expr: operand,
                postfix: _,
            } => self.check_unary(op, operand, loc)?,
            ExprKind::Cast { expr: operand } => {
                let target = self
                    .units
                    .expr(expr)
                    .ty
                    .expect("cast carries its target type");
                let target = self.units.canon(target);
                self.ensure_instantiated(target, loc)?;
                let src = self.check_expr(operand, None)?;
                if !self.cast_ok(src, target) {
                    return Err(self.err(
                        format!(
                            "invalid cast from type '{}' to '{}'",
                            self.ty_name(src),
                            self.ty_name(target)
                        ),
                        loc,
                    ));
                }
                (target, false)
            }
            ExprKind::Paren { expr: inner } => {
                let ty = self.check_expr(inner, expected)?;
                (ty, self.units.expr(inner).lvalue)
            }
            ExprKind::Access { base, name, .. } => {
                self.check_access(expr, base, name, loc)?
            }
            ExprKind::Subscript { base, index } => {
                self.check_subscript(base, index, loc)?
            }
            ExprKind::Call {
                callee,
                ref targs,
                ref args,
            } => self.check_call(expr, callee, targs.clone(), args.clone(), loc)?,
            ExprKind::MethodCall {
                base,
                name,
                ref args,
                ..
            } => self.check_method_call(expr, base, name, args.clone(), loc)?,
            ExprKind::Spec { decl, .. } => {
                let decl = decl.expect("spec resolved by name resolution");
                match &self.units.decl(decl).kind {
                    DeclKind::EnumVariant { ty, .. } => (*ty, false),
                    DeclKind::Function { ty, .. } => (*ty, false),
                    DeclKind::Var { ty: Some(ty), .. } => (*ty, true),
                    _ => {
                        return Err(self.err(
                            "qualified name is not usable as a value",
                            loc,
                        ))
                    }
                }
            }
            ExprKind::StructInit {
                decl,
                ref targs,
                ref fields,
                ..
            } => self.check_struct_init(
                expr,
                decl,
                targs.clone(),
                fields.clone(),
                loc,
            )?,
            ExprKind::ArrayInit { ref elems } => {
                self.check_array_init(expr, elems.clone(), expected, loc)?
            }
            ExprKind::Sizeof { target } => {
                self.ensure_instantiated(target, loc)?;
                (self.units.unit(ctx_unit).types.u64_ty(), false)
            }
            ExprKind::Syscall { ref args, .. } => {
                for arg in args.clone() {
                    let ty = self.check_expr(arg, None)?;
                    if !self.units.is_scalar(ty) {
                        return Err(self.err(
                            "syscall arguments must be scalar values",
                            self.units.expr(arg).loc,
                        ));
                    }
                }
                (self.units.unit(ctx_unit).types.i64_ty(), false)
            }
        };

        let node = self.units.expr_mut(expr);
        node.ty = Some(ty);
        node.lvalue = lvalue;
        Ok(ty)
    }

    fn check_ref(
        &mut self,
        name: Symbol,
        decl: Option<DeclId>,
        loc: SourceLoc,
    ) -> Result<(TypeId, bool)> {
        let decl = decl.expect("ref pinned by name resolution");
        match &self.units.decl(decl).kind {
            DeclKind::Var { ty: Some(ty), .. } => Ok((*ty, true)),
            DeclKind::Var { ty: None, .. } => Err(self.err(
                format!(
                    "variable used before its type is known: {}",
                    self.name_of(name)
                ),
                loc,
            )),
            DeclKind::Param { ty, .. } | DeclKind::Field { ty, .. } => {
                Ok((*ty, true))
            }
            DeclKind::EnumVariant { ty, .. } => Ok((*ty, false)),
            DeclKind::Function { ty, .. } => Ok((*ty, false)),
            DeclKind::TemplateFunction { .. } => Err(self.err(
                format!(
                    "missing template arguments for '{}'",
                    self.name_of(name)
                ),
                loc,
            )),
            _ => Err(self.err(
                format!(
                    "'{}' cannot be used as a value",
                    self.name_of(name)
                ),
                loc,
            )),
        }
    }

    fn check_binary(
        &mut self,
        expr: ExprId,
        op: BinOp,
        lhs: ExprId,
        rhs: ExprId,
        expected: Option<TypeId>,
        loc: SourceLoc,
    ) -> Result<(TypeId, bool)> {
        use TypeClass::*;

        if op == BinOp::Assign {
            let lhs_ty = self.check_expr(lhs, None)?;
            if !self.units.expr(lhs).lvalue {
                return Err(
                    self.err("expression is not assignable", loc)
                );
            }
            let new_rhs = self.coerce(rhs, lhs_ty)?;
            self.set_binary_rhs(expr, new_rhs);
            return Ok((lhs_ty, false));
        }

        if op.is_assignment() {
            let lhs_ty = self.check_expr(lhs, None)?;
            if !self.units.expr(lhs).lvalue {
                return Err(
                    self.err("expression is not assignable", loc)
                );
            }
            let class = self.units.type_class(lhs_ty);
            let pointer_arith = class == Pointer
                && matches!(op, BinOp::AddAssign | BinOp::SubAssign);
            let valid = match op {
                BinOp::AddAssign | BinOp::SubAssign => {
                    matches!(class, SInt | UInt | Float | Pointer)
                }
                BinOp::MulAssign | BinOp::DivAssign => {
                    matches!(class, SInt | UInt | Float)
                }
                _ => matches!(class, SInt | UInt),
            };
            if !valid {
                return Err(self.err(
                    format!(
                        "unsupported '{}' operator between types",
                        op.spelling()
                    ),
                    loc,
                ));
            }
            let new_rhs = if pointer_arith {
                let i64_ty = self.units.unit(expr.unit).types.i64_ty();
                let rhs_ty = self.check_expr(rhs, Some(i64_ty))?;
                if !self.units.is_integer_class(rhs_ty) {
                    return Err(self.err(
                        format!(
                            "unsupported '{}' operator between types",
                            op.spelling()
                        ),
                        loc,
                    ));
                }
                rhs
            } else {
                self.coerce(rhs, lhs_ty)?
            };
            self.set_binary_rhs(expr, new_rhs);
            return Ok((lhs_ty, false));
        }

        if op.is_logical() {
            for operand in [lhs, rhs] {
                let ty = self.check_expr(operand, None)?;
                if !self.units.is_scalar(ty) {
                    return Err(self.err(
                        format!(
                            "unsupported '{}' operator between types",
                            op.spelling()
                        ),
                        loc,
                    ));
                }
            }
            return Ok((
                self.units.unit(expr.unit).types.bool_ty(),
                false,
            ));
        }

        if op.is_comparison() {
            let lhs_ty = self.check_expr(lhs, None)?;
            let new_rhs = self.coerce(rhs, lhs_ty)?;
            self.set_binary_rhs(expr, new_rhs);
            let class = self.units.type_class(lhs_ty);
            if !matches!(class, SInt | UInt | Float | Pointer) {
                return Err(self.err(
                    format!(
                        "unsupported '{}' operator between types",
                        op.spelling()
                    ),
                    loc,
                ));
            }
            return Ok((
                self.units.unit(expr.unit).types.bool_ty(),
                false,
            ));
        }

        // Plain arithmetic and bitwise operators.
        let lhs_ty = self.check_expr(lhs, expected)?;
        let lhs_class = self.units.type_class(lhs_ty);

        // Pointer arithmetic: `ptr + int`, `ptr - int`.
        if lhs_class == Pointer && matches!(op, BinOp::Add | BinOp::Sub) {
            let i64_ty = self.units.unit(expr.unit).types.i64_ty();
            let rhs_ty = self.check_expr(rhs, Some(i64_ty))?;
            if !self.units.is_integer_class(rhs_ty) {
                return Err(self.err(
                    format!(
                        "unsupported '{}' operator between types",
                        op.spelling()
                    ),
                    loc,
                ));
            }
            return Ok((lhs_ty, false));
        }

        let valid = match op {
            BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Div => {
                matches!(lhs_class, SInt | UInt | Float)
            }
            BinOp::Mod
            | BinOp::BitAnd
            | BinOp::BitOr
            | BinOp::BitXor
            | BinOp::Shl
            | BinOp::Shr => matches!(lhs_class, SInt | UInt),
            _ => unreachable!("remaining operators are arithmetic"),
        };
        if !valid {
            return Err(self.err(
                format!(
                    "unsupported '{}' operator between types",
                    op.spelling()
                ),
                loc,
            ));
        }

        let new_rhs = self.coerce(rhs, lhs_ty)?;
        self.set_binary_rhs(expr, new_rhs);
        Ok((lhs_ty, false))
    }

    fn set_binary_rhs(&mut self, expr: ExprId, new_rhs: ExprId) {
        if let ExprKind::Binary { rhs, .. } =
            &mut self.units.expr_mut(expr).kind
        {
            *rhs = new_rhs;
        }
    }

    fn check_unary(
        &mut self,
        op: UnOp,
        operand: ExprId,
        loc: SourceLoc,
    ) -> Result<(TypeId, bool)> {
        use TypeClass::*;
        let operand_ty = self.check_expr(operand, None)?;
        let class = self.units.type_class(operand_ty);
        match op {
            UnOp::Not => {
                if !self.units.is_scalar(operand_ty) {
                    return Err(self.err(
                        "unsupported '!' operator on type",
                        loc,
                    ));
                }
                Ok((self.units.unit(operand.unit).types.bool_ty(), false))
            }
            UnOp::BitNot => {
                if !matches!(class, SInt | UInt) {
                    return Err(self.err(
                        "unsupported '~' operator on type",
                        loc,
                    ));
                }
                Ok((operand_ty, false))
            }
            UnOp::Neg => {
                if !matches!(class, SInt | UInt | Float) {
                    return Err(self.err(
                        format!(
                            "unsupported '-' operator on type: '{}'",
                            self.ty_name(operand_ty)
                        ),
                        loc,
                    ));
                }
                Ok((operand_ty, false))
            }
            UnOp::AddrOf => {
                if !self.units.expr(operand).lvalue {
                    return Err(self.err(
                        "cannot take the address of this expression",
                        loc,
                    ));
                }
                let ty = self
                    .units
                    .unit_mut(operand.unit)
                    .types
                    .intern_pointer(operand_ty);
                Ok((ty, false))
            }
            UnOp::Deref => match self.units.pointee(operand_ty) {
                Some(pointee) => Ok((pointee, true)),
                None => Err(self.err(
                    format!(
                        "cannot dereference non-pointer type: '{}'",
                        self.ty_name(operand_ty)
                    ),
                    loc,
                )),
            },
            UnOp::Inc | UnOp::Dec => {
                if !self.units.expr(operand).lvalue {
                    return Err(
                        self.err("expression is not assignable", loc)
                    );
                }
                if class == Pointer {
                    return Err(self.err(
                        "pointer increment is not supported",
                        loc,
                    ));
                }
                if !matches!(class, SInt | UInt | Float) {
                    return Err(self.err(
                        format!(
                            "unsupported '{}' operator on type",
                            op.spelling()
                        ),
                        loc,
                    ));
                }
                Ok((operand_ty, false))
            }
        }
    }

    fn check_access(
        &mut self,
        expr: ExprId,
        base: ExprId,
        name: Symbol,
        loc: SourceLoc,
    ) -> Result<(TypeId, bool)> {
        let base_ty = self.check_expr(base, None)?;
        self.ensure_instantiated(base_ty, loc)?;

        let struct_decl = match self.units.pointee(base_ty) {
            // One level of pointer auto-dereferences.
            Some(pointee) => {
                self.ensure_instantiated(pointee, loc)?;
                self.units.struct_decl_of(pointee)
            }
            None => self.units.struct_decl_of(base_ty),
        };
        let struct_decl = match struct_decl {
            Some(decl) => decl,
            None => {
                return Err(self.err(
                    "field access requires a struct or pointer to struct",
                    loc,
                ))
            }
        };

        let fields = match &self.units.decl(struct_decl).kind {
            DeclKind::Struct { fields, .. } => fields.clone(),
            _ => unreachable!("struct decl resolved from a struct type"),
        };
        let field = fields
            .iter()
            .copied()
            .find(|f| self.units.decl(*f).name == name);
        let field = match field {
            Some(field) => field,
            None => {
                let sname = self.name_of(self.units.decl(struct_decl).name);
                return Err(self.err(
                    format!(
                        "no field '{}' on struct '{}'",
                        self.name_of(name),
                        sname
                    ),
                    loc,
                ));
            }
        };

        let field_ty = match &self.units.decl(field).kind {
            DeclKind::Field { ty, .. } => *ty,
            _ => unreachable!("field list holds field decls"),
        };
        if let ExprKind::Access { field: slot, .. } =
            &mut self.units.expr_mut(expr).kind
        {
            *slot = Some(field);
        }
        Ok((field_ty, true))
    }

    fn check_subscript(
        &mut self,
        base: ExprId,
        index: ExprId,
        loc: SourceLoc,
    ) -> Result<(TypeId, bool)> {
        let base_ty = self.check_expr(base, None)?;
        let elem = match self.units.array_elem(base_ty) {
            Some((elem, _)) => elem,
            None => match self.units.pointee(base_ty) {
                Some(pointee) => pointee,
                None => {
                    return Err(self.err(
                        "subscript base must be an array or pointer",
                        loc,
                    ))
                }
            },
        };
        let i64_ty = self.units.unit(index.unit).types.i64_ty();
        let index_ty = self.check_expr(index, Some(i64_ty))?;
        if !self.units.is_integer_class(index_ty) {
            return Err(
                self.err("subscript index must be an integer", loc)
            );
        }
        Ok((elem, true))
    }

    /// Resolves a call's callee to a concrete function declaration,
    /// instantiating templates on demand, and pins the result.
    fn check_call(
        &mut self,
        expr: ExprId,
        callee: ExprId,
        targs: Vec<TypeId>,
        args: Vec<ExprId>,
        loc: SourceLoc,
    ) -> Result<(TypeId, bool)> {
        let callee_decl = match &self.units.expr(callee).kind {
            ExprKind::Ref { decl, .. } | ExprKind::Spec { decl, .. } => {
                decl.expect("callee pinned by name resolution")
            }
            _ => {
                return Err(
                    self.err("called object is not a function", loc)
                )
            }
        };
        let callee_name = self.units.decl(callee_decl).name;

        let callee_kind = self.units.decl(callee_decl).kind.clone();
        let fn_decl = match callee_kind {
            // A callee already pinned to a specialisation keeps its explicit
            // argument list.
            DeclKind::Function { ref special, .. } => {
                if !targs.is_empty() && special.is_none() {
                    return Err(self.err(
                        format!(
                            "'{}' is not a template",
                            self.name_of(callee_name)
                        ),
                        loc,
                    ));
                }
                callee_decl
            }
            DeclKind::TemplateFunction { .. } => {
                if targs.is_empty() {
                    return Err(self.err(
                        format!(
                            "missing template arguments for '{}'",
                            self.name_of(callee_name)
                        ),
                        loc,
                    ));
                }
                for t in &targs {
                    self.ensure_instantiated(*t, loc)?;
                }
                let Fetched { decl, created } =
                    template::fetch_specialization(
                        self.units, self.sess, callee_decl, &targs, loc,
                    )?;
                if created {
                    self.pending.push(decl);
                }
                decl
            }
            _ => {
                return Err(self.err(
                    format!(
                        "called object is not a function: '{}'",
                        self.name_of(callee_name)
                    ),
                    loc,
                ))
            }
        };

        // Pin the resolved (possibly specialised) function on the callee.
        match &mut self.units.expr_mut(callee).kind {
            ExprKind::Ref { decl, .. } | ExprKind::Spec { decl, .. } => {
                *decl = Some(fn_decl)
            }
            _ => {}
        }

        let fn_ty = match &self.units.decl(fn_decl).kind {
            DeclKind::Function { ty, .. } => *ty,
            _ => unreachable!("call resolves to a function decl"),
        };
        let (params, ret) = self
            .units
            .fn_signature(fn_ty)
            .expect("function decl has a function type");

        if args.len() != params.len() {
            return Err(self.err(
                format!(
                    "wrong number of arguments to '{}': expected {}, found {}",
                    self.name_of(callee_name),
                    params.len(),
                    args.len()
                ),
                loc,
            ));
        }
        for (i, (arg, param_ty)) in args.iter().zip(&params).enumerate() {
            let new_arg = self.coerce(*arg, *param_ty)?;
            if let ExprKind::Call { args, .. } =
                &mut self.units.expr_mut(expr).kind
            {
                args[i] = new_arg;
            }
        }
        self.ensure_instantiated(ret, loc)?;
        Ok((ret, false))
    }

    fn check_method_call(
        &mut self,
        expr: ExprId,
        base: ExprId,
        name: Symbol,
        args: Vec<ExprId>,
        loc: SourceLoc,
    ) -> Result<(TypeId, bool)> {
        let base_ty = self.check_expr(base, None)?;
        self.ensure_instantiated(base_ty, loc)?;

        let (struct_decl, by_pointer) = match self.units.pointee(base_ty) {
            Some(pointee) => {
                self.ensure_instantiated(pointee, loc)?;
                (self.units.struct_decl_of(pointee), true)
            }
            None => (self.units.struct_decl_of(base_ty), false),
        };
        let struct_decl = match struct_decl {
            Some(decl) => decl,
            None => {
                return Err(self.err(
                    "method call requires a struct or pointer to struct",
                    loc,
                ))
            }
        };
        if !by_pointer && !self.units.expr(base).lvalue {
            return Err(
                self.err("method receiver must be addressable", loc)
            );
        }

        let methods = match &self.units.decl(struct_decl).kind {
            DeclKind::Struct { methods, .. } => methods.clone(),
            _ => unreachable!(),
        };
        let method = methods.iter().copied().find(|m| {
            self.units.decl(*m).name == name
                && self.units.decl(*m).is_method()
        });
        let method = match method {
            Some(method) => method,
            None => {
                let sname = self.name_of(self.units.decl(struct_decl).name);
                return Err(self.err(
                    format!(
                        "no method '{}' on struct '{}'",
                        self.name_of(name),
                        sname
                    ),
                    loc,
                ));
            }
        };

        let fn_ty = match &self.units.decl(method).kind {
            DeclKind::Function { ty, .. } => *ty,
            _ => unreachable!(),
        };
        let (params, ret) = self
            .units
            .fn_signature(fn_ty)
            .expect("method has a function type");

        if args.len() != params.len() {
            return Err(self.err(
                format!(
                    "wrong number of arguments to '{}': expected {}, found {}",
                    self.name_of(name),
                    params.len(),
                    args.len()
                ),
                loc,
            ));
        }
        for (i, (arg, param_ty)) in args.iter().zip(&params).enumerate() {
            let new_arg = self.coerce(*arg, *param_ty)?;
            if let ExprKind::MethodCall { args, .. } =
                &mut self.units.expr_mut(expr).kind
            {
                args[i] = new_arg;
            }
        }
        if let ExprKind::MethodCall { decl, .. } =
            &mut self.units.expr_mut(expr).kind
        {
            *decl = Some(method);
        }
        self.ensure_instantiated(ret, loc)?;
        Ok((ret, false))
    }

    fn check_struct_init(
        &mut self,
        expr: ExprId,
        decl: Option<DeclId>,
        targs: Vec<TypeId>,
        fields: Vec<(Symbol, ExprId)>,
        loc: SourceLoc,
    ) -> Result<(TypeId, bool)> {
        let named = decl.expect("struct init pinned by name resolution");

        let named_kind = self.units.decl(named).kind.clone();
        let struct_decl = match named_kind {
            DeclKind::Struct { ref special, .. } => {
                if !targs.is_empty() && special.is_none() {
                    return Err(self.err(
                        format!(
                            "'{}' is not a template",
                            self.name_of(self.units.decl(named).name)
                        ),
                        loc,
                    ));
                }
                named
            }
            DeclKind::TemplateStruct { .. } => {
                if targs.is_empty() {
                    return Err(self.err(
                        format!(
                            "missing template arguments for '{}'",
                            self.name_of(self.units.decl(named).name)
                        ),
                        loc,
                    ));
                }
                for t in &targs {
                    self.ensure_instantiated(*t, loc)?;
                }
                let Fetched { decl, created } =
                    template::fetch_specialization(
                        self.units, self.sess, named, &targs, loc,
                    )?;
                if created {
                    self.pending.push(decl);
                }
                decl
            }
            _ => {
                return Err(self.err(
                    format!(
                        "unknown struct: {}",
                        self.name_of(self.units.decl(named).name)
                    ),
                    loc,
                ))
            }
        };

        let (struct_ty, decl_fields) = match &self.units.decl(struct_decl).kind
        {
            DeclKind::Struct { ty, fields, .. } => (*ty, fields.clone()),
            _ => unreachable!(),
        };
        let sname = self.name_of(self.units.decl(struct_decl).name);

        let mut seen: Vec<DeclId> = Vec::new();
        for (i, (fname, value)) in fields.iter().enumerate() {
            let field = decl_fields
                .iter()
                .copied()
                .find(|f| self.units.decl(*f).name == *fname);
            let field = match field {
                Some(field) => field,
                None => {
                    return Err(self.err(
                        format!(
                            "no field '{}' on struct '{}'",
                            self.name_of(*fname),
                            sname
                        ),
                        loc,
                    ))
                }
            };
            if seen.contains(&field) {
                return Err(self.err(
                    format!(
                        "duplicate field '{}' in initializer",
                        self.name_of(*fname)
                    ),
                    loc,
                ));
            }
            seen.push(field);

            let field_ty = match &self.units.decl(field).kind {
                DeclKind::Field { ty, .. } => *ty,
                _ => unreachable!(),
            };
            let new_value = self.coerce(*value, field_ty)?;
            if let ExprKind::StructInit { fields, .. } =
                &mut self.units.expr_mut(expr).kind
            {
                fields[i].1 = new_value;
            }
        }

        for field in &decl_fields {
            if seen.contains(field) {
                continue;
            }
            let has_default = matches!(
                self.units.decl(*field).kind,
                DeclKind::Field { init: Some(_), .. }
            );
            if !has_default {
                return Err(self.err(
                    format!(
                        "missing field '{}' in initializer of '{}'",
                        self.name_of(self.units.decl(*field).name),
                        sname
                    ),
                    loc,
                ));
            }
        }

        // Pin the concrete (possibly specialised) struct declaration.
        if let ExprKind::StructInit { decl, .. } =
            &mut self.units.expr_mut(expr).kind
        {
            *decl = Some(struct_decl);
        }
        Ok((struct_ty, false))
    }

    fn check_array_init(
        &mut self,
        expr: ExprId,
        elems: Vec<ExprId>,
        expected: Option<TypeId>,
        loc: SourceLoc,
    ) -> Result<(TypeId, bool)> {
        match expected.map(|e| self.units.canon(e)) {
            Some(target)
                if self.units.array_elem(target).is_some() =>
            {
                let (elem_ty, size) =
                    self.units.array_elem(target).unwrap();
                if elems.len() as u64 != size {
                    return Err(self.err(
                        format!(
                            "array initializer has {} elements, expected {}",
                            elems.len(),
                            size
                        ),
                        loc,
                    ));
                }
                for (i, elem) in elems.iter().enumerate() {
                    let new_elem = self.coerce(*elem, elem_ty)?;
                    if let ExprKind::ArrayInit { elems } =
                        &mut self.units.expr_mut(expr).kind
                    {
                        elems[i] = new_elem;
                    }
                }
                Ok((target, false))
            }
            _ => {
                if elems.is_empty() {
                    return Err(self.err(
                        "cannot infer the type of an empty array initializer",
                        loc,
                    ));
                }
                let elem_ty = self.check_expr(elems[0], None)?;
                for (i, elem) in elems.iter().enumerate().skip(1) {
                    let new_elem = self.coerce(*elem, elem_ty)?;
                    if let ExprKind::ArrayInit { elems } =
                        &mut self.units.expr_mut(expr).kind
                    {
                        elems[i] = new_elem;
                    }
                }
                let ty = self
                    .units
                    .unit_mut(expr.unit)
                    .types
                    .intern_array(elem_ty, elems.len() as u64);
                Ok((ty, false))
            }
        }
    }

    /// Constant patterns: literals, enum variants, casts and sign flips of
    /// constants.
    fn is_const_expr(&self, expr: ExprId) -> bool {
        match &self.units.expr(expr).kind {
            ExprKind::Bool(_)
            | ExprKind::Int(_)
            | ExprKind::Float(_)
            | ExprKind::Char(_)
            | ExprKind::Nil
            | ExprKind::Sizeof { .. } => true,
            ExprKind::Spec { decl, .. } => matches!(
                decl.map(|d| &self.units.decl(d).kind),
                Some(DeclKind::EnumVariant { .. })
            ),
            ExprKind::Paren { expr } | ExprKind::Cast { expr } => {
                self.is_const_expr(*expr)
            }
            ExprKind::Unary { op, expr, .. } => {
                matches!(op, UnOp::Neg | UnOp::BitNot)
                    && self.is_const_expr(*expr)
            }
            _ => false,
        }
    }
}
