//! Expression lowering: leaves, memory access, calls, aggregates.

use super::{Lowering, ValueCtx};
use crate::function::Linkage;
use crate::value::Value;
use meddle_base::{Result, Symbol};
use meddle_syntax::ast::{DeclId, ExprId, TypeId};
use meddle_syntax::{DeclKind, ExprKind};

impl<'a> Lowering<'a> {
    pub(crate) fn lower_expr(
        &mut self,
        expr: ExprId,
        vc: ValueCtx,
    ) -> Result<Value> {
        let kind = self.units.expr(expr).kind.clone();
        match kind {
            ExprKind::Bool(value) => {
                let i1 = self.seg.types.i1();
                let id = self.seg.const_int(i1, value as i64);
                Ok(Value::Const(id))
            }
            ExprKind::Int(value) => {
                let ty = self.cgn_type(self.ety(expr))?;
                // An integer literal that adopted a float target type is a
                // float constant.
                let id = if self.seg.types.is_float(ty) {
                    self.seg.const_fp(ty, value as f64)
                } else {
                    self.seg.const_int(ty, value)
                };
                Ok(Value::Const(id))
            }
            ExprKind::Float(value) => {
                let ty = self.cgn_type(self.ety(expr))?;
                let id = self.seg.const_fp(ty, value);
                Ok(Value::Const(id))
            }
            ExprKind::Char(value) => {
                let i8_ty = self.seg.types.i8();
                let id = self.seg.const_int(i8_ty, value as i64);
                Ok(Value::Const(id))
            }
            ExprKind::Str(ref value) => self.lower_string(value.clone()),
            ExprKind::Nil => {
                let ty = self.cgn_type(self.ety(expr))?;
                let id = self.seg.const_nil(ty);
                Ok(Value::Const(id))
            }
            ExprKind::Ref { name, decl } => {
                let decl = decl.expect("ref pinned before lowering");
                self.lower_ref(expr, name, decl, vc)
            }
            ExprKind::Paren { expr: inner } => self.lower_expr(inner, vc),
            ExprKind::Cast { expr: inner } => self.lower_cast(expr, inner),
            ExprKind::Unary {
                op,
                expr: operand,
                postfix,
            } => self.lower_unary(expr, op, operand, postfix, vc),
            ExprKind::Binary { op, lhs, rhs } => {
                self.lower_binary(expr, op, lhs, rhs)
            }
            ExprKind::Access { base, name, field } => {
                let field = field.expect("field pinned by sema");
                self.lower_access(expr, base, name, field, vc)
            }
            ExprKind::Subscript { base, index } => {
                self.lower_subscript(expr, base, index, vc)
            }
            ExprKind::Call {
                callee, ref args, ..
            } => {
                let decl = match &self.units.expr(callee).kind {
                    ExprKind::Ref { decl, .. }
                    | ExprKind::Spec { decl, .. } => {
                        decl.expect("callee pinned by sema")
                    }
                    _ => {
                        return Err(self.err(
                            "called object is not a function",
                            self.eloc(expr),
                        ))
                    }
                };
                self.lower_call(expr, decl, None, args.clone())
            }
            ExprKind::MethodCall {
                base, decl, ref args, ..
            } => {
                let decl = decl.expect("method pinned by sema");
                self.lower_call(expr, decl, Some(base), args.clone())
            }
            ExprKind::Spec { decl, .. } => {
                let decl = decl.expect("spec pinned before lowering");
                self.lower_spec_value(expr, decl, vc)
            }
            ExprKind::StructInit { .. } | ExprKind::ArrayInit { .. } => {
                let ast_ty = self.ety(expr);
                let lowered = self.cgn_type(ast_ty)?;
                let base = match self.place.take() {
                    Some(place) => place,
                    None => {
                        let name = self.n("agg.tmp").to_string();
                        let slot =
                            self.b.build_slot(&mut self.seg, lowered, &name);
                        Value::Slot(slot)
                    }
                };
                self.lower_aggregate_init(base, expr, ast_ty)?;
                Ok(base)
            }
            ExprKind::Sizeof { target } => {
                let lowered = self.cgn_type(target)?;
                let size = self.layout_size(lowered);
                let ty = self.cgn_type(self.ety(expr))?;
                let id = self.seg.const_int(ty, size as i64);
                Ok(Value::Const(id))
            }
            ExprKind::Syscall { num, ref args } => {
                let i64_ty = self.seg.types.i64();
                let num = Value::Const(self.seg.const_int(i64_ty, num));
                let mut lowered = Vec::with_capacity(args.len());
                for arg in args.clone() {
                    lowered.push(self.lower_expr(arg, ValueCtx::RValue)?);
                }
                let name = self.n("syscall").to_string();
                Ok(self.b.build_syscall(&mut self.seg, num, lowered, &name))
            }
        }
    }

    /// String literals become readonly module data of `i8[len + 1]`; the
    /// expression yields the data's address.
    fn lower_string(&mut self, value: String) -> Result<Value> {
        let i8_ty = self.seg.types.i8();
        let array = self.seg.types.array(i8_ty, value.len() as u64 + 1);
        let constant = self.seg.const_str(array, value);
        let align = self.layout_align(array);
        let ptr = self.seg.types.ptr(array);
        let name = self.n("str");
        let id = self.seg.add_data(
            name,
            ptr,
            constant,
            align,
            true,
            Linkage::Internal,
        );
        Ok(Value::Data(id))
    }

    fn lower_ref(
        &mut self,
        expr: ExprId,
        name: Symbol,
        decl: DeclId,
        vc: ValueCtx,
    ) -> Result<Value> {
        match self.units.decl(decl).kind.clone() {
            // A bare field name inside a method body goes through the
            // receiver.
            DeclKind::Field { ty, index, .. } => {
                let self_slot = self
                    .self_slot
                    .expect("field reference outside a method");
                let field_ty = self.cgn_type(ty)?;
                let self_ty =
                    self.seg.function(self.b.func).slot(self_slot).alloc;
                let self_ptr = self.b.build_load(
                    &mut self.seg,
                    self_ty,
                    Value::Slot(self_slot),
                    "",
                );
                let ptr_ty = self.seg.types.ptr(field_ty);
                let i64_ty = self.seg.types.i64();
                let index =
                    Value::Const(self.seg.const_int(i64_ty, index as i64));
                let field_ptr = self.b.build_ap(
                    &mut self.seg,
                    ptr_ty,
                    self_ptr,
                    index,
                    "",
                );
                match vc {
                    ValueCtx::LValue => Ok(field_ptr),
                    ValueCtx::RValue => Ok(self.b.build_load(
                        &mut self.seg,
                        field_ty,
                        field_ptr,
                        "",
                    )),
                }
            }
            DeclKind::Var { global: true, .. } => {
                self.lower_global_ref(expr, name, decl, vc)
            }
            DeclKind::Var { .. } | DeclKind::Param { .. } => {
                let slot = *self
                    .slots
                    .get(&decl)
                    .expect("local has a slot in this function");
                match vc {
                    ValueCtx::LValue => Ok(Value::Slot(slot)),
                    ValueCtx::RValue => {
                        let ty = self.cgn_type(self.ety(expr))?;
                        let spelled = self.sess.interner.resolve(name);
                        let load_name = if self.sess.opts.named_mir {
                            format!("{spelled}.val")
                        } else {
                            String::new()
                        };
                        Ok(self.b.build_load(
                            &mut self.seg,
                            ty,
                            Value::Slot(slot),
                            &load_name,
                        ))
                    }
                }
            }
            DeclKind::EnumVariant { ty, value } => {
                let lowered = self.cgn_type(ty)?;
                let id = self.seg.const_int(lowered, value);
                Ok(Value::Const(id))
            }
            _ => Err(self.err(
                "function references are not supported",
                self.eloc(expr),
            )),
        }
    }

    /// Module-scope data reference; foreign globals are materialised on
    /// demand in this segment.
    fn lower_global_ref(
        &mut self,
        expr: ExprId,
        name: Symbol,
        decl: DeclId,
        vc: ValueCtx,
    ) -> Result<Value> {
        let spelled = self.sess.interner.resolve(name).to_string();
        let data = match self.seg.get_data(&spelled) {
            Some(data) => data,
            None => {
                let (ty, init, mutable) = match &self.units.decl(decl).kind {
                    DeclKind::Var {
                        ty: Some(ty),
                        init: Some(init),
                        mutable,
                        ..
                    } => (*ty, *init, *mutable),
                    _ => {
                        return Err(self.err(
                            "global variable must have an initializer",
                            self.eloc(expr),
                        ))
                    }
                };
                let lowered = self.cgn_type(ty)?;
                let value = self.lower_const_init(init)?;
                let align = self.layout_align(lowered);
                let ptr = self.seg.types.ptr(lowered);
                self.seg.add_data(
                    &spelled,
                    ptr,
                    value,
                    align,
                    !mutable,
                    Linkage::External,
                )
            }
        };
        match vc {
            ValueCtx::LValue => Ok(Value::Data(data)),
            ValueCtx::RValue => {
                let ty = self.cgn_type(self.ety(expr))?;
                let load_name = if self.sess.opts.named_mir {
                    format!("{spelled}.val")
                } else {
                    String::new()
                };
                Ok(self.b.build_load(
                    &mut self.seg,
                    ty,
                    Value::Data(data),
                    &load_name,
                ))
            }
        }
    }

    fn lower_spec_value(
        &mut self,
        expr: ExprId,
        decl: DeclId,
        vc: ValueCtx,
    ) -> Result<Value> {
        match self.units.decl(decl).kind.clone() {
            DeclKind::EnumVariant { ty, value } => {
                let lowered = self.cgn_type(ty)?;
                let id = self.seg.const_int(lowered, value);
                Ok(Value::Const(id))
            }
            DeclKind::Var { global: true, .. } => {
                let name = self.units.decl(decl).name;
                self.lower_global_ref(expr, name, decl, vc)
            }
            _ => Err(self.err(
                "qualified name is not usable as a value",
                self.eloc(expr),
            )),
        }
    }

    /// Field access: `ap` for an lvalue, `ap` + `load` for an rvalue. A
    /// pointer base auto-dereferences one level (it is evaluated as an
    /// rvalue pointer).
    fn lower_access(
        &mut self,
        expr: ExprId,
        base: ExprId,
        name: Symbol,
        field: DeclId,
        vc: ValueCtx,
    ) -> Result<Value> {
        let base_ty = self.ety(base);
        let base_vc = if self.units.pointee(base_ty).is_some() {
            ValueCtx::RValue
        } else {
            ValueCtx::LValue
        };
        let base_value = self.lower_expr(base, base_vc)?;

        let index = match &self.units.decl(field).kind {
            DeclKind::Field { index, .. } => *index,
            _ => unreachable!("access pins a field decl"),
        };
        let field_ty = self.cgn_type(self.ety(expr))?;
        let ptr_ty = self.seg.types.ptr(field_ty);
        let i64_ty = self.seg.types.i64();
        let index = Value::Const(self.seg.const_int(i64_ty, index as i64));
        let name_str = self.n("access.ptr").to_string();
        let field_ptr = self.b.build_ap(
            &mut self.seg,
            ptr_ty,
            base_value,
            index,
            &name_str,
        );

        match vc {
            ValueCtx::LValue => Ok(field_ptr),
            ValueCtx::RValue => {
                let spelled = self.sess.interner.resolve(name);
                let load_name = if self.sess.opts.named_mir {
                    format!("{spelled}.val")
                } else {
                    String::new()
                };
                Ok(self.b.build_load(
                    &mut self.seg,
                    field_ty,
                    field_ptr,
                    &load_name,
                ))
            }
        }
    }

    fn lower_subscript(
        &mut self,
        expr: ExprId,
        base: ExprId,
        index: ExprId,
        vc: ValueCtx,
    ) -> Result<Value> {
        let elem_ty = self.cgn_type(self.ety(expr))?;
        let ptr_ty = self.seg.types.ptr(elem_ty);

        let base_ty = self.ety(base);
        let base_vc = if self.units.pointee(base_ty).is_some() {
            ValueCtx::RValue
        } else {
            ValueCtx::LValue
        };
        let base_value = self.lower_expr(base, base_vc)?;
        let index_value = self.lower_expr(index, ValueCtx::RValue)?;

        let name = self.n("ss.ptr").to_string();
        let elem_ptr = self.b.build_ap(
            &mut self.seg,
            ptr_ty,
            base_value,
            index_value,
            &name,
        );
        match vc {
            ValueCtx::LValue => Ok(elem_ptr),
            ValueCtx::RValue => {
                let name = self.n("ss.val").to_string();
                Ok(self.b.build_load(&mut self.seg, elem_ty, elem_ptr, &name))
            }
        }
    }

    /// Call lowering, shared between free calls and method calls. The
    /// caller owns aggregate argument copies and the `ARet` slot.
    fn lower_call(
        &mut self,
        expr: ExprId,
        callee_decl: DeclId,
        receiver: Option<ExprId>,
        args: Vec<ExprId>,
    ) -> Result<Value> {
        let callee = self.declare_function(callee_decl)?;
        let has_aret = self.seg.function(callee).has_aret();

        let mut lowered_args = Vec::with_capacity(args.len() + 2);

        let aret = if has_aret {
            let ret_ty = self.cgn_type(self.ety(expr))?;
            let value = match self.place.take() {
                Some(place) => place,
                None => {
                    let name = self.n("aret.tmp").to_string();
                    let slot =
                        self.b.build_slot(&mut self.seg, ret_ty, &name);
                    Value::Slot(slot)
                }
            };
            lowered_args.push(value);
            Some(value)
        } else {
            None
        };

        if let Some(receiver) = receiver {
            let recv_ty = self.ety(receiver);
            let recv_vc = if self.units.pointee(recv_ty).is_some() {
                ValueCtx::RValue
            } else {
                ValueCtx::LValue
            };
            let value = self.lower_expr(receiver, recv_vc)?;
            lowered_args.push(value);
        }

        let fixed = lowered_args.len();
        for (i, arg) in args.iter().enumerate() {
            let mir_index = fixed + i;
            let is_aarg = self
                .seg
                .function(callee)
                .arg_has_attr(mir_index, crate::function::ArgAttr::AARG);
            if is_aarg {
                // The caller clones aggregate arguments into a temporary
                // slot before the call.
                let arg_ty = self.cgn_type(self.ety(*arg))?;
                let name = self.n("aarg.tmp").to_string();
                let slot = self.b.build_slot(&mut self.seg, arg_ty, &name);

                self.place = Some(Value::Slot(slot));
                let value = self.lower_expr(*arg, ValueCtx::LValue)?;
                self.place = None;

                if value != Value::Slot(slot) {
                    let align = self.layout_align(arg_ty);
                    let size = self.layout_size(arg_ty);
                    self.b.build_cpy(
                        &mut self.seg,
                        Value::Slot(slot),
                        align,
                        value,
                        align,
                        size,
                    );
                }
                lowered_args.push(Value::Slot(slot));
            } else {
                let value = self.lower_expr(*arg, ValueCtx::RValue)?;
                lowered_args.push(value);
            }
        }

        let name = self.n("call.tmp").to_string();
        let call =
            self.b
                .build_call(&mut self.seg, callee, lowered_args, &name);
        Ok(aret.unwrap_or(call))
    }

    /// Writes an aggregate initialiser element-by-element through `ap`.
    pub(crate) fn lower_aggregate_init(
        &mut self,
        base: Value,
        expr: ExprId,
        ast_ty: TypeId,
    ) -> Result<()> {
        let kind = self.units.expr(expr).kind.clone();
        match kind {
            ExprKind::ArrayInit { elems } => {
                let (elem_ast, _) = self
                    .units
                    .array_elem(ast_ty)
                    .expect("array initialiser has an array type");
                let elem_ty = self.cgn_type(elem_ast)?;
                let ptr_ty = self.seg.types.ptr(elem_ty);
                let i64_ty = self.seg.types.i64();
                for (i, elem) in elems.iter().enumerate() {
                    let index =
                        Value::Const(self.seg.const_int(i64_ty, i as i64));
                    let name = self.n("agg.elem").to_string();
                    let elem_ptr = self.b.build_ap(
                        &mut self.seg,
                        ptr_ty,
                        base,
                        index,
                        &name,
                    );
                    self.lower_aggregate_init(elem_ptr, *elem, elem_ast)?;
                }
                Ok(())
            }
            ExprKind::StructInit { decl, fields, .. } => {
                let struct_decl = decl.expect("struct init pinned by sema");
                let decl_fields = match &self.units.decl(struct_decl).kind {
                    DeclKind::Struct { fields, .. } => fields.clone(),
                    _ => unreachable!("struct init pins a struct decl"),
                };
                let i64_ty = self.seg.types.i64();
                for field in decl_fields {
                    let (fty, findex, fname, default) =
                        match &self.units.decl(field).kind {
                            DeclKind::Field {
                                ty, index, init, ..
                            } => (
                                *ty,
                                *index,
                                self.units.decl(field).name,
                                *init,
                            ),
                            _ => continue,
                        };
                    let value_expr = fields
                        .iter()
                        .find(|(n, _)| *n == fname)
                        .map(|(_, e)| *e)
                        .or(default)
                        .expect("sema checked initializer completeness");

                    let field_ty = self.cgn_type(fty)?;
                    let ptr_ty = self.seg.types.ptr(field_ty);
                    let index = Value::Const(
                        self.seg.const_int(i64_ty, findex as i64),
                    );
                    let name = self.n("agg.elem").to_string();
                    let field_ptr = self.b.build_ap(
                        &mut self.seg,
                        ptr_ty,
                        base,
                        index,
                        &name,
                    );
                    self.lower_aggregate_init(field_ptr, value_expr, fty)?;
                }
                Ok(())
            }
            _ => {
                let lowered = self.cgn_type(ast_ty)?;
                if self.seg.types.is_scalar(lowered) {
                    let value = self.lower_expr(expr, ValueCtx::RValue)?;
                    self.b.build_store(&mut self.seg, value, base);
                } else {
                    // A nested non-literal aggregate (string, call result):
                    // direct it at this address, copying if it landed
                    // elsewhere.
                    self.place = Some(base);
                    let value = self.lower_expr(expr, ValueCtx::LValue)?;
                    self.place = None;
                    if value != base {
                        let align = self.layout_align(lowered);
                        let size = self.layout_size(lowered);
                        self.b.build_cpy(
                            &mut self.seg,
                            base,
                            align,
                            value,
                            align,
                            size,
                        );
                    }
                }
                Ok(())
            }
        }
    }
}
