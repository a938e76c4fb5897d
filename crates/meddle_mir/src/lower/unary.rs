//! Unary operator, cast and constant-initialiser lowering.

use super::{Lowering, ValueCtx};
use crate::inst::{BinopKind, UnopKind};
use crate::value::{ConstId, ConstKind, Value};
use meddle_base::Result;
use meddle_sema::unitman::TypeClass;
use meddle_syntax::ast::ExprId;
use meddle_syntax::{DeclKind, ExprKind, UnOp};

impl<'a> Lowering<'a> {
    pub(crate) fn lower_unary(
        &mut self,
        expr: ExprId,
        op: UnOp,
        operand: ExprId,
        postfix: bool,
        vc: ValueCtx,
    ) -> Result<Value> {
        match op {
            UnOp::Not => {
                let value = self.lower_expr(operand, ValueCtx::RValue)?;
                let value = self.inject_cmp(value)?;
                let i1 = self.seg.types.i1();
                let one = Value::Const(self.seg.const_int(i1, 1));
                let name = self.n("lnot").to_string();
                Ok(self.b.build_binop(
                    &mut self.seg,
                    BinopKind::Xor,
                    value,
                    one,
                    &name,
                ))
            }
            UnOp::BitNot => {
                let value = self.lower_expr(operand, ValueCtx::RValue)?;
                let name = self.n("bnot").to_string();
                Ok(self.b.build_unop(
                    &mut self.seg,
                    UnopKind::Not,
                    value,
                    &name,
                ))
            }
            UnOp::Neg => {
                let value = self.lower_expr(operand, ValueCtx::RValue)?;
                match self.units.type_class(self.ety(operand)) {
                    TypeClass::Float => {
                        let name = self.n("fneg").to_string();
                        Ok(self.b.build_unop(
                            &mut self.seg,
                            UnopKind::FNeg,
                            value,
                            &name,
                        ))
                    }
                    _ => {
                        let name = self.n("neg").to_string();
                        Ok(self.b.build_unop(
                            &mut self.seg,
                            UnopKind::Neg,
                            value,
                            &name,
                        ))
                    }
                }
            }
            UnOp::AddrOf => self.lower_expr(operand, ValueCtx::LValue),
            UnOp::Deref => {
                let value = self.lower_expr(operand, ValueCtx::RValue)?;
                match vc {
                    ValueCtx::LValue => Ok(value),
                    ValueCtx::RValue => {
                        let ty = self.cgn_type(self.ety(expr))?;
                        let name = self.n("deref").to_string();
                        Ok(self.b.build_load(&mut self.seg, ty, value, &name))
                    }
                }
            }
            UnOp::Inc | UnOp::Dec => {
                let addr = self.lower_expr(operand, ValueCtx::LValue)?;
                let ty = self.cgn_type(self.ety(operand))?;
                let og_name = if op == UnOp::Inc {
                    self.n("inc.og").to_string()
                } else {
                    self.n("dec.og").to_string()
                };
                let original =
                    self.b.build_load(&mut self.seg, ty, addr, &og_name);

                let is_float = self.seg.types.is_float(ty);
                let one = if is_float {
                    Value::Const(self.seg.const_fp(ty, 1.0))
                } else {
                    Value::Const(self.seg.const_int(ty, 1))
                };
                let kind = match (op, is_float) {
                    (UnOp::Inc, false) => BinopKind::Add,
                    (UnOp::Inc, true) => BinopKind::FAdd,
                    (UnOp::Dec, false) => BinopKind::Sub,
                    (UnOp::Dec, true) => BinopKind::FSub,
                    _ => unreachable!(),
                };
                let updated = self.b.build_binop(
                    &mut self.seg,
                    kind,
                    original,
                    one,
                    "",
                );
                self.b.build_store(&mut self.seg, updated, addr);
                Ok(if postfix { original } else { updated })
            }
        }
    }

    pub(crate) fn lower_cast(
        &mut self,
        expr: ExprId,
        operand: ExprId,
    ) -> Result<Value> {
        let src_ast = self.ety(operand);
        let dst_ast = self.ety(expr);
        let src_class = self.units.type_class(src_ast);
        let dst_class = self.units.type_class(dst_ast);
        let dst = self.cgn_type(dst_ast)?;

        // Array-to-pointer decay takes the array's address.
        if src_class == TypeClass::Aggregate && dst_class == TypeClass::Pointer
        {
            let value = self.lower_expr(operand, ValueCtx::LValue)?;
            let name = self.n("cast.ptr").to_string();
            return Ok(self.b.build_conv(
                &mut self.seg,
                UnopKind::Reint,
                value,
                dst,
                &name,
            ));
        }

        let value = self.lower_expr(operand, ValueCtx::RValue)?;
        let src = self.cgn_type(src_ast)?;
        if src == dst {
            return Ok(value);
        }

        use TypeClass::*;
        let is_int = |c: TypeClass| matches!(c, SInt | UInt);

        if is_int(src_class) && is_int(dst_class) {
            // Bit-width one is special: i1 only widens with zext.
            if self.seg.types.is_i1(src) {
                let name = self.n("cast.zext").to_string();
                return Ok(self.b.build_conv(
                    &mut self.seg,
                    UnopKind::ZExt,
                    value,
                    dst,
                    &name,
                ));
            }
            if self.seg.types.is_i1(dst) {
                let name = self.n("cast.trunc").to_string();
                return Ok(self.b.build_conv(
                    &mut self.seg,
                    UnopKind::Trunc,
                    value,
                    dst,
                    &name,
                ));
            }
            let src_width = self.layout_size(src);
            let dst_width = self.layout_size(dst);
            if src_width == dst_width {
                return Ok(value);
            }
            if src_width > dst_width {
                let name = self.n("cast.trunc").to_string();
                return Ok(self.b.build_conv(
                    &mut self.seg,
                    UnopKind::Trunc,
                    value,
                    dst,
                    &name,
                ));
            }
            let (op, name) = if src_class == SInt {
                (UnopKind::SExt, self.n("cast.sext"))
            } else {
                (UnopKind::ZExt, self.n("cast.zext"))
            };
            let name = name.to_string();
            return Ok(self.b.build_conv(&mut self.seg, op, value, dst, &name));
        }

        if src_class == Float && dst_class == Float {
            let src_width = self.layout_size(src);
            let dst_width = self.layout_size(dst);
            if src_width == dst_width {
                return Ok(value);
            }
            let (op, name) = if src_width > dst_width {
                (UnopKind::FTrunc, self.n("cast.ftrunc"))
            } else {
                (UnopKind::FExt, self.n("cast.fext"))
            };
            let name = name.to_string();
            return Ok(self.b.build_conv(&mut self.seg, op, value, dst, &name));
        }

        let conv = match (src_class, dst_class) {
            (SInt, Float) => Some(UnopKind::Si2Fp),
            (UInt, Float) => Some(UnopKind::Ui2Fp),
            (Float, SInt) => Some(UnopKind::Fp2Si),
            (Float, UInt) => Some(UnopKind::Fp2Ui),
            _ => None,
        };
        if let Some(op) = conv {
            let name = self.n("cast.cvt").to_string();
            return Ok(self.b.build_conv(&mut self.seg, op, value, dst, &name));
        }

        let conv = match (src_class, dst_class) {
            (Pointer, Pointer) => Some(UnopKind::Reint),
            (Pointer, SInt) | (Pointer, UInt) => Some(UnopKind::Ptr2Int),
            (SInt, Pointer) | (UInt, Pointer) => Some(UnopKind::Int2Ptr),
            _ => None,
        };
        if let Some(op) = conv {
            let name = self.n("cast.ptr").to_string();
            return Ok(self.b.build_conv(&mut self.seg, op, value, dst, &name));
        }

        Err(self.err(
            format!(
                "invalid cast from type '{}' to '{}'",
                self.units.type_name(src_ast, &self.sess.interner),
                self.units.type_name(dst_ast, &self.sess.interner)
            ),
            self.eloc(expr),
        ))
    }

    /// Evaluates a constant initialiser for module-scope data.
    pub(crate) fn lower_const_init(&mut self, expr: ExprId) -> Result<ConstId> {
        let kind = self.units.expr(expr).kind.clone();
        let loc = self.eloc(expr);
        match kind {
            ExprKind::Int(value) => {
                let ty = self.cgn_type(self.ety(expr))?;
                if self.seg.types.is_float(ty) {
                    Ok(self.seg.const_fp(ty, value as f64))
                } else {
                    Ok(self.seg.const_int(ty, value))
                }
            }
            ExprKind::Float(value) => {
                let ty = self.cgn_type(self.ety(expr))?;
                Ok(self.seg.const_fp(ty, value))
            }
            ExprKind::Bool(value) => {
                let i1 = self.seg.types.i1();
                Ok(self.seg.const_int(i1, value as i64))
            }
            ExprKind::Char(value) => {
                let i8_ty = self.seg.types.i8();
                Ok(self.seg.const_int(i8_ty, value as i64))
            }
            ExprKind::Str(value) => {
                let i8_ty = self.seg.types.i8();
                let array =
                    self.seg.types.array(i8_ty, value.len() as u64 + 1);
                Ok(self.seg.const_str(array, value))
            }
            ExprKind::Nil => {
                let ty = self.cgn_type(self.ety(expr))?;
                Ok(self.seg.const_nil(ty))
            }
            ExprKind::Sizeof { target } => {
                let lowered = self.cgn_type(target)?;
                let size = self.layout_size(lowered);
                let ty = self.cgn_type(self.ety(expr))?;
                Ok(self.seg.const_int(ty, size as i64))
            }
            ExprKind::Paren { expr: inner } => self.lower_const_init(inner),
            ExprKind::Cast { expr: inner } => {
                let value = self.lower_const_init(inner)?;
                let target = self.cgn_type(self.ety(expr))?;
                let data = self.seg.const_data(value).clone();
                match data.kind {
                    ConstKind::Int(v) => {
                        if self.seg.types.is_float(target) {
                            Ok(self.seg.const_fp(target, v as f64))
                        } else {
                            Ok(self.seg.const_int(target, v))
                        }
                    }
                    ConstKind::Fp(v) => {
                        if self.seg.types.is_float(target) {
                            Ok(self.seg.const_fp(target, v))
                        } else {
                            Ok(self.seg.const_int(target, v as i64))
                        }
                    }
                    ConstKind::Nil => Ok(self.seg.const_nil(target)),
                    _ => Err(self.err(
                        "global variable must be initialized with a constant",
                        loc,
                    )),
                }
            }
            ExprKind::Unary {
                op: UnOp::Neg,
                expr: inner,
                ..
            } => {
                let value = self.lower_const_init(inner)?;
                let data = self.seg.const_data(value).clone();
                match data.kind {
                    ConstKind::Int(v) => Ok(self.seg.const_int(data.ty, -v)),
                    ConstKind::Fp(v) => Ok(self.seg.const_fp(data.ty, -v)),
                    _ => Err(self.err(
                        "global variable must be initialized with a constant",
                        loc,
                    )),
                }
            }
            ExprKind::Unary {
                op: UnOp::BitNot,
                expr: inner,
                ..
            } => {
                let value = self.lower_const_init(inner)?;
                let data = self.seg.const_data(value).clone();
                match data.kind {
                    ConstKind::Int(v) => Ok(self.seg.const_int(data.ty, !v)),
                    _ => Err(self.err(
                        "global variable must be initialized with a constant",
                        loc,
                    )),
                }
            }
            ExprKind::Ref { decl: Some(decl), .. }
            | ExprKind::Spec {
                decl: Some(decl), ..
            } => match self.units.decl(decl).kind.clone() {
                DeclKind::EnumVariant { ty, value } => {
                    let lowered = self.cgn_type(ty)?;
                    Ok(self.seg.const_int(lowered, value))
                }
                _ => Err(self.err(
                    "global variable must be initialized with a constant",
                    loc,
                )),
            },
            ExprKind::ArrayInit { elems } => {
                let ty = self.cgn_type(self.ety(expr))?;
                let mut values = Vec::with_capacity(elems.len());
                for elem in elems {
                    values.push(self.lower_const_init(elem)?);
                }
                Ok(self.seg.const_aggregate(ty, values))
            }
            ExprKind::StructInit { decl, fields, .. } => {
                let struct_decl = decl.expect("struct init pinned by sema");
                let decl_fields = match &self.units.decl(struct_decl).kind {
                    DeclKind::Struct { fields, .. } => fields.clone(),
                    _ => Vec::new(),
                };
                let ty = self.cgn_type(self.ety(expr))?;
                let mut values = Vec::with_capacity(decl_fields.len());
                for field in decl_fields {
                    let (fname, default) = {
                        let data = self.units.decl(field);
                        let default = match &data.kind {
                            DeclKind::Field { init, .. } => *init,
                            _ => None,
                        };
                        (data.name, default)
                    };
                    let value_expr = fields
                        .iter()
                        .find(|(n, _)| *n == fname)
                        .map(|(_, e)| *e)
                        .or(default)
                        .expect("sema checked initializer completeness");
                    values.push(self.lower_const_init(value_expr)?);
                }
                Ok(self.seg.const_aggregate(ty, values))
            }
            _ => Err(self.err(
                "global variable must be initialized with a constant",
                loc,
            )),
        }
    }
}
