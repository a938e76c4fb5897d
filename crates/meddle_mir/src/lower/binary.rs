//! Binary operator lowering: assignments, arithmetic, comparisons and the
//! short-circuiting logical operators.

use super::{Lowering, ValueCtx};
use crate::inst::{BinopKind, CmpKind, UnopKind};
use crate::value::Value;
use meddle_base::Result;
use meddle_sema::unitman::TypeClass;
use meddle_syntax::ast::ExprId;
use meddle_syntax::BinOp;

impl<'a> Lowering<'a> {
    pub(crate) fn lower_binary(
        &mut self,
        expr: ExprId,
        op: BinOp,
        lhs: ExprId,
        rhs: ExprId,
    ) -> Result<Value> {
        match op {
            BinOp::Assign => self.lower_assign(lhs, rhs),
            BinOp::LogicAnd => self.lower_logic_and(lhs, rhs),
            BinOp::LogicOr => self.lower_logic_or(lhs, rhs),
            _ if op.is_assignment() => {
                self.lower_compound_assign(expr, op, lhs, rhs)
            }
            _ if op.is_comparison() => self.lower_cmp(expr, op, lhs, rhs),
            _ => self.lower_arith(expr, op, lhs, rhs),
        }
    }

    fn lower_assign(&mut self, lhs: ExprId, rhs: ExprId) -> Result<Value> {
        let dest = self.lower_expr(lhs, ValueCtx::LValue)?;
        let ast_ty = self.ety(lhs);
        let lowered = self.cgn_type(ast_ty)?;

        if self.units.expr(rhs).kind.is_aggregate_init() {
            self.place = Some(dest);
            self.lower_expr(rhs, ValueCtx::RValue)?;
            self.place = None;
            return Ok(dest);
        }

        if self.seg.types.is_aggregate(lowered) {
            let value = self.lower_expr(rhs, ValueCtx::LValue)?;
            let align = self.layout_align(lowered);
            let size = self.layout_size(lowered);
            self.b
                .build_cpy(&mut self.seg, dest, align, value, align, size);
            return Ok(dest);
        }

        let value = self.lower_expr(rhs, ValueCtx::RValue)?;
        self.b.build_store(&mut self.seg, value, dest);
        Ok(value)
    }

    fn lower_compound_assign(
        &mut self,
        expr: ExprId,
        op: BinOp,
        lhs: ExprId,
        rhs: ExprId,
    ) -> Result<Value> {
        use TypeClass::*;
        let class = self.units.type_class(self.ety(lhs));
        let lhs_value = self.lower_expr(lhs, ValueCtx::RValue)?;
        let rhs_value = self.lower_expr(rhs, ValueCtx::RValue)?;

        let result = match op {
            BinOp::AddAssign => {
                let name = self.n("add.asn").to_string();
                match class {
                    Pointer => {
                        let ty = self.b.value_ty(&self.seg, lhs_value);
                        self.b.build_ap(
                            &mut self.seg,
                            ty,
                            lhs_value,
                            rhs_value,
                            &name,
                        )
                    }
                    SInt | UInt => self.binop(
                        BinopKind::Add,
                        lhs_value,
                        rhs_value,
                        &name,
                    ),
                    Float => self.binop(
                        BinopKind::FAdd,
                        lhs_value,
                        rhs_value,
                        &name,
                    ),
                    _ => {
                        return Err(self.unsupported_op(op, expr));
                    }
                }
            }
            BinOp::SubAssign => {
                let name = self.n("sub.asn").to_string();
                match class {
                    Pointer => {
                        let neg_name = self.n("parith.neg").to_string();
                        let neg = self.b.build_unop(
                            &mut self.seg,
                            UnopKind::Neg,
                            rhs_value,
                            &neg_name,
                        );
                        let ty = self.b.value_ty(&self.seg, lhs_value);
                        self.b.build_ap(
                            &mut self.seg,
                            ty,
                            lhs_value,
                            neg,
                            &name,
                        )
                    }
                    SInt | UInt => self.binop(
                        BinopKind::Sub,
                        lhs_value,
                        rhs_value,
                        &name,
                    ),
                    Float => self.binop(
                        BinopKind::FSub,
                        lhs_value,
                        rhs_value,
                        &name,
                    ),
                    _ => return Err(self.unsupported_op(op, expr)),
                }
            }
            BinOp::MulAssign => {
                let name = self.n("mul.asn").to_string();
                let kind = match class {
                    SInt => BinopKind::SMul,
                    UInt => BinopKind::UMul,
                    Float => BinopKind::FMul,
                    _ => return Err(self.unsupported_op(op, expr)),
                };
                self.binop(kind, lhs_value, rhs_value, &name)
            }
            BinOp::DivAssign => {
                let name = self.n("div.asn").to_string();
                let kind = match class {
                    SInt => BinopKind::SDiv,
                    UInt => BinopKind::UDiv,
                    Float => BinopKind::FDiv,
                    _ => return Err(self.unsupported_op(op, expr)),
                };
                self.binop(kind, lhs_value, rhs_value, &name)
            }
            BinOp::ModAssign => {
                let name = self.n("mod.asn").to_string();
                let kind = match class {
                    SInt => BinopKind::SRem,
                    UInt => BinopKind::URem,
                    _ => return Err(self.unsupported_op(op, expr)),
                };
                self.binop(kind, lhs_value, rhs_value, &name)
            }
            BinOp::AndAssign => {
                let name = self.n("and.asn").to_string();
                self.int_binop(BinopKind::And, class, lhs_value, rhs_value, &name, op, expr)?
            }
            BinOp::OrAssign => {
                let name = self.n("or.asn").to_string();
                self.int_binop(BinopKind::Or, class, lhs_value, rhs_value, &name, op, expr)?
            }
            BinOp::XorAssign => {
                let name = self.n("xor.asn").to_string();
                self.int_binop(BinopKind::Xor, class, lhs_value, rhs_value, &name, op, expr)?
            }
            BinOp::ShlAssign => {
                let name = self.n("shl.asn").to_string();
                self.int_binop(BinopKind::Shl, class, lhs_value, rhs_value, &name, op, expr)?
            }
            BinOp::ShrAssign => {
                let name = self.n("shr.asn").to_string();
                let kind = match class {
                    SInt => BinopKind::AShr,
                    UInt => BinopKind::LShr,
                    _ => return Err(self.unsupported_op(op, expr)),
                };
                self.binop(kind, lhs_value, rhs_value, &name)
            }
            _ => unreachable!("compound assignment operators only"),
        };

        let dest = self.lower_expr(lhs, ValueCtx::LValue)?;
        self.b.build_store(&mut self.seg, result, dest);
        Ok(result)
    }

    fn lower_cmp(
        &mut self,
        expr: ExprId,
        op: BinOp,
        lhs: ExprId,
        rhs: ExprId,
    ) -> Result<Value> {
        use TypeClass::*;
        let class = self.units.type_class(self.ety(lhs));
        let lhs_value = self.lower_expr(lhs, ValueCtx::RValue)?;
        let rhs_value = self.lower_expr(rhs, ValueCtx::RValue)?;

        let (kind, name) = match op {
            BinOp::Eq => (
                match class {
                    SInt | UInt => CmpKind::IcmpEq,
                    Float => CmpKind::FcmpOeq,
                    Pointer => CmpKind::PcmpEq,
                    _ => return Err(self.unsupported_op(op, expr)),
                },
                "cmp.eq",
            ),
            BinOp::Ne => (
                match class {
                    SInt | UInt => CmpKind::IcmpNe,
                    Float => CmpKind::FcmpOne,
                    Pointer => CmpKind::PcmpNe,
                    _ => return Err(self.unsupported_op(op, expr)),
                },
                "cmp.ne",
            ),
            BinOp::Lt => (
                match class {
                    SInt => CmpKind::IcmpSlt,
                    UInt => CmpKind::IcmpUlt,
                    Float => CmpKind::FcmpOlt,
                    Pointer => CmpKind::PcmpLt,
                    _ => return Err(self.unsupported_op(op, expr)),
                },
                "cmp.lt",
            ),
            BinOp::Le => (
                match class {
                    SInt => CmpKind::IcmpSle,
                    UInt => CmpKind::IcmpUle,
                    Float => CmpKind::FcmpOle,
                    Pointer => CmpKind::PcmpLe,
                    _ => return Err(self.unsupported_op(op, expr)),
                },
                "cmp.le",
            ),
            BinOp::Gt => (
                match class {
                    SInt => CmpKind::IcmpSgt,
                    UInt => CmpKind::IcmpUgt,
                    Float => CmpKind::FcmpOgt,
                    Pointer => CmpKind::PcmpGt,
                    _ => return Err(self.unsupported_op(op, expr)),
                },
                "cmp.gt",
            ),
            BinOp::Ge => (
                match class {
                    SInt => CmpKind::IcmpSge,
                    UInt => CmpKind::IcmpUge,
                    Float => CmpKind::FcmpOge,
                    Pointer => CmpKind::PcmpGe,
                    _ => return Err(self.unsupported_op(op, expr)),
                },
                "cmp.ge",
            ),
            _ => unreachable!("comparison operators only"),
        };
        let name = self.n(name).to_string();
        Ok(self
            .b
            .build_cmp(&mut self.seg, kind, lhs_value, rhs_value, &name))
    }

    fn lower_arith(
        &mut self,
        expr: ExprId,
        op: BinOp,
        lhs: ExprId,
        rhs: ExprId,
    ) -> Result<Value> {
        use TypeClass::*;
        let class = self.units.type_class(self.ety(lhs));
        let lhs_value = self.lower_expr(lhs, ValueCtx::RValue)?;
        let rhs_value = self.lower_expr(rhs, ValueCtx::RValue)?;

        let value = match op {
            BinOp::Add => match class {
                Pointer => {
                    let ty = self.b.value_ty(&self.seg, lhs_value);
                    self.b
                        .build_ap(&mut self.seg, ty, lhs_value, rhs_value, "")
                }
                SInt | UInt => {
                    let name = self.n("add").to_string();
                    self.binop(BinopKind::Add, lhs_value, rhs_value, &name)
                }
                Float => {
                    let name = self.n("add").to_string();
                    self.binop(BinopKind::FAdd, lhs_value, rhs_value, &name)
                }
                _ => return Err(self.unsupported_op(op, expr)),
            },
            BinOp::Sub => match class {
                Pointer => {
                    let neg_name = self.n("parith.neg").to_string();
                    let neg = self.b.build_unop(
                        &mut self.seg,
                        UnopKind::Neg,
                        rhs_value,
                        &neg_name,
                    );
                    let ty = self.b.value_ty(&self.seg, lhs_value);
                    let name = self.n("sub").to_string();
                    self.b
                        .build_ap(&mut self.seg, ty, lhs_value, neg, &name)
                }
                SInt | UInt => {
                    let name = self.n("sub").to_string();
                    self.binop(BinopKind::Sub, lhs_value, rhs_value, &name)
                }
                Float => {
                    let name = self.n("sub").to_string();
                    self.binop(BinopKind::FSub, lhs_value, rhs_value, &name)
                }
                _ => return Err(self.unsupported_op(op, expr)),
            },
            BinOp::Mul => {
                let name = self.n("mul").to_string();
                let kind = match class {
                    SInt => BinopKind::SMul,
                    UInt => BinopKind::UMul,
                    Float => BinopKind::FMul,
                    _ => return Err(self.unsupported_op(op, expr)),
                };
                self.binop(kind, lhs_value, rhs_value, &name)
            }
            BinOp::Div => {
                let name = self.n("div").to_string();
                let kind = match class {
                    SInt => BinopKind::SDiv,
                    UInt => BinopKind::UDiv,
                    Float => BinopKind::FDiv,
                    _ => return Err(self.unsupported_op(op, expr)),
                };
                self.binop(kind, lhs_value, rhs_value, &name)
            }
            BinOp::Mod => {
                let name = self.n("mod").to_string();
                let kind = match class {
                    SInt => BinopKind::SRem,
                    UInt => BinopKind::URem,
                    _ => return Err(self.unsupported_op(op, expr)),
                };
                self.binop(kind, lhs_value, rhs_value, &name)
            }
            BinOp::BitAnd => {
                let name = self.n("and").to_string();
                self.int_binop(BinopKind::And, class, lhs_value, rhs_value, &name, op, expr)?
            }
            BinOp::BitOr => {
                let name = self.n("or").to_string();
                self.int_binop(BinopKind::Or, class, lhs_value, rhs_value, &name, op, expr)?
            }
            BinOp::BitXor => {
                let name = self.n("xor").to_string();
                self.int_binop(BinopKind::Xor, class, lhs_value, rhs_value, &name, op, expr)?
            }
            BinOp::Shl => {
                let name = self.n("shl").to_string();
                self.int_binop(BinopKind::Shl, class, lhs_value, rhs_value, &name, op, expr)?
            }
            BinOp::Shr => {
                let name = self.n("shr").to_string();
                let kind = match class {
                    SInt => BinopKind::AShr,
                    UInt => BinopKind::LShr,
                    _ => return Err(self.unsupported_op(op, expr)),
                };
                self.binop(kind, lhs_value, rhs_value, &name)
            }
            _ => unreachable!("arithmetic operators only"),
        };
        Ok(value)
    }

    /// Short-circuit `&&`: the false path feeds a constant into the φ.
    fn lower_logic_and(&mut self, lhs: ExprId, rhs: ExprId) -> Result<Value> {
        let rhs_name = self.n("land.rhs").to_string();
        let rhs_block = self.b.create_block(&mut self.seg, &rhs_name);
        let merge_name = self.n("land.merge").to_string();
        let merge_block = self.b.create_block(&mut self.seg, &merge_name);

        let lhs_value = self.lower_expr(lhs, ValueCtx::RValue)?;
        let lhs_value = self.inject_cmp(lhs_value)?;
        // Re-capture the block: lowering the operand may have moved it.
        let lhs_end = self.b.insert_block();
        self.b
            .build_brif(&mut self.seg, lhs_value, rhs_block, merge_block);

        self.b.append_block(&mut self.seg, rhs_block);
        self.b.set_insert(rhs_block);
        let rhs_value = self.lower_expr(rhs, ValueCtx::RValue)?;
        let rhs_value = self.inject_cmp(rhs_value)?;
        self.b.build_jmp(&mut self.seg, merge_block);
        let rhs_end = self.b.insert_block();

        self.b.append_block(&mut self.seg, merge_block);
        self.b.set_insert(merge_block);
        let i1 = self.seg.types.i1();
        let name = self.n("land.result").to_string();
        let phi = self.b.build_phi(&mut self.seg, i1, &name);
        let zero = Value::Const(self.seg.const_int(i1, 0));
        self.b.phi_add_incoming(&mut self.seg, phi, lhs_end, zero);
        self.b
            .phi_add_incoming(&mut self.seg, phi, rhs_end, rhs_value);
        Ok(Value::Inst(phi))
    }

    /// Short-circuit `||`: the true path feeds a constant into the φ.
    fn lower_logic_or(&mut self, lhs: ExprId, rhs: ExprId) -> Result<Value> {
        let rhs_name = self.n("lor.rhs").to_string();
        let rhs_block = self.b.create_block(&mut self.seg, &rhs_name);
        let merge_name = self.n("lor.merge").to_string();
        let merge_block = self.b.create_block(&mut self.seg, &merge_name);

        let lhs_value = self.lower_expr(lhs, ValueCtx::RValue)?;
        let lhs_value = self.inject_cmp(lhs_value)?;
        let lhs_end = self.b.insert_block();
        self.b
            .build_brif(&mut self.seg, lhs_value, merge_block, rhs_block);

        self.b.append_block(&mut self.seg, rhs_block);
        self.b.set_insert(rhs_block);
        let rhs_value = self.lower_expr(rhs, ValueCtx::RValue)?;
        let rhs_value = self.inject_cmp(rhs_value)?;
        self.b.build_jmp(&mut self.seg, merge_block);
        let rhs_end = self.b.insert_block();

        self.b.append_block(&mut self.seg, merge_block);
        self.b.set_insert(merge_block);
        let i1 = self.seg.types.i1();
        let name = self.n("lor.result").to_string();
        let phi = self.b.build_phi(&mut self.seg, i1, &name);
        let one = Value::Const(self.seg.const_int(i1, 1));
        self.b.phi_add_incoming(&mut self.seg, phi, lhs_end, one);
        self.b
            .phi_add_incoming(&mut self.seg, phi, rhs_end, rhs_value);
        Ok(Value::Inst(phi))
    }

    // ---- helpers ---------------------------------------------------------

    fn binop(
        &mut self,
        kind: BinopKind,
        lhs: Value,
        rhs: Value,
        name: &str,
    ) -> Value {
        self.b.build_binop(&mut self.seg, kind, lhs, rhs, name)
    }

    #[allow(clippy::too_many_arguments)]
    fn int_binop(
        &mut self,
        kind: BinopKind,
        class: TypeClass,
        lhs: Value,
        rhs: Value,
        name: &str,
        op: BinOp,
        expr: ExprId,
    ) -> Result<Value> {
        if !matches!(class, TypeClass::SInt | TypeClass::UInt) {
            return Err(self.unsupported_op(op, expr));
        }
        Ok(self.binop(kind, lhs, rhs, name))
    }

    fn unsupported_op(
        &self,
        op: BinOp,
        expr: ExprId,
    ) -> meddle_base::Diagnostic {
        self.err(
            format!(
                "unsupported '{}' operator between types",
                op.spelling()
            ),
            self.eloc(expr),
        )
    }
}
