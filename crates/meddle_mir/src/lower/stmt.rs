//! Statement lowering: control flow, locals, returns.

use super::{Lowering, ValueCtx};
use crate::inst::CmpKind;
use crate::value::Value;
use meddle_base::Result;
use meddle_sema::unitman::TypeClass;
use meddle_syntax::ast::{DeclId, StmtId};
use meddle_syntax::{DeclKind, StmtKind};

impl<'a> Lowering<'a> {
    pub(crate) fn lower_stmt(&mut self, stmt: StmtId) -> Result<()> {
        let kind = self.units.stmt(stmt).kind.clone();
        match kind {
            StmtKind::Compound { stmts, .. } => {
                for s in stmts {
                    // Code after a terminator in the same block is
                    // unreachable and dropped.
                    if self.b.has_terminator(&self.seg) {
                        break;
                    }
                    self.lower_stmt(s)?;
                }
                Ok(())
            }
            StmtKind::DeclStmt { decl } => self.lower_local_var(decl),
            StmtKind::ExprStmt { expr } => {
                self.lower_expr(expr, ValueCtx::RValue)?;
                Ok(())
            }
            StmtKind::If {
                cond,
                then_body,
                else_body,
            } => self.lower_if(cond, then_body, else_body),
            StmtKind::Until { cond, body } => self.lower_until(cond, body),
            StmtKind::Match {
                subject,
                cases,
                default,
            } => self.lower_match(stmt, subject, cases, default),
            StmtKind::Ret { expr } => self.lower_ret(expr),
            StmtKind::Break => {
                let merge = self
                    .merge_target
                    .expect("break inside a loop after sema");
                self.b.build_jmp(&mut self.seg, merge);
                Ok(())
            }
            StmtKind::Continue => {
                let cond = self
                    .cond_target
                    .expect("continue inside a loop after sema");
                self.b.build_jmp(&mut self.seg, cond);
                Ok(())
            }
        }
    }

    fn lower_local_var(&mut self, decl: DeclId) -> Result<()> {
        let data = self.units.decl(decl).clone();
        let (ty, init) = match &data.kind {
            DeclKind::Var { ty: Some(ty), init, .. } => (*ty, *init),
            _ => return Ok(()),
        };
        let lowered = self.cgn_type(ty)?;
        let name = self.sess.interner.resolve(data.name).to_string();
        let slot = self.b.build_slot(&mut self.seg, lowered, &name);
        self.slots.insert(decl, slot);

        let init = match init {
            Some(init) => init,
            None => return Ok(()),
        };

        if self.units.expr(init).kind.is_aggregate_init() {
            // The initialiser writes itself into the slot.
            self.place = Some(Value::Slot(slot));
            self.lower_expr(init, ValueCtx::RValue)?;
            self.place = None;
        } else if self.seg.types.is_scalar(lowered) {
            let value = self.lower_expr(init, ValueCtx::RValue)?;
            self.b.build_store(&mut self.seg, value, Value::Slot(slot));
        } else {
            // A non-scalar value we must copy into the new slot ourselves,
            // unless the initialiser already wrote into it.
            self.place = Some(Value::Slot(slot));
            let value = self.lower_expr(init, ValueCtx::LValue)?;
            self.place = None;

            if value != Value::Slot(slot) {
                let align = self.layout_align(lowered);
                let size = self.layout_size(lowered);
                self.b.build_cpy(
                    &mut self.seg,
                    Value::Slot(slot),
                    align,
                    value,
                    align,
                    size,
                );
            }
        }
        Ok(())
    }

    fn lower_if(
        &mut self,
        cond: meddle_syntax::ast::ExprId,
        then_body: StmtId,
        else_body: Option<StmtId>,
    ) -> Result<()> {
        let cond_value = self.lower_expr(cond, ValueCtx::RValue)?;
        let cond_value = self.inject_cmp(cond_value)?;

        let then_name = self.n("if.then").to_string();
        let then_block = self.b.create_block(&mut self.seg, &then_name);
        self.b.append_block(&mut self.seg, then_block);
        let merge_name = self.n("if.merge").to_string();
        let merge_block = self.b.create_block(&mut self.seg, &merge_name);

        if else_body.is_some() {
            let else_name = self.n("if.else").to_string();
            let else_block = self.b.create_block(&mut self.seg, &else_name);
            self.b.build_brif(
                &mut self.seg,
                cond_value,
                then_block,
                else_block,
            );

            self.b.set_insert(then_block);
            self.lower_stmt(then_body)?;
            if !self.b.has_terminator(&self.seg) {
                self.b.build_jmp(&mut self.seg, merge_block);
            }

            self.b.append_block(&mut self.seg, else_block);
            self.b.set_insert(else_block);
            self.lower_stmt(else_body.unwrap())?;
            if !self.b.has_terminator(&self.seg) {
                self.b.build_jmp(&mut self.seg, merge_block);
            }
        } else {
            self.b.build_brif(
                &mut self.seg,
                cond_value,
                then_block,
                merge_block,
            );

            self.b.set_insert(then_block);
            self.lower_stmt(then_body)?;
            if !self.b.has_terminator(&self.seg) {
                self.b.build_jmp(&mut self.seg, merge_block);
            }
        }

        // Emit the merge block only when something branched to it.
        let has_preds = !self
            .seg
            .function(self.b.func)
            .block(merge_block)
            .preds
            .is_empty();
        if has_preds {
            self.b.append_block(&mut self.seg, merge_block);
            self.b.set_insert(merge_block);
        }
        Ok(())
    }

    fn lower_until(
        &mut self,
        cond: meddle_syntax::ast::ExprId,
        body: StmtId,
    ) -> Result<()> {
        let cond_name = self.n("until.cond").to_string();
        let cond_block = self.b.create_block(&mut self.seg, &cond_name);
        self.b.append_block(&mut self.seg, cond_block);
        let body_name = self.n("until.body").to_string();
        let body_block = self.b.create_block(&mut self.seg, &body_name);
        let merge_name = self.n("until.merge").to_string();
        let merge_block = self.b.create_block(&mut self.seg, &merge_name);

        let outer_cond = self.cond_target.replace(cond_block);
        let outer_merge = self.merge_target.replace(merge_block);

        self.b.build_jmp(&mut self.seg, cond_block);
        self.b.set_insert(cond_block);
        let cond_value = self.lower_expr(cond, ValueCtx::RValue)?;
        let cond_value = self.inject_cmp(cond_value)?;
        // Loop until the condition holds: true exits, false re-enters.
        self.b
            .build_brif(&mut self.seg, cond_value, merge_block, body_block);

        self.b.append_block(&mut self.seg, body_block);
        self.b.set_insert(body_block);
        self.lower_stmt(body)?;
        if !self.b.has_terminator(&self.seg) {
            self.b.build_jmp(&mut self.seg, cond_block);
        }

        let has_preds = !self
            .seg
            .function(self.b.func)
            .block(merge_block)
            .preds
            .is_empty();
        if has_preds {
            self.b.append_block(&mut self.seg, merge_block);
            self.b.set_insert(merge_block);
        }

        self.cond_target = outer_cond;
        self.merge_target = outer_merge;
        Ok(())
    }

    fn lower_match(
        &mut self,
        stmt: StmtId,
        subject: meddle_syntax::ast::ExprId,
        cases: Vec<meddle_syntax::MatchCase>,
        default: Option<StmtId>,
    ) -> Result<()> {
        let subject_value = self.lower_expr(subject, ValueCtx::RValue)?;
        let subject_class = self.units.type_class(self.ety(subject));

        let merge_name = self.n("match.merge").to_string();
        let merge_block = self.b.create_block(&mut self.seg, &merge_name);
        let default_block = if default.is_some() {
            let default_name = self.n("match.def").to_string();
            Some(self.b.create_block(&mut self.seg, &default_name))
        } else {
            None
        };

        // One comparison block per case, chained.
        let chain_name = self.n("match.chain").to_string();
        let chains: Vec<_> = cases
            .iter()
            .map(|_| self.b.create_block(&mut self.seg, &chain_name))
            .collect();
        self.b.build_jmp(&mut self.seg, chains[0]);

        for (i, case) in cases.iter().enumerate() {
            let chain = chains[i];
            self.b.append_block(&mut self.seg, chain);
            self.b.set_insert(chain);

            let pattern_value =
                self.lower_expr(case.pattern, ValueCtx::RValue)?;
            let cmp_name = self.n("match.cmp").to_string();
            let op = match subject_class {
                TypeClass::SInt | TypeClass::UInt => CmpKind::IcmpEq,
                TypeClass::Float => CmpKind::FcmpOeq,
                TypeClass::Pointer => CmpKind::PcmpEq,
                _ => {
                    return Err(self.err(
                        "unsupported 'match' pattern type",
                        self.units.stmt(stmt).loc,
                    ))
                }
            };
            let cmp = self.b.build_cmp(
                &mut self.seg,
                op,
                subject_value,
                pattern_value,
                &cmp_name,
            );

            let body_name = self.n("match.case").to_string();
            let body_block = self.b.create_block(&mut self.seg, &body_name);
            self.b.append_block(&mut self.seg, body_block);

            let fail_dest = if i + 1 != chains.len() {
                chains[i + 1]
            } else if let Some(default_block) = default_block {
                default_block
            } else {
                merge_block
            };
            self.b
                .build_brif(&mut self.seg, cmp, body_block, fail_dest);

            self.b.set_insert(body_block);
            self.lower_stmt(case.body)?;
            if !self.b.has_terminator(&self.seg) {
                self.b.build_jmp(&mut self.seg, merge_block);
            }
        }

        if let (Some(default), Some(default_block)) = (default, default_block)
        {
            self.b.append_block(&mut self.seg, default_block);
            self.b.set_insert(default_block);
            self.lower_stmt(default)?;
            if !self.b.has_terminator(&self.seg) {
                self.b.build_jmp(&mut self.seg, merge_block);
            }
        }

        let has_preds = !self
            .seg
            .function(self.b.func)
            .block(merge_block)
            .preds
            .is_empty();
        if has_preds {
            self.b.append_block(&mut self.seg, merge_block);
            self.b.set_insert(merge_block);
        }
        Ok(())
    }

    fn lower_ret(
        &mut self,
        expr: Option<meddle_syntax::ast::ExprId>,
    ) -> Result<()> {
        let expr = match expr {
            Some(expr) => expr,
            None => {
                self.b.build_ret(&mut self.seg, None);
                return Ok(());
            }
        };

        let ast_ty = self.ety(expr);
        let lowered = self.cgn_type(ast_ty)?;

        if self.units.expr(expr).kind.is_aggregate_init() {
            // Write straight into the caller's return slot.
            let aret = Value::Arg(crate::value::ArgId::new(0));
            self.place = Some(aret);
            self.lower_expr(expr, ValueCtx::RValue)?;
            self.place = None;
            self.b.build_ret(&mut self.seg, None);
        } else if self.seg.types.is_scalar(lowered) {
            let value = self.lower_expr(expr, ValueCtx::RValue)?;
            self.b.build_ret(&mut self.seg, Some(value));
        } else {
            let aret = Value::Arg(crate::value::ArgId::new(0));
            self.place = Some(aret);
            let value = self.lower_expr(expr, ValueCtx::LValue)?;
            self.place = None;

            if value != aret {
                let align = self.layout_align(lowered);
                let size = self.layout_size(lowered);
                self.b
                    .build_cpy(&mut self.seg, aret, align, value, align, size);
            }
            self.b.build_ret(&mut self.seg, None);
        }
        Ok(())
    }
}
