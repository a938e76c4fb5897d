//! The instruction builder.
//!
//! Tracks the current insertion block of one function and wires everything
//! an instruction touches as it is built: the owning block's instruction
//! list, predecessor/successor edges for branches, and the use-lists of the
//! operand values.

use crate::function::{BlockId, Function};
use crate::inst::{BinopKind, CmpKind, InstData, InstId, InstKind, UnopKind};
use crate::layout::DataLayout;
use crate::segment::{FuncId, Segment};
use crate::ty::TyId;
use crate::value::{SlotId, Value};
use smallvec::SmallVec;

pub struct Builder {
    pub func: FuncId,
    insert: Option<BlockId>,
}

impl Builder {
    pub fn new(func: FuncId) -> Self {
        Self { func, insert: None }
    }

    pub fn insert_block(&self) -> BlockId {
        self.insert.expect("no insertion block set")
    }

    pub fn set_insert(&mut self, block: BlockId) {
        self.insert = Some(block);
    }

    fn func<'s>(&self, seg: &'s Segment) -> &'s Function {
        seg.function(self.func)
    }

    fn func_mut<'s>(&self, seg: &'s mut Segment) -> &'s mut Function {
        seg.function_mut(self.func)
    }

    pub fn has_terminator(&self, seg: &Segment) -> bool {
        self.func(seg).has_terminator(self.insert_block())
    }

    // ---- blocks ----------------------------------------------------------

    pub fn create_block(&mut self, seg: &mut Segment, name: &str) -> BlockId {
        self.func_mut(seg).create_block(name)
    }

    pub fn append_block(&mut self, seg: &mut Segment, block: BlockId) {
        self.func_mut(seg).append_block(block);
    }

    // ---- slots -----------------------------------------------------------

    pub fn build_slot(
        &mut self,
        seg: &mut Segment,
        alloc: TyId,
        name: &str,
    ) -> SlotId {
        let align = DataLayout::new(&seg.types).align_of(alloc);
        let ty = seg.types.ptr(alloc);
        self.func_mut(seg).add_slot(name, ty, alloc, align)
    }

    // ---- value typing ----------------------------------------------------

    pub fn value_ty(&self, seg: &Segment, value: Value) -> TyId {
        match value {
            Value::Const(c) => seg.const_data(c).ty,
            Value::Data(d) => seg.data_def(d).ty,
            Value::Slot(s) => self.func(seg).slot(s).ty,
            Value::Arg(a) => self.func(seg).arg(a.index()).ty,
            Value::Inst(i) => self.func(seg).inst(i).ty,
            Value::Func(f) => seg.function(f).ty,
            Value::Block(_) => seg.types.void(),
        }
    }

    // ---- core ------------------------------------------------------------

    /// Appends an instruction to the insertion block, disambiguating the
    /// result name and maintaining the use-lists.
    fn push(
        &mut self,
        seg: &mut Segment,
        name: &str,
        ty: TyId,
        kind: InstKind,
    ) -> InstId {
        let block = self.insert_block();
        let operands = kind.operands();
        let func = self.func_mut(seg);
        debug_assert!(
            !func.has_terminator(block),
            "appending past a terminator"
        );
        let name = func.uniquify_value_name(name);
        let id = InstId(func.insts.len() as u32);
        func.insts.push(InstData {
            name,
            ty,
            block,
            kind,
        });
        func.block_mut(block).insts.push(id);
        for operand in operands {
            func.add_use(operand, id);
        }
        id
    }

    fn link(&mut self, seg: &mut Segment, from: BlockId, to: BlockId) {
        let func = self.func_mut(seg);
        if !func.block(from).succs.contains(&to) {
            func.block_mut(from).succs.push(to);
        }
        if !func.block(to).preds.contains(&from) {
            func.block_mut(to).preds.push(from);
        }
    }

    // ---- memory ----------------------------------------------------------

    pub fn build_store(&mut self, seg: &mut Segment, value: Value, dest: Value) {
        let void = seg.types.void();
        self.push(
            seg,
            "",
            void,
            InstKind::Store {
                value,
                dest,
                offset: None,
            },
        );
    }

    pub fn build_load(
        &mut self,
        seg: &mut Segment,
        ty: TyId,
        src: Value,
        name: &str,
    ) -> Value {
        let id = self.push(seg, name, ty, InstKind::Load { src, offset: None });
        Value::Inst(id)
    }

    pub fn build_cpy(
        &mut self,
        seg: &mut Segment,
        dest: Value,
        dest_align: u32,
        src: Value,
        src_align: u32,
        size: u64,
    ) {
        let i64_ty = seg.types.i64();
        let size = seg.const_int(i64_ty, size as i64);
        let void = seg.types.void();
        self.push(
            seg,
            "",
            void,
            InstKind::Cpy {
                size,
                src,
                src_align,
                dest,
                dest_align,
            },
        );
    }

    pub fn build_ap(
        &mut self,
        seg: &mut Segment,
        ptr_ty: TyId,
        base: Value,
        index: Value,
        name: &str,
    ) -> Value {
        let id = self.push(seg, name, ptr_ty, InstKind::Ap { base, index });
        Value::Inst(id)
    }

    // ---- control flow ----------------------------------------------------

    pub fn build_brif(
        &mut self,
        seg: &mut Segment,
        cond: Value,
        then_dest: BlockId,
        else_dest: BlockId,
    ) {
        let from = self.insert_block();
        let void = seg.types.void();
        self.push(
            seg,
            "",
            void,
            InstKind::Brif {
                cond,
                then_dest,
                else_dest,
            },
        );
        self.link(seg, from, then_dest);
        self.link(seg, from, else_dest);
    }

    pub fn build_jmp(&mut self, seg: &mut Segment, dest: BlockId) {
        let from = self.insert_block();
        let void = seg.types.void();
        self.push(seg, "", void, InstKind::Jmp { dest });
        self.link(seg, from, dest);
    }

    pub fn build_ret(&mut self, seg: &mut Segment, value: Option<Value>) {
        let void = seg.types.void();
        self.push(seg, "", void, InstKind::Ret { value });
    }

    pub fn build_call(
        &mut self,
        seg: &mut Segment,
        callee: FuncId,
        args: Vec<Value>,
        name: &str,
    ) -> Value {
        let ret = seg.function(callee).ret;
        let name = if seg.types.is_void(ret) { "" } else { name };
        let id = self.push(
            seg,
            name,
            ret,
            InstKind::Call {
                callee,
                args: SmallVec::from_vec(args),
            },
        );
        Value::Inst(id)
    }

    pub fn build_syscall(
        &mut self,
        seg: &mut Segment,
        num: Value,
        args: Vec<Value>,
        name: &str,
    ) -> Value {
        let i64_ty = seg.types.i64();
        let id = self.push(
            seg,
            name,
            i64_ty,
            InstKind::Syscall {
                num,
                args: SmallVec::from_vec(args),
            },
        );
        Value::Inst(id)
    }

    pub fn build_phi(&mut self, seg: &mut Segment, ty: TyId, name: &str) -> InstId {
        self.push(
            seg,
            name,
            ty,
            InstKind::Phi {
                incoming: SmallVec::new(),
            },
        )
    }

    pub fn phi_add_incoming(
        &mut self,
        seg: &mut Segment,
        phi: InstId,
        block: BlockId,
        value: Value,
    ) {
        let func = self.func_mut(seg);
        if let InstKind::Phi { incoming } = &mut func.inst_mut(phi).kind {
            incoming.push((block, value));
        }
        func.add_use(value, phi);
    }

    // ---- arithmetic ------------------------------------------------------

    pub fn build_binop(
        &mut self,
        seg: &mut Segment,
        op: BinopKind,
        lhs: Value,
        rhs: Value,
        name: &str,
    ) -> Value {
        let ty = self.value_ty(seg, lhs);
        let id = self.push(seg, name, ty, InstKind::Binop { op, lhs, rhs });
        Value::Inst(id)
    }

    pub fn build_cmp(
        &mut self,
        seg: &mut Segment,
        op: CmpKind,
        lhs: Value,
        rhs: Value,
        name: &str,
    ) -> Value {
        let i1 = seg.types.i1();
        let id = self.push(seg, name, i1, InstKind::Cmp { op, lhs, rhs });
        Value::Inst(id)
    }

    /// Unary op whose result keeps the operand type (`not`, `neg`, `fneg`).
    pub fn build_unop(
        &mut self,
        seg: &mut Segment,
        op: UnopKind,
        value: Value,
        name: &str,
    ) -> Value {
        let ty = self.value_ty(seg, value);
        let id = self.push(seg, name, ty, InstKind::Unop { op, value });
        Value::Inst(id)
    }

    /// Conversion to an explicit destination type.
    pub fn build_conv(
        &mut self,
        seg: &mut Segment,
        op: UnopKind,
        value: Value,
        dest: TyId,
        name: &str,
    ) -> Value {
        let id = self.push(seg, name, dest, InstKind::Unop { op, value });
        Value::Inst(id)
    }
}
