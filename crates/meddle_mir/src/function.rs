//! MIR functions, arguments and basic blocks.

use crate::inst::{InstData, InstId};
use crate::ty::TyId;
use crate::value::{SlotData, SlotId, Value};
use bitflags::bitflags;
use std::collections::HashMap;

bitflags! {
    /// Argument attributes for the aggregate-passing conventions.
    #[derive(Clone, Copy, PartialEq, Eq, Default, Debug)]
    pub struct ArgAttr: u32 {
        /// This pointer is a by-value aggregate argument.
        const AARG = 1 << 0;
        /// This pointer is the caller's return slot.
        const ARET = 1 << 1;
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Linkage {
    Internal,
    External,
}

#[derive(Clone, Debug)]
pub struct ArgData {
    pub name: String,
    pub ty: TyId,
    pub index: u32,
    pub attrs: ArgAttr,
    /// The stack slot the argument is spilled to on entry, when it has one.
    pub slot: Option<SlotId>,
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct BlockId(pub(crate) u32);

impl BlockId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Clone, Debug, Default)]
pub struct BlockData {
    pub name: String,
    pub insts: Vec<InstId>,
    pub preds: Vec<BlockId>,
    pub succs: Vec<BlockId>,
    /// Whether the block has been appended to the function body. Blocks
    /// that never gain a predecessor are dropped instead of appended.
    pub attached: bool,
}

pub struct Function {
    pub name: String,
    /// The MIR function type.
    pub ty: TyId,
    /// The MIR return type (void for `ARet` functions).
    pub ret: TyId,
    pub linkage: Linkage,
    pub args: Vec<ArgData>,
    pub slots: Vec<SlotData>,
    pub blocks: Vec<BlockData>,
    /// Attached blocks in emission order.
    pub block_order: Vec<BlockId>,
    pub insts: Vec<InstData>,
    /// Back-links: which instructions use each non-constant value.
    pub uses: HashMap<Value, Vec<InstId>>,
    /// Whether a body will be emitted; declaration-only shells stay empty.
    pub has_body: bool,

    value_name_counts: HashMap<String, u32>,
    block_name_counts: HashMap<String, u32>,
}

impl Function {
    pub fn new(name: String, ty: TyId, ret: TyId, linkage: Linkage) -> Self {
        Self {
            name,
            ty,
            ret,
            linkage,
            args: Vec::new(),
            slots: Vec::new(),
            blocks: Vec::new(),
            block_order: Vec::new(),
            insts: Vec::new(),
            uses: HashMap::new(),
            has_body: false,
            value_name_counts: HashMap::new(),
            block_name_counts: HashMap::new(),
        }
    }

    /// Disambiguates a value name with a per-function counter
    /// (`x`, `x1`, `x2`, …). Empty names stay empty; the printer numbers
    /// them.
    pub fn uniquify_value_name(&mut self, base: &str) -> String {
        if base.is_empty() {
            return String::new();
        }
        let count = self.value_name_counts.entry(base.to_string()).or_insert(0);
        let name = if *count == 0 {
            base.to_string()
        } else {
            format!("{base}{count}")
        };
        *count += 1;
        name
    }

    pub fn uniquify_block_name(&mut self, base: &str) -> String {
        if base.is_empty() {
            return String::new();
        }
        let count = self.block_name_counts.entry(base.to_string()).or_insert(0);
        let name = if *count == 0 {
            base.to_string()
        } else {
            format!("{base}{count}")
        };
        *count += 1;
        name
    }

    pub fn add_slot(&mut self, name: &str, ty: TyId, alloc: TyId, align: u32) -> SlotId {
        let name = self.uniquify_value_name(name);
        let id = SlotId(self.slots.len() as u32);
        self.slots.push(SlotData {
            name,
            ty,
            alloc,
            align,
        });
        id
    }

    pub fn slot(&self, id: SlotId) -> &SlotData {
        &self.slots[id.index()]
    }

    pub fn arg(&self, index: usize) -> &ArgData {
        &self.args[index]
    }

    pub fn block(&self, id: BlockId) -> &BlockData {
        &self.blocks[id.index()]
    }

    pub fn block_mut(&mut self, id: BlockId) -> &mut BlockData {
        &mut self.blocks[id.index()]
    }

    pub fn inst(&self, id: InstId) -> &InstData {
        &self.insts[id.index()]
    }

    pub fn inst_mut(&mut self, id: InstId) -> &mut InstData {
        &mut self.insts[id.index()]
    }

    pub fn create_block(&mut self, name: &str) -> BlockId {
        let name = self.uniquify_block_name(name);
        let id = BlockId(self.blocks.len() as u32);
        self.blocks.push(BlockData {
            name,
            ..BlockData::default()
        });
        id
    }

    pub fn append_block(&mut self, id: BlockId) {
        if !self.blocks[id.index()].attached {
            self.blocks[id.index()].attached = true;
            self.block_order.push(id);
        }
    }

    pub fn has_terminator(&self, block: BlockId) -> bool {
        self.block(block)
            .insts
            .last()
            .is_some_and(|i| self.inst(*i).kind.is_terminator())
    }

    pub fn add_use(&mut self, value: Value, user: InstId) {
        if value.is_constant() {
            return;
        }
        self.uses.entry(value).or_default().push(user);
    }

    /// The function has an `ARet`-attributed first argument.
    pub fn has_aret(&self) -> bool {
        self.args
            .first()
            .is_some_and(|a| a.attrs.contains(ArgAttr::ARET))
    }

    pub fn arg_has_attr(&self, index: usize, attr: ArgAttr) -> bool {
        self.args
            .get(index)
            .is_some_and(|a| a.attrs.contains(attr))
    }
}
