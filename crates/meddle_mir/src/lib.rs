//! # meddle-mir
//!
//! The strict, typed, SSA-form machine IR and the AST → MIR lowering.
//!
//! A [`Segment`] is the module-level container produced per translation
//! unit: interned MIR types, module-scope data, functions of basic blocks
//! with explicit predecessor/successor links, and the target triple.
//! [`lower::lower_unit`] translates a resolved, sema-checked unit into a
//! segment; [`print`] renders the normative textual listing; [`verify`]
//! checks the structural invariants the test suite relies on.

pub mod builder;
pub mod function;
pub mod inst;
pub mod layout;
pub mod lower;
pub mod print;
pub mod segment;
pub mod ty;
pub mod value;
pub mod verify;

pub use builder::Builder;
pub use function::{ArgAttr, ArgData, BlockData, BlockId, Function, Linkage};
pub use inst::{BinopKind, CmpKind, InstData, InstId, InstKind, UnopKind};
pub use layout::DataLayout;
pub use segment::{Abi, Arch, DataDef, DataId, FuncId, Os, Segment, Target};
pub use ty::{TyId, TyKind, TypePool};
pub use value::{ConstData, ConstId, ConstKind, SlotData, SlotId, Value};
