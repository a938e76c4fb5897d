//! MIR instructions.

use crate::function::BlockId;
use crate::ty::TyId;
use crate::value::{ConstId, Value};
use smallvec::SmallVec;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct InstId(pub(crate) u32);

impl InstId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Integer and float arithmetic/bitwise operations.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum BinopKind {
    Add,
    Sub,
    SMul,
    UMul,
    SDiv,
    UDiv,
    SRem,
    URem,
    FAdd,
    FSub,
    FMul,
    FDiv,
    And,
    Or,
    Xor,
    Shl,
    AShr,
    LShr,
}

impl BinopKind {
    pub fn mnemonic(self) -> &'static str {
        match self {
            BinopKind::Add => "add",
            BinopKind::Sub => "sub",
            BinopKind::SMul => "smul",
            BinopKind::UMul => "umul",
            BinopKind::SDiv => "sdiv",
            BinopKind::UDiv => "udiv",
            BinopKind::SRem => "srem",
            BinopKind::URem => "urem",
            BinopKind::FAdd => "fadd",
            BinopKind::FSub => "fsub",
            BinopKind::FMul => "fmul",
            BinopKind::FDiv => "fdiv",
            BinopKind::And => "and",
            BinopKind::Or => "or",
            BinopKind::Xor => "xor",
            BinopKind::Shl => "shl",
            BinopKind::AShr => "ashr",
            BinopKind::LShr => "lshr",
        }
    }
}

/// Unary operations and conversions.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum UnopKind {
    Not,
    Neg,
    FNeg,
    SExt,
    ZExt,
    Trunc,
    FExt,
    FTrunc,
    Si2Fp,
    Ui2Fp,
    Fp2Si,
    Fp2Ui,
    Reint,
    Ptr2Int,
    Int2Ptr,
}

impl UnopKind {
    pub fn mnemonic(self) -> &'static str {
        match self {
            UnopKind::Not => "not",
            UnopKind::Neg => "neg",
            UnopKind::FNeg => "fneg",
            UnopKind::SExt => "sext",
            UnopKind::ZExt => "zext",
            UnopKind::Trunc => "trunc",
            UnopKind::FExt => "fext",
            UnopKind::FTrunc => "ftrunc",
            UnopKind::Si2Fp => "si2fp",
            UnopKind::Ui2Fp => "ui2fp",
            UnopKind::Fp2Si => "fp2si",
            UnopKind::Fp2Ui => "fp2ui",
            UnopKind::Reint => "reint",
            UnopKind::Ptr2Int => "ptr2int",
            UnopKind::Int2Ptr => "int2ptr",
        }
    }
}

/// Comparisons, tagged by integer signedness, float ordering or pointer.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum CmpKind {
    IcmpEq,
    IcmpNe,
    IcmpSlt,
    IcmpUlt,
    IcmpSle,
    IcmpUle,
    IcmpSgt,
    IcmpUgt,
    IcmpSge,
    IcmpUge,
    FcmpOeq,
    FcmpOne,
    FcmpOlt,
    FcmpOle,
    FcmpOgt,
    FcmpOge,
    PcmpEq,
    PcmpNe,
    PcmpLt,
    PcmpLe,
    PcmpGt,
    PcmpGe,
}

impl CmpKind {
    pub fn mnemonic(self) -> &'static str {
        match self {
            CmpKind::IcmpEq => "icmp_eq",
            CmpKind::IcmpNe => "icmp_ne",
            CmpKind::IcmpSlt => "icmp_slt",
            CmpKind::IcmpUlt => "icmp_ult",
            CmpKind::IcmpSle => "icmp_sle",
            CmpKind::IcmpUle => "icmp_ule",
            CmpKind::IcmpSgt => "icmp_sgt",
            CmpKind::IcmpUgt => "icmp_ugt",
            CmpKind::IcmpSge => "icmp_sge",
            CmpKind::IcmpUge => "icmp_uge",
            CmpKind::FcmpOeq => "fcmp_oeq",
            CmpKind::FcmpOne => "fcmp_one",
            CmpKind::FcmpOlt => "fcmp_olt",
            CmpKind::FcmpOle => "fcmp_ole",
            CmpKind::FcmpOgt => "fcmp_ogt",
            CmpKind::FcmpOge => "fcmp_oge",
            CmpKind::PcmpEq => "pcmp_eq",
            CmpKind::PcmpNe => "pcmp_ne",
            CmpKind::PcmpLt => "pcmp_lt",
            CmpKind::PcmpLe => "pcmp_le",
            CmpKind::PcmpGt => "pcmp_gt",
            CmpKind::PcmpGe => "pcmp_ge",
        }
    }
}

#[derive(Clone, Debug)]
pub enum InstKind {
    Binop {
        op: BinopKind,
        lhs: Value,
        rhs: Value,
    },
    Unop {
        op: UnopKind,
        value: Value,
    },
    Cmp {
        op: CmpKind,
        lhs: Value,
        rhs: Value,
    },
    Store {
        value: Value,
        dest: Value,
        offset: Option<ConstId>,
    },
    Load {
        src: Value,
        offset: Option<ConstId>,
    },
    /// Memory copy of `size` bytes.
    Cpy {
        size: ConstId,
        src: Value,
        src_align: u32,
        dest: Value,
        dest_align: u32,
    },
    /// Address-of-element: a pointer from a base pointer and an index.
    Ap {
        base: Value,
        index: Value,
    },
    Brif {
        cond: Value,
        then_dest: BlockId,
        else_dest: BlockId,
    },
    Jmp {
        dest: BlockId,
    },
    Ret {
        value: Option<Value>,
    },
    Call {
        callee: crate::segment::FuncId,
        args: SmallVec<[Value; 4]>,
    },
    Syscall {
        num: Value,
        args: SmallVec<[Value; 4]>,
    },
    Phi {
        incoming: SmallVec<[(BlockId, Value); 2]>,
    },
}

impl InstKind {
    pub fn is_terminator(&self) -> bool {
        matches!(
            self,
            InstKind::Brif { .. } | InstKind::Jmp { .. } | InstKind::Ret { .. }
        )
    }

    pub fn produces_value(&self) -> bool {
        matches!(
            self,
            InstKind::Binop { .. }
                | InstKind::Unop { .. }
                | InstKind::Cmp { .. }
                | InstKind::Load { .. }
                | InstKind::Ap { .. }
                | InstKind::Call { .. }
                | InstKind::Syscall { .. }
                | InstKind::Phi { .. }
        )
    }

    /// The value operands, for use-list upkeep and verification.
    pub fn operands(&self) -> Vec<Value> {
        match self {
            InstKind::Binop { lhs, rhs, .. }
            | InstKind::Cmp { lhs, rhs, .. } => vec![*lhs, *rhs],
            InstKind::Unop { value, .. } => vec![*value],
            InstKind::Store { value, dest, .. } => vec![*value, *dest],
            InstKind::Load { src, .. } => vec![*src],
            InstKind::Cpy { src, dest, .. } => vec![*src, *dest],
            InstKind::Ap { base, index } => vec![*base, *index],
            InstKind::Brif { cond, .. } => vec![*cond],
            InstKind::Jmp { .. } => Vec::new(),
            InstKind::Ret { value } => value.iter().copied().collect(),
            InstKind::Call { args, .. } => args.to_vec(),
            InstKind::Syscall { num, args } => {
                let mut ops = vec![*num];
                ops.extend(args.iter().copied());
                ops
            }
            InstKind::Phi { incoming } => {
                incoming.iter().map(|(_, v)| *v).collect()
            }
        }
    }
}

/// An instruction: its (possibly empty) result name, result type, owning
/// block and operation.
#[derive(Clone, Debug)]
pub struct InstData {
    pub name: String,
    pub ty: TyId,
    pub block: BlockId,
    pub kind: InstKind,
}
