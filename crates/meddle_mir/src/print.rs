//! The textual MIR listing.
//!
//! This grammar is normative: the golden tests compare against it verbatim.
//! Values print as `<type> <ref>`; slots are `$name`, data and functions
//! `@name`, arguments and instruction results `%name`, blocks bare names.
//! Names left empty by the lowering (unnamed mode, or internal temps) get
//! sequential numbers assigned at print time.

use crate::function::{ArgAttr, Function};
use crate::inst::{InstData, InstKind};
use crate::segment::{Abi, Arch, Os, Segment};
use crate::value::{ConstId, ConstKind, Value};
use std::fmt::Write;

/// Print-time names for anonymous values and blocks.
struct Namer {
    slots: Vec<String>,
    blocks: Vec<String>,
    insts: Vec<String>,
}

impl Namer {
    fn new(seg: &Segment, func: &Function) -> Self {
        let mut next = 0u32;
        let mut fresh = || {
            let n = next.to_string();
            next += 1;
            n
        };

        let slots = func
            .slots
            .iter()
            .map(|s| {
                if s.name.is_empty() {
                    fresh()
                } else {
                    s.name.clone()
                }
            })
            .collect();
        let mut blocks = vec![String::new(); func.blocks.len()];
        let mut insts = vec![String::new(); func.insts.len()];
        for block in &func.block_order {
            let data = func.block(*block);
            blocks[block.index()] = if data.name.is_empty() {
                fresh()
            } else {
                data.name.clone()
            };
            for inst in &data.insts {
                let idata = func.inst(*inst);
                insts[inst.index()] = if idata.name.is_empty() {
                    if idata.kind.produces_value()
                        && !seg.types.is_void(idata.ty)
                    {
                        fresh()
                    } else {
                        String::new()
                    }
                } else {
                    idata.name.clone()
                };
            }
        }
        Self {
            slots,
            blocks,
            insts,
        }
    }
}

pub fn print_segment(seg: &Segment) -> String {
    let mut out = String::new();

    let arch = match seg.target.arch {
        Arch::X86_64 => "x86_64",
    };
    let os = match seg.target.os {
        Os::Linux => "linux",
    };
    let abi = match seg.target.abi {
        Abi::SystemV => "system_v",
    };
    let _ = writeln!(out, "target :: {arch} {os} {abi}");
    out.push('\n');

    if !seg.types.struct_order.is_empty() {
        for ty in &seg.types.struct_order {
            if let crate::ty::TyKind::Struct { name, members } =
                seg.types.kind(*ty)
            {
                let members = members
                    .iter()
                    .map(|m| seg.types.name(*m))
                    .collect::<Vec<_>>()
                    .join(", ");
                let _ = writeln!(out, "struct {name} {{ {members} }}");
            }
        }
        out.push('\n');
    }

    if !seg.data.is_empty() {
        for data in &seg.data {
            let ro = if data.read_only { "readonly " } else { "" };
            let _ = writeln!(
                out,
                "{} :: {}{}, align {}",
                data.name,
                ro,
                const_ref(seg, data.value),
                data.align
            );
        }
        out.push('\n');
    }

    let mut first = true;
    for func in &seg.functions {
        if !first {
            out.push('\n');
        }
        first = false;
        print_function(&mut out, seg, func);
    }
    out
}

fn print_function(out: &mut String, seg: &Segment, func: &Function) {
    let namer = Namer::new(seg, func);

    let args = func
        .args
        .iter()
        .map(|arg| {
            let mut s = String::new();
            if arg.attrs.contains(ArgAttr::AARG) {
                s.push_str("aarg ");
            }
            if arg.attrs.contains(ArgAttr::ARET) {
                s.push_str("aret ");
            }
            let _ = write!(s, "{} %{}", seg.types.name(arg.ty), arg.name);
            s
        })
        .collect::<Vec<_>>()
        .join(", ");

    let _ = write!(out, "{} :: ({})", func.name, args);
    if !seg.types.is_void(func.ret) {
        let _ = write!(out, " -> {}", seg.types.name(func.ret));
    }

    if func.block_order.is_empty() {
        out.push_str(";\n");
        return;
    }
    out.push_str(" {\n");

    for (i, slot) in func.slots.iter().enumerate() {
        let name = &namer.slots[i];
        let _ = writeln!(
            out,
            "    ${} := slot {}, align {}",
            name,
            seg.types.name(slot.alloc),
            slot.align
        );
    }
    if !func.slots.is_empty() {
        out.push('\n');
    }

    for (i, block) in func.block_order.iter().enumerate() {
        if i != 0 {
            out.push('\n');
        }
        let _ = writeln!(out, "{}:", namer.blocks[block.index()]);
        for inst in &func.block(*block).insts {
            out.push_str("    ");
            print_inst(out, seg, func, &namer, func.inst(*inst), *inst);
            out.push('\n');
        }
    }

    out.push_str("}\n");
}

fn print_inst(
    out: &mut String,
    seg: &Segment,
    func: &Function,
    namer: &Namer,
    inst: &InstData,
    id: crate::inst::InstId,
) {
    let val = |v: Value| value_ref(seg, func, namer, v);
    let block = |b: crate::function::BlockId| namer.blocks[b.index()].clone();
    let result = |out: &mut String| {
        let _ = write!(out, "%{} := ", namer.insts[id.index()]);
    };

    match &inst.kind {
        InstKind::Binop { op, lhs, rhs } => {
            result(out);
            let _ =
                write!(out, "{} {}, {}", op.mnemonic(), val(*lhs), val(*rhs));
        }
        InstKind::Cmp { op, lhs, rhs } => {
            result(out);
            let _ =
                write!(out, "{} {}, {}", op.mnemonic(), val(*lhs), val(*rhs));
        }
        InstKind::Unop { op, value } => {
            result(out);
            let _ = write!(out, "{} {}", op.mnemonic(), val(*value));
            let operand_ty = value_ty(seg, func, *value);
            if operand_ty != inst.ty {
                let _ = write!(out, " -> {}", seg.types.name(inst.ty));
            }
        }
        InstKind::Store {
            value,
            dest,
            offset,
        } => {
            let _ = write!(out, "store {} -> {}", val(*value), val(*dest));
            if let Some(offset) = offset {
                let _ = write!(out, " + {}", const_ref(seg, *offset));
            }
        }
        InstKind::Load { src, offset } => {
            result(out);
            let _ = write!(
                out,
                "load {}, {}",
                seg.types.name(inst.ty),
                val(*src)
            );
            if let Some(offset) = offset {
                let _ = write!(out, " + {}", const_ref(seg, *offset));
            }
        }
        InstKind::Cpy {
            size,
            src,
            src_align,
            dest,
            dest_align,
        } => {
            let _ = write!(
                out,
                "cpy {}, {}, align {} -> {}, align {}",
                const_ref(seg, *size),
                val(*src),
                src_align,
                val(*dest),
                dest_align
            );
        }
        InstKind::Ap { base, index } => {
            result(out);
            let _ = write!(
                out,
                "ap {}, {}, {}",
                seg.types.name(inst.ty),
                val(*base),
                val(*index)
            );
        }
        InstKind::Brif {
            cond,
            then_dest,
            else_dest,
        } => {
            let _ = write!(
                out,
                "brif {}, {}, {}",
                val(*cond),
                block(*then_dest),
                block(*else_dest)
            );
        }
        InstKind::Jmp { dest } => {
            let _ = write!(out, "jmp {}", block(*dest));
        }
        InstKind::Ret { value } => {
            out.push_str("ret");
            if let Some(value) = value {
                let _ = write!(out, " {}", val(*value));
            }
        }
        InstKind::Call { callee, args } => {
            if !seg.types.is_void(inst.ty) {
                result(out);
            }
            let _ = write!(
                out,
                "call {} @{}",
                seg.types.name(inst.ty),
                seg.function(*callee).name
            );
            for arg in args {
                let _ = write!(out, ", {}", val(*arg));
            }
        }
        InstKind::Syscall { num, args } => {
            result(out);
            let _ = write!(out, "syscall {}", val(*num));
            for arg in args {
                let _ = write!(out, ", {}", val(*arg));
            }
        }
        InstKind::Phi { incoming } => {
            result(out);
            let _ = write!(out, "phi {}", seg.types.name(inst.ty));
            for (i, (from, value)) in incoming.iter().enumerate() {
                let sep = if i == 0 { " " } else { ", " };
                let _ =
                    write!(out, "{sep}[ {}, {} ]", block(*from), val(*value));
            }
        }
    }
}

fn value_ty(seg: &Segment, func: &Function, value: Value) -> crate::ty::TyId {
    match value {
        Value::Const(c) => seg.const_data(c).ty,
        Value::Data(d) => seg.data_def(d).ty,
        Value::Slot(s) => func.slot(s).ty,
        Value::Arg(a) => func.arg(a.index()).ty,
        Value::Inst(i) => func.inst(i).ty,
        Value::Func(f) => seg.function(f).ty,
        Value::Block(_) => seg.types.void(),
    }
}

fn value_ref(seg: &Segment, func: &Function, namer: &Namer, value: Value) -> String {
    match value {
        Value::Const(c) => const_ref(seg, c),
        Value::Data(d) => {
            let data = seg.data_def(d);
            format!("{} @{}", seg.types.name(data.ty), data.name)
        }
        Value::Slot(s) => {
            let slot = func.slot(s);
            format!(
                "{} ${}",
                seg.types.name(slot.ty),
                namer.slots[s.index()]
            )
        }
        Value::Arg(a) => {
            let arg = func.arg(a.index());
            format!("{} %{}", seg.types.name(arg.ty), arg.name)
        }
        Value::Inst(i) => {
            let inst = func.inst(i);
            format!(
                "{} %{}",
                seg.types.name(inst.ty),
                namer.insts[i.index()]
            )
        }
        Value::Block(b) => namer.blocks[b.index()].clone(),
        Value::Func(f) => format!("@{}", seg.function(f).name),
    }
}

fn const_ref(seg: &Segment, id: ConstId) -> String {
    let data = seg.const_data(id);
    let ty = seg.types.name(data.ty);
    match &data.kind {
        ConstKind::Int(v) => format!("{ty} {v}"),
        ConstKind::Fp(v) => format!("{ty} {v:?}"),
        ConstKind::Nil => format!("{ty} nil"),
        ConstKind::Str(s) => {
            let mut escaped = String::new();
            for byte in s.bytes() {
                match byte {
                    b'\n' => escaped.push_str("\\n"),
                    b'\t' => escaped.push_str("\\t"),
                    b'\r' => escaped.push_str("\\r"),
                    0 => escaped.push_str("\\0"),
                    b'\\' => escaped.push_str("\\\\"),
                    b'"' => escaped.push_str("\\\""),
                    other => escaped.push(other as char),
                }
            }
            format!("{ty} \"{escaped}\\0\"")
        }
        ConstKind::Aggregate(values) => {
            let values = values
                .iter()
                .map(|v| const_ref(seg, *v))
                .collect::<Vec<_>>()
                .join(", ");
            format!("{ty} [ {values} ]")
        }
    }
}
