//! Structural verification of a lowered segment.
//!
//! Checks the invariants the rest of the pipeline relies on: exactly one
//! terminator per attached block, consistent use-lists, the `AArg` entry
//! copy, and the `ARet` calling convention.

use crate::function::{ArgAttr, Function};
use crate::inst::InstKind;
use crate::segment::Segment;
use crate::value::Value;

/// Verifies every function in the segment. Returns the first violation.
pub fn verify_segment(seg: &Segment) -> Result<(), String> {
    for func in &seg.functions {
        verify_function(seg, func)
            .map_err(|e| format!("function '{}': {}", func.name, e))?;
    }
    Ok(())
}

fn verify_function(seg: &Segment, func: &Function) -> Result<(), String> {
    // ARet convention: void MIR return type and a leading pointer.
    if func.has_aret() {
        if !seg.types.is_void(func.ret) {
            return Err("aret function has a non-void return type".into());
        }
        let first = &func.args[0];
        if !seg.types.is_ptr(first.ty) {
            return Err("aret argument is not a pointer".into());
        }
    }

    // Exactly one terminator per attached block, and only at the end.
    for block in &func.block_order {
        let data = func.block(*block);
        let terminators = data
            .insts
            .iter()
            .filter(|i| func.inst(**i).kind.is_terminator())
            .count();
        if terminators != 1 {
            return Err(format!(
                "block '{}' has {} terminators",
                data.name, terminators
            ));
        }
        let last = *data.insts.last().expect("terminated block is non-empty");
        if !func.inst(last).kind.is_terminator() {
            return Err(format!(
                "block '{}' does not end in its terminator",
                data.name
            ));
        }
    }

    // Every use-list entry names an instruction that actually has the value
    // as an operand.
    for (value, users) in &func.uses {
        for user in users {
            let operands = func.inst(*user).kind.operands();
            if !operands.contains(value) {
                return Err(format!(
                    "dangling use: {value:?} lists a non-operand user"
                ));
            }
        }
    }

    // Every AArg argument is copied into its slot in the entry block.
    if func.has_body {
        if let Some(entry) = func.block_order.first() {
            for arg in &func.args {
                if !arg.attrs.contains(ArgAttr::AARG) {
                    continue;
                }
                let slot = match arg.slot {
                    Some(slot) => slot,
                    None => {
                        return Err(format!(
                            "aarg argument '{}' has no slot",
                            arg.name
                        ))
                    }
                };
                let copied = func.block(*entry).insts.iter().any(|i| {
                    matches!(
                        &func.inst(*i).kind,
                        InstKind::Cpy { src, dest, .. }
                            if *src == Value::Arg(crate::value::ArgId::new(arg.index as usize))
                                && *dest == Value::Slot(slot)
                    )
                });
                if !copied {
                    return Err(format!(
                        "aarg argument '{}' is not copied into its slot",
                        arg.name
                    ));
                }
            }
        }
    }

    Ok(())
}
