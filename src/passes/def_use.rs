// This module is the def/use primitive every other pass is built on: pure,
// stateless enumeration of the registers an instruction defines and consumes,
// derived from its kind and payload alone. The result sequences are growable
// SmallVecs; a phi or call with any number of operands enumerates completely.
// The module also hosts the two pipeline passes derived directly from the
// queries: def analysis (recording each register's defining instruction,
// asserting single assignment) and use-chain construction (recording each
// register's readers in program order).

//! Def/use enumeration and the defining-instruction / use-chain passes.

use crate::ir::{AddrOffset, Instr, InstrKind, Operand2, Procedure, Reg};
use smallvec::SmallVec;

/// Registers defined by an instruction. Most kinds define at most a value
/// register and a flags register.
pub type DefList = SmallVec<[Reg; 2]>;

/// Registers consumed by an instruction. Grows past the inline capacity for
/// wide phis and calls.
pub type UseList = SmallVec<[Reg; 4]>;

/// The registers `instr` defines.
pub fn defs(instr: &Instr<'_>) -> DefList {
    let mut out = DefList::new();
    match instr.kind {
        InstrKind::Unary { dst, .. }
        | InstrKind::UnaryOp2 { dst, .. }
        | InstrKind::Load { dst, .. }
        | InstrKind::LoadIdx { dst, .. }
        | InstrKind::LoadImm { dst, .. }
        | InstrKind::Phi { dst, .. } => out.push(dst),
        InstrKind::Binary { dst, flags, .. } | InstrKind::BinaryOp2 { dst, flags, .. } => {
            out.push(dst);
            if let Some(f) = flags {
                out.push(f);
            }
        }
        InstrKind::Compare { flags, .. } | InstrKind::CompareOp2 { flags, .. } => out.push(flags),
        InstrKind::Call { dst, .. } => {
            if let Some(d) = dst {
                out.push(d);
            }
        }
        InstrKind::Store { .. }
        | InstrKind::StoreIdx { .. }
        | InstrKind::Branch { .. }
        | InstrKind::BranchCond { .. }
        | InstrKind::Ret { .. } => {}
    }
    out
}

fn push_operand2(op2: Operand2, out: &mut UseList) {
    match op2 {
        Operand2::Imm(_) => {}
        Operand2::ShiftReg { base, amount, .. } => {
            out.push(base);
            out.push(amount);
        }
        Operand2::ShiftImm { base, .. } => out.push(base),
    }
}

/// The registers `instr` consumes.
pub fn uses(instr: &Instr<'_>) -> UseList {
    let mut out = UseList::new();
    match instr.kind {
        InstrKind::Unary { src, .. } => out.push(src),
        InstrKind::UnaryOp2 { src, .. } => push_operand2(src, &mut out),
        InstrKind::Binary { lhs, rhs, .. } | InstrKind::Compare { lhs, rhs, .. } => {
            out.push(lhs);
            out.push(rhs);
        }
        InstrKind::BinaryOp2 { lhs, rhs, .. } | InstrKind::CompareOp2 { lhs, rhs, .. } => {
            out.push(lhs);
            push_operand2(rhs, &mut out);
        }
        InstrKind::Load { addr, .. } => out.push(addr),
        InstrKind::LoadIdx { base, offset, .. } => {
            out.push(base);
            if let AddrOffset::Reg(r) = offset {
                out.push(r);
            }
        }
        InstrKind::Store { src, addr } => {
            out.push(src);
            out.push(addr);
        }
        InstrKind::StoreIdx { src, base, offset } => {
            out.push(src);
            out.push(base);
            if let AddrOffset::Reg(r) = offset {
                out.push(r);
            }
        }
        InstrKind::LoadImm { .. } | InstrKind::Branch { .. } => {}
        InstrKind::BranchCond { flags, .. } => out.push(flags),
        InstrKind::Phi { srcs, .. } => out.extend(srcs.iter().copied()),
        InstrKind::Call { args, .. } => out.extend(args.iter().copied()),
        InstrKind::Ret { value } => {
            if let Some(v) = value {
                out.push(v);
            }
        }
    }
    out
}

/// Record every register's defining instruction.
///
/// Must run before addressing-mode consolidation, which navigates from an
/// operand to its single static definition. Double definition of a register
/// is a contract violation by the emitting generator.
pub fn analyze_defs(proc: &mut Procedure<'_>) {
    for reg in &mut proc.regs {
        reg.def = None;
    }
    for b in 0..proc.blocks.len() {
        for i in 0..proc.blocks[b].instrs.len() {
            let id = proc.blocks[b].instrs[i];
            let defined = defs(&proc.instrs[id.index()]);
            for d in defined {
                let slot = &mut proc.regs[d.index()].def;
                assert!(slot.is_none(), "register {d} is defined by more than one instruction");
                *slot = Some(id);
            }
        }
    }
}

/// Rebuild every register's use chain from the surviving instructions,
/// in program order.
pub fn build_use_chains(proc: &mut Procedure<'_>) {
    for reg in &mut proc.regs {
        reg.uses.clear();
    }
    for b in 0..proc.blocks.len() {
        for i in 0..proc.blocks[b].instrs.len() {
            let id = proc.blocks[b].instrs[i];
            let used = uses(&proc.instrs[id.index()]);
            for r in used {
                proc.regs[r.index()].uses.push(id);
            }
        }
    }
}
