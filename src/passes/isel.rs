// This module lowers generic arithmetic/compare/load/store instructions into
// ARM-specialized kinds by inspecting the single static definition of the
// candidate source operand (the ALU second operand, or the memory address).
// A constant producer folds into a rotated 8-bit immediate, a shift producer
// folds into a shifted second operand, and an add producer folds into
// register- or immediate-offset addressing. The pass visits each instruction
// once in program order, so a producer consolidated earlier in the walk can
// feed a later fold (shift-by-immediate, immediate-offset addressing). It
// never checks whether the folded producer becomes dead; dead-code
// elimination runs immediately afterwards and sweeps producers whose only
// consumer was folded away.

//! Addressing-mode consolidation: peephole instruction selection.

use crate::ir::{
    encodes_arm_immediate, AddrOffset, InstrKind, Opcode, Operand2, Procedure, Reg, ShiftKind,
    MAX_LDST_OFFSET,
};

/// How a register's defining instruction can participate in a fold.
#[derive(Debug, Clone, Copy)]
enum FoldSrc {
    /// Defined by a constant materialization.
    Const(u32),
    /// Defined by a generic shift of `base` by the register `amount`.
    ShiftByReg { base: Reg, shift: ShiftKind, amount: Reg },
    /// Defined by an already-consolidated shift of `base` by a constant.
    ShiftByImm { base: Reg, shift: ShiftKind, amount: u8 },
    /// Defined by a generic `add base, offset`.
    AddReg { base: Reg, offset: Reg },
    /// Defined by an already-consolidated `add base, #offset`.
    AddImm { base: Reg, offset: u32 },
    /// Anything else, including registers with no definition (arguments).
    NoFold,
}

fn classify(proc: &Procedure<'_>, r: Reg) -> FoldSrc {
    let Some(def) = proc.regs[r.index()].def else {
        return FoldSrc::NoFold;
    };
    let instr = &proc.instrs[def.index()];
    match instr.kind {
        InstrKind::LoadImm { value, .. } => FoldSrc::Const(value as u32),
        InstrKind::Binary { lhs, rhs, .. } => {
            if let Some(shift) = ShiftKind::from_opcode(instr.op) {
                FoldSrc::ShiftByReg { base: lhs, shift, amount: rhs }
            } else if instr.op == Opcode::Add {
                FoldSrc::AddReg { base: lhs, offset: rhs }
            } else {
                FoldSrc::NoFold
            }
        }
        InstrKind::BinaryOp2 { lhs, rhs: Operand2::Imm(imm), .. } => {
            if let Some(shift) = ShiftKind::from_opcode(instr.op) {
                FoldSrc::ShiftByImm { base: lhs, shift, amount: imm as u8 }
            } else if instr.op == Opcode::Add {
                FoldSrc::AddImm { base: lhs, offset: imm }
            } else {
                FoldSrc::NoFold
            }
        }
        _ => FoldSrc::NoFold,
    }
}

/// Second-operand fold for a data-processing instruction. Shift opcodes take
/// a 5-bit amount instead of a rotated immediate and admit no shifted form.
fn fold_operand2(proc: &Procedure<'_>, op: Opcode, rhs: Reg) -> Option<Operand2> {
    match classify(proc, rhs) {
        FoldSrc::Const(v) if op.is_shift() => (v < 32).then_some(Operand2::Imm(v)),
        FoldSrc::Const(v) => encodes_arm_immediate(v).then_some(Operand2::Imm(v)),
        FoldSrc::ShiftByReg { base, shift, amount } if !op.is_shift() => {
            Some(Operand2::ShiftReg { base, shift, amount })
        }
        FoldSrc::ShiftByImm { base, shift, amount } if !op.is_shift() => {
            Some(Operand2::ShiftImm { base, shift, amount })
        }
        _ => None,
    }
}

/// Address fold for a word load/store.
fn fold_address(proc: &Procedure<'_>, addr: Reg) -> Option<(Reg, AddrOffset)> {
    match classify(proc, addr) {
        FoldSrc::AddReg { base, offset } => Some((base, AddrOffset::Reg(offset))),
        FoldSrc::AddImm { base, offset } if offset <= MAX_LDST_OFFSET => {
            Some((base, AddrOffset::Imm(offset)))
        }
        _ => None,
    }
}

/// Run addressing-mode consolidation over one procedure. Returns the number
/// of instructions rewritten.
///
/// Requires defining-instruction back-references (see
/// [`super::def_use::analyze_defs`]).
pub fn consolidate(proc: &mut Procedure<'_>) -> usize {
    let mut folded = 0;
    for b in 0..proc.blocks.len() {
        for i in 0..proc.blocks[b].instrs.len() {
            let id = proc.blocks[b].instrs[i];
            let op = proc.instrs[id.index()].op;
            let kind = proc.instrs[id.index()].kind;
            let new_kind = match kind {
                InstrKind::Unary { dst, src } => {
                    fold_operand2(proc, op, src).map(|src| InstrKind::UnaryOp2 { dst, src })
                }
                InstrKind::Binary { dst, lhs, rhs, flags } => fold_operand2(proc, op, rhs)
                    .map(|rhs| InstrKind::BinaryOp2 { dst, lhs, rhs, flags }),
                InstrKind::Compare { flags, lhs, rhs } => fold_operand2(proc, op, rhs)
                    .map(|rhs| InstrKind::CompareOp2 { flags, lhs, rhs }),
                InstrKind::Load { dst, addr } => fold_address(proc, addr)
                    .map(|(base, offset)| InstrKind::LoadIdx { dst, base, offset }),
                InstrKind::Store { src, addr } => fold_address(proc, addr)
                    .map(|(base, offset)| InstrKind::StoreIdx { src, base, offset }),
                _ => None,
            };
            if let Some(new_kind) = new_kind {
                let instr = &mut proc.instrs[id.index()];
                instr.kind = new_kind;
                folded += 1;
                log::trace!("consolidated {}", instr);
            }
        }
    }
    if folded > 0 {
        log::debug!("{}: consolidated {} instructions", proc.name, folded);
    }
    folded
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Module, RegKind};
    use crate::passes::def_use;
    use bumpalo::Bump;

    #[test]
    fn test_constant_folds_into_immediate_operand() {
        let arena = Bump::new();
        let mut module = Module::new(&arena);
        let proc = module.add_proc("p", 1);
        let block = proc.create_block();
        let c = proc.create_reg(RegKind::General);
        let d = proc.create_reg(RegKind::General);
        proc.emit_load_imm(block, c, 5);
        let add = proc.emit_binary(block, Opcode::Add, d, Reg(0), c);

        def_use::analyze_defs(proc);
        assert_eq!(consolidate(proc), 1);
        assert_eq!(
            proc.instrs[add.index()].kind,
            InstrKind::BinaryOp2 { dst: d, lhs: Reg(0), rhs: Operand2::Imm(5), flags: None }
        );
        assert_eq!(proc.instrs[add.index()].op, Opcode::Add);
    }

    #[test]
    fn test_unencodable_constant_is_left_alone() {
        let arena = Bump::new();
        let mut module = Module::new(&arena);
        let proc = module.add_proc("p", 1);
        let block = proc.create_block();
        let c = proc.create_reg(RegKind::General);
        let d = proc.create_reg(RegKind::General);
        proc.emit_load_imm(block, c, 0x101);
        let add = proc.emit_binary(block, Opcode::Add, d, Reg(0), c);

        def_use::analyze_defs(proc);
        assert_eq!(consolidate(proc), 0);
        assert!(matches!(proc.instrs[add.index()].kind, InstrKind::Binary { .. }));
    }

    #[test]
    fn test_shift_producer_folds_into_shifted_operand() {
        let arena = Bump::new();
        let mut module = Module::new(&arena);
        let proc = module.add_proc("p", 3);
        let block = proc.create_block();
        let sh = proc.create_reg(RegKind::General);
        let d = proc.create_reg(RegKind::General);
        proc.emit_binary(block, Opcode::Lsl, sh, Reg(1), Reg(2));
        let add = proc.emit_binary(block, Opcode::Add, d, Reg(0), sh);

        def_use::analyze_defs(proc);
        consolidate(proc);
        assert_eq!(
            proc.instrs[add.index()].kind,
            InstrKind::BinaryOp2 {
                dst: d,
                lhs: Reg(0),
                rhs: Operand2::ShiftReg { base: Reg(1), shift: ShiftKind::Lsl, amount: Reg(2) },
                flags: None,
            }
        );
    }

    #[test]
    fn test_shift_amount_constant_chains_into_shift_by_immediate() {
        let arena = Bump::new();
        let mut module = Module::new(&arena);
        let proc = module.add_proc("p", 2);
        let block = proc.create_block();
        let amt = proc.create_reg(RegKind::General);
        let sh = proc.create_reg(RegKind::General);
        let d = proc.create_reg(RegKind::General);
        proc.emit_load_imm(block, amt, 3);
        let lsl = proc.emit_binary(block, Opcode::Lsl, sh, Reg(1), amt);
        let add = proc.emit_binary(block, Opcode::Add, d, Reg(0), sh);

        def_use::analyze_defs(proc);
        assert_eq!(consolidate(proc), 2);
        // The shift's amount folded first, then the shift itself folded into
        // the add as a shift-by-immediate operand.
        assert_eq!(
            proc.instrs[lsl.index()].kind,
            InstrKind::BinaryOp2 { dst: sh, lhs: Reg(1), rhs: Operand2::Imm(3), flags: None }
        );
        assert_eq!(
            proc.instrs[add.index()].kind,
            InstrKind::BinaryOp2 {
                dst: d,
                lhs: Reg(0),
                rhs: Operand2::ShiftImm { base: Reg(1), shift: ShiftKind::Lsl, amount: 3 },
                flags: None,
            }
        );
    }

    #[test]
    fn test_shift_opcode_rejects_wide_amounts_and_shifted_operands() {
        let arena = Bump::new();
        let mut module = Module::new(&arena);
        let proc = module.add_proc("p", 2);
        let block = proc.create_block();
        let amt = proc.create_reg(RegKind::General);
        let d = proc.create_reg(RegKind::General);
        proc.emit_load_imm(block, amt, 40); // encodable, but not a shift amount
        let lsr = proc.emit_binary(block, Opcode::Lsr, d, Reg(0), amt);

        def_use::analyze_defs(proc);
        assert_eq!(consolidate(proc), 0);
        assert!(matches!(proc.instrs[lsr.index()].kind, InstrKind::Binary { .. }));
    }

    #[test]
    fn test_compare_folds_like_binary() {
        let arena = Bump::new();
        let mut module = Module::new(&arena);
        let proc = module.add_proc("p", 1);
        let block = proc.create_block();
        let c = proc.create_reg(RegKind::General);
        let f = proc.create_reg(RegKind::Flags);
        proc.emit_load_imm(block, c, 0xff00);
        let cmp = proc.emit_compare(block, Opcode::Cmp, f, Reg(0), c);

        def_use::analyze_defs(proc);
        consolidate(proc);
        assert_eq!(
            proc.instrs[cmp.index()].kind,
            InstrKind::CompareOp2 { flags: f, lhs: Reg(0), rhs: Operand2::Imm(0xff00) }
        );
    }

    #[test]
    fn test_load_folds_register_offset_addressing() {
        let arena = Bump::new();
        let mut module = Module::new(&arena);
        let proc = module.add_proc("p", 2);
        let block = proc.create_block();
        let addr = proc.create_reg(RegKind::General);
        let d = proc.create_reg(RegKind::General);
        proc.emit_binary(block, Opcode::Add, addr, Reg(0), Reg(1));
        let ld = proc.emit_load(block, d, addr);

        def_use::analyze_defs(proc);
        consolidate(proc);
        assert_eq!(
            proc.instrs[ld.index()].kind,
            InstrKind::LoadIdx { dst: d, base: Reg(0), offset: AddrOffset::Reg(Reg(1)) }
        );
    }

    #[test]
    fn test_store_folds_immediate_offset_addressing() {
        let arena = Bump::new();
        let mut module = Module::new(&arena);
        let proc = module.add_proc("p", 2);
        let block = proc.create_block();
        let off = proc.create_reg(RegKind::General);
        let addr = proc.create_reg(RegKind::General);
        proc.emit_load_imm(block, off, 16);
        proc.emit_binary(block, Opcode::Add, addr, Reg(0), off);
        let st = proc.emit_store(block, Reg(1), addr);

        def_use::analyze_defs(proc);
        consolidate(proc);
        assert_eq!(
            proc.instrs[st.index()].kind,
            InstrKind::StoreIdx { src: Reg(1), base: Reg(0), offset: AddrOffset::Imm(16) }
        );
    }

    #[test]
    fn test_offset_past_native_range_stays_register_based() {
        let arena = Bump::new();
        let mut module = Module::new(&arena);
        let proc = module.add_proc("p", 2);
        let block = proc.create_block();
        let off = proc.create_reg(RegKind::General);
        let addr = proc.create_reg(RegKind::General);
        let d = proc.create_reg(RegKind::General);
        proc.emit_load_imm(block, off, 0x400); // encodable immediate, > 255
        proc.emit_binary(block, Opcode::Add, addr, Reg(0), off);
        let ld = proc.emit_load(block, d, addr);

        def_use::analyze_defs(proc);
        consolidate(proc);
        // The add became add-immediate, but its result cannot fold into the
        // load's offset field.
        assert!(matches!(proc.instrs[ld.index()].kind, InstrKind::Load { .. }));
    }
}
