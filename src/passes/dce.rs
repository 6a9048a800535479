//! Dead-code elimination.
//!
//! Two-phase, per procedure: clear every instruction's `used` flag, seed a
//! worklist with the inherently side-effecting instructions (stores, calls,
//! returns, branches), then transitively mark the defining instruction of
//! every register a marked instruction consumes. The sweep removes unmarked
//! instructions from their block lists, preserving the relative order of the
//! survivors. Reachability over the def→use graph rooted at effectful
//! instructions; running it twice yields the same surviving set.

use crate::passes::def_use;
use crate::ir::Procedure;
use bumpalo::collections::Vec as ArenaVec;

/// Run dead-code elimination over one procedure. Returns the number of
/// instructions removed.
///
/// Requires defining-instruction back-references (see
/// [`super::def_use::analyze_defs`]).
pub fn eliminate(proc: &mut Procedure<'_>) -> usize {
    let Procedure { arena, blocks, instrs, regs, name, .. } = proc;

    for instr in instrs.iter_mut() {
        instr.used = false;
    }

    // Mark roots.
    let mut work = ArenaVec::new_in(*arena);
    for block in blocks.iter() {
        for &id in &block.instrs {
            let instr = &mut instrs[id.index()];
            if instr.kind.has_side_effect() {
                instr.used = true;
                work.push(id);
            }
        }
    }

    // Transitively mark producers of consumed registers.
    while let Some(id) = work.pop() {
        for r in def_use::uses(&instrs[id.index()]) {
            if let Some(def) = regs[r.index()].def {
                let producer = &mut instrs[def.index()];
                if !producer.used {
                    producer.used = true;
                    work.push(def);
                }
            }
        }
    }

    // Sweep. Pool entries stay allocated in the arena; only the block lists
    // shrink.
    let mut removed = 0;
    for block in blocks.iter_mut() {
        let before = block.instrs.len();
        block.instrs.retain(|id| instrs[id.index()].used);
        removed += before - block.instrs.len();
    }
    if removed > 0 {
        log::debug!("{name}: eliminated {removed} dead instructions");
    }
    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{InstrKind, Module, Opcode, Reg, RegKind};
    use crate::passes::{def_use, isel};
    use bumpalo::Bump;

    #[test]
    fn test_unused_computation_is_removed() {
        let arena = Bump::new();
        let mut module = Module::new(&arena);
        let proc = module.add_proc("p", 1);
        let block = proc.create_block();
        let dead = proc.create_reg(RegKind::General);
        let live = proc.create_reg(RegKind::General);
        proc.emit_binary(block, Opcode::Mul, dead, Reg(0), Reg(0));
        let add = proc.emit_binary(block, Opcode::Add, live, Reg(0), Reg(0));
        let ret = proc.emit_ret(block, Some(live));

        def_use::analyze_defs(proc);
        assert_eq!(eliminate(proc), 1);
        assert_eq!(proc.blocks[block.index()].instrs, vec![add, ret]);
    }

    #[test]
    fn test_folded_constant_producer_dies() {
        // load_immediate + add consolidates to add-immediate, after which
        // the load_immediate has no remaining consumer and is swept.
        let arena = Bump::new();
        let mut module = Module::new(&arena);
        let proc = module.add_proc("p", 1);
        let block = proc.create_block();
        let c = proc.create_reg(RegKind::General);
        let d = proc.create_reg(RegKind::General);
        proc.emit_load_imm(block, c, 5);
        let add = proc.emit_binary(block, Opcode::Add, d, Reg(0), c);
        let ret = proc.emit_ret(block, Some(d));

        def_use::analyze_defs(proc);
        isel::consolidate(proc);
        assert_eq!(eliminate(proc), 1);
        assert_eq!(proc.blocks[block.index()].instrs, vec![add, ret]);
        assert!(matches!(proc.instrs[add.index()].kind, InstrKind::BinaryOp2 { .. }));
    }

    #[test]
    fn test_transitive_chains_stay_live() {
        let arena = Bump::new();
        let mut module = Module::new(&arena);
        let proc = module.add_proc("p", 2);
        let block = proc.create_block();
        let a = proc.create_reg(RegKind::General);
        let b = proc.create_reg(RegKind::General);
        let i0 = proc.emit_binary(block, Opcode::Mul, a, Reg(0), Reg(1));
        let i1 = proc.emit_binary(block, Opcode::Add, b, a, Reg(1));
        let i2 = proc.emit_store(block, b, Reg(0));

        def_use::analyze_defs(proc);
        assert_eq!(eliminate(proc), 0);
        assert_eq!(proc.blocks[block.index()].instrs, vec![i0, i1, i2]);
    }

    #[test]
    fn test_branches_and_compares_survive() {
        let arena = Bump::new();
        let mut module = Module::new(&arena);
        let proc = module.add_proc("p", 2);
        let entry = proc.create_block();
        let exit_label = proc.declare_label();
        let f = proc.create_reg(RegKind::Flags);
        let cmp = proc.emit_compare(entry, Opcode::Cmp, f, Reg(0), Reg(1));
        let bcc = proc.emit_branch_cond(entry, Opcode::Beq, f, exit_label);
        let exit = proc.create_block_at(exit_label);
        let ret = proc.emit_ret(exit, None);

        def_use::analyze_defs(proc);
        eliminate(proc);
        // The conditional branch roots the compare through its flags use.
        assert_eq!(proc.blocks[entry.index()].instrs, vec![cmp, bcc]);
        assert_eq!(proc.blocks[exit.index()].instrs, vec![ret]);
    }

    #[test]
    fn test_elimination_is_idempotent() {
        let arena = Bump::new();
        let mut module = Module::new(&arena);
        let proc = module.add_proc("p", 1);
        let block = proc.create_block();
        let dead = proc.create_reg(RegKind::General);
        let live = proc.create_reg(RegKind::General);
        proc.emit_load_imm(block, dead, 9);
        proc.emit_binary(block, Opcode::Add, live, Reg(0), Reg(0));
        proc.emit_ret(block, Some(live));

        def_use::analyze_defs(proc);
        let first = eliminate(proc);
        let survivors: Vec<_> = proc.blocks[block.index()].instrs.clone();
        let second = eliminate(proc);

        assert_eq!(first, 1);
        assert_eq!(second, 0);
        assert_eq!(proc.blocks[block.index()].instrs, survivors);
    }
}
