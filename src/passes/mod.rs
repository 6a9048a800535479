//! The fixed pass pipeline.
//!
//! Each pass consumes and rewrites the shared IR in place, and each depends
//! on state left by the previous one, so [`run`] executes them in the one
//! valid order: def analysis, addressing-mode consolidation, dead-code
//! elimination, register unification, frame allocation, use-chain
//! construction, control flow + liveness. After [`run`] returns, the module
//! is ready for the physical register allocator and encoder.

pub mod coalesce;
pub mod dataflow;
pub mod dce;
pub mod def_use;
pub mod frame;
pub mod isel;

use crate::error::CompileResult;
use crate::ir::Module;
use std::fmt;

/// Counters accumulated across one pipeline run, for logging and tests.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PassStats {
    /// Instructions rewritten into ARM-specialized kinds.
    pub instrs_folded: usize,
    /// Instructions swept by dead-code elimination.
    pub instrs_eliminated: usize,
    /// Register classes merged by phi coalescing.
    pub regs_coalesced: usize,
    /// Spill slots created by frame allocation.
    pub spill_slots: usize,
    /// Total liveness fixed-point iterations over all procedures.
    pub liveness_iterations: u32,
}

impl fmt::Display for PassStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Pass pipeline statistics:")?;
        writeln!(f, "  Instructions folded: {}", self.instrs_folded)?;
        writeln!(f, "  Instructions eliminated: {}", self.instrs_eliminated)?;
        writeln!(f, "  Registers coalesced: {}", self.regs_coalesced)?;
        writeln!(f, "  Spill slots: {}", self.spill_slots)?;
        writeln!(f, "  Liveness iterations: {}", self.liveness_iterations)
    }
}

/// Run the full pass pipeline over every procedure of a module.
pub fn run(module: &mut Module<'_>) -> CompileResult<PassStats> {
    let mut stats = PassStats::default();
    for proc in &mut module.procs {
        log::debug!("lowering {}", proc.name);
        def_use::analyze_defs(proc);
        stats.instrs_folded += isel::consolidate(proc);
        stats.instrs_eliminated += dce::eliminate(proc);
        stats.regs_coalesced += coalesce::unify(proc);
        stats.spill_slots += frame::allocate(proc);
        def_use::build_use_chains(proc);
        stats.liveness_iterations += dataflow::analyze(proc)?;
        log::trace!("{proc}");
    }
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Module, Opcode, Reg, RegKind};
    use bumpalo::Bump;

    #[test]
    fn test_pipeline_runs_every_pass() {
        let arena = Bump::new();
        let mut module = Module::new(&arena);
        let proc = module.add_proc("fill", 2);
        let block = proc.create_block();
        let c = proc.create_reg(RegKind::General);
        let sum = proc.create_reg(RegKind::General);
        proc.emit_load_imm(block, c, 5);
        proc.emit_binary(block, Opcode::Add, sum, Reg(0), c);
        proc.emit_store(block, sum, Reg(1));
        proc.emit_ret(block, None);

        let stats = run(&mut module).unwrap();
        assert_eq!(stats.instrs_folded, 1);
        assert_eq!(stats.instrs_eliminated, 1);
        assert_eq!(stats.regs_coalesced, 0);
        assert!(stats.liveness_iterations >= 1);

        let proc = &module.procs[0];
        // Liveness and use chains describe the post-elimination program.
        assert!(proc.regs[c.index()].uses.is_empty());
        assert_eq!(proc.regs[sum.index()].uses.len(), 1);
        assert!(proc.blocks[0].defs.contains(&sum));
        assert!(!proc.blocks[0].uses.contains(&c));
    }

    #[test]
    fn test_stats_display() {
        let stats = PassStats { instrs_folded: 3, ..PassStats::default() };
        let text = format!("{stats}");
        assert!(text.contains("Instructions folded: 3"));
        assert!(text.contains("Liveness iterations: 0"));
    }
}
