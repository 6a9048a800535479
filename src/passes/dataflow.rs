// This module attaches the control-flow graph and liveness information the
// physical register allocator consumes. Successor construction scans each
// block's instructions: every branch contributes an edge to its resolved
// target, and a block whose final instruction is not an unconditional branch
// falls through to the next block in program order. A branch to a label that
// was never bound to a block aborts the compile. Liveness seeds each block's
// def/use sets from the instruction-level enumeration (a register counts as
// block-use only when it is read before any local definition) and iterates
// live_out(b) = union of successor live_in, live_in(b) += live_out(b) minus
// def(b) until nothing changes. Union is monotonic over a finite register
// universe, so the fixed point is reached regardless of visitation order.

//! Control-flow edges and fixed-point liveness.

use crate::error::{CompileError, CompileResult};
use crate::ir::{BlockId, InstrKind, Procedure, Reg};
use crate::passes::def_use;
use hashbrown::HashSet;

fn push_edge(edges: &mut Vec<(BlockId, BlockId)>, from: BlockId, to: BlockId) {
    // A conditional branch whose target is also the fallthrough block would
    // record the edge twice; liveness is set-union based, keep lists dedup'd.
    if !edges.contains(&(from, to)) {
        edges.push((from, to));
    }
}

fn collect_edges(proc: &Procedure<'_>) -> CompileResult<Vec<(BlockId, BlockId)>> {
    let mut edges = Vec::new();
    for (b, block) in proc.blocks.iter().enumerate() {
        let from = BlockId(b as u32);
        for &id in &block.instrs {
            match proc.instrs[id.index()].kind {
                InstrKind::Branch { target } | InstrKind::BranchCond { target, .. } => {
                    let to = proc
                        .resolve_label(target)
                        .ok_or(CompileError::UnresolvedLabel(target))?;
                    push_edge(&mut edges, from, to);
                }
                _ => {}
            }
        }
        let ends_unconditionally = block
            .instrs
            .last()
            .is_some_and(|&id| matches!(proc.instrs[id.index()].kind, InstrKind::Branch { .. }));
        if !ends_unconditionally && b + 1 < proc.blocks.len() {
            push_edge(&mut edges, from, BlockId(b as u32 + 1));
        }
    }
    Ok(edges)
}

/// Build predecessor/successor lists and compute liveness to a fixed point.
/// Returns the number of iterations the fixed point took.
pub fn analyze(proc: &mut Procedure<'_>) -> CompileResult<u32> {
    let edges = collect_edges(proc)?;
    for block in &mut proc.blocks {
        block.preds.clear();
        block.succs.clear();
    }
    for (from, to) in edges {
        proc.blocks[from.index()].succs.push(to);
        proc.blocks[to.index()].preds.push(from);
    }

    // Block-local def/use snapshots.
    let Procedure { blocks, instrs, .. } = proc;
    for block in blocks.iter_mut() {
        block.defs.clear();
        block.uses.clear();
        for &id in &block.instrs {
            let instr = &instrs[id.index()];
            for r in def_use::uses(instr) {
                if !block.defs.contains(&r) {
                    block.uses.insert(r);
                }
            }
            for r in def_use::defs(instr) {
                block.defs.insert(r);
            }
        }
        block.live_in = block.uses.clone();
        block.live_out.clear();
    }

    // Fixed point. Sets only grow, so comparing sizes detects change.
    let mut iterations = 0;
    loop {
        iterations += 1;
        let mut changed = false;
        for b in 0..blocks.len() {
            let mut out: HashSet<Reg> = HashSet::new();
            for s in 0..blocks[b].succs.len() {
                let succ = blocks[b].succs[s];
                out.extend(blocks[succ.index()].live_in.iter().copied());
            }
            if out.len() != blocks[b].live_out.len() {
                changed = true;
            }
            blocks[b].live_out = out;

            let block = &mut blocks[b];
            let before = block.live_in.len();
            for &r in block.live_out.difference(&block.defs) {
                block.live_in.insert(r);
            }
            if block.live_in.len() != before {
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }

    log::debug!("{}: liveness converged after {} iterations", proc.name, iterations);
    Ok(iterations)
}
