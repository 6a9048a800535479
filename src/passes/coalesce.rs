//! Register unification: union-find coalescing of phi-connected registers.
//!
//! Values that flow together through a phi must occupy the same storage
//! location, independent of any liveness concern. Every register starts as
//! its own representative; every phi unions its destination with each of its
//! sources. `find` compresses paths as it walks, and a final sweep flattens
//! the forest so each representative pointer is at most one hop from its
//! root, giving later passes O(1) lookups.

use crate::ir::{InstrKind, Procedure, Reg, VirtualReg};

fn find(regs: &mut [VirtualReg], r: Reg) -> Reg {
    let parent = regs[r.index()].repr;
    if parent == r {
        return r;
    }
    let root = find(regs, parent);
    regs[r.index()].repr = root;
    root
}

fn union(regs: &mut [VirtualReg], a: Reg, b: Reg) -> bool {
    let root_a = find(regs, a);
    let root_b = find(regs, b);
    if root_a == root_b {
        return false;
    }
    regs[root_b.index()].repr = root_a;
    true
}

/// Run phi coalescing over one procedure. Returns the number of register
/// classes merged.
pub fn unify(proc: &mut Procedure<'_>) -> usize {
    let Procedure { blocks, instrs, regs, name, .. } = proc;
    let mut merged = 0;

    for block in blocks.iter() {
        for &id in &block.instrs {
            if let InstrKind::Phi { dst, srcs } = instrs[id.index()].kind {
                for &src in srcs {
                    if union(regs, dst, src) {
                        merged += 1;
                    }
                }
            }
        }
    }

    // Flatten so every representative pointer reaches its root directly.
    for i in 0..regs.len() {
        find(regs, Reg(i as u32));
    }

    if merged > 0 {
        log::debug!("{name}: coalesced {merged} phi-connected registers");
    }
    merged
}
