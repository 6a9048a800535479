// This module provides the arena-based IR container types for rastjit. A
// Module owns the bump arena reference and the procedures of one compile
// unit; a Procedure owns its blocks (program order), virtual registers
// (definition order), the append-only instruction pool and the label table;
// a Block owns its ordered instruction list plus the predecessor/successor
// lists and liveness sets filled in by the dataflow pass. All graph edges are
// index handles (Reg, InstrId, BlockId, Label) rather than raw pointers, so
// union-find reparenting and instruction removal cannot dangle. Everything
// allocated from the arena (interned names, phi source lists, call argument
// lists) lives until the whole compile unit is discarded.

//! IR containers: modules, procedures, blocks and virtual registers.
//!
//! One [`Module`] per compile unit, one arena per module. Pipeline-part
//! generators build the IR exclusively through the construction API in
//! [`crate::ir::build`]; the pass pipeline rewrites it in place; the physical
//! register allocator and encoder consume the finalized structures.

use bumpalo::Bump;
use hashbrown::HashSet;
use std::fmt;

/// Handle of a virtual register, indexing the owning procedure's register
/// table in definition order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Reg(pub(crate) u32);

impl Reg {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for Reg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%r{}", self.0)
    }
}

/// Handle of an instruction in the owning procedure's instruction pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InstrId(pub(crate) u32);

impl InstrId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Handle of a block in the owning procedure, in program order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(pub(crate) u32);

impl BlockId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Forward-declarable block reference used as a branch target.
///
/// A label starts unbound and is resolved to a concrete [`BlockId`] when a
/// block is created at it. The prologue/epilogue handles of a procedure are
/// labels that stay unbound; only the encoder gives them meaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Label(pub(crate) u32);

impl Label {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "^L{}", self.0)
    }
}

/// Register kind. Flags registers hold condition codes produced by compares
/// and consumed by conditional branches; everything else is general-purpose.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegKind {
    General,
    Flags,
}

/// One SSA-like value slot.
#[derive(Debug, Clone)]
pub struct VirtualReg {
    pub kind: RegKind,
    /// Union-find representative; self until register unification merges it.
    pub repr: Reg,
    /// Defining instruction, at most one before coalescing.
    pub def: Option<InstrId>,
    /// Instructions reading this register, in program order.
    pub uses: Vec<InstrId>,
    /// Frame displacement assigned by frame allocation.
    pub frame_offset: Option<i32>,
    pub is_arg: bool,
}

/// A basic block: an ordered instruction list plus the control-flow and
/// liveness data attached by the dataflow pass.
#[derive(Debug, Clone)]
pub struct Block {
    /// The label bound to this block.
    pub label: Label,
    /// Instruction handles in program order. Passes remove or retype
    /// instructions but never reorder this list.
    pub instrs: Vec<InstrId>,
    pub preds: Vec<BlockId>,
    pub succs: Vec<BlockId>,
    /// Registers defined somewhere in this block.
    pub defs: HashSet<Reg>,
    /// Registers read before any local definition (live-in candidates).
    pub uses: HashSet<Reg>,
    pub live_in: HashSet<Reg>,
    pub live_out: HashSet<Reg>,
}

impl Block {
    pub(crate) fn new(label: Label) -> Self {
        Self {
            label,
            instrs: Vec::new(),
            preds: Vec::new(),
            succs: Vec::new(),
            defs: HashSet::new(),
            uses: HashSet::new(),
            live_in: HashSet::new(),
            live_out: HashSet::new(),
        }
    }
}

/// One synthesized pipeline procedure.
pub struct Procedure<'arena> {
    pub(crate) arena: &'arena Bump,
    /// Interned name, used for log narration only.
    pub name: &'arena str,
    pub regs: Vec<VirtualReg>,
    pub blocks: Vec<Block>,
    /// Append-only instruction pool; blocks reference it by [`InstrId`].
    /// Entries swept by dead-code elimination simply become unreferenced.
    pub instrs: Vec<super::instr::Instr<'arena>>,
    /// Label table; `None` until a block is created at the label.
    pub labels: Vec<Option<BlockId>>,
    pub num_args: u32,
    /// Local-storage byte size, set by frame allocation.
    pub frame_size: u32,
    /// Opaque handle the encoder resolves to the function prologue.
    pub prologue: Label,
    /// Opaque handle the encoder resolves to the function epilogue.
    pub epilogue: Label,
}

impl<'arena> Procedure<'arena> {
    pub(crate) fn new(arena: &'arena Bump, name: &'arena str, num_args: u32) -> Self {
        let mut proc = Self {
            arena,
            name,
            regs: Vec::new(),
            blocks: Vec::new(),
            instrs: Vec::new(),
            labels: Vec::new(),
            num_args,
            frame_size: 0,
            prologue: Label(0),
            epilogue: Label(0),
        };
        proc.prologue = proc.declare_label();
        proc.epilogue = proc.declare_label();
        for _ in 0..num_args {
            let r = proc.create_reg(RegKind::General);
            proc.regs[r.index()].is_arg = true;
        }
        proc
    }

    /// The argument registers, in argument order.
    pub fn args(&self) -> impl Iterator<Item = Reg> + '_ {
        (0..self.num_args).map(Reg)
    }

    /// The block a label resolves to, if it has been bound.
    pub fn resolve_label(&self, label: Label) -> Option<BlockId> {
        self.labels[label.index()]
    }

    /// Union-find representative of a register.
    ///
    /// Read-only chase of representative pointers; after the unification
    /// pass the forest is flattened, so this is a single hop.
    pub fn representative(&self, r: Reg) -> Reg {
        let mut cur = r;
        loop {
            let parent = self.regs[cur.index()].repr;
            if parent == cur {
                return cur;
            }
            cur = parent;
        }
    }

    /// Frame displacement of a register, valid after frame allocation.
    pub fn frame_offset(&self, r: Reg) -> Option<i32> {
        self.regs[r.index()].frame_offset
    }
}

impl fmt::Display for Procedure<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "proc {}({} args)", self.name, self.num_args)?;
        for block in &self.blocks {
            writeln!(f, "{}:", block.label)?;
            for &id in &block.instrs {
                writeln!(f, "    {}", self.instrs[id.index()])?;
            }
        }
        Ok(())
    }
}

/// One compile unit: an arena reference and the procedures built in it.
///
/// A module and its arena must not be shared across concurrent compiles;
/// every concurrent compilation needs its own pair.
pub struct Module<'arena> {
    arena: &'arena Bump,
    pub procs: Vec<Procedure<'arena>>,
}

impl<'arena> Module<'arena> {
    /// Create a module backed by the given arena.
    pub fn new(arena: &'arena Bump) -> Self {
        Self { arena, procs: Vec::new() }
    }

    /// Access to the arena allocator.
    pub fn arena(&self) -> &'arena Bump {
        self.arena
    }

    /// Create a procedure with `num_args` eagerly-created argument registers
    /// and append it to the module.
    pub fn add_proc(&mut self, name: &str, num_args: u32) -> &mut Procedure<'arena> {
        let name = self.arena.alloc_str(name);
        let idx = self.procs.len();
        self.procs.push(Procedure::new(self.arena, name, num_args));
        &mut self.procs[idx]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_creation() {
        let arena = Bump::new();
        let mut module = Module::new(&arena);
        let proc = module.add_proc("span_fill", 2);

        assert_eq!(proc.name, "span_fill");
        assert_eq!(proc.num_args, 2);
        assert_eq!(proc.regs.len(), 2);
        assert!(proc.regs.iter().all(|r| r.is_arg));
        assert!(proc.regs.iter().all(|r| r.kind == RegKind::General));
        // Prologue/epilogue handles exist but stay unbound.
        assert_eq!(proc.resolve_label(proc.prologue), None);
        assert_eq!(proc.resolve_label(proc.epilogue), None);
    }

    #[test]
    fn test_registers_are_their_own_representative() {
        let arena = Bump::new();
        let mut module = Module::new(&arena);
        let proc = module.add_proc("p", 0);
        let a = proc.create_reg(RegKind::General);
        let b = proc.create_reg(RegKind::Flags);

        assert_eq!(proc.representative(a), a);
        assert_eq!(proc.representative(b), b);
        assert_eq!(proc.frame_offset(a), None);
    }

    #[test]
    fn test_arg_registers_precede_locals() {
        let arena = Bump::new();
        let mut module = Module::new(&arena);
        let proc = module.add_proc("p", 3);
        let local = proc.create_reg(RegKind::General);

        let args: Vec<Reg> = proc.args().collect();
        assert_eq!(args.len(), 3);
        assert!(args.iter().all(|r| proc.regs[r.index()].is_arg));
        assert!(!proc.regs[local.index()].is_arg);
        assert!(args.iter().all(|r| r.index() < local.index()));
    }
}
