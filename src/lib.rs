//! rastjit - runtime ARM specialization of rasterizer pipeline stages.
//!
//! rastjit is the code-generation backend of a software 3D-graphics
//! implementation. Pipeline-part generators (vertex fetch, span
//! interpolation, fragment blending) build a machine-independent instruction
//! stream through the construction API; the fixed pass pipeline lowers it to
//! ARM-specialized instructions with liveness sets and frame offsets
//! attached, ready for the physical register allocator and encoder.
//!
//! # Primary Usage
//!
//! ```
//! use rastjit::ir::{Module, Opcode, RegKind};
//! use rastjit::passes;
//! use bumpalo::Bump;
//!
//! // One arena per compile unit; every IR node lives until it is dropped.
//! let arena = Bump::new();
//! let mut module = Module::new(&arena);
//!
//! let proc = module.add_proc("span_fill", 2);
//! let block = proc.create_block();
//! let args: Vec<_> = proc.args().collect();
//! let stride = proc.create_reg(RegKind::General);
//! let addr = proc.create_reg(RegKind::General);
//! proc.emit_load_imm(block, stride, 4);
//! proc.emit_binary(block, Opcode::Add, addr, args[0], stride);
//! proc.emit_store(block, args[1], addr);
//! proc.emit_ret(block, None);
//!
//! let stats = passes::run(&mut module).expect("compile aborted");
//! assert_eq!(stats.instrs_folded, 2);
//! ```
//!
//! # Architecture
//!
//! - [`ir`] - module/procedure/block/instruction containers, virtual
//!   registers, and the construction API
//! - [`passes`] - the fixed lowering pipeline (def/use analysis, addressing-
//!   mode consolidation, dead-code elimination, register unification, frame
//!   allocation, control flow + liveness)
//! - [`error`] - compile-abort errors

pub mod error;
pub mod ir;
pub mod passes;

// Re-export the common surface.
pub use error::{CompileError, CompileResult};
pub use ir::{
    AddrOffset, Block, BlockId, Instr, InstrId, InstrKind, Label, Module, Opcode, Operand2,
    Procedure, Reg, RegKind, ShiftKind, VirtualReg,
};
pub use passes::PassStats;
