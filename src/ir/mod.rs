//! The rastjit intermediate representation.
//!
//! Module → procedures → blocks → instructions, plus virtual registers and
//! forward-declarable block labels. [`build`] is the construction surface the
//! pipeline-part generators emit through; [`instr`] defines the instruction
//! kinds, both generic and ARM-specialized; [`module`] holds the containers
//! and handle types.

pub mod build;
pub mod instr;
pub mod module;

pub use instr::{
    encodes_arm_immediate, AddrOffset, Instr, InstrKind, Opcode, Operand2, ShiftKind,
    MAX_LDST_OFFSET,
};
pub use module::{Block, BlockId, InstrId, Label, Module, Procedure, Reg, RegKind, VirtualReg};
