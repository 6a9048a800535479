// This module defines the instruction layer of the rastjit IR: the Opcode tag
// shared by every instruction, the structural InstrKind sum type covering the
// machine-independent kinds emitted by pipeline-part generators and the
// ARM-specialized kinds produced by addressing-mode consolidation, and the
// Operand2/AddrOffset payloads that model ARM's flexible second operand and
// word load/store addressing. Retyping an instruction during consolidation
// constructs a new InstrKind value in place; the opcode, owning block and
// used flag are carried over unchanged. The module also hosts the rotated
// 8-bit immediate predicate that gates constant folding, and Display impls
// that print a compact assembler-like dump for logs and tests.

//! Instructions of the rastjit IR.
//!
//! An [`Instr`] couples an orthogonal [`Opcode`] tag with a structural
//! [`InstrKind`]. Generic kinds are what the pipeline-part generators emit;
//! the `*Op2` / `*Idx` kinds exist only after addressing-mode consolidation
//! has folded producers into ARM operand encodings.

use crate::ir::module::{BlockId, Label, Reg};
use std::fmt;

/// Operation tag, orthogonal to the structural instruction kind.
///
/// Covers ALU operations, compare flavors, memory access, branches (with the
/// condition encoded in the opcode) and the structural pseudo-ops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    Mov,
    Mvn,
    Add,
    Sub,
    Rsb,
    Mul,
    And,
    Orr,
    Eor,
    Bic,
    Lsl,
    Lsr,
    Asr,
    Ror,
    Cmp,
    Cmn,
    Tst,
    Teq,
    Ldr,
    Str,
    B,
    Beq,
    Bne,
    Blt,
    Ble,
    Bgt,
    Bge,
    Call,
    Ret,
    Phi,
}

impl Opcode {
    /// Shift and rotate opcodes; their second operand is a shift amount, not
    /// a full-width value.
    pub fn is_shift(self) -> bool {
        matches!(self, Opcode::Lsl | Opcode::Lsr | Opcode::Asr | Opcode::Ror)
    }

    /// Opcodes valid for a unary (move-form) instruction.
    pub fn is_unary(self) -> bool {
        matches!(self, Opcode::Mov | Opcode::Mvn)
    }

    /// Opcodes valid for a binary ALU instruction.
    pub fn is_binary(self) -> bool {
        matches!(
            self,
            Opcode::Add
                | Opcode::Sub
                | Opcode::Rsb
                | Opcode::Mul
                | Opcode::And
                | Opcode::Orr
                | Opcode::Eor
                | Opcode::Bic
                | Opcode::Lsl
                | Opcode::Lsr
                | Opcode::Asr
                | Opcode::Ror
        )
    }

    /// Flag-producing compare opcodes.
    pub fn is_compare(self) -> bool {
        matches!(self, Opcode::Cmp | Opcode::Cmn | Opcode::Tst | Opcode::Teq)
    }

    /// Conditional branch opcodes.
    pub fn is_cond_branch(self) -> bool {
        matches!(
            self,
            Opcode::Beq | Opcode::Bne | Opcode::Blt | Opcode::Ble | Opcode::Bgt | Opcode::Bge
        )
    }

    pub fn mnemonic(self) -> &'static str {
        match self {
            Opcode::Mov => "mov",
            Opcode::Mvn => "mvn",
            Opcode::Add => "add",
            Opcode::Sub => "sub",
            Opcode::Rsb => "rsb",
            Opcode::Mul => "mul",
            Opcode::And => "and",
            Opcode::Orr => "orr",
            Opcode::Eor => "eor",
            Opcode::Bic => "bic",
            Opcode::Lsl => "lsl",
            Opcode::Lsr => "lsr",
            Opcode::Asr => "asr",
            Opcode::Ror => "ror",
            Opcode::Cmp => "cmp",
            Opcode::Cmn => "cmn",
            Opcode::Tst => "tst",
            Opcode::Teq => "teq",
            Opcode::Ldr => "ldr",
            Opcode::Str => "str",
            Opcode::B => "b",
            Opcode::Beq => "beq",
            Opcode::Bne => "bne",
            Opcode::Blt => "blt",
            Opcode::Ble => "ble",
            Opcode::Bgt => "bgt",
            Opcode::Bge => "bge",
            Opcode::Call => "call",
            Opcode::Ret => "ret",
            Opcode::Phi => "phi",
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

/// Shift applied inside an ARM flexible second operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShiftKind {
    Lsl,
    Lsr,
    Asr,
    Ror,
}

impl ShiftKind {
    /// The shift kind corresponding to a shift opcode, if any.
    pub fn from_opcode(op: Opcode) -> Option<ShiftKind> {
        match op {
            Opcode::Lsl => Some(ShiftKind::Lsl),
            Opcode::Lsr => Some(ShiftKind::Lsr),
            Opcode::Asr => Some(ShiftKind::Asr),
            Opcode::Ror => Some(ShiftKind::Ror),
            _ => None,
        }
    }

    pub fn mnemonic(self) -> &'static str {
        match self {
            ShiftKind::Lsl => "lsl",
            ShiftKind::Lsr => "lsr",
            ShiftKind::Asr => "asr",
            ShiftKind::Ror => "ror",
        }
    }
}

impl fmt::Display for ShiftKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

/// ARM flexible second operand of a data-processing instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand2 {
    /// Rotated 8-bit immediate; must satisfy [`encodes_arm_immediate`].
    Imm(u32),
    /// Register shifted by another register.
    ShiftReg { base: Reg, shift: ShiftKind, amount: Reg },
    /// Register shifted by a constant amount (0..=31).
    ShiftImm { base: Reg, shift: ShiftKind, amount: u8 },
}

impl fmt::Display for Operand2 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand2::Imm(v) => write!(f, "#{v}"),
            Operand2::ShiftReg { base, shift, amount } => write!(f, "{base}, {shift} {amount}"),
            Operand2::ShiftImm { base, shift, amount } => write!(f, "{base}, {shift} #{amount}"),
        }
    }
}

/// Offset part of a word load/store address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddrOffset {
    /// Register offset: `[base, offset]`.
    Reg(Reg),
    /// Immediate offset in the native range `0..=255`.
    Imm(u32),
}

/// Largest immediate offset a specialized word load/store can carry.
pub const MAX_LDST_OFFSET: u32 = 255;

impl fmt::Display for AddrOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AddrOffset::Reg(r) => write!(f, "{r}"),
            AddrOffset::Imm(v) => write!(f, "#{v}"),
        }
    }
}

/// Whether a constant can be encoded as an ARM data-processing immediate:
/// an 8-bit value rotated right by an even amount.
pub fn encodes_arm_immediate(value: u32) -> bool {
    (0..16).any(|rot| value.rotate_left(rot * 2) & !0xff == 0)
}

/// Structural instruction kind.
///
/// The generic kinds are the construction-API surface; the ARM-specialized
/// kinds are introduced by addressing-mode consolidation only. Phi source and
/// call argument lists live in the compile unit's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstrKind<'a> {
    Unary { dst: Reg, src: Reg },
    Binary { dst: Reg, lhs: Reg, rhs: Reg, flags: Option<Reg> },
    Compare { flags: Reg, lhs: Reg, rhs: Reg },
    Load { dst: Reg, addr: Reg },
    Store { src: Reg, addr: Reg },
    LoadImm { dst: Reg, value: i32 },
    Branch { target: Label },
    BranchCond { flags: Reg, target: Label },
    Phi { dst: Reg, srcs: &'a [Reg] },
    Call { dst: Option<Reg>, callee: u32, args: &'a [Reg] },
    Ret { value: Option<Reg> },
    // ARM-specialized kinds, produced by addressing-mode consolidation.
    UnaryOp2 { dst: Reg, src: Operand2 },
    BinaryOp2 { dst: Reg, lhs: Reg, rhs: Operand2, flags: Option<Reg> },
    CompareOp2 { flags: Reg, lhs: Reg, rhs: Operand2 },
    LoadIdx { dst: Reg, base: Reg, offset: AddrOffset },
    StoreIdx { src: Reg, base: Reg, offset: AddrOffset },
}

impl InstrKind<'_> {
    /// Kinds that are inherently side-effecting and therefore root the
    /// dead-code marking phase.
    pub fn has_side_effect(&self) -> bool {
        matches!(
            self,
            InstrKind::Store { .. }
                | InstrKind::StoreIdx { .. }
                | InstrKind::Call { .. }
                | InstrKind::Ret { .. }
                | InstrKind::Branch { .. }
                | InstrKind::BranchCond { .. }
        )
    }
}

/// One instruction of a block.
///
/// The `used` flag is the dead-code marker; it is meaningless outside the
/// elimination pass. `block` is a back-reference to the owning block.
#[derive(Debug, Clone)]
pub struct Instr<'a> {
    pub op: Opcode,
    pub kind: InstrKind<'a>,
    pub block: BlockId,
    pub used: bool,
}

impl fmt::Display for Instr<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = self.op;
        match &self.kind {
            InstrKind::Unary { dst, src } => write!(f, "{op} {dst}, {src}"),
            InstrKind::Binary { dst, lhs, rhs, flags } => {
                let s = if flags.is_some() { "s" } else { "" };
                write!(f, "{op}{s} {dst}, {lhs}, {rhs}")
            }
            InstrKind::Compare { lhs, rhs, .. } => write!(f, "{op} {lhs}, {rhs}"),
            InstrKind::Load { dst, addr } => write!(f, "{op} {dst}, [{addr}]"),
            InstrKind::Store { src, addr } => write!(f, "{op} {src}, [{addr}]"),
            InstrKind::LoadImm { dst, value } => write!(f, "{op} {dst}, #{value}"),
            InstrKind::Branch { target } => write!(f, "{op} {target}"),
            InstrKind::BranchCond { flags, target } => write!(f, "{op} {flags}, {target}"),
            InstrKind::Phi { dst, srcs } => {
                write!(f, "{op} {dst}")?;
                for s in *srcs {
                    write!(f, ", {s}")?;
                }
                Ok(())
            }
            InstrKind::Call { dst, callee, args } => {
                match dst {
                    Some(d) => write!(f, "{op} {d}, @{callee}")?,
                    None => write!(f, "{op} @{callee}")?,
                }
                for a in *args {
                    write!(f, ", {a}")?;
                }
                Ok(())
            }
            InstrKind::Ret { value } => match value {
                Some(v) => write!(f, "{op} {v}"),
                None => write!(f, "{op}"),
            },
            InstrKind::UnaryOp2 { dst, src } => write!(f, "{op} {dst}, {src}"),
            InstrKind::BinaryOp2 { dst, lhs, rhs, flags } => {
                let s = if flags.is_some() { "s" } else { "" };
                write!(f, "{op}{s} {dst}, {lhs}, {rhs}")
            }
            InstrKind::CompareOp2 { lhs, rhs, .. } => write!(f, "{op} {lhs}, {rhs}"),
            InstrKind::LoadIdx { dst, base, offset } => write!(f, "{op} {dst}, [{base}, {offset}]"),
            InstrKind::StoreIdx { src, base, offset } => write!(f, "{op} {src}, [{base}, {offset}]"),
        }
    }
}
