//! Construction API for the rastjit IR.
//!
//! This is the only way IR is built. Pipeline-part generators call these
//! operations strictly in program order per block; every `emit_*` appends to
//! the tail of the target block's instruction list and returns a stable
//! [`InstrId`]. Register-kind mismatches are programmer errors in the
//! generator, not runtime conditions, and fail the precondition `assert!`s
//! here. No side effects beyond arena allocation and list linkage.

use crate::ir::instr::{
    encodes_arm_immediate, AddrOffset, Instr, InstrKind, Opcode, Operand2, MAX_LDST_OFFSET,
};
use crate::ir::module::{Block, BlockId, InstrId, Label, Procedure, Reg, RegKind, VirtualReg};

impl<'arena> Procedure<'arena> {
    /// Declare a label that can be branched to before its block exists.
    pub fn declare_label(&mut self) -> Label {
        let label = Label(self.labels.len() as u32);
        self.labels.push(None);
        label
    }

    /// Create a block at the end of the program order, bound to a fresh label.
    pub fn create_block(&mut self) -> BlockId {
        let label = self.declare_label();
        self.create_block_at(label)
    }

    /// Create a block at the end of the program order and bind `label` to it.
    pub fn create_block_at(&mut self, label: Label) -> BlockId {
        assert!(
            self.labels[label.index()].is_none(),
            "label {label} is already bound to a block"
        );
        let id = BlockId(self.blocks.len() as u32);
        self.labels[label.index()] = Some(id);
        self.blocks.push(Block::new(label));
        id
    }

    /// Create a fresh virtual register of the given kind.
    pub fn create_reg(&mut self, kind: RegKind) -> Reg {
        let r = Reg(self.regs.len() as u32);
        self.regs.push(VirtualReg {
            kind,
            repr: r,
            def: None,
            uses: Vec::new(),
            frame_offset: None,
            is_arg: false,
        });
        r
    }

    fn expect_kind(&self, r: Reg, kind: RegKind, role: &str) {
        assert!(
            self.regs[r.index()].kind == kind,
            "{role} operand {r} must be a {kind:?} register"
        );
    }

    fn append(&mut self, block: BlockId, op: Opcode, kind: InstrKind<'arena>) -> InstrId {
        let id = InstrId(self.instrs.len() as u32);
        self.instrs.push(Instr { op, kind, block, used: false });
        self.blocks[block.index()].instrs.push(id);
        id
    }

    /// `mov`/`mvn` between general registers.
    pub fn emit_unary(&mut self, block: BlockId, op: Opcode, dst: Reg, src: Reg) -> InstrId {
        assert!(op.is_unary(), "{op} is not a unary opcode");
        self.expect_kind(dst, RegKind::General, "destination");
        self.expect_kind(src, RegKind::General, "source");
        self.append(block, op, InstrKind::Unary { dst, src })
    }

    /// Binary ALU operation.
    pub fn emit_binary(&mut self, block: BlockId, op: Opcode, dst: Reg, lhs: Reg, rhs: Reg) -> InstrId {
        assert!(op.is_binary(), "{op} is not a binary opcode");
        self.expect_kind(dst, RegKind::General, "destination");
        self.expect_kind(lhs, RegKind::General, "left");
        self.expect_kind(rhs, RegKind::General, "right");
        self.append(block, op, InstrKind::Binary { dst, lhs, rhs, flags: None })
    }

    /// Binary ALU operation that additionally defines a flags register.
    pub fn emit_binary_flags(
        &mut self,
        block: BlockId,
        op: Opcode,
        dst: Reg,
        flags: Reg,
        lhs: Reg,
        rhs: Reg,
    ) -> InstrId {
        assert!(op.is_binary(), "{op} is not a binary opcode");
        self.expect_kind(dst, RegKind::General, "destination");
        self.expect_kind(flags, RegKind::Flags, "flags");
        self.expect_kind(lhs, RegKind::General, "left");
        self.expect_kind(rhs, RegKind::General, "right");
        self.append(block, op, InstrKind::Binary { dst, lhs, rhs, flags: Some(flags) })
    }

    /// Compare producing a flags register.
    pub fn emit_compare(&mut self, block: BlockId, op: Opcode, flags: Reg, lhs: Reg, rhs: Reg) -> InstrId {
        assert!(op.is_compare(), "{op} is not a compare opcode");
        self.expect_kind(flags, RegKind::Flags, "flags");
        self.expect_kind(lhs, RegKind::General, "left");
        self.expect_kind(rhs, RegKind::General, "right");
        self.append(block, op, InstrKind::Compare { flags, lhs, rhs })
    }

    /// Word load from the address in `addr`.
    pub fn emit_load(&mut self, block: BlockId, dst: Reg, addr: Reg) -> InstrId {
        self.expect_kind(dst, RegKind::General, "destination");
        self.expect_kind(addr, RegKind::General, "address");
        self.append(block, Opcode::Ldr, InstrKind::Load { dst, addr })
    }

    /// Word store to the address in `addr`.
    pub fn emit_store(&mut self, block: BlockId, src: Reg, addr: Reg) -> InstrId {
        self.expect_kind(src, RegKind::General, "source");
        self.expect_kind(addr, RegKind::General, "address");
        self.append(block, Opcode::Str, InstrKind::Store { src, addr })
    }

    /// Materialize a constant.
    pub fn emit_load_imm(&mut self, block: BlockId, dst: Reg, value: i32) -> InstrId {
        self.expect_kind(dst, RegKind::General, "destination");
        self.append(block, Opcode::Mov, InstrKind::LoadImm { dst, value })
    }

    /// Unconditional branch to `target`.
    pub fn emit_branch(&mut self, block: BlockId, target: Label) -> InstrId {
        self.append(block, Opcode::B, InstrKind::Branch { target })
    }

    /// Conditional branch on a flags register.
    pub fn emit_branch_cond(&mut self, block: BlockId, op: Opcode, flags: Reg, target: Label) -> InstrId {
        assert!(op.is_cond_branch(), "{op} is not a conditional branch opcode");
        self.expect_kind(flags, RegKind::Flags, "flags");
        self.append(block, op, InstrKind::BranchCond { flags, target })
    }

    /// Phi merging `srcs` from the block's predecessors into `dst`.
    ///
    /// The source count is not validated against the predecessor count.
    pub fn emit_phi(&mut self, block: BlockId, dst: Reg, srcs: &[Reg]) -> InstrId {
        self.expect_kind(dst, RegKind::General, "destination");
        for &s in srcs {
            self.expect_kind(s, RegKind::General, "phi source");
        }
        let srcs = self.arena.alloc_slice_copy(srcs);
        self.append(block, Opcode::Phi, InstrKind::Phi { dst, srcs })
    }

    /// Call of the runtime helper `callee` (an index the encoder resolves).
    pub fn emit_call(&mut self, block: BlockId, dst: Option<Reg>, callee: u32, args: &[Reg]) -> InstrId {
        if let Some(d) = dst {
            self.expect_kind(d, RegKind::General, "destination");
        }
        for &a in args {
            self.expect_kind(a, RegKind::General, "argument");
        }
        let args = self.arena.alloc_slice_copy(args);
        self.append(block, Opcode::Call, InstrKind::Call { dst, callee, args })
    }

    /// Return, optionally carrying a value.
    pub fn emit_ret(&mut self, block: BlockId, value: Option<Reg>) -> InstrId {
        if let Some(v) = value {
            self.expect_kind(v, RegKind::General, "return value");
        }
        self.append(block, Opcode::Ret, InstrKind::Ret { value })
    }

    fn expect_operand2(&self, op: Opcode, rhs: Operand2) {
        match rhs {
            Operand2::Imm(v) if op.is_shift() => {
                assert!(v < 32, "shift amount #{v} does not fit in five bits");
            }
            Operand2::Imm(v) => {
                assert!(encodes_arm_immediate(v), "#{v} is not a rotated 8-bit immediate");
            }
            Operand2::ShiftReg { base, amount, .. } => {
                self.expect_kind(base, RegKind::General, "shifted");
                self.expect_kind(amount, RegKind::General, "shift amount");
            }
            Operand2::ShiftImm { base, amount, .. } => {
                self.expect_kind(base, RegKind::General, "shifted");
                assert!(amount < 32, "shift amount #{amount} does not fit in five bits");
            }
        }
    }

    fn expect_offset(&self, offset: AddrOffset) {
        match offset {
            AddrOffset::Reg(r) => self.expect_kind(r, RegKind::General, "offset"),
            AddrOffset::Imm(v) => {
                assert!(v <= MAX_LDST_OFFSET, "#{v} exceeds the native load/store offset range");
            }
        }
    }

    /// `mov`/`mvn` with a flexible second operand. Normally introduced by
    /// addressing-mode consolidation; exposed for pre-specialized emission.
    pub fn emit_unary_op2(&mut self, block: BlockId, op: Opcode, dst: Reg, src: Operand2) -> InstrId {
        assert!(op.is_unary(), "{op} is not a unary opcode");
        self.expect_kind(dst, RegKind::General, "destination");
        self.expect_operand2(op, src);
        self.append(block, op, InstrKind::UnaryOp2 { dst, src })
    }

    /// Binary ALU operation with a flexible second operand.
    pub fn emit_binary_op2(
        &mut self,
        block: BlockId,
        op: Opcode,
        dst: Reg,
        lhs: Reg,
        rhs: Operand2,
    ) -> InstrId {
        assert!(op.is_binary(), "{op} is not a binary opcode");
        self.expect_kind(dst, RegKind::General, "destination");
        self.expect_kind(lhs, RegKind::General, "left");
        self.expect_operand2(op, rhs);
        self.append(block, op, InstrKind::BinaryOp2 { dst, lhs, rhs, flags: None })
    }

    /// Compare against a flexible second operand.
    pub fn emit_compare_op2(
        &mut self,
        block: BlockId,
        op: Opcode,
        flags: Reg,
        lhs: Reg,
        rhs: Operand2,
    ) -> InstrId {
        assert!(op.is_compare(), "{op} is not a compare opcode");
        self.expect_kind(flags, RegKind::Flags, "flags");
        self.expect_kind(lhs, RegKind::General, "left");
        self.expect_operand2(op, rhs);
        self.append(block, op, InstrKind::CompareOp2 { flags, lhs, rhs })
    }

    /// Word load with register- or immediate-offset addressing.
    pub fn emit_load_idx(&mut self, block: BlockId, dst: Reg, base: Reg, offset: AddrOffset) -> InstrId {
        self.expect_kind(dst, RegKind::General, "destination");
        self.expect_kind(base, RegKind::General, "base");
        self.expect_offset(offset);
        self.append(block, Opcode::Ldr, InstrKind::LoadIdx { dst, base, offset })
    }

    /// Word store with register- or immediate-offset addressing.
    pub fn emit_store_idx(&mut self, block: BlockId, src: Reg, base: Reg, offset: AddrOffset) -> InstrId {
        self.expect_kind(src, RegKind::General, "source");
        self.expect_kind(base, RegKind::General, "base");
        self.expect_offset(offset);
        self.append(block, Opcode::Str, InstrKind::StoreIdx { src, base, offset })
    }
}
