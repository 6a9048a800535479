// This module decides the only physical layout settled in this backend:
// frame displacements for every virtual register. Arguments occupy the
// incoming-argument area at sequential word offsets from the frame base;
// everything else shares spill slots through its union-find representative,
// so phi-coalesced registers land in one slot. Spill slots start past the
// callee-save area and grow away from the frame base one word at a time,
// which keeps every spill displacement strictly above every argument
// displacement. The physical register allocator downstream consults these
// offsets when it needs to spill.

//! Frame slot assignment.

use crate::ir::Procedure;

/// Bytes reserved at the frame base for callee-saved registers (r4-r11 + lr).
pub const SAVE_AREA_BYTES: i32 = 36;

/// Word size of the target.
pub const WORD_BYTES: i32 = 4;

/// Assign frame displacements to every register of a procedure, in
/// definition order. Returns the number of spill slots created.
///
/// Requires a flattened union-find forest (see [`super::coalesce::unify`]);
/// sets the procedure's local-storage byte size.
pub fn allocate(proc: &mut Procedure<'_>) -> usize {
    let num_args = proc.num_args as usize;

    // Incoming-argument area.
    for i in 0..num_args {
        debug_assert!(proc.regs[i].is_arg);
        let offset = i as i32 * WORD_BYTES;
        proc.regs[i].frame_offset = Some(offset);
        let root = proc.regs[i].repr;
        if proc.regs[root.index()].frame_offset.is_none() {
            proc.regs[root.index()].frame_offset = Some(offset);
        }
    }

    // Spill slots, shared per representative.
    let arg_area = num_args as i32 * WORD_BYTES;
    let spill_base = SAVE_AREA_BYTES.max(arg_area);
    let mut next = spill_base;
    let mut slots = 0;
    for i in num_args..proc.regs.len() {
        let root = proc.regs[i].repr;
        let offset = match proc.regs[root.index()].frame_offset {
            Some(offset) => offset,
            None => {
                next += WORD_BYTES;
                slots += 1;
                proc.regs[root.index()].frame_offset = Some(next);
                next
            }
        };
        proc.regs[i].frame_offset = Some(offset);
    }

    proc.frame_size = (next - spill_base) as u32;
    log::debug!("{}: {} spill slots, {} bytes of locals", proc.name, slots, proc.frame_size);
    slots
}
