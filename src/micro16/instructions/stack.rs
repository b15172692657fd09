//! # Stack Instructions
//!
//! Every stack slot is a word in SS. PUSH pre-decrements SP by two; POP post-increments.

use crate::addressing::Operands;
use crate::micro16::opcodes::Op;
use crate::micro16::{Micro16, Micro16Flags, BP, SS};
use crate::{ExecutionError, MemoryBus};

pub(super) fn execute<M: MemoryBus>(
    cpu: &mut Micro16<M>,
    op: Op,
    operands: Operands,
) -> Result<(), ExecutionError> {
    match (op, operands) {
        (Op::Push, Operands::Register(reg)) => cpu.push(cpu.r[reg as usize])?,
        (Op::Pop, Operands::Register(reg)) => cpu.r[reg as usize] = cpu.pop()?,
        (Op::PushSeg, Operands::Segment(seg)) => cpu.push(cpu.seg[seg as usize])?,
        (Op::PopSeg, Operands::Segment(seg)) => cpu.seg[seg as usize] = cpu.pop()?,
        (Op::Pusha, _) => {
            for i in 0..8 {
                cpu.push(cpu.r[i])?;
            }
        }
        (Op::Popa, _) => {
            for i in (0..8).rev() {
                cpu.r[i] = cpu.pop()?;
            }
        }
        (Op::Pushf, _) => cpu.push(cpu.flags.bits())?,
        (Op::Popf, _) => cpu.flags = Micro16Flags::from_bits_retain(cpu.pop()?),
        (Op::Enter, Operands::Frame { size, level }) => enter(cpu, size, level)?,
        (Op::Leave, _) => {
            cpu.sp = cpu.r[BP as usize];
            cpu.r[BP as usize] = cpu.pop()?;
        }
        (Op::AddSp, Operands::Immediate(n)) => cpu.sp = cpu.sp.wrapping_add(n),
        (Op::SubSp, Operands::Immediate(n)) => cpu.sp = cpu.sp.wrapping_sub(n),
        (op, operands) => unreachable!("invalid operands for {:?}: {:?}", op, operands),
    }
    Ok(())
}

/// Builds a stack frame of `size` bytes, copying `level - 1` outer frame pointers.
fn enter<M: MemoryBus>(cpu: &mut Micro16<M>, size: u16, level: u8) -> Result<(), ExecutionError> {
    let bp = BP as usize;
    cpu.push(cpu.r[bp])?;
    let frame = cpu.sp;

    if level > 0 {
        for _ in 1..level {
            cpu.r[bp] = cpu.r[bp].wrapping_sub(2);
            let outer = cpu.read_word(SS, cpu.r[bp])?;
            cpu.push(outer)?;
        }
        cpu.push(frame)?;
    }

    cpu.r[bp] = frame;
    cpu.sp = cpu.sp.wrapping_sub(size);
    Ok(())
}
