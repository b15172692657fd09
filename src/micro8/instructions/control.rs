//! # Control Flow Instructions
//!
//! Relative jumps are taken from the address after the instruction.

use crate::addressing::Operands;
use crate::micro8::opcodes::Op;
use crate::micro8::{Micro8, Micro8Flags};
use crate::{ExecutionError, MemoryBus};

pub(super) fn execute<M: MemoryBus>(
    cpu: &mut Micro8<M>,
    op: Op,
    operands: Operands,
) -> Result<(), ExecutionError> {
    match (op, operands) {
        (Op::Jmp, Operands::Address(target)) => cpu.pc = target,
        (Op::Jump(cond), Operands::Address(target)) => {
            if cpu.condition(cond) {
                cpu.pc = target;
            }
        }
        (Op::Jr, Operands::Relative(offset)) => jump_relative(cpu, offset),
        (Op::JumpRelative(cond), Operands::Relative(offset)) => {
            if cpu.condition(cond) {
                jump_relative(cpu, offset);
            }
        }
        (Op::JpHl, _) => cpu.pc = cpu.hl(),
        (Op::Call, Operands::Address(target)) => {
            cpu.push_word(cpu.pc)?;
            cpu.pc = target;
        }
        (Op::Ret, _) => cpu.pc = cpu.pop_word()?,
        (Op::Reti, _) => {
            cpu.flags = Micro8Flags::from_bits_retain(cpu.pop_byte()?);
            cpu.pc = cpu.pop_word()?;
            cpu.ie = true;
        }
        (op, operands) => unreachable!("invalid operands for {:?}: {:?}", op, operands),
    }
    Ok(())
}

fn jump_relative<M: MemoryBus>(cpu: &mut Micro8<M>, offset: i8) {
    cpu.pc = cpu.pc.wrapping_add(offset as i16 as u16);
}
