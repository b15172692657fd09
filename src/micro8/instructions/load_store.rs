//! # Load, Store and Transfer Instructions
//!
//! None of these touch the flags.

use crate::addressing::Operands;
use crate::micro8::opcodes::{Op, Pair};
use crate::micro8::Micro8;
use crate::{ExecutionError, MemoryBus};

pub(super) fn execute<M: MemoryBus>(
    cpu: &mut Micro8<M>,
    op: Op,
    operands: Operands,
) -> Result<(), ExecutionError> {
    match (op, operands) {
        (Op::Ldi, Operands::RegisterImmediate { reg, imm }) => cpu.r[reg as usize] = imm as u8,
        (Op::Ld | Op::Ldz, Operands::RegisterAddress { reg, address }) => {
            cpu.r[reg as usize] = cpu.read(address)?;
        }
        (Op::St | Op::Stz, Operands::RegisterAddress { reg, address }) => {
            cpu.write(address, cpu.r[reg as usize])?;
        }
        (Op::LdHl, Operands::Register(reg)) => {
            cpu.r[reg as usize] = cpu.read(cpu.hl())?;
        }
        (Op::StHl, Operands::Register(reg)) => {
            cpu.write(cpu.hl(), cpu.r[reg as usize])?;
        }
        (Op::LdHlDisp, Operands::RegisterDisplacement { reg, disp }) => {
            let addr = cpu.hl().wrapping_add(disp as u16);
            cpu.r[reg as usize] = cpu.read(addr)?;
        }
        (Op::StHlDisp, Operands::RegisterDisplacement { reg, disp }) => {
            let addr = cpu.hl().wrapping_add(disp as u16);
            cpu.write(addr, cpu.r[reg as usize])?;
        }
        (Op::Ldi16(pair), Operands::Immediate(value)) => cpu.set_pair(pair, value),
        (Op::MovHlSp, _) => cpu.set_pair(Pair::Hl, cpu.sp),
        (Op::MovSpHl, _) => cpu.sp = cpu.hl(),
        (Op::Mov, Operands::RegisterPair { dst, src }) => {
            cpu.r[dst as usize] = cpu.r[src as usize];
        }
        (Op::In, Operands::Port { reg, port }) => {
            cpu.r[reg as usize] = cpu.port(port as u8);
        }
        (Op::Out, Operands::Port { reg, port }) => {
            let value = cpu.r[reg as usize];
            cpu.set_port(port as u8, value);
        }
        (op, operands) => unreachable!("invalid operands for {:?}: {:?}", op, operands),
    }
    Ok(())
}
