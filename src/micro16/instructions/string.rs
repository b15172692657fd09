//! # String Instructions
//!
//! Sources are DS:SI, destinations ES:DI. After each element SI and/or DI step by the
//! element size, downwards when the Direction flag is set.
//!
//! ## Repeat Prefixes
//!
//! | Prefix | Repeats                  | Stops early when |
//! |--------|--------------------------|------------------|
//! | REP    | MOVS, STOS, LODS         | never            |
//! | REPZ   | CMPS                     | Z clear          |
//! | REPNZ  | CMPS                     | Z set            |
//!
//! The whole repetition runs inside one step, decrementing CX per element.

use crate::addressing::Operands;
use crate::alu::{self, Width};
use crate::micro16::opcodes::{Op, INSTRUCTION_TABLE, REPEAT_CYCLES};
use crate::micro16::{Micro16, Micro16Flags, AX, CX, DI, DS, ES, SI};
use crate::opcodes::find_by_opcode;
use crate::{ExecutionError, MemoryBus};

/// Moves an index register one element forwards or backwards.
fn advance<M: MemoryBus>(cpu: &mut Micro16<M>, reg: u8, size: u16) {
    let down = cpu.flags.contains(Micro16Flags::DIRECTION);
    let r = &mut cpu.r[reg as usize];
    *r = if down {
        r.wrapping_sub(size)
    } else {
        r.wrapping_add(size)
    };
}

pub(super) fn execute<M: MemoryBus>(
    cpu: &mut Micro16<M>,
    op: Op,
) -> Result<(), ExecutionError> {
    let si = cpu.r[SI as usize];
    let di = cpu.r[DI as usize];

    match op {
        Op::Movsb => {
            let byte = cpu.read_byte(DS, si)?;
            cpu.write_byte(ES, di, byte)?;
            advance(cpu, SI, 1);
            advance(cpu, DI, 1);
        }
        Op::Movsw => {
            let word = cpu.read_word(DS, si)?;
            cpu.write_word(ES, di, word)?;
            advance(cpu, SI, 2);
            advance(cpu, DI, 2);
        }
        Op::Cmpsb | Op::Cmpsw => {
            let size = if op == Op::Cmpsb { 1 } else { 2 };
            let (src, dst) = if size == 1 {
                (cpu.read_byte(DS, si)? as u32, cpu.read_byte(ES, di)? as u32)
            } else {
                (cpu.read_word(DS, si)? as u32, cpu.read_word(ES, di)? as u32)
            };
            // byte compares still produce word-width flags
            cpu.set_flags(&alu::sub(Width::Word, src, dst, false));
            advance(cpu, SI, size);
            advance(cpu, DI, size);
        }
        Op::Stosb => {
            cpu.write_byte(ES, di, cpu.r[AX as usize] as u8)?;
            advance(cpu, DI, 1);
        }
        Op::Stosw => {
            cpu.write_word(ES, di, cpu.r[AX as usize])?;
            advance(cpu, DI, 2);
        }
        Op::Lodsb => {
            let byte = cpu.read_byte(DS, si)?;
            cpu.r[AX as usize] = (cpu.r[AX as usize] & 0xFF00) | byte as u16;
            advance(cpu, SI, 1);
        }
        Op::Lodsw => {
            cpu.r[AX as usize] = cpu.read_word(DS, si)?;
            advance(cpu, SI, 2);
        }
        _ => unreachable!("{:?} is not a string primitive", op),
    }
    Ok(())
}

/// Runs a repeat prefix over the string primitive named by its operand byte.
///
/// # Returns
///
/// Cycles spent on the iterations, on top of the prefix's own cost.
pub(super) fn repeat<M: MemoryBus>(
    cpu: &mut Micro16<M>,
    prefix: Op,
    operands: Operands,
) -> Result<u32, ExecutionError> {
    let Operands::Prefix(opcode) = operands else {
        unreachable!("{:?} takes a prefix operand, got {:?}", prefix, operands);
    };
    if cpu.r[CX as usize] == 0 {
        return Ok(0);
    }
    let name = match prefix {
        Op::Repz => "REPZ",
        Op::Repnz => "REPNZ",
        _ => "REP",
    };

    let op = find_by_opcode(INSTRUCTION_TABLE, opcode)
        .map(|d| d.op)
        .filter(|op| {
            let compare = matches!(op, Op::Cmpsb | Op::Cmpsw);
            match prefix {
                Op::Rep => op.is_string() && !compare,
                _ => compare,
            }
        })
        .ok_or(ExecutionError::InvalidRepeat {
            prefix: name,
            opcode,
        })?;

    let mut cycles = 0;
    while cpu.r[CX as usize] != 0 {
        execute(cpu, op)?;
        cpu.r[CX as usize] -= 1;
        cycles += REPEAT_CYCLES;

        let z = cpu.flag_z();
        match prefix {
            Op::Repz if !z => break,
            Op::Repnz if z => break,
            _ => {}
        }
    }
    Ok(cycles)
}
