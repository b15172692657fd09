//! # Micro8 Instruction Implementations
//!
//! Execute functions grouped by category. Each takes the CPU, the typed operation from
//! the descriptor table and the decoded operands; fetch, decode and cycle accounting are
//! done by the caller.
//!
//! ## Categories
//!
//! - **alu**: ADD ADC SUB SBC CMP, immediates, INC/DEC, logic, shifts, NEG, SWAP, 16-bit pairs
//! - **load_store**: LDI LD LDZ ST STZ, HL-indirect forms, LDI16, MOV, MOV16, IN, OUT
//! - **control**: jumps, CALL, RET, RETI
//! - **stack**: PUSH POP PUSH16 POP16 PUSHF POPF
//! - **flags**: EI DI SCF CCF CMF

mod alu;
mod control;
mod flags;
mod load_store;
mod stack;

use super::opcodes::Op;
use super::Micro8;
use crate::addressing::Operands;
use crate::{ExecutionError, MemoryBus};

pub(crate) fn execute<M: MemoryBus>(
    cpu: &mut Micro8<M>,
    op: Op,
    operands: Operands,
) -> Result<(), ExecutionError> {
    match op {
        Op::Nop => Ok(()),
        Op::Hlt => {
            cpu.halted = true;
            Ok(())
        }

        Op::Ldi
        | Op::Ld
        | Op::Ldz
        | Op::St
        | Op::Stz
        | Op::LdHl
        | Op::StHl
        | Op::LdHlDisp
        | Op::StHlDisp
        | Op::Ldi16(_)
        | Op::MovHlSp
        | Op::MovSpHl
        | Op::Mov
        | Op::In
        | Op::Out => load_store::execute(cpu, op, operands),

        Op::Add
        | Op::Adc
        | Op::Sub
        | Op::Sbc
        | Op::Cmp
        | Op::Addi
        | Op::Subi
        | Op::Cmpi
        | Op::Inc
        | Op::Dec
        | Op::And
        | Op::Or
        | Op::Xor
        | Op::Not
        | Op::Andi
        | Op::Ori
        | Op::Xori
        | Op::Neg
        | Op::Swap => {
            alu::execute(cpu, op, operands);
            Ok(())
        }

        Op::Shl | Op::Shr | Op::Sar | Op::Rol | Op::Ror => {
            alu::execute_shift(cpu, op, operands);
            Ok(())
        }

        Op::Inc16(_) | Op::Dec16(_) | Op::Add16(_) => {
            alu::execute_pair(cpu, op);
            Ok(())
        }

        Op::Jmp
        | Op::Jr
        | Op::Jump(_)
        | Op::JumpRelative(_)
        | Op::JpHl
        | Op::Call
        | Op::Ret
        | Op::Reti => control::execute(cpu, op, operands),

        Op::Push | Op::Pop | Op::Push16(_) | Op::Pop16(_) | Op::Pushf | Op::Popf => {
            stack::execute(cpu, op, operands)
        }

        Op::Ei | Op::Di | Op::Scf | Op::Ccf | Op::Cmf => {
            flags::execute(cpu, op);
            Ok(())
        }
    }
}
