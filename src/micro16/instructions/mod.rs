//! # Micro16 Instruction Execution
//!
//! Execute functions grouped by category:
//!
//! - **transfer**: register moves, loads and stores, LEA/LDS/LES, port I/O
//! - **alu**: add/subtract/compare, logic and TEST, NEG/INC/DEC
//! - **muldiv**: MUL/IMUL/DIV/IDIV
//! - **shifts**: shifts and rotates
//! - **stack**: PUSH/POP, PUSHA/POPA, PUSHF/POPF, ENTER/LEAVE, SP adjustment
//! - **control**: jumps, calls, returns, loops, INT/IRET
//! - **string**: string primitives and the repeat prefixes
//! - **system**: HLT, WAIT, LOCK and the flag instructions
//!
//! Each group returns the extra cycles the instruction consumed beyond its table cost;
//! only the repeat prefixes report any.

mod alu;
mod control;
mod muldiv;
mod shifts;
mod stack;
mod string;
mod system;
mod transfer;

use super::opcodes::Op;
use super::Micro16;
use crate::addressing::Operands;
use crate::{ExecutionError, MemoryBus};

pub(crate) fn execute<M: MemoryBus>(
    cpu: &mut Micro16<M>,
    op: Op,
    operands: Operands,
) -> Result<u32, ExecutionError> {
    match op {
        Op::Nop | Op::Hlt | Op::Wait | Op::Lock | Op::Cli | Op::Sti | Op::Clc | Op::Stc
        | Op::Cmc | Op::Cld | Op::Std => system::execute(cpu, op),

        Op::MovRr | Op::MovRi | Op::Xchg | Op::MovSegReg | Op::MovRegSeg | Op::MovRegSp
        | Op::MovSpReg | Op::Ld | Op::St | Op::Ldb | Op::Stb | Op::LdIdx | Op::StIdx
        | Op::Lea | Op::Lds | Op::Les | Op::LdSp | Op::StSp | Op::In | Op::Out | Op::Inb
        | Op::Outb => transfer::execute(cpu, op, operands)?,

        Op::AddRr | Op::AddRi | Op::AdcRr | Op::AdcRi | Op::SubRr | Op::SubRi | Op::SbcRr
        | Op::SbcRi | Op::CmpRr | Op::CmpRi | Op::Neg | Op::Inc | Op::Dec | Op::AndRr
        | Op::AndRi | Op::OrRr | Op::OrRi | Op::XorRr | Op::XorRi | Op::Not | Op::TestRr
        | Op::TestRi => alu::execute(cpu, op, operands),

        Op::Mul | Op::Imul | Op::Div | Op::Idiv => muldiv::execute(cpu, op, operands)?,

        Op::Shl | Op::Shr | Op::Sar | Op::Rol | Op::Ror | Op::Rcl | Op::Rcr => {
            shifts::execute(cpu, op, operands)
        }

        Op::Push | Op::Pop | Op::PushSeg | Op::PopSeg | Op::Pusha | Op::Popa | Op::Pushf
        | Op::Popf | Op::Enter | Op::Leave | Op::AddSp | Op::SubSp => {
            stack::execute(cpu, op, operands)?
        }

        Op::Int | Op::Iret | Op::Jmp | Op::JmpFar | Op::JmpReg | Op::Jr | Op::Jump(_)
        | Op::Call | Op::CallFar | Op::CallReg | Op::Ret | Op::Retf | Op::RetN | Op::Loop
        | Op::Loopz | Op::Loopnz => control::execute(cpu, op, operands)?,

        Op::Movsb | Op::Movsw | Op::Cmpsb | Op::Cmpsw | Op::Stosb | Op::Stosw | Op::Lodsb
        | Op::Lodsw => string::execute(cpu, op)?,

        Op::Rep | Op::Repz | Op::Repnz => return string::repeat(cpu, op, operands),
    }
    Ok(0)
}
