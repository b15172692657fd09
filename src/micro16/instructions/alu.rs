//! # Arithmetic and Logic Instructions
//!
//! Register-register forms take `dst, src`; register-immediate forms take the register
//! and a 16-bit immediate. CMP and TEST compute flags without storing.
//!
//! Flag effects:
//! - ADD/ADC/SUB/SBC/CMP/NEG: Z S C O P
//! - AND/OR/XOR/NOT/TEST: Z S P, C and O cleared
//! - INC/DEC: Z S O, Carry preserved

use crate::addressing::Operands;
use crate::alu::{self, Width};
use crate::micro16::opcodes::Op;
use crate::micro16::Micro16;
use crate::MemoryBus;

/// Splits register-register and register-immediate operands into (dst, source value).
fn operand_pair<M: MemoryBus>(cpu: &Micro16<M>, operands: Operands) -> Option<(u8, u32)> {
    match operands {
        Operands::RegisterPair { dst, src } => Some((dst, cpu.r[src as usize] as u32)),
        Operands::RegisterImmediate { reg, imm } => Some((reg, imm as u32)),
        _ => None,
    }
}

pub(super) fn execute<M: MemoryBus>(cpu: &mut Micro16<M>, op: Op, operands: Operands) {
    // ========== Single-Register Forms ==========
    if let Operands::Register(reg) = operands {
        let value = cpu.r[reg as usize] as u32;
        let result = match op {
            Op::Neg => alu::sub(Width::Word, 0, value, false),
            Op::Inc => alu::inc(Width::Word, value),
            Op::Dec => alu::dec(Width::Word, value),
            Op::Not => alu::logic(Width::Word, !value),
            _ => unreachable!("{:?} takes two operands", op),
        };
        cpu.apply(reg, result);
        return;
    }

    let Some((dst, b)) = operand_pair(cpu, operands) else {
        unreachable!("invalid operands for {:?}: {:?}", op, operands);
    };
    let a = cpu.r[dst as usize] as u32;
    let carry = cpu.flag_c();

    let result = match op {
        Op::AddRr | Op::AddRi => alu::add(Width::Word, a, b, false),
        Op::AdcRr | Op::AdcRi => alu::add(Width::Word, a, b, carry),
        Op::SubRr | Op::SubRi => alu::sub(Width::Word, a, b, false),
        Op::SbcRr | Op::SbcRi => alu::sub(Width::Word, a, b, carry),
        Op::AndRr | Op::AndRi => alu::logic(Width::Word, a & b),
        Op::OrRr | Op::OrRi => alu::logic(Width::Word, a | b),
        Op::XorRr | Op::XorRi => alu::logic(Width::Word, a ^ b),
        Op::CmpRr | Op::CmpRi => {
            cpu.set_flags(&alu::sub(Width::Word, a, b, false));
            return;
        }
        Op::TestRr | Op::TestRi => {
            cpu.set_flags(&alu::logic(Width::Word, a & b));
            return;
        }
        _ => unreachable!("{:?} is not an arithmetic or logic op", op),
    };
    cpu.apply(dst, result);
}
