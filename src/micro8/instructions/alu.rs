//! # Arithmetic and Logic Instructions
//!
//! Register-register forms use R0 as the destination and the packed register as the
//! source. Immediate forms and INC/DEC/NOT operate on the packed register.

use crate::addressing::Operands;
use crate::alu::{self, AluResult, Width};
use crate::micro8::opcodes::{Op, Pair};
use crate::micro8::{Micro8, Micro8Flags};
use crate::MemoryBus;

const W: Width = Width::Byte;

pub(super) fn execute<M: MemoryBus>(cpu: &mut Micro8<M>, op: Op, operands: Operands) {
    let (reg, imm) = match operands {
        Operands::Register(r) => (r, 0),
        Operands::RegisterImmediate { reg, imm } => (reg, imm as u32),
        _ => unreachable!("invalid operands for {:?}: {:?}", op, operands),
    };
    let carry = cpu.flag_c();
    let r0 = cpu.r[0] as u32;
    let rv = cpu.r[reg as usize] as u32;

    match op {
        Op::Add => cpu.apply(0, alu::add(W, r0, rv, false)),
        Op::Adc => cpu.apply(0, alu::add(W, r0, rv, carry)),
        Op::Sub => cpu.apply(0, alu::sub(W, r0, rv, false)),
        Op::Sbc => cpu.apply(0, alu::sub(W, r0, rv, carry)),
        Op::Cmp => cpu.set_flags(&alu::sub(W, r0, rv, false)),
        Op::And => cpu.apply(0, alu::logic(W, r0 & rv)),
        Op::Or => cpu.apply(0, alu::logic(W, r0 | rv)),
        Op::Xor => cpu.apply(0, alu::logic(W, r0 ^ rv)),

        Op::Addi => cpu.apply(reg, alu::add(W, rv, imm, false)),
        Op::Subi => cpu.apply(reg, alu::sub(W, rv, imm, false)),
        Op::Cmpi => cpu.set_flags(&alu::sub(W, rv, imm, false)),
        Op::Andi => cpu.apply(reg, alu::logic(W, rv & imm)),
        Op::Ori => cpu.apply(reg, alu::logic(W, rv | imm)),
        Op::Xori => cpu.apply(reg, alu::logic(W, rv ^ imm)),

        Op::Inc => cpu.apply(reg, alu::inc(W, rv)),
        Op::Dec => cpu.apply(reg, alu::dec(W, rv)),
        Op::Not => cpu.apply(reg, alu::logic(W, !rv)),
        Op::Neg => cpu.apply(reg, alu::sub(W, 0, rv, false)),
        Op::Swap => cpu.apply(reg, AluResult::flags_only(W, (rv << 4 | rv >> 4) & 0xFF)),
        _ => unreachable!("{:?} is not an arithmetic or logic op", op),
    }
}

/// SHL SHR SAR ROL ROR: one bit, shifted-out bit to Carry, Z/S from the result.
///
/// ROL and ROR rotate through Carry.
pub(super) fn execute_shift<M: MemoryBus>(cpu: &mut Micro8<M>, op: Op, operands: Operands) {
    let reg = match operands {
        Operands::Register(r) => r,
        _ => unreachable!("{:?} takes a register operand, got {:?}", op, operands),
    };
    let value = cpu.r[reg as usize] as u32;
    let carry_in = cpu.flag_c() as u32;

    let (result, carry_out) = match op {
        Op::Shl => (value << 1, value & 0x80 != 0),
        Op::Shr => (value >> 1, value & 0x01 != 0),
        Op::Sar => (value >> 1 | (value & 0x80), value & 0x01 != 0),
        Op::Rol => (value << 1 | carry_in, value & 0x80 != 0),
        Op::Ror => (value >> 1 | carry_in << 7, value & 0x01 != 0),
        _ => unreachable!("{:?} is not a shift", op),
    };

    cpu.apply(reg, AluResult::shifted(W, result, carry_out));
}

/// INC16 DEC16 ADD16. Only ADD16 touches flags, and only Carry.
pub(super) fn execute_pair<M: MemoryBus>(cpu: &mut Micro8<M>, op: Op) {
    match op {
        Op::Inc16(pair) => cpu.set_pair(pair, cpu.pair(pair).wrapping_add(1)),
        Op::Dec16(pair) => cpu.set_pair(pair, cpu.pair(pair).wrapping_sub(1)),
        Op::Add16(pair) => {
            let (sum, carry) = cpu.pair(Pair::Hl).overflowing_add(cpu.pair(pair));
            cpu.set_pair(Pair::Hl, sum);
            cpu.flags.set(Micro8Flags::CARRY, carry);
        }
        _ => unreachable!("{:?} is not a register-pair op", op),
    }
}
