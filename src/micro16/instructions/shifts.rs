//! # Shift and Rotate Instructions
//!
//! The operand byte packs the register (high nibble) and a count (low nibble); a zero
//! count takes the count from the low four bits of CX. Each single-bit step leaves the
//! bit shifted out in Carry.
//!
//! Shifts then set Z and S from the result. Rotates change only Carry.

use crate::addressing::Operands;
use crate::micro16::opcodes::Op;
use crate::micro16::{Micro16, Micro16Flags, CX};
use crate::MemoryBus;

pub(super) fn execute<M: MemoryBus>(cpu: &mut Micro16<M>, op: Op, operands: Operands) {
    let Operands::ShiftCount { reg, count } = operands else {
        unreachable!("{:?} takes a shift count, got {:?}", op, operands);
    };
    let count = if count == 0 {
        cpu.r[CX as usize] & 0x0F
    } else {
        count as u16
    };

    let mut value = cpu.r[reg as usize];
    let mut carry = cpu.flag_c();
    for _ in 0..count {
        let msb = value & 0x8000 != 0;
        let lsb = value & 0x0001 != 0;
        (value, carry) = match op {
            Op::Shl => (value << 1, msb),
            Op::Shr => (value >> 1, lsb),
            Op::Sar => (((value as i16) >> 1) as u16, lsb),
            Op::Rol => (value.rotate_left(1), msb),
            Op::Ror => (value.rotate_right(1), lsb),
            Op::Rcl => (value << 1 | carry as u16, msb),
            Op::Rcr => (value >> 1 | (carry as u16) << 15, lsb),
            _ => unreachable!("{:?} is not a shift", op),
        };
    }

    cpu.r[reg as usize] = value;
    cpu.flags.set(Micro16Flags::CARRY, carry);
    if matches!(op, Op::Shl | Op::Shr | Op::Sar) {
        cpu.flags.set(Micro16Flags::ZERO, value == 0);
        cpu.flags.set(Micro16Flags::SIGN, value & 0x8000 != 0);
    }
}
