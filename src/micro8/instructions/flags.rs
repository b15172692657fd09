//! # Flag and Interrupt-Enable Instructions

use crate::micro8::opcodes::Op;
use crate::micro8::{Micro8, Micro8Flags};
use crate::MemoryBus;

pub(super) fn execute<M: MemoryBus>(cpu: &mut Micro8<M>, op: Op) {
    match op {
        Op::Ei => cpu.ie = true,
        Op::Di => cpu.ie = false,
        Op::Scf => cpu.flags.insert(Micro8Flags::CARRY),
        Op::Ccf => cpu.flags.remove(Micro8Flags::CARRY),
        Op::Cmf => cpu.flags.toggle(Micro8Flags::CARRY),
        _ => unreachable!("{:?} is not a flag instruction", op),
    }
}
