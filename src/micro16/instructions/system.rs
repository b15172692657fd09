//! # System and Flag Instructions

use crate::micro16::opcodes::Op;
use crate::micro16::{Micro16, Micro16Flags};
use crate::MemoryBus;

pub(super) fn execute<M: MemoryBus>(cpu: &mut Micro16<M>, op: Op) {
    match op {
        Op::Hlt => cpu.halted = true,
        Op::Wait => cpu.waiting = true,
        Op::Cli => cpu.flags.remove(Micro16Flags::INTERRUPT),
        Op::Sti => cpu.flags.insert(Micro16Flags::INTERRUPT),
        Op::Clc => cpu.flags.remove(Micro16Flags::CARRY),
        Op::Stc => cpu.flags.insert(Micro16Flags::CARRY),
        Op::Cmc => cpu.flags.toggle(Micro16Flags::CARRY),
        Op::Cld => cpu.flags.remove(Micro16Flags::DIRECTION),
        Op::Std => cpu.flags.insert(Micro16Flags::DIRECTION),
        // NOP; LOCK has no bus to lock
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use crate::cpu::{CpuState, Machine};
    use crate::micro16::Micro16;

    #[test]
    fn test_flag_instructions() {
        // STC ; CMC ; CMC ; STD ; STI ; HLT
        let mut cpu = Micro16::new();
        cpu.load_program(&[0x09, 0x0A, 0x0A, 0x0C, 0x07, 0x01], 0x0100);
        cpu.run(0);
        assert!(cpu.flag_c());
        assert!(cpu.flag_d());
        assert!(cpu.flag_i());

        // STC ; CLC ; STD ; CLD ; STI ; CLI ; HLT
        cpu.reset();
        cpu.load_program(&[0x09, 0x08, 0x0C, 0x0B, 0x07, 0x06, 0x01], 0x0100);
        cpu.run(0);
        assert!(!cpu.flag_c());
        assert!(!cpu.flag_d());
        assert!(!cpu.flag_i());
    }

    #[test]
    fn test_lock_and_nop_costs() {
        let mut cpu = Micro16::new();
        cpu.load_program(&[0x03, 0x00, 0x01], 0x0100);
        assert_eq!(cpu.step(), 1);
        assert_eq!(cpu.step(), 2);
        assert_eq!(cpu.step(), 2);
        assert_eq!(cpu.state(), CpuState::Halted);
    }

    #[test]
    fn test_halted_step_is_inert() {
        let mut cpu = Micro16::new();
        cpu.load_program(&[0x01], 0x0100);
        cpu.run(0);
        let cycles = cpu.cycles();
        for _ in 0..5 {
            assert_eq!(cpu.step(), 0);
        }
        assert_eq!(cpu.cycles(), cycles);
        assert_eq!(cpu.pc(), 0x0101);
    }
}
