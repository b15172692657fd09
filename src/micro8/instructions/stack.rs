//! # Stack Instructions

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
        (Op::Push, Operands::Register(reg)) => cpu.push_byte(cpu.r[reg as usize])?,
        (Op::Pop, Operands::Register(reg)) => cpu.r[reg as usize] = cpu.pop_byte()?,
        (Op::Push16(pair), _) => cpu.push_word(cpu.pair(pair))?,
        (Op::Pop16(pair), _) => {
            let value = cpu.pop_word()?;
            cpu.set_pair(pair, value);
        }
        (Op::Pushf, _) => cpu.push_byte(cpu.flags.bits())?,
        (Op::Popf, _) => cpu.flags = Micro8Flags::from_bits_retain(cpu.pop_byte()?),
        (op, operands) => unreachable!("invalid operands for {:?}: {:?}", op, operands),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::cpu::Machine;
    use crate::micro8::Micro8;

    #[test]
    fn test_push_pop_byte() {
        // LDI R1,#0x5A ; PUSH R1 ; POP R6 ; HLT
        let mut cpu = Micro8::new();
        cpu.load_program(&[0x07, 0x5A, 0xD3, 0xE0, 0x01], 0x0200);
        cpu.run(0);
        assert_eq!(cpu.register(6), 0x5A);
        assert_eq!(cpu.sp(), 0xFFFF);
        assert_eq!(cpu.memory()[0xFFFF], 0x5A);
    }

    #[test]
    fn test_push16_pop16_moves_pair() {
        // LDI16 HL,#0xBEEF ; PUSH16 HL ; POP16 BC ; HLT
        let mut cpu = Micro8::new();
        cpu.load_program(&[0x32, 0xEF, 0xBE, 0xE2, 0xE5, 0x01], 0x0200);
        cpu.run(0);
        assert_eq!(cpu.bc(), 0xBEEF);
        assert_eq!(cpu.memory()[0xFFFF], 0xBE);
        assert_eq!(cpu.memory()[0xFFFE], 0xEF);
    }

    #[test]
    fn test_pushf_popf() {
        // SCF ; PUSHF ; CCF ; POPF ; HLT
        let mut cpu = Micro8::new();
        cpu.load_program(&[0xEA, 0xE6, 0xEB, 0xE7, 0x01], 0x0200);
        cpu.run(0);
        assert!(cpu.flag_c());
    }
}
