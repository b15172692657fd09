//! # Control Flow Instructions
//!
//! Near transfers change PC only; far transfers also load CS. Relative offsets count from
//! the address after the instruction.

use crate::addressing::Operands;
use crate::micro16::opcodes::Op;
use crate::micro16::{Micro16, Micro16Flags, CS, CX};
use crate::{ExecutionError, MemoryBus};

pub(super) fn execute<M: MemoryBus>(
    cpu: &mut Micro16<M>,
    op: Op,
    operands: Operands,
) -> Result<(), ExecutionError> {
    match (op, operands) {
        // ========== Jumps ==========
        (Op::Jmp, Operands::Address(target)) => cpu.pc = target,
        (Op::JmpFar, Operands::Far { segment, offset }) => {
            cpu.pc = offset;
            cpu.seg[CS as usize] = segment;
        }
        (Op::JmpReg, Operands::Register(reg)) => cpu.pc = cpu.r[reg as usize],
        (Op::Jr, Operands::Relative(offset)) => jump_relative(cpu, offset),
        (Op::Jump(cond), Operands::Address(target)) => {
            if cpu.condition(cond) {
                cpu.pc = target;
            }
        }

        // ========== Calls and Returns ==========
        (Op::Call, Operands::Address(target)) => {
            cpu.push(cpu.pc)?;
            cpu.pc = target;
        }
        (Op::CallFar, Operands::Far { segment, offset }) => {
            cpu.push(cpu.seg[CS as usize])?;
            cpu.push(cpu.pc)?;
            cpu.pc = offset;
            cpu.seg[CS as usize] = segment;
        }
        (Op::CallReg, Operands::Register(reg)) => {
            cpu.push(cpu.pc)?;
            cpu.pc = cpu.r[reg as usize];
        }
        (Op::Ret, _) => cpu.pc = cpu.pop()?,
        (Op::Retf, _) => {
            cpu.pc = cpu.pop()?;
            cpu.seg[CS as usize] = cpu.pop()?;
        }
        (Op::RetN, Operands::Immediate(n)) => {
            cpu.pc = cpu.pop()?;
            cpu.sp = cpu.sp.wrapping_add(n);
        }

        // ========== Loops ==========
        (Op::Loop | Op::Loopz | Op::Loopnz, Operands::Relative(offset)) => {
            let cx = cpu.r[CX as usize].wrapping_sub(1);
            cpu.r[CX as usize] = cx;
            let z = cpu.flag_z();
            let taken = cx != 0
                && match op {
                    Op::Loopz => z,
                    Op::Loopnz => !z,
                    _ => true,
                };
            if taken {
                jump_relative(cpu, offset);
            }
        }

        // ========== Software Interrupts ==========
        (Op::Int, Operands::Immediate(vector)) => cpu.interrupt(vector as u8)?,
        (Op::Iret, _) => {
            cpu.pc = cpu.pop()?;
            cpu.seg[CS as usize] = cpu.pop()?;
            cpu.flags = Micro16Flags::from_bits_retain(cpu.pop()?);
        }
        (op, operands) => unreachable!("invalid operands for {:?}: {:?}", op, operands),
    }
    Ok(())
}

fn jump_relative<M: MemoryBus>(cpu: &mut Micro16<M>, offset: i8) {
    cpu.pc = cpu.pc.wrapping_add(offset as i16 as u16);
}

#[cfg(test)]
mod tests {
    use crate::cpu::Machine;
    use crate::micro16::Micro16;

    #[test]
    fn test_loop_counts_down_cx() {
        // 0100: MOV CX,#5
        // 0104: INC AX
        // 0106: LOOP -4
        // 0108: HLT
        let mut cpu = Micro16::new();
        cpu.load_program(
            &[0x11, 0x02, 0x05, 0x00, 0x5B, 0x00, 0xD0, 0xFC, 0x01],
            0x0100,
        );
        cpu.run(0);
        assert_eq!(cpu.register(0), 5);
        assert_eq!(cpu.register(2), 0);
        assert_eq!(cpu.pc(), 0x0109);
    }

    #[test]
    fn test_loopnz_stops_on_zero() {
        // 0100: MOV CX,#10 ; MOV AX,#3
        // 0108: DEC AX
        // 010A: LOOPNZ -4
        // 010C: HLT
        let mut cpu = Micro16::new();
        cpu.load_program(
            &[
                0x11, 0x02, 0x0A, 0x00, 0x11, 0x00, 0x03, 0x00, 0x5C, 0x00, 0xD2, 0xFC, 0x01,
            ],
            0x0100,
        );
        cpu.run(0);
        assert_eq!(cpu.register(0), 0);
        assert_eq!(cpu.register(2), 7);
    }

    #[test]
    fn test_signed_conditions() {
        // MOV AX,#0xFFFF ; CMP AX,#1 ; JL 0x0200 ; HLT
        let mut cpu = Micro16::new();
        cpu.load_program(
            &[
                0x11, 0x00, 0xFF, 0xFF, 0x59, 0x00, 0x01, 0x00, 0xB8, 0x00, 0x02, 0x01,
            ],
            0x0100,
        );
        cpu.load_program(&[0x01], 0x0200);
        cpu.run(0);
        // -1 < 1 signed
        assert_eq!(cpu.pc(), 0x0201);

        // Same compare with JA (unsigned above): 0xFFFF > 1, taken
        cpu.reset();
        cpu.load_program(&[0xBC], 0x0108);
        cpu.run(0);
        assert_eq!(cpu.pc(), 0x0201);

        // JBE not taken
        cpu.reset();
        cpu.load_program(&[0xBD], 0x0108);
        cpu.run(0);
        assert_eq!(cpu.pc(), 0x010C);
    }

    #[test]
    fn test_near_call_ret() {
        // 0100: CALL 0x0200 ; HLT
        // 0200: MOV BX,#2 ; RET
        let mut cpu = Micro16::new();
        cpu.load_program(&[0xC0, 0x00, 0x02, 0x01], 0x0100);
        cpu.load_program(&[0x11, 0x01, 0x02, 0x00, 0xC3], 0x0200);
        cpu.run(0);
        assert_eq!(cpu.register(1), 2);
        assert_eq!(cpu.pc(), 0x0104);
        assert_eq!(cpu.sp(), 0xFFFE);
    }

    #[test]
    fn test_far_call_retf() {
        // 0100: CALL 0x0100:0x0000 ; HLT
        // 01000: RETF
        let mut cpu = Micro16::new();
        cpu.load_program(&[0xC1, 0x00, 0x00, 0x00, 0x01, 0x01], 0x0100);
        cpu.load_program(&[0xC4], 0x1000);
        cpu.step();
        assert_eq!(cpu.cs(), 0x0100);
        assert_eq!(cpu.pc(), 0x0000);

        cpu.run(0);
        assert_eq!(cpu.cs(), 0);
        assert_eq!(cpu.pc(), 0x0106);
        assert_eq!(cpu.sp(), 0xFFFE);
    }

    #[test]
    fn test_ret_n_drops_arguments() {
        // 0100: PUSH AX ; CALL 0x0200 ; HLT
        // 0200: RET 2
        let mut cpu = Micro16::new();
        cpu.load_program(&[0x40, 0x00, 0xC0, 0x00, 0x02, 0x01], 0x0100);
        cpu.load_program(&[0xC5, 0x02, 0x00], 0x0200);
        cpu.run(0);
        assert_eq!(cpu.sp(), 0xFFFE);
        assert_eq!(cpu.pc(), 0x0106);
    }

    #[test]
    fn test_jmp_register_and_relative() {
        // 0100: MOV DI,#0x0110 ; JMP DI
        // 0110: JR +1 ; NOP ; HLT
        let mut cpu = Micro16::new();
        cpu.load_program(&[0x11, 0x05, 0x10, 0x01, 0xA2, 0x05], 0x0100);
        cpu.load_program(&[0xA3, 0x01, 0x00, 0x01], 0x0110);
        cpu.run(0);
        assert_eq!(cpu.pc(), 0x0114);
        assert_eq!(cpu.instructions(), 4);
    }

    #[test]
    fn test_int_iret() {
        let mut cpu = Micro16::new();
        // IVT[0x21] = 0000:0300
        cpu.load_program(&[0x00, 0x03, 0x00, 0x00], 0x21 * 4);
        // STI ; STC ; INT 0x21 ; HLT
        cpu.load_program(&[0x07, 0x09, 0x04, 0x21, 0x01], 0x0100);
        // handler: CLC ; IRET
        cpu.load_program(&[0x08, 0x05], 0x0300);
        cpu.run(0);
        assert_eq!(cpu.pc(), 0x0105);
        assert!(cpu.flag_c());
        assert!(cpu.flag_i());
        assert_eq!(cpu.sp(), 0xFFFE);
    }
}
