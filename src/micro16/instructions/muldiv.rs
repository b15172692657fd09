//! # Multiply and Divide
//!
//! All four operate on the DX:AX pair with a register operand.
//!
//! - MUL/IMUL: DX:AX = AX * src; C and O report whether the high half carries
//!   significance
//! - DIV/IDIV: AX = DX:AX / src, DX = remainder; a zero divisor raises vector 0 instead
//!   of faulting

use log::debug;

use crate::addressing::Operands;
use crate::micro16::opcodes::Op;
use crate::micro16::{Micro16, Micro16Flags, AX, DIVIDE_ERROR_VECTOR, DX};
use crate::{ExecutionError, MemoryBus};

pub(super) fn execute<M: MemoryBus>(
    cpu: &mut Micro16<M>,
    op: Op,
    operands: Operands,
) -> Result<(), ExecutionError> {
    let Operands::Register(reg) = operands else {
        unreachable!("{:?} takes a register operand, got {:?}", op, operands);
    };
    let src = cpu.r[reg as usize];
    let ax = cpu.r[AX as usize];

    match op {
        Op::Mul => {
            let product = ax as u32 * src as u32;
            set_pair(cpu, product);
            let significant = product >> 16 != 0;
            set_multiply_flags(cpu, significant);
        }
        Op::Imul => {
            let product = (ax as i16 as i32) * (src as i16 as i32);
            set_pair(cpu, product as u32);
            let significant = product != product as i16 as i32;
            set_multiply_flags(cpu, significant);
        }
        Op::Div | Op::Idiv if src == 0 => {
            debug!("micro16 divide by zero");
            cpu.interrupt(DIVIDE_ERROR_VECTOR)?;
        }
        Op::Div => {
            let dividend = dividend(cpu);
            cpu.r[AX as usize] = (dividend / src as u32) as u16;
            cpu.r[DX as usize] = (dividend % src as u32) as u16;
        }
        Op::Idiv => {
            let dividend = dividend(cpu) as i32;
            let divisor = src as i16 as i32;
            cpu.r[AX as usize] = dividend.wrapping_div(divisor) as i16 as u16;
            cpu.r[DX as usize] = dividend.wrapping_rem(divisor) as i16 as u16;
        }
        _ => unreachable!("{:?} is not a multiply or divide", op),
    }
    Ok(())
}

fn dividend<M: MemoryBus>(cpu: &Micro16<M>) -> u32 {
    (cpu.r[DX as usize] as u32) << 16 | cpu.r[AX as usize] as u32
}

fn set_pair<M: MemoryBus>(cpu: &mut Micro16<M>, value: u32) {
    cpu.r[AX as usize] = value as u16;
    cpu.r[DX as usize] = (value >> 16) as u16;
}

fn set_multiply_flags<M: MemoryBus>(cpu: &mut Micro16<M>, significant: bool) {
    cpu.flags.set(Micro16Flags::CARRY, significant);
    cpu.flags.set(Micro16Flags::OVERFLOW, significant);
}

#[cfg(test)]
mod tests {
    use crate::cpu::Machine;
    use crate::micro16::Micro16;

    fn run(setup: &[(u8, u16)], tail: &[u8]) -> Micro16 {
        let mut program = Vec::new();
        for &(reg, value) in setup {
            let [lo, hi] = value.to_le_bytes();
            program.extend_from_slice(&[0x11, reg, lo, hi]);
        }
        program.extend_from_slice(tail);
        program.push(0x01);

        let mut cpu = Micro16::new();
        cpu.load_program(&program, 0x0100);
        cpu.run(0);
        cpu
    }

    #[test]
    fn test_mul_widens_into_dx() {
        let cpu = run(&[(0, 0x1234), (1, 0x0100)], &[0x60, 0x01]);
        assert_eq!(cpu.register(0), 0x3400);
        assert_eq!(cpu.register(3), 0x0012);
        assert!(cpu.flag_c());
        assert!(cpu.flag_o());

        let cpu = run(&[(0, 3), (1, 4)], &[0x60, 0x01]);
        assert_eq!(cpu.register(0), 12);
        assert_eq!(cpu.register(3), 0);
        assert!(!cpu.flag_c());
    }

    #[test]
    fn test_imul_signed() {
        // -2 * 3 = -6 fits in AX
        let cpu = run(&[(0, 0xFFFE), (1, 3)], &[0x61, 0x01]);
        assert_eq!(cpu.register(0), 0xFFFA);
        assert_eq!(cpu.register(3), 0xFFFF);
        assert!(!cpu.flag_c());
        assert!(!cpu.flag_o());

        // 0x4000 * 2 = 0x8000 does not fit as a positive i16
        let cpu = run(&[(0, 0x4000), (1, 2)], &[0x61, 0x01]);
        assert_eq!(cpu.register(0), 0x8000);
        assert_eq!(cpu.register(3), 0x0000);
        assert!(cpu.flag_c());
    }

    #[test]
    fn test_div_uses_dx_ax() {
        // DX:AX = 0x0001_0005, / 0x10
        let cpu = run(&[(3, 0x0001), (0, 0x0005), (1, 0x0010)], &[0x62, 0x01]);
        assert_eq!(cpu.register(0), 0x1000);
        assert_eq!(cpu.register(3), 0x0005);
    }

    #[test]
    fn test_idiv_signed() {
        // DX:AX = -7, / 2 -> quotient -3, remainder -1
        let cpu = run(&[(3, 0xFFFF), (0, 0xFFF9), (1, 2)], &[0x63, 0x01]);
        assert_eq!(cpu.register(0), 0xFFFD);
        assert_eq!(cpu.register(3), 0xFFFF);
    }

    #[test]
    fn test_idiv_by_zero_is_not_an_error() {
        let mut cpu = Micro16::new();
        cpu.load_program(&[0x00, 0x05, 0x00, 0x00], 0);
        cpu.load_program(&[0x01], 0x0500);
        // IDIV BX with BX = 0
        cpu.load_program(&[0x63, 0x01, 0x01], 0x0100);
        cpu.run(0);
        assert!(!cpu.is_error());
        assert_eq!(cpu.pc(), 0x0501);
    }
}
