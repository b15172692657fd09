//! # Data Transfer Instructions
//!
//! Register moves, memory loads and stores, pointer loads and port I/O. None of these
//! touch the flags.
//!
//! Memory operands are offsets into DS, except the `[SP+n]` forms which use SS. Ports
//! are physical addresses in the I/O window at `MMIO_BASE`.

use crate::addressing::Operands;
use crate::micro16::opcodes::Op;
use crate::micro16::{Micro16, DS, ES, MMIO_BASE, SS};
use crate::{ExecutionError, MemoryBus};

pub(super) fn execute<M: MemoryBus>(
    cpu: &mut Micro16<M>,
    op: Op,
    operands: Operands,
) -> Result<(), ExecutionError> {
    match (op, operands) {
        // ========== Register Moves ==========
        (Op::MovRr, Operands::RegisterPair { dst, src }) => {
            cpu.r[dst as usize] = cpu.r[src as usize];
        }
        (Op::MovRi, Operands::RegisterImmediate { reg, imm }) => cpu.r[reg as usize] = imm,
        (Op::Xchg, Operands::RegisterPair { dst, src }) => {
            cpu.r.swap(dst as usize, src as usize);
        }
        (Op::MovSegReg, Operands::SegmentRegister { seg, reg }) => {
            cpu.seg[seg as usize] = cpu.r[reg as usize];
        }
        (Op::MovRegSeg, Operands::SegmentRegister { seg, reg }) => {
            cpu.r[reg as usize] = cpu.seg[seg as usize];
        }
        (Op::MovRegSp, Operands::Register(reg)) => cpu.r[reg as usize] = cpu.sp,
        (Op::MovSpReg, Operands::Register(reg)) => cpu.sp = cpu.r[reg as usize],

        // ========== Direct Memory ==========
        (Op::Ld, Operands::RegisterAddress { reg, address }) => {
            cpu.r[reg as usize] = cpu.read_word(DS, address)?;
        }
        (Op::St, Operands::RegisterAddress { reg, address }) => {
            cpu.write_word(DS, address, cpu.r[reg as usize])?;
        }
        (Op::Ldb, Operands::RegisterAddress { reg, address }) => {
            cpu.r[reg as usize] = cpu.read_byte(DS, address)? as u16;
        }
        (Op::Stb, Operands::RegisterAddress { reg, address }) => {
            cpu.write_byte(DS, address, cpu.r[reg as usize] as u8)?;
        }

        // ========== Indexed and Stack-Relative ==========
        (Op::LdIdx, Operands::Indexed { reg, base, disp }) => {
            let ea = cpu.r[base as usize].wrapping_add(disp as u16);
            cpu.r[reg as usize] = cpu.read_word(DS, ea)?;
        }
        (Op::StIdx, Operands::Indexed { reg, base, disp }) => {
            let ea = cpu.r[base as usize].wrapping_add(disp as u16);
            cpu.write_word(DS, ea, cpu.r[reg as usize])?;
        }
        (Op::LdSp, Operands::RegisterDisplacement { reg, disp }) => {
            let ea = cpu.sp.wrapping_add(disp as u16);
            cpu.r[reg as usize] = cpu.read_word(SS, ea)?;
        }
        (Op::StSp, Operands::RegisterDisplacement { reg, disp }) => {
            let ea = cpu.sp.wrapping_add(disp as u16);
            cpu.write_word(SS, ea, cpu.r[reg as usize])?;
        }

        // ========== Addresses and Far Pointers ==========
        (Op::Lea, Operands::RegisterAddress { reg, address }) => cpu.r[reg as usize] = address,
        (Op::Lds | Op::Les, Operands::RegisterAddress { reg, address }) => {
            let offset = cpu.read_word(DS, address)?;
            let segment = cpu.read_word(DS, address.wrapping_add(2))?;
            cpu.r[reg as usize] = offset;
            let target = if op == Op::Lds { DS } else { ES };
            cpu.seg[target as usize] = segment;
        }

        // ========== Port I/O ==========
        (Op::In, Operands::Port { reg, port }) => {
            cpu.r[reg as usize] = cpu.read_physical_word(MMIO_BASE + port as u32)?;
        }
        (Op::Out, Operands::Port { reg, port }) => {
            cpu.write_physical_word(MMIO_BASE + port as u32, cpu.r[reg as usize])?;
        }
        (Op::Inb, Operands::Port { reg, port }) => {
            cpu.r[reg as usize] = cpu.read_physical(MMIO_BASE + port as u32)? as u16;
        }
        (Op::Outb, Operands::Port { reg, port }) => {
            cpu.write_physical(MMIO_BASE + port as u32, cpu.r[reg as usize] as u8)?;
        }
        (op, operands) => unreachable!("invalid operands for {:?}: {:?}", op, operands),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::cpu::Machine;
    use crate::micro16::Micro16;

    fn run(program: &[u8]) -> Micro16 {
        let mut cpu = Micro16::new();
        cpu.load_program(program, 0x0100);
        cpu.run(100_000);
        cpu
    }

    #[test]
    fn test_mov_and_xchg() {
        // MOV AX,#0x1111 ; MOV BX,#0x2222 ; XCHG AX,BX ; MOV CX,AX ; HLT
        let cpu = run(&[
            0x11, 0x00, 0x11, 0x11, 0x11, 0x01, 0x22, 0x22, 0x12, 0x01, 0x10, 0x20, 0x01,
        ]);
        assert_eq!(cpu.register(0), 0x2222);
        assert_eq!(cpu.register(1), 0x1111);
        assert_eq!(cpu.register(2), 0x2222);
    }

    #[test]
    fn test_segment_moves() {
        // MOV AX,#0x1000 ; MOV DS,AX ; MOV BX,DS ; HLT
        let cpu = run(&[0x11, 0x00, 0x00, 0x10, 0x13, 0x10, 0x14, 0x11, 0x01]);
        assert_eq!(cpu.ds(), 0x1000);
        assert_eq!(cpu.register(1), 0x1000);
    }

    #[test]
    fn test_store_and_load_through_ds() {
        // MOV AX,#0x0200 ; MOV DS,AX ; MOV BX,#0xCAFE ; ST BX,[0x0010] ; LDB CX,[0x0011] ; HLT
        let cpu = run(&[
            0x11, 0x00, 0x00, 0x02, 0x13, 0x10, 0x11, 0x01, 0xFE, 0xCA, 0x21, 0x01, 0x10, 0x00,
            0x22, 0x02, 0x11, 0x00, 0x01,
        ]);
        assert_eq!(cpu.memory()[0x2010], 0xFE);
        assert_eq!(cpu.memory()[0x2011], 0xCA);
        assert_eq!(cpu.register(2), 0x00CA);
    }

    #[test]
    fn test_indexed_access() {
        // MOV BX,#0x3000 ; MOV AX,#0x4242 ; ST [BX-2],AX ; LD DX,[BX-2] ; HLT
        let cpu = run(&[
            0x11, 0x01, 0x00, 0x30, 0x11, 0x00, 0x42, 0x42, 0x25, 0x10, 0xFE, 0xFF, 0x24, 0x31,
            0xFE, 0xFF, 0x01,
        ]);
        assert_eq!(cpu.memory()[0x2FFE], 0x42);
        assert_eq!(cpu.register(3), 0x4242);
    }

    #[test]
    fn test_stack_relative_access() {
        // MOV AX,#0x7777 ; PUSH AX ; LD CX,[SP+0] ; MOV DX,#1 ; ST [SP+0],DX ; POP BX ; HLT
        let cpu = run(&[
            0x11, 0x00, 0x77, 0x77, 0x40, 0x00, 0x29, 0x02, 0x00, 0x00, 0x11, 0x03, 0x01, 0x00,
            0x2A, 0x03, 0x00, 0x00, 0x41, 0x01, 0x01,
        ]);
        assert_eq!(cpu.register(2), 0x7777);
        assert_eq!(cpu.register(1), 0x0001);
        assert_eq!(cpu.sp(), 0xFFFE);
    }

    #[test]
    fn test_mov_to_and_from_sp() {
        // MOV AX,SP ; MOV BX,#0x8000 ; MOV SP,BX ; HLT
        let cpu = run(&[0x15, 0x00, 0x11, 0x01, 0x00, 0x80, 0x16, 0x01, 0x01]);
        assert_eq!(cpu.register(0), 0xFFFE);
        assert_eq!(cpu.sp(), 0x8000);
    }

    #[test]
    fn test_lea_and_lds() {
        let mut cpu = Micro16::new();
        // far pointer 1234:5678 at DS:0x0400
        cpu.load_program(&[0x78, 0x56, 0x34, 0x12], 0x0400);
        // LEA SI,[0x0400] ; LDS DI,[0x0400] ; HLT
        cpu.load_program(&[0x26, 0x04, 0x00, 0x04, 0x27, 0x05, 0x00, 0x04, 0x01], 0x0100);
        cpu.run(0);
        assert_eq!(cpu.register(4), 0x0400);
        assert_eq!(cpu.register(5), 0x5678);
        assert_eq!(cpu.ds(), 0x1234);
    }

    #[test]
    fn test_port_io_hits_mmio_window() {
        let mut cpu = Micro16::new();
        // MOV AX,#0xA55A ; OUT 0x0010,AX ; INB BX,0x0010 ; HLT
        cpu.load_program(
            &[0x11, 0x00, 0x5A, 0xA5, 0xF1, 0x00, 0x10, 0x00, 0xF2, 0x01, 0x10, 0x00, 0x01],
            0x0100,
        );
        cpu.run(0);
        assert_eq!(cpu.memory()[0xF0010], 0x5A);
        assert_eq!(cpu.memory()[0xF0011], 0xA5);
        assert_eq!(cpu.register(1), 0x005A);
    }

    #[test]
    fn test_moves_leave_flags() {
        // STC ; MOV AX,#0 ; HLT
        let cpu = run(&[0x09, 0x11, 0x00, 0x00, 0x00, 0x01]);
        assert!(cpu.flag_c());
        assert!(!cpu.flag_z());
    }
}
