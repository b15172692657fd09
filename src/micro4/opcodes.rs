//! # Micro4 Instruction Table
//!
//! Eight instructions selected by the high nibble of the opcode byte. Only LDI uses the
//! low nibble (as its immediate); the others ignore it. Sizes below are in bytes; each
//! byte occupies two nibble cells in memory.

use crate::addressing::AddressingMode;
use crate::opcodes::InstructionDescriptor;

/// Micro4 operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Hlt,
    Lda,
    Sta,
    Add,
    Sub,
    Jmp,
    Jz,
    Ldi,
}

const fn row(
    mnemonic: &'static str,
    opcode: u8,
    op: Op,
    mode: AddressingMode,
    cycles: u8,
) -> InstructionDescriptor<Op> {
    InstructionDescriptor {
        mnemonic,
        opcode,
        op,
        mode,
        implied: "",
        cycles,
    }
}

use AddressingMode::{Direct8, Implicit, PackedNibble};

/// The complete Micro4 instruction set.
///
/// Cycle costs include the two-cycle fetch of the opcode byte.
pub static INSTRUCTION_TABLE: &[InstructionDescriptor<Op>] = &[
    row("HLT", 0x00, Op::Hlt, Implicit, 3),
    row("LDA", 0x10, Op::Lda, Direct8, 5),
    row("STA", 0x20, Op::Sta, Direct8, 5),
    row("ADD", 0x30, Op::Add, Direct8, 5),
    row("SUB", 0x40, Op::Sub, Direct8, 5),
    row("JMP", 0x50, Op::Jmp, Direct8, 4),
    row("JZ", 0x60, Op::Jz, Direct8, 5),
    row("LDI", 0x70, Op::Ldi, PackedNibble, 3),
];
