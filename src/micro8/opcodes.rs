//! # Micro8 Instruction Table
//!
//! The full Micro8 opcode map. Several instruction groups pack a register index into
//! the opcode (`LDI R3` is `0x06 + 3`); those rows cover eight consecutive opcodes.
//!
//! Register-register arithmetic (`ADD`, `ADC`, `SUB`, `SBC`, `CMP`, `AND`, `OR`, `XOR`)
//! always uses R0 as the destination; the packed register is the source.

use crate::addressing::AddressingMode;
use crate::opcodes::InstructionDescriptor;

/// Register pairs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pair {
    /// R5:R6
    Hl,
    /// R1:R2
    Bc,
    /// R3:R4
    De,
    /// Stack pointer
    Sp,
}

/// Branch conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Condition {
    Zero,
    NotZero,
    Carry,
    NoCarry,
    Sign,
    NoSign,
    Overflow,
    NoOverflow,
}

/// Micro8 operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Nop,
    Hlt,
    Ldi,
    Ld,
    Ldz,
    St,
    Stz,
    LdHl,
    StHl,
    LdHlDisp,
    StHlDisp,
    Ldi16(Pair),
    MovHlSp,
    MovSpHl,
    Andi,
    Ori,
    Xori,
    Shl,
    Shr,
    Sar,
    Rol,
    Ror,
    Add,
    Adc,
    Sub,
    Sbc,
    Addi,
    Subi,
    Inc,
    Dec,
    Cmp,
    Cmpi,
    Inc16(Pair),
    Dec16(Pair),
    Add16(Pair),
    Neg,
    And,
    Or,
    Xor,
    Not,
    Jmp,
    Jr,
    Jump(Condition),
    JumpRelative(Condition),
    JpHl,
    Call,
    Ret,
    Reti,
    Push,
    Pop,
    Push16(Pair),
    Pop16(Pair),
    Pushf,
    Popf,
    Ei,
    Di,
    Scf,
    Ccf,
    Cmf,
    In,
    Out,
    Swap,
    Mov,
}

const fn row(
    mnemonic: &'static str,
    opcode: u8,
    op: Op,
    mode: AddressingMode,
    cycles: u8,
) -> InstructionDescriptor<Op> {
    implied(mnemonic, opcode, op, mode, "", cycles)
}

const fn implied(
    mnemonic: &'static str,
    opcode: u8,
    op: Op,
    mode: AddressingMode,
    text: &'static str,
    cycles: u8,
) -> InstructionDescriptor<Op> {
    InstructionDescriptor {
        mnemonic,
        opcode,
        op,
        mode,
        implied: text,
        cycles,
    }
}

use AddressingMode::*;
use Condition::*;

/// The complete Micro8 instruction set.
///
/// Cycle costs include the one-cycle opcode fetch.
pub static INSTRUCTION_TABLE: &[InstructionDescriptor<Op>] = &[
    row("NOP", 0x00, Op::Nop, Implicit, 2),
    row("HLT", 0x01, Op::Hlt, Implicit, 2),
    // Loads and stores
    row("LDI", 0x06, Op::Ldi, OpcodeRegisterImm8, 3),
    row("LD", 0x0E, Op::Ld, OpcodeRegisterDirect, 5),
    row("LDZ", 0x16, Op::Ldz, OpcodeRegisterZeroPage, 4),
    row("ST", 0x1E, Op::St, OpcodeRegisterDirect, 5),
    row("STZ", 0x26, Op::Stz, OpcodeRegisterZeroPage, 4),
    row("LD", 0x2E, Op::LdHl, RegisterIndirect, 4),
    row("ST", 0x2F, Op::StHl, RegisterIndirect, 4),
    row("LD", 0x30, Op::LdHlDisp, RegisterDisplaced8, 5),
    row("ST", 0x31, Op::StHlDisp, RegisterDisplaced8, 5),
    implied("LDI16", 0x32, Op::Ldi16(Pair::Hl), Immediate16, "HL,", 4),
    implied("LDI16", 0x33, Op::Ldi16(Pair::Bc), Immediate16, "BC,", 4),
    implied("LDI16", 0x34, Op::Ldi16(Pair::De), Immediate16, "DE,", 4),
    implied("LDI16", 0x35, Op::Ldi16(Pair::Sp), Immediate16, "SP,", 4),
    implied("MOV16", 0x36, Op::MovHlSp, Implicit, "HL,SP", 3),
    implied("MOV16", 0x37, Op::MovSpHl, Implicit, "SP,HL", 3),
    // Immediate logic and shifts
    row("ANDI", 0x38, Op::Andi, RegisterImm8, 4),
    row("ORI", 0x39, Op::Ori, RegisterImm8, 4),
    row("XORI", 0x3A, Op::Xori, RegisterImm8, 4),
    row("SHL", 0x3B, Op::Shl, Register, 3),
    row("SHR", 0x3C, Op::Shr, Register, 3),
    row("SAR", 0x3D, Op::Sar, Register, 3),
    row("ROL", 0x3E, Op::Rol, Register, 3),
    row("ROR", 0x3F, Op::Ror, Register, 3),
    // Arithmetic into R0
    row("ADD", 0x40, Op::Add, OpcodeRegister, 2),
    row("ADC", 0x48, Op::Adc, OpcodeRegister, 2),
    row("SUB", 0x50, Op::Sub, OpcodeRegister, 2),
    row("SBC", 0x58, Op::Sbc, OpcodeRegister, 2),
    row("ADDI", 0x60, Op::Addi, OpcodeRegisterImm8, 3),
    row("SUBI", 0x68, Op::Subi, OpcodeRegisterImm8, 3),
    row("INC", 0x70, Op::Inc, OpcodeRegister, 2),
    row("DEC", 0x78, Op::Dec, OpcodeRegister, 2),
    row("CMP", 0x80, Op::Cmp, OpcodeRegister, 2),
    row("CMPI", 0x88, Op::Cmpi, OpcodeRegisterImm8, 3),
    // 16-bit pair arithmetic
    implied("INC16", 0x90, Op::Inc16(Pair::Hl), Implicit, "HL", 3),
    implied("DEC16", 0x91, Op::Dec16(Pair::Hl), Implicit, "HL", 3),
    implied("INC16", 0x92, Op::Inc16(Pair::Bc), Implicit, "BC", 3),
    implied("DEC16", 0x93, Op::Dec16(Pair::Bc), Implicit, "BC", 3),
    implied("ADD16", 0x94, Op::Add16(Pair::Bc), Implicit, "HL,BC", 4),
    implied("ADD16", 0x95, Op::Add16(Pair::De), Implicit, "HL,DE", 4),
    row("NEG", 0x96, Op::Neg, Register, 3),
    // Logic into R0
    row("AND", 0xA0, Op::And, OpcodeRegister, 2),
    row("OR", 0xA8, Op::Or, OpcodeRegister, 2),
    row("XOR", 0xB0, Op::Xor, OpcodeRegister, 2),
    row("NOT", 0xB8, Op::Not, OpcodeRegister, 2),
    // Control flow
    row("JMP", 0xC0, Op::Jmp, Absolute, 4),
    row("JR", 0xC1, Op::Jr, Relative, 3),
    row("JZ", 0xC2, Op::Jump(Zero), Absolute, 4),
    row("JNZ", 0xC3, Op::Jump(NotZero), Absolute, 4),
    row("JC", 0xC4, Op::Jump(Carry), Absolute, 4),
    row("JNC", 0xC5, Op::Jump(NoCarry), Absolute, 4),
    row("JS", 0xC6, Op::Jump(Sign), Absolute, 4),
    row("JNS", 0xC7, Op::Jump(NoSign), Absolute, 4),
    row("JO", 0xC8, Op::Jump(Overflow), Absolute, 4),
    row("JNO", 0xC9, Op::Jump(NoOverflow), Absolute, 4),
    row("JRZ", 0xCA, Op::JumpRelative(Zero), Relative, 3),
    row("JRNZ", 0xCB, Op::JumpRelative(NotZero), Relative, 3),
    row("JRC", 0xCC, Op::JumpRelative(Carry), Relative, 3),
    row("JRNC", 0xCD, Op::JumpRelative(NoCarry), Relative, 3),
    implied("JP", 0xCE, Op::JpHl, Implicit, "HL", 3),
    row("CALL", 0xCF, Op::Call, Absolute, 6),
    row("RET", 0xD0, Op::Ret, Implicit, 5),
    row("RETI", 0xD1, Op::Reti, Implicit, 6),
    // Stack
    row("PUSH", 0xD2, Op::Push, OpcodeRegister, 3),
    row("POP", 0xDA, Op::Pop, OpcodeRegister, 3),
    implied("PUSH16", 0xE2, Op::Push16(Pair::Hl), Implicit, "HL", 4),
    implied("POP16", 0xE3, Op::Pop16(Pair::Hl), Implicit, "HL", 4),
    implied("PUSH16", 0xE4, Op::Push16(Pair::Bc), Implicit, "BC", 4),
    implied("POP16", 0xE5, Op::Pop16(Pair::Bc), Implicit, "BC", 4),
    row("PUSHF", 0xE6, Op::Pushf, Implicit, 3),
    row("POPF", 0xE7, Op::Popf, Implicit, 3),
    // Flags, I/O, misc
    row("EI", 0xE8, Op::Ei, Implicit, 2),
    row("DI", 0xE9, Op::Di, Implicit, 2),
    row("SCF", 0xEA, Op::Scf, Implicit, 2),
    row("CCF", 0xEB, Op::Ccf, Implicit, 2),
    row("CMF", 0xEC, Op::Cmf, Implicit, 2),
    row("IN", 0xED, Op::In, PortIn8, 4),
    row("OUT", 0xEE, Op::Out, PortOut8, 4),
    row("SWAP", 0xEF, Op::Swap, Register, 3),
    row("MOV", 0xF0, Op::Mov, RegisterPair, 3),
];
