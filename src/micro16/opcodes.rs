//! # Micro16 Instruction Table
//!
//! Opcodes are grouped by high nibble: system (0x), register transfer (1x), memory (2x),
//! stack (4x), arithmetic (5x/6x), logic (7x), shifts (8x), jumps (Ax/Bx), calls (Cx),
//! loops (Dx), strings (Ex) and I/O (Fx). No Micro16 opcode packs a register; every
//! operand follows in its own bytes.
//!
//! Register-register rows use the `dst << 4 | src` byte; register-immediate rows carry a
//! register byte and a little-endian word.

use crate::addressing::AddressingMode;
use crate::opcodes::InstructionDescriptor;

/// Branch conditions, including the signed and unsigned comparisons.
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
    /// S != O
    Less,
    /// S == O
    GreaterEqual,
    /// Z or S != O
    LessEqual,
    /// !Z and S == O
    Greater,
    /// !C and !Z
    Above,
    /// C or Z
    BelowEqual,
}

/// Micro16 operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    // System
    Nop,
    Hlt,
    Wait,
    Lock,
    Int,
    Iret,
    Cli,
    Sti,
    Clc,
    Stc,
    Cmc,
    Cld,
    Std,
    Pushf,
    Popf,
    // Register transfer
    MovRr,
    MovRi,
    Xchg,
    MovSegReg,
    MovRegSeg,
    MovRegSp,
    MovSpReg,
    AddSp,
    SubSp,
    // Memory
    Ld,
    St,
    Ldb,
    Stb,
    LdIdx,
    StIdx,
    Lea,
    Lds,
    Les,
    LdSp,
    StSp,
    // Stack
    Push,
    Pop,
    PushSeg,
    PopSeg,
    Pusha,
    Popa,
    Enter,
    Leave,
    // Arithmetic
    AddRr,
    AddRi,
    AdcRr,
    AdcRi,
    SubRr,
    SubRi,
    SbcRr,
    SbcRi,
    CmpRr,
    CmpRi,
    Neg,
    Inc,
    Dec,
    Mul,
    Imul,
    Div,
    Idiv,
    // Logic
    AndRr,
    AndRi,
    OrRr,
    OrRi,
    XorRr,
    XorRi,
    Not,
    TestRr,
    TestRi,
    // Shifts
    Shl,
    Shr,
    Sar,
    Rol,
    Ror,
    Rcl,
    Rcr,
    // Control flow
    Jmp,
    JmpFar,
    JmpReg,
    Jr,
    Jump(Condition),
    Call,
    CallFar,
    CallReg,
    Ret,
    Retf,
    RetN,
    Loop,
    Loopz,
    Loopnz,
    // Strings
    Movsb,
    Movsw,
    Cmpsb,
    Cmpsw,
    Stosb,
    Stosw,
    Lodsb,
    Lodsw,
    Rep,
    Repz,
    Repnz,
    // I/O
    In,
    Out,
    Inb,
    Outb,
}

impl Op {
    /// Returns true for the string primitives a repeat prefix may precede.
    pub fn is_string(self) -> bool {
        matches!(
            self,
            Op::Movsb
                | Op::Movsw
                | Op::Cmpsb
                | Op::Cmpsw
                | Op::Stosb
                | Op::Stosw
                | Op::Lodsb
                | Op::Lodsw
        )
    }
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

/// The complete Micro16 instruction set.
///
/// Cycle costs include the one-cycle opcode fetch. Repeat prefixes cost one cycle plus
/// two per iteration.
pub static INSTRUCTION_TABLE: &[InstructionDescriptor<Op>] = &[
    // System
    row("NOP", 0x00, Op::Nop, Implicit, 2),
    row("HLT", 0x01, Op::Hlt, Implicit, 2),
    row("WAIT", 0x02, Op::Wait, Implicit, 2),
    row("LOCK", 0x03, Op::Lock, Implicit, 1),
    row("INT", 0x04, Op::Int, Immediate8, 6),
    row("IRET", 0x05, Op::Iret, Implicit, 6),
    row("CLI", 0x06, Op::Cli, Implicit, 2),
    row("STI", 0x07, Op::Sti, Implicit, 2),
    row("CLC", 0x08, Op::Clc, Implicit, 2),
    row("STC", 0x09, Op::Stc, Implicit, 2),
    row("CMC", 0x0A, Op::Cmc, Implicit, 2),
    row("CLD", 0x0B, Op::Cld, Implicit, 2),
    row("STD", 0x0C, Op::Std, Implicit, 2),
    row("PUSHF", 0x0D, Op::Pushf, Implicit, 3),
    row("POPF", 0x0E, Op::Popf, Implicit, 3),
    // Register transfer
    row("MOV", 0x10, Op::MovRr, RegisterPair, 3),
    row("MOV", 0x11, Op::MovRi, RegisterImm16, 4),
    row("XCHG", 0x12, Op::Xchg, RegisterPair, 4),
    row("MOV", 0x13, Op::MovSegReg, SegmentFromRegister, 3),
    row("MOV", 0x14, Op::MovRegSeg, RegisterFromSegment, 3),
    implied("MOV", 0x15, Op::MovRegSp, Register, ",SP", 3),
    implied("MOV", 0x16, Op::MovSpReg, Register, "SP,", 3),
    implied("ADD", 0x17, Op::AddSp, Immediate16, "SP,", 4),
    implied("SUB", 0x18, Op::SubSp, Immediate16, "SP,", 4),
    // Memory
    row("LD", 0x20, Op::Ld, RegisterDirect, 5),
    row("ST", 0x21, Op::St, RegisterDirect, 5),
    row("LDB", 0x22, Op::Ldb, RegisterDirect, 5),
    row("STB", 0x23, Op::Stb, RegisterDirect, 5),
    row("LD", 0x24, Op::LdIdx, IndexedLoad, 6),
    row("ST", 0x25, Op::StIdx, IndexedStore, 6),
    row("LEA", 0x26, Op::Lea, RegisterDirect, 4),
    row("LDS", 0x27, Op::Lds, RegisterDirect, 7),
    row("LES", 0x28, Op::Les, RegisterDirect, 7),
    row("LD", 0x29, Op::LdSp, StackRelative, 6),
    row("ST", 0x2A, Op::StSp, StackRelative, 6),
    // Stack
    row("PUSH", 0x40, Op::Push, Register, 3),
    row("POP", 0x41, Op::Pop, Register, 3),
    row("PUSH", 0x42, Op::PushSeg, Segment, 3),
    row("POP", 0x43, Op::PopSeg, Segment, 3),
    row("PUSHA", 0x44, Op::Pusha, Implicit, 11),
    row("POPA", 0x45, Op::Popa, Implicit, 11),
    row("ENTER", 0x46, Op::Enter, Frame, 11),
    row("LEAVE", 0x47, Op::Leave, Implicit, 5),
    // Arithmetic
    row("ADD", 0x50, Op::AddRr, RegisterPair, 3),
    row("ADD", 0x51, Op::AddRi, RegisterImm16, 4),
    row("ADC", 0x52, Op::AdcRr, RegisterPair, 3),
    row("ADC", 0x53, Op::AdcRi, RegisterImm16, 4),
    row("SUB", 0x54, Op::SubRr, RegisterPair, 3),
    row("SUB", 0x55, Op::SubRi, RegisterImm16, 4),
    row("SBC", 0x56, Op::SbcRr, RegisterPair, 3),
    row("SBC", 0x57, Op::SbcRi, RegisterImm16, 4),
    row("CMP", 0x58, Op::CmpRr, RegisterPair, 3),
    row("CMP", 0x59, Op::CmpRi, RegisterImm16, 4),
    row("NEG", 0x5A, Op::Neg, Register, 3),
    row("INC", 0x5B, Op::Inc, Register, 2),
    row("DEC", 0x5C, Op::Dec, Register, 2),
    row("MUL", 0x60, Op::Mul, Register, 11),
    row("IMUL", 0x61, Op::Imul, Register, 13),
    row("DIV", 0x62, Op::Div, Register, 16),
    row("IDIV", 0x63, Op::Idiv, Register, 19),
    // Logic
    row("AND", 0x70, Op::AndRr, RegisterPair, 3),
    row("AND", 0x71, Op::AndRi, RegisterImm16, 4),
    row("OR", 0x72, Op::OrRr, RegisterPair, 3),
    row("OR", 0x73, Op::OrRi, RegisterImm16, 4),
    row("XOR", 0x74, Op::XorRr, RegisterPair, 3),
    row("XOR", 0x75, Op::XorRi, RegisterImm16, 4),
    row("NOT", 0x76, Op::Not, Register, 3),
    row("TEST", 0x77, Op::TestRr, RegisterPair, 3),
    row("TEST", 0x78, Op::TestRi, RegisterImm16, 4),
    // Shifts and rotates
    row("SHL", 0x80, Op::Shl, ShiftCount, 4),
    row("SHR", 0x81, Op::Shr, ShiftCount, 4),
    row("SAR", 0x82, Op::Sar, ShiftCount, 4),
    row("ROL", 0x83, Op::Rol, ShiftCount, 4),
    row("ROR", 0x84, Op::Ror, ShiftCount, 4),
    row("RCL", 0x85, Op::Rcl, ShiftCount, 4),
    row("RCR", 0x86, Op::Rcr, ShiftCount, 4),
    // Jumps
    row("JMP", 0xA0, Op::Jmp, Absolute, 4),
    row("JMP", 0xA1, Op::JmpFar, Far, 5),
    row("JMP", 0xA2, Op::JmpReg, Register, 3),
    row("JR", 0xA3, Op::Jr, Relative, 3),
    row("JZ", 0xB0, Op::Jump(Zero), Absolute, 4),
    row("JNZ", 0xB1, Op::Jump(NotZero), Absolute, 4),
    row("JC", 0xB2, Op::Jump(Carry), Absolute, 4),
    row("JNC", 0xB3, Op::Jump(NoCarry), Absolute, 4),
    row("JS", 0xB4, Op::Jump(Sign), Absolute, 4),
    row("JNS", 0xB5, Op::Jump(NoSign), Absolute, 4),
    row("JO", 0xB6, Op::Jump(Overflow), Absolute, 4),
    row("JNO", 0xB7, Op::Jump(NoOverflow), Absolute, 4),
    row("JL", 0xB8, Op::Jump(Less), Absolute, 4),
    row("JGE", 0xB9, Op::Jump(GreaterEqual), Absolute, 4),
    row("JLE", 0xBA, Op::Jump(LessEqual), Absolute, 4),
    row("JG", 0xBB, Op::Jump(Greater), Absolute, 4),
    row("JA", 0xBC, Op::Jump(Above), Absolute, 4),
    row("JBE", 0xBD, Op::Jump(BelowEqual), Absolute, 4),
    // Calls and returns
    row("CALL", 0xC0, Op::Call, Absolute, 5),
    row("CALL", 0xC1, Op::CallFar, Far, 7),
    row("CALL", 0xC2, Op::CallReg, Register, 4),
    row("RET", 0xC3, Op::Ret, Implicit, 4),
    row("RETF", 0xC4, Op::Retf, Implicit, 5),
    row("RET", 0xC5, Op::RetN, Immediate16, 5),
    // Loops
    row("LOOP", 0xD0, Op::Loop, Relative, 3),
    row("LOOPZ", 0xD1, Op::Loopz, Relative, 3),
    row("LOOPNZ", 0xD2, Op::Loopnz, Relative, 3),
    // Strings
    row("MOVSB", 0xE0, Op::Movsb, Implicit, 5),
    row("MOVSW", 0xE1, Op::Movsw, Implicit, 5),
    row("CMPSB", 0xE2, Op::Cmpsb, Implicit, 5),
    row("CMPSW", 0xE3, Op::Cmpsw, Implicit, 5),
    row("STOSB", 0xE4, Op::Stosb, Implicit, 4),
    row("STOSW", 0xE5, Op::Stosw, Implicit, 4),
    row("LODSB", 0xE6, Op::Lodsb, Implicit, 4),
    row("LODSW", 0xE7, Op::Lodsw, Implicit, 4),
    row("REP", 0xE8, Op::Rep, Prefix, 1),
    row("REPZ", 0xE9, Op::Repz, Prefix, 1),
    row("REPNZ", 0xEA, Op::Repnz, Prefix, 1),
    // I/O
    row("IN", 0xF0, Op::In, RegisterPort16, 5),
    row("OUT", 0xF1, Op::Out, RegisterPort16, 5),
    row("INB", 0xF2, Op::Inb, RegisterPort16, 5),
    row("OUTB", 0xF3, Op::Outb, RegisterPort16, 5),
];

/// Extra cycles per iteration of a repeated string instruction.
pub const REPEAT_CYCLES: u32 = 2;
