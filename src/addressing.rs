//! # Addressing Modes
//!
//! This module defines the operand shapes used across the three instruction sets and the
//! one routine that turns operand bytes into fields (and back). The CPUs, the assembler
//! encoders and the disassembler all go through `decode_operands` / `encode_operands`, so
//! an instruction's byte layout is written down exactly once.
//!
//! Multi-byte values are little-endian. Packed fields put the first-named field in the
//! high nibble. Register fields are masked to 3 bits and segment fields to 2 bits.

/// Operand shape of an instruction.
///
/// # Operand Sizes
///
/// - **0 bytes**: Implicit, PackedNibble, OpcodeRegister
/// - **1 byte**: Direct8, OpcodeRegisterImm8, OpcodeRegisterZeroPage, Register,
///   RegisterIndirect, RegisterPair, Immediate8, Relative, SegmentFromRegister,
///   RegisterFromSegment, Segment, ShiftCount, Prefix
/// - **2 bytes**: OpcodeRegisterDirect, RegisterImm8, RegisterDisplaced8, Immediate16,
///   Absolute, PortIn8, PortOut8
/// - **3 bytes**: RegisterImm16, RegisterDirect, RegisterPort16, IndexedLoad,
///   IndexedStore, StackRelative, Frame
/// - **4 bytes**: Far
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressingMode {
    /// No operand.
    ///
    /// Examples: HLT, RET, CLI
    Implicit,

    /// 4-bit immediate packed into the low nibble of the opcode byte.
    ///
    /// Example: LDI 5 (4-bit)
    PackedNibble,

    /// 8-bit absolute address byte.
    ///
    /// Example: LDA 0x20 (4-bit)
    Direct8,

    /// Register index packed into the low three opcode bits.
    ///
    /// Example: INC R3 (8-bit)
    OpcodeRegister,

    /// Packed register plus an 8-bit immediate.
    ///
    /// Example: LDI R1,#0x42 (8-bit)
    OpcodeRegisterImm8,

    /// Packed register plus a 16-bit absolute address.
    ///
    /// Example: LD R2,[0x1234] (8-bit)
    OpcodeRegisterDirect,

    /// Packed register plus a zero-page address byte.
    ///
    /// Example: LDZ R0,[0x80] (8-bit)
    OpcodeRegisterZeroPage,

    /// One register byte.
    ///
    /// Examples: SHL R1 (8-bit), INC AX (16-bit)
    Register,

    /// One register byte, memory operand through HL.
    ///
    /// Example: LD R0,[HL] (8-bit)
    RegisterIndirect,

    /// Register byte plus an 8-bit immediate.
    ///
    /// Example: ANDI R2,#0x0F (8-bit)
    RegisterImm8,

    /// Register byte plus a signed 8-bit displacement from HL.
    ///
    /// Example: LD R0,[HL+4] (8-bit)
    RegisterDisplaced8,

    /// Two register fields packed into one byte (`dst << 4 | src`).
    ///
    /// Examples: MOV R1,R2 (8-bit), ADD AX,BX (16-bit)
    RegisterPair,

    /// 8-bit immediate.
    ///
    /// Example: INT 0x21 (16-bit)
    Immediate8,

    /// 16-bit immediate.
    ///
    /// Examples: LDI16 HL,#0x1234 (8-bit), ADD SP,#4 (16-bit)
    Immediate16,

    /// 16-bit absolute target.
    ///
    /// Example: JMP START
    Absolute,

    /// Signed 8-bit offset from the address after the instruction.
    ///
    /// Example: JR LOOP
    Relative,

    /// Register byte then port byte.
    ///
    /// Example: IN R0,0x10 (8-bit)
    PortIn8,

    /// Port byte then register byte.
    ///
    /// Example: OUT 0x10,R0 (8-bit)
    PortOut8,

    /// Register byte plus a 16-bit immediate.
    ///
    /// Example: MOV AX,#1000 (16-bit)
    RegisterImm16,

    /// Register byte plus a 16-bit data-segment address.
    ///
    /// Example: LD AX,[0x2000] (16-bit)
    RegisterDirect,

    /// Register byte plus a 16-bit port number.
    ///
    /// Example: IN AX,0x0040 (16-bit)
    RegisterPort16,

    /// `dst << 4 | base` plus a signed 16-bit offset.
    ///
    /// Example: LD AX,[BX+4] (16-bit)
    IndexedLoad,

    /// `base << 4 | src` plus a signed 16-bit offset.
    ///
    /// Example: ST [BX-2],AX (16-bit)
    IndexedStore,

    /// Register byte plus a signed 16-bit offset from SP.
    ///
    /// Example: LD AX,[SP+2] (16-bit)
    StackRelative,

    /// `seg << 4 | src` (segment destination).
    ///
    /// Example: MOV DS,AX (16-bit)
    SegmentFromRegister,

    /// `dst << 4 | seg` (segment source).
    ///
    /// Example: MOV AX,ES (16-bit)
    RegisterFromSegment,

    /// One segment byte.
    ///
    /// Example: PUSH DS (16-bit)
    Segment,

    /// `reg << 4 | count`; a zero count means "use CX".
    ///
    /// Example: SHL AX,#3 (16-bit)
    ShiftCount,

    /// 16-bit frame size plus 8-bit nesting level.
    ///
    /// Example: ENTER 8,0 (16-bit)
    Frame,

    /// 16-bit offset then 16-bit segment.
    ///
    /// Example: JMP 0x1000:0x0020 (16-bit)
    Far,

    /// The opcode byte of the instruction being repeated.
    ///
    /// Example: REP MOVSB (16-bit)
    Prefix,
}

impl AddressingMode {
    /// Number of operand bytes that follow the opcode byte.
    pub const fn operand_len(self) -> u8 {
        use AddressingMode::*;
        match self {
            Implicit | PackedNibble | OpcodeRegister => 0,
            Direct8 | OpcodeRegisterImm8 | OpcodeRegisterZeroPage | Register
            | RegisterIndirect | RegisterPair | Immediate8 | Relative | SegmentFromRegister
            | RegisterFromSegment | Segment | ShiftCount | Prefix => 1,
            OpcodeRegisterDirect | RegisterImm8 | RegisterDisplaced8 | Immediate16 | Absolute
            | PortIn8 | PortOut8 => 2,
            RegisterImm16 | RegisterDirect | RegisterPort16 | IndexedLoad | IndexedStore
            | StackRelative | Frame => 3,
            Far => 4,
        }
    }

    /// Number of low opcode bits that carry an operand field.
    pub const fn packed_bits(self) -> u8 {
        use AddressingMode::*;
        match self {
            PackedNibble => 4,
            OpcodeRegister | OpcodeRegisterImm8 | OpcodeRegisterDirect
            | OpcodeRegisterZeroPage => 3,
            _ => 0,
        }
    }
}

/// Decoded operand fields of one instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operands {
    /// No operand
    None,
    /// A single register
    Register(u8),
    /// Two registers
    RegisterPair { dst: u8, src: u8 },
    /// Register and immediate value
    RegisterImmediate { reg: u8, imm: u16 },
    /// Register and absolute address
    RegisterAddress { reg: u8, address: u16 },
    /// Register and signed displacement from an implied base (HL or SP)
    RegisterDisplacement { reg: u8, disp: i16 },
    /// Data register, base register and signed offset
    Indexed { reg: u8, base: u8, disp: i16 },
    /// Segment register and general register
    SegmentRegister { seg: u8, reg: u8 },
    /// A single segment register
    Segment(u8),
    /// Immediate value (also vectors and stack adjustments)
    Immediate(u16),
    /// Absolute address
    Address(u16),
    /// Signed branch offset
    Relative(i8),
    /// Register and I/O port
    Port { reg: u8, port: u16 },
    /// Register and shift count (0 = use CX)
    ShiftCount { reg: u8, count: u8 },
    /// ENTER frame size and nesting level
    Frame { size: u16, level: u8 },
    /// Far segment:offset target
    Far { segment: u16, offset: u16 },
    /// Repeated opcode
    Prefix(u8),
}

fn reg(field: u8) -> u8 {
    field & 0x07
}

fn seg(field: u8) -> u8 {
    field & 0x03
}

fn read_word<E>(next: &mut impl FnMut() -> Result<u8, E>) -> Result<u16, E> {
    let lo = next()?;
    let hi = next()?;
    Ok(u16::from_le_bytes([lo, hi]))
}

/// Reads the operand bytes for `mode` and splits them into fields.
///
/// # Arguments
///
/// * `mode` - Operand shape from the instruction descriptor
/// * `field` - Value packed into the opcode (opcode byte minus the row's base opcode)
/// * `next` - Fetches the next operand byte
///
/// # Examples
///
/// ```
/// use libmicro::addressing::{decode_operands, AddressingMode, Operands};
///
/// let mut bytes = [0x12u8, 0x34, 0x12].into_iter();
/// let ops = decode_operands(AddressingMode::IndexedLoad, 0, || bytes.next().ok_or(()));
/// assert_eq!(ops, Ok(Operands::Indexed { reg: 1, base: 2, disp: 0x1234 }));
/// ```
pub fn decode_operands<E>(
    mode: AddressingMode,
    field: u8,
    mut next: impl FnMut() -> Result<u8, E>,
) -> Result<Operands, E> {
    use AddressingMode::*;

    let operands = match mode {
        Implicit => Operands::None,
        PackedNibble => Operands::Immediate((field & 0x0F) as u16),
        Direct8 => Operands::Address(next()? as u16),
        OpcodeRegister => Operands::Register(reg(field)),
        OpcodeRegisterImm8 => Operands::RegisterImmediate {
            reg: reg(field),
            imm: next()? as u16,
        },
        OpcodeRegisterDirect => Operands::RegisterAddress {
            reg: reg(field),
            address: read_word(&mut next)?,
        },
        OpcodeRegisterZeroPage => Operands::RegisterAddress {
            reg: reg(field),
            address: next()? as u16,
        },
        Register | RegisterIndirect => Operands::Register(reg(next()?)),
        RegisterImm8 => {
            let r = reg(next()?);
            Operands::RegisterImmediate {
                reg: r,
                imm: next()? as u16,
            }
        }
        RegisterDisplaced8 => {
            let r = reg(next()?);
            Operands::RegisterDisplacement {
                reg: r,
                disp: next()? as i8 as i16,
            }
        }
        RegisterPair => {
            let b = next()?;
            Operands::RegisterPair {
                dst: reg(b >> 4),
                src: reg(b),
            }
        }
        Immediate8 => Operands::Immediate(next()? as u16),
        Immediate16 => Operands::Immediate(read_word(&mut next)?),
        Absolute => Operands::Address(read_word(&mut next)?),
        Relative => Operands::Relative(next()? as i8),
        PortIn8 => {
            let r = reg(next()?);
            Operands::Port {
                reg: r,
                port: next()? as u16,
            }
        }
        PortOut8 => {
            let port = next()? as u16;
            Operands::Port {
                reg: reg(next()?),
                port,
            }
        }
        RegisterImm16 => {
            let r = reg(next()?);
            Operands::RegisterImmediate {
                reg: r,
                imm: read_word(&mut next)?,
            }
        }
        RegisterDirect => {
            let r = reg(next()?);
            Operands::RegisterAddress {
                reg: r,
                address: read_word(&mut next)?,
            }
        }
        RegisterPort16 => {
            let r = reg(next()?);
            Operands::Port {
                reg: r,
                port: read_word(&mut next)?,
            }
        }
        IndexedLoad => {
            let b = next()?;
            Operands::Indexed {
                reg: reg(b >> 4),
                base: reg(b),
                disp: read_word(&mut next)? as i16,
            }
        }
        IndexedStore => {
            let b = next()?;
            Operands::Indexed {
                reg: reg(b),
                base: reg(b >> 4),
                disp: read_word(&mut next)? as i16,
            }
        }
        StackRelative => {
            let r = reg(next()?);
            Operands::RegisterDisplacement {
                reg: r,
                disp: read_word(&mut next)? as i16,
            }
        }
        SegmentFromRegister => {
            let b = next()?;
            Operands::SegmentRegister {
                seg: seg(b >> 4),
                reg: reg(b),
            }
        }
        RegisterFromSegment => {
            let b = next()?;
            Operands::SegmentRegister {
                seg: seg(b),
                reg: reg(b >> 4),
            }
        }
        Segment => Operands::Segment(seg(next()?)),
        ShiftCount => {
            let b = next()?;
            Operands::ShiftCount {
                reg: reg(b >> 4),
                count: b & 0x0F,
            }
        }
        Frame => {
            let size = read_word(&mut next)?;
            Operands::Frame {
                size,
                level: next()?,
            }
        }
        Far => {
            let offset = read_word(&mut next)?;
            Operands::Far {
                segment: read_word(&mut next)?,
                offset,
            }
        }
        Prefix => Operands::Prefix(next()?),
    };

    Ok(operands)
}

/// Encodes `operands` for `mode`, appending the operand bytes to `out`.
///
/// Returns the value to add to the row's base opcode for packed modes (0 otherwise), or
/// `None` when the operand fields do not fit the shape.
pub fn encode_operands(
    mode: AddressingMode,
    operands: &Operands,
    out: &mut Vec<u8>,
) -> Option<u8> {
    use AddressingMode::*;

    let packed = |a: u8, b: u8| (a & 0x0F) << 4 | (b & 0x0F);

    match (mode, *operands) {
        (Implicit, Operands::None) => {}
        (PackedNibble, Operands::Immediate(n)) if n <= 0x0F => return Some(n as u8),
        (Direct8, Operands::Address(a)) => out.push(a as u8),
        (OpcodeRegister, Operands::Register(r)) => return Some(reg(r)),
        (OpcodeRegisterImm8, Operands::RegisterImmediate { reg: r, imm }) => {
            out.push(imm as u8);
            return Some(reg(r));
        }
        (OpcodeRegisterDirect, Operands::RegisterAddress { reg: r, address }) => {
            out.extend_from_slice(&address.to_le_bytes());
            return Some(reg(r));
        }
        (OpcodeRegisterZeroPage, Operands::RegisterAddress { reg: r, address }) => {
            out.push(address as u8);
            return Some(reg(r));
        }
        (Register | RegisterIndirect, Operands::Register(r)) => out.push(reg(r)),
        (RegisterImm8, Operands::RegisterImmediate { reg: r, imm }) => {
            out.extend_from_slice(&[reg(r), imm as u8]);
        }
        (RegisterDisplaced8, Operands::RegisterDisplacement { reg: r, disp }) => {
            out.extend_from_slice(&[reg(r), disp as i8 as u8]);
        }
        (RegisterPair, Operands::RegisterPair { dst, src }) => out.push(packed(dst, src)),
        (Immediate8, Operands::Immediate(v)) => out.push(v as u8),
        (Immediate16, Operands::Immediate(v)) | (Absolute, Operands::Address(v)) => {
            out.extend_from_slice(&v.to_le_bytes());
        }
        (Relative, Operands::Relative(d)) => out.push(d as u8),
        (PortIn8, Operands::Port { reg: r, port }) => out.extend_from_slice(&[reg(r), port as u8]),
        (PortOut8, Operands::Port { reg: r, port }) => out.extend_from_slice(&[port as u8, reg(r)]),
        (RegisterImm16, Operands::RegisterImmediate { reg: r, imm: v })
        | (RegisterDirect, Operands::RegisterAddress { reg: r, address: v })
        | (RegisterPort16, Operands::Port { reg: r, port: v }) => {
            out.push(reg(r));
            out.extend_from_slice(&v.to_le_bytes());
        }
        (IndexedLoad, Operands::Indexed { reg: r, base, disp }) => {
            out.push(packed(reg(r), reg(base)));
            out.extend_from_slice(&disp.to_le_bytes());
        }
        (IndexedStore, Operands::Indexed { reg: r, base, disp }) => {
            out.push(packed(reg(base), reg(r)));
            out.extend_from_slice(&disp.to_le_bytes());
        }
        (StackRelative, Operands::RegisterDisplacement { reg: r, disp }) => {
            out.push(reg(r));
            out.extend_from_slice(&disp.to_le_bytes());
        }
        (SegmentFromRegister, Operands::SegmentRegister { seg: s, reg: r }) => {
            out.push(packed(seg(s), reg(r)));
        }
        (RegisterFromSegment, Operands::SegmentRegister { seg: s, reg: r }) => {
            out.push(packed(reg(r), seg(s)));
        }
        (Segment, Operands::Segment(s)) => out.push(seg(s)),
        (ShiftCount, Operands::ShiftCount { reg: r, count }) if count <= 0x0F => {
            out.push(packed(reg(r), count));
        }
        (Frame, Operands::Frame { size, level }) => {
            out.extend_from_slice(&size.to_le_bytes());
            out.push(level);
        }
        (Far, Operands::Far { segment, offset }) => {
            out.extend_from_slice(&offset.to_le_bytes());
            out.extend_from_slice(&segment.to_le_bytes());
        }
        (Prefix, Operands::Prefix(op)) => out.push(op),
        _ => return None,
    }

    Some(0)
}
