//! Formatting functions for disassembled instructions

use std::fmt::Write;

use crate::addressing::{AddressingMode, Operands};
use crate::disassembler::{DisassemblyOptions, Instruction};
use crate::opcodes::find_by_opcode;
use crate::{micro16, Architecture};

const MICRO16_REGISTERS: [&str; 8] = ["AX", "BX", "CX", "DX", "SI", "DI", "BP", "R7"];
const MICRO16_SEGMENTS: [&str; 4] = ["CS", "DS", "SS", "ES"];

/// Format a single instruction as assembly text
///
/// Register operands come first except for `OUT`, matching the assembler's input
/// syntax; relative jumps show their absolute target.
pub fn format_instruction(instr: &Instruction) -> String {
    let operand = format_operand(instr);
    let implied = instr.implied;

    let operand = if implied.ends_with(',') {
        format!("{}{}", implied, operand)
    } else if implied.starts_with(',') {
        format!("{}{}", operand, implied)
    } else if !implied.is_empty() {
        implied.to_string()
    } else {
        operand
    };

    if operand.is_empty() {
        instr.mnemonic.to_string()
    } else {
        format!("{} {}", instr.mnemonic, operand)
    }
}

/// Formats instructions one per line, optionally with addresses and raw cells.
///
/// ```text
/// 0200  06 2A     LDI R0,#0x2A
/// ```
pub fn format_listing(instructions: &[Instruction], options: &DisassemblyOptions) -> String {
    let mut out = String::new();
    for instr in instructions {
        if options.show_offsets {
            let width = match instr.architecture {
                Architecture::Micro4 => 2,
                Architecture::Micro8 => 4,
                Architecture::Micro16 => 5,
            };
            let _ = write!(out, "{:0width$X}  ", instr.address, width = width);
        }
        if options.hex_dump {
            let cells: Vec<String> = instr.bytes.iter().map(|b| format!("{:02X}", b)).collect();
            let _ = write!(out, "{:<16}", cells.join(" "));
        }
        out.push_str(&format_instruction(instr));
        out.push('\n');
    }
    out
}

fn register(arch: Architecture, n: u8) -> String {
    match arch {
        Architecture::Micro16 => MICRO16_REGISTERS[(n & 0x07) as usize].to_string(),
        _ => format!("R{}", n),
    }
}

fn segment(n: u8) -> &'static str {
    MICRO16_SEGMENTS[(n & 0x03) as usize]
}

fn hex8(v: u16) -> String {
    format!("0x{:02X}", v)
}

fn hex16(v: u16) -> String {
    format!("0x{:04X}", v)
}

/// `[BASE]`, `[BASE+n]` or `[BASE-n]`
fn based(base: &str, disp: i16) -> String {
    match disp {
        0 => format!("[{}]", base),
        d if d < 0 => format!("[{}-{}]", base, -(d as i32)),
        d => format!("[{}+{}]", base, d),
    }
}

/// Format the operand based on addressing mode
fn format_operand(instr: &Instruction) -> String {
    use AddressingMode::*;

    let arch = instr.architecture;
    let reg = |n: u8| register(arch, n);

    if instr.is_data() {
        return format!("0x{:02X}", instr.opcode);
    }

    match (instr.addressing_mode, instr.operands) {
        (Implicit, _) => String::new(),
        (PackedNibble, Operands::Immediate(n)) => format!("#0x{:X}", n),
        (Direct8, Operands::Address(a)) => hex8(a),
        (OpcodeRegister | Register, Operands::Register(r)) => reg(r),
        (RegisterIndirect, Operands::Register(r)) => format!("{},[HL]", reg(r)),
        // `[HL]` alone is the non-displaced opcode
        (RegisterDisplaced8, Operands::RegisterDisplacement { reg: r, disp: 0 }) => {
            format!("{},[HL+0]", reg(r))
        }
        (RegisterDisplaced8, Operands::RegisterDisplacement { reg: r, disp }) => {
            format!("{},{}", reg(r), based("HL", disp))
        }
        (StackRelative, Operands::RegisterDisplacement { reg: r, disp }) => {
            format!("{},{}", reg(r), based("SP", disp))
        }
        (OpcodeRegisterImm8 | RegisterImm8, Operands::RegisterImmediate { reg: r, imm }) => {
            format!("{},#{}", reg(r), hex8(imm))
        }
        (RegisterImm16, Operands::RegisterImmediate { reg: r, imm }) => {
            format!("{},#{}", reg(r), hex16(imm))
        }
        (OpcodeRegisterZeroPage, Operands::RegisterAddress { reg: r, address }) => {
            format!("{},[{}]", reg(r), hex8(address))
        }
        (OpcodeRegisterDirect | RegisterDirect, Operands::RegisterAddress { reg: r, address }) => {
            format!("{},[{}]", reg(r), hex16(address))
        }
        (RegisterPair, Operands::RegisterPair { dst, src }) => format!("{},{}", reg(dst), reg(src)),
        (Immediate8, Operands::Immediate(v)) => hex8(v),
        (Immediate16, Operands::Immediate(v)) if !instr.implied.is_empty() => {
            format!("#{}", hex16(v))
        }
        (Immediate16, Operands::Immediate(v)) => hex16(v),
        (Absolute, Operands::Address(a)) => hex16(a),
        (Relative, Operands::Relative(offset)) => {
            let target = (instr.address + instr.size()) as i64 + offset as i64;
            format!("0x{:04X}", target)
        }
        (PortIn8, Operands::Port { reg: r, port }) => format!("{},{}", reg(r), hex8(port)),
        (PortOut8, Operands::Port { reg: r, port }) => format!("{},{}", hex8(port), reg(r)),
        (RegisterPort16, Operands::Port { reg: r, port }) => {
            if instr.mnemonic.starts_with("OUT") {
                format!("{},{}", hex16(port), reg(r))
            } else {
                format!("{},{}", reg(r), hex16(port))
            }
        }
        (IndexedLoad | IndexedStore, Operands::Indexed { reg: r, base, disp }) => {
            format!("{},{}", reg(r), based(&reg(base), disp))
        }
        (SegmentFromRegister, Operands::SegmentRegister { seg, reg: r }) => {
            format!("{},{}", segment(seg), reg(r))
        }
        (RegisterFromSegment, Operands::SegmentRegister { seg, reg: r }) => {
            format!("{},{}", reg(r), segment(seg))
        }
        (Segment, Operands::Segment(s)) => segment(s).to_string(),
        (ShiftCount, Operands::ShiftCount { reg: r, count: 0 }) => format!("{},CL", reg(r)),
        (ShiftCount, Operands::ShiftCount { reg: r, count }) => format!("{},{}", reg(r), count),
        (Frame, Operands::Frame { size, level }) => format!("{},{}", size, level),
        (Far, Operands::Far { segment, offset }) => format!("{}:{}", hex16(segment), hex16(offset)),
        (Prefix, Operands::Prefix(op)) => find_by_opcode(micro16::opcodes::INSTRUCTION_TABLE, op)
            .map(|d| d.mnemonic.to_string())
            .unwrap_or_else(|| hex8(op as u16)),
        (mode, operands) => format!("?{:?}/{:?}", mode, operands),
    }
}
