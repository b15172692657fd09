//! Disassembler Module
//!
//! Converts machine code back into assembly text using the same descriptor tables and
//! operand decoder the CPUs execute from. The text it produces is accepted by the
//! assembler for the same architecture.

pub mod decoder;
pub mod formatter;

pub use decoder::decode_instruction;
pub use formatter::{format_instruction, format_listing};

use crate::addressing::{AddressingMode, Operands};
use crate::Architecture;

/// A single disassembled instruction with full metadata
#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    /// Architecture the bytes were decoded for
    pub architecture: Architecture,

    /// Address of the first cell
    pub address: u32,

    /// The opcode byte (for `.db`, the undecodable cell itself)
    pub opcode: u8,

    /// Instruction mnemonic, or `.db` for data
    pub mnemonic: &'static str,

    /// Operand shape
    pub addressing_mode: AddressingMode,

    /// Operand text fixed by the opcode (see `InstructionDescriptor::implied`)
    pub implied: &'static str,

    /// Decoded operand fields
    pub operands: Operands,

    /// Raw memory cells covered (nibbles on Micro4)
    pub bytes: Vec<u8>,

    /// Base cycle cost (0 for `.db`)
    pub base_cycles: u8,
}

impl Instruction {
    /// Number of memory cells the instruction occupies.
    pub fn size(&self) -> u32 {
        self.bytes.len() as u32
    }

    /// Returns true for an undecodable cell rendered as `.db`.
    pub fn is_data(&self) -> bool {
        self.mnemonic == DATA_MNEMONIC
    }

    fn data(architecture: Architecture, address: u32, cell: u8) -> Self {
        Self {
            architecture,
            address,
            opcode: cell,
            mnemonic: DATA_MNEMONIC,
            addressing_mode: AddressingMode::Implicit,
            implied: "",
            operands: Operands::Immediate(cell as u16),
            bytes: vec![cell],
            base_cycles: 0,
        }
    }
}

const DATA_MNEMONIC: &str = ".db";

/// Options controlling disassembly output
#[derive(Debug, Clone, Copy, Default)]
pub struct DisassemblyOptions {
    /// Address of the first cell of the input
    pub start_address: u32,

    /// Include the raw cells of each instruction in listings
    pub hex_dump: bool,

    /// Include the address of each instruction in listings
    pub show_offsets: bool,
}

/// Disassemble a slice of memory cells into a vector of instructions
///
/// Cells that do not start a complete, known instruction become one-cell `.db` entries
/// and decoding resumes at the next cell.
///
/// # Examples
///
/// ```
/// use libmicro::{disassemble, format_instruction, Architecture, DisassemblyOptions};
///
/// let options = DisassemblyOptions { start_address: 0x0200, ..Default::default() };
/// let listing: Vec<String> = disassemble(Architecture::Micro8, &[0x06, 0x2A, 0x73, 0x01], options)
///     .iter()
///     .map(format_instruction)
///     .collect();
/// assert_eq!(listing, ["LDI R0,#0x2A", "INC R3", "HLT"]);
/// ```
pub fn disassemble(
    arch: Architecture,
    bytes: &[u8],
    options: DisassemblyOptions,
) -> Vec<Instruction> {
    let mut instructions = Vec::new();
    let mut pc = 0;

    while pc < bytes.len() {
        let address = options.start_address + pc as u32;
        let instr = decoder::decode_instruction(arch, &bytes[pc..], address)
            .unwrap_or_else(|| Instruction::data(arch, address, bytes[pc]));
        pc += instr.bytes.len();
        instructions.push(instr);
    }

    instructions
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disassemble_empty() {
        let instructions = disassemble(Architecture::Micro16, &[], DisassemblyOptions::default());
        assert_eq!(instructions.len(), 0);
    }

    #[test]
    fn test_unknown_and_truncated_become_data() {
        // 0xFF has no row; 0xC0 (JMP) is missing its address
        let instructions = disassemble(
            Architecture::Micro8,
            &[0xFF, 0x00, 0xC0, 0x12],
            DisassemblyOptions::default(),
        );
        let mnemonics: Vec<_> = instructions.iter().map(|i| i.mnemonic).collect();
        assert_eq!(mnemonics, [".db", "NOP", ".db", ".db"]);
        assert!(instructions[0].is_data());
        assert_eq!(instructions[3].address, 3);
    }

    #[test]
    fn test_micro4_addresses_count_cells() {
        let options = DisassemblyOptions::default();
        let instructions = disassemble(Architecture::Micro4, &[0x7, 0x5, 0x2, 0x0, 0x2, 0x0], options);
        assert_eq!(instructions.len(), 2);
        assert_eq!(instructions[1].address, 2);
        assert_eq!(instructions[1].size(), 4);
    }
}
