//! Instruction decoder for the disassembler

use crate::disassembler::Instruction;
use crate::opcodes::{self, InstructionDescriptor};
use crate::{micro16, micro4, micro8, Architecture};

/// Decode a single instruction from a slice of memory cells
///
/// # Arguments
///
/// * `arch` - Instruction set to decode with
/// * `cells` - Memory starting at the instruction (nibble cells on Micro4)
/// * `address` - The memory address of this instruction
///
/// # Returns
///
/// `Some(Instruction)` for a known opcode with all its operand bytes present, `None`
/// for an unknown opcode or a truncated instruction
pub fn decode_instruction(arch: Architecture, cells: &[u8], address: u32) -> Option<Instruction> {
    match arch {
        Architecture::Micro4 => decode_with(arch, micro4::opcodes::INSTRUCTION_TABLE, cells, address),
        Architecture::Micro8 => decode_with(arch, micro8::opcodes::INSTRUCTION_TABLE, cells, address),
        Architecture::Micro16 => {
            decode_with(arch, micro16::opcodes::INSTRUCTION_TABLE, cells, address)
        }
    }
}

fn decode_with<O>(
    arch: Architecture,
    table: &'static [InstructionDescriptor<O>],
    cells: &[u8],
    address: u32,
) -> Option<Instruction> {
    // Micro4 stores each byte as two nibble cells, high nibble first
    let unit = if arch == Architecture::Micro4 { 2 } else { 1 };
    let mut pos = 0usize;
    let mut next = || -> Result<u8, ()> {
        let byte = match unit {
            2 => {
                let hi = *cells.get(pos).ok_or(())?;
                let lo = *cells.get(pos + 1).ok_or(())?;
                (hi & 0x0F) << 4 | (lo & 0x0F)
            }
            _ => *cells.get(pos).ok_or(())?,
        };
        pos += unit;
        Ok(byte)
    };

    let opcode = next().ok()?;
    let decoded = opcodes::decode(table, opcode, &mut next).ok()??;
    let descriptor = decoded.descriptor;
    let size = descriptor.size_bytes() as usize * unit;

    Some(Instruction {
        architecture: arch,
        address,
        opcode,
        mnemonic: descriptor.mnemonic,
        addressing_mode: descriptor.mode,
        implied: descriptor.implied,
        operands: decoded.operands,
        bytes: cells[..size].to_vec(),
        base_cycles: descriptor.cycles,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::addressing::{AddressingMode, Operands};

    #[test]
    fn test_decode_ldi_packed_register() {
        let instr = decode_instruction(Architecture::Micro8, &[0x07, 0x42], 0x0200).unwrap();

        assert_eq!(instr.address, 0x0200);
        assert_eq!(instr.opcode, 0x07);
        assert_eq!(instr.mnemonic, "LDI");
        assert_eq!(instr.addressing_mode, AddressingMode::OpcodeRegisterImm8);
        assert_eq!(instr.operands, Operands::RegisterImmediate { reg: 1, imm: 0x42 });
        assert_eq!(instr.size(), 2);
    }

    #[test]
    fn test_decode_far_jump() {
        let instr =
            decode_instruction(Architecture::Micro16, &[0xA1, 0x20, 0x00, 0x00, 0x10], 0).unwrap();

        assert_eq!(instr.mnemonic, "JMP");
        assert_eq!(
            instr.operands,
            Operands::Far {
                segment: 0x1000,
                offset: 0x0020
            }
        );
        assert_eq!(instr.bytes.len(), 5);
        assert_eq!(instr.base_cycles, 5);
    }

    #[test]
    fn test_decode_micro4_nibbles() {
        let instr = decode_instruction(Architecture::Micro4, &[0x1, 0x0, 0x2, 0xC], 0x10).unwrap();

        assert_eq!(instr.mnemonic, "LDA");
        assert_eq!(instr.operands, Operands::Address(0x2C));
        assert_eq!(instr.bytes, vec![0x1, 0x0, 0x2, 0xC]);
    }

    #[test]
    fn test_decode_rejects_unknown_and_truncated() {
        assert!(decode_instruction(Architecture::Micro4, &[0x9, 0x0], 0).is_none());
        assert!(decode_instruction(Architecture::Micro4, &[0x1, 0x0, 0x2], 0).is_none());
        assert!(decode_instruction(Architecture::Micro16, &[0x11, 0x00, 0x05], 0).is_none());
        assert!(decode_instruction(Architecture::Micro8, &[], 0).is_none());
    }
}
