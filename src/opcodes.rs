//! # Instruction Descriptor Tables
//!
//! Each architecture publishes one static table of `InstructionDescriptor` rows. That
//! table is the single source of truth for mnemonic, opcode, operand shape, length and
//! cycle cost; the CPU decoder, the assembler encoder and the disassembler all look
//! instructions up here.
//!
//! Rows whose shape packs a register (or a nibble) into the opcode cover a whole opcode
//! range: `opcode` is the base, and the fetched byte minus the base is the packed field.
//! Bases need not be aligned (Micro8's `LDI R0` is 0x06, `LDI R7` is 0x0D).

use crate::addressing::{decode_operands, encode_operands, AddressingMode, Operands};

/// One row of an architecture's instruction table.
///
/// `O` is the architecture's operation enum, so the executor can dispatch on a typed
/// operation rather than on opcode numbers.
///
/// # Examples
///
/// ```
/// use libmicro::micro8::opcodes::{Op, INSTRUCTION_TABLE};
/// use libmicro::opcodes::find_by_opcode;
///
/// let inc_r3 = find_by_opcode(INSTRUCTION_TABLE, 0x73).unwrap();
/// assert_eq!(inc_r3.mnemonic, "INC");
/// assert_eq!(inc_r3.op, Op::Inc);
/// assert_eq!(inc_r3.size_bytes(), 1);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstructionDescriptor<O: 'static> {
    /// Canonical mnemonic used by the disassembler.
    pub mnemonic: &'static str,

    /// Opcode byte (base of the range for packed shapes).
    pub opcode: u8,

    /// Typed operation executed by the CPU.
    pub op: O,

    /// Operand shape.
    pub mode: AddressingMode,

    /// Operand text fixed by the opcode itself (e.g. `HL,BC` for `ADD16`), empty if none.
    ///
    /// A trailing comma places the text before the decoded operands (`SP,` for
    /// `ADD SP,#imm`), a leading comma after them (`,SP` for `MOV AX,SP`).
    pub implied: &'static str,

    /// Cycle cost including the opcode fetch.
    ///
    /// Repeated string operations add a per-iteration cost on top of this.
    pub cycles: u8,
}

impl<O> InstructionDescriptor<O> {
    /// Total instruction length in bytes (opcode + operands).
    pub const fn size_bytes(&self) -> u8 {
        1 + self.mode.operand_len()
    }

    /// Number of consecutive opcodes this row covers.
    pub const fn span(&self) -> u16 {
        1 << self.mode.packed_bits()
    }

    /// Returns true if the fetched `byte` selects this row.
    pub fn matches(&self, byte: u8) -> bool {
        let byte = byte as u16;
        let base = self.opcode as u16;
        byte >= base && byte < base + self.span()
    }
}

/// An instruction with its operand fields split out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decoded<O: 'static> {
    /// The matching table row.
    pub descriptor: &'static InstructionDescriptor<O>,

    /// The raw opcode byte as fetched.
    pub opcode: u8,

    /// Operand fields.
    pub operands: Operands,
}

/// Looks up the row selected by an opcode byte.
pub fn find_by_opcode<O>(
    table: &'static [InstructionDescriptor<O>],
    byte: u8,
) -> Option<&'static InstructionDescriptor<O>> {
    table.iter().find(|d| d.matches(byte))
}

/// Looks up the row for a typed operation.
pub fn find_by_op<O: PartialEq>(
    table: &'static [InstructionDescriptor<O>],
    op: O,
) -> Option<&'static InstructionDescriptor<O>> {
    table.iter().find(|d| d.op == op)
}

/// Decodes one instruction whose opcode byte has already been fetched.
///
/// # Returns
///
/// - `Ok(Some(decoded))` for a known opcode
/// - `Ok(None)` for an opcode with no table row
/// - `Err(e)` if fetching an operand byte failed
pub fn decode<O, E>(
    table: &'static [InstructionDescriptor<O>],
    opcode: u8,
    next: impl FnMut() -> Result<u8, E>,
) -> Result<Option<Decoded<O>>, E> {
    let descriptor = match find_by_opcode(table, opcode) {
        Some(d) => d,
        None => return Ok(None),
    };
    let operands = decode_operands(descriptor.mode, opcode - descriptor.opcode, next)?;
    Ok(Some(Decoded {
        descriptor,
        opcode,
        operands,
    }))
}

/// Encodes `operands` with `descriptor`, returning the instruction bytes.
///
/// Returns `None` when the operands do not fit the descriptor's shape.
pub fn encode<O>(descriptor: &InstructionDescriptor<O>, operands: &Operands) -> Option<Vec<u8>> {
    let mut operand_bytes = Vec::with_capacity(descriptor.mode.operand_len() as usize);
    let field = encode_operands(descriptor.mode, operands, &mut operand_bytes)?;

    let mut bytes = Vec::with_capacity(operand_bytes.len() + 1);
    bytes.push(descriptor.opcode.wrapping_add(field));
    bytes.extend_from_slice(&operand_bytes);
    Some(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::micro16::opcodes::{Op as Op16, INSTRUCTION_TABLE as TABLE16};
    use crate::micro4::opcodes::INSTRUCTION_TABLE as TABLE4;
    use crate::micro8::opcodes::INSTRUCTION_TABLE as TABLE8;

    fn assert_no_overlap<O: std::fmt::Debug>(table: &'static [InstructionDescriptor<O>]) {
        for byte in 0..=255u8 {
            let hits = table.iter().filter(|d| d.matches(byte)).count();
            assert!(hits <= 1, "opcode 0x{:02X} matches {} rows", byte, hits);
        }
    }

    #[test]
    fn test_tables_have_no_overlapping_rows() {
        assert_no_overlap(TABLE4);
        assert_no_overlap(TABLE8);
        assert_no_overlap(TABLE16);
    }

    #[test]
    fn test_every_row_has_a_cycle_cost() {
        assert!(TABLE4.iter().all(|d| d.cycles > 0));
        assert!(TABLE8.iter().all(|d| d.cycles > 0));
        assert!(TABLE16.iter().all(|d| d.cycles > 0));
    }

    #[test]
    fn test_encode_decode_agree() {
        let add = find_by_op(TABLE16, Op16::AddRi).unwrap();
        let ops = Operands::RegisterImmediate { reg: 2, imm: 0xBEEF };
        let bytes = encode(add, &ops).unwrap();
        assert_eq!(bytes, vec![0x51, 0x02, 0xEF, 0xBE]);

        let mut rest = bytes[1..].iter().copied();
        let decoded = decode(TABLE16, bytes[0], || rest.next().ok_or(()))
            .unwrap()
            .unwrap();
        assert_eq!(decoded.descriptor.op, Op16::AddRi);
        assert_eq!(decoded.operands, ops);
    }

    #[test]
    fn test_unknown_opcode_decodes_to_none() {
        let result = decode(TABLE16, 0xFF, || Err::<u8, ()>(()));
        assert_eq!(result, Ok(None));
    }
}
