//! Micro4 dialect
//!
//! Eight accumulator instructions, no registers. Operands are nibble-cell addresses
//! (`LDA 0x20`, `LDA [0x20]`) or a 4-bit immediate (`LDI 5`, `LDI #5`). Each encoded
//! byte is returned as two cells, high nibble first.

use super::encoder::{encode_with_table, Context, Encoder, Syntax};
use super::parser::Operand;
use super::{AssemblerError, Directive};
use crate::micro4::opcodes::INSTRUCTION_TABLE;

/// Encoder for the 4-bit machine.
pub struct Micro4Encoder;

impl Syntax for Micro4Encoder {
    fn register(&self, _name: &str) -> Option<u8> {
        None
    }

    fn is_reserved(&self, _name: &str) -> bool {
        false
    }
}

impl Encoder for Micro4Encoder {
    fn cell_bits(&self) -> u32 {
        4
    }

    fn supports(&self, directive: Directive) -> bool {
        matches!(directive, Directive::Org | Directive::Db | Directive::Ds)
    }

    fn encode(
        &self,
        mnemonic: &str,
        operands: &[Operand],
        ctx: &Context,
    ) -> Result<Vec<u8>, AssemblerError> {
        let bytes = encode_with_table(INSTRUCTION_TABLE, self, mnemonic, operands, ctx)?;
        Ok(bytes.iter().flat_map(|b| [b >> 4, b & 0x0F]).collect())
    }
}
