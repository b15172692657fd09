//! Micro8 dialect
//!
//! Registers `R0`-`R7` with the aliases `A B C D E H L` for `R0`-`R6`. `HL`, `BC`, `DE`
//! and `SP` name register pairs and only appear where an instruction spells them out
//! (`LDI16 HL,#addr`, `LD R0,[HL+2]`).
//!
//! Register-register arithmetic and logic always write R0, so `ADD R0,R3` and `ADD R3`
//! are the same instruction and any other destination is an error.

use super::encoder::{encode_with_table, Context, Encoder, Syntax};
use super::parser::Operand;
use super::{AssemblerError, Directive, ErrorType};
use crate::micro8::opcodes::INSTRUCTION_TABLE;

const ALIASES: [&str; 7] = ["A", "B", "C", "D", "E", "H", "L"];
const PAIRS: [&str; 4] = ["HL", "BC", "DE", "SP"];

/// Mnemonics whose register form encodes only the source (R0 is the destination).
const R0_DESTINATION: [&str; 8] = ["ADD", "ADC", "SUB", "SBC", "CMP", "AND", "OR", "XOR"];

/// Mnemonics written `OP Rs,[mem]` that also accept `OP [mem],Rs`.
const STORES: [&str; 2] = ["ST", "STZ"];

/// Encoder for the 8-bit machine.
pub struct Micro8Encoder;

impl Syntax for Micro8Encoder {
    fn register(&self, name: &str) -> Option<u8> {
        numbered_register(name).or_else(|| {
            ALIASES
                .iter()
                .position(|a| a.eq_ignore_ascii_case(name))
                .map(|i| i as u8)
        })
    }

    fn is_reserved(&self, name: &str) -> bool {
        self.register(name).is_some() || PAIRS.iter().any(|p| p.eq_ignore_ascii_case(name))
    }
}

/// `R0`-`R7`, shared by the 8- and 16-bit dialects.
pub(super) fn numbered_register(name: &str) -> Option<u8> {
    let digits = name.strip_prefix(&['R', 'r'][..])?;
    match digits.as_bytes() {
        [d @ b'0'..=b'7'] => Some(d - b'0'),
        _ => None,
    }
}

/// Puts register-first syntax on `OP [mem],Rs` / `OUT port,Rs` forms.
pub(super) fn register_first(syntax: &dyn Syntax, operands: &mut [Operand]) {
    let is_register = |op: &Operand| op.as_name().and_then(|n| syntax.register(n)).is_some();
    if operands.len() == 2 && !is_register(&operands[0]) && is_register(&operands[1]) {
        operands.swap(0, 1);
    }
}

impl Encoder for Micro8Encoder {
    fn supports(&self, directive: Directive) -> bool {
        !matches!(directive, Directive::Dd | Directive::Segment)
    }

    fn encode(
        &self,
        mnemonic: &str,
        operands: &[Operand],
        ctx: &Context,
    ) -> Result<Vec<u8>, AssemblerError> {
        let mnemonic = mnemonic.to_ascii_uppercase();
        let mut operands = operands.to_vec();

        if R0_DESTINATION.contains(&mnemonic.as_str()) && operands.len() == 2 {
            if let Some(dst) = operands[0].as_name().and_then(|n| self.register(n)) {
                if dst != 0 {
                    return Err(AssemblerError::new(
                        ErrorType::InvalidOperand,
                        "Destination must be R0",
                    ));
                }
                operands.remove(0);
            }
        }

        if STORES.contains(&mnemonic.as_str()) || mnemonic == "OUT" {
            register_first(self, &mut operands);
        }

        encode_with_table(INSTRUCTION_TABLE, self, &mnemonic, &operands, ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembler::parser::{parse_line, Body};
    use crate::assembler::symbol_table::SymbolTable;

    fn bytes(line: &str) -> Result<Vec<u8>, AssemblerError> {
        let Body::Operation { mnemonic, operands } = parse_line(line).unwrap().body else {
            panic!("not an instruction");
        };
        let symbols = SymbolTable::new(4, 4);
        let ctx = Context {
            symbols: &symbols,
            address: 0x0200,
            final_pass: true,
        };
        Micro8Encoder.encode(&mnemonic, &operands, &ctx)
    }

    #[test]
    fn test_register_names() {
        let enc = Micro8Encoder;
        assert_eq!(enc.register("r7"), Some(7));
        assert_eq!(enc.register("A"), Some(0));
        assert_eq!(enc.register("l"), Some(6));
        assert_eq!(enc.register("R8"), None);
        assert_eq!(enc.register("R10"), None);
        assert_eq!(enc.register("HL"), None);
        assert!(enc.is_reserved("hl"));
        assert!(!enc.is_reserved("loop"));
    }

    #[test]
    fn test_loads_and_stores() {
        assert_eq!(bytes("LDI R1,#0x42").unwrap(), vec![0x07, 0x42]);
        assert_eq!(bytes("LD R2,[0x1234]").unwrap(), vec![0x10, 0x34, 0x12]);
        assert_eq!(bytes("LDZ R0,[0x80]").unwrap(), vec![0x16, 0x80]);
        assert_eq!(bytes("LD A,[HL]").unwrap(), vec![0x2E, 0x00]);
        assert_eq!(bytes("ST R3,[HL+4]").unwrap(), vec![0x31, 0x03, 0x04]);
        assert_eq!(bytes("ST [0x8000],B").unwrap(), vec![0x1F, 0x00, 0x80]);
        assert_eq!(bytes("ST [HL-1],R2").unwrap(), vec![0x31, 0x02, 0xFF]);
    }

    #[test]
    fn test_r0_destination_rule() {
        assert_eq!(bytes("ADD R0,R3").unwrap(), vec![0x43]);
        assert_eq!(bytes("ADD R3").unwrap(), vec![0x43]);
        assert_eq!(bytes("xor a,b").unwrap(), vec![0xB1]);

        let err = bytes("ADD R1,R2").unwrap_err();
        assert_eq!(err.error_type, ErrorType::InvalidOperand);
        assert_eq!(err.message, "Destination must be R0");
    }

    #[test]
    fn test_pairs_and_ports() {
        assert_eq!(bytes("LDI16 HL,#0x1234").unwrap(), vec![0x32, 0x34, 0x12]);
        assert_eq!(bytes("LDI16 SP,0xFF00").unwrap(), vec![0x35, 0x00, 0xFF]);
        assert_eq!(bytes("ADD16 HL,DE").unwrap(), vec![0x95]);
        assert_eq!(bytes("INC16 BC").unwrap(), vec![0x92]);
        assert_eq!(bytes("JP HL").unwrap(), vec![0xCE]);
        assert_eq!(bytes("MOV16 SP,HL").unwrap(), vec![0x37]);
        assert_eq!(bytes("MOV B,C").unwrap(), vec![0xF0, 0x12]);
        assert_eq!(bytes("IN R0,0x10").unwrap(), vec![0xED, 0x00, 0x10]);
        assert_eq!(bytes("OUT 0x10,A").unwrap(), vec![0xEE, 0x10, 0x00]);
    }

    #[test]
    fn test_displacement_range() {
        assert!(bytes("LD R0,[HL+127]").is_ok());
        let err = bytes("LD R0,[HL+128]").unwrap_err();
        assert_eq!(err.error_type, ErrorType::RangeError);
    }

    #[test]
    fn test_relative_jump_from_origin() {
        // JR at 0x0200 lands on 0x0202 + offset
        let Body::Operation { mnemonic, operands } = parse_line("JRZ 0x01F0").unwrap().body else {
            unreachable!()
        };
        let symbols = SymbolTable::new(4, 4);
        let ctx = Context {
            symbols: &symbols,
            address: 0x0200,
            final_pass: true,
        };
        let bytes = Micro8Encoder.encode(&mnemonic, &operands, &ctx).unwrap();
        assert_eq!(bytes, vec![0xCA, 0xEE]);
    }
}
