//! Micro16 dialect
//!
//! Registers `R0`-`R7` with the x86-style names `AX BX CX DX SI DI BP` for `R0`-`R6`;
//! segments `CS DS SS ES`; `SP` is only valid where an instruction spells it out.
//!
//! Beyond the table's canonical mnemonics the dialect accepts:
//!
//! - `MOV` with a memory operand, as `LD`/`ST`
//! - stores and `OUT` written destination-first (`ST [BX+2],AX`, `OUT 0x40,AX`)
//! - `MUL AX,BX` meaning `MUL BX` (likewise `IMUL`, `DIV`, `IDIV`)
//! - `JE JNE JB JAE LOOPE LOOPNE REPE REPNE`
//! - `RETI` for `IRET`, and `RETI n` for `RET n`

use super::encoder::{encode_with_table, Context, Encoder, Syntax};
use super::micro8::{numbered_register, register_first};
use super::parser::Operand;
use super::{AssemblerError, Directive, ErrorType};
use crate::micro16::opcodes::{Op, INSTRUCTION_TABLE};

const NAMES: [&str; 7] = ["AX", "BX", "CX", "DX", "SI", "DI", "BP"];

/// Indexed by segment number (CS=0, DS=1, SS=2, ES=3).
const SEGMENTS: [&str; 4] = ["CS", "DS", "SS", "ES"];

const ALIASES: [(&str, &str); 8] = [
    ("JE", "JZ"),
    ("JNE", "JNZ"),
    ("JB", "JC"),
    ("JAE", "JNC"),
    ("LOOPE", "LOOPZ"),
    ("LOOPNE", "LOOPNZ"),
    ("REPE", "REPZ"),
    ("REPNE", "REPNZ"),
];

/// Encoder for the 16-bit segmented machine.
pub struct Micro16Encoder;

impl Syntax for Micro16Encoder {
    fn register(&self, name: &str) -> Option<u8> {
        numbered_register(name).or_else(|| {
            NAMES
                .iter()
                .position(|n| n.eq_ignore_ascii_case(name))
                .map(|i| i as u8)
        })
    }

    fn segment(&self, name: &str) -> Option<u8> {
        SEGMENTS
            .iter()
            .position(|s| s.eq_ignore_ascii_case(name))
            .map(|i| i as u8)
    }

    fn is_reserved(&self, name: &str) -> bool {
        self.register(name).is_some()
            || self.segment(name).is_some()
            || name.eq_ignore_ascii_case("SP")
    }
}

impl Micro16Encoder {
    /// Checks the string primitive after a repeat prefix.
    ///
    /// `REP` repeats MOVS, STOS and LODS; `REPZ`/`REPNZ` repeat only CMPS.
    fn check_repeat(&self, prefix: &str, operands: &[Operand]) -> Result<(), AssemblerError> {
        let [target] = operands else {
            return Err(AssemblerError::new(
                ErrorType::InvalidOperand,
                format!("Expected string instruction after {}", prefix),
            ));
        };
        let name = target.as_name().unwrap_or_default();

        let op = INSTRUCTION_TABLE
            .iter()
            .find(|d| d.mnemonic.eq_ignore_ascii_case(name))
            .map(|d| d.op);
        let allowed = op.is_some_and(|op| {
            let compare = matches!(op, Op::Cmpsb | Op::Cmpsw);
            match prefix {
                "REP" => op.is_string() && !compare,
                _ => compare,
            }
        });

        if allowed {
            Ok(())
        } else {
            Err(AssemblerError::new(
                ErrorType::InvalidOperand,
                format!("Invalid instruction after {}: {}", prefix, name.to_ascii_uppercase()),
            ))
        }
    }

    /// Rejects address-forming instructions with a register base.
    ///
    /// Only the direct form `LEA Rd,[addr]` has an encoding.
    fn check_direct_only(&self, mnemonic: &str, operands: &[Operand]) -> Result<(), AssemblerError> {
        if let Some(Operand::Memory(expr)) = operands.get(1) {
            let (base, _) = expr.split_base(|name| self.is_reserved(name));
            if base.is_some() {
                return Err(AssemblerError::new(
                    ErrorType::InvalidOperand,
                    format!(
                        "{m} Rd,[Rs+off] is not supported; use {m} Rd,[addr]",
                        m = mnemonic
                    ),
                ));
            }
        }
        Ok(())
    }
}

impl Encoder for Micro16Encoder {
    fn supports(&self, _directive: Directive) -> bool {
        true
    }

    fn encode(
        &self,
        mnemonic: &str,
        operands: &[Operand],
        ctx: &Context,
    ) -> Result<Vec<u8>, AssemblerError> {
        let mut mnemonic = mnemonic.to_ascii_uppercase();
        if let Some((_, canonical)) = ALIASES.iter().find(|(alias, _)| *alias == mnemonic) {
            mnemonic = canonical.to_string();
        }
        let mut operands = operands.to_vec();

        match mnemonic.as_str() {
            "RETI" if operands.is_empty() => mnemonic = "IRET".to_string(),
            "RETI" => mnemonic = "RET".to_string(),
            "MOV" if matches!(operands.get(1), Some(Operand::Memory(_))) => {
                mnemonic = "LD".to_string()
            }
            "MOV" if matches!(operands.first(), Some(Operand::Memory(_))) => {
                mnemonic = "ST".to_string()
            }
            "MUL" | "IMUL" | "DIV" | "IDIV" if operands.len() == 2 => {
                operands.remove(0);
            }
            "REP" | "REPZ" | "REPNZ" => self.check_repeat(&mnemonic, &operands)?,
            "LEA" | "LDS" | "LES" => self.check_direct_only(&mnemonic, &operands)?,
            _ => {}
        }

        if matches!(mnemonic.as_str(), "ST" | "STB" | "OUT" | "OUTB") {
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
            address: 0x0100,
            final_pass: true,
        };
        Micro16Encoder.encode(&mnemonic, &operands, &ctx)
    }

    #[test]
    fn test_register_boundary() {
        let enc = Micro16Encoder;
        assert_eq!(enc.register("bp"), Some(6));
        assert_eq!(enc.register("R7"), Some(7));
        assert_eq!(enc.register("AX1"), None);
        assert_eq!(enc.segment("es"), Some(3));
        assert_eq!(
            bytes("MOV AX1,BX").unwrap_err().error_type,
            ErrorType::InvalidOperand
        );
    }

    #[test]
    fn test_mov_forms() {
        assert_eq!(bytes("MOV DS,AX").unwrap(), vec![0x13, 0x10]);
        assert_eq!(bytes("MOV AX,ES").unwrap(), vec![0x14, 0x03]);
        assert_eq!(bytes("MOV AX,5").unwrap(), vec![0x11, 0x00, 0x05, 0x00]);
        assert_eq!(
            bytes("MOV AX,[0x2000]").unwrap(),
            vec![0x20, 0x00, 0x00, 0x20]
        );
        assert_eq!(
            bytes("MOV [0x2000],BX").unwrap(),
            vec![0x21, 0x01, 0x00, 0x20]
        );
    }

    #[test]
    fn test_store_operand_order() {
        let expected = vec![0x25, 0x10, 0x04, 0x00];
        assert_eq!(bytes("ST [BX+4],AX").unwrap(), expected);
        assert_eq!(bytes("ST AX,[BX+4]").unwrap(), expected);
        assert_eq!(
            bytes("ST [SP+2],DX").unwrap(),
            vec![0x2A, 0x03, 0x02, 0x00]
        );
        assert_eq!(
            bytes("OUT 0x40,AX").unwrap(),
            vec![0xF1, 0x00, 0x40, 0x00]
        );
        assert_eq!(
            bytes("INB CX,0x41").unwrap(),
            vec![0xF2, 0x02, 0x41, 0x00]
        );
    }

    #[test]
    fn test_aliases() {
        assert_eq!(bytes("JE 0x0200").unwrap(), vec![0xB0, 0x00, 0x02]);
        assert_eq!(bytes("JAE 0x0200").unwrap(), vec![0xB3, 0x00, 0x02]);
        assert_eq!(bytes("LOOPNE 0x0100").unwrap(), vec![0xD2, 0xFE]);
        assert_eq!(bytes("RETI").unwrap(), vec![0x05]);
        assert_eq!(bytes("RETI 4").unwrap(), vec![0xC5, 0x04, 0x00]);
        assert_eq!(bytes("MUL AX,BX").unwrap(), vec![0x60, 0x01]);
        assert_eq!(bytes("IDIV CX").unwrap(), vec![0x63, 0x02]);
    }

    #[test]
    fn test_repeat_prefixes() {
        assert_eq!(bytes("REP MOVSB").unwrap(), vec![0xE8, 0xE0]);
        assert_eq!(bytes("REP stosw").unwrap(), vec![0xE8, 0xE5]);
        assert_eq!(bytes("REPE CMPSB").unwrap(), vec![0xE9, 0xE2]);
        assert_eq!(bytes("REPNZ CMPSW").unwrap(), vec![0xEA, 0xE3]);

        for (line, message) in [
            ("REP CMPSB", "Invalid instruction after REP: CMPSB"),
            ("REPZ MOVSB", "Invalid instruction after REPZ: MOVSB"),
            ("REP NOP", "Invalid instruction after REP: NOP"),
            ("REP", "Expected string instruction after REP"),
        ] {
            let err = bytes(line).unwrap_err();
            assert_eq!(err.error_type, ErrorType::InvalidOperand, "{}", line);
            assert_eq!(err.message, message);
        }
    }

    #[test]
    fn test_lea_direct_only() {
        assert_eq!(
            bytes("LEA SI,[0x0100]").unwrap(),
            vec![0x26, 0x04, 0x00, 0x01]
        );
        let err = bytes("LEA SI,[BX+4]").unwrap_err();
        assert_eq!(err.error_type, ErrorType::InvalidOperand);
        assert_eq!(
            err.message,
            "LEA Rd,[Rs+off] is not supported; use LEA Rd,[addr]"
        );
        assert!(bytes("LDS DI,[BP]").is_err());
    }

    #[test]
    fn test_far_frame_and_segments() {
        assert_eq!(
            bytes("JMP 0x1000:0x0020").unwrap(),
            vec![0xA1, 0x20, 0x00, 0x00, 0x10]
        );
        assert_eq!(
            bytes("CALL 0xF000:0").unwrap(),
            vec![0xC1, 0x00, 0x00, 0x00, 0xF0]
        );
        assert_eq!(bytes("ENTER 8,0").unwrap(), vec![0x46, 0x08, 0x00, 0x00]);
        assert_eq!(bytes("ENTER 16").unwrap(), vec![0x46, 0x10, 0x00, 0x00]);
        assert_eq!(bytes("PUSH DS").unwrap(), vec![0x42, 0x01]);
        assert_eq!(bytes("POP SI").unwrap(), vec![0x41, 0x04]);
        assert_eq!(bytes("JMP DI").unwrap(), vec![0xA2, 0x05]);
        assert_eq!(bytes("INT 0x21").unwrap(), vec![0x04, 0x21]);
    }
}
