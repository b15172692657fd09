//! Flag arithmetic across the three register widths.
//!
//! The 4-bit adder is checked exhaustively; the 8-bit adder with proptest; the 16-bit
//! adder at its boundary values.

use libmicro::micro16::Micro16;
use libmicro::micro4::Micro4;
use libmicro::micro8::Micro8;
use libmicro::{assemble, Architecture, Machine};
use proptest::prelude::*;

/// Expected (carry, overflow) for an unsigned add at `bits` width.
fn add_flags(a: u32, b: u32, bits: u32) -> (bool, bool) {
    let mask = (1 << bits) - 1;
    let sign = 1 << (bits - 1);
    let r = (a + b) & mask;
    let carry = a + b > mask;
    let overflow = (a & sign) == (b & sign) && (r & sign) != (a & sign);
    (carry, overflow)
}

fn micro8_add(a: u8, b: u8) -> Micro8 {
    let source = format!("LDI R0,#{}\nLDI R1,#{}\nADD R1\nHLT", a, b);
    let out = assemble(Architecture::Micro8, &source).unwrap();
    let mut cpu = Micro8::new();
    cpu.load_program(out.bytes(), out.origin());
    cpu.run(0);
    cpu
}

#[test]
fn test_micro4_add_exhaustive() {
    for a in 0u8..16 {
        for b in 0u8..16 {
            // LDI a ; ADD 0x08 ; HLT ; data b at cell 8
            let mut cpu = Micro4::new();
            cpu.load_program(&[0x7, a, 0x3, 0x0, 0x0, 0x8, 0x0, 0x0, b], 0);
            cpu.run(0);

            let sum = (a + b) & 0x0F;
            let (carry, overflow) = add_flags(a as u32, b as u32, 4);
            assert_eq!(cpu.a(), sum, "{} + {}", a, b);
            assert_eq!(cpu.flag_c(), carry, "carry {} + {}", a, b);
            assert_eq!(cpu.flag_o(), overflow, "overflow {} + {}", a, b);
            assert_eq!(cpu.flag_z(), sum == 0, "zero {} + {}", a, b);
            assert_eq!(cpu.flag_s(), sum & 0x8 != 0, "sign {} + {}", a, b);
        }
    }
}

#[test]
fn test_micro4_sub_borrow() {
    for (a, b, borrow) in [(0u8, 1u8, true), (5, 5, false), (3, 7, true), (15, 0, false)] {
        // LDI a ; SUB 0x08 ; HLT ; data b
        let mut cpu = Micro4::new();
        cpu.load_program(&[0x7, a, 0x4, 0x0, 0x0, 0x8, 0x0, 0x0, b], 0);
        cpu.run(0);
        assert_eq!(cpu.a(), a.wrapping_sub(b) & 0x0F);
        assert_eq!(cpu.flag_c(), borrow, "{} - {}", a, b);
    }
}

#[test]
fn test_micro8_add_boundaries() {
    for (a, b) in [(0u8, 0u8), (0xFF, 1), (0x7F, 1), (0x80, 0x80), (0x7F, 0x80), (0xFF, 0xFF)] {
        let cpu = micro8_add(a, b);
        let (carry, overflow) = add_flags(a as u32, b as u32, 8);
        let sum = a.wrapping_add(b);
        assert_eq!(cpu.register(0), sum);
        assert_eq!(cpu.flag_c(), carry, "carry {:#X} + {:#X}", a, b);
        assert_eq!(cpu.flag_o(), overflow, "overflow {:#X} + {:#X}", a, b);
        assert_eq!(cpu.flag_z(), sum == 0);
        assert_eq!(cpu.flag_s(), sum & 0x80 != 0);
    }
}

#[test]
fn test_micro16_add_boundaries() {
    let cases = [
        (0u16, 0u16),
        (0xFFFF, 1),
        (0x7FFF, 1),
        (0x8000, 0x8000),
        (0x8000, 0x7FFF),
        (0xFFFF, 0xFFFF),
    ];
    for (a, b) in cases {
        let source = format!("MOV AX,#{}\nMOV BX,#{}\nADD AX,BX\nHLT", a, b);
        let out = assemble(Architecture::Micro16, &source).unwrap();
        let mut cpu = Micro16::new();
        cpu.load_program(out.bytes(), out.origin());
        cpu.run(0);

        let (carry, overflow) = add_flags(a as u32, b as u32, 16);
        let sum = a.wrapping_add(b);
        assert_eq!(cpu.register(0), sum);
        assert_eq!(cpu.flag_c(), carry, "carry {:#X} + {:#X}", a, b);
        assert_eq!(cpu.flag_o(), overflow, "overflow {:#X} + {:#X}", a, b);
        assert_eq!(cpu.flag_z(), sum == 0);
        assert_eq!(cpu.flag_s(), sum & 0x8000 != 0);
    }
}

proptest! {
    #[test]
    fn prop_micro8_add_flags(a in any::<u8>(), b in any::<u8>()) {
        let cpu = micro8_add(a, b);
        let (carry, overflow) = add_flags(a as u32, b as u32, 8);
        prop_assert_eq!(cpu.register(0), a.wrapping_add(b));
        prop_assert_eq!(cpu.flag_c(), carry);
        prop_assert_eq!(cpu.flag_o(), overflow);
    }

    #[test]
    fn prop_micro8_inc_preserves_carry(v in any::<u8>(), carry in any::<bool>()) {
        let source = format!("{}\nLDI R2,#{}\nINC R2\nHLT", if carry { "SCF" } else { "NOP" }, v);
        let out = assemble(Architecture::Micro8, &source).unwrap();
        let mut cpu = Micro8::new();
        cpu.load_program(out.bytes(), out.origin());
        cpu.run(0);

        prop_assert_eq!(cpu.register(2), v.wrapping_add(1));
        prop_assert_eq!(cpu.flag_c(), carry);
        prop_assert_eq!(cpu.flag_o(), v == 0x7F);
    }
}
