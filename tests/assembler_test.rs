//! Assembler behaviour observable through the public API: symbol rules, branch range,
//! architecture-specific operand restrictions and output formats.

use libmicro::disassembler::{disassemble, format_instruction};
use libmicro::{assemble, Architecture, DisassemblyOptions, ErrorType};

#[test]
fn test_relative_jump_range_limits() {
    // JR at 0x0200 is two bytes, so offsets count from 0x0202
    let forward = |gap: u32| format!("JR target\nDS {}\ntarget: HLT", gap);
    let backward = |gap: u32| format!("target: DS {}\nJR target", gap);

    let out = assemble(Architecture::Micro8, &forward(127)).unwrap();
    assert_eq!(&out.bytes()[..2], &[0xC1, 0x7F]);

    let err = assemble(Architecture::Micro8, &forward(128)).unwrap_err();
    assert_eq!(err.error_type, ErrorType::RangeError);
    assert_eq!(err.line, 1);
    assert_eq!(err.message, "Relative jump out of range: 128");

    // JR at 0x0200+126, next 0x0200+128: offset -128
    let out = assemble(Architecture::Micro8, &backward(126)).unwrap();
    assert_eq!(&out.bytes()[126..], &[0xC1, 0x80]);

    let err = assemble(Architecture::Micro8, &backward(127)).unwrap_err();
    assert_eq!(err.line, 2);
    assert_eq!(err.message, "Relative jump out of range: -129");
}

#[test]
fn test_symbols_share_one_case_insensitive_namespace() {
    let err = assemble(Architecture::Micro8, "start: NOP\nSTART: HLT").unwrap_err();
    assert_eq!(err.error_type, ErrorType::DuplicateSymbol);
    assert_eq!(err.line, 2);

    let err = assemble(Architecture::Micro8, "value EQU 3\nValue: NOP").unwrap_err();
    assert_eq!(err.error_type, ErrorType::DuplicateSymbol);

    let out = assemble(Architecture::Micro8, "Loop: NOP\nJMP LOOP").unwrap();
    assert_eq!(out.bytes(), &[0x00, 0xC0, 0x00, 0x02]);
}

#[test]
fn test_undefined_symbol_is_reported_in_second_pass() {
    let err = assemble(Architecture::Micro16, "NOP\nNOP\nJMP nowhere").unwrap_err();
    assert_eq!(err.error_type, ErrorType::UndefinedSymbol);
    assert_eq!(err.line, 3);
    assert_eq!(err.to_string(), "line 3: Undefined symbol: nowhere");
}

#[test]
fn test_label_offsets_and_character_literals() {
    let source = "\
        LDI R0,#'A'
        LDI R1,#'\\n'
        JMP table+2
table:  DB 1,2,3
";
    let out = assemble(Architecture::Micro8, source).unwrap();
    assert_eq!(
        out.bytes(),
        &[0x06, 0x41, 0x07, 0x0A, 0xC0, 0x09, 0x02, 1, 2, 3]
    );
}

#[test]
fn test_lea_only_accepts_direct_addresses() {
    let out = assemble(Architecture::Micro16, "LEA SI,[0x2000]").unwrap();
    assert_eq!(out.bytes().len(), 4);

    let err = assemble(Architecture::Micro16, "NOP\nLEA SI,[BX+4]").unwrap_err();
    assert_eq!(err.error_type, ErrorType::InvalidOperand);
    assert_eq!(err.line, 2);
}

#[test]
fn test_micro8_register_arithmetic_targets_r0() {
    let implicit = assemble(Architecture::Micro8, "ADD R3").unwrap();
    let explicit = assemble(Architecture::Micro8, "ADD R0,R3").unwrap();
    assert_eq!(implicit.bytes(), explicit.bytes());

    let err = assemble(Architecture::Micro8, "SUB R2,R3").unwrap_err();
    assert_eq!(err.message, "Destination must be R0");
}

#[test]
fn test_intel_hex_output() {
    let out = assemble(Architecture::Micro8, "LDI R0,#1\nHLT").unwrap();
    assert_eq!(out.to_intel_hex(), ":03020000060101F3\n:00000001FF\n");

    let empty = assemble(Architecture::Micro8, "; nothing\n").unwrap();
    assert_eq!(empty.to_intel_hex(), ":00000001FF\n");
}

#[test]
fn test_disassembly_reassembles_to_same_bytes() {
    let source = "\
start:  LDI R0,#0x2A
        INC R3
        MOV R1,R2
        LD R2,[0x1234]
        OUT 0x10,R3
        JR start
        JMP start
        HLT
";
    let original = assemble(Architecture::Micro8, source).unwrap();
    let options = DisassemblyOptions {
        start_address: original.origin(),
        ..Default::default()
    };
    let text: Vec<String> = disassemble(Architecture::Micro8, original.bytes(), options)
        .iter()
        .map(format_instruction)
        .collect();
    assert_eq!(text[0], "LDI R0,#0x2A");
    assert_eq!(text[5], "JR 0x0200");

    let again = assemble(Architecture::Micro8, &text.join("\n")).unwrap();
    assert_eq!(again.bytes(), original.bytes());
}

#[test]
fn test_micro4_rejects_wide_directives() {
    let err = assemble(Architecture::Micro4, "DW 0x1234").unwrap_err();
    assert_eq!(err.error_type, ErrorType::InvalidDirective);
    assert!(assemble(Architecture::Micro8, "DD 1").is_err());
    assert_eq!(
        assemble(Architecture::Micro16, "DD 0x12345678").unwrap().bytes(),
        &[0x78, 0x56, 0x34, 0x12]
    );
}

#[test]
fn test_forward_label_differences_resolve_in_second_pass() {
    let out = assemble(Architecture::Micro8, "START: LDI R0,#END-START\nHLT\nEND:\n").unwrap();
    assert_eq!(out.bytes(), &[0x06, 0x03, 0x01]);

    let out = assemble(Architecture::Micro8, "START: DB END-START\nEND:\n").unwrap();
    assert_eq!(out.bytes(), &[0x01]);

    // the final value is still range-checked
    let err = assemble(Architecture::Micro8, "START: LDI R0,#END-START\nDS 300\nEND:\n")
        .unwrap_err();
    assert_eq!(err.error_type, ErrorType::RangeError);
    assert_eq!(err.line, 1);
    assert_eq!(err.message, "Value out of range for 8-bit operand: 302");
}

#[test]
fn test_data_directives_reject_values_that_do_not_fit() {
    let err = assemble(Architecture::Micro8, "DB 300").unwrap_err();
    assert_eq!(err.error_type, ErrorType::RangeError);
    assert_eq!(err.message, "Value out of range for 8-bit operand: 300");

    let err = assemble(Architecture::Micro8, "DB 1\nDW 70000").unwrap_err();
    assert_eq!(err.error_type, ErrorType::RangeError);
    assert_eq!(err.line, 2);
    assert_eq!(err.message, "Value out of range for 16-bit operand: 70000");

    let err = assemble(Architecture::Micro4, "DB 0x10").unwrap_err();
    assert_eq!(err.message, "Value out of range for 4-bit operand: 16");

    let out = assemble(Architecture::Micro8, "DB -128, 255\nDW -1").unwrap();
    assert_eq!(out.bytes(), &[0x80, 0xFF, 0xFF, 0xFF]);
}
