//! Property-based tests for assembler and CPU invariants.
//!
//! These tests use proptest to check that address assignment, data directives,
//! terminal states and interrupt dispatch hold across generated inputs.

use libmicro::micro16::cpu::physical;
use libmicro::micro16::{Micro16, Micro16Flags};
use libmicro::micro8::Micro8;
use libmicro::{assemble, Architecture, Machine};
use proptest::prelude::*;

/// Micro8 statements with their encoded sizes; all references are backward.
const STATEMENTS: &[(&str, u32)] = &[
    ("NOP", 1),
    ("INC R3", 1),
    ("LDI R0,#0x2A", 2),
    ("MOV R1,R2", 2),
    ("LD R2,[0x1234]", 3),
    ("JMP L0", 3),
];

/// Everything observable about a stopped machine.
fn snapshot(cpu: &dyn Machine) -> (Vec<u16>, u16, u32, u64, u64, Vec<u8>) {
    (
        cpu.register_values(),
        cpu.flag_bits(),
        cpu.program_counter(),
        cpu.cycles(),
        cpu.instructions(),
        cpu.memory().to_vec(),
    )
}

fn stopping_program(arch: Architecture, fault: bool) -> Box<dyn Machine> {
    let source = match (arch, fault) {
        (Architecture::Micro4, false) => "LDI 9\nSTA 0x40\nHLT",
        (Architecture::Micro8, false) => "LDI R0,#7\nPUSH R0\nHLT",
        (Architecture::Micro16, false) => "MOV AX,#7\nPUSH AX\nHLT",
        (Architecture::Micro4, true) => "DB 0xF\nDB 0xF",
        (_, true) => "DB 0xFF",
    };
    let out = assemble(arch, source).unwrap();
    let mut cpu = arch.new_machine();
    cpu.load_program(out.bytes(), out.origin());
    cpu.run(0);
    assert!(cpu.is_halted());
    assert_eq!(cpu.is_error(), fault);
    cpu
}

fn architecture() -> impl Strategy<Value = Architecture> {
    prop_oneof![
        Just(Architecture::Micro4),
        Just(Architecture::Micro8),
        Just(Architecture::Micro16),
    ]
}

proptest! {
    #[test]
    fn prop_dw_stores_little_endian(value in any::<u16>()) {
        let out = assemble(Architecture::Micro8, &format!("DW {}", value)).unwrap();
        prop_assert_eq!(out.bytes(), &value.to_le_bytes()[..]);

        let mut cpu = Micro8::new();
        cpu.load_program(out.bytes(), out.origin());
        let at = out.origin() as usize;
        prop_assert_eq!(&cpu.memory()[at..at + 2], &value.to_le_bytes()[..]);

        let hex = assemble(Architecture::Micro16, &format!("W EQU 0x{:X}\nDW W", value)).unwrap();
        prop_assert_eq!(hex.bytes(), &value.to_le_bytes()[..]);
    }

    #[test]
    fn prop_label_addresses_follow_instruction_lengths(
        picks in prop::collection::vec(0..STATEMENTS.len(), 1..40)
    ) {
        let mut source = String::new();
        let mut expected = Vec::new();
        let mut address = 0x0200u32;
        for (i, &pick) in picks.iter().enumerate() {
            let (text, size) = STATEMENTS[pick];
            source.push_str(&format!("L{}: {}\n", i, text));
            expected.push(address);
            address += size;
        }
        let out = assemble(Architecture::Micro8, &source).unwrap();
        for (i, &addr) in expected.iter().enumerate() {
            prop_assert_eq!(out.lookup(&format!("L{}", i)), Some(addr as i64));
        }
        prop_assert_eq!(out.bytes().len() as u32, address - 0x0200);
        prop_assert_eq!(out.stats().label_count, picks.len());

        let again = assemble(Architecture::Micro8, &source).unwrap();
        prop_assert_eq!(again.bytes(), out.bytes());
    }

    #[test]
    fn prop_stopped_cpu_ignores_steps(
        arch in architecture(),
        fault in any::<bool>(),
        steps in 1usize..50,
    ) {
        let mut cpu = stopping_program(arch, fault);
        let before = snapshot(cpu.as_ref());
        let message = cpu.error_message();

        for _ in 0..steps {
            prop_assert_eq!(cpu.step(), 0);
        }
        prop_assert_eq!(cpu.run(1000), 0);
        prop_assert_eq!(snapshot(cpu.as_ref()), before);
        prop_assert_eq!(cpu.error_message(), message);
    }

    #[test]
    fn prop_interrupt_dispatches_on_following_step(nops_before in 0usize..4, carry in any::<bool>()) {
        let source = format!(
            "        ORG 0x14
        DW handler,0
        ORG 0x100
        STI
        {}
        NOP
        NOP
        NOP
        NOP
        HLT
handler: HLT
",
            if carry { "STC" } else { "CLC" }
        );
        let out = assemble(Architecture::Micro16, &source).unwrap();
        let handler = out.lookup("handler").unwrap() as u16;

        let mut cpu = Micro16::new();
        cpu.load_program(out.bytes(), out.origin());
        for _ in 0..2 + nops_before {
            cpu.step();
        }

        let return_pc = cpu.pc();
        let flags = cpu.flags();
        cpu.request_interrupt(5);
        // requesting does not dispatch by itself
        prop_assert_eq!(cpu.pc(), return_pc);
        prop_assert!(cpu.interrupt_deliverable());

        cpu.step();
        prop_assert!(cpu.is_halted());
        prop_assert_eq!(cpu.pc(), handler + 1);
        prop_assert!(!cpu.flag_i());

        let word = |offset: u16| {
            let at = physical(cpu.ss(), offset) as usize;
            u16::from_le_bytes([cpu.memory()[at], cpu.memory()[at + 1]])
        };
        prop_assert_eq!(word(0xFFFC), flags.bits());
        prop_assert_eq!(word(0xFFFA), 0);
        prop_assert_eq!(word(0xFFF8), return_pc);
        prop_assert!(flags.contains(Micro16Flags::INTERRUPT));
        prop_assert_eq!(flags.contains(Micro16Flags::CARRY), carry);
    }
}
