//! # Micro CPU Family
//!
//! Emulators and two-pass assemblers for three small teaching CPUs:
//!
//! - **Micro4**: 4-bit accumulator machine with 256 nibbles of memory
//! - **Micro8**: 8-bit machine with eight registers, register pairs, a stack and I/O ports
//! - **Micro16**: 16-bit segmented machine with a 1 MB physical address space, an
//!   interrupt vector table, string instructions and memory-mapped I/O
//!
//! ## Quick Start
//!
//! ```rust
//! use libmicro::{assembler, Architecture, Machine, micro8::Micro8};
//!
//! let output = assembler::assemble(Architecture::Micro8, "LDI R0,#0xFF\nINC R0\nHLT").unwrap();
//!
//! let mut cpu = Micro8::new();
//! cpu.load_program(output.bytes(), output.origin());
//! cpu.run(0);
//!
//! assert_eq!(cpu.register(0), 0x00);
//! assert!(cpu.flag_z());
//! assert!(cpu.is_halted());
//! ```
//!
//! ## Architecture
//!
//! - **Table-Driven Design**: each instruction set is one static descriptor table shared
//!   by the CPU decoder, the assembler and the disassembler
//! - **Trait-Based Memory**: CPUs are generic over `MemoryBus`; every access is
//!   bounds-checked and faults become the CPU's sticky error state
//! - **No Globals**: CPUs and assemblers are plain owned values
//!
//! ## Modules
//!
//! - `cpu` - the `Machine` trait shared by all CPUs
//! - `memory` - MemoryBus trait and FlatMemory
//! - `alu` - width-generic flag arithmetic
//! - `addressing` / `opcodes` - operand shapes and descriptor lookup
//! - `micro4`, `micro8`, `micro16` - the three CPUs and their instruction tables
//! - `assembler` - two-pass assembler, Intel HEX writer
//! - `disassembler` - table-driven disassembler
//! - `debugger` - breakpoint monitor

pub mod addressing;
pub mod alu;
pub mod assembler;
pub mod cpu;
pub mod debugger;
pub mod disassembler;
pub mod memory;
pub mod micro16;
pub mod micro4;
pub mod micro8;
pub mod opcodes;

#[cfg(feature = "wasm")]
pub mod wasm;

// Re-export public API
pub use addressing::{AddressingMode, Operands};
pub use assembler::{assemble, assemble_file, AssemblerError, AssemblerOutput, ErrorType};
pub use cpu::{CpuState, Machine};
pub use debugger::Debugger;
pub use disassembler::{disassemble, format_instruction, DisassemblyOptions};
pub use memory::{FlatMemory, MemoryBus};
pub use opcodes::InstructionDescriptor;

use thiserror::Error;

/// The three supported instruction sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum Architecture {
    /// 4-bit accumulator machine
    Micro4,
    /// 8-bit register machine
    Micro8,
    /// 16-bit segmented machine
    Micro16,
}

impl Architecture {
    /// Creates a freshly initialised CPU of this architecture.
    pub fn new_machine(self) -> Box<dyn Machine> {
        match self {
            Architecture::Micro4 => Box::new(micro4::Micro4::new()),
            Architecture::Micro8 => Box::new(micro8::Micro8::new()),
            Architecture::Micro16 => Box::new(micro16::Micro16::new()),
        }
    }

    /// Address where assembled programs start when no ORG is given.
    pub const fn default_origin(self) -> u32 {
        match self {
            Architecture::Micro4 => micro4::ORIGIN,
            Architecture::Micro8 => micro8::ORIGIN,
            Architecture::Micro16 => micro16::ORIGIN,
        }
    }
}

impl std::fmt::Display for Architecture {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let name = match self {
            Architecture::Micro4 => "micro4",
            Architecture::Micro8 => "micro8",
            Architecture::Micro16 => "micro16",
        };
        f.write_str(name)
    }
}

/// Name passed to `Architecture::from_str` that matches no architecture.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown architecture: {0} (expected micro4, micro8 or micro16)")]
pub struct UnknownArchitecture(pub String);

impl std::str::FromStr for Architecture {
    type Err = UnknownArchitecture;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "micro4" | "4" => Ok(Architecture::Micro4),
            "micro8" | "8" => Ok(Architecture::Micro8),
            "micro16" | "16" => Ok(Architecture::Micro16),
            _ => Err(UnknownArchitecture(s.to_string())),
        }
    }
}

/// Where a faulting instruction was fetched from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeAddress {
    /// 8-bit program counter (Micro4)
    Short(u8),
    /// 16-bit program counter (Micro8)
    Linear(u16),
    /// Segment:offset plus the physical address (Micro16)
    Segmented { cs: u16, pc: u16 },
}

impl std::fmt::Display for CodeAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match *self {
            CodeAddress::Short(pc) => write!(f, "PC=0x{:02X}", pc),
            CodeAddress::Linear(pc) => write!(f, "PC=0x{:04X}", pc),
            CodeAddress::Segmented { cs, pc } => write!(
                f,
                "CS:PC={:04X}:{:04X} (phys {:05X})",
                cs,
                pc,
                ((cs as u32) << 4) + pc as u32
            ),
        }
    }
}

/// Faults that stop a CPU.
///
/// Every variant is terminal: the CPU enters `Errored` (and `Halted`) and stays there
/// until `reset`. The `Display` text is what `Machine::error_message` reports.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecutionError {
    /// The fetched byte has no row in the instruction table.
    #[error("Unknown opcode: 0x{opcode:02X} at {at}")]
    UnknownOpcode { opcode: u8, at: CodeAddress },

    /// The program counter cannot address a whole instruction.
    #[error("PC out of bounds: 0x{0:02X}")]
    PcOutOfBounds(u32),

    /// A memory access fell outside the address space.
    #[error("Physical address out of range: 0x{0:05X}")]
    AddressOutOfRange(u32),

    /// A repeat prefix was followed by something other than a string primitive.
    #[error("Invalid opcode after {prefix}: 0x{opcode:02X}")]
    InvalidRepeat { prefix: &'static str, opcode: u8 },
}
