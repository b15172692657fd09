//! # Micro8
//!
//! The 8-bit register machine: eight general registers (three of which pair up as 16-bit
//! HL, BC and DE), a byte-wide descending stack, 256 I/O ports and a single maskable
//! interrupt with a fixed vector.

pub mod cpu;
mod instructions;
pub mod opcodes;

pub use cpu::{Micro8, Micro8Flags};

/// Size of the address space in bytes.
pub const MEMORY_SIZE: usize = 0x1_0000;

/// PC after power-on and reset.
pub const DEFAULT_PC: u16 = 0x0200;

/// SP after power-on and reset.
pub const DEFAULT_SP: u16 = 0xFFFF;

/// Every interrupt enters here, whatever vector was requested.
pub const INTERRUPT_VECTOR: u16 = 0x0008;

/// Number of I/O ports.
pub const PORT_COUNT: usize = 256;

/// Default assembly origin.
pub const ORIGIN: u32 = DEFAULT_PC as u32;

/// Maximum number of labels in one program.
pub const MAX_LABELS: usize = 256;

/// Maximum number of equates in one program.
pub const MAX_EQUATES: usize = 256;
