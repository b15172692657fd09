//! # Micro4
//!
//! The 4-bit accumulator machine: CPU, instruction table and memory layout constants.

pub mod cpu;
pub mod opcodes;

pub use cpu::{Micro4, Micro4Flags};

/// Number of nibble cells.
pub const MEMORY_SIZE: usize = 256;

/// Default assembly origin.
pub const ORIGIN: u32 = 0x00;

/// Maximum number of labels in one program.
pub const MAX_LABELS: usize = 64;

/// Maximum number of equates in one program.
pub const MAX_EQUATES: usize = 64;
