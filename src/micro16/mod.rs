//! # Micro16
//!
//! The 16-bit segmented machine: eight general registers, four segment registers forming
//! 20-bit physical addresses as `(segment << 4) + offset`, a word-wide stack in SS, a
//! 256-entry interrupt vector table at the bottom of memory and 64 KB of memory-mapped
//! I/O at the top.
//!
//! ## Memory Map
//!
//! | Range             | Use                                   |
//! |-------------------|---------------------------------------|
//! | 0x00000-0x003FF   | Interrupt vectors (offset, segment)   |
//! | 0x00400-0xEFFFF   | General memory                        |
//! | 0xF0000-0xFFFFF   | I/O ports (`IN`/`OUT` port + base)    |

pub mod cpu;
mod instructions;
pub mod opcodes;

pub use cpu::{Micro16, Micro16Flags};

/// Size of the physical address space in bytes.
pub const MEMORY_SIZE: usize = 0x10_0000;

pub const DEFAULT_CS: u16 = 0x0000;
pub const DEFAULT_DS: u16 = 0x0000;
pub const DEFAULT_SS: u16 = 0x0F00;
pub const DEFAULT_ES: u16 = 0x0000;
pub const DEFAULT_SP: u16 = 0xFFFE;
pub const DEFAULT_PC: u16 = 0x0100;

/// Physical address of the interrupt vector table.
pub const IVT_BASE: u32 = 0x0_0000;

/// Physical address of I/O port 0.
pub const MMIO_BASE: u32 = 0xF_0000;

/// Vector raised by a division by zero.
pub const DIVIDE_ERROR_VECTOR: u8 = 0;

/// Default assembly origin.
pub const ORIGIN: u32 = DEFAULT_PC as u32;

/// Maximum number of labels in one program.
pub const MAX_LABELS: usize = 512;

/// Maximum number of equates in one program.
pub const MAX_EQUATES: usize = 256;

/// Segment register indices as encoded in segment operand fields.
pub const CS: u8 = 0;
pub const DS: u8 = 1;
pub const SS: u8 = 2;
pub const ES: u8 = 3;

/// General register indices.
pub const AX: u8 = 0;
pub const BX: u8 = 1;
pub const CX: u8 = 2;
pub const DX: u8 = 3;
pub const SI: u8 = 4;
pub const DI: u8 = 5;
pub const BP: u8 = 6;
