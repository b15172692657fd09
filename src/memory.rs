//! # Memory Bus Abstraction
//!
//! This module provides the `MemoryBus` trait that decouples the CPUs from a concrete
//! storage implementation, plus `FlatMemory`, the address-space-sized array every
//! architecture in this crate uses by default.
//!
//! ## Design Principles
//!
//! Unlike real hardware buses, every access is bounds-checked:
//! - Reads and writes outside the array return `ExecutionError::AddressOutOfRange`
//! - The CPU converts that error into its sticky `Errored` state instead of panicking
//! - Nibble memories mask every stored value to 4 bits

use crate::ExecutionError;

/// Memory bus trait for CPUs to read/write storage cells.
///
/// A cell is a byte for the 8-bit and 16-bit machines and a nibble (stored in the low
/// four bits of a byte) for the 4-bit machine. Addresses are `u32` so the 20-bit physical
/// space of the segmented CPU fits without truncation.
///
/// # Examples
///
/// ```
/// use libmicro::{FlatMemory, MemoryBus};
///
/// let mut mem = FlatMemory::new(0x10000);
/// mem.write(0x1234, 0x42).unwrap();
/// assert_eq!(mem.read(0x1234).unwrap(), 0x42);
/// assert!(mem.read(0x10000).is_err());
/// ```
pub trait MemoryBus {
    /// Reads the cell at `addr`.
    fn read(&self, addr: u32) -> Result<u8, ExecutionError>;

    /// Writes `value` to the cell at `addr`.
    fn write(&mut self, addr: u32, value: u8) -> Result<(), ExecutionError>;

    /// Number of addressable cells.
    fn size(&self) -> usize;

    /// Raw view of the whole address space, for debuggers and bindings.
    fn as_slice(&self) -> &[u8];

    /// Copies `bytes` into memory starting at `start`.
    ///
    /// Bytes that would land past the end of the address space are dropped silently.
    ///
    /// # Returns
    ///
    /// The number of bytes that did not fit (0 when the whole program was loaded).
    fn load(&mut self, start: u32, bytes: &[u8]) -> usize {
        for (offset, &byte) in bytes.iter().enumerate() {
            let addr = start as usize + offset;
            if addr >= self.size() || self.write(addr as u32, byte).is_err() {
                return bytes.len() - offset;
            }
        }
        0
    }
}

/// A flat, fully-populated address space.
///
/// # Examples
///
/// ```
/// use libmicro::{FlatMemory, MemoryBus};
///
/// let mut nibbles = FlatMemory::nibbles(256);
/// nibbles.write(0x10, 0xAB).unwrap();
/// assert_eq!(nibbles.read(0x10).unwrap(), 0x0B);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlatMemory {
    cells: Vec<u8>,
    cell_mask: u8,
}

impl FlatMemory {
    /// Creates a zero-filled byte memory with `size` cells.
    pub fn new(size: usize) -> Self {
        Self {
            cells: vec![0; size],
            cell_mask: 0xFF,
        }
    }

    /// Creates a zero-filled nibble memory with `size` cells.
    pub fn nibbles(size: usize) -> Self {
        Self {
            cells: vec![0; size],
            cell_mask: 0x0F,
        }
    }

    /// Zeroes every cell.
    pub fn clear(&mut self) {
        self.cells.fill(0);
    }
}

impl MemoryBus for FlatMemory {
    fn read(&self, addr: u32) -> Result<u8, ExecutionError> {
        self.cells
            .get(addr as usize)
            .copied()
            .ok_or(ExecutionError::AddressOutOfRange(addr))
    }

    fn write(&mut self, addr: u32, value: u8) -> Result<(), ExecutionError> {
        let mask = self.cell_mask;
        let cell = self
            .cells
            .get_mut(addr as usize)
            .ok_or(ExecutionError::AddressOutOfRange(addr))?;
        *cell = value & mask;
        Ok(())
    }

    fn size(&self) -> usize {
        self.cells.len()
    }

    fn as_slice(&self) -> &[u8] {
        &self.cells
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_write_roundtrip() {
        let mut mem = FlatMemory::new(0x100);
        mem.write(0x00, 0x12).unwrap();
        mem.write(0xFF, 0x34).unwrap();
        assert_eq!(mem.read(0x00).unwrap(), 0x12);
        assert_eq!(mem.read(0xFF).unwrap(), 0x34);
    }

    #[test]
    fn test_out_of_range_access_is_an_error() {
        let mut mem = FlatMemory::new(0x100);
        assert_eq!(
            mem.read(0x100),
            Err(ExecutionError::AddressOutOfRange(0x100))
        );
        assert_eq!(
            mem.write(0x1000, 1),
            Err(ExecutionError::AddressOutOfRange(0x1000))
        );
    }

    #[test]
    fn test_nibble_memory_masks_values() {
        let mut mem = FlatMemory::nibbles(16);
        mem.write(3, 0xFF).unwrap();
        assert_eq!(mem.read(3).unwrap(), 0x0F);
    }

    #[test]
    fn test_load_truncates_silently() {
        let mut mem = FlatMemory::new(8);
        let dropped = mem.load(6, &[1, 2, 3, 4]);
        assert_eq!(dropped, 2);
        assert_eq!(mem.as_slice()[6..], [1, 2]);

        assert_eq!(mem.load(0, &[9, 9]), 0);
        assert_eq!(mem.load(100, &[1]), 1);
    }
}
