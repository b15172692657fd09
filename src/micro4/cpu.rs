//! # Micro4 CPU
//!
//! A 4-bit accumulator machine: one accumulator, an 8-bit program counter and 256
//! nibble cells of memory. There is no stack and no interrupt line.
//!
//! Every instruction byte is stored as two cells (high nibble first), so fetching the
//! opcode costs two cycles and advances PC by two.

use bitflags::bitflags;
use log::{debug, trace, warn};

use crate::addressing::{decode_operands, Operands};
use crate::alu::{self, AluResult, Width};
use crate::cpu::{CpuState, Machine};
use crate::opcodes::find_by_opcode;
use crate::{Architecture, CodeAddress, ExecutionError, FlatMemory, MemoryBus};

use super::opcodes::{Op, INSTRUCTION_TABLE};
use super::MEMORY_SIZE;

bitflags! {
    /// Micro4 status flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Micro4Flags: u8 {
        const ZERO = 0x01;
        const CARRY = 0x02;
        const SIGN = 0x04;
        const OVERFLOW = 0x08;
    }
}

/// Micro4 processor state.
///
/// # Examples
///
/// ```
/// use libmicro::micro4::Micro4;
/// use libmicro::Machine;
///
/// let mut cpu = Micro4::new();
/// // LDI 9 ; HLT
/// cpu.load_program(&[0x7, 0x9, 0x0, 0x0], 0);
/// cpu.run(0);
/// assert_eq!(cpu.a(), 9);
/// ```
#[derive(Debug, Clone)]
pub struct Micro4<M: MemoryBus = FlatMemory> {
    /// Accumulator (low four bits used)
    pub(crate) a: u8,

    /// Program counter (cell address)
    pub(crate) pc: u8,

    pub(crate) flags: Micro4Flags,
    pub(crate) halted: bool,
    pub(crate) error: Option<ExecutionError>,
    pub(crate) cycles: u64,
    pub(crate) instructions: u64,
    pub(crate) memory: M,
}

impl Micro4<FlatMemory> {
    /// Creates a CPU with 256 zeroed nibble cells.
    pub fn new() -> Self {
        Self::with_memory(FlatMemory::nibbles(MEMORY_SIZE))
    }
}

impl Default for Micro4<FlatMemory> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: MemoryBus> Micro4<M> {
    /// Creates a CPU over an existing memory.
    pub fn with_memory(memory: M) -> Self {
        Self {
            a: 0,
            pc: 0,
            flags: Micro4Flags::empty(),
            halted: false,
            error: None,
            cycles: 0,
            instructions: 0,
            memory,
        }
    }

    /// Reads two cells as one byte, high nibble first.
    fn fetch_byte(&mut self) -> Result<u8, ExecutionError> {
        let hi = self.memory.read(self.pc as u32)?;
        let lo = self.memory.read(self.pc.wrapping_add(1) as u32)?;
        self.pc = self.pc.wrapping_add(2);
        Ok((hi & 0x0F) << 4 | (lo & 0x0F))
    }

    fn apply(&mut self, result: AluResult) {
        self.a = result.value as u8;
        self.flags.set(Micro4Flags::ZERO, result.zero);
        self.flags.set(Micro4Flags::SIGN, result.sign);
        if let Some(carry) = result.carry {
            self.flags.set(Micro4Flags::CARRY, carry);
        }
        if let Some(overflow) = result.overflow {
            self.flags.set(Micro4Flags::OVERFLOW, overflow);
        }
    }

    fn execute(&mut self) -> Result<u32, ExecutionError> {
        if self.pc as usize >= MEMORY_SIZE - 1 {
            return Err(ExecutionError::PcOutOfBounds(self.pc as u32));
        }

        let at = self.pc;
        let opcode = self.fetch_byte()?;
        let descriptor = find_by_opcode(INSTRUCTION_TABLE, opcode & 0xF0).ok_or(
            ExecutionError::UnknownOpcode {
                opcode: opcode >> 4,
                at: CodeAddress::Short(at),
            },
        )?;
        let operands = decode_operands(descriptor.mode, opcode & 0x0F, || self.fetch_byte())?;
        trace!("micro4 {:02X}: {} {:?}", at, descriptor.mnemonic, operands);

        let address = match operands {
            Operands::Address(addr) => addr as u32,
            _ => 0,
        };

        match descriptor.op {
            Op::Hlt => self.halted = true,
            Op::Lda => {
                self.a = self.memory.read(address)? & 0x0F;
                self.flags.set(Micro4Flags::ZERO, self.a == 0);
            }
            Op::Sta => self.memory.write(address, self.a)?,
            Op::Add => {
                let value = self.memory.read(address)?;
                self.apply(alu::add(Width::Nibble, self.a as u32, value as u32, false));
            }
            Op::Sub => {
                let value = self.memory.read(address)?;
                self.apply(alu::sub(Width::Nibble, self.a as u32, value as u32, false));
            }
            Op::Jmp => self.pc = address as u8,
            Op::Jz => {
                if self.flags.contains(Micro4Flags::ZERO) {
                    self.pc = address as u8;
                }
            }
            Op::Ldi => {
                if let Operands::Immediate(n) = operands {
                    self.a = n as u8;
                }
                self.flags.set(Micro4Flags::ZERO, self.a == 0);
            }
        }

        Ok(descriptor.cycles as u32)
    }

    // ========== Register Getters ==========

    /// Returns the accumulator.
    pub fn a(&self) -> u8 {
        self.a
    }

    /// Returns the program counter (cell address).
    pub fn pc(&self) -> u8 {
        self.pc
    }

    /// Returns the packed flags.
    pub fn flags(&self) -> Micro4Flags {
        self.flags
    }

    // ========== Status Flag Getters ==========

    /// Returns true if the Zero flag is set.
    pub fn flag_z(&self) -> bool {
        self.flags.contains(Micro4Flags::ZERO)
    }

    /// Returns true if the Carry flag is set.
    pub fn flag_c(&self) -> bool {
        self.flags.contains(Micro4Flags::CARRY)
    }

    /// Returns true if the Sign flag is set.
    pub fn flag_s(&self) -> bool {
        self.flags.contains(Micro4Flags::SIGN)
    }

    /// Returns true if the Overflow flag is set.
    pub fn flag_o(&self) -> bool {
        self.flags.contains(Micro4Flags::OVERFLOW)
    }
}

impl<M: MemoryBus> Machine for Micro4<M> {
    fn reset(&mut self) {
        self.a = 0;
        self.pc = 0;
        self.flags = Micro4Flags::empty();
        self.halted = false;
        self.error = None;
        self.cycles = 0;
        self.instructions = 0;
    }

    fn load_program(&mut self, bytes: &[u8], start: u32) -> usize {
        self.memory.load(start, bytes)
    }

    fn step(&mut self) -> u32 {
        if self.halted || self.error.is_some() {
            return 0;
        }

        match self.execute() {
            Ok(cycles) => {
                self.cycles += cycles as u64;
                self.instructions += 1;
                cycles
            }
            Err(e) => {
                warn!("micro4 stopped: {}", e);
                self.error = Some(e);
                self.halted = true;
                0
            }
        }
    }

    fn request_interrupt(&mut self, vector: u8) {
        debug!("micro4 has no interrupt line; ignoring vector {}", vector);
    }

    fn state(&self) -> CpuState {
        if self.error.is_some() {
            CpuState::Errored
        } else if self.halted {
            CpuState::Halted
        } else {
            CpuState::Running
        }
    }

    fn interrupt_deliverable(&self) -> bool {
        false
    }

    fn error_message(&self) -> Option<String> {
        self.error.as_ref().map(|e| e.to_string())
    }

    fn cycles(&self) -> u64 {
        self.cycles
    }

    fn instructions(&self) -> u64 {
        self.instructions
    }

    fn program_counter(&self) -> u32 {
        self.pc as u32
    }

    fn memory(&self) -> &[u8] {
        self.memory.as_slice()
    }

    fn architecture(&self) -> Architecture {
        Architecture::Micro4
    }

    fn register_values(&self) -> Vec<u16> {
        vec![self.a as u16]
    }

    fn flag_bits(&self) -> u16 {
        self.flags.bits() as u16
    }

    fn register_dump(&self) -> String {
        format!(
            "PC={:02X} A={:X} [{}{}{}{}]",
            self.pc,
            self.a,
            if self.flag_z() { 'Z' } else { '-' },
            if self.flag_c() { 'C' } else { '-' },
            if self.flag_s() { 'S' } else { '-' },
            if self.flag_o() { 'O' } else { '-' },
        )
    }
}
