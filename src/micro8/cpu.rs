//! # Micro8 CPU
//!
//! Register file, stack, port and interrupt plumbing for the 8-bit machine. Instruction
//! semantics live in `micro8::instructions`; this module owns fetch/decode and the
//! `Machine` contract.
//!
//! ## Register Pairs
//!
//! | Pair | High | Low |
//! |------|------|-----|
//! | HL   | R5   | R6  |
//! | BC   | R1   | R2  |
//! | DE   | R3   | R4  |
//!
//! ## Stack
//!
//! The stack grows down from 0xFFFF. A byte push writes at SP and then decrements it; a
//! word push stores the high byte first.

use bitflags::bitflags;
use log::{debug, trace, warn};

use crate::alu::AluResult;
use crate::cpu::{CpuState, Machine};
use crate::opcodes::decode;
use crate::{Architecture, CodeAddress, ExecutionError, FlatMemory, MemoryBus};

use super::instructions;
use super::opcodes::{Condition, Pair, INSTRUCTION_TABLE};
use super::{DEFAULT_PC, DEFAULT_SP, INTERRUPT_VECTOR, MEMORY_SIZE, PORT_COUNT};

bitflags! {
    /// Micro8 status flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Micro8Flags: u8 {
        const CARRY = 0x01;
        const OVERFLOW = 0x04;
        const ZERO = 0x40;
        const SIGN = 0x80;
    }
}

/// Micro8 processor state.
///
/// # Examples
///
/// ```
/// use libmicro::micro8::Micro8;
/// use libmicro::Machine;
///
/// let mut cpu = Micro8::new();
/// // LDI R2,#0x2A ; HLT
/// cpu.load_program(&[0x08, 0x2A, 0x01], 0x0200);
/// cpu.run(0);
/// assert_eq!(cpu.register(2), 0x2A);
/// ```
#[derive(Debug, Clone)]
pub struct Micro8<M: MemoryBus = FlatMemory> {
    /// General registers R0-R7
    pub(crate) r: [u8; 8],

    pub(crate) pc: u16,
    pub(crate) sp: u16,
    pub(crate) flags: Micro8Flags,

    /// Interrupt enable
    pub(crate) ie: bool,
    pub(crate) int_pending: bool,

    pub(crate) ports: [u8; PORT_COUNT],
    pub(crate) halted: bool,
    pub(crate) error: Option<ExecutionError>,
    pub(crate) cycles: u64,
    pub(crate) instructions: u64,
    pub(crate) memory: M,
}

impl Micro8<FlatMemory> {
    /// Creates a CPU with 64 KB of zeroed memory.
    pub fn new() -> Self {
        Self::with_memory(FlatMemory::new(MEMORY_SIZE))
    }
}

impl Default for Micro8<FlatMemory> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: MemoryBus> Micro8<M> {
    /// Creates a CPU over an existing memory.
    pub fn with_memory(memory: M) -> Self {
        Self {
            r: [0; 8],
            pc: DEFAULT_PC,
            sp: DEFAULT_SP,
            flags: Micro8Flags::empty(),
            ie: false,
            int_pending: false,
            ports: [0; PORT_COUNT],
            halted: false,
            error: None,
            cycles: 0,
            instructions: 0,
            memory,
        }
    }

    fn fetch_byte(&mut self) -> Result<u8, ExecutionError> {
        let value = self.memory.read(self.pc as u32)?;
        self.pc = self.pc.wrapping_add(1);
        Ok(value)
    }

    pub(crate) fn read(&self, addr: u16) -> Result<u8, ExecutionError> {
        self.memory.read(addr as u32)
    }

    pub(crate) fn write(&mut self, addr: u16, value: u8) -> Result<(), ExecutionError> {
        self.memory.write(addr as u32, value)
    }

    // ========== Stack ==========

    pub(crate) fn push_byte(&mut self, value: u8) -> Result<(), ExecutionError> {
        self.write(self.sp, value)?;
        self.sp = self.sp.wrapping_sub(1);
        Ok(())
    }

    pub(crate) fn pop_byte(&mut self) -> Result<u8, ExecutionError> {
        self.sp = self.sp.wrapping_add(1);
        self.read(self.sp)
    }

    pub(crate) fn push_word(&mut self, value: u16) -> Result<(), ExecutionError> {
        let [lo, hi] = value.to_le_bytes();
        self.push_byte(hi)?;
        self.push_byte(lo)
    }

    pub(crate) fn pop_word(&mut self) -> Result<u16, ExecutionError> {
        let lo = self.pop_byte()?;
        let hi = self.pop_byte()?;
        Ok(u16::from_le_bytes([lo, hi]))
    }

    // ========== Register Pairs ==========

    pub(crate) fn pair(&self, pair: Pair) -> u16 {
        let join = |hi: usize, lo: usize| u16::from_be_bytes([self.r[hi], self.r[lo]]);
        match pair {
            Pair::Hl => join(5, 6),
            Pair::Bc => join(1, 2),
            Pair::De => join(3, 4),
            Pair::Sp => self.sp,
        }
    }

    pub(crate) fn set_pair(&mut self, pair: Pair, value: u16) {
        let [hi, lo] = value.to_be_bytes();
        let (h, l) = match pair {
            Pair::Hl => (5, 6),
            Pair::Bc => (1, 2),
            Pair::De => (3, 4),
            Pair::Sp => {
                self.sp = value;
                return;
            }
        };
        self.r[h] = hi;
        self.r[l] = lo;
    }

    // ========== Flags ==========

    /// Applies an ALU result's flag updates without storing the value.
    pub(crate) fn set_flags(&mut self, result: &AluResult) {
        self.flags.set(Micro8Flags::ZERO, result.zero);
        self.flags.set(Micro8Flags::SIGN, result.sign);
        if let Some(carry) = result.carry {
            self.flags.set(Micro8Flags::CARRY, carry);
        }
        if let Some(overflow) = result.overflow {
            self.flags.set(Micro8Flags::OVERFLOW, overflow);
        }
    }

    /// Stores an ALU result into `reg` and applies its flags.
    pub(crate) fn apply(&mut self, reg: u8, result: AluResult) {
        self.set_flags(&result);
        self.r[(reg & 7) as usize] = result.value as u8;
    }

    pub(crate) fn condition(&self, cond: Condition) -> bool {
        let f = self.flags;
        match cond {
            Condition::Zero => f.contains(Micro8Flags::ZERO),
            Condition::NotZero => !f.contains(Micro8Flags::ZERO),
            Condition::Carry => f.contains(Micro8Flags::CARRY),
            Condition::NoCarry => !f.contains(Micro8Flags::CARRY),
            Condition::Sign => f.contains(Micro8Flags::SIGN),
            Condition::NoSign => !f.contains(Micro8Flags::SIGN),
            Condition::Overflow => f.contains(Micro8Flags::OVERFLOW),
            Condition::NoOverflow => !f.contains(Micro8Flags::OVERFLOW),
        }
    }

    fn deliver_interrupt(&mut self) -> Result<(), ExecutionError> {
        debug!("micro8 interrupt: PC={:04X} -> {:04X}", self.pc, INTERRUPT_VECTOR);
        self.int_pending = false;
        self.ie = false;
        self.push_word(self.pc)?;
        self.push_byte(self.flags.bits())?;
        self.pc = INTERRUPT_VECTOR;
        Ok(())
    }

    fn execute(&mut self) -> Result<u32, ExecutionError> {
        if self.ie && self.int_pending {
            self.deliver_interrupt()?;
        }

        let at = self.pc;
        let opcode = self.fetch_byte()?;
        let decoded = decode(INSTRUCTION_TABLE, opcode, || self.fetch_byte())?.ok_or(
            ExecutionError::UnknownOpcode {
                opcode,
                at: CodeAddress::Linear(at),
            },
        )?;
        trace!(
            "micro8 {:04X}: {} {:?}",
            at,
            decoded.descriptor.mnemonic,
            decoded.operands
        );

        instructions::execute(self, decoded.descriptor.op, decoded.operands)?;
        Ok(decoded.descriptor.cycles as u32)
    }

    // ========== Register Getters ==========

    /// Returns general register `n` (masked to R0-R7).
    pub fn register(&self, n: u8) -> u8 {
        self.r[(n & 7) as usize]
    }

    /// Returns all eight general registers.
    pub fn registers(&self) -> [u8; 8] {
        self.r
    }

    pub fn pc(&self) -> u16 {
        self.pc
    }

    pub fn sp(&self) -> u16 {
        self.sp
    }

    /// Returns HL (R5:R6).
    pub fn hl(&self) -> u16 {
        self.pair(Pair::Hl)
    }

    /// Returns BC (R1:R2).
    pub fn bc(&self) -> u16 {
        self.pair(Pair::Bc)
    }

    /// Returns DE (R3:R4).
    pub fn de(&self) -> u16 {
        self.pair(Pair::De)
    }

    pub fn flags(&self) -> Micro8Flags {
        self.flags
    }

    /// Returns true if interrupts are enabled.
    pub fn interrupts_enabled(&self) -> bool {
        self.ie
    }

    // ========== Status Flag Getters ==========

    pub fn flag_z(&self) -> bool {
        self.flags.contains(Micro8Flags::ZERO)
    }

    pub fn flag_c(&self) -> bool {
        self.flags.contains(Micro8Flags::CARRY)
    }

    pub fn flag_s(&self) -> bool {
        self.flags.contains(Micro8Flags::SIGN)
    }

    pub fn flag_o(&self) -> bool {
        self.flags.contains(Micro8Flags::OVERFLOW)
    }

    // ========== I/O Ports ==========

    /// Reads an I/O port as the CPU would see it.
    pub fn port(&self, port: u8) -> u8 {
        self.ports[port as usize]
    }

    /// Sets the value an `IN` from `port` will return.
    pub fn set_port(&mut self, port: u8, value: u8) {
        self.ports[port as usize] = value;
    }
}

impl<M: MemoryBus> Machine for Micro8<M> {
    fn reset(&mut self) {
        self.r = [0; 8];
        self.pc = DEFAULT_PC;
        self.sp = DEFAULT_SP;
        self.flags = Micro8Flags::empty();
        self.ie = false;
        self.int_pending = false;
        self.ports = [0; PORT_COUNT];
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
                warn!("micro8 stopped: {}", e);
                self.error = Some(e);
                self.halted = true;
                0
            }
        }
    }

    fn request_interrupt(&mut self, vector: u8) {
        trace!("micro8 interrupt requested (vector {} ignored)", vector);
        self.int_pending = true;
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
        self.ie && self.int_pending
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
        Architecture::Micro8
    }

    fn register_values(&self) -> Vec<u16> {
        self.r.iter().map(|&v| v as u16).collect()
    }

    fn flag_bits(&self) -> u16 {
        self.flags.bits() as u16
    }

    fn register_dump(&self) -> String {
        let regs: Vec<String> = self
            .r
            .iter()
            .enumerate()
            .map(|(i, v)| format!("R{}={:02X}", i, v))
            .collect();
        format!(
            "PC={:04X} SP={:04X} {} [{}{}{}{}] IE={}",
            self.pc,
            self.sp,
            regs.join(" "),
            if self.flag_s() { 'S' } else { '-' },
            if self.flag_z() { 'Z' } else { '-' },
            if self.flag_o() { 'O' } else { '-' },
            if self.flag_c() { 'C' } else { '-' },
            self.ie as u8,
        )
    }
}
