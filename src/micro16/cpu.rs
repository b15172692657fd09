//! # Micro16 CPU
//!
//! Segmented 16-bit core. Every memory reference names a segment register; the physical
//! address is `(segment << 4) + offset`, and anything at or past 1 MB faults.
//!
//! ## Segments
//!
//! | Use                        | Segment |
//! |----------------------------|---------|
//! | Instruction fetch          | CS      |
//! | Loads, stores, string src  | DS      |
//! | Stack, `[SP+n]`            | SS      |
//! | String destination         | ES      |
//!
//! ## Interrupts
//!
//! Delivery pushes FLAGS, CS and PC (in that order), clears I and T, and loads PC and CS
//! from the vector table entry at `vector * 4`. A division by zero takes vector 0 through
//! the same path without consulting I.

use bitflags::bitflags;
use log::{debug, trace, warn};

use crate::alu::{parity_even, AluResult};
use crate::cpu::{CpuState, Machine};
use crate::opcodes::decode;
use crate::{Architecture, CodeAddress, ExecutionError, FlatMemory, MemoryBus};

use super::instructions;
use super::opcodes::{Condition, INSTRUCTION_TABLE};
use super::{
    CS, DEFAULT_CS, DEFAULT_DS, DEFAULT_ES, DEFAULT_PC, DEFAULT_SP, DEFAULT_SS, DS, ES,
    IVT_BASE, MEMORY_SIZE, SS,
};

bitflags! {
    /// Micro16 status and control flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Micro16Flags: u16 {
        const CARRY = 0x01;
        const ZERO = 0x02;
        const SIGN = 0x04;
        const OVERFLOW = 0x08;
        /// String operations step downwards when set
        const DIRECTION = 0x10;
        /// Maskable interrupts enabled
        const INTERRUPT = 0x20;
        const TRAP = 0x40;
        /// Even parity of the low result byte
        const PARITY = 0x80;
    }
}

/// Forms a 20-bit physical address from a segment and an offset.
///
/// The result may exceed the address space (`0xFFFF:0xFFFF`); memory accesses reject it.
pub fn physical(segment: u16, offset: u16) -> u32 {
    ((segment as u32) << 4) + offset as u32
}

/// Micro16 processor state.
///
/// # Examples
///
/// ```
/// use libmicro::micro16::Micro16;
/// use libmicro::Machine;
///
/// let mut cpu = Micro16::new();
/// // MOV AX,#0x1234 ; HLT
/// cpu.load_program(&[0x11, 0x00, 0x34, 0x12, 0x01], 0x0100);
/// cpu.run(0);
/// assert_eq!(cpu.register(0), 0x1234);
/// ```
#[derive(Debug, Clone)]
pub struct Micro16<M: MemoryBus = FlatMemory> {
    /// General registers: AX BX CX DX SI DI BP R7
    pub(crate) r: [u16; 8],

    /// Segment registers: CS DS SS ES
    pub(crate) seg: [u16; 4],

    pub(crate) pc: u16,
    pub(crate) sp: u16,
    pub(crate) flags: Micro16Flags,

    pub(crate) int_pending: bool,
    pub(crate) int_vector: u8,

    pub(crate) waiting: bool,
    pub(crate) halted: bool,
    pub(crate) error: Option<ExecutionError>,
    pub(crate) cycles: u64,
    pub(crate) instructions: u64,
    pub(crate) memory: M,
}

impl Micro16<FlatMemory> {
    /// Creates a CPU with 1 MB of zeroed memory.
    pub fn new() -> Self {
        Self::with_memory(FlatMemory::new(MEMORY_SIZE))
    }
}

impl Default for Micro16<FlatMemory> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: MemoryBus> Micro16<M> {
    /// Creates a CPU over an existing memory.
    pub fn with_memory(memory: M) -> Self {
        let mut cpu = Self {
            r: [0; 8],
            seg: [0; 4],
            pc: 0,
            sp: 0,
            flags: Micro16Flags::empty(),
            int_pending: false,
            int_vector: 0,
            waiting: false,
            halted: false,
            error: None,
            cycles: 0,
            instructions: 0,
            memory,
        };
        cpu.reset();
        cpu
    }

    // ========== Memory Access ==========

    pub(crate) fn read_byte(&self, segment: u8, offset: u16) -> Result<u8, ExecutionError> {
        self.memory.read(physical(self.segment(segment), offset))
    }

    pub(crate) fn write_byte(
        &mut self,
        segment: u8,
        offset: u16,
        value: u8,
    ) -> Result<(), ExecutionError> {
        self.memory.write(physical(self.segment(segment), offset), value)
    }

    pub(crate) fn read_word(&self, segment: u8, offset: u16) -> Result<u16, ExecutionError> {
        let lo = self.read_byte(segment, offset)?;
        let hi = self.read_byte(segment, offset.wrapping_add(1))?;
        Ok(u16::from_le_bytes([lo, hi]))
    }

    pub(crate) fn write_word(
        &mut self,
        segment: u8,
        offset: u16,
        value: u16,
    ) -> Result<(), ExecutionError> {
        let [lo, hi] = value.to_le_bytes();
        self.write_byte(segment, offset, lo)?;
        self.write_byte(segment, offset.wrapping_add(1), hi)
    }

    /// Reads a byte at a physical address (I/O space and vector table).
    pub(crate) fn read_physical(&self, addr: u32) -> Result<u8, ExecutionError> {
        self.memory.read(addr)
    }

    pub(crate) fn write_physical(&mut self, addr: u32, value: u8) -> Result<(), ExecutionError> {
        self.memory.write(addr, value)
    }

    pub(crate) fn read_physical_word(&self, addr: u32) -> Result<u16, ExecutionError> {
        Ok(u16::from_le_bytes([
            self.read_physical(addr)?,
            self.read_physical(addr + 1)?,
        ]))
    }

    pub(crate) fn write_physical_word(
        &mut self,
        addr: u32,
        value: u16,
    ) -> Result<(), ExecutionError> {
        let [lo, hi] = value.to_le_bytes();
        self.write_physical(addr, lo)?;
        self.write_physical(addr + 1, hi)
    }

    fn fetch_byte(&mut self) -> Result<u8, ExecutionError> {
        let value = self.read_byte(CS, self.pc)?;
        self.pc = self.pc.wrapping_add(1);
        Ok(value)
    }

    // ========== Stack ==========

    pub(crate) fn push(&mut self, value: u16) -> Result<(), ExecutionError> {
        self.sp = self.sp.wrapping_sub(2);
        self.write_word(SS, self.sp, value)
    }

    pub(crate) fn pop(&mut self) -> Result<u16, ExecutionError> {
        let value = self.read_word(SS, self.sp)?;
        self.sp = self.sp.wrapping_add(2);
        Ok(value)
    }

    // ========== Flags ==========

    /// Applies an ALU result's Zero/Sign and, when present, Carry/Overflow.
    ///
    /// Results that carry a Carry verdict (arithmetic, logic) also update Parity.
    pub(crate) fn set_flags(&mut self, result: &AluResult) {
        self.flags.set(Micro16Flags::ZERO, result.zero);
        self.flags.set(Micro16Flags::SIGN, result.sign);
        if let Some(carry) = result.carry {
            self.flags.set(Micro16Flags::CARRY, carry);
            self.flags.set(Micro16Flags::PARITY, parity_even(result.value));
        }
        if let Some(overflow) = result.overflow {
            self.flags.set(Micro16Flags::OVERFLOW, overflow);
        }
    }

    /// Stores an ALU result into `reg` and applies its flags.
    pub(crate) fn apply(&mut self, reg: u8, result: AluResult) {
        self.set_flags(&result);
        self.r[(reg & 7) as usize] = result.value as u16;
    }

    pub(crate) fn flag(&self, flag: Micro16Flags) -> bool {
        self.flags.contains(flag)
    }

    pub(crate) fn condition(&self, cond: Condition) -> bool {
        let z = self.flag(Micro16Flags::ZERO);
        let c = self.flag(Micro16Flags::CARRY);
        let s = self.flag(Micro16Flags::SIGN);
        let o = self.flag(Micro16Flags::OVERFLOW);
        match cond {
            Condition::Zero => z,
            Condition::NotZero => !z,
            Condition::Carry => c,
            Condition::NoCarry => !c,
            Condition::Sign => s,
            Condition::NoSign => !s,
            Condition::Overflow => o,
            Condition::NoOverflow => !o,
            Condition::Less => s != o,
            Condition::GreaterEqual => s == o,
            Condition::LessEqual => z || s != o,
            Condition::Greater => !z && s == o,
            Condition::Above => !c && !z,
            Condition::BelowEqual => c || z,
        }
    }

    // ========== Interrupts ==========

    /// Enters the handler for `vector`, regardless of the I flag.
    pub(crate) fn interrupt(&mut self, vector: u8) -> Result<(), ExecutionError> {
        let entry = IVT_BASE + vector as u32 * 4;
        let target_pc = self.read_physical_word(entry)?;
        let target_cs = self.read_physical_word(entry + 2)?;

        debug!(
            "micro16 interrupt {}: {:04X}:{:04X} -> {:04X}:{:04X}",
            vector, self.seg[CS as usize], self.pc, target_cs, target_pc
        );

        self.push(self.flags.bits())?;
        self.push(self.seg[CS as usize])?;
        self.push(self.pc)?;
        self.flags.remove(Micro16Flags::INTERRUPT | Micro16Flags::TRAP);
        self.pc = target_pc;
        self.seg[CS as usize] = target_cs;
        Ok(())
    }

    fn execute(&mut self) -> Result<u32, ExecutionError> {
        if self.interrupt_deliverable() {
            self.int_pending = false;
            self.interrupt(self.int_vector)?;
        }

        let at = self.pc;
        let opcode = self.fetch_byte()?;
        let decoded = decode(INSTRUCTION_TABLE, opcode, || self.fetch_byte())?.ok_or(
            ExecutionError::UnknownOpcode {
                opcode,
                at: CodeAddress::Segmented {
                    cs: self.seg[CS as usize],
                    pc: at,
                },
            },
        )?;
        trace!(
            "micro16 {:04X}:{:04X}: {} {:?}",
            self.seg[CS as usize],
            at,
            decoded.descriptor.mnemonic,
            decoded.operands
        );

        let extra = instructions::execute(self, decoded.descriptor.op, decoded.operands)?;
        Ok(decoded.descriptor.cycles as u32 + extra)
    }

    // ========== Register Getters ==========

    /// Returns general register `n` (masked to R0-R7).
    pub fn register(&self, n: u8) -> u16 {
        self.r[(n & 7) as usize]
    }

    /// Returns all eight general registers.
    pub fn registers(&self) -> [u16; 8] {
        self.r
    }

    /// Returns segment register `n` (0=CS, 1=DS, 2=SS, 3=ES).
    pub fn segment(&self, n: u8) -> u16 {
        self.seg[(n & 3) as usize]
    }

    pub fn cs(&self) -> u16 {
        self.seg[CS as usize]
    }

    pub fn ds(&self) -> u16 {
        self.seg[DS as usize]
    }

    pub fn ss(&self) -> u16 {
        self.seg[SS as usize]
    }

    pub fn es(&self) -> u16 {
        self.seg[ES as usize]
    }

    pub fn pc(&self) -> u16 {
        self.pc
    }

    pub fn sp(&self) -> u16 {
        self.sp
    }

    pub fn flags(&self) -> Micro16Flags {
        self.flags
    }

    /// Returns true while the CPU idles after WAIT.
    pub fn is_waiting(&self) -> bool {
        self.waiting
    }

    // ========== Status Flag Getters ==========

    pub fn flag_c(&self) -> bool {
        self.flag(Micro16Flags::CARRY)
    }

    pub fn flag_z(&self) -> bool {
        self.flag(Micro16Flags::ZERO)
    }

    pub fn flag_s(&self) -> bool {
        self.flag(Micro16Flags::SIGN)
    }

    pub fn flag_o(&self) -> bool {
        self.flag(Micro16Flags::OVERFLOW)
    }

    pub fn flag_d(&self) -> bool {
        self.flag(Micro16Flags::DIRECTION)
    }

    pub fn flag_i(&self) -> bool {
        self.flag(Micro16Flags::INTERRUPT)
    }

    pub fn flag_t(&self) -> bool {
        self.flag(Micro16Flags::TRAP)
    }

    pub fn flag_p(&self) -> bool {
        self.flag(Micro16Flags::PARITY)
    }
}

impl<M: MemoryBus> Machine for Micro16<M> {
    fn reset(&mut self) {
        self.r = [0; 8];
        self.seg = [DEFAULT_CS, DEFAULT_DS, DEFAULT_SS, DEFAULT_ES];
        self.pc = DEFAULT_PC;
        self.sp = DEFAULT_SP;
        self.flags = Micro16Flags::empty();
        self.int_pending = false;
        self.int_vector = 0;
        self.waiting = false;
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

        if self.waiting {
            if !self.interrupt_deliverable() {
                self.cycles += 1;
                return 1;
            }
            self.waiting = false;
        }

        match self.execute() {
            Ok(cycles) => {
                self.cycles += cycles as u64;
                self.instructions += 1;
                cycles
            }
            Err(e) => {
                warn!("micro16 stopped: {}", e);
                self.error = Some(e);
                self.halted = true;
                0
            }
        }
    }

    fn request_interrupt(&mut self, vector: u8) {
        trace!("micro16 interrupt {} requested", vector);
        self.int_pending = true;
        self.int_vector = vector;
    }

    fn state(&self) -> CpuState {
        if self.error.is_some() {
            CpuState::Errored
        } else if self.halted {
            CpuState::Halted
        } else if self.waiting {
            CpuState::Waiting
        } else {
            CpuState::Running
        }
    }

    fn interrupt_deliverable(&self) -> bool {
        self.int_pending && self.flag(Micro16Flags::INTERRUPT)
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
        physical(self.seg[CS as usize], self.pc)
    }

    fn memory(&self) -> &[u8] {
        self.memory.as_slice()
    }

    fn architecture(&self) -> Architecture {
        Architecture::Micro16
    }

    fn register_values(&self) -> Vec<u16> {
        self.r.to_vec()
    }

    fn flag_bits(&self) -> u16 {
        self.flags.bits()
    }

    fn register_dump(&self) -> String {
        const NAMES: [&str; 8] = ["AX", "BX", "CX", "DX", "SI", "DI", "BP", "R7"];
        let regs: Vec<String> = NAMES
            .iter()
            .zip(self.r.iter())
            .map(|(name, v)| format!("{}={:04X}", name, v))
            .collect();
        let flag = |f: Micro16Flags, c: char| if self.flag(f) { c } else { '-' };
        format!(
            "CS:PC={:04X}:{:04X} SS:SP={:04X}:{:04X} DS={:04X} ES={:04X} {} [{}{}{}{}{}{}{}{}]",
            self.seg[CS as usize],
            self.pc,
            self.seg[SS as usize],
            self.sp,
            self.seg[DS as usize],
            self.seg[ES as usize],
            regs.join(" "),
            flag(Micro16Flags::PARITY, 'P'),
            flag(Micro16Flags::TRAP, 'T'),
            flag(Micro16Flags::INTERRUPT, 'I'),
            flag(Micro16Flags::DIRECTION, 'D'),
            flag(Micro16Flags::OVERFLOW, 'O'),
            flag(Micro16Flags::SIGN, 'S'),
            flag(Micro16Flags::ZERO, 'Z'),
            flag(Micro16Flags::CARRY, 'C'),
        )
    }
}
