//! # CPU State and Execution Contract
//!
//! The `Machine` trait is the surface every CPU in the crate exposes to hosts: the
//! debugger, the CLI and the WebAssembly bindings drive all three architectures through
//! it without knowing which one they hold.
//!
//! ## Execution Model
//!
//! - `step()`: execute one instruction, returning the cycles it consumed (0 when halted
//!   or errored)
//! - `run(max_cycles)`: call `step` until the CPU stops or the budget is spent
//!
//! ## States
//!
//! ```text
//!            WAIT                      enabled interrupt
//! Running ---------> Waiting ------------------------------> Running
//!    |  HLT
//!    +-----> Halted            (terminal until reset)
//!    |  fault
//!    +-----> Errored + Halted  (terminal until reset)
//! ```

use crate::Architecture;

/// Externally visible execution state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CpuState {
    /// Fetching and executing instructions
    Running,
    /// Idle until an enabled interrupt arrives (Micro16 only)
    Waiting,
    /// Stopped by HLT
    Halted,
    /// Stopped by a fault; `error_message` explains why
    Errored,
}

/// Common contract of the Micro4, Micro8 and Micro16 CPUs.
///
/// # Examples
///
/// ```
/// use libmicro::{Architecture, Machine};
///
/// let mut cpu = Architecture::Micro16.new_machine();
/// cpu.load_program(&[0x01], 0x0100); // HLT
/// assert_eq!(cpu.run(0), 2);
/// assert!(cpu.is_halted());
/// assert_eq!(cpu.step(), 0);
/// ```
pub trait Machine {
    /// Restores registers, flags, PC and SP to power-on values; memory is preserved.
    fn reset(&mut self);

    /// Copies `bytes` into memory at `start`.
    ///
    /// Bytes past the end of the address space are dropped silently; the number dropped
    /// is returned so callers can detect truncation.
    fn load_program(&mut self, bytes: &[u8], start: u32) -> usize;

    /// Executes one instruction and returns the cycles consumed.
    ///
    /// Returns 0 when the CPU is halted or errored, or when this instruction faulted.
    fn step(&mut self) -> u32;

    /// Latches an interrupt request; it is considered at the start of the next `step`.
    fn request_interrupt(&mut self, vector: u8);

    /// Current execution state.
    fn state(&self) -> CpuState;

    /// Returns true if a pending interrupt would be delivered by the next `step`.
    fn interrupt_deliverable(&self) -> bool;

    /// Message describing the fault, if the CPU is errored.
    fn error_message(&self) -> Option<String>;

    /// Total cycles consumed since power-on.
    fn cycles(&self) -> u64;

    /// Total instructions executed since power-on.
    fn instructions(&self) -> u64;

    /// Address of the next instruction (physical address on Micro16).
    fn program_counter(&self) -> u32;

    /// The whole address space.
    fn memory(&self) -> &[u8];

    /// Instruction set this CPU executes.
    fn architecture(&self) -> Architecture;

    /// General registers in index order (the accumulator alone on Micro4).
    fn register_values(&self) -> Vec<u16>;

    /// Raw bits of the flags register.
    fn flag_bits(&self) -> u16;

    /// One-line register and flag summary for monitors.
    fn register_dump(&self) -> String;

    /// Returns true once the CPU has stopped, whether by HLT or by a fault.
    fn is_halted(&self) -> bool {
        matches!(self.state(), CpuState::Halted | CpuState::Errored)
    }

    /// Returns true if the CPU stopped on a fault.
    fn is_error(&self) -> bool {
        self.state() == CpuState::Errored
    }

    /// Runs until the CPU stops or `max_cycles` is reached (`<= 0` means no limit).
    ///
    /// A waiting CPU with no deliverable interrupt also ends the run, since nothing can
    /// wake it while `run` holds control.
    ///
    /// # Returns
    ///
    /// Cycles consumed by this call.
    fn run(&mut self, max_cycles: i64) -> u64 {
        let mut total: u64 = 0;

        loop {
            if max_cycles > 0 && total >= max_cycles as u64 {
                break;
            }
            if self.state() == CpuState::Waiting && !self.interrupt_deliverable() {
                break;
            }
            let cycles = self.step();
            if cycles == 0 {
                break;
            }
            total += cycles as u64;
        }

        total
    }
}

impl<T: Machine + ?Sized> Machine for Box<T> {
    fn reset(&mut self) {
        (**self).reset()
    }

    fn load_program(&mut self, bytes: &[u8], start: u32) -> usize {
        (**self).load_program(bytes, start)
    }

    fn step(&mut self) -> u32 {
        (**self).step()
    }

    fn request_interrupt(&mut self, vector: u8) {
        (**self).request_interrupt(vector)
    }

    fn state(&self) -> CpuState {
        (**self).state()
    }

    fn interrupt_deliverable(&self) -> bool {
        (**self).interrupt_deliverable()
    }

    fn error_message(&self) -> Option<String> {
        (**self).error_message()
    }

    fn cycles(&self) -> u64 {
        (**self).cycles()
    }

    fn instructions(&self) -> u64 {
        (**self).instructions()
    }

    fn program_counter(&self) -> u32 {
        (**self).program_counter()
    }

    fn memory(&self) -> &[u8] {
        (**self).memory()
    }

    fn architecture(&self) -> Architecture {
        (**self).architecture()
    }

    fn register_values(&self) -> Vec<u16> {
        (**self).register_values()
    }

    fn flag_bits(&self) -> u16 {
        (**self).flag_bits()
    }

    fn register_dump(&self) -> String {
        (**self).register_dump()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::micro16::Micro16;
    use crate::micro8::Micro8;

    #[test]
    fn test_run_respects_cycle_budget() {
        let mut cpu = Micro8::new();
        // JMP 0x0200 forever
        cpu.load_program(&[0xC0, 0x00, 0x02], 0x0200);

        let used = cpu.run(40);
        assert!(used >= 40);
        assert!(used < 40 + 4);
        assert_eq!(cpu.state(), CpuState::Running);
    }

    #[test]
    fn test_run_unbounded_stops_at_halt() {
        let mut cpu = Micro8::new();
        cpu.load_program(&[0x00, 0x00, 0x01], 0x0200);
        assert_eq!(cpu.run(0), 2 + 2 + 2);
        assert_eq!(cpu.state(), CpuState::Halted);
    }

    #[test]
    fn test_run_returns_when_waiting_without_interrupt() {
        let mut cpu = Micro16::new();
        cpu.load_program(&[0x02], 0x0100); // WAIT
        cpu.run(-1);
        assert_eq!(cpu.state(), CpuState::Waiting);
    }
}
