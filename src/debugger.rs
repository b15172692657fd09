//! # Debugger / Monitor
//!
//! A breakpoint monitor that drives any [`Machine`]. It is a host-side layer: the CPU
//! knows nothing about breakpoints, and the monitor only calls `step`.
//!
//! ## Commands
//!
//! | Command                   | Action                                         |
//! |---------------------------|------------------------------------------------|
//! | `s`, `step [n]`           | execute n instructions (default 1)             |
//! | `r`, `run`                | run until a breakpoint, HLT, fault or the cap  |
//! | `b`, `break addr`         | set a breakpoint                               |
//! | `d`, `delete addr`        | clear a breakpoint                             |
//! | `l`, `list`               | list breakpoints                               |
//! | `reg`, `regs`             | register dump                                  |
//! | `m`, `mem addr [len]`     | hex dump (default 128 cells)                   |
//! | `reset`                   | reset the CPU (memory is kept)                 |
//! | `h`, `help`, `?`          | command summary                                |
//! | `q`, `quit`, `exit`       | leave the monitor                              |
//!
//! Addresses are hexadecimal, with or without a `0x` or `$` prefix. A bad command
//! produces a [`DebuggerError`] and leaves the session running.

use std::fmt::Write;

use log::debug;
use thiserror::Error;

use crate::assembler::source_map::SourceMap;
use crate::cpu::{CpuState, Machine};
use crate::disassembler::{decode_instruction, format_instruction};
use crate::Architecture;

/// Cycle cap for `run` from the command interpreter.
pub const DEFAULT_RUN_CYCLES: u64 = 10_000_000;

/// Most breakpoints a session can hold.
pub const MAX_BREAKPOINTS: usize = 32;

/// Cells shown by `m addr` without a length.
const DEFAULT_DUMP_LEN: u32 = 128;

/// A monitor command that could not be carried out.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DebuggerError {
    #[error("Unknown command: {0} (type 'help' for commands)")]
    UnknownCommand(String),

    #[error("Usage: {0}")]
    Usage(&'static str),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Breakpoint table full ({} max)", MAX_BREAKPOINTS)]
    TooManyBreakpoints,
}

/// Why `run_until_break` returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// The program counter reached a breakpoint.
    Breakpoint(u32),
    /// HLT executed.
    Halted,
    /// The CPU faulted; carries its error message.
    Errored(String),
    /// WAIT with no interrupt that could wake the CPU.
    Waiting,
    /// The cycle cap was reached.
    CycleLimit,
}

/// Result of `run_until_break`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub cycles: u64,
    pub reason: StopReason,
}

/// Interactive monitor around a CPU.
///
/// # Examples
///
/// ```
/// use libmicro::debugger::{Debugger, StopReason};
/// use libmicro::{assemble, Architecture, Machine};
///
/// let out = assemble(Architecture::Micro8, "LDI R0,#1\nloop: INC R0\nJMP loop").unwrap();
/// let mut cpu = Architecture::Micro8.new_machine();
/// cpu.load_program(out.bytes(), out.origin());
///
/// let mut dbg = Debugger::new(cpu);
/// dbg.add_breakpoint(0x0202).unwrap();
/// let summary = dbg.run_until_break(1000);
/// assert_eq!(summary.reason, StopReason::Breakpoint(0x0202));
/// ```
pub struct Debugger<M: Machine> {
    machine: M,
    breakpoints: Vec<u32>,
    source: Option<(SourceMap, Vec<String>)>,
    running: bool,
}

impl<M: Machine> Debugger<M> {
    pub fn new(machine: M) -> Self {
        Self {
            machine,
            breakpoints: Vec::new(),
            source: None,
            running: true,
        }
    }

    /// Attaches assembly source so the current instruction is shown with its line.
    pub fn with_source(mut self, map: SourceMap, source: &str) -> Self {
        self.set_source(map, source);
        self
    }

    /// Replaces the attached source, e.g. after reassembling.
    pub fn set_source(&mut self, map: SourceMap, source: &str) {
        self.source = Some((map, source.lines().map(str::to_string).collect()));
    }

    pub fn machine(&self) -> &M {
        &self.machine
    }

    pub fn machine_mut(&mut self) -> &mut M {
        &mut self.machine
    }

    pub fn into_inner(self) -> M {
        self.machine
    }

    /// False once `quit` has been entered.
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Sets a breakpoint.
    ///
    /// # Returns
    ///
    /// `Ok(true)` if it was added, `Ok(false)` if one already existed there.
    pub fn add_breakpoint(&mut self, address: u32) -> Result<bool, DebuggerError> {
        if self.has_breakpoint(address) {
            return Ok(false);
        }
        if self.breakpoints.len() >= MAX_BREAKPOINTS {
            return Err(DebuggerError::TooManyBreakpoints);
        }
        self.breakpoints.push(address);
        self.breakpoints.sort_unstable();
        Ok(true)
    }

    /// Clears a breakpoint, returning whether one was set.
    pub fn remove_breakpoint(&mut self, address: u32) -> bool {
        let before = self.breakpoints.len();
        self.breakpoints.retain(|&a| a != address);
        before != self.breakpoints.len()
    }

    pub fn has_breakpoint(&self, address: u32) -> bool {
        self.breakpoints.binary_search(&address).is_ok()
    }

    /// Breakpoint addresses in ascending order.
    pub fn breakpoints(&self) -> &[u32] {
        &self.breakpoints
    }

    /// Executes one instruction; returns its cycles (0 if the CPU is stopped).
    pub fn step(&mut self) -> u32 {
        self.machine.step()
    }

    /// Runs until a breakpoint, a stop, or `max_cycles` (0 means no cap).
    ///
    /// A breakpoint at the starting PC does not stop the run, so `run` continues from
    /// the breakpoint it last stopped at.
    pub fn run_until_break(&mut self, max_cycles: u64) -> RunSummary {
        let mut cycles = 0u64;
        let mut first = true;

        let reason = loop {
            let pc = self.machine.program_counter();
            if !first && self.has_breakpoint(pc) {
                debug!("breakpoint hit at 0x{:X}", pc);
                break StopReason::Breakpoint(pc);
            }
            first = false;

            match self.machine.state() {
                CpuState::Halted => break StopReason::Halted,
                CpuState::Errored => {
                    break StopReason::Errored(self.machine.error_message().unwrap_or_default())
                }
                CpuState::Waiting if !self.machine.interrupt_deliverable() => {
                    break StopReason::Waiting
                }
                _ => {}
            }
            if max_cycles > 0 && cycles >= max_cycles {
                break StopReason::CycleLimit;
            }

            cycles += self.machine.step() as u64;
        };

        RunSummary { cycles, reason }
    }

    fn address_width(&self) -> usize {
        match self.machine.architecture() {
            Architecture::Micro4 => 2,
            Architecture::Micro8 => 4,
            Architecture::Micro16 => 5,
        }
    }

    /// The instruction at PC: breakpoint marker, address, raw cells and text.
    pub fn current_instruction(&self) -> String {
        if self.machine.is_halted() {
            return match self.machine.error_message() {
                Some(msg) => format!("[HALTED] Error: {}", msg),
                None => "[HALTED]".to_string(),
            };
        }

        let pc = self.machine.program_counter();
        let memory = self.machine.memory();
        let marker = if self.has_breakpoint(pc) { '*' } else { ' ' };
        let width = self.address_width();

        let (cells, text) = match memory
            .get(pc as usize..)
            .and_then(|rest| decode_instruction(self.machine.architecture(), rest, pc))
        {
            Some(instr) => (instr.bytes.clone(), format_instruction(&instr)),
            None => {
                let cell = memory.get(pc as usize).copied().unwrap_or(0);
                (vec![cell], format!(".db 0x{:02X}", cell))
            }
        };
        let cells: Vec<String> = cells.iter().map(|c| format!("{:02X}", c)).collect();

        let mut line = format!(
            "{}0x{:0width$X}: {:<15} {}",
            marker,
            pc,
            cells.join(" "),
            text,
            width = width
        );
        if let Some((map, lines)) = &self.source {
            if let Some(location) = map.get_source_location(pc) {
                if let Some(src) = lines.get(location.line - 1) {
                    let _ = write!(line, "    ; {}: {}", location.line, src.trim());
                }
            }
        }
        line
    }

    /// Registers, flags and counters.
    pub fn register_dump(&self) -> String {
        let m = &self.machine;
        let mut out = format!(
            "{}\nCycles: {}    Instructions: {}    State: {:?}",
            m.register_dump(),
            m.cycles(),
            m.instructions(),
            m.state()
        );
        if let Some(msg) = m.error_message() {
            let _ = write!(out, "\nError: {}", msg);
        }
        out
    }

    /// Hex and ASCII dump of `len` cells from `start`, 16 per row.
    ///
    /// Rows start on a 16-cell boundary; cells outside the range are blank. The range
    /// is clipped to the end of memory.
    pub fn memory_dump(&self, start: u32, len: u32) -> String {
        let memory = self.machine.memory();
        let end = (start as u64 + len as u64).min(memory.len() as u64) as u32;
        let width = self.address_width();
        let mut out = String::new();

        let mut row = start & !0x0F;
        while row < end {
            let _ = write!(out, "0x{:0width$X}: ", row, width = width);
            let mut ascii = String::new();
            for i in 0..16 {
                let addr = row + i;
                if addr >= start && addr < end {
                    let b = memory[addr as usize];
                    let _ = write!(out, "{:02X} ", b);
                    ascii.push(if (32..127).contains(&b) { b as char } else { '.' });
                } else {
                    out.push_str("   ");
                    ascii.push(' ');
                }
                if i == 7 {
                    out.push(' ');
                }
            }
            let _ = writeln!(out, " |{}|", ascii);
            row += 16;
        }
        out
    }

    /// Runs one command line and returns the text to show.
    ///
    /// Errors describe a bad command; the session continues either way.
    pub fn execute(&mut self, line: &str) -> Result<String, DebuggerError> {
        let mut words = line.split_whitespace();
        let Some(command) = words.next() else {
            return Ok(String::new());
        };
        let args: Vec<&str> = words.collect();

        match command.to_ascii_lowercase().as_str() {
            "s" | "step" => {
                let count = match args.first() {
                    Some(n) => n
                        .parse::<u32>()
                        .map_err(|_| DebuggerError::Usage("step [count]"))?,
                    None => 1,
                };
                if self.machine.is_halted() {
                    return Ok(format!("CPU is halted\n{}", self.current_instruction()));
                }
                let mut cycles = 0u64;
                for _ in 0..count.max(1) {
                    let c = self.step();
                    if c == 0 {
                        break;
                    }
                    cycles += c as u64;
                }
                Ok(format!(
                    "Executed in {} cycle{}\n{}",
                    cycles,
                    if cycles == 1 { "" } else { "s" },
                    self.current_instruction()
                ))
            }
            "r" | "run" => {
                let summary = self.run_until_break(DEFAULT_RUN_CYCLES);
                let reason = match &summary.reason {
                    StopReason::Breakpoint(pc) => {
                        format!("Breakpoint hit at 0x{:0w$X}", pc, w = self.address_width())
                    }
                    StopReason::Halted => "CPU halted".to_string(),
                    StopReason::Errored(msg) => format!("CPU error: {}", msg),
                    StopReason::Waiting => "CPU waiting for interrupt".to_string(),
                    StopReason::CycleLimit => {
                        format!("Max cycles ({}) reached", DEFAULT_RUN_CYCLES)
                    }
                };
                Ok(format!(
                    "{}\nExecuted {} cycles\n{}",
                    reason,
                    summary.cycles,
                    self.current_instruction()
                ))
            }
            "b" | "break" => {
                let address = self.address_arg(&args, "break <addr>")?;
                let width = self.address_width();
                Ok(match self.add_breakpoint(address)? {
                    true => format!("Breakpoint set at 0x{:0width$X}", address, width = width),
                    false => format!(
                        "Breakpoint already set at 0x{:0width$X}",
                        address,
                        width = width
                    ),
                })
            }
            "d" | "delete" => {
                let address = self.address_arg(&args, "delete <addr>")?;
                let width = self.address_width();
                Ok(match self.remove_breakpoint(address) {
                    true => format!("Breakpoint cleared at 0x{:0width$X}", address, width = width),
                    false => format!("No breakpoint at 0x{:0width$X}", address, width = width),
                })
            }
            "l" | "list" => {
                if self.breakpoints.is_empty() {
                    return Ok("No breakpoints set".to_string());
                }
                let width = self.address_width();
                let mut out = format!("Breakpoints ({} active):", self.breakpoints.len());
                for (i, bp) in self.breakpoints.iter().enumerate() {
                    let _ = write!(out, "\n  [{:2}] 0x{:0width$X}", i, bp, width = width);
                }
                Ok(out)
            }
            "reg" | "regs" | "registers" => Ok(self.register_dump()),
            "m" | "mem" | "memory" => {
                let start = self.address_arg(&args, "mem <addr> [len]")?;
                let len = match args.get(1) {
                    Some(text) => parse_address(text)
                        .ok_or_else(|| DebuggerError::InvalidAddress(text.to_string()))?,
                    None => DEFAULT_DUMP_LEN,
                };
                Ok(self.memory_dump(start, len))
            }
            "reset" => {
                self.machine.reset();
                Ok(format!("CPU reset\n{}", self.current_instruction()))
            }
            "h" | "help" | "?" => Ok(HELP.to_string()),
            "q" | "quit" | "exit" => {
                self.running = false;
                Ok(String::new())
            }
            other => Err(DebuggerError::UnknownCommand(other.to_string())),
        }
    }

    fn address_arg(&self, args: &[&str], usage: &'static str) -> Result<u32, DebuggerError> {
        let text = args.first().ok_or(DebuggerError::Usage(usage))?;
        let address =
            parse_address(text).ok_or_else(|| DebuggerError::InvalidAddress(text.to_string()))?;
        if address as usize >= self.machine.memory().len() {
            return Err(DebuggerError::InvalidAddress(text.to_string()));
        }
        Ok(address)
    }
}

const HELP: &str = "\
Commands:
  s, step [n]        execute n instructions
  r, run             run until breakpoint or halt
  b, break <addr>    set breakpoint
  d, delete <addr>   clear breakpoint
  l, list            list breakpoints
  reg                show registers
  m, mem <addr> [n]  dump n cells (hex)
  reset              reset CPU
  q, quit            leave the monitor";

/// Parses a hexadecimal address, with or without `0x` / `$`.
fn parse_address(text: &str) -> Option<u32> {
    let digits = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
        .or_else(|| text.strip_prefix('$'))
        .unwrap_or(text);
    u32::from_str_radix(digits, 16).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembler::assemble;
    use crate::micro8::Micro8;

    fn debugger(source: &str) -> Debugger<Micro8> {
        let out = assemble(Architecture::Micro8, source).unwrap();
        let mut cpu = Micro8::new();
        cpu.load_program(out.bytes(), out.origin());
        Debugger::new(cpu).with_source(out.source_map().clone(), source)
    }

    #[test]
    fn test_parse_address() {
        assert_eq!(parse_address("0x200"), Some(0x200));
        assert_eq!(parse_address("$ff"), Some(0xFF));
        assert_eq!(parse_address("1234"), Some(0x1234));
        assert_eq!(parse_address("zz"), None);
    }

    #[test]
    fn test_breakpoint_management() {
        let mut dbg = debugger("HLT");
        assert_eq!(dbg.add_breakpoint(0x0210), Ok(true));
        assert_eq!(dbg.add_breakpoint(0x0200), Ok(true));
        assert_eq!(dbg.add_breakpoint(0x0210), Ok(false));
        assert_eq!(dbg.breakpoints(), &[0x0200, 0x0210]);
        assert!(dbg.remove_breakpoint(0x0200));
        assert!(!dbg.remove_breakpoint(0x0200));

        for a in 0..MAX_BREAKPOINTS as u32 - 1 {
            dbg.add_breakpoint(0x1000 + a).unwrap();
        }
        assert_eq!(dbg.add_breakpoint(0x2000), Err(DebuggerError::TooManyBreakpoints));
    }

    #[test]
    fn test_run_stops_at_breakpoint_then_continues() {
        let mut dbg = debugger("LDI R0,#3\nloop: DEC R0\nJNZ loop\nHLT");
        dbg.add_breakpoint(0x0202).unwrap();

        let first = dbg.run_until_break(0);
        assert_eq!(first.reason, StopReason::Breakpoint(0x0202));
        assert_eq!(dbg.machine().register(0), 3);

        // resuming from the breakpoint runs one more loop iteration
        let second = dbg.run_until_break(0);
        assert_eq!(second.reason, StopReason::Breakpoint(0x0202));
        assert_eq!(dbg.machine().register(0), 2);

        dbg.remove_breakpoint(0x0202);
        assert_eq!(dbg.run_until_break(0).reason, StopReason::Halted);
        assert_eq!(dbg.machine().register(0), 0);
    }

    #[test]
    fn test_run_reports_fault_and_cycle_cap() {
        let mut dbg = debugger("DB 0xFF");
        let summary = dbg.run_until_break(0);
        assert!(matches!(summary.reason, StopReason::Errored(ref m) if m.starts_with("Unknown opcode: 0xFF")));

        let mut dbg = debugger("loop: JMP loop");
        let summary = dbg.run_until_break(100);
        assert_eq!(summary.reason, StopReason::CycleLimit);
        assert!(summary.cycles >= 100);
    }

    #[test]
    fn test_current_instruction_annotated() {
        let mut dbg = debugger("start: LDI R0,#0x2A ; answer\nHLT");
        dbg.add_breakpoint(0x0200).unwrap();
        assert_eq!(
            dbg.current_instruction(),
            "*0x0200: 06 2A           LDI R0,#0x2A    ; 1: start: LDI R0,#0x2A ; answer"
        );
        dbg.step();
        dbg.step();
        assert_eq!(dbg.current_instruction(), "[HALTED]");
    }

    #[test]
    fn test_memory_dump_alignment() {
        let dbg = debugger("DB \"Hello\"");
        let dump = dbg.memory_dump(0x0202, 3);
        assert_eq!(
            dump,
            "0x0200:       6C 6C 6F                                    |  llo           |\n"
        );
    }

    #[test]
    fn test_command_interpreter() {
        let mut dbg = debugger("LDI R1,#7\nHLT");
        assert!(dbg.execute("b 202").unwrap().contains("Breakpoint set at 0x0202"));
        assert!(dbg.execute("list").unwrap().contains("[ 0] 0x0202"));
        assert!(dbg.execute("r").unwrap().starts_with("Breakpoint hit at 0x0202"));
        assert!(dbg.execute("reg").unwrap().contains("R1=07"));
        assert!(dbg.execute("s").unwrap().contains("[HALTED]"));
        assert!(dbg.execute("step").unwrap().starts_with("CPU is halted"));
        assert!(dbg.execute("reset").unwrap().contains("0x0200"));
        assert_eq!(dbg.execute(""), Ok(String::new()));

        assert_eq!(
            dbg.execute("frobnicate"),
            Err(DebuggerError::UnknownCommand("frobnicate".to_string()))
        );
        assert_eq!(dbg.execute("b"), Err(DebuggerError::Usage("break <addr>")));
        assert_eq!(
            dbg.execute("m 10000"),
            Err(DebuggerError::InvalidAddress("10000".to_string()))
        );

        assert!(dbg.is_running());
        dbg.execute("quit").unwrap();
        assert!(!dbg.is_running());
    }
}
