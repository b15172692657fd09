//! WASM API for the Micro emulators.
//!
//! Provides JavaScript-callable interfaces for CPU control, state inspection,
//! breakpoints, and assembly/disassembly operations.

use crate::debugger::{Debugger, StopReason};
use crate::{
    assemble, disassemble, format_instruction, Architecture, AssemblerOutput, DisassemblyOptions,
    Machine,
};
use wasm_bindgen::prelude::*;

/// Cells per page returned by `get_memory_page`.
const PAGE_SIZE: u32 = 256;

/// Upper bound on cells one instruction can cover (a 4-byte Micro4 instruction).
const MAX_INSTRUCTION_CELLS: u32 = 8;

/// JavaScript-compatible error wrapper
#[wasm_bindgen]
#[derive(Debug, Clone)]
pub struct JsError {
    message: String,
}

#[wasm_bindgen]
impl JsError {
    #[wasm_bindgen(constructor)]
    pub fn new(message: &str) -> JsError {
        JsError {
            message: message.to_string(),
        }
    }

    #[wasm_bindgen(getter)]
    pub fn message(&self) -> String {
        self.message.clone()
    }
}

/// Result of assembly operation
#[wasm_bindgen]
#[derive(Debug, Clone)]
pub struct AssemblyResult {
    success: bool,
    machine_code: Vec<u8>,
    start_addr: u32,
    end_addr: u32,
    error_message: Option<String>,
    error_line: Option<usize>,
    symbols: String,
}

#[wasm_bindgen]
impl AssemblyResult {
    #[wasm_bindgen(getter)]
    pub fn success(&self) -> bool {
        self.success
    }

    #[wasm_bindgen(getter)]
    pub fn machine_code(&self) -> Vec<u8> {
        self.machine_code.clone()
    }

    #[wasm_bindgen(getter)]
    pub fn start_addr(&self) -> u32 {
        self.start_addr
    }

    /// One past the last emitted cell.
    #[wasm_bindgen(getter)]
    pub fn end_addr(&self) -> u32 {
        self.end_addr
    }

    #[wasm_bindgen(getter)]
    pub fn error_message(&self) -> Option<String> {
        self.error_message.clone()
    }

    #[wasm_bindgen(getter)]
    pub fn error_line(&self) -> Option<usize> {
        self.error_line
    }

    /// Label and equate listing.
    #[wasm_bindgen(getter)]
    pub fn symbols(&self) -> String {
        self.symbols.clone()
    }
}

/// Result of disassembly operation
#[wasm_bindgen]
#[derive(Debug, Clone)]
pub struct DisassemblyLine {
    address: u32,
    bytes: Vec<u8>,
    mnemonic: String,
    operand: String,
}

#[wasm_bindgen]
impl DisassemblyLine {
    #[wasm_bindgen(getter)]
    pub fn address(&self) -> u32 {
        self.address
    }

    #[wasm_bindgen(getter)]
    pub fn bytes(&self) -> Vec<u8> {
        self.bytes.clone()
    }

    #[wasm_bindgen(getter)]
    pub fn mnemonic(&self) -> String {
        self.mnemonic.clone()
    }

    #[wasm_bindgen(getter)]
    pub fn operand(&self) -> String {
        self.operand.clone()
    }
}

/// Main emulator interface for JavaScript
///
/// Each handle owns one CPU; a page that wants several machines creates several
/// handles.
#[wasm_bindgen]
pub struct MicroEmulator {
    debugger: Debugger<Box<dyn Machine>>,
    architecture: Architecture,
    program_start: u32,
    program_end: u32,
}

#[wasm_bindgen]
impl MicroEmulator {
    /// Create an emulator for `micro4`, `micro8` or `micro16`
    #[wasm_bindgen(constructor)]
    pub fn new(architecture: &str) -> Result<MicroEmulator, JsError> {
        let architecture: Architecture = architecture
            .parse()
            .map_err(|e: crate::UnknownArchitecture| JsError::new(&e.to_string()))?;
        let origin = architecture.default_origin();

        Ok(MicroEmulator {
            debugger: Debugger::new(architecture.new_machine()),
            architecture,
            program_start: origin,
            program_end: origin,
        })
    }

    #[wasm_bindgen(getter)]
    pub fn architecture(&self) -> String {
        self.architecture.to_string()
    }

    /// Execute a single instruction and return its cycles
    pub fn step(&mut self) -> Result<u32, JsError> {
        let cycles = self.debugger.step();
        self.fault()?;
        Ok(cycles)
    }

    /// Run until a breakpoint, a stop, or the cycle budget; returns cycles executed
    pub fn run_for_cycles(&mut self, cycles: u32) -> Result<u32, JsError> {
        let summary = self.debugger.run_until_break(cycles.max(1) as u64);
        if let StopReason::Errored(msg) = summary.reason {
            return Err(JsError::new(&msg));
        }
        Ok(summary.cycles as u32)
    }

    /// Reset the CPU; memory and breakpoints are kept
    pub fn reset(&mut self) {
        self.debugger.machine_mut().reset();
    }

    /// Raise an interrupt request
    pub fn interrupt(&mut self, vector: u8) {
        self.debugger.machine_mut().request_interrupt(vector);
    }

    // State getters

    #[wasm_bindgen(getter)]
    pub fn pc(&self) -> u32 {
        self.machine().program_counter()
    }

    #[wasm_bindgen(getter)]
    pub fn cycles(&self) -> f64 {
        self.machine().cycles() as f64 // Convert u64 to f64 for JavaScript
    }

    #[wasm_bindgen(getter)]
    pub fn instructions(&self) -> f64 {
        self.machine().instructions() as f64
    }

    /// `Running`, `Waiting`, `Halted` or `Errored`
    #[wasm_bindgen(getter)]
    pub fn state(&self) -> String {
        format!("{:?}", self.machine().state())
    }

    #[wasm_bindgen(getter)]
    pub fn halted(&self) -> bool {
        self.machine().is_halted()
    }

    #[wasm_bindgen(getter)]
    pub fn error_message(&self) -> Option<String> {
        self.machine().error_message()
    }

    /// General registers in index order
    #[wasm_bindgen(getter)]
    pub fn registers(&self) -> Vec<u16> {
        self.machine().register_values()
    }

    /// Raw flags register
    #[wasm_bindgen(getter)]
    pub fn flags(&self) -> u16 {
        self.machine().flag_bits()
    }

    #[wasm_bindgen(getter)]
    pub fn register_dump(&self) -> String {
        self.machine().register_dump()
    }

    // Memory access methods

    /// Read a single cell (0 outside memory)
    pub fn read_memory(&self, addr: u32) -> u8 {
        self.machine().memory().get(addr as usize).copied().unwrap_or(0)
    }

    /// Write a single cell; returns false outside memory
    pub fn write_memory(&mut self, addr: u32, value: u8) -> bool {
        self.debugger.machine_mut().load_program(&[value], addr) == 0
    }

    /// Read a 256-cell page from memory (for efficient display)
    pub fn get_memory_page(&self, page: u32) -> Vec<u8> {
        let memory = self.machine().memory();
        let start = (page as usize).saturating_mul(PAGE_SIZE as usize);
        memory
            .get(start..)
            .map(|rest| rest.iter().take(PAGE_SIZE as usize).copied().collect())
            .unwrap_or_default()
    }

    /// Copy a program into memory; returns the number of cells dropped past the end
    pub fn load_program(&mut self, program: &[u8], start_addr: u32) -> u32 {
        let dropped = self.debugger.machine_mut().load_program(program, start_addr);
        self.program_start = start_addr;
        self.program_end = start_addr + (program.len() - dropped) as u32;
        dropped as u32
    }

    /// Assemble source for this emulator's architecture
    pub fn assemble(&self, source: String) -> AssemblyResult {
        self.build(&source).0
    }

    /// Assemble, load at the program's origin and reset the CPU
    pub fn assemble_and_load(&mut self, source: String) -> AssemblyResult {
        let (result, output) = self.build(&source);
        if let Some(output) = output {
            self.debugger.set_source(output.source_map().clone(), &source);
            self.load_program(output.bytes(), output.origin());
            self.reset();
        }
        result
    }

    // Breakpoints

    /// Set a breakpoint; returns false if one was already set there
    pub fn add_breakpoint(&mut self, addr: u32) -> Result<bool, JsError> {
        self.debugger
            .add_breakpoint(addr)
            .map_err(|e| JsError::new(&e.to_string()))
    }

    pub fn remove_breakpoint(&mut self, addr: u32) -> bool {
        self.debugger.remove_breakpoint(addr)
    }

    #[wasm_bindgen(getter)]
    pub fn breakpoints(&self) -> js_sys::Array {
        self.debugger
            .breakpoints()
            .iter()
            .map(|&a| JsValue::from(a))
            .collect()
    }

    /// Run one monitor command and return its output (errors are returned as text)
    pub fn command(&mut self, line: &str) -> String {
        self.debugger
            .execute(line)
            .unwrap_or_else(|e| e.to_string())
    }

    /// Disassemble memory starting at an address
    pub fn disassemble(&self, start_addr: u32, num_instructions: u32) -> js_sys::Array {
        let memory = self.machine().memory();
        let start = (start_addr as usize).min(memory.len());
        let window = num_instructions.saturating_mul(MAX_INSTRUCTION_CELLS) as usize;
        let end = start.saturating_add(window).min(memory.len());

        let opts = DisassemblyOptions {
            start_address: start_addr,
            hex_dump: false,
            show_offsets: false,
        };

        disassemble(self.architecture, &memory[start..end], opts)
            .iter()
            .take(num_instructions as usize)
            .map(|instr| {
                let text = format_instruction(instr);
                let operand = text
                    .split_once(' ')
                    .map(|(_, rest)| rest.to_string())
                    .unwrap_or_default();
                JsValue::from(DisassemblyLine {
                    address: instr.address,
                    bytes: instr.bytes.clone(),
                    mnemonic: instr.mnemonic.to_string(),
                    operand,
                })
            })
            .collect()
    }

    /// Get the program start address
    #[wasm_bindgen(getter)]
    pub fn program_start(&self) -> u32 {
        self.program_start
    }

    /// Get the program end address
    #[wasm_bindgen(getter)]
    pub fn program_end(&self) -> u32 {
        self.program_end
    }
}

impl MicroEmulator {
    fn machine(&self) -> &dyn Machine {
        &**self.debugger.machine()
    }

    fn fault(&self) -> Result<(), JsError> {
        match self.machine().error_message() {
            Some(msg) => Err(JsError::new(&msg)),
            None => Ok(()),
        }
    }

    fn build(&self, source: &str) -> (AssemblyResult, Option<AssemblerOutput>) {
        match assemble(self.architecture, source) {
            Ok(output) => {
                let result = AssemblyResult {
                    success: true,
                    machine_code: output.bytes().to_vec(),
                    start_addr: output.origin(),
                    end_addr: output.end().map_or(output.origin(), |end| end + 1),
                    error_message: None,
                    error_line: None,
                    symbols: output.symbol_dump(),
                };
                (result, Some(output))
            }
            Err(error) => {
                let origin = self.architecture.default_origin();
                let result = AssemblyResult {
                    success: false,
                    machine_code: Vec::new(),
                    start_addr: origin,
                    end_addr: origin,
                    error_message: Some(error.message),
                    error_line: (error.line > 0).then_some(error.line),
                    symbols: String::new(),
                };
                (result, None)
            }
        }
    }
}
