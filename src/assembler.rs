//! # Two-Pass Assembler
//!
//! Converts assembly source into a flat memory image for any of the three CPUs.
//!
//! Pass 1 walks the source collecting labels and equates while only *counting* the
//! cells each line occupies; unknown names stand in as 0 so forward references size
//! correctly. Pass 2 walks the same text again from the top, with every symbol known,
//! and emits cells. The first error in either pass aborts the assembly.
//!
//! ## Directives
//!
//! | Directive                    | Effect                                          |
//! |------------------------------|-------------------------------------------------|
//! | `ORG addr`                   | move the address counter (origin tracks the min) |
//! | `NAME EQU v` / `NAME = v`    | define a constant                               |
//! | `DB v, "text", ...`          | bytes (nibbles on Micro4)                       |
//! | `DW v, ...`                  | little-endian words                             |
//! | `DD v, ...`                  | little-endian double words (Micro16)            |
//! | `DS n`                       | n zero cells                                    |
//! | `SEGMENT v`                  | record the code segment (Micro16)               |
//!
//! Dotted spellings (`.org`, `.db`, `.byte`, `.word`, `.dword`, `.space`) are accepted.

pub mod encoder;
pub mod intel_hex;
pub mod lexer;
pub mod micro16;
pub mod micro4;
pub mod micro8;
pub mod parser;
pub mod source_map;
pub mod symbol_table;

use std::fs;
use std::path::Path;

use log::info;
use thiserror::Error;

use crate::Architecture;
use encoder::{Context, Encoder};
use parser::{Body, Operand};
use source_map::{SourceLocation, SourceMap};
use symbol_table::{DefineError, SymbolTable};

/// The first error of a failed assembly.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", located(.line, .message))]
pub struct AssemblerError {
    /// Error type classification
    pub error_type: ErrorType,

    /// Source line where the error occurred (1-indexed, 0 if not tied to a line)
    pub line: usize,

    /// Human-readable error message
    pub message: String,
}

fn located(line: &usize, message: &str) -> String {
    match line {
        0 => message.to_string(),
        n => format!("line {}: {}", n, message),
    }
}

impl AssemblerError {
    /// Creates an error not yet tied to a source line.
    pub fn new(error_type: ErrorType, message: impl Into<String>) -> Self {
        Self {
            error_type,
            line: 0,
            message: message.into(),
        }
    }

    /// Attaches the source line, keeping one that is already set.
    pub fn at_line(mut self, line: usize) -> Self {
        if self.line == 0 {
            self.line = line;
        }
        self
    }
}

/// Classification of assembly errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorType {
    /// Malformed line (unexpected character, bad number, missing bracket)
    SyntaxError,

    /// Name that is not a label or equate (pass 2, or an equate/ORG/DS argument)
    UndefinedSymbol,

    /// Name defined twice
    DuplicateSymbol,

    /// Bad label or equate name (reserved word, bad characters, too long)
    InvalidLabel,

    /// Not an instruction of this architecture
    InvalidMnemonic,

    /// Operands that fit none of the instruction's forms
    InvalidOperand,

    /// Value, displacement, relative jump or address out of range
    RangeError,

    /// Unknown directive, or one the architecture does not have
    InvalidDirective,

    /// Label or equate table full
    CapacityExceeded,

    /// Source or output file could not be read or written
    Io,
}

/// Whether a symbol names an address or a constant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    /// `name:` at an address
    Label,
    /// `NAME EQU value`
    Equate,
}

/// A symbol table entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    /// Name as written at its definition
    pub name: String,

    pub kind: SymbolKind,

    /// Address (labels) or value (equates)
    pub value: i64,

    /// Source line where the symbol was defined
    pub defined_at: usize,
}

/// Assembler directives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Directive {
    Org,
    Segment,
    Db,
    Dw,
    Dd,
    Ds,
}

impl Directive {
    /// Recognises a directive name in any case, with or without the leading dot.
    pub fn parse(name: &str) -> Option<Self> {
        let directive = match name.to_ascii_uppercase().as_str() {
            "ORG" | ".ORG" => Directive::Org,
            "SEGMENT" | ".SEGMENT" => Directive::Segment,
            "DB" | ".DB" | ".BYTE" => Directive::Db,
            "DW" | ".DW" | ".WORD" => Directive::Dw,
            "DD" | ".DD" | ".DWORD" => Directive::Dd,
            "DS" | ".DS" | ".SPACE" => Directive::Ds,
            _ => return None,
        };
        Some(directive)
    }

    /// Canonical spelling for diagnostics.
    pub fn name(self) -> &'static str {
        match self {
            Directive::Org => "ORG",
            Directive::Segment => "SEGMENT",
            Directive::Db => "DB",
            Directive::Dw => "DW",
            Directive::Dd => "DD",
            Directive::Ds => "DS",
        }
    }
}

/// Counters reported after a successful assembly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AssemblyStats {
    /// Source lines read in the final pass
    pub lines_processed: usize,

    /// Cells emitted
    pub bytes_generated: usize,

    pub label_count: usize,

    pub equate_count: usize,
}

/// Complete output from assembling source code
#[derive(Debug, Clone)]
pub struct AssemblerOutput {
    architecture: Architecture,
    bytes: Vec<u8>,
    origin: u32,
    symbols: SymbolTable,
    source_map: SourceMap,
    stats: AssemblyStats,
    segment: Option<u16>,
}

impl AssemblerOutput {
    /// Memory contents from `origin` through the highest address written.
    ///
    /// Each element is one memory cell: a nibble (0-15) on Micro4, a byte otherwise.
    /// Gaps left by `ORG` jumps are zero.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Address of the first cell of `bytes()`.
    pub fn origin(&self) -> u32 {
        self.origin
    }

    /// Highest address written, or `None` if nothing was emitted.
    pub fn end(&self) -> Option<u32> {
        match self.bytes.len() {
            0 => None,
            n => Some(self.origin + n as u32 - 1),
        }
    }

    pub fn architecture(&self) -> Architecture {
        self.architecture
    }

    /// All labels and equates, in definition order.
    pub fn symbols(&self) -> &[Symbol] {
        self.symbols.symbols()
    }

    /// Looks up a label or equate by name, ignoring case.
    pub fn lookup(&self, name: &str) -> Option<i64> {
        self.symbols.lookup_symbol(name).map(|s| s.value)
    }

    pub fn source_map(&self) -> &SourceMap {
        &self.source_map
    }

    pub fn stats(&self) -> AssemblyStats {
        self.stats
    }

    /// Code segment set by the last `SEGMENT` directive, if any.
    pub fn segment(&self) -> Option<u16> {
        self.segment
    }

    /// The image as Intel HEX text.
    pub fn to_intel_hex(&self) -> String {
        intel_hex::to_intel_hex(self.origin, &self.bytes)
    }

    /// Writes the raw image to `path`.
    pub fn write_binary(&self, path: impl AsRef<Path>) -> Result<(), AssemblerError> {
        write_file(path.as_ref(), self.bytes.as_slice())
    }

    /// Writes the image to `path` as Intel HEX.
    pub fn write_hex(&self, path: impl AsRef<Path>) -> Result<(), AssemblerError> {
        write_file(path.as_ref(), self.to_intel_hex().as_bytes())
    }

    /// Human-readable listing of labels and equates.
    ///
    /// ```text
    /// === Labels (2) ===
    ///   START = 0x0200
    ///   LOOP = 0x0203
    /// === Equates (1) ===
    ///   COUNT = 0x000A
    /// ```
    pub fn symbol_dump(&self) -> String {
        let width = match self.architecture {
            Architecture::Micro4 => 2,
            Architecture::Micro8 => 4,
            Architecture::Micro16 => 5,
        };
        let mut out = String::new();
        for (title, kind) in [("Labels", SymbolKind::Label), ("Equates", SymbolKind::Equate)] {
            let entries: Vec<_> = self.symbols().iter().filter(|s| s.kind == kind).collect();
            out.push_str(&format!("=== {} ({}) ===\n", title, entries.len()));
            for symbol in entries {
                let value = if symbol.value < 0 {
                    format!("-0x{:0width$X}", -symbol.value, width = width)
                } else {
                    format!("0x{:0width$X}", symbol.value, width = width)
                };
                out.push_str(&format!("  {} = {}\n", symbol.name, value));
            }
        }
        out
    }
}

fn write_file(path: &Path, contents: &[u8]) -> Result<(), AssemblerError> {
    fs::write(path, contents).map_err(|e| {
        AssemblerError::new(
            ErrorType::Io,
            format!("Cannot write file: {}: {}", path.display(), e),
        )
    })
}

/// Assembles `source` for `arch`.
///
/// # Examples
///
/// ```
/// use libmicro::{assemble, Architecture};
///
/// let out = assemble(Architecture::Micro8, "start: LDI R0,#1\n JMP start").unwrap();
/// assert_eq!(out.origin(), 0x0200);
/// assert_eq!(out.bytes(), &[0x06, 0x01, 0xC0, 0x00, 0x02]);
/// assert_eq!(out.lookup("START"), Some(0x0200));
/// ```
pub fn assemble(arch: Architecture, source: &str) -> Result<AssemblerOutput, AssemblerError> {
    let mut assembler = Assembler::new(arch);
    assembler.pass(source, false)?;
    assembler.pass(source, true)?;
    Ok(assembler.finish())
}

/// Reads `path` and assembles it for `arch`.
pub fn assemble_file(
    arch: Architecture,
    path: impl AsRef<Path>,
) -> Result<AssemblerOutput, AssemblerError> {
    let path = path.as_ref();
    let source = fs::read_to_string(path).map_err(|e| {
        AssemblerError::new(
            ErrorType::Io,
            format!("Cannot open file: {}: {}", path.display(), e),
        )
    })?;
    assemble(arch, &source)
}

/// State of one assembly across both passes.
struct Assembler {
    arch: Architecture,
    encoder: Box<dyn Encoder>,
    symbols: SymbolTable,
    image: Vec<u8>,
    origin: u32,
    address: u32,
    max_addr: Option<u32>,
    bytes_generated: usize,
    lines_processed: usize,
    segment: Option<u16>,
    source_map: SourceMap,
    final_pass: bool,
}

impl Assembler {
    fn new(arch: Architecture) -> Self {
        let (encoder, memory_size, max_labels, max_equates): (Box<dyn Encoder>, _, _, _) =
            match arch {
                Architecture::Micro4 => (
                    Box::new(micro4::Micro4Encoder),
                    crate::micro4::MEMORY_SIZE,
                    crate::micro4::MAX_LABELS,
                    crate::micro4::MAX_EQUATES,
                ),
                Architecture::Micro8 => (
                    Box::new(micro8::Micro8Encoder),
                    crate::micro8::MEMORY_SIZE,
                    crate::micro8::MAX_LABELS,
                    crate::micro8::MAX_EQUATES,
                ),
                Architecture::Micro16 => (
                    Box::new(micro16::Micro16Encoder),
                    crate::micro16::MEMORY_SIZE,
                    crate::micro16::MAX_LABELS,
                    crate::micro16::MAX_EQUATES,
                ),
            };

        Self {
            arch,
            encoder,
            symbols: SymbolTable::new(max_labels, max_equates),
            image: vec![0; memory_size],
            origin: arch.default_origin(),
            address: arch.default_origin(),
            max_addr: None,
            bytes_generated: 0,
            lines_processed: 0,
            segment: None,
            source_map: SourceMap::new(),
            final_pass: false,
        }
    }

    /// Runs one pass over the whole source.
    fn pass(&mut self, source: &str, final_pass: bool) -> Result<(), AssemblerError> {
        self.final_pass = final_pass;
        self.address = self.arch.default_origin();
        self.origin = self.arch.default_origin();
        self.max_addr = None;
        self.bytes_generated = 0;
        self.lines_processed = 0;
        self.segment = None;

        for (index, line) in source.lines().enumerate() {
            let number = index + 1;
            self.lines_processed += 1;
            self.line(line, number).map_err(|e| e.at_line(number))?;
        }
        Ok(())
    }

    fn context(&self) -> Context<'_> {
        Context {
            symbols: &self.symbols,
            address: self.address,
            final_pass: self.final_pass,
        }
    }

    fn line(&mut self, text: &str, number: usize) -> Result<(), AssemblerError> {
        let statement = parser::parse_line(text)?;

        if let Some(label) = statement.label {
            if !self.final_pass {
                self.define(label, SymbolKind::Label, self.address as i64, number)?;
            }
        }

        match statement.body {
            Body::Empty => Ok(()),
            Body::Equate { name, value } => {
                if !self.final_pass {
                    let value = self.context().resolve(&value)?;
                    self.define(name, SymbolKind::Equate, value, number)?;
                }
                Ok(())
            }
            Body::Operation { mnemonic, operands } => match Directive::parse(&mnemonic) {
                Some(directive) => self.directive(directive, &operands),
                None if mnemonic.starts_with('.') => Err(AssemblerError::new(
                    ErrorType::InvalidDirective,
                    format!("Unknown directive: {}", mnemonic),
                )),
                None => {
                    let cells = self.encoder.encode(&mnemonic, &operands, &self.context())?;
                    if self.final_pass {
                        let location = SourceLocation {
                            line: number,
                            column: statement.column,
                            length: text.trim_end().len().saturating_sub(statement.column),
                        };
                        self.source_map
                            .add_mapping(self.address, cells.len() as u32, location);
                    }
                    self.emit(&cells)
                }
            },
        }
    }

    fn define(
        &mut self,
        name: String,
        kind: SymbolKind,
        value: i64,
        line: usize,
    ) -> Result<(), AssemblerError> {
        validate_label(&name).map_err(|msg| AssemblerError::new(ErrorType::InvalidLabel, msg))?;
        if self.encoder.is_reserved(&name) {
            return Err(AssemblerError::new(
                ErrorType::InvalidLabel,
                format!("Reserved word cannot be a symbol: {}", name),
            ));
        }

        self.symbols
            .add_symbol(name.clone(), kind, value, line)
            .map_err(|e| match e {
                DefineError::Duplicate(_) => AssemblerError::new(
                    ErrorType::DuplicateSymbol,
                    format!("Duplicate symbol: {}", name),
                ),
                DefineError::Full(SymbolKind::Label) => {
                    AssemblerError::new(ErrorType::CapacityExceeded, "Too many labels")
                }
                DefineError::Full(SymbolKind::Equate) => {
                    AssemblerError::new(ErrorType::CapacityExceeded, "Too many equates")
                }
            })
    }

    fn directive(
        &mut self,
        directive: Directive,
        operands: &[Operand],
    ) -> Result<(), AssemblerError> {
        if !self.encoder.supports(directive) {
            return Err(AssemblerError::new(
                ErrorType::InvalidDirective,
                format!("{} is not supported on {}", directive.name(), self.arch),
            ));
        }

        match directive {
            Directive::Org => {
                let address = self.single_value(directive, operands)?;
                if address >= self.image.len() as i64 {
                    return Err(AssemblerError::new(
                        ErrorType::RangeError,
                        format!("ORG address out of range: 0x{:X}", address),
                    ));
                }
                let address = address as u32;
                self.origin = self.origin.min(address);
                self.address = address;
                Ok(())
            }
            Directive::Segment => {
                let segment = self.single_value(directive, operands)?;
                self.segment = Some(encoder::fit_width(segment, 16)? as u16);
                Ok(())
            }
            Directive::Ds => {
                let count = self.single_value(directive, operands)?;
                if self.address as i64 + count > self.image.len() as i64 {
                    return Err(AssemblerError::new(
                        ErrorType::RangeError,
                        format!("DS {} runs past the end of memory", count),
                    ));
                }
                self.emit(&vec![0; count as usize])
            }
            Directive::Db | Directive::Dw | Directive::Dd => {
                if operands.is_empty() {
                    return Err(AssemblerError::new(
                        ErrorType::InvalidOperand,
                        format!("Expected value after {}", directive.name()),
                    ));
                }
                let cell_mask = ((1u32 << self.encoder.cell_bits()) - 1) as u8;
                let mut cells = Vec::new();
                for operand in operands {
                    match (directive, operand) {
                        (Directive::Db, Operand::Str(text)) => {
                            cells.extend(text.iter().map(|b| b & cell_mask))
                        }
                        (_, Operand::Value(expr)) | (_, Operand::Immediate(expr)) => {
                            let ctx = self.context();
                            let value = ctx.value(expr)?;
                            match directive {
                                Directive::Db => {
                                    cells.push(ctx.fit(value, self.encoder.cell_bits())? as u8)
                                }
                                Directive::Dw => cells
                                    .extend_from_slice(&(ctx.fit(value, 16)? as u16).to_le_bytes()),
                                _ => cells.extend_from_slice(&ctx.fit(value, 32)?.to_le_bytes()),
                            }
                        }
                        _ => {
                            return Err(AssemblerError::new(
                                ErrorType::InvalidOperand,
                                format!("Invalid {} operand", directive.name()),
                            ))
                        }
                    }
                }
                self.emit(&cells)
            }
        }
    }

    /// The one resolvable, non-negative argument of ORG, SEGMENT or DS.
    fn single_value(
        &self,
        directive: Directive,
        operands: &[Operand],
    ) -> Result<i64, AssemblerError> {
        let [Operand::Value(expr)] = operands else {
            return Err(AssemblerError::new(
                ErrorType::InvalidOperand,
                format!("{} takes one value", directive.name()),
            ));
        };
        let value = self.context().resolve(expr)?;
        if value < 0 {
            return Err(AssemblerError::new(
                ErrorType::RangeError,
                format!("{} value out of range: {}", directive.name(), value),
            ));
        }
        Ok(value)
    }

    /// Writes cells at the address counter (pass 2 only) and advances it.
    fn emit(&mut self, cells: &[u8]) -> Result<(), AssemblerError> {
        let start = self.address as usize;
        let end = start + cells.len();

        if self.final_pass && !cells.is_empty() {
            if end > self.image.len() {
                return Err(AssemblerError::new(
                    ErrorType::RangeError,
                    format!("Address out of range: 0x{:X}", end - 1),
                ));
            }
            self.image[start..end].copy_from_slice(cells);
            let last = (end - 1) as u32;
            self.max_addr = Some(self.max_addr.map_or(last, |m| m.max(last)));
            self.bytes_generated += cells.len();
        }

        self.address = end as u32;
        Ok(())
    }

    fn finish(mut self) -> AssemblerOutput {
        self.source_map.finalize();
        let bytes = match self.max_addr {
            Some(max) if max >= self.origin => {
                self.image[self.origin as usize..=max as usize].to_vec()
            }
            _ => Vec::new(),
        };

        let stats = AssemblyStats {
            lines_processed: self.lines_processed,
            bytes_generated: self.bytes_generated,
            label_count: self.symbols.label_count(),
            equate_count: self.symbols.equate_count(),
        };
        info!(
            "{}: assembled {} lines, {} cells at 0x{:X}, {} labels, {} equates",
            self.arch,
            stats.lines_processed,
            stats.bytes_generated,
            self.origin,
            stats.label_count,
            stats.equate_count
        );

        AssemblerOutput {
            architecture: self.arch,
            bytes,
            origin: self.origin,
            symbols: self.symbols,
            source_map: self.source_map,
            stats,
            segment: self.segment,
        }
    }
}

/// Validate a label or equate name
///
/// Names must:
/// - Start with a letter, `_` or `.`
/// - Contain only alphanumeric characters and underscores after that
/// - Not exceed 32 characters in length
fn validate_label(name: &str) -> Result<(), String> {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return Err("Label name cannot be empty".to_string());
    };

    if name.len() > 32 {
        return Err(format!("Label name too long (max 32 characters): {}", name));
    }

    if !(first.is_ascii_alphabetic() || first == '_' || first == '.') {
        return Err(format!("Label must start with a letter, not '{}'", first));
    }

    for ch in chars {
        if !ch.is_ascii_alphanumeric() && ch != '_' {
            return Err(format!(
                "Label contains invalid character '{}' (only letters, digits, and underscores allowed)",
                ch
            ));
        }
    }

    Ok(())
}
