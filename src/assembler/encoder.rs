//! # Table-Driven Instruction Encoding
//!
//! Every architecture encodes through the same routine: collect the descriptor rows whose
//! mnemonic matches, and take the first row whose operand shape fits the parsed
//! operands. Shape matching is purely syntactic (which operands are registers, which are
//! `[...]`, which are values), so pass 1 and pass 2 always pick the same row and the
//! instruction length computed in pass 1 holds in pass 2.
//!
//! Operand order is canonical: register first. Dialects rewrite store-style syntax
//! (`ST [addr],R0`, `OUT port,R0`) into that order before calling
//! [`encode_with_table`].
//!
//! Values are evaluated only after a shape matched, so a value error (undefined symbol,
//! out-of-range immediate) is reported against the row the programmer meant.

use crate::addressing::{AddressingMode, Operands};
use crate::opcodes::{self, InstructionDescriptor};

use super::parser::{Expr, Operand, Term};
use super::symbol_table::SymbolTable;
use super::{AssemblerError, Directive, ErrorType};

/// Memory base for `[HL]` / `[HL+d]` shapes.
const HL: &str = "HL";

/// Memory base for stack-relative shapes.
const SP: &str = "SP";

/// Register and reserved-word knowledge of one architecture's assembly syntax.
pub trait Syntax {
    /// Index of a general register name (aliases included), ignoring case.
    fn register(&self, name: &str) -> Option<u8>;

    /// Index of a segment register name, ignoring case.
    fn segment(&self, _name: &str) -> Option<u8> {
        None
    }

    /// Returns true for any name that can never be a value (registers, segments, pairs).
    fn is_reserved(&self, name: &str) -> bool;
}

/// An architecture's assembler back end.
pub trait Encoder: Syntax {
    /// Bits per memory cell: 4 for nibble memory, 8 otherwise.
    fn cell_bits(&self) -> u32 {
        8
    }

    /// Returns true if the directive is available on this architecture.
    fn supports(&self, directive: Directive) -> bool;

    /// Encodes one instruction into memory cells.
    fn encode(
        &self,
        mnemonic: &str,
        operands: &[Operand],
        ctx: &Context,
    ) -> Result<Vec<u8>, AssemblerError>;
}

/// What an encoder may know about the assembly in progress.
pub struct Context<'a> {
    /// Symbols collected so far (complete during pass 2)
    pub symbols: &'a SymbolTable,

    /// Address of the first cell of the current statement
    pub address: u32,

    /// False during pass 1, when unknown symbols stand in as 0
    pub final_pass: bool,
}

impl Context<'_> {
    /// Evaluates `expr`. Unknown names are 0 in pass 1 and an error in pass 2.
    pub fn value(&self, expr: &Expr) -> Result<i64, AssemblerError> {
        self.evaluate(expr, !self.final_pass)
    }

    /// Evaluates `expr`, which must already be resolvable (equates, ORG, DS).
    pub fn resolve(&self, expr: &Expr) -> Result<i64, AssemblerError> {
        self.evaluate(expr, false)
    }

    fn evaluate(&self, expr: &Expr, lenient: bool) -> Result<i64, AssemblerError> {
        let mut total = 0i64;
        for (negated, term) in &expr.terms {
            let value = match term {
                Term::Number(n) => *n,
                Term::Name(name) => match self.symbols.lookup_symbol(name) {
                    Some(symbol) => symbol.value,
                    None if lenient => 0,
                    None => {
                        return Err(AssemblerError::new(
                            ErrorType::UndefinedSymbol,
                            format!("Undefined symbol: {}", name),
                        ))
                    }
                },
            };
            total = if *negated {
                total.wrapping_sub(value)
            } else {
                total.wrapping_add(value)
            };
        }
        Ok(total)
    }

    /// Low `bits` bits of `value`, range-checked like [`fit_width`] in pass 2 only.
    ///
    /// Pass 1 values may be built from placeholder zeros, so they are masked instead.
    pub fn fit(&self, value: i64, bits: u32) -> Result<u32, AssemblerError> {
        if self.final_pass {
            fit_width(value, bits)
        } else {
            Ok((value & ((1i64 << bits) - 1)) as u32)
        }
    }

    /// Signed 8-bit offset from `next` (the address after the instruction) to `target`.
    ///
    /// Always 0 in pass 1, where the target may not be known yet.
    pub fn relative(&self, target: &Expr, next: u32) -> Result<i8, AssemblerError> {
        if !self.final_pass {
            return Ok(0);
        }
        let offset = self.value(target)? - next as i64;
        i8::try_from(offset).map_err(|_| {
            AssemblerError::new(
                ErrorType::RangeError,
                format!("Relative jump out of range: {}", offset),
            )
        })
    }
}

/// Checks that `value` fits `bits` as either a signed or an unsigned number and returns
/// its low `bits` bits.
pub fn fit_width(value: i64, bits: u32) -> Result<u32, AssemblerError> {
    let max = (1i64 << bits) - 1;
    let min = -(1i64 << (bits - 1));
    if value < min || value > max {
        return Err(AssemblerError::new(
            ErrorType::RangeError,
            format!("Value out of range for {}-bit operand: {}", bits, value),
        ));
    }
    Ok((value & max) as u32)
}

fn register(syntax: &dyn Syntax, op: &Operand) -> Option<u8> {
    op.as_name().and_then(|name| syntax.register(name))
}

fn segment(syntax: &dyn Syntax, op: &Operand) -> Option<u8> {
    op.as_name().and_then(|name| syntax.segment(name))
}

fn plain(syntax: &dyn Syntax, expr: &Expr) -> bool {
    expr.names().all(|name| !syntax.is_reserved(name))
}

/// A bare value (no `#`, no brackets) that names no register.
fn value<'o>(syntax: &dyn Syntax, op: &'o Operand) -> Option<&'o Expr> {
    match op {
        Operand::Value(expr) if plain(syntax, expr) => Some(expr),
        _ => None,
    }
}

/// `#expr` or a bare value.
fn immediate<'o>(syntax: &dyn Syntax, op: &'o Operand) -> Option<&'o Expr> {
    match op {
        Operand::Immediate(expr) if plain(syntax, expr) => Some(expr),
        _ => value(syntax, op),
    }
}

/// `[expr]` with no base register.
fn direct<'o>(syntax: &dyn Syntax, op: &'o Operand) -> Option<&'o Expr> {
    match op {
        Operand::Memory(expr) if plain(syntax, expr) => Some(expr),
        _ => None,
    }
}

/// `[base±offset]`, returning the base name and the offset expression.
fn based<'o>(syntax: &dyn Syntax, op: &'o Operand) -> Option<(&'o str, Expr)> {
    let Operand::Memory(expr) = op else {
        return None;
    };
    let (base, offset) = expr.split_base(|name| syntax.is_reserved(name));
    let base = base?;
    plain(syntax, &offset).then_some((base, offset))
}

/// Removes the operands a row spells out in its `implied` text.
fn strip_implied<'o>(implied: &str, ops: &'o [Operand]) -> Option<&'o [Operand]> {
    if implied.is_empty() {
        return Some(ops);
    }
    let names: Vec<&str> = implied.split(',').filter(|s| !s.is_empty()).collect();
    let n = names.len();

    let (fixed, rest) = if implied.ends_with(',') {
        if ops.len() < n {
            return None;
        }
        (&ops[..n], &ops[n..])
    } else if implied.starts_with(',') {
        let split = ops.len().checked_sub(n)?;
        (&ops[split..], &ops[..split])
    } else {
        if ops.len() != n {
            return None;
        }
        (ops, &ops[n..])
    };

    let matches = fixed.iter().zip(&names).all(|(op, name)| {
        op.as_name()
            .is_some_and(|given| given.eq_ignore_ascii_case(name))
    });
    matches.then_some(rest)
}

fn offset_value(ctx: &Context, offset: &Expr) -> Result<i64, AssemblerError> {
    if offset.is_empty() {
        Ok(0)
    } else {
        ctx.value(offset)
    }
}

/// Fits `ops` to `mode`.
///
/// # Returns
///
/// - `Ok(Some(operands))` when the shape matches and every value is in range
/// - `Ok(None)` when the operands have a different shape
/// - `Err(e)` when the shape matches but a value is unresolvable or out of range
fn fit<O>(
    descriptor: &InstructionDescriptor<O>,
    table: &'static [InstructionDescriptor<O>],
    syntax: &dyn Syntax,
    ops: &[Operand],
    ctx: &Context,
) -> Result<Option<Operands>, AssemblerError> {
    use AddressingMode::*;

    macro_rules! require {
        ($e:expr) => {
            match $e {
                Some(v) => v,
                None => return Ok(None),
            }
        };
    }

    let operands = match descriptor.mode {
        Implicit => {
            require!(ops.is_empty().then_some(()));
            Operands::None
        }
        PackedNibble => {
            let [v] = ops else { return Ok(None) };
            let e = require!(immediate(syntax, v));
            Operands::Immediate(ctx.fit(ctx.value(e)?, 4)? as u16)
        }
        Direct8 => {
            let [v] = ops else { return Ok(None) };
            let e = require!(value(syntax, v).or_else(|| direct(syntax, v)));
            Operands::Address(ctx.fit(ctx.value(e)?, 8)? as u16)
        }
        OpcodeRegister | Register => {
            let [r] = ops else { return Ok(None) };
            Operands::Register(require!(register(syntax, r)))
        }
        RegisterIndirect => {
            let [r, m] = ops else { return Ok(None) };
            let reg = require!(register(syntax, r));
            let (base, offset) = require!(based(syntax, m));
            require!((base.eq_ignore_ascii_case(HL) && offset.is_empty()).then_some(()));
            Operands::Register(reg)
        }
        RegisterDisplaced8 => {
            let [r, m] = ops else { return Ok(None) };
            let reg = require!(register(syntax, r));
            let (base, offset) = require!(based(syntax, m));
            require!((base.eq_ignore_ascii_case(HL) && !offset.is_empty()).then_some(()));
            let disp = ctx.value(&offset)?;
            if ctx.final_pass && !(-128..=127).contains(&disp) {
                return Err(AssemblerError::new(
                    ErrorType::RangeError,
                    format!("Displacement out of range: {}", disp),
                ));
            }
            Operands::RegisterDisplacement {
                reg,
                disp: disp as i16,
            }
        }
        OpcodeRegisterImm8 | RegisterImm8 | RegisterImm16 => {
            let [r, v] = ops else { return Ok(None) };
            let reg = require!(register(syntax, r));
            let e = require!(immediate(syntax, v));
            let bits = if descriptor.mode == RegisterImm16 { 16 } else { 8 };
            Operands::RegisterImmediate {
                reg,
                imm: ctx.fit(ctx.value(e)?, bits)? as u16,
            }
        }
        OpcodeRegisterDirect | OpcodeRegisterZeroPage | RegisterDirect => {
            let [r, m] = ops else { return Ok(None) };
            let reg = require!(register(syntax, r));
            let e = require!(direct(syntax, m));
            let bits = if descriptor.mode == OpcodeRegisterZeroPage { 8 } else { 16 };
            Operands::RegisterAddress {
                reg,
                address: ctx.fit(ctx.value(e)?, bits)? as u16,
            }
        }
        RegisterPair => {
            let [a, b] = ops else { return Ok(None) };
            Operands::RegisterPair {
                dst: require!(register(syntax, a)),
                src: require!(register(syntax, b)),
            }
        }
        Immediate8 | Immediate16 => {
            let [v] = ops else { return Ok(None) };
            let e = require!(immediate(syntax, v));
            let bits = if descriptor.mode == Immediate8 { 8 } else { 16 };
            Operands::Immediate(ctx.fit(ctx.value(e)?, bits)? as u16)
        }
        Absolute => {
            let [v] = ops else { return Ok(None) };
            let e = require!(value(syntax, v));
            Operands::Address(ctx.fit(ctx.value(e)?, 16)? as u16)
        }
        Relative => {
            let [v] = ops else { return Ok(None) };
            let e = require!(value(syntax, v));
            let next = ctx.address + descriptor.size_bytes() as u32;
            Operands::Relative(ctx.relative(e, next)?)
        }
        PortIn8 | PortOut8 | RegisterPort16 => {
            let [r, p] = ops else { return Ok(None) };
            let reg = require!(register(syntax, r));
            let e = require!(immediate(syntax, p));
            let bits = if descriptor.mode == RegisterPort16 { 16 } else { 8 };
            Operands::Port {
                reg,
                port: ctx.fit(ctx.value(e)?, bits)? as u16,
            }
        }
        IndexedLoad | IndexedStore => {
            let [r, m] = ops else { return Ok(None) };
            let reg = require!(register(syntax, r));
            let (base, offset) = require!(based(syntax, m));
            let base = require!(syntax.register(base));
            Operands::Indexed {
                reg,
                base,
                disp: ctx.fit(offset_value(ctx, &offset)?, 16)? as u16 as i16,
            }
        }
        StackRelative => {
            let [r, m] = ops else { return Ok(None) };
            let reg = require!(register(syntax, r));
            let (base, offset) = require!(based(syntax, m));
            require!(base.eq_ignore_ascii_case(SP).then_some(()));
            Operands::RegisterDisplacement {
                reg,
                disp: ctx.fit(offset_value(ctx, &offset)?, 16)? as u16 as i16,
            }
        }
        SegmentFromRegister => {
            let [s, r] = ops else { return Ok(None) };
            Operands::SegmentRegister {
                seg: require!(segment(syntax, s)),
                reg: require!(register(syntax, r)),
            }
        }
        RegisterFromSegment => {
            let [r, s] = ops else { return Ok(None) };
            Operands::SegmentRegister {
                seg: require!(segment(syntax, s)),
                reg: require!(register(syntax, r)),
            }
        }
        Segment => {
            let [s] = ops else { return Ok(None) };
            Operands::Segment(require!(segment(syntax, s)))
        }
        ShiftCount => {
            let (r, count) = match ops {
                [r] => (r, None),
                [r, c] => (r, Some(c)),
                _ => return Ok(None),
            };
            let reg = require!(register(syntax, r));
            let count = match count {
                None => 1,
                Some(c) if c.as_name().is_some_and(is_count_register) => 0,
                Some(c) => {
                    let n = ctx.value(require!(immediate(syntax, c)))?;
                    if ctx.final_pass && !(1..=15).contains(&n) {
                        return Err(AssemblerError::new(
                            ErrorType::RangeError,
                            format!("Shift count out of range: {}", n),
                        ));
                    }
                    (n & 0x0F) as u8
                }
            };
            Operands::ShiftCount { reg, count }
        }
        Frame => {
            let (size, level) = match ops {
                [s] => (s, None),
                [s, l] => (s, Some(l)),
                _ => return Ok(None),
            };
            let size = require!(immediate(syntax, size));
            let level = match level {
                Some(l) => Some(require!(immediate(syntax, l))),
                None => None,
            };
            Operands::Frame {
                size: ctx.fit(ctx.value(size)?, 16)? as u16,
                level: match level {
                    Some(l) => ctx.fit(ctx.value(l)?, 8)? as u8,
                    None => 0,
                },
            }
        }
        Far => {
            let [Operand::Far { segment, offset }] = ops else {
                return Ok(None);
            };
            require!((plain(syntax, segment) && plain(syntax, offset)).then_some(()));
            Operands::Far {
                segment: ctx.fit(ctx.value(segment)?, 16)? as u16,
                offset: ctx.fit(ctx.value(offset)?, 16)? as u16,
            }
        }
        Prefix => {
            let [v] = ops else { return Ok(None) };
            let name = require!(v.as_name());
            let target = require!(table
                .iter()
                .find(|d| d.mode == Implicit && d.mnemonic.eq_ignore_ascii_case(name)));
            Operands::Prefix(target.opcode)
        }
    };

    Ok(Some(operands))
}

fn is_count_register(name: &str) -> bool {
    name.eq_ignore_ascii_case("CL") || name.eq_ignore_ascii_case("CX")
}

/// Encodes one instruction against an architecture's descriptor table.
///
/// # Errors
///
/// - `InvalidMnemonic` if no row has this mnemonic
/// - `InvalidOperand` if no row's shape fits the operands
/// - `UndefinedSymbol` / `RangeError` from evaluating the matching row's values
pub fn encode_with_table<O>(
    table: &'static [InstructionDescriptor<O>],
    syntax: &dyn Syntax,
    mnemonic: &str,
    operands: &[Operand],
    ctx: &Context,
) -> Result<Vec<u8>, AssemblerError> {
    let mut known = false;
    for descriptor in table
        .iter()
        .filter(|d| d.mnemonic.eq_ignore_ascii_case(mnemonic))
    {
        known = true;
        let Some(rest) = strip_implied(descriptor.implied, operands) else {
            continue;
        };
        if let Some(fields) = fit(descriptor, table, syntax, rest, ctx)? {
            return opcodes::encode(descriptor, &fields).ok_or_else(|| {
                AssemblerError::new(
                    ErrorType::InvalidOperand,
                    format!("Invalid operands for {}", descriptor.mnemonic),
                )
            });
        }
    }

    if known {
        Err(AssemblerError::new(
            ErrorType::InvalidOperand,
            format!("Invalid operands for {}", mnemonic.to_ascii_uppercase()),
        ))
    } else {
        Err(AssemblerError::new(
            ErrorType::InvalidMnemonic,
            format!("Unknown instruction: {}", mnemonic),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembler::parser::{parse_line, Body};
    use crate::assembler::SymbolKind;
    use crate::micro16::opcodes::INSTRUCTION_TABLE;

    struct Regs;

    impl Syntax for Regs {
        fn register(&self, name: &str) -> Option<u8> {
            ["AX", "BX", "CX"]
                .iter()
                .position(|r| r.eq_ignore_ascii_case(name))
                .map(|i| i as u8)
        }

        fn is_reserved(&self, name: &str) -> bool {
            self.register(name).is_some() || name.eq_ignore_ascii_case("SP")
        }
    }

    fn encode_line(line: &str, symbols: &SymbolTable, final_pass: bool) -> Result<Vec<u8>, AssemblerError> {
        let Body::Operation { mnemonic, operands } = parse_line(line).unwrap().body else {
            panic!("not an instruction");
        };
        let ctx = Context {
            symbols,
            address: 0x0100,
            final_pass,
        };
        encode_with_table(INSTRUCTION_TABLE, &Regs, &mnemonic, &operands, &ctx)
    }

    #[test]
    fn test_fit_width_accepts_signed_and_unsigned() {
        assert_eq!(fit_width(255, 8).unwrap(), 0xFF);
        assert_eq!(fit_width(-128, 8).unwrap(), 0x80);
        assert_eq!(fit_width(-1, 16).unwrap(), 0xFFFF);
        assert!(fit_width(256, 8).is_err());
        assert!(fit_width(-129, 8).is_err());
        assert_eq!(fit_width(15, 4).unwrap(), 15);
        assert!(fit_width(16, 4).is_err());
    }

    #[test]
    fn test_pass_one_masks_instead_of_range_checking() {
        let symbols = SymbolTable::new(8, 8);
        let pass = |final_pass| Context {
            symbols: &symbols,
            address: 0x0100,
            final_pass,
        };
        assert_eq!(pass(false).fit(-512, 8).unwrap(), 0x00);
        assert_eq!(pass(false).fit(0x1_2345, 16).unwrap(), 0x2345);
        assert_eq!(pass(true).fit(-1, 8).unwrap(), 0xFF);
        assert!(pass(true).fit(-512, 8).is_err());

        // placeholder 0 puts the difference out of range until `later` is known
        assert_eq!(
            encode_line("ADD SP,#later-0x10000", &symbols, false).unwrap().len(),
            3
        );
    }

    #[test]
    fn test_shape_selects_row() {
        let symbols = SymbolTable::new(8, 8);
        assert_eq!(encode_line("MOV AX,BX", &symbols, true).unwrap(), vec![0x10, 0x01]);
        assert_eq!(
            encode_line("MOV BX,#0x1234", &symbols, true).unwrap(),
            vec![0x11, 0x01, 0x34, 0x12]
        );
        assert_eq!(encode_line("MOV CX,SP", &symbols, true).unwrap(), vec![0x15, 0x02]);
        assert_eq!(encode_line("MOV SP,CX", &symbols, true).unwrap(), vec![0x16, 0x02]);
        assert_eq!(
            encode_line("ADD SP,#4", &symbols, true).unwrap(),
            vec![0x17, 0x04, 0x00]
        );
        assert_eq!(encode_line("RET", &symbols, true).unwrap(), vec![0xC3]);
        assert_eq!(encode_line("RET 2", &symbols, true).unwrap(), vec![0xC5, 0x02, 0x00]);
    }

    #[test]
    fn test_memory_shapes() {
        let symbols = SymbolTable::new(8, 8);
        assert_eq!(
            encode_line("LD AX,[0x2000]", &symbols, true).unwrap(),
            vec![0x20, 0x00, 0x00, 0x20]
        );
        assert_eq!(
            encode_line("LD AX,[BX-2]", &symbols, true).unwrap(),
            vec![0x24, 0x01, 0xFE, 0xFF]
        );
        assert_eq!(
            encode_line("LD CX,[SP+6]", &symbols, true).unwrap(),
            vec![0x29, 0x02, 0x06, 0x00]
        );
    }

    #[test]
    fn test_forward_reference_is_zero_in_pass_one() {
        let mut symbols = SymbolTable::new(8, 8);
        assert_eq!(
            encode_line("JMP later", &symbols, false).unwrap(),
            vec![0xA0, 0x00, 0x00]
        );
        let err = encode_line("JMP later", &symbols, true).unwrap_err();
        assert_eq!(err.error_type, ErrorType::UndefinedSymbol);
        assert_eq!(err.message, "Undefined symbol: later");

        symbols
            .add_symbol("LATER".to_string(), SymbolKind::Label, 0x0234, 1)
            .unwrap();
        assert_eq!(
            encode_line("JMP later+1", &symbols, true).unwrap(),
            vec![0xA0, 0x35, 0x02]
        );
    }

    #[test]
    fn test_relative_range() {
        let with_target = |target: i64| {
            let mut symbols = SymbolTable::new(8, 8);
            symbols
                .add_symbol("T".to_string(), SymbolKind::Label, target, 1)
                .unwrap();
            symbols
        };
        // JR at 0x0100 is two bytes; offsets count from 0x0102
        for (target, ok) in [(0x0181, true), (0x0182, false), (0x0082, true), (0x0081, false)] {
            let result = encode_line("JR T", &with_target(target), true);
            assert_eq!(result.is_ok(), ok, "target 0x{:04X}", target);
        }
        let err = encode_line("JR T", &with_target(0x0081), true).unwrap_err();
        assert_eq!(err.error_type, ErrorType::RangeError);
        assert_eq!(err.message, "Relative jump out of range: -129");
        assert_eq!(
            encode_line("JR T", &with_target(0x0080), false).unwrap(),
            vec![0xA3, 0x00]
        );
    }

    #[test]
    fn test_shift_count_forms() {
        let symbols = SymbolTable::new(8, 8);
        assert_eq!(encode_line("SHL AX", &symbols, true).unwrap(), vec![0x80, 0x01]);
        assert_eq!(encode_line("SHL BX,#3", &symbols, true).unwrap(), vec![0x80, 0x13]);
        assert_eq!(encode_line("SHR AX,CL", &symbols, true).unwrap(), vec![0x81, 0x00]);
        assert_eq!(encode_line("SHR AX,CX", &symbols, true).unwrap(), vec![0x81, 0x00]);
        let err = encode_line("SHL AX,16", &symbols, true).unwrap_err();
        assert_eq!(err.error_type, ErrorType::RangeError);
    }

    #[test]
    fn test_unknown_and_mismatched() {
        let symbols = SymbolTable::new(8, 8);
        let err = encode_line("FROB AX", &symbols, true).unwrap_err();
        assert_eq!(err.error_type, ErrorType::InvalidMnemonic);
        assert_eq!(err.message, "Unknown instruction: FROB");

        let err = encode_line("PUSH 5", &symbols, true).unwrap_err();
        assert_eq!(err.error_type, ErrorType::InvalidOperand);
        assert_eq!(err.message, "Invalid operands for PUSH");

        let err = encode_line("MOV AX,#0x10000", &symbols, true).unwrap_err();
        assert_eq!(err.error_type, ErrorType::RangeError);
    }

    #[test]
    fn test_strip_implied_positions() {
        let Body::Operation { operands, .. } = parse_line("X HL,BC").unwrap().body else {
            unreachable!()
        };
        assert_eq!(strip_implied("HL,BC", &operands).map(|r| r.len()), Some(0));
        assert_eq!(strip_implied("HL,", &operands).map(|r| r.len()), Some(1));
        assert_eq!(strip_implied(",BC", &operands).map(|r| r.len()), Some(1));
        assert!(strip_implied("SP,", &operands).is_none());
        assert!(strip_implied("HL", &operands).is_none());
    }
}
