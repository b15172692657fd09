//! Assembly source parser
//!
//! Turns one tokenized line into a [`Statement`]: an optional `label:`, then an equate,
//! an operation (instruction or directive) with its operands, or nothing.
//!
//! The parser knows nothing about any instruction set. Register names are plain
//! identifiers here; the architecture encoders decide what they mean.
//!
//! # Operand Grammar
//!
//! ```text
//! operand := '#' expr            immediate
//!          | '[' expr ']'        memory
//!          | expr ':' expr       far segment:offset
//!          | string              (DB only)
//!          | expr
//! expr    := ['+'|'-'] term (('+'|'-') term)*
//! term    := number | 'c' | name
//! ```

use super::lexer::{tokenize, TokenStream, TokenType};
use super::{AssemblerError, ErrorType};

/// One signed term of an expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Term {
    /// Literal value (numbers and character literals)
    Number(i64),
    /// Label, equate or register name
    Name(String),
}

/// A sum of signed terms, e.g. `TABLE+2` or `-1`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Expr {
    /// `(negated, term)` pairs in source order
    pub terms: Vec<(bool, Term)>,
}

impl Expr {
    /// A single positive literal.
    pub fn number(value: i64) -> Self {
        Expr {
            terms: vec![(false, Term::Number(value))],
        }
    }

    /// Returns the name if the expression is exactly one un-negated name.
    pub fn as_name(&self) -> Option<&str> {
        match self.terms.as_slice() {
            [(false, Term::Name(name))] => Some(name),
            _ => None,
        }
    }

    /// Splits a leading un-negated name that satisfies `is_base` off the expression.
    ///
    /// `[BX+4]` with `BX` a base yields `(Some("BX"), 4)`.
    pub fn split_base(&self, is_base: impl Fn(&str) -> bool) -> (Option<&str>, Expr) {
        match self.terms.split_first() {
            Some(((false, Term::Name(name)), rest)) if is_base(name) => (
                Some(name),
                Expr {
                    terms: rest.to_vec(),
                },
            ),
            _ => (None, self.clone()),
        }
    }

    /// Names referenced anywhere in the expression.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.terms.iter().filter_map(|(_, t)| match t {
            Term::Name(name) => Some(name.as_str()),
            Term::Number(_) => None,
        })
    }

    /// Returns true if the expression has no terms.
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}

/// One comma-separated operand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    /// `#expr`
    Immediate(Expr),
    /// Bare expression (value, label or register name)
    Value(Expr),
    /// `[expr]`
    Memory(Expr),
    /// `segment:offset`
    Far { segment: Expr, offset: Expr },
    /// Quoted string
    Str(Vec<u8>),
}

impl Operand {
    /// The name of a bare single-name operand, e.g. a register.
    pub fn as_name(&self) -> Option<&str> {
        match self {
            Operand::Value(expr) => expr.as_name(),
            _ => None,
        }
    }
}

/// What a line does after its optional label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Body {
    /// Blank, comment-only or label-only line
    Empty,
    /// `NAME EQU expr`, `NAME .EQU expr` or `NAME = expr`
    Equate { name: String, value: Expr },
    /// Instruction or directive
    Operation {
        mnemonic: String,
        operands: Vec<Operand>,
    },
}

/// A parsed line of assembly source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    /// Label defined at the start of the line
    pub label: Option<String>,

    /// The rest of the line
    pub body: Body,

    /// Column of the first token after the label (for the source map)
    pub column: usize,
}

/// Parses a number (supports hex `0x`/`$`, binary `0b`, decimal).
pub fn parse_number(s: &str) -> Result<u32, String> {
    let s = s.trim();

    if s.is_empty() {
        return Err("empty number string".to_string());
    }

    let (digits, radix) = if let Some(hex) = s.strip_prefix('$') {
        (hex, 16)
    } else if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        (hex, 16)
    } else if let Some(bin) = s.strip_prefix("0b").or_else(|| s.strip_prefix("0B")) {
        (bin, 2)
    } else {
        (s, 10)
    };

    let kind = match radix {
        16 => "hex",
        2 => "binary",
        _ => "decimal",
    };
    u32::from_str_radix(digits, radix).map_err(|e| format!("invalid {} number: {}", kind, e))
}

fn syntax(message: impl Into<String>) -> AssemblerError {
    AssemblerError::new(ErrorType::SyntaxError, message)
}

fn is_equate_keyword(name: &str) -> bool {
    name.eq_ignore_ascii_case("EQU") || name.eq_ignore_ascii_case(".EQU")
}

fn parse_term(stream: &mut TokenStream) -> Result<Term, AssemblerError> {
    let column = stream.current_column();
    match stream.consume().map(|t| t.token_type) {
        Some(TokenType::Number(n)) => Ok(Term::Number(n as i64)),
        Some(TokenType::Char(c)) => Ok(Term::Number(c as i64)),
        Some(TokenType::Identifier(name)) => Ok(Term::Name(name)),
        Some(other) => Err(syntax(format!(
            "Expected value at column {}, found {:?}",
            column + 1,
            other
        ))),
        None => Err(syntax("Expected value")),
    }
}

fn parse_expr(stream: &mut TokenStream) -> Result<Expr, AssemblerError> {
    let mut negated = false;
    if stream.eat(&TokenType::Minus) {
        negated = true;
    } else {
        stream.eat(&TokenType::Plus);
    }

    let mut terms = vec![(negated, parse_term(stream)?)];
    loop {
        let negated = if stream.eat(&TokenType::Plus) {
            false
        } else if stream.eat(&TokenType::Minus) {
            true
        } else {
            break;
        };
        terms.push((negated, parse_term(stream)?));
    }
    Ok(Expr { terms })
}

fn parse_operand(stream: &mut TokenStream) -> Result<Operand, AssemblerError> {
    if stream.eat(&TokenType::Hash) {
        return Ok(Operand::Immediate(parse_expr(stream)?));
    }

    if stream.eat(&TokenType::LBracket) {
        let expr = parse_expr(stream)?;
        if !stream.eat(&TokenType::RBracket) {
            return Err(syntax("Expected ']' to close memory operand"));
        }
        return Ok(Operand::Memory(expr));
    }

    if let Some(TokenType::Str(bytes)) = stream.peek().map(|t| &t.token_type) {
        let bytes = bytes.clone();
        stream.advance();
        return Ok(Operand::Str(bytes));
    }

    let expr = parse_expr(stream)?;
    if stream.eat(&TokenType::Colon) {
        let offset = parse_expr(stream)?;
        return Ok(Operand::Far {
            segment: expr,
            offset,
        });
    }
    Ok(Operand::Value(expr))
}

fn parse_operands(stream: &mut TokenStream) -> Result<Vec<Operand>, AssemblerError> {
    let mut operands = Vec::new();
    if stream.is_eof() {
        return Ok(operands);
    }
    loop {
        operands.push(parse_operand(stream)?);
        if stream.is_eof() {
            return Ok(operands);
        }
        if !stream.eat(&TokenType::Comma) {
            return Err(syntax(format!(
                "Expected ',' between operands at column {}",
                stream.current_column() + 1
            )));
        }
    }
}

/// Parses one source line.
///
/// Errors carry no line number; the caller attaches it.
///
/// # Examples
///
/// ```
/// use libmicro::assembler::parser::{parse_line, Body, Operand};
///
/// let stmt = parse_line("loop: DEC CX").unwrap();
/// assert_eq!(stmt.label.as_deref(), Some("loop"));
/// match stmt.body {
///     Body::Operation { mnemonic, operands } => {
///         assert_eq!(mnemonic, "DEC");
///         assert_eq!(operands[0].as_name(), Some("CX"));
///     }
///     other => panic!("unexpected {:?}", other),
/// }
/// ```
pub fn parse_line(line: &str) -> Result<Statement, AssemblerError> {
    let tokens = tokenize(line).map_err(|e| syntax(e.to_string()))?;
    let mut stream = TokenStream::new(tokens);

    let mut label = None;
    if let (Some(TokenType::Identifier(name)), Some(TokenType::Colon)) = (
        stream.peek().map(|t| &t.token_type),
        stream.peek_n(1).map(|t| &t.token_type),
    ) {
        label = Some(name.clone());
        stream.advance();
        stream.advance();
    }

    let column = stream.current_column();
    if stream.is_eof() {
        return Ok(Statement {
            label,
            body: Body::Empty,
            column,
        });
    }

    let name = match stream.consume().map(|t| t.token_type) {
        Some(TokenType::Identifier(name)) => name,
        _ => {
            return Err(syntax(format!(
                "Expected instruction or directive at column {}",
                column + 1
            )))
        }
    };

    let is_equate = match stream.peek().map(|t| &t.token_type) {
        Some(TokenType::Equal) => true,
        Some(TokenType::Identifier(keyword)) => is_equate_keyword(keyword),
        _ => false,
    };
    let body = if is_equate {
        stream.advance();
        let value = parse_expr(&mut stream)?;
        if !stream.is_eof() {
            return Err(syntax("Unexpected text after equate value"));
        }
        Body::Equate { name, value }
    } else {
        Body::Operation {
            mnemonic: name,
            operands: parse_operands(&mut stream)?,
        }
    };

    Ok(Statement {
        label,
        body,
        column,
    })
}
