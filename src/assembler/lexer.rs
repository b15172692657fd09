//! Lexical analysis for one line of assembly source
//!
//! The lexer turns a single source line into typed tokens. It owns the character-level
//! questions (where does a number end? which escapes does a quoted literal allow? where
//! does the comment start?) and leaves syntax to the [`parser`](super::parser).
//!
//! # Token Categories
//!
//! - **Identifiers**: mnemonics, directives (`.org`), labels and register names. Case is
//!   preserved; every consumer compares case-insensitively.
//! - **Numbers**: `0x1F`, `$1F`, `0b1010` or decimal, parsed eagerly to `u32`.
//! - **Characters and strings**: `'A'` is a character, `"AB"` (or `'AB'`) a string. Both
//!   accept the escapes `\n \r \t \0 \\ \' \"`.
//! - **Punctuation**: `: , # + - [ ] =`
//!
//! A `;` outside a quoted literal ends the line. Whitespace separates tokens and is
//! dropped.
//!
//! Identifiers run as far as letters, digits and `_` allow, so `AX1` is a single
//! identifier and can never be mistaken for the register `AX`.
//!
//! # Examples
//!
//! ```
//! use libmicro::assembler::lexer::{tokenize, TokenType};
//!
//! let tokens = tokenize("loop: ADD AX,#$10 ; bump").unwrap();
//! assert_eq!(tokens.len(), 7);
//! assert_eq!(tokens[0].token_type, TokenType::Identifier("loop".to_string()));
//! assert_eq!(tokens[1].token_type, TokenType::Colon);
//! assert_eq!(tokens[6].token_type, TokenType::Number(0x10));
//! assert_eq!(tokens[6].column, 14);
//! ```

use thiserror::Error;

use super::parser::parse_number;

/// Errors found while splitting a line into tokens.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LexerError {
    /// A character that starts no token.
    #[error("Unexpected character '{ch}'")]
    UnexpectedCharacter { ch: char, column: usize },

    /// A malformed numeric literal.
    #[error("Invalid number '{text}': {reason}")]
    InvalidNumber {
        text: String,
        reason: String,
        column: usize,
    },

    /// A quote with no closing partner on the same line.
    #[error("Unterminated {kind} literal")]
    Unterminated { kind: &'static str, column: usize },

    /// `''`
    #[error("Empty character literal")]
    EmptyCharacter { column: usize },

    /// A backslash followed by something outside the escape set.
    #[error("Unknown escape sequence '\\{ch}'")]
    UnknownEscape { ch: char, column: usize },

    /// A quoted character outside ASCII, which has no one-byte encoding.
    #[error("Non-ASCII character '{ch}' in literal")]
    NonAscii { ch: char, column: usize },
}

impl LexerError {
    /// Column (0-indexed) where the offending token starts.
    pub fn column(&self) -> usize {
        match *self {
            LexerError::UnexpectedCharacter { column, .. }
            | LexerError::InvalidNumber { column, .. }
            | LexerError::Unterminated { column, .. }
            | LexerError::EmptyCharacter { column }
            | LexerError::UnknownEscape { column, .. }
            | LexerError::NonAscii { column, .. } => column,
        }
    }
}

/// Classification of tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenType {
    /// Mnemonic, directive, label or register name (case preserved)
    Identifier(String),
    /// Numeric literal in any supported radix
    Number(u32),
    /// Single-quoted character literal
    Char(u8),
    /// Double-quoted (or multi-character single-quoted) string
    Str(Vec<u8>),
    /// `:` label suffix and far-pointer separator
    Colon,
    /// `,` operand separator
    Comma,
    /// `#` immediate prefix
    Hash,
    /// `+`
    Plus,
    /// `-`
    Minus,
    /// `[` memory operand open
    LBracket,
    /// `]` memory operand close
    RBracket,
    /// `=` equate assignment
    Equal,
}

/// A single token with its position in the line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// Token classification and parsed value
    pub token_type: TokenType,

    /// Column offset within the line (0-indexed)
    pub column: usize,

    /// Source span in bytes
    pub length: usize,
}

/// Lexer state over one source line.
pub struct Lexer<'a> {
    source: &'a str,
    chars: std::str::CharIndices<'a>,
    current: Option<(usize, char)>,
}

impl<'a> Lexer<'a> {
    /// Creates a lexer positioned at the start of `source`.
    pub fn new(source: &'a str) -> Self {
        let mut chars = source.char_indices();
        let current = chars.next();
        Lexer {
            source,
            chars,
            current,
        }
    }

    fn advance(&mut self) {
        self.current = self.chars.next();
    }

    fn peek(&self) -> Option<char> {
        self.current.map(|(_, ch)| ch)
    }

    fn column(&self) -> usize {
        match self.current {
            Some((pos, _)) => pos,
            None => self.source.len(),
        }
    }

    fn token(&self, token_type: TokenType, start: usize) -> Token {
        Token {
            token_type,
            column: start,
            length: self.column() - start,
        }
    }

    /// Scans `[A-Za-z_.][A-Za-z0-9_]*`.
    fn scan_identifier(&mut self, start: usize) -> Token {
        self.advance();
        while let Some(ch) = self.peek() {
            if ch.is_ascii_alphanumeric() || ch == '_' {
                self.advance();
            } else {
                break;
            }
        }
        let text = &self.source[start..self.column()];
        self.token(TokenType::Identifier(text.to_string()), start)
    }

    /// Scans a number literal, including its `$`, `0x` or `0b` prefix.
    fn scan_number(&mut self, start: usize) -> Result<Token, LexerError> {
        self.advance();
        while let Some(ch) = self.peek() {
            if ch.is_ascii_alphanumeric() || ch == '_' {
                self.advance();
            } else {
                break;
            }
        }
        let text = &self.source[start..self.column()];
        let value = parse_number(text).map_err(|reason| LexerError::InvalidNumber {
            text: text.to_string(),
            reason,
            column: start,
        })?;
        Ok(self.token(TokenType::Number(value), start))
    }

    /// Reads one (possibly escaped) character inside a quoted literal.
    fn scan_quoted_char(&mut self) -> Result<u8, LexerError> {
        let column = self.column();
        let ch = self.peek().ok_or(LexerError::Unterminated {
            kind: "string",
            column,
        })?;
        self.advance();
        if !ch.is_ascii() {
            return Err(LexerError::NonAscii { ch, column });
        }
        if ch != '\\' {
            return Ok(ch as u8);
        }

        let escaped = self.peek().ok_or(LexerError::Unterminated {
            kind: "string",
            column,
        })?;
        self.advance();
        match escaped {
            'n' => Ok(b'\n'),
            'r' => Ok(b'\r'),
            't' => Ok(b'\t'),
            '0' => Ok(0),
            '\\' => Ok(b'\\'),
            '\'' => Ok(b'\''),
            '"' => Ok(b'"'),
            other => Err(LexerError::UnknownEscape { ch: other, column }),
        }
    }

    /// Scans a literal delimited by `quote`.
    ///
    /// A single-quoted literal holding exactly one character is a [`TokenType::Char`];
    /// anything else is a [`TokenType::Str`].
    fn scan_quoted(&mut self, quote: char, start: usize) -> Result<Token, LexerError> {
        let kind = if quote == '"' { "string" } else { "character" };
        self.advance();

        let mut bytes = Vec::new();
        loop {
            match self.peek() {
                None => return Err(LexerError::Unterminated { kind, column: start }),
                Some(ch) if ch == quote => {
                    self.advance();
                    break;
                }
                Some(_) => bytes.push(self.scan_quoted_char()?),
            }
        }

        if quote == '\'' {
            match bytes.len() {
                0 => return Err(LexerError::EmptyCharacter { column: start }),
                1 => return Ok(self.token(TokenType::Char(bytes[0]), start)),
                _ => {}
            }
        }
        Ok(self.token(TokenType::Str(bytes), start))
    }

    /// Returns the next token, or `None` at end of line or at a comment.
    pub fn next_token(&mut self) -> Result<Option<Token>, LexerError> {
        while matches!(self.peek(), Some(' ' | '\t' | '\r' | '\n')) {
            self.advance();
        }
        let Some(ch) = self.peek() else {
            return Ok(None);
        };
        let start = self.column();

        let single = match ch {
            ';' => return Ok(None),
            '0'..='9' | '$' => return self.scan_number(start).map(Some),
            'a'..='z' | 'A'..='Z' | '_' | '.' => return Ok(Some(self.scan_identifier(start))),
            '\'' | '"' => return self.scan_quoted(ch, start).map(Some),
            ':' => TokenType::Colon,
            ',' => TokenType::Comma,
            '#' => TokenType::Hash,
            '+' => TokenType::Plus,
            '-' => TokenType::Minus,
            '[' => TokenType::LBracket,
            ']' => TokenType::RBracket,
            '=' => TokenType::Equal,
            _ => {
                return Err(LexerError::UnexpectedCharacter { ch, column: start });
            }
        };
        self.advance();
        Ok(Some(self.token(single, start)))
    }
}

/// Splits one source line into tokens, stopping at a comment.
///
/// Returns the first lexical error; the assembler reports one error per run.
pub fn tokenize(line: &str) -> Result<Vec<Token>, LexerError> {
    let mut lexer = Lexer::new(line);
    let mut tokens = Vec::new();
    while let Some(token) = lexer.next_token()? {
        tokens.push(token);
    }
    Ok(tokens)
}

/// Token stream with lookahead for the parser.
pub struct TokenStream {
    tokens: Vec<Token>,
    position: usize,
}

impl TokenStream {
    /// Creates a stream over pre-scanned tokens.
    pub fn new(tokens: Vec<Token>) -> Self {
        TokenStream {
            tokens,
            position: 0,
        }
    }

    /// Peeks at the current token without consuming it.
    #[must_use]
    pub fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.position)
    }

    /// Peeks `n` tokens ahead; `peek_n(0)` is `peek()`.
    #[must_use]
    pub fn peek_n(&self, n: usize) -> Option<&Token> {
        self.tokens.get(self.position + n)
    }

    /// Returns true if the current token has type `expected`.
    pub fn at(&self, expected: &TokenType) -> bool {
        self.peek().is_some_and(|t| &t.token_type == expected)
    }

    /// Advances past the current token. Returns false at end of line.
    pub fn advance(&mut self) -> bool {
        if self.position < self.tokens.len() {
            self.position += 1;
            true
        } else {
            false
        }
    }

    /// Consumes and returns the current token.
    pub fn consume(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.position).cloned();
        if token.is_some() {
            self.position += 1;
        }
        token
    }

    /// Consumes the current token if it has type `expected`.
    pub fn eat(&mut self, expected: &TokenType) -> bool {
        if self.at(expected) {
            self.position += 1;
            true
        } else {
            false
        }
    }

    /// Returns true once every token has been consumed.
    #[must_use = "calling is_eof() without using the result has no effect"]
    pub fn is_eof(&self) -> bool {
        self.position >= self.tokens.len()
    }

    /// Column of the current token, or of the end of the last one.
    #[must_use]
    pub fn current_column(&self) -> usize {
        match self.peek() {
            Some(token) => token.column,
            None => self
                .tokens
                .last()
                .map(|t| t.column + t.length)
                .unwrap_or(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn types(line: &str) -> Vec<TokenType> {
        tokenize(line)
            .unwrap()
            .into_iter()
            .map(|t| t.token_type)
            .collect()
    }

    fn ident(s: &str) -> TokenType {
        TokenType::Identifier(s.to_string())
    }

    #[test]
    fn test_instruction_with_memory_operand() {
        assert_eq!(
            types("LD AX,[BX-2]"),
            vec![
                ident("LD"),
                ident("AX"),
                TokenType::Comma,
                TokenType::LBracket,
                ident("BX"),
                TokenType::Minus,
                TokenType::Number(2),
                TokenType::RBracket,
            ]
        );
    }

    #[test]
    fn test_number_prefixes() {
        assert_eq!(
            types("0x1F $1f 0B101 42"),
            vec![
                TokenType::Number(0x1F),
                TokenType::Number(0x1F),
                TokenType::Number(5),
                TokenType::Number(42),
            ]
        );
    }

    #[test]
    fn test_bad_digits_are_errors() {
        assert!(matches!(
            tokenize("0b102"),
            Err(LexerError::InvalidNumber { column: 0, .. })
        ));
        assert!(matches!(
            tokenize("MOV AX,12AB"),
            Err(LexerError::InvalidNumber { column: 7, .. })
        ));
        assert!(tokenize("$").is_err());
    }

    #[test]
    fn test_comment_ends_line() {
        assert_eq!(types("  HLT ; stop, now"), vec![ident("HLT")]);
        assert!(types("; only a comment").is_empty());
        assert!(types("").is_empty());
    }

    #[test]
    fn test_semicolon_inside_string_is_data() {
        assert_eq!(
            types("DB \"a;b\", 0"),
            vec![
                ident("DB"),
                TokenType::Str(b"a;b".to_vec()),
                TokenType::Comma,
                TokenType::Number(0),
            ]
        );
    }

    #[test]
    fn test_character_escapes() {
        assert_eq!(types("'A'"), vec![TokenType::Char(b'A')]);
        assert_eq!(types(r"'\n'"), vec![TokenType::Char(b'\n')]);
        assert_eq!(types(r"'\''"), vec![TokenType::Char(b'\'')]);
        assert_eq!(types(r"'\0'"), vec![TokenType::Char(0)]);
        assert_eq!(types("'AB'"), vec![TokenType::Str(b"AB".to_vec())]);
        assert!(matches!(
            tokenize(r"'\q'"),
            Err(LexerError::UnknownEscape { ch: 'q', .. })
        ));
        assert!(matches!(
            tokenize("''"),
            Err(LexerError::EmptyCharacter { .. })
        ));
    }

    #[test]
    fn test_unterminated_string() {
        assert_eq!(
            tokenize("DB \"abc"),
            Err(LexerError::Unterminated {
                kind: "string",
                column: 3
            })
        );
    }

    #[test]
    fn test_non_ascii_literal() {
        let err = tokenize("DB 'é'").unwrap_err();
        assert_eq!(err, LexerError::NonAscii { ch: 'é', column: 4 });
        assert_eq!(err.to_string(), "Non-ASCII character 'é' in literal");
        assert!(matches!(
            tokenize("DB \"ok 漢\""),
            Err(LexerError::NonAscii { ch: '漢', .. })
        ));
    }

    #[test]
    fn test_identifier_keeps_case_and_digits() {
        assert_eq!(types("ax1 .org _tmp"), vec![ident("ax1"), ident(".org"), ident("_tmp")]);
    }

    #[test]
    fn test_unexpected_character() {
        let err = tokenize("LD R0,@5").unwrap_err();
        assert_eq!(err, LexerError::UnexpectedCharacter { ch: '@', column: 6 });
        assert_eq!(err.to_string(), "Unexpected character '@'");
    }

    #[test]
    fn test_token_stream_lookahead() {
        let mut stream = TokenStream::new(tokenize("START: JMP START").unwrap());
        assert_eq!(stream.peek_n(1).unwrap().token_type, TokenType::Colon);
        assert!(stream.advance());
        assert!(stream.eat(&TokenType::Colon));
        assert_eq!(stream.consume().unwrap().token_type, ident("JMP"));
        assert_eq!(stream.current_column(), 11);
        stream.advance();
        assert!(stream.is_eof());
        assert_eq!(stream.current_column(), 16);
    }
}
