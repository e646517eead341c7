//! Lexical analysis for Lynx.
//!
//! This module turns source text into a stream of tokens for the parser.
//! The top level of a file is an implicit compound, so the token vector is
//! wrapped in synthetic `{` `}` tokens carrying the file's first and last
//! positions.
//!
//! # Example
//!
//! ```rust
//! use lynxconf::lexer::{tokenize, TokenKind};
//!
//! let tokens = tokenize("conf.lynx", "greeting = \"hi\"").unwrap();
//!
//! assert_eq!(tokens[0].kind, TokenKind::CompoundStart);
//! assert_eq!(tokens[1].kind, TokenKind::Identifier);
//! assert_eq!(tokens[2].kind, TokenKind::Assign);
//! assert_eq!(tokens[3].kind, TokenKind::String);
//! assert_eq!(tokens[4].kind, TokenKind::CompoundEnd);
//! ```
//!
//! # Token rules
//!
//! - whitespace separates tokens; `--` starts a line comment
//! - `"` strings support the escapes `\n \r \t \0 \\ \"` and may span lines
//! - a digit, or a sign immediately followed by a digit, starts a number
//! - identifiers are `[A-Za-z0-9_-]+` (digit-led lexemes are numbers)
//! - `[ ] { } ( ) . = :` are single-character tokens

use crate::error::{LexError, Location};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A lexical token.
///
/// Tokens carry their kind, the decoded lexeme (escape sequences in strings
/// are already resolved), and the source position for diagnostics.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Token {
    /// The category of this token
    pub kind: TokenKind,

    /// The decoded source text of this token
    pub lexeme: String,

    /// Originating file
    pub file: String,

    /// 1-based line number
    pub line: u32,

    /// 0-based column number
    pub column: u32,
}

impl Token {
    /// Creates a new token.
    pub fn new(
        kind: TokenKind,
        lexeme: impl Into<String>,
        file: impl Into<String>,
        line: u32,
        column: u32,
    ) -> Self {
        Self {
            kind,
            lexeme: lexeme.into(),
            file: file.into(),
            line,
            column,
        }
    }
}

/// Tokens compare by kind and lexeme; positions are ignored so that
/// function bodies compare equal across files.
impl PartialEq for Token {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.lexeme == other.lexeme
    }
}

impl Eq for Token {}

/// The category of a lexical token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum TokenKind {
    /// A quoted string literal
    String,
    /// A number literal
    Number,
    /// List start `[`
    ListStart,
    /// List end `]`
    ListEnd,
    /// Compound start `{`
    CompoundStart,
    /// Compound end `}`
    CompoundEnd,
    /// Block start `(`
    BlockStart,
    /// Block end `)`
    BlockEnd,
    /// An identifier
    Identifier,
    /// Member access `.`
    Dot,
    /// Assignment `=`
    Assign,
    /// Type declaration `:`
    Colon,
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenKind::String => write!(f, "string"),
            TokenKind::Number => write!(f, "number"),
            TokenKind::ListStart => write!(f, "'['"),
            TokenKind::ListEnd => write!(f, "']'"),
            TokenKind::CompoundStart => write!(f, "'{{'"),
            TokenKind::CompoundEnd => write!(f, "'}}'"),
            TokenKind::BlockStart => write!(f, "'('"),
            TokenKind::BlockEnd => write!(f, "')'"),
            TokenKind::Identifier => write!(f, "identifier"),
            TokenKind::Dot => write!(f, "'.'"),
            TokenKind::Assign => write!(f, "'='"),
            TokenKind::Colon => write!(f, "':'"),
        }
    }
}

/// Tokenizes a source text, wrapping the result in the implicit root braces.
///
/// # Arguments
///
/// * `file` - file identifier used in token positions and diagnostics
/// * `source` - the raw source text
///
/// # Errors
///
/// Returns a [`LexError`] for unknown characters, unterminated strings, and
/// invalid escape sequences.
pub fn tokenize(file: &str, source: &str) -> Result<Vec<Token>, LexError> {
    let mut lexer = Lexer::new(file, source);
    lexer.run()
}

fn is_identifier_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

/// The scanner. Holds the decoded character buffer and the current position.
struct Lexer<'a> {
    file: &'a str,
    chars: Vec<char>,
    pos: usize,
    line: u32,
    column: u32,
}

impl<'a> Lexer<'a> {
    fn new(file: &'a str, source: &'a str) -> Self {
        Lexer {
            file,
            chars: source.chars().collect(),
            pos: 0,
            line: 1,
            column: 0,
        }
    }

    fn run(&mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens = vec![Token::new(TokenKind::CompoundStart, "{", self.file, 1, 0)];

        loop {
            self.skip_whitespace_and_comments();
            let Some(c) = self.peek() else { break };

            let line = self.line;
            let column = self.column;
            let token = match c {
                '"' => self.scan_string(line, column)?,
                '[' => self.punct(TokenKind::ListStart, "[", line, column),
                ']' => self.punct(TokenKind::ListEnd, "]", line, column),
                '{' => self.punct(TokenKind::CompoundStart, "{", line, column),
                '}' => self.punct(TokenKind::CompoundEnd, "}", line, column),
                '(' => self.punct(TokenKind::BlockStart, "(", line, column),
                ')' => self.punct(TokenKind::BlockEnd, ")", line, column),
                '.' => self.punct(TokenKind::Dot, ".", line, column),
                '=' => self.punct(TokenKind::Assign, "=", line, column),
                ':' => self.punct(TokenKind::Colon, ":", line, column),
                '+' | '-' if self.peek_at(1).is_some_and(|n| n.is_ascii_digit()) => {
                    self.scan_number(line, column)
                }
                c if c.is_ascii_digit() => self.scan_number(line, column),
                c if is_identifier_char(c) => self.scan_identifier(line, column),
                c => {
                    return Err(LexError::UnexpectedChar {
                        ch: c,
                        loc: Location::new(self.file, line, column + 1),
                    })
                }
            };
            tokens.push(token);
        }

        tokens.push(Token::new(
            TokenKind::CompoundEnd,
            "}",
            self.file,
            self.line,
            self.column,
        ));
        Ok(tokens)
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 0;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => {
                    self.advance();
                }
                Some('-') if self.peek_at(1) == Some('-') => {
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.advance();
                    }
                }
                _ => break,
            }
        }
    }

    fn punct(&mut self, kind: TokenKind, lexeme: &str, line: u32, column: u32) -> Token {
        self.advance();
        Token::new(kind, lexeme, self.file, line, column)
    }

    fn scan_string(&mut self, line: u32, column: u32) -> Result<Token, LexError> {
        let start = Location::new(self.file, line, column + 1);
        self.advance(); // opening quote

        let mut value = String::new();
        loop {
            let Some(c) = self.advance() else {
                return Err(LexError::UnterminatedString { loc: start });
            };
            match c {
                '"' => break,
                '\\' => {
                    let esc_line = self.line;
                    let esc_column = self.column;
                    let Some(esc) = self.advance() else {
                        return Err(LexError::UnterminatedString { loc: start });
                    };
                    match esc {
                        'n' => value.push('\n'),
                        'r' => value.push('\r'),
                        't' => value.push('\t'),
                        '0' => value.push('\0'),
                        '\\' => value.push('\\'),
                        '"' => value.push('"'),
                        other => {
                            return Err(LexError::InvalidEscape {
                                ch: other,
                                loc: Location::new(self.file, esc_line, esc_column),
                            })
                        }
                    }
                }
                other => value.push(other),
            }
        }

        Ok(Token::new(TokenKind::String, value, self.file, line, column))
    }

    fn scan_number(&mut self, line: u32, column: u32) -> Token {
        let mut lexeme = String::new();
        if let Some(sign @ ('+' | '-')) = self.peek() {
            lexeme.push(sign);
            self.advance();
        }
        self.take_digits(&mut lexeme);
        if self.peek() == Some('.') && self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) {
            lexeme.push('.');
            self.advance();
            self.take_digits(&mut lexeme);
        }
        Token::new(TokenKind::Number, lexeme, self.file, line, column)
    }

    fn take_digits(&mut self, lexeme: &mut String) {
        while let Some(c) = self.peek() {
            if !c.is_ascii_digit() {
                break;
            }
            lexeme.push(c);
            self.advance();
        }
    }

    fn scan_identifier(&mut self, line: u32, column: u32) -> Token {
        let mut lexeme = String::new();
        while let Some(c) = self.peek() {
            if !is_identifier_char(c) {
                break;
            }
            lexeme.push(c);
            self.advance();
        }
        Token::new(TokenKind::Identifier, lexeme, self.file, line, column)
    }
}
