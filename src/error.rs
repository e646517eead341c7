//! Error types for Lynx.
//!
//! All diagnostics carry a [`Location`] so that every surfaced message reads
//! `file:line:column: message`. There is no error recovery: the first failure
//! unwinds to the outermost parse.
//!
//! # Error Categories
//!
//! - [`LexError`]: errors during tokenization
//! - [`ParseError`]: everything after tokenization: grammar, type
//!   validation, identifier resolution, runtime failures of native
//!   functions, and internal invariant violations

use std::fmt;

use thiserror::Error;

use crate::lexer::Token;

/// A source position attached to a diagnostic.
///
/// Columns are displayed 1-based even though tokens record them 0-based.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Location {
    /// Originating file (or `<input>` for in-memory sources)
    pub file: String,
    /// 1-based line number
    pub line: u32,
    /// 1-based display column
    pub column: u32,
}

impl Location {
    /// Creates a location from explicit coordinates.
    pub fn new(file: impl Into<String>, line: u32, column: u32) -> Self {
        Self {
            file: file.into(),
            line,
            column,
        }
    }

    /// The display location of a token.
    pub fn of(token: &Token) -> Self {
        Self {
            file: token.file.clone(),
            line: token.line,
            column: token.column + 1,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

/// Errors produced by the [`lexer`](crate::lexer).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LexError {
    /// A byte that starts no token.
    #[error("{loc}: unexpected character '{ch}'")]
    UnexpectedChar {
        /// The offending character
        ch: char,
        /// Where it was found
        loc: Location,
    },

    /// A string literal ran to end of input without a closing quote.
    #[error("{loc}: unterminated string literal")]
    UnterminatedString {
        /// Location of the opening quote
        loc: Location,
    },

    /// An escape sequence outside the supported set.
    #[error("{loc}: invalid escape sequence '\\{ch}'")]
    InvalidEscape {
        /// The character following the backslash
        ch: char,
        /// Location of the escape
        loc: Location,
    },
}

/// Errors produced while parsing and evaluating.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    /// The token stream did not match the grammar.
    #[error("{loc}: expected {expected}, found {found}")]
    UnexpectedToken {
        /// What the parser was looking for
        expected: String,
        /// The lexeme it found instead
        found: String,
        /// Location of the offending token
        loc: Location,
    },

    /// The token stream ended inside a construct.
    #[error("{loc}: unexpected end of input while looking for {context}")]
    UnexpectedEof {
        /// What was still expected
        context: String,
        /// Location of the last token seen
        loc: Location,
    },

    /// A value failed validation against an expected type.
    #[error("{loc}: {message}")]
    Type {
        /// Validation diagnostics, joined
        message: String,
        /// Location of the validated construct
        loc: Location,
    },

    /// A dotted path or identifier did not resolve.
    #[error("{loc}: failed to resolve '{path}'")]
    Unresolved {
        /// The path as written
        path: String,
        /// Location of its first segment
        loc: Location,
    },

    /// A native operation failed at evaluation time.
    #[error("{message}")]
    Runtime {
        /// Description of the failure
        message: String,
    },

    /// An internal invariant was violated.
    #[error("internal error: {message}")]
    Fatal {
        /// Description of the violated invariant
        message: String,
    },

    /// A lexer error surfaced through the parser.
    #[error(transparent)]
    Lex(#[from] LexError),
}

impl ParseError {
    /// Shorthand for a runtime failure.
    pub fn runtime(message: impl Into<String>) -> Self {
        ParseError::Runtime {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn location_display_is_file_line_column() {
        let loc = Location::new("conf.lynx", 3, 7);
        assert_eq!(loc.to_string(), "conf.lynx:3:7");
    }

    #[test]
    fn lex_error_carries_location() {
        let err = LexError::UnexpectedChar {
            ch: '$',
            loc: Location::new("conf.lynx", 2, 5),
        };
        let msg = err.to_string();
        assert!(msg.contains("conf.lynx:2:5"));
        assert!(msg.contains('$'));
    }

    #[test]
    fn parse_error_from_lex_error() {
        let lex = LexError::UnterminatedString {
            loc: Location::new("conf.lynx", 1, 1),
        };
        let parse: ParseError = lex.clone().into();
        assert_eq!(parse.to_string(), lex.to_string());
    }
}
