//! # Lynx - a configuration language with embedded scripting
//!
//! Lynx files describe structured data (strings, numbers, homogeneous
//! lists, ordered compounds) and may compute it: typed declarations,
//! user-defined functions, file inclusion, schema validation, and a small
//! expression language with control flow. Evaluation happens *during*
//! parsing (the parser is also the interpreter), so the result of a parse
//! is a final, static value tree.
//!
//! ```text
//! -- demo.lynx
//! point : compound { x : number y : number }
//! point = { x = 1 y = 2 }
//! banner = ( "point at " point.x )
//! ```
//!
//! ## Quick start
//!
//! ```rust
//! use lynxconf::parse_str;
//!
//! let root = parse_str(r#"
//! name = "lynx"
//! total = for n in [ 1 2 3 ] ( n )
//! "#).unwrap();
//!
//! let compound = root.as_compound().unwrap();
//! assert_eq!(compound.get_string("name"), Some("lynx"));
//! assert_eq!(compound.get_number("total"), Some(6.0));
//! ```
//!
//! ## Modules
//!
//! - [`lexer`]: tokenization of Lynx source text
//! - [`value`]: the six-variant value universe
//! - [`types`]: structural types and validation
//! - [`scope`]: the stack of open compounds
//! - [`parser`]: the combined parser/evaluator
//! - [`natives`]: host-backed native functions
//! - [`error`]: diagnostics with source locations

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod error;
pub mod lexer;
pub mod natives;
pub mod parser;
pub mod scope;
pub mod types;
pub mod value;

mod builtins;

// Re-exports for convenience
pub use error::{LexError, Location, ParseError};
pub use lexer::{Token, TokenKind};
pub use parser::Parser;
pub use scope::ScopeStack;
pub use types::{Field, Type, TypeShape, ValidateFlags};
pub use value::{CompoundValue, FunctionValue, Kind, ListValue, Value, ValueKind};

/// Parses a Lynx source string into its root compound.
///
/// This is the primary in-memory entry point. The returned value is a
/// compound keyed `.root`.
///
/// # Example
///
/// ```rust
/// let root = lynxconf::parse_str("a = 1 b = ( a 1 )").unwrap();
/// let compound = root.as_compound().unwrap();
/// assert_eq!(compound.get_number("b"), Some(2.0));
/// ```
pub fn parse_str(source: &str) -> Result<Value, ParseError> {
    Parser::new().parse_source("<input>", source)
}

/// Parses a Lynx configuration file into its root compound.
pub fn parse_path(path: impl AsRef<std::path::Path>) -> Result<Value, ParseError> {
    Parser::new().parse_file(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_str_returns_root_compound() {
        let root = parse_str("a = 1").unwrap();
        assert_eq!(root.key, value::ROOT_KEY);
        assert_eq!(root.as_compound().unwrap().get_number("a"), Some(1.0));
    }

    #[test]
    fn parse_str_surfaces_errors() {
        assert!(parse_str("a = ").is_err());
        assert!(parse_str("a = $").is_err());
    }

    #[test]
    fn parse_path_reports_missing_file() {
        let err = parse_path("does/not/exist.lynx").unwrap_err();
        assert!(matches!(err, ParseError::Runtime { .. }));
    }
}
