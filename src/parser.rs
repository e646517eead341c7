//! The recursive-descent parser and evaluator.
//!
//! Parsing and evaluation happen in one pass: there is no separate AST.
//! The parser consumes tokens through a [`Cursor`], keeps the currently
//! open compounds on a [`ScopeStack`], and dispatches identifiers to the
//! builtin registry, the native-function registry, or scope resolution.
//!
//! # Example
//!
//! ```rust
//! use lynxconf::Parser;
//!
//! let parser = Parser::new();
//! let root = parser.parse_source("demo.lynx", "greeting = ( \"hi \" \"there\" )").unwrap();
//! let compound = root.as_compound().unwrap();
//!
//! assert_eq!(compound.get_string("greeting"), Some("hi there"));
//! ```

use std::cell::Cell;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::rc::Rc;

use crate::builtins::{self, BuiltinFn};
use crate::error::{Location, ParseError};
use crate::lexer::{self, Token, TokenKind};
use crate::natives;
use crate::scope::ScopeStack;
use crate::types::{Field, Type, ValidateFlags};
use crate::value::{CompoundValue, FunctionBody, FunctionValue, Kind, ListValue, Value, ValueKind};
use crate::value::ROOT_KEY;

/// Maximum nesting depth of the evaluator before a clean diagnostic is
/// produced instead of a host stack overflow.
const MAX_DEPTH: usize = 512;

/// A mutable cursor over a shared token slice.
///
/// Every parse helper consumes its construct entirely, so on return the
/// cursor sits on the first token after it.
pub(crate) struct Cursor<'a> {
    tokens: &'a [Token],
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub(crate) fn new(tokens: &'a [Token]) -> Self {
        Cursor { tokens, pos: 0 }
    }

    pub(crate) fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    pub(crate) fn peek2(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos + 1)
    }

    pub(crate) fn next(&mut self) -> Option<&'a Token> {
        let token = self.tokens.get(self.pos);
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    pub(crate) fn at(&self, kind: TokenKind) -> bool {
        self.peek().is_some_and(|t| t.kind == kind)
    }

    pub(crate) fn expect(&mut self, kind: TokenKind, what: &str) -> Result<&'a Token, ParseError> {
        match self.peek() {
            Some(token) if token.kind == kind => {
                self.pos += 1;
                Ok(token)
            }
            Some(token) => Err(ParseError::UnexpectedToken {
                expected: what.to_string(),
                found: format!("'{}'", token.lexeme),
                loc: Location::of(token),
            }),
            None => Err(self.eof(what)),
        }
    }

    pub(crate) fn eof(&self, context: &str) -> ParseError {
        ParseError::UnexpectedEof {
            context: context.to_string(),
            loc: self.tokens.last().map(Location::of).unwrap_or_default(),
        }
    }
}

/// The Lynx parser/evaluator.
///
/// Holds the builtin and native registries, built once at construction, and
/// the recursion accounting. A `Parser` is reusable across files.
pub struct Parser {
    builtins: HashMap<&'static str, BuiltinFn>,
    natives: HashMap<&'static str, FunctionValue>,
    depth: Cell<usize>,
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

impl Parser {
    /// Creates a parser with the standard builtins and native functions.
    pub fn new() -> Self {
        Parser {
            builtins: builtins::registry(),
            natives: natives::registry(),
            depth: Cell::new(0),
        }
    }

    /// Parses a configuration file into its root compound.
    ///
    /// The returned value is a compound keyed [`ROOT_KEY`].
    pub fn parse_file(&self, path: impl AsRef<Path>) -> Result<Value, ParseError> {
        let mut scope = ScopeStack::new();
        self.parse_include(path.as_ref(), &mut scope)
    }

    /// Parses an in-memory source into its root compound.
    pub fn parse_source(&self, file: &str, source: &str) -> Result<Value, ParseError> {
        let mut scope = ScopeStack::new();
        self.parse_source_in(file, source, &mut scope)
    }

    /// Parses a file with an existing scope stack visible beneath the new
    /// root, as `use` does for includes.
    pub(crate) fn parse_include(
        &self,
        path: &Path,
        scope: &mut ScopeStack,
    ) -> Result<Value, ParseError> {
        let source = fs::read_to_string(path).map_err(|err| {
            ParseError::runtime(format!("failed to read '{}': {err}", path.display()))
        })?;
        self.parse_source_in(&path.display().to_string(), &source, scope)
    }

    pub(crate) fn parse_source_in(
        &self,
        file: &str,
        source: &str,
        scope: &mut ScopeStack,
    ) -> Result<Value, ParseError> {
        let tokens = lexer::tokenize(file, source)?;
        let mut cur = Cursor::new(&tokens);
        let mut root = self.parse_compound(&mut cur, scope)?;
        if let Some(extra) = cur.peek() {
            return Err(ParseError::UnexpectedToken {
                expected: "end of file".to_string(),
                found: format!("'{}'", extra.lexeme),
                loc: Location::of(extra),
            });
        }
        root.key = ROOT_KEY.to_string();
        Ok(root)
    }

    /// Parses and evaluates one expression.
    pub(crate) fn parse_value(
        &self,
        cur: &mut Cursor,
        scope: &mut ScopeStack,
    ) -> Result<Value, ParseError> {
        let _guard = self.enter()?;
        let token = cur.peek().ok_or_else(|| cur.eof("a value"))?;
        match token.kind {
            TokenKind::ListStart => self.parse_list(cur, scope),
            TokenKind::CompoundStart => self.parse_compound(cur, scope),
            TokenKind::String => {
                let value = Value::string(token.lexeme.clone());
                cur.next();
                Ok(value)
            }
            TokenKind::Number => {
                let number: f64 = token.lexeme.parse().map_err(|_| ParseError::UnexpectedToken {
                    expected: "a number".to_string(),
                    found: format!("'{}'", token.lexeme),
                    loc: Location::of(token),
                })?;
                cur.next();
                Ok(Value::number(number))
            }
            TokenKind::Dot => {
                cur.next();
                let top = scope.top().ok_or_else(|| ParseError::Fatal {
                    message: "scope stack is empty".to_string(),
                })?;
                let compound = top.borrow().clone();
                Ok(Value {
                    key: String::new(),
                    kind: ValueKind::Compound(compound),
                })
            }
            TokenKind::BlockStart => self.parse_fold(cur, scope),
            TokenKind::Identifier => self.resolve_identifier(cur, scope),
            _ => Err(ParseError::UnexpectedToken {
                expected: "a value".to_string(),
                found: format!("'{}'", token.lexeme),
                loc: Location::of(token),
            }),
        }
    }

    /// Parses `{ … }`, pushing the in-construction compound as a frame.
    fn parse_compound(
        &self,
        cur: &mut Cursor,
        scope: &mut ScopeStack,
    ) -> Result<Value, ParseError> {
        cur.expect(TokenKind::CompoundStart, "'{'")?;
        let frame = scope.push_new();
        let body = self.parse_compound_body(cur, scope, &frame);
        scope.pop();
        let compound = match Rc::try_unwrap(frame) {
            Ok(cell) => cell.into_inner(),
            // a declared function captured this frame; hand out a snapshot
            Err(shared) => shared.borrow().clone(),
        };
        body?;
        Ok(Value {
            key: String::new(),
            kind: ValueKind::Compound(compound),
        })
    }

    fn parse_compound_body(
        &self,
        cur: &mut Cursor,
        scope: &mut ScopeStack,
        frame: &crate::scope::Frame,
    ) -> Result<(), ParseError> {
        loop {
            let token = cur.peek().ok_or_else(|| cur.eof("'}'"))?;
            match token.kind {
                TokenKind::CompoundEnd => {
                    cur.next();
                    return Ok(());
                }
                TokenKind::BlockStart => {
                    let loc = Location::of(token);
                    cur.next();
                    let value = self.parse_value(cur, scope)?;
                    cur.expect(TokenKind::BlockEnd, "')'")?;
                    let tag = value.kind_tag();
                    match value.kind {
                        ValueKind::Compound(other) => {
                            frame.borrow_mut().merge(other);
                        }
                        _ => {
                            return Err(ParseError::Type {
                                message: format!(
                                    "spread expression must produce a Compound, got {tag}"
                                ),
                                loc,
                            })
                        }
                    }
                }
                TokenKind::Identifier => {
                    let key = token.lexeme.clone();
                    let key_loc = Location::of(token);
                    cur.next();

                    if cur.at(TokenKind::Colon) {
                        cur.next();
                        let ty = self.parse_type(cur, scope)?;
                        let existing = frame.borrow().get(&key).map(Value::kind_tag);
                        match existing {
                            Some(Kind::Type) => {
                                return Err(ParseError::Type {
                                    message: format!("type already declared for key '{key}'"),
                                    loc: key_loc,
                                })
                            }
                            Some(_) => {
                                log::warn!(
                                    "{key_loc}: type declaration for existing entry '{key}' has no effect"
                                );
                            }
                            None => frame.borrow_mut().add(Value {
                                key: key.clone(),
                                kind: ValueKind::Type(ty),
                            }),
                        }
                        if !cur.at(TokenKind::Assign) {
                            continue;
                        }
                    }

                    cur.expect(TokenKind::Assign, "'='")?;
                    let mut value = self.parse_value(cur, scope)?;
                    value.key = key.clone();

                    let declared = frame
                        .borrow()
                        .get(&key)
                        .and_then(Value::as_type)
                        .cloned();
                    if let Some(ty) = declared {
                        let mut sink = Vec::new();
                        if !ty.validate(&value, ValidateFlags::default(), &mut sink) {
                            return Err(ParseError::Type {
                                message: format!(
                                    "invalid entry type for key '{key}': {}",
                                    sink.join("; ")
                                ),
                                loc: key_loc,
                            });
                        }
                    }
                    frame.borrow_mut().add(value);
                }
                _ => {
                    return Err(ParseError::UnexpectedToken {
                        expected: "a key, '(' or '}'".to_string(),
                        found: format!("'{}'", token.lexeme),
                        loc: Location::of(token),
                    })
                }
            }
        }
    }

    /// Parses `[ … ]`, enforcing element homogeneity.
    fn parse_list(&self, cur: &mut Cursor, scope: &mut ScopeStack) -> Result<Value, ParseError> {
        cur.expect(TokenKind::ListStart, "'['")?;
        let mut list = ListValue::new();
        loop {
            let token = cur.peek().ok_or_else(|| cur.eof("']'"))?;
            if token.kind == TokenKind::ListEnd {
                cur.next();
                break;
            }
            let loc = Location::of(token);
            let mut value = self.parse_value(cur, scope)?;
            value.key.clear();
            list.add(value).map_err(|(expected, got)| ParseError::Type {
                message: format!("invalid entry type in list: expected {expected} but got {got}"),
                loc,
            })?;
        }
        Ok(Value {
            key: String::new(),
            kind: ValueKind::List(list),
        })
    }

    /// Parses `( t1 t2 … )`, folding the terms into an accumulator.
    fn parse_fold(&self, cur: &mut Cursor, scope: &mut ScopeStack) -> Result<Value, ParseError> {
        cur.expect(TokenKind::BlockStart, "'('")?;
        let mut acc = self.parse_value(cur, scope)?;
        loop {
            let token = cur.peek().ok_or_else(|| cur.eof("')'"))?;
            if token.kind == TokenKind::BlockEnd {
                cur.next();
                break;
            }
            let loc = Location::of(token);
            let term = self.parse_value(cur, scope)?;
            acc = fold_values(acc, term)
                .map_err(|message| ParseError::Type { message, loc })?;
        }
        Ok(acc)
    }

    /// Resolves an identifier per the dispatch order: builtin, native,
    /// scope stack, dot-callable method form.
    fn resolve_identifier(
        &self,
        cur: &mut Cursor,
        scope: &mut ScopeStack,
    ) -> Result<Value, ParseError> {
        let first = cur.peek().ok_or_else(|| cur.eof("an identifier"))?;
        let loc = Location::of(first);
        let single = !cur.peek2().is_some_and(|t| t.kind == TokenKind::Dot);

        if single {
            if let Some(handler) = self.builtins.get(first.lexeme.as_str()) {
                let handler = *handler;
                cur.next();
                return handler(self, cur, scope);
            }
            if let Some(native) = self.natives.get(first.lexeme.as_str()) {
                let func = native.clone();
                cur.next();
                return self.call_function(&func, None, cur, scope, &loc);
            }
        }

        let (path, _) = self.parse_dotted_path(cur)?;
        if let Some((value, parent)) = scope.lookup_with_parent(&path) {
            if let ValueKind::Function(func) = value.kind {
                return self.call_function(&func, parent, cur, scope, &loc);
            }
            return Ok(value);
        }

        // the path itself is dead, but `parent.method` may still be a
        // dot-callable call with the method resolved on its own
        if let Some(split) = path.rfind('.') {
            let (parent_path, method) = (&path[..split], &path[split + 1..]);
            let parent = scope.lookup(parent_path);
            let callee = scope
                .lookup(method)
                .and_then(|v| match v.kind {
                    ValueKind::Function(f) => Some(f),
                    _ => None,
                })
                .or_else(|| self.natives.get(method).cloned());
            if let (Some(parent), Some(func)) = (parent, callee) {
                if func.dot_callable {
                    return self.call_function(&func, Some(parent), cur, scope, &loc);
                }
            }
        }

        Err(ParseError::Unresolved { path, loc })
    }

    /// Consumes `ident (. ident)*`, returning the joined path and the
    /// location of its first segment.
    pub(crate) fn parse_dotted_path(
        &self,
        cur: &mut Cursor,
    ) -> Result<(String, Location), ParseError> {
        let first = cur.expect(TokenKind::Identifier, "an identifier")?;
        let loc = Location::of(first);
        let mut path = first.lexeme.clone();
        while cur.at(TokenKind::Dot) {
            cur.next();
            let segment = cur.expect(TokenKind::Identifier, "a path segment")?;
            path.push('.');
            path.push_str(&segment.lexeme);
        }
        Ok((path, loc))
    }

    /// Invokes a function: parses and validates arguments at the call site,
    /// pushes the argument frame, and runs the body.
    ///
    /// `parent` is the value at the call path minus its last segment, if
    /// the path had one; a dot-callable callee binds it as the first
    /// argument when it validates, and falls back to an ordinary call
    /// otherwise.
    pub(crate) fn call_function(
        &self,
        func: &FunctionValue,
        parent: Option<Value>,
        cur: &mut Cursor,
        scope: &mut ScopeStack,
        loc: &Location,
    ) -> Result<Value, ParseError> {
        let mut args = CompoundValue::new();
        let mut slot = 0usize;

        if let Some(mut parent) = parent {
            if func.dot_callable && !func.params.is_empty() {
                let mut sink = Vec::new();
                if func.params[0]
                    .ty
                    .validate(&parent, ValidateFlags::default(), &mut sink)
                {
                    parent.key = func.params[0].name.clone();
                    args.add(parent);
                    slot = 1;
                }
            }
        }

        while slot < func.params.len() {
            let param = if cur.at(TokenKind::Assign) {
                cur.next();
                let name_token = cur.expect(TokenKind::Identifier, "an argument name")?;
                func.param(&name_token.lexeme)
                    .ok_or_else(|| ParseError::UnexpectedToken {
                        expected: "a declared argument name".to_string(),
                        found: format!("'{}'", name_token.lexeme),
                        loc: Location::of(name_token),
                    })?
                    .clone()
            } else {
                func.params[slot].clone()
            };

            let mut value = self.parse_value(cur, scope)?;
            let mut sink = Vec::new();
            if !param.ty.validate(&value, ValidateFlags::default(), &mut sink) {
                return Err(ParseError::Type {
                    message: format!(
                        "invalid type for argument '{}': {}",
                        param.name,
                        sink.join("; ")
                    ),
                    loc: loc.clone(),
                });
            }
            value.key = param.name;
            args.add(value);
            slot += 1;
        }

        match &func.body {
            FunctionBody::Tokens(body) => {
                let body = body.clone();
                let frame = Rc::new(std::cell::RefCell::new(args));
                match &func.captured {
                    Some(captured) => {
                        let mut call_scope = captured.clone();
                        call_scope.push(frame);
                        let mut body_cur = Cursor::new(body.as_slice());
                        let result = self.parse_value(&mut body_cur, &mut call_scope);
                        call_scope.pop();
                        result
                    }
                    None => {
                        scope.push(frame);
                        let mut body_cur = Cursor::new(body.as_slice());
                        let result = self.parse_value(&mut body_cur, scope);
                        scope.pop();
                        result
                    }
                }
            }
            FunctionBody::Native { handler, .. } => {
                let frame = Rc::new(std::cell::RefCell::new(args.clone()));
                scope.push(frame);
                let result = handler(self, scope, &args);
                scope.pop();
                result
            }
        }
    }

    /// Parses a type expression.
    ///
    /// ```text
    /// type := "optional"? ( "string" | "number" | "any"
    ///                     | "list" "[" type "]"
    ///                     | "compound" "{" (ident ":" type)* "}"
    ///                     | dotted-path )
    /// ```
    pub(crate) fn parse_type(
        &self,
        cur: &mut Cursor,
        scope: &mut ScopeStack,
    ) -> Result<Type, ParseError> {
        let mut token = cur.peek().ok_or_else(|| cur.eof("a type"))?;
        let mut optional = false;
        if token.kind == TokenKind::Identifier && token.lexeme == "optional" {
            optional = true;
            cur.next();
            token = cur.peek().ok_or_else(|| cur.eof("a type"))?;
        }
        if token.kind != TokenKind::Identifier {
            return Err(ParseError::UnexpectedToken {
                expected: "a type".to_string(),
                found: format!("'{}'", token.lexeme),
                loc: Location::of(token),
            });
        }

        let ty = match token.lexeme.as_str() {
            "string" => {
                cur.next();
                Type::string()
            }
            "number" => {
                cur.next();
                Type::number()
            }
            "any" => {
                cur.next();
                Type::any()
            }
            "list" => {
                cur.next();
                cur.expect(TokenKind::ListStart, "'['")?;
                let elem = self.parse_type(cur, scope)?;
                cur.expect(TokenKind::ListEnd, "']'")?;
                Type::list(elem)
            }
            "compound" => {
                cur.next();
                Type::compound(self.parse_type_fields(cur, scope)?)
            }
            _ => {
                let (path, loc) = self.parse_dotted_path(cur)?;
                match scope.lookup(&path) {
                    Some(value) => match value.kind {
                        ValueKind::Type(ty) => ty,
                        other => {
                            return Err(ParseError::Type {
                                message: format!(
                                    "invalid entry type: expected Type but got {}",
                                    other.tag()
                                ),
                                loc,
                            });
                        }
                    },
                    None => return Err(ParseError::Unresolved { path, loc }),
                }
            }
        };
        Ok(if optional { Type::optional(ty) } else { ty })
    }

    fn parse_type_fields(
        &self,
        cur: &mut Cursor,
        scope: &mut ScopeStack,
    ) -> Result<Vec<Field>, ParseError> {
        cur.expect(TokenKind::CompoundStart, "'{'")?;
        let mut fields = Vec::new();
        loop {
            let token = cur.peek().ok_or_else(|| cur.eof("'}'"))?;
            if token.kind == TokenKind::CompoundEnd {
                cur.next();
                break;
            }
            let name = cur
                .expect(TokenKind::Identifier, "a field name")?
                .lexeme
                .clone();
            cur.expect(TokenKind::Colon, "':'")?;
            let ty = self.parse_type(cur, scope)?;
            fields.push(Field::new(name, ty));
        }
        Ok(fields)
    }

    fn enter(&self) -> Result<DepthGuard<'_>, ParseError> {
        let depth = self.depth.get() + 1;
        if depth > MAX_DEPTH {
            return Err(ParseError::runtime(format!(
                "nesting depth limit ({MAX_DEPTH}) exceeded"
            )));
        }
        self.depth.set(depth);
        Ok(DepthGuard(&self.depth))
    }
}

struct DepthGuard<'a>(&'a Cell<usize>);

impl Drop for DepthGuard<'_> {
    fn drop(&mut self) {
        self.0.set(self.0.get() - 1);
    }
}

/// Folds `term` into `acc` per the parenthesized-expression rules:
/// same variant sums; a list whose element tag matches the accumulator
/// folds element by element; numbers and strings coerce towards string.
pub(crate) fn fold_values(mut acc: Value, term: Value) -> Result<Value, String> {
    let acc_kind = acc.kind_tag();
    let term_kind = term.kind_tag();

    if acc_kind == term_kind {
        sum_into(&mut acc, term)?;
        return Ok(acc);
    }

    match (acc_kind, term_kind) {
        (_, Kind::List) => {
            let ValueKind::List(list) = term.kind else {
                unreachable!("tag said List")
            };
            if list.elem_kind() != acc_kind {
                return Err(format!(
                    "invalid entry type: expected {acc_kind} but got {}",
                    list.elem_kind()
                ));
            }
            for item in list.into_items() {
                acc = fold_values(acc, item)?;
            }
            Ok(acc)
        }
        (Kind::String, Kind::Number) => {
            let ValueKind::Number(n) = term.kind else {
                unreachable!("tag said Number")
            };
            if let ValueKind::String(s) = &mut acc.kind {
                s.push_str(&format_decimal(n));
            }
            Ok(acc)
        }
        (Kind::Number, Kind::String) => {
            let ValueKind::Number(n) = acc.kind else {
                unreachable!("tag said Number")
            };
            let ValueKind::String(s) = term.kind else {
                unreachable!("tag said String")
            };
            acc.kind = ValueKind::String(format!("{}{s}", format_decimal(n)));
            Ok(acc)
        }
        _ => Err(format!(
            "invalid entry type: expected {acc_kind} but got {term_kind}"
        )),
    }
}

fn sum_into(acc: &mut Value, term: Value) -> Result<(), String> {
    match (&mut acc.kind, term.kind) {
        (ValueKind::String(a), ValueKind::String(b)) => {
            a.push_str(&b);
            Ok(())
        }
        (ValueKind::Number(a), ValueKind::Number(b)) => {
            *a += b;
            Ok(())
        }
        (ValueKind::List(a), ValueKind::List(b)) => a.merge(b).map_err(|(expected, got)| {
            format!("invalid entry type in list: expected {expected} but got {got}")
        }),
        (ValueKind::Compound(a), ValueKind::Compound(b)) => {
            a.merge(b);
            Ok(())
        }
        (_, other) => Err(format!("invalid entry type {} in fold", other.tag())),
    }
}

/// The `%f`-style rendering used when numbers coerce into strings:
/// six fractional digits, trailing zeros preserved.
pub(crate) fn format_decimal(n: f64) -> String {
    format!("{n:.6}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> Value {
        Parser::new().parse_source("test.lynx", source).unwrap()
    }

    fn parse_err(source: &str) -> ParseError {
        Parser::new().parse_source("test.lynx", source).unwrap_err()
    }

    #[test]
    fn root_is_keyed() {
        let root = parse("a = 1");
        assert_eq!(root.key, ROOT_KEY);
        assert_eq!(root.as_compound().unwrap().get_number("a"), Some(1.0));
    }

    #[test]
    fn empty_source_yields_empty_root() {
        let root = parse("");
        assert!(root.as_compound().unwrap().is_empty());
    }

    #[test]
    fn nested_compounds_and_lists() {
        let root = parse("server = { host = \"localhost\" ports = [ 80 443 ] }");
        let compound = root.as_compound().unwrap();
        assert_eq!(
            compound.get_by_path("server.host").and_then(Value::as_string),
            Some("localhost")
        );
        let ports = compound
            .get_by_path("server.ports")
            .and_then(Value::as_list)
            .unwrap();
        assert_eq!(ports.len(), 2);
        assert_eq!(ports.get(1).unwrap().as_number(), Some(443.0));
    }

    #[test]
    fn identifier_resolves_to_clone() {
        let root = parse("a = 1 b = a");
        assert_eq!(root.as_compound().unwrap().get_number("b"), Some(1.0));
    }

    #[test]
    fn reassignment_replaces_in_place() {
        let root = parse("a = 1 b = 2 a = 3");
        let compound = root.as_compound().unwrap();
        assert_eq!(compound.len(), 2);
        assert_eq!(compound.entries()[0].key, "a");
        assert_eq!(compound.get_number("a"), Some(3.0));
    }

    #[test]
    fn fold_sums_numbers() {
        let root = parse("x = ( 1 2 3 )");
        assert_eq!(root.as_compound().unwrap().get_number("x"), Some(6.0));
    }

    #[test]
    fn fold_concatenates_strings() {
        let root = parse("x = ( \"a\" \"b\" )");
        assert_eq!(root.as_compound().unwrap().get_string("x"), Some("ab"));
    }

    #[test]
    fn fold_folds_list_elements_into_scalar() {
        let root = parse("x = ( 1 [ 2 3 ] )");
        assert_eq!(root.as_compound().unwrap().get_number("x"), Some(6.0));
    }

    #[test]
    fn fold_rejects_mismatched_terms() {
        assert!(matches!(
            parse_err("x = ( [ 1 ] \"s\" )"),
            ParseError::Type { .. }
        ));
    }

    #[test]
    fn self_reference_clones_open_compound() {
        let root = parse("a = 1 copy = ( . )");
        let copy = root
            .as_compound()
            .unwrap()
            .get_compound("copy")
            .unwrap();
        assert_eq!(copy.get_number("a"), Some(1.0));
    }

    #[test]
    fn unknown_identifier_is_resolve_error() {
        assert!(matches!(
            parse_err("a = missing"),
            ParseError::Unresolved { .. }
        ));
    }

    #[test]
    fn missing_terminator_is_eof_error() {
        assert!(matches!(
            parse_err("a = { b = 1"),
            ParseError::UnexpectedEof { .. } | ParseError::UnexpectedToken { .. }
        ));
    }

    #[test]
    fn stray_close_brace_is_rejected() {
        assert!(matches!(
            parse_err("a = 1 }"),
            ParseError::UnexpectedToken { .. }
        ));
    }

    #[test]
    fn deep_nesting_fails_cleanly() {
        let mut source = String::from("x = ");
        for _ in 0..(MAX_DEPTH + 8) {
            source.push('{');
            source.push_str(" y = ");
        }
        source.push('1');
        for _ in 0..(MAX_DEPTH + 8) {
            source.push('}');
        }
        let err = Parser::new().parse_source("deep.lynx", &source).unwrap_err();
        assert!(err.to_string().contains("depth limit"));
    }

    #[test]
    fn moderate_nesting_is_accepted() {
        let mut source = String::from("x = ");
        for _ in 0..256 {
            source.push_str("{ y = ");
        }
        source.push('1');
        for _ in 0..256 {
            source.push('}');
        }
        assert!(Parser::new().parse_source("deep.lynx", &source).is_ok());
    }
}
