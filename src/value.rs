//! The Lynx value universe.
//!
//! Every evaluated construct is a [`Value`]: a key (empty unless the value
//! is a named member of a compound) plus one of six payloads. Compounds
//! preserve insertion order and keep keys unique; lists are homogeneous and
//! carry the element kind as a tag; functions carry their parameter
//! specification and either a token-slice body or a host callback.
//!
//! # Example
//!
//! ```rust
//! use lynxconf::value::{CompoundValue, Value};
//!
//! let mut compound = CompoundValue::new();
//! compound.add(Value::number(1.0).with_key("a"));
//! compound.add(Value::string("x").with_key("a"));
//!
//! // re-adding replaces in place
//! assert_eq!(compound.len(), 1);
//! assert_eq!(compound.get_string("a"), Some("x"));
//! ```

use std::fmt;
use std::io::{self, Write};
use std::rc::Rc;

use crate::lexer::Token;
use crate::scope::ScopeStack;
use crate::types::{Field, Type};

/// The key carried by the root compound of a parsed file. Printing a
/// compound with this key omits the enclosing braces.
pub const ROOT_KEY: &str = ".root";

/// Argument text in printed function signatures longer than this collapses
/// to `...`.
const FUNC_PRINT_LIMIT: usize = 16;

/// The discriminant of a value or type payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    /// The tag of an empty list
    Invalid,
    /// A string
    String,
    /// A number
    Number,
    /// A list
    List,
    /// A compound
    Compound,
    /// A reified type
    Type,
    /// A function
    Function,
    /// Any kind (types only)
    Any,
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Kind::Invalid => "Invalid",
            Kind::String => "String",
            Kind::Number => "Number",
            Kind::List => "List",
            Kind::Compound => "Compound",
            Kind::Type => "Type",
            Kind::Function => "Function",
            Kind::Any => "Any",
        };
        write!(f, "{name}")
    }
}

/// A value together with its key.
#[derive(Debug, Clone)]
pub struct Value {
    /// Member key; empty for list elements and expression results
    pub key: String,
    /// The payload
    pub kind: ValueKind,
}

/// The payload of a [`Value`].
#[derive(Debug, Clone)]
pub enum ValueKind {
    /// UTF-8 text
    String(String),
    /// 64-bit float; booleans are `0`/`1`
    Number(f64),
    /// Homogeneous ordered sequence
    List(ListValue),
    /// Ordered unique-key mapping
    Compound(CompoundValue),
    /// A callable
    Function(FunctionValue),
    /// A reified type descriptor
    Type(Type),
}

impl Value {
    /// An anonymous string value.
    pub fn string(value: impl Into<String>) -> Self {
        Value {
            key: String::new(),
            kind: ValueKind::String(value.into()),
        }
    }

    /// An anonymous number value.
    pub fn number(value: f64) -> Self {
        Value {
            key: String::new(),
            kind: ValueKind::Number(value),
        }
    }

    /// Replaces the key, builder-style.
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    /// The discriminant of this value.
    pub fn kind_tag(&self) -> Kind {
        self.kind.tag()
    }

    /// The string payload, if this is a string.
    pub fn as_string(&self) -> Option<&str> {
        match &self.kind {
            ValueKind::String(s) => Some(s),
            _ => None,
        }
    }

    /// The number payload, if this is a number.
    pub fn as_number(&self) -> Option<f64> {
        match &self.kind {
            ValueKind::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// The list payload, if this is a list.
    pub fn as_list(&self) -> Option<&ListValue> {
        match &self.kind {
            ValueKind::List(l) => Some(l),
            _ => None,
        }
    }

    /// The compound payload, if this is a compound.
    pub fn as_compound(&self) -> Option<&CompoundValue> {
        match &self.kind {
            ValueKind::Compound(c) => Some(c),
            _ => None,
        }
    }

    /// The function payload, if this is a function.
    pub fn as_function(&self) -> Option<&FunctionValue> {
        match &self.kind {
            ValueKind::Function(f) => Some(f),
            _ => None,
        }
    }

    /// The type payload, if this is a reified type.
    pub fn as_type(&self) -> Option<&Type> {
        match &self.kind {
            ValueKind::Type(t) => Some(t),
            _ => None,
        }
    }

    /// Prints this value in the canonical surface syntax.
    ///
    /// Compounds keyed [`ROOT_KEY`] print their children without enclosing
    /// braces; all other containers open on the key line and close on their
    /// own line, children indented by two spaces.
    pub fn print<W: Write>(&self, out: &mut W, indent: usize) -> io::Result<()> {
        match &self.kind {
            ValueKind::String(s) => {
                self.print_key(out, indent)?;
                writeln!(out, "\"{}\"", escape(s))
            }
            ValueKind::Number(n) => {
                self.print_key(out, indent)?;
                writeln!(out, "{n}")
            }
            ValueKind::List(list) => {
                self.print_key(out, indent)?;
                writeln!(out, "[")?;
                for item in list.items() {
                    item.print(out, indent + 2)?;
                }
                writeln!(out, "{:indent$}]", "")
            }
            ValueKind::Compound(compound) => {
                if self.key == ROOT_KEY {
                    for entry in compound.entries() {
                        entry.print(out, indent)?;
                    }
                    Ok(())
                } else {
                    self.print_key(out, indent)?;
                    writeln!(out, "{{")?;
                    for entry in compound.entries() {
                        entry.print(out, indent + 2)?;
                    }
                    writeln!(out, "{:indent$}}}", "")
                }
            }
            ValueKind::Function(func) => {
                self.print_key(out, indent)?;
                let mut args = String::new();
                for (i, param) in func.params.iter().enumerate() {
                    if i > 0 {
                        args.push(' ');
                    }
                    args.push_str(&param.name);
                    args.push_str(": ");
                    args.push_str(&param.ty.to_string());
                }
                if args.len() > FUNC_PRINT_LIMIT {
                    args = "...".to_string();
                }
                writeln!(out, "func({args})")
            }
            ValueKind::Type(ty) => {
                self.print_key(out, indent)?;
                writeln!(out, "type {ty}")
            }
        }
    }

    fn print_key<W: Write>(&self, out: &mut W, indent: usize) -> io::Result<()> {
        write!(out, "{:indent$}", "")?;
        if !self.key.is_empty() {
            write!(out, "{}: ", self.key)?;
        }
        Ok(())
    }
}

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\0' => out.push_str("\\0"),
            other => out.push(other),
        }
    }
    out
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut buf = Vec::new();
        self.print(&mut buf, 0).map_err(|_| fmt::Error)?;
        f.write_str(&String::from_utf8_lossy(&buf))
    }
}

/// Values compare structurally; the keys of the compared values themselves
/// are ignored (compound membership is what keys are compared through).
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
    }
}

impl ValueKind {
    /// The discriminant of this payload.
    pub fn tag(&self) -> Kind {
        match self {
            ValueKind::String(_) => Kind::String,
            ValueKind::Number(_) => Kind::Number,
            ValueKind::List(_) => Kind::List,
            ValueKind::Compound(_) => Kind::Compound,
            ValueKind::Function(_) => Kind::Function,
            ValueKind::Type(_) => Kind::Type,
        }
    }
}

impl PartialEq for ValueKind {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (ValueKind::String(a), ValueKind::String(b)) => a == b,
            (ValueKind::Number(a), ValueKind::Number(b)) => a == b,
            (ValueKind::List(a), ValueKind::List(b)) => {
                a.elem_kind() == b.elem_kind() && a.items() == b.items()
            }
            (ValueKind::Compound(a), ValueKind::Compound(b)) => {
                a.len() == b.len()
                    && a.entries()
                        .iter()
                        .all(|entry| b.get(&entry.key).is_some_and(|other| other == entry))
            }
            (ValueKind::Function(a), ValueKind::Function(b)) => a == b,
            (ValueKind::Type(a), ValueKind::Type(b)) => a == b,
            _ => false,
        }
    }
}

/// A homogeneous ordered sequence tagged with its element kind.
///
/// The tag is [`Kind::Invalid`] exactly while the list is empty; the first
/// add fixes it and mismatching adds are rejected.
#[derive(Debug, Clone, Default)]
pub struct ListValue {
    elem: Option<Kind>,
    items: Vec<Value>,
}

/// The rejected add or merge: expected element kind vs. offered kind.
pub type KindMismatch = (Kind, Kind);

impl ListValue {
    /// Creates an empty list with an [`Kind::Invalid`] tag.
    pub fn new() -> Self {
        Self::default()
    }

    /// The element kind tag.
    pub fn elem_kind(&self) -> Kind {
        self.elem.unwrap_or(Kind::Invalid)
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// True when the list holds no elements.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// The elements.
    pub fn items(&self) -> &[Value] {
        &self.items
    }

    /// The element at `index`.
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.items.get(index)
    }

    /// Appends a value, fixing the tag on the first add.
    ///
    /// # Errors
    ///
    /// Returns the `(expected, got)` pair when the value's kind does not
    /// match the established tag.
    pub fn add(&mut self, value: Value) -> Result<(), KindMismatch> {
        let kind = value.kind_tag();
        match self.elem {
            None => self.elem = Some(kind),
            Some(elem) if elem != kind => return Err((elem, kind)),
            Some(_) => {}
        }
        self.items.push(value);
        Ok(())
    }

    /// Replaces the element at `index`, keeping the tag.
    pub fn set(&mut self, index: usize, value: Value) -> Result<(), KindMismatch> {
        let kind = value.kind_tag();
        let elem = self.elem_kind();
        if elem != kind {
            return Err((elem, kind));
        }
        if let Some(slot) = self.items.get_mut(index) {
            *slot = value;
        }
        Ok(())
    }

    /// Removes and returns the element at `index`.
    pub fn remove(&mut self, index: usize) -> Option<Value> {
        if index < self.items.len() {
            Some(self.items.remove(index))
        } else {
            None
        }
    }

    /// Drops all elements and resets the tag to [`Kind::Invalid`].
    pub fn clear(&mut self) {
        self.items.clear();
        self.elem = None;
    }

    /// Appends all of `other`'s elements.
    ///
    /// # Errors
    ///
    /// Returns the `(expected, got)` pair when both lists are non-empty and
    /// their tags differ.
    pub fn merge(&mut self, other: ListValue) -> Result<(), KindMismatch> {
        let Some(other_elem) = other.elem else {
            return Ok(());
        };
        match self.elem {
            None => self.elem = Some(other_elem),
            Some(elem) if elem != other_elem => return Err((elem, other_elem)),
            Some(_) => {}
        }
        self.items.extend(other.items);
        Ok(())
    }

    /// Consumes the list, yielding its elements.
    pub fn into_items(self) -> Vec<Value> {
        self.items
    }
}

/// An insertion-ordered mapping from unique non-empty keys to values.
#[derive(Debug, Clone, Default)]
pub struct CompoundValue {
    entries: Vec<Value>,
}

impl CompoundValue {
    /// Creates an empty compound.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when the compound holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The entries in insertion order.
    pub fn entries(&self) -> &[Value] {
        &self.entries
    }

    /// True when an entry with `key` exists.
    pub fn has_member(&self, key: &str) -> bool {
        self.entries.iter().any(|e| e.key == key)
    }

    /// The entry at `key`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.iter().find(|e| e.key == key)
    }

    /// The entry at a dotted path.
    ///
    /// Every segment but the last descends into a compound child; the last
    /// is a direct lookup. A missing or non-compound intermediate yields
    /// `None`.
    pub fn get_by_path(&self, path: &str) -> Option<&Value> {
        let parts: Vec<&str> = path.split('.').collect();
        let (last, init) = parts.split_last()?;
        let mut current = self;
        for segment in init {
            if segment.is_empty() {
                continue;
            }
            match current.get(segment) {
                Some(Value {
                    kind: ValueKind::Compound(child),
                    ..
                }) => current = child,
                _ => return None,
            }
        }
        current.get(last)
    }

    /// The string at `key`, if present and a string.
    pub fn get_string(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_string)
    }

    /// The string at `key`, or `default` when absent or not a string.
    pub fn get_string_or(&self, key: &str, default: &str) -> String {
        self.get_string(key).unwrap_or(default).to_string()
    }

    /// The number at `key`, if present and a number.
    pub fn get_number(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(Value::as_number)
    }

    /// The list at `key`, if present and a list.
    pub fn get_list(&self, key: &str) -> Option<&ListValue> {
        self.get(key).and_then(Value::as_list)
    }

    /// The compound at `key`, if present and a compound.
    pub fn get_compound(&self, key: &str) -> Option<&CompoundValue> {
        self.get(key).and_then(Value::as_compound)
    }

    /// Adds an entry, replacing any existing entry with the same key in
    /// place (position preserved).
    pub fn add(&mut self, value: Value) {
        if let Some(slot) = self.entries.iter_mut().find(|e| e.key == value.key) {
            *slot = value;
        } else {
            self.entries.push(value);
        }
    }

    /// Removes and returns the entry at `key`.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        let index = self.entries.iter().position(|e| e.key == key)?;
        Some(self.entries.remove(index))
    }

    /// Adds every entry of `other`, replacing on key conflict.
    ///
    /// Returns the number of entries considered.
    pub fn merge(&mut self, other: CompoundValue) -> usize {
        let count = other.entries.len();
        for entry in other.entries {
            self.add(entry);
        }
        count
    }
}

/// The body of a function value.
#[derive(Debug, Clone)]
pub enum FunctionBody {
    /// A declared function: the body token slice, evaluated on call
    Tokens(Rc<Vec<Token>>),
    /// A native function: a host callback, identified by its registry name
    Native {
        /// Registry name, used for printing and equality
        name: &'static str,
        /// The host callback
        handler: crate::natives::NativeFn,
    },
}

/// A callable value.
#[derive(Debug, Clone)]
pub struct FunctionValue {
    /// Ordered parameter specification
    pub params: Vec<Field>,
    /// The body
    pub body: FunctionBody,
    /// Whether the first parameter may be bound from the parent of a dotted
    /// call path
    pub dot_callable: bool,
    /// Scope stack captured at the definition site (declared functions)
    pub captured: Option<ScopeStack>,
}

impl FunctionValue {
    /// A declared function over a token body capturing `scope`.
    pub fn declared(params: Vec<Field>, body: Vec<Token>, scope: ScopeStack) -> Self {
        FunctionValue {
            params,
            body: FunctionBody::Tokens(Rc::new(body)),
            dot_callable: true,
            captured: Some(scope),
        }
    }

    /// A native function backed by a host callback.
    pub fn native(
        name: &'static str,
        params: Vec<Field>,
        handler: crate::natives::NativeFn,
    ) -> Self {
        FunctionValue {
            params,
            body: FunctionBody::Native { name, handler },
            dot_callable: false,
            captured: None,
        }
    }

    /// Looks up a parameter by name.
    pub fn param(&self, name: &str) -> Option<&Field> {
        self.params.iter().find(|p| p.name == name)
    }
}

/// Functions compare by parameter specification and body identity; the
/// captured scope does not participate.
impl PartialEq for FunctionValue {
    fn eq(&self, other: &Self) -> bool {
        if self.params != other.params {
            return false;
        }
        match (&self.body, &other.body) {
            (FunctionBody::Tokens(a), FunctionBody::Tokens(b)) => a == b,
            (FunctionBody::Native { name: a, .. }, FunctionBody::Native { name: b, .. }) => a == b,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Type;

    fn keyed_number(key: &str, n: f64) -> Value {
        Value::number(n).with_key(key)
    }

    #[test]
    fn list_first_add_fixes_tag() {
        let mut list = ListValue::new();
        assert_eq!(list.elem_kind(), Kind::Invalid);
        list.add(Value::number(1.0)).unwrap();
        assert_eq!(list.elem_kind(), Kind::Number);
        let err = list.add(Value::string("x")).unwrap_err();
        assert_eq!(err, (Kind::Number, Kind::String));
    }

    #[test]
    fn list_clear_resets_tag() {
        let mut list = ListValue::new();
        list.add(Value::number(1.0)).unwrap();
        list.clear();
        assert_eq!(list.elem_kind(), Kind::Invalid);
        list.add(Value::string("x")).unwrap();
        assert_eq!(list.elem_kind(), Kind::String);
    }

    #[test]
    fn list_merge_checks_tags() {
        let mut a = ListValue::new();
        a.add(Value::number(1.0)).unwrap();
        let mut b = ListValue::new();
        b.add(Value::number(2.0)).unwrap();
        a.merge(b).unwrap();
        assert_eq!(a.len(), 2);

        let mut c = ListValue::new();
        c.add(Value::string("x")).unwrap();
        assert!(a.merge(c).is_err());
    }

    #[test]
    fn compound_add_replaces_in_place() {
        let mut compound = CompoundValue::new();
        compound.add(keyed_number("a", 1.0));
        compound.add(keyed_number("b", 2.0));
        compound.add(keyed_number("a", 3.0));
        assert_eq!(compound.len(), 2);
        assert_eq!(compound.entries()[0].as_number(), Some(3.0));
        assert_eq!(compound.entries()[0].key, "a");
    }

    #[test]
    fn compound_merge_replaces_on_conflict() {
        let mut a = CompoundValue::new();
        a.add(keyed_number("x", 1.0));
        let mut b = CompoundValue::new();
        b.add(keyed_number("x", 9.0));
        b.add(keyed_number("y", 2.0));
        assert_eq!(a.merge(b), 2);
        assert_eq!(a.get_number("x"), Some(9.0));
        assert_eq!(a.get_number("y"), Some(2.0));
    }

    #[test]
    fn typed_accessors_and_defaults() {
        let mut compound = CompoundValue::new();
        compound.add(Value::string("gateway").with_key("name"));
        compound.add(keyed_number("port", 80.0));
        assert_eq!(compound.get_string("name"), Some("gateway"));
        assert_eq!(compound.get_string_or("name", "fallback"), "gateway");
        assert_eq!(compound.get_string_or("missing", "fallback"), "fallback");
        assert_eq!(compound.get_string_or("port", "fallback"), "fallback");
        assert!(compound.get_list("name").is_none());
    }

    #[test]
    fn remove_drops_the_entry() {
        let mut compound = CompoundValue::new();
        compound.add(keyed_number("a", 1.0));
        compound.add(keyed_number("b", 2.0));
        let removed = compound.remove("a").unwrap();
        assert_eq!(removed.as_number(), Some(1.0));
        assert!(compound.get("a").is_none());
        assert!(compound.remove("a").is_none());
        assert_eq!(compound.len(), 1);
    }

    #[test]
    fn get_by_path_descends_compounds() {
        let mut inner = CompoundValue::new();
        inner.add(keyed_number("port", 8080.0));
        let mut outer = CompoundValue::new();
        outer.add(Value {
            key: "server".to_string(),
            kind: ValueKind::Compound(inner),
        });

        assert_eq!(
            outer.get_by_path("server.port").and_then(Value::as_number),
            Some(8080.0)
        );
        assert!(outer.get_by_path("server.host").is_none());
        assert!(outer.get_by_path("missing.port").is_none());
    }

    #[test]
    fn get_by_path_rejects_non_compound_intermediate() {
        let mut outer = CompoundValue::new();
        outer.add(Value::string("flat").with_key("name"));
        assert!(outer.get_by_path("name.anything").is_none());
    }

    #[test]
    fn compound_equality_is_unordered() {
        let mut a = CompoundValue::new();
        a.add(keyed_number("x", 1.0));
        a.add(keyed_number("y", 2.0));
        let mut b = CompoundValue::new();
        b.add(keyed_number("y", 2.0));
        b.add(keyed_number("x", 1.0));
        assert_eq!(
            Value {
                key: String::new(),
                kind: ValueKind::Compound(a)
            },
            Value {
                key: String::new(),
                kind: ValueKind::Compound(b)
            }
        );
    }

    #[test]
    fn value_equality_ignores_own_key() {
        assert_eq!(keyed_number("a", 1.0), keyed_number("b", 1.0));
        assert_ne!(Value::number(1.0), Value::string("1"));
    }

    #[test]
    fn clone_is_independent() {
        let mut list = ListValue::new();
        list.add(Value::number(1.0)).unwrap();
        let original = Value {
            key: "xs".to_string(),
            kind: ValueKind::List(list),
        };
        let mut copy = original.clone();
        if let ValueKind::List(l) = &mut copy.kind {
            l.add(Value::number(2.0)).unwrap();
        }
        assert_eq!(original.as_list().unwrap().len(), 1);
        assert_eq!(copy.as_list().unwrap().len(), 2);
    }

    #[test]
    fn print_scalars() {
        assert_eq!(Value::number(1.5).with_key("n").to_string(), "n: 1.5\n");
        assert_eq!(Value::number(1.0).to_string(), "1\n");
        assert_eq!(
            Value::string("hi").with_key("s").to_string(),
            "s: \"hi\"\n"
        );
    }

    #[test]
    fn print_escapes_strings() {
        assert_eq!(
            Value::string("a\"b\nc").to_string(),
            "\"a\\\"b\\nc\"\n"
        );
    }

    #[test]
    fn print_nested_containers() {
        let mut inner = CompoundValue::new();
        inner.add(keyed_number("x", 1.0));
        let mut list = ListValue::new();
        list.add(Value::number(1.0)).unwrap();
        list.add(Value::number(2.0)).unwrap();
        let mut root = CompoundValue::new();
        root.add(Value {
            key: "point".to_string(),
            kind: ValueKind::Compound(inner),
        });
        root.add(Value {
            key: "xs".to_string(),
            kind: ValueKind::List(list),
        });
        let value = Value {
            key: ROOT_KEY.to_string(),
            kind: ValueKind::Compound(root),
        };
        assert_eq!(
            value.to_string(),
            "point: {\n  x: 1\n}\nxs: [\n  1\n  2\n]\n"
        );
    }

    #[test]
    fn print_function_truncates_long_signatures() {
        let func = FunctionValue::declared(
            vec![
                Field::new("first", Type::number()),
                Field::new("second", Type::string()),
            ],
            Vec::new(),
            ScopeStack::new(),
        );
        let value = Value {
            key: "f".to_string(),
            kind: ValueKind::Function(func),
        };
        assert_eq!(value.to_string(), "f: func(...)\n");

        let short = FunctionValue::declared(
            vec![Field::new("n", Type::number())],
            Vec::new(),
            ScopeStack::new(),
        );
        let value = Value {
            key: "g".to_string(),
            kind: ValueKind::Function(short),
        };
        assert_eq!(value.to_string(), "g: func(n: number)\n");
    }

    #[test]
    fn function_equality_compares_params_and_body() {
        let a = FunctionValue::declared(
            vec![Field::new("n", Type::number())],
            Vec::new(),
            ScopeStack::new(),
        );
        let b = FunctionValue::declared(
            vec![Field::new("n", Type::number())],
            Vec::new(),
            ScopeStack::new(),
        );
        let c = FunctionValue::declared(
            vec![Field::new("s", Type::string())],
            Vec::new(),
            ScopeStack::new(),
        );
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
