//! Structural types and validation.
//!
//! A [`Type`] is an optional-flag plus a shape: `any`, `string`, `number`,
//! `list[elem]`, `compound { field: type … }`, or a function signature.
//! Types are immutable after construction and compare structurally (the
//! optional flag does not participate in equality).
//!
//! Validation walks a value against a type and pushes localized messages to
//! a sink; inside a compound it keeps going after a failure so that every
//! broken field is reported before the parse aborts.

use std::fmt;

use crate::value::{Kind, Value, ValueKind};

/// A named, typed slot: a compound field or a function parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    /// Field or parameter name
    pub name: String,
    /// Expected type
    pub ty: Type,
}

impl Field {
    /// Creates a field.
    pub fn new(name: impl Into<String>, ty: Type) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

/// A structural type descriptor.
#[derive(Debug, Clone)]
pub struct Type {
    /// Whether a compound field of this type may be absent
    pub optional: bool,
    /// The shape
    pub shape: TypeShape,
}

/// The shape of a [`Type`].
#[derive(Debug, Clone, PartialEq)]
pub enum TypeShape {
    /// Accepts any value
    Any,
    /// Accepts strings
    String,
    /// Accepts numbers
    Number,
    /// Accepts lists whose elements match the inner type
    List(Box<Type>),
    /// Accepts compounds providing the expected fields
    Compound(Vec<Field>),
    /// Accepts functions with a structurally equal parameter specification
    Function(Vec<Field>),
}

/// Flags threaded through a validation pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidateFlags {
    /// Treat every expected compound field as optional
    pub optional: bool,
}

impl Type {
    /// The `any` type.
    pub fn any() -> Self {
        Type {
            optional: false,
            shape: TypeShape::Any,
        }
    }

    /// The `string` type.
    pub fn string() -> Self {
        Type {
            optional: false,
            shape: TypeShape::String,
        }
    }

    /// The `number` type.
    pub fn number() -> Self {
        Type {
            optional: false,
            shape: TypeShape::Number,
        }
    }

    /// A list type over `elem`.
    pub fn list(elem: Type) -> Self {
        Type {
            optional: false,
            shape: TypeShape::List(Box::new(elem)),
        }
    }

    /// A compound type expecting `fields`.
    pub fn compound(fields: Vec<Field>) -> Self {
        Type {
            optional: false,
            shape: TypeShape::Compound(fields),
        }
    }

    /// A function type with the given parameter specification.
    pub fn function(params: Vec<Field>) -> Self {
        Type {
            optional: false,
            shape: TypeShape::Function(params),
        }
    }

    /// A clone of `ty` with the optional flag set.
    pub fn optional(ty: Type) -> Self {
        Type {
            optional: true,
            shape: ty.shape,
        }
    }

    /// The kind of value this shape accepts.
    pub fn kind(&self) -> Kind {
        match &self.shape {
            TypeShape::Any => Kind::Any,
            TypeShape::String => Kind::String,
            TypeShape::Number => Kind::Number,
            TypeShape::List(_) => Kind::List,
            TypeShape::Compound(_) => Kind::Compound,
            TypeShape::Function(_) => Kind::Function,
        }
    }

    /// Validates `value` against this type.
    ///
    /// Failure messages are pushed onto `sink`; the return value is `true`
    /// iff no failure was recorded for this value.
    pub fn validate(&self, value: &Value, flags: ValidateFlags, sink: &mut Vec<String>) -> bool {
        if matches!(self.shape, TypeShape::Any) {
            return true;
        }

        let expected = self.kind();
        let got = value.kind_tag();
        if got != expected {
            sink.push(format!(
                "invalid entry type: expected {expected} but got {got}"
            ));
            return false;
        }

        match (&self.shape, &value.kind) {
            (TypeShape::List(elem), ValueKind::List(list)) => {
                if list.is_empty() {
                    return true;
                }
                // homogeneity makes checking the head sufficient
                let head = &list.items()[0];
                if !elem.validate(head, flags, sink) {
                    sink.push(format!(
                        "invalid entry type in list '{}': expected {} but got {}",
                        value.key,
                        elem.kind(),
                        list.elem_kind()
                    ));
                    return false;
                }
                true
            }
            (TypeShape::Compound(fields), ValueKind::Compound(compound)) => {
                let mut ok = true;
                for field in fields {
                    match compound.get(&field.name) {
                        None => {
                            if flags.optional || field.ty.optional {
                                continue;
                            }
                            sink.push(format!(
                                "missing property '{}' in compound '{}'",
                                field.name, value.key
                            ));
                            ok = false;
                        }
                        Some(member) => {
                            if !field.ty.validate(member, flags, sink) {
                                sink.push(format!(
                                    "member '{}' of compound '{}' is type {} but expected {}",
                                    field.name,
                                    value.key,
                                    member.kind_tag(),
                                    field.ty.kind()
                                ));
                                ok = false;
                            }
                        }
                    }
                }
                ok
            }
            (TypeShape::Function(params), ValueKind::Function(func)) => {
                if func.params != *params {
                    sink.push(format!(
                        "function '{}' does not match the expected signature",
                        value.key
                    ));
                    return false;
                }
                true
            }
            _ => true,
        }
    }
}

/// Structural equality; the optional flag does not participate.
impl PartialEq for Type {
    fn eq(&self, other: &Self) -> bool {
        self.shape == other.shape
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.optional {
            write!(f, "optional ")?;
        }
        match &self.shape {
            TypeShape::Any => write!(f, "any"),
            TypeShape::String => write!(f, "string"),
            TypeShape::Number => write!(f, "number"),
            TypeShape::List(elem) => write!(f, "list[{elem}]"),
            TypeShape::Compound(fields) => {
                write!(f, "compound {{")?;
                for (i, field) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", field.name, field.ty)?;
                }
                write!(f, "}}")
            }
            TypeShape::Function(params) => {
                write!(f, "func(")?;
                for (i, param) in params.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", param.name, param.ty)?;
                }
                write!(f, ")")
            }
        }
    }
}
