//! Literal constructors (§2 AST & Type System, "Ctor").
//!
//! A `Ctor` is a literal value spelled out in source — `42`, `b"GET"`, `/[a-z]+/`, an enum
//! label — as opposed to the result of evaluating an expression. Grammar productions quote
//! these directly as terminals (§4.2), so each variant also carries the rendered text the
//! token interner keys on.

use crate::ast::types::Type;

#[derive(Debug, Clone, PartialEq)]
pub enum Ctor {
    Bool(bool),
    Integer(i64),
    Double(f64),
    Bytes(Vec<u8>),
    String(String),
    Regexp(String),
    EnumLabel { ty: Type, label: String },
}

impl Ctor {
    /// Text a generated scanner would match literally against the input, used as half of
    /// the token-interner key (§1.2).
    pub fn terminal_render(&self) -> String {
        match self {
            Ctor::Bool(b) => b.to_string(),
            Ctor::Integer(n) => n.to_string(),
            Ctor::Double(d) => d.to_string(),
            Ctor::Bytes(bytes) => String::from_utf8_lossy(bytes).into_owned(),
            Ctor::String(s) => s.clone(),
            Ctor::Regexp(pattern) => pattern.clone(),
            Ctor::EnumLabel { label, .. } => label.clone(),
        }
    }

    pub fn ty(&self) -> Type {
        match self {
            Ctor::Bool(_) => Type::Bool,
            Ctor::Integer(_) => Type::Integer { width: 64, signed: true },
            Ctor::Double(_) => Type::Double,
            Ctor::Bytes(_) => Type::Bytes,
            Ctor::String(_) => Type::String,
            Ctor::Regexp(_) => Type::Bytes,
            Ctor::EnumLabel { ty, .. } => ty.clone(),
        }
    }

    pub fn is_regexp(&self) -> bool {
        matches!(self, Ctor::Regexp(_))
    }
}
