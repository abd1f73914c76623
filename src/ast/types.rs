//! The type system (§2 AST & Type System).
//!
//! `Type` is a plain value enum rather than a trait-object graph: BinPAC++ types don't
//! need the self-referential sharing the grammar productions do, so there is no call for
//! `Rc`/`OnceCell` bookkeeping here — equality and the trait queries below are enough.

use std::fmt;

use crate::id::Id;

/// One field of a `tuple` type.
#[derive(Debug, Clone, PartialEq)]
pub struct TupleElement {
    pub name: Option<String>,
    pub ty: Type,
}

/// One label of an `enum` type, with its explicit or auto-assigned ordinal.
#[derive(Debug, Clone, PartialEq)]
pub struct EnumLabel {
    pub name: String,
    pub value: i64,
}

/// One named bitrange of a `bitfield(width) { name: a..b; ... }` type.
#[derive(Debug, Clone, PartialEq)]
pub struct BitfieldBit {
    pub name: String,
    pub low: u8,
    pub high: u8,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Type {
    // --- atomic ---
    Bool,
    Integer { width: u8, signed: bool },
    Double,
    Bytes,
    String,
    Addr,
    Network,
    Port,
    Interval,
    Time,
    Regexp,
    Void,

    // --- composite ---
    Tuple(Vec<TupleElement>),
    Optional(Box<Type>),
    Vector(Box<Type>),
    List(Box<Type>),
    Set(Box<Type>),
    Map { key: Box<Type>, value: Box<Type> },
    Enum(Vec<EnumLabel>),
    Bitfield { width: u8, bits: Vec<BitfieldBit> },
    Bitset(Vec<String>),
    Exception(Option<Box<Type>>),

    // --- parser-specific ---
    Unit(Id),
    Sink,
    EmbeddedObject(Option<Box<Type>>),
    /// A user-placed resynchronization anchor in the byte stream (§4.5 "Mark").
    Mark,

    // --- reference ---
    Ref(Box<Type>),
    /// An iterator positioned over an `Iterable` container.
    Iterator(Box<Type>),

    // --- placeholders, resolved away by the end of the resolver's second phase ---
    Unknown,
    UnknownByName(Id),
    /// The element type of a not-yet-resolved container expression (e.g. `x[0]` before
    /// `x`'s own type is known) — distinct from [Type::Unknown] so the resolver can tell
    /// "nothing known yet" apart from "known to be *some* container's element".
    UnknownElementOf(Box<Type>),
}

impl Type {
    pub fn is_placeholder(&self) -> bool {
        matches!(
            self,
            Type::Unknown | Type::UnknownByName(_) | Type::UnknownElementOf(_)
        )
    }

    /// §2 "Parseable": can this type stand as a unit field, parsing some span of bytes.
    pub fn is_parseable(&self) -> bool {
        matches!(
            self,
            Type::Bool
                | Type::Integer { .. }
                | Type::Double
                | Type::Bytes
                | Type::String
                | Type::Addr
                | Type::Network
                | Type::Port
                | Type::Interval
                | Type::Time
                | Type::Regexp
                | Type::Unit(_)
                | Type::Vector(_)
                | Type::List(_)
                | Type::Bitfield { .. }
                | Type::EmbeddedObject(_)
        )
    }

    /// §2 "Iterable": supports `for` iteration and the `[]` element-access operator.
    pub fn is_iterable(&self) -> bool {
        matches!(
            self,
            Type::Bytes | Type::Vector(_) | Type::List(_) | Type::Set(_) | Type::Map { .. }
        )
    }

    /// §2 "Container": holds element types that the resolver must recurse into.
    pub fn is_container(&self) -> bool {
        matches!(
            self,
            Type::Tuple(_)
                | Type::Optional(_)
                | Type::Vector(_)
                | Type::List(_)
                | Type::Set(_)
                | Type::Map { .. }
                | Type::Ref(_)
                | Type::Iterator(_)
        )
    }

    /// §2 "Hashable": usable as a `set` element or `map` key.
    pub fn is_hashable(&self) -> bool {
        matches!(
            self,
            Type::Bool
                | Type::Integer { .. }
                | Type::Bytes
                | Type::String
                | Type::Addr
                | Type::Port
                | Type::Enum(_)
                | Type::Bitset(_)
        )
    }

    /// §2 "Parameterized": unit types carry a parameter list threaded through at parse time.
    pub fn is_parameterized(&self) -> bool {
        matches!(self, Type::Unit(_))
    }

    /// §2 "Sinkable": can be the declared type of a `sink` field, i.e. is a `sink` itself.
    pub fn is_sinkable(&self) -> bool {
        matches!(self, Type::Sink)
    }

    /// §2 "TypeList": a tuple's element types, or a single-element list for anything else —
    /// used by the operator resolver to line up call-site argument types against overloads.
    pub fn type_list(&self) -> Vec<Type> {
        match self {
            Type::Tuple(elements) => elements.iter().map(|e| e.ty.clone()).collect(),
            other => vec![other.clone()],
        }
    }

    pub fn element_type(&self) -> Option<&Type> {
        match self {
            Type::Optional(t)
            | Type::Vector(t)
            | Type::List(t)
            | Type::Set(t)
            | Type::Ref(t)
            | Type::Iterator(t) => Some(t),
            Type::Map { value, .. } => Some(value),
            _ => None,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Bool => write!(f, "bool"),
            Type::Integer { width, signed } => {
                write!(f, "{}{width}", if *signed { "int" } else { "uint" })
            }
            Type::Double => write!(f, "double"),
            Type::Bytes => write!(f, "bytes"),
            Type::String => write!(f, "string"),
            Type::Addr => write!(f, "addr"),
            Type::Network => write!(f, "network"),
            Type::Port => write!(f, "port"),
            Type::Interval => write!(f, "interval"),
            Type::Time => write!(f, "time"),
            Type::Regexp => write!(f, "regexp"),
            Type::Void => write!(f, "void"),
            Type::Tuple(elements) => {
                write!(f, "tuple<")?;
                for (i, e) in elements.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", e.ty)?;
                }
                write!(f, ">")
            }
            Type::Optional(t) => write!(f, "optional<{t}>"),
            Type::Vector(t) => write!(f, "vector<{t}>"),
            Type::List(t) => write!(f, "list<{t}>"),
            Type::Set(t) => write!(f, "set<{t}>"),
            Type::Map { key, value } => write!(f, "map<{key}, {value}>"),
            Type::Enum(_) => write!(f, "enum"),
            Type::Bitfield { width, .. } => write!(f, "bitfield({width})"),
            Type::Bitset(_) => write!(f, "bitset"),
            Type::Exception(Some(base)) => write!(f, "exception({base})"),
            Type::Exception(None) => write!(f, "exception"),
            Type::Unit(id) => write!(f, "{id}"),
            Type::Sink => write!(f, "sink"),
            Type::EmbeddedObject(Some(t)) => write!(f, "embedded<{t}>"),
            Type::EmbeddedObject(None) => write!(f, "embedded<any>"),
            Type::Mark => write!(f, "mark"),
            Type::Ref(t) => write!(f, "ref<{t}>"),
            Type::Iterator(t) => write!(f, "iterator<{t}>"),
            Type::Unknown => write!(f, "<unknown>"),
            Type::UnknownByName(id) => write!(f, "<unresolved {id}>"),
            Type::UnknownElementOf(t) => write!(f, "<unresolved element of {t}>"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tuple_type_list_flattens_elements() {
        let t = Type::Tuple(vec![
            TupleElement { name: None, ty: Type::Bool },
            TupleElement { name: Some("n".into()), ty: Type::Integer { width: 32, signed: false } },
        ]);
        assert_eq!(t.type_list().len(), 2);
    }

    #[test]
    fn scalar_type_list_is_single_element() {
        assert_eq!(Type::Bool.type_list(), vec![Type::Bool]);
    }

    #[test]
    fn only_unit_types_are_parameterized() {
        assert!(Type::Unit(Id::new("Foo")).is_parameterized());
        assert!(!Type::Bytes.is_parameterized());
    }
}
