//! Error types produced by the compile-time passes (§7 "Realized as Rust types").
//!
//! These mirror [pcomb]'s own closed, `Display`-impl'd `ParseError` rather than reaching
//! for `thiserror` — a style kept consistent across both crates in this workspace.

use std::fmt;

use crate::id::Id;
use crate::util::Position;

/// Every error the compiler can report while turning source text into a [crate::CompiledModule].
#[derive(Debug, Clone)]
pub enum CompileError {
    Parse(ParseError),
    Scope(ScopeError),
    Type(TypeError),
    Grammar(GrammarError),
    Attribute(AttributeError),
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompileError::Parse(e) => write!(f, "{e}"),
            CompileError::Scope(e) => write!(f, "{e}"),
            CompileError::Type(e) => write!(f, "{e}"),
            CompileError::Grammar(e) => write!(f, "{e}"),
            CompileError::Attribute(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for CompileError {}

impl From<ParseError> for CompileError {
    fn from(value: ParseError) -> Self {
        CompileError::Parse(value)
    }
}

impl From<ScopeError> for CompileError {
    fn from(value: ScopeError) -> Self {
        CompileError::Scope(value)
    }
}

impl From<TypeError> for CompileError {
    fn from(value: TypeError) -> Self {
        CompileError::Type(value)
    }
}

impl From<GrammarError> for CompileError {
    fn from(value: GrammarError) -> Self {
        CompileError::Grammar(value)
    }
}

impl From<AttributeError> for CompileError {
    fn from(value: AttributeError) -> Self {
        CompileError::Attribute(value)
    }
}

/// Failures produced while lexing/parsing BinPAC++ source into a concrete syntax tree.
#[derive(Debug, Clone)]
pub enum ParseError {
    /// The front end's [pcomb] tokenizer or production graph rejected the input.
    Syntax { at: Position, message: String },
    /// A suffix of the source was left unconsumed after a top-level parse.
    TrailingInput { at: Position },
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::Syntax { at, message } => write!(f, "{at}: syntax error: {message}"),
            ParseError::TrailingInput { at } => write!(f, "{at}: unexpected trailing input"),
        }
    }
}

/// Failures produced while building and resolving scopes (§3 Scope & Resolver).
#[derive(Debug, Clone)]
pub enum ScopeError {
    Unresolved { id: Id, at: Position },
    Redeclared { id: Id, first: Position, second: Position },
    AmbiguousOperator { op: String, at: Position },
    NoMatchingOperator { op: String, at: Position },
    /// A field's explicit `&synchronize` setting disagrees with its enclosing unit's explicit
    /// `%synchronize` setting (one opts in, the other opts out); §9 Open Question resolved as
    /// a hard error rather than silently picking a precedence.
    SynchronizeConflict { field: Id, unit: Id },
    CyclicImport { cycle: Vec<Id> },
}

impl fmt::Display for ScopeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScopeError::Unresolved { id, at } => write!(f, "{at}: unresolved identifier `{id}`"),
            ScopeError::Redeclared { id, first, second } => {
                write!(f, "{second}: `{id}` redeclared (first declared at {first})")
            }
            ScopeError::AmbiguousOperator { op, at } => {
                write!(f, "{at}: ambiguous operator candidates for `{op}`")
            }
            ScopeError::NoMatchingOperator { op, at } => {
                write!(f, "{at}: no operator overload matches `{op}`")
            }
            ScopeError::SynchronizeConflict { field, unit } => write!(
                f,
                "field `{field}` disagrees with its unit `{unit}` on &synchronize; make them agree or leave one unset"
            ),
            ScopeError::CyclicImport { cycle } => {
                let path = cycle.iter().map(Id::to_string).collect::<Vec<_>>().join(" -> ");
                write!(f, "cyclic import: {path}")
            }
        }
    }
}

/// Failures produced while checking and coercing types (§5 Coercion/Operator resolution).
#[derive(Debug, Clone)]
pub enum TypeError {
    Mismatch { expected: String, found: String, at: Position },
    NoCoercion { from: String, to: String, at: Position },
    NotIterable { found: String, at: Position },
    NotParseable { found: String, at: Position },
    /// `bytes.at_object` used in a position without a runtime `Sink` context; §9 Open Question
    /// resolved by treating the typed form as authoritative and rejecting the untyped use.
    UntypedEmbeddedObject { at: Position },
}

impl fmt::Display for TypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeError::Mismatch { expected, found, at } => {
                write!(f, "{at}: expected type `{expected}`, found `{found}`")
            }
            TypeError::NoCoercion { from, to, at } => {
                write!(f, "{at}: no coercion from `{from}` to `{to}`")
            }
            TypeError::NotIterable { found, at } => {
                write!(f, "{at}: type `{found}` is not iterable")
            }
            TypeError::NotParseable { found, at } => {
                write!(f, "{at}: type `{found}` cannot appear as a unit field")
            }
            TypeError::UntypedEmbeddedObject { at } => write!(
                f,
                "{at}: `at_object` needs a type argument outside of a &chunked sink context"
            ),
        }
    }
}

/// Failures produced while deriving and analyzing a unit's grammar (§4 Grammar Builder/Analyzer).
#[derive(Debug, Clone)]
pub enum GrammarError {
    /// Two distinct first-set terminals collide under one lookahead decision (LL(1) violation).
    NotLL1 { unit: Id, conflict: String },
    LeftRecursive { unit: Id, path: Vec<Id> },
    UnreachableProduction { unit: Id, symbol: String },
    MissingSynchronizationPoint { unit: Id },
}

impl fmt::Display for GrammarError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GrammarError::NotLL1 { unit, conflict } => {
                write!(f, "unit `{unit}` is not LL(1): {conflict}")
            }
            GrammarError::LeftRecursive { unit, path } => {
                let path = path.iter().map(Id::to_string).collect::<Vec<_>>().join(" -> ");
                write!(f, "unit `{unit}` is left-recursive: {path}")
            }
            GrammarError::UnreachableProduction { unit, symbol } => {
                write!(f, "unit `{unit}`: production `{symbol}` is unreachable")
            }
            GrammarError::MissingSynchronizationPoint { unit } => {
                write!(f, "unit `{unit}` requires &synchronize but declares none")
            }
        }
    }
}

/// Failures produced while validating attribute usage (§3 Attributes).
#[derive(Debug, Clone)]
pub enum AttributeError {
    Unknown { name: String, at: Position },
    Misplaced { name: String, context: String, at: Position },
    MissingValue { name: String, at: Position },
}

impl fmt::Display for AttributeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeError::Unknown { name, at } => write!(f, "{at}: unknown attribute `&{name}`"),
            AttributeError::Misplaced { name, context, at } => {
                write!(f, "{at}: attribute `&{name}` cannot appear on {context}")
            }
            AttributeError::MissingValue { name, at } => {
                write!(f, "{at}: attribute `&{name}` requires a value")
            }
        }
    }
}

/// Failures that occur while a generated parser is actually running over bytes (§6 runtime).
#[derive(Debug, Clone)]
pub enum RuntimeError {
    Parse { unit: Id, message: String },
    Synchronization { unit: Id },
    Filter { name: String, message: String },
    FilterUnsupported { name: String },
    OutOfMemory,
    Type { message: String },
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeError::Parse { unit, message } => write!(f, "{unit}: {message}"),
            RuntimeError::Synchronization { unit } => {
                write!(f, "{unit}: failed to resynchronize")
            }
            RuntimeError::Filter { name, message } => write!(f, "filter `{name}`: {message}"),
            RuntimeError::FilterUnsupported { name } => {
                write!(f, "filter `{name}` is not registered")
            }
            RuntimeError::OutOfMemory => write!(f, "out of memory"),
            RuntimeError::Type { message } => write!(f, "{message}"),
        }
    }
}

impl std::error::Error for RuntimeError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synchronize_conflict_message_names_both_sites() {
        let err = ScopeError::SynchronizeConflict {
            field: Id::from("len"),
            unit: Id::from("Packet"),
        };
        let message = err.to_string();
        assert!(message.contains("len"));
        assert!(message.contains("Packet"));
    }
}
