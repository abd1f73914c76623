//! Units (§2 AST & Type System, "Unit"), the central construct a BinPAC++ module exports:
//! a sequence of fields, local variables, and properties that together describe both a
//! type and a parser for it.

use crate::ast::attribute::AttributeSet;
use crate::ast::ctor::Ctor;
use crate::ast::expr::{Expr, ExprKind};
use crate::ast::stmt::Block;
use crate::ast::types::Type;
use crate::id::Id;
use crate::util::Position;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookKind {
    /// `on %init`.
    Init,
    /// `on %done`.
    Done,
    /// `on %error`.
    Error,
    /// `on <field>`, run after the field has parsed.
    Field,
}

#[derive(Debug, Clone)]
pub struct Hook {
    pub kind: HookKind,
    /// Set when `kind == HookKind::Field`.
    pub field: Option<Id>,
    pub priority: i32,
    pub body: Block,
}

/// One alternative of a `switch` field (§4.2 grammar translation, `NonTerminal::Switch`).
#[derive(Debug, Clone)]
pub struct SwitchCase {
    /// `None` marks the `*` default case.
    pub values: Option<Vec<Expr>>,
    pub fields: Vec<UnitField>,
}

#[derive(Debug, Clone)]
pub enum FieldKind {
    /// An ordinary `name: Type` field.
    Atomic { name: Id, ty: Type },
    /// `name: Type[n]` / `name: Type[] &until(...)`, parsed element-by-element.
    Vector { name: Id, element: Type, count: Option<Expr> },
    /// `name: switch (expr) { ... }`.
    Switch { name: Option<Id>, scrutinee: Expr, cases: Vec<SwitchCase> },
    /// An anonymous field (`: Type &match=...;`) — still parses `ty`'s production (most
    /// often a literal match) but binds no name, so nothing is stored.
    Void { ty: Type },
    /// A nested, unnamed sequence of fields sharing one set of attributes (parenthesized
    /// field group).
    List(Vec<UnitField>),
}

#[derive(Debug, Clone)]
pub struct UnitField {
    pub kind: FieldKind,
    pub attributes: AttributeSet,
    pub hooks: Vec<Hook>,
    pub condition: Option<Expr>,
    pub at: Position,
}

impl UnitField {
    pub fn name(&self) -> Option<&Id> {
        match &self.kind {
            FieldKind::Atomic { name, .. } | FieldKind::Vector { name, .. } => Some(name),
            FieldKind::Switch { name, .. } => name.as_ref(),
            FieldKind::Void { .. } | FieldKind::List(_) => None,
        }
    }

    /// §3/§9: whether this field requests resynchronization at all — bare `&synchronize` or
    /// `&synchronize=<anything>`. Prefer [Self::synchronize_state] when the distinction
    /// between opting in and opting out matters (e.g. conflict detection against the
    /// enclosing unit's own setting).
    pub fn requests_synchronize(&self) -> bool {
        self.attributes.has("synchronize")
    }

    /// §3/§9: this field's explicit `&synchronize[=bool]` setting, or `None` if it never
    /// mentions `&synchronize` at all. A bare `&synchronize` (no value) means "opt in"
    /// (`Some(true)`); `&synchronize=False` means "opt out" (`Some(false)`) — the form that
    /// lets a field disagree with a unit that opted in everywhere else.
    pub fn synchronize_state(&self) -> Option<bool> {
        synchronize_state(&self.attributes)
    }
}

/// `name: Type(args)` or a bare local variable declared with `var`.
#[derive(Debug, Clone)]
pub struct UnitVariable {
    pub name: Id,
    pub ty: Type,
    pub default: Option<Expr>,
}

#[derive(Debug, Clone)]
pub struct UnitParameter {
    pub name: Id,
    pub ty: Type,
}

#[derive(Debug, Clone)]
pub struct Unit {
    pub id: Id,
    pub parameters: Vec<UnitParameter>,
    pub variables: Vec<UnitVariable>,
    pub fields: Vec<UnitField>,
    pub properties: AttributeSet,
    pub hooks: Vec<Hook>,
    pub at: Position,
}

impl Unit {
    /// §3/§9: does this unit itself (as opposed to one of its fields) request
    /// resynchronization on parse failure.
    pub fn requests_synchronize(&self) -> bool {
        self.properties.has("synchronize")
    }

    /// §3/§9: this unit's explicit `%synchronize[=bool]` setting — see
    /// [UnitField::synchronize_state] for the opt-in/opt-out convention.
    pub fn synchronize_state(&self) -> Option<bool> {
        synchronize_state(&self.properties)
    }

    pub fn field_named(&self, name: &Id) -> Option<&UnitField> {
        self.fields.iter().find(|f| f.name() == Some(name))
    }
}

/// Reads a `synchronize` key's explicit boolean value out of an attribute/property set, per
/// [UnitField::synchronize_state]'s opt-in/opt-out convention. `None` means the key was never
/// set at all; a bare key or a non-boolean value both default to "opt in".
fn synchronize_state(attrs: &AttributeSet) -> Option<bool> {
    let attr = attrs.get("synchronize")?;
    match attr.value.as_ref().map(|e| &e.kind) {
        Some(ExprKind::Literal(Ctor::Bool(b))) => Some(*b),
        _ => Some(true),
    }
}
