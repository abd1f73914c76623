//! Grammar productions (§4.1/§4.2) — the symbols a unit's fields translate into before
//! LL(1) analysis and code generation.
//!
//! Mirrors the shape of [pcomb]'s own production graph (`Concat`/`Union`/terminal fields,
//! each behind an `Rc` so a production can be shared by more than one parent without
//! cloning the subtree) but the symbol set is BinPAC++'s own: literals carry a
//! [crate::token::TokenId], and there is a `ChildGrammar` variant for unit-typed fields that
//! recurses into another unit's grammar rather than just another local symbol.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use once_cell::unsync::OnceCell;

use crate::ast::ctor::Ctor;
use crate::ast::expr::Expr;
use crate::ast::types::Type;
use crate::id::Id;
use crate::token::TokenId;

/// Extra bookkeeping a production needs only while the parser generator is emitting code
/// for it (§4.4 `ParserGenMeta`): which field it came from, the loop/length expressions
/// the builder lowered a `&length`/`&until`/fixed-count field from, and whether it sits
/// inside a `&foreach`/`&until` hook context.
#[derive(Debug, Clone, Default)]
pub struct ParserGenMeta {
    pub field: Option<Id>,
    pub for_each: bool,
    pub until: bool,
    /// `list<T> &until=expr` (§4.2): the loop's termination condition, re-evaluated by
    /// the interpreter after each element.
    pub until_expr: Option<Expr>,
    /// `list<T>[n]` / `list<T> &length=n`: the exact iteration count.
    pub count_expr: Option<Expr>,
    /// `field &length=n` on a scalar field: the exact byte span to consume.
    pub length_expr: Option<Expr>,
}

/// One `case` arm of a `Switch` production: the values it matches (`None` for the
/// catch-all `*` arm), a human-readable label for the hilti renderer, and the body.
pub struct SwitchArm {
    pub values: Option<Vec<Expr>>,
    pub label: Option<String>,
    pub body: Rc<Production>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Symbol(pub String);

impl std::fmt::Display for Symbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One grammar symbol and its right-hand side.
///
/// Nullability and FIRST-set are memoized in `OnceCell`s — the analyzer (§4.3) fills these
/// in once per symbol rather than recomputing on every query.
pub struct Production {
    pub symbol: Symbol,
    pub kind: ProductionKind,
    pub meta: ParserGenMeta,
    nullable: OnceCell<bool>,
    first_set: RefCell<Option<Vec<TokenId>>>,
}

pub enum ProductionKind {
    Epsilon,
    /// A literal terminal — a regexp, a constant byte string, or a bare ctor value.
    Literal { token: TokenId, ctor: Ctor },
    /// A field whose type is atomic (int, bool, addr, ...), consuming a runtime-determined
    /// span of bytes with no further grammar structure of its own.
    Variable { token: TokenId, ty: Type },
    /// `A B C` in sequence.
    Sequence(Vec<Rc<Production>>),
    /// A one-token lookahead dispatch among alternatives, built by the analyzer from a
    /// `switch` field or from disambiguating an optional/vector tail (§4.3).
    LookAhead(Vec<Rc<Production>>),
    /// `switch (expr) { v1 -> A; v2 -> B; * -> C }` keyed on a runtime expression rather
    /// than lookahead.
    Switch { scrutinee: Expr, arms: Vec<SwitchArm> },
    /// A conditional field (`condition: Type field;`, §4.4 "Boolean"): parses `then` when
    /// `cond` evaluates true at runtime, `otherwise` (ordinarily `Epsilon`) when it doesn't.
    Boolean { cond: Expr, then: Rc<Production>, otherwise: Rc<Production> },
    /// `Type[n]`: parses `element` exactly `count` times.
    Counter { element: Rc<Production> },
    /// `Type[] &until(cond)`: parses `element` while the loop condition expression holds.
    While { element: Rc<Production> },
    /// `Type[]` with no bound: parses `element` until it fails to match (greedy list).
    Loop { element: Rc<Production> },
    /// A unit-typed field: recurse into the referenced unit's own grammar.
    ChildGrammar { unit: Id },
    /// Not yet translated; exists only transiently while the builder assembles a unit's
    /// grammar bottom-up.
    Unknown,
}

impl Production {
    pub fn new(symbol: impl Into<String>, kind: ProductionKind) -> Rc<Self> {
        Rc::new(Self {
            symbol: Symbol(symbol.into()),
            kind,
            meta: ParserGenMeta::default(),
            nullable: OnceCell::new(),
            first_set: RefCell::new(None),
        })
    }

    pub fn with_meta(symbol: impl Into<String>, kind: ProductionKind, meta: ParserGenMeta) -> Rc<Self> {
        Rc::new(Self {
            symbol: Symbol(symbol.into()),
            kind,
            meta,
            nullable: OnceCell::new(),
            first_set: RefCell::new(None),
        })
    }

    /// Direct children in the production DAG, for the analyzer's worklist walk.
    pub fn children(&self) -> Vec<Rc<Production>> {
        match &self.kind {
            ProductionKind::Epsilon
            | ProductionKind::Literal { .. }
            | ProductionKind::Variable { .. }
            | ProductionKind::ChildGrammar { .. }
            | ProductionKind::Unknown => vec![],
            ProductionKind::Sequence(items) | ProductionKind::LookAhead(items) => items.clone(),
            ProductionKind::Switch { arms, .. } => arms.iter().map(|a| Rc::clone(&a.body)).collect(),
            ProductionKind::Boolean { then, otherwise, .. } => {
                vec![Rc::clone(then), Rc::clone(otherwise)]
            }
            ProductionKind::Counter { element }
            | ProductionKind::While { element }
            | ProductionKind::Loop { element } => vec![Rc::clone(element)],
        }
    }

    /// §2 production.h `eodOk()`: by default a production may stop cleanly at end-of-data
    /// exactly when it is nullable; `While`/`Loop` override this since an unbounded list is
    /// always a valid (possibly empty) parse at EOD regardless of its element's nullability.
    pub fn eod_ok(&self) -> bool {
        match &self.kind {
            ProductionKind::While { .. } | ProductionKind::Loop { .. } => true,
            _ => self.nullable.get().copied().unwrap_or(false),
        }
    }

    pub fn nullable(&self) -> Option<bool> {
        self.nullable.get().copied()
    }

    pub fn set_nullable(&self, value: bool) {
        let _ = self.nullable.set(value);
    }

    pub fn first_set(&self) -> Option<Vec<TokenId>> {
        self.first_set.borrow().clone()
    }

    pub fn set_first_set(&self, set: Vec<TokenId>) {
        *self.first_set.borrow_mut() = Some(set);
    }
}

impl std::fmt::Debug for Production {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Production({})", self.symbol)
    }
}

/// Assigns unique symbol names to anonymous productions created while building a unit's
/// grammar, suffixing on collision (`_field`, `_field_2`, `_field_3`, ...).
#[derive(Default)]
pub struct SymbolNamer {
    seen: HashMap<String, u32>,
}

impl SymbolNamer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fresh(&mut self, base: &str) -> String {
        let count = self.seen.entry(base.to_string()).or_insert(0);
        *count += 1;
        if *count == 1 {
            base.to_string()
        } else {
            format!("{base}_{count}")
        }
    }
}
