//! Grammar construction and analysis (§4 Grammar Builder/Analyzer).

pub mod analyzer;
pub mod builder;
pub mod production;

use std::collections::HashMap;
use std::rc::Rc;

use crate::id::Id;
use crate::token::TokenId;

pub use analyzer::analyze;
pub use builder::GrammarBuilder;
pub use production::{ParserGenMeta, Production, ProductionKind, Symbol, SymbolNamer};

/// One unit's derived grammar: its root production plus the analyzer's computed tables,
/// keyed by production symbol (mirrors `binpac/grammar.h`'s `map<string,bool> _nullable`
/// and `map<string,symbol_set> _first`/`_follow`).
pub struct Grammar {
    pub unit: Id,
    pub root: Rc<Production>,
    pub parameters: Vec<Id>,
    nullable: HashMap<String, bool>,
    first: HashMap<String, Vec<TokenId>>,
    follow: HashMap<String, Vec<TokenId>>,
}

impl Grammar {
    pub fn new(unit: Id, root: Rc<Production>, parameters: Vec<Id>) -> Self {
        Self {
            unit,
            root,
            parameters,
            nullable: HashMap::new(),
            first: HashMap::new(),
            follow: HashMap::new(),
        }
    }

    pub fn is_nullable(&self, symbol: &str) -> bool {
        self.nullable.get(symbol).copied().unwrap_or(false)
    }

    pub fn first_of(&self, symbol: &str) -> &[TokenId] {
        self.first.get(symbol).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn follow_of(&self, symbol: &str) -> &[TokenId] {
        self.follow.get(symbol).map(Vec::as_slice).unwrap_or(&[])
    }

    pub(crate) fn set_nullable(&mut self, symbol: String, value: bool) {
        self.nullable.insert(symbol, value);
    }

    pub(crate) fn set_first(&mut self, symbol: String, set: Vec<TokenId>) {
        self.first.insert(symbol, set);
    }

    pub(crate) fn set_follow(&mut self, symbol: String, set: Vec<TokenId>) {
        self.follow.insert(symbol, set);
    }

    /// §4.3: a unit needs an explicit one-token lookahead decision at runtime exactly when
    /// it contains a `LookAhead`/`Switch` node whose alternatives aren't already
    /// syntactically distinguished (i.e. analysis found more than one candidate).
    pub fn needs_lookahead(&self) -> bool {
        fn walk(p: &Rc<Production>) -> bool {
            matches!(
                p.kind,
                ProductionKind::LookAhead(_) | ProductionKind::Switch { .. }
            ) || p.children().iter().any(walk)
        }
        walk(&self.root)
    }
}
