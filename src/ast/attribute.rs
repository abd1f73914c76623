//! Field and unit attributes (§3 Data model, "Attribute").
//!
//! Attributes are the `&name` / `&name=expr` annotations that sit after a field or a unit
//! property (`&length`, `&synchronize`, `&convert`, `&chunked`, ...). The resolver and
//! grammar builder each only care whether a given name is present and, if so, what its
//! expression evaluates to — so `AttributeSet` is a thin lookup table, not a distinct node
//! per known attribute name.

use std::collections::HashMap;

use crate::ast::expr::Expr;
use crate::util::Position;

#[derive(Debug, Clone)]
pub struct Attribute {
    pub name: String,
    pub value: Option<Expr>,
    pub at: Position,
}

#[derive(Debug, Clone, Default)]
pub struct AttributeSet {
    entries: HashMap<String, Attribute>,
}

impl AttributeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, attr: Attribute) {
        self.entries.insert(attr.name.clone(), attr);
    }

    pub fn get(&self, name: &str) -> Option<&Attribute> {
        self.entries.get(name)
    }

    pub fn has(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn value_of(&self, name: &str) -> Option<&Expr> {
        self.get(name).and_then(|a| a.value.as_ref())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Attribute> {
        self.entries.values()
    }
}
