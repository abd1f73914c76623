//! Scopes and identifier resolution (§3 Scope & Resolver).

pub mod resolver;

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::ast::types::Type;
use crate::id::Id;
use crate::util::Position;

pub use resolver::{resolve_module, Resolver};

/// What an unqualified name inside a scope refers to.
#[derive(Debug, Clone)]
pub enum Binding {
    Global { ty: Type },
    Unit { id: Id },
    /// A unit field, unit-local variable, or unit parameter — all live in the unit's own
    /// scope and are resolved the same way (§3, unit-field scope IDs).
    UnitMember { ty: Type },
    /// A `for`/hook-local/function-parameter binding.
    Local { ty: Type },
    /// An imported module, looked up before falling through to a dotted member access.
    Module { id: Id },
    EnumLabel { ty: Type, value: i64 },
}

impl Binding {
    pub fn ty(&self) -> Option<&Type> {
        match self {
            Binding::Global { ty }
            | Binding::UnitMember { ty }
            | Binding::Local { ty }
            | Binding::EnumLabel { ty, .. } => Some(ty),
            Binding::Unit { .. } | Binding::Module { .. } => None,
        }
    }
}

/// A lexical scope: an unqualified-name table chained to an optional parent.
///
/// Module scopes have no parent. A unit's scope chains to its module's. A hook or `for`
/// body's scope chains to the unit's. Lookup walks outward until a name is found or the
/// chain is exhausted — matching how an inner `var` can shadow an outer field of the same
/// name.
#[derive(Debug)]
pub struct Scope {
    parent: Option<Rc<RefCell<Scope>>>,
    bindings: HashMap<String, (Binding, Position)>,
}

impl Scope {
    pub fn root() -> Rc<RefCell<Scope>> {
        Rc::new(RefCell::new(Scope { parent: None, bindings: HashMap::new() }))
    }

    pub fn child_of(parent: &Rc<RefCell<Scope>>) -> Rc<RefCell<Scope>> {
        Rc::new(RefCell::new(Scope {
            parent: Some(Rc::clone(parent)),
            bindings: HashMap::new(),
        }))
    }

    /// Declares `name` in this scope. Returns the position of a prior declaration of the
    /// same name in the *same* scope, if any — the caller turns that into a
    /// `ScopeError::Redeclared`. Shadowing a parent scope's binding is fine and not reported.
    pub fn declare(&mut self, name: &str, binding: Binding, at: Position) -> Option<Position> {
        let previous = self.bindings.get(name).map(|(_, pos)| *pos);
        self.bindings.insert(name.to_string(), (binding, at));
        previous
    }

    /// Resolves an unqualified name by walking outward through the scope chain.
    pub fn lookup(&self, name: &str) -> Option<Binding> {
        if let Some((binding, _)) = self.bindings.get(name) {
            return Some(binding.clone());
        }
        self.parent.as_ref().and_then(|p| p.borrow().lookup(name))
    }

    /// Resolves a (possibly dotted) id: the first component through the scope chain, then
    /// each remaining component against the module scope it names — composing an imported
    /// module's exports into the importing scope without physically copying bindings.
    pub fn lookup_id(&self, id: &Id, module_scopes: &HashMap<Id, Rc<RefCell<Scope>>>) -> Option<Binding> {
        match id.module() {
            None => self.lookup(id.local()),
            Some(module) => {
                let module_id = Id::new(module);
                let scope = module_scopes.get(&module_id)?;
                scope.borrow().lookup(id.local())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inner_scope_shadows_outer_without_reporting_redeclaration() {
        let root = Scope::root();
        root.borrow_mut().declare(
            "x",
            Binding::Global { ty: Type::Bool },
            Position::new(1, 1),
        );
        let child = Scope::child_of(&root);
        let clash = child.borrow_mut().declare(
            "x",
            Binding::Local { ty: Type::Bytes },
            Position::new(2, 1),
        );
        assert!(clash.is_none());
        assert!(matches!(child.borrow().lookup("x"), Some(Binding::Local { .. })));
    }

    #[test]
    fn same_scope_redeclaration_is_reported() {
        let root = Scope::root();
        root.borrow_mut().declare("x", Binding::Global { ty: Type::Bool }, Position::new(1, 1));
        let clash = root.borrow_mut().declare(
            "x",
            Binding::Global { ty: Type::Bytes },
            Position::new(2, 1),
        );
        assert_eq!(clash, Some(Position::new(1, 1)));
    }
}
