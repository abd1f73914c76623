//! Modules (§2 AST & Type System, "Module") — the top-level compilation unit produced by
//! the front end (§4.0) and consumed by the resolver (§3).

use crate::ast::expr::Expr;
use crate::ast::types::Type;
use crate::ast::unit::Unit;
use crate::id::Id;

#[derive(Debug, Clone)]
pub struct GlobalDecl {
    pub name: Id,
    pub ty: Type,
    pub value: Option<Expr>,
}

#[derive(Debug, Clone)]
pub struct TypeDecl {
    pub name: Id,
    pub ty: Type,
}

#[derive(Debug, Clone)]
pub struct Module {
    pub name: Id,
    /// Module names referenced by `import`.
    pub imports: Vec<Id>,
    pub units: Vec<Unit>,
    pub type_decls: Vec<TypeDecl>,
    pub globals: Vec<GlobalDecl>,
    /// Declarations named in `export`; anything not listed stays module-private.
    pub exports: Vec<Id>,
}

impl Module {
    pub fn is_exported(&self, name: &Id) -> bool {
        self.exports.iter().any(|e| e == name)
    }

    pub fn unit_named(&self, name: &Id) -> Option<&Unit> {
        self.units.iter().find(|u| &u.id == name)
    }

    pub fn exported_units(&self) -> impl Iterator<Item = &Unit> {
        self.units.iter().filter(|u| self.is_exported(&u.id))
    }
}
