//! The two-phase resolver (§3 Scope & Resolver).
//!
//! Phase 1 walks the module and builds one [crate::scope::Scope] per module/unit, declaring
//! every name it finds without yet trying to resolve any of them — a unit can reference a
//! sibling unit declared later in the same module, or one from another module imported
//! later in file order, so nothing can be resolved until every name exists somewhere.
//!
//! Phase 2 repeatedly walks every `Type::UnknownByName`/unresolved-`Expr` site in the
//! module and tries to replace it with what phase 1 found, stopping when a pass makes no
//! further progress (a fixpoint). Anything still unresolved at that point is a hard error.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::ast::expr::{Expr, ExprKind};
use crate::ast::module::Module;
use crate::ast::types::Type;
use crate::ast::unit::{FieldKind, Unit, UnitField};
use crate::error::ScopeError;
use crate::id::Id;
use crate::scope::{Binding, Scope};

pub struct Resolver<'m> {
    modules: Vec<&'m Module>,
    module_scopes: HashMap<Id, Rc<RefCell<Scope>>>,
    unit_scopes: HashMap<Id, Rc<RefCell<Scope>>>,
}

impl<'m> Resolver<'m> {
    pub fn new(modules: Vec<&'m Module>) -> Self {
        Self {
            modules,
            module_scopes: HashMap::new(),
            unit_scopes: HashMap::new(),
        }
    }

    /// Phase 1: declare every module-level and unit-level name.
    fn build_scopes(&mut self) -> Result<(), Vec<ScopeError>> {
        let mut errors = Vec::new();
        for module in &self.modules {
            let scope = Scope::root();
            for unit in &module.units {
                let clash = scope.borrow_mut().declare(
                    unit.id.local(),
                    Binding::Unit { id: unit.id.clone() },
                    unit.at,
                );
                if let Some(first) = clash {
                    errors.push(ScopeError::Redeclared {
                        id: unit.id.clone(),
                        first,
                        second: unit.at,
                    });
                }
            }
            for decl in &module.type_decls {
                scope.borrow_mut().declare(
                    decl.name.local(),
                    Binding::Unit { id: decl.name.clone() },
                    module.units.first().map(|u| u.at).unwrap_or(crate::util::Position::new(0, 0)),
                );
            }
            for global in &module.globals {
                scope.borrow_mut().declare(
                    global.name.local(),
                    Binding::Global { ty: global.ty.clone() },
                    module.units.first().map(|u| u.at).unwrap_or(crate::util::Position::new(0, 0)),
                );
            }
            self.module_scopes.insert(module.name.clone(), Rc::clone(&scope));

            for unit in &module.units {
                let unit_scope = Scope::child_of(&scope);
                declare_unit_members(unit, &unit_scope);
                self.unit_scopes.insert(unit.id.clone(), unit_scope);
            }
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Phase 2: iterate to a fixpoint, resolving placeholder types and names.
    fn resolve_fixpoint(&mut self) -> Result<(), Vec<ScopeError>> {
        let mut errors = Vec::new();
        loop {
            let mut progress = false;
            for module in &self.modules {
                for unit in &module.units {
                    let Some(unit_scope) = self.unit_scopes.get(&unit.id).cloned() else {
                        continue;
                    };
                    for field in &unit.fields {
                        progress |= resolve_field(field, &unit_scope, &self.module_scopes, &mut errors);
                    }
                    for hook in &unit.hooks {
                        for stmt in &hook.body.statements {
                            progress |= resolve_stmt_exprs(stmt, &unit_scope, &self.module_scopes, &mut errors);
                        }
                    }
                }
            }
            if !progress {
                break;
            }
        }

        self.check_synchronize_conflicts(&mut errors);

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// §4.1/§9: a field's `&synchronize` setting and its enclosing unit's `%synchronize`
    /// setting may disagree only if both are absent or both agree; an explicit
    /// disagreement (e.g. the unit opts in but a field opts out with `&synchronize=False`)
    /// is the one case the Open Question resolution treats as an error. Agreement, or
    /// either side being unset, is fine.
    fn check_synchronize_conflicts(&self, errors: &mut Vec<ScopeError>) {
        for module in &self.modules {
            for unit in &module.units {
                let Some(unit_state) = unit.synchronize_state() else {
                    continue;
                };
                for field in &unit.fields {
                    let Some(field_state) = field.synchronize_state() else {
                        continue;
                    };
                    if field_state != unit_state {
                        if let Some(name) = field.name() {
                            errors.push(ScopeError::SynchronizeConflict {
                                field: name.clone(),
                                unit: unit.id.clone(),
                            });
                        }
                    }
                }
            }
        }
    }
}

fn declare_unit_members(unit: &Unit, scope: &Rc<RefCell<Scope>>) {
    for param in &unit.parameters {
        scope.borrow_mut().declare(
            param.name.local(),
            Binding::UnitMember { ty: param.ty.clone() },
            unit.at,
        );
    }
    for var in &unit.variables {
        scope.borrow_mut().declare(
            var.name.local(),
            Binding::UnitMember { ty: var.ty.clone() },
            unit.at,
        );
    }
    for field in &unit.fields {
        declare_field_member(field, scope);
    }
}

fn declare_field_member(field: &UnitField, scope: &Rc<RefCell<Scope>>) {
    match &field.kind {
        FieldKind::Atomic { name, ty } => {
            scope
                .borrow_mut()
                .declare(name.local(), Binding::UnitMember { ty: ty.clone() }, field.at);
        }
        FieldKind::Vector { name, element, .. } => {
            scope.borrow_mut().declare(
                name.local(),
                Binding::UnitMember { ty: Type::Vector(Box::new(element.clone())) },
                field.at,
            );
        }
        FieldKind::Switch { name: Some(name), .. } => {
            scope
                .borrow_mut()
                .declare(name.local(), Binding::UnitMember { ty: Type::Unknown }, field.at);
        }
        FieldKind::Switch { name: None, cases, .. } => {
            for case in cases {
                for f in &case.fields {
                    declare_field_member(f, scope);
                }
            }
        }
        FieldKind::List(fields) => {
            for f in fields {
                declare_field_member(f, scope);
            }
        }
        FieldKind::Void { .. } => {}
    }
}

/// Attempts to resolve one field's type/attribute expressions in place. Returns whether any
/// placeholder was replaced this pass.
fn resolve_field(
    field: &UnitField,
    scope: &Rc<RefCell<Scope>>,
    modules: &HashMap<Id, Rc<RefCell<Scope>>>,
    errors: &mut Vec<ScopeError>,
) -> bool {
    let mut progress = false;
    for attr in field.attributes.iter() {
        if let Some(expr) = &attr.value {
            progress |= resolve_expr(expr, scope, modules, errors);
        }
    }
    if let Some(cond) = &field.condition {
        progress |= resolve_expr(cond, scope, modules, errors);
    }
    match &field.kind {
        FieldKind::Switch { cases, .. } => {
            for case in cases {
                for f in &case.fields {
                    progress |= resolve_field(f, scope, modules, errors);
                }
            }
        }
        FieldKind::List(fields) => {
            for f in fields {
                progress |= resolve_field(f, scope, modules, errors);
            }
        }
        _ => {}
    }
    progress
}

fn resolve_stmt_exprs(
    stmt: &crate::ast::stmt::Stmt,
    scope: &Rc<RefCell<Scope>>,
    modules: &HashMap<Id, Rc<RefCell<Scope>>>,
    errors: &mut Vec<ScopeError>,
) -> bool {
    use crate::ast::stmt::Stmt;
    match stmt {
        Stmt::Expr(e) => resolve_expr(e, scope, modules, errors),
        Stmt::If { cond, then_branch, else_branch } => {
            let mut progress = resolve_expr(cond, scope, modules, errors);
            for s in &then_branch.statements {
                progress |= resolve_stmt_exprs(s, scope, modules, errors);
            }
            if let Some(else_branch) = else_branch {
                for s in &else_branch.statements {
                    progress |= resolve_stmt_exprs(s, scope, modules, errors);
                }
            }
            progress
        }
        Stmt::Switch { scrutinee, arms } => {
            let mut progress = resolve_expr(scrutinee, scope, modules, errors);
            for arm in arms {
                for s in &arm.body.statements {
                    progress |= resolve_stmt_exprs(s, scope, modules, errors);
                }
            }
            progress
        }
        Stmt::For { iterable, body, .. } => {
            let mut progress = resolve_expr(iterable, scope, modules, errors);
            for s in &body.statements {
                progress |= resolve_stmt_exprs(s, scope, modules, errors);
            }
            progress
        }
        Stmt::While { cond, body } => {
            let mut progress = resolve_expr(cond, scope, modules, errors);
            for s in &body.statements {
                progress |= resolve_stmt_exprs(s, scope, modules, errors);
            }
            progress
        }
        Stmt::Return(Some(e)) => resolve_expr(e, scope, modules, errors),
        Stmt::Print(exprs) => exprs.iter().fold(false, |acc, e| acc | resolve_expr(e, scope, modules, errors)),
        Stmt::TryCatch { body, catches, .. } => {
            let mut progress = false;
            for s in &body.statements {
                progress |= resolve_stmt_exprs(s, scope, modules, errors);
            }
            for (_, _, block) in catches {
                for s in &block.statements {
                    progress |= resolve_stmt_exprs(s, scope, modules, errors);
                }
            }
            progress
        }
        Stmt::Return(None) | Stmt::Confirm | Stmt::Reject => false,
    }
}

fn resolve_expr(
    expr: &Expr,
    scope: &Rc<RefCell<Scope>>,
    modules: &HashMap<Id, Rc<RefCell<Scope>>>,
    errors: &mut Vec<ScopeError>,
) -> bool {
    if expr.ty.is_some() && !expr.ty.as_ref().unwrap().is_placeholder() {
        return false;
    }
    match &expr.kind {
        ExprKind::Name(id) => scope.borrow().lookup_id(id, modules).is_some(),
        ExprKind::Member { base, .. } => resolve_expr(base, scope, modules, errors),
        ExprKind::Index { base, index } => {
            resolve_expr(base, scope, modules, errors) | resolve_expr(index, scope, modules, errors)
        }
        ExprKind::Call { callee, args } => {
            let mut progress = resolve_expr(callee, scope, modules, errors);
            for a in args {
                progress |= resolve_expr(a, scope, modules, errors);
            }
            progress
        }
        ExprKind::Unary { operand, .. } => resolve_expr(operand, scope, modules, errors),
        ExprKind::Binary { lhs, rhs, .. } => {
            resolve_expr(lhs, scope, modules, errors) | resolve_expr(rhs, scope, modules, errors)
        }
        ExprKind::Conditional { cond, then_branch, else_branch } => {
            resolve_expr(cond, scope, modules, errors)
                | resolve_expr(then_branch, scope, modules, errors)
                | resolve_expr(else_branch, scope, modules, errors)
        }
        ExprKind::Tuple(elements) => elements
            .iter()
            .fold(false, |acc, e| acc | resolve_expr(e, scope, modules, errors)),
        ExprKind::Literal(_) | ExprKind::Dollar | ExprKind::Void => false,
    }
}

/// Runs both resolver phases over a set of modules that import each other, returning the
/// accumulated errors from whichever phase first finds any.
pub fn resolve_module<'m>(modules: Vec<&'m Module>) -> Result<Resolver<'m>, Vec<ScopeError>> {
    let mut resolver = Resolver::new(modules);
    resolver.build_scopes()?;
    resolver.resolve_fixpoint()?;
    Ok(resolver)
}
