//! Statements (§2 AST & Type System, "Statement"), used inside hook bodies and function
//! bodies.

use crate::ast::expr::Expr;
use crate::ast::types::Type;
use crate::id::Id;

#[derive(Debug, Clone)]
pub struct Block {
    pub locals: Vec<(Id, Type, Option<Expr>)>,
    pub statements: Vec<Stmt>,
}

#[derive(Debug, Clone)]
pub struct SwitchArm {
    /// `None` is the `*` default arm.
    pub values: Option<Vec<Expr>>,
    pub body: Block,
}

#[derive(Debug, Clone)]
pub enum Stmt {
    Expr(Expr),
    If { cond: Expr, then_branch: Block, else_branch: Option<Block> },
    Switch { scrutinee: Expr, arms: Vec<SwitchArm> },
    For { binding: Id, iterable: Expr, body: Block },
    While { cond: Expr, body: Block },
    Return(Option<Expr>),
    Print(Vec<Expr>),
    /// `try { ... } catch ( Type name ) { ... }`.
    TryCatch { body: Block, catches: Vec<(Type, Option<Id>, Block)> },
    /// `confirm`/`reject` on an embedded-object probe inside a unit hook.
    Confirm,
    Reject,
}
