//! Expressions (§2 AST & Type System, "Expression").

use std::rc::Rc;

use crate::ast::ctor::Ctor;
use crate::ast::types::Type;
use crate::id::Id;
use crate::util::Position;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
    In,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
    BitNot,
}

/// A single node of the expression AST.
///
/// Carries an `Option<Type>` rather than a bare `Type`: before the resolver's second phase
/// runs, a freshly-parsed expression doesn't know its type yet. [crate::ast::expr::ExprKind]
/// is what the resolver fixpoint walk (§3) replaces in place as it discovers types.
#[derive(Debug, Clone)]
pub struct Expr {
    pub kind: ExprKind,
    pub ty: Option<Type>,
    pub at: Position,
}

#[derive(Debug, Clone)]
pub enum ExprKind {
    Literal(Ctor),
    Name(Id),
    /// `a.b` — field, hook-local, or enum-label access.
    Member { base: Rc<Expr>, member: String },
    /// `a[i]`.
    Index { base: Rc<Expr>, index: Rc<Expr> },
    /// `f(args)`, also used for unit-parameter instantiation `Unit(args)`.
    Call { callee: Rc<Expr>, args: Vec<Expr> },
    Unary { op: UnaryOp, operand: Rc<Expr> },
    Binary { op: BinOp, lhs: Rc<Expr>, rhs: Rc<Expr> },
    /// `cond ? then : else`.
    Conditional { cond: Rc<Expr>, then_branch: Rc<Expr>, else_branch: Rc<Expr> },
    Tuple(Vec<Expr>),
    /// `$$` inside a `&convert`/`&length`/hook expression: the field's own just-parsed value.
    Dollar,
    /// Placeholder inserted by the parser for an attribute with no expression; never
    /// survives past attribute validation.
    Void,
}

impl Expr {
    pub fn new(kind: ExprKind, at: Position) -> Self {
        Self { kind, ty: None, at }
    }

    pub fn is_resolved(&self) -> bool {
        self.ty.as_ref().is_some_and(|t| !t.is_placeholder())
    }
}
