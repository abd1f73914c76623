//! The abstract syntax tree produced by lowering the front end's concrete syntax tree
//! (§4.0), and consumed by the scope resolver (§3) and grammar builder (§4).

pub mod attribute;
pub mod ctor;
pub mod expr;
pub mod module;
pub mod stmt;
pub mod types;
pub mod unit;

pub use attribute::{Attribute, AttributeSet};
pub use ctor::Ctor;
pub use expr::{BinOp, Expr, ExprKind, UnaryOp};
pub use module::{GlobalDecl, Module, TypeDecl};
pub use stmt::{Block, Stmt, SwitchArm};
pub use types::{EnumLabel, TupleElement, Type};
pub use unit::{FieldKind, Hook, HookKind, SwitchCase, Unit, UnitField, UnitParameter, UnitVariable};
