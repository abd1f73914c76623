//! Translates a unit's fields into a grammar (§4.2 "Grammar Builder").
//!
//! The translation is bottom-up and purely structural: each [crate::ast::unit::FieldKind]
//! maps onto exactly one [crate::grammar::production::ProductionKind], following the table
//! below. Literal fields (whose `&match` attribute carries a literal `Ctor`) become
//! [ProductionKind::Literal] so the analyzer can key lookahead decisions on their interned
//! token id; every other field becomes a [ProductionKind::Variable] or a composite of them.
//!
//! | field kind                         | production kind                       |
//! |-------------------------------------|----------------------------------------|
//! | atomic, literal `&match`             | `Literal`                               |
//! | atomic, unit-typed                   | `ChildGrammar`                          |
//! | atomic, other                        | `Variable`                              |
//! | vector with fixed count              | `Counter`                               |
//! | vector with `&until`                 | `While`                                 |
//! | vector, unbounded                    | `Loop`                                  |
//! | switch                               | `Switch`                                |
//! | field group (`List`)                 | `Sequence`                              |
//! | void                                 | `Epsilon`                               |

use std::rc::Rc;

use crate::ast::expr::ExprKind;
use crate::ast::types::Type;
use crate::ast::unit::{FieldKind, Unit, UnitField};
use crate::error::TypeError;
use crate::grammar::production::{ParserGenMeta, Production, ProductionKind, SwitchArm, SymbolNamer};
use crate::grammar::Grammar;
use crate::id::Id;
use crate::token;
use crate::util::Position;

pub struct GrammarBuilder {
    namer: SymbolNamer,
    errors: Vec<TypeError>,
}

impl GrammarBuilder {
    pub fn new() -> Self {
        Self { namer: SymbolNamer::new(), errors: Vec::new() }
    }

    /// Drains the `TypeError`s accumulated by every `build` call so far (§9 Open Question,
    /// "the runtime (typed) form is authoritative": an `embedded-object` field with no
    /// concrete type argument is rejected here rather than silently accepted).
    pub fn take_errors(&mut self) -> Vec<TypeError> {
        std::mem::take(&mut self.errors)
    }

    /// Builds the grammar for one exported unit. Called once per unit named in a module's
    /// `export` list (§2 Driver).
    pub fn build(&mut self, unit: &Unit) -> Grammar {
        let children: Vec<Rc<Production>> =
            unit.fields.iter().map(|f| self.build_field(f)).collect();
        let symbol = self.namer.fresh(unit.id.local());
        let root = if children.len() == 1 {
            Rc::clone(&children[0])
        } else {
            Production::with_meta(
                symbol,
                ProductionKind::Sequence(children),
                ParserGenMeta { field: None, for_each: false, until: false, ..ParserGenMeta::default() },
            )
        };
        Grammar::new(
            unit.id.clone(),
            root,
            unit.parameters.iter().map(|p| p.name.clone()).collect(),
        )
    }

    fn build_field(&mut self, field: &UnitField) -> Rc<Production> {
        let inner = self.build_field_kind(field);
        match &field.condition {
            Some(cond) => {
                let symbol = self.namer.fresh(&format!("{}_cond", inner.symbol));
                let otherwise = Production::new(self.namer.fresh("skip"), ProductionKind::Epsilon);
                Production::new(
                    symbol,
                    ProductionKind::Boolean { cond: cond.clone(), then: inner, otherwise },
                )
            }
            None => inner,
        }
    }

    fn build_field_kind(&mut self, field: &UnitField) -> Rc<Production> {
        let meta = ParserGenMeta {
            field: field.name().cloned(),
            ..ParserGenMeta::default()
        };
        match &field.kind {
            FieldKind::Atomic { name, ty } => self.build_atomic(name, ty, field, meta),
            FieldKind::Vector { name, element, count } => {
                self.build_vector(name, element, count.clone(), field, meta)
            }
            FieldKind::Switch { scrutinee, cases, .. } => {
                let symbol = self.namer.fresh(
                    &field.name().map(Id::to_string).unwrap_or_else(|| "switch".to_string()),
                );
                let arms = cases
                    .iter()
                    .map(|case| {
                        let label = case
                            .values
                            .as_ref()
                            .map(|vs| vs.iter().map(literal_text).collect::<Vec<_>>().join("|"));
                        let arm_children: Vec<Rc<Production>> =
                            case.fields.iter().map(|f| self.build_field(f)).collect();
                        // Always wrap in a `Sequence`, even for a single field, so the arm's
                        // result comes back as a `Value::Unit` keyed by that field's own name
                        // rather than a bare value `exec_sequence` would have nowhere to file
                        // under (the switch field itself is usually anonymous).
                        let body = Production::new(
                            self.namer.fresh(&format!("{symbol}_arm")),
                            ProductionKind::Sequence(arm_children),
                        );
                        SwitchArm { values: case.values.clone(), label, body }
                    })
                    .collect();
                Production::with_meta(
                    symbol,
                    ProductionKind::Switch { scrutinee: scrutinee.clone(), arms },
                    meta,
                )
            }
            FieldKind::List(fields) => {
                let symbol = self.namer.fresh("group");
                let children: Vec<Rc<Production>> =
                    fields.iter().map(|f| self.build_field(f)).collect();
                Production::with_meta(symbol, ProductionKind::Sequence(children), meta)
            }
            FieldKind::Void { ty } => {
                self.build_atomic(&Id::new(self.namer.fresh("anon")), ty, field, meta)
            }
        }
    }

    fn build_atomic(
        &mut self,
        name: &Id,
        ty: &Type,
        field: &UnitField,
        meta: ParserGenMeta,
    ) -> Rc<Production> {
        self.check_embedded_object_type(ty, field.at);
        let symbol = self.namer.fresh(name.local());
        if let Some(ctor) = field.attributes.value_of("match").and_then(literal_ctor) {
            let token = token::intern(&ctor.terminal_render(), &ctor.ty().to_string());
            return Production::with_meta(symbol, ProductionKind::Literal { token, ctor }, meta);
        }
        if let Type::Unit(child) = ty {
            return Production::with_meta(
                symbol,
                ProductionKind::ChildGrammar { unit: child.clone() },
                meta,
            );
        }
        let meta = ParserGenMeta {
            length_expr: field.attributes.value_of("length").cloned(),
            ..meta
        };
        let token = token::intern(&ty.to_string(), &ty.to_string());
        Production::with_meta(symbol, ProductionKind::Variable { token, ty: ty.clone() }, meta)
    }

    fn build_vector(
        &mut self,
        name: &Id,
        element: &Type,
        count: Option<crate::ast::expr::Expr>,
        field: &UnitField,
        meta: ParserGenMeta,
    ) -> Rc<Production> {
        self.check_embedded_object_type(element, field.at);
        let symbol = self.namer.fresh(name.local());
        let element_symbol = self.namer.fresh(&format!("{}_elem", name.local()));
        let element_prod = if let Type::Unit(child) = element {
            Production::new(element_symbol, ProductionKind::ChildGrammar { unit: child.clone() })
        } else {
            let token = token::intern(&element.to_string(), &element.to_string());
            Production::new(
                element_symbol,
                ProductionKind::Variable { token, ty: element.clone() },
            )
        };
        if let Some(count) = count {
            let meta = ParserGenMeta { count_expr: Some(count), ..meta };
            Production::with_meta(symbol, ProductionKind::Counter { element: element_prod }, meta)
        } else if let Some(until) = field.attributes.value_of("until") {
            let meta = ParserGenMeta { until: true, until_expr: Some(until.clone()), ..meta };
            Production::with_meta(symbol, ProductionKind::While { element: element_prod }, meta)
        } else {
            Production::with_meta(symbol, ProductionKind::Loop { element: element_prod }, meta)
        }
    }

    /// §9 Open Question, resolved: `bytes.at_object`'s runtime (typed) form is authoritative,
    /// so a field parsed as `embedded-object<T>` with no concrete `T` is rejected here rather
    /// than silently treated as "any object".
    fn check_embedded_object_type(&mut self, ty: &Type, at: Position) {
        if let Type::EmbeddedObject(None) = ty {
            self.errors.push(TypeError::UntypedEmbeddedObject { at });
        }
    }
}

impl Default for GrammarBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn literal_ctor(expr: &crate::ast::expr::Expr) -> Option<crate::ast::ctor::Ctor> {
    match &expr.kind {
        ExprKind::Literal(ctor) => Some(ctor.clone()),
        _ => None,
    }
}

fn literal_text(expr: &crate::ast::expr::Expr) -> String {
    literal_ctor(expr).map(|c| c.terminal_render()).unwrap_or_default()
}
