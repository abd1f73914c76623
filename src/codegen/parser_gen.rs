//! Entry points emitted per exported unit (§4.4 "Entry points", §6 Runtime ABI).
//!
//! The real HILTI backend would emit `parse_func`/`resume_func`/`parse_func_sink`/
//! `new_func` as actual compiled functions a host links against. This crate has no such
//! backend to target (§1), so [ParserInfo] instead *is* the descriptor, holding enough to
//! call straight into [crate::codegen::interp] — the reference realization of those same
//! four entry points — without an intervening code loader.

use std::rc::Rc;

use crate::ast::ctor::Ctor;
use crate::ast::expr::ExprKind;
use crate::ast::unit::Unit;
use crate::codegen::interp::{self, GrammarTable, Value};
use crate::codegen::ParseSignal;
use crate::id::Id;

/// The ABI descriptor §6 specifies, minus the two fields (`parse_func_sink`, `type_info`)
/// that only make sense once a real sink runtime or reflection layer is linked in — those
/// live on [crate::runtime::sink::Sink] and are looked up by unit id instead of carried
/// here as bare function pointers.
#[derive(Clone)]
pub struct ParserInfo {
    pub name: String,
    pub description: String,
    pub mime_types: Vec<String>,
    pub ports: Vec<u16>,
    pub unit: Id,
    grammars: Rc<GrammarTable>,
}

impl ParserInfo {
    pub fn new(unit: &Unit, grammars: Rc<GrammarTable>) -> Self {
        Self {
            name: unit.id.to_string(),
            description: description_of(unit),
            mime_types: mime_types_of(unit),
            ports: ports_of(unit),
            unit: unit.id.clone(),
            grammars,
        }
    }

    /// §6 `parse_func(bytes, sink?) -> parse_object`. The sink argument is threaded by the
    /// caller attaching/writing through [crate::runtime::sink::Sink] itself rather than
    /// passed in here — see that module's `attach`.
    pub fn parse(&self, bytes: &[u8], frozen: bool) -> ParseSignal<Value> {
        interp::parse(&self.grammars, &self.unit, bytes, frozen)
    }

    /// §6 `resume_func(continuation) -> parse_object`. Re-parses the full accumulated
    /// buffer; see [crate::codegen::interp]'s module doc for why that is the correct
    /// realization of "resume" without a real captured-continuation backend.
    pub fn resume(&self, bytes: &[u8], frozen: bool) -> ParseSignal<Value> {
        interp::resume(&self.grammars, &self.unit, bytes, frozen)
    }

    /// Whether this unit declares `%mime-type`, making it eligible for
    /// [crate::runtime::mime::MimeRegistry] registration at module init.
    pub fn has_mime_type(&self) -> bool {
        !self.mime_types.is_empty()
    }
}

fn description_of(unit: &Unit) -> String {
    unit.properties
        .value_of("description")
        .and_then(as_string)
        .unwrap_or_default()
}

fn mime_types_of(unit: &Unit) -> Vec<String> {
    unit.properties
        .value_of("mime-type")
        .and_then(as_string)
        .into_iter()
        .collect()
}

fn ports_of(unit: &Unit) -> Vec<u16> {
    unit.properties
        .value_of("port")
        .and_then(as_integer)
        .map(|n| vec![n as u16])
        .unwrap_or_default()
}

fn as_string(expr: &crate::ast::expr::Expr) -> Option<String> {
    match &expr.kind {
        ExprKind::Literal(Ctor::String(s)) => Some(s.clone()),
        ExprKind::Literal(Ctor::Bytes(b)) => Some(String::from_utf8_lossy(b).into_owned()),
        _ => None,
    }
}

fn as_integer(expr: &crate::ast::expr::Expr) -> Option<i64> {
    match &expr.kind {
        ExprKind::Literal(Ctor::Integer(n)) => Some(*n),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::attribute::{Attribute, AttributeSet};
    use crate::util::Position;

    fn unit_with_properties(entries: Vec<(&str, crate::ast::expr::Expr)>) -> Unit {
        let at = Position::new(1, 1);
        let mut properties = AttributeSet::new();
        for (name, value) in entries {
            properties.insert(Attribute { name: name.to_string(), value: Some(value), at });
        }
        Unit {
            id: Id::new("HTTPBody"),
            parameters: vec![],
            variables: vec![],
            fields: vec![],
            properties,
            hooks: vec![],
            at,
        }
    }

    fn str_expr(s: &str) -> crate::ast::expr::Expr {
        crate::ast::expr::Expr::new(
            ExprKind::Literal(Ctor::String(s.to_string())),
            Position::new(1, 1),
        )
    }

    #[test]
    fn reads_mime_type_and_port_off_unit_properties() {
        let unit = unit_with_properties(vec![("mime-type", str_expr("text/html"))]);
        let info = ParserInfo::new(&unit, Rc::new(GrammarTable::new()));
        assert_eq!(info.mime_types, vec!["text/html".to_string()]);
        assert!(info.has_mime_type());
    }

    #[test]
    fn unit_without_mime_type_has_an_empty_list() {
        let unit = unit_with_properties(vec![]);
        let info = ParserInfo::new(&unit, Rc::new(GrammarTable::new()));
        assert!(info.mime_types.is_empty());
        assert!(!info.has_mime_type());
    }
}
