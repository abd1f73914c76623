//! Textual HILTI-ish intermediate code (§4.4), rendered as a `Display`-style visitor over a
//! unit's grammar — the same walk-and-write-indented-lines shape a recursive grammar
//! printer uses to print BNF, generalized here to print parsing instructions instead of
//! grammar rules.

use std::fmt::Write as _;
use std::rc::Rc;

use crate::ast::expr::{ExprKind, Expr};
use crate::grammar::production::{Production, ProductionKind};
use crate::grammar::Grammar;

/// Renders `grammar` as a `hlt.function @parse_<Unit>` body, one pseudo-instruction per
/// line, with indentation tracking nesting depth the way a grammar tree is usually printed.
pub fn render(grammar: &Grammar) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "hlt.function @parse_{}(%data: bytes) -> %result {{", grammar.unit);
    render_production(&grammar.root, grammar, 1, &mut out);
    let _ = writeln!(out, "}}");
    out
}

/// Renders an expression as the textual operand of a pseudo-instruction. Not a full printer
/// — just enough to make the emitted HILTI-ish IR legible for inspection and golden tests.
fn render_expr(expr: &Expr) -> String {
    match &expr.kind {
        ExprKind::Literal(ctor) => format!("{:?}", ctor.terminal_render()),
        ExprKind::Name(id) => format!("%{id}"),
        ExprKind::Member { base, member } => format!("{}.{member}", render_expr(base)),
        ExprKind::Index { base, index } => format!("{}[{}]", render_expr(base), render_expr(index)),
        ExprKind::Call { callee, args } => {
            let rendered_args: Vec<String> = args.iter().map(render_expr).collect();
            format!("{}({})", render_expr(callee), rendered_args.join(", "))
        }
        ExprKind::Unary { operand, .. } => format!("(op {})", render_expr(operand)),
        ExprKind::Binary { lhs, rhs, .. } => format!("({} op {})", render_expr(lhs), render_expr(rhs)),
        ExprKind::Conditional { cond, then_branch, else_branch } => {
            format!("({} ? {} : {})", render_expr(cond), render_expr(then_branch), render_expr(else_branch))
        }
        ExprKind::Tuple(elements) => {
            let rendered: Vec<String> = elements.iter().map(render_expr).collect();
            format!("({})", rendered.join(", "))
        }
        ExprKind::Dollar => "$$".to_string(),
        ExprKind::Void => "void".to_string(),
    }
}

fn indent(out: &mut String, depth: usize) {
    for _ in 0..depth {
        out.push_str("    ");
    }
}

fn render_production(p: &Rc<Production>, grammar: &Grammar, depth: usize, out: &mut String) {
    indent(out, depth);
    match &p.kind {
        ProductionKind::Epsilon => {
            let _ = writeln!(out, "; {} = epsilon", p.symbol);
        }
        ProductionKind::Literal { token, ctor } => {
            let _ = writeln!(
                out,
                "%{} = hlt.unpack.literal %data, token={token}, text={:?}",
                p.symbol,
                ctor.terminal_render()
            );
        }
        ProductionKind::Variable { token, .. } => {
            let _ = writeln!(out, "%{} = hlt.unpack %data, token={token}", p.symbol);
        }
        ProductionKind::Sequence(items) => {
            let _ = writeln!(out, "; sequence {}", p.symbol);
            for item in items {
                render_production(item, grammar, depth + 1, out);
            }
        }
        ProductionKind::LookAhead(items) => {
            let _ = writeln!(out, "hlt.switch.lookahead %data {{");
            for item in items {
                indent(out, depth + 1);
                let first = grammar.first_of(&item.symbol.to_string());
                let _ = writeln!(out, "case {:?} ->", first);
                render_production(item, grammar, depth + 2, out);
            }
            indent(out, depth);
            let _ = writeln!(out, "}}");
        }
        ProductionKind::Switch { scrutinee, arms } => {
            let _ = writeln!(out, "hlt.switch {} {{", render_expr(scrutinee));
            for arm in arms {
                indent(out, depth + 1);
                let _ = writeln!(out, "case {:?} ->", arm.label.as_deref().unwrap_or("*"));
                render_production(&arm.body, grammar, depth + 2, out);
            }
            indent(out, depth);
            let _ = writeln!(out, "}}");
        }
        ProductionKind::Boolean { then, otherwise, .. } => {
            let _ = writeln!(out, "if ( %cond_{} ) {{", p.symbol);
            render_production(then, grammar, depth + 1, out);
            indent(out, depth);
            let _ = writeln!(out, "}} else {{");
            render_production(otherwise, grammar, depth + 1, out);
            indent(out, depth);
            let _ = writeln!(out, "}}");
        }
        ProductionKind::Counter { element } => {
            let _ = writeln!(out, "hlt.loop.counter %n_{} {{", p.symbol);
            render_production(element, grammar, depth + 1, out);
            indent(out, depth);
            let _ = writeln!(out, "}}");
        }
        ProductionKind::While { element } => {
            let _ = writeln!(out, "hlt.loop.while ( %until_{} ) {{", p.symbol);
            render_production(element, grammar, depth + 1, out);
            indent(out, depth);
            let _ = writeln!(out, "}}");
        }
        ProductionKind::Loop { element } => {
            let _ = writeln!(out, "hlt.loop.greedy {{");
            render_production(element, grammar, depth + 1, out);
            indent(out, depth);
            let _ = writeln!(out, "}}");
        }
        ProductionKind::ChildGrammar { unit } => {
            let _ = writeln!(out, "%{} = hlt.call @parse_{unit}(%data)", p.symbol);
        }
        ProductionKind::Unknown => {
            let _ = writeln!(out, "; <unresolved {}>", p.symbol);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::production::ParserGenMeta;
    use crate::id::Id;

    #[test]
    fn renders_a_function_wrapper() {
        let token = crate::token::intern("uint8", "uint8");
        let root = Production::with_meta(
            "len",
            ProductionKind::Variable { token, ty: crate::ast::types::Type::Integer { width: 8, signed: false } },
            ParserGenMeta::default(),
        );
        let grammar = Grammar::new(Id::new("Packet"), root, vec![]);
        let text = render(&grammar);
        assert!(text.starts_with("hlt.function @parse_Packet"));
        assert!(text.contains("hlt.unpack"));
    }
}
