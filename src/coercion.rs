//! Type coercion and operator resolution (§4.8 Coercion/Operators, §4.1 "Operator
//! resolution").
//!
//! [coerce] is the partial function `(src, dst) -> Coercion`: given two types it either
//! returns the transform that gets you from one to the other, or `None` if no such
//! transform exists. [resolve_binary] builds on top of it following §9's Design Notes for
//! the operator-overload tables — a small data-driven candidate list keyed on operator
//! kind, scored by how much coercion each candidate needs, with the lowest-scoring
//! candidate winning and a tie reported as ambiguous. This mirrors the match-per-variant
//! dispatch [crate::ast::types::Type]'s own `is_*` trait queries use throughout this crate,
//! generalized from "answer one question about a type" to "pick the best of several
//! candidate signatures".

use crate::ast::expr::BinOp;
use crate::ast::types::Type;

/// One recognized src→dst transform. Each variant is a distinct "rule" from §4.8's list;
/// [Coercion::cost] is what [resolve_binary] uses to rank candidates against each other.
#[derive(Debug, Clone, PartialEq)]
pub enum Coercion {
    /// Source and destination types are already identical.
    Identity,
    SignExtend { from: u8, to: u8 },
    ZeroExtend { from: u8, to: u8 },
    /// `signed -> bool` is truthiness (nonzero is true), not a width change.
    Truthiness,
    /// `optional<T> -> T`, unwrapping under a context that expects the bare element type.
    OptionalUnwrap(Box<Coercion>),
    /// Tuple coercion is elementwise: each element coerces independently, arity must match.
    TupleElementwise(Vec<Coercion>),
    /// `ref<A> -> ref<B>` when `A` coerces to `B`.
    RefCompatible(Box<Coercion>),
    /// `bytes -> string`, assuming the bytes are valid UTF-8 (§4.8: "documented as such" —
    /// the coercion itself does not validate; a malformed sequence is a runtime `TypeError`
    /// at the point the string is actually used, not at coercion time).
    BytesToString,
}

impl Coercion {
    /// How much this coercion "costs" relative to an exact match, used to rank candidate
    /// operator signatures against each other (§4.1 "the most specific match wins").
    /// Identity is free; every other rule costs something, and narrower-to-wider integer
    /// promotions cost proportionally to the number of bits bridged so that `uint8 -> uint8`
    /// candidates are preferred over `uint8 -> uint64` ones when both are available.
    pub fn cost(&self) -> u32 {
        match self {
            Coercion::Identity => 0,
            Coercion::SignExtend { from, to } | Coercion::ZeroExtend { from, to } => {
                1 + (*to as u32 - *from as u32)
            }
            Coercion::Truthiness => 4,
            Coercion::BytesToString => 4,
            Coercion::OptionalUnwrap(inner) | Coercion::RefCompatible(inner) => 1 + inner.cost(),
            Coercion::TupleElementwise(elements) => {
                1 + elements.iter().map(Coercion::cost).sum::<u32>()
            }
        }
    }
}

/// Finds the coercion (if any) from `src` to `dst`. `None` means the resolver should report
/// `TypeError::NoCoercion`.
pub fn coerce(src: &Type, dst: &Type) -> Option<Coercion> {
    if src == dst {
        return Some(Coercion::Identity);
    }
    match (src, dst) {
        (Type::Integer { width: sw, signed: true }, Type::Integer { width: dw, signed: true })
            if dw >= sw =>
        {
            Some(Coercion::SignExtend { from: *sw, to: *dw })
        }
        (Type::Integer { width: sw, signed: false }, Type::Integer { width: dw, signed: false })
            if dw >= sw =>
        {
            Some(Coercion::ZeroExtend { from: *sw, to: *dw })
        }
        (Type::Integer { .. }, Type::Bool) => Some(Coercion::Truthiness),
        (Type::Optional(inner), dst) => coerce(inner, dst).map(|c| Coercion::OptionalUnwrap(Box::new(c))),
        (Type::Tuple(src_elems), Type::Tuple(dst_elems)) if src_elems.len() == dst_elems.len() => {
            let coerced: Option<Vec<Coercion>> = src_elems
                .iter()
                .zip(dst_elems)
                .map(|(s, d)| coerce(&s.ty, &d.ty))
                .collect();
            coerced.map(Coercion::TupleElementwise)
        }
        (Type::Ref(src_inner), Type::Ref(dst_inner)) => {
            coerce(src_inner, dst_inner).map(|c| Coercion::RefCompatible(Box::new(c)))
        }
        (Type::Bytes, Type::String) => Some(Coercion::BytesToString),
        _ => None,
    }
}

/// What §4.1 calls an "operator kind": the family of binary/unary/indexing/call/
/// construction candidates an expression's operator is resolved against. Only the binary
/// arithmetic/comparison kinds need a full candidate table here — indexing, attribute
/// access, call, and construction are resolved structurally against the operand's own
/// declared type by the resolver (§3) rather than against a signature table, since their
/// "overloads" are just "is this a container/unit/function at all", not "which of several
/// numeric widths".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorKind {
    Arithmetic(BinOp),
    Comparison(BinOp),
}

pub fn operator_kind(op: BinOp) -> OperatorKind {
    match op {
        BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Div | BinOp::Mod => OperatorKind::Arithmetic(op),
        BinOp::BitAnd | BinOp::BitOr | BinOp::BitXor | BinOp::Shl | BinOp::Shr => {
            OperatorKind::Arithmetic(op)
        }
        BinOp::Eq | BinOp::Ne | BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge | BinOp::In => {
            OperatorKind::Comparison(op)
        }
        BinOp::And | BinOp::Or => OperatorKind::Comparison(op),
    }
}

/// One candidate signature an operator kind may match against.
struct Candidate {
    lhs: Type,
    rhs: Type,
    result: Type,
}

/// §4.1: "each operator kind enumerates candidate signatures". The table here is
/// necessarily partial — BinPAC++'s real dispatch table is generated from every declared
/// integer width × width combination (§9 Design Notes calls this out directly: "the source
/// ships auto-generated dispatch tables for every operator/type combination") — but the
/// *shape* of the match (most-specific-width-wins) is exactly what a generated table would
/// also produce, since every candidate is reachable through [coerce]'s width-distance cost.
fn candidates(kind: OperatorKind) -> Vec<Candidate> {
    let int_widths = [8u8, 16, 32, 64];
    match kind {
        OperatorKind::Arithmetic(BinOp::Div) | OperatorKind::Arithmetic(BinOp::Mod) => int_widths
            .iter()
            .flat_map(|&w| {
                [true, false].map(|signed| Candidate {
                    lhs: Type::Integer { width: w, signed },
                    rhs: Type::Integer { width: w, signed },
                    result: Type::Integer { width: w, signed },
                })
            })
            .collect(),
        OperatorKind::Arithmetic(_) => {
            let mut out: Vec<Candidate> = int_widths
                .iter()
                .flat_map(|&w| {
                    [true, false].map(|signed| Candidate {
                        lhs: Type::Integer { width: w, signed },
                        rhs: Type::Integer { width: w, signed },
                        result: Type::Integer { width: w, signed },
                    })
                })
                .collect();
            out.push(Candidate { lhs: Type::Double, rhs: Type::Double, result: Type::Double });
            out.push(Candidate {
                lhs: Type::Interval,
                rhs: Type::Interval,
                result: Type::Interval,
            });
            out
        }
        OperatorKind::Comparison(BinOp::And) | OperatorKind::Comparison(BinOp::Or) => {
            vec![Candidate { lhs: Type::Bool, rhs: Type::Bool, result: Type::Bool }]
        }
        OperatorKind::Comparison(BinOp::In) => vec![
            Candidate { lhs: Type::Bytes, rhs: Type::Bytes, result: Type::Bool },
            Candidate { lhs: Type::String, rhs: Type::String, result: Type::Bool },
        ],
        OperatorKind::Comparison(_) => {
            let mut out: Vec<Candidate> = int_widths
                .iter()
                .flat_map(|&w| {
                    [true, false].map(|signed| Candidate {
                        lhs: Type::Integer { width: w, signed },
                        rhs: Type::Integer { width: w, signed },
                        result: Type::Bool,
                    })
                })
                .collect();
            out.push(Candidate { lhs: Type::Double, rhs: Type::Double, result: Type::Bool });
            out.push(Candidate { lhs: Type::Bytes, rhs: Type::Bytes, result: Type::Bool });
            out.push(Candidate { lhs: Type::String, rhs: Type::String, result: Type::Bool });
            out.push(Candidate { lhs: Type::Addr, rhs: Type::Addr, result: Type::Bool });
            out.push(Candidate { lhs: Type::Port, rhs: Type::Port, result: Type::Bool });
            out.push(Candidate { lhs: Type::Time, rhs: Type::Time, result: Type::Bool });
            out
        }
    }
}

/// The outcome of resolving one binary operator application.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved {
    pub result: Type,
    pub lhs_coercion: Coercion,
    pub rhs_coercion: Coercion,
}

/// §4.1: picks the most-specific candidate signature `op` can apply to `(lhs, rhs)` under,
/// coercing each operand as needed. A tie between two equally-specific candidates is an
/// error the caller turns into `ScopeError::AmbiguousOperator`; no matching candidate at
/// all becomes `ScopeError::NoMatchingOperator`.
pub fn resolve_binary(op: BinOp, lhs: &Type, rhs: &Type) -> Result<Resolved, OperatorResolutionError> {
    let mut best: Option<(u32, Resolved)> = None;
    let mut tied = false;
    for candidate in candidates(operator_kind(op)) {
        let (Some(lc), Some(rc)) = (coerce(lhs, &candidate.lhs), coerce(rhs, &candidate.rhs)) else {
            continue;
        };
        let score = lc.cost() + rc.cost();
        match &best {
            Some((best_score, _)) if score < *best_score => {
                best = Some((
                    score,
                    Resolved { result: candidate.result, lhs_coercion: lc, rhs_coercion: rc },
                ));
                tied = false;
            }
            Some((best_score, _)) if score == *best_score => {
                tied = true;
            }
            Some(_) => {}
            None => {
                best = Some((
                    score,
                    Resolved { result: candidate.result, lhs_coercion: lc, rhs_coercion: rc },
                ));
            }
        }
    }
    match (best, tied) {
        (Some((_, resolved)), false) => Ok(resolved),
        (Some(_), true) => Err(OperatorResolutionError::Ambiguous),
        (None, _) => Err(OperatorResolutionError::NoMatch),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorResolutionError {
    NoMatch,
    Ambiguous,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_coercion_is_free() {
        assert_eq!(coerce(&Type::Bool, &Type::Bool), Some(Coercion::Identity));
    }

    #[test]
    fn narrower_unsigned_widens_by_zero_extension() {
        let c = coerce(
            &Type::Integer { width: 8, signed: false },
            &Type::Integer { width: 32, signed: false },
        );
        assert_eq!(c, Some(Coercion::ZeroExtend { from: 8, to: 32 }));
    }

    #[test]
    fn wider_to_narrower_integer_has_no_coercion() {
        assert_eq!(
            coerce(
                &Type::Integer { width: 32, signed: false },
                &Type::Integer { width: 8, signed: false }
            ),
            None
        );
    }

    #[test]
    fn signed_to_bool_is_truthiness() {
        assert_eq!(
            coerce(&Type::Integer { width: 32, signed: true }, &Type::Bool),
            Some(Coercion::Truthiness)
        );
    }

    #[test]
    fn optional_unwraps_to_its_element() {
        assert_eq!(
            coerce(&Type::Optional(Box::new(Type::Bool)), &Type::Bool),
            Some(Coercion::OptionalUnwrap(Box::new(Coercion::Identity)))
        );
    }

    #[test]
    fn tuples_coerce_elementwise() {
        use crate::ast::types::TupleElement;
        let src = Type::Tuple(vec![
            TupleElement { name: None, ty: Type::Integer { width: 8, signed: false } },
        ]);
        let dst = Type::Tuple(vec![
            TupleElement { name: None, ty: Type::Integer { width: 32, signed: false } },
        ]);
        assert!(matches!(coerce(&src, &dst), Some(Coercion::TupleElementwise(_))));
    }

    #[test]
    fn bytes_to_string_is_an_explicit_utf8_assumption() {
        assert_eq!(coerce(&Type::Bytes, &Type::String), Some(Coercion::BytesToString));
    }

    #[test]
    fn exact_width_candidate_beats_a_wider_one() {
        let resolved = resolve_binary(
            BinOp::Add,
            &Type::Integer { width: 8, signed: false },
            &Type::Integer { width: 8, signed: false },
        )
        .unwrap();
        assert_eq!(resolved.result, Type::Integer { width: 8, signed: false });
        assert_eq!(resolved.lhs_coercion, Coercion::Identity);
    }

    #[test]
    fn no_candidate_matches_a_bytes_addition() {
        assert_eq!(
            resolve_binary(BinOp::Add, &Type::Bytes, &Type::Bytes),
            Err(OperatorResolutionError::NoMatch)
        );
    }

    #[test]
    fn comparison_returns_bool() {
        let resolved = resolve_binary(
            BinOp::Lt,
            &Type::Integer { width: 16, signed: true },
            &Type::Integer { width: 16, signed: true },
        )
        .unwrap();
        assert_eq!(resolved.result, Type::Bool);
    }
}
