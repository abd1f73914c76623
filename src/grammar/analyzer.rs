//! Grammar analysis: nullable/FIRST/FOLLOW fixpoint and LL(1) ambiguity diagnosis (§4.3).
//!
//! The three tables are computed exactly as `binpac/grammar.cc`'s `_computeTables()`
//! describes: repeated passes over every production, each pass potentially growing a
//! nullable flag from false to true or a FIRST/FOLLOW set by unioning in more token ids,
//! until a pass changes nothing. Because the flags only ever grow (booleans flip once,
//! sets only gain members) this is guaranteed to terminate — the worklist is bounded by
//! the total number of (symbol, token) pairs in the grammar.

use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use crate::error::GrammarError;
use crate::grammar::production::{Production, ProductionKind};
use crate::grammar::Grammar;
use crate::token::TokenId;

/// Runs the nullable/FIRST/FOLLOW fixpoint and then the LL(1) disjointness check over
/// `grammar`, filling in its tables in place.
pub fn analyze(grammar: &mut Grammar) -> Result<(), GrammarError> {
    let root = Rc::clone(&grammar.root);
    let mut all = Vec::new();
    collect(&root, &mut all, &mut HashSet::new());

    loop {
        let mut changed = false;
        for p in &all {
            changed |= step_nullable(p, grammar);
        }
        if !changed {
            break;
        }
    }

    loop {
        let mut changed = false;
        for p in &all {
            changed |= step_first(p, grammar);
        }
        if !changed {
            break;
        }
    }

    // FOLLOW needs the root's own follow set seeded (end-of-data acts as a pseudo-token;
    // an empty set here just means "nothing follows the whole unit").
    grammar.set_follow(root.symbol.to_string(), Vec::new());
    loop {
        let mut changed = false;
        for p in &all {
            changed |= step_follow(p, grammar);
        }
        if !changed {
            break;
        }
    }

    check_ll1(&root, grammar)
}

fn collect(p: &Rc<Production>, out: &mut Vec<Rc<Production>>, seen: &mut HashSet<String>) {
    if !seen.insert(p.symbol.to_string()) {
        return;
    }
    out.push(Rc::clone(p));
    for child in p.children() {
        collect(&child, out, seen);
    }
}

fn step_nullable(p: &Production, grammar: &mut Grammar) -> bool {
    let was = grammar.is_nullable(&p.symbol.to_string());
    let now = match &p.kind {
        ProductionKind::Epsilon => true,
        ProductionKind::Literal { .. } | ProductionKind::Variable { .. } => false,
        ProductionKind::Sequence(items) => {
            items.iter().all(|c| grammar.is_nullable(&c.symbol.to_string()))
        }
        ProductionKind::LookAhead(items) => {
            items.iter().any(|c| grammar.is_nullable(&c.symbol.to_string()))
        }
        ProductionKind::Switch { arms, .. } => {
            arms.iter().any(|a| grammar.is_nullable(&a.body.symbol.to_string()))
        }
        ProductionKind::Boolean { then, otherwise, .. } => {
            grammar.is_nullable(&then.symbol.to_string())
                || grammar.is_nullable(&otherwise.symbol.to_string())
        }
        ProductionKind::Counter { .. } => false,
        ProductionKind::While { .. } | ProductionKind::Loop { .. } => true,
        ProductionKind::ChildGrammar { .. } => false,
        ProductionKind::Unknown => false,
    };
    if now && !was {
        grammar.set_nullable(p.symbol.to_string(), true);
        p.set_nullable(true);
        true
    } else {
        false
    }
}

fn step_first(p: &Production, grammar: &mut Grammar) -> bool {
    let mut set: Vec<TokenId> = grammar.first_of(&p.symbol.to_string()).to_vec();
    let before = set.len();
    let mut union_in = |extra: &[TokenId], set: &mut Vec<TokenId>| {
        for t in extra {
            if !set.contains(t) {
                set.push(*t);
            }
        }
    };
    match &p.kind {
        ProductionKind::Literal { token, .. } | ProductionKind::Variable { token, .. } => {
            if !set.contains(token) {
                set.push(*token);
            }
        }
        ProductionKind::Sequence(items) => {
            for item in items {
                let child_first = grammar.first_of(&item.symbol.to_string()).to_vec();
                union_in(&child_first, &mut set);
                if !grammar.is_nullable(&item.symbol.to_string()) {
                    break;
                }
            }
        }
        ProductionKind::LookAhead(items) => {
            for item in items {
                let child_first = grammar.first_of(&item.symbol.to_string()).to_vec();
                union_in(&child_first, &mut set);
            }
        }
        ProductionKind::Switch { arms, .. } => {
            for arm in arms {
                let child_first = grammar.first_of(&arm.body.symbol.to_string()).to_vec();
                union_in(&child_first, &mut set);
            }
        }
        ProductionKind::Counter { element }
        | ProductionKind::While { element }
        | ProductionKind::Loop { element } => {
            let child_first = grammar.first_of(&element.symbol.to_string()).to_vec();
            union_in(&child_first, &mut set);
        }
        ProductionKind::Boolean { then, otherwise, .. } => {
            let then_first = grammar.first_of(&then.symbol.to_string()).to_vec();
            union_in(&then_first, &mut set);
            let otherwise_first = grammar.first_of(&otherwise.symbol.to_string()).to_vec();
            union_in(&otherwise_first, &mut set);
        }
        ProductionKind::Epsilon | ProductionKind::ChildGrammar { .. } | ProductionKind::Unknown => {}
    }
    let changed = set.len() != before;
    if changed {
        p.set_first_set(set.clone());
        grammar.set_first(p.symbol.to_string(), set);
    }
    changed
}

fn step_follow(p: &Production, grammar: &mut Grammar) -> bool {
    let own_follow = grammar.follow_of(&p.symbol.to_string()).to_vec();
    let mut changed = false;
    let mut push_follow = |child: &Rc<Production>, extra: Vec<TokenId>, grammar: &mut Grammar| {
        let mut set = grammar.follow_of(&child.symbol.to_string()).to_vec();
        let before = set.len();
        for t in extra {
            if !set.contains(&t) {
                set.push(t);
            }
        }
        if set.len() != before {
            grammar.set_follow(child.symbol.to_string(), set);
            changed = true;
        }
    };
    match &p.kind {
        ProductionKind::Sequence(items) => {
            for (i, item) in items.iter().enumerate() {
                let mut extra = Vec::new();
                let mut all_nullable_tail = true;
                for later in &items[i + 1..] {
                    let later_first = grammar.first_of(&later.symbol.to_string()).to_vec();
                    for t in later_first {
                        if !extra.contains(&t) {
                            extra.push(t);
                        }
                    }
                    if !grammar.is_nullable(&later.symbol.to_string()) {
                        all_nullable_tail = false;
                        break;
                    }
                }
                if all_nullable_tail {
                    for t in &own_follow {
                        if !extra.contains(t) {
                            extra.push(*t);
                        }
                    }
                }
                push_follow(item, extra, grammar);
            }
        }
        ProductionKind::LookAhead(items) => {
            for item in items {
                push_follow(item, own_follow.clone(), grammar);
            }
        }
        ProductionKind::Switch { arms, .. } => {
            for arm in arms {
                push_follow(&arm.body, own_follow.clone(), grammar);
            }
        }
        ProductionKind::Counter { element }
        | ProductionKind::While { element }
        | ProductionKind::Loop { element } => {
            let mut extra = grammar.first_of(&element.symbol.to_string()).to_vec();
            for t in &own_follow {
                if !extra.contains(t) {
                    extra.push(*t);
                }
            }
            push_follow(element, extra, grammar);
        }
        ProductionKind::Boolean { then, otherwise, .. } => {
            push_follow(then, own_follow.clone(), grammar);
            push_follow(otherwise, own_follow.clone(), grammar);
        }
        ProductionKind::Epsilon
        | ProductionKind::Literal { .. }
        | ProductionKind::Variable { .. }
        | ProductionKind::ChildGrammar { .. }
        | ProductionKind::Unknown => {}
    }
    changed
}

/// Walks the grammar looking for a lookahead decision whose alternatives' FIRST sets
/// overlap — the one case a recursive-descent parser can't resolve with a single token of
/// lookahead.
fn check_ll1(p: &Rc<Production>, grammar: &Grammar) -> Result<(), GrammarError> {
    match &p.kind {
        ProductionKind::LookAhead(items) => {
            check_disjoint(items, grammar)?;
        }
        // A `switch` picks its arm by evaluating `scrutinee` against already-known values,
        // not by peeking upcoming bytes, so arms are free to share a byte-level FIRST set —
        // what would be ambiguous instead is two case labels claiming the same value.
        ProductionKind::Switch { arms, .. } => {
            check_case_labels_disjoint(arms, grammar)?;
        }
        _ => {}
    }
    for child in p.children() {
        check_ll1(&child, grammar)?;
    }
    Ok(())
}

fn check_case_labels_disjoint(
    arms: &[crate::grammar::production::SwitchArm],
    grammar: &Grammar,
) -> Result<(), GrammarError> {
    let mut seen_labels: HashMap<String, &str> = HashMap::new();
    let mut defaults = 0;
    for arm in arms {
        match &arm.label {
            Some(label) => {
                if let Some(prior) = seen_labels.get(label.as_str()) {
                    return Err(GrammarError::NotLL1 {
                        unit: grammar.unit.clone(),
                        conflict: format!(
                            "case `{label}` is claimed by both `{prior}` and `{}`",
                            arm.body.symbol
                        ),
                    });
                }
                seen_labels.insert(label.clone(), arm.body.symbol.0.as_str());
            }
            None => defaults += 1,
        }
    }
    if defaults > 1 {
        return Err(GrammarError::NotLL1 {
            unit: grammar.unit.clone(),
            conflict: "a switch may have at most one `*` default case".to_string(),
        });
    }
    Ok(())
}

fn check_disjoint(items: &[Rc<Production>], grammar: &Grammar) -> Result<(), GrammarError> {
    let mut seen: HashMap<TokenId, &Rc<Production>> = HashMap::new();
    for item in items {
        for token in grammar.first_of(&item.symbol.to_string()) {
            if let Some(prior) = seen.get(token) {
                return Err(GrammarError::NotLL1 {
                    unit: grammar.unit.clone(),
                    conflict: format!(
                        "`{}` and `{}` both start with token {token}",
                        prior.symbol, item.symbol
                    ),
                });
            }
            seen.insert(*token, item);
        }
        if grammar.is_nullable(&item.symbol.to_string()) && items.len() > 1 {
            return Err(GrammarError::NotLL1 {
                unit: grammar.unit.clone(),
                conflict: format!(
                    "`{}` is nullable and cannot be disambiguated by lookahead",
                    item.symbol
                ),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::production::ParserGenMeta;
    use crate::id::Id;

    fn variable(symbol: &str, render: &str) -> Rc<Production> {
        let token = crate::token::intern(render, render);
        Production::new(
            symbol,
            ProductionKind::Variable { token, ty: crate::ast::types::Type::Bytes },
        )
    }

    #[test]
    fn sequence_of_two_variables_is_not_nullable() {
        let root = Production::with_meta(
            "root",
            ProductionKind::Sequence(vec![variable("a", "uint8"), variable("b", "uint8")]),
            ParserGenMeta::default(),
        );
        let mut grammar = Grammar::new(Id::new("Packet"), root, vec![]);
        analyze(&mut grammar).unwrap();
        assert!(!grammar.is_nullable("root"));
    }

    #[test]
    fn disjoint_lookahead_analyzes_cleanly() {
        let root = Production::with_meta(
            "root",
            ProductionKind::LookAhead(vec![variable("a", "GET"), variable("b", "PUT")]),
            ParserGenMeta::default(),
        );
        let mut grammar = Grammar::new(Id::new("Method"), root, vec![]);
        assert!(analyze(&mut grammar).is_ok());
    }

    #[test]
    fn colliding_lookahead_alternatives_are_rejected() {
        let root = Production::with_meta(
            "root",
            ProductionKind::LookAhead(vec![variable("a", "same"), variable("b", "same")]),
            ParserGenMeta::default(),
        );
        let mut grammar = Grammar::new(Id::new("Ambiguous"), root, vec![]);
        assert!(matches!(analyze(&mut grammar), Err(GrammarError::NotLL1 { .. })));
    }

    #[test]
    fn loop_production_is_always_nullable() {
        let root = Production::new(
            "root",
            ProductionKind::Loop { element: variable("e", "uint8") },
        );
        let mut grammar = Grammar::new(Id::new("List"), root, vec![]);
        analyze(&mut grammar).unwrap();
        assert!(grammar.is_nullable("root"));
    }
}
