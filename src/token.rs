//! Process-wide token-ID interner (§1.2 supplemented feature, grounded in
//! `binpac/production.h`'s `Literal::tokenID()`).
//!
//! Every literal terminal that can appear in a lookahead decision needs a stable, small
//! positive integer identity shared across however many units get compiled in the same
//! process — the generated scanner switches on these ids. Two literals with the same
//! rendered text *and* the same type (e.g. the regexp `/abc/` used once as a `bytes`
//! pattern and once as a `string` pattern) are still distinct tokens, hence the pair key.
//!
//! Compilation can happen from more than one thread (embedders may compile several
//! independent modules concurrently), so inserts are serialized behind a mutex.

use std::collections::HashMap;
use std::sync::Mutex;

use once_cell::sync::Lazy;

/// A stable identity for one lexical token kind, unique within the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TokenId(u32);

impl TokenId {
    pub fn value(self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for TokenId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

struct Interner {
    next: u32,
    ids: HashMap<(String, String), TokenId>,
}

impl Interner {
    fn new() -> Self {
        Self {
            next: 1,
            ids: HashMap::new(),
        }
    }

    fn intern(&mut self, terminal_render: &str, type_render: &str) -> TokenId {
        let key = (terminal_render.to_string(), type_render.to_string());
        if let Some(id) = self.ids.get(&key) {
            return *id;
        }
        let id = TokenId(self.next);
        self.next += 1;
        self.ids.insert(key, id);
        id
    }
}

static INTERNER: Lazy<Mutex<Interner>> = Lazy::new(|| Mutex::new(Interner::new()));

/// Returns the stable id for the literal that renders as `terminal_render` at type
/// `type_render`, allocating a fresh one on first use.
pub fn intern(terminal_render: &str, type_render: &str) -> TokenId {
    INTERNER
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .intern(terminal_render, type_render)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_render_and_type_share_an_id() {
        let a = intern("GET", "bytes");
        let b = intern("GET", "bytes");
        assert_eq!(a, b);
    }

    #[test]
    fn same_render_different_type_are_distinct() {
        let a = intern("abc", "bytes");
        let b = intern("abc", "string");
        assert_ne!(a, b);
    }

    #[test]
    fn ids_are_monotonically_assigned() {
        let a = intern("__unique_marker_one__", "bytes");
        let b = intern("__unique_marker_two__", "bytes");
        assert!(b.value() > a.value());
    }
}
