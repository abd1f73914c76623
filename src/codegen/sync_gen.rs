//! Synchronizer (§4.5): scans forward in the input for an anchor after a parse error, so a
//! unit or field marked `&synchronize` can recover a record boundary instead of aborting
//! the whole parse.
//!
//! This generalizes lookahead-based scanning (peek one token, decide which alternative
//! production to take) from "pick a production by peeking one token" to "skip arbitrary
//! bytes until a token reappears".

use regex::bytes::Regex;

use crate::ast::expr::{Expr, ExprKind};
use crate::ast::types::Type;
use crate::ast::unit::Unit;
use crate::error::{GrammarError, RuntimeError};
use crate::id::Id;

/// What the scan is looking for (§4.5 "Anchor kinds").
#[derive(Debug, Clone)]
pub enum Anchor {
    Literal(Vec<u8>),
    Regexp(String),
    /// Scans for the embedded-object marker the runtime stamps ahead of a value of `ty`
    /// (§9 Open Question, resolved: the typed form is authoritative).
    EmbeddedObject(Type),
    /// Scans for the next user-placed mark (a runtime primitive out of this crate's
    /// scope, §1 — we recognize it by the same sentinel byte sequence the mark-setting
    /// hook call would stamp into the stream).
    Mark,
}

/// Whether the recovered iterator sits on the anchor or past it (§4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Policy {
    At,
    After,
}

#[derive(Debug, Clone)]
pub struct SyncSpec {
    pub anchor: Anchor,
    pub policy: Policy,
}

/// Sentinel byte sequences standing in for the runtime's opaque embedded-object / mark
/// wire markers (§1 treats the marker format itself as an external-collaborator detail;
/// we only need *a* distinguishable marker to drive the scan, not the real one).
const EMBEDDED_OBJECT_MARKER: &[u8] = b"\x00BPO\x00";
const MARK_MARKER: &[u8] = b"\x00BPM\x00";

/// Reads `%synchronize-after`/`%synchronize-at` off a unit's properties, falling back to
/// `GrammarError::MissingSynchronizationPoint` when the unit requests synchronization
/// (`unit.requests_synchronize()`) but names no anchor.
pub fn anchor_for_unit(unit: &Unit) -> Result<Option<SyncSpec>, GrammarError> {
    if let Some(expr) = unit.properties.value_of("synchronize-after") {
        return Ok(Some(SyncSpec { anchor: anchor_from_expr(expr)?, policy: Policy::After }));
    }
    if let Some(expr) = unit.properties.value_of("synchronize-at") {
        return Ok(Some(SyncSpec { anchor: anchor_from_expr(expr)?, policy: Policy::At }));
    }
    if unit.requests_synchronize() {
        return Err(GrammarError::MissingSynchronizationPoint { unit: unit.id.clone() });
    }
    Ok(None)
}

fn anchor_from_expr(expr: &Expr) -> Result<Anchor, GrammarError> {
    match &expr.kind {
        ExprKind::Literal(ctor) if ctor.is_regexp() => Ok(Anchor::Regexp(ctor.terminal_render())),
        ExprKind::Literal(ctor) => Ok(Anchor::Literal(literal_bytes(ctor))),
        _ => Ok(Anchor::Literal(Vec::new())),
    }
}

fn literal_bytes(ctor: &crate::ast::ctor::Ctor) -> Vec<u8> {
    match ctor {
        crate::ast::ctor::Ctor::Bytes(b) => b.clone(),
        other => other.terminal_render().into_bytes(),
    }
}

/// Result of one scan attempt.
pub enum ScanResult {
    /// The anchor was found; the returned offset already accounts for `policy`.
    Found(usize),
    /// No anchor yet, but the buffer isn't frozen — ask the caller for more bytes.
    NeedMoreData,
    /// The buffer is frozen and the anchor will never appear.
    NotFound,
}

/// Scans `buf[from..]` for `spec`'s anchor, honoring `frozen` exactly as §4.5 describes:
/// "on hitting end-of-data without a match, if the input is frozen -> raise a
/// non-recoverable synchronization error; otherwise suspend and retry on resume."
pub fn scan(spec: &SyncSpec, buf: &[u8], from: usize, frozen: bool) -> ScanResult {
    let found = match &spec.anchor {
        Anchor::Literal(needle) => find_literal(buf, from, needle),
        Anchor::Regexp(pattern) => find_regexp(buf, from, pattern),
        Anchor::EmbeddedObject(_) => find_literal(buf, from, EMBEDDED_OBJECT_MARKER),
        Anchor::Mark => find_literal(buf, from, MARK_MARKER),
    };
    match found {
        Some((start, end)) => {
            let offset = match spec.policy {
                Policy::At => start,
                Policy::After => end,
            };
            ScanResult::Found(offset)
        }
        None if frozen => ScanResult::NotFound,
        None => ScanResult::NeedMoreData,
    }
}

/// Runs [scan] and turns the three-way result into the `Result<usize, RuntimeError>` shape
/// a driver loop actually wants: `Ok(offset)` once recovered, `Err` when recovery is
/// impossible (caller must treat `NeedMoreData` as a yield, not an error, before calling
/// this).
pub fn recover(unit: &Id, spec: &SyncSpec, buf: &[u8], from: usize) -> Result<usize, RuntimeError> {
    match scan(spec, buf, from, true) {
        ScanResult::Found(offset) => Ok(offset),
        _ => Err(RuntimeError::Synchronization { unit: unit.clone() }),
    }
}

fn find_literal(buf: &[u8], from: usize, needle: &[u8]) -> Option<(usize, usize)> {
    if needle.is_empty() || from > buf.len() {
        return None;
    }
    buf[from..]
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|rel| (from + rel, from + rel + needle.len()))
}

fn find_regexp(buf: &[u8], from: usize, pattern: &str) -> Option<(usize, usize)> {
    if from > buf.len() {
        return None;
    }
    let re = Regex::new(pattern).ok()?;
    re.find(&buf[from..]).map(|m| (from + m.start(), from + m.end()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_anchor_recovers_past_crlf() {
        let spec = SyncSpec { anchor: Anchor::Literal(b"\r\n".to_vec()), policy: Policy::After };
        let buf = b"garbage\r\nnext-record";
        match scan(&spec, buf, 0, true) {
            ScanResult::Found(offset) => assert_eq!(&buf[offset..], b"next-record"),
            _ => panic!("expected a match"),
        }
    }

    #[test]
    fn synchronize_at_leaves_iterator_on_the_anchor() {
        let spec = SyncSpec { anchor: Anchor::Literal(b"\r\n".to_vec()), policy: Policy::At };
        let buf = b"xx\r\nyy";
        match scan(&spec, buf, 0, true) {
            ScanResult::Found(offset) => assert_eq!(&buf[offset..], b"\r\nyy"),
            _ => panic!("expected a match"),
        }
    }

    #[test]
    fn unresolved_anchor_suspends_until_frozen() {
        let spec = SyncSpec { anchor: Anchor::Literal(b"\r\n".to_vec()), policy: Policy::After };
        assert!(matches!(scan(&spec, b"no-anchor-yet", 0, false), ScanResult::NeedMoreData));
        assert!(matches!(scan(&spec, b"no-anchor-yet", 0, true), ScanResult::NotFound));
    }

    #[test]
    fn regexp_anchor_matches_bytes() {
        let spec = SyncSpec { anchor: Anchor::Regexp("[A-Z]{4}".to_string()), policy: Policy::At };
        let buf = b"...HELO...";
        match scan(&spec, buf, 0, true) {
            ScanResult::Found(offset) => assert_eq!(&buf[offset..offset + 4], b"HELO"),
            _ => panic!("expected a regexp match"),
        }
    }

    #[test]
    fn missing_anchor_on_a_synchronizing_unit_is_a_grammar_error() {
        use crate::ast::attribute::{Attribute, AttributeSet};
        use crate::util::Position;

        let at = Position::new(1, 1);
        let mut properties = AttributeSet::new();
        properties.insert(Attribute { name: "synchronize".to_string(), value: None, at });
        let unit = Unit {
            id: Id::new("Broken"),
            parameters: vec![],
            variables: vec![],
            fields: vec![],
            properties,
            hooks: vec![],
            at,
        };
        assert!(matches!(
            anchor_for_unit(&unit),
            Err(GrammarError::MissingSynchronizationPoint { .. })
        ));
    }
}
