//! Sink Engine (§4.6) — the runtime fan-out multiplexer that routes written bytes through
//! an optional [FilterChain] into every attached parser, each parsing independently and
//! in isolation from its siblings' failures.
//!
//! **Redesign relative to the original** (§1.2 supplemented feature, REDESIGN FLAGS): the
//! original C `sink_write` aborts the whole write on the first attached parser's error,
//! which would propagate to siblings. Spec §4.6 explicitly redefines this — "a parser's
//! error does not abort siblings" — and that is what [Sink::write] implements: a failing
//! attachment is marked errored and removed, the loop continues to the next one.

use std::collections::HashMap;

use crate::codegen::interp::Value;
use crate::codegen::parser_gen::ParserInfo;
use crate::codegen::ParseSignal;
use crate::error::RuntimeError;
use crate::id::Id;
use crate::runtime::filter::FilterChain;
use crate::runtime::mime::MimeRegistry;

/// One `(parser, parse-object, pending-input, suspended-continuation?)` entry (§3 "Sink
/// (runtime entity)"). This reference implementation's "continuation" is simply the
/// accumulated buffer — see [crate::codegen::interp]'s module doc for why whole-buffer
/// re-parse stands in for captured continuations here.
struct Attachment {
    parser: ParserInfo,
    #[allow(dead_code)]
    cookie: Option<String>,
    buffer: Vec<u8>,
}

/// What became of one attachment once it stopped being "still parsing" — recorded in
/// [Sink]'s `history` at the moment an attachment is removed, since §4.6 "completed
/// parsers are removed" from the live list but a caller still wants to know the result.
#[derive(Clone)]
pub enum Outcome {
    Done(Value),
    Errored,
}

pub struct Sink {
    attached: Vec<Attachment>,
    history: HashMap<Id, Outcome>,
    filters: FilterChain,
    in_write: bool,
}

impl Default for Sink {
    fn default() -> Self {
        Self::new()
    }
}

impl Sink {
    pub fn new() -> Self {
        Self { attached: Vec::new(), history: HashMap::new(), filters: FilterChain::new(), in_write: false }
    }

    /// §4.6 `attach(parser, parse-object)`: appends to the attached list. The actual
    /// parse starts lazily on the sink's first `write` (or immediately on `close` if no
    /// bytes ever arrive), matching "starts a parse on the first write".
    pub fn attach(&mut self, parser: ParserInfo) {
        self.attach_with_cookie(parser, None);
    }

    /// §6 `new_func(sink, mime) -> parse_object`/`parse_func_sink(..., user_cookie)`: MIME
    /// dispatch attaches with a caller-supplied cookie instead of a bare parser handle.
    pub fn attach_with_cookie(&mut self, parser: ParserInfo, cookie: Option<String>) {
        self.history.remove(&parser.unit);
        self.attached.push(Attachment { parser, cookie, buffer: Vec::new() });
    }

    /// §4.6 `detach(parse-object)`: freezes that parser's pending input, resumes it once
    /// so it observes EOF, and removes it from the attached list, returning whatever it
    /// produced.
    pub fn detach(&mut self, unit: &Id) -> Option<Value> {
        let idx = self.attached.iter().position(|a| &a.parser.unit == unit)?;
        let attachment = self.attached.remove(idx);
        match finish(attachment) {
            Outcome::Done(value) => {
                self.history.insert(unit.clone(), Outcome::Done(value.clone()));
                Some(value)
            }
            outcome @ Outcome::Errored => {
                self.history.insert(unit.clone(), outcome);
                None
            }
        }
    }

    /// §4.6 `write(bytes)`. Pipes `bytes` through the filter chain, then delivers the
    /// result to every still-pending attached parser **in attach order** (§5 ordering
    /// guarantee), each building on its own accumulated buffer. A parser that errors is
    /// marked errored and dropped; it does not stop delivery to the parsers after it in
    /// the list. Re-entrant calls (a hook writing into the sink it is itself being fed
    /// from) are rejected — §4.6 "must raise".
    pub fn write(&mut self, bytes: &[u8]) -> Result<(), RuntimeError> {
        if self.in_write {
            return Err(RuntimeError::Type { message: "re-entrant sink write".to_string() });
        }
        self.in_write = true;
        let delivered = self.filters.write(bytes);
        let delivered = match delivered {
            Ok(bytes) => bytes,
            Err(e) => {
                self.in_write = false;
                return Err(e);
            }
        };
        let mut finished = Vec::new();
        for attachment in &mut self.attached {
            attachment.buffer.extend_from_slice(&delivered);
            match attachment.parser.parse(&attachment.buffer, false) {
                ParseSignal::Done(value, _) => finished.push((attachment.parser.unit.clone(), Outcome::Done(value))),
                ParseSignal::Yield(_) => {}
                ParseSignal::Error(_) => finished.push((attachment.parser.unit.clone(), Outcome::Errored)),
            }
        }
        // §4.6 "Completed parsers are removed" — drop them from the live list, record the
        // result so a caller (or [Sink::outcomes]) can still observe it.
        for (unit, outcome) in finished {
            self.attached.retain(|a| a.parser.unit != unit);
            self.history.insert(unit, outcome);
        }
        self.in_write = false;
        Ok(())
    }

    /// §4.6 `close()`: freezes and resumes every still-attached parser once (so each sees
    /// EOF), flushes the filter chain, then clears the attached list.
    pub fn close(&mut self) -> Result<(), RuntimeError> {
        let tail = self.filters.close();
        let tail_bytes = tail.as_ref().ok().cloned().unwrap_or_default();
        for attachment in self.attached.drain(..) {
            let unit = attachment.parser.unit.clone();
            let mut attachment = attachment;
            if !tail_bytes.is_empty() {
                attachment.buffer.extend_from_slice(&tail_bytes);
            }
            let outcome = finish(attachment);
            self.history.insert(unit, outcome);
        }
        tail.map(|_| ())
    }

    pub fn add_filter(&mut self, filter: Box<dyn crate::runtime::filter::Filter>) {
        self.filters.push(filter);
    }

    /// §4.6/§4.7 `connect_by_mime`: attaches every parser the [MimeRegistry] has
    /// registered for `mime_type` (exact, major-only, wildcard — in that order), each
    /// getting a fresh attachment as its `%new` hook would produce.
    pub fn connect_by_mime(&mut self, mime_type: &str, registry: &MimeRegistry) {
        for parser in registry.resolve(mime_type) {
            self.attach_with_cookie(parser, Some(mime_type.to_string()));
        }
    }

    /// Results recorded so far, by unit id — `None` for attachments still parsing,
    /// `Some(Outcome)` once they have finished (§4.6 "completed parsers are removed",
    /// but the outcome is kept here for a caller/test to inspect). Not itself one of
    /// §4.6's named operations.
    pub fn outcomes(&self) -> HashMap<Id, Option<&Outcome>> {
        let mut out: HashMap<Id, Option<&Outcome>> =
            self.attached.iter().map(|a| (a.parser.unit.clone(), None)).collect();
        for (unit, outcome) in &self.history {
            out.insert(unit.clone(), Some(outcome));
        }
        out
    }

    pub fn attached_count(&self) -> usize {
        self.attached.len()
    }
}

fn finish(mut attachment: Attachment) -> Outcome {
    match attachment.parser.parse(&attachment.buffer, true) {
        ParseSignal::Done(value, _) => Outcome::Done(value),
        ParseSignal::Yield(_) | ParseSignal::Error(_) => Outcome::Errored,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::types::Type;
    use crate::ast::unit::Unit;
    use crate::codegen::interp::GrammarTable;
    use crate::grammar::production::{ParserGenMeta, Production, ProductionKind};
    use crate::grammar::Grammar;
    use crate::runtime::filter::Filter;
    use crate::util::Position;
    use std::rc::Rc;

    /// A one-field `bytes`-typed unit with no `&length`: per [crate::codegen::interp]'s
    /// `exec_variable`, it consumes everything left in the buffer once frozen — exactly
    /// the "echo whatever the sink fed me" parser the sink-fairness test (§8 S6) needs.
    fn echo_parser(name: &str) -> ParserInfo {
        let token = crate::token::intern("bytes", "bytes");
        let root =
            Production::with_meta("body", ProductionKind::Variable { token, ty: Type::Bytes }, ParserGenMeta::default());
        let id = Id::new(name);
        let grammar = Grammar::new(id.clone(), root, vec![]);
        let mut grammars = GrammarTable::new();
        grammars.insert(id.clone(), grammar);

        let at = Position::new(1, 1);
        let unit = Unit {
            id,
            parameters: vec![],
            variables: vec![],
            fields: vec![],
            properties: crate::ast::attribute::AttributeSet::new(),
            hooks: vec![],
            at,
        };
        ParserInfo::new(&unit, Rc::new(grammars))
    }

    fn bytes_of(value: &Value) -> Vec<u8> {
        match value {
            Value::Unit(fields) => match fields.get("body") {
                Some(Value::Bytes(b)) => b.clone(),
                _ => panic!("expected a body field"),
            },
            Value::Bytes(b) => b.clone(),
            other => panic!("unexpected value: {other:?}"),
        }
    }

    fn done_bytes<'a>(outcomes: &'a HashMap<Id, Option<&'a Outcome>>, unit: &Id) -> Vec<u8> {
        match outcomes.get(unit) {
            Some(Some(Outcome::Done(value))) => bytes_of(value),
            other => panic!("expected a Done outcome, got {:?} results", other.is_some()),
        }
    }

    #[test]
    fn two_attached_parsers_both_observe_every_written_byte() {
        let mut sink = Sink::new();
        let p1 = echo_parser("P1");
        let p2 = echo_parser("P2");
        sink.attach(p1.clone());
        sink.attach(p2.clone());

        sink.write(b"hello, ").unwrap();
        sink.write(b"world").unwrap();
        sink.close().unwrap();

        let outcomes = sink.outcomes();
        assert_eq!(done_bytes(&outcomes, &p1.unit), b"hello, world");
        assert_eq!(done_bytes(&outcomes, &p2.unit), b"hello, world");
    }

    struct XorFilter(u8);
    impl Filter for XorFilter {
        fn name(&self) -> &str {
            "xor"
        }
        fn decode(&mut self, input: &[u8]) -> Result<Vec<u8>, RuntimeError> {
            Ok(input.iter().map(|b| b ^ self.0).collect())
        }
    }

    #[test]
    fn filter_transforms_bytes_before_they_reach_the_parser() {
        let mut sink = Sink::new();
        let p = echo_parser("Filtered");
        sink.attach(p.clone());
        sink.add_filter(Box::new(XorFilter(0xFF)));

        let plaintext = b"secret";
        let scrambled: Vec<u8> = plaintext.iter().map(|b| b ^ 0xFF).collect();
        sink.write(&scrambled).unwrap();
        sink.close().unwrap();

        let outcomes = sink.outcomes();
        assert_eq!(done_bytes(&outcomes, &p.unit), plaintext);
    }

    #[test]
    fn rejects_reentrant_writes() {
        let mut sink = Sink::new();
        sink.in_write = true;
        assert!(sink.write(b"x").is_err());
    }

    #[test]
    fn detach_freezes_and_removes_the_attachment() {
        let mut sink = Sink::new();
        let p = echo_parser("Solo");
        sink.attach(p.clone());
        sink.write(b"partial").unwrap();

        let value = sink.detach(&p.unit);
        assert_eq!(bytes_of(&value.unwrap()), b"partial");
        assert_eq!(sink.attached_count(), 0);
    }

    #[test]
    fn a_sibling_error_does_not_stop_the_other_attachment() {
        // A unit field with an unsatisfiable &length never completes; it errors out once
        // frozen rather than blocking its sibling's own completion.
        let token = crate::token::intern("bytes4", "bytes");
        let root = Production::with_meta(
            "body",
            ProductionKind::Variable { token, ty: Type::Bytes },
            ParserGenMeta {
                length_expr: Some(crate::ast::expr::Expr::new(
                    crate::ast::expr::ExprKind::Literal(crate::ast::ctor::Ctor::Integer(-1)),
                    Position::new(1, 1),
                )),
                ..ParserGenMeta::default()
            },
        );
        let bad_id = Id::new("Bad");
        let grammar = Grammar::new(bad_id.clone(), root, vec![]);
        let mut grammars = GrammarTable::new();
        grammars.insert(bad_id.clone(), grammar);
        let unit = Unit {
            id: bad_id.clone(),
            parameters: vec![],
            variables: vec![],
            fields: vec![],
            properties: crate::ast::attribute::AttributeSet::new(),
            hooks: vec![],
            at: Position::new(1, 1),
        };
        let bad_parser = ParserInfo::new(&unit, Rc::new(grammars));

        let mut sink = Sink::new();
        let good = echo_parser("Good");
        sink.attach(bad_parser.clone());
        sink.attach(good.clone());

        sink.write(b"data").unwrap();
        sink.close().unwrap();

        let outcomes = sink.outcomes();
        assert!(matches!(outcomes.get(&bad_parser.unit), Some(Some(Outcome::Errored))));
        assert_eq!(done_bytes(&outcomes, &good.unit), b"data");
    }
}
