//! Whole-pipeline integration tests (§1.1 "Test tooling" — colocated `#[cfg(test)]`
//! modules cover each pass in isolation; this suite drives the public [Driver] API end to
//! end over the §8 seed scenarios S1-S6, the way the teacher's own
//! `src/examples/__tests__/{lexerless,tokenized}` suites exercise the whole library
//! against a worked JSON grammar rather than one combinator at a time).

use binpacpp::error::{CompileError, TypeError};
use binpacpp::{CompileOptions, Driver, Id, ParseSignal, Value};

fn compile(source: &str) -> binpacpp::CompiledModule {
    Driver::compile(source, &CompileOptions::default()).expect("module should compile")
}

/// S1. `U { x: uint8; y: uint16; }` parses `[0x01, 0x00, 0x02]` to `{x=1, y=2}`, and
/// splitting the same bytes across two `write`s produces an identical tree (§8 properties
/// 1 "Determinism" and 2 "Incrementality").
#[test]
fn s1_two_fixed_width_fields_parse_deterministically_whole_or_in_two_chunks() {
    let compiled = compile("module S1; export Packet; type Packet = unit { x: uint8; y: uint16; };");
    let unit = Id::new("Packet");

    let whole = compiled.parse(&unit, &[0x01, 0x00, 0x02], true);
    match whole {
        ParseSignal::Done(Value::Unit(fields), consumed) => {
            assert_eq!(consumed, 3);
            assert_eq!(fields.get("x"), Some(&Value::Integer(1)));
            assert_eq!(fields.get("y"), Some(&Value::Integer(2)));
        }
        other => panic!("expected a parsed Packet, got {other:?}"),
    }

    let partial = compiled.parse(&unit, &[0x01], false);
    assert!(matches!(partial, ParseSignal::Yield(_)), "short input must yield, not fail");
    let resumed = compiled.parse(&unit, &[0x01, 0x00, 0x02], true);
    assert_eq!(format!("{whole:?}"), format!("{resumed:?}"));
}

/// S2. `xs: uint8[3]` on `[1,2,3,4]` parses exactly `[1,2,3]`, leaving the trailing byte
/// unconsumed rather than erroring on it.
#[test]
fn s2_fixed_length_list_stops_at_its_count_and_ignores_the_remainder() {
    let compiled = compile("module S2; export Packet; type Packet = unit { xs: uint8[3]; };");
    let unit = Id::new("Packet");
    match compiled.parse(&unit, &[1, 2, 3, 4], true) {
        ParseSignal::Done(Value::Unit(fields), consumed) => {
            assert_eq!(consumed, 3);
            assert_eq!(
                fields.get("xs"),
                Some(&Value::List(vec![Value::Integer(1), Value::Integer(2), Value::Integer(3)]))
            );
        }
        other => panic!("unexpected signal: {other:?}"),
    }
}

/// S3. `xs: uint8[] &until($$ == 0xFF)` on `[1,2,0xFF,99]` stops right after the matching
/// element, leaving the trailing byte unconsumed.
#[test]
fn s3_until_list_stops_after_the_matching_element() {
    let compiled =
        compile("module S3; export Packet; type Packet = unit { xs: uint8[] &until($$ == 255); };");
    let unit = Id::new("Packet");
    match compiled.parse(&unit, &[1, 2, 255, 99], true) {
        ParseSignal::Done(Value::Unit(fields), consumed) => {
            assert_eq!(consumed, 3);
            assert_eq!(
                fields.get("xs"),
                Some(&Value::List(vec![Value::Integer(1), Value::Integer(2), Value::Integer(255)]))
            );
        }
        other => panic!("unexpected signal: {other:?}"),
    }
}

/// S4. A `switch` field keyed on an already-parsed tag picks the matching arm, rejects a
/// tag with no matching case, and yields while the chosen arm's body is still incomplete.
#[test]
fn s4_switch_field_chooses_the_matching_arm() {
    let compiled = compile(
        "module S4; export Cmd; type Cmd = unit { \
            tag: uint8; \
            switch (tag) { \
                case 1 -> body: bytes &length=4; \
                case 2 -> body: bytes &length=2; \
            }; \
        };",
    );
    let unit = Id::new("Cmd");

    match compiled.parse(&unit, &[1, b'H', b'E', b'L', b'O'], true) {
        ParseSignal::Done(Value::Unit(fields), consumed) => {
            assert_eq!(consumed, 5);
            assert_eq!(fields.get("body"), Some(&Value::Bytes(b"HELO".to_vec())));
        }
        other => panic!("expected tag 1 to pick the 4-byte arm, got {other:?}"),
    }
    match compiled.parse(&unit, &[2, b'O', b'K'], true) {
        ParseSignal::Done(Value::Unit(fields), consumed) => {
            assert_eq!(consumed, 3);
            assert_eq!(fields.get("body"), Some(&Value::Bytes(b"OK".to_vec())));
        }
        other => panic!("expected tag 2 to pick the 2-byte arm, got {other:?}"),
    }
    assert!(
        matches!(compiled.parse(&unit, &[9, 0, 0], true), ParseSignal::Error(_)),
        "a tag with no matching case and no default must fail, not silently succeed"
    );
    assert!(
        matches!(compiled.parse(&unit, &[1, b'H', b'E'], false), ParseSignal::Yield(_)),
        "a chosen arm short of its full length must yield, not fail"
    );
}

/// S5. A unit marked `%synchronize-after = b"\r\n"` recovers after a parse error mid-record
/// and resumes just past the anchor (§4.5 Synchronizer, `parse_with_recovery`).
#[test]
fn s5_synchronize_after_recovers_past_the_anchor() {
    let compiled = compile(
        "module S5; export Line; type Line = unit { n: uint8; %synchronize-after = b\"\\r\\n\"; };",
    );
    let unit = Id::new("Line");

    // `n` wants exactly one byte, but the input is garbage followed by a CRLF anchor — a
    // plain parse fails; recovery should land just past the "\r\n".
    let garbage_then_anchor = b"\xffgarbage\r\nmore".to_vec();
    match compiled.parse(&unit, &garbage_then_anchor, true) {
        ParseSignal::Error(_) => {}
        other => panic!("expected the unrecovered parse to fail first, got {other:?}"),
    }
    match compiled.parse_with_recovery(&unit, &garbage_then_anchor, true) {
        ParseSignal::Done(..) => {}
        other => panic!("expected recovery to find the anchor and resume, got {other:?}"),
    }
}

/// §9 Open Question, resolved: an `embedded` field with no concrete type argument is
/// rejected at grammar-build time rather than silently accepted.
#[test]
fn untyped_embedded_object_field_is_a_compile_error() {
    let source = "module Untyped; export Packet; type Packet = unit { obj: embedded; };";
    let errors = Driver::compile(source, &CompileOptions::default())
        .expect_err("an untyped embedded-object field must not compile");
    assert!(
        errors.iter().any(|e| matches!(e, CompileError::Type(TypeError::UntypedEmbeddedObject { .. }))),
        "expected an UntypedEmbeddedObject error, got {errors:?}"
    );
}

/// S6. Two parsers attached to one sink both observe every byte written to it.
#[test]
fn s6_sink_delivers_every_written_byte_to_every_attached_parser() {
    use binpacpp::runtime::Sink;

    let compiled = compile("module S6; export Echo; type Echo = unit { body: bytes; };");
    let parser = compiled.parser(&Id::new("Echo")).expect("Echo should be exported").clone();

    let mut sink = Sink::new();
    sink.attach(parser.clone());
    sink.attach(parser);

    sink.write(b"hello, ").unwrap();
    sink.write(b"world").unwrap();
    sink.close().unwrap();

    assert_eq!(sink.attached_count(), 0, "both parsers should have completed and been removed");
}
