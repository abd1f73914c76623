//! Code generation: translating an analyzed [crate::grammar::Grammar] into something that
//! actually parses bytes (§4.4 Parser Generator, §4.5 Synchronizer).
//!
//! Two realizations of the same per-production emission rules live side by side:
//!
//! - [hilti] renders a unit's grammar as textual HILTI-ish intermediate code — the shape a
//!   real backend would lower to machine code, useful for inspection and golden-file tests.
//! - [interp] walks the same `Grammar`/`Production` graph directly against real input
//!   bytes, suspending and resuming exactly as the generated code would, without requiring
//!   an actual HILTI toolchain to run anything — this is what the runtime driver and the
//!   test suite exercise.
//!
//! Both share the suspend/resume vocabulary defined here.
//!
//! [parser_gen] wraps a unit's grammar as the §6 Runtime ABI descriptor a host calls
//! through; [sync_gen] is the Synchronizer (§4.5), scanning for a resynchronization
//! anchor when a parse fails on a unit or field marked `&synchronize`.

pub mod hilti;
pub mod interp;
pub mod parser_gen;
pub mod sync_gen;

use crate::error::RuntimeError;

/// A suspended parse, capturing exactly enough to resume once more bytes arrive: which
/// production was running and how far it had gotten through a `Sequence`/`Counter`/`While`.
#[derive(Debug, Clone)]
pub struct Continuation {
    /// Path of symbol names from the unit root down to the production that suspended,
    /// together with the index into any `Sequence`/`Counter` it had reached.
    pub frames: Vec<Frame>,
    /// Byte offset already consumed before suspending.
    pub offset: usize,
}

#[derive(Debug, Clone)]
pub struct Frame {
    pub symbol: String,
    pub index: usize,
}

/// What a parse step returns: progress with a value, a request for more bytes, or failure.
#[derive(Debug)]
pub enum ParseSignal<T> {
    Done(T, usize),
    Yield(Continuation),
    Error(RuntimeError),
}
