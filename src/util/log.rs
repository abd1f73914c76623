//! Thin wrapper around the `log` facade.
//!
//! The compiler itself only ever calls `log::{trace,debug,warn,error}!` — it never picks
//! a backend. Embedders of this crate install whatever `log` implementation suits them.
//! `init_logger` is a convenience for the test suite that wants colored output on stderr,
//! mirroring how `y-lang`'s `why` binary wires `simple_logger` in front of `log`; the CLI
//! tool itself is out of scope here (§1), so this never runs outside tests.

/// Installs a `simple_logger` backend at the given level. Test-only: library code must
/// never call this on behalf of an embedder.
#[cfg(test)]
pub fn init_logger(level: log::LevelFilter) {
    let _ = simple_logger::init_with_level(level.to_level().unwrap_or(log::Level::Warn));
}

#[cfg(not(test))]
pub fn init_logger(_level: log::LevelFilter) {}
