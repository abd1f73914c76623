//! Small utilities shared across the compiler passes.
//!
//! [Code] and [Position] are re-exported from [pcomb], the vendored parser-combinator
//! engine that also implements the BinPAC++ front end (§4.0 of SPEC_FULL.md) — there is
//! no reason to keep two copies of byte-offset-to-line/column bookkeeping around.

mod log;

pub use log::init_logger;
pub use pcomb::util::{Code, Position};
