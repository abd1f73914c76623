//! A compiler translating declarative binary-protocol descriptions (BinPAC++) into
//! executable recursive-descent parsers.
//!
//! The pipeline, leaves first: [ast] (typed modules/units/types/expressions) is built by
//! [frontend] from source text, [scope] resolves every identifier and type placeholder,
//! [grammar] lowers each unit into a production graph and runs the LL(1) fixpoint
//! analysis, [codegen] walks the analyzed grammar to emit HILTI-ish code and drive a
//! reference suspend/resume interpreter, and [runtime] supplies the Sink Engine, Filter
//! chain, and MIME Registry the generated parsers call into. [driver] ties all of this
//! into the one public entry point, [driver::Driver::compile].

pub mod ast;
pub mod codegen;
pub mod coercion;
pub mod driver;
pub mod error;
pub mod frontend;
pub mod grammar;
pub mod id;
pub mod runtime;
pub mod scope;
pub mod token;
pub mod util;

pub use codegen::interp::Value;
pub use codegen::ParseSignal;
pub use driver::{CompileOptions, CompiledModule, Driver};
pub use error::CompileError;
pub use id::Id;
