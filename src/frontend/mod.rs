//! The BinPAC++ front end (§4.0 of SPEC_FULL.md): turns source text into the [crate::ast]
//! types the rest of the pipeline consumes.
//!
//! Lexing is dogfooded straight off the vendored tokenizer: [lexer::tokenize] wires up
//! [pcomb::lexeme::Pattern]/[pcomb::lexeme::Punctuations] lexemes through a
//! [pcomb::Tokenizer], the same way a tokenizer is wired for any other language, just with
//! BinPAC++'s token set instead. The grammar proper
//! (module/unit/field/attribute/hook/statement) is walked by a hand-written
//! recursive-descent [parser::Parser] over that token stream — a parser-combinator engine
//! (`Concat`/`Union`/`SeparatedList` wiring) builds the kind of tree-shaped grammar a *user*
//! of such a library writes by hand, which has no equivalent here: this front end *is* the
//! one grammar the whole crate parses, so it is written directly rather than assembled from
//! combinators. Recursive descent is, not coincidentally, also exactly the shape §4.4's
//! parser generator itself emits for the grammars this compiler derives — see DESIGN.md.

pub mod lexer;
pub mod lower;
pub mod parser;

pub use lexer::{tokenize, SourceToken};
pub use parser::{CstModule, Parser};

use crate::ast::module::Module;
use crate::error::CompileError;

/// Lexes and parses `source`, then lowers the concrete syntax straight into [Module].
pub fn parse_module(source: &str) -> Result<Module, Vec<CompileError>> {
    let tokens = lexer::tokenize(source).map_err(|e| vec![CompileError::Parse(e)])?;
    let mut parser = Parser::new(source, &tokens);
    let cst = parser.parse_module().map_err(|e| vec![CompileError::Parse(e)])?;
    lower::lower_module(&cst).map_err(|e| e.into_iter().map(CompileError::Parse).collect())
}
