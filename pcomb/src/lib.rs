//! A tokenizer built from lexeme utilities ([Pattern](crate::lexeme::Pattern),
//! [Punctuations](crate::lexeme::Punctuations), state-mixin lexemes) that turns source text
//! into a token stream ([Lex]) for a recursive-descent front end to consume.
//!
//! The parser-combinator half of the original library (`production` — `Concat`, `Union`,
//! `SeparatedList`, and friends, plus the packrat-cache/AST machinery backing them) has been
//! trimmed: the compiler built on top of this crate hand-writes its own recursive-descent
//! front end over the token stream instead of assembling one from combinators, so that
//! machinery had no remaining caller.
//!
//! # License
//! [lang_pt](crate) is provided under the MIT license. See [LICENSE](https://github.com/creative-forest/lang-pt/blob/main/LICENSE).
mod error;
mod field_tree;
mod lex;
pub mod lexeme;
mod tokenization;
pub mod util;

pub use util::{Code, Log, Position};

use once_cell::unsync::OnceCell;
use std::fmt::Debug;
use std::hash::Hash;
use std::rc::Rc;

/// A trait implementation to generate default tokens to assign token values to the associated
/// [Lex] stream.
///
/// The non structural tokens like whitespace, line break, in javascript language do not provide any grammatical meaning.
/// Therefore these tokens can be omitted from the tokes stream to simplify the grammar and optimize the parser performance.
pub trait TokenImpl: Copy + Debug + Eq + Hash + Ord {
    fn eof() -> Self;
    fn is_structural(&self) -> bool;
}

#[derive(Debug, Hash, Clone, PartialEq, Eq)]
/// Element of the tokenized data.
pub struct Lex<TToken> {
    pub token: TToken,
    pub start: usize,
    pub end: usize,
}

/// An interface implemented by all lexeme utilities which are primary element of a tokenizer.   
pub trait ILexeme {
    type Token: Copy + Debug + Eq + Ord;
    type State: Copy + Debug + Eq + Ord;

    /// Primary tokenization method implemented by each lexeme utility.
    /// The analyzer will call this method for all the lexeme at the incremental locations of the input to create tokens.
    fn consume(
        &self,
        code: &Code,
        pointer: usize,
        tokenized_stream: &Vec<Lex<Self::Token>>,
        state_stack: &mut Vec<Self::State>,
    ) -> Option<Lex<Self::Token>>;

    fn get_grammar_field(&self) -> Vec<(Self::Token, String)>;
}

/// A trait consists of [tokenize](ITokenization::tokenize) method which takes input utf-8 string bytes and produces a tokens stream.
///
/// This interface implemented by [Tokenizer] and [CombinedTokenizer].
pub trait ITokenization {
    type Token;
    fn tokenize(&self, code: &Code) -> Result<Vec<Lex<Self::Token>>, ParseError>;
    fn build_grammar(&self) -> Result<String, std::fmt::Error>;
}

/// Base tokenization structure for lexical analysis.
///
/// The [Tokenizer] implements [ITokenization] where the [tokenize](ITokenization::tokenize) method
/// from this trait will split the input string into a token stream and return the result.
/// The [Tokenizer] object consists of lexeme utilities.
/// During tokenization, each lexeme utility will be called sequentially to get split tokens input.
///
pub struct Tokenizer<TToken = i8, TState = u8> {
    lexers: Vec<Rc<dyn ILexeme<Token = TToken, State = TState>>>,
}

/// A state-based tokenizer for lexical analysis.
///
/// A [CombinedTokenizer] consist of multiple set of lexeme utilities.
/// During tokenization lexeme utilities corresponding to the state will be called sequentially to get split tokens input.
/// A [StateMixin][crate::lexeme::StateMixin] or [ThunkStateMixin][crate::lexeme::ThunkStateMixin] can be used with to change the state stack during tokenization.
///  
/// Tokenizing a complex language syntax like template literal in javascript,
/// required implementing a separate state to tokenize template the literal part of the input.
/// Thus, a [CombinedTokenizer] allows us to define a multiple states-based lexer required to tokenize relatively complex language syntax.  
/// Similar to the [Tokenizer] a [CombinedTokenizer] also implements [ITokenization]
/// where the [tokenize](ITokenization::tokenize) method will split the input string into a stream of tokens.
///
pub struct CombinedTokenizer<TT = i8, TS = u8> {
    analyzers: Vec<(TS, Vec<Rc<dyn ILexeme<Token = TT, State = TS>>>)>,
    default_state: TS,
    debug: OnceCell<Log<&'static str>>,
}

#[derive(Debug)]
/// An error returned when the parser failed to parse the input because of the language syntax error.
pub struct ParseError {
    pub pointer: usize,
    pub message: String,
}

#[derive(Clone, Debug)]
struct FieldTree<T> {
    token: Option<T>,
    children: Vec<(u8, FieldTree<T>)>,
}

