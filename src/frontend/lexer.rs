//! Lexing (§4.0, §6 "Input language"): splits BinPAC++ source text into a token stream
//! using the vendored tokenizer crate's own lexeme utilities — `Pattern`/`Punctuations`
//! building blocks wired through a [pcomb::Tokenizer], with BinPAC++'s own token set.

use std::rc::Rc;

use pcomb::lexeme::{Pattern, Punctuations};
use pcomb::{Code, ILexeme, ITokenization, Lex, TokenImpl, Tokenizer};

use crate::error::ParseError as CompileParseError;
use crate::util::Position;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SourceToken {
    Eof,
    Space,
    Comment,
    Float,
    Integer,
    BytesLit,
    RegexpLit,
    StringLit,
    Ident,
    LBrace,
    RBrace,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Semi,
    Colon,
    Comma,
    Dot,
    EqEq,
    NotEq,
    LtEq,
    GtEq,
    Lt,
    Gt,
    Eq,
    AmpAmp,
    PipePipe,
    Amp,
    Pipe,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    DollarDollar,
    Question,
    Bang,
    Caret,
    Tilde,
}

impl TokenImpl for SourceToken {
    fn eof() -> Self {
        SourceToken::Eof
    }

    fn is_structural(&self) -> bool {
        !matches!(self, SourceToken::Space | SourceToken::Comment)
    }
}

/// One lexed token together with the byte span it came from, kept around so the parser can
/// report positions and slice out literal text without re-scanning.
#[derive(Debug, Clone)]
pub struct TokenSpan {
    pub token: SourceToken,
    pub start: usize,
    pub end: usize,
}

/// Tokenizes `source`, filtering out non-structural tokens (whitespace, comments) eagerly
/// rather than lazily, since the hand-rolled recursive-descent parser (§4.0) just walks a
/// plain `Vec` of the filtered tokens.
pub fn tokenize(source: &str) -> Result<Vec<TokenSpan>, CompileParseError> {
    let code: Code<'_> = source.into();
    let lexers: Vec<Rc<dyn ILexeme<Token = SourceToken, State = u8>>> = vec![
        Rc::new(Pattern::new(SourceToken::Comment, r"^//[^\n]*").unwrap()),
        Rc::new(Pattern::new(SourceToken::Space, r"^[ \t\r\n]+").unwrap()),
        Rc::new(Pattern::new(SourceToken::Float, r"^[0-9]+\.[0-9]+").unwrap()),
        Rc::new(Pattern::new(SourceToken::Integer, r"^(0x[0-9a-fA-F]+|[0-9]+)").unwrap()),
        Rc::new(Pattern::new(SourceToken::BytesLit, r#"^b"([^"\\]|\\.)*""#).unwrap()),
        Rc::new(Pattern::new(SourceToken::RegexpLit, r"^/([^/\\\n]|\\.)+/").unwrap()),
        Rc::new(Pattern::new(SourceToken::StringLit, r#"^"([^"\\]|\\.)*""#).unwrap()),
        Rc::new(
            Punctuations::new(vec![
                ("{", SourceToken::LBrace),
                ("}", SourceToken::RBrace),
                ("(", SourceToken::LParen),
                (")", SourceToken::RParen),
                ("[", SourceToken::LBracket),
                ("]", SourceToken::RBracket),
                (";", SourceToken::Semi),
                (":", SourceToken::Colon),
                (",", SourceToken::Comma),
                (".", SourceToken::Dot),
                ("==", SourceToken::EqEq),
                ("!=", SourceToken::NotEq),
                ("<=", SourceToken::LtEq),
                (">=", SourceToken::GtEq),
                ("<", SourceToken::Lt),
                (">", SourceToken::Gt),
                ("=", SourceToken::Eq),
                ("&&", SourceToken::AmpAmp),
                ("||", SourceToken::PipePipe),
                ("&", SourceToken::Amp),
                ("|", SourceToken::Pipe),
                ("+", SourceToken::Plus),
                ("-", SourceToken::Minus),
                ("*", SourceToken::Star),
                ("%", SourceToken::Percent),
                ("$$", SourceToken::DollarDollar),
                ("?", SourceToken::Question),
                ("!", SourceToken::Bang),
                ("^", SourceToken::Caret),
                ("~", SourceToken::Tilde),
            ])
            .unwrap(),
        ),
        Rc::new(Pattern::new(SourceToken::Ident, r"^[A-Za-z_][A-Za-z0-9_]*").unwrap()),
    ];
    let tokenizer = Tokenizer::new(lexers);
    let stream: Vec<Lex<SourceToken>> = tokenizer.tokenize(&code).map_err(|e| CompileParseError::Syntax {
        at: code.obtain_position(e.pointer),
        message: e.message,
    })?;
    Ok(stream
        .into_iter()
        .filter(|lex| lex.token.is_structural())
        .map(|lex| TokenSpan { token: lex.token, start: lex.start, end: lex.end })
        .collect())
}

pub fn position_of(source: &str, offset: usize) -> Position {
    let code: Code<'_> = source.into();
    code.obtain_position(offset)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenizes_a_minimal_unit() {
        let tokens = tokenize("unit U { x: uint8; };").unwrap();
        let kinds: Vec<SourceToken> = tokens.iter().map(|t| t.token).collect();
        assert_eq!(
            kinds,
            vec![
                SourceToken::Ident,
                SourceToken::Ident,
                SourceToken::LBrace,
                SourceToken::Ident,
                SourceToken::Colon,
                SourceToken::Ident,
                SourceToken::Semi,
                SourceToken::RBrace,
                SourceToken::Semi,
                SourceToken::Eof,
            ]
        );
    }

    #[test]
    fn lexes_a_bytes_literal_without_splitting_on_the_b_prefix() {
        let tokens = tokenize(r#"b"HELO""#).unwrap();
        assert_eq!(tokens[0].token, SourceToken::BytesLit);
    }

    #[test]
    fn dollar_dollar_is_one_token() {
        let tokens = tokenize("$$ == 1").unwrap();
        assert_eq!(tokens[0].token, SourceToken::DollarDollar);
    }
}
