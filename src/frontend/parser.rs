//! Hand-written recursive-descent parser (§4.0): walks the token stream produced by
//! [crate::frontend::lexer] into a concrete syntax tree. Type names and literals are kept
//! as raw text here; [crate::frontend::lower] is what decides whether `uint8` means a
//! builtin integer type or `HTTP.Request` means a reference to another unit.

use crate::error::ParseError;
use crate::frontend::lexer::{SourceToken, TokenSpan};
use crate::util::Position;

#[derive(Debug, Clone)]
pub struct CstModule {
    pub name: String,
    pub imports: Vec<String>,
    pub exports: Vec<String>,
    pub type_decls: Vec<CstTypeDecl>,
    pub global_decls: Vec<CstGlobalDecl>,
    pub units: Vec<CstUnit>,
}

#[derive(Debug, Clone)]
pub struct CstTypeDecl {
    pub name: String,
    pub ty: CstType,
}

#[derive(Debug, Clone)]
pub struct CstGlobalDecl {
    pub name: String,
    pub ty: CstType,
    pub value: Option<CstExpr>,
}

#[derive(Debug, Clone)]
pub struct CstUnit {
    pub name: String,
    pub parameters: Vec<(String, CstType)>,
    pub variables: Vec<(String, CstType, Option<CstExpr>)>,
    pub properties: Vec<CstAttribute>,
    pub fields: Vec<CstField>,
    pub hooks: Vec<CstHook>,
    pub at: Position,
}

#[derive(Debug, Clone)]
pub enum CstType {
    Name(String),
    /// `vector<T>`, `map<K, V>`, `tuple<T, U>`, ... — name plus type arguments.
    Generic { name: String, args: Vec<CstType> },
    Unit(Box<CstUnit>),
    Enum(Vec<(String, Option<i64>)>),
}

#[derive(Debug, Clone)]
pub struct CstAttribute {
    pub name: String,
    pub value: Option<CstExpr>,
    pub at: Position,
}

#[derive(Debug, Clone)]
pub enum CstFieldKind {
    Atomic { name: String, ty: CstType },
    Vector { name: String, element: CstType, count: Option<CstExpr> },
    Switch { name: Option<String>, scrutinee: CstExpr, cases: Vec<CstSwitchCase> },
    Void(CstType),
    List(Vec<CstField>),
}

#[derive(Debug, Clone)]
pub struct CstSwitchCase {
    pub values: Option<Vec<CstExpr>>,
    pub fields: Vec<CstField>,
}

#[derive(Debug, Clone)]
pub struct CstField {
    pub kind: CstFieldKind,
    pub attributes: Vec<CstAttribute>,
    pub hooks: Vec<CstHook>,
    pub condition: Option<CstExpr>,
    pub at: Position,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CstHookKind {
    Init,
    Done,
    Error,
    Field,
}

#[derive(Debug, Clone)]
pub struct CstHook {
    pub kind: CstHookKind,
    pub field: Option<String>,
    pub priority: i32,
    pub body: CstBlock,
}

#[derive(Debug, Clone)]
pub struct CstBlock {
    pub locals: Vec<(String, CstType, Option<CstExpr>)>,
    pub statements: Vec<CstStmt>,
}

#[derive(Debug, Clone)]
pub struct CstSwitchArm {
    pub values: Option<Vec<CstExpr>>,
    pub body: CstBlock,
}

#[derive(Debug, Clone)]
pub enum CstStmt {
    Expr(CstExpr),
    If { cond: CstExpr, then_branch: CstBlock, else_branch: Option<CstBlock> },
    Switch { scrutinee: CstExpr, arms: Vec<CstSwitchArm> },
    For { binding: String, iterable: CstExpr, body: CstBlock },
    While { cond: CstExpr, body: CstBlock },
    Return(Option<CstExpr>),
    Print(Vec<CstExpr>),
    TryCatch { body: CstBlock, catches: Vec<(CstType, Option<String>, CstBlock)> },
    Confirm,
    Reject,
}

#[derive(Debug, Clone)]
pub enum CstCtor {
    Bool(bool),
    Integer(i64),
    Double(f64),
    Bytes(Vec<u8>),
    String(String),
    Regexp(String),
}

#[derive(Debug, Clone)]
pub enum CstExprKind {
    Literal(CstCtor),
    Name(String),
    Member { base: Box<CstExpr>, member: String },
    Index { base: Box<CstExpr>, index: Box<CstExpr> },
    Call { callee: Box<CstExpr>, args: Vec<CstExpr> },
    Unary { op: crate::ast::expr::UnaryOp, operand: Box<CstExpr> },
    Binary { op: crate::ast::expr::BinOp, lhs: Box<CstExpr>, rhs: Box<CstExpr> },
    Conditional { cond: Box<CstExpr>, then_branch: Box<CstExpr>, else_branch: Box<CstExpr> },
    Tuple(Vec<CstExpr>),
    Dollar,
}

#[derive(Debug, Clone)]
pub struct CstExpr {
    pub kind: CstExprKind,
    pub at: Position,
}

/// Recursive-descent parser over a slice of [TokenSpan]s, holding onto the original source
/// text so identifiers and literals can be sliced out rather than re-copied by the lexer.
pub struct Parser<'s> {
    source: &'s str,
    tokens: &'s [TokenSpan],
    pos: usize,
}

const KEYWORDS: &[&str] = &[
    "module", "import", "export", "type", "unit", "global", "var", "on", "if", "else", "switch",
    "case", "default", "for", "in", "while", "return", "print", "try", "catch", "confirm",
    "reject", "true", "false", "enum",
];

impl<'s> Parser<'s> {
    pub fn new(source: &'s str, tokens: &'s [TokenSpan]) -> Self {
        Self { source, tokens, pos: 0 }
    }

    fn current(&self) -> &TokenSpan {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn text(&self, span: &TokenSpan) -> &'s str {
        &self.source[span.start..span.end]
    }

    fn at_eof(&self) -> bool {
        self.current().token == SourceToken::Eof
    }

    fn position(&self) -> Position {
        crate::frontend::lexer::position_of(self.source, self.current().start)
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError::Syntax { at: self.position(), message: message.into() }
    }

    fn advance(&mut self) -> TokenSpan {
        let tok = self.current().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        tok
    }

    fn check(&self, token: SourceToken) -> bool {
        self.current().token == token
    }

    fn eat(&mut self, token: SourceToken) -> bool {
        if self.check(token) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: SourceToken, what: &str) -> Result<TokenSpan, ParseError> {
        if self.check(token) {
            Ok(self.advance())
        } else {
            Err(self.error(format!("expected {what}")))
        }
    }

    /// Consumes an `Ident` token and returns its text, regardless of whether that text
    /// happens to be one of [KEYWORDS] — keywords are contextual, not reserved.
    fn ident(&mut self) -> Result<String, ParseError> {
        if self.check(SourceToken::Ident) {
            let tok = self.advance();
            Ok(self.text(&tok).to_string())
        } else {
            Err(self.error("expected identifier"))
        }
    }

    fn dotted_ident(&mut self) -> Result<String, ParseError> {
        let mut name = self.ident()?;
        while self.check(SourceToken::Dot) {
            self.advance();
            name.push('.');
            name.push_str(&self.ident()?);
        }
        Ok(name)
    }

    fn is_keyword(&self, kw: &str) -> bool {
        self.check(SourceToken::Ident) && self.text(self.current()) == kw
    }

    fn eat_keyword(&mut self, kw: &str) -> bool {
        if self.is_keyword(kw) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect_keyword(&mut self, kw: &str) -> Result<(), ParseError> {
        if self.eat_keyword(kw) {
            Ok(())
        } else {
            Err(self.error(format!("expected `{kw}`")))
        }
    }

    // ---- top level ----

    pub fn parse_module(&mut self) -> Result<CstModule, ParseError> {
        self.expect_keyword("module")?;
        let name = self.ident()?;
        self.expect(SourceToken::Semi, "`;` after module name")?;

        let mut module = CstModule {
            name,
            imports: Vec::new(),
            exports: Vec::new(),
            type_decls: Vec::new(),
            global_decls: Vec::new(),
            units: Vec::new(),
        };

        while !self.at_eof() {
            if self.eat_keyword("import") {
                module.imports.push(self.dotted_ident()?);
                self.expect(SourceToken::Semi, "`;` after import")?;
            } else if self.eat_keyword("export") {
                loop {
                    module.exports.push(self.ident()?);
                    if !self.eat(SourceToken::Comma) {
                        break;
                    }
                }
                self.expect(SourceToken::Semi, "`;` after export list")?;
            } else if self.eat_keyword("global") {
                let name = self.ident()?;
                self.expect(SourceToken::Colon, "`:` after global name")?;
                let ty = self.parse_type()?;
                let value = if self.eat(SourceToken::Eq) { Some(self.parse_expr()?) } else { None };
                self.expect(SourceToken::Semi, "`;` after global declaration")?;
                module.global_decls.push(CstGlobalDecl { name, ty, value });
            } else if self.eat_keyword("type") {
                let name = self.ident()?;
                self.expect(SourceToken::Eq, "`=` in type declaration")?;
                if self.is_keyword("unit") {
                    let unit = self.parse_unit_body(name)?;
                    module.units.push(unit);
                } else {
                    let ty = self.parse_type()?;
                    module.type_decls.push(CstTypeDecl { name, ty });
                }
                self.expect(SourceToken::Semi, "`;` after type declaration")?;
            } else {
                return Err(self.error("expected `import`, `export`, `global`, or `type`"));
            }
        }

        Ok(module)
    }

    // ---- types ----

    fn parse_type(&mut self) -> Result<CstType, ParseError> {
        if self.is_keyword("unit") {
            let unit = self.parse_unit_body(String::new())?;
            return Ok(CstType::Unit(Box::new(unit)));
        }
        if self.eat_keyword("enum") {
            self.expect(SourceToken::LBrace, "`{` after `enum`")?;
            let mut labels = Vec::new();
            while !self.check(SourceToken::RBrace) {
                let name = self.ident()?;
                let value = if self.eat(SourceToken::Eq) {
                    Some(self.parse_integer_literal()?)
                } else {
                    None
                };
                labels.push((name, value));
                if !self.eat(SourceToken::Comma) {
                    break;
                }
            }
            self.expect(SourceToken::RBrace, "`}` closing `enum`")?;
            return Ok(CstType::Enum(labels));
        }
        let name = self.dotted_ident()?;
        if self.eat(SourceToken::Lt) {
            let mut args = vec![self.parse_type()?];
            while self.eat(SourceToken::Comma) {
                args.push(self.parse_type()?);
            }
            self.expect(SourceToken::Gt, "`>` closing type arguments")?;
            return Ok(CstType::Generic { name, args });
        }
        Ok(CstType::Name(name))
    }

    fn parse_integer_literal(&mut self) -> Result<i64, ParseError> {
        let negative = self.eat(SourceToken::Minus);
        let tok = self.expect(SourceToken::Integer, "integer literal")?;
        let text = self.text(&tok);
        let value = parse_int_text(text).map_err(|e| self.error(e))?;
        Ok(if negative { -value } else { value })
    }

    // ---- unit ----

    fn parse_unit_body(&mut self, name: String) -> Result<CstUnit, ParseError> {
        let at = self.position();
        self.expect_keyword("unit")?;
        let mut parameters = Vec::new();
        if self.eat(SourceToken::LParen) {
            while !self.check(SourceToken::RParen) {
                let pname = self.ident()?;
                self.expect(SourceToken::Colon, "`:` in unit parameter")?;
                let ty = self.parse_type()?;
                parameters.push((pname, ty));
                if !self.eat(SourceToken::Comma) {
                    break;
                }
            }
            self.expect(SourceToken::RParen, "`)` closing unit parameters")?;
        }
        self.expect(SourceToken::LBrace, "`{` opening unit body")?;

        let mut unit = CstUnit {
            name,
            parameters,
            variables: Vec::new(),
            properties: Vec::new(),
            fields: Vec::new(),
            hooks: Vec::new(),
            at,
        };

        while !self.check(SourceToken::RBrace) {
            if self.eat_keyword("var") {
                let (name, ty, default) = self.parse_var_decl()?;
                unit.variables.push((name, ty, default));
            } else if self.check(SourceToken::Percent) {
                unit.properties.push(self.parse_property()?);
            } else if self.eat_keyword("on") {
                unit.hooks.push(self.parse_hook_body()?);
            } else {
                unit.fields.push(self.parse_field()?);
            }
        }
        self.expect(SourceToken::RBrace, "`}` closing unit body")?;
        Ok(unit)
    }

    fn parse_var_decl(&mut self) -> Result<(String, CstType, Option<CstExpr>), ParseError> {
        let name = self.ident()?;
        self.expect(SourceToken::Colon, "`:` in var declaration")?;
        let ty = self.parse_type()?;
        let default = if self.eat(SourceToken::Eq) { Some(self.parse_expr()?) } else { None };
        self.expect(SourceToken::Semi, "`;` after var declaration")?;
        Ok((name, ty, default))
    }

    fn parse_property(&mut self) -> Result<CstAttribute, ParseError> {
        let at = self.position();
        self.expect(SourceToken::Percent, "`%` property")?;
        let name = self.dashed_ident()?;
        let value = if self.eat(SourceToken::Eq) { Some(self.parse_expr()?) } else { None };
        self.expect(SourceToken::Semi, "`;` after property")?;
        Ok(CstAttribute { name, value, at })
    }

    /// A property or attribute name, which unlike an ordinary identifier may be hyphenated
    /// (`%mime-type`, `%synchronize-after`) — the lexer still tokenizes the hyphen as its own
    /// `-`, so this just stitches consecutive idents back together across it.
    fn dashed_ident(&mut self) -> Result<String, ParseError> {
        let mut name = self.ident()?;
        while self.check(SourceToken::Minus) {
            self.advance();
            name.push('-');
            name.push_str(&self.ident()?);
        }
        Ok(name)
    }

    fn parse_hook_body(&mut self) -> Result<CstHook, ParseError> {
        let (kind, field) = if self.eat(SourceToken::Percent) {
            let name = self.ident()?;
            let kind = match name.as_str() {
                "init" => CstHookKind::Init,
                "done" => CstHookKind::Done,
                "error" => CstHookKind::Error,
                other => return Err(self.error(format!("unknown hook target `%{other}`"))),
            };
            (kind, None)
        } else {
            let name = self.dotted_ident()?;
            (CstHookKind::Field, Some(name))
        };
        let priority = if self.eat_keyword("priority") {
            self.expect(SourceToken::Eq, "`=` after `priority`")?;
            self.parse_integer_literal()? as i32
        } else {
            0
        };
        let body = self.parse_block()?;
        Ok(CstHook { kind, field, priority, body })
    }

    // ---- fields ----

    fn parse_field(&mut self) -> Result<CstField, ParseError> {
        let at = self.position();
        let condition = if self.eat_keyword("if") {
            self.expect(SourceToken::LParen, "`(` after `if`")?;
            let cond = self.parse_expr()?;
            self.expect(SourceToken::RParen, "`)` closing `if` condition")?;
            Some(cond)
        } else {
            None
        };

        let kind = if self.eat(SourceToken::LParen) {
            let mut fields = Vec::new();
            while !self.check(SourceToken::RParen) {
                fields.push(self.parse_field()?);
            }
            self.expect(SourceToken::RParen, "`)` closing field group")?;
            CstFieldKind::List(fields)
        } else if self.is_keyword("switch") {
            self.parse_switch_field(None)?
        } else if self.check(SourceToken::Colon) {
            self.advance();
            let ty = self.parse_type()?;
            CstFieldKind::Void(ty)
        } else {
            let name = self.ident()?;
            if self.eat(SourceToken::Colon) {
                if self.is_keyword("switch") {
                    self.parse_switch_field(Some(name))?
                } else {
                    let ty = self.parse_type()?;
                    if self.eat(SourceToken::LBracket) {
                        let count = if self.check(SourceToken::RBracket) {
                            None
                        } else {
                            Some(self.parse_expr()?)
                        };
                        self.expect(SourceToken::RBracket, "`]` closing vector field")?;
                        CstFieldKind::Vector { name, element: ty, count }
                    } else {
                        CstFieldKind::Atomic { name, ty }
                    }
                }
            } else {
                return Err(self.error("expected `:` after field name"));
            }
        };

        let attributes = self.parse_attributes()?;

        let mut hooks = Vec::new();
        while self.eat_keyword("on") {
            hooks.push(self.parse_hook_body()?);
        }

        self.expect(SourceToken::Semi, "`;` after field")?;
        Ok(CstField { kind, attributes, hooks, condition, at })
    }

    fn parse_switch_field(&mut self, name: Option<String>) -> Result<CstFieldKind, ParseError> {
        self.expect_keyword("switch")?;
        self.expect(SourceToken::LParen, "`(` after `switch`")?;
        let scrutinee = self.parse_expr()?;
        self.expect(SourceToken::RParen, "`)` closing `switch` scrutinee")?;
        self.expect(SourceToken::LBrace, "`{` opening `switch` body")?;
        let mut cases = Vec::new();
        while !self.check(SourceToken::RBrace) {
            let values = if self.eat_keyword("default") || self.eat(SourceToken::Star) {
                None
            } else {
                self.expect_keyword("case")?;
                let mut values = vec![self.parse_expr()?];
                while self.eat(SourceToken::Comma) {
                    values.push(self.parse_expr()?);
                }
                Some(values)
            };
            self.expect(SourceToken::Minus, "`->` in switch case")?;
            self.expect(SourceToken::Gt, "`->` in switch case")?;
            let fields = if self.eat(SourceToken::LBrace) {
                let mut fields = Vec::new();
                while !self.check(SourceToken::RBrace) {
                    fields.push(self.parse_field()?);
                }
                self.expect(SourceToken::RBrace, "`}` closing switch case body")?;
                fields
            } else {
                vec![self.parse_field()?]
            };
            cases.push(CstSwitchCase { values, fields });
        }
        self.expect(SourceToken::RBrace, "`}` closing `switch` body")?;
        Ok(CstFieldKind::Switch { name, scrutinee, cases })
    }

    fn parse_attributes(&mut self) -> Result<Vec<CstAttribute>, ParseError> {
        let mut attrs = Vec::new();
        while self.check(SourceToken::Amp) {
            let at = self.position();
            self.advance();
            let name = self.ident()?;
            let value = if self.eat(SourceToken::Eq) || self.check(SourceToken::LParen) {
                if self.check(SourceToken::LParen) {
                    self.advance();
                    let e = self.parse_expr()?;
                    self.expect(SourceToken::RParen, "`)` closing attribute argument")?;
                    Some(e)
                } else {
                    Some(self.parse_expr()?)
                }
            } else {
                None
            };
            attrs.push(CstAttribute { name, value, at });
        }
        Ok(attrs)
    }

    // ---- statements ----

    fn parse_block(&mut self) -> Result<CstBlock, ParseError> {
        self.expect(SourceToken::LBrace, "`{` opening block")?;
        let mut locals = Vec::new();
        let mut statements = Vec::new();
        while !self.check(SourceToken::RBrace) {
            if self.eat_keyword("var") {
                locals.push(self.parse_var_decl()?);
            } else {
                statements.push(self.parse_stmt()?);
            }
        }
        self.expect(SourceToken::RBrace, "`}` closing block")?;
        Ok(CstBlock { locals, statements })
    }

    fn parse_stmt(&mut self) -> Result<CstStmt, ParseError> {
        if self.eat_keyword("if") {
            self.expect(SourceToken::LParen, "`(` after `if`")?;
            let cond = self.parse_expr()?;
            self.expect(SourceToken::RParen, "`)` closing `if` condition")?;
            let then_branch = self.parse_block()?;
            let else_branch = if self.eat_keyword("else") {
                Some(self.parse_block()?)
            } else {
                None
            };
            return Ok(CstStmt::If { cond, then_branch, else_branch });
        }
        if self.eat_keyword("switch") {
            self.expect(SourceToken::LParen, "`(` after `switch`")?;
            let scrutinee = self.parse_expr()?;
            self.expect(SourceToken::RParen, "`)` closing `switch` scrutinee")?;
            self.expect(SourceToken::LBrace, "`{` opening `switch` body")?;
            let mut arms = Vec::new();
            while !self.check(SourceToken::RBrace) {
                let values = if self.eat_keyword("default") || self.eat(SourceToken::Star) {
                    None
                } else {
                    self.expect_keyword("case")?;
                    let mut values = vec![self.parse_expr()?];
                    while self.eat(SourceToken::Comma) {
                        values.push(self.parse_expr()?);
                    }
                    Some(values)
                };
                self.expect(SourceToken::Minus, "`->` in switch case")?;
                self.expect(SourceToken::Gt, "`->` in switch case")?;
                let body = self.parse_block()?;
                arms.push(CstSwitchArm { values, body });
            }
            self.expect(SourceToken::RBrace, "`}` closing `switch` body")?;
            return Ok(CstStmt::Switch { scrutinee, arms });
        }
        if self.eat_keyword("for") {
            self.expect(SourceToken::LParen, "`(` after `for`")?;
            let binding = self.ident()?;
            self.expect_keyword("in")?;
            let iterable = self.parse_expr()?;
            self.expect(SourceToken::RParen, "`)` closing `for` header")?;
            let body = self.parse_block()?;
            return Ok(CstStmt::For { binding, iterable, body });
        }
        if self.eat_keyword("while") {
            self.expect(SourceToken::LParen, "`(` after `while`")?;
            let cond = self.parse_expr()?;
            self.expect(SourceToken::RParen, "`)` closing `while` condition")?;
            let body = self.parse_block()?;
            return Ok(CstStmt::While { cond, body });
        }
        if self.eat_keyword("return") {
            let value = if self.check(SourceToken::Semi) { None } else { Some(self.parse_expr()?) };
            self.expect(SourceToken::Semi, "`;` after `return`")?;
            return Ok(CstStmt::Return(value));
        }
        if self.eat_keyword("print") {
            let mut args = Vec::new();
            if !self.check(SourceToken::Semi) {
                args.push(self.parse_expr()?);
                while self.eat(SourceToken::Comma) {
                    args.push(self.parse_expr()?);
                }
            }
            self.expect(SourceToken::Semi, "`;` after `print`")?;
            return Ok(CstStmt::Print(args));
        }
        if self.eat_keyword("try") {
            let body = self.parse_block()?;
            let mut catches = Vec::new();
            while self.eat_keyword("catch") {
                self.expect(SourceToken::LParen, "`(` after `catch`")?;
                let ty = self.parse_type()?;
                let name = if self.check(SourceToken::Ident) { Some(self.ident()?) } else { None };
                self.expect(SourceToken::RParen, "`)` closing `catch` parameter")?;
                let catch_body = self.parse_block()?;
                catches.push((ty, name, catch_body));
            }
            return Ok(CstStmt::TryCatch { body, catches });
        }
        if self.eat_keyword("confirm") {
            self.expect(SourceToken::Semi, "`;` after `confirm`")?;
            return Ok(CstStmt::Confirm);
        }
        if self.eat_keyword("reject") {
            self.expect(SourceToken::Semi, "`;` after `reject`")?;
            return Ok(CstStmt::Reject);
        }
        let expr = self.parse_expr()?;
        self.expect(SourceToken::Semi, "`;` after expression statement")?;
        Ok(CstStmt::Expr(expr))
    }

    // ---- expressions ----
    //
    // Standard precedence-climbing ladder, loosest to tightest: ternary, ||, &&, bitor,
    // bitxor, bitand, equality, relational (incl. `in`), additive, multiplicative, unary,
    // postfix, primary.

    fn parse_expr(&mut self) -> Result<CstExpr, ParseError> {
        self.parse_ternary()
    }

    fn parse_ternary(&mut self) -> Result<CstExpr, ParseError> {
        let cond = self.parse_or()?;
        if self.eat(SourceToken::Question) {
            let then_branch = self.parse_expr()?;
            self.expect(SourceToken::Colon, "`:` in conditional expression")?;
            let else_branch = self.parse_expr()?;
            let at = cond.at;
            return Ok(CstExpr {
                kind: CstExprKind::Conditional {
                    cond: Box::new(cond),
                    then_branch: Box::new(then_branch),
                    else_branch: Box::new(else_branch),
                },
                at,
            });
        }
        Ok(cond)
    }

    fn parse_or(&mut self) -> Result<CstExpr, ParseError> {
        let mut lhs = self.parse_and()?;
        while self.eat(SourceToken::PipePipe) {
            let rhs = self.parse_and()?;
            lhs = binary(crate::ast::expr::BinOp::Or, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<CstExpr, ParseError> {
        let mut lhs = self.parse_bitor()?;
        while self.eat(SourceToken::AmpAmp) {
            let rhs = self.parse_bitor()?;
            lhs = binary(crate::ast::expr::BinOp::And, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_bitor(&mut self) -> Result<CstExpr, ParseError> {
        let mut lhs = self.parse_bitxor()?;
        while self.eat(SourceToken::Pipe) {
            let rhs = self.parse_bitxor()?;
            lhs = binary(crate::ast::expr::BinOp::BitOr, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_bitxor(&mut self) -> Result<CstExpr, ParseError> {
        let mut lhs = self.parse_bitand()?;
        while self.eat(SourceToken::Caret) {
            let rhs = self.parse_bitand()?;
            lhs = binary(crate::ast::expr::BinOp::BitXor, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_bitand(&mut self) -> Result<CstExpr, ParseError> {
        let mut lhs = self.parse_equality()?;
        while self.eat(SourceToken::Amp) {
            let rhs = self.parse_equality()?;
            lhs = binary(crate::ast::expr::BinOp::BitAnd, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_equality(&mut self) -> Result<CstExpr, ParseError> {
        let mut lhs = self.parse_relational()?;
        loop {
            let op = if self.eat(SourceToken::EqEq) {
                crate::ast::expr::BinOp::Eq
            } else if self.eat(SourceToken::NotEq) {
                crate::ast::expr::BinOp::Ne
            } else {
                break;
            };
            let rhs = self.parse_relational()?;
            lhs = binary(op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_relational(&mut self) -> Result<CstExpr, ParseError> {
        let mut lhs = self.parse_additive()?;
        loop {
            let op = if self.eat(SourceToken::LtEq) {
                crate::ast::expr::BinOp::Le
            } else if self.eat(SourceToken::GtEq) {
                crate::ast::expr::BinOp::Ge
            } else if self.eat(SourceToken::Lt) {
                crate::ast::expr::BinOp::Lt
            } else if self.eat(SourceToken::Gt) {
                crate::ast::expr::BinOp::Gt
            } else if self.eat_keyword("in") {
                crate::ast::expr::BinOp::In
            } else {
                break;
            };
            let rhs = self.parse_additive()?;
            lhs = binary(op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_additive(&mut self) -> Result<CstExpr, ParseError> {
        let mut lhs = self.parse_multiplicative()?;
        loop {
            let op = if self.eat(SourceToken::Plus) {
                crate::ast::expr::BinOp::Add
            } else if self.eat(SourceToken::Minus) {
                crate::ast::expr::BinOp::Sub
            } else {
                break;
            };
            let rhs = self.parse_multiplicative()?;
            lhs = binary(op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_multiplicative(&mut self) -> Result<CstExpr, ParseError> {
        let mut lhs = self.parse_unary()?;
        loop {
            let op = if self.eat(SourceToken::Star) {
                crate::ast::expr::BinOp::Mul
            } else if self.eat(SourceToken::Slash) {
                crate::ast::expr::BinOp::Div
            } else if self.eat(SourceToken::Percent) {
                crate::ast::expr::BinOp::Mod
            } else {
                break;
            };
            let rhs = self.parse_unary()?;
            lhs = binary(op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<CstExpr, ParseError> {
        let at = self.position();
        if self.eat(SourceToken::Minus) {
            let operand = self.parse_unary()?;
            return Ok(CstExpr {
                kind: CstExprKind::Unary {
                    op: crate::ast::expr::UnaryOp::Neg,
                    operand: Box::new(operand),
                },
                at,
            });
        }
        if self.eat(SourceToken::Bang) {
            let operand = self.parse_unary()?;
            return Ok(CstExpr {
                kind: CstExprKind::Unary {
                    op: crate::ast::expr::UnaryOp::Not,
                    operand: Box::new(operand),
                },
                at,
            });
        }
        if self.eat(SourceToken::Tilde) {
            let operand = self.parse_unary()?;
            return Ok(CstExpr {
                kind: CstExprKind::Unary {
                    op: crate::ast::expr::UnaryOp::BitNot,
                    operand: Box::new(operand),
                },
                at,
            });
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> Result<CstExpr, ParseError> {
        let mut expr = self.parse_primary()?;
        loop {
            if self.eat(SourceToken::Dot) {
                let member = self.ident()?;
                let at = expr.at;
                expr = CstExpr {
                    kind: CstExprKind::Member { base: Box::new(expr), member },
                    at,
                };
            } else if self.eat(SourceToken::LBracket) {
                let index = self.parse_expr()?;
                self.expect(SourceToken::RBracket, "`]` closing index expression")?;
                let at = expr.at;
                expr = CstExpr {
                    kind: CstExprKind::Index { base: Box::new(expr), index: Box::new(index) },
                    at,
                };
            } else if self.eat(SourceToken::LParen) {
                let mut args = Vec::new();
                while !self.check(SourceToken::RParen) {
                    args.push(self.parse_expr()?);
                    if !self.eat(SourceToken::Comma) {
                        break;
                    }
                }
                self.expect(SourceToken::RParen, "`)` closing call arguments")?;
                let at = expr.at;
                expr = CstExpr { kind: CstExprKind::Call { callee: Box::new(expr), args }, at };
            } else {
                break;
            }
        }
        Ok(expr)
    }

    fn parse_primary(&mut self) -> Result<CstExpr, ParseError> {
        let at = self.position();
        if self.eat(SourceToken::DollarDollar) {
            return Ok(CstExpr { kind: CstExprKind::Dollar, at });
        }
        if self.eat_keyword("true") {
            return Ok(CstExpr { kind: CstExprKind::Literal(CstCtor::Bool(true)), at });
        }
        if self.eat_keyword("false") {
            return Ok(CstExpr { kind: CstExprKind::Literal(CstCtor::Bool(false)), at });
        }
        if self.check(SourceToken::Integer) {
            let tok = self.advance();
            let text = self.text(&tok);
            let value = parse_int_text(text).map_err(|e| self.error(e))?;
            return Ok(CstExpr { kind: CstExprKind::Literal(CstCtor::Integer(value)), at });
        }
        if self.check(SourceToken::Float) {
            let tok = self.advance();
            let value: f64 = self
                .text(&tok)
                .parse()
                .map_err(|_| self.error("invalid floating point literal"))?;
            return Ok(CstExpr { kind: CstExprKind::Literal(CstCtor::Double(value)), at });
        }
        if self.check(SourceToken::StringLit) {
            let tok = self.advance();
            let text = self.text(&tok);
            return Ok(CstExpr {
                kind: CstExprKind::Literal(CstCtor::String(unescape(&text[1..text.len() - 1]))),
                at,
            });
        }
        if self.check(SourceToken::BytesLit) {
            let tok = self.advance();
            let text = self.text(&tok);
            let inner = &text[2..text.len() - 1];
            return Ok(CstExpr {
                kind: CstExprKind::Literal(CstCtor::Bytes(unescape(inner).into_bytes())),
                at,
            });
        }
        if self.check(SourceToken::RegexpLit) {
            let tok = self.advance();
            let text = self.text(&tok);
            return Ok(CstExpr {
                kind: CstExprKind::Literal(CstCtor::Regexp(text[1..text.len() - 1].to_string())),
                at,
            });
        }
        if self.eat(SourceToken::LParen) {
            let mut elements = vec![self.parse_expr()?];
            let mut is_tuple = false;
            while self.eat(SourceToken::Comma) {
                is_tuple = true;
                if self.check(SourceToken::RParen) {
                    break;
                }
                elements.push(self.parse_expr()?);
            }
            self.expect(SourceToken::RParen, "`)` closing parenthesized expression")?;
            return Ok(if is_tuple {
                CstExpr { kind: CstExprKind::Tuple(elements), at }
            } else {
                elements.into_iter().next().expect("at least one element")
            });
        }
        if self.check(SourceToken::Ident) {
            let name = self.dotted_ident()?;
            return Ok(CstExpr { kind: CstExprKind::Name(name), at });
        }
        Err(self.error("expected an expression"))
    }
}

fn binary(op: crate::ast::expr::BinOp, lhs: CstExpr, rhs: CstExpr) -> CstExpr {
    let at = lhs.at;
    CstExpr { kind: CstExprKind::Binary { op, lhs: Box::new(lhs), rhs: Box::new(rhs) }, at }
}

fn parse_int_text(text: &str) -> Result<i64, String> {
    if let Some(hex) = text.strip_prefix("0x") {
        i64::from_str_radix(hex, 16).map_err(|e| e.to_string())
    } else {
        text.parse().map_err(|e: std::num::ParseIntError| e.to_string())
    }
}

/// Resolves backslash escapes in a string/bytes literal's inner text: `\\n`, `\\t`, `\\xNN`,
/// `\\"`, `\\\\`.
fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('"') => out.push('"'),
            Some('\\') => out.push('\\'),
            Some('x') => {
                let hi = chars.next();
                let lo = chars.next();
                if let (Some(hi), Some(lo)) = (hi, lo) {
                    if let Ok(byte) = u8::from_str_radix(&format!("{hi}{lo}"), 16) {
                        out.push(byte as char);
                    }
                }
            }
            Some(other) => out.push(other),
            None => {}
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::lexer::tokenize;

    fn parse(src: &str) -> CstModule {
        let tokens = tokenize(src).unwrap();
        Parser::new(src, &tokens).parse_module().unwrap()
    }

    #[test]
    fn parses_a_minimal_unit() {
        let module = parse(
            r#"
            module Test;
            export Packet;
            type Packet = unit {
                len: uint8;
                payload: bytes &length=len;
            };
            "#,
        );
        assert_eq!(module.name, "Test");
        assert_eq!(module.exports, vec!["Packet".to_string()]);
        assert_eq!(module.units.len(), 1);
        assert_eq!(module.units[0].fields.len(), 2);
    }

    #[test]
    fn parses_switch_field_and_hook() {
        let module = parse(
            r#"
            module Test;
            type Packet = unit {
                tag: uint8;
                body: switch ( self.tag ) {
                    case 1 -> a: uint8;
                    * -> b: bytes &length=0;
                };
                on tag {
                    print $$;
                }
            };
            "#,
        );
        let unit = &module.units[0];
        assert_eq!(unit.fields.len(), 2);
        assert_eq!(unit.hooks.len(), 1);
    }

    #[test]
    fn parses_vector_with_until_attribute() {
        let module = parse(
            r#"
            module Test;
            type Packet = unit {
                items: uint8[] &until($$ == 0);
            };
            "#,
        );
        assert_eq!(module.units[0].fields.len(), 1);
    }
}
