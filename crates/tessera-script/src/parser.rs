//! Token stream to syntax tree.
//!
//! Precedence (lowest → highest):
//! 1. `or`
//! 2. `and`
//! 3. `not`
//! 4. `==`, `!=`, `<`, `<=`, `>`, `>=` (no chaining)
//! 5. `+`, `-`
//! 6. `*`, `/`, `%`
//! 7. unary `-`
//! 8. call `()`, member `.`, index `[]`

use std::collections::HashSet;
use std::rc::Rc;

use crate::ast::*;
use crate::error::{ScriptError, ScriptResult};
use crate::lexer::tokenize;
use crate::token::{Span, Token, TokenKind};

/// Syntax tree depth a snippet may reach: nested brackets, blocks and
/// unary operators, and the operands of one operator chain, all count.
pub const MAX_NESTING: u32 = 256;

/// Parse a full snippet into a [`Program`].
pub fn parse_program(source: &str) -> ScriptResult<Program> {
    let mut parser = Parser::new(tokenize(source)?);
    parser.parse_program()
}

/// Parse a single expression; trailing tokens are an error.
pub fn parse_expression(source: &str) -> ScriptResult<Expr> {
    let mut parser = Parser::new(tokenize(source)?);
    parser.skip_newlines();
    let expr = parser.parse_expr()?;
    parser.skip_newlines();
    if !parser.at_end() {
        return Err(parser.error_here(format!(
            "expected end of expression, got `{}`",
            parser.peek_kind()
        )));
    }
    Ok(expr)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    /// Enclosing loops in the current function body.
    loop_depth: u32,
    /// Enclosing function bodies.
    fn_depth: u32,
    /// Current syntax tree depth, bounded by [`MAX_NESTING`].
    nesting: u32,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            pos: 0,
            loop_depth: 0,
            fn_depth: 0,
            nesting: 0,
        }
    }

    // ── Token cursor ──────────────────────────────────────────────────

    fn peek(&self) -> &Token {
        let last = self.tokens.len().saturating_sub(1);
        &self.tokens[self.pos.min(last)]
    }

    fn peek_kind(&self) -> &TokenKind {
        &self.peek().kind
    }

    fn look_ahead(&self, n: usize) -> &TokenKind {
        self.tokens
            .get(self.pos + n)
            .map(|token| &token.kind)
            .unwrap_or(&TokenKind::Eof)
    }

    fn current_span(&self) -> Span {
        self.peek().span
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    fn at_end(&self) -> bool {
        matches!(self.peek_kind(), TokenKind::Eof)
    }

    fn check(&self, kind: &TokenKind) -> bool {
        self.peek_kind() == kind
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: &TokenKind) -> ScriptResult<Token> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            Err(self.error_here(format!(
                "expected `{kind}`, got `{}`",
                self.peek_kind()
            )))
        }
    }

    fn expect_ident(&mut self) -> ScriptResult<String> {
        match self.peek_kind().clone() {
            TokenKind::Ident(name) => {
                self.advance();
                Ok(name)
            }
            other => Err(self.error_here(format!("expected identifier, got `{other}`"))),
        }
    }

    fn error_here(&self, message: impl Into<String>) -> ScriptError {
        ScriptError::syntax(self.current_span(), message)
    }

    fn deeper(&mut self) -> ScriptResult<()> {
        if self.nesting >= MAX_NESTING {
            return Err(self.error_here(format!(
                "nesting exceeds {MAX_NESTING} levels"
            )));
        }
        self.nesting += 1;
        Ok(())
    }

    fn skip_newlines(&mut self) {
        while self.check(&TokenKind::Newline) {
            self.advance();
        }
    }

    fn skip_separators(&mut self) {
        while matches!(self.peek_kind(), TokenKind::Newline | TokenKind::Semicolon) {
            self.advance();
        }
    }

    /// A statement ends at a newline, `;`, a closing brace, or end of input.
    fn expect_separator(&mut self) -> ScriptResult<()> {
        match self.peek_kind() {
            TokenKind::Newline | TokenKind::Semicolon => {
                self.advance();
                Ok(())
            }
            TokenKind::RBrace | TokenKind::Eof => Ok(()),
            other => Err(self.error_here(format!(
                "expected newline or `;` after statement, got `{other}`"
            ))),
        }
    }

    // ── Statements ────────────────────────────────────────────────────

    fn parse_program(&mut self) -> ScriptResult<Program> {
        let mut stmts = Vec::new();
        self.skip_separators();
        while !self.at_end() {
            if self.check(&TokenKind::RBrace) {
                return Err(self.error_here("unexpected `}`"));
            }
            stmts.push(self.parse_statement()?);
            self.expect_separator()?;
            self.skip_separators();
        }
        Ok(Program { stmts })
    }

    fn parse_block(&mut self) -> ScriptResult<Vec<Stmt>> {
        let saved = self.nesting;
        self.deeper()?;
        self.expect(&TokenKind::LBrace)?;
        let mut stmts = Vec::new();
        self.skip_separators();
        while !self.check(&TokenKind::RBrace) {
            if self.at_end() {
                return Err(self.error_here("unterminated block, expected `}`"));
            }
            stmts.push(self.parse_statement()?);
            self.expect_separator()?;
            self.skip_separators();
        }
        self.expect(&TokenKind::RBrace)?;
        self.nesting = saved;
        Ok(stmts)
    }

    fn parse_statement(&mut self) -> ScriptResult<Stmt> {
        let span = self.current_span();
        match self.peek_kind() {
            TokenKind::Let => {
                self.advance();
                let name = self.expect_ident()?;
                self.expect(&TokenKind::Eq)?;
                self.skip_newlines();
                let value = self.parse_expr()?;
                Ok(Stmt::new(StmtKind::Let { name, value }, span))
            }
            TokenKind::Fn if matches!(self.look_ahead(1), TokenKind::Ident(_)) => {
                self.advance();
                let name = self.expect_ident()?;
                let def = self.parse_function(name, span)?;
                Ok(Stmt::new(StmtKind::FnDecl(def), span))
            }
            TokenKind::Class => self.parse_class(),
            TokenKind::If => self.parse_if(),
            TokenKind::While => {
                self.advance();
                let condition = self.parse_expr()?;
                let body = self.parse_loop_body()?;
                Ok(Stmt::new(StmtKind::While { condition, body }, span))
            }
            TokenKind::For => {
                self.advance();
                let var = self.expect_ident()?;
                self.expect(&TokenKind::In)?;
                let iterable = self.parse_expr()?;
                let body = self.parse_loop_body()?;
                Ok(Stmt::new(
                    StmtKind::For {
                        var,
                        iterable,
                        body,
                    },
                    span,
                ))
            }
            TokenKind::Return => {
                if self.fn_depth == 0 {
                    return Err(self.error_here("`return` outside of a function"));
                }
                self.advance();
                let value = if matches!(
                    self.peek_kind(),
                    TokenKind::Newline | TokenKind::Semicolon | TokenKind::RBrace | TokenKind::Eof
                ) {
                    None
                } else {
                    Some(self.parse_expr()?)
                };
                Ok(Stmt::new(StmtKind::Return(value), span))
            }
            TokenKind::Break | TokenKind::Continue => {
                if self.loop_depth == 0 {
                    return Err(self.error_here(format!(
                        "`{}` outside of a loop",
                        self.peek_kind()
                    )));
                }
                let kind = if self.advance().kind == TokenKind::Break {
                    StmtKind::Break
                } else {
                    StmtKind::Continue
                };
                Ok(Stmt::new(kind, span))
            }
            _ => self.parse_expression_statement(),
        }
    }

    fn parse_expression_statement(&mut self) -> ScriptResult<Stmt> {
        let span = self.current_span();
        let expr = self.parse_expr()?;
        let op = match self.peek_kind() {
            TokenKind::Eq => None,
            TokenKind::PlusEq => Some(BinOp::Add),
            TokenKind::MinusEq => Some(BinOp::Sub),
            TokenKind::StarEq => Some(BinOp::Mul),
            TokenKind::SlashEq => Some(BinOp::Div),
            _ => return Ok(Stmt::new(StmtKind::Expr(expr), span)),
        };
        self.advance();
        self.skip_newlines();
        let target = match expr.kind {
            ExprKind::Ident(name) => Target::Name(name),
            ExprKind::Field { object, field } => Target::Field {
                object: *object,
                field,
            },
            ExprKind::Index { object, index } => Target::Index {
                object: *object,
                index: *index,
            },
            _ => return Err(ScriptError::syntax(expr.span, "cannot assign to this expression")),
        };
        let value = self.parse_expr()?;
        Ok(Stmt::new(StmtKind::Assign { target, op, value }, span))
    }

    fn parse_loop_body(&mut self) -> ScriptResult<Vec<Stmt>> {
        self.loop_depth += 1;
        let body = self.parse_block();
        self.loop_depth -= 1;
        body
    }

    fn parse_if(&mut self) -> ScriptResult<Stmt> {
        let span = self.current_span();
        self.expect(&TokenKind::If)?;
        let mut branches = Vec::new();
        let condition = self.parse_expr()?;
        branches.push((condition, self.parse_block()?));
        let mut otherwise = None;

        loop {
            let save = self.pos;
            self.skip_newlines();
            if !self.eat(&TokenKind::Else) {
                self.pos = save;
                break;
            }
            if self.eat(&TokenKind::If) {
                let condition = self.parse_expr()?;
                branches.push((condition, self.parse_block()?));
            } else {
                otherwise = Some(self.parse_block()?);
                break;
            }
        }

        Ok(Stmt::new(
            StmtKind::If {
                branches,
                otherwise,
            },
            span,
        ))
    }

    fn parse_class(&mut self) -> ScriptResult<Stmt> {
        let span = self.current_span();
        self.expect(&TokenKind::Class)?;
        let name = self.expect_ident()?;
        let base = if self.eat(&TokenKind::LParen) {
            let base = self.parse_expr()?;
            self.expect(&TokenKind::RParen)?;
            Some(base)
        } else {
            None
        };

        self.expect(&TokenKind::LBrace)?;
        self.skip_separators();
        let mut methods = Vec::new();
        while !self.check(&TokenKind::RBrace) {
            let method_span = self.current_span();
            if !self.eat(&TokenKind::Fn) {
                return Err(self.error_here(format!(
                    "expected method definition in class `{name}`, got `{}`",
                    self.peek_kind()
                )));
            }
            let method_name = self.expect_ident()?;
            methods.push(self.parse_function(method_name, method_span)?);
            self.expect_separator()?;
            self.skip_separators();
        }
        self.expect(&TokenKind::RBrace)?;

        Ok(Stmt::new(
            StmtKind::ClassDecl {
                name,
                base,
                methods,
            },
            span,
        ))
    }

    /// Parameters and body, positioned just after the function name (or `fn`).
    fn parse_function(&mut self, name: String, span: Span) -> ScriptResult<Rc<FnDef>> {
        let params = self.parse_params()?;

        let saved_loops = self.loop_depth;
        self.loop_depth = 0;
        self.fn_depth += 1;
        let body = if self.eat(&TokenKind::FatArrow) {
            self.skip_newlines();
            self.parse_expr().map(FnBody::Expr)
        } else {
            self.parse_block().map(FnBody::Block)
        };
        self.fn_depth -= 1;
        self.loop_depth = saved_loops;

        Ok(Rc::new(FnDef {
            name,
            params,
            body: body?,
            span,
        }))
    }

    fn parse_params(&mut self) -> ScriptResult<Vec<String>> {
        self.expect(&TokenKind::LParen)?;
        let mut params = Vec::new();
        let mut seen = HashSet::new();
        while !self.check(&TokenKind::RParen) {
            let span = self.current_span();
            let param = self.expect_ident()?;
            if !seen.insert(param.clone()) {
                return Err(ScriptError::syntax(
                    span,
                    format!("duplicate parameter `{param}`"),
                ));
            }
            params.push(param);
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(&TokenKind::RParen)?;
        Ok(params)
    }

    // ── Expressions ───────────────────────────────────────────────────

    fn parse_expr(&mut self) -> ScriptResult<Expr> {
        let saved = self.nesting;
        self.deeper()?;
        let expr = self.parse_or()?;
        self.nesting = saved;
        Ok(expr)
    }

    fn binary(left: Expr, op: BinOp, right: Expr) -> Expr {
        let span = left.span;
        Expr::new(
            ExprKind::Binary {
                left: Box::new(left),
                op,
                right: Box::new(right),
            },
            span,
        )
    }

    fn parse_or(&mut self) -> ScriptResult<Expr> {
        let saved = self.nesting;
        let mut left = self.parse_and()?;
        while self.eat(&TokenKind::Or) {
            self.deeper()?;
            self.skip_newlines();
            let right = self.parse_and()?;
            left = Self::binary(left, BinOp::Or, right);
        }
        self.nesting = saved;
        Ok(left)
    }

    fn parse_and(&mut self) -> ScriptResult<Expr> {
        let saved = self.nesting;
        let mut left = self.parse_not()?;
        while self.eat(&TokenKind::And) {
            self.deeper()?;
            self.skip_newlines();
            let right = self.parse_not()?;
            left = Self::binary(left, BinOp::And, right);
        }
        self.nesting = saved;
        Ok(left)
    }

    fn parse_not(&mut self) -> ScriptResult<Expr> {
        let span = self.current_span();
        if self.eat(&TokenKind::Not) {
            let saved = self.nesting;
            self.deeper()?;
            let operand = self.parse_not()?;
            self.nesting = saved;
            return Ok(Expr::new(
                ExprKind::Unary {
                    op: UnaryOp::Not,
                    operand: Box::new(operand),
                },
                span,
            ));
        }
        self.parse_comparison()
    }

    fn comparison_op(&self) -> Option<BinOp> {
        match self.peek_kind() {
            TokenKind::EqEq => Some(BinOp::Eq),
            TokenKind::BangEq => Some(BinOp::NotEq),
            TokenKind::Less => Some(BinOp::Less),
            TokenKind::LessEq => Some(BinOp::LessEq),
            TokenKind::Greater => Some(BinOp::Greater),
            TokenKind::GreaterEq => Some(BinOp::GreaterEq),
            _ => None,
        }
    }

    fn parse_comparison(&mut self) -> ScriptResult<Expr> {
        let left = self.parse_additive()?;
        let Some(op) = self.comparison_op() else {
            return Ok(left);
        };
        self.advance();
        self.skip_newlines();
        let right = self.parse_additive()?;
        if self.comparison_op().is_some() {
            return Err(self.error_here(
                "comparison operators cannot be chained; combine them with `and`",
            ));
        }
        Ok(Self::binary(left, op, right))
    }

    fn parse_additive(&mut self) -> ScriptResult<Expr> {
        let saved = self.nesting;
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Plus => BinOp::Add,
                TokenKind::Minus => BinOp::Sub,
                _ => break,
            };
            self.advance();
            self.deeper()?;
            self.skip_newlines();
            let right = self.parse_multiplicative()?;
            left = Self::binary(left, op, right);
        }
        self.nesting = saved;
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> ScriptResult<Expr> {
        let saved = self.nesting;
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Star => BinOp::Mul,
                TokenKind::Slash => BinOp::Div,
                TokenKind::Percent => BinOp::Mod,
                _ => break,
            };
            self.advance();
            self.deeper()?;
            self.skip_newlines();
            let right = self.parse_unary()?;
            left = Self::binary(left, op, right);
        }
        self.nesting = saved;
        Ok(left)
    }

    fn parse_unary(&mut self) -> ScriptResult<Expr> {
        let span = self.current_span();
        if self.eat(&TokenKind::Minus) {
            let saved = self.nesting;
            self.deeper()?;
            let operand = self.parse_unary()?;
            self.nesting = saved;
            return Ok(Expr::new(
                ExprKind::Unary {
                    op: UnaryOp::Neg,
                    operand: Box::new(operand),
                },
                span,
            ));
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> ScriptResult<Expr> {
        let saved = self.nesting;
        let mut expr = self.parse_primary()?;
        loop {
            let span = expr.span;
            if matches!(
                self.peek_kind(),
                TokenKind::LParen | TokenKind::LBracket | TokenKind::Dot
            ) {
                self.deeper()?;
            }
            match self.peek_kind() {
                TokenKind::LParen => {
                    let args = self.parse_args()?;
                    expr = Expr::new(
                        ExprKind::Call {
                            callee: Box::new(expr),
                            args,
                        },
                        span,
                    );
                }
                TokenKind::LBracket => {
                    self.advance();
                    let index = self.parse_expr()?;
                    self.expect(&TokenKind::RBracket)?;
                    expr = Expr::new(
                        ExprKind::Index {
                            object: Box::new(expr),
                            index: Box::new(index),
                        },
                        span,
                    );
                }
                TokenKind::Dot => {
                    self.advance();
                    let member = self.expect_ident()?;
                    if self.check(&TokenKind::LParen) {
                        let args = self.parse_args()?;
                        expr = Expr::new(
                            ExprKind::MethodCall {
                                object: Box::new(expr),
                                method: member,
                                args,
                            },
                            span,
                        );
                    } else {
                        expr = Expr::new(
                            ExprKind::Field {
                                object: Box::new(expr),
                                field: member,
                            },
                            span,
                        );
                    }
                }
                _ => break,
            }
        }
        self.nesting = saved;
        Ok(expr)
    }

    fn parse_args(&mut self) -> ScriptResult<Vec<Expr>> {
        self.expect(&TokenKind::LParen)?;
        let mut args = Vec::new();
        while !self.check(&TokenKind::RParen) {
            args.push(self.parse_expr()?);
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(&TokenKind::RParen)?;
        Ok(args)
    }

    fn parse_primary(&mut self) -> ScriptResult<Expr> {
        let span = self.current_span();
        let kind = match self.peek_kind().clone() {
            TokenKind::Int(value) => {
                self.advance();
                ExprKind::Int(value)
            }
            TokenKind::Float(value) => {
                self.advance();
                ExprKind::Float(value)
            }
            TokenKind::Str(text) => {
                self.advance();
                ExprKind::Str(Rc::from(text.as_str()))
            }
            TokenKind::True => {
                self.advance();
                ExprKind::Bool(true)
            }
            TokenKind::False => {
                self.advance();
                ExprKind::Bool(false)
            }
            TokenKind::Nil => {
                self.advance();
                ExprKind::Nil
            }
            TokenKind::Ident(name) => {
                self.advance();
                ExprKind::Ident(name)
            }
            TokenKind::LParen => {
                self.advance();
                let inner = self.parse_expr()?;
                self.expect(&TokenKind::RParen)?;
                return Ok(inner);
            }
            TokenKind::LBracket => self.parse_list()?,
            TokenKind::LBrace => self.parse_map()?,
            TokenKind::Fn => {
                self.advance();
                ExprKind::Lambda(self.parse_function("<lambda>".to_string(), span)?)
            }
            other => {
                return Err(self.error_here(format!("expected expression, got `{other}`")));
            }
        };
        Ok(Expr::new(kind, span))
    }

    fn parse_list(&mut self) -> ScriptResult<ExprKind> {
        self.expect(&TokenKind::LBracket)?;
        let mut items = Vec::new();
        while !self.check(&TokenKind::RBracket) {
            items.push(self.parse_expr()?);
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(&TokenKind::RBracket)?;
        Ok(ExprKind::List(items))
    }

    fn parse_map(&mut self) -> ScriptResult<ExprKind> {
        self.expect(&TokenKind::LBrace)?;
        let mut entries = Vec::new();
        self.skip_newlines();
        while !self.check(&TokenKind::RBrace) {
            let key = match self.peek_kind().clone() {
                TokenKind::Str(key) | TokenKind::Ident(key) => {
                    self.advance();
                    key
                }
                other => {
                    return Err(self.error_here(format!(
                        "expected map key (string or name), got `{other}`"
                    )));
                }
            };
            self.skip_newlines();
            self.expect(&TokenKind::Colon)?;
            self.skip_newlines();
            let value = self.parse_expr()?;
            entries.push((key, value));
            self.skip_newlines();
            if !self.eat(&TokenKind::Comma) {
                break;
            }
            self.skip_newlines();
        }
        self.expect(&TokenKind::RBrace)?;
        Ok(ExprKind::Map(entries))
    }
}
