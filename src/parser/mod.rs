pub mod ast;

use crate::diagnostics::AnalyzeError;
use crate::lexer::token::Token;
use crate::span::{Span, Spanned};
use ast::*;

pub struct Parser<'a> {
    tokens: &'a [Spanned<Token>],
    source: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    pub fn new(tokens: &'a [Spanned<Token>], source: &'a str) -> Self {
        Self { tokens, source, pos: 0 }
    }

    fn peek(&self) -> Option<&Spanned<Token>> {
        let mut i = self.pos;
        // Skip newlines when peeking
        while i < self.tokens.len() {
            if matches!(self.tokens[i].node, Token::Newline) {
                i += 1;
            } else {
                return Some(&self.tokens[i]);
            }
        }
        None
    }

    fn peek_raw(&self) -> Option<&Spanned<Token>> {
        self.tokens.get(self.pos)
    }

    /// Peek the nth non-newline token ahead (0 = same as `peek`).
    fn peek_nth(&self, n: usize) -> Option<&Spanned<Token>> {
        let mut i = self.pos;
        let mut seen = 0;
        while i < self.tokens.len() {
            if matches!(self.tokens[i].node, Token::Newline) {
                i += 1;
                continue;
            }
            if seen == n {
                return Some(&self.tokens[i]);
            }
            seen += 1;
            i += 1;
        }
        None
    }

    fn advance(&mut self) -> Option<&Spanned<Token>> {
        if self.pos < self.tokens.len() {
            let tok = &self.tokens[self.pos];
            self.pos += 1;
            Some(tok)
        } else {
            None
        }
    }

    fn skip_newlines(&mut self) {
        while self.pos < self.tokens.len() && matches!(self.tokens[self.pos].node, Token::Newline) {
            self.pos += 1;
        }
    }

    fn expect(&mut self, expected: &Token) -> Result<&Spanned<Token>, AnalyzeError> {
        self.skip_newlines();
        match self.tokens.get(self.pos) {
            Some(tok) if std::mem::discriminant(&tok.node) == std::mem::discriminant(expected) => {
                self.pos += 1;
                Ok(&self.tokens[self.pos - 1])
            }
            Some(tok) => Err(AnalyzeError::syntax(
                format!("expected {expected}, found {}", tok.node),
                tok.span,
            )),
            None => Err(AnalyzeError::syntax(
                format!("expected {expected}, found end of file"),
                self.eof_span(),
            )),
        }
    }

    fn expect_ident(&mut self) -> Result<Spanned<String>, AnalyzeError> {
        self.skip_newlines();
        match self.tokens.get(self.pos) {
            Some(tok) if matches!(tok.node, Token::Ident) => {
                let name = self.source[tok.span.start..tok.span.end].to_string();
                self.pos += 1;
                Ok(Spanned::new(name, tok.span))
            }
            Some(tok) => Err(AnalyzeError::syntax(
                format!("expected identifier, found {}", tok.node),
                tok.span,
            )),
            None => Err(AnalyzeError::syntax(
                "expected identifier, found end of file",
                self.eof_span(),
            )),
        }
    }

    fn eof_span(&self) -> Span {
        if let Some(last) = self.tokens.last() {
            Span::new(last.span.end, last.span.end)
        } else {
            Span::dummy()
        }
    }

    fn consume_statement_end(&mut self) {
        if let Some(tok) = self.peek_raw() {
            if matches!(tok.node, Token::Newline) {
                self.advance();
            }
        }
    }

    pub fn parse_program(&mut self) -> Result<Program, AnalyzeError> {
        let mut imports = Vec::new();
        let mut classes = Vec::new();
        let mut extern_fns = Vec::new();
        let mut functions = Vec::new();

        self.skip_newlines();
        while let Some(tok) = self.peek() {
            let (node, span) = (tok.node.clone(), tok.span);
            match node {
                Token::Import => imports.push(self.parse_import()?),
                Token::Class => classes.push(self.parse_class(false)?),
                Token::Extern => extern_fns.push(self.parse_extern_fn(false)?),
                Token::At | Token::Fn => functions.push(self.parse_annotated_function(false)?),
                Token::Pub => match self.peek_nth(1).map(|t| t.node.clone()) {
                    Some(Token::Class) => {
                        self.advance();
                        classes.push(self.parse_class(true)?);
                    }
                    Some(Token::Extern) => {
                        self.advance();
                        extern_fns.push(self.parse_extern_fn(true)?);
                    }
                    Some(Token::Fn) | Some(Token::At) => {
                        self.advance();
                        functions.push(self.parse_annotated_function(true)?);
                    }
                    _ => {
                        return Err(AnalyzeError::syntax(
                            "expected declaration after 'pub'",
                            span,
                        ));
                    }
                },
                other => {
                    return Err(AnalyzeError::syntax(
                        format!("expected declaration, found {other}"),
                        span,
                    ));
                }
            }
            self.skip_newlines();
        }

        Ok(Program { imports, classes, extern_fns, functions })
    }

    fn parse_import(&mut self) -> Result<Spanned<ImportDecl>, AnalyzeError> {
        let start = self.expect(&Token::Import)?.span.start;
        let path = self.parse_path()?;

        let alias = if self.peek_raw().is_some_and(|t| matches!(t.node, Token::As)) {
            self.advance();
            Some(self.expect_ident()?)
        } else {
            None
        };

        let end = alias
            .as_ref()
            .map_or(path.last().map_or(start, |p| p.span.end), |a| a.span.end);
        self.consume_statement_end();

        Ok(Spanned::new(ImportDecl { path, alias }, Span::new(start, end)))
    }

    /// Dotted identifier path: `a.b.c`.
    fn parse_path(&mut self) -> Result<Vec<Spanned<String>>, AnalyzeError> {
        let mut path = vec![self.expect_ident()?];
        while self.peek_raw().is_some_and(|t| matches!(t.node, Token::Dot)) {
            self.advance();
            path.push(self.expect_ident()?);
        }
        Ok(path)
    }

    fn parse_class(&mut self, is_pub: bool) -> Result<Spanned<ClassDecl>, AnalyzeError> {
        let start = self.expect(&Token::Class)?.span.start;
        let name = self.expect_ident()?;
        let mut end = name.span.end;

        let mut fields = Vec::new();
        if self.peek_raw().is_some_and(|t| matches!(t.node, Token::LBrace)) {
            self.advance();
            self.skip_newlines();
            while self.peek().is_some_and(|t| !matches!(t.node, Token::RBrace)) {
                let fname = self.expect_ident()?;
                self.expect(&Token::Colon)?;
                let ty = self.parse_type()?;
                fields.push(Field { name: fname, ty });
                if self.peek().is_some_and(|t| matches!(t.node, Token::Comma)) {
                    self.advance();
                }
                self.skip_newlines();
            }
            end = self.expect(&Token::RBrace)?.span.end;
        }
        self.consume_statement_end();

        Ok(Spanned::new(ClassDecl { name, fields, is_pub }, Span::new(start, end)))
    }

    fn parse_extern_fn(&mut self, is_pub: bool) -> Result<Spanned<ExternFnDecl>, AnalyzeError> {
        let start = self.expect(&Token::Extern)?.span.start;
        self.expect(&Token::Fn)?;
        let name = self.expect_ident()?;
        let params = self.parse_params()?;

        let return_type = if self.peek_raw().is_some_and(|t| matches!(t.node, Token::Ident)) {
            Some(self.parse_type()?)
        } else {
            None
        };

        let mut throws = Vec::new();
        let mut end = return_type
            .as_ref()
            .map_or(name.span.end, |t| t.span.end);
        if self.peek_raw().is_some_and(|t| matches!(t.node, Token::Throws)) {
            self.advance();
            loop {
                let ty = self.parse_type()?;
                end = ty.span.end;
                throws.push(ty);
                if self.peek_raw().is_some_and(|t| matches!(t.node, Token::Comma)) {
                    self.advance();
                } else {
                    break;
                }
            }
        }
        self.consume_statement_end();

        Ok(Spanned::new(
            ExternFnDecl { name, params, return_type, throws, is_pub },
            Span::new(start, end),
        ))
    }

    fn parse_annotated_function(&mut self, is_pub: bool) -> Result<Spanned<Function>, AnalyzeError> {
        let mut annotations = Vec::new();
        while self.peek().is_some_and(|t| matches!(t.node, Token::At)) {
            annotations.push(self.parse_annotation()?);
        }
        self.parse_function(annotations, is_pub)
    }

    fn parse_annotation(&mut self) -> Result<Spanned<Annotation>, AnalyzeError> {
        let start = self.expect(&Token::At)?.span.start;
        let path = self.parse_path()?;
        let mut end = path.last().map_or(start, |p| p.span.end);

        let mut args = Vec::new();
        if self.peek_raw().is_some_and(|t| matches!(t.node, Token::LParen)) {
            self.advance();
            while self.peek().is_some_and(|t| !matches!(t.node, Token::RParen)) {
                if !args.is_empty() {
                    self.expect(&Token::Comma)?;
                }
                args.push(self.parse_expr(0)?);
            }
            end = self.expect(&Token::RParen)?.span.end;
        }

        Ok(Spanned::new(Annotation { path, args }, Span::new(start, end)))
    }

    fn parse_function(
        &mut self,
        annotations: Vec<Spanned<Annotation>>,
        is_pub: bool,
    ) -> Result<Spanned<Function>, AnalyzeError> {
        let fn_start = self.expect(&Token::Fn)?.span.start;
        let start = annotations.first().map_or(fn_start, |a| a.span.start);
        let name = self.expect_ident()?;
        let params = self.parse_params()?;

        let return_type = if self.peek_raw().is_some_and(|t| matches!(t.node, Token::Ident)) {
            Some(self.parse_type()?)
        } else {
            None
        };

        let body = self.parse_block()?;
        let end = body.span.end;

        Ok(Spanned::new(
            Function { name, annotations, params, return_type, body, is_pub },
            Span::new(start, end),
        ))
    }

    fn parse_params(&mut self) -> Result<Vec<Param>, AnalyzeError> {
        self.expect(&Token::LParen)?;
        let mut params = Vec::new();
        while self.peek().is_some_and(|t| !matches!(t.node, Token::RParen)) {
            if !params.is_empty() {
                self.expect(&Token::Comma)?;
            }
            let name = self.expect_ident()?;
            self.expect(&Token::Colon)?;
            let ty = self.parse_type()?;
            params.push(Param { name, ty });
        }
        self.expect(&Token::RParen)?;
        Ok(params)
    }

    fn parse_type(&mut self) -> Result<Spanned<TypeExpr>, AnalyzeError> {
        let path = self.parse_path()?;
        let start = path.first().map_or(0, |p| p.span.start);
        let end = path.last().map_or(0, |p| p.span.end);
        let span = Span::new(start, end);

        if path.len() == 1 {
            let seg = path.into_iter().next().expect("non-empty path");
            Ok(Spanned::new(TypeExpr::Named(seg.node), span))
        } else {
            let name = path.last().expect("non-empty path").node.clone();
            let module = path[..path.len() - 1]
                .iter()
                .map(|s| s.node.as_str())
                .collect::<Vec<_>>()
                .join(".");
            Ok(Spanned::new(TypeExpr::Qualified { module, name }, span))
        }
    }

    fn parse_block(&mut self) -> Result<Spanned<Block>, AnalyzeError> {
        let open = self.expect(&Token::LBrace)?;
        let start = open.span.start;
        let mut stmts = Vec::new();

        self.skip_newlines();
        while self.peek().is_some_and(|t| !matches!(t.node, Token::RBrace)) {
            stmts.push(self.parse_stmt()?);
            self.skip_newlines();
        }

        let close = self.expect(&Token::RBrace)?;
        let end = close.span.end;

        Ok(Spanned::new(Block { stmts }, Span::new(start, end)))
    }

    fn parse_stmt(&mut self) -> Result<Spanned<Stmt>, AnalyzeError> {
        let tok = self.peek().ok_or_else(|| {
            AnalyzeError::syntax("unexpected end of file", self.eof_span())
        })?;
        let (node, tok_span) = (tok.node.clone(), tok.span);

        match node {
            Token::Let => self.parse_let_stmt(),
            Token::Return => self.parse_return_stmt(),
            Token::If => self.parse_if_stmt(),
            Token::While => self.parse_while_stmt(),
            Token::For => self.parse_for_stmt(),
            Token::Try => self.parse_try_stmt(),
            Token::Throw => self.parse_throw_stmt(),
            Token::At => {
                let func = self.parse_annotated_function(false)?;
                let span = func.span;
                Ok(Spanned::new(Stmt::Func(func), span))
            }
            // `fn name(...)` is a nested named function; `fn (...)` in
            // expression position is a closure and lands in the arm below.
            Token::Fn if self.peek_nth(1).is_some_and(|t| matches!(t.node, Token::Ident)) => {
                let func = self.parse_function(Vec::new(), false)?;
                let span = func.span;
                Ok(Spanned::new(Stmt::Func(func), span))
            }
            _ => {
                let start = tok_span.start;
                let expr = self.parse_expr(0)?;

                if self.peek_raw().is_some_and(|t| matches!(t.node, Token::Eq)) {
                    self.advance(); // consume '='
                    let value = self.parse_expr(0)?;
                    let end = value.span.end;
                    self.consume_statement_end();

                    match expr.node {
                        Expr::Ident(name) => Ok(Spanned::new(
                            Stmt::Assign {
                                target: Spanned::new(name, expr.span),
                                value,
                            },
                            Span::new(start, end),
                        )),
                        _ => Err(AnalyzeError::syntax("invalid assignment target", expr.span)),
                    }
                } else {
                    let end = expr.span.end;
                    self.consume_statement_end();
                    Ok(Spanned::new(Stmt::Expr(expr), Span::new(start, end)))
                }
            }
        }
    }

    fn parse_let_stmt(&mut self) -> Result<Spanned<Stmt>, AnalyzeError> {
        let start = self.expect(&Token::Let)?.span.start;
        let name = self.expect_ident()?;

        let ty = if self.peek_raw().is_some_and(|t| matches!(t.node, Token::Colon)) {
            self.advance();
            Some(self.parse_type()?)
        } else {
            None
        };

        self.expect(&Token::Eq)?;
        let value = self.parse_expr(0)?;
        let end = value.span.end;
        self.consume_statement_end();

        Ok(Spanned::new(Stmt::Let { name, ty, value }, Span::new(start, end)))
    }

    fn parse_return_stmt(&mut self) -> Result<Spanned<Stmt>, AnalyzeError> {
        let ret_span = self.expect(&Token::Return)?.span;
        let start = ret_span.start;

        let value = if self.peek_raw().is_none_or(|t| matches!(t.node, Token::Newline | Token::RBrace)) {
            None
        } else {
            Some(self.parse_expr(0)?)
        };

        let end = value.as_ref().map_or(ret_span.end, |v| v.span.end);
        self.consume_statement_end();

        Ok(Spanned::new(Stmt::Return(value), Span::new(start, end)))
    }

    fn parse_if_stmt(&mut self) -> Result<Spanned<Stmt>, AnalyzeError> {
        let start = self.expect(&Token::If)?.span.start;
        let condition = self.parse_expr(0)?;
        let then_block = self.parse_block()?;

        let else_block = if self.peek().is_some_and(|t| matches!(t.node, Token::Else)) {
            self.advance();
            Some(self.parse_block()?)
        } else {
            None
        };

        let end = else_block.as_ref().map_or(then_block.span.end, |b| b.span.end);

        Ok(Spanned::new(
            Stmt::If { condition, then_block, else_block },
            Span::new(start, end),
        ))
    }

    fn parse_while_stmt(&mut self) -> Result<Spanned<Stmt>, AnalyzeError> {
        let start = self.expect(&Token::While)?.span.start;
        let condition = self.parse_expr(0)?;
        let body = self.parse_block()?;
        let end = body.span.end;

        Ok(Spanned::new(Stmt::While { condition, body }, Span::new(start, end)))
    }

    fn parse_for_stmt(&mut self) -> Result<Spanned<Stmt>, AnalyzeError> {
        let start = self.expect(&Token::For)?.span.start;
        let var = self.expect_ident()?;
        self.expect(&Token::In)?;
        let iterable = self.parse_expr(0)?;
        let body = self.parse_block()?;
        let end = body.span.end;

        Ok(Spanned::new(Stmt::For { var, iterable, body }, Span::new(start, end)))
    }

    fn parse_try_stmt(&mut self) -> Result<Spanned<Stmt>, AnalyzeError> {
        let start = self.expect(&Token::Try)?.span.start;
        let body = self.parse_block()?;

        let mut catches = Vec::new();
        while self.peek().is_some_and(|t| matches!(t.node, Token::Catch)) {
            self.advance();
            self.expect(&Token::LParen)?;
            let param = self.expect_ident()?;
            self.expect(&Token::Colon)?;
            let ty = self.parse_type()?;
            self.expect(&Token::RParen)?;
            let catch_body = self.parse_block()?;
            catches.push(CatchClause { param, ty, body: catch_body });
        }

        let finally = if self.peek().is_some_and(|t| matches!(t.node, Token::Finally)) {
            self.advance();
            Some(self.parse_block()?)
        } else {
            None
        };

        let end = finally
            .as_ref()
            .map(|f| f.span.end)
            .or_else(|| catches.last().map(|c| c.body.span.end))
            .unwrap_or(body.span.end);

        Ok(Spanned::new(Stmt::Try { body, catches, finally }, Span::new(start, end)))
    }

    fn parse_throw_stmt(&mut self) -> Result<Spanned<Stmt>, AnalyzeError> {
        let start = self.expect(&Token::Throw)?.span.start;
        let expr = self.parse_expr(0)?;
        let end = expr.span.end;
        self.consume_statement_end();

        Ok(Spanned::new(Stmt::Throw(expr), Span::new(start, end)))
    }

    fn parse_expr(&mut self, min_bp: u8) -> Result<Spanned<Expr>, AnalyzeError> {
        let mut lhs = self.parse_prefix()?;

        loop {
            let Some(tok) = self.peek_raw() else { break };
            let node = tok.node.clone();

            // Postfix forms bind tightest
            match node {
                Token::Dot => {
                    self.advance();
                    let field_name = self.expect_ident()?;

                    if self.peek_raw().is_some_and(|t| matches!(t.node, Token::LParen)) {
                        let args = self.parse_call_args()?;
                        let end = args.1;
                        let span = Span::new(lhs.span.start, end);
                        lhs = Spanned::new(
                            Expr::MethodCall {
                                object: Box::new(lhs),
                                method: field_name,
                                args: args.0,
                            },
                            span,
                        );
                    } else {
                        let span = Span::new(lhs.span.start, field_name.span.end);
                        lhs = Spanned::new(
                            Expr::FieldAccess { object: Box::new(lhs), field: field_name },
                            span,
                        );
                    }
                    continue;
                }
                Token::LBracket => {
                    self.advance();
                    let index = self.parse_expr(0)?;
                    let close = self.expect(&Token::RBracket)?;
                    let span = Span::new(lhs.span.start, close.span.end);
                    lhs = Spanned::new(
                        Expr::Index { object: Box::new(lhs), index: Box::new(index) },
                        span,
                    );
                    continue;
                }
                Token::ColonColon => {
                    self.advance();
                    let class_tok = self.expect(&Token::Class)?;
                    let span = Span::new(lhs.span.start, class_tok.span.end);
                    let path = expr_to_path(&lhs).ok_or_else(|| {
                        AnalyzeError::syntax("'::class' requires a type path", lhs.span)
                    })?;
                    lhs = Spanned::new(Expr::ClassLit(path), span);
                    continue;
                }
                _ => {}
            }

            let Some((op, bp)) = binop_for(&node) else { break };
            if bp < min_bp {
                break;
            }
            self.advance();
            let rhs = self.parse_expr(bp + 1)?;
            let span = Span::new(lhs.span.start, rhs.span.end);
            lhs = Spanned::new(
                Expr::BinOp { op, lhs: Box::new(lhs), rhs: Box::new(rhs) },
                span,
            );
        }

        Ok(lhs)
    }

    fn parse_prefix(&mut self) -> Result<Spanned<Expr>, AnalyzeError> {
        self.skip_newlines();
        let tok = self.peek().ok_or_else(|| {
            AnalyzeError::syntax("unexpected end of file in expression", self.eof_span())
        })?;
        let span = tok.span;

        match tok.node.clone() {
            Token::IntLit(v) => {
                self.advance();
                Ok(Spanned::new(Expr::IntLit(v), span))
            }
            Token::FloatLit(v) => {
                self.advance();
                Ok(Spanned::new(Expr::FloatLit(v), span))
            }
            Token::StringLit(s) => {
                self.advance();
                Ok(Spanned::new(Expr::StringLit(s), span))
            }
            Token::True => {
                self.advance();
                Ok(Spanned::new(Expr::BoolLit(true), span))
            }
            Token::False => {
                self.advance();
                Ok(Spanned::new(Expr::BoolLit(false), span))
            }
            Token::Ident => {
                let name = self.expect_ident()?;
                if self.peek_raw().is_some_and(|t| matches!(t.node, Token::LParen)) {
                    let (args, end) = self.parse_call_args()?;
                    let span = Span::new(name.span.start, end);
                    Ok(Spanned::new(Expr::Call { name, args }, span))
                } else {
                    Ok(Spanned::new(Expr::Ident(name.node), name.span))
                }
            }
            Token::LParen => {
                self.advance();
                let inner = self.parse_expr(0)?;
                self.expect(&Token::RParen)?;
                Ok(inner)
            }
            Token::Minus => {
                self.advance();
                let operand = self.parse_prefix()?;
                let span = Span::new(span.start, operand.span.end);
                Ok(Spanned::new(
                    Expr::UnaryOp { op: UnaryOp::Neg, operand: Box::new(operand) },
                    span,
                ))
            }
            Token::Bang => {
                self.advance();
                let operand = self.parse_prefix()?;
                let span = Span::new(span.start, operand.span.end);
                Ok(Spanned::new(
                    Expr::UnaryOp { op: UnaryOp::Not, operand: Box::new(operand) },
                    span,
                ))
            }
            Token::Fn => {
                self.advance();
                let params = self.parse_params()?;
                let body = self.parse_block()?;
                let span = Span::new(span.start, body.span.end);
                Ok(Spanned::new(Expr::Closure { params, body }, span))
            }
            other => Err(AnalyzeError::syntax(
                format!("expected expression, found {other}"),
                span,
            )),
        }
    }

    /// Parse `( expr, ... )`, returning the arguments and the closing paren's
    /// end offset.
    fn parse_call_args(&mut self) -> Result<(Vec<Spanned<Expr>>, usize), AnalyzeError> {
        self.expect(&Token::LParen)?;
        let mut args = Vec::new();
        while self.peek().is_some_and(|t| !matches!(t.node, Token::RParen)) {
            if !args.is_empty() {
                self.expect(&Token::Comma)?;
            }
            args.push(self.parse_expr(0)?);
        }
        let close = self.expect(&Token::RParen)?;
        Ok((args, close.span.end))
    }
}

/// Binding power per binary operator; higher binds tighter.
fn binop_for(tok: &Token) -> Option<(BinOp, u8)> {
    let entry = match tok {
        Token::PipePipe => (BinOp::Or, 1),
        Token::AmpAmp => (BinOp::And, 2),
        Token::EqEq => (BinOp::Eq, 3),
        Token::BangEq => (BinOp::Neq, 3),
        Token::Lt => (BinOp::Lt, 4),
        Token::Gt => (BinOp::Gt, 4),
        Token::LtEq => (BinOp::LtEq, 4),
        Token::GtEq => (BinOp::GtEq, 4),
        Token::Plus => (BinOp::Add, 5),
        Token::Minus => (BinOp::Sub, 5),
        Token::Star => (BinOp::Mul, 6),
        Token::Slash => (BinOp::Div, 6),
        Token::Percent => (BinOp::Mod, 6),
        _ => return None,
    };
    Some(entry)
}

/// Reconstruct a dotted path from an `Ident`/`FieldAccess` chain. Used for
/// `Path::class` literals.
fn expr_to_path(expr: &Spanned<Expr>) -> Option<Vec<Spanned<String>>> {
    match &expr.node {
        Expr::Ident(name) => Some(vec![Spanned::new(name.clone(), expr.span)]),
        Expr::FieldAccess { object, field } => {
            let mut path = expr_to_path(object)?;
            path.push(field.clone());
            Some(path)
        }
        _ => None,
    }
}
