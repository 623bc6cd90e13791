use crate::parser::ast::{Block, Expr, Stmt};
use crate::span::{Span, Spanned};

use super::scope::ScopeCtx;
use super::throws::DeclIndex;
use super::{Finding, FixKind};

/// Scope-aware walk over one function body. The context is threaded by
/// reference and extended functionally at try boundaries; the walk never
/// crosses into nested named functions or closures, those get their own
/// analysis (or none, for closures).
pub struct FlowWalker<'p, 'i> {
    index: &'i DeclIndex<'p>,
    findings: Vec<Finding>,
}

impl<'p, 'i> FlowWalker<'p, 'i> {
    pub fn new(index: &'i DeclIndex<'p>) -> Self {
        Self { index, findings: Vec::new() }
    }

    pub fn into_findings(self) -> Vec<Finding> {
        self.findings
    }

    pub fn visit_block(&mut self, block: &Spanned<Block>, ctx: &ScopeCtx) {
        for stmt in &block.node.stmts {
            self.visit_stmt(stmt, ctx);
        }
    }

    fn visit_stmt(&mut self, stmt: &Spanned<Stmt>, ctx: &ScopeCtx) {
        match &stmt.node {
            Stmt::Let { value, .. } => self.visit_expr(value, ctx),
            Stmt::Assign { value, .. } => self.visit_expr(value, ctx),
            Stmt::Return(value) => {
                if let Some(value) = value {
                    self.visit_expr(value, ctx);
                }
            }
            Stmt::If { condition, then_block, else_block } => {
                self.visit_expr(condition, ctx);
                self.visit_block(then_block, ctx);
                if let Some(else_block) = else_block {
                    self.visit_block(else_block, ctx);
                }
            }
            Stmt::While { condition, body } => {
                self.visit_expr(condition, ctx);
                self.visit_block(body, ctx);
            }
            Stmt::For { iterable, body, .. } => {
                self.visit_expr(iterable, ctx);
                self.visit_block(body, ctx);
            }
            Stmt::Try { body, catches, finally } => {
                // The try body sees every resolvable catch type as handled.
                // A catch clause whose type does not resolve contributes
                // nothing, its body still runs under the outer context.
                let caught: Vec<String> = catches
                    .iter()
                    .filter_map(|c| self.index.resolve_type(&c.ty))
                    .collect();
                let inner = ctx.with_handled(caught).with_try(stmt.span);
                self.visit_block(body, &inner);

                // Catch bodies run under the context the try appeared in:
                // a catch cannot handle its own throws, nor a sibling's.
                for catch in catches {
                    self.visit_block(&catch.body, ctx);
                }

                // Finally runs whether or not anything was caught, so it
                // inherits nothing: blank slate, no fix targets.
                if let Some(finally) = finally {
                    self.visit_block(finally, &ScopeCtx::default());
                }
            }
            Stmt::Throw(expr) => {
                self.visit_expr(expr, ctx);
                self.check_throw(stmt.span, expr, ctx);
            }
            // Nested named functions are analyzed on their own
            Stmt::Func(_) => {}
            Stmt::Expr(expr) => self.visit_expr(expr, ctx),
        }
    }

    fn visit_expr(&mut self, expr: &Spanned<Expr>, ctx: &ScopeCtx) {
        match &expr.node {
            Expr::IntLit(_)
            | Expr::FloatLit(_)
            | Expr::BoolLit(_)
            | Expr::StringLit(_)
            | Expr::Ident(_)
            | Expr::ClassLit(_) => {}
            Expr::BinOp { lhs, rhs, .. } => {
                self.visit_expr(lhs, ctx);
                self.visit_expr(rhs, ctx);
            }
            Expr::UnaryOp { operand, .. } => self.visit_expr(operand, ctx),
            Expr::Call { name, args } => {
                // Arguments evaluate before the call itself
                for arg in args {
                    self.visit_expr(arg, ctx);
                }
                self.check_call(name, ctx);
            }
            Expr::MethodCall { object, args, .. } => {
                self.visit_expr(object, ctx);
                for arg in args {
                    self.visit_expr(arg, ctx);
                }
                // Method targets are beyond this resolver, skip the check
            }
            Expr::FieldAccess { object, .. } => self.visit_expr(object, ctx),
            Expr::Index { object, index } => {
                self.visit_expr(object, ctx);
                self.visit_expr(index, ctx);
            }
            Expr::Closure { .. } => {}
        }
    }

    fn check_call(&mut self, name: &Spanned<String>, ctx: &ScopeCtx) {
        let Some(target) = self.index.resolve_call(&name.node) else {
            return;
        };
        let unhandled: Vec<String> = self
            .index
            .declared_throws(&target)
            .types()
            .iter()
            .filter(|t| !ctx.covers(t))
            .cloned()
            .collect();
        if !unhandled.is_empty() {
            self.report(name.span, unhandled, ctx);
        }
    }

    fn check_throw(&mut self, site: Span, expr: &Spanned<Expr>, ctx: &ScopeCtx) {
        let Some(thrown) = self.index.expr_type(expr) else {
            return;
        };
        if !ctx.covers(&thrown) {
            self.report(site, vec![thrown], ctx);
        }
    }

    fn report(&mut self, site: Span, unhandled: Vec<String>, ctx: &ScopeCtx) {
        let mut fixes = Vec::new();
        if ctx.try_site().is_some() {
            fixes.push(FixKind::AddCatch);
        }
        if ctx.function().is_some() {
            fixes.push(FixKind::DeclareThrows);
        }
        fixes.push(FixKind::SurroundWithTryCatch);

        self.findings.push(Finding {
            site,
            unhandled,
            fixes,
            function: ctx.function(),
            try_site: ctx.try_site(),
        });
    }
}
