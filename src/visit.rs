//! Borrowing AST traversal.
//!
//! `Visitor` is the right tool for collection passes that want every node
//! by default. Passes with mostly custom control flow (the exception-flow
//! walk, the fix rewrites) are better off as a hand-rolled match over the
//! nodes they care about instead of fighting the default recursion here.

use crate::parser::ast::*;
use crate::span::Spanned;

pub trait Visitor<'ast>: Sized {
    fn visit_program(&mut self, program: &'ast Program) {
        walk_program(self, program);
    }

    fn visit_function(&mut self, func: &'ast Spanned<Function>) {
        walk_function(self, func);
    }

    fn visit_block(&mut self, block: &'ast Spanned<Block>) {
        walk_block(self, block);
    }

    fn visit_stmt(&mut self, stmt: &'ast Spanned<Stmt>) {
        walk_stmt(self, stmt);
    }

    fn visit_expr(&mut self, expr: &'ast Spanned<Expr>) {
        walk_expr(self, expr);
    }
}

pub fn walk_program<'ast, V: Visitor<'ast>>(visitor: &mut V, program: &'ast Program) {
    for func in &program.functions {
        visitor.visit_function(func);
    }
}

pub fn walk_function<'ast, V: Visitor<'ast>>(visitor: &mut V, func: &'ast Spanned<Function>) {
    visitor.visit_block(&func.node.body);
}

pub fn walk_block<'ast, V: Visitor<'ast>>(visitor: &mut V, block: &'ast Spanned<Block>) {
    for stmt in &block.node.stmts {
        visitor.visit_stmt(stmt);
    }
}

pub fn walk_stmt<'ast, V: Visitor<'ast>>(visitor: &mut V, stmt: &'ast Spanned<Stmt>) {
    match &stmt.node {
        Stmt::Let { value, .. } => visitor.visit_expr(value),
        Stmt::Assign { value, .. } => visitor.visit_expr(value),
        Stmt::Return(value) => {
            if let Some(value) = value {
                visitor.visit_expr(value);
            }
        }
        Stmt::If { condition, then_block, else_block } => {
            visitor.visit_expr(condition);
            visitor.visit_block(then_block);
            if let Some(else_block) = else_block {
                visitor.visit_block(else_block);
            }
        }
        Stmt::While { condition, body } => {
            visitor.visit_expr(condition);
            visitor.visit_block(body);
        }
        Stmt::For { iterable, body, .. } => {
            visitor.visit_expr(iterable);
            visitor.visit_block(body);
        }
        Stmt::Try { body, catches, finally } => {
            visitor.visit_block(body);
            for catch in catches {
                visitor.visit_block(&catch.body);
            }
            if let Some(finally) = finally {
                visitor.visit_block(finally);
            }
        }
        Stmt::Throw(expr) => visitor.visit_expr(expr),
        Stmt::Func(func) => visitor.visit_function(func),
        Stmt::Expr(expr) => visitor.visit_expr(expr),
    }
}

pub fn walk_expr<'ast, V: Visitor<'ast>>(visitor: &mut V, expr: &'ast Spanned<Expr>) {
    match &expr.node {
        Expr::IntLit(_)
        | Expr::FloatLit(_)
        | Expr::BoolLit(_)
        | Expr::StringLit(_)
        | Expr::Ident(_)
        | Expr::ClassLit(_) => {}
        Expr::BinOp { lhs, rhs, .. } => {
            visitor.visit_expr(lhs);
            visitor.visit_expr(rhs);
        }
        Expr::UnaryOp { operand, .. } => visitor.visit_expr(operand),
        Expr::Call { args, .. } => {
            for arg in args {
                visitor.visit_expr(arg);
            }
        }
        Expr::MethodCall { object, args, .. } => {
            visitor.visit_expr(object);
            for arg in args {
                visitor.visit_expr(arg);
            }
        }
        Expr::FieldAccess { object, .. } => visitor.visit_expr(object),
        Expr::Index { object, index } => {
            visitor.visit_expr(object);
            visitor.visit_expr(index);
        }
        Expr::Closure { body, .. } => visitor.visit_block(body),
    }
}
