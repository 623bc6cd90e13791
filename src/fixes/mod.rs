//! Structural fixes for findings. Each fix rewrites the AST in place and
//! reports whether it applied; a fix whose target no longer exists is a
//! no-op returning false.

use std::collections::BTreeSet;

use crate::analysis::throws::DeclIndex;
use crate::analysis::{Finding, FixKind};
use crate::parser::ast::{
    Annotation, Block, CatchClause, Expr, Function, Program, Stmt, TypeExpr,
};
use crate::span::{Span, Spanned};

pub fn apply_fix(program: &mut Program, finding: &Finding, fix: FixKind) -> bool {
    match fix {
        FixKind::DeclareThrows => declare_throws(program, finding),
        FixKind::AddCatch => add_catch(program, finding),
        FixKind::SurroundWithTryCatch => surround(program, finding),
    }
}

/// Merge the finding's types into the target function's `@Throws`, creating
/// the annotation when none exists. Already-declared types are not
/// duplicated.
fn declare_throws(program: &mut Program, finding: &Finding) -> bool {
    let Some(target) = finding.function else {
        return false;
    };

    let (anno_idx, existing) = {
        let index = DeclIndex::build(program);
        let Some(func) = find_function(program, target) else {
            return false;
        };
        let idx = func
            .node
            .annotations
            .iter()
            .position(|a| index.is_throws_annotation(&a.node));
        let existing = index.annotated_throws(&func.node).unwrap_or_default();
        (idx, existing)
    };

    let missing: Vec<&String> = finding
        .unhandled
        .iter()
        .filter(|t| !existing.contains(*t))
        .collect();

    let Some(func) = find_function_mut(program, target) else {
        return false;
    };
    match anno_idx {
        Some(idx) => {
            let anno = &mut func.node.annotations[idx];
            for ty in missing {
                anno.node.args.push(class_lit(ty));
            }
        }
        None => {
            let args = missing.into_iter().map(|t| class_lit(t)).collect();
            let anno = Annotation {
                path: vec![Spanned::dummy("Throws".to_string())],
                args,
            };
            func.node.annotations.insert(0, Spanned::dummy(anno));
        }
    }
    true
}

/// Append catch clauses for the finding's types to the innermost enclosing
/// try. Catches live apart from the finally block, so the new clauses land
/// before it structurally.
fn add_catch(program: &mut Program, finding: &Finding) -> bool {
    let Some(target) = finding.try_site else {
        return false;
    };

    let existing: BTreeSet<String> = {
        let index = DeclIndex::build(program);
        let Some(Stmt::Try { catches, .. }) = find_stmt(program, target) else {
            return false;
        };
        catches
            .iter()
            .filter_map(|c| index.resolve_type(&c.ty))
            .collect()
    };

    let Some(Stmt::Try { catches, .. }) = find_stmt_mut(program, target) else {
        return false;
    };
    for ty in &finding.unhandled {
        if existing.contains(ty) {
            continue;
        }
        catches.push(catch_clause(ty));
    }
    true
}

/// Wrap the innermost statement containing the finding site in a fresh
/// try/catch covering the finding's types.
fn surround(program: &mut Program, finding: &Finding) -> bool {
    for func in &mut program.functions {
        if surround_in_block(&mut func.node.body, finding.site, &finding.unhandled) {
            return true;
        }
    }
    false
}

fn surround_in_block(block: &mut Spanned<Block>, site: Span, types: &[String]) -> bool {
    for i in 0..block.node.stmts.len() {
        if !block.node.stmts[i].span.contains(site) {
            continue;
        }
        if let Some(child) = child_block_containing(&mut block.node.stmts[i], site) {
            return surround_in_block(child, site, types);
        }

        let span = block.node.stmts[i].span;
        let placeholder = Spanned::dummy(Stmt::Expr(Spanned::dummy(Expr::BoolLit(false))));
        let old = std::mem::replace(&mut block.node.stmts[i], placeholder);
        let wrapped = Stmt::Try {
            body: Spanned::new(Block { stmts: vec![old] }, span),
            catches: types.iter().map(|t| catch_clause(t)).collect(),
            finally: None,
        };
        block.node.stmts[i] = Spanned::new(wrapped, span);
        return true;
    }
    false
}

/// The sub-block of a statement that contains the site, if any. When none
/// does, the statement itself is the wrap target.
fn child_block_containing(
    stmt: &mut Spanned<Stmt>,
    site: Span,
) -> Option<&mut Spanned<Block>> {
    let candidates: Vec<&mut Spanned<Block>> = match &mut stmt.node {
        Stmt::If { then_block, else_block, .. } => {
            let mut blocks = vec![then_block];
            blocks.extend(else_block.as_mut());
            blocks
        }
        Stmt::While { body, .. } | Stmt::For { body, .. } => vec![body],
        Stmt::Try { body, catches, finally } => {
            let mut blocks = vec![body];
            blocks.extend(catches.iter_mut().map(|c| &mut c.body));
            blocks.extend(finally.as_mut());
            blocks
        }
        Stmt::Func(func) => vec![&mut func.node.body],
        _ => Vec::new(),
    };
    candidates.into_iter().find(|b| b.span.contains(site))
}

fn find_function(program: &Program, span: Span) -> Option<&Spanned<Function>> {
    use crate::visit::{walk_function, Visitor};

    struct Finder<'ast> {
        span: Span,
        found: Option<&'ast Spanned<Function>>,
    }
    impl<'ast> Visitor<'ast> for Finder<'ast> {
        fn visit_function(&mut self, func: &'ast Spanned<Function>) {
            if func.span == self.span {
                self.found = Some(func);
            }
            walk_function(self, func);
        }
    }

    let mut finder = Finder { span, found: None };
    finder.visit_program(program);
    finder.found
}

fn find_function_mut(program: &mut Program, span: Span) -> Option<&mut Spanned<Function>> {
    for func in &mut program.functions {
        if let Some(found) = find_function_in(func, span) {
            return Some(found);
        }
    }
    None
}

fn find_function_in(func: &mut Spanned<Function>, span: Span) -> Option<&mut Spanned<Function>> {
    if func.span == span {
        return Some(func);
    }
    find_function_in_block(&mut func.node.body, span)
}

fn find_function_in_block(
    block: &mut Spanned<Block>,
    span: Span,
) -> Option<&mut Spanned<Function>> {
    for stmt in &mut block.node.stmts {
        let result = match &mut stmt.node {
            Stmt::Func(func) => find_function_in(func, span),
            Stmt::If { then_block, else_block, .. } => find_function_in_block(then_block, span)
                .or_else(|| {
                    else_block
                        .as_mut()
                        .and_then(|b| find_function_in_block(b, span))
                }),
            Stmt::While { body, .. } | Stmt::For { body, .. } => {
                find_function_in_block(body, span)
            }
            Stmt::Try { body, catches, finally } => find_function_in_block(body, span)
                .or_else(|| {
                    catches
                        .iter_mut()
                        .find_map(|c| find_function_in_block(&mut c.body, span))
                })
                .or_else(|| {
                    finally
                        .as_mut()
                        .and_then(|b| find_function_in_block(b, span))
                }),
            _ => None,
        };
        if result.is_some() {
            return result;
        }
    }
    None
}

fn find_stmt(program: &Program, span: Span) -> Option<&Stmt> {
    use crate::visit::{walk_stmt, Visitor};

    struct Finder<'ast> {
        span: Span,
        found: Option<&'ast Stmt>,
    }
    impl<'ast> Visitor<'ast> for Finder<'ast> {
        fn visit_stmt(&mut self, stmt: &'ast Spanned<Stmt>) {
            if stmt.span == self.span {
                self.found = Some(&stmt.node);
            }
            walk_stmt(self, stmt);
        }
    }

    let mut finder = Finder { span, found: None };
    finder.visit_program(program);
    finder.found
}

fn find_stmt_mut(program: &mut Program, span: Span) -> Option<&mut Stmt> {
    for func in &mut program.functions {
        if let Some(found) = find_stmt_in_block(&mut func.node.body, span) {
            return Some(found);
        }
    }
    None
}

fn find_stmt_in_block(block: &mut Spanned<Block>, span: Span) -> Option<&mut Stmt> {
    for stmt in &mut block.node.stmts {
        if stmt.span == span {
            return Some(&mut stmt.node);
        }
        let result = match &mut stmt.node {
            Stmt::If { then_block, else_block, .. } => find_stmt_in_block(then_block, span)
                .or_else(|| {
                    else_block.as_mut().and_then(|b| find_stmt_in_block(b, span))
                }),
            Stmt::While { body, .. } | Stmt::For { body, .. } => {
                find_stmt_in_block(body, span)
            }
            Stmt::Try { body, catches, finally } => find_stmt_in_block(body, span)
                .or_else(|| {
                    catches
                        .iter_mut()
                        .find_map(|c| find_stmt_in_block(&mut c.body, span))
                })
                .or_else(|| finally.as_mut().and_then(|b| find_stmt_in_block(b, span))),
            Stmt::Func(func) => find_stmt_in_block(&mut func.node.body, span),
            _ => None,
        };
        if result.is_some() {
            return result;
        }
    }
    None
}

/// Class literal for a canonical name, e.g. `io.IoError` -> `io.IoError::class`.
fn class_lit(canonical: &str) -> Spanned<Expr> {
    let path = canonical
        .split('.')
        .map(|seg| Spanned::dummy(seg.to_string()))
        .collect();
    Spanned::dummy(Expr::ClassLit(path))
}

fn catch_clause(canonical: &str) -> CatchClause {
    let ty = match canonical.rsplit_once('.') {
        Some((module, name)) => TypeExpr::Qualified {
            module: module.to_string(),
            name: name.to_string(),
        },
        None => TypeExpr::Named(canonical.to_string()),
    };
    CatchClause {
        param: Spanned::dummy("e".to_string()),
        ty: Spanned::dummy(ty),
        body: Spanned::dummy(Block { stmts: Vec::new() }),
    }
}
