//! Declared-throws resolution.
//!
//! Two conventions exist side by side: native declarations carry a `throws`
//! clause on the `extern fn` itself, source functions declare via a
//! `@Throws(E::class, ...)` annotation. The annotation is only recognized
//! when its path resolves to one of the canonical names below; a plain
//! `Throws` comes from the implicit prelude unless an import shadows it.

use std::collections::{BTreeMap, BTreeSet};

use crate::parser::ast::{
    Annotation, Expr, ExternFnDecl, Function, Program, TypeExpr,
};
use crate::span::Spanned;

pub const THROWS_ANNOTATION: &str = "std.Throws";
pub const NATIVE_THROWS_ANNOTATION: &str = "std.native.Throws";

/// What a call target declares it may throw.
#[derive(Debug, Clone, PartialEq)]
pub enum ThrowsDecl {
    /// From an `extern fn ... throws` clause.
    Native(BTreeSet<String>),
    /// From a recognized `@Throws` annotation. May be empty.
    Annotated(BTreeSet<String>),
    /// No declaration at all.
    Undeclared,
}

impl ThrowsDecl {
    pub fn types(&self) -> &BTreeSet<String> {
        static EMPTY: BTreeSet<String> = BTreeSet::new();
        match self {
            ThrowsDecl::Native(types) | ThrowsDecl::Annotated(types) => types,
            ThrowsDecl::Undeclared => &EMPTY,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub enum CallTarget<'p> {
    Native(&'p ExternFnDecl),
    Source(&'p Function),
}

/// Name-resolution oracle over a single program. Resolves bare top-level
/// call names, class names, and import bindings to canonical names. Method
/// calls and anything else it cannot see resolve to `None`, which downstream
/// means "skip the check".
pub struct DeclIndex<'p> {
    extern_fns: BTreeMap<&'p str, &'p ExternFnDecl>,
    functions: BTreeMap<&'p str, &'p Function>,
    classes: BTreeSet<&'p str>,
    imports: BTreeMap<&'p str, String>,
}

impl<'p> DeclIndex<'p> {
    pub fn build(program: &'p Program) -> Self {
        let mut extern_fns = BTreeMap::new();
        let mut functions = BTreeMap::new();
        let mut classes = BTreeSet::new();
        let mut imports = BTreeMap::new();

        for import in &program.imports {
            imports.insert(import.node.binding_name(), import.node.full_path());
        }
        for class in &program.classes {
            classes.insert(class.node.name.node.as_str());
        }
        for ext in &program.extern_fns {
            extern_fns.insert(ext.node.name.node.as_str(), &ext.node);
        }
        for func in &program.functions {
            functions.insert(func.node.name.node.as_str(), &func.node);
        }

        Self { extern_fns, functions, classes, imports }
    }

    /// Resolve a bare call name to its target. Native declarations win when
    /// both conventions declare the same name.
    pub fn resolve_call(&self, name: &str) -> Option<CallTarget<'p>> {
        if let Some(ext) = self.extern_fns.get(name) {
            return Some(CallTarget::Native(ext));
        }
        self.functions.get(name).map(|f| CallTarget::Source(*f))
    }

    pub fn declared_throws(&self, target: &CallTarget<'p>) -> ThrowsDecl {
        match target {
            CallTarget::Native(ext) => {
                let types = ext
                    .throws
                    .iter()
                    .filter_map(|ty| self.resolve_type(ty))
                    .collect();
                ThrowsDecl::Native(types)
            }
            CallTarget::Source(func) => match self.annotated_throws(func) {
                Some(types) => ThrowsDecl::Annotated(types),
                None => ThrowsDecl::Undeclared,
            },
        }
    }

    /// Canonical name of a type expression, or `None` when it does not
    /// resolve. A qualified path is taken as already canonical.
    pub fn resolve_type(&self, ty: &Spanned<TypeExpr>) -> Option<String> {
        match &ty.node {
            TypeExpr::Named(name) => self.resolve_class_name(name),
            TypeExpr::Qualified { module, name } => Some(format!("{module}.{name}")),
        }
    }

    fn resolve_class_name(&self, name: &str) -> Option<String> {
        if self.classes.contains(name) {
            return Some(name.to_string());
        }
        self.imports.get(name).cloned()
    }

    /// The static type of an expression, as far as this analysis can tell.
    /// Only direct constructor calls have a known type; everything else is
    /// `None`.
    pub fn expr_type(&self, expr: &Spanned<Expr>) -> Option<String> {
        match &expr.node {
            Expr::Call { name, .. } => {
                // A known function name is a call, not a construction
                if self.extern_fns.contains_key(name.node.as_str())
                    || self.functions.contains_key(name.node.as_str())
                {
                    return None;
                }
                self.resolve_class_name(&name.node)
            }
            _ => None,
        }
    }

    /// The declared-throws set of a source function, if it carries a
    /// recognized annotation. Only class-literal arguments that resolve
    /// contribute; malformed or unresolvable arguments are dropped.
    pub fn annotated_throws(&self, func: &Function) -> Option<BTreeSet<String>> {
        let anno = func
            .annotations
            .iter()
            .find(|a| self.is_throws_annotation(&a.node))?;

        let mut types = BTreeSet::new();
        for arg in &anno.node.args {
            if let Expr::ClassLit(path) = &arg.node {
                if let Some(canonical) = self.resolve_class_path(path) {
                    types.insert(canonical);
                }
            }
        }
        Some(types)
    }

    pub fn is_throws_annotation(&self, anno: &Annotation) -> bool {
        let Some(canonical) = self.canonical_annotation_path(&anno.path) else {
            return false;
        };
        canonical == THROWS_ANNOTATION || canonical == NATIVE_THROWS_ANNOTATION
    }

    fn canonical_annotation_path(&self, path: &[Spanned<String>]) -> Option<String> {
        match path {
            [single] => {
                if let Some(canonical) = self.imports.get(single.node.as_str()) {
                    // An import shadows the prelude binding
                    Some(canonical.clone())
                } else if single.node == "Throws" {
                    Some(THROWS_ANNOTATION.to_string())
                } else {
                    None
                }
            }
            [] => None,
            segments => Some(
                segments
                    .iter()
                    .map(|s| s.node.as_str())
                    .collect::<Vec<_>>()
                    .join("."),
            ),
        }
    }

    fn resolve_class_path(&self, path: &[Spanned<String>]) -> Option<String> {
        match path {
            [single] => self.resolve_class_name(&single.node),
            [] => None,
            segments => Some(
                segments
                    .iter()
                    .map(|s| s.node.as_str())
                    .collect::<Vec<_>>()
                    .join("."),
            ),
        }
    }
}
