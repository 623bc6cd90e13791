use std::collections::BTreeSet;

use crate::span::Span;

/// Immutable per-scope analysis context. Extension is functional: entering a
/// try body produces a new context, the original stays untouched for sibling
/// scopes (catch bodies in particular).
#[derive(Debug, Clone, Default)]
pub struct ScopeCtx {
    handled: BTreeSet<String>,
    function: Option<Span>,
    try_site: Option<Span>,
}

impl ScopeCtx {
    /// Root context for a named function body. `declared` is the set of
    /// canonical exception names the function itself declares.
    pub fn for_function(span: Span, declared: BTreeSet<String>) -> Self {
        Self {
            handled: declared,
            function: Some(span),
            try_site: None,
        }
    }

    /// New context with the given canonical names added to the handled set.
    pub fn with_handled(&self, types: impl IntoIterator<Item = String>) -> Self {
        let mut next = self.clone();
        next.handled.extend(types);
        next
    }

    /// New context recording the innermost enclosing try statement.
    pub fn with_try(&self, span: Span) -> Self {
        let mut next = self.clone();
        next.try_site = Some(span);
        next
    }

    /// Exact canonical-name identity, no subtyping.
    pub fn covers(&self, canonical: &str) -> bool {
        self.handled.contains(canonical)
    }

    pub fn function(&self) -> Option<Span> {
        self.function
    }

    pub fn try_site(&self) -> Option<Span> {
        self.try_site
    }
}
