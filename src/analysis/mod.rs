pub mod scope;
pub mod throws;
pub mod walker;

use serde::Serialize;

use crate::parser::ast::{Function, Program};
use crate::span::{Span, Spanned};
use crate::visit::{walk_function, Visitor};

use scope::ScopeCtx;
use throws::DeclIndex;
use walker::FlowWalker;

/// One warning site: a call or throw whose exceptions escape uncaught and
/// undeclared. `function` and `try_site` locate the nodes the fixes target.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Finding {
    pub site: Span,
    /// Canonical names, sorted.
    pub unhandled: Vec<String>,
    pub fixes: Vec<FixKind>,
    pub function: Option<Span>,
    pub try_site: Option<Span>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FixKind {
    /// Add the missing types to the innermost enclosing try's catches.
    AddCatch,
    /// Add (or extend) `@Throws` on the enclosing function.
    DeclareThrows,
    /// Wrap the offending statement in a fresh try/catch.
    SurroundWithTryCatch,
}

/// Analyze every named function in the program, nested ones included. Each
/// function is a separate analysis root seeded with its own declared throws;
/// the walk inside never crosses a function boundary.
pub fn analyze_program(program: &Program) -> Vec<Finding> {
    analyze_with_exemptions(program, &[])
}

/// Like [`analyze_program`], but functions named in `exempt` are not
/// analyzed at all. Calls *to* an exempt function are still checked.
pub fn analyze_with_exemptions(program: &Program, exempt: &[String]) -> Vec<Finding> {
    let index = DeclIndex::build(program);

    let mut collector = FnCollector { functions: Vec::new() };
    collector.visit_program(program);

    let mut findings = Vec::new();
    for func in collector.functions {
        if exempt.iter().any(|name| *name == func.node.name.node) {
            continue;
        }
        let declared = index.annotated_throws(&func.node).unwrap_or_default();
        let ctx = ScopeCtx::for_function(func.span, declared);
        let mut walker = FlowWalker::new(&index);
        walker.visit_block(&func.node.body, &ctx);
        findings.extend(walker.into_findings());
    }
    findings
}

struct FnCollector<'ast> {
    functions: Vec<&'ast Spanned<Function>>,
}

impl<'ast> Visitor<'ast> for FnCollector<'ast> {
    fn visit_function(&mut self, func: &'ast Spanned<Function>) {
        self.functions.push(func);
        walk_function(self, func);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::lex;
    use crate::parser::Parser;

    fn analyze(src: &str) -> Vec<Finding> {
        let tokens = lex(src).unwrap();
        let program = Parser::new(&tokens, src).parse_program().unwrap();
        analyze_program(&program)
    }

    #[test]
    fn undeclared_call_is_clean() {
        let findings = analyze("fn helper() {\n}\nfn main() {\n    helper()\n}");
        assert!(findings.is_empty());
    }

    #[test]
    fn call_to_native_thrower_is_reported() {
        let src = "extern fn read() throws io.IoError\nfn main() {\n    read()\n}";
        let findings = analyze(src);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].unhandled, ["io.IoError"]);
        assert_eq!(
            findings[0].fixes,
            [FixKind::DeclareThrows, FixKind::SurroundWithTryCatch]
        );
    }

    #[test]
    fn call_to_annotated_thrower_is_reported() {
        let src = "import io.IoError\n@Throws(IoError::class)\nfn risky() {\n}\nfn main() {\n    risky()\n}";
        let findings = analyze(src);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].unhandled, ["io.IoError"]);
    }

    #[test]
    fn caller_declaring_the_type_is_clean() {
        let src = "extern fn read() throws io.IoError\n@Throws(io.IoError::class)\nfn main() {\n    read()\n}";
        assert!(analyze(src).is_empty());
    }

    #[test]
    fn try_catch_covers_the_call() {
        let src = "extern fn read() throws io.IoError\nfn main() {\n    try {\n        read()\n    } catch (e: io.IoError) {\n    }\n}";
        assert!(analyze(src).is_empty());
    }

    #[test]
    fn catch_of_wrong_type_does_not_cover() {
        let src = "extern fn read() throws io.IoError\nfn main() {\n    try {\n        read()\n    } catch (e: io.Eof) {\n    }\n}";
        let findings = analyze(src);
        assert_eq!(findings.len(), 1);
        assert_eq!(
            findings[0].fixes,
            [FixKind::AddCatch, FixKind::DeclareThrows, FixKind::SurroundWithTryCatch]
        );
        assert!(findings[0].try_site.is_some());
    }

    #[test]
    fn exact_identity_no_subtyping() {
        // Catching a lookalike name does not cover the canonical one
        let src = "import io.IoError\nextern fn read() throws io.IoError\nclass IoError {\n}\nfn main() {\n    try {\n        read()\n    } catch (e: IoError) {\n    }\n}";
        let findings = analyze(src);
        // Local class IoError resolves to "IoError", import shadowed by class
        // lookup order; the call still throws "io.IoError"
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].unhandled, ["io.IoError"]);
    }

    #[test]
    fn throw_of_uncovered_constructor_is_reported() {
        let src = "import io.IoError\nfn main() {\n    throw IoError()\n}";
        let findings = analyze(src);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].unhandled, ["io.IoError"]);
    }

    #[test]
    fn throw_inside_matching_catch_scope_is_clean() {
        let src = "import io.IoError\nfn main() {\n    try {\n        throw IoError()\n    } catch (e: io.IoError) {\n    }\n}";
        assert!(analyze(src).is_empty());
    }

    #[test]
    fn catch_body_does_not_see_its_own_clause() {
        let src = "import io.IoError\nfn main() {\n    try {\n    } catch (e: io.IoError) {\n        throw IoError()\n    }\n}";
        let findings = analyze(src);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].unhandled, ["io.IoError"]);
    }

    #[test]
    fn catch_body_does_not_see_sibling_clauses() {
        let src = "import io.Eof\nfn main() {\n    try {\n    } catch (a: io.IoError) {\n        throw Eof()\n    } catch (b: io.Eof) {\n    }\n}";
        let findings = analyze(src);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].unhandled, ["io.Eof"]);
    }

    #[test]
    fn finally_starts_from_a_blank_slate() {
        // Outer try catches the type, finally of the inner try still reports
        let src = "import io.IoError\nfn main() {\n    try {\n        try {\n        } finally {\n            throw IoError()\n        }\n    } catch (e: io.IoError) {\n    }\n}";
        let findings = analyze(src);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].unhandled, ["io.IoError"]);
        // No enclosing fix targets from inside finally
        assert_eq!(findings[0].fixes, [FixKind::SurroundWithTryCatch]);
        assert!(findings[0].function.is_none());
        assert!(findings[0].try_site.is_none());
    }

    #[test]
    fn catch_throw_and_finally_throw_both_reported() {
        let src = "import io.IoError\nfn main() {\n    try {\n    } catch (e: io.IoError) {\n        throw IoError()\n    } finally {\n        throw IoError()\n    }\n}";
        let findings = analyze(src);
        assert_eq!(findings.len(), 2);
        // Catch-body finding keeps the function as a fix target
        assert!(findings[0].function.is_some());
        // Finally finding has none
        assert!(findings[1].function.is_none());
    }

    #[test]
    fn finally_ignores_the_functions_own_declaration() {
        let src = "import io.IoError\n@Throws(IoError::class)\nfn main() {\n    try {\n    } finally {\n        throw IoError()\n    }\n}";
        let findings = analyze(src);
        assert_eq!(findings.len(), 1);
    }

    #[test]
    fn nested_function_is_its_own_analysis_root() {
        // The outer function's @Throws does not cover the inner function's
        // body, and the inner throw is reported against the inner function
        let src = "import io.IoError\n@Throws(IoError::class)\nfn outer() {\n    fn inner() {\n        throw IoError()\n    }\n}";
        let findings = analyze(src);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].unhandled, ["io.IoError"]);
    }

    #[test]
    fn nested_function_declaring_its_own_throws_is_clean() {
        let src = "import io.IoError\nfn outer() {\n    @Throws(IoError::class)\n    fn inner() {\n        throw IoError()\n    }\n}";
        assert!(analyze(src).is_empty());
    }

    #[test]
    fn enclosing_try_does_not_cover_nested_function_body() {
        let src = "import io.IoError\nfn outer() {\n    try {\n        fn inner() {\n            throw IoError()\n        }\n    } catch (e: io.IoError) {\n    }\n}";
        let findings = analyze(src);
        assert_eq!(findings.len(), 1);
        // The nested function is the fix target, not the outer try
        assert!(findings[0].try_site.is_none());
    }

    #[test]
    fn closure_bodies_are_not_analyzed() {
        let src = "import io.IoError\nfn main() {\n    let f = fn () {\n        throw IoError()\n    }\n}";
        assert!(analyze(src).is_empty());
    }

    #[test]
    fn unresolved_call_target_is_skipped() {
        assert!(analyze("fn main() {\n    mystery()\n}").is_empty());
    }

    #[test]
    fn method_calls_are_skipped() {
        let src = "fn main() {\n    let x = 1\n    x.close()\n}";
        assert!(analyze(src).is_empty());
    }

    #[test]
    fn throw_of_unresolvable_type_is_skipped() {
        assert!(analyze("fn main() {\n    throw Mystery()\n}").is_empty());
    }

    #[test]
    fn unresolvable_catch_type_contributes_nothing() {
        let src = "extern fn read() throws io.IoError\nfn main() {\n    try {\n        read()\n    } catch (e: Mystery) {\n    }\n}";
        let findings = analyze(src);
        assert_eq!(findings.len(), 1);
    }

    #[test]
    fn multiple_unhandled_types_in_one_finding_sorted() {
        let src = "extern fn read() throws io.IoError, io.Eof, io.Access\nfn main() {\n    read()\n}";
        let findings = analyze(src);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].unhandled, ["io.Access", "io.Eof", "io.IoError"]);
    }

    #[test]
    fn partially_covered_call_reports_the_remainder() {
        let src = "extern fn read() throws io.IoError, io.Eof\n@Throws(io.Eof::class)\nfn main() {\n    read()\n}";
        let findings = analyze(src);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].unhandled, ["io.IoError"]);
    }

    #[test]
    fn arguments_are_checked_before_the_call() {
        let src = "extern fn read() throws io.IoError\nfn wrap(x: int) {\n}\nfn main() {\n    wrap(read())\n}";
        let findings = analyze(src);
        // One finding on read(); wrap itself declares nothing
        assert_eq!(findings.len(), 1);
    }

    #[test]
    fn two_sites_two_findings_in_source_order() {
        let src = "extern fn read() throws io.IoError\nfn main() {\n    read()\n    read()\n}";
        let findings = analyze(src);
        assert_eq!(findings.len(), 2);
        assert!(findings[0].site.start < findings[1].site.start);
    }

    #[test]
    fn finding_site_is_the_callee_name() {
        let src = "extern fn read() throws io.IoError\nfn main() {\n    read()\n}";
        let findings = analyze(src);
        let site = findings[0].site;
        assert_eq!(&src[site.start..site.end], "read");
    }

    #[test]
    fn throw_site_is_the_whole_statement() {
        let src = "import io.IoError\nfn main() {\n    throw IoError()\n}";
        let findings = analyze(src);
        let site = findings[0].site;
        assert_eq!(&src[site.start..site.end], "throw IoError()");
    }

    #[test]
    fn exempt_function_is_not_analyzed() {
        let src = "extern fn read() throws io.IoError\nfn legacy() {\n    read()\n}\nfn main() {\n    read()\n}";
        let tokens = lex(src).unwrap();
        let program = Parser::new(&tokens, src).parse_program().unwrap();

        let findings = analyze_with_exemptions(&program, &["legacy".to_string()]);
        assert_eq!(findings.len(), 1);
        let site = findings[0].site;
        assert!(site.start > src.find("fn main").unwrap());
    }

    #[test]
    fn calls_to_exempt_functions_are_still_checked() {
        let src = "import io.IoError\n@Throws(IoError::class)\nfn legacy() {\n}\nfn main() {\n    legacy()\n}";
        let tokens = lex(src).unwrap();
        let program = Parser::new(&tokens, src).parse_program().unwrap();

        let findings = analyze_with_exemptions(&program, &["legacy".to_string()]);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].unhandled, ["io.IoError"]);
    }

    #[test]
    fn extern_bodies_do_not_exist_to_analyze() {
        // An extern fn never produces findings of its own
        let src = "extern fn read() throws io.IoError";
        assert!(analyze(src).is_empty());
    }
}
