pub mod analysis;
pub mod config;
pub mod diagnostics;
pub mod fixes;
pub mod lexer;
pub mod parser;
pub mod span;
pub mod visit;

use std::path::Path;

use analysis::Finding;
use diagnostics::AnalyzeError;
use parser::ast::Program;
use parser::Parser;

pub fn parse_source(source: &str) -> Result<Program, AnalyzeError> {
    let tokens = lexer::lex(source)?;
    Parser::new(&tokens, source).parse_program()
}

/// Lex, parse, and analyze a source string.
pub fn check_source(source: &str) -> Result<Vec<Finding>, AnalyzeError> {
    let program = parse_source(source)?;
    Ok(analysis::analyze_program(&program))
}

/// Check a file on disk, returning its contents alongside the findings so
/// callers can render reports.
pub fn check_file(path: &Path) -> Result<(String, Vec<Finding>), AnalyzeError> {
    let source = std::fs::read_to_string(path)
        .map_err(|e| AnalyzeError::io(format!("cannot read {}: {e}", path.display())))?;
    let findings = check_source(&source)?;
    Ok((source, findings))
}
