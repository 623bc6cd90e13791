use crate::span::Span;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnalyzeError {
    #[error("Syntax error: {msg}")]
    Syntax { msg: String, span: Span },

    #[error("IO error: {msg}")]
    Io { msg: String },
}

impl AnalyzeError {
    pub fn syntax(msg: impl Into<String>, span: Span) -> Self {
        Self::Syntax { msg: msg.into(), span }
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self::Io { msg: msg.into() }
    }
}

/// Render an AnalyzeError with ariadne for nice terminal output.
pub fn render_error(source: &str, err: &AnalyzeError) {
    use ariadne::{Label, Report, ReportKind, Source};

    match err {
        AnalyzeError::Syntax { msg, span } => {
            Report::build(ReportKind::Error, (), span.start)
                .with_message("syntax error")
                .with_label(
                    Label::new(span.start..span.end)
                        .with_message(msg),
                )
                .finish()
                .eprint(Source::from(source))
                .ok();
        }
        AnalyzeError::Io { msg } => {
            eprintln!("error: {msg}");
        }
    }
}

/// Render a single finding as a warning report, returned as a string so the
/// CLI and tests can both consume it.
pub fn render_finding(source: &str, finding: &crate::analysis::Finding) -> String {
    use ariadne::{Label, Report, ReportKind, Source};

    let mut buf = Vec::new();
    Report::build(ReportKind::Warning, (), finding.site.start)
        .with_message(finding_message(finding))
        .with_label(
            Label::new(finding.site.start..finding.site.end)
                .with_message("not caught or declared here"),
        )
        .with_help(fixes_help(finding))
        .finish()
        .write(Source::from(source), &mut buf)
        .ok();
    String::from_utf8_lossy(&buf).into_owned()
}

/// Singular vs plural wording is presentation only; the analyzer always
/// carries the full list.
pub fn finding_message(finding: &crate::analysis::Finding) -> String {
    if finding.unhandled.len() == 1 {
        format!("Unhandled exception: {}", finding.unhandled[0])
    } else {
        format!("Unhandled exceptions: {}", finding.unhandled.join(", "))
    }
}

fn fixes_help(finding: &crate::analysis::Finding) -> String {
    use crate::analysis::FixKind;

    let names: Vec<&str> = finding
        .fixes
        .iter()
        .map(|f| match f {
            FixKind::AddCatch => "add a catch clause to the enclosing try",
            FixKind::DeclareThrows => "add @Throws to the enclosing function",
            FixKind::SurroundWithTryCatch => "surround with try/catch",
        })
        .collect();
    format!("available fixes: {}", names.join("; "))
}
