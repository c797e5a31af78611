//! Terminal output formatting

use colored::Colorize;
use quell_core::{Annotation, EngineKind, Severity};

pub fn severity_icon(severity: Severity) -> &'static str {
    match severity {
        Severity::Malicious | Severity::Critical => "❌",
        Severity::High | Severity::Medium => "⚠️ ",
        Severity::Low | Severity::Unknown => "ℹ️ ",
        Severity::Ok => "  ",
    }
}

pub fn format_annotation(kind: EngineKind, annotation: &Annotation) -> String {
    let icon = severity_icon(annotation.severity);
    let tag = format!("[{}]", kind);

    let mut line = format!(
        "    {} {} {} (line {})",
        icon, tag, annotation.message, annotation.line
    );
    if annotation.count > 1 {
        line.push_str(&format!(" \u{00d7}{}", annotation.count));
    }
    if annotation.ignored {
        line = format!("{} {}", line.dimmed(), "(ignored)".dimmed());
    }
    line
}
