use quell_cli::output::terminal::{format_annotation, severity_icon};
use quell_core::{Annotation, EngineKind, Severity};

fn annotation(severity: Severity, message: &str, count: usize, ignored: bool) -> Annotation {
    Annotation {
        line: 12,
        severity,
        message: message.to_string(),
        count,
        ignored,
    }
}

#[test]
fn test_severity_icons() {
    assert_eq!(severity_icon(Severity::Malicious), "❌");
    assert_eq!(severity_icon(Severity::Critical), "❌");
    assert_eq!(severity_icon(Severity::High), "⚠️ ");
    assert_eq!(severity_icon(Severity::Low), "ℹ️ ");
    assert_eq!(severity_icon(Severity::Ok), "  ");
}

#[test]
fn test_format_annotation_basic() {
    let line = format_annotation(
        EngineKind::Oss,
        &annotation(Severity::High, "lodash@4.17.15 is vulnerable", 1, false),
    );
    assert!(line.contains("[oss]"));
    assert!(line.contains("lodash@4.17.15 is vulnerable"));
    assert!(line.contains("line 12"));
    assert!(!line.contains("(ignored)"));
}

#[test]
fn test_format_annotation_aggregated_count() {
    let line = format_annotation(
        EngineKind::Quality,
        &annotation(Severity::Medium, "3 violations on this line", 3, false),
    );
    assert!(line.contains("3 violations on this line"));
    assert!(line.contains("\u{00d7}3"));
}

#[test]
fn test_format_annotation_ignored_marker() {
    let line = format_annotation(
        EngineKind::Secrets,
        &annotation(Severity::Critical, "AWS Access Key", 1, true),
    );
    assert!(line.contains("(ignored)"));
}
