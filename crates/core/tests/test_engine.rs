use quell_core::{CommandEngine, EngineError, EngineKind, ScanEngine};
use std::path::Path;
use tempfile::TempDir;

const FINDINGS_JSON: &str = r#"[
  {
    "severity": "high",
    "message": "lodash@4.17.15 is vulnerable",
    "file": "package.json",
    "line": 5,
    "engine": "oss",
    "manager": "npm",
    "name": "lodash",
    "version": "4.17.15"
  }
]"#;

#[cfg(unix)]
#[test]
fn test_command_engine_parses_stdout() {
    // `cat {target}` echoes the scanned file back; point it at a file
    // containing a findings array
    let tmp = TempDir::new().unwrap();
    let report = tmp.path().join("report.json");
    std::fs::write(&report, FINDINGS_JSON).unwrap();

    let engine = CommandEngine::new(
        EngineKind::Oss,
        "cat",
        vec!["{target}".to_string()],
    );
    let findings = engine.scan(&report, None).unwrap();

    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].logical_key(), "npm:lodash:4.17.15");
    assert_eq!(findings[0].line, 5);
}

#[cfg(unix)]
#[test]
fn test_filter_args_are_appended_only_with_filter() {
    // Without a filter the engine sees only the target; with one, the
    // filter file is appended and `cat` concatenates both
    let tmp = TempDir::new().unwrap();
    let target = tmp.path().join("empty.json");
    std::fs::write(&target, "[]").unwrap();
    let filter = tmp.path().join("filter.json");
    std::fs::write(&filter, "").unwrap();

    let engine = CommandEngine::new(EngineKind::Oss, "cat", vec!["{target}".to_string()])
        .with_filter_args(vec!["{filter}".to_string()]);

    assert!(engine.scan(&target, None).unwrap().is_empty());
    // "[]" + "" still parses as an empty array
    assert!(engine.scan(&target, Some(&filter)).unwrap().is_empty());
}

#[test]
fn test_spawn_failure_is_typed() {
    let engine = CommandEngine::new(
        EngineKind::Secrets,
        "quell-no-such-engine-binary",
        vec!["{target}".to_string()],
    );
    let err = engine.scan(Path::new("whatever"), None).unwrap_err();
    assert!(matches!(err, EngineError::Spawn { .. }));
}

#[cfg(unix)]
#[test]
fn test_nonzero_exit_is_typed() {
    let engine = CommandEngine::new(EngineKind::Iac, "false", vec![]);
    let err = engine.scan(Path::new("whatever"), None).unwrap_err();
    match err {
        EngineError::Failed { status, .. } => assert_eq!(status, 1),
        other => panic!("expected Failed, got {:?}", other),
    }
}

#[cfg(unix)]
#[test]
fn test_malformed_output_is_typed() {
    let engine = CommandEngine::new(
        EngineKind::Quality,
        "echo",
        vec!["this is not json".to_string()],
    );
    let err = engine.scan(Path::new("whatever"), None).unwrap_err();
    assert!(matches!(err, EngineError::Malformed { .. }));
}
