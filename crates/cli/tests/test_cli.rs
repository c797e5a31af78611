use clap::Parser;
use quell_cli::{Cli, Commands};
use quell_core::{EngineKind, Severity};

#[test]
fn test_ignore_oss_args_build_descriptor() {
    let cli = Cli::try_parse_from([
        "quell", "ignore", "oss", "--manager", "npm", "--name", "lodash", "--version", "4.17.15",
        "--path", "package.json", "--line", "5", "--severity", "high", "--reason",
        "Prototype pollution",
    ])
    .unwrap();

    let Some(Commands::Ignore { target }) = cli.command else {
        panic!("expected ignore command");
    };

    let descriptor = target.descriptor();
    assert_eq!(descriptor.key(), "npm:lodash:4.17.15");
    assert_eq!(descriptor.payload.kind(), EngineKind::Oss);
    assert_eq!(descriptor.line, Some(5));
    assert_eq!(descriptor.severity, Severity::High);
    assert_eq!(descriptor.description, "Prototype pollution");
}

#[test]
fn test_ignore_quality_key_is_path_scoped() {
    let cli = Cli::try_parse_from([
        "quell",
        "ignore",
        "quality",
        "--rule-name",
        "no-eval",
        "--rule-id",
        "Q-104",
        "--path",
        "src/app.ts",
        "--line",
        "7",
    ])
    .unwrap();

    let Some(Commands::Ignore { target }) = cli.command else {
        panic!("expected ignore command");
    };

    let descriptor = target.descriptor();
    assert_eq!(descriptor.key(), "no-eval:Q-104:src/app.ts");
    // Unstated severity defaults to unknown, not ok
    assert_eq!(descriptor.severity, Severity::Unknown);
}

#[test]
fn test_ignore_container_without_line() {
    let cli = Cli::try_parse_from([
        "quell",
        "ignore",
        "container",
        "--image-name",
        "nginx",
        "--image-tag",
        "1.19",
        "--path",
        "deploy/Dockerfile",
    ])
    .unwrap();

    let Some(Commands::Ignore { target }) = cli.command else {
        panic!("expected ignore command");
    };

    let descriptor = target.descriptor();
    assert_eq!(descriptor.key(), "nginx:1.19");
    assert_eq!(descriptor.line, None);
}

#[test]
fn test_scan_flags_parse() {
    let cli = Cli::try_parse_from([
        "quell",
        "scan",
        "--engine",
        "oss,container",
        "--format",
        "json",
        "--fail-on",
        "critical",
    ])
    .unwrap();

    assert!(matches!(cli.command, Some(Commands::Scan { .. })));
    assert_eq!(
        cli.engine,
        Some(vec!["oss".to_string(), "container".to_string()])
    );
    assert_eq!(cli.fail_on.as_deref(), Some("critical"));
}

#[test]
fn test_watch_flags_parse() {
    let cli = Cli::try_parse_from(["quell", "watch", "--debounce", "500", "--no-clear"]).unwrap();

    let Some(Commands::Watch {
        debounce, no_clear, ..
    }) = cli.command
    else {
        panic!("expected watch command");
    };
    assert_eq!(debounce, Some(500));
    assert!(no_clear);
}
