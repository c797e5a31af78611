//! Main scan command — wires discovery, the two-phase scan protocol, and
//! output together

use anyhow::Result;
use colored::Colorize;
use quell_core::{discovery, EngineKind, Workspace};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::output;
use crate::progress::Step;

pub fn run(path: Option<&Path>, cli: &crate::Cli) -> Result<bool> {
    let start = Instant::now();
    let root = path.unwrap_or_else(|| Path::new("."));
    let root = std::fs::canonicalize(root).unwrap_or_else(|_| root.to_path_buf());

    let format = resolve_format(cli);

    if matches!(format, Format::Terminal) {
        eprintln!(
            "{}",
            format!("  quell v{} — scanning workspace", quell_core::VERSION).bold()
        );
        eprintln!();
    }

    let mut workspace = Workspace::open(&root)?;
    if let Some(warning) = workspace.registry().load_warning() {
        eprintln!("  {}: {}", "warn".yellow().bold(), warning);
    }

    let kinds = resolve_kinds(cli, &workspace);
    if kinds.is_empty() {
        eprintln!(
            "  {} — enable engines in .quell.toml or check --engine",
            "No engines configured".dimmed()
        );
        return Ok(false);
    }

    run_scans(&mut workspace, &kinds)?;

    print_results(&workspace, format, start);

    let fail_on = cli
        .fail_on
        .clone()
        .unwrap_or_else(|| workspace.config().general.fail_on.clone());
    Ok(workspace.summary().exceeds_threshold(&fail_on))
}

// ── Helpers (shared with watch mode) ─────────────────────────────

#[derive(Debug, Clone, Copy)]
pub(crate) enum Format {
    Terminal,
    Json,
}

pub(crate) fn resolve_format(cli: &crate::Cli) -> Format {
    match cli.format {
        Some(crate::OutputFormat::Json) => Format::Json,
        _ => Format::Terminal,
    }
}

/// Engine kinds to run: the configured ones, narrowed by `--engine`.
pub(crate) fn resolve_kinds(cli: &crate::Cli, workspace: &Workspace) -> Vec<EngineKind> {
    let configured = workspace.engine_kinds();

    let Some(ref requested) = cli.engine else {
        return configured;
    };

    let mut kinds = Vec::new();
    for name in requested {
        match EngineKind::parse(name) {
            Some(kind) if configured.contains(&kind) => kinds.push(kind),
            Some(kind) => {
                eprintln!(
                    "  {}: engine `{}` is not enabled in .quell.toml",
                    "warn".yellow(),
                    kind
                );
            }
            None => {
                eprintln!("  {}: unknown engine `{}`", "warn".yellow(), name);
            }
        }
    }
    kinds
}

/// Discover targets for each engine kind and run the two-phase protocol on
/// every file. Engine failures are reported and skipped — one broken engine
/// must not take the rest of the run down.
pub(crate) fn run_scans(workspace: &mut Workspace, kinds: &[EngineKind]) -> Result<()> {
    let mut planned: Vec<(EngineKind, Vec<PathBuf>)> = Vec::new();
    for &kind in kinds {
        let patterns =
            discovery::compile_targets(&workspace.config().engines.get(kind).targets);
        let files = discovery::discover_targets(
            workspace.root(),
            &patterns,
            &workspace.config().ignore.paths,
        )?;
        planned.push((kind, files));
    }

    for (kind, files) in planned {
        if files.is_empty() {
            continue;
        }

        let step = Step::new(format!("Scanning {} file(s) with {}", files.len(), kind));
        let mut errors = 0usize;
        for file in &files {
            if let Err(e) = workspace.scan_file(kind, file) {
                step.warn(e);
                errors += 1;
            }
        }
        step.finish(&format!(
            "{} file(s), {} error(s)",
            files.len(),
            errors
        ));
    }

    Ok(())
}

pub(crate) fn print_results(workspace: &Workspace, format: Format, start: Instant) {
    match format {
        Format::Json => print_json(workspace),
        Format::Terminal => print_terminal(workspace, start),
    }
}

fn presented_files(workspace: &Workspace) -> Vec<String> {
    let mut files: BTreeSet<String> = BTreeSet::new();
    for presenter in workspace.presenters() {
        for file in presenter.files() {
            files.insert(file.to_string());
        }
    }
    files.into_iter().collect()
}

fn print_terminal(workspace: &Workspace, start: Instant) {
    println!();

    for file in presented_files(workspace) {
        let path = Path::new(&file);

        let mut lines: Vec<(usize, EngineKind, &quell_core::Annotation)> = Vec::new();
        for presenter in workspace.presenters() {
            for annotation in presenter.annotations(path) {
                lines.push((annotation.line, presenter.kind(), annotation));
            }
        }
        if lines.is_empty() {
            continue;
        }
        lines.sort_by_key(|(line, kind, annotation)| (*line, *kind, annotation.ignored));

        println!("  {}", file.bold());
        for (_, kind, annotation) in &lines {
            println!("{}", output::terminal::format_annotation(*kind, annotation));
        }
        println!();
    }

    let summary = workspace.summary();
    println!("  {}", "\u{2500}".repeat(60).dimmed());
    println!(
        "  {} \u{00b7} {} \u{00b7} {} \u{00b7} {} \u{00b7} {}",
        format!("{} malicious", summary.malicious).red().bold(),
        format!("{} critical", summary.critical).red(),
        format!("{} high", summary.high).yellow(),
        format!("{} medium/low", summary.medium + summary.low).blue(),
        format!("{} ignored", summary.ignored).dimmed(),
    );
    println!("  {} file(s) with findings", summary.files_scanned);
    println!("  Time: {:.1}s", start.elapsed().as_secs_f64());
}

fn print_json(workspace: &Workspace) {
    let mut findings: Vec<output::json::JsonAnnotation> = Vec::new();

    for file in presented_files(workspace) {
        let path = Path::new(&file);
        for presenter in workspace.presenters() {
            for annotation in presenter.annotations(path) {
                findings.push(output::json::JsonAnnotation {
                    engine: presenter.kind().to_string(),
                    severity: annotation.severity.to_string(),
                    combined_severity: workspace
                        .combined_severity(path, annotation.line)
                        .to_string(),
                    message: annotation.message.clone(),
                    file: file.clone(),
                    line: annotation.line,
                    count: annotation.count,
                    ignored: annotation.ignored,
                });
            }
        }
    }

    let summary = workspace.summary();
    let out = output::json::JsonOutput {
        findings,
        summary: output::json::JsonSummary {
            malicious: summary.malicious,
            critical: summary.critical,
            high: summary.high,
            medium: summary.medium,
            low: summary.low,
            unknown: summary.unknown,
            ok: summary.ok,
            ignored: summary.ignored,
            files_scanned: summary.files_scanned,
        },
    };

    match serde_json::to_string_pretty(&out) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Failed to serialize JSON: {}", e),
    }
}
