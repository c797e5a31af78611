//! Watch command — monitor files and re-scan on changes
//!
//! Two event sources feed the loop: debounced workspace file events, which
//! re-scan just the engines targeting the changed file, and registry-file
//! events, which flow through the workspace's origin-tag check so only
//! genuine external edits trigger targeted re-scans.

use anyhow::Result;
use colored::Colorize;
use notify_debouncer_mini::{new_debouncer, DebouncedEventKind};
use quell_core::Workspace;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::scan::{print_results, resolve_format, resolve_kinds, run_scans};

pub fn run(
    path: Option<&Path>,
    cli: &crate::Cli,
    debounce: Option<u64>,
    no_clear: bool,
) -> Result<()> {
    let root = path.unwrap_or_else(|| Path::new("."));
    let root = std::fs::canonicalize(root).unwrap_or_else(|_| root.to_path_buf());

    eprintln!(
        "{}",
        format!("  quell v{} — watch mode", quell_core::VERSION).bold()
    );
    eprintln!();

    let mut workspace = Workspace::open(&root)?;
    if let Some(warning) = workspace.registry().load_warning() {
        eprintln!("  {}: {}", "warn".yellow().bold(), warning);
    }
    workspace.watch_registry()?;

    let format = resolve_format(cli);
    let kinds = resolve_kinds(cli, &workspace);
    let cache_segment = workspace
        .config()
        .general
        .cache_dir
        .trim_matches('/')
        .to_string();
    let debounce_ms = debounce.unwrap_or(workspace.config().general.debounce_ms);

    // ── Initial run ────────────────────────────────────────────
    let start = Instant::now();
    run_scans(&mut workspace, &kinds)?;
    print_results(&workspace, format, start);
    eprintln!();
    eprintln!("  {}", "Watching for changes... (Ctrl-C to stop)".dimmed());

    // ── Ctrl-C handler ─────────────────────────────────────────
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })?;

    // ── Set up file watcher ────────────────────────────────────
    let (tx, rx) = std::sync::mpsc::channel();
    let mut debouncer = new_debouncer(Duration::from_millis(debounce_ms), tx)?;

    use notify::RecursiveMode;
    debouncer
        .watcher()
        .watch(root.as_ref(), RecursiveMode::Recursive)?;

    // ── Event loop ─────────────────────────────────────────────
    while running.load(Ordering::SeqCst) {
        match rx.recv_timeout(Duration::from_millis(200)) {
            Ok(Ok(events)) => {
                let mut changed: Vec<PathBuf> = Vec::new();
                for event in &events {
                    if event.kind != DebouncedEventKind::Any {
                        continue;
                    }
                    // Skip .git/ and the cache directory
                    if path_contains_segment(&event.path, ".git")
                        || path_contains_segment(&event.path, &cache_segment)
                    {
                        continue;
                    }
                    let Ok(rel) = event.path.strip_prefix(&root) else {
                        continue;
                    };
                    if workspace.kinds_for(rel).is_empty() {
                        continue;
                    }
                    let rel = rel.to_path_buf();
                    if !changed.contains(&rel) {
                        changed.push(rel);
                    }
                }

                if !changed.is_empty() {
                    rescan(&mut workspace, &changed, format, no_clear);
                }
            }
            Ok(Err(errs)) => {
                eprintln!("  {}: {:?}", "watch error".red(), errs);
            }
            Err(std::sync::mpsc::RecvTimeoutError::Timeout) => {
                // Normal timeout — fall through to the registry poll
            }
            Err(std::sync::mpsc::RecvTimeoutError::Disconnected) => {
                break;
            }
        }

        // ── External registry edits ────────────────────────────
        match workspace.poll_registry_edits() {
            Ok(affected) if !affected.is_empty() => {
                if !no_clear {
                    clear_screen();
                } else {
                    print_separator();
                }
                eprintln!(
                    "  {} — re-scanned {} affected file(s)",
                    "Ignore registry edited".bold(),
                    affected.len()
                );
                print_results(&workspace, format, Instant::now());
                eprintln!();
                eprintln!("  {}", "Watching for changes... (Ctrl-C to stop)".dimmed());
            }
            Ok(_) => {}
            Err(e) => {
                eprintln!("  {}: {}", "registry error".red(), e);
            }
        }
    }

    eprintln!();
    eprintln!("  {}", "Stopped watching.".bold());
    Ok(())
}

fn rescan(workspace: &mut Workspace, changed: &[PathBuf], format: super::scan::Format, no_clear: bool) {
    if !no_clear {
        clear_screen();
    } else {
        print_separator();
    }

    let start = Instant::now();
    for file in changed {
        if let Err(e) = workspace.scan_path(file) {
            eprintln!("  {}: {}", "scan error".red(), e);
        }
    }
    print_results(workspace, format, start);
    eprintln!();
    eprintln!("  {}", "Watching for changes... (Ctrl-C to stop)".dimmed());
}

fn path_contains_segment(path: &Path, segment: &str) -> bool {
    path.components()
        .any(|c| c.as_os_str().to_str() == Some(segment))
}

fn print_separator() {
    eprintln!();
    eprintln!("  {}", "\u{2500}".repeat(60).dimmed());
    eprintln!();
}

fn clear_screen() {
    // ANSI escape: clear screen + move cursor to top-left
    eprint!("\x1B[2J\x1B[H");
}
