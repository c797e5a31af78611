//! Target discovery with gitignore-aware filtering
//!
//! Uses the `ignore` crate (from ripgrep) to automatically respect
//! `.gitignore`, `.ignore`, and `.git/info/exclude` files. Each engine
//! declares glob patterns for the files it scans; discovery walks once and
//! matches relative paths against those patterns.

use anyhow::Result;
use ignore::overrides::OverrideBuilder;
use ignore::WalkBuilder;
use std::path::{Path, PathBuf};

/// Compile target globs, skipping patterns that fail to parse.
pub fn compile_targets(patterns: &[String]) -> Vec<glob::Pattern> {
    patterns
        .iter()
        .filter_map(|p| glob::Pattern::new(p).ok())
        .collect()
}

/// Whether a workspace-relative path matches any of the compiled targets.
pub fn matches_any(rel: &Path, patterns: &[glob::Pattern]) -> bool {
    patterns.iter().any(|p| p.matches_path(rel))
}

/// Discover files under `root` matching any of the given target `patterns`,
/// respecting `.gitignore` and skipping paths that match `ignore_patterns`.
///
/// Returns workspace-relative paths sorted alphabetically.
pub fn discover_targets(
    root: &Path,
    patterns: &[glob::Pattern],
    ignore_patterns: &[String],
) -> Result<Vec<PathBuf>> {
    let root = root.canonicalize()?;

    let mut builder = WalkBuilder::new(&root);
    builder
        .hidden(true) // skip hidden files/dirs
        .git_ignore(true) // respect .gitignore
        .git_global(true) // respect global gitignore
        .git_exclude(true); // respect .git/info/exclude

    // Add custom ignore patterns from .quell.toml config as overrides.
    // The `ignore` crate uses gitignore syntax for overrides: prefix with `!` to negate.
    // We negate our ignore patterns so they act as excludes.
    if !ignore_patterns.is_empty() {
        let mut overrides = OverrideBuilder::new(&root);
        for pattern in ignore_patterns {
            // Convert directory patterns like "vendor/" to glob "!vendor/**"
            let glob = if pattern.ends_with('/') {
                format!("!{}**", pattern)
            } else {
                format!("!{}", pattern)
            };
            overrides.add(&glob)?;
        }
        builder.overrides(overrides.build()?);
    }

    let mut files = Vec::new();

    for entry in builder.build() {
        let entry = match entry {
            Ok(e) => e,
            Err(_) => continue, // skip unreadable entries
        };

        // Only collect files, not directories
        if !entry.file_type().is_some_and(|ft| ft.is_file()) {
            continue;
        }

        let path = entry.into_path();
        let rel = match path.strip_prefix(&root) {
            Ok(r) => r.to_path_buf(),
            Err(_) => continue,
        };
        if matches_any(&rel, patterns) {
            files.push(rel);
        }
    }

    files.sort();
    Ok(files)
}
