//! Ignores command — inspect and manage the persisted registry

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;
use quell_core::Workspace;
use std::path::{Path, PathBuf};

#[derive(Subcommand)]
pub enum IgnoresAction {
    /// List all suppressions (default)
    List,

    /// Remove one suppression entirely
    Remove {
        /// Registry key, as shown by `quell ignores list`
        key: String,
    },

    /// Deactivate a suppression's occurrences on one file
    Off {
        key: String,

        #[arg(long)]
        path: PathBuf,
    },

    /// Remove every suppression
    Clear,
}

pub fn run(action: Option<&IgnoresAction>) -> Result<()> {
    let mut workspace = Workspace::open(Path::new("."))?;
    if let Some(warning) = workspace.registry().load_warning() {
        eprintln!("  {}: {}", "warn".yellow().bold(), warning);
    }

    match action.unwrap_or(&IgnoresAction::List) {
        IgnoresAction::List => list(&workspace),
        IgnoresAction::Remove { key } => {
            if workspace.registry_mut().remove_entry(key)? {
                println!("  {} {}", "Removed".green(), key);
            } else {
                println!("  {}", format!("No suppression with key {}", key).dimmed());
            }
        }
        IgnoresAction::Off { key, path } => {
            if workspace.unignore(key, path)? {
                println!("  {} {} on {}", "Deactivated".green(), key, path.display());
            } else {
                println!(
                    "  {}",
                    format!("No active occurrence of {} on {}", key, path.display()).dimmed()
                );
            }
        }
        IgnoresAction::Clear => {
            let removed = workspace.registry_mut().clear()?;
            if removed > 0 {
                println!("  {} {} suppression(s)", "Cleared".green(), removed);
            } else {
                println!("  {}", "Registry is already empty.".dimmed());
            }
        }
    }

    Ok(())
}

fn list(workspace: &Workspace) {
    if workspace.registry().is_empty() {
        println!("  {}", "No suppressions recorded.".dimmed());
        return;
    }

    for (key, entry) in workspace.registry().entries() {
        println!(
            "  {} {} {}",
            format!("[{}]", entry.kind).bold(),
            entry.payload.label(),
            entry.severity.to_string().dimmed(),
        );
        println!("    key: {}", key.dimmed());
        if !entry.description.is_empty() {
            println!("    {}", entry.description.dimmed());
        }
        for occurrence in &entry.occurrences {
            let location = match occurrence.line {
                Some(line) => format!("{}:{}", occurrence.path, line),
                None => occurrence.path.clone(),
            };
            if occurrence.active {
                println!("    {}", location);
            } else {
                println!("    {} {}", location.dimmed(), "(inactive)".dimmed());
            }
        }
    }
}
