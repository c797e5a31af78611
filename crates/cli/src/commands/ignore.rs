//! Ignore command — add a suppression from the command line

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;
use quell_core::registry::IgnoreDescriptor;
use quell_core::{FindingPayload, Severity, Workspace};
use std::path::{Path, PathBuf};

#[derive(Subcommand)]
pub enum IgnoreTarget {
    /// Suppress a dependency vulnerability
    Oss {
        /// Package manager (npm, pip, cargo, ...)
        #[arg(long)]
        manager: String,

        #[arg(long)]
        name: String,

        #[arg(long)]
        version: String,

        /// Manifest file the suppression applies to
        #[arg(long)]
        path: PathBuf,

        #[arg(long)]
        line: Option<usize>,

        #[arg(long)]
        severity: Option<String>,

        #[arg(long)]
        reason: Option<String>,
    },

    /// Suppress a detected secret
    Secret {
        #[arg(long)]
        title: String,

        #[arg(long)]
        value: String,

        #[arg(long)]
        path: PathBuf,

        #[arg(long)]
        line: Option<usize>,

        #[arg(long)]
        severity: Option<String>,

        #[arg(long)]
        reason: Option<String>,
    },

    /// Suppress an infrastructure-as-code misconfiguration
    Iac {
        #[arg(long)]
        title: String,

        #[arg(long)]
        similarity_id: String,

        #[arg(long)]
        path: PathBuf,

        #[arg(long)]
        line: Option<usize>,

        #[arg(long)]
        severity: Option<String>,

        #[arg(long)]
        reason: Option<String>,
    },

    /// Suppress a code-quality rule violation
    Quality {
        #[arg(long)]
        rule_name: String,

        #[arg(long)]
        rule_id: String,

        #[arg(long)]
        path: PathBuf,

        #[arg(long)]
        line: Option<usize>,

        #[arg(long)]
        severity: Option<String>,

        #[arg(long)]
        reason: Option<String>,
    },

    /// Suppress a container image risk
    Container {
        #[arg(long)]
        image_name: String,

        #[arg(long)]
        image_tag: String,

        /// Manifest file the suppression applies to
        #[arg(long)]
        path: PathBuf,

        #[arg(long)]
        line: Option<usize>,

        #[arg(long)]
        severity: Option<String>,

        #[arg(long)]
        reason: Option<String>,
    },
}

impl IgnoreTarget {
    /// Turn the parsed flags into a registry descriptor.
    pub fn descriptor(&self) -> IgnoreDescriptor {
        let (payload, path, line, severity, reason) = match self {
            IgnoreTarget::Oss {
                manager,
                name,
                version,
                path,
                line,
                severity,
                reason,
            } => (
                FindingPayload::Oss {
                    manager: manager.clone(),
                    name: name.clone(),
                    version: version.clone(),
                },
                path,
                line,
                severity,
                reason,
            ),
            IgnoreTarget::Secret {
                title,
                value,
                path,
                line,
                severity,
                reason,
            } => (
                FindingPayload::Secret {
                    title: title.clone(),
                    value: value.clone(),
                },
                path,
                line,
                severity,
                reason,
            ),
            IgnoreTarget::Iac {
                title,
                similarity_id,
                path,
                line,
                severity,
                reason,
            } => (
                FindingPayload::Iac {
                    title: title.clone(),
                    similarity_id: similarity_id.clone(),
                },
                path,
                line,
                severity,
                reason,
            ),
            IgnoreTarget::Quality {
                rule_name,
                rule_id,
                path,
                line,
                severity,
                reason,
            } => (
                FindingPayload::Quality {
                    rule_name: rule_name.clone(),
                    rule_id: rule_id.clone(),
                },
                path,
                line,
                severity,
                reason,
            ),
            IgnoreTarget::Container {
                image_name,
                image_tag,
                path,
                line,
                severity,
                reason,
            } => (
                FindingPayload::Container {
                    image_name: image_name.clone(),
                    image_tag: image_tag.clone(),
                },
                path,
                line,
                severity,
                reason,
            ),
        };

        IgnoreDescriptor {
            payload,
            path: path.clone(),
            line: *line,
            severity: severity
                .as_deref()
                .and_then(Severity::parse)
                .unwrap_or(Severity::Unknown),
            description: reason.clone().unwrap_or_default(),
        }
    }
}

pub fn run(target: &IgnoreTarget) -> Result<()> {
    let mut workspace = Workspace::open(Path::new("."))?;
    if let Some(warning) = workspace.registry().load_warning() {
        eprintln!("  {}: {}", "warn".yellow().bold(), warning);
    }

    let descriptor = target.descriptor();
    let label = descriptor.payload.label();
    let key = descriptor.key();
    let file = descriptor.path.clone();
    let line = descriptor.line;

    workspace.ignore(descriptor)?;

    println!("  {} {}", "Ignored".green().bold(), label);
    println!("  key: {}", key.dimmed());
    if let Some(line) = line {
        println!(
            "  {}:{} now presents as {}",
            file.display(),
            line,
            workspace.combined_severity(&file, line)
        );
    }

    Ok(())
}
