//! External engine invocation — opaque commands that scan a file and return
//! findings
//!
//! Engines are collaborators, not part of this crate: each is an executable
//! that takes a target path (and optionally a filter projection) and prints
//! a JSON array of findings on stdout. An engine failure must never corrupt
//! suppression state; the typed error lets callers clear presented
//! diagnostics and leave the registry untouched.

use crate::config::EngineConfig;
use crate::finding::{EngineKind, Finding};
use std::path::Path;
use std::process::Command;
use thiserror::Error;

/// Error types for engine invocation
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("failed to launch `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` exited with status {status}: {stderr}")]
    Failed {
        command: String,
        status: i32,
        stderr: String,
    },

    #[error("`{command}` produced malformed findings: {message}")]
    Malformed { command: String, message: String },
}

/// Trait for scan engine adapters
///
/// `scan` runs one invocation against a stable copy of the document. When
/// `filter` is given, the engine is expected to omit findings matching the
/// projection records; without it the engine reports ground truth.
pub trait ScanEngine: Send {
    /// Which engine kind this adapter drives
    fn kind(&self) -> EngineKind;

    /// Invoke the engine against `target`, optionally filtered
    fn scan(&self, target: &Path, filter: Option<&Path>) -> Result<Vec<Finding>, EngineError>;
}

/// A scan engine backed by an external command.
///
/// `{target}` in `args` is replaced with the file to scan. `filter_args`
/// are appended only when a filter projection is passed, with `{filter}`
/// replaced by its path.
pub struct CommandEngine {
    kind: EngineKind,
    program: String,
    args: Vec<String>,
    filter_args: Vec<String>,
}

impl CommandEngine {
    pub fn new(kind: EngineKind, program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            kind,
            program: program.into(),
            args,
            filter_args: Vec::new(),
        }
    }

    /// Arguments appended when the invocation carries a filter projection.
    pub fn with_filter_args(mut self, filter_args: Vec<String>) -> Self {
        self.filter_args = filter_args;
        self
    }

    /// Build from an `[engines.<kind>]` config section.
    pub fn from_config(kind: EngineKind, config: &EngineConfig) -> Self {
        Self {
            kind,
            program: config.command.clone(),
            args: config.args.clone(),
            filter_args: config.filter_args.clone(),
        }
    }
}

impl ScanEngine for CommandEngine {
    fn kind(&self) -> EngineKind {
        self.kind
    }

    fn scan(&self, target: &Path, filter: Option<&Path>) -> Result<Vec<Finding>, EngineError> {
        let target_str = target.to_string_lossy();

        let mut command = Command::new(&self.program);
        for arg in &self.args {
            command.arg(arg.replace("{target}", &target_str));
        }
        if let Some(filter) = filter {
            let filter_str = filter.to_string_lossy();
            for arg in &self.filter_args {
                command.arg(
                    arg.replace("{filter}", &filter_str)
                        .replace("{target}", &target_str),
                );
            }
        }

        let output = command.output().map_err(|source| EngineError::Spawn {
            command: self.program.clone(),
            source,
        })?;

        if !output.status.success() {
            return Err(EngineError::Failed {
                command: self.program.clone(),
                status: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        serde_json::from_slice::<Vec<Finding>>(&output.stdout).map_err(|e| {
            EngineError::Malformed {
                command: self.program.clone(),
                message: e.to_string(),
            }
        })
    }
}
