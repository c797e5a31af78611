//! Two-phase scan protocol — a filtered pass for display, an unfiltered
//! pass for reconciliation
//!
//! Every scan runs against a scratch snapshot of the document, so the
//! external engine sees a stable copy rather than a live buffer. The
//! unfiltered pass is the ground truth that repairs or evicts stale
//! suppressions; it is skipped when nothing is suppressed for this engine,
//! to avoid doubling invocation cost.

use crate::engine::ScanEngine;
use crate::finding::{rel_path_str, EngineKind, Finding};
use crate::presenter::DiagnosticPresenter;
use crate::registry::IgnoreRegistry;
use anyhow::{Context, Result};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Where a scan currently is. Mostly useful in logs and tests; the
/// orchestrator always returns to `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanPhase {
    Idle,
    Snapshot,
    InvokeFiltered,
    InvokeFull,
    Reconcile,
    Present,
}

/// What one scan did.
#[derive(Debug, Clone)]
pub struct ScanOutcome {
    /// Generation this scan ran as
    pub generation: u64,

    /// False when the scan completed stale and was discarded
    pub applied: bool,

    /// Whether reconciliation changed the registry
    pub reconciled: bool,

    /// Findings in the filtered result
    pub findings: usize,
}

/// Drives the two-phase protocol for one engine kind.
pub struct ScanOrchestrator {
    engine: Box<dyn ScanEngine>,
    scratch_dir: PathBuf,
    phase: ScanPhase,

    /// Latest started generation per relative path. A completing scan older
    /// than the latest start for its file is discarded, not applied.
    generations: HashMap<String, u64>,
    next_generation: u64,
}

impl ScanOrchestrator {
    pub fn new(engine: Box<dyn ScanEngine>, scratch_dir: PathBuf) -> Self {
        Self {
            engine,
            scratch_dir,
            phase: ScanPhase::Idle,
            generations: HashMap::new(),
            next_generation: 0,
        }
    }

    pub fn kind(&self) -> EngineKind {
        self.engine.kind()
    }

    pub fn phase(&self) -> ScanPhase {
        self.phase
    }

    /// Allocate a scan generation for `file`, marking it the latest start.
    pub fn begin_scan(&mut self, file: &Path) -> u64 {
        self.next_generation += 1;
        self.generations
            .insert(rel_path_str(file), self.next_generation);
        self.next_generation
    }

    /// Run the full protocol for `file` (workspace-relative, resolved
    /// against `root`): snapshot, filtered invocation, optional unfiltered
    /// invocation, reconcile, present.
    ///
    /// On an engine failure everything presented for the file is cleared —
    /// never stale or partial results — and the registry is left untouched.
    pub fn scan(
        &mut self,
        root: &Path,
        file: &Path,
        registry: &mut IgnoreRegistry,
        presenter: &mut DiagnosticPresenter,
    ) -> Result<ScanOutcome> {
        let generation = self.begin_scan(file);
        self.run(root, file, generation, registry, presenter)
    }

    /// Like [`ScanOrchestrator::scan`] but for a generation already
    /// allocated with [`ScanOrchestrator::begin_scan`]. Lets a caller that
    /// interleaves scans observe stale-generation discards.
    pub fn run(
        &mut self,
        root: &Path,
        file: &Path,
        generation: u64,
        registry: &mut IgnoreRegistry,
        presenter: &mut DiagnosticPresenter,
    ) -> Result<ScanOutcome> {
        let kind = self.engine.kind();

        // ── 1. Snapshot to scratch ────────────────────────────────
        self.phase = ScanPhase::Snapshot;
        let scratch = self.scratch_path(file, generation);
        let snapshot = (|| -> Result<()> {
            if let Some(parent) = scratch.parent() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("creating scratch dir {}", parent.display()))?;
            }
            let text = fs::read_to_string(root.join(file))
                .with_context(|| format!("reading {}", file.display()))?;
            fs::write(&scratch, text)
                .with_context(|| format!("writing scratch copy {}", scratch.display()))?;
            Ok(())
        })();
        if let Err(e) = snapshot {
            self.phase = ScanPhase::Idle;
            return Err(e);
        }

        // ── 2. Filtered invocation (what the user sees) ───────────
        self.phase = ScanPhase::InvokeFiltered;
        let has_suppressions = registry.has_active_entries(kind);
        let filter = has_suppressions.then(|| registry.filter_path().to_path_buf());

        let filtered = match self.engine.scan(&scratch, filter.as_deref()) {
            Ok(findings) => attribute(findings, file),
            Err(e) => {
                presenter.clear_file(file);
                let _ = fs::remove_file(&scratch);
                self.phase = ScanPhase::Idle;
                return Err(e).with_context(|| format!("{} scan of {}", kind, file.display()));
            }
        };

        // ── 3. Unfiltered invocation (ground truth), when needed ──
        let full = if has_suppressions {
            self.phase = ScanPhase::InvokeFull;
            match self.engine.scan(&scratch, None) {
                Ok(findings) => attribute(findings, file),
                Err(e) => {
                    presenter.clear_file(file);
                    let _ = fs::remove_file(&scratch);
                    self.phase = ScanPhase::Idle;
                    return Err(e)
                        .with_context(|| format!("{} full scan of {}", kind, file.display()));
                }
            }
        } else {
            filtered.clone()
        };

        // ── 4. Reconcile suppressions against ground truth ────────
        self.phase = ScanPhase::Reconcile;
        let reconciled = registry.reconcile(kind, &full, file)?;

        // ── 5. Present, unless a newer scan started meanwhile ─────
        let latest = self
            .generations
            .get(&rel_path_str(file))
            .copied()
            .unwrap_or(generation);
        let applied = latest == generation;
        if applied {
            self.phase = ScanPhase::Present;
            presenter.update(file, &filtered, registry);
        }

        let _ = fs::remove_file(&scratch);
        self.phase = ScanPhase::Idle;

        Ok(ScanOutcome {
            generation,
            applied,
            reconciled,
            findings: filtered.len(),
        })
    }

    fn scratch_path(&self, file: &Path, generation: u64) -> PathBuf {
        let name = file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document".to_string());
        self.scratch_dir
            .join(format!("{}-{}-{}", self.engine.kind(), generation, name))
    }
}

/// Engine output is attributed to the scratch copy it scanned; rewrite the
/// file of each finding to the real workspace-relative path so logical keys
/// and reconciliation line up.
fn attribute(mut findings: Vec<Finding>, file: &Path) -> Vec<Finding> {
    for finding in &mut findings {
        finding.file = file.to_path_buf();
    }
    findings
}
