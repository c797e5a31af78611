//! Root wiring — one workspace owns the registry, its watcher, and a scan
//! pipeline per engine kind
//!
//! The registry is constructed here and passed by reference into each scan;
//! nothing reaches it through a global accessor. All five engine pipelines
//! share the one registry and its derived projection file, serialized by
//! the single-process cooperative flow.

use crate::arbiter;
use crate::config::QuellConfig;
use crate::discovery::{self, matches_any};
use crate::engine::{CommandEngine, ScanEngine};
use crate::finding::{EngineKind, Severity};
use crate::orchestrator::{ScanOrchestrator, ScanOutcome};
use crate::presenter::{DiagnosticPresenter, ScanSummary};
use crate::registry::{IgnoreDescriptor, IgnoreRegistry};
use crate::watcher::RegistryWatcher;
use anyhow::Result;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

struct EngineSlot {
    orchestrator: ScanOrchestrator,
    presenter: DiagnosticPresenter,
    targets: Vec<glob::Pattern>,
}

/// A bound workspace: configuration, suppression registry, and one
/// orchestrator/presenter pair per configured engine.
pub struct Workspace {
    root: PathBuf,
    config: QuellConfig,
    registry: IgnoreRegistry,
    watcher: Option<RegistryWatcher>,
    slots: Vec<EngineSlot>,
}

impl Workspace {
    /// Bind to a workspace root, loading `.quell.toml` and the persisted
    /// registry, with command engines built from the config.
    pub fn open(root: &Path) -> Result<Self> {
        let root = std::fs::canonicalize(root).unwrap_or_else(|_| root.to_path_buf());
        let config = QuellConfig::find_and_load(&root)?;

        let engines: Vec<Box<dyn ScanEngine>> = config
            .engines
            .enabled_kinds()
            .into_iter()
            .map(|kind| {
                Box::new(CommandEngine::from_config(kind, config.engines.get(kind)))
                    as Box<dyn ScanEngine>
            })
            .collect();

        Self::with_engines(&root, config, engines)
    }

    /// Bind with explicitly supplied engines. This is the seam embedders
    /// and tests use; engine targets still come from the config.
    pub fn with_engines(
        root: &Path,
        config: QuellConfig,
        engines: Vec<Box<dyn ScanEngine>>,
    ) -> Result<Self> {
        let registry = IgnoreRegistry::open(root, &config)?;
        let scratch_dir = root.join(&config.general.cache_dir).join("scratch");

        let slots = engines
            .into_iter()
            .map(|engine| {
                let kind = engine.kind();
                EngineSlot {
                    orchestrator: ScanOrchestrator::new(engine, scratch_dir.clone()),
                    presenter: DiagnosticPresenter::new(kind),
                    targets: discovery::compile_targets(&config.engines.get(kind).targets),
                }
            })
            .collect();

        Ok(Self {
            root: root.to_path_buf(),
            config,
            registry,
            watcher: None,
            slots,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &QuellConfig {
        &self.config
    }

    pub fn registry(&self) -> &IgnoreRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut IgnoreRegistry {
        &mut self.registry
    }

    /// Engine kinds with a configured pipeline, in presentation order.
    pub fn engine_kinds(&self) -> Vec<EngineKind> {
        self.slots.iter().map(|s| s.orchestrator.kind()).collect()
    }

    /// Engine kinds whose targets match the given relative path.
    pub fn kinds_for(&self, file: &Path) -> Vec<EngineKind> {
        self.slots
            .iter()
            .filter(|s| matches_any(file, &s.targets))
            .map(|s| s.orchestrator.kind())
            .collect()
    }

    /// Start watching the registry file for external edits. Call
    /// [`Workspace::poll_registry_edits`] from the host loop afterwards.
    pub fn watch_registry(&mut self) -> Result<()> {
        if self.watcher.is_none() {
            self.watcher = Some(RegistryWatcher::new(
                self.registry.registry_path(),
                Duration::from_millis(self.config.general.debounce_ms),
            )?);
        }
        Ok(())
    }

    /// Run the two-phase protocol for one engine kind on one file.
    /// Returns `None` when no pipeline exists for that kind.
    pub fn scan_file(&mut self, kind: EngineKind, file: &Path) -> Result<Option<ScanOutcome>> {
        let Some(index) = self
            .slots
            .iter()
            .position(|s| s.orchestrator.kind() == kind)
        else {
            return Ok(None);
        };
        let slot = &mut self.slots[index];
        let outcome =
            slot.orchestrator
                .scan(&self.root, file, &mut self.registry, &mut slot.presenter)?;
        Ok(Some(outcome))
    }

    /// Scan one file with every engine whose targets match it.
    pub fn scan_path(&mut self, file: &Path) -> Result<Vec<(EngineKind, ScanOutcome)>> {
        let mut outcomes = Vec::new();
        for index in 0..self.slots.len() {
            if !matches_any(file, &self.slots[index].targets) {
                continue;
            }
            let slot = &mut self.slots[index];
            let outcome =
                slot.orchestrator
                    .scan(&self.root, file, &mut self.registry, &mut slot.presenter)?;
            outcomes.push((slot.orchestrator.kind(), outcome));
        }
        Ok(outcomes)
    }

    /// Discover and scan every target of every engine.
    pub fn scan_workspace(&mut self) -> Result<Vec<(EngineKind, PathBuf, ScanOutcome)>> {
        let mut planned: Vec<(usize, Vec<PathBuf>)> = Vec::new();
        for (index, slot) in self.slots.iter().enumerate() {
            let files =
                discovery::discover_targets(&self.root, &slot.targets, &self.config.ignore.paths)?;
            planned.push((index, files));
        }

        let mut outcomes = Vec::new();
        for (index, files) in planned {
            for file in files {
                let slot = &mut self.slots[index];
                let outcome = slot.orchestrator.scan(
                    &self.root,
                    &file,
                    &mut self.registry,
                    &mut slot.presenter,
                )?;
                outcomes.push((slot.orchestrator.kind(), file, outcome));
            }
        }
        Ok(outcomes)
    }

    /// Add a suppression and recompute just the affected line across
    /// engines — no re-scan for a one-line UI update.
    pub fn ignore(&mut self, descriptor: IgnoreDescriptor) -> Result<Severity> {
        let kind = descriptor.payload.kind();
        let file = descriptor.path.clone();
        let line = descriptor.line;

        self.registry.add_entry(descriptor)?;

        if let Some(line) = line {
            if let Some(slot) = self
                .slots
                .iter_mut()
                .find(|s| s.orchestrator.kind() == kind)
            {
                slot.presenter.refresh_line(&file, line, &self.registry);
            }
            Ok(self.combined_severity(&file, line))
        } else {
            Ok(Severity::Ok)
        }
    }

    /// Deactivate a suppression's occurrences on one file and recompute the
    /// affected lines. Returns false when no such occurrence existed.
    pub fn unignore(&mut self, key: &str, file: &Path) -> Result<bool> {
        let rel = crate::finding::rel_path_str(file);

        let affected: Option<(EngineKind, Vec<usize>)> =
            self.registry.entries().find(|(k, _)| *k == key).map(|(_, entry)| {
                let lines = entry
                    .occurrences
                    .iter()
                    .filter(|o| o.active && o.path == rel)
                    .filter_map(|o| o.line)
                    .collect();
                (entry.kind, lines)
            });

        if !self.registry.set_active(key, file, false)? {
            return Ok(false);
        }

        if let Some((kind, lines)) = affected {
            if let Some(slot) = self
                .slots
                .iter_mut()
                .find(|s| s.orchestrator.kind() == kind)
            {
                for line in lines {
                    slot.presenter.refresh_line(file, line, &self.registry);
                }
            }
        }
        Ok(true)
    }

    /// Drain registry watcher events; on a genuine external edit, absorb it
    /// and re-scan only the affected files (never the whole workspace).
    pub fn poll_registry_edits(&mut self) -> Result<Vec<PathBuf>> {
        let touched = self
            .watcher
            .as_ref()
            .is_some_and(|w| w.registry_touched());
        if !touched || !self.registry.external_change()? {
            return Ok(Vec::new());
        }

        let affected: Vec<PathBuf> = self
            .registry
            .absorb_external_edit()?
            .into_iter()
            .map(PathBuf::from)
            .collect();

        for file in &affected {
            self.scan_path(file)?;
        }
        Ok(affected)
    }

    /// Combined severity of one line across all engines.
    pub fn combined_severity(&self, file: &Path, line: usize) -> Severity {
        arbiter::arbitrate_line(self.presenters(), file, line)
    }

    /// All presenters, for arbitration and output.
    pub fn presenters(&self) -> impl Iterator<Item = &DiagnosticPresenter> {
        self.slots.iter().map(|s| &s.presenter)
    }

    pub fn presenter(&self, kind: EngineKind) -> Option<&DiagnosticPresenter> {
        self.slots
            .iter()
            .find(|s| s.orchestrator.kind() == kind)
            .map(|s| &s.presenter)
    }

    /// Severity-bucketed totals across everything currently presented.
    pub fn summary(&self) -> ScanSummary {
        let mut summary = ScanSummary::default();
        let mut files: BTreeSet<&str> = BTreeSet::new();

        for presenter in self.presenters() {
            for file in presenter.files() {
                files.insert(file);
                for annotation in presenter.annotations(Path::new(file)) {
                    summary.record(annotation);
                }
            }
        }

        summary.files_scanned = files.len();
        summary
    }
}
