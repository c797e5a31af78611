//! Persisted ignore registry — suppressions that survive edits, re-scans, and
//! engine restarts
//!
//! The registry is the source of truth; the filter projection handed to the
//! engines is derived from it and never read back. Every mutation rewrites
//! both files synchronously and records an origin digest so the registry
//! watcher can tell self-caused writes from external edits.

use crate::config::QuellConfig;
use crate::finding::{rel_path_str, EngineKind, Finding, FindingPayload, Severity};
use crate::projection;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// One `(file, line)` placement of a suppression.
///
/// A deactivated occurrence stays in history but no longer feeds the filter
/// projection or the ignored-marker presentation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Occurrence {
    /// Workspace-relative path, forward slashes
    pub path: String,

    /// Recorded line (1-indexed); absent for suppressions that are not
    /// line-bound, e.g. a container image ignored workspace-wide
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,

    pub active: bool,
}

/// One suppressed finding identity within one engine kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IgnoreEntry {
    pub kind: EngineKind,
    pub payload: FindingPayload,
    pub occurrences: Vec<Occurrence>,

    /// Best-effort metadata, overwritten on re-add
    pub severity: Severity,
    #[serde(default)]
    pub description: String,
    pub date_added: String,
}

impl IgnoreEntry {
    /// Whether any occurrence is active for the given relative path.
    pub fn active_on(&self, rel_path: &str) -> bool {
        self.occurrences
            .iter()
            .any(|o| o.active && o.path == rel_path)
    }
}

/// Argument to [`IgnoreRegistry::add_entry`] / [`IgnoreRegistry::is_ignored`].
#[derive(Debug, Clone)]
pub struct IgnoreDescriptor {
    pub payload: FindingPayload,
    /// Workspace-relative path the suppression applies to
    pub path: PathBuf,
    pub line: Option<usize>,
    pub severity: Severity,
    pub description: String,
}

impl IgnoreDescriptor {
    /// Build a descriptor straight from a reported finding.
    pub fn from_finding(finding: &Finding) -> Self {
        Self {
            payload: finding.payload.clone(),
            path: finding.file.clone(),
            line: Some(finding.line),
            severity: finding.severity,
            description: finding.message.clone(),
        }
    }

    /// The registry key this descriptor maps to.
    pub fn key(&self) -> String {
        self.payload.key(&rel_path_str(&self.path))
    }
}

/// Registry view of one active occurrence, used to synthesize ignored
/// markers when the matching finding was filtered out of the scan result.
#[derive(Debug, Clone)]
pub struct ActiveOccurrence {
    pub key: String,
    pub line: Option<usize>,
    pub severity: Severity,
    pub description: String,
    pub label: String,
}

/// Full registry document stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RegistryDoc {
    version: String,
    entries: BTreeMap<String, IgnoreEntry>,
}

/// Active-occurrence identity used for external-edit diffing.
type ActiveKey = (String, String, Option<usize>);

/// The persisted suppression registry and its derived filter projection.
///
/// Explicitly constructed and owned by the root workspace; scan pipelines
/// receive it by reference. There is no global accessor.
pub struct IgnoreRegistry {
    registry_path: PathBuf,
    filter_path: PathBuf,
    entries: BTreeMap<String, IgnoreEntry>,

    /// Active set from the last load/persist, diffed on external edits
    snapshot: HashSet<ActiveKey>,

    /// Digest of the last self-written registry bytes (origin tag)
    last_write_digest: Option<String>,

    load_warning: Option<String>,
}

impl IgnoreRegistry {
    /// Bind to a workspace and load the persisted registry.
    ///
    /// An unreadable or corrupt registry file resets the in-memory registry
    /// to empty; the failure is recorded on [`IgnoreRegistry::load_warning`]
    /// for the caller to surface. Never fatal.
    pub fn open(workspace_root: &Path, config: &QuellConfig) -> Result<Self> {
        let cache_dir = workspace_root.join(&config.general.cache_dir);
        let registry_path = cache_dir.join(&config.registry.file_name);
        let filter_path = cache_dir.join(&config.registry.filter_file_name);

        let mut registry = Self {
            registry_path,
            filter_path,
            entries: BTreeMap::new(),
            snapshot: HashSet::new(),
            last_write_digest: None,
            load_warning: None,
        };

        if registry.registry_path.exists() {
            match fs::read(&registry.registry_path) {
                Ok(bytes) => match serde_json::from_slice::<RegistryDoc>(&bytes) {
                    Ok(doc) => {
                        registry.entries = doc.entries;
                        registry.last_write_digest = Some(digest(&bytes));
                    }
                    Err(e) => {
                        registry.load_warning = Some(format!(
                            "ignore registry {} is corrupt, starting empty: {}",
                            registry.registry_path.display(),
                            e
                        ));
                    }
                },
                Err(e) => {
                    registry.load_warning = Some(format!(
                        "ignore registry {} is unreadable, starting empty: {}",
                        registry.registry_path.display(),
                        e
                    ));
                }
            }
        }

        registry.snapshot = registry.active_set();
        Ok(registry)
    }

    /// Warning recorded when the persisted file could not be loaded.
    pub fn load_warning(&self) -> Option<&str> {
        self.load_warning.as_deref()
    }

    pub fn registry_path(&self) -> &Path {
        &self.registry_path
    }

    /// Path of the derived filter projection handed to engine invocations.
    pub fn filter_path(&self) -> &Path {
        &self.filter_path
    }

    /// Upsert a suppression.
    ///
    /// An existing `(key, path, line)` occurrence is re-activated and the
    /// entry metadata refreshed instead of duplicated.
    pub fn add_entry(&mut self, descriptor: IgnoreDescriptor) -> Result<()> {
        let key = descriptor.key();
        let rel = rel_path_str(&descriptor.path);

        let entry = self.entries.entry(key).or_insert_with(|| IgnoreEntry {
            kind: descriptor.payload.kind(),
            payload: descriptor.payload.clone(),
            occurrences: Vec::new(),
            severity: descriptor.severity,
            description: descriptor.description.clone(),
            date_added: epoch_secs(),
        });

        // Metadata is best-effort and overwritten on re-add
        entry.severity = descriptor.severity;
        entry.description = descriptor.description;
        entry.date_added = epoch_secs();

        match entry
            .occurrences
            .iter_mut()
            .find(|o| o.path == rel && o.line == descriptor.line)
        {
            Some(occurrence) => occurrence.active = true,
            None => entry.occurrences.push(Occurrence {
                path: rel,
                line: descriptor.line,
                active: true,
            }),
        }

        self.persist()?;
        self.regenerate_projection()
    }

    /// Whether a matching entry has an active occurrence for the
    /// descriptor's path.
    pub fn is_ignored(&self, descriptor: &IgnoreDescriptor) -> bool {
        let rel = rel_path_str(&descriptor.path);
        self.entries
            .get(&descriptor.key())
            .is_some_and(|entry| entry.active_on(&rel))
    }

    /// Whether any entry of the given kind has at least one active
    /// occurrence. Decides whether a scan needs the unfiltered second pass.
    pub fn has_active_entries(&self, kind: EngineKind) -> bool {
        self.entries
            .values()
            .any(|e| e.kind == kind && e.occurrences.iter().any(|o| o.active))
    }

    /// Active occurrences of the given kind recorded for `file`, with the
    /// metadata needed to synthesize an ignored marker.
    pub fn active_for_file(&self, kind: EngineKind, file: &Path) -> Vec<ActiveOccurrence> {
        let rel = rel_path_str(file);
        let mut result = Vec::new();
        for (key, entry) in &self.entries {
            if entry.kind != kind {
                continue;
            }
            for occurrence in &entry.occurrences {
                if occurrence.active && occurrence.path == rel {
                    result.push(ActiveOccurrence {
                        key: key.clone(),
                        line: occurrence.line,
                        severity: entry.severity,
                        description: entry.description.clone(),
                        label: entry.payload.label(),
                    });
                }
            }
        }
        result
    }

    /// Iterate all entries, keyed.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &IgnoreEntry)> {
        self.entries.iter().map(|(k, e)| (k.as_str(), e))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Repair suppressions of one engine kind for `file` against that
    /// engine's newest unfiltered scan.
    ///
    /// For every active occurrence recorded for `file` under `kind`:
    /// - a finding with the same logical key still reported in `file` drags
    ///   the occurrence's line along to the newest reported line;
    /// - a key with zero matches means the underlying issue was fixed — the
    ///   occurrence is removed, and the entry with it when that was its last
    ///   occurrence.
    ///
    /// Only entries of `kind` are touched: the full result is one engine's
    /// ground truth and says nothing about the other engines' suppressions
    /// on the same file. Matching is purely by logical key; line numbers are
    /// never trusted. Returns whether anything changed; persists and
    /// regenerates the filter projection when it did.
    pub fn reconcile(&mut self, kind: EngineKind, full: &[Finding], file: &Path) -> Result<bool> {
        let rel = rel_path_str(file);

        // Lines reported per logical key in this file, sorted
        let mut present: HashMap<String, Vec<usize>> = HashMap::new();
        for finding in full {
            if rel_path_str(&finding.file) == rel {
                present.entry(finding.logical_key()).or_default().push(finding.line);
            }
        }
        for lines in present.values_mut() {
            lines.sort_unstable();
        }

        let mut changed = false;

        self.entries.retain(|key, entry| {
            if entry.kind != kind {
                return true;
            }

            let mut kept: Vec<Occurrence> = Vec::with_capacity(entry.occurrences.len());

            for mut occurrence in entry.occurrences.drain(..) {
                if !occurrence.active || occurrence.path != rel {
                    kept.push(occurrence);
                    continue;
                }

                let Some(lines) = present.get(key) else {
                    // Issue no longer reported anywhere in the file: evict
                    changed = true;
                    continue;
                };

                if let Some(old) = occurrence.line {
                    let new_line = nearest_line(lines, old);
                    if new_line != old {
                        occurrence.line = Some(new_line);
                        changed = true;
                    }
                }

                kept.push(occurrence);
            }

            // (path, line) pairs are unique within an entry; occurrences
            // that drifted onto the same line are merged, active winning
            let mut deduped: Vec<Occurrence> = Vec::with_capacity(kept.len());
            for occurrence in kept {
                match deduped
                    .iter_mut()
                    .find(|o| o.path == occurrence.path && o.line == occurrence.line)
                {
                    Some(existing) => {
                        changed = true;
                        if occurrence.active && !existing.active {
                            existing.active = true;
                        }
                    }
                    None => deduped.push(occurrence),
                }
            }

            entry.occurrences = deduped;
            !entry.occurrences.is_empty()
        });

        if changed {
            self.persist()?;
            self.regenerate_projection()?;
        }
        Ok(changed)
    }

    /// Toggle one occurrence. Returns false when no such occurrence exists.
    pub fn set_active(&mut self, key: &str, file: &Path, active: bool) -> Result<bool> {
        let rel = rel_path_str(file);
        let Some(entry) = self.entries.get_mut(key) else {
            return Ok(false);
        };

        let mut toggled = false;
        for occurrence in &mut entry.occurrences {
            if occurrence.path == rel && occurrence.active != active {
                occurrence.active = active;
                toggled = true;
            }
        }

        if toggled {
            self.persist()?;
            self.regenerate_projection()?;
        }
        Ok(toggled)
    }

    /// Remove an entire entry. Returns false when the key is unknown.
    pub fn remove_entry(&mut self, key: &str) -> Result<bool> {
        if self.entries.remove(key).is_none() {
            return Ok(false);
        }
        self.persist()?;
        self.regenerate_projection()?;
        Ok(true)
    }

    /// Remove every entry.
    pub fn clear(&mut self) -> Result<usize> {
        let removed = self.entries.len();
        if removed > 0 {
            self.entries.clear();
            self.persist()?;
            self.regenerate_projection()?;
        }
        Ok(removed)
    }

    /// Whether the on-disk registry differs from the last self-written bytes.
    ///
    /// The origin tag: the watcher reports that the file was touched, and
    /// this check decides whether the change was ours (digest matches) or an
    /// external edit worth absorbing.
    pub fn external_change(&self) -> Result<bool> {
        if !self.registry_path.exists() {
            return Ok(self.last_write_digest.is_some());
        }
        let bytes = fs::read(&self.registry_path)
            .with_context(|| format!("reading {}", self.registry_path.display()))?;
        Ok(self.last_write_digest.as_deref() != Some(digest(&bytes).as_str()))
    }

    /// Reload the registry after an external edit and diff the active sets.
    ///
    /// Returns the relative paths of occurrences that transitioned
    /// active→inactive (or vanished), so the caller can re-scan just those
    /// files. A file that fails to load resets the registry to empty, which
    /// deactivates everything.
    pub fn absorb_external_edit(&mut self) -> Result<Vec<String>> {
        let previous = std::mem::take(&mut self.snapshot);

        self.entries = if self.registry_path.exists() {
            match fs::read(&self.registry_path) {
                Ok(bytes) => match serde_json::from_slice::<RegistryDoc>(&bytes) {
                    Ok(doc) => {
                        self.last_write_digest = Some(digest(&bytes));
                        doc.entries
                    }
                    Err(e) => {
                        self.load_warning = Some(format!(
                            "ignore registry {} is corrupt after external edit, starting empty: {}",
                            self.registry_path.display(),
                            e
                        ));
                        self.last_write_digest = None;
                        BTreeMap::new()
                    }
                },
                Err(e) => {
                    self.load_warning = Some(format!(
                        "ignore registry {} is unreadable after external edit, starting empty: {}",
                        self.registry_path.display(),
                        e
                    ));
                    self.last_write_digest = None;
                    BTreeMap::new()
                }
            }
        } else {
            self.last_write_digest = None;
            BTreeMap::new()
        };

        self.snapshot = self.active_set();

        let mut affected: Vec<String> = previous
            .iter()
            .filter(|active| !self.snapshot.contains(*active))
            .map(|(_, path, _)| path.clone())
            .collect();
        affected.sort();
        affected.dedup();

        self.regenerate_projection()?;
        Ok(affected)
    }

    /// Rebuild the filter projection from all active occurrences.
    pub fn regenerate_projection(&self) -> Result<()> {
        projection::write_projection(&self.filter_path, self.entries.values())
    }

    // ── Internals ────────────────────────────────────────────────

    fn active_set(&self) -> HashSet<ActiveKey> {
        let mut set = HashSet::new();
        for (key, entry) in &self.entries {
            for occurrence in &entry.occurrences {
                if occurrence.active {
                    set.insert((key.clone(), occurrence.path.clone(), occurrence.line));
                }
            }
        }
        set
    }

    fn persist(&mut self) -> Result<()> {
        if let Some(parent) = self.registry_path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating cache dir {}", parent.display()))?;
        }

        let doc = RegistryDoc {
            version: "1".to_string(),
            entries: self.entries.clone(),
        };
        let json = serde_json::to_string_pretty(&doc).context("serializing ignore registry")?;

        fs::write(&self.registry_path, &json)
            .with_context(|| format!("writing {}", self.registry_path.display()))?;

        self.last_write_digest = Some(digest(json.as_bytes()));
        self.snapshot = self.active_set();
        Ok(())
    }
}

/// The reported line closest to the recorded one; the recorded line wins
/// outright when the key is still reported there.
fn nearest_line(lines: &[usize], old: usize) -> usize {
    if lines.binary_search(&old).is_ok() {
        return old;
    }
    let mut best = lines[0];
    let mut best_distance = best.abs_diff(old);
    for &line in &lines[1..] {
        let distance = line.abs_diff(old);
        if distance < best_distance {
            best = line;
            best_distance = distance;
        }
    }
    best
}

fn digest(bytes: &[u8]) -> String {
    let hash = Sha256::digest(bytes);
    hash.iter().map(|b| format!("{:02x}", b)).collect()
}

fn epoch_secs() -> String {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| format!("{}", d.as_secs()))
        .unwrap_or_default()
}
