//! Per-file problem annotations built from filtered findings plus
//! suppression state

use crate::finding::{rel_path_str, EngineKind, Finding, Severity};
use crate::registry::{IgnoreDescriptor, IgnoreRegistry};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;

/// One problem annotation on one line.
///
/// Co-located findings from the same engine are aggregated into a single
/// annotation; `count` is how many landed on the line. An `ignored`
/// annotation is synthesized from registry metadata alone — its finding was
/// filtered out of the scan result, so no finding object backs it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    pub line: usize,
    pub severity: Severity,
    pub message: String,
    pub count: usize,
    pub ignored: bool,
}

/// Presented diagnostics for one engine kind, per file.
///
/// The last filtered result is retained per file so that a single
/// ignore/un-ignore toggle can recompute one line in memory instead of
/// re-running the engine.
pub struct DiagnosticPresenter {
    kind: EngineKind,
    findings: HashMap<String, Vec<Finding>>,
    annotations: HashMap<String, Vec<Annotation>>,
}

impl DiagnosticPresenter {
    pub fn new(kind: EngineKind) -> Self {
        Self {
            kind,
            findings: HashMap::new(),
            annotations: HashMap::new(),
        }
    }

    pub fn kind(&self) -> EngineKind {
        self.kind
    }

    /// Replace everything presented for `file` from a fresh filtered result.
    pub fn update(&mut self, file: &Path, filtered: &[Finding], registry: &IgnoreRegistry) {
        let rel = rel_path_str(file);
        let annotations = build_annotations(self.kind, file, filtered, registry, None);
        self.findings.insert(rel.clone(), filtered.to_vec());
        self.annotations.insert(rel, annotations);
    }

    /// Recompute the annotations for a single line after an ignore or
    /// un-ignore toggle, from the retained findings — no engine re-run.
    pub fn refresh_line(&mut self, file: &Path, line: usize, registry: &IgnoreRegistry) {
        let rel = rel_path_str(file);
        let retained = self.findings.get(&rel).cloned().unwrap_or_default();
        let rebuilt = build_annotations(self.kind, file, &retained, registry, Some(line));

        let annotations = self.annotations.entry(rel).or_default();
        annotations.retain(|a| a.line != line);
        annotations.extend(rebuilt);
        annotations.sort_by_key(|a| (a.line, a.ignored));
    }

    /// Drop everything presented for `file` (e.g. after an engine failure —
    /// never show stale or partial results).
    pub fn clear_file(&mut self, file: &Path) {
        let rel = rel_path_str(file);
        self.findings.remove(&rel);
        self.annotations.remove(&rel);
    }

    /// Annotations for `file`, sorted by line.
    pub fn annotations(&self, file: &Path) -> &[Annotation] {
        self.annotations
            .get(&rel_path_str(file))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Highest severity among the live (non-ignored) annotations on `line`.
    pub fn severity_at(&self, file: &Path, line: usize) -> Option<Severity> {
        self.annotations(file)
            .iter()
            .filter(|a| a.line == line && !a.ignored)
            .map(|a| a.severity)
            .max()
    }

    /// Files with presented state, sorted.
    pub fn files(&self) -> Vec<&str> {
        let mut files: Vec<&str> = self.annotations.keys().map(String::as_str).collect();
        files.sort_unstable();
        files
    }
}

/// Build annotations for `file` from a finding set, consulting the registry
/// for active suppressions. With `only_line` set, restricts the output to
/// that line (the single-line recompute path).
fn build_annotations(
    kind: EngineKind,
    file: &Path,
    findings: &[Finding],
    registry: &IgnoreRegistry,
    only_line: Option<usize>,
) -> Vec<Annotation> {
    // Findings whose key is actively suppressed for this file drop out of
    // the live set even if the engine-side filter let them through
    let mut live: Vec<&Finding> = Vec::new();
    let mut live_keys: HashSet<String> = HashSet::new();
    for finding in findings {
        if registry.is_ignored(&IgnoreDescriptor::from_finding(finding)) {
            continue;
        }
        live_keys.insert(finding.logical_key());
        live.push(finding);
    }

    let mut by_line: BTreeMap<usize, Vec<&Finding>> = BTreeMap::new();
    for finding in live {
        if only_line.is_some_and(|l| l != finding.line) {
            continue;
        }
        by_line.entry(finding.line).or_default().push(finding);
    }

    let mut annotations: Vec<Annotation> = Vec::new();

    for (line, on_line) in by_line {
        let severity = on_line
            .iter()
            .map(|f| f.severity)
            .max()
            .unwrap_or(Severity::Unknown);
        let message = if on_line.len() == 1 {
            on_line[0].message.clone()
        } else {
            format!("{} violations on this line", on_line.len())
        };
        annotations.push(Annotation {
            line,
            severity,
            message,
            count: on_line.len(),
            ignored: false,
        });
    }

    // Synthesize markers for suppressions whose finding was filtered out.
    // Only registry metadata is available here — no finding object exists.
    for occurrence in registry.active_for_file(kind, file) {
        if live_keys.contains(&occurrence.key) {
            continue;
        }
        let Some(line) = occurrence.line else {
            continue;
        };
        if only_line.is_some_and(|l| l != line) {
            continue;
        }
        let message = if occurrence.description.is_empty() {
            format!("{} (ignored)", occurrence.label)
        } else {
            occurrence.description.clone()
        };
        annotations.push(Annotation {
            line,
            severity: occurrence.severity,
            message,
            count: 1,
            ignored: true,
        });
    }

    annotations.sort_by_key(|a| (a.line, a.ignored));
    annotations
}

/// Severity-bucketed totals across everything presented in one run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanSummary {
    pub malicious: usize,
    pub critical: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    pub unknown: usize,
    pub ok: usize,
    pub ignored: usize,
    pub files_scanned: usize,
}

impl ScanSummary {
    pub fn record(&mut self, annotation: &Annotation) {
        if annotation.ignored {
            self.ignored += 1;
            return;
        }
        match annotation.severity {
            Severity::Malicious => self.malicious += 1,
            Severity::Critical => self.critical += 1,
            Severity::High => self.high += 1,
            Severity::Medium => self.medium += 1,
            Severity::Low => self.low += 1,
            Severity::Unknown => self.unknown += 1,
            Severity::Ok => self.ok += 1,
        }
    }

    /// Count of live annotations at or above the given severity.
    pub fn at_or_above(&self, threshold: Severity) -> usize {
        let buckets = [
            (Severity::Malicious, self.malicious),
            (Severity::Critical, self.critical),
            (Severity::High, self.high),
            (Severity::Medium, self.medium),
            (Severity::Low, self.low),
            (Severity::Unknown, self.unknown),
            (Severity::Ok, self.ok),
        ];
        buckets
            .iter()
            .filter(|(severity, _)| *severity >= threshold)
            .map(|(_, count)| count)
            .sum()
    }

    /// Check whether findings exceed the configured severity threshold.
    ///
    /// `fail_on` is a severity name; `"never"` always passes. An
    /// unrecognized value defaults to `"high"`.
    pub fn exceeds_threshold(&self, fail_on: &str) -> bool {
        if fail_on == "never" {
            return false;
        }
        let threshold = Severity::parse(fail_on).unwrap_or(Severity::High);
        self.at_or_above(threshold) > 0
    }
}
