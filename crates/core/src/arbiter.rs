//! Cross-engine severity arbitration
//!
//! Two engines can legitimately report on the same line — a container-image
//! engine and an IaC engine both inspecting one manifest line, say. The
//! combined severity always follows the fixed ordering
//! `malicious > critical > high > medium > low > unknown > ok`.

use crate::finding::Severity;
use crate::presenter::DiagnosticPresenter;
use std::collections::BTreeMap;
use std::path::Path;

/// Fold any number of per-engine severities into the presented one.
pub fn combine<I: IntoIterator<Item = Severity>>(severities: I) -> Severity {
    severities.into_iter().max().unwrap_or(Severity::Ok)
}

/// Recompute the combined severity of a single line across engines.
///
/// This is the incremental path used right after one ignore/un-ignore
/// toggle: each presenter already holds its per-line state, so a one-line
/// UI update needs no re-scan. Ignored markers do not contribute.
pub fn arbitrate_line<'a>(
    presenters: impl IntoIterator<Item = &'a DiagnosticPresenter>,
    file: &Path,
    line: usize,
) -> Severity {
    combine(
        presenters
            .into_iter()
            .filter_map(|p| p.severity_at(file, line)),
    )
}

/// Combined severity per annotated line of `file`, across all presenters.
pub fn arbitrate_file<'a>(
    presenters: impl IntoIterator<Item = &'a DiagnosticPresenter>,
    file: &Path,
) -> BTreeMap<usize, Severity> {
    let mut combined: BTreeMap<usize, Severity> = BTreeMap::new();
    for presenter in presenters {
        for annotation in presenter.annotations(file) {
            if annotation.ignored {
                continue;
            }
            let entry = combined.entry(annotation.line).or_insert(Severity::Ok);
            *entry = (*entry).max(annotation.severity);
        }
    }
    combined
}
