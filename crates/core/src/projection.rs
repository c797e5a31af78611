//! Engine-facing filter projection — a write-only artifact regenerated from
//! the registry on every mutation
//!
//! Engines consume this file as an invocation-time hint to skip findings the
//! user already ignored. It is never read back; the registry stays the
//! source of truth.

use crate::registry::IgnoreEntry;
use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

/// One minimal filter record, in the shape the external engines expect.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(untagged)]
pub enum FilterRecord {
    Oss {
        #[serde(rename = "PackageManager")]
        manager: String,
        #[serde(rename = "PackageName")]
        name: String,
        #[serde(rename = "PackageVersion")]
        version: String,
    },
    Secret {
        #[serde(rename = "Title")]
        title: String,
        #[serde(rename = "SecretValue")]
        value: String,
    },
    Iac {
        #[serde(rename = "Title")]
        title: String,
        #[serde(rename = "SimilarityID")]
        similarity_id: String,
    },
    Quality {
        #[serde(rename = "FileName")]
        file_name: String,
        #[serde(rename = "Line")]
        line: usize,
        #[serde(rename = "RuleID")]
        rule_id: String,
    },
    Container {
        #[serde(rename = "ImageName")]
        image_name: String,
        #[serde(rename = "ImageTag")]
        image_tag: String,
    },
}

/// Collect deduplicated filter records from the active occurrences of the
/// given entries, in deterministic order.
pub fn collect_records<'a>(entries: impl Iterator<Item = &'a IgnoreEntry>) -> Vec<FilterRecord> {
    use crate::finding::FindingPayload;

    let mut records: BTreeSet<FilterRecord> = BTreeSet::new();

    for entry in entries {
        for occurrence in entry.occurrences.iter().filter(|o| o.active) {
            let record = match &entry.payload {
                FindingPayload::Oss {
                    manager,
                    name,
                    version,
                } => FilterRecord::Oss {
                    manager: manager.clone(),
                    name: name.clone(),
                    version: version.clone(),
                },
                FindingPayload::Secret { title, value } => FilterRecord::Secret {
                    title: title.clone(),
                    value: value.clone(),
                },
                FindingPayload::Iac {
                    title,
                    similarity_id,
                } => FilterRecord::Iac {
                    title: title.clone(),
                    similarity_id: similarity_id.clone(),
                },
                FindingPayload::Quality { rule_id, .. } => FilterRecord::Quality {
                    file_name: occurrence.path.clone(),
                    line: occurrence.line.unwrap_or(0),
                    rule_id: rule_id.clone(),
                },
                FindingPayload::Container {
                    image_name,
                    image_tag,
                } => FilterRecord::Container {
                    image_name: image_name.clone(),
                    image_tag: image_tag.clone(),
                },
            };
            records.insert(record);
        }
    }

    records.into_iter().collect()
}

/// Rewrite the projection file from scratch.
pub fn write_projection<'a>(
    path: &Path,
    entries: impl Iterator<Item = &'a IgnoreEntry>,
) -> Result<()> {
    let records = collect_records(entries);

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating cache dir {}", parent.display()))?;
    }

    let json = serde_json::to_string_pretty(&records).context("serializing filter projection")?;
    fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}
