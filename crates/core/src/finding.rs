//! Finding types shared by engine adapters, the ignore registry, and presentation

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Severity level of a finding.
///
/// Variants are declared lowest-to-highest so the derived `Ord` gives the
/// arbitration ordering `malicious > critical > high > medium > low >
/// unknown > ok` used wherever two engines report on the same line.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Ok,
    Unknown,
    Low,
    Medium,
    High,
    Critical,
    Malicious,
}

impl Severity {
    /// Parse a severity name as written in config files and CLI flags.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ok" => Some(Severity::Ok),
            "unknown" => Some(Severity::Unknown),
            "low" => Some(Severity::Low),
            "medium" => Some(Severity::Medium),
            "high" => Some(Severity::High),
            "critical" => Some(Severity::Critical),
            "malicious" => Some(Severity::Malicious),
            _ => None,
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Severity::Ok => "ok",
            Severity::Unknown => "unknown",
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
            Severity::Malicious => "malicious",
        };
        write!(f, "{}", name)
    }
}

/// The engine kind a finding or suppression belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    Oss,
    Secrets,
    Iac,
    Quality,
    Container,
}

impl EngineKind {
    /// All engine kinds, in presentation order.
    pub const ALL: [EngineKind; 5] = [
        EngineKind::Oss,
        EngineKind::Secrets,
        EngineKind::Iac,
        EngineKind::Quality,
        EngineKind::Container,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EngineKind::Oss => "oss",
            EngineKind::Secrets => "secrets",
            EngineKind::Iac => "iac",
            EngineKind::Quality => "quality",
            EngineKind::Container => "container",
        }
    }

    /// Parse an engine kind name as written in config files and CLI flags.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "oss" => Some(EngineKind::Oss),
            "secrets" => Some(EngineKind::Secrets),
            "iac" => Some(EngineKind::Iac),
            "quality" => Some(EngineKind::Quality),
            "container" => Some(EngineKind::Container),
            _ => None,
        }
    }
}

impl std::fmt::Display for EngineKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Engine-specific identity of a finding.
///
/// One strongly shaped payload per engine kind; the serde tag doubles as the
/// wire discriminant for engine output and the persisted registry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "engine", rename_all = "lowercase")]
pub enum FindingPayload {
    Oss {
        manager: String,
        name: String,
        version: String,
    },
    Secret {
        title: String,
        value: String,
    },
    Iac {
        title: String,
        similarity_id: String,
    },
    Quality {
        rule_name: String,
        rule_id: String,
    },
    Container {
        image_name: String,
        image_tag: String,
    },
}

impl FindingPayload {
    /// The engine kind this payload belongs to.
    pub fn kind(&self) -> EngineKind {
        match self {
            FindingPayload::Oss { .. } => EngineKind::Oss,
            FindingPayload::Secret { .. } => EngineKind::Secrets,
            FindingPayload::Iac { .. } => EngineKind::Iac,
            FindingPayload::Quality { .. } => EngineKind::Quality,
            FindingPayload::Container { .. } => EngineKind::Container,
        }
    }

    /// The composite logical key identifying this finding across scans.
    ///
    /// Line numbers never participate — they are volatile across edits. File
    /// identity participates only for the kinds whose findings are inherently
    /// file-bound (secrets, IaC, quality rules); package and image findings
    /// keep the same key wherever they appear.
    pub fn key(&self, rel_path: &str) -> String {
        match self {
            FindingPayload::Oss {
                manager,
                name,
                version,
            } => format!("{}:{}:{}", manager, name, version),
            FindingPayload::Secret { title, value } => {
                format!("{}:{}:{}", title, value, rel_path)
            }
            FindingPayload::Iac {
                title,
                similarity_id,
            } => format!("{}:{}:{}", title, similarity_id, rel_path),
            FindingPayload::Quality { rule_name, rule_id } => {
                format!("{}:{}:{}", rule_name, rule_id, rel_path)
            }
            FindingPayload::Container {
                image_name,
                image_tag,
            } => format!("{}:{}", image_name, image_tag),
        }
    }

    /// A short human-readable label for listings and synthesized markers.
    pub fn label(&self) -> String {
        match self {
            FindingPayload::Oss {
                manager,
                name,
                version,
            } => format!("{} {}@{}", manager, name, version),
            FindingPayload::Secret { title, .. } => title.clone(),
            FindingPayload::Iac { title, .. } => title.clone(),
            FindingPayload::Quality { rule_name, .. } => rule_name.clone(),
            FindingPayload::Container {
                image_name,
                image_tag,
            } => format!("{}:{}", image_name, image_tag),
        }
    }
}

/// A single finding reported by one engine invocation.
///
/// Findings are ephemeral — they live for one orchestration cycle and are
/// never persisted. Only their logical keys survive, inside the registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Finding {
    /// Severity level
    pub severity: Severity,

    /// Human-readable message
    pub message: String,

    /// File where the finding was detected, relative to the workspace root
    pub file: PathBuf,

    /// Line number in the file (1-indexed)
    pub line: usize,

    /// Optional column range within the line
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub columns: Option<(usize, usize)>,

    /// Engine-specific identity
    #[serde(flatten)]
    pub payload: FindingPayload,
}

impl Finding {
    /// The engine kind that produced this finding.
    pub fn kind(&self) -> EngineKind {
        self.payload.kind()
    }

    /// The composite logical key used to match this finding across scans.
    pub fn logical_key(&self) -> String {
        self.payload.key(&rel_path_str(&self.file))
    }
}

/// Normalize a workspace-relative path to a forward-slash string, the form
/// used in occurrence records and logical keys.
pub fn rel_path_str(path: &Path) -> String {
    let s = path.to_string_lossy();
    if s.contains('\\') {
        s.replace('\\', "/")
    } else {
        s.into_owned()
    }
}
