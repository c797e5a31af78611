//! Quell Core - Suppression Registry & Scan Reconciliation Engine
//!
//! This crate provides the coordination layer between independent,
//! continuously re-run scan engines and the user's ignore decisions:
//! - Persisted ignore registry with a derived engine-facing filter projection
//! - Two-phase (filtered/unfiltered) scan orchestration per engine kind
//! - Line-drift repair that keeps suppressions located as files are edited
//! - Cross-engine severity arbitration for lines reported by several engines

pub mod arbiter;
pub mod config;
pub mod discovery;
pub mod engine;
pub mod finding;
pub mod orchestrator;
pub mod presenter;
pub mod projection;
pub mod registry;
pub mod watcher;
pub mod workspace;

pub use config::{EngineConfig, QuellConfig};
pub use discovery::discover_targets;
pub use engine::{CommandEngine, EngineError, ScanEngine};
pub use finding::{rel_path_str, EngineKind, Finding, FindingPayload, Severity};
pub use orchestrator::{ScanOrchestrator, ScanOutcome, ScanPhase};
pub use presenter::{Annotation, DiagnosticPresenter, ScanSummary};
pub use projection::FilterRecord;
pub use registry::{IgnoreDescriptor, IgnoreEntry, IgnoreRegistry, Occurrence};
pub use watcher::RegistryWatcher;
pub use workspace::Workspace;

/// Quell version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
