use quell_core::registry::{IgnoreDescriptor, IgnoreRegistry};
use quell_core::{
    DiagnosticPresenter, EngineError, EngineKind, Finding, FindingPayload, QuellConfig,
    ScanEngine, ScanOrchestrator, Severity,
};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

#[derive(Clone, Default)]
struct EngineScript {
    filtered: Vec<Finding>,
    full: Vec<Finding>,
    fail: bool,
}

/// In-process engine double: returns `filtered` when a filter projection is
/// passed, `full` otherwise, and records the filter argument of every call.
struct FakeEngine {
    kind: EngineKind,
    script: Arc<Mutex<EngineScript>>,
    calls: Arc<Mutex<Vec<Option<PathBuf>>>>,
}

impl FakeEngine {
    fn new(kind: EngineKind) -> (Self, Arc<Mutex<EngineScript>>, Arc<Mutex<Vec<Option<PathBuf>>>>) {
        let script = Arc::new(Mutex::new(EngineScript::default()));
        let calls = Arc::new(Mutex::new(Vec::new()));
        (
            Self {
                kind,
                script: script.clone(),
                calls: calls.clone(),
            },
            script,
            calls,
        )
    }
}

impl ScanEngine for FakeEngine {
    fn kind(&self) -> EngineKind {
        self.kind
    }

    fn scan(&self, _target: &Path, filter: Option<&Path>) -> Result<Vec<Finding>, EngineError> {
        self.calls
            .lock()
            .unwrap()
            .push(filter.map(Path::to_path_buf));
        let script = self.script.lock().unwrap();
        if script.fail {
            return Err(EngineError::Failed {
                command: "fake-engine".to_string(),
                status: 2,
                stderr: "boom".to_string(),
            });
        }
        Ok(if filter.is_some() {
            script.filtered.clone()
        } else {
            script.full.clone()
        })
    }
}

fn lodash_finding(line: usize) -> Finding {
    Finding {
        severity: Severity::High,
        message: "lodash@4.17.15 is vulnerable".to_string(),
        file: PathBuf::from("package.json"),
        line,
        columns: None,
        payload: FindingPayload::Oss {
            manager: "npm".to_string(),
            name: "lodash".to_string(),
            version: "4.17.15".to_string(),
        },
    }
}

struct Fixture {
    _tmp: TempDir,
    root: PathBuf,
    registry: IgnoreRegistry,
    presenter: DiagnosticPresenter,
    orchestrator: ScanOrchestrator,
    script: Arc<Mutex<EngineScript>>,
    calls: Arc<Mutex<Vec<Option<PathBuf>>>>,
}

fn fixture() -> Fixture {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();
    std::fs::write(root.join("package.json"), "{\"dependencies\":{}}").unwrap();

    let config = QuellConfig::default();
    let registry = IgnoreRegistry::open(&root, &config).unwrap();
    let presenter = DiagnosticPresenter::new(EngineKind::Oss);

    let (engine, script, calls) = FakeEngine::new(EngineKind::Oss);
    let scratch = root.join(".quell-cache").join("scratch");
    let orchestrator = ScanOrchestrator::new(Box::new(engine), scratch);

    Fixture {
        _tmp: tmp,
        root,
        registry,
        presenter,
        orchestrator,
        script,
        calls,
    }
}

#[test]
fn test_single_invocation_when_nothing_suppressed() {
    let mut fx = fixture();
    fx.script.lock().unwrap().full = vec![lodash_finding(5)];
    fx.script.lock().unwrap().filtered = vec![lodash_finding(5)];

    let outcome = fx
        .orchestrator
        .scan(
            &fx.root,
            Path::new("package.json"),
            &mut fx.registry,
            &mut fx.presenter,
        )
        .unwrap();

    assert!(outcome.applied);
    assert!(!outcome.reconciled);
    assert_eq!(outcome.findings, 1);

    // One invocation, no filter: the second pass is skipped to avoid
    // doubling engine cost
    let calls = fx.calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0], None);
}

#[test]
fn test_two_phase_invocation_when_suppressed() {
    let mut fx = fixture();
    fx.registry
        .add_entry(IgnoreDescriptor::from_finding(&lodash_finding(5)))
        .unwrap();

    fx.script.lock().unwrap().full = vec![lodash_finding(5)];
    fx.script.lock().unwrap().filtered = vec![];

    let outcome = fx
        .orchestrator
        .scan(
            &fx.root,
            Path::new("package.json"),
            &mut fx.registry,
            &mut fx.presenter,
        )
        .unwrap();
    assert!(outcome.applied);

    let calls = fx.calls.lock().unwrap();
    assert_eq!(calls.len(), 2);
    // Filtered pass first, with the projection path; then ground truth
    assert_eq!(calls[0].as_deref(), Some(fx.registry.filter_path()));
    assert_eq!(calls[1], None);
}

#[test]
fn test_ignored_marker_with_zero_active_diagnostics() {
    let mut fx = fixture();
    fx.registry
        .add_entry(IgnoreDescriptor::from_finding(&lodash_finding(5)))
        .unwrap();

    fx.script.lock().unwrap().full = vec![lodash_finding(5)];
    fx.script.lock().unwrap().filtered = vec![];

    fx.orchestrator
        .scan(
            &fx.root,
            Path::new("package.json"),
            &mut fx.registry,
            &mut fx.presenter,
        )
        .unwrap();

    let annotations = fx.presenter.annotations(Path::new("package.json"));
    assert_eq!(annotations.len(), 1);
    assert!(annotations[0].ignored);
    assert_eq!(annotations[0].line, 5);
    assert_eq!(
        fx.presenter.severity_at(Path::new("package.json"), 5),
        None
    );
}

#[test]
fn test_line_drift_repair_through_scan() {
    let mut fx = fixture();
    fx.registry
        .add_entry(IgnoreDescriptor::from_finding(&lodash_finding(10)))
        .unwrap();

    // After an edit the full scan reports the same key at line 14
    fx.script.lock().unwrap().full = vec![lodash_finding(14)];
    fx.script.lock().unwrap().filtered = vec![];

    let outcome = fx
        .orchestrator
        .scan(
            &fx.root,
            Path::new("package.json"),
            &mut fx.registry,
            &mut fx.presenter,
        )
        .unwrap();
    assert!(outcome.reconciled);

    let (_, entry) = fx.registry.entries().next().unwrap();
    assert_eq!(entry.occurrences[0].line, Some(14));

    // The marker moved with it; nothing is left at line 10
    let annotations = fx.presenter.annotations(Path::new("package.json"));
    assert_eq!(annotations.len(), 1);
    assert_eq!(annotations[0].line, 14);
    assert!(annotations[0].ignored);
}

#[test]
fn test_eviction_through_scan() {
    let mut fx = fixture();
    fx.registry
        .add_entry(IgnoreDescriptor::from_finding(&lodash_finding(5)))
        .unwrap();

    // lodash removed from the manifest: ground truth is empty
    fx.script.lock().unwrap().full = vec![];
    fx.script.lock().unwrap().filtered = vec![];

    let outcome = fx
        .orchestrator
        .scan(
            &fx.root,
            Path::new("package.json"),
            &mut fx.registry,
            &mut fx.presenter,
        )
        .unwrap();

    assert!(outcome.reconciled);
    assert!(fx.registry.is_empty());
    assert!(fx
        .presenter
        .annotations(Path::new("package.json"))
        .is_empty());
}

#[test]
fn test_engine_failure_clears_presentation_keeps_registry() {
    let mut fx = fixture();
    fx.registry
        .add_entry(IgnoreDescriptor::from_finding(&lodash_finding(5)))
        .unwrap();

    // A good scan first, so there is presented state to lose
    fx.script.lock().unwrap().full = vec![lodash_finding(5)];
    fx.script.lock().unwrap().filtered = vec![];
    fx.orchestrator
        .scan(
            &fx.root,
            Path::new("package.json"),
            &mut fx.registry,
            &mut fx.presenter,
        )
        .unwrap();
    assert_eq!(fx.presenter.annotations(Path::new("package.json")).len(), 1);

    // Engine crashes: presented state cleared, suppression untouched
    fx.script.lock().unwrap().fail = true;
    let result = fx.orchestrator.scan(
        &fx.root,
        Path::new("package.json"),
        &mut fx.registry,
        &mut fx.presenter,
    );

    assert!(result.is_err());
    assert!(fx
        .presenter
        .annotations(Path::new("package.json"))
        .is_empty());
    assert!(!fx.registry.is_empty());
}

#[test]
fn test_stale_generation_is_discarded() {
    let mut fx = fixture();
    fx.script.lock().unwrap().full = vec![lodash_finding(5)];
    fx.script.lock().unwrap().filtered = vec![lodash_finding(5)];

    // An older scan begins, then a newer one begins and completes first
    let stale = fx.orchestrator.begin_scan(Path::new("package.json"));
    let fresh = fx.orchestrator.begin_scan(Path::new("package.json"));

    let outcome = fx
        .orchestrator
        .run(
            &fx.root,
            Path::new("package.json"),
            fresh,
            &mut fx.registry,
            &mut fx.presenter,
        )
        .unwrap();
    assert!(outcome.applied);
    assert_eq!(fx.presenter.annotations(Path::new("package.json")).len(), 1);

    // The slow stale scan completes afterwards with different results;
    // it must not clobber the fresher state
    fx.script.lock().unwrap().full = vec![];
    fx.script.lock().unwrap().filtered = vec![];
    let outcome = fx
        .orchestrator
        .run(
            &fx.root,
            Path::new("package.json"),
            stale,
            &mut fx.registry,
            &mut fx.presenter,
        )
        .unwrap();

    assert!(!outcome.applied);
    assert_eq!(fx.presenter.annotations(Path::new("package.json")).len(), 1);
}

#[test]
fn test_scratch_copies_are_cleaned_up() {
    let mut fx = fixture();
    fx.script.lock().unwrap().full = vec![lodash_finding(5)];
    fx.script.lock().unwrap().filtered = vec![lodash_finding(5)];

    fx.orchestrator
        .scan(
            &fx.root,
            Path::new("package.json"),
            &mut fx.registry,
            &mut fx.presenter,
        )
        .unwrap();

    let scratch_dir = fx.root.join(".quell-cache").join("scratch");
    let leftovers: Vec<_> = std::fs::read_dir(&scratch_dir)
        .map(|entries| entries.filter_map(|e| e.ok()).collect())
        .unwrap_or_default();
    assert!(leftovers.is_empty());
}
