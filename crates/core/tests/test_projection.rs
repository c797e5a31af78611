use quell_core::registry::{IgnoreDescriptor, IgnoreRegistry};
use quell_core::{FindingPayload, QuellConfig, Severity};
use serde_json::Value;
use std::path::PathBuf;
use tempfile::TempDir;

fn descriptor(payload: FindingPayload, path: &str, line: Option<usize>) -> IgnoreDescriptor {
    IgnoreDescriptor {
        payload,
        path: PathBuf::from(path),
        line,
        severity: Severity::Medium,
        description: String::new(),
    }
}

fn read_filter(registry: &IgnoreRegistry) -> Vec<Value> {
    let text = std::fs::read_to_string(registry.filter_path()).unwrap();
    serde_json::from_str::<Vec<Value>>(&text).unwrap()
}

#[test]
fn test_record_shapes_per_engine() {
    let tmp = TempDir::new().unwrap();
    let config = QuellConfig::default();
    let mut registry = IgnoreRegistry::open(tmp.path(), &config).unwrap();

    registry
        .add_entry(descriptor(
            FindingPayload::Oss {
                manager: "npm".into(),
                name: "lodash".into(),
                version: "4.17.15".into(),
            },
            "package.json",
            Some(5),
        ))
        .unwrap();
    registry
        .add_entry(descriptor(
            FindingPayload::Secret {
                title: "AWS Access Key".into(),
                value: "AKIA123".into(),
            },
            "src/config.py",
            Some(3),
        ))
        .unwrap();
    registry
        .add_entry(descriptor(
            FindingPayload::Iac {
                title: "Open security group".into(),
                similarity_id: "abc123".into(),
            },
            "infra/main.tf",
            Some(12),
        ))
        .unwrap();
    registry
        .add_entry(descriptor(
            FindingPayload::Quality {
                rule_name: "no-eval".into(),
                rule_id: "Q-104".into(),
            },
            "src/app.ts",
            Some(7),
        ))
        .unwrap();
    registry
        .add_entry(descriptor(
            FindingPayload::Container {
                image_name: "nginx".into(),
                image_tag: "1.19".into(),
            },
            "deploy/Dockerfile",
            None,
        ))
        .unwrap();

    let records = read_filter(&registry);
    assert_eq!(records.len(), 5);

    let has_field = |field: &str| records.iter().any(|r| r.get(field).is_some());
    assert!(has_field("PackageManager"));
    assert!(has_field("PackageName"));
    assert!(has_field("PackageVersion"));
    assert!(has_field("SecretValue"));
    assert!(has_field("SimilarityID"));
    assert!(has_field("RuleID"));
    assert!(has_field("ImageName"));
    assert!(has_field("ImageTag"));

    let quality = records
        .iter()
        .find(|r| r.get("RuleID").is_some())
        .unwrap();
    assert_eq!(quality["FileName"], "src/app.ts");
    assert_eq!(quality["Line"], 7);
}

#[test]
fn test_records_deduplicate_per_kind() {
    let tmp = TempDir::new().unwrap();
    let config = QuellConfig::default();
    let mut registry = IgnoreRegistry::open(tmp.path(), &config).unwrap();

    // Same package suppressed in two manifests: one filter record
    let payload = FindingPayload::Oss {
        manager: "npm".into(),
        name: "lodash".into(),
        version: "4.17.15".into(),
    };
    registry
        .add_entry(descriptor(payload.clone(), "modules/a/package.json", Some(5)))
        .unwrap();
    registry
        .add_entry(descriptor(payload, "modules/b/package.json", Some(9)))
        .unwrap();

    let records = read_filter(&registry);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["PackageName"], "lodash");
}

#[test]
fn test_inactive_occurrences_are_excluded() {
    let tmp = TempDir::new().unwrap();
    let config = QuellConfig::default();
    let mut registry = IgnoreRegistry::open(tmp.path(), &config).unwrap();

    registry
        .add_entry(descriptor(
            FindingPayload::Secret {
                title: "AWS Access Key".into(),
                value: "AKIA123".into(),
            },
            "src/config.py",
            Some(3),
        ))
        .unwrap();
    assert_eq!(read_filter(&registry).len(), 1);

    registry
        .set_active(
            "AWS Access Key:AKIA123:src/config.py",
            &PathBuf::from("src/config.py"),
            false,
        )
        .unwrap();

    // The occurrence is history now, not filter input
    assert_eq!(read_filter(&registry).len(), 0);
}

#[test]
fn test_projection_regenerates_on_every_mutation() {
    let tmp = TempDir::new().unwrap();
    let config = QuellConfig::default();
    let mut registry = IgnoreRegistry::open(tmp.path(), &config).unwrap();

    let payload = FindingPayload::Container {
        image_name: "nginx".into(),
        image_tag: "1.19".into(),
    };
    registry
        .add_entry(descriptor(payload, "deploy/Dockerfile", None))
        .unwrap();
    assert_eq!(read_filter(&registry).len(), 1);

    registry.remove_entry("nginx:1.19").unwrap();
    assert_eq!(read_filter(&registry).len(), 0);
}
