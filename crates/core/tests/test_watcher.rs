use quell_core::RegistryWatcher;
use std::time::Duration;
use tempfile::TempDir;

fn wait_for_touch(watcher: &RegistryWatcher) -> bool {
    for _ in 0..100 {
        if watcher.registry_touched() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(100));
    }
    false
}

#[test]
fn test_registry_write_is_observed() {
    let tmp = TempDir::new().unwrap();
    let registry_path = tmp.path().join(".quell-cache").join("ignores.json");

    let watcher = RegistryWatcher::new(&registry_path, Duration::from_millis(100)).unwrap();
    assert!(!watcher.registry_touched());

    std::fs::write(&registry_path, "{\"version\":\"1\",\"entries\":{}}").unwrap();
    assert!(wait_for_touch(&watcher));
}

#[test]
fn test_sibling_files_are_filtered_out() {
    let tmp = TempDir::new().unwrap();
    let registry_path = tmp.path().join(".quell-cache").join("ignores.json");

    let watcher = RegistryWatcher::new(&registry_path, Duration::from_millis(100)).unwrap();

    // The filter projection lives in the same directory; its writes must
    // not look like registry edits
    let sibling = registry_path.with_file_name("ignore-filter.json");
    std::fs::write(&sibling, "[]").unwrap();

    std::thread::sleep(Duration::from_millis(600));
    assert!(!watcher.registry_touched());
}
