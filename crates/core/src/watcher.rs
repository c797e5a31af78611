//! Debounced watcher on the persisted registry file
//!
//! Events are delivered over an mpsc channel and drained by the host loop —
//! cooperative scheduling, no locking. The watcher only reports that the
//! registry file was touched; whether the change was self-caused is decided
//! by the registry's origin digest, so self-writes never trigger re-scans
//! and the watcher never needs tearing down around mutations.

use anyhow::{anyhow, Result};
use notify::RecursiveMode;
use notify_debouncer_mini::{new_debouncer, DebounceEventResult, DebouncedEventKind, Debouncer};
use std::ffi::OsString;
use std::fs;
use std::path::Path;
use std::sync::mpsc::{Receiver, TryRecvError};
use std::time::Duration;

pub struct RegistryWatcher {
    // Held for its Drop; dropping the debouncer stops the watch thread
    _debouncer: Debouncer<notify::RecommendedWatcher>,
    rx: Receiver<DebounceEventResult>,
    file_name: OsString,
}

impl RegistryWatcher {
    /// Watch the directory containing `registry_path` (the file itself may
    /// not exist yet), with the given debounce window.
    pub fn new(registry_path: &Path, debounce: Duration) -> Result<Self> {
        let dir = registry_path
            .parent()
            .ok_or_else(|| anyhow!("registry path {} has no parent", registry_path.display()))?;
        fs::create_dir_all(dir)?;

        let file_name = registry_path
            .file_name()
            .ok_or_else(|| anyhow!("registry path {} has no file name", registry_path.display()))?
            .to_os_string();

        let (tx, rx) = std::sync::mpsc::channel();
        let mut debouncer = new_debouncer(debounce, tx)?;
        debouncer.watcher().watch(dir, RecursiveMode::NonRecursive)?;

        Ok(Self {
            _debouncer: debouncer,
            rx,
            file_name,
        })
    }

    /// Drain pending events; true if any of them touched the registry file.
    pub fn registry_touched(&self) -> bool {
        let mut touched = false;
        loop {
            match self.rx.try_recv() {
                Ok(Ok(events)) => {
                    for event in events {
                        if event.kind != DebouncedEventKind::Any {
                            continue;
                        }
                        if event.path.file_name() == Some(self.file_name.as_os_str()) {
                            touched = true;
                        }
                    }
                }
                Ok(Err(_)) => {
                    // Watch errors are transient; the next poll retries
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        touched
    }
}
