//! Configuration file parsing for .quell.toml

use crate::finding::EngineKind;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration structure for .quell.toml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuellConfig {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub registry: RegistryConfig,

    #[serde(default)]
    pub engines: EnginesConfig,

    #[serde(default)]
    pub ignore: IgnoreConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Directory (relative to the workspace root) for the registry, filter
    /// projection, and scan scratch copies
    #[serde(default = "default_cache_dir")]
    pub cache_dir: String,

    /// Severity threshold for non-zero exit code
    #[serde(default = "default_fail_on")]
    pub fail_on: String,

    /// Watch-mode debounce duration in milliseconds
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Registry file name under the cache dir. Product variants that need
    /// separate registries point this at different files.
    #[serde(default = "default_registry_file")]
    pub file_name: String,

    /// Derived filter projection file name under the cache dir
    #[serde(default = "default_filter_file")]
    pub filter_file_name: String,
}

/// One external scan engine invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Whether this engine runs at all
    #[serde(default)]
    pub enabled: bool,

    /// Program to invoke
    #[serde(default)]
    pub command: String,

    /// Arguments; `{target}` is replaced with the file to scan
    #[serde(default = "default_args")]
    pub args: Vec<String>,

    /// Arguments appended only when a filter projection is passed;
    /// `{filter}` is replaced with the projection file path
    #[serde(default)]
    pub filter_args: Vec<String>,

    /// Glob patterns selecting the files this engine scans
    /// (e.g. `["**/package.json"]` for a dependency engine)
    #[serde(default)]
    pub targets: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnginesConfig {
    #[serde(default)]
    pub oss: EngineConfig,

    #[serde(default)]
    pub secrets: EngineConfig,

    #[serde(default)]
    pub iac: EngineConfig,

    #[serde(default)]
    pub quality: EngineConfig,

    #[serde(default)]
    pub container: EngineConfig,
}

impl EnginesConfig {
    /// Config section for the given engine kind.
    pub fn get(&self, kind: EngineKind) -> &EngineConfig {
        match kind {
            EngineKind::Oss => &self.oss,
            EngineKind::Secrets => &self.secrets,
            EngineKind::Iac => &self.iac,
            EngineKind::Quality => &self.quality,
            EngineKind::Container => &self.container,
        }
    }

    /// Engine kinds with `enabled = true`, in presentation order.
    pub fn enabled_kinds(&self) -> Vec<EngineKind> {
        EngineKind::ALL
            .into_iter()
            .filter(|k| self.get(*k).enabled)
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IgnoreConfig {
    /// Paths excluded from target discovery
    #[serde(default = "default_ignore_paths")]
    pub paths: Vec<String>,
}

// Default functions
fn default_cache_dir() -> String {
    ".quell-cache".to_string()
}

fn default_fail_on() -> String {
    "high".to_string()
}

fn default_debounce_ms() -> u64 {
    300
}

fn default_registry_file() -> String {
    "ignores.json".to_string()
}

fn default_filter_file() -> String {
    "ignore-filter.json".to_string()
}

fn default_args() -> Vec<String> {
    vec!["{target}".to_string()]
}

fn default_ignore_paths() -> Vec<String> {
    vec![
        "vendor/".to_string(),
        "node_modules/".to_string(),
        "dist/".to_string(),
        ".git/".to_string(),
        "build/".to_string(),
        "target/".to_string(),
        ".quell-cache/".to_string(),
    ]
}

impl Default for QuellConfig {
    fn default() -> Self {
        toml::from_str("").expect("empty TOML should parse to defaults")
    }
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            cache_dir: default_cache_dir(),
            fail_on: default_fail_on(),
            debounce_ms: default_debounce_ms(),
        }
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            file_name: default_registry_file(),
            filter_file_name: default_filter_file(),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            command: String::new(),
            args: default_args(),
            filter_args: Vec::new(),
            targets: Vec::new(),
        }
    }
}

impl Default for IgnoreConfig {
    fn default() -> Self {
        Self {
            paths: default_ignore_paths(),
        }
    }
}

impl QuellConfig {
    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: QuellConfig = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Find and load .quell.toml from the given directory or ancestors
    pub fn find_and_load(start_dir: &Path) -> Result<Self> {
        let mut current = start_dir;

        loop {
            let config_path = current.join(".quell.toml");
            if config_path.exists() {
                return Self::from_file(&config_path);
            }

            match current.parent() {
                Some(parent) => current = parent,
                None => break,
            }
        }

        // No config found, use defaults
        Ok(Self::default())
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }
}
