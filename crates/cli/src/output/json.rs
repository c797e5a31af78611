//! JSON output formatting

use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct JsonOutput {
    pub findings: Vec<JsonAnnotation>,
    pub summary: JsonSummary,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct JsonAnnotation {
    pub engine: String,
    pub severity: String,
    /// Highest severity on this line across all engines
    pub combined_severity: String,
    pub message: String,
    pub file: String,
    pub line: usize,
    pub count: usize,
    pub ignored: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct JsonSummary {
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
