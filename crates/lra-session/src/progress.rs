//! On-disk progress: the marker file that separates fresh runs from resumes,
//! and the passing/total counts read from it for reporting.

use lra_core::PROGRESS_MARKER_FILE;
use serde_json::Value;
use std::path::Path;
use tracing::debug;

/// True when the project already has session history.
pub fn has_progress_marker(project_dir: &Path) -> bool {
    project_dir.join(PROGRESS_MARKER_FILE).exists()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressSummary {
    pub passing: usize,
    pub total: usize,
}

impl ProgressSummary {
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.passing as f64 / self.total as f64 * 100.0
        }
    }
}

/// Count entries with `"passes": true` in the marker file.
///
/// Returns `None` when the file is missing or is not a JSON array.
pub fn read_progress(project_dir: &Path) -> Option<ProgressSummary> {
    let path = project_dir.join(PROGRESS_MARKER_FILE);
    let content = std::fs::read_to_string(&path).ok()?;
    let entries = match serde_json::from_str::<Value>(&content) {
        Ok(Value::Array(entries)) => entries,
        Ok(_) | Err(_) => {
            debug!(path = %path.display(), "Progress file is not a JSON array");
            return None;
        }
    };
    let passing = entries
        .iter()
        .filter(|entry| entry.get("passes").and_then(Value::as_bool) == Some(true))
        .count();
    Some(ProgressSummary {
        passing,
        total: entries.len(),
    })
}
