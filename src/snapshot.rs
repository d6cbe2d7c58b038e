// Export/import interchange format

use crate::task::Task;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Exported document: `{ "exportedAt": ..., "items": [...] }`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub exported_at: String,
    pub items: Vec<Task>,
}

/// How imported tasks combine with the current list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportPolicy {
    /// Keep existing tasks, append incoming tasks whose id is new
    #[default]
    Merge,
    /// Discard existing tasks and adopt the incoming list
    Replace,
}

impl std::fmt::Display for ImportPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ImportPolicy::Merge => write!(f, "merge"),
            ImportPolicy::Replace => write!(f, "replace"),
        }
    }
}

/// Outcome of a successful import
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ImportReport {
    /// Incoming tasks that entered the list
    pub added: usize,
    /// Incoming tasks skipped because their id was already present
    pub skipped_duplicates: usize,
    /// Records dropped for lacking usable text
    pub dropped_invalid: usize,
    /// List length after the import
    pub total: usize,
}

/// Suggested file name for an export taken at `at`
pub fn export_file_name(at: DateTime<Utc>) -> String {
    format!("todo-bloom-{}.json", at.format("%Y-%m-%d"))
}
