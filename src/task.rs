// Data model for TodoStore

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// A single to-do entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    #[serde(alias = "title")]
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due: Option<String>,
    #[serde(default)]
    pub completed: bool,
    pub created_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl Task {
    /// Parsed creation time, if `created_at` is valid RFC 3339
    pub fn created_time(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.created_at)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }
}

/// User-supplied fields for a new task
#[derive(Debug, Clone, Default)]
pub struct NewTask {
    pub text: String,
    pub notes: Option<String>,
    pub tag: Option<String>,
    pub due: Option<String>,
}

impl NewTask {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    pub fn due(mut self, due: impl Into<String>) -> Self {
        self.due = Some(due.into());
        self
    }
}

/// Replacement fields for an existing task
///
/// Secondary fields use `None` to keep the current value, `Some(None)` to clear it
/// and `Some(Some(v))` to set it.
#[derive(Debug, Clone, Default)]
pub struct TaskEdit {
    pub text: String,
    pub notes: Option<Option<String>>,
    pub tag: Option<Option<String>>,
    pub due: Option<Option<String>>,
}

impl TaskEdit {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }
}

/// Generate a fresh task ID (time-ordered UUID)
pub fn new_id() -> String {
    uuid::Uuid::now_v7().to_string()
}

/// Current time as an ISO 8601 UTC string with millisecond precision
pub fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Trim an optional free-form field, collapsing blank values to `None`
pub(crate) fn clean_optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_now_iso_format() {
        let ts = now_iso();
        assert!(ts.ends_with('Z'));
        assert!(DateTime::parse_from_rfc3339(&ts).is_ok());
        // Millisecond precision: 2026-01-01T00:00:00.000Z
        assert_eq!(ts.len(), 24);
    }

    #[test]
    fn test_new_id_unique() {
        let ids: HashSet<String> = (0..100).map(|_| new_id()).collect();
        assert_eq!(ids.len(), 100);
    }

    #[test]
    fn test_task_serialization_camel_case() {
        let task = Task {
            id: "t-1".to_string(),
            text: "Buy milk".to_string(),
            notes: None,
            tag: Some("errands".to_string()),
            due: None,
            completed: false,
            created_at: "2026-01-01T00:00:00.000Z".to_string(),
            updated_at: None,
        };

        let json = serde_json::to_string(&task).unwrap();
        assert!(json.contains("\"createdAt\":\"2026-01-01T00:00:00.000Z\""));
        assert!(json.contains("\"tag\":\"errands\""));
        assert!(!json.contains("notes"));
        assert!(!json.contains("updatedAt"));

        let back: Task = serde_json::from_str(&json).unwrap();
        assert_eq!(back, task);
    }

    #[test]
    fn test_task_accepts_title_alias() {
        let task: Task =
            serde_json::from_str(r#"{"id":"a","title":"Walk dog","createdAt":"2026-01-01T00:00:00Z"}"#).unwrap();
        assert_eq!(task.text, "Walk dog");
        assert!(!task.completed);
    }

    #[test]
    fn test_created_time() {
        let mut task = Task {
            id: "a".to_string(),
            text: "x".to_string(),
            notes: None,
            tag: None,
            due: None,
            completed: false,
            created_at: "2026-03-04T05:06:07.000Z".to_string(),
            updated_at: None,
        };
        assert!(task.created_time().is_some());

        task.created_at = "yesterday".to_string();
        assert!(task.created_time().is_none());
    }

    #[test]
    fn test_clean_optional() {
        assert_eq!(clean_optional(Some("  work ".to_string())), Some("work".to_string()));
        assert_eq!(clean_optional(Some("   ".to_string())), None);
        assert_eq!(clean_optional(None), None);
    }
}
