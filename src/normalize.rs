// Normalization of loose JSON records into tasks
//
// Everything read from storage or an import file passes through here before it
// reaches the in-memory list.

use crate::task::{Task, clean_optional, new_id};
use eyre::{Result, eyre};
use serde_json::Value;
use std::collections::HashSet;
use tracing::{debug, warn};

/// Field holding the task array in object-shaped documents
pub const ITEMS_FIELD: &str = "items";

/// Parse a raw document and return its task records
///
/// Accepts a bare JSON array or an object carrying an array under `items`.
pub fn parse_task_list(raw: &str) -> Result<Vec<Value>> {
    let value: Value = serde_json::from_str(raw).map_err(|e| eyre!("invalid import format: {}", e))?;

    match value {
        Value::Array(items) => Ok(items),
        Value::Object(mut map) => match map.remove(ITEMS_FIELD) {
            Some(Value::Array(items)) => Ok(items),
            Some(other) => Err(eyre!(
                "invalid import format: `{}` must be an array, found {}",
                ITEMS_FIELD,
                json_type(&other)
            )),
            None => Err(eyre!("invalid import format: missing `{}` array", ITEMS_FIELD)),
        },
        other => Err(eyre!(
            "invalid import format: expected an array or an object, found {}",
            json_type(&other)
        )),
    }
}

/// Map one loose record into a task, or `None` if it has no usable text
///
/// Missing IDs get a fresh one, missing `createdAt` gets `now`, and `completed`
/// is coerced by truthiness.
pub fn normalize_record(record: &Value, now: &str) -> Option<Task> {
    normalize_with_defaults(record, now).map(|(task, _)| task)
}

/// Like [`normalize_record`], also reporting whether `id` or `createdAt` was filled in
fn normalize_with_defaults(record: &Value, now: &str) -> Option<(Task, bool)> {
    let obj = record.as_object()?;

    let text = obj
        .get("text")
        .and_then(Value::as_str)
        .or_else(|| obj.get("title").and_then(Value::as_str))
        .map(str::trim)
        .filter(|t| !t.is_empty())?
        .to_string();

    let mut defaulted = false;

    let id = match obj.get("id") {
        Some(Value::String(s)) if !s.trim().is_empty() => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => {
            defaulted = true;
            new_id()
        }
    };

    let completed = obj.get("completed").map(truthy).unwrap_or(false);

    let created_at = obj
        .get("createdAt")
        .or_else(|| obj.get("created_at"))
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .map(|s| s.trim().to_string())
        .unwrap_or_else(|| {
            defaulted = true;
            now.to_string()
        });

    let updated_at = string_field(obj.get("updatedAt").or_else(|| obj.get("updated_at")));

    let task = Task {
        id,
        text,
        notes: string_field(obj.get("notes")),
        tag: string_field(obj.get("tag")),
        due: string_field(obj.get("due")),
        completed,
        created_at,
        updated_at,
    };
    Some((task, defaulted))
}

/// Result of normalizing a batch of records
#[derive(Debug, Default)]
pub struct Normalized {
    pub tasks: Vec<Task>,
    pub dropped_invalid: usize,
    pub dropped_duplicate: usize,
    /// Kept records that were given a fresh `id` or `createdAt`
    pub defaulted: usize,
}

impl Normalized {
    /// True when the kept tasks differ from the input in identity or record count
    pub fn changed(&self) -> bool {
        self.defaulted > 0 || self.dropped_invalid > 0 || self.dropped_duplicate > 0
    }
}

/// Normalize a batch, dropping invalid records and repeated IDs (first wins)
pub fn normalize_all(records: &[Value], now: &str) -> Normalized {
    let mut out = Normalized::default();
    let mut seen: HashSet<String> = HashSet::new();

    for (index, record) in records.iter().enumerate() {
        let Some((task, defaulted)) = normalize_with_defaults(record, now) else {
            debug!(index, "Dropping record without usable text");
            out.dropped_invalid += 1;
            continue;
        };

        if !seen.insert(task.id.clone()) {
            warn!(index, id = %task.id, "Dropping record with duplicate id");
            out.dropped_duplicate += 1;
            continue;
        }

        if defaulted {
            out.defaulted += 1;
        }
        out.tasks.push(task);
    }

    out
}

fn string_field(value: Option<&Value>) -> Option<String> {
    clean_optional(value.and_then(Value::as_str).map(str::to_string))
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0 && !f.is_nan()).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
