// To-do store: in-memory task list mirrored to a key/value slot

use crate::filter::Filter;
use crate::kv::{KeyValueStore, validate_key};
use crate::normalize::{normalize_all, parse_task_list};
use crate::snapshot::{ImportPolicy, ImportReport, Snapshot};
use crate::task::{NewTask, Task, TaskEdit, clean_optional, new_id, now_iso};
use eyre::{Context, Result, eyre};
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// Storage key used when none is configured
pub const DEFAULT_STORAGE_KEY: &str = "todo-bloom-items";

/// Notification sent to observers after the store changes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    /// The task list was mutated and saved
    Changed,
    /// A task went from incomplete to complete
    TaskCompleted { id: String },
    /// The list was written to storage
    Saved,
}

/// Callback registered with [`TodoStore::subscribe`]
pub type Observer = Box<dyn FnMut(&StoreEvent)>;

/// Result of a toggle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toggled {
    pub task: Task,
    /// True when the task transitioned from incomplete to complete
    pub just_completed: bool,
}

/// Task totals for status display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Counts {
    pub total: usize,
    pub completed: usize,
    pub active: usize,
}

/// Task list persisted to a [`KeyValueStore`] under a single key
///
/// Every mutating operation writes the full list back before returning.
pub struct TodoStore<K: KeyValueStore> {
    kv: K,
    key: String,
    tasks: Vec<Task>,
    filter: Filter,
    observers: Vec<Observer>,
}

impl<K: KeyValueStore> TodoStore<K> {
    /// Open a store on `kv` under `key` and load whatever is persisted there
    pub fn open(kv: K, key: impl Into<String>) -> Result<Self> {
        let key = key.into();
        validate_key(&key)?;

        let mut store = Self {
            kv,
            key,
            tasks: Vec::new(),
            filter: Filter::All,
            observers: Vec::new(),
        };
        store.load();
        Ok(store)
    }

    /// Open a store under [`DEFAULT_STORAGE_KEY`]
    pub fn with_default_key(kv: K) -> Result<Self> {
        Self::open(kv, DEFAULT_STORAGE_KEY)
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn kv(&self) -> &K {
        &self.kv
    }

    /// Register an observer; observers run synchronously in registration order
    pub fn subscribe(&mut self, observer: impl FnMut(&StoreEvent) + 'static) {
        self.observers.push(Box::new(observer));
    }

    // ========================================================================
    // Persistence
    // ========================================================================

    /// Replace the in-memory list with the persisted one
    ///
    /// Never fails: a missing, unreadable or malformed value yields an empty list.
    pub fn load(&mut self) {
        let raw = match self.kv.get(&self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!(key = %self.key, "No stored tasks, starting empty");
                self.tasks = Vec::new();
                return;
            }
            Err(e) => {
                warn!(key = %self.key, error = ?e, "Failed to read stored tasks, starting empty");
                self.tasks = Vec::new();
                return;
            }
        };

        let records = match parse_task_list(&raw) {
            Ok(records) => records,
            Err(e) => {
                warn!(key = %self.key, error = %e, "Discarding malformed stored tasks");
                self.tasks = Vec::new();
                return;
            }
        };

        let normalized = normalize_all(&records, &now_iso());
        if normalized.dropped_invalid > 0 || normalized.dropped_duplicate > 0 {
            warn!(
                key = %self.key,
                invalid = normalized.dropped_invalid,
                duplicate = normalized.dropped_duplicate,
                "Dropped unusable stored records"
            );
        }

        let changed = normalized.changed();
        self.tasks = normalized.tasks;
        info!(key = %self.key, count = self.tasks.len(), "Loaded tasks");

        // Persist assigned ids and timestamps so they stay stable across loads
        if changed {
            if let Err(e) = self.save() {
                warn!(key = %self.key, error = ?e, "Failed to write back normalized tasks");
            }
        }
    }

    /// Write the full list to storage, overwriting the previous value
    pub fn save(&mut self) -> Result<()> {
        let json = serde_json::to_string(&self.tasks).context("Failed to serialize tasks")?;
        self.kv
            .set(&self.key, &json)
            .with_context(|| format!("Failed to save tasks under {}", self.key))?;

        debug!(key = %self.key, count = self.tasks.len(), "Saved tasks");
        self.emit(&StoreEvent::Saved);
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        self.save()?;
        self.emit(&StoreEvent::Changed);
        Ok(())
    }

    fn emit(&mut self, event: &StoreEvent) {
        for observer in self.observers.iter_mut() {
            observer(event);
        }
    }

    // ========================================================================
    // Mutations
    // ========================================================================

    /// Add a task at the head of the list
    ///
    /// Returns `Ok(None)` without touching the list when the text is blank.
    pub fn add(&mut self, new: NewTask) -> Result<Option<Task>> {
        let text = new.text.trim();
        if text.is_empty() {
            debug!("Ignoring add with blank text");
            return Ok(None);
        }

        let task = Task {
            id: new_id(),
            text: text.to_string(),
            notes: clean_optional(new.notes),
            tag: clean_optional(new.tag),
            due: clean_optional(new.due),
            completed: false,
            created_at: now_iso(),
            updated_at: None,
        };

        self.tasks.insert(0, task.clone());
        self.commit()?;

        info!(id = %task.id, "Added task");
        Ok(Some(task))
    }

    /// Flip a task's completion flag
    pub fn toggle(&mut self, id: &str) -> Result<Option<Toggled>> {
        let Some(index) = self.position(id) else {
            debug!(id, "Ignoring toggle for unknown id");
            return Ok(None);
        };

        let task = Task {
            completed: !self.tasks[index].completed,
            ..self.tasks[index].clone()
        };
        let just_completed = task.completed;
        self.tasks[index] = task.clone();

        self.commit()?;
        if just_completed {
            self.emit(&StoreEvent::TaskCompleted { id: task.id.clone() });
        }

        Ok(Some(Toggled { task, just_completed }))
    }

    /// Replace a task's text and editable fields
    ///
    /// Returns `Ok(None)` without touching the list when the new text is blank or
    /// the id is unknown.
    pub fn edit(&mut self, id: &str, edit: TaskEdit) -> Result<Option<Task>> {
        let text = edit.text.trim();
        if text.is_empty() {
            debug!(id, "Ignoring edit with blank text");
            return Ok(None);
        }

        let Some(index) = self.position(id) else {
            debug!(id, "Ignoring edit for unknown id");
            return Ok(None);
        };

        let current = &self.tasks[index];
        let task = Task {
            text: text.to_string(),
            notes: apply_field(edit.notes, &current.notes),
            tag: apply_field(edit.tag, &current.tag),
            due: apply_field(edit.due, &current.due),
            updated_at: Some(now_iso()),
            ..current.clone()
        };
        self.tasks[index] = task.clone();

        self.commit()?;
        Ok(Some(task))
    }

    /// Delete a task; returns whether anything was removed
    pub fn remove(&mut self, id: &str) -> Result<bool> {
        let Some(index) = self.position(id) else {
            return Ok(false);
        };

        self.tasks.remove(index);
        self.commit()?;
        Ok(true)
    }

    /// Delete every completed task; returns how many were removed
    pub fn clear_completed(&mut self) -> Result<usize> {
        let before = self.tasks.len();
        self.tasks.retain(|task| !task.completed);
        let removed = before - self.tasks.len();

        if removed > 0 {
            self.commit()?;
            info!(removed, "Cleared completed tasks");
        }
        Ok(removed)
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// All tasks in list order (newest first)
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn get(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id == id)
    }

    /// Resolve a full id or a unique id prefix
    pub fn resolve_id(&self, prefix: &str) -> Result<String> {
        let prefix = prefix.trim();
        if prefix.is_empty() {
            return Err(eyre!("Task id cannot be empty"));
        }
        if let Some(task) = self.get(prefix) {
            return Ok(task.id.clone());
        }

        let matches: Vec<&Task> = self.tasks.iter().filter(|task| task.id.starts_with(prefix)).collect();
        match matches.as_slice() {
            [] => Err(eyre!("No task matches id {}", prefix)),
            [task] => Ok(task.id.clone()),
            _ => Err(eyre!("Id prefix {} is ambiguous ({} tasks match)", prefix, matches.len())),
        }
    }

    /// Tasks matching `filter`, in list order
    pub fn filtered(&self, filter: Filter) -> Vec<&Task> {
        self.tasks.iter().filter(|task| filter.matches(task)).collect()
    }

    pub fn filter(&self) -> Filter {
        self.filter
    }

    pub fn set_filter(&mut self, filter: Filter) {
        self.filter = filter;
    }

    /// Tasks matching the current filter, newest `createdAt` first
    ///
    /// Timestamps that do not parse sort after all valid ones.
    pub fn visible(&self) -> Vec<&Task> {
        let mut tasks = self.filtered(self.filter);
        tasks.sort_by(|a, b| match (a.created_time(), b.created_time()) {
            (Some(x), Some(y)) => y.cmp(&x),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        });
        tasks
    }

    pub fn counts(&self) -> Counts {
        let completed = self.tasks.iter().filter(|task| task.completed).count();
        Counts {
            total: self.tasks.len(),
            completed,
            active: self.tasks.len() - completed,
        }
    }

    // ========================================================================
    // Export / import
    // ========================================================================

    /// Pretty-printed `{ exportedAt, items }` document of the current list
    pub fn export_snapshot(&self) -> Result<String> {
        let snapshot = Snapshot {
            exported_at: now_iso(),
            items: self.tasks.clone(),
        };
        serde_json::to_string_pretty(&snapshot).context("Failed to serialize snapshot")
    }

    /// Import tasks from an exported document
    ///
    /// Fails without touching the list if `raw` is not JSON or not one of the two
    /// export shapes. Records without usable text are dropped.
    pub fn import_snapshot(&mut self, raw: &str, policy: ImportPolicy) -> Result<ImportReport> {
        let records = parse_task_list(raw)?;
        self.import_records(&records, policy)
    }

    /// Import already-parsed records (see [`parse_task_list`])
    ///
    /// Errors here come from saving, not from the records.
    pub fn import_records(&mut self, records: &[Value], policy: ImportPolicy) -> Result<ImportReport> {
        let normalized = normalize_all(records, &now_iso());

        let mut report = ImportReport {
            dropped_invalid: normalized.dropped_invalid,
            skipped_duplicates: normalized.dropped_duplicate,
            ..Default::default()
        };

        match policy {
            ImportPolicy::Merge => {
                let mut existing: HashSet<String> = self.tasks.iter().map(|task| task.id.clone()).collect();
                for task in normalized.tasks {
                    if existing.insert(task.id.clone()) {
                        self.tasks.push(task);
                        report.added += 1;
                    } else {
                        report.skipped_duplicates += 1;
                    }
                }
            }
            ImportPolicy::Replace => {
                report.added = normalized.tasks.len();
                self.tasks = normalized.tasks;
            }
        }

        report.total = self.tasks.len();
        self.commit()?;

        info!(
            %policy,
            added = report.added,
            skipped = report.skipped_duplicates,
            dropped = report.dropped_invalid,
            "Imported tasks"
        );
        Ok(report)
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.tasks.iter().position(|task| task.id == id)
    }
}

fn apply_field(change: Option<Option<String>>, current: &Option<String>) -> Option<String> {
    match change {
        None => current.clone(),
        Some(value) => clean_optional(value),
    }
}
