//! Ordered in-memory task collection.
//!
//! Pure collection operations with no persistence or rendering; the
//! controller layers storage and view updates on top.

use crate::model::task::{Task, TaskFilter, TaskId, TaskStats};
use crate::validator::{prepare_task_text, TaskTextError};
use chrono::{DateTime, Utc};

/// Result of applying an inline edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditOutcome {
    /// Text was replaced and `updated_at` re-stamped.
    Updated,
    /// Input was empty or identical to the current text.
    Unchanged,
    /// Input failed validation; the original text is kept.
    Rejected(TaskTextError),
    /// No task (or no active edit) matched.
    NotFound,
}

/// Insertion-ordered task collection with unique ids.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskList {
    tasks: Vec<Task>,
}

impl TaskList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps tasks that were already de-duplicated by the store.
    pub fn from_tasks(tasks: Vec<Task>) -> Self {
        Self { tasks }
    }

    pub fn as_slice(&self) -> &[Task] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn get(&self, id: &TaskId) -> Option<&Task> {
        self.tasks.iter().find(|task| &task.id == id)
    }

    pub fn contains(&self, id: &TaskId) -> bool {
        self.get(id).is_some()
    }

    /// Creates a task from raw input and appends it.
    pub fn add(&mut self, raw_text: &str, now: DateTime<Utc>) -> Result<&Task, TaskTextError> {
        let task = Task::create(raw_text, now)?;
        self.tasks.push(task);
        Ok(&self.tasks[self.tasks.len() - 1])
    }

    /// Flips completion of `id`. Returns `false` when the id is unknown.
    pub fn toggle(&mut self, id: &TaskId, now: DateTime<Utc>) -> bool {
        match self.get_mut(id) {
            Some(task) => {
                task.toggle(now);
                true
            }
            None => false,
        }
    }

    /// Removes `id`; unknown ids leave the collection unchanged.
    pub fn remove(&mut self, id: &TaskId) -> Option<Task> {
        let index = self.tasks.iter().position(|task| &task.id == id)?;
        Some(self.tasks.remove(index))
    }

    /// Replaces the text of `id` with sanitized, validated `raw_text`.
    pub fn edit(&mut self, id: &TaskId, raw_text: &str, now: DateTime<Utc>) -> EditOutcome {
        let Some(task) = self.get_mut(id) else {
            return EditOutcome::NotFound;
        };

        if raw_text.trim().is_empty() {
            return EditOutcome::Unchanged;
        }

        match prepare_task_text(raw_text) {
            Ok(text) if text == task.text => EditOutcome::Unchanged,
            Ok(text) => {
                task.set_text(text, now);
                EditOutcome::Updated
            }
            Err(err) => EditOutcome::Rejected(err),
        }
    }

    /// Drops every completed task, returning how many were removed.
    pub fn clear_completed(&mut self) -> usize {
        let before = self.tasks.len();
        self.tasks.retain(|task| !task.completed);
        before - self.tasks.len()
    }

    pub fn completed_count(&self) -> usize {
        self.tasks.iter().filter(|task| task.completed).count()
    }

    pub fn filtered(&self, filter: TaskFilter) -> Vec<&Task> {
        filter.apply(&self.tasks)
    }

    pub fn stats(&self) -> TaskStats {
        TaskStats::from_tasks(&self.tasks)
    }

    fn get_mut(&mut self, id: &TaskId) -> Option<&mut Task> {
        self.tasks.iter_mut().find(|task| &task.id == id)
    }
}
