//! Task list controller.
//!
//! # Responsibility
//! - Turn user intents into `TaskList` mutations and `TaskStore` saves.
//! - Hold transient UI state: active filter and inline edit session.
//! - Re-render every derived view value through `TaskView` after a change.
//!
//! # Invariants
//! - A failed save rolls the collection back to the last saved state and
//!   surfaces an error notice; no failure is fatal.
//! - Destructive actions require `TaskView::confirm` to return `true`.
//! - Finishing an edit (commit or cancel) always leaves edit mode.

use crate::clock::{Clock, SystemClock};
use crate::model::task::{Task, TaskFilter, TaskId, TaskStats};
use crate::repo::kv_store::KeyValueStore;
use crate::repo::task_store::{StorageInfo, StoreError, TaskStore};
use crate::service::task_list::{EditOutcome, TaskList};
use crate::validator::TaskTextError;
use log::{error, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

const SAVE_FAILED_MESSAGE: &str = "Failed to save tasks. Storage may be full.";
const DELETED_MESSAGE: &str = "Task deleted successfully";
const CONFIRM_PREVIEW_CHARS: usize = 50;

/// Severity of a transient user notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Success,
    Error,
}

/// Transient user-visible message (toast).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Error,
            message: format!("Error: {}", message.into()),
        }
    }
}

/// Rendering and confirmation surface driven by the controller.
pub trait TaskView {
    /// Draws the tasks visible under `filter`, in collection order.
    fn render_list(&mut self, tasks: &[&Task], filter: TaskFilter, editing: Option<&TaskId>);
    fn render_stats(&mut self, stats: &TaskStats);
    fn render_progress(&mut self, percent: u8);
    fn render_empty_state(&mut self, visible: bool);
    fn render_clear_button(&mut self, enabled: bool);
    /// Asks the user to approve a destructive action.
    fn confirm(&mut self, message: &str) -> bool;
    fn notify(&mut self, notice: Notice);
}

/// Controller operation failure.
#[derive(Debug)]
pub enum ControllerError {
    Validation(TaskTextError),
    Store(StoreError),
}

impl Display for ControllerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "invalid task: {err}"),
            Self::Store(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ControllerError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Store(err) => Some(err),
        }
    }
}

impl From<TaskTextError> for ControllerError {
    fn from(value: TaskTextError) -> Self {
        Self::Validation(value)
    }
}

impl From<StoreError> for ControllerError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

/// Owns the store, the working collection and transient view state.
pub struct TodoController<S: KeyValueStore, V: TaskView, C: Clock = SystemClock> {
    store: TaskStore<S>,
    tasks: TaskList,
    filter: TaskFilter,
    editing: Option<TaskId>,
    view: V,
    clock: C,
}

impl<S: KeyValueStore, V: TaskView> TodoController<S, V, SystemClock> {
    /// Opens a controller stamped by the system clock.
    pub fn new(store: TaskStore<S>, view: V) -> Self {
        Self::open(store, view, SystemClock)
    }
}

impl<S: KeyValueStore, V: TaskView, C: Clock> TodoController<S, V, C> {
    /// Loads persisted tasks and renders the initial view.
    ///
    /// A load failure is logged and yields an empty list.
    pub fn open(mut store: TaskStore<S>, view: V, clock: C) -> Self {
        let tasks = match store.load() {
            Ok(tasks) => tasks,
            Err(err) => {
                error!(
                    "event=controller_open module=controller status=error error_code={} error={}",
                    err.code(),
                    err
                );
                Vec::new()
            }
        };

        let mut controller = Self {
            store,
            tasks: TaskList::from_tasks(tasks),
            filter: TaskFilter::All,
            editing: None,
            view,
            clock,
        };
        controller.render();
        controller
    }

    /// Creates a task from raw input and appends it.
    ///
    /// # Errors
    /// - `Validation` when the text is rejected; nothing changes.
    /// - `Store` when the save fails; the new task is discarded.
    pub fn add(&mut self, text: &str) -> Result<&[Task], ControllerError> {
        let before = self.tasks.clone();
        let now = self.clock.now();
        let id = match self.tasks.add(text, now) {
            Ok(task) => task.id.clone(),
            Err(err) => {
                warn!(
                    "event=task_add module=controller status=rejected reason={}",
                    reason_code(&err)
                );
                self.view.notify(Notice::error(format!("Invalid task: {err}")));
                return Err(err.into());
            }
        };

        self.persist(before)?;
        info!("event=task_add module=controller status=ok id={id}");
        self.render();
        Ok(self.tasks.as_slice())
    }

    /// Flips completion of `id`; unknown ids are a no-op.
    pub fn toggle(&mut self, id: &TaskId) -> Result<&[Task], ControllerError> {
        let before = self.tasks.clone();
        if !self.tasks.toggle(id, self.clock.now()) {
            return Ok(self.tasks.as_slice());
        }

        self.persist(before)?;
        self.render();
        Ok(self.tasks.as_slice())
    }

    /// Deletes `id` after user confirmation; unknown ids are a no-op.
    pub fn delete(&mut self, id: &TaskId) -> Result<&[Task], ControllerError> {
        let Some(task) = self.tasks.get(id) else {
            return Ok(self.tasks.as_slice());
        };

        let message = delete_confirmation(&task.text);
        if !self.view.confirm(&message) {
            return Ok(self.tasks.as_slice());
        }

        let before = self.tasks.clone();
        self.tasks.remove(id);
        if self.editing.as_ref() == Some(id) {
            self.editing = None;
        }

        self.persist(before)?;
        info!("event=task_delete module=controller status=ok id={id}");
        self.render();
        self.view.notify(Notice::success(DELETED_MESSAGE));
        Ok(self.tasks.as_slice())
    }

    /// Enters inline edit mode for `id` and returns the text to prefill.
    ///
    /// Starting a new edit abandons any edit already in progress.
    pub fn start_edit(&mut self, id: &TaskId) -> Option<String> {
        let text = self.tasks.get(id)?.text.clone();
        self.editing = Some(id.clone());
        self.render();
        Some(text)
    }

    /// Finishes the active edit by writing `text` back.
    ///
    /// Empty or unchanged text is discarded silently; invalid text keeps the
    /// original and raises an error notice. Edit mode always ends.
    pub fn commit_edit(&mut self, text: &str) -> Result<EditOutcome, ControllerError> {
        let Some(id) = self.editing.take() else {
            return Ok(EditOutcome::NotFound);
        };

        let before = self.tasks.clone();
        let outcome = self.tasks.edit(&id, text, self.clock.now());
        match &outcome {
            EditOutcome::Updated => {
                self.persist(before)?;
                info!("event=task_edit module=controller status=ok id={id}");
            }
            EditOutcome::Rejected(err) => {
                warn!(
                    "event=task_edit module=controller status=rejected id={id} reason={}",
                    reason_code(err)
                );
                self.view.notify(Notice::error(err.to_string()));
            }
            EditOutcome::Unchanged | EditOutcome::NotFound => {}
        }

        self.render();
        Ok(outcome)
    }

    /// Leaves edit mode without touching the task.
    pub fn cancel_edit(&mut self) {
        if self.editing.take().is_some() {
            self.render();
        }
    }

    pub fn set_filter(&mut self, filter: TaskFilter) {
        self.filter = filter;
        self.render();
    }

    /// Removes all completed tasks after confirmation.
    ///
    /// Returns how many tasks were removed (`0` when none were completed or
    /// the user declined).
    pub fn clear_completed(&mut self) -> Result<usize, ControllerError> {
        let completed = self.tasks.completed_count();
        if completed == 0 {
            return Ok(0);
        }

        if !self
            .view
            .confirm(&format!("Delete {completed} completed task(s)?"))
        {
            return Ok(0);
        }

        let before = self.tasks.clone();
        let removed = self.tasks.clear_completed();
        if let Some(id) = &self.editing {
            if !self.tasks.contains(id) {
                self.editing = None;
            }
        }

        self.persist(before)?;
        info!("event=tasks_clear_completed module=controller status=ok removed={removed}");
        self.render();
        Ok(removed)
    }

    pub fn tasks(&self) -> &[Task] {
        self.tasks.as_slice()
    }

    /// Tasks visible under the active filter, in collection order.
    pub fn visible_tasks(&self) -> Vec<&Task> {
        self.tasks.filtered(self.filter)
    }

    pub fn filter(&self) -> TaskFilter {
        self.filter
    }

    pub fn editing(&self) -> Option<&TaskId> {
        self.editing.as_ref()
    }

    pub fn stats(&self) -> TaskStats {
        self.tasks.stats()
    }

    pub fn storage_info(&self) -> StorageInfo {
        self.store.storage_info()
    }

    pub fn store(&self) -> &TaskStore<S> {
        &self.store
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    pub fn view_mut(&mut self) -> &mut V {
        &mut self.view
    }

    /// Redraws every derived view value.
    pub fn render(&mut self) {
        let visible = self.tasks.filtered(self.filter);
        let stats = self.tasks.stats();

        self.view
            .render_list(&visible, self.filter, self.editing.as_ref());
        self.view.render_stats(&stats);
        self.view.render_progress(stats.percent_complete);
        self.view.render_empty_state(visible.is_empty());
        self.view.render_clear_button(stats.can_clear_completed());
    }

    fn persist(&mut self, before: TaskList) -> Result<(), ControllerError> {
        match self.store.save(self.tasks.as_slice()) {
            Ok(()) => Ok(()),
            Err(err) => {
                error!(
                    "event=tasks_save module=controller status=error error_code={} error={}",
                    err.code(),
                    err
                );
                self.tasks = before;
                self.view.notify(Notice::error(SAVE_FAILED_MESSAGE));
                self.render();
                Err(err.into())
            }
        }
    }
}

fn delete_confirmation(text: &str) -> String {
    let preview = text.chars().take(CONFIRM_PREVIEW_CHARS).collect::<String>();
    let ellipsis = if text.chars().count() > CONFIRM_PREVIEW_CHARS {
        "..."
    } else {
        ""
    };
    format!("Are you sure you want to delete this task?\n\n\"{preview}{ellipsis}\"")
}

fn reason_code(err: &TaskTextError) -> &'static str {
    match err {
        TaskTextError::Empty => "empty",
        TaskTextError::TooLong { .. } => "too_long",
        TaskTextError::DangerousPattern(_) => "dangerous_pattern",
    }
}
