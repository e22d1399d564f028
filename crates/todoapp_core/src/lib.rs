//! Core domain logic for the todoapp task list.
//! This crate is the single source of truth for task invariants.

pub mod clock;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod validator;

pub use clock::{Clock, ManualClock, SystemClock};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::task::{Task, TaskFilter, TaskId, TaskStats};
pub use repo::kv_store::{KeyValueStore, KvError, MemoryKeyValueStore, SqliteKeyValueStore};
pub use repo::task_store::{format_bytes, StorageInfo, StoreConfig, StoreError, TaskStore};
pub use service::controller::{ControllerError, Notice, NoticeKind, TaskView, TodoController};
pub use service::task_list::{EditOutcome, TaskList};
pub use validator::{
    escape_for_display, is_valid_task_text, prepare_task_text, sanitize, sanitize_value,
    validate_task_text, TaskTextError, MAX_TASK_TEXT_CHARS,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
