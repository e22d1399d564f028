//! Task record, filter and derived statistics.
//!
//! # Responsibility
//! - Define the canonical task shape shared by storage and rendering.
//! - Provide in-place mutation helpers that keep timestamps consistent.
//!
//! # Invariants
//! - `id` is generated once and never changes.
//! - Every mutation moves `updated_at` strictly forward.
//! - Timestamps are held and serialized at millisecond precision, so a
//!   stored task decodes equal to the one that was written.

use crate::validator::{prepare_task_text, TaskTextError};
use chrono::{DateTime, SubsecRound, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Opaque task identifier.
///
/// New ids are UUID v4 strings; any string loaded from storage is accepted
/// as-is so older snapshots keep their identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    /// Generates a fresh unique id.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Display for TaskId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for TaskId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for TaskId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Persisted task record.
///
/// Field names follow the stored JSON layout
/// (`id`, `text`, `completed`, `createdAt`, `updatedAt`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Stable lookup/equality key.
    pub id: TaskId,
    /// Sanitized display text, 1..=500 characters.
    pub text: String,
    #[serde(default)]
    pub completed: bool,
    #[serde(with = "iso_millis")]
    pub created_at: DateTime<Utc>,
    /// Re-stamped on every text/state mutation.
    #[serde(with = "iso_millis")]
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Creates a task from raw user input.
    ///
    /// # Errors
    /// - Returns `TaskTextError` when the input is empty after sanitizing,
    ///   too long, or matches a dangerous pattern.
    pub fn create(raw_text: &str, now: DateTime<Utc>) -> Result<Self, TaskTextError> {
        let text = prepare_task_text(raw_text)?;
        Ok(Self::with_id(TaskId::generate(), text, now))
    }

    /// Builds a task with a caller-provided id and already-validated text.
    ///
    /// Used by import paths and tests where identity exists externally.
    pub fn with_id(id: TaskId, text: impl Into<String>, now: DateTime<Utc>) -> Self {
        let now = now.trunc_subsecs(3);
        Self {
            id,
            text: text.into(),
            completed: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Flips the completion flag and re-stamps `updated_at`.
    pub fn toggle(&mut self, now: DateTime<Utc>) {
        self.completed = !self.completed;
        self.touch(now);
    }

    /// Replaces the text and re-stamps `updated_at`.
    ///
    /// The caller is responsible for passing sanitized, validated text.
    pub fn set_text(&mut self, text: impl Into<String>, now: DateTime<Utc>) {
        self.text = text.into();
        self.touch(now);
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = next_stamp(self.updated_at, now);
    }
}

/// Returns `now`, or `previous + 1ms` when the clock has not moved past it.
fn next_stamp(previous: DateTime<Utc>, now: DateTime<Utc>) -> DateTime<Utc> {
    let previous = previous.trunc_subsecs(3);
    let now = now.trunc_subsecs(3);
    if now > previous {
        now
    } else {
        previous + TimeDelta::milliseconds(1)
    }
}

/// Read-side view selector. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TaskFilter {
    #[default]
    All,
    Active,
    Completed,
}

impl TaskFilter {
    /// Parses a filter name; unknown names fall back to `All`.
    pub fn parse_lossy(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "active" => Self::Active,
            "completed" => Self::Completed,
            _ => Self::All,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Active => "active",
            Self::Completed => "completed",
        }
    }

    /// Returns whether `task` is visible under this filter.
    pub fn matches(self, task: &Task) -> bool {
        match self {
            Self::All => true,
            Self::Active => !task.completed,
            Self::Completed => task.completed,
        }
    }

    /// Projects `tasks` through this filter, preserving order.
    pub fn apply(self, tasks: &[Task]) -> Vec<&Task> {
        tasks.iter().filter(|task| self.matches(task)).collect()
    }
}

impl Display for TaskFilter {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Counts derived from the full (unfiltered) collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TaskStats {
    pub total: usize,
    pub completed: usize,
    pub active: usize,
    /// Rounded completion percentage in `0..=100`.
    pub percent_complete: u8,
}

impl TaskStats {
    pub fn from_tasks(tasks: &[Task]) -> Self {
        let total = tasks.len();
        let completed = tasks.iter().filter(|task| task.completed).count();
        let percent_complete = if total == 0 {
            0
        } else {
            // Integer round-half-up of completed / total * 100.
            ((completed * 200 + total) / (total * 2)) as u8
        };

        Self {
            total,
            completed,
            active: total - completed,
            percent_complete,
        }
    }

    /// Whether the clear-completed action has anything to remove.
    pub fn can_clear_completed(&self) -> bool {
        self.completed > 0
    }
}

/// Serde adapter for `2024-05-01T10:00:00.000Z` style timestamps.
mod iso_millis {
    use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|value| value.with_timezone(&Utc).trunc_subsecs(3))
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::{next_stamp, Task, TaskFilter, TaskId, TaskStats};
    use chrono::{DateTime, TimeDelta, TimeZone, Utc};

    fn at(ms: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(1_700_000_000_000 + ms).unwrap()
    }

    fn task(text: &str, completed: bool) -> Task {
        let mut task = Task::with_id(TaskId::generate(), text, at(0));
        task.completed = completed;
        task
    }

    #[test]
    fn create_sets_defaults() {
        let task = Task::create("  buy milk  ", at(5)).unwrap();
        assert_eq!(task.text, "buy milk");
        assert!(!task.completed);
        assert_eq!(task.created_at, task.updated_at);
    }

    #[test]
    fn create_rejects_script_input() {
        assert!(Task::create("<script>alert(1)</script>", at(0)).is_err());
    }

    #[test]
    fn generated_ids_are_unique() {
        assert_ne!(TaskId::generate(), TaskId::generate());
    }

    #[test]
    fn next_stamp_never_goes_backwards() {
        assert_eq!(next_stamp(at(10), at(20)), at(20));
        assert_eq!(next_stamp(at(10), at(10)), at(10) + TimeDelta::milliseconds(1));
        assert_eq!(next_stamp(at(10), at(3)), at(11));
    }

    #[test]
    fn stamps_drop_sub_millisecond_precision() {
        let now = Utc.timestamp_nanos(1_714_557_600_123_456_789);
        let mut task = Task::with_id(TaskId::from("a"), "x", now);
        assert_eq!(task.created_at.timestamp_subsec_nanos(), 123_000_000);

        task.toggle(now + TimeDelta::microseconds(400));
        assert_eq!(task.updated_at.timestamp_subsec_nanos(), 124_000_000);

        let raw = r#"{"id":"b","text":"y","createdAt":"2024-05-01T10:00:00.123456Z","updatedAt":"2024-05-01T10:00:00.123456Z"}"#;
        let decoded: Task = serde_json::from_str(raw).unwrap();
        assert_eq!(decoded.created_at.timestamp_subsec_nanos(), 123_000_000);
    }

    #[test]
    fn toggle_twice_restores_flag_and_advances_stamp() {
        let mut task = task("a", false);
        let created = task.updated_at;
        task.toggle(at(0));
        let first = task.updated_at;
        task.toggle(at(0));
        assert!(!task.completed);
        assert!(first > created);
        assert!(task.updated_at > first);
    }

    #[test]
    fn json_layout_uses_camel_case_and_millis() {
        let task = Task::with_id(TaskId::from("abc"), "hello", at(123));
        let value = serde_json::to_value(&task).unwrap();
        assert_eq!(value["id"], "abc");
        assert_eq!(value["completed"], false);
        assert_eq!(value["createdAt"], "2023-11-14T22:13:20.123Z");
        assert_eq!(value["updatedAt"], "2023-11-14T22:13:20.123Z");
    }

    #[test]
    fn decode_accepts_legacy_ids_and_missing_completed() {
        let raw = r#"{"id":"lq2x9k0abc","text":"legacy","createdAt":"2024-01-01T00:00:00.000Z","updatedAt":"2024-01-02T00:00:00.000Z"}"#;
        let task: Task = serde_json::from_str(raw).unwrap();
        assert_eq!(task.id.as_str(), "lq2x9k0abc");
        assert!(!task.completed);
        assert!(task.updated_at > task.created_at);
    }

    #[test]
    fn filters_preserve_order() {
        let tasks = vec![task("one", false), task("two", true), task("three", false)];

        let active = TaskFilter::Active.apply(&tasks);
        assert_eq!(
            active.iter().map(|t| t.text.as_str()).collect::<Vec<_>>(),
            vec!["one", "three"]
        );
        let completed = TaskFilter::Completed.apply(&tasks);
        assert_eq!(completed.len(), 1);
        assert_eq!(completed[0].text, "two");
        assert_eq!(TaskFilter::All.apply(&tasks).len(), 3);
    }

    #[test]
    fn filter_parse_falls_back_to_all() {
        assert_eq!(TaskFilter::parse_lossy("Active"), TaskFilter::Active);
        assert_eq!(TaskFilter::parse_lossy(" completed "), TaskFilter::Completed);
        assert_eq!(TaskFilter::parse_lossy("archived"), TaskFilter::All);
    }

    #[test]
    fn stats_round_percentage() {
        let tasks = vec![task("a", true), task("b", false), task("c", false)];
        let stats = TaskStats::from_tasks(&tasks);
        assert_eq!(stats.total, 3);
        assert_eq!(stats.completed, 1);
        assert_eq!(stats.active, 2);
        assert_eq!(stats.percent_complete, 33);

        let tasks = vec![task("a", true), task("b", true), task("c", false)];
        assert_eq!(TaskStats::from_tasks(&tasks).percent_complete, 67);
        assert_eq!(TaskStats::from_tasks(&[]).percent_complete, 0);
        assert!(!TaskStats::from_tasks(&[]).can_clear_completed());
    }
}
