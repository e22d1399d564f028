//! Shared test doubles for controller tests.

use std::collections::VecDeque;
use todoapp_core::{Notice, NoticeKind, Task, TaskFilter, TaskId, TaskStats, TaskView};

/// View that records the latest rendered values and scripted confirmations.
#[derive(Debug, Default)]
pub struct RecordingView {
    pub list: Vec<(TaskId, String, bool)>,
    pub filter: TaskFilter,
    pub editing: Option<TaskId>,
    pub stats: TaskStats,
    pub progress: u8,
    pub empty_state: bool,
    pub clear_enabled: bool,
    pub renders: usize,
    pub confirm_answers: VecDeque<bool>,
    pub confirm_prompts: Vec<String>,
    pub notices: Vec<Notice>,
}

impl RecordingView {
    pub fn answering(answers: &[bool]) -> Self {
        Self {
            confirm_answers: answers.iter().copied().collect(),
            ..Self::default()
        }
    }

    pub fn texts(&self) -> Vec<&str> {
        self.list.iter().map(|(_, text, _)| text.as_str()).collect()
    }

    pub fn errors(&self) -> Vec<&str> {
        self.notices
            .iter()
            .filter(|notice| notice.kind == NoticeKind::Error)
            .map(|notice| notice.message.as_str())
            .collect()
    }
}

impl TaskView for RecordingView {
    fn render_list(&mut self, tasks: &[&Task], filter: TaskFilter, editing: Option<&TaskId>) {
        self.list = tasks
            .iter()
            .map(|task| (task.id.clone(), task.text.clone(), task.completed))
            .collect();
        self.filter = filter;
        self.editing = editing.cloned();
        self.renders += 1;
    }

    fn render_stats(&mut self, stats: &TaskStats) {
        self.stats = *stats;
    }

    fn render_progress(&mut self, percent: u8) {
        self.progress = percent;
    }

    fn render_empty_state(&mut self, visible: bool) {
        self.empty_state = visible;
    }

    fn render_clear_button(&mut self, enabled: bool) {
        self.clear_enabled = enabled;
    }

    fn confirm(&mut self, message: &str) -> bool {
        self.confirm_prompts.push(message.to_string());
        self.confirm_answers.pop_front().unwrap_or(false)
    }

    fn notify(&mut self, notice: Notice) {
        self.notices.push(notice);
    }
}
