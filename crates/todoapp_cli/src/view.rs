//! Terminal rendering surface for the controller.
//!
//! The controller re-renders after every step; this view keeps only the
//! latest frame and prints it once the command finishes.

use std::io::{self, BufRead, Write};
use todoapp_core::{escape_for_display, Notice, NoticeKind, Task, TaskFilter, TaskId, TaskStats, TaskView};

#[derive(Debug, Clone)]
struct Row {
    position: usize,
    id: TaskId,
    text: String,
    completed: bool,
    editing: bool,
}

/// Stdout view with stdin (or `--yes`) confirmations.
pub struct TerminalView {
    assume_yes: bool,
    rows: Vec<Row>,
    filter: TaskFilter,
    stats: TaskStats,
    progress: u8,
    empty_state: bool,
    clear_enabled: bool,
    positions: Vec<TaskId>,
}

impl TerminalView {
    pub fn new(assume_yes: bool) -> Self {
        Self {
            assume_yes,
            rows: Vec::new(),
            filter: TaskFilter::All,
            stats: TaskStats::default(),
            progress: 0,
            empty_state: true,
            clear_enabled: false,
            positions: Vec::new(),
        }
    }

    /// Records the full-list order so rows can show stable positions.
    pub fn set_positions(&mut self, tasks: &[Task]) {
        self.positions = tasks.iter().map(|task| task.id.clone()).collect();
    }

    /// Prints the latest rendered frame.
    pub fn print_frame(&self) {
        println!("filter: {}", self.filter);
        if self.empty_state {
            println!("  (no tasks)");
        }
        for row in &self.rows {
            let mark = if row.completed { "x" } else { " " };
            let editing = if row.editing { " (editing)" } else { "" };
            println!(
                "  {:>3}. [{mark}] {}{editing}  {}",
                row.position, row.text, row.id
            );
        }

        let noun = if self.stats.total == 1 { "task" } else { "tasks" };
        println!(
            "{} {noun}, {} completed, {}% complete{}",
            self.stats.total,
            self.stats.completed,
            self.progress,
            if self.clear_enabled {
                " (clear-completed available)"
            } else {
                ""
            }
        );
    }

    /// Writes the visible tasks as an HTML list with escaped text.
    pub fn print_html(&self) {
        println!("<ul class=\"task-list\" data-filter=\"{}\">", self.filter);
        for row in &self.rows {
            let class = if row.completed {
                "task-item task-item--completed"
            } else {
                "task-item"
            };
            println!(
                "  <li class=\"{class}\" data-id=\"{}\"><span class=\"task-item__text\">{}</span></li>",
                escape_for_display(row.id.as_str()),
                escape_for_display(&row.text)
            );
        }
        println!("</ul>");
    }
}

impl TaskView for TerminalView {
    fn render_list(&mut self, tasks: &[&Task], filter: TaskFilter, editing: Option<&TaskId>) {
        self.filter = filter;
        self.rows = tasks
            .iter()
            .map(|task| Row {
                position: self
                    .positions
                    .iter()
                    .position(|id| id == &task.id)
                    .map_or(0, |index| index + 1),
                id: task.id.clone(),
                text: task.text.clone(),
                completed: task.completed,
                editing: editing == Some(&task.id),
            })
            .collect();
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
        if self.assume_yes {
            return true;
        }

        print!("{message} [y/N] ");
        if io::stdout().flush().is_err() {
            return false;
        }

        let mut answer = String::new();
        match io::stdin().lock().read_line(&mut answer) {
            Ok(_) => matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"),
            Err(_) => false,
        }
    }

    fn notify(&mut self, notice: Notice) {
        match notice.kind {
            NoticeKind::Error => eprintln!("{}", notice.message),
            NoticeKind::Success => println!("{}", notice.message),
        }
    }
}
