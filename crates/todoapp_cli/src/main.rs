//! Terminal front end for the todoapp task list.
//!
//! # Responsibility
//! - Map one subcommand to one controller intent.
//! - Persist into a local SQLite key-value file between invocations.
//! - Print the rendered frame after the intent completes.

mod view;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use todoapp_core::{
    default_log_level, init_logging, EditOutcome, SqliteKeyValueStore, TaskFilter, TaskId,
    TaskStore, TodoController,
};
use view::TerminalView;

type Controller = TodoController<SqliteKeyValueStore, TerminalView>;

#[derive(Parser, Debug)]
#[command(name = "todoapp", version, about = "Local task list manager")]
struct Cli {
    /// Key-value database file holding the task snapshot.
    #[arg(long, env = "TODOAPP_DB", default_value = "todoapp.sqlite3")]
    db: PathBuf,

    /// Absolute directory for rolling log files (logging is off when unset).
    #[arg(long, env = "TODOAPP_LOG_DIR")]
    log_dir: Option<PathBuf>,

    /// trace|debug|info|warn|error
    #[arg(long, env = "TODOAPP_LOG_LEVEL")]
    log_level: Option<String>,

    /// Answer yes to every confirmation prompt.
    #[arg(long, short = 'y')]
    yes: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Add a new task
    Add { text: String },
    /// Show tasks
    List {
        /// all|active|completed
        #[arg(long, short = 'f', default_value = "all")]
        filter: String,
    },
    /// Flip a task between active and completed
    Toggle { task: String },
    /// Delete a task
    Delete { task: String },
    /// Replace a task's text
    Edit { task: String, text: String },
    /// Delete every completed task
    ClearCompleted,
    /// Print the visible tasks as an escaped HTML fragment
    Html {
        #[arg(long, short = 'f', default_value = "all")]
        filter: String,
    },
    /// Show storage diagnostics
    Info,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Some(log_dir) = &cli.log_dir {
        let level = cli.log_level.as_deref().unwrap_or(default_log_level());
        if let Err(err) = init_logging(level, log_dir) {
            eprintln!("warning: logging disabled: {err}");
        }
    }

    let medium = match SqliteKeyValueStore::open(&cli.db) {
        Ok(medium) => medium,
        Err(err) => {
            eprintln!("error: {err}");
            return ExitCode::FAILURE;
        }
    };

    let mut controller = TodoController::new(TaskStore::new(medium), TerminalView::new(cli.yes));
    let succeeded = run(&mut controller, cli.command);
    if succeeded {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn run(controller: &mut Controller, command: Command) -> bool {
    match command {
        Command::Add { text } => {
            let ok = controller.add(&text).is_ok();
            print_frame(controller);
            ok
        }
        Command::List { filter } => {
            controller.set_filter(TaskFilter::parse_lossy(&filter));
            print_frame(controller);
            true
        }
        Command::Toggle { task } => with_task(controller, &task, |controller, id| {
            controller.toggle(&id).is_ok()
        }),
        Command::Delete { task } => with_task(controller, &task, |controller, id| {
            controller.delete(&id).is_ok()
        }),
        Command::Edit { task, text } => with_task(controller, &task, |controller, id| {
            if controller.start_edit(&id).is_none() {
                return false;
            }
            matches!(
                controller.commit_edit(&text),
                Ok(EditOutcome::Updated | EditOutcome::Unchanged)
            )
        }),
        Command::ClearCompleted => {
            let ok = match controller.clear_completed() {
                Ok(removed) => {
                    println!("removed {removed} completed task(s)");
                    true
                }
                Err(_) => false,
            };
            print_frame(controller);
            ok
        }
        Command::Html { filter } => {
            controller.set_filter(TaskFilter::parse_lossy(&filter));
            controller.view().print_html();
            true
        }
        Command::Info => {
            let info = controller.storage_info();
            let path = controller.store().medium().connection().path();
            println!("database: {}", path.unwrap_or(":memory:"));
            println!("tasks: {}", info.task_count);
            println!("size: {} ({} bytes)", info.formatted_size, info.size);
            true
        }
    }
}

fn with_task(
    controller: &mut Controller,
    reference: &str,
    action: impl FnOnce(&mut Controller, TaskId) -> bool,
) -> bool {
    let Some(id) = resolve_task(controller, reference) else {
        eprintln!("Error: no task matches `{reference}`");
        return false;
    };
    let ok = action(controller, id);
    print_frame(controller);
    ok
}

/// Accepts a full task id or a 1-based position in the full list.
fn resolve_task(controller: &Controller, reference: &str) -> Option<TaskId> {
    let tasks = controller.tasks();
    if let Some(task) = tasks.iter().find(|task| task.id.as_str() == reference) {
        return Some(task.id.clone());
    }

    let position = reference.parse::<usize>().ok()?;
    tasks
        .get(position.checked_sub(1)?)
        .map(|task| task.id.clone())
}

fn print_frame(controller: &mut Controller) {
    let tasks = controller.tasks().to_vec();
    controller.view_mut().set_positions(&tasks);
    controller.render();
    controller.view().print_frame();
}
