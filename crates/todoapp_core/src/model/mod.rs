//! Task domain model.
//!
//! # Responsibility
//! - Define the task record persisted by the store and rendered by views.
//! - Provide read-side projections (filters, stats) over task collections.
//!
//! # Invariants
//! - Every task is identified by a stable `TaskId`.
//! - `updated_at >= created_at` for every task.

pub mod task;
