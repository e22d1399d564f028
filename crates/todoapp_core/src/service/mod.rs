//! Task use-case services.
//!
//! # Responsibility
//! - Apply user intents (add/toggle/delete/edit/clear) to the collection.
//! - Route every mutation through the task store and re-render the view.
//!
//! # Invariants
//! - The in-memory collection matches the last successfully saved snapshot.
//! - Services remain storage-agnostic and rendering-agnostic.

pub mod controller;
pub mod task_list;
