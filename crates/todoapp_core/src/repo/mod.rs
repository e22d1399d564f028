//! Persistence layer for the task collection.
//!
//! # Responsibility
//! - Define the key-value medium contract and its implementations.
//! - Serialize the task collection into a versioned, size-guarded snapshot.
//!
//! # Invariants
//! - The snapshot is written with a single `set` call.
//! - Size and availability checks run before any write.

pub mod kv_store;
pub mod task_store;
